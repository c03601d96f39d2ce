use actix_web::{post, web, HttpResponse};
use log::{info, warn};

use crate::{
    config::Config,
    dto::{LoginUserRequest, NewUserDto},
    errors::AppError,
    service, PGPool,
};

#[post("/users")]
pub async fn register(
    dto: web::Json<NewUserDto>,
    pool_state: web::Data<PGPool>,
) -> Result<HttpResponse, AppError> {
    let conn: &PGPool = pool_state.get_ref();
    match service::user::create(conn, dto.into_inner()).await {
        Ok(user) => {
            info!("RESPONSE /USERS: {:?}", user);
            Ok(HttpResponse::Ok().json(user))
        }
        Err(err) => {
            warn!("registration refused: {}", err);
            Err(err)
        }
    }
}

#[post("/sessions")]
pub async fn login(
    req: web::Json<LoginUserRequest>,
    pool_state: web::Data<PGPool>,
    config: web::Data<Config>,
) -> Result<HttpResponse, AppError> {
    let conn: &PGPool = pool_state.get_ref();
    let session = service::user::login(
        conn,
        req.into_inner(),
        &config.jwt_secret,
        config.jwt_expires_in,
    )
    .await?;
    info!("RESPONSE /SESSIONS: user {}", session.user.id);
    Ok(HttpResponse::Ok().json(session))
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(register).service(login);
}
