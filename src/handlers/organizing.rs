use actix_web::{get, web, HttpResponse};
use chrono::Utc;

use crate::{
    config::Config,
    dto::{Page, PageQuery},
    errors::AppError,
    service::{self, auth::UserAuthData},
    PGPool,
};

#[get("/organizing")]
pub async fn index(
    auth: UserAuthData,
    query: web::Query<PageQuery>,
    pool_state: web::Data<PGPool>,
    config: web::Data<Config>,
) -> Result<HttpResponse, AppError> {
    let conn: &PGPool = pool_state.get_ref();
    let meetups = service::meetup::list_organizing(
        conn,
        auth.user_id,
        Page::new(query.page),
        &config.app_url,
        Utc::now(),
    )
    .await?;
    Ok(HttpResponse::Ok().json(meetups))
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(index);
}
