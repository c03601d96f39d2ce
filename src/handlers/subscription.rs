use actix_web::{delete, get, post, web, HttpResponse};
use chrono::Utc;
use log::info;

use crate::{
    config::Config,
    errors::AppError,
    service::{self, auth::UserAuthData, queue::JobQueue},
    PGPool,
};

#[get("/subscriptions")]
pub async fn index(
    auth: UserAuthData,
    pool_state: web::Data<PGPool>,
    config: web::Data<Config>,
) -> Result<HttpResponse, AppError> {
    let conn: &PGPool = pool_state.get_ref();
    let subscriptions =
        service::subscription::list(conn, auth.user_id, &config.app_url, Utc::now()).await?;
    Ok(HttpResponse::Ok().json(subscriptions))
}

#[post("/subscriptions/{meetup_id}")]
pub async fn store(
    auth: UserAuthData,
    meetup_id: web::Path<i32>,
    pool_state: web::Data<PGPool>,
    queue: web::Data<JobQueue>,
) -> Result<HttpResponse, AppError> {
    let conn: &PGPool = pool_state.get_ref();
    let subscription = service::subscription::subscribe(
        conn,
        queue.get_ref(),
        auth.user_id,
        meetup_id.into_inner(),
        Utc::now(),
    )
    .await?;
    info!("RESPONSE POST /SUBSCRIPTIONS: {}", subscription.id);
    Ok(HttpResponse::Ok().json(subscription))
}

#[delete("/subscriptions/{id}")]
pub async fn destroy(
    auth: UserAuthData,
    id: web::Path<i32>,
    pool_state: web::Data<PGPool>,
) -> Result<HttpResponse, AppError> {
    let conn: &PGPool = pool_state.get_ref();
    let subscription =
        service::subscription::unsubscribe(conn, auth.user_id, id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(subscription))
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(index).service(store).service(destroy);
}
