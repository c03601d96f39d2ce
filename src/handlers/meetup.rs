use actix_web::{delete, get, post, put, web, HttpResponse};
use chrono::{Local, Utc};
use log::info;

use crate::{
    config::Config,
    dto::{MeetupListQuery, MeetupPayload},
    errors::AppError,
    service::{self, auth::UserAuthData},
    PGPool,
};

#[get("/meetups")]
pub async fn index(
    query: web::Query<MeetupListQuery>,
    pool_state: web::Data<PGPool>,
    config: web::Data<Config>,
) -> Result<HttpResponse, AppError> {
    let conn: &PGPool = pool_state.get_ref();
    let meetups =
        service::meetup::list(conn, query.into_inner(), &Local, &config.app_url, Utc::now()).await?;
    Ok(HttpResponse::Ok().json(meetups))
}

#[post("/meetups")]
pub async fn store(
    auth: UserAuthData,
    payload: web::Json<MeetupPayload>,
    pool_state: web::Data<PGPool>,
) -> Result<HttpResponse, AppError> {
    let conn: &PGPool = pool_state.get_ref();
    let meetup = service::meetup::create(conn, auth.user_id, payload.into_inner(), Utc::now()).await?;
    info!("RESPONSE POST /MEETUPS: {}", meetup.meetup.id);
    Ok(HttpResponse::Ok().json(meetup))
}

#[put("/meetups/{id}")]
pub async fn update(
    auth: UserAuthData,
    id: web::Path<i32>,
    payload: web::Json<MeetupPayload>,
    pool_state: web::Data<PGPool>,
) -> Result<HttpResponse, AppError> {
    let conn: &PGPool = pool_state.get_ref();
    let meetup = service::meetup::update(
        conn,
        auth.user_id,
        id.into_inner(),
        payload.into_inner(),
        Utc::now(),
    )
    .await?;
    Ok(HttpResponse::Ok().json(meetup))
}

#[delete("/meetups/{id}")]
pub async fn destroy(
    auth: UserAuthData,
    id: web::Path<i32>,
    pool_state: web::Data<PGPool>,
) -> Result<HttpResponse, AppError> {
    let conn: &PGPool = pool_state.get_ref();
    service::meetup::delete(conn, auth.user_id, id.into_inner()).await?;
    Ok(HttpResponse::Ok().finish())
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(index)
        .service(store)
        .service(update)
        .service(destroy);
}
