pub mod config;
pub mod db;
pub mod dto;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod service;

use std::io;

use actix_web::{web, App, HttpServer};
use log::{error, info};
use sqlx::{postgres::Postgres, Pool};

use config::Config;
use service::{log::LoggerMiddleware, mail::SmtpMailer, queue::JobQueue};

pub type PGPool = Pool<Postgres>;

#[actix_web::main]
async fn main() -> io::Result<()> {
    service::log::init_logger();

    let config = Config::from_env().map_err(|err| {
        error!("invalid configuration: {}", err);
        io::Error::new(io::ErrorKind::InvalidInput, err)
    })?;
    let pool: PGPool = db::init_db_pool(&config.database_url)
        .await
        .map_err(|err| io::Error::new(io::ErrorKind::ConnectionRefused, err))?;
    db::run_migrations(&pool)
        .await
        .map_err(|err| io::Error::new(io::ErrorKind::Other, err))?;

    let (queue, jobs) = JobQueue::new();
    actix_rt::spawn(service::queue::run_worker(jobs, SmtpMailer::new(config.mail.clone())));

    let bind = (config.host.clone(), config.port);
    info!("listening on {}:{}", bind.0, bind.1);
    let config = web::Data::new(config);
    HttpServer::new(move || {
        let jwt_secret = config.jwt_secret.clone();
        App::new()
            .wrap(LoggerMiddleware)
            .app_data(web::Data::new(pool.clone()))
            .app_data(web::Data::new(queue.clone()))
            .app_data(config.clone())
            .configure(|cfg| handlers::init_routes(cfg, &jwt_secret))
    })
    .bind(bind)?
    .run()
    .await
}
