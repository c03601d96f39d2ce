pub mod auth;
pub mod meetup;
pub mod organizing;
pub mod subscription;

use actix_web::{
    error::{JsonPayloadError, PathError, QueryPayloadError},
    web,
};

use crate::{errors::extractor_error, service::auth::AuthMiddleware};

/// Account routes are public, everything else needs a bearer token.
pub fn init_routes(cfg: &mut web::ServiceConfig, jwt_secret: &str) {
    init_extractors(cfg);
    auth::init_routes(cfg);
    cfg.service(
        web::scope("")
            .wrap(AuthMiddleware::new(jwt_secret))
            .configure(meetup::init_routes)
            .configure(organizing::init_routes)
            .configure(subscription::init_routes),
    );
}

/// Malformed bodies, queries and path segments all answer 400 with the
/// usual error body.
pub fn init_extractors(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(extractor_error::<JsonPayloadError>))
        .app_data(web::QueryConfig::default().error_handler(extractor_error::<QueryPayloadError>))
        .app_data(web::PathConfig::default().error_handler(extractor_error::<PathError>));
}
