use std::future::{ready, Ready};
use std::rc::Rc;

use actix_web::{
    dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform},
    FromRequest, HttpMessage, HttpRequest,
};
use futures_util::future::LocalBoxFuture;
use log::warn;

use crate::errors::AppError;

/// The authenticated caller, placed in the request extensions by
/// `AuthMiddleware`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserAuthData {
    pub user_id: i32,
}

impl FromRequest for UserAuthData {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<UserAuthData>()
                .copied()
                .ok_or(AppError::TokenMissing),
        )
    }
}

pub struct AuthMiddleware {
    secret: Rc<String>,
}

impl AuthMiddleware {
    pub fn new(secret: &str) -> Self {
        Self {
            secret: Rc::new(secret.to_string()),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = actix_web::Error;
    type Transform = AuthMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService {
            service,
            secret: self.secret.clone(),
        }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: S,
    secret: Rc<String>,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        // no route matches; let the default service answer 404
        if req.request().match_pattern().is_none() {
            let fut = self.service.call(req);
            return Box::pin(async move { fut.await });
        }
        let claims = jwt::parse_request(req.request(), "Bearer ")
            .and_then(|token| jwt::decode_claims(token, &self.secret));
        match claims {
            Ok(claims) => {
                req.extensions_mut().insert(UserAuthData {
                    user_id: claims.user_id,
                });
                let fut = self.service.call(req);
                Box::pin(async move { fut.await })
            }
            Err(err) => {
                warn!("rejected {} {}: {}", req.method(), req.path(), err);
                Box::pin(async move { Err(err.into()) })
            }
        }
    }
}

pub mod jwt {
    use actix_web::HttpRequest;
    use chrono::Utc;
    use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
    use log::error;

    use crate::{dto::Claims, errors::AppError};

    pub fn create(user_id: i32, secret: &str, expires_in: u64) -> Result<String, AppError> {
        let exp = Utc::now().timestamp().max(0) as u64 + expires_in;
        let claims = Claims {
            user_id,
            exp: exp as usize,
        };
        let key = EncodingKey::from_secret(secret.as_bytes());
        encode(&Header::new(Algorithm::HS256), &claims, &key).map_err(|err| {
            error!("failed to sign token for user {}: {:?}", user_id, err);
            AppError::InternalError
        })
    }

    /// Verifies signature and expiry.
    pub fn decode_claims(token: &str, secret: &str) -> Result<Claims, AppError> {
        let key = DecodingKey::from_secret(secret.as_bytes());
        decode::<Claims>(token, &key, &Validation::new(Algorithm::HS256))
            .map(|data| data.claims)
            .map_err(|_| AppError::TokenInvalid)
    }

    pub fn parse_request<'a>(req: &'a HttpRequest, prefix: &str) -> Result<&'a str, AppError> {
        let header = req
            .headers()
            .get(actix_web::http::header::AUTHORIZATION)
            .ok_or(AppError::TokenMissing)?;
        let value = header.to_str().map_err(|_| AppError::TokenInvalid)?;
        value
            .strip_prefix(prefix)
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(AppError::TokenInvalid)
    }
}
