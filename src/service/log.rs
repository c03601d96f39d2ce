use std::future::{ready, Ready};
use std::io::Write;
use std::time::Instant;

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error,
};
use colored::Colorize;
use env_logger::{Builder, Env};
use futures_util::future::LocalBoxFuture;
use log::{info, Level};

pub struct LoggerMiddleware;

impl<S, B> Transform<S, ServiceRequest> for LoggerMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = LoggerMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(LoggerMiddlewareService { service }))
    }
}

pub struct LoggerMiddlewareService<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for LoggerMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let started = Instant::now();
        let line = format!("{} {}", req.method(), req.uri());
        info!("--> {}", line);
        let fut = self.service.call(req);

        Box::pin(async move {
            let res = fut.await;
            let status = match &res {
                Ok(res) => res.status(),
                Err(err) => err.as_response_error().status_code(),
            };
            info!("<-- {} {} in {}ms", line, status, started.elapsed().as_millis());
            res
        })
    }
}

fn paint(level: Level) -> colored::ColoredString {
    let name = level.as_str();
    match level {
        Level::Error => name.red().bold(),
        Level::Warn => name.yellow().bold(),
        Level::Info => name.green().bold(),
        Level::Debug => name.blue().bold(),
        Level::Trace => name.magenta().bold(),
    }
}

/// `RUST_LOG` filters as usual, defaulting to `info`.
pub fn init_logger() {
    Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            writeln!(
                buf,
                "{} {:<5} {} - {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f").to_string().dimmed(),
                paint(record.level()),
                record.target().cyan(),
                record.args()
            )
        })
        .init()
}
