use std::{
    env::{self, VarError},
    time::Duration,
};

use derive_more::Display;
use dotenv::dotenv;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_MAIL_PORT: u16 = 25;
const DEFAULT_MAIL_FROM: &str = "MeetApp <noreply@meetapp.com>";
/// seconds to wait for the smtp server on connect and on each reply
const DEFAULT_MAIL_TIMEOUT: u64 = 10;
/// one week, in seconds
const DEFAULT_JWT_EXPIRES_IN: u64 = 7 * 24 * 60 * 60;

#[derive(Debug, Display)]
pub enum ConfigError {
    #[display(fmt = "environment variable '{}' must be set", _0)]
    Missing(&'static str),

    #[display(fmt = "environment variable '{}' has an invalid value: {}", _0, _1)]
    Invalid(&'static str, String),
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailAuth {
    pub user: String,
    pub pass: String,
}

/// Transport settings for the mailer. Built once at start-up and moved
/// into the mail worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailConfig {
    pub host: String,
    pub port: u16,
    pub secure: bool,
    pub auth: Option<MailAuth>,
    pub default_from: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    /// public base url, used to build file urls
    pub app_url: String,
    pub jwt_secret: String,
    pub jwt_expires_in: u64,
    pub mail: MailConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();
        Ok(Self {
            database_url: required("DATABASE_URL")?,
            host: optional("APP_HOST")?.unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: parse_or("APP_PORT", DEFAULT_PORT)?,
            app_url: required("APP_URL")?.trim_end_matches('/').to_string(),
            jwt_secret: required("APP_SECRET")?,
            jwt_expires_in: parse_or("JWT_EXPIRES_IN", DEFAULT_JWT_EXPIRES_IN)?,
            mail: MailConfig::from_env()?,
        })
    }
}

impl MailConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        // MAIL_POST is the historical name of the port variable
        let port = match optional("MAIL_POST")? {
            Some(port) => parse("MAIL_POST", &port)?,
            None => parse_or("MAIL_PORT", DEFAULT_MAIL_PORT)?,
        };
        let auth = match (optional("MAIL_USER")?, optional("MAIL_PASS")?) {
            (Some(user), Some(pass)) => Some(MailAuth { user, pass }),
            _ => None,
        };
        Ok(Self {
            host: required("MAIL_HOST")?,
            port,
            secure: false,
            auth,
            default_from: optional("MAIL_FROM")?.unwrap_or_else(|| DEFAULT_MAIL_FROM.to_string()),
            timeout: Duration::from_secs(parse_or("MAIL_TIMEOUT", DEFAULT_MAIL_TIMEOUT)?),
        })
    }
}

fn optional(key: &'static str) -> Result<Option<String>, ConfigError> {
    match env::var(key) {
        Ok(value) if value.trim().is_empty() => Ok(None),
        Ok(value) => Ok(Some(value)),
        Err(VarError::NotPresent) => Ok(None),
        Err(VarError::NotUnicode(_)) => Err(ConfigError::Invalid(key, "not unicode".to_string())),
    }
}

fn required(key: &'static str) -> Result<String, ConfigError> {
    optional(key)?.ok_or(ConfigError::Missing(key))
}

fn parse<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|err: T::Err| ConfigError::Invalid(key, err.to_string()))
}

fn parse_or<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match optional(key)? {
        Some(value) => parse(key, &value),
        None => Ok(default),
    }
}
