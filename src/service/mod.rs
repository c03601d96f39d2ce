pub mod auth;
pub mod crypto;
pub mod jobs;
pub mod log;
pub mod mail;
pub mod meetup;
pub mod queue;
pub mod schedule;
pub mod subscription;
pub mod user;
