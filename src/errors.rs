use actix_web::{
    error,
    http::{header::ContentType, StatusCode},
    HttpRequest, HttpResponse,
};
use derive_more::{Display, Error};
use log::error;
use serde::Serialize;

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum AppError {
    #[display(fmt = "Internal server error")]
    InternalError,

    #[display(fmt = "Validation fails")]
    ValidationError,

    #[display(fmt = "Referenced record doesn't exist")]
    InvalidReference,

    #[display(fmt = "Token not provided")]
    TokenMissing,

    #[display(fmt = "Token invalid")]
    TokenInvalid,

    #[display(fmt = "User already exists")]
    UserExists,

    #[display(fmt = "User not found")]
    UserNotFound,

    #[display(fmt = "Password does not match")]
    PasswordMismatch,

    #[display(fmt = "Meetup doesn't exists")]
    MeetupNotFound,

    #[display(fmt = "Not authorized")]
    NotOwner,

    #[display(fmt = "Meet date invalid")]
    InvalidDate,

    #[display(fmt = "Can't update past meetups")]
    PastMeetupUpdate,

    #[display(fmt = "Meetup doesn't exists")]
    SubscriptionTargetMissing,

    #[display(fmt = "Can't subscribe to you own meetups")]
    OwnMeetup,

    #[display(fmt = "Can't subscribe to past meetups")]
    PastMeetupSubscription,

    #[display(fmt = "Already subscribed to this meetup")]
    AlreadySubscribed,

    #[display(fmt = "Can't subscribe to two meetups at the same time")]
    ScheduleConflict,

    #[display(fmt = "You don't have permission to cancel this subscription")]
    SubscriptionNotOwned,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl error::ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .content_type(ContentType::json())
            .json(ErrorBody {
                error: self.to_string(),
            })
    }

    fn status_code(&self) -> StatusCode {
        match *self {
            AppError::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::TokenMissing
            | AppError::TokenInvalid
            | AppError::UserNotFound
            | AppError::PasswordMismatch
            | AppError::MeetupNotFound
            | AppError::NotOwner
            | AppError::SubscriptionNotOwned => StatusCode::UNAUTHORIZED,
            AppError::ValidationError
            | AppError::InvalidReference
            | AppError::UserExists
            | AppError::InvalidDate
            | AppError::PastMeetupUpdate
            | AppError::SubscriptionTargetMissing
            | AppError::OwnMeetup
            | AppError::PastMeetupSubscription
            | AppError::AlreadySubscribed
            | AppError::ScheduleConflict => StatusCode::BAD_REQUEST,
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_foreign_key_violation() {
                return AppError::InvalidReference;
            }
        }
        error!("database error: {:?}", err);
        AppError::InternalError
    }
}

impl AppError {
    /// `duplicate` when `err` is a unique violation, the usual mapping otherwise.
    pub fn on_duplicate(err: sqlx::Error, duplicate: AppError) -> AppError {
        match &err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => duplicate,
            _ => err.into(),
        }
    }
}

/// Rejections from the json, query and path extractors all render as a
/// validation failure.
pub fn extractor_error<E: std::fmt::Display>(err: E, req: &HttpRequest) -> actix_web::Error {
    log::warn!("rejected {} {}: {}", req.method(), req.path(), err);
    AppError::ValidationError.into()
}
