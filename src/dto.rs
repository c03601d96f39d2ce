use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    errors::AppError,
    models::{self, Meetup, MeetupDetails, SubscriptionDetails, User},
    service::schedule,
};

pub const PAGE_SIZE: i64 = 10;
/// Longest title, location, name or e-mail the tables accept.
pub const MAX_TEXT_LEN: usize = 255;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct NewUserDto {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl NewUserDto {
    pub fn validate(self) -> Result<NewUser, AppError> {
        let name = short_text(self.name)?;
        let email = short_text(self.email)?;
        let password = self.password.ok_or(AppError::ValidationError)?;
        if !email.contains('@') || password.chars().count() < 6 {
            return Err(AppError::ValidationError);
        }
        Ok(NewUser {
            name,
            email: email.to_lowercase(),
            password,
        })
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoginUserRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: i32,
    pub exp: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct UserView {
    pub id: i32,
    pub name: String,
    pub email: String,
}

impl From<User> for UserView {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub user: UserView,
    pub token: String,
}

/// Body of `POST /meetups` and `PUT /meetups/{id}`. Every field is optional
/// at the serde level so that a missing field is reported by `validate`.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct MeetupPayload {
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    /// milliseconds since the unix epoch
    pub date: Option<i64>,
    pub file_id: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeetupFields {
    pub title: String,
    pub description: String,
    pub location: String,
    pub date: DateTime<Utc>,
    pub file_id: i32,
}

impl MeetupPayload {
    pub fn validate(self) -> Result<MeetupFields, AppError> {
        let title = short_text(self.title)?;
        let description = required_text(self.description)?;
        let location = short_text(self.location)?;
        let file_id = self.file_id.ok_or(AppError::ValidationError)?;
        let date = self
            .date
            .and_then(schedule::normalize_timestamp)
            .ok_or(AppError::ValidationError)?;
        Ok(MeetupFields {
            title,
            description,
            location,
            date,
            file_id,
        })
    }
}

fn required_text(value: Option<String>) -> Result<String, AppError> {
    match value {
        Some(text) if !text.trim().is_empty() => Ok(text),
        _ => Err(AppError::ValidationError),
    }
}

/// Non-empty text that fits a `VARCHAR(255)` column.
fn short_text(value: Option<String>) -> Result<String, AppError> {
    let text = required_text(value)?;
    if text.chars().count() > MAX_TEXT_LEN {
        return Err(AppError::ValidationError);
    }
    Ok(text)
}

#[derive(Debug, Deserialize, Clone, Copy, Default)]
pub struct PageQuery {
    pub page: Option<i64>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct MeetupListQuery {
    pub date: Option<String>,
    pub page: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub number: i64,
}

impl Page {
    /// pages are 1-based, anything lower is the first page
    pub fn new(number: Option<i64>) -> Self {
        Self {
            number: number.unwrap_or(1).max(1),
        }
    }

    pub fn limit(&self) -> i64 {
        PAGE_SIZE
    }

    pub fn offset(&self) -> i64 {
        PAGE_SIZE.saturating_mul(self.number - 1)
    }
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct OrganizerView {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i32>,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct ImageView {
    pub id: i32,
    pub url: String,
    pub name: String,
    pub path: String,
}

impl ImageView {
    fn from_details(details: &MeetupDetails, app_url: &str) -> Option<Self> {
        match (details.image_id, &details.image_name, &details.image_path) {
            (Some(id), Some(name), Some(path)) => Some(Self {
                id,
                url: models::file_url(app_url, path),
                name: name.clone(),
                path: path.clone(),
            }),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MeetupView {
    pub id: i32,
    pub title: String,
    pub description: String,
    pub location: String,
    pub date: DateTime<Utc>,
    pub past: bool,
    pub user: OrganizerView,
    #[serde(rename = "imagem")]
    pub image: Option<ImageView>,
}

impl MeetupView {
    pub fn new(details: MeetupDetails, app_url: &str, now: DateTime<Utc>) -> Self {
        let image = ImageView::from_details(&details, app_url);
        Self {
            id: details.id,
            past: models::is_past(details.date, now),
            date: details.date,
            user: OrganizerView {
                id: Some(details.user_id),
                name: details.organizer_name,
                email: details.organizer_email,
            },
            image,
            title: details.title,
            description: details.description,
            location: details.location,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SubscribedMeetupView {
    pub id: i32,
    pub title: String,
    pub description: String,
    pub location: String,
    pub date: DateTime<Utc>,
    pub user: OrganizerView,
    #[serde(rename = "imagem")]
    pub image: Option<ImageView>,
}

#[derive(Debug, Serialize)]
pub struct SubscriptionView {
    pub id: i32,
    pub meetup: SubscribedMeetupView,
}

impl SubscriptionView {
    pub fn new(details: SubscriptionDetails, app_url: &str) -> Self {
        let meetup = details.meetup;
        let image = ImageView::from_details(&meetup, app_url);
        Self {
            id: details.subscription_id,
            meetup: SubscribedMeetupView {
                id: meetup.id,
                title: meetup.title,
                description: meetup.description,
                location: meetup.location,
                date: meetup.date,
                user: OrganizerView {
                    id: None,
                    name: meetup.organizer_name,
                    email: meetup.organizer_email,
                },
                image,
            },
        }
    }
}

/// A stored meetup as returned by create and update.
#[derive(Debug, Serialize)]
pub struct MeetupRecord {
    #[serde(flatten)]
    pub meetup: Meetup,
    pub past: bool,
}

impl MeetupRecord {
    pub fn new(meetup: Meetup, now: DateTime<Utc>) -> Self {
        let past = meetup.is_past(now);
        Self { meetup, past }
    }
}
