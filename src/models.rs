use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: i32,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct File {
    pub id: i32,
    pub name: String,
    pub path: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Public url of a stored file.
pub fn file_url(app_url: &str, path: &str) -> String {
    format!("{}/files/{}", app_url.trim_end_matches('/'), path)
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Meetup {
    pub id: i32,
    pub title: String,
    pub description: String,
    pub location: String,
    pub date: DateTime<Utc>,
    pub file_id: Option<i32>,
    pub user_id: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Meetup {
    pub fn is_past(&self, now: DateTime<Utc>) -> bool {
        is_past(self.date, now)
    }
}

pub fn is_past(date: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    date < now
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Subscription {
    pub id: i32,
    pub user_id: i32,
    pub meetup_id: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A meetup joined with its organizer and its image.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct MeetupDetails {
    pub id: i32,
    pub title: String,
    pub description: String,
    pub location: String,
    pub date: DateTime<Utc>,
    pub user_id: i32,
    pub organizer_name: String,
    pub organizer_email: String,
    pub image_id: Option<i32>,
    pub image_name: Option<String>,
    pub image_path: Option<String>,
}

/// A subscription joined with its meetup.
#[derive(Debug, Clone, FromRow)]
pub struct SubscriptionDetails {
    pub subscription_id: i32,
    #[sqlx(flatten)]
    pub meetup: MeetupDetails,
}
