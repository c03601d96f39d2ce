//! In-memory `Store` used by the service tests.

use std::{error::Error as StdError, fmt, sync::Mutex};

use chrono::{DateTime, Utc};
use sqlx::error::{DatabaseError, ErrorKind};

use super::{Filter, Store};
use crate::{
    dto::{MeetupFields, Page},
    models::{File, Meetup, MeetupDetails, Subscription, SubscriptionDetails, User},
};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    files: Vec<File>,
    meetups: Vec<Meetup>,
    subscriptions: Vec<Subscription>,
    next_id: i32,
}

impl Tables {
    fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }

    fn details(&self, meetup: &Meetup) -> Option<MeetupDetails> {
        let organizer = self.users.iter().find(|u| u.id == meetup.user_id)?;
        let image = meetup
            .file_id
            .and_then(|file_id| self.files.iter().find(|f| f.id == file_id));
        Some(MeetupDetails {
            id: meetup.id,
            title: meetup.title.clone(),
            description: meetup.description.clone(),
            location: meetup.location.clone(),
            date: meetup.date,
            user_id: meetup.user_id,
            organizer_name: organizer.name.clone(),
            organizer_email: organizer.email.clone(),
            image_id: image.map(|f| f.id),
            image_name: image.map(|f| f.name.clone()),
            image_path: image.map(|f| f.path.clone()),
        })
    }

    fn meetup_date(&self, meetup_id: i32) -> Option<DateTime<Utc>> {
        self.meetups.iter().find(|m| m.id == meetup_id).map(|m| m.date)
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

/// The constraint errors Postgres reports for the schema in `migrations/`.
#[derive(Debug)]
pub struct ConstraintViolation {
    unique: bool,
    constraint: &'static str,
}

impl ConstraintViolation {
    pub fn foreign_key(constraint: &'static str) -> sqlx::Error {
        sqlx::Error::Database(Box::new(Self {
            unique: false,
            constraint,
        }))
    }

    pub fn unique(constraint: &'static str) -> sqlx::Error {
        sqlx::Error::Database(Box::new(Self {
            unique: true,
            constraint,
        }))
    }
}

impl fmt::Display for ConstraintViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "violates constraint \"{}\"", self.constraint)
    }
}

impl StdError for ConstraintViolation {}

impl DatabaseError for ConstraintViolation {
    fn message(&self) -> &str {
        self.constraint
    }

    fn constraint(&self) -> Option<&str> {
        Some(self.constraint)
    }

    fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
        self
    }

    fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
        self
    }

    fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
        self
    }

    fn kind(&self) -> ErrorKind {
        if self.unique {
            ErrorKind::UniqueViolation
        } else {
            ErrorKind::ForeignKeyViolation
        }
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&self, name: &str, email: &str) -> User {
        let mut tables = self.tables.lock().unwrap();
        let now = Utc::now();
        let user = User {
            id: tables.next_id(),
            name: name.to_string(),
            email: email.to_string(),
            password_hash: String::new(),
            created_at: now,
            updated_at: now,
        };
        tables.users.push(user.clone());
        user
    }

    pub fn add_file(&self, name: &str, path: &str) -> File {
        let mut tables = self.tables.lock().unwrap();
        let now = Utc::now();
        let file = File {
            id: tables.next_id(),
            name: name.to_string(),
            path: path.to_string(),
            created_at: now,
            updated_at: now,
        };
        tables.files.push(file.clone());
        file
    }

    /// Inserts a meetup without any date validation, so tests can seed
    /// meetups that are already past.
    pub fn add_meetup(&self, user_id: i32, title: &str, date: DateTime<Utc>) -> Meetup {
        let mut tables = self.tables.lock().unwrap();
        let now = Utc::now();
        let meetup = Meetup {
            id: tables.next_id(),
            title: title.to_string(),
            description: format!("{title} description"),
            location: "Main hall".to_string(),
            date,
            file_id: None,
            user_id,
            created_at: now,
            updated_at: now,
        };
        tables.meetups.push(meetup.clone());
        meetup
    }

    pub fn meetups(&self) -> Vec<Meetup> {
        self.tables.lock().unwrap().meetups.clone()
    }

    pub fn subscriptions(&self) -> Vec<Subscription> {
        self.tables.lock().unwrap().subscriptions.clone()
    }
}

impl Store for MemoryStore {
    async fn list_meetups(&self, filter: &Filter, page: Page) -> Result<Vec<MeetupDetails>, sqlx::Error> {
        let tables = self.tables.lock().unwrap();
        let mut meetups: Vec<&Meetup> = tables
            .meetups
            .iter()
            .filter(|m| match filter {
                Filter::All => true,
                Filter::Day(start, end) => m.date >= *start && m.date < *end,
                Filter::Organizer(user_id) => m.user_id == *user_id,
            })
            .collect();
        match filter {
            Filter::Organizer(_) => meetups.sort_by_key(|m| (m.date, m.id)),
            _ => meetups.sort_by_key(|m| m.id),
        }
        Ok(meetups
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit() as usize)
            .filter_map(|m| tables.details(m))
            .collect())
    }

    async fn find_meetup(&self, id: i32) -> Result<Option<Meetup>, sqlx::Error> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.meetups.iter().find(|m| m.id == id).cloned())
    }

    async fn find_meetup_details(&self, id: i32) -> Result<Option<MeetupDetails>, sqlx::Error> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .meetups
            .iter()
            .find(|m| m.id == id)
            .and_then(|m| tables.details(m)))
    }

    async fn create_meetup(&self, user_id: i32, fields: &MeetupFields) -> Result<Meetup, sqlx::Error> {
        let mut tables = self.tables.lock().unwrap();
        if !tables.files.iter().any(|f| f.id == fields.file_id) {
            return Err(ConstraintViolation::foreign_key("meetups_file_id_fkey"));
        }
        let now = Utc::now();
        let meetup = Meetup {
            id: tables.next_id(),
            title: fields.title.clone(),
            description: fields.description.clone(),
            location: fields.location.clone(),
            date: fields.date,
            file_id: Some(fields.file_id),
            user_id,
            created_at: now,
            updated_at: now,
        };
        tables.meetups.push(meetup.clone());
        Ok(meetup)
    }

    async fn update_meetup(
        &self,
        id: i32,
        user_id: i32,
        fields: &MeetupFields,
    ) -> Result<Meetup, sqlx::Error> {
        let mut tables = self.tables.lock().unwrap();
        if !tables.files.iter().any(|f| f.id == fields.file_id) {
            return Err(ConstraintViolation::foreign_key("meetups_file_id_fkey"));
        }
        let meetup = tables
            .meetups
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or(sqlx::Error::RowNotFound)?;
        meetup.title = fields.title.clone();
        meetup.description = fields.description.clone();
        meetup.location = fields.location.clone();
        meetup.date = fields.date;
        meetup.file_id = Some(fields.file_id);
        meetup.user_id = user_id;
        meetup.updated_at = Utc::now();
        Ok(meetup.clone())
    }

    async fn delete_meetup(&self, id: i32) -> Result<u64, sqlx::Error> {
        let mut tables = self.tables.lock().unwrap();
        let before = tables.meetups.len();
        tables.meetups.retain(|m| m.id != id);
        tables.subscriptions.retain(|s| s.meetup_id != id);
        Ok((before - tables.meetups.len()) as u64)
    }

    async fn find_user(&self, id: i32) -> Result<Option<User>, sqlx::Error> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.users.iter().find(|u| u.email == email).cloned())
    }

    async fn create_user(&self, name: &str, email: &str, password_hash: &str) -> Result<User, sqlx::Error> {
        let mut tables = self.tables.lock().unwrap();
        if tables.users.iter().any(|u| u.email == email) {
            return Err(ConstraintViolation::unique("users_email_key"));
        }
        let now = Utc::now();
        let user = User {
            id: tables.next_id(),
            name: name.to_string(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            created_at: now,
            updated_at: now,
        };
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn upcoming_subscriptions(
        &self,
        user_id: i32,
        now: DateTime<Utc>,
    ) -> Result<Vec<SubscriptionDetails>, sqlx::Error> {
        let tables = self.tables.lock().unwrap();
        let mut upcoming: Vec<SubscriptionDetails> = tables
            .subscriptions
            .iter()
            .filter(|s| s.user_id == user_id)
            .filter_map(|s| {
                let meetup = tables.meetups.iter().find(|m| m.id == s.meetup_id)?;
                Some(SubscriptionDetails {
                    subscription_id: s.id,
                    meetup: tables.details(meetup)?,
                })
            })
            .filter(|s| s.meetup.date > now)
            .collect();
        upcoming.sort_by_key(|s| (s.meetup.date, s.subscription_id));
        Ok(upcoming)
    }

    async fn find_subscription_at(
        &self,
        user_id: i32,
        date: DateTime<Utc>,
    ) -> Result<Option<Subscription>, sqlx::Error> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .subscriptions
            .iter()
            .find(|s| s.user_id == user_id && tables.meetup_date(s.meetup_id) == Some(date))
            .cloned())
    }

    async fn find_subscription(&self, id: i32) -> Result<Option<Subscription>, sqlx::Error> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.subscriptions.iter().find(|s| s.id == id).cloned())
    }

    async fn create_subscription(&self, user_id: i32, meetup_id: i32) -> Result<Subscription, sqlx::Error> {
        let mut tables = self.tables.lock().unwrap();
        if tables
            .subscriptions
            .iter()
            .any(|s| s.user_id == user_id && s.meetup_id == meetup_id)
        {
            return Err(ConstraintViolation::unique("subscriptions_user_id_meetup_id_key"));
        }
        let now = Utc::now();
        let subscription = Subscription {
            id: tables.next_id(),
            user_id,
            meetup_id,
            created_at: now,
            updated_at: now,
        };
        tables.subscriptions.push(subscription.clone());
        Ok(subscription)
    }

    async fn delete_subscription(&self, id: i32) -> Result<u64, sqlx::Error> {
        let mut tables = self.tables.lock().unwrap();
        let before = tables.subscriptions.len();
        tables.subscriptions.retain(|s| s.id != id);
        Ok((before - tables.subscriptions.len()) as u64)
    }
}
