pub mod meetup;
pub mod subscription;
pub mod user;
#[cfg(test)]
pub mod memory;

use chrono::{DateTime, Utc};
use log::info;
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;

use crate::{
    dto::{MeetupFields, Page},
    models::{Meetup, MeetupDetails, Subscription, SubscriptionDetails, User},
    PGPool,
};

pub use meetup::Filter;

pub async fn init_db_pool(db_url: &str) -> Result<PGPool, sqlx::Error> {
    let pool: PGPool = PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(5))
        .connect(db_url)
        .await?;
    info!("connected to postgresql");
    Ok(pool)
}

pub async fn run_migrations(pool: &PGPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    info!("database migrations applied");
    Ok(())
}

/// Persistence interface used by the services. Every association a service
/// needs is an explicit query here.
#[allow(async_fn_in_trait)]
pub trait Store {
    async fn list_meetups(&self, filter: &Filter, page: Page) -> Result<Vec<MeetupDetails>, sqlx::Error>;

    async fn find_meetup(&self, id: i32) -> Result<Option<Meetup>, sqlx::Error>;

    /// meetup joined with its organizer and image
    async fn find_meetup_details(&self, id: i32) -> Result<Option<MeetupDetails>, sqlx::Error>;

    async fn create_meetup(&self, user_id: i32, fields: &MeetupFields) -> Result<Meetup, sqlx::Error>;

    async fn update_meetup(
        &self,
        id: i32,
        user_id: i32,
        fields: &MeetupFields,
    ) -> Result<Meetup, sqlx::Error>;

    async fn delete_meetup(&self, id: i32) -> Result<u64, sqlx::Error>;

    async fn find_user(&self, id: i32) -> Result<Option<User>, sqlx::Error>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error>;

    async fn create_user(&self, name: &str, email: &str, password_hash: &str) -> Result<User, sqlx::Error>;

    /// subscriptions of `user_id` whose meetup is after `now`, by meetup date
    async fn upcoming_subscriptions(
        &self,
        user_id: i32,
        now: DateTime<Utc>,
    ) -> Result<Vec<SubscriptionDetails>, sqlx::Error>;

    async fn find_subscription_at(
        &self,
        user_id: i32,
        date: DateTime<Utc>,
    ) -> Result<Option<Subscription>, sqlx::Error>;

    async fn find_subscription(&self, id: i32) -> Result<Option<Subscription>, sqlx::Error>;

    async fn create_subscription(&self, user_id: i32, meetup_id: i32) -> Result<Subscription, sqlx::Error>;

    async fn delete_subscription(&self, id: i32) -> Result<u64, sqlx::Error>;
}

impl Store for PGPool {
    async fn list_meetups(&self, filter: &Filter, page: Page) -> Result<Vec<MeetupDetails>, sqlx::Error> {
        meetup::filter(filter, page, self).await
    }

    async fn find_meetup(&self, id: i32) -> Result<Option<Meetup>, sqlx::Error> {
        meetup::get_by_id(id, self).await
    }

    async fn find_meetup_details(&self, id: i32) -> Result<Option<MeetupDetails>, sqlx::Error> {
        meetup::get_details(id, self).await
    }

    async fn create_meetup(&self, user_id: i32, fields: &MeetupFields) -> Result<Meetup, sqlx::Error> {
        meetup::create(user_id, fields, self).await
    }

    async fn update_meetup(
        &self,
        id: i32,
        user_id: i32,
        fields: &MeetupFields,
    ) -> Result<Meetup, sqlx::Error> {
        meetup::set_fields(id, user_id, fields, self).await
    }

    async fn delete_meetup(&self, id: i32) -> Result<u64, sqlx::Error> {
        meetup::delete(id, self).await
    }

    async fn find_user(&self, id: i32) -> Result<Option<User>, sqlx::Error> {
        user::get_by_id(id, self).await
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error> {
        user::get_by_email(email, self).await
    }

    async fn create_user(&self, name: &str, email: &str, password_hash: &str) -> Result<User, sqlx::Error> {
        user::create(name, email, password_hash, self).await
    }

    async fn upcoming_subscriptions(
        &self,
        user_id: i32,
        now: DateTime<Utc>,
    ) -> Result<Vec<SubscriptionDetails>, sqlx::Error> {
        subscription::upcoming(user_id, now, self).await
    }

    async fn find_subscription_at(
        &self,
        user_id: i32,
        date: DateTime<Utc>,
    ) -> Result<Option<Subscription>, sqlx::Error> {
        subscription::get_at(user_id, date, self).await
    }

    async fn find_subscription(&self, id: i32) -> Result<Option<Subscription>, sqlx::Error> {
        subscription::get_by_id(id, self).await
    }

    async fn create_subscription(&self, user_id: i32, meetup_id: i32) -> Result<Subscription, sqlx::Error> {
        subscription::create(user_id, meetup_id, self).await
    }

    async fn delete_subscription(&self, id: i32) -> Result<u64, sqlx::Error> {
        subscription::delete(id, self).await
    }
}
