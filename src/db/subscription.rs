use chrono::{DateTime, Utc};

use crate::{
    models::{Subscription, SubscriptionDetails},
    PGPool,
};

use super::meetup::{DETAILS_COLUMNS, DETAILS_JOINS};

pub async fn upcoming(
    user_id: i32,
    now: DateTime<Utc>,
    pool: &PGPool,
) -> Result<Vec<SubscriptionDetails>, sqlx::Error> {
    let sql = format!(
        "SELECT s.id AS subscription_id, {DETAILS_COLUMNS}
        FROM subscriptions s
        JOIN meetups m ON m.id = s.meetup_id
        {DETAILS_JOINS}
        WHERE s.user_id = $1 AND m.date > $2
        ORDER BY m.date, s.id"
    );
    sqlx::query_as::<_, SubscriptionDetails>(&sql)
        .bind(user_id)
        .bind(now)
        .fetch_all(pool)
        .await
}

/// Any subscription of `user_id` whose meetup happens exactly at `date`.
pub async fn get_at(
    user_id: i32,
    date: DateTime<Utc>,
    pool: &PGPool,
) -> Result<Option<Subscription>, sqlx::Error> {
    sqlx::query_as::<_, Subscription>(
        "SELECT s.* FROM subscriptions s
        JOIN meetups m ON m.id = s.meetup_id
        WHERE s.user_id = $1 AND m.date = $2
        ORDER BY s.id
        LIMIT 1",
    )
    .bind(user_id)
    .bind(date)
    .fetch_optional(pool)
    .await
}

pub async fn get_by_id(id: i32, pool: &PGPool) -> Result<Option<Subscription>, sqlx::Error> {
    sqlx::query_as::<_, Subscription>("SELECT * FROM subscriptions WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn create(user_id: i32, meetup_id: i32, pool: &PGPool) -> Result<Subscription, sqlx::Error> {
    sqlx::query_as::<_, Subscription>(
        "INSERT INTO subscriptions (user_id, meetup_id) VALUES ($1, $2) RETURNING *",
    )
    .bind(user_id)
    .bind(meetup_id)
    .fetch_one(pool)
    .await
}

pub async fn delete(id: i32, pool: &PGPool) -> Result<u64, sqlx::Error> {
    let res = sqlx::query("DELETE FROM subscriptions WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(res.rows_affected())
}
