use chrono::{DateTime, Utc};
use sqlx::{Postgres, QueryBuilder};

use crate::{
    dto::{MeetupFields, Page},
    models::{Meetup, MeetupDetails},
    PGPool,
};

pub enum Filter {
    All,
    /// `[start, end)`
    Day(DateTime<Utc>, DateTime<Utc>),
    Organizer(i32),
}

pub(super) const DETAILS_COLUMNS: &str = "m.id, m.title, m.description, m.location, m.date, m.user_id, \
    u.name AS organizer_name, u.email AS organizer_email, \
    f.id AS image_id, f.name AS image_name, f.path AS image_path";

pub(super) const DETAILS_JOINS: &str = "JOIN users u ON u.id = m.user_id \
    LEFT JOIN files f ON f.id = m.file_id";

/// Organizer listings are ordered by date, everything else by id.
pub async fn filter(filter: &Filter, page: Page, pool: &PGPool) -> Result<Vec<MeetupDetails>, sqlx::Error> {
    let mut query_builder: QueryBuilder<Postgres> = QueryBuilder::new(format!(
        "SELECT {DETAILS_COLUMNS} FROM meetups m {DETAILS_JOINS}"
    ));
    match filter {
        Filter::All => {
            query_builder.push(" ORDER BY m.id");
        }
        Filter::Day(start, end) => {
            query_builder
                .push(" WHERE m.date >= ")
                .push_bind(*start)
                .push(" AND m.date < ")
                .push_bind(*end)
                .push(" ORDER BY m.id");
        }
        Filter::Organizer(user_id) => {
            query_builder
                .push(" WHERE m.user_id = ")
                .push_bind(*user_id)
                .push(" ORDER BY m.date, m.id");
        }
    }
    query_builder
        .push(" LIMIT ")
        .push_bind(page.limit())
        .push(" OFFSET ")
        .push_bind(page.offset());

    query_builder
        .build_query_as::<MeetupDetails>()
        .fetch_all(pool)
        .await
}

pub async fn get_by_id(id: i32, pool: &PGPool) -> Result<Option<Meetup>, sqlx::Error> {
    sqlx::query_as::<_, Meetup>("SELECT * FROM meetups WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn get_details(id: i32, pool: &PGPool) -> Result<Option<MeetupDetails>, sqlx::Error> {
    let sql = format!("SELECT {DETAILS_COLUMNS} FROM meetups m {DETAILS_JOINS} WHERE m.id = $1");
    sqlx::query_as::<_, MeetupDetails>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn create(user_id: i32, fields: &MeetupFields, pool: &PGPool) -> Result<Meetup, sqlx::Error> {
    sqlx::query_as::<_, Meetup>(
        "INSERT INTO meetups (title, description, location, date, file_id, user_id)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *",
    )
    .bind(&fields.title)
    .bind(&fields.description)
    .bind(&fields.location)
    .bind(fields.date)
    .bind(fields.file_id)
    .bind(user_id)
    .fetch_one(pool)
    .await
}

pub async fn set_fields(
    id: i32,
    user_id: i32,
    fields: &MeetupFields,
    pool: &PGPool,
) -> Result<Meetup, sqlx::Error> {
    sqlx::query_as::<_, Meetup>(
        "UPDATE meetups
        SET title = $1, description = $2, location = $3, date = $4, file_id = $5,
            user_id = $6, updated_at = NOW()
        WHERE id = $7
        RETURNING *",
    )
    .bind(&fields.title)
    .bind(&fields.description)
    .bind(&fields.location)
    .bind(fields.date)
    .bind(fields.file_id)
    .bind(user_id)
    .bind(id)
    .fetch_one(pool)
    .await
}

pub async fn delete(id: i32, pool: &PGPool) -> Result<u64, sqlx::Error> {
    let res = sqlx::query("DELETE FROM meetups WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(res.rows_affected())
}
