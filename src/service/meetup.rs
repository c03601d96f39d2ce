use chrono::{DateTime, TimeZone, Utc};
use log::info;

use super::schedule;
use crate::{
    db::{Filter, Store},
    dto::{MeetupListQuery, MeetupPayload, MeetupRecord, MeetupView, Page},
    errors::AppError,
    models::Meetup,
};

/// Meetups of the day named by `query.date`, interpreted in `tz`, or every
/// meetup when no date is given.
pub async fn list<S: Store, Tz: TimeZone>(
    store: &S,
    query: MeetupListQuery,
    tz: &Tz,
    app_url: &str,
    now: DateTime<Utc>,
) -> Result<Vec<MeetupView>, AppError> {
    let filter = match query.date.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
        Some(raw) => {
            let day = schedule::parse_day(raw).ok_or(AppError::ValidationError)?;
            let (start, end) = schedule::day_bounds(day, tz);
            Filter::Day(start, end)
        }
        None => Filter::All,
    };
    let meetups = store.list_meetups(&filter, Page::new(query.page)).await?;
    Ok(meetups
        .into_iter()
        .map(|details| MeetupView::new(details, app_url, now))
        .collect())
}

pub async fn list_organizing<S: Store>(
    store: &S,
    user_id: i32,
    page: Page,
    app_url: &str,
    now: DateTime<Utc>,
) -> Result<Vec<MeetupView>, AppError> {
    let meetups = store.list_meetups(&Filter::Organizer(user_id), page).await?;
    Ok(meetups
        .into_iter()
        .map(|details| MeetupView::new(details, app_url, now))
        .collect())
}

pub async fn create<S: Store>(
    store: &S,
    user_id: i32,
    payload: MeetupPayload,
    now: DateTime<Utc>,
) -> Result<MeetupRecord, AppError> {
    let fields = payload.validate()?;
    if !schedule::is_schedulable(fields.date, now) {
        return Err(AppError::InvalidDate);
    }
    let meetup = store.create_meetup(user_id, &fields).await?;
    info!("user {} created meetup {}", user_id, meetup.id);
    Ok(MeetupRecord::new(meetup, now))
}

/// Loads meetup `id` and checks that `user_id` organizes it.
async fn owned_meetup<S: Store>(store: &S, user_id: i32, id: i32) -> Result<Meetup, AppError> {
    let meetup = store.find_meetup(id).await?.ok_or(AppError::MeetupNotFound)?;
    if meetup.user_id != user_id {
        return Err(AppError::NotOwner);
    }
    Ok(meetup)
}

pub async fn update<S: Store>(
    store: &S,
    user_id: i32,
    id: i32,
    payload: MeetupPayload,
    now: DateTime<Utc>,
) -> Result<MeetupRecord, AppError> {
    let fields = payload.validate()?;
    let meetup = owned_meetup(store, user_id, id).await?;
    if meetup.is_past(now) {
        return Err(AppError::PastMeetupUpdate);
    }
    if !schedule::is_schedulable(fields.date, now) {
        return Err(AppError::InvalidDate);
    }
    let meetup = store.update_meetup(meetup.id, user_id, &fields).await?;
    info!("user {} updated meetup {}", user_id, meetup.id);
    Ok(MeetupRecord::new(meetup, now))
}

pub async fn delete<S: Store>(store: &S, user_id: i32, id: i32) -> Result<(), AppError> {
    let meetup = owned_meetup(store, user_id, id).await?;
    store.delete_meetup(meetup.id).await?;
    info!("user {} deleted meetup {}", user_id, meetup.id);
    Ok(())
}
