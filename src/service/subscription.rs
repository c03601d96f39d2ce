use chrono::{DateTime, Utc};
use log::{info, warn};

use super::{
    jobs::{SubscriptionMail, SubscriptionMailPayload},
    queue::JobQueue,
};
use crate::{
    db::Store,
    dto::SubscriptionView,
    errors::AppError,
    models::{self, Subscription},
};

pub async fn list<S: Store>(
    store: &S,
    user_id: i32,
    app_url: &str,
    now: DateTime<Utc>,
) -> Result<Vec<SubscriptionView>, AppError> {
    let subscriptions = store.upcoming_subscriptions(user_id, now).await?;
    Ok(subscriptions
        .into_iter()
        .map(|details| SubscriptionView::new(details, app_url))
        .collect())
}

/// The checks and the insert are separate statements, so two concurrent
/// calls for the same user and time can both succeed. A concurrent duplicate
/// of the same subscription is stopped by the unique index instead.
pub async fn subscribe<S: Store>(
    store: &S,
    queue: &JobQueue,
    user_id: i32,
    meetup_id: i32,
    now: DateTime<Utc>,
) -> Result<Subscription, AppError> {
    let user = store.find_user(user_id).await?.ok_or(AppError::UserNotFound)?;
    let meetup = store
        .find_meetup_details(meetup_id)
        .await?
        .ok_or(AppError::SubscriptionTargetMissing)?;

    if meetup.user_id == user.id {
        return Err(AppError::OwnMeetup);
    }
    if models::is_past(meetup.date, now) {
        return Err(AppError::PastMeetupSubscription);
    }
    if let Some(existing) = store.find_subscription_at(user.id, meetup.date).await? {
        return Err(if existing.meetup_id == meetup.id {
            AppError::AlreadySubscribed
        } else {
            AppError::ScheduleConflict
        });
    }

    let subscription = store
        .create_subscription(user.id, meetup.id)
        .await
        .map_err(|err| AppError::on_duplicate(err, AppError::AlreadySubscribed))?;
    info!("user {} subscribed to meetup {}", user.id, meetup.id);

    let payload = SubscriptionMailPayload { meetup, user };
    if let Err(err) = queue.enqueue(SubscriptionMail::KEY, &payload) {
        warn!("subscription {} mail not enqueued: {}", subscription.id, err);
    }
    Ok(subscription)
}

pub async fn unsubscribe<S: Store>(store: &S, user_id: i32, id: i32) -> Result<Subscription, AppError> {
    let subscription = store
        .find_subscription(id)
        .await?
        .filter(|subscription| subscription.user_id == user_id)
        .ok_or(AppError::SubscriptionNotOwned)?;
    store.delete_subscription(subscription.id).await?;
    info!("user {} cancelled subscription {}", user_id, subscription.id);
    Ok(subscription)
}
