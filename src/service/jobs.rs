use serde::{Deserialize, Serialize};

use super::{
    mail::{Mail, MailTransport},
    queue::JobError,
};
use crate::models::{MeetupDetails, User};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionMailPayload {
    pub meetup: MeetupDetails,
    pub user: User,
}

/// Tells the organizer that someone subscribed to their meetup.
pub struct SubscriptionMail;

impl SubscriptionMail {
    pub const KEY: &'static str = "SubscriptionMail";

    pub fn build(payload: &SubscriptionMailPayload) -> Mail {
        let SubscriptionMailPayload { meetup, user } = payload;
        Mail {
            to: format!("{} <{}>", meetup.organizer_name, meetup.organizer_email),
            subject: format!("New subscription to {}", meetup.title),
            text: format!(
                "Hello {},\n\n\
                {} <{}> has just subscribed to your meetup \"{}\",\n\
                taking place at {} on {}.\n",
                meetup.organizer_name,
                user.name,
                user.email,
                meetup.title,
                meetup.location,
                meetup.date.format("%Y-%m-%d %H:%M UTC"),
            ),
        }
    }

    pub async fn handle<M: MailTransport>(payload: &serde_json::Value, mailer: &M) -> Result<(), JobError> {
        let payload: SubscriptionMailPayload = serde_json::from_value(payload.clone())?;
        mailer.send(&Self::build(&payload)).await?;
        Ok(())
    }
}
