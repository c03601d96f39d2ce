//! In-process job queue. Handlers enqueue jobs and return at once; a single
//! worker task drains the channel and runs each job by key.

use derive_more::Display;
use log::{error, info, warn};
use serde::Serialize;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use uuid::Uuid;

use super::{
    jobs::SubscriptionMail,
    mail::{MailError, MailTransport},
};

#[derive(Debug, Clone)]
pub struct Job {
    pub id: Uuid,
    pub key: String,
    pub payload: serde_json::Value,
}

#[derive(Debug, Display)]
pub enum QueueError {
    #[display(fmt = "job payload could not be encoded: {}", _0)]
    Encode(serde_json::Error),

    #[display(fmt = "job worker is not running")]
    Closed,
}

impl std::error::Error for QueueError {}

#[derive(Debug, Display)]
pub enum JobError {
    #[display(fmt = "no handler for job key '{}'", _0)]
    UnknownKey(String),

    #[display(fmt = "invalid job payload: {}", _0)]
    Payload(serde_json::Error),

    #[display(fmt = "{}", _0)]
    Mail(MailError),
}

impl std::error::Error for JobError {}

impl From<serde_json::Error> for JobError {
    fn from(err: serde_json::Error) -> Self {
        JobError::Payload(err)
    }
}

impl From<MailError> for JobError {
    fn from(err: MailError) -> Self {
        JobError::Mail(err)
    }
}

#[derive(Debug, Clone)]
pub struct JobQueue {
    sender: UnboundedSender<Job>,
}

impl JobQueue {
    pub fn new() -> (Self, UnboundedReceiver<Job>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    pub fn enqueue<T: Serialize>(&self, key: &str, payload: &T) -> Result<Uuid, QueueError> {
        let job = Job {
            id: Uuid::new_v4(),
            key: key.to_string(),
            payload: serde_json::to_value(payload).map_err(QueueError::Encode)?,
        };
        let id = job.id;
        self.sender.send(job).map_err(|_| QueueError::Closed)?;
        info!("job {} '{}' enqueued", id, key);
        Ok(id)
    }
}

pub async fn run_worker<M: MailTransport>(mut jobs: UnboundedReceiver<Job>, mailer: M) {
    info!("job worker started");
    while let Some(job) = jobs.recv().await {
        match process(&job, &mailer).await {
            Ok(()) => info!("job {} '{}' done", job.id, job.key),
            Err(err) => error!("job {} '{}' failed: {}", job.id, job.key, err),
        }
    }
    warn!("job queue closed, worker stopping");
}

pub async fn process<M: MailTransport>(job: &Job, mailer: &M) -> Result<(), JobError> {
    match job.key.as_str() {
        SubscriptionMail::KEY => SubscriptionMail::handle(&job.payload, mailer).await,
        other => Err(JobError::UnknownKey(other.to_string())),
    }
}
