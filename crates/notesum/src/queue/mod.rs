//! Durable, at-least-once delivery of job identifiers.
//!
//! The queue carries ids only; job state lives in the job store. A delivery
//! that is not acknowledged within the visibility timeout is handed out
//! again, so consumers must tolerate seeing the same id more than once.

pub mod sqlite;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;

use crate::db::DatabaseError;

pub use sqlite::SqliteQueue;

#[derive(Error, Debug)]
pub enum QueueError {
    /// Temporary condition; the same call may succeed later.
    #[error("queue unavailable: {0}")]
    Unavailable(String),

    #[error("queue storage error: {0}")]
    Database(DatabaseError),
}

impl QueueError {
    pub fn is_transient(&self) -> bool {
        matches!(self, QueueError::Unavailable(_))
    }
}

impl From<DatabaseError> for QueueError {
    fn from(err: DatabaseError) -> Self {
        if err.is_transient() {
            QueueError::Unavailable(err.to_string())
        } else {
            QueueError::Database(err)
        }
    }
}

impl From<rusqlite::Error> for QueueError {
    fn from(err: rusqlite::Error) -> Self {
        DatabaseError::from(err).into()
    }
}

/// One claimed message. Only the holder of the current `receipt` can
/// acknowledge it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub message_id: i64,
    pub job_id: String,
    pub receipt: String,
    /// 1 on first delivery, incremented on every redelivery.
    pub delivery_count: u32,
}

/// Cooperative stop flag shared between the pool, its workers, and signal
/// handlers.
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal {
    flag: Arc<AtomicBool>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_triggered(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

pub trait JobQueue: Send + Sync {
    fn enqueue(&self, job_id: &str) -> Result<(), QueueError>;

    /// Claims the oldest visible message without waiting.
    fn try_dequeue(&self) -> Result<Option<Delivery>, QueueError>;

    /// Blocks until a message can be claimed. Returns `None` once `shutdown`
    /// is triggered.
    fn dequeue(&self, shutdown: &ShutdownSignal) -> Result<Option<Delivery>, QueueError>;

    /// Removes the message. Returns `false` when the receipt is stale, i.e.
    /// the message was redelivered or already acknowledged.
    fn ack(&self, delivery: &Delivery) -> Result<bool, QueueError>;

    /// Messages not yet acknowledged, visible or in flight.
    fn depth(&self) -> Result<u64, QueueError>;
}
