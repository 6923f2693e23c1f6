//! Front door for callers: accepts documents, hands back job ids, and
//! answers status queries. Nothing here extracts or summarizes; that is the
//! workers' job.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{error, info, warn};
use serde::Serialize;
use thiserror::Error;

use crate::config::QueueConfig;
use crate::db::DatabaseError;
use crate::error::StorageError;
use crate::job::{Job, JobStatus, JobStore};
use crate::processor::DocumentKind;
use crate::queue::{JobQueue, QueueError};
use crate::storage::DocumentStorage;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("job not found")]
    NotFound,

    #[error("no authenticated principal")]
    Unauthenticated,

    #[error("no document supplied")]
    MissingDocument,

    #[error("unsupported document kind; expected PDF or UTF-8 text")]
    UnsupportedKind,

    #[error("job queue unavailable: {0}")]
    QueueUnavailable(String),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// A document as received from the caller.
#[derive(Debug, Clone, Default)]
pub struct Upload {
    pub bytes: Vec<u8>,
    pub filename: Option<String>,
    pub declared_kind: Option<DocumentKind>,
}

impl Upload {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            ..Self::default()
        }
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn with_kind(mut self, kind: DocumentKind) -> Self {
        self.declared_kind = Some(kind);
        self
    }
}

/// How hard `submit` tries to enqueue before giving up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub retries: u32,
    /// Delay before the first retry; doubles on each further one.
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &QueueConfig) -> Self {
        Self {
            retries: config.submit_retries,
            backoff: Duration::from_millis(config.submit_backoff_ms),
        }
    }

    fn delay(&self, attempt: u32) -> Duration {
        self.backoff.saturating_mul(2u32.saturating_pow(attempt))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&QueueConfig::default())
    }
}

/// What an owner sees of one job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobView {
    pub id: String,
    pub status: JobStatus,
    pub title: Option<String>,
    pub summary: Option<String>,
    pub original_text: Option<String>,
    pub input_truncated: bool,
    pub error_detail: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&Job> for JobView {
    fn from(job: &Job) -> Self {
        Self {
            id: job.id.clone(),
            status: job.status,
            title: job.result_title.clone(),
            summary: job.result_summary.clone(),
            original_text: job.result_original_text.clone(),
            input_truncated: job.input_truncated,
            error_detail: job.error_detail.clone(),
            created_at: job.created_at,
        }
    }
}

#[derive(Clone)]
pub struct SubmissionService {
    store: JobStore,
    queue: Arc<dyn JobQueue>,
    storage: DocumentStorage,
    retry: RetryPolicy,
}

impl SubmissionService {
    pub fn new(
        store: JobStore,
        queue: Arc<dyn JobQueue>,
        storage: DocumentStorage,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            store,
            queue,
            storage,
            retry,
        }
    }

    /// Registers a document for summarization and returns its job id. The
    /// job is `Pending` and enqueued when this returns.
    pub fn submit(&self, upload: Upload, owner_id: &str) -> Result<String, ServiceError> {
        if owner_id.trim().is_empty() {
            return Err(ServiceError::Unauthenticated);
        }
        if upload.bytes.is_empty() {
            return Err(ServiceError::MissingDocument);
        }
        let kind = DocumentKind::resolve(
            upload.declared_kind,
            upload.filename.as_deref(),
            &upload.bytes,
        )
        .ok_or(ServiceError::UnsupportedKind)?;

        let job_id = Job::new_id();
        let input_ref = self.storage.put(&job_id, kind, &upload.bytes)?;

        let job = Job::new(job_id.clone(), owner_id.to_string(), input_ref, kind);
        if let Err(e) = self.store.create(&job) {
            self.remove_document(&job.input_ref);
            return Err(e.into());
        }

        if let Err(e) = self.enqueue_with_retry(&job_id) {
            error!("Giving up on enqueueing job {}: {}", job_id, e);
            self.rollback(&job);
            return Err(ServiceError::QueueUnavailable(e.to_string()));
        }

        info!("Accepted job {} ({}) for {}", job_id, kind, owner_id);
        Ok(job_id)
    }

    /// The job, if it exists and belongs to `owner_id`. A job owned by
    /// someone else is indistinguishable from a missing one.
    pub fn get_status(&self, job_id: &str, owner_id: &str) -> Result<Job, ServiceError> {
        if owner_id.trim().is_empty() {
            return Err(ServiceError::Unauthenticated);
        }
        self.store
            .get_for_owner(job_id, owner_id)?
            .ok_or(ServiceError::NotFound)
    }

    /// The owner's jobs, newest first.
    pub fn list_jobs(&self, owner_id: &str) -> Result<Vec<JobView>, ServiceError> {
        if owner_id.trim().is_empty() {
            return Err(ServiceError::Unauthenticated);
        }
        let jobs = self.store.list_for_owner(owner_id)?;
        Ok(jobs.iter().map(JobView::from).collect())
    }

    fn enqueue_with_retry(&self, job_id: &str) -> Result<(), QueueError> {
        let mut attempt = 0;
        loop {
            match self.queue.enqueue(job_id) {
                Ok(()) => return Ok(()),
                Err(e) if e.is_transient() && attempt < self.retry.retries => {
                    let delay = self.retry.delay(attempt);
                    warn!(
                        "Enqueue of job {} failed (attempt {}), retrying in {:?}: {}",
                        job_id,
                        attempt + 1,
                        delay,
                        e
                    );
                    thread::sleep(delay);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn rollback(&self, job: &Job) {
        match self.store.discard(&job.id) {
            Ok(true) => {}
            Ok(false) => warn!("Job {} was no longer pending during rollback", job.id),
            Err(e) => error!("Failed to discard job {}: {}", job.id, e),
        }
        self.remove_document(&job.input_ref);
    }

    fn remove_document(&self, input_ref: &str) {
        if let Err(e) = self.storage.remove(input_ref) {
            error!("Failed to remove document {}: {}", input_ref, e);
        }
    }
}
