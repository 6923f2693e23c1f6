//! The job entity and its state machine.

pub mod status;
pub mod store;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::processor::DocumentKind;
use crate::sanitize;

pub use status::JobStatus;
pub use store::JobStore;

/// Upper bound on the stored `error_detail`.
pub const MAX_ERROR_DETAIL_CHARS: usize = 200;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid job transition for '{job_id}': {from} -> {to}")]
pub struct TransitionError {
    pub job_id: String,
    pub from: JobStatus,
    pub to: JobStatus,
}

/// Results written onto a job when it succeeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobOutcome {
    pub title: String,
    pub summary: String,
    pub original_text: String,
    pub input_truncated: bool,
}

/// One document-summarization request and its lifecycle state.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub id: String,
    pub owner_id: String,
    pub status: JobStatus,
    pub input_ref: String,
    pub input_kind: DocumentKind,
    pub result_title: Option<String>,
    pub result_summary: Option<String>,
    pub result_original_text: Option<String>,
    /// Set when the summarizer only saw a prefix of the extracted text.
    pub input_truncated: bool,
    pub error_detail: Option<String>,
    /// How many times a worker moved this job into `Running`.
    pub attempts: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Job {
    /// Creates a new pending job.
    pub fn new(id: String, owner_id: String, input_ref: String, input_kind: DocumentKind) -> Self {
        let now = Utc::now();
        Self {
            id,
            owner_id,
            status: JobStatus::Pending,
            input_ref,
            input_kind,
            result_title: None,
            result_summary: None,
            result_original_text: None,
            input_truncated: false,
            error_detail: None,
            attempts: 0,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    /// Generates a fresh opaque job identifier.
    pub fn new_id() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    /// Acquires the job for processing.
    pub fn start(&mut self) -> Result<(), TransitionError> {
        self.transition(JobStatus::Running)?;
        self.attempts += 1;
        Ok(())
    }

    pub fn succeed(&mut self, outcome: JobOutcome) -> Result<(), TransitionError> {
        self.transition(JobStatus::Succeeded)?;
        self.result_title = Some(outcome.title);
        self.result_summary = Some(outcome.summary);
        self.result_original_text = Some(outcome.original_text);
        self.input_truncated = outcome.input_truncated;
        self.error_detail = None;
        self.completed_at = Some(self.updated_at);
        Ok(())
    }

    /// Marks the job failed. `detail` is what the owner sees, so it must
    /// already be free of internal information; it is also length-bounded.
    pub fn fail(&mut self, detail: &str) -> Result<(), TransitionError> {
        self.transition(JobStatus::Failed)?;
        self.result_title = None;
        self.result_summary = None;
        self.result_original_text = None;
        self.error_detail = Some(sanitize::bound_detail(detail, MAX_ERROR_DETAIL_CHARS));
        self.completed_at = Some(self.updated_at);
        Ok(())
    }

    fn transition(&mut self, next: JobStatus) -> Result<(), TransitionError> {
        if !self.status.can_transition_to(next) {
            return Err(TransitionError {
                job_id: self.id.clone(),
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        self.updated_at = Utc::now();
        Ok(())
    }
}
