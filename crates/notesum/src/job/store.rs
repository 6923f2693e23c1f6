//! Durable job records.
//!
//! `JobStore` is the single source of truth for job state. It maps between
//! the typed [`Job`] and the raw rows of `db::job_repo`.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::db::job_repo::{self, JobRow};
use crate::db::{Database, DatabaseError};
use crate::processor::DocumentKind;

use super::{Job, JobStatus};

#[derive(Clone)]
pub struct JobStore {
    db: Database,
}

impl JobStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Persists a freshly created job.
    pub fn create(&self, job: &Job) -> Result<(), DatabaseError> {
        job_repo::insert(&self.db, &to_row(job))
    }

    pub fn get(&self, id: &str) -> Result<Option<Job>, DatabaseError> {
        job_repo::find_by_id(&self.db, id)?.map(from_row).transpose()
    }

    /// Looks a job up on behalf of `owner_id`. A job that exists but belongs
    /// to someone else is reported exactly like a missing one.
    pub fn get_for_owner(&self, id: &str, owner_id: &str) -> Result<Option<Job>, DatabaseError> {
        job_repo::find_for_owner(&self.db, id, owner_id)?
            .map(from_row)
            .transpose()
    }

    pub fn list_for_owner(&self, owner_id: &str) -> Result<Vec<Job>, DatabaseError> {
        job_repo::list_by_owner(&self.db, owner_id)?
            .into_iter()
            .map(from_row)
            .collect()
    }

    /// Records a job that [`Job::start`] just moved to `Running`. The write
    /// only lands if nobody else acquired the row since it was read, which
    /// makes the caller the sole lease holder for this attempt.
    pub fn acquire(&self, job: &Job) -> Result<bool, DatabaseError> {
        self.write(job, job.attempts.saturating_sub(1))
    }

    /// Writes the full row on behalf of the current lease holder. Returns
    /// `false` without writing anything when the stored row is terminal,
    /// gone, or was re-acquired by another worker.
    pub fn save(&self, job: &Job) -> Result<bool, DatabaseError> {
        self.write(job, job.attempts)
    }

    fn write(&self, job: &Job, expected_attempts: u32) -> Result<bool, DatabaseError> {
        let applied =
            job_repo::update_unless_terminal(&self.db, &to_row(job), expected_attempts)?;
        if !applied {
            log::debug!(
                "Skipped write of job {} as {} (attempt {}): stored row is terminal, missing or re-acquired",
                job.id,
                job.status,
                job.attempts
            );
        }
        Ok(applied)
    }

    /// Removes a job that was never handed to a worker.
    pub fn discard(&self, id: &str) -> Result<bool, DatabaseError> {
        job_repo::delete_pending(&self.db, id)
    }

    pub fn count_by_status(&self, status: JobStatus) -> Result<u64, DatabaseError> {
        job_repo::count_by_status(&self.db, status.as_str())
    }
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_timestamp(id: &str, value: &str) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| DatabaseError::CorruptRow {
            id: id.to_string(),
            reason: format!("bad timestamp '{}': {}", value, e),
        })
}

fn to_row(job: &Job) -> JobRow {
    JobRow {
        id: job.id.clone(),
        owner_id: job.owner_id.clone(),
        status: job.status.as_str().to_string(),
        input_ref: job.input_ref.clone(),
        input_kind: job.input_kind.as_str().to_string(),
        result_title: job.result_title.clone(),
        result_summary: job.result_summary.clone(),
        result_original_text: job.result_original_text.clone(),
        input_truncated: job.input_truncated,
        error_detail: job.error_detail.clone(),
        attempts: job.attempts,
        created_at: format_timestamp(&job.created_at),
        updated_at: format_timestamp(&job.updated_at),
        completed_at: job.completed_at.as_ref().map(format_timestamp),
    }
}

fn from_row(row: JobRow) -> Result<Job, DatabaseError> {
    let corrupt = |reason: String| DatabaseError::CorruptRow {
        id: row.id.clone(),
        reason,
    };
    let status: JobStatus = row.status.parse().map_err(corrupt)?;
    let input_kind: DocumentKind = row.input_kind.parse().map_err(corrupt)?;
    let created_at = parse_timestamp(&row.id, &row.created_at)?;
    let updated_at = parse_timestamp(&row.id, &row.updated_at)?;
    let completed_at = row
        .completed_at
        .as_deref()
        .map(|value| parse_timestamp(&row.id, value))
        .transpose()?;

    Ok(Job {
        id: row.id,
        owner_id: row.owner_id,
        status,
        input_ref: row.input_ref,
        input_kind,
        result_title: row.result_title,
        result_summary: row.result_summary,
        result_original_text: row.result_original_text,
        input_truncated: row.input_truncated,
        error_detail: row.error_detail,
        attempts: row.attempts,
        created_at,
        updated_at,
        completed_at,
    })
}
