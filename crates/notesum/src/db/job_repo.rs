//! Job repository: CRUD operations for the `jobs` table.
//!
//! Every write is a full-row update keyed by `id` and the `attempts` value
//! the writer last saw. Rows whose status is already terminal are never
//! rewritten.

use rusqlite::{params, OptionalExtension, Row};

use super::{Database, DatabaseError};

/// Statuses after which a row is frozen.
const TERMINAL_GUARD: &str = "status NOT IN ('succeeded', 'failed')";

/// A raw job row from the database.
#[derive(Debug, Clone)]
pub struct JobRow {
    pub id: String,
    pub owner_id: String,
    pub status: String,
    pub input_ref: String,
    pub input_kind: String,
    pub result_title: Option<String>,
    pub result_summary: Option<String>,
    pub result_original_text: Option<String>,
    pub input_truncated: bool,
    pub error_detail: Option<String>,
    pub attempts: u32,
    pub created_at: String,
    pub updated_at: String,
    pub completed_at: Option<String>,
}

impl JobRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            owner_id: row.get("owner_id")?,
            status: row.get("status")?,
            input_ref: row.get("input_ref")?,
            input_kind: row.get("input_kind")?,
            result_title: row.get("result_title")?,
            result_summary: row.get("result_summary")?,
            result_original_text: row.get("result_original_text")?,
            input_truncated: row.get("input_truncated")?,
            error_detail: row.get("error_detail")?,
            attempts: row.get("attempts")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
            completed_at: row.get("completed_at")?,
        })
    }
}

/// Inserts a new job row.
pub fn insert(db: &Database, job: &JobRow) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO jobs (id, owner_id, status, input_ref, input_kind, result_title,
             result_summary, result_original_text, input_truncated, error_detail, attempts,
             created_at, updated_at, completed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                job.id,
                job.owner_id,
                job.status,
                job.input_ref,
                job.input_kind,
                job.result_title,
                job.result_summary,
                job.result_original_text,
                job.input_truncated,
                job.error_detail,
                job.attempts,
                job.created_at,
                job.updated_at,
                job.completed_at,
            ],
        )?;
        Ok(())
    })
}

/// Overwrites every mutable column of a non-terminal row whose stored
/// `attempts` still equals `expected_attempts`.
///
/// `id`, `owner_id` and `created_at` are immutable and never written.
/// Returns `false` when the row is missing, already terminal, or was
/// re-acquired by someone else since the caller read it.
pub fn update_unless_terminal(
    db: &Database,
    job: &JobRow,
    expected_attempts: u32,
) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute(
            &format!(
                "UPDATE jobs SET status=?2, input_ref=?3, input_kind=?4, result_title=?5,
                 result_summary=?6, result_original_text=?7, input_truncated=?8,
                 error_detail=?9, attempts=?10, updated_at=?11, completed_at=?12
                 WHERE id=?1 AND attempts=?13 AND {}",
                TERMINAL_GUARD
            ),
            params![
                job.id,
                job.status,
                job.input_ref,
                job.input_kind,
                job.result_title,
                job.result_summary,
                job.result_original_text,
                job.input_truncated,
                job.error_detail,
                job.attempts,
                job.updated_at,
                job.completed_at,
                expected_attempts,
            ],
        )?;
        Ok(changed == 1)
    })
}

/// Finds a job by its ID.
pub fn find_by_id(db: &Database, id: &str) -> Result<Option<JobRow>, DatabaseError> {
    db.with_conn(|conn| {
        let row = conn
            .query_row(
                "SELECT * FROM jobs WHERE id = ?1",
                params![id],
                JobRow::from_row,
            )
            .optional()?;
        Ok(row)
    })
}

/// Finds a job by ID, but only if it belongs to `owner_id`.
pub fn find_for_owner(
    db: &Database,
    id: &str,
    owner_id: &str,
) -> Result<Option<JobRow>, DatabaseError> {
    db.with_conn(|conn| {
        let row = conn
            .query_row(
                "SELECT * FROM jobs WHERE id = ?1 AND owner_id = ?2",
                params![id, owner_id],
                JobRow::from_row,
            )
            .optional()?;
        Ok(row)
    })
}

/// Lists all jobs of one owner, newest first.
pub fn list_by_owner(db: &Database, owner_id: &str) -> Result<Vec<JobRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT * FROM jobs WHERE owner_id = ?1 ORDER BY created_at DESC, rowid DESC",
        )?;
        let rows = stmt
            .query_map(params![owner_id], JobRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Counts jobs with the given status.
pub fn count_by_status(db: &Database, status: &str) -> Result<u64, DatabaseError> {
    db.with_conn(|conn| {
        let count: u64 = conn.query_row(
            "SELECT COUNT(*) FROM jobs WHERE status = ?1",
            params![status],
            |r| r.get(0),
        )?;
        Ok(count)
    })
}

/// Deletes a job that never left `pending`. Used to roll back a submission
/// whose enqueue failed.
pub fn delete_pending(db: &Database, id: &str) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let deleted = conn.execute(
            "DELETE FROM jobs WHERE id = ?1 AND status = 'pending'",
            params![id],
        )?;
        Ok(deleted == 1)
    })
}
