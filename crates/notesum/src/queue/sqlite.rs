//! Queue backed by the `queue_messages` table.
//!
//! Claiming runs inside an IMMEDIATE transaction, so two consumers (threads
//! or processes sharing the database file) can never claim the same visible
//! message. In-process producers wake sleeping consumers through a channel;
//! consumers in other processes fall back to polling.

use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use crossbeam_channel::{bounded, Receiver, Sender};
use rusqlite::{params, OptionalExtension, Transaction, TransactionBehavior};

use super::{Delivery, JobQueue, QueueError, ShutdownSignal};
use crate::config::schema::QueueConfig;
use crate::db::Database;

const WAKE_CAPACITY: usize = 1024;

#[derive(Clone)]
pub struct SqliteQueue {
    db: Database,
    visibility_timeout: Duration,
    poll_interval: Duration,
    wake_tx: Sender<()>,
    wake_rx: Receiver<()>,
}

impl SqliteQueue {
    pub fn new(db: Database, visibility_timeout: Duration, poll_interval: Duration) -> Self {
        let (wake_tx, wake_rx) = bounded(WAKE_CAPACITY);
        Self {
            db,
            visibility_timeout,
            poll_interval,
            wake_tx,
            wake_rx,
        }
    }

    pub fn from_config(db: Database, config: &QueueConfig) -> Self {
        Self::new(
            db,
            Duration::from_secs(config.visibility_timeout_secs),
            Duration::from_millis(config.poll_interval_ms),
        )
    }

    pub fn visibility_timeout(&self) -> Duration {
        self.visibility_timeout
    }

    /// Enqueues every pending job that has no message, e.g. because its
    /// submitter died between creating the row and enqueueing it. A job
    /// picked up twice this way is harmless; the worker drops duplicates.
    pub fn requeue_orphans(&self) -> Result<u64, QueueError> {
        let now = Utc::now();
        let requeued = self.db.with_conn(|conn| {
            let changed = conn.execute(
                "INSERT INTO queue_messages (job_id, enqueued_at, visible_at)
                 SELECT id, ?1, ?2 FROM jobs
                 WHERE status = 'pending'
                   AND id NOT IN (SELECT job_id FROM queue_messages)
                 ORDER BY created_at ASC",
                params![
                    now.to_rfc3339_opts(SecondsFormat::Millis, true),
                    now.timestamp_millis()
                ],
            )?;
            Ok(changed as u64)
        })?;

        if requeued > 0 {
            log::info!("Re-enqueued {} orphaned pending jobs", requeued);
            let _ = self.wake_tx.try_send(());
        }
        Ok(requeued)
    }
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

impl JobQueue for SqliteQueue {
    fn enqueue(&self, job_id: &str) -> Result<(), QueueError> {
        let now = Utc::now();
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO queue_messages (job_id, enqueued_at, visible_at) VALUES (?1, ?2, ?3)",
                params![
                    job_id,
                    now.to_rfc3339_opts(SecondsFormat::Millis, true),
                    now.timestamp_millis()
                ],
            )?;
            Ok(())
        })?;

        // A full channel already guarantees a wake-up.
        let _ = self.wake_tx.try_send(());
        log::debug!("Enqueued job {}", job_id);
        Ok(())
    }

    fn try_dequeue(&self) -> Result<Option<Delivery>, QueueError> {
        let now = now_millis();
        let hidden_until = now.saturating_add(self.visibility_timeout.as_millis() as i64);

        let delivery = self.db.with_conn(|conn| {
            let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;

            let claimed = tx
                .query_row(
                    "SELECT id, job_id, delivery_count FROM queue_messages
                     WHERE visible_at <= ?1
                     ORDER BY id ASC
                     LIMIT 1",
                    params![now],
                    |row| {
                        Ok((
                            row.get::<_, i64>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, u32>(2)?,
                        ))
                    },
                )
                .optional()?;

            let Some((message_id, job_id, delivery_count)) = claimed else {
                tx.commit()?;
                return Ok(None);
            };

            let receipt = uuid::Uuid::new_v4().to_string();
            tx.execute(
                "UPDATE queue_messages
                 SET visible_at = ?1, delivery_count = delivery_count + 1, receipt = ?2
                 WHERE id = ?3",
                params![hidden_until, receipt, message_id],
            )?;
            tx.commit()?;

            Ok(Some(Delivery {
                message_id,
                job_id,
                receipt,
                delivery_count: delivery_count + 1,
            }))
        })?;

        if let Some(ref d) = delivery {
            if d.delivery_count > 1 {
                log::info!(
                    "Redelivering job {} (delivery {})",
                    d.job_id,
                    d.delivery_count
                );
            }
        }
        Ok(delivery)
    }

    fn dequeue(&self, shutdown: &ShutdownSignal) -> Result<Option<Delivery>, QueueError> {
        loop {
            if shutdown.is_triggered() {
                return Ok(None);
            }
            if let Some(delivery) = self.try_dequeue()? {
                return Ok(Some(delivery));
            }
            // Timeout and wake-up are handled alike: look again.
            let _ = self.wake_rx.recv_timeout(self.poll_interval);
        }
    }

    fn ack(&self, delivery: &Delivery) -> Result<bool, QueueError> {
        let removed = self.db.with_conn(|conn| {
            let changed = conn.execute(
                "DELETE FROM queue_messages WHERE id = ?1 AND receipt = ?2",
                params![delivery.message_id, delivery.receipt],
            )?;
            Ok(changed > 0)
        })?;

        if !removed {
            log::warn!(
                "Stale acknowledgement for job {} (message {}); it was redelivered or already removed",
                delivery.job_id,
                delivery.message_id
            );
        }
        Ok(removed)
    }

    fn depth(&self) -> Result<u64, QueueError> {
        let count = self.db.with_conn(|conn| {
            let count: i64 =
                conn.query_row("SELECT COUNT(*) FROM queue_messages", [], |row| row.get(0))?;
            Ok(count)
        })?;
        Ok(count.max(0) as u64)
    }
}
