use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use log::{debug, error, info, warn};

use crate::error::WorkerError;
use crate::job::{JobStatus, JobStore};
use crate::pipeline::error::GENERIC_FAILURE_DETAIL;
use crate::pipeline::{Pipeline, PipelineContext};
use crate::queue::{Delivery, JobQueue, ShutdownSignal};

const DEFAULT_ERROR_BACKOFF: Duration = Duration::from_secs(1);

/// What happened to one delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Processed {
    Succeeded,
    Failed,
    /// The job was missing or already terminal; the delivery was dropped.
    Discarded,
}

/// Drives jobs through `PENDING → RUNNING → SUCCEEDED | FAILED`.
///
/// Store and queue errors, and a document file the host cannot read, are
/// never written onto the job: the delivery stays unacknowledged and the
/// queue hands it out again after the visibility timeout. Everything the
/// document itself causes is terminal.
///
/// Each attempt is a lease on the row keyed by `attempts`. A worker whose
/// lease was taken over can no longer write the job.
pub struct JobWorker {
    id: usize,
    store: JobStore,
    queue: Arc<dyn JobQueue>,
    pipeline: Pipeline,
    error_backoff: Duration,
}

impl JobWorker {
    pub fn new(id: usize, store: JobStore, queue: Arc<dyn JobQueue>, pipeline: Pipeline) -> Self {
        Self {
            id,
            store,
            queue,
            pipeline,
            error_backoff: DEFAULT_ERROR_BACKOFF,
        }
    }

    /// Pause after an infrastructure error before polling again.
    pub fn with_error_backoff(mut self, backoff: Duration) -> Self {
        self.error_backoff = backoff;
        self
    }

    pub fn id(&self) -> usize {
        self.id
    }

    /// Processes jobs until `shutdown` is triggered. A job in flight is
    /// always finished first.
    pub fn run(&self, shutdown: &ShutdownSignal) {
        debug!("Worker {} started", self.id);

        while !shutdown.is_triggered() {
            match self.run_once(shutdown) {
                Ok(Some(_)) => {}
                Ok(None) => break,
                Err(e) if e.is_fatal() => {
                    error!("Worker {} stopping: {}", self.id, e);
                    break;
                }
                Err(e) => {
                    error!("Worker {}: {}", self.id, e);
                    thread::sleep(self.error_backoff);
                }
            }
        }

        debug!("Worker {} stopped", self.id);
    }

    /// Waits for one delivery and handles it. `Ok(None)` means shutdown was
    /// observed while waiting.
    pub fn run_once(&self, shutdown: &ShutdownSignal) -> Result<Option<Processed>, WorkerError> {
        match self.queue.dequeue(shutdown)? {
            Some(delivery) => self.handle(&delivery).map(Some),
            None => Ok(None),
        }
    }

    pub fn handle(&self, delivery: &Delivery) -> Result<Processed, WorkerError> {
        let _span = tracing::info_span!("job",
            job_id = %delivery.job_id,
            delivery = delivery.delivery_count,
            worker = self.id,
        )
        .entered();

        let Some(mut job) = self.store.get(&delivery.job_id)? else {
            warn!("Job {} not found; dropping delivery", delivery.job_id);
            self.queue.ack(delivery)?;
            return Ok(Processed::Discarded);
        };

        if job.status.is_terminal() {
            info!(
                "Job {} already {}; dropping duplicate delivery",
                job.id, job.status
            );
            self.queue.ack(delivery)?;
            return Ok(Processed::Discarded);
        }

        if job.status == JobStatus::Running {
            warn!(
                "Re-acquiring job {} after an unfinished attempt (attempt {})",
                job.id,
                job.attempts + 1
            );
        }

        job.start()?;
        if !self.store.acquire(&job)? {
            return self.release(delivery);
        }

        let ctx = PipelineContext::new(&job);
        let run = panic::catch_unwind(AssertUnwindSafe(|| self.pipeline.run(ctx)));

        let processed = match run {
            Ok((Ok(outcome), ctx)) => {
                if let Some((units, ocr_units)) = ctx.unit_counts() {
                    debug!(
                        "Job {}: {} units extracted, {} via OCR, input truncated: {}",
                        job.id, units, ocr_units, ctx.input_truncated
                    );
                }
                job.succeed(outcome)?;
                info!("Job {} succeeded", job.id);
                Processed::Succeeded
            }
            Ok((Err(e), ctx)) if e.is_infrastructure() => {
                warn!(
                    "Job {} interrupted {}; leaving it for redelivery: {}",
                    job.id,
                    ctx.progress(),
                    e
                );
                return Err(WorkerError::Document(e));
            }
            Ok((Err(e), ctx)) => {
                warn!("Job {} failed {}: {}", job.id, ctx.progress(), e);
                job.fail(e.public_detail())?;
                Processed::Failed
            }
            Err(payload) => {
                error!(
                    "Job {} failed: pipeline panicked: {}",
                    job.id,
                    panic_message(payload.as_ref())
                );
                job.fail(GENERIC_FAILURE_DETAIL)?;
                Processed::Failed
            }
        };

        if !self.store.save(&job)? {
            return self.release(delivery);
        }

        self.queue.ack(delivery)?;
        Ok(processed)
    }

    /// Our write to the job was refused. A finished or missing job drops the
    /// delivery; a job another worker re-acquired keeps it, so the message
    /// survives if that worker dies too.
    fn release(&self, delivery: &Delivery) -> Result<Processed, WorkerError> {
        match self.store.get(&delivery.job_id)? {
            Some(job) if !job.status.is_terminal() => {
                info!(
                    "Job {} was re-acquired by another worker (attempt {}); discarding this attempt",
                    job.id, job.attempts
                );
            }
            _ => {
                info!(
                    "Job {} reached a terminal state elsewhere; discarding this result",
                    delivery.job_id
                );
                self.queue.ack(delivery)?;
            }
        }
        Ok(Processed::Discarded)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "<non-string panic payload>"
    }
}
