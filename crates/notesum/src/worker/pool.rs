use std::sync::Arc;
use std::thread::{self, JoinHandle};

use log::{debug, error, info};

use crate::error::WorkerError;
use crate::job::JobStore;
use crate::pipeline::{Pipeline, PipelineConfig};
use crate::queue::{JobQueue, ShutdownSignal};
use crate::worker::job_worker::JobWorker;

/// A fixed set of worker threads consuming one queue.
pub struct WorkerPool {
    workers: Vec<JoinHandle<()>>,
    shutdown: ShutdownSignal,
}

impl WorkerPool {
    /// Builds one pipeline per worker and starts them.
    pub fn start(
        config: Arc<PipelineConfig>,
        store: JobStore,
        queue: Arc<dyn JobQueue>,
        worker_count: usize,
    ) -> Result<Self, WorkerError> {
        if worker_count == 0 {
            return Err(WorkerError::Setup("worker_count must be > 0".to_string()));
        }

        let mut workers = Vec::with_capacity(worker_count);
        for worker_id in 0..worker_count {
            let pipeline = Pipeline::from_config(Arc::clone(&config))
                .map_err(|e| WorkerError::Setup(e.to_string()))?;
            workers.push(JobWorker::new(
                worker_id,
                store.clone(),
                Arc::clone(&queue),
                pipeline,
            ));
        }

        Self::from_workers(workers)
    }

    /// Spawns a thread per prepared worker.
    pub fn from_workers(workers: Vec<JobWorker>) -> Result<Self, WorkerError> {
        let shutdown = ShutdownSignal::new();
        let count = workers.len();
        let mut handles = Vec::with_capacity(count);

        for worker in workers {
            let signal = shutdown.clone();
            let spawned = thread::Builder::new()
                .name(format!("notesum-worker-{}", worker.id()))
                .spawn(move || worker.run(&signal));

            match spawned {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    shutdown.trigger();
                    let pool = Self {
                        workers: handles,
                        shutdown,
                    };
                    pool.wait();
                    return Err(WorkerError::SpawnFailed(e.to_string()));
                }
            }
        }

        info!("Started {} workers", count);

        Ok(Self {
            workers: handles,
            shutdown,
        })
    }

    /// Asks every worker to stop after its current job.
    pub fn shutdown(&self) {
        info!("Shutting down worker pool...");
        self.shutdown.trigger();
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.is_triggered()
    }

    /// Handle for triggering shutdown from elsewhere, e.g. a signal handler.
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.clone()
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Blocks until every worker thread has exited.
    pub fn wait(self) {
        for (i, worker) in self.workers.into_iter().enumerate() {
            if let Err(e) = worker.join() {
                error!("Worker {} panicked: {:?}", i, e);
            } else {
                debug!("Worker {} finished", i);
            }
        }

        info!("All workers have stopped");
    }
}
