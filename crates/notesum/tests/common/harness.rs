//! Test harness for isolated integration runs.
//!
//! Each `TestHarness` owns a temp directory holding a file-backed SQLite
//! database and the documents directory, so a second `Database` handle on
//! the same file behaves like another process.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tempfile::TempDir;

use notesum::processor::ocr::{DisabledOcr, OcrEngine};
use notesum::service::RetryPolicy;
use notesum::{
    Config, Database, DocumentStorage, Job, JobQueue, JobStatus, JobStore, JobWorker, Pipeline,
    PipelineConfig, ShutdownSignal, SqliteQueue, SubmissionService, TextExtractor, Upload,
};

use super::stubs::StubRenderer;

pub struct TestHarness {
    temp_dir: TempDir,
    pub config: Config,
    pub db: Database,
    pub store: JobStore,
    pub queue: Arc<SqliteQueue>,
    pub service: SubmissionService,
}

impl TestHarness {
    /// OCR disabled, extractive summarizer, 30 s visibility timeout.
    pub fn new() -> Self {
        Self::with_visibility(Duration::from_secs(30))
    }

    pub fn with_visibility(visibility: Duration) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");

        let mut config = Config::default();
        config.database_path = temp_dir.path().join("data").join("notesum.db");
        config.documents_directory = temp_dir.path().join("documents");
        config.worker_count = 2;
        config.ocr.enabled = false;
        config.summarizer.max_length = 40;
        config.summarizer.min_length = 5;
        config.summarizer.title_length = 20;
        config.queue.poll_interval_ms = 10;

        let db = Database::open(&config.database_path).expect("Failed to open database");
        let store = JobStore::new(db.clone());
        let queue = Arc::new(SqliteQueue::new(
            db.clone(),
            visibility,
            Duration::from_millis(config.queue.poll_interval_ms),
        ));
        let service = SubmissionService::new(
            store.clone(),
            queue.clone(),
            DocumentStorage::new(&config.documents_directory),
            RetryPolicy::from_config(&config.queue),
        );

        Self {
            temp_dir,
            config,
            db,
            store,
            queue,
            service,
        }
    }

    pub fn temp_path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn documents_dir(&self) -> PathBuf {
        self.config.documents_directory.clone()
    }

    pub fn pipeline_config(&self) -> Arc<PipelineConfig> {
        Arc::new(PipelineConfig::from_config(&self.config))
    }

    /// The production pipeline for this harness's config.
    pub fn pipeline(&self) -> Pipeline {
        Pipeline::from_config(self.pipeline_config()).expect("Failed to build pipeline")
    }

    /// Production summarizer with the given OCR engine and a stub rasterizer.
    pub fn pipeline_with_ocr(&self, ocr: Arc<dyn OcrEngine>) -> Pipeline {
        let config = self.pipeline_config();
        let summarizer =
            notesum::summarizer::build_engine(&config.summarizer).expect("Failed to build summarizer");
        let extractor = TextExtractor::new(ocr, Arc::new(StubRenderer), config.ocr.dpi);
        Pipeline::new(
            config,
            DocumentStorage::new(&self.config.documents_directory),
            extractor,
            summarizer,
        )
    }

    pub fn pipeline_without_ocr(&self) -> Pipeline {
        self.pipeline_with_ocr(Arc::new(DisabledOcr))
    }

    pub fn worker(&self, id: usize, pipeline: Pipeline) -> JobWorker {
        JobWorker::new(id, self.store.clone(), self.queue.clone(), pipeline)
    }

    /// A second connection to the same database file, with its own queue
    /// handle and the given visibility timeout.
    pub fn reopen(&self, visibility: Duration) -> (JobStore, Arc<SqliteQueue>) {
        let db = Database::open(&self.config.database_path).expect("Failed to reopen database");
        let queue = Arc::new(SqliteQueue::new(
            db.clone(),
            visibility,
            Duration::from_millis(10),
        ));
        (JobStore::new(db), queue)
    }

    pub fn submit_text(&self, owner: &str, text: &str) -> String {
        self.service
            .submit(Upload::new(text.as_bytes().to_vec()), owner)
            .expect("Failed to submit text")
    }

    pub fn submit_pdf(&self, owner: &str, bytes: Vec<u8>) -> String {
        self.service
            .submit(Upload::new(bytes).with_filename("document.pdf"), owner)
            .expect("Failed to submit PDF")
    }

    /// Runs `worker` until the queue is empty.
    pub fn drain(&self, worker: &JobWorker) {
        let shutdown = ShutdownSignal::new();
        while self.queue.depth().expect("Failed to read queue depth") > 0 {
            worker.run_once(&shutdown).expect("Worker hit an infrastructure error");
        }
    }

    pub fn job(&self, id: &str) -> Job {
        self.store
            .get(id)
            .expect("Failed to read job")
            .expect("Job not found")
    }

    /// Polls until every listed job is terminal or the timeout elapses.
    pub fn wait_terminal(&self, ids: &[String], timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            let done = ids
                .iter()
                .all(|id| self.job(id).status.is_terminal());
            if done {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
    }

    pub fn count(&self, status: JobStatus) -> u64 {
        self.store
            .count_by_status(status)
            .expect("Failed to count jobs")
    }
}
