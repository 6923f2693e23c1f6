pub mod config;
pub mod db;
pub mod error;
pub mod job;
pub mod logging;
pub mod pipeline;
pub mod processor;
pub mod queue;
pub mod sanitize;
pub mod service;
pub mod storage;
pub mod summarizer;
pub mod worker;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{load_config, Config};
pub use db::Database;
pub use error::{
    ConfigError, ExtractionError, NotesumError, OcrError, Result, StorageError, WorkerError,
};
pub use job::{Job, JobOutcome, JobStatus, JobStore};
pub use pipeline::{Pipeline, PipelineConfig};
pub use processor::{Document, DocumentKind, ExtractedText, TextExtractor};
pub use queue::{Delivery, JobQueue, QueueError, ShutdownSignal, SqliteQueue};
pub use service::{JobView, ServiceError, SubmissionService, Upload};
pub use storage::DocumentStorage;
pub use summarizer::{LengthConstraints, SummarizationEngine, SummarizeError};
pub use worker::{JobWorker, WorkerPool};
