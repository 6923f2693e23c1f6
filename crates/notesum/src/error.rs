use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NotesumError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] crate::db::DatabaseError),

    #[error("Queue error: {0}")]
    Queue(#[from] crate::queue::QueueError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Submission error: {0}")]
    Service(#[from] crate::service::ServiceError),

    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),

    #[error("Summarizer error: {0}")]
    Summarize(#[from] crate::summarizer::SummarizeError),

    #[error("Logging setup failed: {0}")]
    Logging(#[from] crate::logging::LoggingError),

    #[error("Failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Schema validation failed: {errors}")]
    SchemaValidation { errors: String },
}

/// Errors raised while turning a document into text.
///
/// The `Display` output of [`ExtractionError::NoTextRecovered`] is the stable
/// detail string stored on failed jobs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("document is unreadable: {0}")]
    Unreadable(String),

    #[error("no_text_recovered")]
    NoTextRecovered,
}

/// Failures on the image path of a single unit. These never abort a
/// document; the unit contributes an empty fragment instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OcrError {
    #[error("OCR is disabled")]
    Disabled,

    #[error("Failed to render page {page}: {reason}")]
    Render { page: u32, reason: String },

    #[error("OCR failed: {0}")]
    Recognition(String),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to create directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file '{path}': {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to remove file '{path}': {source}")]
    RemoveFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid document reference: {0}")]
    InvalidReference(String),

    #[error("File already exists: {0}")]
    FileExists(PathBuf),
}

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Failed to spawn worker: {0}")]
    SpawnFailed(String),

    #[error("Failed to set up worker pipeline: {0}")]
    Setup(String),

    #[error("Job store unavailable: {0}")]
    Store(#[from] crate::db::DatabaseError),

    #[error("Job queue unavailable: {0}")]
    Queue(#[from] crate::queue::QueueError),

    #[error("Document unavailable: {0}")]
    Document(#[source] crate::pipeline::PipelineError),

    #[error(transparent)]
    Transition(#[from] crate::job::TransitionError),
}

impl WorkerError {
    /// Errors that say nothing about the job itself. The delivery stays
    /// unacknowledged so the queue hands it out again.
    pub fn is_infrastructure(&self) -> bool {
        matches!(
            self,
            WorkerError::Store(_) | WorkerError::Queue(_) | WorkerError::Document(_)
        )
    }

    /// The worker cannot make progress again in this process.
    pub fn is_fatal(&self) -> bool {
        match self {
            WorkerError::Store(e) | WorkerError::Queue(crate::queue::QueueError::Database(e)) => {
                e.is_fatal()
            }
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, NotesumError>;
