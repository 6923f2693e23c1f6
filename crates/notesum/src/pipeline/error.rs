use std::io;

use thiserror::Error;

use crate::error::{ExtractionError, StorageError};
use crate::summarizer::SummarizeError;

/// Detail stored for failures that should not reach the owner verbatim.
pub const GENERIC_FAILURE_DETAIL: &str = "internal error while processing document";

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Document could not be loaded: {0}")]
    Storage(#[from] StorageError),

    #[error("Extraction failed: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Summarization failed: {0}")]
    Summarize(#[from] SummarizeError),

    #[error("Summarizer returned an empty summary")]
    EmptySummary,
}

impl PipelineError {
    /// Short owner-facing text for `error_detail`. Never includes paths,
    /// backend URLs, or other internals; the full error goes to the log.
    pub fn public_detail(&self) -> &'static str {
        match self {
            PipelineError::Storage(_) => "document could not be read",
            PipelineError::Extraction(ExtractionError::Unreadable(_)) => {
                "document is unreadable or corrupt"
            }
            PipelineError::Extraction(ExtractionError::NoTextRecovered) => "no_text_recovered",
            PipelineError::Summarize(SummarizeError::InputTooLarge { .. }) => {
                "document too large to summarize"
            }
            PipelineError::Summarize(_) | PipelineError::EmptySummary => "summarization failed",
        }
    }

    /// Failures of the host rather than the document: the stored file
    /// exists (or should) but the filesystem refused to hand it over. The
    /// job must be retried, not failed.
    pub fn is_infrastructure(&self) -> bool {
        match self {
            PipelineError::Storage(StorageError::ReadFile { source, .. }) => {
                source.kind() != io::ErrorKind::NotFound
            }
            PipelineError::Storage(
                StorageError::CreateDirectory { .. }
                | StorageError::WriteFile { .. }
                | StorageError::RemoveFile { .. },
            ) => true,
            PipelineError::Storage(
                StorageError::InvalidReference(_) | StorageError::FileExists(_),
            )
            | PipelineError::Extraction(_)
            | PipelineError::Summarize(_)
            | PipelineError::EmptySummary => false,
        }
    }
}
