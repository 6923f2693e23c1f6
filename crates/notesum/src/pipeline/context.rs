use crate::job::Job;
use crate::processor::{DocumentKind, ExtractedText};

/// State threaded through one pipeline run. Fields fill in as steps
/// complete, so a failed run shows how far it got.
pub struct PipelineContext {
    // Input
    pub job_id: String,
    pub input_ref: String,
    pub input_kind: DocumentKind,

    // Extraction
    pub extracted: Option<ExtractedText>,
    pub original_text: Option<String>,

    // Summarization
    pub input_truncated: bool,
    pub summary: Option<String>,
}

impl PipelineContext {
    pub fn new(job: &Job) -> Self {
        Self {
            job_id: job.id.clone(),
            input_ref: job.input_ref.clone(),
            input_kind: job.input_kind,
            extracted: None,
            original_text: None,
            input_truncated: false,
            summary: None,
        }
    }

    /// How far the run got, for log lines.
    pub fn progress(&self) -> &'static str {
        if self.summary.is_some() {
            "after summarizing"
        } else if self.extracted.is_some() {
            "after extraction"
        } else {
            "before extraction"
        }
    }

    /// Units read from the document and how many of them needed OCR.
    pub fn unit_counts(&self) -> Option<(usize, usize)> {
        self.extracted
            .as_ref()
            .map(|e| (e.fragments.len(), e.ocr_units))
    }
}
