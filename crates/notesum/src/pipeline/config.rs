use std::path::PathBuf;

use crate::config::schema::{OcrConfig, SummarizerConfig};
use crate::config::Config;
use crate::summarizer::LengthConstraints;

pub struct PipelineConfig {
    pub documents_directory: PathBuf,
    pub ocr: OcrConfig,
    pub summarizer: SummarizerConfig,
    pub constraints: LengthConstraints,
    /// Characters of the summary used as the job title.
    pub title_length: usize,
}

impl PipelineConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            documents_directory: config.documents_directory.clone(),
            ocr: config.ocr.clone(),
            summarizer: config.summarizer.clone(),
            constraints: config.summarizer.constraints(),
            title_length: config.summarizer.title_length,
        }
    }
}
