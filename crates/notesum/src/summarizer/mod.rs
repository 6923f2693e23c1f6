//! Bounded-length summarization.
//!
//! Engines are stateless. Every length here is measured in words, counted as
//! runs of non-whitespace characters.

pub mod extractive;
pub mod ollama;

use std::sync::Arc;

use thiserror::Error;

use crate::config::schema::{SummarizerBackend, SummarizerConfig};

pub use extractive::ExtractiveSummarizer;
pub use ollama::OllamaSummarizer;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SummarizeError {
    #[error("input of {words} words exceeds the engine ceiling of {ceiling}")]
    InputTooLarge { words: usize, ceiling: usize },

    #[error("invalid length constraints: {0}")]
    InvalidConstraints(String),

    #[error("nothing to summarize")]
    EmptyInput,

    #[error("summarizer backend failed: {0}")]
    Backend(String),
}

/// Word bounds for a summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LengthConstraints {
    pub max_length: usize,
    pub min_length: usize,
}

impl LengthConstraints {
    pub fn new(max_length: usize, min_length: usize) -> Result<Self, SummarizeError> {
        let constraints = Self {
            max_length,
            min_length,
        };
        constraints.validate()?;
        Ok(constraints)
    }

    pub fn validate(&self) -> Result<(), SummarizeError> {
        if self.max_length == 0 {
            return Err(SummarizeError::InvalidConstraints(
                "max_length must be positive".to_string(),
            ));
        }
        if self.min_length > self.max_length {
            return Err(SummarizeError::InvalidConstraints(format!(
                "min_length {} exceeds max_length {}",
                self.min_length, self.max_length
            )));
        }
        Ok(())
    }
}

impl Default for LengthConstraints {
    fn default() -> Self {
        Self {
            max_length: 150,
            min_length: 50,
        }
    }
}

pub trait SummarizationEngine: Send + Sync {
    fn name(&self) -> &str;

    /// Largest input, in words, this engine accepts.
    fn input_ceiling(&self) -> usize;

    /// Produces a summary within `constraints`. Input above
    /// [`input_ceiling`](Self::input_ceiling) is rejected, never cut.
    fn summarize(&self, text: &str, constraints: LengthConstraints) -> Result<String, SummarizeError>;
}

/// Checks shared by every engine before any work is done.
pub(crate) fn check_input(
    text: &str,
    constraints: LengthConstraints,
    ceiling: usize,
) -> Result<usize, SummarizeError> {
    constraints.validate()?;
    let words = count_words(text);
    if words == 0 {
        return Err(SummarizeError::EmptyInput);
    }
    if words > ceiling {
        return Err(SummarizeError::InputTooLarge { words, ceiling });
    }
    Ok(words)
}

pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Returns the prefix of `text` holding its first `max_words` words, or
/// `None` when the text already fits.
pub fn truncate_words(text: &str, max_words: usize) -> Option<&str> {
    let mut words = 0usize;
    let mut in_word = false;

    for (idx, ch) in text.char_indices() {
        if ch.is_whitespace() {
            in_word = false;
        } else if !in_word {
            if words == max_words {
                return Some(text[..idx].trim_end());
            }
            in_word = true;
            words += 1;
        }
    }
    None
}

/// Builds the engine selected by configuration.
pub fn build_engine(
    config: &SummarizerConfig,
) -> Result<Arc<dyn SummarizationEngine>, SummarizeError> {
    let engine: Arc<dyn SummarizationEngine> = match config.backend {
        SummarizerBackend::Extractive => Arc::new(ExtractiveSummarizer::new(
            config
                .input_ceiling
                .unwrap_or(extractive::DEFAULT_INPUT_CEILING),
        )),
        SummarizerBackend::Ollama => Arc::new(OllamaSummarizer::new(
            &config.ollama,
            config.input_ceiling.unwrap_or(ollama::DEFAULT_INPUT_CEILING),
        )?),
    };
    log::info!(
        "Summarizer '{}' ready (input ceiling {} words)",
        engine.name(),
        engine.input_ceiling()
    );
    Ok(engine)
}
