//! Summaries from a local Ollama runtime over HTTP.

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;

use super::{check_input, truncate_words, LengthConstraints, SummarizationEngine, SummarizeError};
use crate::config::schema::OllamaConfig;

/// Default input ceiling, in words. Keeps prompts inside a small model's
/// context window.
pub const DEFAULT_INPUT_CEILING: usize = 3_000;

pub struct OllamaSummarizer {
    http: Client,
    base_url: String,
    model: String,
    input_ceiling: usize,
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
    done: bool,
}

impl OllamaSummarizer {
    pub fn new(config: &OllamaConfig, input_ceiling: usize) -> Result<Self, SummarizeError> {
        let http = Client::builder()
            .user_agent(concat!("notesum/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SummarizeError::Backend(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.url.clone(),
            model: config.model.clone(),
            input_ceiling,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/api/generate", self.base_url.trim_end_matches('/'))
    }
}

pub(crate) fn build_prompt(text: &str, constraints: LengthConstraints) -> String {
    format!(
        "Summarize the following document in {min} to {max} words. \
         Reply with the summary only.\n\n---\n{text}\n---",
        min = constraints.min_length,
        max = constraints.max_length,
        text = text.trim()
    )
}

impl SummarizationEngine for OllamaSummarizer {
    fn name(&self) -> &str {
        "ollama"
    }

    fn input_ceiling(&self) -> usize {
        self.input_ceiling
    }

    fn summarize(&self, text: &str, constraints: LengthConstraints) -> Result<String, SummarizeError> {
        check_input(text, constraints, self.input_ceiling)?;

        let payload = json!({
            "model": self.model,
            "prompt": build_prompt(text, constraints),
            "stream": false,
            "options": {
                "temperature": 0.1,
            }
        });

        let response = self
            .http
            .post(self.endpoint())
            .json(&payload)
            .send()
            .map_err(|e| {
                SummarizeError::Backend(format!("failed to reach Ollama at {}: {}", self.base_url, e))
            })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(SummarizeError::Backend(format!(
                "Ollama endpoint {} returned 404 (is model '{}' pulled?)",
                self.endpoint(),
                self.model
            )));
        }
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(SummarizeError::Backend(format!(
                "Ollama returned {}: {}",
                status, body
            )));
        }

        let body: OllamaResponse = response
            .json()
            .map_err(|e| SummarizeError::Backend(format!("failed to decode Ollama response: {}", e)))?;
        if !body.done {
            return Err(SummarizeError::Backend(
                "Ollama response incomplete (streaming not supported)".to_string(),
            ));
        }

        let summary = body.response.trim();
        if summary.is_empty() {
            return Err(SummarizeError::Backend("Ollama returned an empty summary".to_string()));
        }
        Ok(truncate_words(summary, constraints.max_length)
            .unwrap_or(summary)
            .to_string())
    }
}
