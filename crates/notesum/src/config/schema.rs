use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::summarizer::LengthConstraints;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub version: String,
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
    #[serde(default = "default_documents_directory")]
    pub documents_directory: PathBuf,
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
    #[serde(default)]
    pub ocr: OcrConfig,
    #[serde(default)]
    pub summarizer: SummarizerConfig,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            database_path: default_database_path(),
            documents_directory: default_documents_directory(),
            worker_count: default_worker_count(),
            ocr: OcrConfig::default(),
            summarizer: SummarizerConfig::default(),
            queue: QueueConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

fn notesum_home() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".notesum")
}

fn default_database_path() -> PathBuf {
    crate::db::default_database_path().unwrap_or_else(|| notesum_home().join("data").join("notesum.db"))
}

fn default_documents_directory() -> PathBuf {
    notesum_home().join("documents")
}

fn default_worker_count() -> usize {
    num_cpus::get()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_languages")]
    pub languages: Vec<String>,
    #[serde(default = "default_dpi")]
    pub dpi: u32,
}

fn default_true() -> bool {
    true
}

fn default_languages() -> Vec<String> {
    vec!["eng".to_string()]
}

fn default_dpi() -> u32 {
    300
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            languages: default_languages(),
            dpi: default_dpi(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummarizerBackend {
    #[default]
    Extractive,
    Ollama,
}

/// Summarizer selection and output bounds. Lengths are in words, except
/// `title_length` which counts characters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummarizerConfig {
    #[serde(default)]
    pub backend: SummarizerBackend,
    #[serde(default = "default_max_length")]
    pub max_length: usize,
    #[serde(default = "default_min_length")]
    pub min_length: usize,
    #[serde(default = "default_title_length")]
    pub title_length: usize,
    /// Overrides the backend's own input ceiling.
    #[serde(default)]
    pub input_ceiling: Option<usize>,
    #[serde(default)]
    pub ollama: OllamaConfig,
}

fn default_max_length() -> usize {
    150
}

fn default_min_length() -> usize {
    50
}

fn default_title_length() -> usize {
    50
}

impl SummarizerConfig {
    pub fn constraints(&self) -> LengthConstraints {
        LengthConstraints {
            max_length: self.max_length,
            min_length: self.min_length,
        }
    }
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            backend: SummarizerBackend::default(),
            max_length: default_max_length(),
            min_length: default_min_length(),
            title_length: default_title_length(),
            input_ceiling: None,
            ollama: OllamaConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    #[serde(default = "default_ollama_url")]
    pub url: String,
    #[serde(default = "default_ollama_model")]
    pub model: String,
    #[serde(default = "default_ollama_timeout")]
    pub timeout_secs: u64,
}

fn default_ollama_url() -> String {
    "http://127.0.0.1:11434".to_string()
}

fn default_ollama_model() -> String {
    "llama3.2".to_string()
}

fn default_ollama_timeout() -> u64 {
    120
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            url: default_ollama_url(),
            model: default_ollama_model(),
            timeout_secs: default_ollama_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// How long a claimed job stays hidden before it is redelivered.
    #[serde(default = "default_visibility_timeout")]
    pub visibility_timeout_secs: u64,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_submit_retries")]
    pub submit_retries: u32,
    #[serde(default = "default_submit_backoff")]
    pub submit_backoff_ms: u64,
}

fn default_visibility_timeout() -> u64 {
    300
}

fn default_poll_interval() -> u64 {
    500
}

fn default_submit_retries() -> u32 {
    3
}

fn default_submit_backoff() -> u64 {
    200
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            visibility_timeout_secs: default_visibility_timeout(),
            poll_interval_ms: default_poll_interval(),
            submit_retries: default_submit_retries(),
            submit_backoff_ms: default_submit_backoff(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub json: bool,
    /// `EnvFilter` directives. `RUST_LOG` wins when set.
    #[serde(default)]
    pub filter: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.version, "1.0");
        assert!(config.worker_count >= 1);
        assert!(config.ocr.enabled);
        assert_eq!(config.ocr.dpi, 300);
        assert_eq!(config.summarizer.backend, SummarizerBackend::Extractive);
        assert_eq!(config.summarizer.constraints(), LengthConstraints::default());
        assert_eq!(config.summarizer.title_length, 50);
        assert_eq!(config.queue.visibility_timeout_secs, 300);
        assert!(!config.logging.json);
        assert!(config.documents_directory.ends_with("documents"));
    }

    #[test]
    fn test_backend_serde() {
        let backend: SummarizerBackend = serde_json::from_str("\"ollama\"").unwrap();
        assert_eq!(backend, SummarizerBackend::Ollama);
        assert_eq!(
            serde_json::to_string(&SummarizerBackend::Extractive).unwrap(),
            "\"extractive\""
        );
    }
}
