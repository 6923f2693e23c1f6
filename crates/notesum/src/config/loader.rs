use std::path::Path;

use crate::config::schema::Config;
use crate::error::ConfigError;

const SCHEMA_JSON: &str = include_str!("../../../../schema/config-v1.json");

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    let config = load_config_from_str(&content)?;
    log::info!("Loaded configuration from {}", path.display());
    Ok(config)
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let json_value: serde_json::Value = serde_json::from_str(content)?;

    validate_schema(&json_value)?;

    let config: Config = serde_json::from_value(json_value)?;

    validate_config(&config)?;

    Ok(config)
}

fn validate_schema(json_value: &serde_json::Value) -> Result<(), ConfigError> {
    let schema: serde_json::Value =
        serde_json::from_str(SCHEMA_JSON).map_err(|e| ConfigError::Validation {
            message: format!("Invalid embedded schema JSON: {}", e),
        })?;

    let validator = jsonschema::validator_for(&schema).map_err(|e| ConfigError::Validation {
        message: format!("Failed to compile JSON schema: {}", e),
    })?;

    let error_messages: Vec<String> = validator
        .iter_errors(json_value)
        .map(|e| e.to_string())
        .collect();
    if !error_messages.is_empty() {
        return Err(ConfigError::SchemaValidation {
            errors: error_messages.join("; "),
        });
    }

    Ok(())
}

/// Checks that the schema cannot express.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.version != "1.0" {
        return Err(ConfigError::Validation {
            message: format!("Unsupported config version: {}", config.version),
        });
    }

    if config.worker_count == 0 {
        return Err(ConfigError::Validation {
            message: "worker_count must be at least 1".to_string(),
        });
    }

    config
        .summarizer
        .constraints()
        .validate()
        .map_err(|e| ConfigError::Validation {
            message: format!("summarizer: {}", e),
        })?;

    if config.summarizer.title_length == 0 {
        return Err(ConfigError::Validation {
            message: "summarizer.title_length must be at least 1".to_string(),
        });
    }

    if config.summarizer.input_ceiling == Some(0) {
        return Err(ConfigError::Validation {
            message: "summarizer.input_ceiling must be at least 1".to_string(),
        });
    }

    if config.queue.visibility_timeout_secs == 0 || config.queue.poll_interval_ms == 0 {
        return Err(ConfigError::Validation {
            message: "queue timeouts must be positive".to_string(),
        });
    }

    if config.database_path.as_os_str().is_empty()
        || config.documents_directory.as_os_str().is_empty()
    {
        return Err(ConfigError::Validation {
            message: "database_path and documents_directory must not be empty".to_string(),
        });
    }

    if let Some(filter) = &config.logging.filter {
        tracing_subscriber::EnvFilter::try_new(filter).map_err(|e| ConfigError::Validation {
            message: format!("Invalid logging filter '{}': {}", filter, e),
        })?;
    }

    Ok(())
}
