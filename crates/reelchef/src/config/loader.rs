use std::path::Path;

use crate::config::schema::Config;
use crate::error::ConfigError;

const SCHEMA_JSON: &str = include_str!("config-schema.json");

/// Loads a JSON or YAML (by extension) configuration file.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );
    if is_yaml {
        let json_value: serde_json::Value = serde_yaml::from_str(&content)?;
        load_config_from_value(json_value)
    } else {
        load_config_from_str(&content)
    }
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let json_value: serde_json::Value = serde_json::from_str(content)?;
    load_config_from_value(json_value)
}

fn load_config_from_value(json_value: serde_json::Value) -> Result<Config, ConfigError> {
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

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.version != "1.0" {
        return Err(ConfigError::Validation {
            message: format!("Unsupported config version: {}", config.version),
        });
    }

    let pipeline = &config.pipeline;
    let longest_stage = pipeline.fetch_timeout_secs.max(pipeline.analyze_timeout_secs);
    if pipeline.job_timeout_secs < longest_stage {
        return Err(ConfigError::Validation {
            message: format!(
                "pipeline.job_timeout_secs ({}) must be at least the longest stage timeout ({})",
                pipeline.job_timeout_secs, longest_stage
            ),
        });
    }

    if !(0.0..=1.0).contains(&pipeline.min_confidence) {
        return Err(ConfigError::Validation {
            message: format!(
                "pipeline.min_confidence must be between 0 and 1, got {}",
                pipeline.min_confidence
            ),
        });
    }

    if config.server.worker_count == 0 {
        return Err(ConfigError::Validation {
            message: "server.worker_count must be at least 1".to_string(),
        });
    }

    for (field, value) in [
        ("transcript.base_url", Some(config.transcript.base_url.as_str())),
        ("ai.base_url", config.ai.base_url.as_deref()),
    ] {
        if let Some(raw) = value {
            if let Err(e) = url::Url::parse(raw) {
                return Err(ConfigError::Validation {
                    message: format!("{} is not a valid URL: {}", field, e),
                });
            }
        }
    }

    match config.ai.provider.as_str() {
        "openai" | "anthropic" => Ok(()),
        other => Err(ConfigError::UnknownProvider(other.to_string())),
    }
}
