use std::path::PathBuf;
use thiserror::Error;

use crate::model::PlanTier;

#[derive(Error, Debug)]
pub enum ReelchefError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Secret error: {0}")]
    Secret(#[from] crate::secrets::SecretError),

    #[error("Database error: {0}")]
    Database(#[from] crate::db::DatabaseError),

    #[error("Submission rejected: {0}")]
    Submit(#[from] SubmitError),

    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),

    #[error("HTTP client setup failed: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Logging setup failed: {0}")]
    Telemetry(String),
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

    #[error("Failed to parse config YAML: {0}")]
    ParseYaml(#[from] serde_yaml::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Schema validation failed: {errors}")]
    SchemaValidation { errors: String },

    #[error("Unknown AI provider '{0}'")]
    UnknownProvider(String),
}

/// Rejections surfaced synchronously to the caller of the submission path.
/// No job exists when one of these is returned.
#[derive(Error, Debug)]
pub enum SubmitError {
    #[error("{0}")]
    InvalidUrl(String),

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Unsupported target language '{0}'")]
    InvalidLanguage(String),

    #[error("Monthly extraction limit reached ({used}/{limit} on the {plan_tier} plan)")]
    QuotaExceeded {
        used: u32,
        limit: u32,
        plan_tier: PlanTier,
    },

    #[error("Database error: {0}")]
    Database(#[from] crate::db::DatabaseError),
}

/// Errors returned when reading a job back for its owner.
#[derive(Error, Debug)]
pub enum PollError {
    #[error("Extraction job not found")]
    NotFound,

    #[error("Database error: {0}")]
    Database(#[from] crate::db::DatabaseError),
}

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Worker queue closed")]
    ChannelClosed,

    #[error("No async runtime to spawn the job on: {0}")]
    NoRuntime(String),
}

pub type Result<T> = std::result::Result<T, ReelchefError>;
