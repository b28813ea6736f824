use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::model::PlanTier;
use crate::secrets::{resolve_secret_optional, SecretError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub version: String,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub limits: LimitsConfig,

    #[serde(default)]
    pub pipeline: PipelineConfig,

    #[serde(default)]
    pub transcript: TranscriptConfig,

    #[serde(default)]
    pub ai: AiConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            database: DatabaseConfig::default(),
            server: ServerConfig::default(),
            limits: LimitsConfig::default(),
            pipeline: PipelineConfig::default(),
            transcript: TranscriptConfig::default(),
            ai: AiConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Where a secret comes from. Sources are tried in field order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SecretSource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env_var: Option<String>,
}

impl SecretSource {
    pub fn from_env(name: &str) -> Self {
        Self {
            env_var: Some(name.to_string()),
            ..Default::default()
        }
    }

    /// Resolves the secret, `None` when no source is configured.
    ///
    /// A configured environment variable that is not set counts as absent.
    pub fn resolve(&self) -> Result<Option<SecretString>, SecretError> {
        match resolve_secret_optional(
            self.value.as_deref(),
            self.file.as_deref(),
            self.env_var.as_deref(),
        ) {
            Err(SecretError::EnvVarNotSet { .. }) => Ok(None),
            other => other,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite file. Defaults to `~/.reelchef/data/reelchef.db`.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl DatabaseConfig {
    pub fn resolved_path(&self) -> PathBuf {
        self.path
            .clone()
            .or_else(crate::db::default_database_path)
            .unwrap_or_else(|| PathBuf::from("reelchef.db"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,

    #[serde(default = "default_worker_count")]
    pub worker_count: usize,

    /// Capacity of the progress broadcast channel.
    #[serde(default = "default_broadcast_capacity")]
    pub broadcast_capacity: usize,

    /// Shared secret guarding the internal worker trigger.
    #[serde(default = "default_worker_secret")]
    pub worker_secret: SecretSource,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            worker_count: default_worker_count(),
            broadcast_capacity: default_broadcast_capacity(),
            worker_secret: default_worker_secret(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_worker_count() -> usize {
    num_cpus::get().clamp(1, 8)
}

fn default_broadcast_capacity() -> usize {
    256
}

fn default_worker_secret() -> SecretSource {
    SecretSource::from_env("REELCHEF_WORKER_SECRET")
}

/// Extraction limits per plan tier.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LimitsConfig {
    #[serde(default = "default_free_limit")]
    pub free: u32,

    #[serde(default = "default_pro_limit")]
    pub pro: u32,

    #[serde(default = "default_premium_limit")]
    pub premium: u32,

    /// Length of a free-tier quota period.
    #[serde(default = "default_period_months")]
    pub period_months: u32,
}

impl LimitsConfig {
    pub fn limit_for(&self, plan: PlanTier) -> u32 {
        match plan {
            PlanTier::Free => self.free,
            PlanTier::Pro => self.pro,
            PlanTier::Premium => self.premium,
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            free: default_free_limit(),
            pro: default_pro_limit(),
            premium: default_premium_limit(),
            period_months: default_period_months(),
        }
    }
}

fn default_free_limit() -> u32 {
    5
}

fn default_pro_limit() -> u32 {
    100
}

fn default_premium_limit() -> u32 {
    1000
}

fn default_period_months() -> u32 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PipelineConfig {
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,

    #[serde(default = "default_analyze_timeout")]
    pub analyze_timeout_secs: u64,

    /// Ceiling for one whole orchestrator run.
    #[serde(default = "default_job_timeout")]
    pub job_timeout_secs: u64,

    /// Drafts below this confidence are treated as "not a recipe".
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,

    #[serde(default = "default_max_redirect_hops")]
    pub max_redirect_hops: usize,

    #[serde(default = "default_resolve_timeout")]
    pub resolve_timeout_secs: u64,
}

impl PipelineConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn analyze_timeout(&self) -> Duration {
        Duration::from_secs(self.analyze_timeout_secs)
    }

    pub fn job_timeout(&self) -> Duration {
        Duration::from_secs(self.job_timeout_secs)
    }

    pub fn resolve_timeout(&self) -> Duration {
        Duration::from_secs(self.resolve_timeout_secs)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_secs: default_fetch_timeout(),
            analyze_timeout_secs: default_analyze_timeout(),
            job_timeout_secs: default_job_timeout(),
            min_confidence: default_min_confidence(),
            max_redirect_hops: default_max_redirect_hops(),
            resolve_timeout_secs: default_resolve_timeout(),
        }
    }
}

fn default_fetch_timeout() -> u64 {
    60
}

fn default_analyze_timeout() -> u64 {
    120
}

fn default_job_timeout() -> u64 {
    300
}

fn default_min_confidence() -> f64 {
    0.5
}

fn default_max_redirect_hops() -> usize {
    5
}

fn default_resolve_timeout() -> u64 {
    10
}

/// Transcript service and oEmbed endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptConfig {
    #[serde(default = "default_transcript_base_url")]
    pub base_url: String,

    #[serde(default = "default_transcript_api_key")]
    pub api_key: SecretSource,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default)]
    pub oembed: OembedConfig,
}

impl Default for TranscriptConfig {
    fn default() -> Self {
        Self {
            base_url: default_transcript_base_url(),
            api_key: default_transcript_api_key(),
            request_timeout_secs: default_request_timeout(),
            oembed: OembedConfig::default(),
        }
    }
}

fn default_transcript_base_url() -> String {
    "https://api.supadata.ai".to_string()
}

fn default_transcript_api_key() -> SecretSource {
    SecretSource::from_env("TRANSCRIPT_API_KEY")
}

fn default_request_timeout() -> u64 {
    30
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OembedConfig {
    #[serde(default = "default_youtube_oembed")]
    pub youtube_url: String,

    #[serde(default = "default_tiktok_oembed")]
    pub tiktok_url: String,

    #[serde(default = "default_instagram_oembed")]
    pub instagram_url: String,

    /// Instagram oEmbed requires a Facebook app token.
    #[serde(default = "default_instagram_token")]
    pub instagram_access_token: SecretSource,
}

impl Default for OembedConfig {
    fn default() -> Self {
        Self {
            youtube_url: default_youtube_oembed(),
            tiktok_url: default_tiktok_oembed(),
            instagram_url: default_instagram_oembed(),
            instagram_access_token: default_instagram_token(),
        }
    }
}

fn default_youtube_oembed() -> String {
    "https://www.youtube.com/oembed".to_string()
}

fn default_tiktok_oembed() -> String {
    "https://www.tiktok.com/oembed".to_string()
}

fn default_instagram_oembed() -> String {
    "https://graph.facebook.com/v16.0/instagram_oembed".to_string()
}

fn default_instagram_token() -> SecretSource {
    SecretSource::from_env("INSTAGRAM_OEMBED_TOKEN")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    /// `openai` or `anthropic`.
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Model name; each provider has its own default.
    #[serde(default)]
    pub model: Option<String>,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Overrides the provider's API host.
    #[serde(default)]
    pub base_url: Option<String>,

    /// Falls back to `OPENAI_API_KEY` / `ANTHROPIC_API_KEY` when empty.
    #[serde(default)]
    pub api_key: SecretSource,

    #[serde(default = "default_ai_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            base_url: None,
            api_key: SecretSource::default(),
            request_timeout_secs: default_ai_timeout(),
        }
    }
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_temperature() -> f32 {
    0.2
}

fn default_max_tokens() -> u32 {
    4000
}

fn default_ai_timeout() -> u64 {
    90
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub format: LogFormat,

    /// Filter used when `RUST_LOG` is unset, e.g. `info,reelchef=debug`.
    #[serde(default)]
    pub level: Option<String>,
}
