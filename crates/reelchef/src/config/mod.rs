pub mod loader;
pub mod schema;

pub use loader::{load_config, load_config_from_str};
pub use schema::{
    AiConfig, Config, DatabaseConfig, LimitsConfig, LogFormat, LoggingConfig, OembedConfig,
    PipelineConfig, SecretSource, ServerConfig, TranscriptConfig,
};
