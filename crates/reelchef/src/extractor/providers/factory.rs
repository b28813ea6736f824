use std::sync::Arc;

use super::{AnthropicProvider, LlmProvider, OpenAIProvider};
use crate::config::AiConfig;
use crate::error::{ConfigError, ReelchefError};

pub struct ProviderFactory;

impl ProviderFactory {
    /// Creates the provider named in `config.provider`.
    pub fn create(config: &AiConfig) -> Result<Arc<dyn LlmProvider>, ReelchefError> {
        match config.provider.as_str() {
            "openai" => Ok(Arc::new(OpenAIProvider::new(config)?)),
            "anthropic" => Ok(Arc::new(AnthropicProvider::new(config)?)),
            other => Err(ConfigError::UnknownProvider(other.to_string()).into()),
        }
    }

    pub fn available_providers() -> &'static [&'static str] {
        &["openai", "anthropic"]
    }
}
