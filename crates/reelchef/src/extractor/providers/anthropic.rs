use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;

use super::{json_body, request_error, LlmProvider};
use crate::config::AiConfig;
use crate::error::{ConfigError, ReelchefError};
use crate::extractor::error::ExtractError;

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const DEFAULT_MODEL: &str = "claude-3-5-haiku-latest";
const API_VERSION: &str = "2023-06-01";

pub struct AnthropicProvider {
    client: Client,
    api_key: SecretString,
    base_url: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl AnthropicProvider {
    /// Creates the provider from configuration, falling back to
    /// `ANTHROPIC_API_KEY` when the config holds no key.
    pub fn new(config: &AiConfig) -> Result<Self, ReelchefError> {
        let api_key = match config.api_key.resolve()? {
            Some(key) => key,
            None => std::env::var("ANTHROPIC_API_KEY")
                .map(SecretString::from)
                .map_err(|_| ConfigError::Validation {
                    message: "ANTHROPIC_API_KEY not found in config or environment".to_string(),
                })?,
        };

        Ok(Self {
            client: Client::builder()
                .timeout(Duration::from_secs(config.request_timeout_secs))
                .build()?,
            api_key,
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            model: config
                .model
                .clone()
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    #[doc(hidden)]
    pub fn with_base_url(api_key: String, base_url: String, model: String) -> Self {
        Self {
            client: Client::new(),
            api_key: SecretString::from(api_key),
            base_url,
            model,
            temperature: 0.2,
            max_tokens: 4000,
        }
    }
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    fn provider_name(&self) -> &str {
        "anthropic"
    }

    async fn complete(&self, system: &str, user: &str) -> Result<String, ExtractError> {
        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url.trim_end_matches('/')))
            .header("x-api-key", self.api_key.expose_secret())
            .header("anthropic-version", API_VERSION)
            .json(&json!({
                "model": self.model,
                "max_tokens": self.max_tokens,
                "temperature": self.temperature,
                "system": system,
                "messages": [
                    {"role": "user", "content": user}
                ]
            }))
            .send()
            .await
            .map_err(|e| request_error(self.provider_name(), e))?;

        let body = json_body(self.provider_name(), response).await?;
        log::debug!("anthropic usage: {}", body["usage"]);

        body["content"][0]["text"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| {
                ExtractError::Malformed(
                    "Failed to extract content from Anthropic response".to_string(),
                )
            })
    }
}
