use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;

use super::{json_body, request_error, LlmProvider};
use crate::config::AiConfig;
use crate::error::{ConfigError, ReelchefError};
use crate::extractor::error::ExtractError;

const DEFAULT_BASE_URL: &str = "https://api.openai.com";
const DEFAULT_MODEL: &str = "gpt-4o-mini";

pub struct OpenAIProvider {
    client: Client,
    api_key: SecretString,
    base_url: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAIProvider {
    /// Creates the provider from configuration, falling back to
    /// `OPENAI_API_KEY` when the config holds no key.
    pub fn new(config: &AiConfig) -> Result<Self, ReelchefError> {
        let api_key = match config.api_key.resolve()? {
            Some(key) => key,
            None => std::env::var("OPENAI_API_KEY")
                .map(SecretString::from)
                .map_err(|_| ConfigError::Validation {
                    message: "OPENAI_API_KEY not found in config or environment".to_string(),
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
impl LlmProvider for OpenAIProvider {
    fn provider_name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, system: &str, user: &str) -> Result<String, ExtractError> {
        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/')))
            .bearer_auth(self.api_key.expose_secret())
            .json(&json!({
                "model": self.model,
                "messages": [
                    {"role": "system", "content": system},
                    {"role": "user", "content": user}
                ],
                "temperature": self.temperature,
                "max_tokens": self.max_tokens,
                "response_format": {"type": "json_object"}
            }))
            .send()
            .await
            .map_err(|e| request_error(self.provider_name(), e))?;

        let body = json_body(self.provider_name(), response).await?;
        log::debug!("openai usage: {}", body["usage"]);

        body["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| {
                ExtractError::Malformed("Failed to extract content from response".to_string())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    #[tokio::test]
    async fn test_complete() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .match_header("authorization", "Bearer fake_api_key")
            .match_body(Matcher::PartialJson(json!({
                "model": "gpt-4o-mini",
                "response_format": {"type": "json_object"}
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices": [{"message": {"content": "{\"isRecipe\": true}"}}]}"#)
            .create_async()
            .await;

        let provider = OpenAIProvider::with_base_url(
            "fake_api_key".to_string(),
            server.url(),
            "gpt-4o-mini".to_string(),
        );
        let reply = provider.complete("system", "user").await.unwrap();
        assert_eq!(reply, r#"{"isRecipe": true}"#);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_complete_api_error() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/v1/chat/completions")
            .with_status(429)
            .with_body(r#"{"error": "rate limited"}"#)
            .create_async()
            .await;

        let provider =
            OpenAIProvider::with_base_url("k".to_string(), server.url(), "gpt-4o".to_string());
        let err = provider.complete("s", "u").await.unwrap_err();
        assert!(matches!(err, ExtractError::Provider { .. }));
    }

    #[tokio::test]
    async fn test_complete_missing_content() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_body(r#"{"choices": []}"#)
            .create_async()
            .await;

        let provider =
            OpenAIProvider::with_base_url("k".to_string(), server.url(), "gpt-4o".to_string());
        assert!(matches!(
            provider.complete("s", "u").await,
            Err(ExtractError::Malformed(_))
        ));
    }
}
