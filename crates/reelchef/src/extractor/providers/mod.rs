mod anthropic;
mod factory;
mod openai;

pub use anthropic::AnthropicProvider;
pub use factory::ProviderFactory;
pub use openai::OpenAIProvider;

use async_trait::async_trait;

use super::error::ExtractError;

/// A chat-completion backend.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name as used in config (`openai`, `anthropic`).
    fn provider_name(&self) -> &str;

    /// Sends one system + user exchange and returns the reply text.
    async fn complete(&self, system: &str, user: &str) -> Result<String, ExtractError>;
}

/// Maps a transport failure onto an extraction error.
pub(crate) fn request_error(provider: &str, e: reqwest::Error) -> ExtractError {
    if e.is_timeout() {
        ExtractError::Timeout
    } else {
        ExtractError::Provider {
            provider: provider.to_string(),
            message: e.to_string(),
        }
    }
}

/// Reads a JSON body, turning non-2xx statuses into provider errors.
pub(crate) async fn json_body(
    provider: &str,
    response: reqwest::Response,
) -> Result<serde_json::Value, ExtractError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        log::warn!("{} returned {}: {}", provider, status, body);
        return Err(ExtractError::Provider {
            provider: provider.to_string(),
            message: format!("HTTP {}", status),
        });
    }
    response
        .json()
        .await
        .map_err(|e| ExtractError::Malformed(e.to_string()))
}
