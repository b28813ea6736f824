use std::sync::Arc;

use async_trait::async_trait;

use super::error::ExtractError;
use super::parse::parse_reply;
use super::prompt::{build_system_prompt, build_user_prompt};
use super::providers::LlmProvider;
use super::{ExtractionOutput, RecipeExtractor};
use crate::model::{TargetLanguage, VideoMetadata};

/// Extracts recipes by prompting a chat-completion model.
pub struct LlmRecipeExtractor {
    provider: Arc<dyn LlmProvider>,
}

impl LlmRecipeExtractor {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl RecipeExtractor for LlmRecipeExtractor {
    async fn extract(
        &self,
        transcript: &str,
        metadata: &VideoMetadata,
        target_language: &TargetLanguage,
    ) -> Result<ExtractionOutput, ExtractError> {
        let system = build_system_prompt(target_language);
        let user = build_user_prompt(transcript, metadata);

        let reply = self.provider.complete(&system, &user).await?;
        let output = parse_reply(&reply).inspect_err(|e| {
            log::warn!("{} reply rejected: {}", self.provider.provider_name(), e);
        })?;

        log::debug!(
            "Extracted '{}' ({} ingredients, {} steps, confidence {:.2})",
            output.draft.title,
            output.draft.ingredients.len(),
            output.draft.steps.len(),
            output.confidence
        );
        Ok(output)
    }
}
