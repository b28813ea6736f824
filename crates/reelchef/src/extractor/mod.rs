//! AI stage: turns a transcript into a structured recipe draft.

pub mod error;
pub mod llm;
pub mod parse;
pub mod prompt;
pub mod providers;

use async_trait::async_trait;

use crate::model::{RecipeDraft, TargetLanguage, VideoMetadata};

pub use error::ExtractError;
pub use llm::LlmRecipeExtractor;
pub use providers::{AnthropicProvider, LlmProvider, OpenAIProvider, ProviderFactory};

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionOutput {
    pub draft: RecipeDraft,
    /// ISO 639-1 code of the spoken language, `und` when unknown.
    pub detected_language: String,
    /// In `[0, 1]`.
    pub confidence: f64,
}

#[async_trait]
pub trait RecipeExtractor: Send + Sync {
    async fn extract(
        &self,
        transcript: &str,
        metadata: &VideoMetadata,
        target_language: &TargetLanguage,
    ) -> Result<ExtractionOutput, ExtractError>;
}
