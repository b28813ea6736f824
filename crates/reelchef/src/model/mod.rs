//! Domain types shared by the submission path, the orchestrator and the store.

pub mod job;
pub mod recipe;
pub mod subscription;
pub mod video;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};

pub use job::{ExtractionJob, JobStatus, JobView, TargetLanguage};
pub use recipe::{
    Difficulty, ExtractionInfo, Ingredient, Nutrition, Recipe, RecipeDraft, SourceAttribution,
    Step,
};
pub use subscription::{PlanTier, Subscription};
pub use video::{Platform, VideoMetadata};

/// Generates a 12-character URL-safe identifier for ids shown to clients.
pub fn new_public_id() -> String {
    let uuid = uuid::Uuid::new_v4();
    URL_SAFE_NO_PAD.encode(&uuid.as_bytes()[..9])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_ids_are_short_and_url_safe() {
        let id = new_public_id();
        assert_eq!(id.len(), 12);
        assert!(id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        assert_ne!(new_public_id(), new_public_id());
    }
}
