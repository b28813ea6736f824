//! Builders for fetcher and extractor results.

#![allow(dead_code)]

use reelchef::extractor::ExtractionOutput;
use reelchef::fetcher::FetchedVideo;
use reelchef::model::{Ingredient, RecipeDraft, Step, VideoMetadata};

/// Builder for `FetchedVideo` values returned by the mock fetcher.
pub struct VideoBuilder {
    transcript: String,
    language: Option<String>,
    metadata: VideoMetadata,
}

impl VideoBuilder {
    pub fn new() -> Self {
        Self {
            transcript: "Mash two ripe bananas, whisk in an egg and fry small pancakes."
                .to_string(),
            language: Some("en".to_string()),
            metadata: VideoMetadata {
                title: Some("2-ingredient pancakes".to_string()),
                author_name: Some("Chef".to_string()),
                author_handle: Some("chef".to_string()),
                ..Default::default()
            },
        }
    }

    pub fn transcript(mut self, transcript: &str) -> Self {
        self.transcript = transcript.to_string();
        self
    }

    pub fn language(mut self, language: &str) -> Self {
        self.language = Some(language.to_string());
        self
    }

    pub fn title(mut self, title: &str) -> Self {
        self.metadata.title = Some(title.to_string());
        self
    }

    pub fn build(self) -> FetchedVideo {
        FetchedVideo {
            transcript: self.transcript,
            transcript_language: self.language,
            metadata: self.metadata,
        }
    }
}

/// Builder for extractor outputs.
pub struct DraftBuilder {
    draft: RecipeDraft,
    detected_language: String,
    confidence: f64,
}

impl DraftBuilder {
    pub fn new(title: &str) -> Self {
        Self {
            draft: RecipeDraft {
                title: title.to_string(),
                ingredients: vec![
                    ingredient("banana", "2", None),
                    ingredient("egg", "1", None),
                ],
                steps: vec![
                    step("Mash the bananas"),
                    step("Whisk in the egg"),
                    step("Fry small pancakes"),
                ],
                servings: Some(1),
                ..Default::default()
            },
            detected_language: "en".to_string(),
            confidence: 0.92,
        }
    }

    pub fn confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn detected_language(mut self, language: &str) -> Self {
        self.detected_language = language.to_string();
        self
    }

    pub fn empty(mut self) -> Self {
        self.draft.ingredients.clear();
        self.draft.steps.clear();
        self
    }

    pub fn build(self) -> ExtractionOutput {
        ExtractionOutput {
            draft: self.draft,
            detected_language: self.detected_language,
            confidence: self.confidence,
        }
    }
}

pub fn ingredient(name: &str, quantity: &str, unit: Option<&str>) -> Ingredient {
    Ingredient {
        name: name.to_string(),
        quantity: Some(quantity.to_string()),
        unit: unit.map(str::to_string),
        ..Default::default()
    }
}

pub fn step(instruction: &str) -> Step {
    Step {
        instruction: instruction.to_string(),
        duration_minutes: None,
    }
}
