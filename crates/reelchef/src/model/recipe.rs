use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::job::TargetLanguage;
use super::video::{Platform, VideoMetadata};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Ingredient {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Section heading such as "For the sauce".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    pub instruction: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Nutrition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calories: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protein_grams: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carbs_grams: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fat_grams: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fiber_grams: Option<f64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

/// Structured recipe as produced by the AI stage, before it is owned by a user.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecipeDraft {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub ingredients: Vec<Ingredient>,
    #[serde(default)]
    pub steps: Vec<Step>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prep_time_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cook_time_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_time_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub servings: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<Difficulty>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cuisine: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nutrition: Option<Nutrition>,
}

impl RecipeDraft {
    pub fn is_empty(&self) -> bool {
        self.ingredients.is_empty() && self.steps.is_empty()
    }
}

/// Where a recipe came from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SourceAttribution {
    pub platform: Platform,
    pub url: String,
    pub normalized_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_handle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
}

impl SourceAttribution {
    pub fn new(platform: Platform, url: &str, normalized_url: &str, meta: &VideoMetadata) -> Self {
        Self {
            platform,
            url: url.to_string(),
            normalized_url: normalized_url.to_string(),
            title: meta.title.clone(),
            author_name: meta.author_name.clone(),
            author_handle: meta.author_handle.clone(),
            author_url: meta.author_url.clone(),
            thumbnail_url: meta.thumbnail_url.clone(),
        }
    }
}

/// How a recipe was extracted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionInfo {
    pub job_id: String,
    pub detected_language: String,
    pub target_language: TargetLanguage,
    pub confidence: f64,
    /// True when the draft came from the raw extraction cache.
    pub from_cache: bool,
}

/// A recipe owned by a user.
#[derive(Debug, Clone, PartialEq)]
pub struct Recipe {
    pub id: String,
    pub public_id: String,
    pub user_id: String,
    pub normalized_url: String,
    pub content: RecipeDraft,
    pub source: SourceAttribution,
    pub extraction: ExtractionInfo,
    pub created_at: DateTime<Utc>,
}

impl Recipe {
    pub fn new(
        user_id: &str,
        content: RecipeDraft,
        source: SourceAttribution,
        extraction: ExtractionInfo,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            public_id: super::new_public_id(),
            user_id: user_id.to_string(),
            normalized_url: source.normalized_url.clone(),
            content,
            source,
            extraction,
            created_at: now,
        }
    }

    pub fn title(&self) -> &str {
        &self.content.title
    }
}
