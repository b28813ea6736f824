//! Parsing of the model's JSON reply.

use serde::Deserialize;

use super::error::ExtractError;
use super::ExtractionOutput;
use crate::model::RecipeDraft;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelReply {
    #[serde(default = "default_is_recipe", alias = "is_recipe")]
    is_recipe: bool,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default, alias = "detected_language")]
    detected_language: Option<String>,
    #[serde(default)]
    reason: Option<String>,
    #[serde(default)]
    recipe: Option<RecipeDraft>,
}

fn default_is_recipe() -> bool {
    true
}

/// Used when the model does not report the spoken language.
pub const UNKNOWN_LANGUAGE: &str = "und";

/// Turns a raw model reply into an extraction result.
pub fn parse_reply(raw: &str) -> Result<ExtractionOutput, ExtractError> {
    let json = extract_json(raw)
        .ok_or_else(|| ExtractError::Malformed("reply contains no JSON object".to_string()))?;
    let reply: ModelReply =
        serde_json::from_str(json).map_err(|e| ExtractError::Malformed(e.to_string()))?;

    if !reply.is_recipe {
        return Err(ExtractError::not_a_recipe(
            reply
                .reason
                .unwrap_or_else(|| "model reported no recipe".to_string()),
        ));
    }

    let draft = reply
        .recipe
        .ok_or_else(|| ExtractError::Malformed("reply has no recipe".to_string()))?;
    if draft.is_empty() {
        return Err(ExtractError::not_a_recipe("no ingredients and no steps"));
    }

    let confidence = reply
        .confidence
        .filter(|c| c.is_finite())
        .unwrap_or(0.0)
        .clamp(0.0, 1.0);
    let detected_language = reply
        .detected_language
        .map(|l| l.trim().to_ascii_lowercase())
        .filter(|l| !l.is_empty())
        .unwrap_or_else(|| UNKNOWN_LANGUAGE.to_string());

    Ok(ExtractionOutput {
        draft,
        detected_language,
        confidence,
    })
}

/// Strips markdown fences and surrounding prose, returning the outermost
/// `{ ... }` span.
fn extract_json(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .map(|rest| rest.trim_end().trim_end_matches("```"))
        .unwrap_or(trimmed);

    let start = unfenced.find('{')?;
    let end = unfenced.rfind('}')?;
    (start < end).then(|| &unfenced[start..=end])
}
