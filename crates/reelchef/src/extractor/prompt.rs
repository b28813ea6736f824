use crate::model::{TargetLanguage, VideoMetadata};

/// System prompt describing the JSON reply contract.
pub const EXTRACTION_PROMPT: &str = include_str!("prompt.txt");

/// Longest transcript sent to the model, in characters.
const MAX_TRANSCRIPT_CHARS: usize = 30_000;

/// Builds the system prompt, adding a translation instruction when needed.
pub fn build_system_prompt(target: &TargetLanguage) -> String {
    match target {
        TargetLanguage::Original => format!(
            "{}\n- Write the recipe in the language spoken in the video.",
            EXTRACTION_PROMPT
        ),
        TargetLanguage::Translate(code) => format!(
            "{}\n- Write every text field of the recipe in the language with ISO 639-1 code \"{code}\", translating if needed. \"detectedLanguage\" still reports the language spoken in the video.",
            EXTRACTION_PROMPT
        ),
    }
}

pub fn build_user_prompt(transcript: &str, metadata: &VideoMetadata) -> String {
    let mut prompt = String::new();

    if let Some(title) = metadata.title.as_deref() {
        prompt.push_str(&format!("Title: {}\n", title.trim()));
    }
    if let Some(author) = metadata
        .author_name
        .as_deref()
        .or(metadata.author_handle.as_deref())
    {
        prompt.push_str(&format!("Author: {}\n", author.trim()));
    }
    if let Some(description) = metadata.description.as_deref() {
        prompt.push_str(&format!("Caption: {}\n", description.trim()));
    }
    if !metadata.tags.is_empty() {
        prompt.push_str(&format!("Tags: {}\n", metadata.tags.join(", ")));
    }

    prompt.push_str("\nTranscript:\n");
    prompt.push_str(truncate_chars(transcript.trim(), MAX_TRANSCRIPT_CHARS));
    prompt
}

fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_is_embedded() {
        assert!(EXTRACTION_PROMPT.contains("\"isRecipe\""));
        assert!(EXTRACTION_PROMPT.contains("detectedLanguage"));
    }

    #[test]
    fn test_translation_instruction() {
        let original = build_system_prompt(&TargetLanguage::Original);
        assert!(original.contains("language spoken in the video"));
        assert!(!original.contains("translating"));

        let german = build_system_prompt(&TargetLanguage::Translate("de".to_string()));
        assert!(german.contains("\"de\""));
        assert!(german.contains("translating"));
    }

    #[test]
    fn test_user_prompt_includes_metadata() {
        let metadata = VideoMetadata {
            title: Some("Smash burgers".to_string()),
            author_handle: Some("grillguy".to_string()),
            tags: vec!["burger".to_string(), "bbq".to_string()],
            ..Default::default()
        };
        let prompt = build_user_prompt("  Smash the beef on a hot griddle ", &metadata);
        assert!(prompt.contains("Title: Smash burgers"));
        assert!(prompt.contains("Author: grillguy"));
        assert!(prompt.contains("Tags: burger, bbq"));
        assert!(prompt.ends_with("Transcript:\nSmash the beef on a hot griddle"));
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }
}
