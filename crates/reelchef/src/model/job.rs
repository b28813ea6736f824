use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::video::Platform;

/// Lifecycle of an extraction job.
///
/// `pending → fetching_transcript → analyzing → completed`, with `failed`
/// reachable from every non-terminal state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    FetchingTranscript,
    Analyzing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::FetchingTranscript => "fetching_transcript",
            JobStatus::Analyzing => "analyzing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Progress value a job carries on entering this state.
    /// `Failed` keeps whatever progress was reached.
    pub fn progress(&self) -> Option<u8> {
        match self {
            JobStatus::Pending => Some(0),
            JobStatus::FetchingTranscript => Some(33),
            JobStatus::Analyzing => Some(66),
            JobStatus::Completed => Some(100),
            JobStatus::Failed => None,
        }
    }

    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        use JobStatus::*;
        match (self, next) {
            (Pending, FetchingTranscript) => true,
            (FetchingTranscript, Analyzing) => true,
            (Analyzing, Completed) => true,
            (from, Failed) => !from.is_terminal(),
            _ => false,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "fetching_transcript" => Ok(JobStatus::FetchingTranscript),
            "analyzing" => Ok(JobStatus::Analyzing),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            other => Err(format!("unknown job status '{}'", other)),
        }
    }
}

/// Language the extracted recipe should be written in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum TargetLanguage {
    /// Keep the language spoken in the video.
    #[default]
    Original,
    /// Translate into the given ISO 639-1 language code.
    Translate(String),
}

impl TargetLanguage {
    pub fn english() -> Self {
        TargetLanguage::Translate("en".to_string())
    }

    /// Cache-key form: `original` or the lowercase language code.
    pub fn as_str(&self) -> &str {
        match self {
            TargetLanguage::Original => "original",
            TargetLanguage::Translate(code) => code,
        }
    }
}

impl fmt::Display for TargetLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetLanguage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "" | "original" => Ok(TargetLanguage::Original),
            "english" => Ok(TargetLanguage::english()),
            code if code.len() == 2 && code.chars().all(|c| c.is_ascii_lowercase()) => {
                Ok(TargetLanguage::Translate(code.to_string()))
            }
            _ => Err(format!("unsupported target language '{}'", s.trim())),
        }
    }
}

impl Serialize for TargetLanguage {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for TargetLanguage {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// One request to turn a video URL into a recipe.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionJob {
    /// Internal row id.
    pub id: String,
    /// Short id handed out to clients.
    pub public_id: String,
    pub user_id: String,
    pub source_url: String,
    pub normalized_url: String,
    pub platform: Platform,
    pub status: JobStatus,
    pub progress: u8,
    pub status_message: Option<String>,
    /// Public id of the resulting recipe.
    pub recipe_id: Option<String>,
    pub error: Option<String>,
    pub telegram_chat_id: Option<i64>,
    pub target_language: TargetLanguage,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ExtractionJob {
    /// Creates a job in `pending` with progress 0.
    pub fn new_pending(
        user_id: &str,
        source_url: &str,
        normalized_url: &str,
        platform: Platform,
        target_language: TargetLanguage,
        telegram_chat_id: Option<i64>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            public_id: super::new_public_id(),
            user_id: user_id.to_string(),
            source_url: source_url.to_string(),
            normalized_url: normalized_url.to_string(),
            platform,
            status: JobStatus::Pending,
            progress: 0,
            status_message: Some("Queued for extraction".to_string()),
            recipe_id: None,
            error: None,
            telegram_chat_id,
            target_language,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn view(&self) -> JobView {
        JobView::from(self)
    }
}

/// What a polling client sees of a job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JobView {
    pub id: String,
    pub status: JobStatus,
    pub progress: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipe_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&ExtractionJob> for JobView {
    fn from(job: &ExtractionJob) -> Self {
        Self {
            id: job.public_id.clone(),
            status: job.status,
            progress: job.progress,
            status_message: job.status_message.clone(),
            recipe_id: job.recipe_id.clone(),
            error: job.error.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transitions_follow_state_machine() {
        use JobStatus::*;
        assert!(Pending.can_transition_to(FetchingTranscript));
        assert!(FetchingTranscript.can_transition_to(Analyzing));
        assert!(Analyzing.can_transition_to(Completed));

        assert!(!Pending.can_transition_to(Analyzing));
        assert!(!Pending.can_transition_to(Completed));
        assert!(!FetchingTranscript.can_transition_to(Completed));
        assert!(!Analyzing.can_transition_to(FetchingTranscript));
    }

    #[test]
    fn test_failed_reachable_only_from_non_terminal() {
        use JobStatus::*;
        for status in [Pending, FetchingTranscript, Analyzing] {
            assert!(status.can_transition_to(Failed));
        }
        assert!(!Completed.can_transition_to(Failed));
        assert!(!Failed.can_transition_to(Failed));
        assert!(!Failed.can_transition_to(Pending));
    }

    #[test]
    fn test_progress_per_state() {
        assert_eq!(JobStatus::Pending.progress(), Some(0));
        assert_eq!(JobStatus::FetchingTranscript.progress(), Some(33));
        assert_eq!(JobStatus::Analyzing.progress(), Some(66));
        assert_eq!(JobStatus::Completed.progress(), Some(100));
        assert_eq!(JobStatus::Failed.progress(), None);
    }

    #[test]
    fn test_status_serde_is_snake_case() {
        assert_eq!(
            serde_json::to_string(&JobStatus::FetchingTranscript).unwrap(),
            "\"fetching_transcript\""
        );
        assert_eq!(
            "fetching_transcript".parse::<JobStatus>().unwrap(),
            JobStatus::FetchingTranscript
        );
    }

    #[test]
    fn test_target_language_parsing() {
        assert_eq!(
            "original".parse::<TargetLanguage>().unwrap(),
            TargetLanguage::Original
        );
        assert_eq!("".parse::<TargetLanguage>().unwrap(), TargetLanguage::Original);
        assert_eq!(
            "English".parse::<TargetLanguage>().unwrap(),
            TargetLanguage::english()
        );
        assert_eq!(
            "DE".parse::<TargetLanguage>().unwrap(),
            TargetLanguage::Translate("de".into())
        );
        assert!("klingon".parse::<TargetLanguage>().is_err());
    }

    #[test]
    fn test_new_pending_job() {
        let now = Utc::now();
        let job = ExtractionJob::new_pending(
            "user-1",
            "https://www.tiktok.com/@chef/video/123?lang=en",
            "https://www.tiktok.com/video/123",
            Platform::TikTok,
            TargetLanguage::Original,
            Some(42),
            now,
        );
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.progress, 0);
        assert_eq!(job.public_id.len(), 12);
        assert_ne!(job.public_id, job.id);
        assert!(job.recipe_id.is_none() && job.error.is_none());
    }

    #[test]
    fn test_view_omits_unset_fields() {
        let job = ExtractionJob::new_pending(
            "u",
            "s",
            "n",
            Platform::YouTube,
            TargetLanguage::Original,
            None,
            Utc::now(),
        );
        let json = serde_json::to_value(job.view()).unwrap();
        assert_eq!(json["status"], "pending");
        assert_eq!(json["progress"], 0);
        assert!(json.get("recipeId").is_none());
        assert!(json.get("error").is_none());
    }
}
