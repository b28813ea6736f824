//! Job progress broadcaster for real-time job status streaming.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::model::{ExtractionJob, JobStatus};

/// Progress event for an extraction job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JobProgressEvent {
    /// Public job id.
    pub job_id: String,
    pub user_id: String,
    pub status: JobStatus,
    pub progress: u8,
    /// Human-readable message describing current activity.
    pub message: String,
    /// Public recipe id (set on completion).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipe_id: Option<String>,
    /// User-facing error (set on failure).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Chat to notify, when the job was submitted from a bot.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub telegram_chat_id: Option<i64>,
    pub timestamp: DateTime<Utc>,
}

impl JobProgressEvent {
    /// Creates an event for a job entering `status`.
    pub fn new(job: &ExtractionJob, status: JobStatus, message: &str) -> Self {
        Self {
            job_id: job.public_id.clone(),
            user_id: job.user_id.clone(),
            status,
            progress: status.progress().unwrap_or(job.progress),
            message: message.to_string(),
            recipe_id: None,
            error: None,
            telegram_chat_id: job.telegram_chat_id,
            timestamp: Utc::now(),
        }
    }

    pub fn completed(job: &ExtractionJob, recipe_id: &str) -> Self {
        Self {
            recipe_id: Some(recipe_id.to_string()),
            ..Self::new(job, JobStatus::Completed, "Recipe ready")
        }
    }

    pub fn failed(job: &ExtractionJob, error: &str) -> Self {
        Self {
            error: Some(error.to_string()),
            ..Self::new(job, JobStatus::Failed, "Extraction failed")
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Broadcasts job progress events for streaming.
#[derive(Clone)]
pub struct JobProgressBroadcaster {
    sender: Arc<broadcast::Sender<JobProgressEvent>>,
}

impl JobProgressBroadcaster {
    /// Creates a new job progress broadcaster with the specified channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Sends a progress event to all subscribers.
    pub fn send(&self, event: JobProgressEvent) {
        // No active receivers is fine
        let _ = self.sender.send(event);
    }

    /// Creates a new subscriber for progress events.
    pub fn subscribe(&self) -> broadcast::Receiver<JobProgressEvent> {
        self.sender.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for JobProgressBroadcaster {
    fn default() -> Self {
        Self::new(100)
    }
}
