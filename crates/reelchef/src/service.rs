//! Submission and polling path.
//!
//! `submit` is synchronous up to job creation and never waits for the
//! orchestrator. Rejections (bad URL, exhausted quota) are returned before
//! any job exists.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::db::job_repo::{self, Duplicate};
use crate::db::Database;
use crate::error::{PollError, SubmitError};
use crate::model::{ExtractionJob, JobStatus, JobView, PlanTier, TargetLanguage};
use crate::pipeline::{Orchestrator, ProgressEvent, ProgressReporter, RunOutcome};
use crate::platform::UrlResolver;
use crate::quota::{QuotaGate, QuotaStatus};
use crate::worker::JobDispatcher;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    #[serde(default)]
    pub url: String,
    /// `original` (default), `english`, or an ISO 639-1 code.
    #[serde(default)]
    pub target_language: Option<String>,
    /// Set when the request came in through a chat bot.
    #[serde(default)]
    pub telegram_chat_id: Option<i64>,
}

impl SubmitRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged, rename_all_fields = "camelCase")]
pub enum SubmitResponse {
    /// A job was created, or one for the same video is already running.
    Accepted { job_id: String, status: JobStatus },
    /// The user already has a recipe for this video.
    Existing { existing_recipe_id: String },
}

pub struct ExtractionService {
    db: Database,
    resolver: UrlResolver,
    quota: QuotaGate,
    orchestrator: Arc<Orchestrator>,
    dispatcher: Arc<dyn JobDispatcher>,
    progress: Arc<dyn ProgressReporter>,
    clock: Arc<dyn Clock>,
}

impl ExtractionService {
    pub fn new(
        db: Database,
        resolver: UrlResolver,
        quota: QuotaGate,
        orchestrator: Arc<Orchestrator>,
        dispatcher: Arc<dyn JobDispatcher>,
        progress: Arc<dyn ProgressReporter>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            db,
            resolver,
            quota,
            orchestrator,
            dispatcher,
            progress,
            clock,
        }
    }

    /// Validates the URL, deduplicates, checks quota and queues a new job.
    pub async fn submit(
        &self,
        user_id: &str,
        request: SubmitRequest,
    ) -> Result<SubmitResponse, SubmitError> {
        let url = request.url.trim();
        if url.is_empty() {
            return Err(SubmitError::MissingField("url"));
        }
        let target_language = match request.target_language.as_deref() {
            None => TargetLanguage::Original,
            Some(raw) => raw
                .parse::<TargetLanguage>()
                .map_err(|_| SubmitError::InvalidLanguage(raw.to_string()))?,
        };

        let detection = self.resolver.resolve_and_detect(url).await;
        let (Some(platform), Some(normalized_url), true) = (
            detection.platform,
            detection.normalized_form.clone(),
            detection.is_valid,
        ) else {
            let reason = detection
                .error
                .unwrap_or_else(|| "Unsupported link".to_string());
            debug!(user_id, url, %reason, "Rejected submission");
            return Err(SubmitError::InvalidUrl(reason));
        };

        if let Some(duplicate) = job_repo::find_duplicate(&self.db, user_id, &normalized_url)? {
            return Ok(duplicate_response(user_id, &normalized_url, duplicate));
        }

        let quota = self.quota.can_extract(user_id)?;
        if !quota.allowed {
            info!(user_id, used = quota.used, limit = quota.limit, "Extraction quota exhausted");
            return Err(SubmitError::QuotaExceeded {
                used: quota.used,
                limit: quota.limit,
                plan_tier: quota.plan_tier,
            });
        }

        let job = ExtractionJob::new_pending(
            user_id,
            url,
            &normalized_url,
            platform,
            target_language,
            request.telegram_chat_id,
            self.clock.now(),
        );
        if let Some(duplicate) = job_repo::insert_unless_duplicate(&self.db, &job)? {
            debug!(user_id, %normalized_url, "Concurrent submission for the same video");
            return Ok(duplicate_response(user_id, &normalized_url, duplicate));
        }
        info!(
            user_id,
            job_id = %job.public_id,
            %platform,
            %normalized_url,
            "Extraction job created"
        );
        self.progress.report(
            &job,
            ProgressEvent::Status {
                status: JobStatus::Pending,
                message: "Queued for extraction".to_string(),
            },
        );

        let status = match self.dispatcher.dispatch(&job.public_id) {
            Ok(()) => JobStatus::Pending,
            Err(e) => {
                warn!(job_id = %job.public_id, error = %e, "Could not queue extraction job");
                self.fail_undispatched(&job)
            }
        };

        Ok(SubmitResponse::Accepted {
            job_id: job.public_id,
            status,
        })
    }

    /// Returns the job if it belongs to `user_id`. Foreign jobs are
    /// indistinguishable from missing ones.
    pub fn poll(&self, user_id: &str, job_id: &str) -> Result<JobView, PollError> {
        match job_repo::find_by_public_id(&self.db, job_id)? {
            Some(job) if job.user_id == user_id => Ok(job.view()),
            _ => Err(PollError::NotFound),
        }
    }

    /// Runs a job to completion on the caller's task. Used by the worker
    /// trigger; a job that is no longer pending is skipped.
    pub async fn run_job(&self, job_id: &str) -> RunOutcome {
        self.orchestrator.process_extraction(job_id).await
    }

    /// Billing-cycle renewal hook.
    pub fn reset_quota(&self, user_id: &str) -> Result<QuotaStatus, SubmitError> {
        Ok(self.quota.reset_for_billing_cycle(user_id)?)
    }

    /// Plan-change hook for the billing collaborator.
    pub fn set_plan(&self, user_id: &str, plan: PlanTier) -> Result<QuotaStatus, SubmitError> {
        info!(user_id, %plan, "Changing plan");
        Ok(self.quota.set_plan(user_id, plan)?)
    }

    pub fn quota_status(&self, user_id: &str) -> Result<QuotaStatus, SubmitError> {
        Ok(self.quota.can_extract(user_id)?)
    }

    fn fail_undispatched(&self, job: &ExtractionJob) -> JobStatus {
        let message = "We couldn't start this extraction. Please try again";
        match job_repo::mark_failed(&self.db, &job.public_id, message, self.clock.now()) {
            Ok(true) => {
                self.progress.report(
                    job,
                    ProgressEvent::Failed {
                        error: message.to_string(),
                    },
                );
                JobStatus::Failed
            }
            Ok(false) => job_repo::find_by_public_id(&self.db, &job.public_id)
                .ok()
                .flatten()
                .map_or(JobStatus::Failed, |j| j.status),
            Err(e) => {
                tracing::error!(job_id = %job.public_id, error = %e, "Could not fail undispatched job");
                JobStatus::Pending
            }
        }
    }
}

fn duplicate_response(user_id: &str, normalized_url: &str, duplicate: Duplicate) -> SubmitResponse {
    match duplicate {
        Duplicate::Recipe(recipe_id) => {
            info!(user_id, normalized_url, %recipe_id, "Recipe already extracted");
            SubmitResponse::Existing {
                existing_recipe_id: recipe_id,
            }
        }
        Duplicate::ActiveJob(job) => {
            info!(user_id, normalized_url, job_id = %job.public_id, "Extraction already in progress");
            SubmitResponse::Accepted {
                job_id: job.public_id,
                status: job.status,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submit_request_defaults() {
        let request: SubmitRequest =
            serde_json::from_str(r#"{"url": "https://youtu.be/dQw4w9WgXcQ"}"#).unwrap();
        assert_eq!(request.url, "https://youtu.be/dQw4w9WgXcQ");
        assert!(request.target_language.is_none());
        assert!(request.telegram_chat_id.is_none());

        let request: SubmitRequest = serde_json::from_str(
            r#"{"url": "x", "targetLanguage": "english", "telegramChatId": 12}"#,
        )
        .unwrap();
        assert_eq!(request.target_language.as_deref(), Some("english"));
        assert_eq!(request.telegram_chat_id, Some(12));
    }

    #[test]
    fn test_response_shapes() {
        let accepted = serde_json::to_value(SubmitResponse::Accepted {
            job_id: "abc".to_string(),
            status: JobStatus::Pending,
        })
        .unwrap();
        assert_eq!(
            accepted,
            serde_json::json!({"jobId": "abc", "status": "pending"})
        );

        let existing = serde_json::to_value(SubmitResponse::Existing {
            existing_recipe_id: "r9".to_string(),
        })
        .unwrap();
        assert_eq!(existing, serde_json::json!({"existingRecipeId": "r9"}));
    }
}
