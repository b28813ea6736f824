//! Drives one extraction job from `pending` to a terminal state.
//!
//! Every state change is a conditional update in the store, so a second
//! trigger for the same job is a no-op and a job can never move backwards.
//! Usage is recorded only after the recipe and the `completed` status have
//! been committed together.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use serde::Serialize;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::clock::Clock;
use crate::config::PipelineConfig;
use crate::db::metadata_cache_repo::{self, CachedVideo};
use crate::db::raw_extraction_repo::{self, RawExtraction};
use crate::db::job_repo::{self, Completion};
use crate::db::Database;
use crate::extractor::{ExtractError, ExtractionOutput, RecipeExtractor};
use crate::fetcher::{FetchError, FetchedVideo, FetcherRegistry};
use crate::model::{ExtractionInfo, ExtractionJob, JobStatus, Recipe, SourceAttribution};
use crate::platform::fetch_url;
use crate::quota::QuotaGate;

use super::error::PipelineError;
use super::progress::{ProgressEvent, ProgressReporter};

/// Result of one orchestrator run, reported to the worker trigger.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum RunOutcome {
    NotFound,
    /// The job was not pending, typically a duplicate trigger.
    Skipped { status: JobStatus },
    Completed { recipe_id: String },
    Failed { error: String },
}

/// Analysis result plus whether it came from the raw extraction cache.
struct Analysis {
    output: ExtractionOutput,
    from_cache: bool,
}

pub struct Orchestrator {
    db: Database,
    fetchers: FetcherRegistry,
    extractor: Arc<dyn RecipeExtractor>,
    quota: QuotaGate,
    progress: Arc<dyn ProgressReporter>,
    clock: Arc<dyn Clock>,
    config: PipelineConfig,
}

impl Orchestrator {
    pub fn new(
        db: Database,
        fetchers: FetcherRegistry,
        extractor: Arc<dyn RecipeExtractor>,
        quota: QuotaGate,
        progress: Arc<dyn ProgressReporter>,
        clock: Arc<dyn Clock>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            db,
            fetchers,
            extractor,
            quota,
            progress,
            clock,
            config,
        }
    }

    /// Runs the job identified by its public id. Never returns an error:
    /// every failure ends as a `failed` job.
    pub async fn process_extraction(&self, job_id: &str) -> RunOutcome {
        let job = match job_repo::find_by_public_id(&self.db, job_id) {
            Ok(Some(job)) => job,
            Ok(None) => {
                warn!(job_id, "Extraction job not found");
                return RunOutcome::NotFound;
            }
            Err(e) => {
                let error = PipelineError::from(e);
                warn!(job_id, error = %error, "Could not load extraction job");
                return RunOutcome::Failed {
                    error: error.user_message(),
                };
            }
        };

        let job = match self.claim(job) {
            Ok(job) => job,
            Err(outcome) => return outcome,
        };

        let span = info_span!("pipeline", job_id = %job.public_id, platform = %job.platform);
        let ceiling = self.config.job_timeout();
        let run = AssertUnwindSafe(self.run_stages(job.clone())).catch_unwind();

        let result = match tokio::time::timeout(ceiling, run).instrument(span).await {
            Ok(Ok(result)) => result,
            Ok(Err(panic)) => Err(PipelineError::Panicked(panic_message(panic.as_ref()))),
            Err(_) => Err(PipelineError::Timeout {
                seconds: ceiling.as_secs(),
            }),
        };

        match result {
            Ok(recipe) => {
                info!(job_id = %job.public_id, recipe_id = %recipe.public_id, "Extraction completed");
                let mut done = job;
                done.status = JobStatus::Completed;
                done.progress = 100;
                done.recipe_id = Some(recipe.public_id.clone());
                self.progress.report(
                    &done,
                    ProgressEvent::Completed {
                        recipe_id: recipe.public_id.clone(),
                    },
                );
                self.record_usage(&done.user_id);
                RunOutcome::Completed {
                    recipe_id: recipe.public_id,
                }
            }
            Err(e) => self.fail(&job, e),
        }
    }

    /// `pending → fetching_transcript`. Anything else is a duplicate trigger.
    fn claim(&self, mut job: ExtractionJob) -> Result<ExtractionJob, RunOutcome> {
        if job.status != JobStatus::Pending {
            debug!(job_id = %job.public_id, status = %job.status, "Job already claimed");
            return Err(RunOutcome::Skipped { status: job.status });
        }

        let message = "Fetching transcript";
        match job_repo::claim_pending(&self.db, &job.public_id, message, self.clock.now()) {
            Ok(true) => {}
            Ok(false) => {
                let status = job_repo::find_by_public_id(&self.db, &job.public_id)
                    .ok()
                    .flatten()
                    .map_or(job.status, |j| j.status);
                debug!(job_id = %job.public_id, %status, "Lost claim race");
                return Err(RunOutcome::Skipped { status });
            }
            Err(e) => return Err(self.fail(&job, e.into())),
        }

        job.status = JobStatus::FetchingTranscript;
        job.progress = job.progress.max(33);
        job.status_message = Some(message.to_string());
        self.progress.report(
            &job,
            ProgressEvent::Status {
                status: JobStatus::FetchingTranscript,
                message: message.to_string(),
            },
        );
        Ok(job)
    }

    async fn run_stages(&self, mut job: ExtractionJob) -> Result<Recipe, PipelineError> {
        let video = self
            .step_fetch(&job)
            .instrument(info_span!("fetch_transcript"))
            .await?;

        self.transition(&mut job, JobStatus::Analyzing, "Analyzing recipe")?;

        let analysis = self
            .step_analyze(&job, &video)
            .instrument(info_span!("analyze"))
            .await?;

        info_span!("persist").in_scope(|| self.step_persist(&job, &video, analysis))
    }

    /// Metadata cache first; on a miss, the platform fetcher, then upsert.
    /// The cache is keyed by the normalized URL.
    async fn step_fetch(&self, job: &ExtractionJob) -> Result<FetchedVideo, PipelineError> {
        let url = &job.normalized_url;
        match metadata_cache_repo::get(&self.db, url) {
            Ok(Some(cached)) => {
                debug!(%url, "Metadata cache hit");
                return Ok(FetchedVideo {
                    transcript: cached.transcript,
                    transcript_language: cached.transcript_language,
                    metadata: cached.metadata,
                });
            }
            Ok(None) => debug!(%url, "Metadata cache miss"),
            Err(e) => warn!(%url, error = %e, "Metadata cache read failed, fetching"),
        }

        let platform = job.platform;
        let fetcher = self
            .fetchers
            .get(platform)
            .ok_or(FetchError::Unsupported { platform })?;

        let target = fetch_url(&job.source_url, url);
        let video = tokio::time::timeout(self.config.fetch_timeout(), fetcher.fetch(&target))
            .await
            .map_err(|_| FetchError::Timeout { platform })??;

        let now = self.clock.now();
        let entry = CachedVideo {
            normalized_url: url.clone(),
            platform,
            metadata: video.metadata.clone(),
            transcript: video.transcript.clone(),
            transcript_language: video.transcript_language.clone(),
            fetched_at: now,
            updated_at: now,
        };
        if let Err(e) = metadata_cache_repo::upsert(&self.db, &entry) {
            warn!(%url, error = %e, "Metadata cache write failed");
        }

        Ok(video)
    }

    /// Raw extraction cache first; on a miss, the extractor, then a
    /// first-write-wins insert shared by every user.
    async fn step_analyze(
        &self,
        job: &ExtractionJob,
        video: &FetchedVideo,
    ) -> Result<Analysis, PipelineError> {
        let url = &job.normalized_url;
        let target = &job.target_language;

        match raw_extraction_repo::get(&self.db, url, target) {
            Ok(Some(raw)) => {
                debug!(%url, %target, "Raw extraction cache hit");
                let output = ExtractionOutput {
                    draft: raw.draft,
                    detected_language: raw.detected_language,
                    confidence: raw.confidence,
                };
                self.check_quality(&output)?;
                return Ok(Analysis {
                    output,
                    from_cache: true,
                });
            }
            Ok(None) => debug!(%url, %target, "Raw extraction cache miss"),
            Err(e) => warn!(%url, error = %e, "Raw extraction cache read failed, extracting"),
        }

        let output = tokio::time::timeout(
            self.config.analyze_timeout(),
            self.extractor
                .extract(&video.transcript, &video.metadata, target),
        )
        .await
        .map_err(|_| ExtractError::Timeout)??;

        let entry = RawExtraction {
            normalized_url: url.clone(),
            target_language: target.clone(),
            draft: output.draft.clone(),
            detected_language: output.detected_language.clone(),
            confidence: output.confidence,
            created_at: self.clock.now(),
        };
        match raw_extraction_repo::insert_if_absent(&self.db, &entry) {
            Ok(true) => {}
            Ok(false) => debug!(%url, %target, "Raw extraction already cached by another job"),
            Err(e) => warn!(%url, error = %e, "Raw extraction cache write failed"),
        }

        self.check_quality(&output)?;
        Ok(Analysis {
            output,
            from_cache: false,
        })
    }

    fn check_quality(&self, output: &ExtractionOutput) -> Result<(), ExtractError> {
        if output.draft.is_empty() {
            return Err(ExtractError::not_a_recipe("no ingredients and no steps"));
        }
        if output.confidence < self.config.min_confidence {
            return Err(ExtractError::not_a_recipe(format!(
                "confidence {:.2} below {:.2}",
                output.confidence, self.config.min_confidence
            )));
        }
        Ok(())
    }

    /// Writes the recipe and completes the job in one transaction.
    fn step_persist(
        &self,
        job: &ExtractionJob,
        video: &FetchedVideo,
        analysis: Analysis,
    ) -> Result<Recipe, PipelineError> {
        let now = self.clock.now();
        let output = analysis.output;
        let source = SourceAttribution::new(
            job.platform,
            &job.source_url,
            &job.normalized_url,
            &video.metadata,
        );
        let extraction = ExtractionInfo {
            job_id: job.public_id.clone(),
            detected_language: output.detected_language,
            target_language: job.target_language.clone(),
            confidence: output.confidence,
            from_cache: analysis.from_cache,
        };
        let recipe = Recipe::new(&job.user_id, output.draft, source, extraction, now);

        match job_repo::complete_with_recipe(&self.db, &job.public_id, &recipe, now)? {
            Completion::Completed => Ok(recipe),
            Completion::NotAnalyzing => Err(PipelineError::StateConflict {
                expected: JobStatus::Analyzing,
            }),
            Completion::DuplicateRecipe => Err(PipelineError::DuplicateRecipe),
        }
    }

    fn transition(
        &self,
        job: &mut ExtractionJob,
        to: JobStatus,
        message: &str,
    ) -> Result<(), PipelineError> {
        let from = job.status;
        if !job_repo::advance(&self.db, &job.public_id, from, to, message, self.clock.now())? {
            return Err(PipelineError::StateConflict { expected: from });
        }
        job.status = to;
        job.progress = job.progress.max(to.progress().unwrap_or(0));
        job.status_message = Some(message.to_string());
        self.progress.report(
            job,
            ProgressEvent::Status {
                status: to,
                message: message.to_string(),
            },
        );
        Ok(())
    }

    fn fail(&self, job: &ExtractionJob, error: PipelineError) -> RunOutcome {
        let message = error.user_message();
        warn!(job_id = %job.public_id, error = %error, "Extraction failed");

        match job_repo::mark_failed(&self.db, &job.public_id, &message, self.clock.now()) {
            Ok(true) => {
                let latest = job_repo::find_by_public_id(&self.db, &job.public_id)
                    .ok()
                    .flatten()
                    .unwrap_or_else(|| job.clone());
                self.progress.report(
                    &latest,
                    ProgressEvent::Failed {
                        error: message.clone(),
                    },
                );
            }
            Ok(false) => debug!(job_id = %job.public_id, "Job already terminal, failure not recorded"),
            Err(e) => {
                tracing::error!(job_id = %job.public_id, error = %e, "Could not record job failure")
            }
        }

        RunOutcome::Failed { error: message }
    }

    /// A failure here leaves the recipe in place; the user simply is not
    /// charged for it.
    fn record_usage(&self, user_id: &str) {
        if let Err(e) = self.quota.record_successful_extraction(user_id) {
            tracing::error!(user_id, error = %e, "Failed to record extraction usage");
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
