//! Test harness wiring the submission service and orchestrator together.
//!
//! External collaborators are replaced by in-process doubles:
//! - `MockFetcher` per platform, optionally paused until released
//! - `CountingExtractor` returning a scripted result
//! - `RecordingDispatcher` that queues job ids instead of running them
//! - `RecordingProgress` capturing every reported state change

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use tokio::sync::Notify;

use reelchef::clock::{Clock, FixedClock};
use reelchef::config::{LimitsConfig, PipelineConfig};
use reelchef::db::Database;
use reelchef::error::WorkerError;
use reelchef::extractor::{ExtractError, ExtractionOutput, RecipeExtractor};
use reelchef::fetcher::{FetchError, FetchedVideo, FetcherRegistry, TranscriptFetcher};
use reelchef::model::{ExtractionJob, JobStatus, Platform, TargetLanguage, VideoMetadata};
use reelchef::pipeline::{Orchestrator, ProgressEvent, ProgressReporter, RunOutcome};
use reelchef::platform::UrlResolver;
use reelchef::quota::QuotaGate;
use reelchef::service::{ExtractionService, SubmitRequest, SubmitResponse};
use reelchef::worker::JobDispatcher;

use super::builders::{DraftBuilder, VideoBuilder};

/// Fetcher double for one platform.
pub struct MockFetcher {
    platform: Platform,
    result: Mutex<Result<FetchedVideo, FetchError>>,
    pause: Mutex<Option<Arc<Notify>>>,
    calls: AtomicUsize,
}

impl MockFetcher {
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            result: Mutex::new(Ok(VideoBuilder::new().build())),
            pause: Mutex::new(None),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn returns(&self, result: Result<FetchedVideo, FetchError>) {
        *self.result.lock().unwrap() = result;
    }

    /// Makes the next fetches wait until the returned handle is notified.
    pub fn pause(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.pause.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TranscriptFetcher for MockFetcher {
    fn platform(&self) -> Platform {
        self.platform
    }

    async fn fetch(&self, _normalized_url: &str) -> Result<FetchedVideo, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.pause.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.result.lock().unwrap().clone()
    }
}

/// Extractor double that counts calls.
pub struct CountingExtractor {
    result: Mutex<Result<ExtractionOutput, ExtractError>>,
    calls: AtomicUsize,
    languages: Mutex<Vec<TargetLanguage>>,
}

impl CountingExtractor {
    pub fn new() -> Self {
        Self {
            result: Mutex::new(Ok(DraftBuilder::new("Banana pancakes").build())),
            calls: AtomicUsize::new(0),
            languages: Mutex::new(Vec::new()),
        }
    }

    pub fn returns(&self, result: Result<ExtractionOutput, ExtractError>) {
        *self.result.lock().unwrap() = result;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requested_languages(&self) -> Vec<TargetLanguage> {
        self.languages.lock().unwrap().clone()
    }
}

#[async_trait]
impl RecipeExtractor for CountingExtractor {
    async fn extract(
        &self,
        _transcript: &str,
        _metadata: &VideoMetadata,
        target_language: &TargetLanguage,
    ) -> Result<ExtractionOutput, ExtractError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.languages.lock().unwrap().push(target_language.clone());
        self.result.lock().unwrap().clone()
    }
}

/// Records dispatched job ids; tests run them explicitly.
#[derive(Default)]
pub struct RecordingDispatcher {
    ids: Mutex<Vec<String>>,
    closed: AtomicBool,
}

impl RecordingDispatcher {
    pub fn dispatched(&self) -> Vec<String> {
        self.ids.lock().unwrap().clone()
    }

    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

impl JobDispatcher for RecordingDispatcher {
    fn dispatch(&self, job_id: &str) -> Result<(), WorkerError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(WorkerError::ChannelClosed);
        }
        self.ids.lock().unwrap().push(job_id.to_string());
        Ok(())
    }
}

/// A reported state change as seen by a progress consumer.
#[derive(Debug, Clone, PartialEq)]
pub struct Reported {
    pub job_id: String,
    pub status: JobStatus,
    pub progress: u8,
}

#[derive(Default)]
pub struct RecordingProgress {
    events: Mutex<Vec<Reported>>,
}

impl RecordingProgress {
    pub fn for_job(&self, job_id: &str) -> Vec<Reported> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.job_id == job_id)
            .cloned()
            .collect()
    }
}

impl ProgressReporter for RecordingProgress {
    fn report(&self, job: &ExtractionJob, event: ProgressEvent) {
        let (status, progress) = match event {
            ProgressEvent::Status { status, .. } => {
                (status, status.progress().unwrap_or(job.progress))
            }
            ProgressEvent::Completed { .. } => (JobStatus::Completed, 100),
            ProgressEvent::Failed { .. } => (JobStatus::Failed, job.progress),
        };
        self.events.lock().unwrap().push(Reported {
            job_id: job.public_id.clone(),
            status,
            progress,
        });
    }
}

/// A fully wired application over an in-memory database.
pub struct TestApp {
    pub db: Database,
    pub clock: Arc<FixedClock>,
    pub quota: QuotaGate,
    pub service: ExtractionService,
    pub extractor: Arc<CountingExtractor>,
    pub dispatcher: Arc<RecordingDispatcher>,
    pub progress: Arc<RecordingProgress>,
    fetchers: HashMap<Platform, Arc<MockFetcher>>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(LimitsConfig::default(), PipelineConfig::default())
    }

    pub fn with_limits(limits: LimitsConfig) -> Self {
        Self::with_config(limits, PipelineConfig::default())
    }

    pub fn with_config(limits: LimitsConfig, pipeline: PipelineConfig) -> Self {
        let db = Database::open_in_memory().expect("in-memory database");
        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2026, 1, 15, 12, 0, 0).unwrap(),
        ));
        let dyn_clock: Arc<dyn Clock> = clock.clone();

        let mut registry = FetcherRegistry::new();
        let mut fetchers = HashMap::new();
        for platform in Platform::ALL {
            let fetcher = Arc::new(MockFetcher::new(platform));
            registry.register(fetcher.clone());
            fetchers.insert(platform, fetcher);
        }

        let extractor = Arc::new(CountingExtractor::new());
        let progress = Arc::new(RecordingProgress::default());
        let dispatcher = Arc::new(RecordingDispatcher::default());
        let quota = QuotaGate::new(db.clone(), limits, dyn_clock.clone());

        let orchestrator = Arc::new(Orchestrator::new(
            db.clone(),
            registry,
            extractor.clone(),
            quota.clone(),
            progress.clone(),
            dyn_clock.clone(),
            pipeline,
        ));
        let resolver =
            UrlResolver::new(5, Duration::from_secs(1)).expect("resolver client builds");
        let service = ExtractionService::new(
            db.clone(),
            resolver,
            quota.clone(),
            orchestrator,
            dispatcher.clone(),
            progress.clone(),
            dyn_clock,
        );

        Self {
            db,
            clock,
            quota,
            service,
            extractor,
            dispatcher,
            progress,
            fetchers,
        }
    }

    pub fn fetcher(&self, platform: Platform) -> &Arc<MockFetcher> {
        &self.fetchers[&platform]
    }

    pub fn used(&self, user_id: &str) -> u32 {
        self.quota.can_extract(user_id).unwrap().used
    }

    /// Submits and expects a new job; returns its id.
    pub async fn submit_job(&self, user_id: &str, url: &str) -> String {
        match self
            .service
            .submit(user_id, SubmitRequest::new(url))
            .await
            .expect("submission accepted")
        {
            SubmitResponse::Accepted { job_id, .. } => job_id,
            other => panic!("expected a new job, got {other:?}"),
        }
    }

    /// Submits and runs the job to a terminal state.
    pub async fn extract(&self, user_id: &str, url: &str) -> (String, RunOutcome) {
        let job_id = self.submit_job(user_id, url).await;
        let outcome = self.service.run_job(&job_id).await;
        (job_id, outcome)
    }
}
