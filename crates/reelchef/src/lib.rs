pub mod broadcast;
pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod extractor;
pub mod fetcher;
pub mod model;
pub mod notify;
pub mod pipeline;
pub mod platform;
pub mod quota;
pub mod secrets;
pub mod service;
pub mod telemetry;
pub mod worker;

pub use broadcast::{JobProgressBroadcaster, JobProgressEvent};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{load_config, Config, PipelineConfig};
pub use db::{Database, DatabaseError};
pub use error::{ConfigError, PollError, ReelchefError, Result, SubmitError, WorkerError};
pub use extractor::{ExtractError, LlmRecipeExtractor, ProviderFactory, RecipeExtractor};
pub use fetcher::{FetchError, FetcherRegistry, TranscriptFetcher};
pub use model::{ExtractionJob, JobStatus, JobView, Platform, Recipe, TargetLanguage};
pub use notify::{spawn_notification_bridge, LogNotifier, Notifier};
pub use pipeline::{Orchestrator, PipelineError, RunOutcome};
pub use platform::{detect_platform, Detection, UrlResolver};
pub use quota::{QuotaGate, QuotaStatus};
pub use secrets::{resolve_secret, resolve_secret_optional, SecretError};
pub use service::{ExtractionService, SubmitRequest, SubmitResponse};
pub use worker::{InlineDispatcher, JobDispatcher, JobRunner, WorkerPool};
