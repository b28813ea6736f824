//! Process-wide wiring of the extraction pipeline.

use std::sync::Arc;

use log::{info, warn};
use reelchef::broadcast::JobProgressBroadcaster;
use reelchef::clock::{Clock, SystemClock};
use reelchef::config::Config;
use reelchef::db::Database;
use reelchef::extractor::{LlmProvider, LlmRecipeExtractor, ProviderFactory};
use reelchef::fetcher::FetcherRegistry;
use reelchef::notify::{spawn_notification_bridge, LogNotifier, Notifier};
use reelchef::pipeline::{BroadcastProgress, Orchestrator};
use reelchef::platform::UrlResolver;
use reelchef::quota::QuotaGate;
use reelchef::service::ExtractionService;
use reelchef::worker::WorkerPool;
use reelchef::ReelchefError;
use secrecy::SecretString;
use tokio::task::JoinHandle;

/// State shared by all request handlers.
pub struct AppState {
    pub service: Arc<ExtractionService>,

    /// Shared secret for the internal routes. `None` disables them.
    pub worker_secret: Option<SecretString>,
}

/// Everything started at boot that has to be stopped on shutdown.
pub struct Runtime {
    pub state: Arc<AppState>,
    pub worker_pool: Arc<WorkerPool>,
    pub notification_bridge: JoinHandle<()>,
}

impl Runtime {
    /// Opens the store, builds every collaborator from `config` and starts
    /// the worker pool. Must be called inside a tokio runtime.
    pub fn start(config: &Config) -> Result<Self, ReelchefError> {
        Self::start_with_notifier(config, Arc::new(LogNotifier))
    }

    pub fn start_with_notifier(
        config: &Config,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, ReelchefError> {
        let db = Database::open(&config.database.resolved_path())?;
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        let fetchers = FetcherRegistry::from_config(&config.transcript)?;
        let provider = ProviderFactory::create(&config.ai)?;
        info!("Using AI provider '{}'", provider.provider_name());
        let extractor = Arc::new(LlmRecipeExtractor::new(provider));

        let quota = QuotaGate::new(db.clone(), config.limits.clone(), clock.clone());
        let broadcaster = JobProgressBroadcaster::new(config.server.broadcast_capacity);
        let progress = Arc::new(BroadcastProgress::new(broadcaster.clone()));

        let orchestrator = Arc::new(Orchestrator::new(
            db.clone(),
            fetchers,
            extractor,
            quota.clone(),
            progress.clone(),
            clock.clone(),
            config.pipeline.clone(),
        ));
        let worker_pool = Arc::new(WorkerPool::new(
            orchestrator.clone(),
            config.server.worker_count,
        ));

        let resolver = UrlResolver::new(
            config.pipeline.max_redirect_hops,
            config.pipeline.resolve_timeout(),
        )?;
        let service = Arc::new(ExtractionService::new(
            db,
            resolver,
            quota,
            orchestrator,
            worker_pool.clone(),
            progress,
            clock,
        ));

        let notification_bridge = spawn_notification_bridge(&broadcaster, notifier);

        let worker_secret = config.server.worker_secret.resolve()?;
        if worker_secret.is_none() {
            warn!("No worker secret configured; internal routes are disabled");
        }

        Ok(Self {
            state: Arc::new(AppState {
                service,
                worker_secret,
            }),
            worker_pool,
            notification_bridge,
        })
    }

    /// Drains the worker queue. In-flight jobs finish before this returns.
    pub async fn shutdown(self) {
        self.worker_pool.shutdown().await;
        self.notification_bridge.abort();
    }
}
