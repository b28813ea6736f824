use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, Instrument};

use crate::error::WorkerError;
use crate::pipeline::{Orchestrator, RunOutcome};

/// Anything that can drive a job to a terminal state.
#[async_trait]
pub trait JobRunner: Send + Sync {
    async fn run(&self, job_id: &str) -> RunOutcome;
}

#[async_trait]
impl JobRunner for Orchestrator {
    async fn run(&self, job_id: &str) -> RunOutcome {
        self.process_extraction(job_id).await
    }
}

/// Fire-and-forget hand-off of a freshly created job.
pub trait JobDispatcher: Send + Sync {
    fn dispatch(&self, job_id: &str) -> Result<(), WorkerError>;
}

/// Spawns one detached task per job on the current runtime.
pub struct InlineDispatcher {
    runner: Arc<dyn JobRunner>,
}

impl InlineDispatcher {
    pub fn new(runner: Arc<dyn JobRunner>) -> Self {
        Self { runner }
    }
}

impl JobDispatcher for InlineDispatcher {
    fn dispatch(&self, job_id: &str) -> Result<(), WorkerError> {
        let handle = tokio::runtime::Handle::try_current()
            .map_err(|e| WorkerError::NoRuntime(e.to_string()))?;
        let runner = Arc::clone(&self.runner);
        let job_id = job_id.to_string();
        let span = tracing::debug_span!("inline_job", job_id = %job_id);
        handle.spawn(
            async move {
                let outcome = runner.run(&job_id).await;
                debug!(?outcome, "Inline job finished");
            }
            .instrument(span),
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    struct ChannelRunner(mpsc::UnboundedSender<String>);

    #[async_trait]
    impl JobRunner for ChannelRunner {
        async fn run(&self, job_id: &str) -> RunOutcome {
            let _ = self.0.send(job_id.to_string());
            RunOutcome::NotFound
        }
    }

    #[tokio::test]
    async fn test_inline_dispatch_runs_job() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let dispatcher = InlineDispatcher::new(Arc::new(ChannelRunner(tx)));

        dispatcher.dispatch("job-1").unwrap();
        assert_eq!(rx.recv().await.as_deref(), Some("job-1"));
    }

    #[test]
    fn test_inline_dispatch_without_runtime() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let dispatcher = InlineDispatcher::new(Arc::new(ChannelRunner(tx)));

        assert!(matches!(
            dispatcher.dispatch("job-1"),
            Err(WorkerError::NoRuntime(_))
        ));
    }
}
