use crate::broadcast::{JobProgressBroadcaster, JobProgressEvent};
use crate::model::{ExtractionJob, JobStatus};

/// Events emitted while a job moves through the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    Status { status: JobStatus, message: String },
    Completed { recipe_id: String },
    Failed { error: String },
}

pub trait ProgressReporter: Send + Sync {
    fn report(&self, job: &ExtractionJob, event: ProgressEvent);
}

/// No-op reporter for unit tests.
pub struct NoopProgress;

impl ProgressReporter for NoopProgress {
    fn report(&self, _job: &ExtractionJob, _event: ProgressEvent) {}
}

/// Bridges pipeline events to the broadcast channel.
pub struct BroadcastProgress {
    broadcaster: JobProgressBroadcaster,
}

impl BroadcastProgress {
    pub fn new(broadcaster: JobProgressBroadcaster) -> Self {
        Self { broadcaster }
    }
}

impl ProgressReporter for BroadcastProgress {
    fn report(&self, job: &ExtractionJob, event: ProgressEvent) {
        let event = match event {
            ProgressEvent::Status { status, message } => {
                JobProgressEvent::new(job, status, &message)
            }
            ProgressEvent::Completed { recipe_id } => JobProgressEvent::completed(job, &recipe_id),
            ProgressEvent::Failed { error } => JobProgressEvent::failed(job, &error),
        };
        self.broadcaster.send(event);
    }
}
