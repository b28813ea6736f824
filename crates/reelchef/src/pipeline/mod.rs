pub mod error;
pub mod orchestrator;
pub mod progress;

pub use error::PipelineError;
pub use orchestrator::{Orchestrator, RunOutcome};
pub use progress::{BroadcastProgress, NoopProgress, ProgressEvent, ProgressReporter};
