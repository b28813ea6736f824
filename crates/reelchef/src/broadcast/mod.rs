//! Broadcasting of job progress for real-time consumers.

pub mod job_progress;

pub use job_progress::{JobProgressBroadcaster, JobProgressEvent};
