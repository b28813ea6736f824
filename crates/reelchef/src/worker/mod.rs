//! Background execution of extraction jobs.
//!
//! The submission path hands a job id to a [`JobDispatcher`] and returns
//! without waiting; the outcome is only observable through the job record.

pub mod dispatch;
pub mod pool;

pub use dispatch::{InlineDispatcher, JobDispatcher, JobRunner};
pub use pool::WorkerPool;
