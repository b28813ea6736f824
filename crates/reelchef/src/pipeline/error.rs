use thiserror::Error;

use crate::db::DatabaseError;
use crate::extractor::ExtractError;
use crate::fetcher::FetchError;
use crate::model::JobStatus;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Fetch stage failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Analyze stage failed: {0}")]
    Extract(#[from] ExtractError),

    #[error("Store failed: {0}")]
    Store(#[from] DatabaseError),

    #[error("Run exceeded {seconds}s")]
    Timeout { seconds: u64 },

    #[error("Job is no longer {expected}")]
    StateConflict { expected: JobStatus },

    #[error("User already has a recipe for this video")]
    DuplicateRecipe,

    #[error("Run panicked: {0}")]
    Panicked(String),
}

impl PipelineError {
    /// Message written to the failed job. Never contains raw provider or
    /// database detail.
    pub fn user_message(&self) -> String {
        match self {
            Self::Fetch(e) => e.user_message(),
            Self::Extract(e) => e.user_message(),
            Self::Store(_) => "We couldn't save this extraction. Please try again".to_string(),
            Self::Timeout { .. } => "Extraction took too long. Please try again".to_string(),
            Self::StateConflict { .. } => {
                "This extraction was interrupted. Please try again".to_string()
            }
            Self::DuplicateRecipe => "You already have a recipe for this video".to_string(),
            Self::Panicked(_) => {
                "Something went wrong during extraction. Please try again".to_string()
            }
        }
    }
}
