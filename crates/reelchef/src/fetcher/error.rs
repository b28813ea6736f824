use thiserror::Error;

use crate::model::Platform;

/// Failure to retrieve a video's transcript.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("{platform} unavailable: {reason}")]
    Unavailable { platform: Platform, reason: String },

    #[error("{platform} video has no transcript")]
    NoTranscript { platform: Platform },

    #[error("{platform} video is private")]
    Private { platform: Platform },

    #[error("{platform} video was deleted")]
    Deleted { platform: Platform },

    #[error("{platform} video is region-blocked")]
    RegionBlocked { platform: Platform },

    #[error("{platform} request timed out")]
    Timeout { platform: Platform },

    #[error("no fetcher configured for {platform}")]
    Unsupported { platform: Platform },
}

impl FetchError {
    pub fn platform(&self) -> Platform {
        match self {
            Self::Unavailable { platform, .. }
            | Self::NoTranscript { platform }
            | Self::Private { platform }
            | Self::Deleted { platform }
            | Self::RegionBlocked { platform }
            | Self::Timeout { platform }
            | Self::Unsupported { platform } => *platform,
        }
    }

    /// Message written to the failed job and shown to the end user.
    pub fn user_message(&self) -> String {
        let name = self.platform().display_name();
        match self {
            Self::NoTranscript {
                platform: Platform::YouTube,
            } => "This YouTube video has no captions or transcript available".to_string(),
            Self::NoTranscript { .. } => format!(
                "No transcript available: this {} video has no speech or caption to read a recipe from",
                name
            ),
            Self::Private { .. } => format!("This {} video is private or requires a login", name),
            Self::Deleted { .. } => {
                format!("This {} video has been deleted or is no longer available", name)
            }
            Self::RegionBlocked { .. } => {
                format!("This {} video is not available in our region", name)
            }
            Self::Timeout { .. } => {
                format!("Fetching the {} video took too long. Please try again", name)
            }
            Self::Unavailable { .. } => {
                format!("Could not reach {} right now. Please try again later", name)
            }
            Self::Unsupported { .. } => format!("{} videos are not supported yet", name),
        }
    }
}
