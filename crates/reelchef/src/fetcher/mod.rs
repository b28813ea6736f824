//! Per-platform transcript and metadata retrieval.

pub mod error;
pub mod http;
pub mod oembed;
pub mod transcript_api;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::TranscriptConfig;
use crate::error::ReelchefError;
use crate::model::{Platform, VideoMetadata};

pub use error::FetchError;
pub use http::HttpVideoFetcher;
pub use oembed::{OembedClient, OembedEndpoints};
pub use transcript_api::{Transcript, TranscriptApiClient};

/// What a fetcher returns for one video.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedVideo {
    pub transcript: String,
    /// Language reported by the transcript source, if any.
    pub transcript_language: Option<String>,
    pub metadata: VideoMetadata,
}

#[async_trait]
pub trait TranscriptFetcher: Send + Sync {
    fn platform(&self) -> Platform;

    /// Retrieves transcript and metadata for a canonical video URL.
    async fn fetch(&self, normalized_url: &str) -> Result<FetchedVideo, FetchError>;
}

/// Maps each platform to its fetcher.
#[derive(Clone, Default)]
pub struct FetcherRegistry {
    fetchers: HashMap<Platform, Arc<dyn TranscriptFetcher>>,
}

impl FetcherRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a fetcher under its own platform, replacing any previous one.
    pub fn register(&mut self, fetcher: Arc<dyn TranscriptFetcher>) -> &mut Self {
        self.fetchers.insert(fetcher.platform(), fetcher);
        self
    }

    pub fn get(&self, platform: Platform) -> Option<Arc<dyn TranscriptFetcher>> {
        self.fetchers.get(&platform).cloned()
    }

    /// Builds the HTTP fetchers for all three platforms.
    pub fn from_config(config: &TranscriptConfig) -> Result<Self, ReelchefError> {
        let timeout = Duration::from_secs(config.request_timeout_secs);
        let api_key = config.api_key.resolve()?;
        if api_key.is_none() {
            log::warn!("No transcript API key configured; requests will be unauthenticated");
        }

        let transcripts = Arc::new(TranscriptApiClient::new(&config.base_url, api_key, timeout)?);
        let oembed = Arc::new(OembedClient::new(
            OembedEndpoints {
                youtube: config.oembed.youtube_url.clone(),
                tiktok: config.oembed.tiktok_url.clone(),
                instagram: config.oembed.instagram_url.clone(),
            },
            config.oembed.instagram_access_token.resolve()?,
            timeout,
        )?);

        let mut registry = Self::new();
        registry
            .register(Arc::new(HttpVideoFetcher::youtube(
                transcripts.clone(),
                oembed.clone(),
            )))
            .register(Arc::new(HttpVideoFetcher::tiktok(
                transcripts.clone(),
                oembed.clone(),
            )))
            .register(Arc::new(HttpVideoFetcher::instagram(transcripts, oembed)));
        Ok(registry)
    }
}
