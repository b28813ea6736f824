use std::sync::Arc;

use async_trait::async_trait;

use super::error::FetchError;
use super::oembed::OembedClient;
use super::transcript_api::TranscriptApiClient;
use super::{FetchedVideo, TranscriptFetcher};
use crate::model::Platform;

/// Fetches a transcript from the transcript service and metadata from
/// oEmbed, concurrently.
pub struct HttpVideoFetcher {
    platform: Platform,
    transcripts: Arc<TranscriptApiClient>,
    oembed: Arc<OembedClient>,
    /// Use the post caption when the video has no spoken transcript.
    caption_fallback: bool,
}

impl HttpVideoFetcher {
    /// YouTube recipes need real captions; titles alone are never enough.
    pub fn youtube(transcripts: Arc<TranscriptApiClient>, oembed: Arc<OembedClient>) -> Self {
        Self {
            platform: Platform::YouTube,
            transcripts,
            oembed,
            caption_fallback: false,
        }
    }

    pub fn tiktok(transcripts: Arc<TranscriptApiClient>, oembed: Arc<OembedClient>) -> Self {
        Self {
            platform: Platform::TikTok,
            transcripts,
            oembed,
            caption_fallback: true,
        }
    }

    pub fn instagram(transcripts: Arc<TranscriptApiClient>, oembed: Arc<OembedClient>) -> Self {
        Self {
            platform: Platform::Instagram,
            transcripts,
            oembed,
            caption_fallback: true,
        }
    }
}

#[async_trait]
impl TranscriptFetcher for HttpVideoFetcher {
    fn platform(&self) -> Platform {
        self.platform
    }

    async fn fetch(&self, normalized_url: &str) -> Result<FetchedVideo, FetchError> {
        let (metadata, transcript) = tokio::join!(
            self.oembed.fetch(self.platform, normalized_url),
            self.transcripts.fetch(self.platform, normalized_url),
        );
        let metadata = metadata.unwrap_or_default();

        match transcript {
            Ok(t) => Ok(FetchedVideo {
                transcript: t.text,
                transcript_language: t.language,
                metadata,
            }),
            Err(FetchError::NoTranscript { platform }) if self.caption_fallback => {
                match metadata.caption() {
                    Some(caption) => {
                        log::info!("No spoken transcript for {}, using caption", normalized_url);
                        Ok(FetchedVideo {
                            transcript: caption.to_string(),
                            transcript_language: None,
                            metadata,
                        })
                    }
                    None => Err(FetchError::NoTranscript { platform }),
                }
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::oembed::OembedEndpoints;
    use mockito::Matcher;
    use std::time::Duration;

    fn clients(server: &mockito::Server) -> (Arc<TranscriptApiClient>, Arc<OembedClient>) {
        let transcripts =
            TranscriptApiClient::new(&server.url(), None, Duration::from_secs(5)).unwrap();
        let oembed = OembedClient::new(
            OembedEndpoints {
                youtube: format!("{}/oembed/youtube", server.url()),
                tiktok: format!("{}/oembed/tiktok", server.url()),
                instagram: format!("{}/oembed/instagram", server.url()),
            },
            None,
            Duration::from_secs(5),
        )
        .unwrap();
        (Arc::new(transcripts), Arc::new(oembed))
    }

    async fn mock_no_transcript(server: &mut mockito::Server) {
        server
            .mock("GET", "/v1/transcript")
            .match_query(Matcher::Any)
            .with_status(404)
            .create_async()
            .await;
    }

    #[tokio::test]
    async fn test_transcript_and_metadata_combined() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v1/transcript")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"content":"Whisk eggs with sugar","lang":"en"}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/oembed/youtube")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"title":"Tiramisu in 5 minutes","author_name":"Dolce"}"#)
            .create_async()
            .await;

        let (t, o) = clients(&server);
        let video = HttpVideoFetcher::youtube(t, o)
            .fetch("https://www.youtube.com/watch?v=dQw4w9WgXcQ")
            .await
            .unwrap();
        assert_eq!(video.transcript, "Whisk eggs with sugar");
        assert_eq!(video.transcript_language.as_deref(), Some("en"));
        assert_eq!(video.metadata.title.as_deref(), Some("Tiramisu in 5 minutes"));
    }

    #[tokio::test]
    async fn test_tiktok_falls_back_to_caption() {
        let mut server = mockito::Server::new_async().await;
        mock_no_transcript(&mut server).await;
        server
            .mock("GET", "/oembed/tiktok")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"title":"2 eggs, 1 banana, mash and fry 3 min per side"}"#)
            .create_async()
            .await;

        let (t, o) = clients(&server);
        let video = HttpVideoFetcher::tiktok(t, o)
            .fetch("https://www.tiktok.com/video/123")
            .await
            .unwrap();
        assert_eq!(video.transcript, "2 eggs, 1 banana, mash and fry 3 min per side");
        assert_eq!(video.transcript_language, None);
    }

    #[tokio::test]
    async fn test_youtube_requires_captions() {
        let mut server = mockito::Server::new_async().await;
        mock_no_transcript(&mut server).await;
        server
            .mock("GET", "/oembed/youtube")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"title":"Pancakes"}"#)
            .create_async()
            .await;

        let (t, o) = clients(&server);
        let err = HttpVideoFetcher::youtube(t, o)
            .fetch("https://www.youtube.com/watch?v=dQw4w9WgXcQ")
            .await
            .unwrap_err();
        assert_eq!(
            err,
            FetchError::NoTranscript {
                platform: Platform::YouTube
            }
        );
    }

    #[tokio::test]
    async fn test_no_caption_no_transcript() {
        let mut server = mockito::Server::new_async().await;
        mock_no_transcript(&mut server).await;
        server
            .mock("GET", "/oembed/tiktok")
            .match_query(Matcher::Any)
            .with_status(404)
            .create_async()
            .await;

        let (t, o) = clients(&server);
        let err = HttpVideoFetcher::tiktok(t, o)
            .fetch("https://www.tiktok.com/video/123")
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::NoTranscript { .. }));
    }

    #[tokio::test]
    async fn test_private_video_is_not_masked_by_caption() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v1/transcript")
            .match_query(Matcher::Any)
            .with_status(403)
            .create_async()
            .await;
        server
            .mock("GET", "/oembed/tiktok")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"title":"caption"}"#)
            .create_async()
            .await;

        let (t, o) = clients(&server);
        let err = HttpVideoFetcher::tiktok(t, o)
            .fetch("https://www.tiktok.com/video/123")
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Private { .. }));
    }
}
