//! Client for the hosted transcript service.
//!
//! `GET {base}/v1/transcript?url=<video>&text=true` with an `x-api-key`
//! header returns `{ "content": "...", "lang": "en" }`. Some deployments
//! return timed segments instead of plain text; both shapes are accepted.

use std::time::Duration;

use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::error::FetchError;
use crate::model::Platform;

#[derive(Debug, Clone, PartialEq)]
pub struct Transcript {
    pub text: String,
    pub language: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TranscriptResponse {
    #[serde(default)]
    content: Option<TranscriptContent>,
    #[serde(default)]
    lang: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TranscriptContent {
    Text(String),
    Segments(Vec<Segment>),
}

#[derive(Debug, Deserialize)]
struct Segment {
    text: String,
}

impl TranscriptContent {
    fn into_text(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::Segments(segments) => segments
                .into_iter()
                .map(|s| s.text.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join(" "),
        }
    }
}

pub struct TranscriptApiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<SecretString>,
}

impl TranscriptApiClient {
    pub fn new(
        base_url: &str,
        api_key: Option<SecretString>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    pub async fn fetch(&self, platform: Platform, video_url: &str) -> Result<Transcript, FetchError> {
        let mut request = self
            .client
            .get(format!("{}/v1/transcript", self.base_url))
            .query(&[("url", video_url), ("text", "true")]);
        if let Some(key) = &self.api_key {
            request = request.header("x-api-key", key.expose_secret());
        }

        let response = request
            .send()
            .await
            .map_err(|e| request_error(platform, e))?;

        let status = response.status();
        if !status.is_success() {
            log::warn!("Transcript service returned {} for {}", status, video_url);
            return Err(status_error(platform, status));
        }

        let body: TranscriptResponse = response.json().await.map_err(|e| FetchError::Unavailable {
            platform,
            reason: format!("invalid transcript response: {}", e),
        })?;

        let text = body
            .content
            .map(TranscriptContent::into_text)
            .unwrap_or_default();
        let text = text.trim();
        if text.is_empty() {
            return Err(FetchError::NoTranscript { platform });
        }

        Ok(Transcript {
            text: text.to_string(),
            language: body.lang.filter(|l| !l.is_empty()),
        })
    }
}

fn status_error(platform: Platform, status: StatusCode) -> FetchError {
    match status.as_u16() {
        404 => FetchError::NoTranscript { platform },
        401 | 403 => FetchError::Private { platform },
        410 => FetchError::Deleted { platform },
        451 => FetchError::RegionBlocked { platform },
        408 | 504 => FetchError::Timeout { platform },
        _ => FetchError::Unavailable {
            platform,
            reason: format!("transcript service returned HTTP {}", status),
        },
    }
}

fn request_error(platform: Platform, e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout { platform }
    } else {
        FetchError::Unavailable {
            platform,
            reason: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn client(server: &mockito::Server) -> TranscriptApiClient {
        TranscriptApiClient::new(
            &server.url(),
            Some(SecretString::from("test-key".to_string())),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    const VIDEO: &str = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";

    #[tokio::test]
    async fn test_fetch_text_transcript() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/v1/transcript")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("url".into(), VIDEO.into()),
                Matcher::UrlEncoded("text".into(), "true".into()),
            ]))
            .match_header("x-api-key", "test-key")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"content":"  Add two cups of flour  ","lang":"en"}"#)
            .create_async()
            .await;

        let transcript = client(&server).fetch(Platform::YouTube, VIDEO).await.unwrap();
        assert_eq!(transcript.text, "Add two cups of flour");
        assert_eq!(transcript.language.as_deref(), Some("en"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_segmented_transcript() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v1/transcript")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"content":[{"text":"Chop onions","offset":0},{"text":" then fry","offset":1200}]}"#)
            .create_async()
            .await;

        let transcript = client(&server).fetch(Platform::TikTok, VIDEO).await.unwrap();
        assert_eq!(transcript.text, "Chop onions then fry");
        assert_eq!(transcript.language, None);
    }

    #[tokio::test]
    async fn test_empty_content_is_no_transcript() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v1/transcript")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"content":"   ","lang":"en"}"#)
            .create_async()
            .await;

        let err = client(&server).fetch(Platform::YouTube, VIDEO).await.unwrap_err();
        assert_eq!(
            err,
            FetchError::NoTranscript {
                platform: Platform::YouTube
            }
        );
    }

    #[tokio::test]
    async fn test_status_mapping() {
        let cases = [
            (404, FetchError::NoTranscript { platform: Platform::YouTube }),
            (403, FetchError::Private { platform: Platform::YouTube }),
            (410, FetchError::Deleted { platform: Platform::YouTube }),
            (451, FetchError::RegionBlocked { platform: Platform::YouTube }),
        ];
        for (status, expected) in cases {
            let mut server = mockito::Server::new_async().await;
            server
                .mock("GET", "/v1/transcript")
                .match_query(Matcher::Any)
                .with_status(status)
                .create_async()
                .await;

            let err = client(&server).fetch(Platform::YouTube, VIDEO).await.unwrap_err();
            assert_eq!(err, expected, "HTTP {status}");
        }

        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v1/transcript")
            .match_query(Matcher::Any)
            .with_status(500)
            .create_async()
            .await;
        let err = client(&server).fetch(Platform::YouTube, VIDEO).await.unwrap_err();
        assert!(matches!(err, FetchError::Unavailable { .. }));
    }
}
