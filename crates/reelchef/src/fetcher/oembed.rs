//! Video metadata via the platforms' oEmbed endpoints.
//!
//! Metadata is best effort: an oEmbed failure never fails a fetch, the
//! recipe just ends up with less attribution.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::model::{Platform, VideoMetadata};

#[derive(Debug, Deserialize)]
struct OembedResponse {
    title: Option<String>,
    author_name: Option<String>,
    author_url: Option<String>,
    /// TikTok only.
    author_unique_id: Option<String>,
    thumbnail_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct OembedEndpoints {
    pub youtube: String,
    pub tiktok: String,
    pub instagram: String,
}

impl OembedEndpoints {
    fn for_platform(&self, platform: Platform) -> &str {
        match platform {
            Platform::YouTube => &self.youtube,
            Platform::TikTok => &self.tiktok,
            Platform::Instagram => &self.instagram,
        }
    }
}

pub struct OembedClient {
    client: reqwest::Client,
    endpoints: OembedEndpoints,
    instagram_token: Option<SecretString>,
}

impl OembedClient {
    pub fn new(
        endpoints: OembedEndpoints,
        instagram_token: Option<SecretString>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoints,
            instagram_token,
        })
    }

    pub async fn fetch(&self, platform: Platform, video_url: &str) -> Option<VideoMetadata> {
        let mut request = self
            .client
            .get(self.endpoints.for_platform(platform))
            .query(&[("url", video_url), ("format", "json")]);

        if platform == Platform::Instagram {
            let Some(token) = &self.instagram_token else {
                log::debug!("No Instagram oEmbed token configured, skipping metadata");
                return None;
            };
            request = request.query(&[("access_token", token.expose_secret())]);
        }

        let response = match request.send().await {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => {
                log::warn!("oEmbed returned {} for {}", r.status(), video_url);
                return None;
            }
            Err(e) => {
                log::warn!("oEmbed request failed for {}: {}", video_url, e);
                return None;
            }
        };

        match response.json::<OembedResponse>().await {
            Ok(body) => Some(to_metadata(platform, body)),
            Err(e) => {
                log::warn!("Invalid oEmbed response for {}: {}", video_url, e);
                None
            }
        }
    }
}

fn to_metadata(platform: Platform, body: OembedResponse) -> VideoMetadata {
    let author_handle = match platform {
        Platform::TikTok => body.author_unique_id.clone(),
        // Instagram reports the handle as the author name.
        Platform::Instagram => body.author_name.clone(),
        Platform::YouTube => body
            .author_url
            .as_deref()
            .and_then(|u| u.rsplit('/').next())
            .and_then(|segment| segment.strip_prefix('@'))
            .map(str::to_string),
    };

    VideoMetadata {
        title: body.title.filter(|t| !t.trim().is_empty()),
        author_name: body.author_name,
        author_handle,
        author_url: body.author_url,
        thumbnail_url: body.thumbnail_url,
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn client(server: &mockito::Server, token: Option<&str>) -> OembedClient {
        OembedClient::new(
            OembedEndpoints {
                youtube: format!("{}/youtube", server.url()),
                tiktok: format!("{}/tiktok", server.url()),
                instagram: format!("{}/instagram", server.url()),
            },
            token.map(|t| SecretString::from(t.to_string())),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_tiktok_metadata() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/tiktok")
            .match_query(Matcher::UrlEncoded(
                "url".into(),
                "https://www.tiktok.com/video/123".into(),
            ))
            .with_status(200)
            .with_body(
                r#"{"title":"Crispy garlic noodles #recipe","author_name":"Chef Ana","author_unique_id":"chefana","author_url":"https://www.tiktok.com/@chefana","thumbnail_url":"https://p16.example/thumb.jpg"}"#,
            )
            .create_async()
            .await;

        let meta = client(&server, None)
            .fetch(Platform::TikTok, "https://www.tiktok.com/video/123")
            .await
            .unwrap();
        assert_eq!(meta.title.as_deref(), Some("Crispy garlic noodles #recipe"));
        assert_eq!(meta.author_handle.as_deref(), Some("chefana"));
        assert_eq!(meta.caption(), Some("Crispy garlic noodles #recipe"));
    }

    #[tokio::test]
    async fn test_youtube_handle_from_author_url() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/youtube")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"title":"Best Lasagna","author_name":"Kitchen Co","author_url":"https://www.youtube.com/@kitchenco"}"#)
            .create_async()
            .await;

        let meta = client(&server, None)
            .fetch(Platform::YouTube, "https://www.youtube.com/watch?v=dQw4w9WgXcQ")
            .await
            .unwrap();
        assert_eq!(meta.author_handle.as_deref(), Some("kitchenco"));
        assert_eq!(meta.author_name.as_deref(), Some("Kitchen Co"));
    }

    #[tokio::test]
    async fn test_instagram_requires_token() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/instagram")
            .match_query(Matcher::UrlEncoded("access_token".into(), "app|token".into()))
            .with_status(200)
            .with_body(r#"{"title":"Sunday brunch","author_name":"brunchclub"}"#)
            .expect(1)
            .create_async()
            .await;

        let url = "https://www.instagram.com/p/C1a2B3c4D5e";
        assert!(client(&server, None).fetch(Platform::Instagram, url).await.is_none());

        let meta = client(&server, Some("app|token"))
            .fetch(Platform::Instagram, url)
            .await
            .unwrap();
        assert_eq!(meta.author_handle.as_deref(), Some("brunchclub"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_errors_yield_none() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/tiktok")
            .match_query(Matcher::Any)
            .with_status(404)
            .create_async()
            .await;
        server
            .mock("GET", "/youtube")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("<html>not json</html>")
            .create_async()
            .await;

        let client = client(&server, None);
        assert!(client.fetch(Platform::TikTok, "https://www.tiktok.com/video/1").await.is_none());
        assert!(client
            .fetch(Platform::YouTube, "https://www.youtube.com/watch?v=dQw4w9WgXcQ")
            .await
            .is_none());
    }
}
