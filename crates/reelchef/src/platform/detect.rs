//! URL classification and canonicalization.
//!
//! The canonical form is rebuilt from the platform and the extracted id
//! alone, so mobile hosts, usernames, query strings and trailing slashes
//! never reach the dedup/cache key.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use url::Url;

use crate::model::Platform;

use super::redirector::unwrap_redirector;

const TIKTOK_CANONICAL_PREFIX: &str = "https://www.tiktok.com/video/";

static YOUTUBE_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{11}$").unwrap());
static TIKTOK_ID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{1,25}$").unwrap());
static TIKTOK_LEGACY_FILE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,25})(?:\.html)?$").unwrap());
static INSTAGRAM_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{5,64}$").unwrap());
static SHORT_CODE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z0-9]{4,32}$").unwrap());

/// Why a URL was rejected. The message is safe to show to end users.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlatformError {
    #[error("Please provide a video URL")]
    Empty,

    #[error("That doesn't look like a valid URL")]
    Malformed,

    #[error("Unsupported link. Please share a TikTok, Instagram or YouTube video URL")]
    Unsupported,

    #[error("{}", not_a_video_message(.0))]
    NotAVideo(Platform),
}

fn not_a_video_message(platform: &Platform) -> &'static str {
    match platform {
        Platform::TikTok => "This TikTok link doesn't point to a video",
        Platform::Instagram => "This Instagram link doesn't point to a post or reel",
        Platform::YouTube => "This YouTube link doesn't point to a video",
    }
}

/// Outcome of classifying a URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Detection {
    pub platform: Option<Platform>,
    pub is_valid: bool,
    /// Canonical URL used as the dedup and cache key.
    pub normalized_form: Option<String>,
    pub video_id: Option<String>,
    /// The URL is a platform short link that could not be expanded.
    pub is_short_link: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Detection {
    fn video(platform: Platform, id: &str) -> Self {
        let normalized = match platform {
            Platform::TikTok => format!("{}{}", TIKTOK_CANONICAL_PREFIX, id),
            Platform::Instagram => format!("https://www.instagram.com/p/{}", id),
            Platform::YouTube => format!("https://www.youtube.com/watch?v={}", id),
        };
        Self {
            platform: Some(platform),
            is_valid: true,
            normalized_form: Some(normalized),
            video_id: Some(id.to_string()),
            is_short_link: false,
            error: None,
        }
    }

    fn short_link(platform: Platform, canonical: String) -> Self {
        Self {
            platform: Some(platform),
            is_valid: true,
            normalized_form: Some(canonical),
            video_id: None,
            is_short_link: true,
            error: None,
        }
    }

    fn invalid(error: PlatformError) -> Self {
        let platform = match error {
            PlatformError::NotAVideo(platform) => Some(platform),
            _ => None,
        };
        Self {
            platform,
            is_valid: false,
            normalized_form: None,
            video_id: None,
            is_short_link: false,
            error: Some(error.to_string()),
        }
    }
}

/// Parses user input as an http(s) URL, adding a scheme when missing.
pub(crate) fn parse_lenient(input: &str) -> Option<Url> {
    let input = input.trim();
    let url = if input.contains("://") {
        Url::parse(input).ok()?
    } else {
        Url::parse(&format!("https://{}", input)).ok()?
    };
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return None;
    }
    Some(url)
}

/// Lowercased host without a trailing dot.
pub(crate) fn host_of(url: &Url) -> Option<String> {
    url.host_str()
        .map(|h| h.trim_end_matches('.').to_ascii_lowercase())
}

fn classify_host(host: &str) -> Option<Platform> {
    let base = host.strip_prefix("www.").unwrap_or(host);
    match base {
        "tiktok.com" | "m.tiktok.com" | "vm.tiktok.com" | "vt.tiktok.com" => Some(Platform::TikTok),
        "instagram.com" | "m.instagram.com" | "instagr.am" => Some(Platform::Instagram),
        "youtube.com" | "m.youtube.com" | "music.youtube.com" | "youtu.be"
        | "youtube-nocookie.com" => Some(Platform::YouTube),
        _ => None,
    }
}

/// Classifies `input` and extracts its canonical form.
pub fn detect_platform(input: &str) -> Detection {
    match classify(input) {
        Ok(detection) => detection,
        Err(error) => Detection::invalid(error),
    }
}

fn classify(input: &str) -> Result<Detection, PlatformError> {
    if input.trim().is_empty() {
        return Err(PlatformError::Empty);
    }
    let url = parse_lenient(input).ok_or(PlatformError::Malformed)?;
    let host = host_of(&url).ok_or(PlatformError::Malformed)?;
    let segments: Vec<&str> = url
        .path_segments()
        .map(|s| s.filter(|p| !p.is_empty()).collect())
        .unwrap_or_default();

    match classify_host(&host) {
        Some(Platform::TikTok) => detect_tiktok(&host, &segments),
        Some(Platform::Instagram) => detect_instagram(&segments),
        Some(Platform::YouTube) => detect_youtube(&host, &url, &segments),
        None => Err(PlatformError::Unsupported),
    }
}

fn detect_tiktok(host: &str, segments: &[&str]) -> Result<Detection, PlatformError> {
    if host == "vm.tiktok.com" || host == "vt.tiktok.com" {
        return match segments {
            [code] if SHORT_CODE.is_match(code) => Ok(Detection::short_link(
                Platform::TikTok,
                format!("https://{}/{}", host, code),
            )),
            _ => Err(PlatformError::NotAVideo(Platform::TikTok)),
        };
    }

    let id = match segments {
        [user, "video", id] if user.starts_with('@') && TIKTOK_ID.is_match(id) => Some(*id),
        ["video", id] if TIKTOK_ID.is_match(id) => Some(*id),
        ["embed", "v2", id] | ["embed", id] if TIKTOK_ID.is_match(id) => Some(*id),
        ["v", file] => TIKTOK_LEGACY_FILE
            .captures(file)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str()),
        ["t", code] if SHORT_CODE.is_match(code) => {
            return Ok(Detection::short_link(
                Platform::TikTok,
                format!("https://www.tiktok.com/t/{}", code),
            ));
        }
        _ => None,
    };

    id.map(|id| Detection::video(Platform::TikTok, id))
        .ok_or(PlatformError::NotAVideo(Platform::TikTok))
}

fn detect_instagram(segments: &[&str]) -> Result<Detection, PlatformError> {
    let is_post_kind = |s: &str| matches!(s, "p" | "reel" | "reels" | "tv");
    let code = match segments {
        [kind, code, ..] if is_post_kind(kind) => Some(*code),
        [_user, kind, code, ..] if is_post_kind(kind) => Some(*code),
        _ => None,
    };

    match code {
        Some(code) if INSTAGRAM_CODE.is_match(code) => {
            Ok(Detection::video(Platform::Instagram, code))
        }
        _ => Err(PlatformError::NotAVideo(Platform::Instagram)),
    }
}

fn detect_youtube(host: &str, url: &Url, segments: &[&str]) -> Result<Detection, PlatformError> {
    let id = if host == "youtu.be" || host == "www.youtu.be" {
        segments.first().map(|s| s.to_string())
    } else {
        match segments {
            ["watch"] => url
                .query_pairs()
                .find(|(k, _)| k == "v")
                .map(|(_, v)| v.into_owned()),
            ["shorts", id, ..] | ["embed", id, ..] | ["live", id, ..] | ["v", id, ..] => {
                Some(id.to_string())
            }
            _ => None,
        }
    };

    match id {
        Some(id) if YOUTUBE_ID.is_match(&id) => Ok(Detection::video(Platform::YouTube, &id)),
        _ => Err(PlatformError::NotAVideo(Platform::YouTube)),
    }
}

/// URL handed to transcript and oEmbed services for a canonical key.
///
/// TikTok endpoints only accept `/@handle/video/<id>`. The handle comes
/// from the submitted URL when it names the same video, otherwise the
/// empty handle `@` is used. Other platforms fetch the canonical URL as is.
pub fn fetch_url(source_url: &str, normalized: &str) -> String {
    let Some(id) = normalized.strip_prefix(TIKTOK_CANONICAL_PREFIX) else {
        return normalized.to_string();
    };
    let handle = parse_lenient(&unwrap_redirector(source_url))
        .and_then(|url| {
            let segments: Vec<String> = url
                .path_segments()?
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
            match segments.as_slice() {
                [user, kind, video] if user.starts_with('@') && kind == "video" && video == id => {
                    Some(user.clone())
                }
                _ => None,
            }
        })
        .unwrap_or_else(|| "@".to_string());
    format!("https://www.tiktok.com/{}/video/{}", handle, id)
}
