//! Short-link expansion.
//!
//! Short links (`vm.tiktok.com/...`, `bit.ly/...`) are expanded by following
//! `Location` headers one hop at a time, stopping as soon as the target is
//! a canonical video URL. Resolution never fails: on any error the
//! unwrapped input is returned and detection decides what it is.

use std::collections::HashSet;
use std::time::Duration;

use moka::sync::Cache;
use reqwest::header::LOCATION;
use url::Url;

use super::detect::{detect_platform, host_of, parse_lenient, Detection};
use super::redirector::unwrap_redirector;

const DEFAULT_SHORTENERS: &[&str] = &[
    "vm.tiktok.com",
    "vt.tiktok.com",
    "bit.ly",
    "t.co",
    "tinyurl.com",
    "ow.ly",
    "buff.ly",
];

const USER_AGENT: &str = concat!("reelchef/", env!("CARGO_PKG_VERSION"));

/// Expands short links into canonical platform URLs.
#[derive(Clone)]
pub struct UrlResolver {
    client: reqwest::Client,
    max_hops: usize,
    shorteners: HashSet<String>,
    resolved: Cache<String, String>,
}

impl UrlResolver {
    pub fn new(max_hops: usize, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            max_hops: max_hops.max(1),
            shorteners: DEFAULT_SHORTENERS.iter().map(|h| h.to_string()).collect(),
            resolved: Cache::builder()
                .max_capacity(10_000)
                .time_to_live(Duration::from_secs(60 * 60))
                .build(),
        })
    }

    /// Treats additional hosts as link shorteners.
    pub fn with_shortener_hosts<I, S>(mut self, hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.shorteners
            .extend(hosts.into_iter().map(|h| h.into().to_ascii_lowercase()));
        self
    }

    /// Returns the URL the input ultimately points to.
    pub async fn resolve(&self, input: &str) -> String {
        let unwrapped = unwrap_redirector(input);
        if !self.needs_network(&unwrapped) {
            return unwrapped;
        }

        if let Some(hit) = self.resolved.get(&unwrapped) {
            return hit;
        }

        match self.follow_redirects(&unwrapped).await {
            Some(target) => {
                tracing::debug!(from = %unwrapped, to = %target, "Resolved short link");
                self.resolved.insert(unwrapped, target.clone());
                target
            }
            None => unwrapped,
        }
    }

    /// Resolves the input and classifies the result.
    pub async fn resolve_and_detect(&self, input: &str) -> Detection {
        detect_platform(&self.resolve(input).await)
    }

    fn needs_network(&self, url: &str) -> bool {
        let detection = detect_platform(url);
        if detection.is_valid {
            return detection.is_short_link;
        }
        parse_lenient(url)
            .and_then(|u| host_of(&u))
            .map(|host| {
                let base = host.strip_prefix("www.").unwrap_or(&host);
                self.shorteners.contains(base)
            })
            .unwrap_or(false)
    }

    async fn follow_redirects(&self, start: &str) -> Option<String> {
        let mut current = parse_lenient(start)?;

        for _ in 0..self.max_hops {
            let response = match self.client.head(current.clone()).send().await {
                Ok(response) => response,
                Err(e) => {
                    tracing::warn!(url = %current, error = %e, "Short link request failed");
                    return None;
                }
            };

            if !response.status().is_redirection() {
                tracing::debug!(url = %current, status = %response.status(), "Short link did not redirect");
                return None;
            }

            let location = response.headers().get(LOCATION)?.to_str().ok()?;
            let next: Url = current.join(location).ok()?;
            let unwrapped = unwrap_redirector(next.as_str());

            let detection = detect_platform(&unwrapped);
            if detection.is_valid && !detection.is_short_link {
                return Some(unwrapped);
            }
            current = parse_lenient(&unwrapped)?;
        }

        tracing::warn!(url = %start, max_hops = self.max_hops, "Short link exceeded redirect limit");
        None
    }
}
