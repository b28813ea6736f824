//! Unwrapping of link-tracking redirectors.
//!
//! Links shared from inside apps often arrive wrapped in a tracking
//! redirect (`l.instagram.com/?u=...`). The target is carried in a query
//! parameter, so no network call is needed to recover it.

use url::Url;

use super::detect::{host_of, parse_lenient};

const MAX_DEPTH: usize = 3;

/// Returns the innermost target of a chain of tracking redirectors, or
/// the trimmed input when it is not wrapped.
pub fn unwrap_redirector(input: &str) -> String {
    let mut current = input.trim().to_string();
    for _ in 0..MAX_DEPTH {
        match unwrap_once(&current) {
            Some(inner) => current = inner,
            None => break,
        }
    }
    current
}

fn unwrap_once(input: &str) -> Option<String> {
    let url = parse_lenient(input)?;
    let host = host_of(&url)?;
    let path = url.path();

    let inner = match host.as_str() {
        "l.instagram.com" => query_param(&url, &["u"]),
        "l.facebook.com" | "lm.facebook.com" | "m.facebook.com" if path == "/l.php" => {
            query_param(&url, &["u"])
        }
        "google.com" | "www.google.com" if path == "/url" => query_param(&url, &["q", "url"]),
        "youtube.com" | "www.youtube.com" | "m.youtube.com" => match path {
            "/redirect" => query_param(&url, &["q"]),
            // Carries a relative path such as `/watch?v=...&feature=share`.
            "/attribution_link" => query_param(&url, &["u"])
                .and_then(|rel| Url::parse("https://www.youtube.com").ok()?.join(&rel).ok())
                .map(|u| u.to_string()),
            _ => None,
        },
        _ => None,
    }?;

    parse_lenient(&inner).map(|u| u.to_string())
}

fn query_param(url: &Url, names: &[&str]) -> Option<String> {
    names.iter().find_map(|name| {
        url.query_pairs()
            .find(|(k, v)| k == name && !v.is_empty())
            .map(|(_, v)| v.into_owned())
    })
}
