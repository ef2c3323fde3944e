//! Canonical dedup keys for recipe source URLs.
//!
//! Video links collapse to a single `watch?v=` form so every alias of one
//! video maps to one key. Everything else is treated as an article: fragment,
//! query string and trailing slash are dropped and the scheme is forced to
//! https.

use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

/// Host used in every canonical video key.
const CANONICAL_VIDEO_HOST: &str = "www.youtube.com";

/// Hosts (after `www.`/`m.` stripping) that serve videos by id.
const VIDEO_HOSTS: &[&str] = &["youtube.com", "youtube-nocookie.com", "music.youtube.com"];

/// Short-link host whose first path segment is the video id.
const SHORT_LINK_HOST: &str = "youtu.be";

/// Path prefixes that are followed by a video id.
const VIDEO_PATH_PREFIXES: &[&str] = &["embed", "v", "shorts", "live"];

/// Query parameters that only carry click/campaign tracking.
const TRACKING_PARAMS: &[&str] = &[
    "fbclid", "gclid", "dclid", "msclkid", "mc_cid", "mc_eid", "igshid", "si", "ref", "ref_src",
    "_ga", "yclid",
];

/// A normalized URL string used by the recipe store as a uniqueness signal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalKey(String);

impl CanonicalKey {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for CanonicalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CanonicalKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Derive the canonical dedup key for `raw`.
///
/// Never fails: input that does not parse as an absolute URL with a host
/// degrades to its trimmed, lowercased form.
#[must_use]
pub fn canonicalize(raw: &str) -> CanonicalKey {
    let trimmed = raw.trim();
    let Some(url) = Url::parse(trimmed).ok().filter(|u| u.host_str().is_some()) else {
        tracing::debug!(url = trimmed, "unparseable URL, using best-effort key");
        return CanonicalKey(trimmed.to_lowercase());
    };

    let host = strip_host_prefix(&url.host_str().unwrap_or_default().to_lowercase());

    if is_video_host(&host) {
        if let Some(id) = video_id(&url, &host) {
            return CanonicalKey(format!("https://{CANONICAL_VIDEO_HOST}/watch?v={id}"));
        }
        tracing::debug!(url = trimmed, "video host without a video id, treating as article");
    }

    CanonicalKey(article_key(&url, &host))
}

/// Strip leading `www.`/`m.` labels until none remain, so the key is a fixed point.
fn strip_host_prefix(host: &str) -> String {
    let mut host = host;
    while let Some(rest) = host
        .strip_prefix("www.")
        .or_else(|| host.strip_prefix("m."))
        .filter(|rest| !rest.is_empty())
    {
        host = rest;
    }
    host.to_string()
}

fn is_video_host(host: &str) -> bool {
    host == SHORT_LINK_HOST || VIDEO_HOSTS.contains(&host)
}

fn video_id(url: &Url, host: &str) -> Option<String> {
    let segments: Vec<&str> = url
        .path_segments()
        .map(|s| s.filter(|seg| !seg.is_empty()).collect())
        .unwrap_or_default();

    let candidate = if host == SHORT_LINK_HOST {
        segments.first().map(|s| (*s).to_string())
    } else {
        match segments.as_slice() {
            ["watch", ..] => url
                .query_pairs()
                .find(|(k, _)| k == "v")
                .map(|(_, v)| v.into_owned()),
            [prefix, id, ..] if VIDEO_PATH_PREFIXES.contains(prefix) => Some((*id).to_string()),
            _ => None,
        }
    };

    candidate.filter(|id| is_valid_video_id(id))
}

fn is_valid_video_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn is_tracking_param(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower.starts_with("utm_") || TRACKING_PARAMS.contains(&lower.as_str())
}

fn article_key(url: &Url, host: &str) -> String {
    let kept: Vec<String> = url
        .query_pairs()
        .filter(|(k, _)| !is_tracking_param(k))
        .map(|(k, _)| k.into_owned())
        .collect();
    if !kept.is_empty() {
        tracing::debug!(params = ?kept, "dropping non-tracking query parameters");
    }

    let port = url
        .port()
        .filter(|p| *p != 443)
        .map(|p| format!(":{p}"))
        .unwrap_or_default();

    // Trailing slashes are stripped repeatedly so the key is a fixed point.
    let path = url.path();
    let path = if path.len() > 1 {
        match path.trim_end_matches('/') {
            "" => "/",
            trimmed => trimmed,
        }
    } else {
        path
    };

    format!("https://{host}{port}{path}")
}
