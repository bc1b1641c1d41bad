//! Types exchanged with site adapters.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Item page contents.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Details {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poster_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plot: Option<String>,
    /// Empty for movies and live channels.
    #[serde(default)]
    pub episodes: Vec<Episode>,
}

/// One episode as listed by a source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Episode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub season: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub episode: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub url: String,
}

impl Episode {
    /// Whether this is exactly `season`/`episode`.
    pub fn is_numbered(&self, season: Option<u32>, episode: Option<u32>) -> bool {
        self.season == season && self.episode == episode
    }
}

/// A concrete playable URL, passed opaquely to the host player.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StreamLink {
    /// Name of the source that produced the link.
    pub source_label: String,
    pub display_name: String,
    pub url: String,
    pub is_hls: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referer: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
}

impl StreamLink {
    /// Build a link, flagging HLS from the URL.
    pub fn new(
        source_label: impl Into<String>,
        display_name: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        let url = url.into();
        Self {
            source_label: source_label.into(),
            display_name: display_name.into(),
            is_hls: url.to_ascii_lowercase().contains(".m3u8"),
            url,
            referer: None,
            headers: BTreeMap::new(),
        }
    }

    pub fn with_referer(mut self, referer: impl Into<String>) -> Self {
        self.referer = Some(referer.into());
        self
    }
}

/// Errors a single adapter call can fail with.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SourceError {
    #[error("Source connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Source returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Failed to parse source response: {0}")]
    Parse(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Operation not supported by source: {0}")]
    Unsupported(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<reqwest::Error> for SourceError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            SourceError::Timeout
        } else if e.is_connect() {
            SourceError::ConnectionFailed(e.to_string())
        } else if e.is_decode() {
            SourceError::Parse(e.to_string())
        } else {
            SourceError::Internal(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_link_detects_hls() {
        let hls = StreamLink::new("alpha", "Alpha", "https://cdn/x/master.M3U8?token=1");
        assert!(hls.is_hls);

        let mp4 = StreamLink::new("alpha", "Alpha", "https://cdn/x/movie.mp4");
        assert!(!mp4.is_hls);
    }

    #[test]
    fn test_stream_link_serialization_skips_empty() {
        let link = StreamLink::new("alpha", "Alpha", "https://cdn/x.mp4");
        let json = serde_json::to_string(&link).unwrap();

        assert!(!json.contains("referer"));
        assert!(!json.contains("headers"));
    }

    #[test]
    fn test_episode_numbering() {
        let ep = Episode {
            season: Some(1),
            episode: Some(3),
            name: None,
            url: "u".to_string(),
        };

        assert!(ep.is_numbered(Some(1), Some(3)));
        assert!(!ep.is_numbered(Some(1), Some(4)));
        assert!(!ep.is_numbered(None, Some(3)));
    }

    #[test]
    fn test_source_error_display() {
        let err = SourceError::Http {
            status: 503,
            body: "unavailable".to_string(),
        };
        assert_eq!(err.to_string(), "Source returned HTTP 503: unavailable");
    }
}
