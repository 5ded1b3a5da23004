//! Shared types for the 4get bridge workspace.
//!
//! This crate defines the canonical result model produced by the
//! normalization engine and the upstream error taxonomy shared across
//! crates.
//!
//! # Overview
//!
//! - [`CanonicalResult`]: The normalized, validated record emitted per item
//! - [`MediaDuration`]: Video/media runtime, numeric or pre-formatted
//! - [`UpstreamError`] and [`Result`]: Batch-level upstream failures
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Suspension the caller should apply after an upstream captcha challenge.
pub const CAPTCHA_SUSPEND: Duration = Duration::from_secs(300);

/// Suspension the caller should apply after upstream rate limiting.
pub const RATE_LIMIT_SUSPEND: Duration = Duration::from_secs(60);

/// A link attached to an infobox (`{title, url}`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfoboxLink {
    pub title: String,
    pub url: String,
}

/// A key/value attribute row attached to an infobox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfoboxAttribute {
    pub label: String,
    pub value: String,
}

/// Runtime of a video or media item.
///
/// Upstream engines report either a raw second count or an already
/// formatted label ("12:34"); the label passes through as given.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MediaDuration {
    Seconds(u64),
    Label(String),
}

/// The canonical, validated record this engine produces, independent of
/// which upstream engine produced the raw item.
///
/// Invariants upheld by the normalizer: every `url` field passed URL
/// validation, and every `title`/`content` field has collapsed whitespace
/// and is truncated to the maximum content length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CanonicalResult {
    Suggestion {
        text: String,
    },
    Answer {
        text: String,
    },
    Infobox {
        title: String,
        content: String,
        urls: Vec<InfoboxLink>,
        attributes: Vec<InfoboxAttribute>,
        #[serde(skip_serializing_if = "Option::is_none")]
        thumbnail: Option<String>,
    },
    Web {
        title: String,
        url: String,
        content: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        thumbnail: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        published_at: Option<DateTime<Utc>>,
    },
    Image {
        title: String,
        url: String,
        image_url: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        thumbnail_url: Option<String>,
    },
    Video {
        title: String,
        url: String,
        content: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        thumbnail: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        published_at: Option<DateTime<Utc>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        author: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        duration: Option<MediaDuration>,
        #[serde(skip_serializing_if = "Option::is_none")]
        views: Option<String>,
    },
    News {
        title: String,
        url: String,
        content: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        thumbnail: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        published_at: Option<DateTime<Utc>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        author: Option<String>,
    },
}

impl CanonicalResult {
    /// Presentation template for frontends that render per-shape, matching
    /// the upstream convention for image and video verticals.
    pub fn template(&self) -> Option<&'static str> {
        match self {
            CanonicalResult::Image { .. } => Some("images.html"),
            CanonicalResult::Video { .. } => Some("videos.html"),
            _ => None,
        }
    }
}

/// Error types raised when the upstream scraper signals batch failure.
///
/// These abort the whole normalization call; the caller branches on the
/// variant to apply cooldown semantics. Per-item failures are never
/// surfaced through this type.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum UpstreamError {
    /// The scraper hit a captcha or proof-of-work wall.
    #[error("upstream captcha: {message}")]
    Captcha { message: String, suspend: Duration },

    /// The scraper was rate limited by its target.
    #[error("upstream rate limited: {message}")]
    RateLimited { message: String, suspend: Duration },

    /// Any other upstream failure, message preserved verbatim.
    #[error("upstream error: {message}")]
    Generic { message: String },
}

impl UpstreamError {
    pub fn captcha(message: impl Into<String>) -> Self {
        Self::Captcha {
            message: message.into(),
            suspend: CAPTCHA_SUSPEND,
        }
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::RateLimited {
            message: message.into(),
            suspend: RATE_LIMIT_SUSPEND,
        }
    }

    pub fn generic(message: impl Into<String>) -> Self {
        Self::Generic {
            message: message.into(),
        }
    }

    /// Cooldown the caller should apply before retrying this engine.
    pub fn suspend(&self) -> Option<Duration> {
        match self {
            Self::Captcha { suspend, .. } | Self::RateLimited { suspend, .. } => Some(*suspend),
            Self::Generic { .. } => None,
        }
    }

    /// The upstream message, verbatim.
    pub fn message(&self) -> &str {
        match self {
            Self::Captcha { message, .. }
            | Self::RateLimited { message, .. }
            | Self::Generic { message } => message,
        }
    }
}

/// Convenient alias for results that use [`UpstreamError`].
pub type Result<T> = std::result::Result<T, UpstreamError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_tags_only_media_shapes() {
        let img = CanonicalResult::Image {
            title: "t".into(),
            url: "https://example.com/a".into(),
            image_url: "https://example.com/a.jpg".into(),
            thumbnail_url: None,
        };
        assert_eq!(img.template(), Some("images.html"));

        let sug = CanonicalResult::Suggestion { text: "t".into() };
        assert_eq!(sug.template(), None);
    }

    #[test]
    fn suspensions_match_contract() {
        assert_eq!(
            UpstreamError::captcha("x").suspend(),
            Some(Duration::from_secs(300))
        );
        assert_eq!(
            UpstreamError::rate_limited("x").suspend(),
            Some(Duration::from_secs(60))
        );
        assert_eq!(UpstreamError::generic("x").suspend(), None);
    }

    #[test]
    fn duration_deserializes_both_shapes() {
        let n: MediaDuration = serde_json::from_value(serde_json::json!(215)).unwrap();
        assert_eq!(n, MediaDuration::Seconds(215));
        let s: MediaDuration = serde_json::from_value(serde_json::json!("3:35")).unwrap();
        assert_eq!(s, MediaDuration::Label("3:35".into()));
    }
}
