//! Typed decode boundary for the raw upstream response tree.
//!
//! The sidecar returns loosely-typed JSON whose item shapes drift per
//! engine. Each category item is decoded into one of these structs with
//! `serde_json::from_value` at the point of use, so a single malformed item
//! fails its own decode and never the batch. Fields the upstream serves in
//! several shapes (`thumb`, scalar dates, counts) stay as `Value` and go
//! through the accessors below.

use serde::Deserialize;
use serde_json::Value;

/// Spelling correction block (`tree.spelling`).
#[derive(Debug, Clone, Deserialize)]
pub struct Spelling {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub correction: Option<String>,
}

impl Spelling {
    /// The correction to surface, if the block carries a real one.
    pub fn usable_correction(&self) -> Option<&str> {
        if self.kind.as_deref() == Some("no_correction") {
            return None;
        }
        self.correction
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }
}

/// One fragment of an answer description.
#[derive(Debug, Clone, Deserialize)]
pub struct Fragment {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub value: Option<Value>,
}

impl Fragment {
    /// Trimmed text of a `"text"` fragment, `None` for other kinds or
    /// empty values.
    pub fn text(&self) -> Option<String> {
        if self.kind.as_deref() != Some("text") {
            return None;
        }
        self.value.as_ref().and_then(scalar_to_string)
    }
}

/// Sublinks come in two encodings: a label→url map or a list of
/// `{title, url}` records. Both are accepted.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Sublinks {
    Labeled(serde_json::Map<String, Value>),
    Listed(Vec<SublinkEntry>),
}

#[derive(Debug, Clone, Deserialize)]
pub struct SublinkEntry {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

/// Answer box item (`tree.answer[]`).
#[derive(Debug, Clone, Deserialize)]
pub struct AnswerItem {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub description: Vec<Fragment>,
    #[serde(default)]
    pub table: Option<serde_json::Map<String, Value>>,
    #[serde(default)]
    pub sublink: Option<Sublinks>,
    #[serde(default)]
    pub thumb: Option<Value>,
}

impl AnswerItem {
    /// Concatenated text of all non-empty `"text"` fragments, single-spaced.
    pub fn answer_text(&self) -> String {
        self.description
            .iter()
            .filter_map(Fragment::text)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Table or sublink data promotes the answer to an infobox.
    pub fn is_infobox(&self) -> bool {
        self.table.is_some() || self.sublink.is_some()
    }
}

/// Web-shaped item (web, playlist, album, author, user categories).
#[derive(Debug, Clone, Deserialize)]
pub struct WebItem {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub description: Option<Value>,
    #[serde(default)]
    pub table: Option<serde_json::Map<String, Value>>,
    #[serde(default)]
    pub sublink: Option<Sublinks>,
    #[serde(default)]
    pub author: Option<Value>,
    #[serde(default)]
    pub followers: Option<Value>,
    #[serde(default)]
    pub thumb: Option<Value>,
    #[serde(default)]
    pub date: Option<Value>,
    #[serde(rename = "publishedDate", default)]
    pub published_date: Option<Value>,
}

/// Image item; `source[0]` is the full image, `source[1]` the thumbnail.
#[derive(Debug, Clone, Deserialize)]
pub struct ImageItem {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub source: Vec<Value>,
}

impl ImageItem {
    pub fn source_url(&self, index: usize) -> Option<&str> {
        self.source
            .get(index)
            .and_then(|entry| entry.get("url"))
            .and_then(Value::as_str)
    }
}

/// Video-shaped item (video, news, livestream, reel, song, podcast).
#[derive(Debug, Clone, Deserialize)]
pub struct MediaItem {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub description: Option<Value>,
    #[serde(default)]
    pub thumb: Option<Value>,
    #[serde(default)]
    pub date: Option<Value>,
    #[serde(rename = "publishedDate", default)]
    pub published_date: Option<Value>,
    #[serde(default)]
    pub author: Option<Value>,
    #[serde(default)]
    pub channel: Option<Value>,
    #[serde(default)]
    pub duration: Option<Value>,
    #[serde(default)]
    pub views: Option<Value>,
    #[serde(default)]
    pub stream: Option<Value>,
}

impl MediaItem {
    /// Author or channel name, whichever the engine filled in.
    pub fn author_name(&self) -> Option<String> {
        self.author
            .as_ref()
            .and_then(scalar_to_string)
            .or_else(|| self.channel.as_ref().and_then(scalar_to_string))
    }

    /// Streaming endpoint for song/podcast items (`stream.endpoint` or a
    /// bare string).
    pub fn stream_endpoint(&self) -> Option<String> {
        let stream = self.stream.as_ref()?;
        match stream {
            Value::String(_) => scalar_to_string(stream),
            Value::Object(map) => map.get("endpoint").and_then(scalar_to_string),
            _ => None,
        }
    }
}

/// Thumbnail candidate from a `thumb` value served either as `{url: ...}`
/// or a bare string.
pub fn thumb_candidate(thumb: &Value) -> Option<&str> {
    match thumb {
        Value::String(s) => Some(s.as_str()),
        Value::Object(map) => map.get("url").and_then(Value::as_str),
        _ => None,
    }
}

/// Stringify a loosely-typed scalar; empty strings, nulls, and containers
/// count as absent.
pub fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
