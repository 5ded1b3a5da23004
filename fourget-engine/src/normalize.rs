//! Normalization of the raw upstream response tree into canonical records.
//!
//! [`normalize`] walks the decoded body in a fixed order (spelling, related,
//! answers, then the category lists) so suggestion and answer records always
//! precede list results, and list results keep their source order. A
//! `status == "error"` response aborts the whole call with a classified
//! [`UpstreamError`]; anything wrong with a single item becomes a [`Skip`]
//! that is logged and swallowed, so one bad item never spoils the batch.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::classify::classify;
use crate::response::{
    scalar_to_string, thumb_candidate, AnswerItem, ImageItem, MediaItem, Spelling, Sublinks,
    WebItem,
};
use crate::sanitize::{
    acceptable_date, clean_text, parse_timestamp, patch_protocol_relative, sanitize_thumbnail,
    valid_url,
};
use fourget_common::{
    CanonicalResult, InfoboxAttribute, InfoboxLink, MediaDuration, Result, UpstreamError,
};

/// Which normalizer a category reuses.
#[derive(Debug, Clone, Copy)]
enum Shape {
    Web,
    Image,
    Video,
    News,
    /// Video plus the stream-source suffix (song, podcast).
    Stream,
}

/// Category lists in processing order. Immutable, assembled at compile time.
const CATEGORY_DISPATCH: &[(&str, Shape)] = &[
    ("web", Shape::Web),
    ("image", Shape::Image),
    ("video", Shape::Video),
    ("news", Shape::News),
    ("livestream", Shape::Video),
    ("reel", Shape::Video),
    ("song", Shape::Stream),
    ("podcast", Shape::Stream),
    ("playlist", Shape::Web),
    ("album", Shape::Web),
    ("author", Shape::Web),
    ("user", Shape::Web),
];

/// Why a single item was dropped. Logged at debug, never surfaced.
#[derive(Debug)]
enum Skip {
    NotAMap,
    Decode(String),
    UnparsableDate,
    FutureDate,
    MissingTitle,
    MissingUrl,
    InvalidUrl,
    UrlEqualsTitle,
    NulByte,
    EmptyAnswer,
    MissingSource,
    BrokenImage,
}

impl fmt::Display for Skip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Skip::NotAMap => write!(f, "item is not a map"),
            Skip::Decode(err) => write!(f, "item failed to decode: {err}"),
            Skip::UnparsableDate => write!(f, "date does not parse to a timestamp"),
            Skip::FutureDate => write!(f, "date is more than 24h in the future"),
            Skip::MissingTitle => write!(f, "missing or empty title"),
            Skip::MissingUrl => write!(f, "missing url"),
            Skip::InvalidUrl => write!(f, "url failed validation"),
            Skip::UrlEqualsTitle => write!(f, "url equals title"),
            Skip::NulByte => write!(f, "embedded NUL byte"),
            Skip::EmptyAnswer => write!(f, "answer has no text"),
            Skip::MissingSource => write!(f, "image has no source entries"),
            Skip::BrokenImage => write!(f, "main image failed validation"),
        }
    }
}

type ItemResult = std::result::Result<CanonicalResult, Skip>;

/// Normalize a decoded upstream body into ordered canonical records.
///
/// Never panics and never fails on malformed items; the only error path is
/// an upstream `status == "error"` response, classified per its message.
pub fn normalize(tree: &Value) -> Result<Vec<CanonicalResult>> {
    normalize_at(tree, unix_now())
}

/// Clock-injected seam behind [`normalize`]; `now` is Unix seconds and
/// anchors the future-date gate.
pub fn normalize_at(tree: &Value, now: i64) -> Result<Vec<CanonicalResult>> {
    let Some(map) = tree.as_object() else {
        return Ok(Vec::new());
    };

    if map.get("status").and_then(Value::as_str) == Some("error") {
        let message = map.get("message").and_then(Value::as_str).unwrap_or_default();
        let err = classify(message);
        tracing::warn!(target: "normalize", error = %err, "upstream batch error");
        return Err(err);
    }

    let mut out = Vec::new();

    if let Some(raw) = map.get("spelling") {
        if let Ok(spelling) = serde_json::from_value::<Spelling>(raw.clone()) {
            if let Some(correction) = spelling.usable_correction() {
                out.push(CanonicalResult::Suggestion {
                    text: clean_text(correction),
                });
            }
        }
    }

    if let Some(related) = map.get("related").and_then(Value::as_array) {
        for entry in related {
            if let Some(text) = entry.as_str().map(str::trim).filter(|t| !t.is_empty()) {
                out.push(CanonicalResult::Suggestion {
                    text: clean_text(text),
                });
            }
        }
    }

    if let Some(answers) = map.get("answer").and_then(Value::as_array) {
        for (index, raw) in answers.iter().enumerate() {
            match answer_result(raw) {
                Ok(result) => out.push(result),
                Err(reason) => tracing::debug!(
                    target: "normalize",
                    category = "answer",
                    index,
                    reason = %reason,
                    "item skipped"
                ),
            }
        }
    }

    for (category, shape) in CATEGORY_DISPATCH {
        let Some(items) = map.get(*category).and_then(Value::as_array) else {
            continue;
        };
        for (index, raw) in items.iter().enumerate() {
            match category_result(raw, *shape, now) {
                Ok(result) => out.push(result),
                Err(reason) => tracing::debug!(
                    target: "normalize",
                    category,
                    index,
                    reason = %reason,
                    "item skipped"
                ),
            }
        }
    }

    tracing::debug!(target: "normalize", count = out.len(), "normalize.done");
    Ok(out)
}

fn category_result(raw: &Value, shape: Shape, now: i64) -> ItemResult {
    let obj = raw.as_object().ok_or(Skip::NotAMap)?;

    // Date gate: invalid dates always discard, not just impossible ones.
    // Null/false stand for "no date" upstream and pass through.
    if let Some(date) = obj.get("date").filter(|v| !v.is_null() && **v != Value::Bool(false)) {
        if !acceptable_date(date, now) {
            return Err(if parse_timestamp(date).is_none() {
                Skip::UnparsableDate
            } else {
                Skip::FutureDate
            });
        }
    }

    match shape {
        Shape::Web => web_result(decode(raw)?),
        Shape::Image => image_result(decode(raw)?),
        Shape::Video => media_result(decode(raw)?, Shape::Video),
        Shape::News => media_result(decode(raw)?, Shape::News),
        Shape::Stream => media_result(decode(raw)?, Shape::Stream),
    }
}

fn decode<T: DeserializeOwned>(raw: &Value) -> std::result::Result<T, Skip> {
    serde_json::from_value(raw.clone()).map_err(|e| Skip::Decode(e.to_string()))
}

fn answer_result(raw: &Value) -> ItemResult {
    if !raw.is_object() {
        return Err(Skip::NotAMap);
    }
    let item: AnswerItem = decode(raw)?;
    let text = item.answer_text();
    if text.is_empty() {
        return Err(Skip::EmptyAnswer);
    }
    if item.is_infobox() {
        Ok(infobox_from_answer(&item, &text))
    } else {
        Ok(CanonicalResult::Answer {
            text: clean_text(&text),
        })
    }
}

fn infobox_from_answer(item: &AnswerItem, text: &str) -> CanonicalResult {
    let title = item
        .title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(clean_text)
        .unwrap_or_else(|| "Infobox".to_string());

    let mut urls = Vec::new();
    if let Some(source) = item.url.as_deref() {
        if valid_url(source).is_some() {
            urls.push(InfoboxLink {
                title: "Source".to_string(),
                url: source.to_string(),
            });
        }
    }
    if let Some(sublink) = &item.sublink {
        push_sublinks(&mut urls, sublink);
    }

    let mut attributes = Vec::new();
    if let Some(table) = &item.table {
        for (label, value) in table {
            if let Some(value) = scalar_to_string(value) {
                attributes.push(InfoboxAttribute {
                    label: label.clone(),
                    value: clean_text(&value),
                });
            }
        }
    }

    let thumbnail = item
        .thumb
        .as_ref()
        .and_then(thumb_candidate)
        .and_then(sanitize_thumbnail);

    CanonicalResult::Infobox {
        title,
        content: clean_text(text),
        urls,
        attributes,
        thumbnail,
    }
}

fn push_sublinks(urls: &mut Vec<InfoboxLink>, sublink: &Sublinks) {
    match sublink {
        Sublinks::Labeled(map) => {
            for (label, value) in map {
                if let Some(url) = value.as_str().filter(|u| valid_url(u).is_some()) {
                    urls.push(InfoboxLink {
                        title: label.clone(),
                        url: url.to_string(),
                    });
                }
            }
        }
        Sublinks::Listed(entries) => {
            for entry in entries {
                if let Some(url) = entry.url.as_deref().filter(|u| valid_url(u).is_some()) {
                    urls.push(InfoboxLink {
                        title: entry.title.clone().unwrap_or_default(),
                        url: url.to_string(),
                    });
                }
            }
        }
    }
}

fn web_result(item: WebItem) -> ItemResult {
    let title = item
        .title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(Skip::MissingTitle)?;
    let url_raw = item.url.as_deref().ok_or(Skip::MissingUrl)?;
    if url_raw == title {
        return Err(Skip::UrlEqualsTitle);
    }
    if url_raw.contains('\0') || title.contains('\0') {
        return Err(Skip::NulByte);
    }
    let patched = patch_protocol_relative(url_raw);
    valid_url(&patched).ok_or(Skip::InvalidUrl)?;
    let url = patched.into_owned();

    let description = item
        .description
        .as_ref()
        .and_then(scalar_to_string)
        .map(|d| clean_text(&d))
        .unwrap_or_default();

    let mut content = match web_enrichment(&item) {
        Some(enrichment) if description.is_empty() => enrichment,
        Some(enrichment) => format!("{enrichment} — {description}"),
        None => description,
    };

    if let Some(Sublinks::Labeled(map)) = &item.sublink {
        let anchors: Vec<String> = map
            .iter()
            .filter_map(|(label, value)| {
                value.as_str().map(|url| {
                    format!(
                        "<a href=\"{}\">{}</a>",
                        html_escape::encode_double_quoted_attribute(url),
                        html_escape::encode_text(label)
                    )
                })
            })
            .collect();
        if !anchors.is_empty() {
            content.push('\n');
            content.push_str(&anchors.join(" "));
        }
    }

    let thumbnail = item
        .thumb
        .as_ref()
        .and_then(thumb_candidate)
        .and_then(sanitize_thumbnail)
        .filter(|t| *t != url);

    Ok(CanonicalResult::Web {
        title: clean_text(title),
        url,
        content,
        thumbnail,
        published_at: published_at(item.date.as_ref(), item.published_date.as_ref()),
    })
}

/// Assemble the " • "-joined enrichment chunks for a web result: merged
/// rating/votes, remaining table rows, author, follower count.
fn web_enrichment(item: &WebItem) -> Option<String> {
    let mut chunks: Vec<String> = Vec::new();

    if let Some(table) = &item.table {
        let mut rating = None;
        let mut votes = None;
        let mut rest: Vec<(String, String)> = Vec::new();
        for (key, value) in table {
            let Some(value) = scalar_to_string(value) else {
                continue;
            };
            match key.to_lowercase().as_str() {
                "rating" => rating = Some(value),
                "votes" => votes = Some(value),
                _ => rest.push((key.clone(), value)),
            }
        }
        match (rating, votes) {
            (Some(r), Some(v)) => chunks.push(format!("Rating: {r} ({v} votes)")),
            (Some(r), None) => chunks.push(format!("Rating: {r}")),
            (None, Some(v)) => chunks.push(format!("Votes: {v}")),
            (None, None) => {}
        }
        for (key, value) in rest {
            chunks.push(format!("{key}: {value}"));
        }
    }

    if let Some(author) = item.author.as_ref().and_then(scalar_to_string) {
        chunks.push(format!("By {author}"));
    }
    if let Some(followers) = item.followers.as_ref().and_then(scalar_to_string) {
        chunks.push(format!("{followers} Followers"));
    }

    (!chunks.is_empty()).then(|| chunks.join(" • "))
}

fn image_result(item: ImageItem) -> ItemResult {
    let page_url = item.url.as_deref().ok_or(Skip::MissingUrl)?;
    valid_url(page_url).ok_or(Skip::InvalidUrl)?;
    let main = item.source_url(0).ok_or(Skip::MissingSource)?;

    // Unlike other categories, a broken main image is fatal to the item.
    let image_url = sanitize_thumbnail(main).ok_or(Skip::BrokenImage)?;

    let thumbnail_url = item
        .source_url(1)
        .or_else(|| item.source_url(0))
        .and_then(sanitize_thumbnail);

    Ok(CanonicalResult::Image {
        title: clean_text(item.title.as_deref().unwrap_or_default()),
        url: page_url.to_string(),
        image_url,
        thumbnail_url,
    })
}

fn media_result(item: MediaItem, shape: Shape) -> ItemResult {
    let title = item
        .title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(Skip::MissingTitle)?;
    let url = item.url.as_deref().ok_or(Skip::MissingUrl)?;
    if url == title {
        return Err(Skip::UrlEqualsTitle);
    }
    if url.contains('\0') || title.contains('\0') {
        return Err(Skip::NulByte);
    }
    valid_url(url).ok_or(Skip::InvalidUrl)?;

    let mut content = item
        .description
        .as_ref()
        .and_then(scalar_to_string)
        .map(|d| clean_text(&d))
        .unwrap_or_default();

    let thumbnail = item
        .thumb
        .as_ref()
        .and_then(thumb_candidate)
        .and_then(sanitize_thumbnail);
    let published_at = published_at(item.date.as_ref(), item.published_date.as_ref());

    if let Shape::News = shape {
        return Ok(CanonicalResult::News {
            title: clean_text(title),
            url: url.to_string(),
            content,
            thumbnail,
            published_at,
            author: item.author_name(),
        });
    }

    if let Shape::Stream = shape {
        if let Some(endpoint) = item.stream_endpoint() {
            let suffix = format!("Source: {}", endpoint.to_uppercase());
            content = if content.is_empty() {
                suffix
            } else {
                format!("{content} — {suffix}")
            };
        }
    }

    Ok(CanonicalResult::Video {
        title: clean_text(title),
        url: url.to_string(),
        content,
        thumbnail,
        published_at,
        author: item.author_name(),
        duration: media_duration(item.duration.as_ref()),
        views: item.views.as_ref().and_then(scalar_to_string),
    })
}

/// Duration is either a raw second count or an opaque pre-formatted label,
/// passed through as given.
fn media_duration(raw: Option<&Value>) -> Option<MediaDuration> {
    match raw? {
        Value::Number(n) => n.as_u64().map(MediaDuration::Seconds),
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| MediaDuration::Label(trimmed.to_string()))
        }
        _ => None,
    }
}

/// Single optional date field (`date` or `publishedDate`); unparsable
/// values drop the field only, never the item.
fn published_at(date: Option<&Value>, published: Option<&Value>) -> Option<DateTime<Utc>> {
    let ts = date
        .and_then(parse_timestamp)
        .or_else(|| published.and_then(parse_timestamp))?;
    DateTime::from_timestamp(ts, 0)
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}
