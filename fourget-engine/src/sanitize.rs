//! URL and text sanitization helpers shared by the normalizers.
//!
//! Covers URL validity, proxy-unwrapping of the scraper's media links,
//! broken-placeholder detection, timestamp parsing with the future-date
//! gate, and content cleanup (whitespace collapse + truncation). The
//! compiled placeholder pattern is built once at first use and treated as
//! an immutable constant thereafter.

use regex::Regex;
use serde_json::Value;
use std::borrow::Cow;
use std::sync::LazyLock;
use url::Url;

/// Maximum character length of `title`/`content` fields before the ellipsis.
pub const MAX_CONTENT_LEN: usize = 1024;

/// Leeway before a dated item counts as impossibly future (seconds).
pub const FUTURE_DATE_LEEWAY: i64 = 86_400;

/// The canonical 1×1 transparent GIF served as a stand-in image.
const TRANSPARENT_GIF: &str =
    "data:image/gif;base64,R0lGODlhAQABAIAAAAAAAP///yH5BAEAAAAALAAAAAABAAEAAAIBRAA7";

/// Tracker and placeholder filenames with a common image extension.
static PLACEHOLDER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:1x1|spacer|blank|tracking|placeholder|no[-_]image|image-not-found|default-image|default-thumb|broken-image)\.(?:png|jpe?g|gif|webp|bmp|svg|ico)$",
    )
    .expect("placeholder pattern compiles")
});

/// Collapse internal whitespace to single spaces and truncate to
/// [`MAX_CONTENT_LEN`] characters plus a trailing ellipsis.
pub fn clean_text(raw: &str) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut out: String = collapsed.chars().take(MAX_CONTENT_LEN).collect();
    if collapsed.chars().count() > MAX_CONTENT_LEN {
        out.push('…');
    }
    out
}

/// Parse and validate a URL: http(s) scheme with a host.
pub fn valid_url(raw: &str) -> Option<Url> {
    let parsed = Url::parse(raw).ok()?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return None;
    }
    Some(parsed)
}

/// Patch a protocol-relative `//host/...` prefix to `https://`.
pub fn patch_protocol_relative(raw: &str) -> Cow<'_, str> {
    if let Some(rest) = raw.strip_prefix("//") {
        Cow::Owned(format!("https://{rest}"))
    } else {
        Cow::Borrowed(raw)
    }
}

/// A URL with no path and no query carries no image; reject it.
pub fn is_bare_root(url: &Url) -> bool {
    matches!(url.path(), "" | "/") && url.query().is_none()
}

/// Undo the scraper's proxy convention: media links served through its own
/// proxy path carry the true URL as a `url=` query parameter.
///
/// Returns the input unchanged when no `url=` marker is present, when the
/// URL is not proxy-shaped (leading `/` or a "4get" host), or when the
/// embedded candidate does not decode to a valid URL.
pub fn proxy_unwrap(raw: &str) -> String {
    if !raw.contains("url=") {
        return raw.to_string();
    }
    if !raw.starts_with('/') && !raw.to_lowercase().contains("4get") {
        return raw.to_string();
    }

    let marker = match (raw.find("?url="), raw.find("&url=")) {
        (Some(q), Some(a)) => q.min(a),
        (Some(q), None) => q,
        (None, Some(a)) => a,
        (None, None) => return raw.to_string(),
    };
    let value = &raw[marker + 5..];
    let end = value
        .find(['&', '#'])
        .unwrap_or(value.len());
    let value = &value[..end];

    let plus_decoded = value.replace('+', " ");
    let Ok(percent_decoded) = urlencoding::decode(&plus_decoded) else {
        return raw.to_string();
    };
    let candidate = if percent_decoded.contains('&') {
        html_escape::decode_html_entities(percent_decoded.as_ref()).into_owned()
    } else {
        percent_decoded.into_owned()
    };

    if valid_url(&candidate).is_some() {
        candidate
    } else {
        raw.to_string()
    }
}

/// Whether a URL is a stand-in image (tracking pixel, "no image"
/// placeholder) that should not be presented as real media.
pub fn is_broken_placeholder(raw: &str) -> bool {
    if raw.eq_ignore_ascii_case(TRANSPARENT_GIF) {
        return true;
    }
    let path = match Url::parse(raw) {
        Ok(url) => url.path().to_string(),
        // Relative link: strip query/fragment by hand.
        Err(_) => raw
            .split(['?', '#'])
            .next()
            .unwrap_or(raw)
            .to_string(),
    };
    PLACEHOLDER_PATTERN.is_match(&path)
}

/// Shared thumbnail pipeline: sanitize, proxy-unwrap, then validate.
/// Failure drops only the thumbnail, never the surrounding result.
pub fn sanitize_thumbnail(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let unescaped = if trimmed.contains('&') {
        html_escape::decode_html_entities(trimmed).into_owned()
    } else {
        trimmed.to_string()
    };
    let unwrapped = proxy_unwrap(&unescaped);
    let parsed = valid_url(&unwrapped)?;
    if is_broken_placeholder(&unwrapped) || is_bare_root(&parsed) {
        return None;
    }
    Some(unwrapped)
}

/// Parse a loosely-typed date scalar into Unix seconds.
pub fn parse_timestamp(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => {
            let trimmed = s.trim();
            trimmed
                .parse::<i64>()
                .ok()
                .or_else(|| trimmed.parse::<f64>().ok().map(|f| f as i64))
        }
        _ => None,
    }
}

/// Date gate for list items: unparsable dates always discard the item, as
/// do timestamps more than [`FUTURE_DATE_LEEWAY`] beyond `now`.
pub fn acceptable_date(value: &Value, now: i64) -> bool {
    match parse_timestamp(value) {
        Some(ts) => ts <= now + FUTURE_DATE_LEEWAY,
        None => false,
    }
}
