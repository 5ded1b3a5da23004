//! Translation of generic search options into the 4get parameter vocabulary.
//!
//! [`translate`] is total and deterministic: missing generic options simply
//! produce no key, and the sidecar fills its own defaults for anything left
//! unsent. Later rules may overwrite earlier keys; caller-supplied
//! passthrough overrides (keys carrying the [`RAW_OVERRIDE_PREFIX`]) always
//! win. This escape hatch is the sole per-engine customization path; there
//! is no per-engine table and no live filter discovery.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

/// Override keys carrying this prefix bypass all translation rules and are
/// copied verbatim (prefix stripped) into the upstream parameter map.
pub const RAW_OVERRIDE_PREFIX: &str = "raw:";

/// Fixed upstream page size used to derive the `offset` parameter.
pub const PAGE_SIZE: u32 = 10;

/// Languages the yandex scraper accepts; anything else falls back to "en".
const YANDEX_LANGS: &[&str] = &["en", "ru", "be", "fr", "de", "id", "kk", "tt", "tr", "uk"];

/// A scalar value in the upstream parameter vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Str(String),
    Int(i64),
    Bool(bool),
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

/// Flat string→scalar mapping consumed by the external transport.
pub type UpstreamParameterMap = BTreeMap<String, ParamValue>;

/// Requested recency window for results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeWindow {
    #[default]
    None,
    Day,
    Week,
    Month,
    Year,
}

impl TimeWindow {
    /// Window duration in seconds, `None` when no window is requested.
    pub fn seconds(self) -> Option<i64> {
        match self {
            TimeWindow::None => None,
            TimeWindow::Day => Some(86_400),
            TimeWindow::Week => Some(604_800),
            TimeWindow::Month => Some(2_592_000),
            TimeWindow::Year => Some(31_536_000),
        }
    }
}

/// Generic query plus generic search options, constructed once per call.
#[derive(Debug, Clone, Default)]
pub struct TranslationContext {
    /// Query text, copied verbatim into `s`.
    pub query: String,
    /// Locale in "xx-YY" form.
    pub locale: Option<String>,
    /// Safety level ordinal: 0 (off), 1 (moderate), 2 (strict).
    pub safety: Option<u8>,
    pub time_window: TimeWindow,
    /// 1-based page number.
    pub page: u32,
    /// Upstream engine identifier, e.g. "yandex-4get".
    pub engine: String,
    /// Free-form overrides; only keys carrying [`RAW_OVERRIDE_PREFIX`] are
    /// forwarded.
    pub overrides: BTreeMap<String, ParamValue>,
}

impl TranslationContext {
    pub fn new(query: impl Into<String>, engine: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            engine: engine.into(),
            page: 1,
            ..Default::default()
        }
    }
}

/// Translate generic options into the upstream vocabulary at the current
/// instant. Total: every context yields a parameter map.
pub fn translate(ctx: &TranslationContext) -> UpstreamParameterMap {
    translate_at(ctx, unix_now())
}

/// Clock-injected seam behind [`translate`]; `now` is Unix seconds.
pub fn translate_at(ctx: &TranslationContext, now: i64) -> UpstreamParameterMap {
    let mut params = UpstreamParameterMap::new();
    params.insert("s".into(), ctx.query.as_str().into());

    if let Some(level) = ctx.safety {
        let nsfw = match level {
            0 => "yes",
            1 => "maybe",
            2 => "no",
            _ => "yes",
        };
        params.insert("nsfw".into(), nsfw.into());
    }

    if let Some(locale) = ctx.locale.as_deref() {
        let mut parts = locale.splitn(2, '-');
        let lang = parts.next().unwrap_or_default();
        if !lang.is_empty() {
            let country = parts.next().unwrap_or("us").to_lowercase();
            let lang = if ctx.engine.starts_with("yandex") && !YANDEX_LANGS.contains(&lang) {
                "en"
            } else {
                lang
            };
            params.insert("lang".into(), lang.into());
            params.insert("country".into(), country.into());
        }
    }

    if let Some(window) = ctx.time_window.seconds() {
        params.insert("newer".into(), (now - window).into());
        // Engines without an "older" bound ignore it; sent unconditionally.
        params.insert("older".into(), now.into());
    }

    if ctx.page > 1 {
        params.insert("offset".into(), (i64::from(ctx.page - 1) * 10).into());
    }

    for (key, value) in &ctx.overrides {
        if let Some(stripped) = key.strip_prefix(RAW_OVERRIDE_PREFIX) {
            params.insert(stripped.to_string(), value.clone());
        }
    }

    tracing::debug!(
        target: "params",
        engine = %ctx.engine,
        key_count = params.len(),
        "params.translated"
    );
    params
}

/// Translate a generic category into the transport envelope's vocabulary.
/// Unknown categories pass through unchanged.
pub fn upstream_category(generic: &str) -> &str {
    match generic {
        "general" => "web",
        "images" => "image",
        "videos" => "video",
        other => other,
    }
}

/// Request body for the single POST the external transport performs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchEnvelope {
    pub engine: String,
    pub category: String,
    pub params: UpstreamParameterMap,
}

impl SearchEnvelope {
    /// Build the envelope from a generic category name and translated params.
    pub fn new(
        engine: impl Into<String>,
        generic_category: &str,
        params: UpstreamParameterMap,
    ) -> Self {
        Self {
            engine: engine.into(),
            category: upstream_category(generic_category).to_string(),
            params,
        }
    }
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_is_always_set_verbatim() {
        let ctx = TranslationContext::new("rust borrow checker", "mojeek");
        let params = translate_at(&ctx, 1_000);
        assert_eq!(params.get("s"), Some(&"rust borrow checker".into()));
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn safety_levels_map_to_nsfw() {
        for (level, expected) in [(0u8, "yes"), (1, "maybe"), (2, "no"), (7, "yes")] {
            let mut ctx = TranslationContext::new("q", "brave");
            ctx.safety = Some(level);
            let params = translate_at(&ctx, 0);
            assert_eq!(params.get("nsfw"), Some(&expected.into()), "level {level}");
        }
    }

    #[test]
    fn locale_without_region_defaults_country_us() {
        let mut ctx = TranslationContext::new("q", "brave");
        ctx.locale = Some("de".into());
        let params = translate_at(&ctx, 0);
        assert_eq!(params.get("lang"), Some(&"de".into()));
        assert_eq!(params.get("country"), Some(&"us".into()));
    }

    #[test]
    fn yandex_rejects_unlisted_language() {
        let mut ctx = TranslationContext::new("q", "yandex-4get");
        ctx.locale = Some("ja-JP".into());
        let params = translate_at(&ctx, 0);
        assert_eq!(params.get("lang"), Some(&"en".into()));
        assert_eq!(params.get("country"), Some(&"jp".into()));
    }

    #[test]
    fn full_scenario_yandex_week_page_two() {
        let now = 1_700_000_000;
        let mut ctx = TranslationContext::new("q", "yandex-4get");
        ctx.locale = Some("fr-FR".into());
        ctx.safety = Some(1);
        ctx.time_window = TimeWindow::Week;
        ctx.page = 2;
        let params = translate_at(&ctx, now);
        assert_eq!(params.get("lang"), Some(&"fr".into()));
        assert_eq!(params.get("country"), Some(&"fr".into()));
        assert_eq!(params.get("nsfw"), Some(&"maybe".into()));
        assert_eq!(params.get("newer"), Some(&(now - 604_800).into()));
        assert_eq!(params.get("older"), Some(&now.into()));
        assert_eq!(params.get("offset"), Some(&10i64.into()));
    }

    #[test]
    fn first_page_emits_no_offset() {
        let ctx = TranslationContext::new("q", "brave");
        assert!(!translate_at(&ctx, 0).contains_key("offset"));
    }

    #[test]
    fn raw_overrides_win_over_translation_rules() {
        let mut ctx = TranslationContext::new("q", "marginalia");
        ctx.locale = Some("en-GB".into());
        ctx.overrides
            .insert("raw:country".into(), "de".into());
        ctx.overrides
            .insert("raw:intitle".into(), "yes".into());
        // Unprefixed keys are dropped, not forwarded.
        ctx.overrides.insert("recent".into(), "yes".into());
        let params = translate_at(&ctx, 0);
        assert_eq!(params.get("country"), Some(&"de".into()));
        assert_eq!(params.get("intitle"), Some(&"yes".into()));
        assert!(!params.contains_key("recent"));
        assert!(!params.contains_key("raw:intitle"));
    }

    #[test]
    fn categories_translate_for_the_envelope() {
        assert_eq!(upstream_category("general"), "web");
        assert_eq!(upstream_category("images"), "image");
        assert_eq!(upstream_category("videos"), "video");
        assert_eq!(upstream_category("news"), "news");
    }

    #[test]
    fn envelope_serializes_flat_scalars() {
        let mut ctx = TranslationContext::new("cats", "ddg");
        ctx.page = 3;
        let env = SearchEnvelope::new("ddg", "general", translate_at(&ctx, 0));
        let v = serde_json::to_value(&env).unwrap();
        assert_eq!(v["engine"], "ddg");
        assert_eq!(v["category"], "web");
        assert_eq!(v["params"]["s"], "cats");
        assert_eq!(v["params"]["offset"], 20);
    }
}
