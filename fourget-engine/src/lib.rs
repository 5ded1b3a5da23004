//! Translation and normalization core for the 4get scraper bridge.
//!
//! Sits between a generic search-aggregation front end and the 4get
//! sidecar: [`params`] translates generic search options into the upstream
//! parameter vocabulary, [`normalize`] turns the sidecar's loosely-typed
//! response tree into canonical typed records, and [`classify`] maps
//! upstream error messages to a typed failure kind.
//!
//! Everything here is a pure synchronous function over its inputs: no I/O,
//! no shared mutable state, safe to call from any number of concurrent
//! workers. Transport (the POST to the sidecar, retries, timeouts) belongs
//! to the caller; this crate only produces the request envelope and
//! consumes the already-decoded body.

pub mod classify;
pub mod normalize;
pub mod params;
pub mod response;
pub mod sanitize;

pub use classify::classify;
pub use normalize::{normalize, normalize_at};
pub use params::{
    translate, translate_at, upstream_category, ParamValue, SearchEnvelope, TimeWindow,
    TranslationContext, UpstreamParameterMap,
};
