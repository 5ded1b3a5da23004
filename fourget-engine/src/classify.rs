//! Classification of upstream error messages into typed failure kinds.

use fourget_common::UpstreamError;

/// Map an upstream error message to a typed failure.
///
/// Case-insensitive substring match: captcha/proof-of-work walls suspend
/// the engine for 300 seconds, rate limiting for 60; anything else is
/// generic with the message preserved verbatim.
pub fn classify(message: &str) -> UpstreamError {
    let lower = message.to_lowercase();
    if lower.contains("captcha") || lower.contains("pow") {
        UpstreamError::captcha(message)
    } else if lower.contains("too many requests") || lower.contains("429") {
        UpstreamError::rate_limited(message)
    } else {
        UpstreamError::generic(message)
    }
}
