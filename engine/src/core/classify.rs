//! Provider error classification
//!
//! Adapters hand back raw failures; this module decides what they mean for
//! the fallback walk. Classification is message-driven because providers
//! bury the interesting detail (quota state, missing models, billing) in
//! free text rather than status codes.

use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;

use shared::ProviderFailure;

use crate::error::EngineError;

/// What the fallback walk should do with a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Stop immediately; trying other models cannot help
    Fatal,
    /// Record it and try the next candidate (or the same model again)
    Retryable,
}

/// Authorization and billing problems: no model will fix these
const FATAL_SIGNATURES: [&str; 9] = [
    "api key",
    "unauthoriz",
    "unauthentic",
    "permission",
    "billing",
    "payment",
    "forbidden",
    "invalid key",
    "invalid authentication",
];

/// Quota and rate pressure: a different model or a later retry may work
const THROTTLE_SIGNATURES: [&str; 6] = [
    "quota",
    "rate limit",
    "too many requests",
    "exhausted",
    "overloaded",
    "limit: 0",
];

/// Transient or per-model trouble: the next candidate may be fine
const TRANSIENT_SIGNATURES: [&str; 9] = [
    "not found",
    "does not exist",
    "not supported",
    "unsupported",
    "unknown model",
    "unavailable",
    "timeout",
    "timed out",
    "try again",
];

static RETRY_AFTER_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?i)try again in\s+([0-9]+(?:\.[0-9]+)?)\s*s")
            .expect("Failed to compile retry hint regex"),
        Regex::new(r#"(?i)"retryDelay"\s*:\s*"([0-9]+(?:\.[0-9]+)?)s""#)
            .expect("Failed to compile retry hint regex"),
        Regex::new(r"(?i)retry[-\s]after[:\s]+([0-9]+(?:\.[0-9]+)?)")
            .expect("Failed to compile retry hint regex"),
    ]
});

/// Classify one provider error by status code and message text.
///
/// Order matters: authorization signatures win over everything (a 500
/// wrapping "invalid api key" is still fatal), then any 5xx or 429 is
/// worth retrying, then known transient signatures, and anything left is
/// treated as fatal rather than hammering providers with doomed requests.
pub fn classify_provider_error(status: Option<u16>, message: &str) -> Disposition {
    let lower = message.to_lowercase();
    if contains_any(&lower, &FATAL_SIGNATURES) {
        return Disposition::Fatal;
    }
    if let Some(code) = status {
        if code >= 500 || code == 429 {
            return Disposition::Retryable;
        }
    }
    if contains_any(&lower, &THROTTLE_SIGNATURES) || contains_any(&lower, &TRANSIENT_SIGNATURES) {
        return Disposition::Retryable;
    }
    Disposition::Fatal
}

/// Disposition of a raw adapter failure. Everything that never reached a
/// provider verdict (network trouble, unusable bodies) is retryable; the
/// next candidate may behave.
pub fn disposition_of(failure: &ProviderFailure) -> Disposition {
    match failure {
        ProviderFailure::Http { status, message } => classify_provider_error(Some(*status), message),
        ProviderFailure::Network(_)
        | ProviderFailure::MalformedPayload(_)
        | ProviderFailure::EmptyPayload(_) => Disposition::Retryable,
    }
}

/// Extract an advisory retry delay from provider error text.
///
/// Understands the common spellings: "Please try again in 26.37s", a JSON
/// `"retryDelay": "21s"` fragment, and "Retry-After: 30". The caller
/// decides whether to honor it.
pub fn retry_after_hint(message: &str) -> Option<Duration> {
    for pattern in RETRY_AFTER_PATTERNS.iter() {
        if let Some(caps) = pattern.captures(message) {
            if let Ok(seconds) = caps[1].parse::<f64>() {
                if seconds > 0.0 {
                    return Some(Duration::from_secs_f64(seconds));
                }
            }
        }
    }
    None
}

/// Pick the terminal error variant for an exhausted or aborted walk, based
/// on the final failure's class. `message` is the already-built summary
/// naming every tried model.
pub fn terminal_error(last: &ProviderFailure, message: String) -> EngineError {
    match last {
        ProviderFailure::Http { status, message: detail } => {
            if classify_provider_error(Some(*status), detail) == Disposition::Fatal {
                return EngineError::ProviderRejected { message };
            }
            let lower = detail.to_lowercase();
            if *status == 429 || contains_any(&lower, &THROTTLE_SIGNATURES) {
                EngineError::ProviderThrottled { message }
            } else {
                EngineError::ProviderUnavailable { message }
            }
        }
        ProviderFailure::Network(_) => EngineError::ProviderUnavailable { message },
        ProviderFailure::MalformedPayload(_) | ProviderFailure::EmptyPayload(_) => {
            EngineError::MalformedResponse { message }
        }
    }
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}
