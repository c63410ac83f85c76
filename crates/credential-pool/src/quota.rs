//! Status classification and quota-reset arithmetic
//!
//! The upstream reports failures only as HTTP statuses plus an error document.
//! Classification is a fixed table; statuses outside it are left
//! unclassified so the run fails fast instead of guessing.

use provider::ErrorClassification;

/// Classify an upstream HTTP status.
///
/// 429 is a spent quota (rotate credentials), 500/503 are transient (retry the
/// same cursor after a backoff), 401/403/404 are permanent. Everything else
/// returns `None` and must abort the run.
pub fn classify_status(status: u16) -> Option<ErrorClassification> {
    match status {
        429 => Some(ErrorClassification::RateLimited),
        500 | 503 => Some(ErrorClassification::Transient),
        401 | 403 | 404 => Some(ErrorClassification::Permanent),
        _ => None,
    }
}

/// Seconds to wait until a quota window resets, with a one-second margin.
///
/// A reset time already in the past still waits the margin.
pub fn seconds_until_reset(reset_at: u64, now: u64) -> u64 {
    reset_at.saturating_sub(now) + 1
}

/// Current unix time in whole seconds.
pub fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
