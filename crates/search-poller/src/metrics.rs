//! Run metrics
//!
//! Counters emitted through the `metrics` facade. They are no-ops until the
//! binary installs a recorder.
//!
//! - `relay_records_captured_total` (counter)
//! - `relay_records_invalid_total` (counter)
//! - `relay_pages_total` (counter)
//! - `relay_upstream_errors_total` (counter): label `error_type`
//! - `relay_credential_rotations_total` (counter)

/// Record one record relayed to every sink.
pub fn record_captured() {
    metrics::counter!("relay_records_captured_total").increment(1);
}

/// Record one record dropped as invalid.
pub fn record_invalid() {
    metrics::counter!("relay_records_invalid_total").increment(1);
}

/// Record one fetched page.
pub fn record_page() {
    metrics::counter!("relay_pages_total").increment(1);
}

/// Record a classified upstream failure.
pub fn record_upstream_error(error_type: &str) {
    metrics::counter!("relay_upstream_errors_total", "error_type" => error_type.to_string())
        .increment(1);
}

/// Record a credential re-acquisition after a rate limit.
pub fn record_rotation() {
    metrics::counter!("relay_credential_rotations_total").increment(1);
}
