//! Prometheus metrics exposition
//!
//! The polling core records its counters through the `metrics` facade (see
//! `search_poller::metrics`). This module installs the Prometheus exporter
//! and attaches help text to those counters.

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::error::Result;

/// Install the Prometheus recorder with an HTTP listener serving `/metrics`
/// on `addr`. Must be called from inside the tokio runtime.
pub fn install_exporter(addr: SocketAddr) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    describe_metrics();
    Ok(())
}

/// Register help text for every relay counter with the current recorder.
pub fn describe_metrics() {
    metrics::describe_counter!(
        "relay_records_captured_total",
        "Records relayed to every sink"
    );
    metrics::describe_counter!(
        "relay_records_invalid_total",
        "Records dropped for missing required fields"
    );
    metrics::describe_counter!("relay_pages_total", "Search pages fetched");
    metrics::describe_counter!(
        "relay_upstream_errors_total",
        "Classified upstream failures by error_type"
    );
    metrics::describe_counter!(
        "relay_credential_rotations_total",
        "Credential re-acquisitions after a rate limit"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics_exporter_prometheus::{PrometheusHandle, PrometheusRecorder};

    /// Create an isolated recorder/handle pair for unit tests.
    /// Only one global recorder can exist per process, so tests use
    /// build_recorder() with a thread-local default instead.
    fn isolated_recorder() -> (PrometheusRecorder, PrometheusHandle) {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        (recorder, handle)
    }

    #[test]
    fn describe_metrics_does_not_panic_without_recorder() {
        describe_metrics();
    }

    #[test]
    fn described_counters_render_with_help_text() {
        let (recorder, handle) = isolated_recorder();
        let _guard = metrics::set_default_local_recorder(&recorder);

        describe_metrics();
        search_poller::metrics::record_captured();
        search_poller::metrics::record_upstream_error("transient");

        let output = handle.render();
        assert!(
            output.contains("# HELP relay_records_captured_total Records relayed to every sink"),
            "help text must render, got: {output}"
        );
        assert!(output.contains("relay_records_captured_total 1"));
        assert!(output.contains("relay_upstream_errors_total{error_type=\"transient\"} 1"));
    }
}
