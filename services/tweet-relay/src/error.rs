//! Service-specific error types

use thiserror::Error;

/// Startup errors for the relay's outer surfaces.
///
/// Configuration failures use `common::Error`; run failures use
/// `search_poller::Error`.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Kafka producer setup failed: {0}")]
    Kafka(#[from] rdkafka::error::KafkaError),

    #[error("Prometheus exporter setup failed: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    #[error("HTTP client setup failed: {0}")]
    HttpClient(String),
}

/// Result alias using service Error
pub type Result<T> = std::result::Result<T, Error>;
