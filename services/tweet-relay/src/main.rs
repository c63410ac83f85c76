//! Tweet Relay
//!
//! Single-binary Rust service that:
//! 1. Leases a Twitter app credential with remaining search quota
//! 2. Walks a standard search backwards from the newest match, page by page
//! 3. Publishes each record's envelope to a Kafka topic, optionally also
//!    appending the raw record to a JSON lines file

mod config;
mod error;
mod metrics;
mod provider_impl;
mod sink;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use credential_pool::Pool;
use provider::SearchProvider;
use search_poller::{JsonLinesSink, Poller, RecordSink};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use twitter_auth::Endpoints;

use crate::config::{Cli, Config};
use crate::provider_impl::TwitterProvider;
use crate::sink::KafkaSink;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and LOG_LEVEL / RUST_LOG support
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "starting tweet-relay");

    let cli = Cli::parse();
    let config = Config::load(&cli).context("failed to load configuration")?;

    info!(
        brokers = %config.kafka.brokers,
        topic = %config.kafka.topic,
        credentials = config.credentials.len(),
        query = ?config.query.search_terms,
        geocode = ?config.query.geocode,
        lang = ?config.query.language,
        limit = ?config.limits.capture_limit,
        max_id = ?config.limits.max_id_limit,
        since_id = ?config.limits.since_id,
        "configuration loaded"
    );

    if let Some(addr) = config.metrics_addr {
        metrics::install_exporter(addr).context("failed to start metrics exporter")?;
        info!(%addr, "serving Prometheus metrics");
    }

    let mut sinks: Vec<Box<dyn RecordSink>> = vec![Box::new(
        KafkaSink::new(&config.kafka).context("failed to create Kafka producer")?,
    )];
    if let Some(path) = &config.output_json {
        let file_sink = JsonLinesSink::open(path)
            .await
            .with_context(|| format!("failed to open {}", path.display()))?;
        sinks.push(Box::new(file_sink));
    }

    let mut poller = build_poller(&config, sinks)?;

    // The run future is dropped at its current await point on a signal
    let outcome = tokio::select! {
        result = poller.run() => Some(result),
        _ = shutdown_signal() => None,
    };

    match outcome {
        Some(result) => {
            let summary = result.context("relay failed")?;
            info!(termination = %summary.termination, "relay finished");
        }
        None => {
            poller.flush().await.context("failed to flush sinks")?;
            let captured = poller.counters().captured;
            info!(captured, "Total of {} captured record(s).", captured);
        }
    }

    info!("shutdown complete");
    Ok(())
}

/// Wire the Twitter provider, credential pool and sinks into a poller.
fn build_poller(config: &Config, sinks: Vec<Box<dyn RecordSink>>) -> Result<Poller> {
    let client = reqwest::Client::builder()
        .timeout(config.api.timeout)
        .build()
        .map_err(|e| crate::error::Error::HttpClient(e.to_string()))?;
    let provider: Arc<dyn SearchProvider> = Arc::new(TwitterProvider::new(
        client,
        Endpoints::with_base(&config.api.base_url),
    ));
    let pool = Pool::new(config.credentials.clone(), Arc::clone(&provider))?;

    Ok(Poller::new(
        pool,
        provider,
        config.query.clone(),
        config.limits,
        sinks,
    )
    .with_retry_policy(config.retry))
}

/// Wait for SIGTERM or SIGINT.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
