//! Prometheus exporter for Store and check-in metrics.
//!
//! The Store records reducer and effect metrics through the `metrics` facade
//! unconditionally. They go nowhere until a recorder is installed, which is
//! what [`MetricsServer`] does.
//!
//! # Example
//!
//! ```rust,no_run
//! use turnstile_runtime::metrics::MetricsServer;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut server = MetricsServer::new("0.0.0.0:9090".parse()?);
//! server.start()?;
//!
//! // Scrape http://localhost:9090/metrics
//! # Ok(())
//! # }
//! ```

use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use thiserror::Error;

// Re-export metrics macros for use in other crates
pub use metrics::{counter, gauge, histogram};

/// Exporter setup failure.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// The Prometheus recorder or its listener could not be built
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
}

/// Latency buckets shared by every `*_duration_seconds` histogram.
const DURATION_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Installs the Prometheus recorder and serves `/metrics` over HTTP.
pub struct MetricsServer {
    addr: SocketAddr,
    handle: Option<PrometheusHandle>,
}

impl MetricsServer {
    /// Server for `addr`; nothing is bound until [`start`](Self::start).
    #[must_use]
    pub const fn new(addr: SocketAddr) -> Self {
        Self { addr, handle: None }
    }

    /// Address the HTTP listener binds to.
    #[must_use]
    pub const fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Install the global recorder and spawn the HTTP listener.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError::Build`] if the exporter cannot be built.
    ///
    /// A recorder installed earlier stays in place and no listener is
    /// started.
    pub fn start(&mut self) -> Result<(), MetricsError> {
        describe_store_metrics();

        let (recorder, exporter) = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                DURATION_BUCKETS,
            )
            .map_err(|e| MetricsError::Build(e.to_string()))?
            .with_http_listener(self.addr)
            .build()
            .map_err(|e| MetricsError::Build(e.to_string()))?;

        let handle = recorder.handle();

        if metrics::set_global_recorder(recorder).is_err() {
            tracing::warn!("Metrics recorder already initialized, skipping re-initialization");
            return Ok(());
        }

        tokio::spawn(async move {
            if let Err(error) = exporter.await {
                tracing::error!(?error, "Metrics listener stopped");
            }
        });

        self.handle = Some(handle);
        tracing::info!(
            addr = %self.addr,
            "Serving metrics at /metrics"
        );
        Ok(())
    }

    /// Recorder handle, once started.
    #[must_use]
    pub const fn handle(&self) -> Option<&PrometheusHandle> {
        self.handle.as_ref()
    }

    /// Current metrics in text exposition format, `None` before `start`.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        self.handle.as_ref().map(PrometheusHandle::render)
    }
}

/// Register descriptions for the metrics the Store records.
pub fn describe_store_metrics() {
    describe_counter!("store.commands.total", "Total number of actions sent to stores");
    describe_histogram!(
        "store.reducer.duration_seconds",
        "Time taken to execute reducers"
    );
    describe_histogram!("store.effects.count", "Effects returned per reducer call");
    describe_counter!(
        "store.effects.executed",
        "Total number of effects executed, by type"
    );
    describe_counter!(
        "store.shutdown.initiated",
        "Graceful shutdowns started"
    );
    describe_counter!(
        "store.shutdown.completed",
        "Graceful shutdowns that drained every effect"
    );
    describe_counter!(
        "store.shutdown.timeout",
        "Graceful shutdowns that gave up with effects still running"
    );
    describe_counter!(
        "store.shutdown.rejected_actions",
        "Actions rejected because the store was shutting down"
    );
}
