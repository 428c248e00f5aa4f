//! Prometheus metrics registry and instruments.
//!
//! This module is framework-agnostic and can be used from any layer.

use lazy_static::lazy_static;
use prometheus::{HistogramOpts, IntCounter, IntCounterVec, Opts, Registry};

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // Upstream (GitHub) Metrics
    pub static ref UPSTREAM_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("ghgate_upstream_requests_total", "Total number of requests sent to GitHub"),
        &["method", "status"]
    ).expect("metric can be created");
    pub static ref UPSTREAM_REQUEST_DURATION_SECONDS: prometheus::HistogramVec = prometheus::HistogramVec::new(
        HistogramOpts::new(
            "ghgate_upstream_request_duration_seconds",
            "GitHub request duration in seconds"
        ).buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        &["method"]
    ).expect("metric can be created");
    pub static ref RATE_LIMIT_EVENTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("ghgate_rate_limit_events_total", "Total number of GitHub rate-limit responses relayed"),
        &["endpoint"]
    ).expect("metric can be created");

    // Session Metrics
    pub static ref SESSIONS_ISSUED_TOTAL: IntCounter = IntCounter::new(
        "ghgate_sessions_issued_total",
        "Total number of session credentials issued"
    ).expect("metric can be created");

    // Error Metrics
    pub static ref ERRORS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("ghgate_errors_total", "Total number of errors"),
        &["error_type"]
    ).expect("metric can be created");
}

/// Initialize metrics registry.
///
/// Call once at startup; registering the same collector twice fails.
pub fn init_metrics() -> Result<(), prometheus::Error> {
    REGISTRY.register(Box::new(UPSTREAM_REQUESTS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(UPSTREAM_REQUEST_DURATION_SECONDS.clone()))?;
    REGISTRY.register(Box::new(RATE_LIMIT_EVENTS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(SESSIONS_ISSUED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(ERRORS_TOTAL.clone()))?;

    tracing::info!("Metrics registry initialized");
    Ok(())
}
