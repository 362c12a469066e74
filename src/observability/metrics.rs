//! Metrics collection and exposition.
//!
//! # Metrics
//! - `dispatch_requests_total` (counter): exchanges by method, status
//! - `dispatch_request_duration_seconds` (histogram): latency by method
//! - `dispatch_aborted_total` (counter): exchanges ended by a pipeline error
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; nothing is recorded until
//!   an exporter is installed
//! - The Prometheus exporter is optional and started from config

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record a finished exchange.
pub fn record_request(method: &str, status: u16, start: Instant) {
    metrics::counter!(
        "dispatch_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("dispatch_request_duration_seconds", "method" => method.to_string())
        .record(start.elapsed().as_secs_f64());
}

/// Record an exchange aborted by a stage or handler error.
pub fn record_aborted(method: &str) {
    metrics::counter!("dispatch_aborted_total", "method" => method.to_string()).increment(1);
}
