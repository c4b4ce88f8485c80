//! Metrics collection and exposition.
//!
//! # Metrics
//! - `breaker_http_requests_total` (counter): requests by method, status
//! - `breaker_http_request_duration_seconds` (histogram): latency by method
//! - `breaker_registry_entries` (gauge): entries held by the store

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::observability::ObservabilityError;

/// Install the Prometheus exporter with its own HTTP listener.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(address: &str) -> Result<(), ObservabilityError> {
    let addr: SocketAddr = address
        .parse()
        .map_err(|_| ObservabilityError::MetricsAddress(address.to_string()))?;

    PrometheusBuilder::new().with_http_listener(addr).install()?;

    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    metrics::counter!(
        "breaker_http_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    metrics::histogram!(
        "breaker_http_request_duration_seconds",
        "method" => method.to_string()
    )
    .record(start.elapsed().as_secs_f64());
}

pub fn record_registry_size(size: usize) {
    metrics::gauge!("breaker_registry_entries").set(size as f64);
}
