//! Prometheus metrics for the tournament server.
//!
//! Metrics are exposed in Prometheus text format on a separate listener.
//! Without an installed exporter every call here is a no-op.
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use cs_server::metrics;
//! use std::net::SocketAddr;
//!
//! let addr: SocketAddr = "127.0.0.1:9090".parse().unwrap();
//! metrics::init_metrics(addr).unwrap();
//!
//! metrics::http_requests_total("POST", "/api/v1/tournaments/{id}/registrations", 201);
//! ```

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Initialize Prometheus metrics exporter.
///
/// Metrics will be available at `http://<addr>/metrics`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {}", e))
}

// ============================================================================
// HTTP Metrics
// ============================================================================

/// Count a finished request. `route` is the matched template, never the raw path.
pub fn http_requests_total(method: &str, route: &str, status: u16) {
    metrics::counter!("http_requests_total",
        "method" => method.to_string(),
        "route" => route.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

pub fn http_request_duration_ms(method: &str, route: &str, duration_ms: f64) {
    metrics::histogram!("http_request_duration_ms",
        "method" => method.to_string(),
        "route" => route.to_string()
    )
    .record(duration_ms);
}

// ============================================================================
// Tournament Metrics
// ============================================================================

/// Registration attempts by outcome
pub fn registrations_total(accepted: bool) {
    metrics::counter!("registrations_total",
        "accepted" => accepted.to_string()
    )
    .increment(1);
}

/// Match transitions by kind (`start`, `result`, `walkover`, `cancel`)
pub fn match_transitions_total(kind: &'static str) {
    metrics::counter!("match_transitions_total", "kind" => kind).increment(1);
}

/// Tournaments that reached COMPLETED
pub fn tournaments_completed_total() {
    metrics::counter!("tournaments_completed_total").increment(1);
}

/// Court blocks created and refused by a scheduling run
pub fn court_blocks(created: usize, failed: usize) {
    metrics::counter!("court_blocks_created_total").increment(created as u64);
    metrics::counter!("court_blocks_failed_total").increment(failed as u64);
}

/// Tournament instances stamped from recurring templates
pub fn recurring_instances_total(count: usize) {
    metrics::counter!("recurring_instances_total").increment(count as u64);
}
