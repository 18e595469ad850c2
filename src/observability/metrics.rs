//! Metrics collection and exposition.
//!
//! # Metrics
//! - `waypoint_requests_total` (counter): requests by method, status, route
//! - `waypoint_request_duration_seconds` (histogram): latency by method, route
//! - `waypoint_auth_failures_total` (counter): failures by strategy, status
//! - `waypoint_rate_limited_total` (counter): rejected by the rate limiter
//! - `waypoint_rpc_calls_total` (counter): RPC calls by method, outcome
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   exporter every call is a no-op
//! - Route labels use the route pattern, never the raw path

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter with its own HTTP listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), metrics_exporter_prometheus::BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Prometheus metrics exporter listening");
    Ok(())
}

pub fn record_request(method: &str, status: u16, route: &str, start: Instant) {
    let elapsed = start.elapsed().as_secs_f64();
    metrics::counter!(
        "waypoint_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "route" => route.to_string()
    )
    .increment(1);
    metrics::histogram!(
        "waypoint_request_duration_seconds",
        "method" => method.to_string(),
        "route" => route.to_string()
    )
    .record(elapsed);
}

pub fn record_auth_failure(strategy: &str, status: u16) {
    metrics::counter!(
        "waypoint_auth_failures_total",
        "strategy" => strategy.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

pub fn record_rate_limited() {
    metrics::counter!("waypoint_rate_limited_total").increment(1);
}

pub fn record_rpc_call(method: &str, outcome: &'static str) {
    metrics::counter!(
        "waypoint_rpc_calls_total",
        "method" => method.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}
