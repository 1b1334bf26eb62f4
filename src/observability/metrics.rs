//! Metrics collection and exposition.
//!
//! # Metrics
//! - `edge_requests_total` (counter): requests by classification, method, status
//! - `edge_request_duration_seconds` (histogram): latency distribution
//! - `edge_rate_limited_total` (counter): rejections by limiter scope
//! - `edge_origin_rejected_total` (counter): requests refused by the allow-list
//! - `edge_upstream_failures_total` (counter): dev-proxy failures by target and kind
//! - `edge_upgrade_tunnels_active` (gauge): open protocol-upgrade tunnels
//!
//! # Design Decisions
//! - Recorded through the `metrics` facade; without an installed recorder
//!   every call is a no-op
//! - Prometheus exposition is optional and served on its own address

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;
use std::time::Instant;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Prometheus metrics endpoint listening");
    Ok(())
}

pub fn record_request(classification: &'static str, method: &str, status: u16, start: Instant) {
    counter!(
        "edge_requests_total",
        "classification" => classification,
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!(
        "edge_request_duration_seconds",
        "classification" => classification,
        "method" => method.to_string()
    )
    .record(start.elapsed().as_secs_f64());
}

pub fn record_rate_limited(scope: &'static str) {
    counter!("edge_rate_limited_total", "scope" => scope).increment(1);
}

pub fn record_origin_rejected() {
    counter!("edge_origin_rejected_total").increment(1);
}

pub fn record_upstream_failure(target: &'static str, kind: &'static str) {
    counter!("edge_upstream_failures_total", "target" => target, "kind" => kind).increment(1);
}

pub fn tunnel_opened(target: &'static str) {
    gauge!("edge_upgrade_tunnels_active", "target" => target).increment(1.0);
}

pub fn tunnel_closed(target: &'static str) {
    gauge!("edge_upgrade_tunnels_active", "target" => target).decrement(1.0);
}
