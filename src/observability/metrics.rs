//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): requests by port, route, status
//! - `proxy_request_duration_seconds` (histogram): latency by port and route
//! - `proxy_backend_health` (gauge): 1=alive, 0=dead, by host
//! - `proxy_backend_rtt_ms` (gauge): last probe round trip, by host
//! - `proxy_health_sweep_failed` / `proxy_health_sweep_total` (gauge): last sweep
//!
//! Recording is a no-op until [`init_metrics`] installs the exporter.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and serve `/metrics` on `addr`.
///
/// Must be called from inside a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

/// `route` is one of `primary`, `backup`, `unavailable`.
pub fn record_request(port: u16, route: &'static str, status: u16, start: Instant) {
    let port = port.to_string();
    metrics::counter!(
        "proxy_requests_total",
        "port" => port.clone(),
        "route" => route,
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!(
        "proxy_request_duration_seconds",
        "port" => port,
        "route" => route
    )
    .record(start.elapsed().as_secs_f64());
}

/// `rtt_ms` of 0 means the last probe failed.
pub fn record_backend_health(host: &str, rtt_ms: i64) {
    let alive = if rtt_ms == 0 { 0.0 } else { 1.0 };
    metrics::gauge!("proxy_backend_health", "host" => host.to_string()).set(alive);
    metrics::gauge!("proxy_backend_rtt_ms", "host" => host.to_string()).set(rtt_ms as f64);
}

pub fn record_sweep(failed: usize, total: usize) {
    metrics::gauge!("proxy_health_sweep_failed").set(failed as f64);
    metrics::gauge!("proxy_health_sweep_total").set(total as f64);
}
