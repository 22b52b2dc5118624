//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): operations by method, status
//! - `gateway_request_duration_seconds` (histogram): dispatch latency by method
//! - `gateway_errors_total` (counter): normalized errors by code
//! - `gateway_active_watches` (gauge): running transaction watches
//! - `gateway_monitor_ticks_total` (counter): poll ticks by outcome
//! - `gateway_monitor_deliveries_total` (counter): transactions delivered
//! - `gateway_chain_health` (gauge): 1=reachable, 0=unreachable
//!
//! Without an installed recorder every call here is a no-op, so tests and
//! the library can record freely.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
///
/// Must be called from inside a tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one dispatched operation.
pub fn record_request(method: &str, status: &'static str, start_time: Instant) {
    let elapsed = start_time.elapsed().as_secs_f64();
    counter!("gateway_requests_total", "method" => method.to_string(), "status" => status)
        .increment(1);
    histogram!("gateway_request_duration_seconds", "method" => method.to_string())
        .record(elapsed);
}

pub fn record_error(code: &'static str) {
    counter!("gateway_errors_total", "code" => code).increment(1);
}

pub fn record_active_watches(count: usize) {
    gauge!("gateway_active_watches").set(count as f64);
}

/// `outcome` is `ok` or `error`.
pub fn record_monitor_tick(outcome: &'static str) {
    counter!("gateway_monitor_ticks_total", "outcome" => outcome).increment(1);
}

pub fn record_monitor_delivery() {
    counter!("gateway_monitor_deliveries_total").increment(1);
}

pub fn record_chain_health(healthy: bool) {
    gauge!("gateway_chain_health").set(if healthy { 1.0 } else { 0.0 });
}
