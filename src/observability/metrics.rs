//! Metrics collection and exposition.
//!
//! # Metrics
//! - `talks_requests_total` (counter): requests by method, status
//! - `talks_request_duration_seconds` (histogram): latency distribution
//! - `talks_mutations_total` (counter): store mutations by kind
//! - `talks_store_version` (gauge): current store version
//! - `talks_pending_waiters` (gauge): suspended long polls
//! - `talks_long_polls_total` (counter): long polls by outcome
//! - `talks_persist_failures_total` (counter): failed saves
//!
//! # Design Decisions
//! - Recording without an installed recorder is a no-op, so tests and
//!   library users pay nothing
//! - Prometheus exporter only started when enabled in config

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

/// Start the Prometheus scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    let status = status.to_string();
    counter!("talks_requests_total", "method" => method.to_string(), "status" => status)
        .increment(1);
    histogram!("talks_request_duration_seconds", "method" => method.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_mutation(kind: &'static str, version: u64) {
    counter!("talks_mutations_total", "kind" => kind).increment(1);
    gauge!("talks_store_version").set(version as f64);
}

pub fn record_pending_waiters(count: usize) {
    gauge!("talks_pending_waiters").set(count as f64);
}

/// `outcome` is one of `changed`, `timeout`.
pub fn record_long_poll(outcome: &'static str) {
    counter!("talks_long_polls_total", "outcome" => outcome).increment(1);
}

pub fn record_persist_failure() {
    counter!("talks_persist_failures_total").increment(1);
}
