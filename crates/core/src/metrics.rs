//! Metrics definitions for outbound CRM traffic.
//!
//! Metrics are collected using the `metrics` crate and can be exported
//! to Prometheus via `metrics-exporter-prometheus`. Without an installed
//! recorder every call here is a no-op.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use std::time::Instant;

/// Initialize all metric descriptions.
/// Call this once at startup before any metrics are recorded.
pub fn init_metrics() {
    describe_counter!(
        "crm_requests_total",
        "Total number of requests sent to the retail CRM"
    );
    describe_histogram!(
        "crm_request_duration_seconds",
        "Time taken by a retail CRM request in seconds, queueing excluded"
    );
    describe_gauge!(
        "crm_requests_in_flight",
        "Number of retail CRM requests currently admitted by the limiter"
    );
}

/// Record the outcome of one CRM request.
///
/// # Arguments
/// * `endpoint` - Endpoint path without query string (e.g. "/orders")
/// * `outcome` - "ok", "empty", "status", "decode" or "transport"
pub fn record_request(endpoint: &str, outcome: &'static str) {
    counter!("crm_requests_total", "endpoint" => endpoint.to_string(), "outcome" => outcome)
        .increment(1);
}

/// Record the current number of admitted requests.
pub fn record_in_flight(count: usize) {
    gauge!("crm_requests_in_flight").set(count as f64);
}

/// A timer that records the request duration for an endpoint when dropped.
pub struct RequestTimer {
    endpoint: String,
    start: Instant,
}

impl RequestTimer {
    /// Start a new request timer.
    pub fn new(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            start: Instant::now(),
        }
    }
}

impl Drop for RequestTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        histogram!("crm_request_duration_seconds", "endpoint" => self.endpoint.clone())
            .record(duration);
    }
}
