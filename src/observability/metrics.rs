//! Metrics collection and exposition.
//!
//! # Metrics
//! - `endpoint_connections_accepted_total` (counter)
//! - `endpoint_accept_failures_total` (counter)
//! - `endpoint_read_failures_total` (counter)
//! - `endpoint_request_bytes_total` (counter)
//! - `endpoint_responses_total` (counter): by `outcome` (sent, failed, skipped)
//!
//! Recording is a no-op until a recorder is installed, so the endpoint runs
//! the same with the exporter switched off.

use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;

    ::metrics::describe_counter!(
        "endpoint_connections_accepted_total",
        "Connections accepted by the endpoint"
    );
    ::metrics::describe_counter!(
        "endpoint_accept_failures_total",
        "Failed accept calls"
    );
    ::metrics::describe_counter!(
        "endpoint_read_failures_total",
        "Failed reads from an accepted connection"
    );
    ::metrics::describe_counter!(
        "endpoint_request_bytes_total",
        "Request bytes captured from clients"
    );
    ::metrics::describe_counter!(
        "endpoint_responses_total",
        "Responses by outcome"
    );

    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_connection_accepted() {
    ::metrics::counter!("endpoint_connections_accepted_total").increment(1);
}

pub fn record_accept_failure() {
    ::metrics::counter!("endpoint_accept_failures_total").increment(1);
}

pub fn record_read_failure() {
    ::metrics::counter!("endpoint_read_failures_total").increment(1);
}

pub fn record_request_bytes(bytes: usize) {
    ::metrics::counter!("endpoint_request_bytes_total").increment(bytes as u64);
}

/// Record how a response attempt ended.
pub fn record_response(outcome: &'static str) {
    ::metrics::counter!("endpoint_responses_total", "outcome" => outcome).increment(1);
}
