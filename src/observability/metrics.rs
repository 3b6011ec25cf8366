//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define gateway metrics (outcomes, provider latency, breaker state)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by provider, outcome
//! - `gateway_provider_call_duration_seconds` (histogram): provider latency
//! - `gateway_circuit_transitions_total` (counter): breaker transitions by provider, target state
//! - `gateway_circuit_state` (gauge): 0=closed, 1=half-open, 2=open
//! - `gateway_idempotency_total` (counter): admission decisions
//! - `gateway_store_errors_total` (counter): failed store calls by operation
//!
//! # Design Decisions
//! - Low-overhead metric updates (atomic operations)
//! - Histogram buckets centred on the 1 s provider deadline

use std::net::SocketAddr;
use std::time::Duration;

use ::metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::resilience::CircuitState;

const CALL_LATENCY_BUCKETS: &[f64] = &[0.05, 0.1, 0.2, 0.4, 0.6, 0.8, 1.0, 2.0, 5.0];

/// Install the Prometheus recorder and serve it on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new()
        .set_buckets(CALL_LATENCY_BUCKETS)?
        .with_http_listener(addr)
        .install()?;

    describe_counter!("gateway_requests_total", "Payment requests by provider and outcome");
    describe_histogram!(
        "gateway_provider_call_duration_seconds",
        "Duration of bounded provider calls in seconds"
    );
    describe_counter!(
        "gateway_circuit_transitions_total",
        "Circuit breaker state transitions"
    );
    describe_gauge!(
        "gateway_circuit_state",
        "Circuit breaker state (0=closed, 1=half-open, 2=open)"
    );
    describe_counter!("gateway_idempotency_total", "Idempotency admission decisions");
    describe_counter!("gateway_store_errors_total", "Failed idempotency store calls");

    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_request(provider: &str, outcome: &'static str) {
    counter!(
        "gateway_requests_total",
        "provider" => provider.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_provider_call(provider: &str, outcome: &'static str, elapsed: Duration) {
    histogram!(
        "gateway_provider_call_duration_seconds",
        "provider" => provider.to_string(),
        "outcome" => outcome
    )
    .record(elapsed.as_secs_f64());
}

pub fn record_circuit_transition(provider: &str, to: CircuitState) {
    counter!(
        "gateway_circuit_transitions_total",
        "provider" => provider.to_string(),
        "to" => to.as_str()
    )
    .increment(1);
    gauge!("gateway_circuit_state", "provider" => provider.to_string()).set(to.as_gauge());
}

pub fn record_idempotency(result: &'static str) {
    counter!("gateway_idempotency_total", "result" => result).increment(1);
}

pub fn record_store_error(operation: &'static str) {
    counter!("gateway_store_errors_total", "operation" => operation).increment(1);
}
