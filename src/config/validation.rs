//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (deadlines > 0, ratios in range)
//! - Detect duplicate provider keys
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::{GatewayConfig, PLACEHOLDER_API_KEY};

/// Longest duration any timeout, TTL or cool-down may be configured to.
pub const MAX_DURATION_SECS: u64 = 10 * 365 * 86_400;
const MAX_DURATION_MS: u64 = MAX_DURATION_SECS * 1_000;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Check a parsed configuration, collecting every problem found.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let mut bounded = |field: &str, value: u64, max: u64| {
        if value > max {
            errors.push(ValidationError::new(field, format!("{} exceeds the maximum of {}", value, max)));
        }
    };

    let t = &config.timeouts;
    bounded("timeouts.provider_call_ms", t.provider_call_ms, MAX_DURATION_MS);
    bounded("timeouts.store_call_ms", t.store_call_ms, MAX_DURATION_MS);
    bounded("timeouts.request_secs", t.request_secs, MAX_DURATION_SECS);
    let idem = &config.idempotency;
    bounded("idempotency.lease_ttl_secs", idem.lease_ttl_secs, MAX_DURATION_SECS);
    bounded("idempotency.completed_ttl_secs", idem.completed_ttl_secs, MAX_DURATION_SECS);
    bounded("idempotency.sweep_interval_secs", idem.sweep_interval_secs, MAX_DURATION_SECS);
    let cb = &config.circuit_breaker;
    bounded("circuit_breaker.interval_secs", cb.interval_secs, MAX_DURATION_SECS);
    bounded("circuit_breaker.open_secs", cb.open_secs, MAX_DURATION_SECS);
    for (i, p) in config.providers.iter().enumerate() {
        bounded(&format!("providers[{}].max_latency_ms", i), p.max_latency_ms, MAX_DURATION_MS);
    }

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    if t.provider_call_ms == 0 {
        errors.push(ValidationError::new("timeouts.provider_call_ms", "must be greater than 0"));
    }
    if t.store_call_ms == 0 {
        errors.push(ValidationError::new("timeouts.store_call_ms", "must be greater than 0"));
    }
    if t.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than 0"));
    }

    if idem.lease_ttl_secs == 0 {
        errors.push(ValidationError::new("idempotency.lease_ttl_secs", "must be greater than 0"));
    }
    if idem.completed_ttl_secs < idem.lease_ttl_secs {
        errors.push(ValidationError::new(
            "idempotency.completed_ttl_secs",
            "must not be shorter than the lease TTL",
        ));
    }
    if idem.sweep_interval_secs == 0 {
        errors.push(ValidationError::new("idempotency.sweep_interval_secs", "must be greater than 0"));
    }

    if cb.min_requests == 0 {
        errors.push(ValidationError::new("circuit_breaker.min_requests", "must be at least 1"));
    }
    if !(cb.failure_ratio > 0.0 && cb.failure_ratio <= 1.0) {
        errors.push(ValidationError::new(
            "circuit_breaker.failure_ratio",
            format!("{} is outside (0.0, 1.0]", cb.failure_ratio),
        ));
    }
    if cb.open_secs == 0 {
        errors.push(ValidationError::new("circuit_breaker.open_secs", "must be greater than 0"));
    }
    if cb.half_open_max_requests == 0 {
        errors.push(ValidationError::new(
            "circuit_breaker.half_open_max_requests",
            "must be at least 1",
        ));
    }

    if config.providers.0.is_empty() {
        errors.push(ValidationError::new("providers", "at least one provider is required"));
    }
    let mut seen = HashSet::new();
    for (i, p) in config.providers.iter().enumerate() {
        let field = |name: &str| format!("providers[{}].{}", i, name);
        if p.key.trim().is_empty() {
            errors.push(ValidationError::new(field("key"), "must not be empty"));
        } else if !seen.insert(p.key.as_str()) {
            errors.push(ValidationError::new(field("key"), format!("duplicate key '{}'", p.key)));
        }
        if p.name.trim().is_empty() {
            errors.push(ValidationError::new(field("name"), "must not be empty"));
        }
        if p.min_latency_ms > p.max_latency_ms {
            errors.push(ValidationError::new(
                field("min_latency_ms"),
                "must not exceed max_latency_ms",
            ));
        }
        if !(0.0..=1.0).contains(&p.failure_rate) {
            errors.push(ValidationError::new(
                field("failure_rate"),
                format!("{} is outside [0.0, 1.0]", p.failure_rate),
            ));
        }
    }

    let obs = &config.observability;
    if obs.log_format != "pretty" && obs.log_format != "json" {
        errors.push(ValidationError::new(
            "observability.log_format",
            format!("unknown format '{}' (expected pretty or json)", obs.log_format),
        ));
    }
    if obs.metrics_enabled && obs.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", obs.metrics_address),
        ));
    }

    if config.admin.enabled && config.admin.api_key.is_empty() {
        errors.push(ValidationError::new("admin.api_key", "required when admin is enabled"));
    } else if config.admin.enabled && config.admin.api_key == PLACEHOLDER_API_KEY {
        errors.push(ValidationError::new(
            "admin.api_key",
            "still set to the placeholder; choose a real key before enabling admin",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
