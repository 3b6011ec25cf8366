//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the payment gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Deadlines for outbound calls and inbound requests.
    pub timeouts: TimeoutConfig,

    /// Idempotency lease and dedup window settings.
    pub idempotency: IdempotencyConfig,

    /// Circuit breaker settings shared by every provider.
    pub circuit_breaker: CircuitBreakerConfig,

    /// Provider registrations.
    pub providers: ProvidersConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    #[serde(default)]
    pub admin: AdminConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Hard deadline for a single provider call, in milliseconds.
    pub provider_call_ms: u64,

    /// Deadline for each idempotency store round-trip, in milliseconds.
    pub store_call_ms: u64,

    /// Upper bound for a whole inbound HTTP request, in seconds.
    pub request_secs: u64,
}

impl TimeoutConfig {
    pub fn provider_call(&self) -> Duration {
        Duration::from_millis(self.provider_call_ms)
    }

    pub fn store_call(&self) -> Duration {
        Duration::from_millis(self.store_call_ms)
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            provider_call_ms: 1_000,
            store_call_ms: 1_000,
            request_secs: 30,
        }
    }
}

/// Idempotency configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct IdempotencyConfig {
    /// Prefix prepended to transaction ids to form store keys.
    pub key_prefix: String,

    /// TTL of the IN_PROGRESS lease, in seconds.
    pub lease_ttl_secs: u64,

    /// TTL of the COMPLETED marker (dedup window), in seconds.
    pub completed_ttl_secs: u64,

    /// How often the in-memory store purges expired keys, in seconds.
    pub sweep_interval_secs: u64,
}

impl IdempotencyConfig {
    pub fn lease_ttl(&self) -> Duration {
        Duration::from_secs(self.lease_ttl_secs)
    }

    pub fn completed_ttl(&self) -> Duration {
        Duration::from_secs(self.completed_ttl_secs)
    }
}

impl Default for IdempotencyConfig {
    fn default() -> Self {
        Self {
            key_prefix: "txn:".to_string(),
            lease_ttl_secs: 10,
            completed_ttl_secs: 24 * 60 * 60,
            sweep_interval_secs: 60,
        }
    }
}

/// Circuit breaker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Minimum calls in the current window before the ratio is evaluated.
    pub min_requests: u32,

    /// Failure ratio (failures / requests) at or above which the circuit trips.
    pub failure_ratio: f64,

    /// Rolling window length while closed, in seconds. 0 disables resets.
    pub interval_secs: u64,

    /// Cool-down before an open circuit admits a trial call, in seconds.
    pub open_secs: u64,

    /// Concurrent trial calls allowed while half-open.
    pub half_open_max_requests: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            min_requests: 3,
            failure_ratio: 0.6,
            interval_secs: 5,
            open_secs: 30,
            half_open_max_requests: 1,
        }
    }
}

/// A single provider registration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProviderConfig {
    /// Provider-selection key used by requests (e.g. "MTN").
    pub key: String,

    /// Name reported in responses (e.g. "MTN_MOMO").
    pub name: String,

    /// Prefix for generated reference ids.
    #[serde(default = "default_reference_prefix")]
    pub reference_prefix: String,

    /// Lower bound of simulated latency in milliseconds.
    #[serde(default = "default_min_latency_ms")]
    pub min_latency_ms: u64,

    /// Upper bound of simulated latency in milliseconds.
    #[serde(default = "default_max_latency_ms")]
    pub max_latency_ms: u64,

    /// Probability (0.0..=1.0) of a simulated upstream error.
    #[serde(default = "default_failure_rate")]
    pub failure_rate: f64,
}

fn default_reference_prefix() -> String {
    "REF".to_string()
}

fn default_min_latency_ms() -> u64 {
    200
}

fn default_max_latency_ms() -> u64 {
    800
}

fn default_failure_rate() -> f64 {
    0.8
}

/// The provider list. Wrapped so an absent section still yields the defaults.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(transparent)]
pub struct ProvidersConfig(pub Vec<ProviderConfig>);

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self(vec![
            ProviderConfig {
                key: "MTN".to_string(),
                name: "MTN_MOMO".to_string(),
                reference_prefix: "MTN".to_string(),
                min_latency_ms: default_min_latency_ms(),
                max_latency_ms: default_max_latency_ms(),
                failure_rate: default_failure_rate(),
            },
            ProviderConfig {
                key: "AIRTEL".to_string(),
                name: "AIRTEL_MONEY".to_string(),
                reference_prefix: "AIRTEL".to_string(),
                min_latency_ms: default_min_latency_ms(),
                max_latency_ms: default_max_latency_ms(),
                failure_rate: default_failure_rate(),
            },
        ])
    }
}

impl ProvidersConfig {
    pub fn iter(&self) -> impl Iterator<Item = &ProviderConfig> {
        self.0.iter()
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format ("pretty" or "json").
    pub log_format: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Default admin key; refused when the admin API is enabled.
pub const PLACEHOLDER_API_KEY: &str = "CHANGE_ME_IN_PRODUCTION";

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Mount the admin routes.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: PLACEHOLDER_API_KEY.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GatewayConfig::default();
        assert_eq!(config.timeouts.provider_call(), Duration::from_secs(1));
        assert_eq!(config.idempotency.lease_ttl(), Duration::from_secs(10));
        assert_eq!(config.idempotency.completed_ttl(), Duration::from_secs(86_400));
        assert_eq!(config.circuit_breaker.min_requests, 3);
        assert_eq!(config.providers.0.len(), 2);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: GatewayConfig = toml::from_str(
            r#"
            [circuit_breaker]
            open_secs = 5

            [[providers]]
            key = "MTN"
            name = "MTN_MOMO"
            failure_rate = 0.1
            "#,
        )
        .unwrap();

        assert_eq!(config.circuit_breaker.open_secs, 5);
        assert_eq!(config.circuit_breaker.failure_ratio, 0.6);
        assert_eq!(config.providers.0.len(), 1);
        assert_eq!(config.providers.0[0].max_latency_ms, 800);
        assert_eq!(config.idempotency.key_prefix, "txn:");
    }
}
