//! Provider routing table.
//!
//! # Responsibilities
//! - Map provider-selection keys to provider implementations
//! - Own one circuit breaker per registered provider
//! - Carry the outcome classifier used for each provider

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::GatewayConfig;
use crate::providers::{PaymentProvider, SimulatedProvider};
use crate::resilience::{default_classifier, BreakerSettings, BreakerSnapshot, CircuitBreaker, OutcomeClassifier};

/// Everything needed to dispatch to one provider.
#[derive(Clone)]
pub struct ProviderRoute {
    pub key: String,
    pub provider: Arc<dyn PaymentProvider>,
    pub breaker: Arc<CircuitBreaker>,
    pub classifier: OutcomeClassifier,
}

/// Leaves breaker state out: reading it may apply a pending transition.
impl std::fmt::Debug for ProviderRoute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRoute")
            .field("key", &self.key)
            .field("provider", &self.provider.name())
            .field("breaker", &self.breaker.name())
            .finish_non_exhaustive()
    }
}

/// Key → route table, built once at start-up.
#[derive(Debug)]
pub struct ProviderRegistry {
    routes: HashMap<String, ProviderRoute>,
    breaker_settings: BreakerSettings,
}

impl ProviderRegistry {
    pub fn new(breaker_settings: BreakerSettings) -> Self {
        Self {
            routes: HashMap::new(),
            breaker_settings,
        }
    }

    /// Build the simulated providers declared in the configuration.
    pub fn from_config(config: &GatewayConfig) -> Self {
        let mut registry = Self::new(BreakerSettings::from(&config.circuit_breaker));
        for p in config.providers.iter() {
            registry.register(&p.key, Arc::new(SimulatedProvider::from_config(p)));
            tracing::info!(key = %p.key, provider = %p.name, failure_rate = p.failure_rate, "Provider registered");
        }
        registry
    }

    /// Register a provider whose non-SUCCESS responses all count as failures.
    pub fn register(&mut self, key: &str, provider: Arc<dyn PaymentProvider>) -> &mut Self {
        self.register_with_classifier(key, provider, default_classifier())
    }

    /// Register a provider with its own response classifier.
    /// Re-registering a key replaces the route and its breaker.
    pub fn register_with_classifier(
        &mut self,
        key: &str,
        provider: Arc<dyn PaymentProvider>,
        classifier: OutcomeClassifier,
    ) -> &mut Self {
        let breaker = Arc::new(CircuitBreaker::new(key, self.breaker_settings.clone()));
        self.routes.insert(
            key.to_string(),
            ProviderRoute {
                key: key.to_string(),
                provider,
                breaker,
                classifier,
            },
        );
        self
    }

    pub fn resolve(&self, key: &str) -> Option<&ProviderRoute> {
        self.routes.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.routes.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Breaker snapshots for every provider, ordered by key.
    pub fn snapshots(&self) -> Vec<BreakerSnapshot> {
        let mut snapshots: Vec<_> = self.routes.values().map(|r| r.breaker.snapshot()).collect();
        snapshots.sort_by(|a, b| a.provider.cmp(&b.provider));
        snapshots
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resilience::{Admission, CallOutcome, CircuitState};

    #[tokio::test]
    async fn test_from_default_config() {
        let registry = ProviderRegistry::from_config(&GatewayConfig::default());
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.resolve("MTN").unwrap().provider.name(), "MTN_MOMO");
        assert_eq!(registry.resolve("AIRTEL").unwrap().provider.name(), "AIRTEL_MONEY");
        assert!(registry.resolve("VODAFONE").is_none());
    }

    #[tokio::test]
    async fn test_breakers_are_independent() {
        let registry = ProviderRegistry::from_config(&GatewayConfig::default());
        let mtn = &registry.resolve("MTN").unwrap().breaker;
        for _ in 0..3 {
            match mtn.admit() {
                Admission::Granted(p) => p.record(CallOutcome::Failure),
                Admission::Rejected { .. } => panic!("closed breaker rejected"),
            }
        }

        assert_eq!(mtn.state(), CircuitState::Open);
        assert_eq!(registry.resolve("AIRTEL").unwrap().breaker.state(), CircuitState::Closed);

        let snapshots = registry.snapshots();
        assert_eq!(snapshots[0].provider, "AIRTEL");
        assert_eq!(snapshots[1].state, CircuitState::Open);
    }

    #[tokio::test(start_paused = true)]
    async fn test_debug_does_not_advance_breaker() {
        let registry = ProviderRegistry::from_config(&GatewayConfig::default());
        let route = registry.resolve("MTN").unwrap();
        for _ in 0..3 {
            if let Admission::Granted(p) = route.breaker.admit() {
                p.record(CallOutcome::Failure);
            }
        }
        tokio::time::advance(std::time::Duration::from_secs(31)).await;

        let rendered = format!("{:?}", route);
        assert!(rendered.contains("MTN_MOMO"));

        // The half-open transition happens on this read, not on the format above.
        tokio::time::advance(std::time::Duration::from_secs(5)).await;
        let snapshot = route.breaker.snapshot();
        assert_eq!(snapshot.state, CircuitState::HalfOpen);
        assert_eq!(snapshot.since_transition_ms, 0);
    }
}
