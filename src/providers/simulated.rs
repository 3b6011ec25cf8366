//! Simulated mobile-money provider.
//!
//! Stands in for a real upstream: random latency, a configurable chance of
//! an upstream 500, and provider-assigned references on success.

use std::ops::RangeInclusive;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{self, Instant};
use uuid::Uuid;

use crate::config::ProviderConfig;
use crate::payments::types::{PaymentRequest, PaymentResponse};
use crate::providers::{PaymentProvider, ProviderError};

#[derive(Debug, Clone)]
pub struct SimulatedProvider {
    name: String,
    reference_prefix: String,
    latency_ms: RangeInclusive<u64>,
    failure_rate: f64,
}

impl SimulatedProvider {
    pub fn new(
        name: impl Into<String>,
        reference_prefix: impl Into<String>,
        latency_ms: RangeInclusive<u64>,
        failure_rate: f64,
    ) -> Self {
        Self {
            name: name.into(),
            reference_prefix: reference_prefix.into(),
            latency_ms,
            failure_rate: failure_rate.clamp(0.0, 1.0),
        }
    }

    pub fn from_config(config: &ProviderConfig) -> Self {
        Self::new(
            &config.name,
            &config.reference_prefix,
            config.min_latency_ms..=config.max_latency_ms,
            config.failure_rate,
        )
    }
}

#[async_trait]
impl PaymentProvider for SimulatedProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn process(
        &self,
        request: &PaymentRequest,
        deadline: Instant,
    ) -> Result<PaymentResponse, ProviderError> {
        let delay = Duration::from_millis(fastrand::u64(self.latency_ms.clone()));
        let ready_at = Instant::now().checked_add(delay);

        let Some(ready_at) = ready_at.filter(|at| *at <= deadline) else {
            time::sleep_until(deadline).await;
            return Err(ProviderError::DeadlineExceeded);
        };
        time::sleep_until(ready_at).await;

        if fastrand::f64() < self.failure_rate {
            tracing::debug!(
                provider = %self.name,
                transaction_id = %request.transaction_id,
                "Simulated upstream error"
            );
            return Ok(PaymentResponse::failed(
                &self.name,
                format!("{} internal server error (simulated 500)", self.name),
            ));
        }

        Ok(PaymentResponse::success(
            &self.name,
            format!("{}-{}", self.reference_prefix, Uuid::new_v4().simple()),
            format!("Transaction processed successfully via {}.", self.name),
        ))
    }
}
