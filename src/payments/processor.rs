//! Request orchestration.
//!
//! Composes validation, routing, idempotency, the provider breaker and the
//! bounded call in one fixed order. Each step may short-circuit; later steps
//! never run before earlier ones.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::config::GatewayConfig;
use crate::observability::metrics;
use crate::payments::error::GatewayError;
use crate::payments::idempotency::{AdmitDecision, IdempotencyGate, TransactionState};
use crate::payments::types::{PaymentRequest, PaymentResponse};
use crate::providers::ProviderRegistry;
use crate::resilience::{invoke, Admission, Invocation};
use crate::store::{KeyValueStore, StoreResult};

/// Outcome of one call to [`PaymentProcessor::handle`].
pub type PaymentResult = Result<PaymentResponse, GatewayError>;

pub struct PaymentProcessor {
    providers: Arc<ProviderRegistry>,
    gate: IdempotencyGate,
    call_timeout: Duration,
}

impl PaymentProcessor {
    pub fn new(
        providers: Arc<ProviderRegistry>,
        store: Arc<dyn KeyValueStore>,
        config: &GatewayConfig,
    ) -> Self {
        Self {
            providers,
            gate: IdempotencyGate::new(store, &config.idempotency, config.timeouts.store_call()),
            call_timeout: config.timeouts.provider_call(),
        }
    }

    pub fn providers(&self) -> &Arc<ProviderRegistry> {
        &self.providers
    }

    /// Idempotency record for `transaction_id`, if one is live.
    pub async fn transaction_state(&self, transaction_id: &str) -> StoreResult<Option<TransactionState>> {
        self.gate.lookup(transaction_id).await
    }

    /// Process one payment attempt.
    pub async fn handle(&self, request: PaymentRequest) -> PaymentResult {
        self.handle_with_cancel(request, std::future::pending()).await
    }

    /// Process one payment attempt, abandoning the provider call when
    /// `cancelled` resolves. An abandoned call is reported as a timeout but
    /// is not counted against the provider.
    pub async fn handle_with_cancel<C>(&self, request: PaymentRequest, cancelled: C) -> PaymentResult
    where
        C: Future<Output = ()>,
    {
        let result = self.process(&request, cancelled).await;
        let outcome = match &result {
            Ok(_) => "success",
            Err(e) => e.kind(),
        };
        metrics::record_request(&request.provider, outcome);
        result
    }

    async fn process<C>(&self, request: &PaymentRequest, cancelled: C) -> PaymentResult
    where
        C: Future<Output = ()>,
    {
        request.validate().map_err(GatewayError::Validation)?;

        let route = self
            .providers
            .resolve(&request.provider)
            .ok_or_else(|| GatewayError::ProviderNotFound(request.provider.clone()))?;
        let provider_name = route.provider.name();
        let txn = request.transaction_id.as_str();

        match self.gate.admit(txn).await.map_err(GatewayError::StoreUnavailable)? {
            AdmitDecision::New => {}
            AdmitDecision::DuplicateInProgress => {
                return Err(GatewayError::DuplicateInProgress(txn.to_string()))
            }
            AdmitDecision::DuplicateCompleted => {
                return Err(GatewayError::DuplicateCompleted(txn.to_string()))
            }
        }

        // Rejection leaves the lease in place.
        let permit = match route.breaker.admit() {
            Admission::Granted(permit) => permit,
            Admission::Rejected { state, retry_after } => {
                info!(
                    transaction_id = %txn,
                    provider = %provider_name,
                    state = %state,
                    "Call rejected by circuit breaker"
                );
                return Err(GatewayError::CircuitOpen {
                    provider: provider_name.to_string(),
                    retry_after,
                });
            }
        };

        let invocation = invoke(
            route.provider.as_ref(),
            request,
            self.call_timeout,
            &route.classifier,
            cancelled,
        )
        .await;

        match invocation.breaker_outcome() {
            Some(outcome) => permit.record(outcome),
            None => permit.release(),
        }

        match invocation {
            Invocation::Completed { mut response, .. } if response.is_success() => {
                match self.gate.complete(txn).await {
                    Ok(()) => info!(
                        transaction_id = %txn,
                        provider = %provider_name,
                        reference_id = %response.reference_id,
                        "Payment completed"
                    ),
                    Err(e) => warn!(
                        transaction_id = %txn,
                        provider = %provider_name,
                        error = %e,
                        "Payment succeeded but completion could not be recorded"
                    ),
                }
                response.is_idempotent = true;
                Ok(response)
            }
            Invocation::Completed { response, .. } => {
                warn!(
                    transaction_id = %txn,
                    provider = %provider_name,
                    reason = %response.message,
                    "Provider reported failure"
                );
                Err(GatewayError::ProviderFailure { response })
            }
            Invocation::Failed(e) => {
                warn!(transaction_id = %txn, provider = %provider_name, error = %e, "Provider call failed");
                Err(GatewayError::ProviderFailure {
                    response: PaymentResponse::failed(provider_name, e.to_string()),
                })
            }
            Invocation::TimedOut(after) => {
                warn!(transaction_id = %txn, provider = %provider_name, timeout = ?after, "Provider call timed out");
                Err(GatewayError::Timeout {
                    response: PaymentResponse::timed_out(
                        provider_name,
                        format!("{} did not respond within {}ms", provider_name, after.as_millis()),
                    ),
                })
            }
            Invocation::Cancelled => {
                info!(transaction_id = %txn, provider = %provider_name, "Caller cancelled provider call");
                Err(GatewayError::Timeout {
                    response: PaymentResponse::timed_out(provider_name, "request cancelled by caller"),
                })
            }
        }
    }
}
