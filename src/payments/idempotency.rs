//! Idempotency gate over the expiring store.
//!
//! # Responsibilities
//! - Classify a transaction id as new, in progress, or completed
//! - Take a short lease (IN_PROGRESS) for new transactions
//! - Record completion (COMPLETED) with the long dedup TTL
//!
//! # Design Decisions
//! - set-if-absent is the only concurrency guard; no in-process lock
//! - Admission and completion stay two separate store calls because
//!   completion depends on the provider call in between
//! - A failed or timed-out payment is never completed; its lease expires
//!   and the id can be retried
//! - Every store call runs under the store deadline

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time;

use crate::config::IdempotencyConfig;
use crate::observability::metrics;
use crate::store::{KeyValueStore, StoreError, StoreResult};

/// Value of a transaction record in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionState {
    InProgress,
    Completed,
}

impl TransactionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionState::InProgress => "IN_PROGRESS",
            TransactionState::Completed => "COMPLETED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "IN_PROGRESS" => Some(TransactionState::InProgress),
            "COMPLETED" => Some(TransactionState::Completed),
            _ => None,
        }
    }
}

/// Result of presenting a transaction id to the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmitDecision {
    /// This caller now holds the lease.
    New,
    DuplicateInProgress,
    DuplicateCompleted,
}

impl AdmitDecision {
    fn label(&self) -> &'static str {
        match self {
            AdmitDecision::New => "new",
            AdmitDecision::DuplicateInProgress => "duplicate_in_progress",
            AdmitDecision::DuplicateCompleted => "duplicate_completed",
        }
    }
}

#[derive(Clone)]
pub struct IdempotencyGate {
    store: Arc<dyn KeyValueStore>,
    key_prefix: String,
    lease_ttl: Duration,
    completed_ttl: Duration,
    store_timeout: Duration,
}

impl std::fmt::Debug for IdempotencyGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdempotencyGate")
            .field("key_prefix", &self.key_prefix)
            .field("lease_ttl", &self.lease_ttl)
            .field("completed_ttl", &self.completed_ttl)
            .field("store_timeout", &self.store_timeout)
            .finish()
    }
}

impl IdempotencyGate {
    pub fn new(store: Arc<dyn KeyValueStore>, config: &IdempotencyConfig, store_timeout: Duration) -> Self {
        Self {
            store,
            key_prefix: config.key_prefix.clone(),
            lease_ttl: config.lease_ttl(),
            completed_ttl: config.completed_ttl(),
            store_timeout,
        }
    }

    fn key(&self, transaction_id: &str) -> String {
        format!("{}{}", self.key_prefix, transaction_id)
    }

    async fn bounded<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = StoreResult<T>>,
    ) -> StoreResult<T> {
        let result = match time::timeout(self.store_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout(self.store_timeout)),
        };
        if result.is_err() {
            metrics::record_store_error(operation);
        }
        result
    }

    /// Classify `transaction_id`, taking the lease when it is new.
    pub async fn admit(&self, transaction_id: &str) -> StoreResult<AdmitDecision> {
        let key = self.key(transaction_id);

        let current = self.bounded("get", self.store.get(&key)).await?;
        let decision = if current.as_deref() == Some(TransactionState::Completed.as_str()) {
            AdmitDecision::DuplicateCompleted
        } else {
            let acquired = self
                .bounded(
                    "set_if_absent",
                    self.store
                        .set_if_absent(&key, TransactionState::InProgress.as_str(), self.lease_ttl),
                )
                .await?;
            if acquired {
                AdmitDecision::New
            } else {
                AdmitDecision::DuplicateInProgress
            }
        };

        metrics::record_idempotency(decision.label());
        tracing::debug!(transaction_id = %transaction_id, decision = ?decision, "Idempotency admission");
        Ok(decision)
    }

    /// Mark `transaction_id` as completed for the dedup window.
    /// Call only after the provider reported success.
    pub async fn complete(&self, transaction_id: &str) -> StoreResult<()> {
        let key = self.key(transaction_id);
        self.bounded(
            "set",
            self.store
                .set(&key, TransactionState::Completed.as_str(), self.completed_ttl),
        )
        .await
    }

    /// Read the record for `transaction_id` without changing it.
    pub async fn lookup(&self, transaction_id: &str) -> StoreResult<Option<TransactionState>> {
        let key = self.key(transaction_id);
        let value = self.bounded("get", self.store.get(&key)).await?;
        Ok(value.and_then(|v| {
            let state = TransactionState::parse(&v);
            if state.is_none() {
                tracing::warn!(key = %key, value = %v, "Unrecognised transaction record");
            }
            state
        }))
    }
}
