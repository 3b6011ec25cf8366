//! Expiring key-value store.
//!
//! # Responsibilities
//! - Map string keys to string values with a per-key time-to-live
//! - Provide an atomic set-if-absent primitive (the only cross-instance lock)
//!
//! # Design Decisions
//! - Store is a trait so a shared backend can replace the in-memory one
//! - Expired keys behave exactly like absent keys
//! - Errors mean "unreachable"; absence is `Ok(None)`, never an error

pub mod memory;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

pub use memory::MemoryStore;

/// Errors surfaced by a store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend could not be reached or refused the operation.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The operation did not finish within the store deadline.
    #[error("store call timed out after {0:?}")]
    Timeout(Duration),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Atomic string map with per-key expiry.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Write `value` only if `key` is absent (or expired).
    /// Returns `true` when this call created the entry.
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<bool>;

    /// Read the live value for `key`.
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Unconditionally write `value`, replacing any previous value and TTL.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()>;
}
