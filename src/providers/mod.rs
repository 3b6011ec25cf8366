//! Payment provider integrations.
//!
//! # Data Flow
//! ```text
//! request.provider (key)
//!     → registry.rs (key → provider + breaker + classifier)
//!     → PaymentProvider::process (bounded by the invocation deadline)
//! ```
//!
//! # Design Decisions
//! - Every provider implements one trait; adding one is a registration
//! - Each registered provider owns its circuit breaker
//! - The registry is immutable after start-up, so lookups take no lock

pub mod registry;
pub mod simulated;

use async_trait::async_trait;
use thiserror::Error;
use tokio::time::Instant;

use crate::payments::types::{PaymentRequest, PaymentResponse};

pub use registry::{ProviderRegistry, ProviderRoute};
pub use simulated::SimulatedProvider;

/// Errors raised by a provider call that produced no usable response.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The upstream could not be reached.
    #[error("provider unreachable: {0}")]
    Unreachable(String),

    /// The upstream answered with something that is not a payment result.
    #[error("invalid provider response: {0}")]
    InvalidResponse(String),

    /// The provider gave up because the deadline passed.
    #[error("provider deadline exceeded")]
    DeadlineExceeded,
}

/// An external payment integration.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Name reported in responses (e.g. "MTN_MOMO").
    fn name(&self) -> &str;

    /// Process one payment, finishing before `deadline` where possible.
    ///
    /// `Ok` with a FAILED status is a provider-reported failure; `Err` means
    /// no response was obtained at all.
    async fn process(
        &self,
        request: &PaymentRequest,
        deadline: Instant,
    ) -> Result<PaymentResponse, ProviderError>;
}
