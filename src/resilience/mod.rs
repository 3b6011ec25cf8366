//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Payment to provider:
//!     → circuit_breaker.rs (admission: may the call proceed?)
//!     → invocation.rs (bounded call, outcome normalization)
//!     → circuit_breaker.rs (outcome recording, state transitions)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - No retries: a payment is attempted once per request
//! - Circuit breaker prevents cascading failures

pub mod circuit_breaker;
pub mod invocation;

pub use circuit_breaker::{
    Admission, BreakerSettings, BreakerSnapshot, CallOutcome, CallPermit, CircuitBreaker,
    CircuitState, Counts,
};
pub use invocation::{default_classifier, invoke, Invocation, OutcomeClassifier};
