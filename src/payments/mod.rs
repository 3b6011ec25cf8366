//! Payment handling subsystem.
//!
//! # Data Flow
//! ```text
//! PaymentRequest
//!     → processor.rs (validate, route)
//!     → idempotency.rs (lease)
//!     → resilience (breaker + bounded provider call)
//!     → idempotency.rs (completion on success)
//!     → PaymentResponse | GatewayError
//! ```

pub mod error;
pub mod idempotency;
pub mod processor;
pub mod types;

pub use error::GatewayError;
pub use idempotency::{AdmitDecision, IdempotencyGate, TransactionState};
pub use processor::{PaymentProcessor, PaymentResult};
pub use types::{PaymentRequest, PaymentResponse, PaymentStatus};
