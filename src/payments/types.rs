//! Payment request/response value types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Reference id reported when the provider did not assign one.
pub const NO_REFERENCE: &str = "N/A";

/// Maximum accepted length of a caller-chosen transaction id.
pub const MAX_TRANSACTION_ID_LEN: usize = 128;

/// An inbound payment attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRequest {
    /// Caller-chosen id, unique per logical payment attempt.
    pub transaction_id: String,
    /// Amount to charge.
    pub amount: Decimal,
    /// ISO-4217 currency code (e.g. "UGX").
    pub currency: String,
    /// Provider-selection key (e.g. "MTN").
    pub provider: String,
}

impl PaymentRequest {
    /// Check the request shape. Returns a human-readable reason on failure.
    pub fn validate(&self) -> Result<(), String> {
        let id = self.transaction_id.as_str();
        if id.is_empty() {
            return Err("transaction_id must not be empty".to_string());
        }
        if id.len() > MAX_TRANSACTION_ID_LEN {
            return Err(format!(
                "transaction_id must be at most {} characters",
                MAX_TRANSACTION_ID_LEN
            ));
        }
        if id.chars().any(char::is_whitespace) {
            return Err("transaction_id must not contain whitespace".to_string());
        }
        if self.amount <= Decimal::ZERO {
            return Err("amount must be greater than zero".to_string());
        }
        if self.currency.len() != 3 || !self.currency.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(format!(
                "currency '{}' must be a 3-letter uppercase code",
                self.currency
            ));
        }
        if self.provider.trim().is_empty() {
            return Err("provider must not be empty".to_string());
        }
        Ok(())
    }
}

/// Final status of a single attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Success,
    Failed,
    Timeout,
}

/// Result of a single attempt, built once per provider call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentResponse {
    pub status: PaymentStatus,
    /// Provider-assigned reference, `N/A` unless the payment succeeded.
    pub reference_id: String,
    pub provider_name: String,
    /// Set once the transaction has been recorded as completed and a repeat
    /// submission will be answered as a duplicate.
    pub is_idempotent: bool,
    pub message: String,
}

impl PaymentResponse {
    /// A successful response carrying the provider's reference.
    pub fn success(provider_name: &str, reference_id: String, message: impl Into<String>) -> Self {
        Self {
            status: PaymentStatus::Success,
            reference_id,
            provider_name: provider_name.to_string(),
            is_idempotent: false,
            message: message.into(),
        }
    }

    /// A provider-reported failure.
    pub fn failed(provider_name: &str, message: impl Into<String>) -> Self {
        Self {
            status: PaymentStatus::Failed,
            reference_id: NO_REFERENCE.to_string(),
            provider_name: provider_name.to_string(),
            is_idempotent: false,
            message: message.into(),
        }
    }

    /// No answer arrived before the deadline, or the caller gave up.
    pub fn timed_out(provider_name: &str, message: impl Into<String>) -> Self {
        Self {
            status: PaymentStatus::Timeout,
            reference_id: NO_REFERENCE.to_string(),
            provider_name: provider_name.to_string(),
            is_idempotent: false,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == PaymentStatus::Success
    }
}
