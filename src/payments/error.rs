//! Gateway outcome classification.

use std::time::Duration;

use axum::http::StatusCode;
use thiserror::Error;

use crate::payments::types::PaymentResponse;
use crate::store::StoreError;

/// Every way a payment attempt can end without a successful response.
///
/// Duplicates and open circuits are expected, frequent outcomes rather than
/// faults; they are variants here so callers handle them explicitly.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Malformed request, rejected before touching shared state.
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("provider {0} not found")]
    ProviderNotFound(String),

    /// Another attempt with this id holds the lease.
    #[error("a transaction with id {0} is currently being processed, please wait")]
    DuplicateInProgress(String),

    #[error("transaction {0} has already been successfully completed")]
    DuplicateCompleted(String),

    #[error(
        "provider {provider} is currently experiencing high failure rates and has been temporarily taken offline"
    )]
    CircuitOpen {
        provider: String,
        retry_after: Option<Duration>,
    },

    /// Deadline exceeded or the caller cancelled the call.
    #[error("processing error: {}", .response.message)]
    Timeout { response: PaymentResponse },

    /// The call completed but the provider reported failure.
    #[error("processing error: {}", .response.message)]
    ProviderFailure { response: PaymentResponse },

    #[error("idempotency store unavailable: {0}")]
    StoreUnavailable(#[source] StoreError),
}

impl GatewayError {
    /// Stable machine-readable kind.
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::Validation(_) => "VALIDATION_ERROR",
            GatewayError::ProviderNotFound(_) => "PROVIDER_NOT_FOUND",
            GatewayError::DuplicateInProgress(_) => "DUPLICATE_IN_PROGRESS",
            GatewayError::DuplicateCompleted(_) => "DUPLICATE_COMPLETED",
            GatewayError::CircuitOpen { .. } => "CIRCUIT_OPEN",
            GatewayError::Timeout { .. } => "TIMEOUT",
            GatewayError::ProviderFailure { .. } => "PROVIDER_FAILURE",
            GatewayError::StoreUnavailable(_) => "STORE_UNAVAILABLE",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::Validation(_) => StatusCode::BAD_REQUEST,
            GatewayError::ProviderNotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::DuplicateInProgress(_) => StatusCode::TOO_EARLY,
            GatewayError::DuplicateCompleted(_) => StatusCode::CONFLICT,
            GatewayError::CircuitOpen { .. } => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::Timeout { .. } | GatewayError::ProviderFailure { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            GatewayError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// The attempt's response, for outcomes that reached a provider.
    pub fn response(&self) -> Option<&PaymentResponse> {
        match self {
            GatewayError::Timeout { response } | GatewayError::ProviderFailure { response } => Some(response),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(GatewayError::Validation("x".into()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(GatewayError::ProviderNotFound("X".into()).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(GatewayError::DuplicateInProgress("T".into()).status_code().as_u16(), 425);
        assert_eq!(GatewayError::DuplicateCompleted("T".into()).status_code(), StatusCode::CONFLICT);
        let open = GatewayError::CircuitOpen {
            provider: "MTN_MOMO".into(),
            retry_after: None,
        };
        assert_eq!(open.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(open.to_string().contains("MTN_MOMO"));
    }

    #[test]
    fn test_failure_carries_cause_text() {
        let err = GatewayError::ProviderFailure {
            response: PaymentResponse::failed("MTN_MOMO", "upstream 500"),
        };
        assert_eq!(err.to_string(), "processing error: upstream 500");
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.kind(), "PROVIDER_FAILURE");
    }
}
