//! Outcome to HTTP response mapping.
//!
//! # Responsibilities
//! - Map each gateway outcome to its status code
//! - Render errors as `{"error", "message", "response"?}` JSON
//!
//! # Design Decisions
//! - Provider failures and timeouts carry the attempt's response payload
//! - Open circuits advertise `Retry-After` when the cool-down is known

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::payments::{GatewayError, PaymentResponse};

/// JSON body for every non-success response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<PaymentResponse>,
}

impl ErrorBody {
    pub fn new(error: &'static str, message: impl Into<String>) -> Self {
        Self {
            error,
            message: message.into(),
            response: None,
        }
    }
}

/// Shorthand for an error response with no payment payload.
pub fn error_response(status: StatusCode, error: &'static str, message: impl Into<String>) -> Response {
    (status, Json(ErrorBody::new(error, message))).into_response()
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let retry_after = match &self {
            GatewayError::CircuitOpen {
                retry_after: Some(after),
                ..
            } => Some(after.as_secs_f64().ceil().max(1.0) as u64),
            _ => None,
        };

        let body = ErrorBody {
            error: self.kind(),
            message: self.to_string(),
            response: self.response().cloned(),
        };

        let mut response = (status, Json(body)).into_response();
        if let Some(secs) = retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_circuit_open_sets_retry_after() {
        let response = GatewayError::CircuitOpen {
            provider: "MTN_MOMO".into(),
            retry_after: Some(Duration::from_millis(12_300)),
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.headers()[header::RETRY_AFTER], "13");
    }

    #[test]
    fn test_duplicate_has_no_retry_after() {
        let response = GatewayError::DuplicateInProgress("TXN-1".into()).into_response();
        assert_eq!(response.status().as_u16(), 425);
        assert!(response.headers().get(header::RETRY_AFTER).is_none());
    }
}
