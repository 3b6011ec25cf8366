//! Public API handlers.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::http::response::error_response;
use crate::http::server::AppState;
use crate::payments::{GatewayError, PaymentRequest, TransactionState};
use crate::resilience::CircuitState;

/// `POST /v1/pay`
pub async fn pay(
    State(state): State<AppState>,
    payload: Result<Json<PaymentRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            tracing::debug!(error = %rejection, "Rejected request body");
            return error_response(StatusCode::BAD_REQUEST, "INVALID_REQUEST_BODY", "Invalid Request Body");
        }
    };

    match state.processor.handle(request).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => e.into_response(),
    }
}

#[derive(Debug, Serialize)]
pub struct TransactionStatus {
    pub transaction_id: String,
    pub state: TransactionState,
}

/// `GET /v1/transactions/{id}`
pub async fn transaction_status(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.processor.transaction_state(&id).await {
        Ok(Some(txn_state)) => Json(TransactionStatus {
            transaction_id: id,
            state: txn_state,
        })
        .into_response(),
        Ok(None) => error_response(
            StatusCode::NOT_FOUND,
            "TRANSACTION_NOT_FOUND",
            format!("no live record for transaction {}", id),
        ),
        Err(e) => GatewayError::StoreUnavailable(e).into_response(),
    }
}

#[derive(Debug, Serialize)]
pub struct ProviderHealth {
    pub key: String,
    pub state: CircuitState,
}

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub providers: Vec<ProviderHealth>,
}

/// `GET /health`: liveness plus breaker state per provider.
pub async fn health(State(state): State<AppState>) -> Json<HealthStatus> {
    let providers = state
        .processor
        .providers()
        .snapshots()
        .into_iter()
        .map(|s| ProviderHealth {
            key: s.provider,
            state: s.state,
        })
        .collect();

    Json(HealthStatus {
        status: "ok",
        providers,
    })
}
