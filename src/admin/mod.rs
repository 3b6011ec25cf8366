//! Administrative API.
//!
//! # Responsibilities
//! - Report gateway status and per-provider breaker snapshots
//! - Force a provider's breaker back to CLOSED
//!
//! # Design Decisions
//! - Mounted only when `admin.enabled`
//! - Every route sits behind bearer-token authentication

pub mod auth;
pub mod handlers;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::http::server::AppState;

pub fn setup_admin_router(state: AppState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/breakers", get(get_breakers))
        .route("/admin/breakers/{provider}/reset", post(reset_breaker))
        .route_layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .with_state(state)
}
