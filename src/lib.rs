//! Payment Gateway Aggregator Library

pub mod admin;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod payments;
pub mod providers;
pub mod resilience;
pub mod store;

pub use config::schema::GatewayConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use payments::{GatewayError, PaymentProcessor, PaymentRequest, PaymentResponse};
