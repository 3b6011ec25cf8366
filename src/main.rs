//! Payment Gateway Aggregator
//!
//! Routes payments to unreliable mobile-money providers behind an
//! idempotency gate and per-provider circuit breakers.
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌──────────────────────────────────────────────────────────┐
//!                     │                     PAYMENT GATEWAY                      │
//!                     │                                                          │
//!   POST /v1/pay      │  ┌─────────┐    ┌───────────┐    ┌──────────────────┐    │
//!   ──────────────────┼─▶│  http   │───▶│ payments  │───▶│   idempotency    │◀───┼──▶ Expiring
//!                     │  │ server  │    │ processor │    │      gate        │    │    Key Store
//!                     │  └─────────┘    └─────┬─────┘    └──────────────────┘    │
//!                     │                       │                                  │
//!                     │                       ▼                                  │
//!                     │               ┌───────────────┐    ┌─────────────────┐   │
//!                     │               │  resilience   │───▶│    providers    │───┼──▶ MTN / Airtel
//!                     │               │ breaker +     │    │    registry     │   │
//!                     │               │ bounded call  │    └─────────────────┘   │
//!                     │               └───────────────┘                          │
//!                     │                                                          │
//!                     │  ┌────────────────────────────────────────────────────┐  │
//!                     │  │              Cross-Cutting Concerns                │  │
//!                     │  │   config · observability · lifecycle · admin       │  │
//!                     │  └────────────────────────────────────────────────────┘  │
//!                     └──────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;

use payment_gateway_aggregator::config::{load_config, GatewayConfig};
use payment_gateway_aggregator::lifecycle::{wait_for_signal, Shutdown};
use payment_gateway_aggregator::observability::{init_logging, init_metrics};
use payment_gateway_aggregator::providers::ProviderRegistry;
use payment_gateway_aggregator::store::MemoryStore;
use payment_gateway_aggregator::{HttpServer, PaymentProcessor};

#[derive(Parser)]
#[command(name = "payment-gateway-aggregator", version)]
struct Args {
    /// Path to a TOML configuration file; built-in defaults otherwise.
    #[arg(short, long, env = "GATEWAY_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };

    init_logging(&config.observability)?;
    tracing::info!("payment-gateway-aggregator v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        provider_call_ms = config.timeouts.provider_call_ms,
        lease_ttl_secs = config.idempotency.lease_ttl_secs,
        providers = config.providers.0.len(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        let addr = config.observability.metrics_address.parse()?;
        init_metrics(addr)?;
    }

    let shutdown = Shutdown::new();

    let store = MemoryStore::new();
    tokio::spawn(store.clone().run_sweeper(
        Duration::from_secs(config.idempotency.sweep_interval_secs),
        shutdown.subscribe(),
    ));

    let registry = Arc::new(ProviderRegistry::from_config(&config));
    let processor = Arc::new(PaymentProcessor::new(registry, Arc::new(store), &config));

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    tokio::spawn(wait_for_signal(shutdown.clone()));

    let server = HttpServer::new(config, processor);
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
