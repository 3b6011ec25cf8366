//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal_macros::dec;
use tokio::net::TcpListener;
use tokio::time::{self, Instant};

use payment_gateway_aggregator::config::GatewayConfig;
use payment_gateway_aggregator::lifecycle::Shutdown;
use payment_gateway_aggregator::payments::{PaymentProcessor, PaymentRequest, PaymentResponse};
use payment_gateway_aggregator::providers::{PaymentProvider, ProviderError, ProviderRegistry};
use payment_gateway_aggregator::resilience::BreakerSettings;
use payment_gateway_aggregator::store::{KeyValueStore, MemoryStore, StoreError, StoreResult};
use payment_gateway_aggregator::HttpServer;

/// What a [`ScriptedProvider`] does on its next call.
#[derive(Debug, Clone, Copy)]
pub enum Behaviour {
    Succeed,
    /// Answer with a FAILED response.
    Fail,
    /// Raise an error with no response.
    Error,
    /// Succeed after sleeping.
    Sleep(Duration),
}

/// Provider whose behaviour the test controls and whose calls it counts.
pub struct ScriptedProvider {
    name: String,
    behaviour: Mutex<Behaviour>,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new(name: &str, behaviour: Behaviour) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            behaviour: Mutex::new(behaviour),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn set(&self, behaviour: Behaviour) {
        *self.behaviour.lock().unwrap() = behaviour;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentProvider for ScriptedProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn process(
        &self,
        request: &PaymentRequest,
        _deadline: Instant,
    ) -> Result<PaymentResponse, ProviderError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let behaviour = *self.behaviour.lock().unwrap();
        match behaviour {
            Behaviour::Succeed => {}
            Behaviour::Fail => {
                return Ok(PaymentResponse::failed(
                    &self.name,
                    format!("{} internal server error", self.name),
                ))
            }
            Behaviour::Error => return Err(ProviderError::Unreachable("connection reset".into())),
            Behaviour::Sleep(d) => time::sleep(d).await,
        }
        Ok(PaymentResponse::success(
            &self.name,
            format!("REF-{}-{}", request.transaction_id, n),
            "Transaction processed successfully.",
        ))
    }
}

/// Store that is never reachable.
pub struct UnavailableStore;

#[async_trait]
impl KeyValueStore for UnavailableStore {
    async fn set_if_absent(&self, _key: &str, _value: &str, _ttl: Duration) -> StoreResult<bool> {
        Err(StoreError::Unavailable("connection refused".into()))
    }

    async fn get(&self, _key: &str) -> StoreResult<Option<String>> {
        Err(StoreError::Unavailable("connection refused".into()))
    }

    async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> StoreResult<()> {
        Err(StoreError::Unavailable("connection refused".into()))
    }
}

/// Memory store whose unconditional writes fail, so completion is lost.
#[derive(Default)]
pub struct ReadOnlyStore {
    inner: MemoryStore,
}

#[async_trait]
impl KeyValueStore for ReadOnlyStore {
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<bool> {
        self.inner.set_if_absent(key, value, ttl).await
    }

    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        self.inner.get(key).await
    }

    async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> StoreResult<()> {
        Err(StoreError::Unavailable("replica is read-only".into()))
    }
}

/// Store whose calls never finish. With `writes_only`, reads and
/// set-if-absent go to an in-memory store and only `set` hangs.
#[derive(Default)]
pub struct HangingStore {
    inner: MemoryStore,
    writes_only: bool,
}

impl HangingStore {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn writes_only() -> Self {
        Self {
            inner: MemoryStore::new(),
            writes_only: true,
        }
    }
}

#[async_trait]
impl KeyValueStore for HangingStore {
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<bool> {
        if !self.writes_only {
            std::future::pending::<()>().await;
        }
        self.inner.set_if_absent(key, value, ttl).await
    }

    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        if !self.writes_only {
            std::future::pending::<()>().await;
        }
        self.inner.get(key).await
    }

    async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> StoreResult<()> {
        std::future::pending().await
    }
}

/// Processor with `provider` registered under the key `MTN`.
pub fn processor_with(provider: Arc<ScriptedProvider>, store: Arc<dyn KeyValueStore>) -> PaymentProcessor {
    let config = GatewayConfig::default();
    let mut registry = ProviderRegistry::new(BreakerSettings::from(&config.circuit_breaker));
    registry.register("MTN", provider);
    PaymentProcessor::new(Arc::new(registry), store, &config)
}

pub fn request(transaction_id: &str) -> PaymentRequest {
    PaymentRequest {
        transaction_id: transaction_id.to_string(),
        amount: dec!(20),
        currency: "UGX".to_string(),
        provider: "MTN".to_string(),
    }
}

/// Serve `processor` on an ephemeral port. Returns the base URL.
pub async fn spawn_server(config: GatewayConfig, processor: PaymentProcessor) -> (String, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();

    let server = HttpServer::new(config, Arc::new(processor));
    let rx = shutdown.subscribe();
    tokio::spawn(async move {
        server.run(listener, rx).await.unwrap();
    });

    (format!("http://{}", addr), shutdown)
}
