//! End-to-end orchestration tests against scripted providers.
//!
//! All tests run on paused time so leases and cool-downs elapse instantly.

use std::sync::Arc;
use std::time::Duration;

use tokio::time;

use payment_gateway_aggregator::payments::{GatewayError, PaymentStatus, TransactionState};
use payment_gateway_aggregator::resilience::CircuitState;
use payment_gateway_aggregator::store::{MemoryStore, StoreError};

mod common;
use common::{
    processor_with, request, Behaviour, HangingStore, ReadOnlyStore, ScriptedProvider, UnavailableStore,
};

#[tokio::test(start_paused = true)]
async fn test_slow_provider_times_out_and_holds_lease() {
    let provider = ScriptedProvider::new("MTN_MOMO", Behaviour::Sleep(Duration::from_secs(5)));
    let processor = processor_with(provider.clone(), Arc::new(MemoryStore::new()));

    let err = processor.handle(request("TXN-1")).await.unwrap_err();
    match &err {
        GatewayError::Timeout { response } => {
            assert_eq!(response.status, PaymentStatus::Timeout);
            assert_eq!(response.reference_id, "N/A");
        }
        other => panic!("expected timeout, got {:?}", other),
    }

    let breaker = &processor.providers().resolve("MTN").unwrap().breaker;
    let counts = breaker.snapshot().counts;
    assert_eq!(counts.requests, 1);
    assert_eq!(counts.failures, 1);

    let err = processor.handle(request("TXN-1")).await.unwrap_err();
    assert!(matches!(err, GatewayError::DuplicateInProgress(ref id) if id == "TXN-1"));
    assert_eq!(provider.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_failed_attempt_retryable_after_lease_expiry() {
    let provider = ScriptedProvider::new("MTN_MOMO", Behaviour::Fail);
    let processor = processor_with(provider.clone(), Arc::new(MemoryStore::new()));

    assert!(matches!(
        processor.handle(request("TXN-1")).await,
        Err(GatewayError::ProviderFailure { .. })
    ));

    time::advance(Duration::from_secs(11)).await;
    provider.set(Behaviour::Succeed);

    let res = processor.handle(request("TXN-1")).await.unwrap();
    assert_eq!(res.status, PaymentStatus::Success);
    assert_eq!(provider.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_completed_replay_never_reaches_provider() {
    let provider = ScriptedProvider::new("MTN_MOMO", Behaviour::Succeed);
    let processor = processor_with(provider.clone(), Arc::new(MemoryStore::new()));

    let res = processor.handle(request("TXN-1")).await.unwrap();
    assert!(res.is_idempotent);
    assert_eq!(res.reference_id, "REF-TXN-1-1");

    let err = processor.handle(request("TXN-1")).await.unwrap_err();
    assert!(matches!(err, GatewayError::DuplicateCompleted(_)));
    assert_eq!(provider.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_duplicates_reach_provider_once() {
    let provider = ScriptedProvider::new("MTN_MOMO", Behaviour::Sleep(Duration::from_millis(300)));
    let processor = processor_with(provider.clone(), Arc::new(MemoryStore::new()));

    let (a, b, c) = tokio::join!(
        processor.handle(request("TXN-1")),
        processor.handle(request("TXN-1")),
        processor.handle(request("TXN-1")),
    );

    let results = [a, b, c];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert_eq!(
        results
            .iter()
            .filter(|r| matches!(r, Err(GatewayError::DuplicateInProgress(_))))
            .count(),
        2
    );
    assert_eq!(provider.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_open_circuit_short_circuits_and_preserves_lease() {
    let provider = ScriptedProvider::new("MTN_MOMO", Behaviour::Fail);
    let processor = processor_with(provider.clone(), Arc::new(MemoryStore::new()));

    for id in ["T1", "T2", "T3"] {
        assert!(processor.handle(request(id)).await.is_err());
    }
    let breaker = processor.providers().resolve("MTN").unwrap().breaker.clone();
    assert_eq!(breaker.state(), CircuitState::Open);

    let err = processor.handle(request("T4")).await.unwrap_err();
    match &err {
        GatewayError::CircuitOpen { provider, retry_after } => {
            assert_eq!(provider, "MTN_MOMO");
            assert_eq!(*retry_after, Some(Duration::from_secs(30)));
        }
        other => panic!("expected open circuit, got {:?}", other),
    }
    assert!(err.to_string().contains("MTN_MOMO"));
    assert_eq!(provider.calls(), 3);
    assert_eq!(
        processor.transaction_state("T4").await.unwrap(),
        Some(TransactionState::InProgress)
    );

    // Still open one second before the cool-down ends.
    time::advance(Duration::from_secs(29)).await;
    assert!(matches!(
        processor.handle(request("T5")).await,
        Err(GatewayError::CircuitOpen { .. })
    ));
    assert_eq!(provider.calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_half_open_admits_single_trial() {
    let provider = ScriptedProvider::new("MTN_MOMO", Behaviour::Fail);
    let processor = processor_with(provider.clone(), Arc::new(MemoryStore::new()));

    for id in ["T1", "T2", "T3"] {
        assert!(processor.handle(request(id)).await.is_err());
    }
    time::advance(Duration::from_secs(30)).await;
    provider.set(Behaviour::Sleep(Duration::from_millis(500)));

    let (trial, concurrent) = tokio::join!(processor.handle(request("T4")), async {
        time::sleep(Duration::from_millis(10)).await;
        processor.handle(request("T5")).await
    });

    assert!(trial.is_ok());
    assert!(matches!(concurrent, Err(GatewayError::CircuitOpen { .. })));
    assert_eq!(provider.calls(), 4);

    let breaker = &processor.providers().resolve("MTN").unwrap().breaker;
    assert_eq!(breaker.state(), CircuitState::Closed);
    assert_eq!(breaker.snapshot().counts.requests, 0);
}

#[tokio::test(start_paused = true)]
async fn test_failed_trial_restarts_cool_down() {
    let provider = ScriptedProvider::new("MTN_MOMO", Behaviour::Error);
    let processor = processor_with(provider.clone(), Arc::new(MemoryStore::new()));

    for id in ["T1", "T2", "T3"] {
        assert!(processor.handle(request(id)).await.is_err());
    }
    time::advance(Duration::from_secs(30)).await;

    assert!(matches!(
        processor.handle(request("T4")).await,
        Err(GatewayError::ProviderFailure { .. })
    ));
    let breaker = processor.providers().resolve("MTN").unwrap().breaker.clone();
    assert_eq!(breaker.state(), CircuitState::Open);
    assert_eq!(breaker.total_trips(), 2);

    time::advance(Duration::from_secs(20)).await;
    assert!(matches!(
        processor.handle(request("T5")).await,
        Err(GatewayError::CircuitOpen { .. })
    ));
    assert_eq!(provider.calls(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_caller_cancellation_not_counted() {
    let provider = ScriptedProvider::new("MTN_MOMO", Behaviour::Sleep(Duration::from_secs(5)));
    let processor = processor_with(provider.clone(), Arc::new(MemoryStore::new()));

    let err = processor
        .handle_with_cancel(request("TXN-1"), time::sleep(Duration::from_millis(200)))
        .await
        .unwrap_err();

    assert!(matches!(err, GatewayError::Timeout { .. }));
    let snapshot = processor.providers().resolve("MTN").unwrap().breaker.snapshot();
    assert_eq!(snapshot.counts.requests, 0);
    assert_eq!(snapshot.trials_in_flight, 0);
}

#[tokio::test(start_paused = true)]
async fn test_unavailable_store_fails_request() {
    let provider = ScriptedProvider::new("MTN_MOMO", Behaviour::Succeed);
    let processor = processor_with(provider.clone(), Arc::new(UnavailableStore));

    let err = processor.handle(request("TXN-1")).await.unwrap_err();
    assert!(matches!(err, GatewayError::StoreUnavailable(_)));
    assert_eq!(err.status_code().as_u16(), 503);
    assert_eq!(provider.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_lost_completion_keeps_success() {
    let provider = ScriptedProvider::new("MTN_MOMO", Behaviour::Succeed);
    let processor = processor_with(provider.clone(), Arc::new(ReadOnlyStore::default()));

    let res = processor.handle(request("TXN-1")).await.unwrap();
    assert_eq!(res.status, PaymentStatus::Success);
    assert!(res.is_idempotent);

    // Only the lease protects the id now.
    assert!(matches!(
        processor.handle(request("TXN-1")).await,
        Err(GatewayError::DuplicateInProgress(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn test_slow_store_counts_as_unavailable() {
    let provider = ScriptedProvider::new("MTN_MOMO", Behaviour::Succeed);
    let processor = processor_with(provider.clone(), Arc::new(HangingStore::all()));

    let started = time::Instant::now();
    let err = processor.handle(request("TXN-1")).await.unwrap_err();

    assert!(matches!(
        err,
        GatewayError::StoreUnavailable(StoreError::Timeout(d)) if d == Duration::from_secs(1)
    ));
    assert_eq!(started.elapsed(), Duration::from_secs(1));
    assert_eq!(provider.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_slow_completion_keeps_success() {
    let provider = ScriptedProvider::new("MTN_MOMO", Behaviour::Succeed);
    let processor = processor_with(provider.clone(), Arc::new(HangingStore::writes_only()));

    let started = time::Instant::now();
    let res = processor.handle(request("TXN-1")).await.unwrap();

    assert_eq!(res.status, PaymentStatus::Success);
    assert!(res.is_idempotent);
    assert_eq!(started.elapsed(), Duration::from_secs(1));
    assert_eq!(provider.calls(), 1);

    let err = processor.handle(request("TXN-1")).await.unwrap_err();
    assert!(matches!(err, GatewayError::DuplicateInProgress(_)));
    assert_eq!(provider.calls(), 1);
}
