//! Deadline-bounded provider invocation.
//!
//! # Responsibilities
//! - Wrap a single provider call with a hard deadline
//! - Abort the call when the caller gives up
//! - Normalize the result into an outcome the breaker understands
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities; the deadline is also handed to the
//!   provider so it can stop early
//! - The structured response is authoritative: a FAILED response is a
//!   failure even when the provider raised no error
//! - Caller cancellation is reported separately so it is not blamed on the
//!   provider

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{self, Instant};

use crate::observability::metrics;
use crate::payments::types::{PaymentRequest, PaymentResponse};
use crate::providers::{PaymentProvider, ProviderError};
use crate::resilience::circuit_breaker::CallOutcome;

/// Deadline used when the call timeout does not fit on the clock.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Maps a completed provider response onto a breaker outcome.
pub type OutcomeClassifier = Arc<dyn Fn(&PaymentResponse) -> CallOutcome + Send + Sync>;

/// Anything other than SUCCESS counts against the provider.
pub fn default_classifier() -> OutcomeClassifier {
    Arc::new(|response: &PaymentResponse| {
        if response.is_success() {
            CallOutcome::Success
        } else {
            CallOutcome::Failure
        }
    })
}

/// How a bounded provider call ended.
#[derive(Debug)]
pub enum Invocation {
    /// The provider answered in time.
    Completed {
        response: PaymentResponse,
        outcome: CallOutcome,
    },
    /// The provider signalled an error without a usable response.
    Failed(ProviderError),
    /// The deadline expired first.
    TimedOut(Duration),
    /// The caller went away before the provider answered.
    Cancelled,
}

impl Invocation {
    /// Outcome to feed the breaker; `None` means the call must not be counted.
    pub fn breaker_outcome(&self) -> Option<CallOutcome> {
        match self {
            Invocation::Completed { outcome, .. } => Some(*outcome),
            Invocation::Failed(_) | Invocation::TimedOut(_) => Some(CallOutcome::Failure),
            Invocation::Cancelled => None,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Invocation::Completed { outcome: CallOutcome::Success, .. } => "success",
            Invocation::Completed { outcome: CallOutcome::Failure, .. } => "failure",
            Invocation::Failed(_) => "error",
            Invocation::TimedOut(_) => "timeout",
            Invocation::Cancelled => "cancelled",
        }
    }
}

/// Call `provider` with a deadline of `timeout` from now.
///
/// `cancelled` resolves when the inbound request is abandoned; pass
/// `std::future::pending()` when there is no such signal.
pub async fn invoke<C>(
    provider: &dyn PaymentProvider,
    request: &PaymentRequest,
    timeout: Duration,
    classifier: &OutcomeClassifier,
    cancelled: C,
) -> Invocation
where
    C: Future<Output = ()>,
{
    let started = Instant::now();
    let deadline = started.checked_add(timeout).unwrap_or_else(|| started + FAR_FUTURE);

    let invocation = tokio::select! {
        biased;
        result = time::timeout_at(deadline, provider.process(request, deadline)) => match result {
            Ok(Ok(response)) => {
                let outcome = classifier(&response);
                Invocation::Completed { response, outcome }
            }
            Ok(Err(ProviderError::DeadlineExceeded)) | Err(_) => Invocation::TimedOut(timeout),
            Ok(Err(e)) => Invocation::Failed(e),
        },
        _ = cancelled => Invocation::Cancelled,
    };

    metrics::record_provider_call(provider.name(), invocation.label(), started.elapsed());
    invocation
}
