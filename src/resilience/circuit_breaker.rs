//! Circuit breaker for provider protection.
//!
//! # States
//! - Closed: normal operation, calls pass through and are counted
//! - Open: provider assumed down, calls fail fast
//! - Half-Open: a limited number of trial calls probe recovery
//!
//! # State Transitions
//! ```text
//! Closed → Open: requests >= min_requests && failures/requests >= failure_ratio
//! Open → Half-Open: first admission after the cool-down
//! Half-Open → Closed: trial succeeds
//! Half-Open → Open: trial fails (cool-down restarts)
//! ```
//!
//! # Design Decisions
//! - One breaker per provider, each behind its own mutex
//! - The closed window is rolling: counts clear every `interval`
//! - Every transition starts a new generation; outcomes from an older
//!   generation are discarded
//! - Admission is data (`Admission`), never an error
//! - A permit dropped without an outcome frees its slot uncounted

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

use crate::config::CircuitBreakerConfig;
use crate::observability::metrics;

/// State of a breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "CLOSED",
            CircuitState::Open => "OPEN",
            CircuitState::HalfOpen => "HALF_OPEN",
        }
    }

    /// Numeric form for gauges (0=closed, 1=half-open, 2=open).
    pub fn as_gauge(&self) -> f64 {
        match self {
            CircuitState::Closed => 0.0,
            CircuitState::HalfOpen => 1.0,
            CircuitState::Open => 2.0,
        }
    }
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome counters for the current window.
///
/// `requests` always equals `successes + failures`; calls still in flight
/// are not counted until they settle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Counts {
    pub requests: u64,
    pub successes: u64,
    pub failures: u64,
    pub consecutive_successes: u64,
    pub consecutive_failures: u64,
}

impl Counts {
    fn on_success(&mut self) {
        self.requests = self.requests.saturating_add(1);
        self.successes = self.successes.saturating_add(1);
        self.consecutive_successes = self.consecutive_successes.saturating_add(1);
        self.consecutive_failures = 0;
    }

    fn on_failure(&mut self) {
        self.requests = self.requests.saturating_add(1);
        self.failures = self.failures.saturating_add(1);
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.consecutive_successes = 0;
    }

    pub fn failure_ratio(&self) -> f64 {
        if self.requests == 0 {
            0.0
        } else {
            self.failures as f64 / self.requests as f64
        }
    }
}

/// Tuning for a single breaker.
#[derive(Debug, Clone)]
pub struct BreakerSettings {
    pub min_requests: u32,
    pub failure_ratio: f64,
    /// Closed-window length; `None` keeps counts until the next transition.
    pub interval: Option<Duration>,
    pub open_timeout: Duration,
    pub half_open_max_requests: u32,
}

impl Default for BreakerSettings {
    fn default() -> Self {
        Self::from(&CircuitBreakerConfig::default())
    }
}

impl From<&CircuitBreakerConfig> for BreakerSettings {
    fn from(config: &CircuitBreakerConfig) -> Self {
        Self {
            min_requests: config.min_requests.max(1),
            failure_ratio: config.failure_ratio,
            interval: (config.interval_secs > 0).then(|| Duration::from_secs(config.interval_secs)),
            open_timeout: Duration::from_secs(config.open_secs),
            half_open_max_requests: config.half_open_max_requests.max(1),
        }
    }
}

/// Outcome of an admitted call, as far as the breaker is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallOutcome {
    Success,
    Failure,
}

/// Result of asking the breaker for permission to call.
#[derive(Debug)]
pub enum Admission {
    Granted(CallPermit),
    Rejected {
        state: CircuitState,
        /// Time left until an open circuit will admit a trial call.
        retry_after: Option<Duration>,
    },
}

/// Point-in-time view of a breaker.
#[derive(Debug, Clone, Serialize)]
pub struct BreakerSnapshot {
    pub provider: String,
    pub state: CircuitState,
    pub counts: Counts,
    pub trials_in_flight: u32,
    pub since_transition_ms: u64,
    pub total_trips: u64,
}

#[derive(Debug)]
struct Window {
    state: CircuitState,
    generation: u64,
    counts: Counts,
    trials_in_flight: u32,
    /// Closed: next window reset. Open: end of cool-down. Half-open: unused.
    expiry: Option<Instant>,
    changed_at: Instant,
}

type Transition = (CircuitState, CircuitState);

/// Used when a configured duration does not fit on the clock.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

fn instant_after(now: Instant, d: Duration) -> Instant {
    now.checked_add(d).unwrap_or_else(|| now + FAR_FUTURE)
}

impl Window {
    fn new(now: Instant, settings: &BreakerSettings) -> Self {
        Self {
            state: CircuitState::Closed,
            generation: 0,
            counts: Counts::default(),
            trials_in_flight: 0,
            expiry: settings.interval.map(|i| instant_after(now, i)),
            changed_at: now,
        }
    }

    /// Apply the time-driven changes: window roll-over and end of cool-down.
    fn refresh(&mut self, now: Instant, settings: &BreakerSettings) -> Option<Transition> {
        match (self.state, self.expiry) {
            (CircuitState::Closed, Some(expiry)) if expiry <= now => {
                self.new_generation(now, settings);
                None
            }
            (CircuitState::Open, Some(expiry)) if expiry <= now => {
                Some(self.transition(CircuitState::HalfOpen, now, settings))
            }
            _ => None,
        }
    }

    fn transition(&mut self, to: CircuitState, now: Instant, settings: &BreakerSettings) -> Transition {
        let from = self.state;
        self.state = to;
        self.changed_at = now;
        self.new_generation(now, settings);
        (from, to)
    }

    fn new_generation(&mut self, now: Instant, settings: &BreakerSettings) {
        self.generation = self.generation.wrapping_add(1);
        self.counts = Counts::default();
        self.trials_in_flight = 0;
        self.expiry = match self.state {
            CircuitState::Closed => settings.interval.map(|i| instant_after(now, i)),
            CircuitState::Open => Some(instant_after(now, settings.open_timeout)),
            CircuitState::HalfOpen => None,
        };
    }

    fn should_trip(&self, settings: &BreakerSettings) -> bool {
        self.counts.requests >= u64::from(settings.min_requests)
            && self.counts.failure_ratio() >= settings.failure_ratio
    }
}

/// A per-provider circuit breaker.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    settings: BreakerSettings,
    window: Mutex<Window>,
    total_trips: AtomicU64,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, settings: BreakerSettings) -> Self {
        let window = Window::new(Instant::now(), &settings);
        Self {
            name: name.into(),
            settings,
            window: Mutex::new(window),
            total_trips: AtomicU64::new(0),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn settings(&self) -> &BreakerSettings {
        &self.settings
    }

    fn lock(&self) -> MutexGuard<'_, Window> {
        self.window.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Ask for permission to make one call.
    pub fn admit(self: &Arc<Self>) -> Admission {
        let now = Instant::now();
        let mut window = self.lock();
        let changed = window.refresh(now, &self.settings);

        let admission = match window.state {
            CircuitState::Closed => Admission::Granted(self.permit(window.generation)),
            CircuitState::Open => Admission::Rejected {
                state: CircuitState::Open,
                retry_after: window.expiry.map(|e| e.saturating_duration_since(now)),
            },
            CircuitState::HalfOpen => {
                if window.trials_in_flight < self.settings.half_open_max_requests {
                    window.trials_in_flight += 1;
                    Admission::Granted(self.permit(window.generation))
                } else {
                    Admission::Rejected {
                        state: CircuitState::HalfOpen,
                        retry_after: None,
                    }
                }
            }
        };
        drop(window);

        if let Some(t) = changed {
            self.on_transition(t);
        }
        admission
    }

    fn permit(self: &Arc<Self>, generation: u64) -> CallPermit {
        CallPermit {
            breaker: Arc::clone(self),
            generation,
            settled: false,
        }
    }

    /// Record an outcome (or abandonment, when `None`) for a permit.
    fn settle(&self, generation: u64, outcome: Option<CallOutcome>) {
        let now = Instant::now();
        let mut window = self.lock();
        let mut changes = Vec::with_capacity(2);
        changes.extend(window.refresh(now, &self.settings));

        if window.generation == generation {
            if window.state == CircuitState::HalfOpen {
                window.trials_in_flight = window.trials_in_flight.saturating_sub(1);
            }

            if let Some(outcome) = outcome {
                match outcome {
                    CallOutcome::Success => window.counts.on_success(),
                    CallOutcome::Failure => window.counts.on_failure(),
                }

                match window.state {
                    CircuitState::Closed => {
                        if window.should_trip(&self.settings) {
                            tracing::warn!(
                                provider = %self.name,
                                requests = window.counts.requests,
                                failures = window.counts.failures,
                                ratio = window.counts.failure_ratio(),
                                "Circuit breaker opening - failure ratio exceeded"
                            );
                            changes.push(window.transition(CircuitState::Open, now, &self.settings));
                        }
                    }
                    CircuitState::HalfOpen => match outcome {
                        CallOutcome::Success => {
                            if window.counts.consecutive_successes >= u64::from(self.settings.half_open_max_requests) {
                                changes.push(window.transition(CircuitState::Closed, now, &self.settings));
                            }
                        }
                        CallOutcome::Failure => {
                            tracing::warn!(provider = %self.name, "Circuit breaker re-opening - trial call failed");
                            changes.push(window.transition(CircuitState::Open, now, &self.settings));
                        }
                    },
                    CircuitState::Open => {}
                }
            }
        } else {
            tracing::debug!(
                provider = %self.name,
                permit_generation = generation,
                current_generation = window.generation,
                "Discarding outcome from a previous window"
            );
        }
        drop(window);

        for t in changes {
            self.on_transition(t);
        }
    }

    fn on_transition(&self, (from, to): Transition) {
        if to == CircuitState::Open {
            self.total_trips.fetch_add(1, Ordering::Relaxed);
        }
        tracing::info!(provider = %self.name, from = %from, to = %to, "Circuit breaker state change");
        metrics::record_circuit_transition(&self.name, to);
    }

    /// Current state, after applying any pending time-driven transition.
    pub fn state(&self) -> CircuitState {
        let now = Instant::now();
        let mut window = self.lock();
        let changed = window.refresh(now, &self.settings);
        let state = window.state;
        drop(window);

        if let Some(t) = changed {
            self.on_transition(t);
        }
        state
    }

    pub fn snapshot(&self) -> BreakerSnapshot {
        let now = Instant::now();
        let mut window = self.lock();
        let changed = window.refresh(now, &self.settings);
        let snapshot = BreakerSnapshot {
            provider: self.name.clone(),
            state: window.state,
            counts: window.counts,
            trials_in_flight: window.trials_in_flight,
            since_transition_ms: u64::try_from(now.saturating_duration_since(window.changed_at).as_millis())
                .unwrap_or(u64::MAX),
            total_trips: self.total_trips.load(Ordering::Relaxed),
        };
        drop(window);

        if let Some(t) = changed {
            self.on_transition(t);
        }
        snapshot
    }

    /// Number of times this breaker has opened.
    pub fn total_trips(&self) -> u64 {
        self.total_trips.load(Ordering::Relaxed)
    }

    /// Force the breaker closed with an empty window.
    pub fn reset(&self) {
        let now = Instant::now();
        let mut window = self.lock();
        let previous = window.state;
        let t = window.transition(CircuitState::Closed, now, &self.settings);
        drop(window);

        tracing::info!(provider = %self.name, previous_state = %previous, "Circuit breaker reset manually");
        self.on_transition(t);
    }
}

/// Permission to make one call through a breaker.
///
/// Report the result with [`CallPermit::record`]. Dropping the permit
/// without recording releases its slot without counting the call.
#[derive(Debug)]
pub struct CallPermit {
    breaker: Arc<CircuitBreaker>,
    generation: u64,
    settled: bool,
}

impl CallPermit {
    pub fn record(mut self, outcome: CallOutcome) {
        self.settled = true;
        self.breaker.settle(self.generation, Some(outcome));
    }

    /// Give the slot back without counting the call.
    pub fn release(mut self) {
        self.settled = true;
        self.breaker.settle(self.generation, None);
    }
}

impl Drop for CallPermit {
    fn drop(&mut self) {
        if !self.settled {
            self.breaker.settle(self.generation, None);
        }
    }
}
