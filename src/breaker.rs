//! Core circuit breaker implementation.

use parking_lot::Mutex;
use smallvec::SmallVec;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::clock::{Clock, SystemClock};
use crate::config::{BreakerBuilder, Settings};
use crate::error::{BreakerError, BreakerResult, Rejection};
use crate::hook::HookRegistry;
use crate::metrics::{MetricSink, NullMetricSink};
use crate::policy::{DefaultPolicy, TripPolicy};
use crate::state::{Counts, State};

/// Proof of admission returned by [`CircuitBreaker::before_request`].
///
/// Carries the generation the request was admitted into. Hand it back with
/// [`CircuitBreaker::on_success`] or [`CircuitBreaker::on_failure`]; if the
/// breaker has moved to another generation by then, the report is dropped.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "report the outcome with on_success or on_failure"]
pub struct Permit {
    generation: u64,
}

impl Permit {
    /// Generation the request was admitted into.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Something that happened under the lock and is published after it.
#[derive(Debug, Clone, Copy)]
enum Event {
    Transition { from: State, to: State },
    Rollover { generation: u64 },
}

type Events = SmallVec<[Event; 2]>;

/// State, counts, generation and expiry, only ever touched under one lock.
#[derive(Debug)]
struct Core {
    state: State,
    generation: u64,
    counts: Counts,
    expiry: Option<Instant>,
    interval: Duration,
    timeout: Duration,
}

impl Core {
    fn new(settings: &Settings, now: Instant) -> Self {
        let mut core = Self {
            state: State::Closed,
            generation: 0,
            counts: Counts::default(),
            expiry: None,
            interval: settings.interval,
            timeout: settings.timeout,
        };
        core.reset(now);
        core
    }

    /// Resolves any time-based change that is due and returns the result.
    fn current_state(&mut self, now: Instant, events: &mut Events) -> (State, u64) {
        match self.state {
            State::Closed => {
                if matches!(self.expiry, Some(expiry) if expiry < now) {
                    self.reset(now);
                    events.push(Event::Rollover {
                        generation: self.generation,
                    });
                }
            }
            State::Open => {
                if matches!(self.expiry, Some(expiry) if expiry < now) {
                    self.set_state(State::HalfOpen, now, events);
                }
            }
            State::HalfOpen => {}
        }

        (self.state, self.generation)
    }

    fn set_state(&mut self, to: State, now: Instant, events: &mut Events) {
        if self.state == to {
            return;
        }

        let from = self.state;
        self.state = to;
        self.reset(now);
        events.push(Event::Transition { from, to });
    }

    /// Starts a new generation with cleared counts and a fresh expiry.
    fn reset(&mut self, now: Instant) {
        self.generation = self.generation.wrapping_add(1);
        self.counts.clear();
        self.expiry = match self.state {
            State::Closed if self.interval.is_zero() => None,
            // An unrepresentable deadline never fires.
            State::Closed => now.checked_add(self.interval),
            State::Open => now.checked_add(self.timeout),
            State::HalfOpen => None,
        };
    }

    fn on_success(&mut self, state: State, max_requests: u32, now: Instant, events: &mut Events) {
        match state {
            State::Closed => self.counts.on_success(),
            State::HalfOpen => {
                self.counts.on_success();
                if self.counts.consecutive_successes >= max_requests {
                    self.set_state(State::Closed, now, events);
                }
            }
            // Unreachable through the protocol: every transition bumps the generation.
            State::Open => {}
        }
    }

    fn on_failure<P: TripPolicy>(
        &mut self,
        state: State,
        policy: &P,
        now: Instant,
        events: &mut Events,
    ) {
        match state {
            State::Closed => {
                self.counts.on_failure();
                if policy.ready_to_trip(&self.counts) {
                    self.set_state(State::Open, now, events);
                }
            }
            State::HalfOpen => self.set_state(State::Open, now, events),
            State::Open => {}
        }
    }
}

/// Inner state of the circuit breaker, shared between clones.
struct BreakerInner<P>
where
    P: TripPolicy,
{
    settings: Settings,
    policy: P,
    clock: Arc<dyn Clock>,
    core: Mutex<Core>,
    metric_sink: Arc<dyn MetricSink>,
    hooks: Arc<HookRegistry>,
}

/// A circuit breaker guarding calls to one dependency.
///
/// Callers ask for a [`Permit`] before doing work and report the outcome
/// afterwards. Time-based transitions are resolved lazily whenever the
/// breaker is touched; there is no background task.
pub struct CircuitBreaker<P = DefaultPolicy>
where
    P: TripPolicy,
{
    inner: Arc<BreakerInner<P>>,
}

impl CircuitBreaker<DefaultPolicy> {
    /// Creates a circuit breaker with the default trip policy.
    pub fn new(settings: Settings) -> Self {
        Self::with_policy(settings, DefaultPolicy::default())
    }

    /// Creates a new builder for customizing a circuit breaker.
    pub fn builder() -> BreakerBuilder<DefaultPolicy> {
        BreakerBuilder::new()
    }
}

impl<P> CircuitBreaker<P>
where
    P: TripPolicy,
{
    /// Creates a circuit breaker with a custom trip policy.
    pub fn with_policy(settings: Settings, policy: P) -> Self {
        Self::with_parts(
            settings,
            policy,
            Arc::new(SystemClock),
            Arc::new(NullMetricSink),
            Arc::new(HookRegistry::new()),
        )
    }

    pub(crate) fn with_parts(
        settings: Settings,
        policy: P,
        clock: Arc<dyn Clock>,
        metric_sink: Arc<dyn MetricSink>,
        hooks: Arc<HookRegistry>,
    ) -> Self {
        let settings = settings.normalized();
        let core = Core::new(&settings, clock.now());
        let inner = BreakerInner {
            settings,
            policy,
            clock,
            core: Mutex::new(core),
            metric_sink,
            hooks,
        };

        Self {
            inner: Arc::new(inner),
        }
    }

    /// Name of the circuit breaker.
    pub fn name(&self) -> &str {
        &self.inner.settings.name
    }

    /// Normalized settings of the circuit breaker.
    pub fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    /// Current state, after resolving any time-based transition that is due.
    pub fn state(&self) -> State {
        let mut events = Events::new();
        let (state, _) = {
            let mut core = self.inner.core.lock();
            core.current_state(self.inner.clock.now(), &mut events)
        };
        self.publish(events);
        state
    }

    /// Snapshot of the counts of the current generation.
    pub fn counts(&self) -> Counts {
        self.inner.core.lock().counts
    }

    /// Asks to run one request through the breaker.
    ///
    /// Fails with [`Rejection::OpenState`] while open and with
    /// [`Rejection::TooManyRequests`] once the half-open probe budget is
    /// spent. Neither counts as a request.
    pub fn before_request(&self) -> Result<Permit, Rejection> {
        let mut events = Events::new();
        let admission = {
            let mut core = self.inner.core.lock();
            let (state, generation) = core.current_state(self.inner.clock.now(), &mut events);

            if state == State::Open {
                Err(Rejection::OpenState)
            } else if state == State::HalfOpen
                && core.counts.requests >= self.inner.settings.max_requests
            {
                Err(Rejection::TooManyRequests)
            } else {
                core.counts.on_request();
                Ok(Permit { generation })
            }
        };
        self.publish(events);

        if let Err(rejection) = admission {
            #[cfg(feature = "tracing")]
            tracing::trace!(breaker = %self.name(), %rejection, "request rejected");
            self.inner.metric_sink.record_rejection(self.name(), rejection);
            self.inner.hooks.execute_rejected_hook(self.name(), rejection);
        }

        admission
    }

    /// Reports that the admitted request succeeded.
    pub fn on_success(&self, permit: Permit) {
        self.after_request(permit, true);
    }

    /// Reports that the admitted request failed.
    pub fn on_failure(&self, permit: Permit) {
        self.after_request(permit, false);
    }

    fn after_request(&self, permit: Permit, success: bool) {
        let mut events = Events::new();
        let applied = {
            let mut core = self.inner.core.lock();
            let now = self.inner.clock.now();
            let (state, generation) = core.current_state(now, &mut events);

            if generation != permit.generation {
                false
            } else {
                if success {
                    core.on_success(state, self.inner.settings.max_requests, now, &mut events);
                } else {
                    core.on_failure(state, &self.inner.policy, now, &mut events);
                }
                true
            }
        };

        if applied {
            self.inner.metric_sink.record_outcome(self.name(), success);
        } else {
            self.inner.metric_sink.record_stale_report(self.name());
        }
        self.publish(events);
    }

    /// Hands events collected under the lock to logs, metrics and hooks.
    fn publish(&self, events: Events) {
        for event in events {
            match event {
                Event::Transition { from, to } => {
                    #[cfg(feature = "tracing")]
                    tracing::info!(breaker = %self.name(), %from, %to, "circuit breaker state changed");
                    self.inner
                        .metric_sink
                        .record_state_transition(self.name(), from, to);
                    self.inner
                        .hooks
                        .execute_state_change_hook(self.name(), from, to);
                }
                Event::Rollover { generation } => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(breaker = %self.name(), generation, "cleared closed-state counts");
                    #[cfg(not(feature = "tracing"))]
                    let _ = generation;
                }
            }
        }
    }

    /// Executes a function wrapped by the circuit breaker.
    ///
    /// `Ok` is reported as a success and `Err` as a failure. A panic is
    /// reported as a failure and then resumed.
    pub fn call<F, T, E>(&self, f: F) -> BreakerResult<T, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        self.call_with(f, |result| result.is_ok())
    }

    /// Like [`call`](Self::call), with a classifier deciding which results
    /// count as successes.
    pub fn call_with<F, S, T, E>(&self, f: F, is_successful: S) -> BreakerResult<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        S: FnOnce(&Result<T, E>) -> bool,
    {
        let permit = self.before_request()?;

        match panic::catch_unwind(AssertUnwindSafe(f)) {
            Ok(result) => {
                if is_successful(&result) {
                    self.on_success(permit);
                } else {
                    self.on_failure(permit);
                }
                result.map_err(BreakerError::Operation)
            }
            Err(payload) => {
                self.on_failure(permit);
                panic::resume_unwind(payload)
            }
        }
    }
}

// Allow cloning of circuit breakers - cheap because inner state is Arc'd
impl<P> Clone for CircuitBreaker<P>
where
    P: TripPolicy,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<P> std::fmt::Debug for CircuitBreaker<P>
where
    P: TripPolicy,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let core = self.inner.core.lock();
        f.debug_struct("CircuitBreaker")
            .field("name", &self.inner.settings.name)
            .field("state", &core.state)
            .field("generation", &core.generation)
            .field("counts", &core.counts)
            .finish()
    }
}

// Implement Async support when the feature is enabled
#[cfg(feature = "async")]
impl<P> CircuitBreaker<P>
where
    P: TripPolicy,
{
    /// Executes an async function wrapped by the circuit breaker.
    pub async fn call_async<F, Fut, T, E>(&self, f: F) -> BreakerResult<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
    {
        use futures::FutureExt;

        let permit = self.before_request()?;

        match AssertUnwindSafe(async move { f().await })
            .catch_unwind()
            .await
        {
            Ok(Ok(value)) => {
                self.on_success(permit);
                Ok(value)
            }
            Ok(Err(e)) => {
                self.on_failure(permit);
                Err(BreakerError::Operation(e))
            }
            Err(payload) => {
                self.on_failure(permit);
                panic::resume_unwind(payload)
            }
        }
    }
}
