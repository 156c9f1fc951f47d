//! Configuration for circuit breakers.

use std::sync::Arc;
use std::time::Duration;

use crate::breaker::CircuitBreaker;
use crate::clock::{Clock, SystemClock};
use crate::hook::HookRegistry;
use crate::metrics::{MetricSink, NullMetricSink};
use crate::policy::{self, DefaultPolicy, FnPolicy, TripPolicy};
use crate::state::{Counts, State};

/// Open-state duration used when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Probe budget used when none is configured.
pub const DEFAULT_MAX_REQUESTS: u32 = 1;

/// Plain settings of a circuit breaker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Name reported to hooks, metrics and logs.
    pub name: String,
    /// Probes admitted while half-open; also the success streak that closes
    /// the circuit. `0` means 1.
    pub max_requests: u32,
    /// Period after which closed-state counts are cleared. Zero never clears.
    pub interval: Duration,
    /// Time spent open before probing. Zero means 60 seconds.
    pub timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            name: String::new(),
            max_requests: DEFAULT_MAX_REQUESTS,
            interval: Duration::ZERO,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl Settings {
    /// Creates default settings for a named breaker.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub(crate) fn normalized(mut self) -> Self {
        if self.max_requests == 0 {
            self.max_requests = DEFAULT_MAX_REQUESTS;
        }
        if self.timeout.is_zero() {
            self.timeout = DEFAULT_TIMEOUT;
        }
        self
    }
}

/// Builder for creating circuit breakers with custom configurations.
pub struct BreakerBuilder<P = DefaultPolicy>
where
    P: TripPolicy,
{
    settings: Settings,
    policy: P,
    clock: Arc<dyn Clock>,
    metric_sink: Arc<dyn MetricSink>,
    hook_registry: Arc<HookRegistry>,
}

impl Default for BreakerBuilder<DefaultPolicy> {
    fn default() -> Self {
        Self::new()
    }
}

impl BreakerBuilder<DefaultPolicy> {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            settings: Settings::default(),
            policy: DefaultPolicy::default(),
            clock: Arc::new(SystemClock),
            metric_sink: Arc::new(NullMetricSink),
            hook_registry: Arc::new(HookRegistry::new()),
        }
    }
}

impl<P> BreakerBuilder<P>
where
    P: TripPolicy,
{
    /// Sets the name reported to hooks, metrics and logs.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.settings.name = name.into();
        self
    }

    /// Replaces all plain settings at once.
    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    /// Sets the half-open probe budget.
    pub fn max_requests(mut self, max_requests: u32) -> Self {
        self.settings.max_requests = max_requests;
        self
    }

    /// Sets the period for clearing counts while closed.
    pub fn interval(mut self, interval: Duration) -> Self {
        self.settings.interval = interval;
        self
    }

    /// Sets how long the circuit stays open before probing.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.settings.timeout = timeout;
        self
    }

    /// Sets the policy deciding when a closed circuit trips.
    pub fn ready_to_trip<Q: TripPolicy>(self, policy: Q) -> BreakerBuilder<Q> {
        BreakerBuilder {
            settings: self.settings,
            policy,
            clock: self.clock,
            metric_sink: self.metric_sink,
            hook_registry: self.hook_registry,
        }
    }

    /// Sets a closure deciding when a closed circuit trips.
    pub fn ready_to_trip_fn<F>(self, f: F) -> BreakerBuilder<FnPolicy<F>>
    where
        F: Fn(&Counts) -> bool + Send + Sync + 'static,
    {
        self.ready_to_trip(policy::from_fn(f))
    }

    /// Sets a hook registry for the circuit breaker.
    ///
    /// Hooks already set on the builder, such as one from
    /// [`on_state_change`](Self::on_state_change), are kept unless `hooks`
    /// sets the same hook.
    pub fn hooks(mut self, hooks: HookRegistry) -> Self {
        hooks.inherit_from(&self.hook_registry);
        self.hook_registry = Arc::new(hooks);
        self
    }

    /// Sets the observer called with `(name, from, to)` on every state change.
    pub fn on_state_change<F>(self, f: F) -> Self
    where
        F: Fn(&str, State, State) + Send + Sync + 'static,
    {
        self.hook_registry.set_on_state_change(f);
        self
    }

    /// Sets a metric sink for the circuit breaker.
    pub fn metric_sink<M: MetricSink>(mut self, sink: M) -> Self {
        self.metric_sink = Arc::new(sink);
        self
    }

    /// Sets the time source used to evaluate expiries.
    pub fn clock<C: Clock>(mut self, clock: C) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Builds a new circuit breaker with the configured settings.
    pub fn build(self) -> CircuitBreaker<P> {
        CircuitBreaker::with_parts(
            self.settings,
            self.policy,
            self.clock,
            self.metric_sink,
            self.hook_registry,
        )
    }
}
