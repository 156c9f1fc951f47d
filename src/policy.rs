//! Trip policies deciding when a closed circuit should open.

use crate::state::Counts;

/// A policy that determines when to trip a closed circuit breaker.
///
/// The breaker consults the policy with a snapshot of its counts after every
/// failure reported while closed.
pub trait TripPolicy: Send + Sync + 'static {
    /// Determines if the circuit should trip open based on current counts.
    fn ready_to_trip(&self, counts: &Counts) -> bool;
}

/// Default policy: trip once consecutive failures exceed a limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsecutiveFailures {
    limit: u32,
}

impl ConsecutiveFailures {
    /// Trips when the failure streak is strictly greater than `limit`.
    pub fn new(limit: u32) -> Self {
        Self { limit }
    }
}

impl Default for ConsecutiveFailures {
    fn default() -> Self {
        Self::new(5)
    }
}

impl TripPolicy for ConsecutiveFailures {
    fn ready_to_trip(&self, counts: &Counts) -> bool {
        counts.consecutive_failures > self.limit
    }
}

/// The policy used when none is configured.
pub type DefaultPolicy = ConsecutiveFailures;

/// Ratio policy: trip once enough requests were seen and the failure ratio is too high.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FailureRatio {
    threshold: f64,
    min_requests: u32,
}

impl FailureRatio {
    /// Trips when at least `min_requests` were admitted in the current window
    /// and the ratio of failures to reported outcomes reaches `threshold`.
    pub fn new(threshold: f64, min_requests: u32) -> Self {
        Self {
            threshold,
            min_requests,
        }
    }
}

impl TripPolicy for FailureRatio {
    fn ready_to_trip(&self, counts: &Counts) -> bool {
        counts.requests >= self.min_requests && counts.failure_ratio() >= self.threshold
    }
}

/// A policy backed by a closure. Built with [`from_fn`].
pub struct FnPolicy<F> {
    f: F,
}

impl<F> std::fmt::Debug for FnPolicy<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnPolicy").finish_non_exhaustive()
    }
}

/// Wraps a predicate over [`Counts`] as a [`TripPolicy`].
///
/// ```rust
/// use twostep_breaker::policy;
///
/// let trip = policy::from_fn(|counts| counts.consecutive_failures >= 3);
/// ```
pub fn from_fn<F>(f: F) -> FnPolicy<F>
where
    F: Fn(&Counts) -> bool + Send + Sync + 'static,
{
    FnPolicy { f }
}

impl<F> TripPolicy for FnPolicy<F>
where
    F: Fn(&Counts) -> bool + Send + Sync + 'static,
{
    fn ready_to_trip(&self, counts: &Counts) -> bool {
        (self.f)(counts)
    }
}
