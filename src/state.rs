//! Circuit breaker states and the counters that drive transitions.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Represents the possible states of a circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    /// Circuit is closed and operations are allowed.
    Closed,

    /// Circuit is allowing a limited number of probes to test recovery.
    HalfOpen,

    /// Circuit is open and operations are rejected.
    Open,
}

impl State {
    /// Stable name of the state, suitable for logs and metric labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            State::Closed => "closed",
            State::HalfOpen => "half-open",
            State::Open => "open",
        }
    }
}

impl Display for State {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown state name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseStateError(String);

impl Display for ParseStateError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "unknown circuit breaker state: {}", self.0)
    }
}

impl std::error::Error for ParseStateError {}

impl FromStr for State {
    type Err = ParseStateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "closed" => Ok(State::Closed),
            "half-open" => Ok(State::HalfOpen),
            "open" => Ok(State::Open),
            other => Err(ParseStateError(other.to_string())),
        }
    }
}

/// Request and outcome counts for the current generation.
///
/// The breaker clears its counts on every state change and, while closed,
/// whenever the configured interval elapses. Outcomes of requests admitted
/// before a clear are ignored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counts {
    /// Admitted requests since the last clear.
    pub requests: u32,
    /// Successful outcomes since the last clear.
    pub total_successes: u32,
    /// Failed outcomes since the last clear.
    pub total_failures: u32,
    /// Current run of successes.
    pub consecutive_successes: u32,
    /// Current run of failures.
    pub consecutive_failures: u32,
}

impl Counts {
    pub(crate) fn on_request(&mut self) {
        self.requests = self.requests.saturating_add(1);
    }

    pub(crate) fn on_success(&mut self) {
        self.total_successes = self.total_successes.saturating_add(1);
        self.consecutive_successes = self.consecutive_successes.saturating_add(1);
        self.consecutive_failures = 0;
    }

    pub(crate) fn on_failure(&mut self) {
        self.total_failures = self.total_failures.saturating_add(1);
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.consecutive_successes = 0;
    }

    pub(crate) fn clear(&mut self) {
        *self = Counts::default();
    }

    /// Fraction of reported outcomes that failed, or `0.0` if nothing was reported.
    pub fn failure_ratio(&self) -> f64 {
        let reported = u64::from(self.total_successes) + u64::from(self.total_failures);
        if reported == 0 {
            return 0.0;
        }

        f64::from(self.total_failures) / reported as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_names_are_stable() {
        assert_eq!(State::Closed.to_string(), "closed");
        assert_eq!(State::HalfOpen.to_string(), "half-open");
        assert_eq!(State::Open.to_string(), "open");

        for state in [State::Closed, State::HalfOpen, State::Open] {
            assert_eq!(state.as_str().parse::<State>(), Ok(state));
        }
        assert!("ajar".parse::<State>().is_err());
    }

    #[test]
    fn streaks_reset_each_other() {
        let mut counts = Counts::default();
        counts.on_request();
        counts.on_failure();
        counts.on_request();
        counts.on_failure();
        assert_eq!(counts.consecutive_failures, 2);

        counts.on_request();
        counts.on_success();
        assert_eq!(counts.consecutive_failures, 0);
        assert_eq!(counts.consecutive_successes, 1);
        assert_eq!(counts.requests, 3);
        assert_eq!(counts.total_failures, 2);
        assert_eq!(counts.total_successes, 1);

        counts.clear();
        assert_eq!(counts, Counts::default());
    }

    #[test]
    fn failure_ratio_ignores_unreported_requests() {
        let mut counts = Counts::default();
        assert_eq!(counts.failure_ratio(), 0.0);

        counts.on_request();
        counts.on_request();
        counts.on_failure();
        assert_eq!(counts.failure_ratio(), 1.0);
    }
}
