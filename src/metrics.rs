//! Metric sinks receiving circuit breaker events.

use crate::error::Rejection;
use crate::state::State;

/// Trait for metrics sinks that can receive circuit breaker events.
///
/// Sinks are called after the breaker has released its lock.
pub trait MetricSink: Send + Sync + 'static {
    /// Records a state transition event.
    fn record_state_transition(&self, breaker: &str, from: State, to: State);

    /// Records a refused admission.
    fn record_rejection(&self, breaker: &str, rejection: Rejection);

    /// Records an outcome applied to the current generation.
    fn record_outcome(&self, breaker: &str, success: bool);

    /// Records an outcome discarded because its generation was stale.
    fn record_stale_report(&self, breaker: &str);
}

/// A null metrics sink that discards all events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullMetricSink;

impl MetricSink for NullMetricSink {
    fn record_state_transition(&self, _breaker: &str, _from: State, _to: State) {}
    fn record_rejection(&self, _breaker: &str, _rejection: Rejection) {}
    fn record_outcome(&self, _breaker: &str, _success: bool) {}
    fn record_stale_report(&self, _breaker: &str) {}
}

#[cfg(feature = "prometheus")]
pub use self::prometheus::PrometheusSink;

#[cfg(feature = "prometheus")]
mod prometheus {
    use super::MetricSink;
    use crate::error::Rejection;
    use crate::state::State;
    use prometheus_client::encoding::EncodeLabelSet;
    use prometheus_client::metrics::counter::Counter;
    use prometheus_client::metrics::family::Family;
    use prometheus_client::registry::Registry;

    #[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
    struct TransitionLabels {
        breaker: String,
        from: String,
        to: String,
    }

    #[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
    struct RejectionLabels {
        breaker: String,
        reason: String,
    }

    #[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
    struct OutcomeLabels {
        breaker: String,
        outcome: String,
    }

    #[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
    struct BreakerLabels {
        breaker: String,
    }

    /// A [`MetricSink`] that exports counters through `prometheus-client`.
    #[derive(Clone, Default)]
    pub struct PrometheusSink {
        transitions: Family<TransitionLabels, Counter>,
        rejections: Family<RejectionLabels, Counter>,
        outcomes: Family<OutcomeLabels, Counter>,
        stale_reports: Family<BreakerLabels, Counter>,
    }

    impl PrometheusSink {
        /// Creates the sink and registers its metric families.
        pub fn new(registry: &mut Registry) -> Self {
            let sink = Self::default();
            registry.register(
                "circuit_breaker_transitions",
                "Circuit breaker state transitions",
                sink.transitions.clone(),
            );
            registry.register(
                "circuit_breaker_rejections",
                "Requests refused by a circuit breaker",
                sink.rejections.clone(),
            );
            registry.register(
                "circuit_breaker_outcomes",
                "Outcomes reported to a circuit breaker",
                sink.outcomes.clone(),
            );
            registry.register(
                "circuit_breaker_stale_reports",
                "Outcomes discarded because their generation had passed",
                sink.stale_reports.clone(),
            );
            sink
        }
    }

    impl MetricSink for PrometheusSink {
        fn record_state_transition(&self, breaker: &str, from: State, to: State) {
            self.transitions
                .get_or_create(&TransitionLabels {
                    breaker: breaker.to_string(),
                    from: from.as_str().to_string(),
                    to: to.as_str().to_string(),
                })
                .inc();
        }

        fn record_rejection(&self, breaker: &str, rejection: Rejection) {
            self.rejections
                .get_or_create(&RejectionLabels {
                    breaker: breaker.to_string(),
                    reason: rejection.as_str().to_string(),
                })
                .inc();
        }

        fn record_outcome(&self, breaker: &str, success: bool) {
            let outcome = if success { "success" } else { "failure" };
            self.outcomes
                .get_or_create(&OutcomeLabels {
                    breaker: breaker.to_string(),
                    outcome: outcome.to_string(),
                })
                .inc();
        }

        fn record_stale_report(&self, breaker: &str) {
            self.stale_reports
                .get_or_create(&BreakerLabels {
                    breaker: breaker.to_string(),
                })
                .inc();
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use prometheus_client::encoding::text::encode;

        #[test]
        fn transitions_are_exported() {
            let mut registry = Registry::default();
            let sink = PrometheusSink::new(&mut registry);
            sink.record_state_transition("db", State::Closed, State::Open);
            sink.record_rejection("db", Rejection::OpenState);

            let mut out = String::new();
            encode(&mut out, &registry).unwrap();
            assert!(out.contains("circuit_breaker_transitions_total"));
            assert!(out.contains("from=\"closed\""));
            assert!(out.contains("reason=\"open\""));
        }
    }
}
