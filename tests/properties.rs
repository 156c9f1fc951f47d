use proptest::prelude::*;
use std::time::Duration;
use twostep_breaker::{CircuitBreaker, ManualClock, Permit, Rejection, State};

#[derive(Debug, Clone)]
enum Op {
    Request,
    Success(usize),
    Failure(usize),
    Advance(u64),
    Inspect,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => Just(Op::Request),
        3 => any::<usize>().prop_map(Op::Success),
        3 => any::<usize>().prop_map(Op::Failure),
        1 => (0u64..3_000).prop_map(Op::Advance),
        1 => Just(Op::Inspect),
    ]
}

proptest! {
    #[test]
    fn counts_stay_consistent(
        max_requests in 1u32..4,
        trip_after in 1u32..4,
        ops in prop::collection::vec(op(), 1..200),
    ) {
        let clock = ManualClock::new();
        let breaker = CircuitBreaker::builder()
            .max_requests(max_requests)
            .interval(Duration::from_millis(2_500))
            .timeout(Duration::from_secs(1))
            .ready_to_trip_fn(move |counts| counts.consecutive_failures >= trip_after)
            .clock(clock.clone())
            .build();

        let mut outstanding: Vec<Permit> = Vec::new();

        for op in ops {
            match op {
                Op::Request => {
                    let state = breaker.state();
                    match breaker.before_request() {
                        Ok(permit) => {
                            prop_assert_ne!(state, State::Open);
                            outstanding.push(permit);
                        }
                        Err(Rejection::OpenState) => prop_assert_eq!(breaker.state(), State::Open),
                        Err(Rejection::TooManyRequests) => {
                            prop_assert_eq!(breaker.state(), State::HalfOpen);
                            prop_assert!(breaker.counts().requests >= max_requests);
                        }
                    }
                }
                Op::Success(i) if !outstanding.is_empty() => {
                    let permit = outstanding.swap_remove(i % outstanding.len());
                    breaker.on_success(permit);
                }
                Op::Failure(i) if !outstanding.is_empty() => {
                    let permit = outstanding.swap_remove(i % outstanding.len());
                    breaker.on_failure(permit);
                }
                Op::Advance(ms) => clock.advance(Duration::from_millis(ms)),
                _ => {
                    breaker.state();
                }
            }

            let counts = breaker.counts();
            prop_assert!(counts.consecutive_successes == 0 || counts.consecutive_failures == 0);
            prop_assert!(counts.total_successes + counts.total_failures <= counts.requests);
            if breaker.state() == State::HalfOpen {
                prop_assert!(counts.requests <= max_requests);
            }
        }
    }

    #[test]
    fn stale_permits_never_count(failures in 1usize..20) {
        let clock = ManualClock::new();
        let breaker = CircuitBreaker::builder()
            .interval(Duration::from_secs(1))
            .ready_to_trip_fn(|counts| counts.total_failures >= 1)
            .clock(clock.clone())
            .build();

        let permits: Vec<Permit> = (0..failures)
            .map(|_| breaker.before_request().unwrap())
            .collect();
        clock.advance(Duration::from_secs(2));
        prop_assert_eq!(breaker.state(), State::Closed);

        for permit in permits {
            breaker.on_failure(permit);
        }
        prop_assert_eq!(breaker.state(), State::Closed);
        prop_assert_eq!(breaker.counts().total_failures, 0);
    }
}
