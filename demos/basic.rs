use std::error::Error;
use std::fmt;
use std::thread;
use std::time::Duration;
use twostep_breaker::{CircuitBreaker, Rejection};

// Custom error type that implements Error trait
#[derive(Debug)]
struct ServiceError(String);

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Service error: {}", self.0)
    }
}

impl Error for ServiceError {}

// Fails on calls 4 through 8, succeeds otherwise.
fn call_service(counter: &mut u32) -> Result<String, ServiceError> {
    *counter += 1;
    if (4..=8).contains(counter) {
        Err(ServiceError("External service error".to_string()))
    } else {
        Ok("Success".to_string())
    }
}

fn main() {
    let breaker = CircuitBreaker::builder()
        .name("inventory")
        .max_requests(2)
        .timeout(Duration::from_secs(2))
        .ready_to_trip_fn(|counts| counts.consecutive_failures >= 3)
        .on_state_change(|name, from, to| println!("[{}] {} -> {}", name, from, to))
        .build();

    println!("Circuit initial state: {}", breaker.state());

    let mut calls = 0;
    for attempt in 1..=15 {
        print!("Attempt {}: ", attempt);

        match breaker.before_request() {
            Ok(permit) => match call_service(&mut calls) {
                Ok(result) => {
                    println!("call succeeded with result: {}", result);
                    breaker.on_success(permit);
                }
                Err(err) => {
                    println!("call failed with error: {}", err);
                    breaker.on_failure(permit);
                }
            },
            Err(Rejection::OpenState) => println!("circuit is open, skipping call"),
            Err(Rejection::TooManyRequests) => println!("probe budget spent, skipping call"),
        }

        let counts = breaker.counts();
        println!(
            "  state: {}, requests: {}, failures: {}",
            breaker.state(),
            counts.requests,
            counts.total_failures
        );

        thread::sleep(Duration::from_millis(400));
    }
}
