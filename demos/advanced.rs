//! Advanced Circuit Breaker Example
//!
//! This example demonstrates:
//! 1. Sharing breakers per dependency through a registry
//! 2. Using a failure-ratio trip policy
//! 3. Using hooks and tracing for monitoring circuit breaker events
//! 4. Handling the two rejection kinds
//!
//! Run with `cargo run --example advanced --features tracing`.

use std::error::Error;
use std::fmt;
use std::thread;
use std::time::Duration;
use twostep_breaker::{
    BreakerError, BreakerRegistry, CircuitBreaker, FailureRatio, HookRegistry, Settings,
};

// Custom error type that implements Error trait
#[derive(Debug)]
struct ServiceError(String);

impl ServiceError {
    fn new(msg: &str) -> Self {
        ServiceError(msg.to_string())
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Service error: {}", self.0)
    }
}

impl Error for ServiceError {}

// A function that simulates an external service with varying failure patterns
fn external_service_call(call_count: &mut u32) -> Result<String, ServiceError> {
    *call_count += 1;

    if *call_count <= 3 {
        Ok("Initial success".to_string())
    } else if *call_count <= 8 {
        Err(ServiceError::new("Service temporarily unavailable"))
    } else {
        Ok("Service recovered".to_string())
    }
}

fn pricing_breaker() -> CircuitBreaker<FailureRatio> {
    let hooks = HookRegistry::new();
    hooks.set_on_state_change(|name, from, to| println!("[{}] circuit {} -> {}", name, from, to));
    hooks.set_on_rejected(|name, reason| println!("[{}] rejected: {}", name, reason));

    CircuitBreaker::builder()
        .settings(Settings {
            max_requests: 2,
            interval: Duration::from_secs(10),
            timeout: Duration::from_secs(1),
            ..Settings::new("pricing")
        })
        .ready_to_trip(FailureRatio::new(0.6, 5))
        .hooks(hooks)
        .build()
}

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    println!("=== Advanced Circuit Breaker Example ===\n");

    let registry = BreakerRegistry::new();
    let mut call_count = 0;

    for attempt in 1..=20 {
        let breaker = registry.get_or_insert_with("pricing", pricing_breaker);

        match breaker.call(|| external_service_call(&mut call_count)) {
            Ok(result) => println!("Attempt {}: {}", attempt, result),
            Err(BreakerError::Operation(err)) => println!("Attempt {}: {}", attempt, err),
            Err(BreakerError::OpenState) => println!("Attempt {}: skipped, circuit open", attempt),
            Err(BreakerError::TooManyRequests) => {
                println!("Attempt {}: skipped, probe in flight", attempt)
            }
        }

        thread::sleep(Duration::from_millis(250));
    }

    println!("\nRegistered breakers: {:?}", registry.names());
}
