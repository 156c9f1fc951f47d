//! # twostep-breaker
//!
//! A concurrency-safe Circuit Breaker state machine with a two-phase
//! "reserve, then report" protocol.
//!
//! The breaker never runs the guarded operation itself. Callers ask for a
//! [`Permit`] before doing work and hand it back with the outcome. Each permit
//! is stamped with the breaker's generation, so outcomes that arrive after the
//! breaker has moved on are dropped instead of polluting the new counts.
//!
//! ## States
//!
//! - **Closed**: Normal operation. Failures are counted against a trip policy,
//!   and counts are optionally cleared every `interval`.
//! - **Open**: Requests are rejected with [`Rejection::OpenState`] until
//!   `timeout` has elapsed.
//! - **Half-Open**: Up to `max_requests` probes are admitted. Further requests
//!   get [`Rejection::TooManyRequests`]. One failed probe reopens the circuit,
//!   `max_requests` consecutive successes close it.
//!
//! Time-based transitions are resolved lazily whenever the breaker is touched;
//! there is no background timer.
//!
//! ## Basic Usage
//!
//! ```rust
//! use std::time::Duration;
//! use twostep_breaker::{CircuitBreaker, Rejection, State};
//!
//! let breaker = CircuitBreaker::builder()
//!     .name("inventory")
//!     .max_requests(2)
//!     .timeout(Duration::from_secs(30))
//!     .ready_to_trip_fn(|counts| counts.consecutive_failures >= 3)
//!     .build();
//!
//! match breaker.before_request() {
//!     Ok(permit) => {
//!         // Perform the remote call, then report exactly one outcome.
//!         let call_succeeded = true;
//!         if call_succeeded {
//!             breaker.on_success(permit);
//!         } else {
//!             breaker.on_failure(permit);
//!         }
//!     }
//!     Err(Rejection::OpenState) => println!("dependency unavailable"),
//!     Err(Rejection::TooManyRequests) => println!("recovery probe in flight"),
//! }
//!
//! assert_eq!(breaker.state(), State::Closed);
//! ```
//!
//! ## Wrapping a call
//!
//! ```rust
//! use twostep_breaker::{BreakerError, CircuitBreaker, Settings};
//!
//! let breaker = CircuitBreaker::new(Settings::new("inventory"));
//!
//! match breaker.call(|| "42".parse::<u32>()) {
//!     Ok(value) => println!("got {}", value),
//!     Err(BreakerError::Operation(err)) => println!("call failed: {}", err),
//!     Err(err) => println!("rejected: {}", err),
//! }
//! ```
//!
//! ## Features
//!
//! - `async` - `call_async` for futures
//! - `prometheus` - Prometheus metrics integration
//! - `tracing` - Tracing integration

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod breaker;
mod clock;
mod config;
mod error;
mod hook;
mod metrics;
pub mod policy;
pub mod prelude;
mod registry;
mod state;

// Re-exports
pub use breaker::{CircuitBreaker, Permit};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{BreakerBuilder, Settings, DEFAULT_MAX_REQUESTS, DEFAULT_TIMEOUT};
pub use error::{BreakerError, BreakerResult, Rejection};
pub use hook::HookRegistry;
#[cfg(feature = "prometheus")]
pub use metrics::PrometheusSink;
pub use metrics::{MetricSink, NullMetricSink};
pub use policy::{ConsecutiveFailures, DefaultPolicy, FailureRatio, TripPolicy};
pub use registry::BreakerRegistry;
pub use state::{Counts, ParseStateError, State};
