//! Re-exports common types for convenient usage.
//!
//! # Example
//! ```rust,no_run
//! use twostep_breaker::prelude::*;
//!
//! let breaker = CircuitBreaker::new(Settings::new("payments"));
//! if let Ok(permit) = breaker.before_request() {
//!     breaker.on_success(permit);
//! }
//! ```

pub use crate::breaker::{CircuitBreaker, Permit};
pub use crate::config::Settings;
pub use crate::error::{BreakerError, BreakerResult, Rejection};
pub use crate::policy::TripPolicy;
pub use crate::state::{Counts, State};
