//! Error types for the circuit breaker library.

use std::error::Error;
use std::fmt::{self, Display, Formatter};

/// Result type for operations executed through a circuit breaker.
pub type BreakerResult<T, E> = Result<T, BreakerError<E>>;

/// Reason an admission check refused a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rejection {
    /// The circuit has tripped and its cooldown has not elapsed.
    OpenState,

    /// The circuit is half-open and its probe budget is spent.
    TooManyRequests,
}

impl Rejection {
    /// Stable name of the rejection reason, suitable for metric labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            Rejection::OpenState => "open",
            Rejection::TooManyRequests => "too_many_requests",
        }
    }
}

/// Error type for operations executed through a circuit breaker.
#[derive(Debug)]
pub enum BreakerError<E> {
    /// The circuit is open, calls are not permitted.
    OpenState,

    /// The circuit is half-open and no probes are left in this generation.
    TooManyRequests,

    /// The underlying operation failed.
    Operation(E),
}

impl<E> BreakerError<E> {
    /// Returns the rejection reason, if the operation never ran.
    pub fn rejection(&self) -> Option<Rejection> {
        match self {
            BreakerError::OpenState => Some(Rejection::OpenState),
            BreakerError::TooManyRequests => Some(Rejection::TooManyRequests),
            BreakerError::Operation(_) => None,
        }
    }

    /// Returns the operation error, if the operation ran and failed.
    pub fn into_operation(self) -> Option<E> {
        match self {
            BreakerError::Operation(e) => Some(e),
            _ => None,
        }
    }
}

impl<E> From<Rejection> for BreakerError<E> {
    fn from(rejection: Rejection) -> Self {
        match rejection {
            Rejection::OpenState => BreakerError::OpenState,
            Rejection::TooManyRequests => BreakerError::TooManyRequests,
        }
    }
}

impl Display for Rejection {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::OpenState => write!(f, "circuit breaker is open"),
            Rejection::TooManyRequests => write!(f, "too many requests"),
        }
    }
}

impl<E> Display for BreakerError<E>
where
    E: Display,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            BreakerError::OpenState => Display::fmt(&Rejection::OpenState, f),
            BreakerError::TooManyRequests => Display::fmt(&Rejection::TooManyRequests, f),
            BreakerError::Operation(e) => write!(f, "Operation error: {}", e),
        }
    }
}

impl Error for Rejection {}

impl<E: Error + 'static> Error for BreakerError<E> {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            BreakerError::OpenState | BreakerError::TooManyRequests => None,
            BreakerError::Operation(e) => Some(e),
        }
    }
}
