//! Named breakers shared across callers of the same dependency.

use ahash::AHashMap;
use parking_lot::RwLock;

use crate::breaker::CircuitBreaker;
use crate::policy::{DefaultPolicy, TripPolicy};

/// A map from dependency name to its circuit breaker.
///
/// Every caller asking for the same name gets a clone of the same breaker,
/// so they all share one state machine.
pub struct BreakerRegistry<P = DefaultPolicy>
where
    P: TripPolicy,
{
    breakers: RwLock<AHashMap<String, CircuitBreaker<P>>>,
}

impl<P> Default for BreakerRegistry<P>
where
    P: TripPolicy,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<P> BreakerRegistry<P>
where
    P: TripPolicy,
{
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            breakers: RwLock::new(AHashMap::new()),
        }
    }

    /// Returns the breaker registered under `name`, creating it with `make`
    /// if there is none. `make` runs at most once per name.
    pub fn get_or_insert_with<F>(&self, name: &str, make: F) -> CircuitBreaker<P>
    where
        F: FnOnce() -> CircuitBreaker<P>,
    {
        if let Some(breaker) = self.breakers.read().get(name) {
            return breaker.clone();
        }

        self.breakers
            .write()
            .entry(name.to_string())
            .or_insert_with(make)
            .clone()
    }

    /// Returns the breaker registered under `name`.
    pub fn get(&self, name: &str) -> Option<CircuitBreaker<P>> {
        self.breakers.read().get(name).cloned()
    }

    /// Removes and returns the breaker registered under `name`.
    pub fn remove(&self, name: &str) -> Option<CircuitBreaker<P>> {
        self.breakers.write().remove(name)
    }

    /// Names of all registered breakers, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.breakers.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of registered breakers.
    pub fn len(&self) -> usize {
        self.breakers.read().len()
    }

    /// Whether no breaker is registered.
    pub fn is_empty(&self) -> bool {
        self.breakers.read().is_empty()
    }
}
