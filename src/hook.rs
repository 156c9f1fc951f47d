//! Hook registry for circuit breaker events.

use crate::error::Rejection;
use crate::state::State;
use parking_lot::RwLock;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

type StateChangeFn = Arc<dyn Fn(&str, State, State) + Send + Sync + 'static>;
type RejectedFn = Arc<dyn Fn(&str, Rejection) + Send + Sync + 'static>;

/// A registry for circuit breaker event hooks.
///
/// Hooks run synchronously on the calling thread after the breaker has
/// released its lock, so they may inspect the breaker. A panicking hook is
/// contained and does not affect the breaker.
pub struct HookRegistry {
    on_state_change: RwLock<Option<StateChangeFn>>,
    on_rejected: RwLock<Option<RejectedFn>>,
}

impl Default for HookRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookRegistry")
            .field("on_state_change", &self.on_state_change.read().is_some())
            .field("on_rejected", &self.on_rejected.read().is_some())
            .finish()
    }
}

impl HookRegistry {
    /// Creates a new empty hook registry.
    pub fn new() -> Self {
        Self {
            on_state_change: RwLock::new(None),
            on_rejected: RwLock::new(None),
        }
    }

    /// Sets the hook called with `(name, from, to)` whenever the state changes.
    pub fn set_on_state_change<F>(&self, f: F)
    where
        F: Fn(&str, State, State) + Send + Sync + 'static,
    {
        *self.on_state_change.write() = Some(Arc::new(f));
    }

    /// Sets the hook called whenever an admission check refuses a request.
    pub fn set_on_rejected<F>(&self, f: F)
    where
        F: Fn(&str, Rejection) + Send + Sync + 'static,
    {
        *self.on_rejected.write() = Some(Arc::new(f));
    }

    /// Copies hooks from `other` into the slots this registry leaves empty.
    pub(crate) fn inherit_from(&self, other: &HookRegistry) {
        let mut on_state_change = self.on_state_change.write();
        if on_state_change.is_none() {
            *on_state_change = other.on_state_change.read().clone();
        }
        let mut on_rejected = self.on_rejected.write();
        if on_rejected.is_none() {
            *on_rejected = other.on_rejected.read().clone();
        }
    }

    pub(crate) fn execute_state_change_hook(&self, name: &str, from: State, to: State) {
        // Clone out so the hook runs without holding the registry lock.
        let hook = self.on_state_change.read().clone();
        if let Some(hook) = hook {
            guarded(name, "on_state_change", || hook(name, from, to));
        }
    }

    pub(crate) fn execute_rejected_hook(&self, name: &str, rejection: Rejection) {
        let hook = self.on_rejected.read().clone();
        if let Some(hook) = hook {
            guarded(name, "on_rejected", || hook(name, rejection));
        }
    }
}

fn guarded<F: FnOnce()>(name: &str, hook: &str, f: F) {
    if panic::catch_unwind(AssertUnwindSafe(f)).is_err() {
        #[cfg(feature = "tracing")]
        tracing::error!(breaker = name, hook, "circuit breaker hook panicked");
        #[cfg(not(feature = "tracing"))]
        let _ = (name, hook);
    }
}
