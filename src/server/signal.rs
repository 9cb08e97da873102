//! One-shot latch for the start/stop handshake

use std::sync::{Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// A value delivered once from one thread and awaited by another
///
/// The first `signal` wins; later calls are ignored. `wait_timeout` takes
/// the value, so each latch serves exactly one handshake.
#[derive(Debug)]
pub struct OneShot<T> {
    value: Mutex<Option<T>>,
    fired: Mutex<bool>,
    ready: Condvar,
}

impl<T> Default for OneShot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> OneShot<T> {
    pub fn new() -> Self {
        OneShot {
            value: Mutex::new(None),
            fired: Mutex::new(false),
            ready: Condvar::new(),
        }
    }

    /// Deliver `value` and wake the waiter
    ///
    /// Returns false if the latch had already fired.
    pub fn signal(&self, value: T) -> bool {
        let mut fired = self.fired.lock().unwrap_or_else(PoisonError::into_inner);
        if *fired {
            return false;
        }
        *fired = true;
        *self.value.lock().unwrap_or_else(PoisonError::into_inner) = Some(value);
        drop(fired);

        self.ready.notify_all();
        true
    }

    /// True once `signal` has been called
    pub fn is_signaled(&self) -> bool {
        *self.fired.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Wait up to `timeout` for the value
    ///
    /// `None` means the latch did not fire in time, or its value was
    /// already taken by an earlier wait.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<T> {
        let deadline = Instant::now() + timeout;
        let mut fired = self.fired.lock().unwrap_or_else(PoisonError::into_inner);

        while !*fired {
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            let (guard, _) = self
                .ready
                .wait_timeout(fired, deadline - now)
                .unwrap_or_else(PoisonError::into_inner);
            fired = guard;
        }
        drop(fired);

        self.value.lock().unwrap_or_else(PoisonError::into_inner).take()
    }
}
