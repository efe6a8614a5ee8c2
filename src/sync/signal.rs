//! Binary thread signal.
//!
//! A [`SignalGate`] lets a producer thread sleep until the pump thread has
//! finished a specific pipeline stage for one upload buffer. It is an event,
//! not a lock: once triggered, every current and future waiter passes
//! straight through until the gate is reset.

use std::sync::{Condvar, Mutex, PoisonError};

/// A single binary event with blocking wait.
///
/// # Example
///
/// ```
/// use stagealloc::SignalGate;
/// use std::sync::Arc;
///
/// let gate = Arc::new(SignalGate::new());
/// let waiter = {
///     let gate = gate.clone();
///     std::thread::spawn(move || gate.wait())
/// };
/// gate.trigger();
/// waiter.join().unwrap();
/// assert!(gate.is_triggered());
/// ```
#[derive(Debug, Default)]
pub struct SignalGate {
    signaled: Mutex<bool>,
    cvar: Condvar,
}

impl SignalGate {
    /// Create a gate in the non-signaled state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the signaled state and wake all waiters. Idempotent.
    pub fn trigger(&self) {
        let mut signaled = self.signaled.lock().unwrap_or_else(PoisonError::into_inner);
        *signaled = true;
        self.cvar.notify_all();
    }

    /// Block until the gate is signaled.
    ///
    /// Returns immediately if it already is.
    pub fn wait(&self) {
        let mut signaled = self.signaled.lock().unwrap_or_else(PoisonError::into_inner);
        while !*signaled {
            signaled = self.cvar.wait(signaled).unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Clear the signaled state.
    ///
    /// Must not race with a concurrent [`wait`](Self::wait): a waiter that has
    /// not yet observed the trigger would sleep until the next one.
    pub fn reset(&self) {
        *self.signaled.lock().unwrap_or_else(PoisonError::into_inner) = false;
    }

    /// Non-blocking poll.
    pub fn is_triggered(&self) -> bool {
        *self.signaled.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_wait_returns_when_already_triggered() {
        let gate = SignalGate::new();
        gate.trigger();
        gate.trigger();
        gate.wait();
        assert!(gate.is_triggered());
    }

    #[test]
    fn test_reset_clears_state() {
        let gate = SignalGate::new();
        gate.trigger();
        gate.reset();
        assert!(!gate.is_triggered());
    }

    #[test]
    fn test_trigger_wakes_all_waiters() {
        let gate = Arc::new(SignalGate::new());
        let woken = Arc::new(AtomicUsize::new(0));

        let waiters: Vec<_> = (0..4)
            .map(|_| {
                let gate = gate.clone();
                let woken = woken.clone();
                thread::spawn(move || {
                    gate.wait();
                    woken.fetch_add(1, Ordering::SeqCst);
                })
            })
            .collect();

        gate.trigger();
        for waiter in waiters {
            waiter.join().expect("waiter panicked");
        }
        assert_eq!(woken.load(Ordering::SeqCst), 4);
    }
}
