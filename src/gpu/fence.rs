//! Software completion counter.

use std::sync::{Condvar, Mutex, PoisonError};

use super::traits::CompletionCounter;

/// A monotonic fence value with blocking wait.
///
/// Backends signal it when the GPU retires a submission; the reference
/// device advances it by hand.
#[derive(Debug, Default)]
pub struct FenceCounter {
    completed: Mutex<u64>,
    cvar: Condvar,
}

impl FenceCounter {
    /// Create a counter starting at `initial`.
    pub fn new(initial: u64) -> Self {
        Self {
            completed: Mutex::new(initial),
            cvar: Condvar::new(),
        }
    }

    /// Record that the GPU reached `value`.
    ///
    /// Values below the current one are ignored; the counter never goes back.
    pub fn advance(&self, value: u64) {
        let mut completed = self.completed.lock().unwrap_or_else(PoisonError::into_inner);
        if value > *completed {
            *completed = value;
            self.cvar.notify_all();
        }
    }
}

impl CompletionCounter for FenceCounter {
    fn last_completed(&self) -> u64 {
        *self.completed.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn wait_for(&self, value: u64) {
        let mut completed = self.completed.lock().unwrap_or_else(PoisonError::into_inner);
        while *completed < value {
            completed = self.cvar.wait(completed).unwrap_or_else(PoisonError::into_inner);
        }
    }
}
