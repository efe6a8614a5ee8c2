//! Deferred destruction queue.
//!
//! Objects released while the GPU may still reference them are pushed here
//! with the completion value that makes them safe to drop. Pushes are
//! lock-free from any thread; [`purge`](DeferredReleaseQueue::purge) runs on
//! whichever thread owns device maintenance.

use crossbeam_queue::SegQueue;

use super::traits::StaleObject;
use crate::sync::mutex::Mutex;

/// An object waiting for the GPU.
struct DeferredRelease {
    readiness_target: u64,
    object: Box<dyn StaleObject>,
}

/// Lock-free intake plus a readiness-checked holding list.
#[derive(Default)]
pub struct DeferredReleaseQueue {
    /// New releases, in submission order
    incoming: SegQueue<DeferredRelease>,

    /// Releases seen by a purge but not yet ready
    waiting: Mutex<Vec<DeferredRelease>>,
}

impl DeferredReleaseQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `object` for destruction once `readiness_target` is reached.
    pub fn push(&self, object: Box<dyn StaleObject>, readiness_target: u64) {
        self.incoming.push(DeferredRelease {
            readiness_target,
            object,
        });
    }

    /// Drop every object whose target is `<= last_completed`.
    ///
    /// Returns how many objects were destroyed. Objects are dropped outside
    /// the queue's lock, so their destructors may take other locks freely.
    pub fn purge(&self, last_completed: u64) -> usize {
        let ready = {
            let mut waiting = self.waiting.lock();
            while let Some(release) = self.incoming.pop() {
                waiting.push(release);
            }

            let (ready, pending): (Vec<_>, Vec<_>) = std::mem::take(&mut *waiting)
                .into_iter()
                .partition(|r| r.readiness_target <= last_completed);
            *waiting = pending;
            ready
        };

        let count = ready.len();
        drop(ready);
        count
    }

    /// Drop everything regardless of readiness.
    ///
    /// Only valid once the device is idle (e.g. at shutdown).
    pub fn purge_all(&self) -> usize {
        self.purge(u64::MAX)
    }

    /// Approximate number of objects waiting.
    pub fn len(&self) -> usize {
        self.incoming.len() + self.waiting.lock().len()
    }

    /// Whether nothing is waiting.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
