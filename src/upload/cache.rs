//! Idle upload buffer cache.
//!
//! Buffers land here still mapped after a `MapAndCache` completes, so the
//! next `acquire` for the same descriptor skips both creation and the map.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use super::buffer::UploadBuffer;
use super::desc::UploadBufferDesc;
use crate::sync::mutex::Mutex;

/// Mapped, idle buffers keyed by descriptor; FIFO per key.
#[derive(Default)]
pub struct BufferCache {
    idle: Mutex<HashMap<UploadBufferDesc, VecDeque<Arc<UploadBuffer>>>>,
    /// Per-descriptor cap; 0 means unbounded
    max_per_desc: usize,
}

impl BufferCache {
    /// Create a cache holding at most `max_per_desc` buffers per descriptor.
    pub fn new(max_per_desc: usize) -> Self {
        Self {
            idle: Mutex::new(HashMap::new()),
            max_per_desc,
        }
    }

    /// Take the oldest idle buffer for `desc`.
    pub fn take(&self, desc: &UploadBufferDesc) -> Option<Arc<UploadBuffer>> {
        let mut idle = self.idle.lock();
        let queue = idle.get_mut(desc)?;
        let buffer = queue.pop_front();
        if queue.is_empty() {
            idle.remove(desc);
        }
        buffer
    }

    /// Store an idle buffer.
    ///
    /// Returns the buffer back when the descriptor's slot is full; the caller
    /// decides what to do with it (normally: drop it).
    pub fn put(&self, buffer: Arc<UploadBuffer>) -> Result<(), Arc<UploadBuffer>> {
        let mut idle = self.idle.lock();
        let queue = idle.entry(*buffer.desc()).or_default();
        if self.max_per_desc != 0 && queue.len() >= self.max_per_desc {
            return Err(buffer);
        }
        queue.push_back(buffer);
        Ok(())
    }

    /// Total idle buffers.
    pub fn len(&self) -> usize {
        self.idle.lock().values().map(VecDeque::len).sum()
    }

    /// Whether no buffer is idle.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Idle buffers for one descriptor.
    pub fn idle_count(&self, desc: &UploadBufferDesc) -> usize {
        self.idle.lock().get(desc).map_or(0, VecDeque::len)
    }

    /// Remove everything, grouped by descriptor.
    pub fn drain(&self) -> Vec<(UploadBufferDesc, Vec<Arc<UploadBuffer>>)> {
        std::mem::take(&mut *self.idle.lock())
            .into_iter()
            .map(|(desc, queue)| (desc, queue.into_iter().collect()))
            .collect()
    }
}
