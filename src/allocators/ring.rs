//! Ring allocator - FIFO circular byte-range allocation over a fixed arena.
//!
//! Allocation is a head bump. Memory is never freed individually: the owner
//! closes each logical frame with the completion value the GPU will reach
//! once it is done with that frame, and later reclaims every frame whose
//! value has been reached.
//!
//! ```text
//!  tail <= head:  [          tail###########head          ]
//!  head <  tail:  [#####head              tail############]
//! ```

use std::collections::VecDeque;

use super::range::{check_request, AllocError, Range, RangeAllocator};
use crate::util::align::align_up;

/// Allocation head at the moment a frame was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameBoundary {
    /// Head offset when the frame closed. Becomes the new tail on reclaim.
    pub offset: u64,
    /// Completion value that makes the frame reclaimable.
    pub completion_value: u64,
    /// Bytes consumed by the frame, including padding and skipped tail bytes.
    pub size: u64,
}

/// Circular allocator with frame-granular reclamation.
///
/// Not internally synchronized; [`MasterBlockPool`](super::master_block::MasterBlockPool)
/// wraps it in a single lock. Every operation is O(1) except
/// [`release_completed_frames`](Self::release_completed_frames), which is
/// O(frames reclaimed).
#[derive(Debug)]
pub struct RingRangeAllocator {
    /// Total capacity in bytes
    capacity: u64,

    /// Next allocation position
    head: u64,

    /// Oldest byte still in use
    tail: u64,

    /// Bytes in use, including padding and wrapped-over tail bytes
    used: u64,

    /// Bytes consumed since the last closed frame
    current_frame_size: u64,

    /// Closed frames awaiting completion, oldest first
    boundaries: VecDeque<FrameBoundary>,
}

impl RingRangeAllocator {
    /// Create a ring over an arena of `capacity` bytes.
    pub fn new(capacity: u64) -> Self {
        Self {
            capacity,
            head: 0,
            tail: 0,
            used: 0,
            current_frame_size: 0,
            boundaries: VecDeque::new(),
        }
    }

    /// Close the current frame, tagging everything allocated since the
    /// previous boundary with `completion_value`.
    pub fn finish_current_frame(&mut self, completion_value: u64) {
        debug_assert!(
            self.boundaries
                .back()
                .map_or(true, |last| last.completion_value <= completion_value),
            "frame completion values must not decrease"
        );

        self.boundaries.push_back(FrameBoundary {
            offset: self.head,
            completion_value,
            size: self.current_frame_size,
        });
        self.current_frame_size = 0;
    }

    /// Reclaim every closed frame whose completion value is `<= last_completed`.
    ///
    /// Frames are reclaimed strictly in the order they were closed. Returns
    /// the number of bytes made available again.
    pub fn release_completed_frames(&mut self, last_completed: u64) -> u64 {
        let mut reclaimed = 0;

        while let Some(frame) = self.boundaries.front() {
            if frame.completion_value > last_completed {
                break;
            }
            self.tail = frame.offset;
            self.used = match self.used.checked_sub(frame.size) {
                Some(used) => used,
                None => crate::sa_fatal!(SA901, "ring frame of {} bytes exceeds {} used", frame.size, self.used),
            };
            reclaimed += frame.size;
            self.boundaries.pop_front();
        }

        if self.used == 0 && self.boundaries.is_empty() {
            self.head = 0;
            self.tail = 0;
        }

        reclaimed
    }

    /// Bytes available for allocation, ignoring alignment and wrap losses.
    pub fn free_size(&self) -> u64 {
        self.capacity - self.used
    }

    /// Whether nothing is in use.
    pub fn is_empty(&self) -> bool {
        self.used == 0
    }

    /// Whether every byte is in use.
    pub fn is_full(&self) -> bool {
        self.used == self.capacity
    }

    /// Number of closed frames not yet reclaimed.
    pub fn pending_frames(&self) -> usize {
        self.boundaries.len()
    }

    /// Bytes consumed by the still-open frame.
    pub fn current_frame_size(&self) -> u64 {
        self.current_frame_size
    }

    fn commit(&mut self, offset: u64, size: u64, consumed: u64) -> Range {
        self.head = offset + size;
        self.used += consumed;
        self.current_frame_size += consumed;
        Range::new(offset, size)
    }
}

impl RangeAllocator for RingRangeAllocator {
    fn allocate(&mut self, size: u64, alignment: u64) -> Result<Range, AllocError> {
        check_request(size, alignment)?;

        if self.is_full() {
            return Err(AllocError::Exhausted);
        }

        let aligned = align_up(self.head, alignment);
        let end = aligned.checked_add(size).ok_or(AllocError::Exhausted)?;

        if self.head >= self.tail {
            if end <= self.capacity {
                let consumed = end - self.head;
                return Ok(self.commit(aligned, size, consumed));
            }

            // Skip the tail of the arena and restart at offset 0.
            if size <= self.tail {
                let consumed = (self.capacity - self.head) + size;
                return Ok(self.commit(0, size, consumed));
            }
        } else if end <= self.tail {
            let consumed = end - self.head;
            return Ok(self.commit(aligned, size, consumed));
        }

        Err(AllocError::Exhausted)
    }

    fn capacity(&self) -> u64 {
        self.capacity
    }

    fn used_size(&self) -> u64 {
        self.used
    }
}
