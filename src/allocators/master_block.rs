//! Master block pool.
//!
//! Per-caller heaps would contend on the arena lock for every small
//! allocation. Instead they take large *master blocks* from a shared pool
//! and sub-allocate inside them without locking. The pool owns the only
//! lock; a block is handed back once per frame, not once per allocation.
//!
//! Returning a block is never immediate. The GPU may still be reading it,
//! so the block is either parked with the device until a completion value
//! is reached (free-list pools) or tagged into the current ring frame
//! (ring pools).

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::free_list::FreeListRangeAllocator;
use super::range::{AllocError, Range, RangeAllocator};
use super::ring::RingRangeAllocator;
use crate::api::stats::HeapStats;
use crate::gpu::traits::RenderDevice;
use crate::sync::atomics::{AtomicCounter, PeakGauge};
use crate::sync::mutex::Mutex;

#[cfg(feature = "debug")]
use crate::debug::backtrace::BlockTraceTracker;

static NEXT_POOL_ID: AtomicU64 = AtomicU64::new(1);

/// State shared between a pool's handles and its stale blocks.
struct PoolShared<A: RangeAllocator> {
    id: u64,
    allocator: Mutex<A>,
    outstanding: PeakGauge,
    total: AtomicCounter,
    #[cfg(feature = "debug")]
    traces: BlockTraceTracker,
}

impl<A: RangeAllocator> PoolShared<A> {
    fn block_returned(&self, range: Range) {
        self.outstanding.sub(1);
        #[cfg(feature = "debug")]
        self.traces.remove(range);
        #[cfg(not(feature = "debug"))]
        let _ = range;
    }
}

impl<A: RangeAllocator> Drop for PoolShared<A> {
    fn drop(&mut self) {
        let outstanding = self.outstanding.get();
        if outstanding == 0 || !cfg!(debug_assertions) || std::thread::panicking() {
            return;
        }

        #[cfg(feature = "debug")]
        let context = format!("{} block(s) outstanding\n{}", outstanding, self.traces.report());
        #[cfg(not(feature = "debug"))]
        let context = format!("{} block(s) outstanding", outstanding);

        crate::sa_fatal!(SA103, "{}", context);
    }
}

/// A range of the pool arena owned by exactly one holder.
///
/// Not `Clone`: the only ways to give it up are the pool's release paths.
#[must_use = "a master block that is dropped instead of released leaks its range"]
#[derive(Debug, PartialEq, Eq)]
pub struct MasterBlock {
    range: Range,
    pool_id: u64,
}

impl MasterBlock {
    /// The block's byte range in the pool arena.
    pub fn range(&self) -> Range {
        self.range
    }

    /// Offset of the block in the pool arena.
    pub fn offset(&self) -> u64 {
        self.range.offset
    }

    /// Size of the block in bytes.
    pub fn size(&self) -> u64 {
        self.range.size
    }
}

/// Shared pool of master blocks over one range allocator.
///
/// Cloning is cheap and yields another handle to the same pool.
pub struct MasterBlockPool<A: RangeAllocator> {
    shared: Arc<PoolShared<A>>,
}

impl<A: RangeAllocator> Clone for MasterBlockPool<A> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<A: RangeAllocator> MasterBlockPool<A> {
    /// Create a pool over `allocator`.
    pub fn new(allocator: A) -> Self {
        Self {
            shared: Arc::new(PoolShared {
                id: NEXT_POOL_ID.fetch_add(1, Ordering::Relaxed),
                allocator: Mutex::new(allocator),
                outstanding: PeakGauge::new(),
                total: AtomicCounter::new(0),
                #[cfg(feature = "debug")]
                traces: BlockTraceTracker::new(),
            }),
        }
    }

    /// Allocate a master block of `size` bytes aligned to `alignment`.
    pub fn allocate_master_block(&self, size: u64, alignment: u64) -> Result<MasterBlock, AllocError> {
        let range = self.shared.allocator.lock().allocate(size, alignment)?;

        self.shared.outstanding.add(1);
        self.shared.total.increment();
        #[cfg(feature = "debug")]
        self.shared.traces.record(range);

        Ok(MasterBlock {
            range,
            pool_id: self.shared.id,
        })
    }

    /// Arena size in bytes.
    pub fn size(&self) -> u64 {
        self.shared.allocator.lock().capacity()
    }

    /// Bytes not available for allocation, including blocks awaiting the GPU.
    pub fn used_size(&self) -> u64 {
        self.shared.allocator.lock().used_size()
    }

    /// Blocks allocated and not yet returned to the allocator.
    pub fn outstanding_blocks(&self) -> u64 {
        self.shared.outstanding.get()
    }

    /// Get current statistics.
    pub fn stats(&self) -> HeapStats {
        let (capacity, used) = {
            let allocator = self.shared.allocator.lock();
            (allocator.capacity(), allocator.used_size())
        };
        HeapStats {
            capacity,
            used,
            outstanding_blocks: self.shared.outstanding.get(),
            peak_outstanding_blocks: self.shared.outstanding.peak(),
            total_blocks_allocated: self.shared.total.get(),
        }
    }

    fn check_owner(&self, block: &MasterBlock) {
        if block.pool_id != self.shared.id {
            crate::sa_fatal!(
                SA102,
                "{:?} from pool {} released to pool {}",
                block.range,
                block.pool_id,
                self.shared.id
            );
        }
    }
}

impl<A: RangeAllocator> fmt::Debug for MasterBlockPool<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MasterBlockPool")
            .field("id", &self.shared.id)
            .field("stats", &self.stats())
            .finish()
    }
}

/// A released block parked with the device until the GPU is done with it.
///
/// Dropping it returns the range to the pool.
struct StaleMasterBlock {
    range: Range,
    pool: Arc<PoolShared<FreeListRangeAllocator>>,
}

impl Drop for StaleMasterBlock {
    fn drop(&mut self) {
        self.pool.allocator.lock().free(self.range);
        self.pool.block_returned(self.range);
    }
}

impl MasterBlockPool<FreeListRangeAllocator> {
    /// Create a free-list pool over an arena of `capacity` bytes.
    pub fn free_list(capacity: u64) -> Self {
        Self::new(FreeListRangeAllocator::new(capacity))
    }

    /// Hand blocks back once the GPU reaches `completion_target`.
    ///
    /// Each block goes to `device` as a stale object; its range becomes
    /// allocatable again only when the device destroys it.
    ///
    /// # Panics
    ///
    /// Releasing a block that came from another pool is fatal.
    pub fn release_master_blocks<D: RenderDevice + ?Sized>(
        &self,
        blocks: impl IntoIterator<Item = MasterBlock>,
        device: &D,
        completion_target: u64,
    ) {
        for block in blocks {
            self.check_owner(&block);
            let stale = StaleMasterBlock {
                range: block.range,
                pool: self.shared.clone(),
            };
            device.defer_destruction(Box::new(stale), completion_target);
        }
    }
}

impl MasterBlockPool<RingRangeAllocator> {
    /// Create a ring pool over an arena of `capacity` bytes.
    pub fn ring(capacity: u64) -> Self {
        Self::new(RingRangeAllocator::new(capacity))
    }

    /// Give up blocks and close the current ring frame with
    /// `completion_target`.
    ///
    /// Everything allocated from the ring since the previous frame closed
    /// becomes reclaimable once [`release_stale_blocks`](Self::release_stale_blocks)
    /// sees the target, so every holder must discard its blocks within the
    /// frame they were allocated in.
    ///
    /// # Panics
    ///
    /// Discarding a block that came from another pool is fatal.
    pub fn discard_master_blocks(
        &self,
        blocks: impl IntoIterator<Item = MasterBlock>,
        completion_target: u64,
    ) {
        for block in blocks {
            self.check_owner(&block);
            self.shared.block_returned(block.range);
        }
        self.shared
            .allocator
            .lock()
            .finish_current_frame(completion_target);
    }

    /// Reclaim ring frames the GPU has finished. Returns bytes reclaimed.
    pub fn release_stale_blocks(&self, last_completed: u64) -> u64 {
        self.shared
            .allocator
            .lock()
            .release_completed_frames(last_completed)
    }
}
