//! Dynamic heap - per-caller linear allocation over master blocks.
//!
//! Each device context (or any other single-threaded producer) owns one
//! heap. Small transient allocations bump a cursor inside the current master
//! block; only running off the end of a block touches the shared pool. At
//! frame end the owner hands every block back in one call.

use super::free_list::FreeListRangeAllocator;
use super::master_block::{MasterBlock, MasterBlockPool};
use super::range::{check_request, AllocError, RangeAllocator};
use super::ring::RingRangeAllocator;
use crate::api::config::HeapConfig;
use crate::api::stats::DynamicHeapStats;
use crate::diagnostics::macros::sa_info;
use crate::gpu::traits::RenderDevice;
use crate::util::align::align_up;
use crate::util::size::format_bytes;

/// A sub-allocation; `offset` is absolute within the pool arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DynamicAllocation {
    /// Byte offset in the pool arena.
    pub offset: u64,
    /// Requested size in bytes.
    pub size: u64,
}

/// Linear allocator fed by a [`MasterBlockPool`].
pub struct DynamicHeap<A: RangeAllocator> {
    pool: MasterBlockPool<A>,
    name: String,

    /// Minimum master block size
    page_size: u64,
    block_alignment: u64,

    /// Blocks held this frame; the last one is being filled
    blocks: Vec<MasterBlock>,
    cursor: u64,
    block_end: u64,

    current_allocated: u64,
    peak_allocated: u64,
    peak_blocks: usize,
}

impl<A: RangeAllocator> DynamicHeap<A> {
    /// Create a heap taking blocks of at least `page_size` bytes.
    pub fn new(pool: MasterBlockPool<A>, name: impl Into<String>, page_size: u64, block_alignment: u64) -> Self {
        Self {
            pool,
            name: name.into(),
            page_size,
            block_alignment,
            blocks: Vec::new(),
            cursor: 0,
            block_end: 0,
            current_allocated: 0,
            peak_allocated: 0,
            peak_blocks: 0,
        }
    }

    /// Create a heap sized by `config`.
    pub fn from_config(pool: MasterBlockPool<A>, name: impl Into<String>, config: &HeapConfig) -> Self {
        Self::new(pool, name, config.master_block_size, config.master_block_alignment)
    }

    /// Allocate `size` bytes aligned to `alignment`.
    ///
    /// Requests larger than the page size get a dedicated master block.
    pub fn allocate(&mut self, size: u64, alignment: u64) -> Result<DynamicAllocation, AllocError> {
        check_request(size, alignment)?;

        let aligned = align_up(self.cursor, alignment);
        let fits = !self.blocks.is_empty()
            && aligned
                .checked_add(size)
                .map_or(false, |end| end <= self.block_end);

        let offset = if fits {
            aligned
        } else {
            let block_size = self.page_size.max(align_up(size, alignment));
            let block = self
                .pool
                .allocate_master_block(block_size, self.block_alignment.max(alignment))?;
            self.block_end = block.range().end();
            let offset = block.offset();
            self.blocks.push(block);
            self.peak_blocks = self.peak_blocks.max(self.blocks.len());
            offset
        };

        self.cursor = offset + size;
        self.current_allocated += size;
        self.peak_allocated = self.peak_allocated.max(self.current_allocated);

        Ok(DynamicAllocation { offset, size })
    }

    /// Heap name, for log output.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Master blocks currently held.
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Get current statistics.
    pub fn stats(&self) -> DynamicHeapStats {
        DynamicHeapStats {
            current_allocated: self.current_allocated,
            peak_allocated: self.peak_allocated,
            current_blocks: self.blocks.len(),
            peak_blocks: self.peak_blocks,
        }
    }

    fn reset_frame(&mut self) {
        self.cursor = 0;
        self.block_end = 0;
        self.current_allocated = 0;
    }
}

impl DynamicHeap<FreeListRangeAllocator> {
    /// Return every block to the pool once the GPU reaches `completion_target`.
    pub fn release_master_blocks<D: RenderDevice + ?Sized>(&mut self, device: &D, completion_target: u64) {
        self.pool
            .release_master_blocks(self.blocks.drain(..), device, completion_target);
        self.reset_frame();
    }
}

impl DynamicHeap<RingRangeAllocator> {
    /// Give every block up and close the ring frame with `completion_target`.
    pub fn discard_master_blocks(&mut self, completion_target: u64) {
        self.pool
            .discard_master_blocks(self.blocks.drain(..), completion_target);
        self.reset_frame();
    }
}

impl<A: RangeAllocator> Drop for DynamicHeap<A> {
    fn drop(&mut self) {
        if !self.blocks.is_empty() && cfg!(debug_assertions) && !std::thread::panicking() {
            crate::sa_fatal!(
                SA104,
                "'{}' still holds {} master block(s)",
                self.name,
                self.blocks.len()
            );
        }

        sa_info!(
            "stagealloc: dynamic heap '{}' peak usage {} in {} master block(s)",
            self.name,
            format_bytes(self.peak_allocated),
            self.peak_blocks
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::dummy::DummyDevice;

    #[test]
    fn test_allocations_stay_inside_blocks() {
        let pool = MasterBlockPool::ring(64 * 1024);
        let mut heap = DynamicHeap::new(pool, "test", 1024, 256);

        let mut seen = Vec::new();
        for (size, align) in [(100, 16), (33, 64), (500, 4), (700, 256), (12, 1)] {
            let alloc = heap.allocate(size, align).unwrap();
            assert_eq!(alloc.offset % align, 0);
            seen.push(alloc);
        }

        // 100+33+500 share the first block; 700 opens a second one.
        assert_eq!(heap.block_count(), 2);
        assert_eq!(seen[3].offset % 1024, 0);
        assert_eq!(seen[4].offset, seen[3].offset + 700);

        for pair in seen.windows(2) {
            assert!(pair[0].offset + pair[0].size <= pair[1].offset);
        }

        heap.discard_master_blocks(1);
    }

    #[test]
    fn test_oversized_request_gets_dedicated_block() {
        let pool = MasterBlockPool::ring(64 * 1024);
        let mut heap = DynamicHeap::new(pool.clone(), "big", 1024, 256);

        let alloc = heap.allocate(5000, 16).unwrap();
        assert_eq!(alloc.size, 5000);
        assert_eq!(pool.used_size(), 5008);

        heap.discard_master_blocks(1);
        assert_eq!(pool.release_stale_blocks(1), 5008);
    }

    #[test]
    fn test_release_resets_frame() {
        let device = DummyDevice::new();
        let pool = MasterBlockPool::free_list(8 * 1024);
        let mut heap = DynamicHeap::from_config(
            pool.clone(),
            "ctx0",
            &HeapConfig::minimal().with_arena_size(8 * 1024),
        );

        heap.allocate(3000, 16).unwrap();
        heap.allocate(3000, 16).unwrap();
        assert_eq!(heap.block_count(), 2);
        heap.release_master_blocks(&device, 1);

        let stats = heap.stats();
        assert_eq!(stats.current_allocated, 0);
        assert_eq!(stats.peak_allocated, 6000);
        assert_eq!(stats.peak_blocks, 2);
        assert_eq!(stats.current_blocks, 0);
        assert_eq!(pool.outstanding_blocks(), 2);

        device.fence().advance(1);
        device.purge_stale_objects();
        assert_eq!(pool.outstanding_blocks(), 0);
        assert_eq!(pool.used_size(), 0);
    }

    #[test]
    fn test_pool_exhaustion_propagates() {
        let pool = MasterBlockPool::ring(2048);
        let mut heap = DynamicHeap::new(pool, "small", 1024, 256);
        heap.allocate(1024, 1).unwrap();
        heap.allocate(1024, 1).unwrap();
        assert_eq!(heap.allocate(1, 1), Err(AllocError::Exhausted));
        heap.discard_master_blocks(1);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "SA104")]
    fn test_drop_with_held_blocks_is_fatal() {
        let pool = MasterBlockPool::ring(4096);
        let mut heap = DynamicHeap::new(pool, "leaky", 1024, 256);
        heap.allocate(64, 16).unwrap();
        drop(heap);
    }
}
