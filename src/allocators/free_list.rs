//! Free-list allocator - general byte-range allocation with out-of-order free.
//!
//! Free blocks live in a `BTreeMap` keyed by offset. Allocation is first-fit
//! in offset order, so results are deterministic for a given history. Free
//! coalesces with the left and right neighbour through two ordered lookups,
//! which keeps the invariant that no two free blocks are ever adjacent.

use std::collections::BTreeMap;

use super::range::{check_request, AllocError, Range, RangeAllocator};
use crate::util::align::align_up;

/// Coalescing free-list allocator over a fixed arena.
#[derive(Debug)]
pub struct FreeListRangeAllocator {
    /// Total capacity in bytes
    capacity: u64,

    /// Free blocks: offset -> size
    free_blocks: BTreeMap<u64, u64>,

    /// Sum of all free block sizes
    free_size: u64,

    /// Outstanding allocations, for leak detection
    live_allocations: usize,
}

impl FreeListRangeAllocator {
    /// Create an allocator whose whole arena is one free block.
    pub fn new(capacity: u64) -> Self {
        let mut free_blocks = BTreeMap::new();
        if capacity > 0 {
            free_blocks.insert(0, capacity);
        }

        Self {
            capacity,
            free_blocks,
            free_size: capacity,
            live_allocations: 0,
        }
    }

    /// Return a range to the free list, merging with adjacent free blocks.
    ///
    /// # Panics
    ///
    /// Freeing a range that is out of bounds or overlaps free memory (a double
    /// free) is a fatal protocol violation.
    pub fn free(&mut self, range: Range) {
        if self.live_allocations == 0 || range.size == 0 || range.end() > self.capacity {
            crate::sa_fatal!(
                SA101,
                "{:?} freed into a {} byte arena with {} live allocation(s)",
                range,
                self.capacity,
                self.live_allocations
            );
        }

        let mut offset = range.offset;
        let mut size = range.size;

        let left = self
            .free_blocks
            .range(..=range.offset)
            .next_back()
            .map(|(&o, &s)| Range::new(o, s));
        let right = self
            .free_blocks
            .range(range.offset..)
            .next()
            .map(|(&o, &s)| Range::new(o, s));

        if let Some(left) = left {
            if left.overlaps(&range) {
                crate::sa_fatal!(SA101, "{:?} overlaps free block {:?}", range, left);
            }
            if left.end() == range.offset {
                self.free_blocks.remove(&left.offset);
                offset = left.offset;
                size += left.size;
            }
        }

        if let Some(right) = right {
            if right.overlaps(&range) {
                crate::sa_fatal!(SA101, "{:?} overlaps free block {:?}", range, right);
            }
            if range.end() == right.offset {
                self.free_blocks.remove(&right.offset);
                size += right.size;
            }
        }

        self.free_blocks.insert(offset, size);
        self.free_size += range.size;
        self.live_allocations -= 1;
    }

    /// Bytes currently free.
    pub fn free_size(&self) -> u64 {
        self.free_size
    }

    /// Number of free blocks (fragmentation indicator).
    pub fn free_block_count(&self) -> usize {
        self.free_blocks.len()
    }

    /// Number of allocations not yet freed.
    pub fn live_allocations(&self) -> usize {
        self.live_allocations
    }

    /// Size of the largest free block.
    pub fn largest_free_block(&self) -> u64 {
        self.free_blocks.values().copied().max().unwrap_or(0)
    }
}

impl RangeAllocator for FreeListRangeAllocator {
    fn allocate(&mut self, size: u64, alignment: u64) -> Result<Range, AllocError> {
        check_request(size, alignment)?;

        if size > self.free_size {
            return Err(AllocError::Exhausted);
        }

        let (block_offset, block_size, aligned) = self
            .free_blocks
            .iter()
            .find_map(|(&offset, &block_size)| {
                let aligned = align_up(offset, alignment);
                let end = aligned.checked_add(size)?;
                (end <= offset + block_size).then_some((offset, block_size, aligned))
            })
            .ok_or(AllocError::Exhausted)?;

        self.free_blocks.remove(&block_offset);

        // Leading padding and trailing remainder stay free.
        if aligned > block_offset {
            self.free_blocks.insert(block_offset, aligned - block_offset);
        }
        let block_end = block_offset + block_size;
        let alloc_end = aligned + size;
        if block_end > alloc_end {
            self.free_blocks.insert(alloc_end, block_end - alloc_end);
        }

        self.free_size -= size;
        self.live_allocations += 1;

        Ok(Range::new(aligned, size))
    }

    fn capacity(&self) -> u64 {
        self.capacity
    }

    fn used_size(&self) -> u64 {
        self.capacity - self.free_size
    }
}

impl Drop for FreeListRangeAllocator {
    fn drop(&mut self) {
        if cfg!(debug_assertions) && self.live_allocations != 0 && !std::thread::panicking() {
            crate::sa_fatal!(
                SA103,
                "{} range(s) still allocated from a {} byte free list",
                self.live_allocations,
                self.capacity
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_fit_by_offset() {
        let mut list = FreeListRangeAllocator::new(1024);

        let a = list.allocate(100, 1).unwrap();
        let b = list.allocate(100, 1).unwrap();
        let c = list.allocate(100, 1).unwrap();
        assert_eq!((a.offset, b.offset, c.offset), (0, 100, 200));

        list.free(a);
        // Fits both the hole at 0 and the tail; lowest offset wins.
        let d = list.allocate(50, 1).unwrap();
        assert_eq!(d.offset, 0);

        list.free(b);
        list.free(c);
        list.free(d);
    }

    #[test]
    fn test_alignment_keeps_padding_free() {
        let mut list = FreeListRangeAllocator::new(1024);

        let a = list.allocate(10, 1).unwrap();
        let b = list.allocate(100, 64).unwrap();
        assert_eq!(b.offset, 64);
        assert_eq!(list.free_size(), 1024 - 110);

        // The padding [10, 64) is still usable.
        let c = list.allocate(54, 1).unwrap();
        assert_eq!(c.offset, 10);

        list.free(a);
        list.free(b);
        list.free(c);
        assert_eq!(list.free_block_count(), 1);
    }

    #[test]
    fn test_coalescing_is_order_independent() {
        for reverse in [false, true] {
            let mut list = FreeListRangeAllocator::new(512);
            let a = list.allocate(128, 1).unwrap();
            let b = list.allocate(128, 1).unwrap();
            let guard = list.allocate(256, 1).unwrap();

            if reverse {
                list.free(b);
                list.free(a);
            } else {
                list.free(a);
                list.free(b);
            }

            assert_eq!(list.free_block_count(), 1);
            assert_eq!(list.largest_free_block(), 256);

            list.free(guard);
            assert_eq!(list.free_block_count(), 1);
            assert_eq!(list.free_size(), 512);
        }
    }

    #[test]
    fn test_middle_free_merges_both_sides() {
        let mut list = FreeListRangeAllocator::new(300);
        let a = list.allocate(100, 1).unwrap();
        let b = list.allocate(100, 1).unwrap();
        let c = list.allocate(100, 1).unwrap();

        list.free(a);
        list.free(c);
        assert_eq!(list.free_block_count(), 2);

        list.free(b);
        assert_eq!(list.free_block_count(), 1);
        assert_eq!(list.largest_free_block(), 300);
    }

    #[test]
    fn test_exhaustion_is_recoverable() {
        let mut list = FreeListRangeAllocator::new(256);
        let a = list.allocate(200, 1).unwrap();
        assert_eq!(list.allocate(100, 1), Err(AllocError::Exhausted));
        list.free(a);
        let b = list.allocate(256, 1).unwrap();
        list.free(b);
    }

    #[test]
    fn test_fragmented_exhaustion() {
        let mut list = FreeListRangeAllocator::new(300);
        let a = list.allocate(100, 1).unwrap();
        let b = list.allocate(100, 1).unwrap();
        let c = list.allocate(100, 1).unwrap();
        list.free(a);
        list.free(c);

        // 200 bytes free, but not contiguous.
        assert_eq!(list.allocate(150, 1), Err(AllocError::Exhausted));

        list.free(b);
    }

    #[test]
    #[should_panic(expected = "SA101")]
    fn test_double_free_is_fatal() {
        let mut list = FreeListRangeAllocator::new(256);
        let a = list.allocate(64, 1).unwrap();
        let _b = list.allocate(64, 1).unwrap();
        list.free(a);
        list.free(a);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "SA103")]
    fn test_leaked_range_is_reported_on_drop() {
        let mut list = FreeListRangeAllocator::new(1024);
        let _leaked = list.allocate(64, 1).unwrap();
        drop(list);
    }
}
