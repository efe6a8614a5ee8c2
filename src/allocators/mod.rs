//! Byte-range allocation backends.
//!
//! - [`ring`]: FIFO circular allocator reclaimed by frame completion value
//! - [`free_list`]: coalescing free list with out-of-order free
//! - [`master_block`]: shared pool of large blocks over either allocator
//! - [`dynamic_heap`]: per-caller linear allocation inside master blocks
//!
//! The allocators themselves are plain `&mut self` data structures. The only
//! lock lives in [`MasterBlockPool`](master_block::MasterBlockPool).

pub mod dynamic_heap;
pub mod free_list;
pub mod master_block;
pub mod range;
pub mod ring;

pub use dynamic_heap::{DynamicAllocation, DynamicHeap};
pub use free_list::FreeListRangeAllocator;
pub use master_block::{MasterBlock, MasterBlockPool};
pub use range::{AllocError, Range, RangeAllocator};
pub use ring::{FrameBoundary, RingRangeAllocator};
