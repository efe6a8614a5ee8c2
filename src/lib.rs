//! # stagealloc
//!
//! Fence-aware transient GPU memory sub-allocation and a staging upload
//! pipeline for rendering engines.
//!
//! ## Features
//!
//! - Ring allocator reclaimed by GPU completion value, frame by frame
//! - Coalescing free-list allocator for out-of-order release
//! - Master block pools that defer reuse until the GPU is done
//! - Per-context dynamic heaps with lock-free bump allocation
//! - Upload buffer pool: producers on any thread, one render-thread pump
//! - Coded diagnostics with strict mode for CI
//! - Optional Tracy zones, `log` integration and leak backtraces
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use stagealloc::{DynamicHeap, HeapConfig, MasterBlockPool};
//! use stagealloc::gpu::DummyDevice;
//!
//! let config = HeapConfig::default();
//! let device = DummyDevice::new();
//! let pool = MasterBlockPool::free_list(config.arena_size);
//! let mut heap = DynamicHeap::from_config(pool.clone(), "context 0", &config);
//!
//! // Frame N
//! let constants = heap.allocate(256, 256).unwrap();
//! // ... write at constants.offset, submit GPU work that signals N ...
//! heap.release_master_blocks(&device, 1);
//!
//! // Later, once the GPU reached 1
//! device.fence().advance(1);
//! device.purge_stale_objects();
//! ```
//!
//! ## Uploads
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use stagealloc::{CopyTarget, TextureFormat, UploadBufferDesc, UploadBufferPool, UploadConfig};
//! use stagealloc::gpu::{DummyDevice, ResourceHandle};
//!
//! let device = Arc::new(DummyDevice::new());
//! let pool = Arc::new(UploadBufferPool::new(device.clone(), UploadConfig::default()));
//!
//! // Render thread: pool.render_thread_update(&mut ctx) once per frame.
//!
//! // Any other thread:
//! let desc = UploadBufferDesc::new_2d(256, 256, TextureFormat::Rgba8Unorm);
//! let buffer = pool.acquire(&desc).unwrap();
//! let texels = buffer.mapped_data(0, 0).unwrap();
//! // ... write through texels.data ...
//! pool.schedule_gpu_copy(&buffer, CopyTarget { texture: ResourceHandle(7), mip_levels: 1, mip: 0, slice: 0 });
//! buffer.wait_for_copy_scheduled();
//! pool.recycle(buffer);
//! ```

pub mod allocators;
pub mod api;
pub mod diagnostics;
pub mod gpu;
pub mod sync;
pub mod upload;

mod util;

#[cfg(feature = "debug")]
pub mod debug;

// Re-export public API at crate root for convenience
pub use allocators::{
    AllocError, DynamicAllocation, DynamicHeap, FreeListRangeAllocator, MasterBlock,
    MasterBlockPool, Range, RangeAllocator, RingRangeAllocator,
};
pub use api::config::{HeapConfig, UploadConfig};
pub use api::stats::{DynamicHeapStats, HeapStats, UploadStats};
pub use sync::signal::SignalGate;
pub use upload::{
    BufferOperation, CopyTarget, TextureFormat, UploadBuffer, UploadBufferDesc, UploadBufferPool,
};

// Size helpers
pub use util::size::{format_bytes, kb, mb};

// Diagnostics - Core types and predefined codes
pub use diagnostics::{Diagnostic, DiagnosticKind};
pub use diagnostics::{StrictMode, set_strict_mode, StrictModeGuard};
pub use diagnostics::{SA101, SA102, SA103, SA104, SA201, SA202, SA203, SA301, SA302, SA303, SA401, SA901};
