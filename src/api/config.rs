//! Heap and upload pool configuration.

use crate::util::size::{kb, mb};

/// Configuration for a [`MasterBlockPool`](crate::MasterBlockPool) and the
/// dynamic heaps carved from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeapConfig {
    /// Size of the shared arena (default: 64 MB)
    pub arena_size: u64,

    /// Size of one master block handed to a dynamic heap (default: 64 KB)
    pub master_block_size: u64,

    /// Alignment of master blocks (default: 256 bytes)
    pub master_block_alignment: u64,
}

impl Default for HeapConfig {
    fn default() -> Self {
        Self {
            arena_size: mb(64),
            master_block_size: kb(64),
            master_block_alignment: 256,
        }
    }
}

impl HeapConfig {
    /// Create a minimal config for testing or constrained environments.
    pub fn minimal() -> Self {
        Self {
            arena_size: mb(1),
            master_block_size: kb(4),
            master_block_alignment: 256,
        }
    }

    /// Builder pattern: set arena size.
    pub fn with_arena_size(mut self, size: u64) -> Self {
        self.arena_size = size;
        self
    }

    /// Builder pattern: set master block size.
    pub fn with_master_block_size(mut self, size: u64) -> Self {
        self.master_block_size = size;
        self
    }

    /// Builder pattern: set master block alignment.
    pub fn with_master_block_alignment(mut self, alignment: u64) -> Self {
        self.master_block_alignment = alignment;
        self
    }

    /// Number of whole master blocks the arena can hold.
    pub fn master_block_count(&self) -> u64 {
        if self.master_block_size == 0 {
            return 0;
        }
        self.arena_size / self.master_block_size
    }
}

/// Configuration for an [`UploadBufferPool`](crate::UploadBufferPool).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadConfig {
    /// Pump cycles an unmapped buffer may be carried over before a warning
    /// is emitted (0 = never warn)
    pub map_retry_warning_threshold: u32,

    /// Idle buffers kept per descriptor (0 = unbounded)
    pub max_idle_buffers_per_desc: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            map_retry_warning_threshold: 64,
            max_idle_buffers_per_desc: 0,
        }
    }
}

impl UploadConfig {
    /// Builder pattern: set the map retry warning threshold.
    pub fn with_map_retry_warning_threshold(mut self, cycles: u32) -> Self {
        self.map_retry_warning_threshold = cycles;
        self
    }

    /// Builder pattern: cap idle buffers per descriptor.
    pub fn with_max_idle_buffers_per_desc(mut self, count: usize) -> Self {
        self.max_idle_buffers_per_desc = count;
        self
    }
}
