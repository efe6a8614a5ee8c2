//! Pool, heap and upload statistics.

use std::fmt;

use crate::util::size::format_bytes;

/// Snapshot of a master block pool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeapStats {
    /// Arena size in bytes.
    pub capacity: u64,

    /// Bytes unavailable for allocation, including blocks awaiting the GPU.
    pub used: u64,

    /// Master blocks allocated and not yet returned.
    pub outstanding_blocks: u64,

    /// High-water mark of outstanding blocks.
    pub peak_outstanding_blocks: u64,

    /// Master blocks allocated over the pool's lifetime.
    pub total_blocks_allocated: u64,
}

impl HeapStats {
    /// Used fraction of the arena, 0.0 to 1.0.
    pub fn utilization(&self) -> f64 {
        if self.capacity == 0 {
            return 0.0;
        }
        self.used as f64 / self.capacity as f64
    }
}

impl fmt::Display for HeapStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Heap Statistics:")?;
        writeln!(
            f,
            "  Used:        {} / {} ({:.1}%)",
            format_bytes(self.used),
            format_bytes(self.capacity),
            self.utilization() * 100.0
        )?;
        writeln!(
            f,
            "  Blocks:      {} outstanding, {} peak",
            self.outstanding_blocks, self.peak_outstanding_blocks
        )?;
        write!(f, "  Allocated:   {} blocks total", self.total_blocks_allocated)
    }
}

/// Snapshot of one dynamic heap.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DynamicHeapStats {
    /// Bytes handed out since the last release.
    pub current_allocated: u64,

    /// High-water mark of `current_allocated`.
    pub peak_allocated: u64,

    /// Master blocks currently held.
    pub current_blocks: usize,

    /// High-water mark of `current_blocks`.
    pub peak_blocks: usize,
}

impl fmt::Display for DynamicHeapStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} in {} block(s) (peak {} in {})",
            format_bytes(self.current_allocated),
            self.current_blocks,
            format_bytes(self.peak_allocated),
            self.peak_blocks
        )
    }
}

/// Snapshot of an upload buffer pool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UploadStats {
    /// Outstanding `Map` operations.
    pub pending_maps: usize,

    /// Outstanding `Copy` operations.
    pub pending_copies: usize,

    /// Mapped buffers parked in the idle cache.
    pub idle_buffers: usize,

    /// Staging textures created over the pool's lifetime.
    pub buffers_created: u64,

    /// Map attempts carried over to a later pump cycle.
    pub map_retries: u64,
}

impl UploadStats {
    /// Outstanding operations a producer may be waiting on.
    pub fn pending_operations(&self) -> usize {
        self.pending_maps + self.pending_copies
    }
}

impl fmt::Display for UploadStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Upload Statistics:")?;
        writeln!(
            f,
            "  Pending:     {} map, {} copy",
            self.pending_maps, self.pending_copies
        )?;
        writeln!(f, "  Idle:        {} buffers", self.idle_buffers)?;
        write!(
            f,
            "  Created:     {} buffers, {} map retries",
            self.buffers_created, self.map_retries
        )
    }
}
