//! Byte ranges and the allocator interface shared by the ring and free-list
//! allocators.

use std::fmt;

/// A half-open byte interval `[offset, offset + size)` inside an arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Range {
    /// Start of the range.
    pub offset: u64,
    /// Length in bytes.
    pub size: u64,
}

impl Range {
    /// Create a new range.
    pub const fn new(offset: u64, size: u64) -> Self {
        Self { offset, size }
    }

    /// One past the last byte.
    pub const fn end(&self) -> u64 {
        self.offset + self.size
    }

    /// Whether the two ranges share at least one byte.
    pub const fn overlaps(&self, other: &Range) -> bool {
        self.offset < other.end() && other.offset < self.end()
    }
}

/// Errors that can occur during range allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocError {
    /// No free space large enough. Recoverable: wait for the GPU, grow, or fail.
    Exhausted,
    /// Zero-sized request.
    InvalidSize,
    /// Alignment is not a power of two.
    InvalidAlignment,
}

impl fmt::Display for AllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllocError::Exhausted => write!(f, "Arena exhausted"),
            AllocError::InvalidSize => write!(f, "Invalid allocation size"),
            AllocError::InvalidAlignment => write!(f, "Alignment must be a power of two"),
        }
    }
}

impl std::error::Error for AllocError {}

/// Common interface of the byte-range allocators.
///
/// How ranges come back differs per implementation: the ring reclaims whole
/// frames by completion value, the free list takes individual ranges. The
/// [`MasterBlockPool`](super::master_block::MasterBlockPool) exposes the
/// matching release path for each.
pub trait RangeAllocator: Send + 'static {
    /// Allocate `size` bytes aligned to `alignment`.
    fn allocate(&mut self, size: u64, alignment: u64) -> Result<Range, AllocError>;

    /// Total arena size in bytes.
    fn capacity(&self) -> u64;

    /// Bytes currently unavailable for allocation.
    fn used_size(&self) -> u64;
}

/// Validate an allocation request.
pub(crate) fn check_request(size: u64, alignment: u64) -> Result<(), AllocError> {
    if size == 0 {
        return Err(AllocError::InvalidSize);
    }
    if !crate::util::align::is_valid_alignment(alignment) {
        return Err(AllocError::InvalidAlignment);
    }
    Ok(())
}
