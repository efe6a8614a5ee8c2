//! Device collaborator interfaces.
//!
//! The allocators and the upload pipeline never talk to a graphics API
//! directly. Everything they need from the backend goes through these
//! narrow traits: create/release a staging texture, defer an object's
//! destruction until the GPU is done, map/unmap/copy on the render thread,
//! and observe a monotonic completion counter.

use std::fmt;
use std::ptr::NonNull;

use crate::upload::desc::UploadBufferDesc;

/// Errors reported by a device backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GpuError {
    /// Out of device or host-visible memory
    OutOfMemory,
    /// The descriptor cannot be used for a staging texture
    InvalidDescriptor(String),
    /// The handle does not name a live resource
    UnknownResource(ResourceHandle),
    /// Backend-specific error (opaque)
    Backend(String),
    /// The render-thread pump panicked before the operation completed
    PipelineAborted,
}

impl fmt::Display for GpuError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GpuError::OutOfMemory => write!(f, "GPU out of memory"),
            GpuError::InvalidDescriptor(msg) => write!(f, "Invalid staging descriptor: {}", msg),
            GpuError::UnknownResource(handle) => write!(f, "Unknown resource {}", handle),
            GpuError::Backend(msg) => write!(f, "Backend error: {}", msg),
            GpuError::PipelineAborted => write!(f, "Upload pipeline aborted"),
        }
    }
}

impl std::error::Error for GpuError {}

/// Opaque backend resource handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceHandle(pub u64);

impl ResourceHandle {
    /// Get the raw handle value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ResourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// CPU-visible view of one mapped staging subresource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MappedSubresource {
    /// First byte of the subresource.
    pub data: NonNull<u8>,
    /// Bytes between two rows (or block rows).
    pub row_stride: u32,
    /// Bytes between two depth slices.
    pub depth_stride: u32,
}

// SAFETY: the pointer refers to driver-owned staging memory. The pipeline
// only publishes it to producer threads after the Mapped gate is triggered
// and never touches it again until the buffer is recycled.
unsafe impl Send for MappedSubresource {}
unsafe impl Sync for MappedSubresource {}

/// Result of a non-blocking map attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapOutcome {
    /// The subresource is now CPU-writable.
    Mapped(MappedSubresource),
    /// The GPU is still using the resource; retry on a later pump cycle.
    WouldBlock,
}

/// Anything the device can hold on to and drop once the GPU is done.
pub trait StaleObject: Send + 'static {}

impl<T: Send + 'static> StaleObject for T {}

/// Monotonic counter of retired GPU work.
pub trait CompletionCounter: Send + Sync {
    /// Last value the GPU is known to have reached.
    fn last_completed(&self) -> u64;

    /// Block until the counter reaches `value`.
    fn wait_for(&self, value: u64);

    /// Non-blocking check for `value`.
    fn is_completed(&self, value: u64) -> bool {
        self.last_completed() >= value
    }
}

/// Free-threaded device operations.
pub trait RenderDevice: Send + Sync {
    /// Create a CPU-writable staging texture matching `desc`.
    fn create_staging_texture(&self, desc: &UploadBufferDesc) -> Result<ResourceHandle, GpuError>;

    /// Release a staging texture.
    ///
    /// Implementations must keep the native resource alive until copies
    /// already submitted from it have retired.
    fn release_staging_texture(&self, texture: ResourceHandle);

    /// Drop `object` only after the GPU has retired all work up to
    /// `readiness_target` that was submitted before this call.
    fn defer_destruction(&self, object: Box<dyn StaleObject>, readiness_target: u64);
}

/// Render-thread (immediate context) operations.
pub trait DeviceContext {
    /// Try to map one subresource for writing without waiting on the GPU.
    fn map_subresource(
        &mut self,
        texture: ResourceHandle,
        subresource: u32,
    ) -> Result<MapOutcome, GpuError>;

    /// Unmap one subresource.
    fn unmap_subresource(&mut self, texture: ResourceHandle, subresource: u32);

    /// Record a copy of a whole source subresource into the destination
    /// subresource at `dst_offset` (x, y, z in texels).
    fn copy_subresource(
        &mut self,
        src: ResourceHandle,
        src_subresource: u32,
        dst: ResourceHandle,
        dst_subresource: u32,
        dst_offset: [u32; 3],
    );
}
