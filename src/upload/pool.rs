//! Upload buffer pool.
//!
//! The producer-facing half of the staging pipeline. Any thread may
//! [`acquire`](UploadBufferPool::acquire) a mapped buffer, fill it, schedule
//! its copy and [`recycle`](UploadBufferPool::recycle) it; the render thread
//! calls [`render_thread_update`](UploadBufferPool::render_thread_update)
//! once per frame to move everything along.

use std::sync::Arc;

use super::buffer::UploadBuffer;
use super::cache::BufferCache;
use super::desc::UploadBufferDesc;
use super::pipeline::{BufferOperation, CopyTarget, UploadPipeline};
use crate::api::config::UploadConfig;
use crate::api::stats::UploadStats;
use crate::diagnostics::macros::sa_info;
use crate::gpu::traits::{DeviceContext, GpuError, RenderDevice};
use crate::sync::atomics::AtomicCounter;
use crate::util::size::format_bytes;

/// Pool of reusable CPU-writable staging textures.
pub struct UploadBufferPool {
    device: Arc<dyn RenderDevice>,
    cache: BufferCache,
    pipeline: UploadPipeline,
    buffers_created: AtomicCounter,
}

impl UploadBufferPool {
    /// Create a pool that allocates staging textures from `device`.
    pub fn new(device: Arc<dyn RenderDevice>, config: UploadConfig) -> Self {
        Self {
            device,
            cache: BufferCache::new(config.max_idle_buffers_per_desc),
            pipeline: UploadPipeline::new(config.map_retry_warning_threshold),
            buffers_created: AtomicCounter::new(0),
        }
    }

    /// Get a fully mapped buffer for `desc`.
    ///
    /// Reuses an idle buffer when one matches. Otherwise a staging texture is
    /// created and this call blocks until the render thread has mapped it,
    /// so it must not be called on the render thread on a cache miss; use
    /// [`try_acquire_cached`](Self::try_acquire_cached) there.
    ///
    /// Returns [`GpuError::PipelineAborted`] if the pump panicked before the
    /// buffer was mapped.
    pub fn acquire(&self, desc: &UploadBufferDesc) -> Result<Arc<UploadBuffer>, GpuError> {
        if let Some(buffer) = self.cache.take(desc) {
            return Ok(buffer);
        }

        let staging = match self.device.create_staging_texture(desc) {
            Ok(handle) => handle,
            Err(err) => {
                crate::sa_emit!(SA303, "{}: {}", desc, err);
                return Err(err);
            }
        };
        self.buffers_created.increment();

        sa_info!(
            "stagealloc: created {}x{}x{} upload buffer ({}, {} mip(s), {} slice(s), {})",
            desc.width,
            desc.height,
            desc.depth,
            format_bytes(desc.staging_size()),
            desc.mip_levels,
            desc.array_size,
            desc.format
        );

        let buffer = Arc::new(UploadBuffer::new(*desc, staging, self.device.clone()));
        self.pipeline.enqueue(BufferOperation::Map, buffer.clone());
        buffer.wait_for_mapped();
        if buffer.is_failed() {
            return Err(GpuError::PipelineAborted);
        }
        Ok(buffer)
    }

    /// Take an idle mapped buffer for `desc` without blocking.
    pub fn try_acquire_cached(&self, desc: &UploadBufferDesc) -> Option<Arc<UploadBuffer>> {
        self.cache.take(desc)
    }

    /// Ask the render thread to copy `buffer` into `target`.
    ///
    /// Producers stop writing to the buffer once this is called; completion
    /// is observable through [`UploadBuffer::is_copy_scheduled`].
    pub fn schedule_gpu_copy(&self, buffer: &Arc<UploadBuffer>, target: CopyTarget) {
        self.pipeline.enqueue(BufferOperation::Copy(target), buffer.clone());
    }

    /// Return a buffer whose copy has been scheduled.
    ///
    /// It is remapped on a later pump cycle and parked in the idle cache.
    /// A failed buffer is dropped instead.
    ///
    /// # Panics
    ///
    /// Recycling a buffer before its copy was scheduled is fatal.
    pub fn recycle(&self, buffer: Arc<UploadBuffer>) {
        if buffer.is_failed() {
            return;
        }
        if !buffer.is_copy_scheduled() {
            crate::sa_fatal!(SA201, "{}", buffer.desc());
        }
        buffer.reset();
        self.pipeline.enqueue(BufferOperation::MapAndCache, buffer);
    }

    /// Run one pump cycle on the render thread.
    ///
    /// Returns the number of operations completed.
    pub fn render_thread_update(&self, ctx: &mut dyn DeviceContext) -> usize {
        self.pipeline.pump(ctx, &self.cache)
    }

    /// Get current statistics.
    pub fn stats(&self) -> UploadStats {
        let pending = self.pipeline.pending_counts();
        UploadStats {
            pending_maps: pending.maps,
            pending_copies: pending.copies,
            idle_buffers: self.cache.len(),
            buffers_created: self.buffers_created.get(),
            map_retries: self.pipeline.map_retries(),
        }
    }
}

impl Drop for UploadBufferPool {
    fn drop(&mut self) {
        let stats = self.stats();
        if stats.pending_operations() > 0 {
            crate::sa_emit!(
                SA401,
                "{} map and {} copy operation(s) still pending",
                stats.pending_maps,
                stats.pending_copies
            );
        }

        for (desc, buffers) in self.cache.drain() {
            sa_info!(
                "stagealloc: releasing {} idle upload buffer(s) of {}",
                buffers.len(),
                desc
            );
        }
    }
}
