//! Upload buffers: one staging texture plus its pipeline state.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;

use super::desc::UploadBufferDesc;
use crate::gpu::traits::{MappedSubresource, RenderDevice, ResourceHandle};
use crate::sync::mutex::Mutex;
use crate::sync::signal::SignalGate;

/// Pending-operation kinds, as bits of [`UploadBuffer::pending`].
pub(crate) const PENDING_MAP: u8 = 1 << 0;
pub(crate) const PENDING_COPY: u8 = 1 << 1;
pub(crate) const PENDING_MAP_AND_CACHE: u8 = 1 << 2;

/// A CPU-writable staging texture moving through the upload pipeline.
///
/// Producers only ever see buffers whose *Mapped* gate is triggered. They
/// write through [`mapped_data`](Self::mapped_data), hand the buffer to
/// [`UploadBufferPool::schedule_gpu_copy`](super::pool::UploadBufferPool::schedule_gpu_copy),
/// and finally [`recycle`](super::pool::UploadBufferPool::recycle) it.
pub struct UploadBuffer {
    desc: UploadBufferDesc,
    staging: ResourceHandle,
    device: Arc<dyn RenderDevice>,

    mapped: SignalGate,
    copy_scheduled: SignalGate,

    /// One slot per subresource, in `calc_subresource` order
    subresources: Mutex<Vec<Option<MappedSubresource>>>,

    /// Bitmask of pending operation kinds
    pending: AtomicU8,

    /// Set when the pump aborted with this buffer still queued
    failed: AtomicBool,
}

impl UploadBuffer {
    pub(crate) fn new(
        desc: UploadBufferDesc,
        staging: ResourceHandle,
        device: Arc<dyn RenderDevice>,
    ) -> Self {
        Self {
            desc,
            staging,
            device,
            mapped: SignalGate::new(),
            copy_scheduled: SignalGate::new(),
            subresources: Mutex::new(vec![None; desc.subresource_count() as usize]),
            pending: AtomicU8::new(0),
            failed: AtomicBool::new(false),
        }
    }

    /// Descriptor this buffer was created for.
    pub fn desc(&self) -> &UploadBufferDesc {
        &self.desc
    }

    /// Backend handle of the staging texture.
    pub fn staging_texture(&self) -> ResourceHandle {
        self.staging
    }

    /// Writable view of one subresource.
    ///
    /// `None` until the buffer is fully mapped, or when (mip, slice) is out
    /// of range.
    pub fn mapped_data(&self, mip: u32, slice: u32) -> Option<MappedSubresource> {
        if !self.is_mapped() || mip >= self.desc.mip_levels || slice >= self.desc.array_size {
            return None;
        }
        let index = self.desc.subresource_index(mip, slice) as usize;
        self.subresources.lock()[index]
    }

    /// Whether every subresource is mapped.
    pub fn is_mapped(&self) -> bool {
        self.mapped.is_triggered() && !self.is_failed()
    }

    /// Whether the GPU copy out of this buffer has been submitted.
    pub fn is_copy_scheduled(&self) -> bool {
        self.copy_scheduled.is_triggered() && !self.is_failed()
    }

    /// Whether the pump aborted while an operation on this buffer was
    /// queued. A failed buffer is never mapped again.
    pub fn is_failed(&self) -> bool {
        self.failed.load(Ordering::Acquire)
    }

    /// Block until the copy has been submitted by the pump thread.
    ///
    /// Also returns if the pump aborted; check [`is_failed`](Self::is_failed).
    pub fn wait_for_copy_scheduled(&self) {
        self.copy_scheduled.wait();
    }

    pub(crate) fn wait_for_mapped(&self) {
        self.mapped.wait();
    }

    pub(crate) fn is_subresource_mapped(&self, index: u32) -> bool {
        self.subresources.lock()[index as usize].is_some()
    }

    pub(crate) fn set_mapped_data(&self, index: u32, data: MappedSubresource) {
        self.subresources.lock()[index as usize] = Some(data);
    }

    /// Forget every mapping. The caller has just unmapped them.
    pub(crate) fn clear_mapped_data(&self) {
        self.subresources.lock().iter_mut().for_each(|slot| *slot = None);
    }

    pub(crate) fn signal_mapped(&self) {
        self.mapped.trigger();
    }

    pub(crate) fn signal_copy_scheduled(&self) {
        self.copy_scheduled.trigger();
    }

    /// Mark the buffer failed and release every waiter.
    pub(crate) fn fail(&self) {
        self.failed.store(true, Ordering::Release);
        self.mapped.trigger();
        self.copy_scheduled.trigger();
    }

    /// Back to the freshly-created state, ready for another map.
    pub(crate) fn reset(&self) {
        self.mapped.reset();
        self.copy_scheduled.reset();
        self.clear_mapped_data();
    }

    /// Mark an operation kind as pending. Returns `false` if it already was.
    pub(crate) fn begin_operation(&self, kind: u8) -> bool {
        self.pending.fetch_or(kind, Ordering::AcqRel) & kind == 0
    }

    pub(crate) fn end_operation(&self, kind: u8) {
        self.pending.fetch_and(!kind, Ordering::AcqRel);
    }
}

impl fmt::Debug for UploadBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadBuffer")
            .field("desc", &self.desc)
            .field("staging", &self.staging)
            .field("mapped", &self.is_mapped())
            .field("copy_scheduled", &self.is_copy_scheduled())
            .field("failed", &self.is_failed())
            .finish()
    }
}

impl Drop for UploadBuffer {
    fn drop(&mut self) {
        self.device.release_staging_texture(self.staging);
    }
}
