//! Pending upload operations and the render-thread pump.
//!
//! Producer threads enqueue work from anywhere. Exactly one thread, the one
//! owning the immediate [`DeviceContext`], drains the queue once per frame
//! with [`UploadPipeline::pump`].
//!
//! ## Queue discipline
//!
//! The pump swaps the pending queue with its (empty) working queue under the
//! lock and processes the working queue without holding it, so producers
//! never wait on device calls. Operations that cannot finish this cycle
//! (a map that would block) go back onto the pending queue and are retried
//! on the next cycle, after anything enqueued in the meantime.
//!
//! ## Aborts
//!
//! A protocol violation or a hard map failure panics on the pump thread.
//! Before the panic leaves [`UploadPipeline::pump`], every operation still
//! queued is failed: its buffer is marked [`failed`](UploadBuffer::is_failed)
//! and its waiters are released. Operations enqueued afterwards fail
//! immediately, so no producer blocks on a pump that is gone.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::buffer::{UploadBuffer, PENDING_COPY, PENDING_MAP, PENDING_MAP_AND_CACHE};
use super::cache::BufferCache;
use super::desc::calc_subresource;
use crate::diagnostics::macros::sa_info;
use crate::diagnostics::tracy;
use crate::gpu::traits::{DeviceContext, MapOutcome, ResourceHandle};
use crate::sync::atomics::AtomicCounter;
use crate::sync::mutex::Mutex;

/// Where a scheduled copy lands in the destination texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CopyTarget {
    /// Destination texture.
    pub texture: ResourceHandle,
    /// Mip count of the destination, for subresource indexing.
    pub mip_levels: u32,
    /// Destination mip receiving the buffer's mip 0.
    pub mip: u32,
    /// Destination slice receiving the buffer's slice 0.
    pub slice: u32,
}

/// Work the pump performs on a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferOperation {
    /// Map every subresource, then signal *Mapped*.
    Map,
    /// Map every subresource, signal *Mapped*, and park the buffer in the
    /// idle cache.
    MapAndCache,
    /// Unmap, copy into the target, signal *CopyScheduled*.
    Copy(CopyTarget),
}

impl BufferOperation {
    fn pending_bit(&self) -> u8 {
        match self {
            BufferOperation::Map => PENDING_MAP,
            BufferOperation::MapAndCache => PENDING_MAP_AND_CACHE,
            BufferOperation::Copy(_) => PENDING_COPY,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            BufferOperation::Map => "Map",
            BufferOperation::MapAndCache => "MapAndCache",
            BufferOperation::Copy(_) => "Copy",
        }
    }
}

/// A queued operation.
pub(crate) struct PendingOperation {
    op: BufferOperation,
    buffer: Arc<UploadBuffer>,
    /// Pump cycles this operation has been carried over
    attempts: u32,
}

/// Outstanding operation counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PendingCounts {
    /// Queued `Map` operations.
    pub maps: usize,
    /// Queued `Copy` operations.
    pub copies: usize,
}

/// Queue of pending upload operations plus the pump that drains it.
pub struct UploadPipeline {
    pending: Mutex<Vec<PendingOperation>>,
    in_work: Mutex<Vec<PendingOperation>>,
    retry_warning_threshold: u32,
    map_retries: AtomicCounter,
    aborted: AtomicBool,
}

impl UploadPipeline {
    /// Create a pipeline. A threshold of 0 disables the retry warning.
    pub fn new(retry_warning_threshold: u32) -> Self {
        Self {
            pending: Mutex::new(Vec::new()),
            in_work: Mutex::new(Vec::new()),
            retry_warning_threshold,
            map_retries: AtomicCounter::new(0),
            aborted: AtomicBool::new(false),
        }
    }

    /// Queue `op` for `buffer`.
    ///
    /// # Panics
    ///
    /// A buffer may have only one pending operation of each kind.
    pub fn enqueue(&self, op: BufferOperation, buffer: Arc<UploadBuffer>) {
        if !buffer.begin_operation(op.pending_bit()) {
            crate::sa_fatal!(SA203, "{} already pending for {}", op.name(), buffer.desc());
        }

        let mut pending = self.pending.lock();
        if self.aborted.load(Ordering::Acquire) {
            drop(pending);
            buffer.fail();
            return;
        }
        pending.push(PendingOperation {
            op,
            buffer,
            attempts: 0,
        });
    }

    /// Run one pump cycle. Returns the number of operations completed.
    pub fn pump(&self, ctx: &mut dyn DeviceContext, cache: &BufferCache) -> usize {
        let _zone = tracy::pump_zone();
        let _abort = AbortOnUnwind(self);

        let mut work = self.in_work.lock();
        std::mem::swap(&mut *self.pending.lock(), &mut *work);
        tracy::plot_pending(work.len());

        // Back to front, so the operation in flight and everything after it
        // stay in `work` if processing unwinds.
        work.reverse();
        let mut completed = 0;
        while let Some(op) = work.last_mut() {
            let done = self.process(ctx, cache, op);
            if let Some(op) = work.pop() {
                if done {
                    completed += 1;
                } else {
                    self.pending.lock().push(op);
                }
            }
        }
        completed
    }

    /// Whether a pump cycle has panicked.
    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::Acquire)
    }

    /// Outstanding `Map` and `Copy` operations; `MapAndCache` is not counted.
    pub fn pending_counts(&self) -> PendingCounts {
        let pending = self.pending.lock();
        let mut counts = PendingCounts::default();
        for op in pending.iter() {
            match op.op {
                BufferOperation::Map => counts.maps += 1,
                BufferOperation::Copy(_) => counts.copies += 1,
                BufferOperation::MapAndCache => {}
            }
        }
        counts
    }

    /// Total map attempts that were carried over to a later cycle.
    pub fn map_retries(&self) -> u64 {
        self.map_retries.get()
    }

    /// Fail every queued operation and refuse new ones.
    fn abort(&self) {
        self.aborted.store(true, Ordering::Release);

        let mut failed = std::mem::take(&mut *self.in_work.lock());
        failed.append(&mut *self.pending.lock());
        for op in &failed {
            op.buffer.fail();
        }
    }

    /// Returns whether `op` finished this cycle.
    fn process(
        &self,
        ctx: &mut dyn DeviceContext,
        cache: &BufferCache,
        op: &mut PendingOperation,
    ) -> bool {
        match op.op {
            BufferOperation::Map | BufferOperation::MapAndCache => {
                if !map_all(ctx, &op.buffer) {
                    op.attempts = op.attempts.saturating_add(1);
                    self.map_retries.increment();
                    if op.attempts == self.retry_warning_threshold {
                        crate::sa_emit!(
                            SA302,
                            "{} still unmapped after {} pump cycles",
                            op.buffer.desc(),
                            op.attempts
                        );
                    }
                    return false;
                }

                op.buffer.end_operation(op.op.pending_bit());
                op.buffer.signal_mapped();

                if op.op == BufferOperation::MapAndCache {
                    if let Err(excess) = cache.put(op.buffer.clone()) {
                        sa_info!(
                            "stagealloc: idle cache full for {}, releasing staging texture {}",
                            excess.desc(),
                            excess.staging_texture()
                        );
                    }
                }
            }
            BufferOperation::Copy(target) => {
                copy_to_texture(ctx, &op.buffer, target);
                op.buffer.end_operation(PENDING_COPY);
                op.buffer.signal_copy_scheduled();
            }
        }
        true
    }
}

/// Aborts the pipeline if a pump cycle unwinds.
struct AbortOnUnwind<'a>(&'a UploadPipeline);

impl Drop for AbortOnUnwind<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.0.abort();
        }
    }
}

/// Try to map every unmapped subresource. Returns whether all are mapped.
fn map_all(ctx: &mut dyn DeviceContext, buffer: &UploadBuffer) -> bool {
    let desc = *buffer.desc();
    let mut all_mapped = true;

    for slice in 0..desc.array_size {
        for mip in 0..desc.mip_levels {
            let index = desc.subresource_index(mip, slice);
            if buffer.is_subresource_mapped(index) {
                continue;
            }
            match ctx.map_subresource(buffer.staging_texture(), index) {
                Ok(MapOutcome::Mapped(data)) => buffer.set_mapped_data(index, data),
                Ok(MapOutcome::WouldBlock) => all_mapped = false,
                Err(err) => crate::sa_fatal!(
                    SA301,
                    "mip {} slice {} of {}: {}",
                    mip,
                    slice,
                    desc,
                    err
                ),
            }
        }
    }

    all_mapped
}

fn copy_to_texture(ctx: &mut dyn DeviceContext, buffer: &UploadBuffer, target: CopyTarget) {
    let desc = *buffer.desc();
    if !buffer.is_mapped() {
        crate::sa_fatal!(SA202, "copy of {} into {}", desc, target.texture);
    }

    let staging = buffer.staging_texture();
    for index in 0..desc.subresource_count() {
        ctx.unmap_subresource(staging, index);
    }
    buffer.clear_mapped_data();

    for slice in 0..desc.array_size {
        for mip in 0..desc.mip_levels {
            let dst = calc_subresource(target.mip + mip, target.slice + slice, target.mip_levels);
            ctx.copy_subresource(staging, desc.subresource_index(mip, slice), target.texture, dst, [0, 0, 0]);
        }
    }
}

impl Drop for UploadPipeline {
    fn drop(&mut self) {
        let leftover = self.pending.get_mut().len() + self.in_work.get_mut().len();
        if leftover > 0 {
            sa_info!("stagealloc: dropping {} unprocessed upload operation(s)", leftover);
        }
    }
}
