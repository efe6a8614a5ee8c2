//! In-memory reference device.
//!
//! Staging textures are plain `Vec<u8>` storage, copies are recorded instead
//! of executed, and the completion counter is advanced by hand. The device
//! can be told to report the GPU as busy for a number of map attempts, or to
//! fail maps and creations outright, which is what the pipeline tests need.

use std::collections::HashMap;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::deferred::DeferredReleaseQueue;
use super::fence::FenceCounter;
use super::traits::*;
use crate::sync::mutex::Mutex;
use crate::upload::desc::UploadBufferDesc;

/// A copy recorded by [`DummyContext`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CopyRecord {
    /// Staging texture copied from.
    pub src: ResourceHandle,
    /// Source subresource index.
    pub src_subresource: u32,
    /// Destination texture.
    pub dst: ResourceHandle,
    /// Destination subresource index.
    pub dst_subresource: u32,
    /// Destination texel offset (x, y, z).
    pub dst_offset: [u32; 3],
}

/// Backing storage of one staging texture.
struct DummyTexture {
    subresources: Vec<Vec<u8>>,
    pitches: Vec<(u32, u32)>,
    mapped: Vec<bool>,
}

impl DummyTexture {
    fn new(desc: &UploadBufferDesc) -> Self {
        let count = desc.subresource_count() as usize;
        let mut subresources = Vec::with_capacity(count);
        let mut pitches = Vec::with_capacity(count);

        for _slice in 0..desc.array_size {
            for mip in 0..desc.mip_levels {
                let (width, height, depth) = desc.mip_extent(mip);
                let row_stride = desc.format.row_pitch(width);
                let depth_stride = row_stride * desc.format.row_count(height);
                subresources.push(vec![0u8; depth_stride as usize * depth as usize]);
                pitches.push((row_stride, depth_stride));
            }
        }

        Self {
            subresources,
            pitches,
            mapped: vec![false; count],
        }
    }
}

#[derive(Default)]
struct DeviceState {
    textures: HashMap<ResourceHandle, DummyTexture>,
    copies: Vec<CopyRecord>,
    /// Upcoming map attempts that report WouldBlock
    busy_maps: u32,
    fail_maps: bool,
    fail_creates: bool,
    map_attempts: u64,
}

/// Reference [`RenderDevice`] backed by host memory.
pub struct DummyDevice {
    state: Arc<Mutex<DeviceState>>,
    fence: Arc<FenceCounter>,
    deferred: DeferredReleaseQueue,
    next_handle: AtomicU64,
}

impl DummyDevice {
    /// Create a device whose completion counter starts at 0.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(DeviceState::default())),
            fence: Arc::new(FenceCounter::new(0)),
            deferred: DeferredReleaseQueue::new(),
            next_handle: AtomicU64::new(1),
        }
    }

    /// Immediate context sharing this device's resources.
    pub fn context(&self) -> DummyContext {
        DummyContext {
            state: self.state.clone(),
        }
    }

    /// The device's completion counter.
    pub fn fence(&self) -> &Arc<FenceCounter> {
        &self.fence
    }

    /// Destroy deferred objects whose target the fence has reached.
    pub fn purge_stale_objects(&self) -> usize {
        self.deferred.purge(self.fence.last_completed())
    }

    /// Number of deferred objects not yet destroyed.
    pub fn pending_destructions(&self) -> usize {
        self.deferred.len()
    }

    /// Report the next `count` map attempts as WouldBlock.
    pub fn set_busy_maps(&self, count: u32) {
        self.state.lock().busy_maps = count;
    }

    /// Make every subsequent map attempt fail hard.
    pub fn set_map_failure(&self, fail: bool) {
        self.state.lock().fail_maps = fail;
    }

    /// Make every subsequent staging texture creation fail.
    pub fn set_create_failure(&self, fail: bool) {
        self.state.lock().fail_creates = fail;
    }

    /// Copies recorded so far, in submission order.
    pub fn copies(&self) -> Vec<CopyRecord> {
        self.state.lock().copies.clone()
    }

    /// Number of staging textures alive.
    pub fn live_textures(&self) -> usize {
        self.state.lock().textures.len()
    }

    /// Total map attempts, including WouldBlock ones.
    pub fn map_attempts(&self) -> u64 {
        self.state.lock().map_attempts
    }

    /// Snapshot of a staging subresource's bytes.
    pub fn read_subresource(&self, texture: ResourceHandle, subresource: u32) -> Option<Vec<u8>> {
        let state = self.state.lock();
        state
            .textures
            .get(&texture)
            .and_then(|t| t.subresources.get(subresource as usize))
            .cloned()
    }
}

impl Default for DummyDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderDevice for DummyDevice {
    fn create_staging_texture(&self, desc: &UploadBufferDesc) -> Result<ResourceHandle, GpuError> {
        desc.validate().map_err(GpuError::InvalidDescriptor)?;

        let mut state = self.state.lock();
        if state.fail_creates {
            return Err(GpuError::OutOfMemory);
        }

        let handle = ResourceHandle(self.next_handle.fetch_add(1, Ordering::Relaxed));
        state.textures.insert(handle, DummyTexture::new(desc));
        Ok(handle)
    }

    fn release_staging_texture(&self, texture: ResourceHandle) {
        self.state.lock().textures.remove(&texture);
    }

    fn defer_destruction(&self, object: Box<dyn StaleObject>, readiness_target: u64) {
        self.deferred.push(object, readiness_target);
    }
}

/// Reference [`DeviceContext`] for [`DummyDevice`].
pub struct DummyContext {
    state: Arc<Mutex<DeviceState>>,
}

impl DeviceContext for DummyContext {
    fn map_subresource(
        &mut self,
        texture: ResourceHandle,
        subresource: u32,
    ) -> Result<MapOutcome, GpuError> {
        let mut state = self.state.lock();
        state.map_attempts += 1;

        if state.fail_maps {
            return Err(GpuError::Backend("device removed".to_string()));
        }
        if state.busy_maps > 0 {
            state.busy_maps -= 1;
            return Ok(MapOutcome::WouldBlock);
        }

        let tex = state
            .textures
            .get_mut(&texture)
            .ok_or(GpuError::UnknownResource(texture))?;
        let index = subresource as usize;
        if index >= tex.subresources.len() {
            return Err(GpuError::Backend(format!("subresource {} out of range", subresource)));
        }
        if tex.mapped[index] {
            return Err(GpuError::Backend(format!("subresource {} already mapped", subresource)));
        }

        tex.mapped[index] = true;
        let (row_stride, depth_stride) = tex.pitches[index];
        let data = NonNull::new(tex.subresources[index].as_mut_ptr())
            .ok_or_else(|| GpuError::Backend("empty subresource".to_string()))?;

        Ok(MapOutcome::Mapped(MappedSubresource {
            data,
            row_stride,
            depth_stride,
        }))
    }

    fn unmap_subresource(&mut self, texture: ResourceHandle, subresource: u32) {
        let mut state = self.state.lock();
        if let Some(flag) = state
            .textures
            .get_mut(&texture)
            .and_then(|t| t.mapped.get_mut(subresource as usize))
        {
            *flag = false;
        }
    }

    fn copy_subresource(
        &mut self,
        src: ResourceHandle,
        src_subresource: u32,
        dst: ResourceHandle,
        dst_subresource: u32,
        dst_offset: [u32; 3],
    ) {
        self.state.lock().copies.push(CopyRecord {
            src,
            src_subresource,
            dst,
            dst_subresource,
            dst_offset,
        });
    }
}
