//! Integration tests for stagealloc.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use stagealloc::diagnostics::{set_sink, CollectingSink};
use stagealloc::gpu::{DummyDevice, GpuError, ResourceHandle};
use stagealloc::{
    AllocError, CopyTarget, DynamicAllocation, DynamicHeap, HeapConfig, MasterBlockPool,
    TextureFormat, UploadBufferDesc, UploadBufferPool, UploadConfig,
};

/// Render thread stand-in: pumps the pool until dropped.
struct Pump {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Pump {
    fn spawn(pool: Arc<UploadBufferPool>, device: &DummyDevice) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let mut ctx = device.context();
        let handle = {
            let stop = stop.clone();
            thread::spawn(move || {
                while !stop.load(Ordering::Acquire) {
                    pool.render_thread_update(&mut ctx);
                    thread::sleep(Duration::from_micros(100));
                }
            })
        };
        Self {
            stop,
            handle: Some(handle),
        }
    }
}

impl Drop for Pump {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn wait_until(mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while !condition() {
        assert!(Instant::now() < deadline, "timed out waiting for the pump");
        thread::sleep(Duration::from_millis(1));
    }
}

fn target(texture: u64) -> CopyTarget {
    CopyTarget {
        texture: ResourceHandle(texture),
        mip_levels: 1,
        mip: 0,
        slice: 0,
    }
}

#[test]
fn test_acquire_returns_mapped_buffer() {
    let device = Arc::new(DummyDevice::new());
    let pool = Arc::new(UploadBufferPool::new(device.clone(), UploadConfig::default()));
    let _pump = Pump::spawn(pool.clone(), &device);

    let desc = UploadBufferDesc::new_2d(256, 256, TextureFormat::Rgba8Unorm);
    let buffer = pool.acquire(&desc).unwrap();
    assert!(buffer.is_mapped());

    let texels = buffer.mapped_data(0, 0).unwrap();
    assert_eq!(texels.row_stride, 1024);
    assert_eq!(texels.depth_stride, 1024 * 256);

    // Fill the first row.
    unsafe {
        std::ptr::write_bytes(texels.data.as_ptr(), 0xAB, texels.row_stride as usize);
    }

    pool.schedule_gpu_copy(&buffer, target(100));
    buffer.wait_for_copy_scheduled();

    let staged = device.read_subresource(buffer.staging_texture(), 0).unwrap();
    assert!(staged[..1024].iter().all(|&b| b == 0xAB));
    assert_eq!(staged[1024], 0);

    pool.recycle(buffer);
}

#[test]
#[should_panic(expected = "SA201")]
fn test_recycle_before_copy_is_fatal() {
    let device = Arc::new(DummyDevice::new());
    let pool = Arc::new(UploadBufferPool::new(device.clone(), UploadConfig::default()));
    let _pump = Pump::spawn(pool.clone(), &device);

    let desc = UploadBufferDesc::new_2d(256, 256, TextureFormat::Rgba8Unorm);
    let buffer = pool.acquire(&desc).unwrap();
    pool.recycle(buffer);
}

#[test]
fn test_recycled_buffer_is_reused_mapped() {
    let device = Arc::new(DummyDevice::new());
    let pool = Arc::new(UploadBufferPool::new(device.clone(), UploadConfig::default()));
    let _pump = Pump::spawn(pool.clone(), &device);

    let desc = UploadBufferDesc::new_2d(128, 128, TextureFormat::Bgra8Unorm).with_mip_levels(4);
    let first = pool.acquire(&desc).unwrap();
    pool.schedule_gpu_copy(&first, target(1));
    first.wait_for_copy_scheduled();

    let staging = first.staging_texture();
    pool.recycle(first.clone());
    wait_until(|| pool.stats().idle_buffers == 1);

    let second = pool.acquire(&desc).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(second.staging_texture(), staging);
    assert!(second.is_mapped());
    assert!(!second.is_copy_scheduled());
    assert!(second.mapped_data(3, 0).is_some());
    assert_eq!(pool.stats().buffers_created, 1);

    // Different descriptor, different buffer.
    let other = pool.acquire(&desc.with_mip_levels(1)).unwrap();
    assert!(!Arc::ptr_eq(&first, &other));
    assert_eq!(pool.stats().buffers_created, 2);

    for buffer in [second, other] {
        pool.schedule_gpu_copy(&buffer, target(1));
        buffer.wait_for_copy_scheduled();
        pool.recycle(buffer);
    }
}

#[test]
fn test_busy_gpu_map_is_retried() {
    let sink = Arc::new(CollectingSink::new());
    set_sink(Some(sink.clone()));

    let device = Arc::new(DummyDevice::new());
    let config = UploadConfig::default().with_map_retry_warning_threshold(3);
    let pool = Arc::new(UploadBufferPool::new(device.clone(), config));

    device.set_busy_maps(5);
    let _pump = Pump::spawn(pool.clone(), &device);

    let desc = UploadBufferDesc::new_2d(64, 64, TextureFormat::R32Float);
    let buffer = pool.acquire(&desc).unwrap();
    assert!(buffer.is_mapped());
    assert_eq!(pool.stats().map_retries, 5);
    assert_eq!(device.map_attempts(), 6);
    assert!(sink.contains("SA302"));

    pool.schedule_gpu_copy(&buffer, target(2));
    buffer.wait_for_copy_scheduled();
    pool.recycle(buffer);
    set_sink(None);
}

#[test]
fn test_copy_targets_destination_subresources() {
    let device = Arc::new(DummyDevice::new());
    let pool = Arc::new(UploadBufferPool::new(device.clone(), UploadConfig::default()));
    let _pump = Pump::spawn(pool.clone(), &device);

    let desc = UploadBufferDesc::new_2d(64, 64, TextureFormat::Bc1Unorm)
        .with_mip_levels(3)
        .with_array_size(2);
    let buffer = pool.acquire(&desc).unwrap();
    assert_eq!(buffer.mapped_data(0, 1).unwrap().row_stride, 16 * 8);

    let dst = CopyTarget {
        texture: ResourceHandle(77),
        mip_levels: 8,
        mip: 2,
        slice: 1,
    };
    pool.schedule_gpu_copy(&buffer, dst);
    buffer.wait_for_copy_scheduled();

    let copies = device.copies();
    assert_eq!(copies.len(), 6);
    let expected: Vec<(u32, u32)> = (0..2u32)
        .flat_map(|slice| (0..3u32).map(move |mip| (mip + slice * 3, (mip + 2) + (slice + 1) * 8)))
        .collect();
    let actual: Vec<(u32, u32)> = copies
        .iter()
        .map(|c| (c.src_subresource, c.dst_subresource))
        .collect();
    assert_eq!(actual, expected);
    assert!(copies.iter().all(|c| c.dst == ResourceHandle(77) && c.dst_offset == [0, 0, 0]));
    assert!(copies.iter().all(|c| c.src == buffer.staging_texture()));

    pool.recycle(buffer);
}

#[test]
fn test_pending_stats_exclude_map_and_cache() {
    let device = Arc::new(DummyDevice::new());
    let mut ctx = device.context();
    let pool = Arc::new(UploadBufferPool::new(device.clone(), UploadConfig::default()));
    let desc = UploadBufferDesc::new_2d(32, 32, TextureFormat::Rgba16Float);

    // Pump by hand so every stage can be observed.
    let producer = {
        let pool = pool.clone();
        thread::spawn(move || pool.acquire(&desc))
    };
    wait_until(|| pool.stats().pending_maps == 1);
    while !producer.is_finished() {
        pool.render_thread_update(&mut ctx);
        thread::sleep(Duration::from_millis(1));
    }
    let buffer = producer.join().unwrap().unwrap();
    assert_eq!(pool.stats().pending_operations(), 0);

    pool.schedule_gpu_copy(&buffer, target(5));
    assert_eq!(pool.stats().pending_copies, 1);
    assert_eq!(pool.render_thread_update(&mut ctx), 1);
    assert_eq!(pool.stats().pending_copies, 0);

    pool.recycle(buffer);
    assert_eq!(pool.stats().pending_operations(), 0);
    assert_eq!(pool.stats().idle_buffers, 0);

    pool.render_thread_update(&mut ctx);
    assert_eq!(pool.stats().idle_buffers, 1);
}

#[test]
fn test_create_failure_reaches_caller() {
    let device = Arc::new(DummyDevice::new());
    let pool = UploadBufferPool::new(device.clone(), UploadConfig::default());

    device.set_create_failure(true);
    let desc = UploadBufferDesc::new_2d(16, 16, TextureFormat::R8Unorm);
    assert!(pool.acquire(&desc).is_err());
    assert_eq!(device.live_textures(), 0);
}

#[test]
fn test_map_failure_releases_waiting_acquirer() {
    let device = Arc::new(DummyDevice::new());
    let pool = Arc::new(UploadBufferPool::new(device.clone(), UploadConfig::default()));
    let desc = UploadBufferDesc::new_2d(32, 32, TextureFormat::Rgba8Unorm);

    let producer = {
        let pool = pool.clone();
        thread::spawn(move || pool.acquire(&desc))
    };
    wait_until(|| pool.stats().pending_maps == 1);

    device.set_map_failure(true);
    let render = {
        let pool = pool.clone();
        let mut ctx = device.context();
        thread::spawn(move || pool.render_thread_update(&mut ctx))
    };
    assert!(render.join().is_err(), "hard map failure must panic the pump");

    wait_until(|| producer.is_finished());
    assert_eq!(producer.join().unwrap().unwrap_err(), GpuError::PipelineAborted);

    // Later misses fail fast instead of waiting on a dead pump.
    assert_eq!(pool.acquire(&desc).unwrap_err(), GpuError::PipelineAborted);
    assert_eq!(pool.stats().pending_operations(), 0);
    assert_eq!(device.live_textures(), 0);
}

#[test]
fn test_multithreaded_producers() {
    const THREADS: usize = 4;
    const UPLOADS: usize = 10;

    let device = Arc::new(DummyDevice::new());
    let config = UploadConfig::default().with_max_idle_buffers_per_desc(2);
    let pool = Arc::new(UploadBufferPool::new(device.clone(), config));
    let pump = Pump::spawn(pool.clone(), &device);

    let producers: Vec<_> = (0..THREADS)
        .map(|t| {
            let pool = pool.clone();
            thread::spawn(move || {
                let format = if t % 2 == 0 {
                    TextureFormat::Rgba8Unorm
                } else {
                    TextureFormat::R16Unorm
                };
                let desc = UploadBufferDesc::new_2d(64, 32, format);
                for i in 0..UPLOADS {
                    let buffer = pool.acquire(&desc).unwrap();
                    let texels = buffer.mapped_data(0, 0).unwrap();
                    unsafe {
                        std::ptr::write_bytes(texels.data.as_ptr(), i as u8, texels.row_stride as usize);
                    }
                    pool.schedule_gpu_copy(&buffer, target(1000 + t as u64));
                    buffer.wait_for_copy_scheduled();
                    pool.recycle(buffer);
                }
            })
        })
        .collect();

    for producer in producers {
        producer.join().expect("producer panicked");
    }

    assert_eq!(device.copies().len(), THREADS * UPLOADS);
    wait_until(|| pool.stats().pending_operations() == 0);

    drop(pump);
    let stats = pool.stats();
    assert!(stats.idle_buffers <= 4);
    assert!(stats.buffers_created as usize <= THREADS * UPLOADS);
}

#[test]
fn test_ring_pool_exhaustion_and_reclaim() {
    let pool = MasterBlockPool::ring(1024);

    let first = pool.allocate_master_block(700, 16).unwrap();
    assert_eq!(pool.allocate_master_block(700, 16).unwrap_err(), AllocError::Exhausted);

    pool.discard_master_blocks([first], 1);
    assert_eq!(pool.release_stale_blocks(1), 700);

    let second = pool.allocate_master_block(700, 16).unwrap();
    pool.discard_master_blocks([second], 2);
    pool.release_stale_blocks(2);
}

#[test]
fn test_no_premature_master_block_reuse() {
    const LATENCY: u64 = 3;

    let device = DummyDevice::new();
    let config = HeapConfig::minimal();
    let pool = MasterBlockPool::free_list(config.arena_size);
    let mut heap = DynamicHeap::from_config(pool.clone(), "frame heap", &config);

    let mut in_flight: VecDeque<(u64, Vec<DynamicAllocation>)> = VecDeque::new();

    for frame in 1..=20u64 {
        let completed = frame.saturating_sub(LATENCY);
        device.fence().advance(completed);
        device.purge_stale_objects();
        in_flight.retain(|(target, _)| *target > completed);

        let allocations: Vec<_> = (0..4).map(|_| heap.allocate(3000, 256).unwrap()).collect();
        for fresh in &allocations {
            for (_, old) in &in_flight {
                for busy in old {
                    let disjoint = fresh.offset + fresh.size <= busy.offset
                        || busy.offset + busy.size <= fresh.offset;
                    assert!(disjoint, "frame {}: {:?} reuses {:?}", frame, fresh, busy);
                }
            }
        }

        heap.release_master_blocks(&device, frame);
        in_flight.push_back((frame, allocations));
    }

    device.fence().advance(20);
    device.purge_stale_objects();
    assert_eq!(pool.outstanding_blocks(), 0);
    assert_eq!(pool.used_size(), 0);
    assert_eq!(heap.stats().peak_blocks, 4);
}
