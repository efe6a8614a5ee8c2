use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use stagealloc::gpu::DummyDevice;
use stagealloc::{
    DynamicHeap, FreeListRangeAllocator, HeapConfig, MasterBlockPool, RangeAllocator,
    RingRangeAllocator,
};

// =============================================================================
// RANGE ALLOCATORS
// =============================================================================

fn bench_ring_frame(c: &mut Criterion) {
    let mut group = c.benchmark_group("ring_frame");

    for count in [64u64, 1024] {
        group.throughput(Throughput::Elements(count));
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            let mut ring = RingRangeAllocator::new(64 * 1024 * 1024);
            let mut frame = 0u64;
            b.iter(|| {
                for _ in 0..count {
                    black_box(ring.allocate(256, 256).unwrap());
                }
                frame += 1;
                ring.finish_current_frame(frame);
                ring.release_completed_frames(frame);
            });
        });
    }

    group.finish();
}

fn bench_free_list_churn(c: &mut Criterion) {
    let mut group = c.benchmark_group("free_list_churn");

    for live in [16usize, 256] {
        group.throughput(Throughput::Elements(live as u64));
        group.bench_with_input(BenchmarkId::from_parameter(live), &live, |b, &live| {
            let mut list = FreeListRangeAllocator::new(64 * 1024 * 1024);
            b.iter(|| {
                let ranges: Vec<_> = (0..live)
                    .map(|i| list.allocate(64 + (i as u64 % 7) * 32, 16).unwrap())
                    .collect();
                // Free odd then even to exercise both merge directions.
                for range in ranges.iter().skip(1).step_by(2) {
                    list.free(*range);
                }
                for range in ranges.iter().step_by(2) {
                    list.free(*range);
                }
            });
        });
    }

    group.finish();
}

// =============================================================================
// MASTER BLOCKS AND DYNAMIC HEAPS
// =============================================================================

fn bench_dynamic_heap_frame(c: &mut Criterion) {
    let mut group = c.benchmark_group("dynamic_heap_frame");
    group.throughput(Throughput::Elements(4096));

    group.bench_function("ring_pool", |b| {
        let config = HeapConfig::default();
        let pool = MasterBlockPool::ring(config.arena_size);
        let mut heap = DynamicHeap::from_config(pool.clone(), "bench", &config);
        let mut frame = 0u64;
        b.iter(|| {
            for _ in 0..4096 {
                black_box(heap.allocate(256, 256).unwrap());
            }
            frame += 1;
            heap.discard_master_blocks(frame);
            pool.release_stale_blocks(frame);
        });
    });

    group.bench_function("free_list_pool", |b| {
        let config = HeapConfig::default();
        let device = DummyDevice::new();
        let pool = MasterBlockPool::free_list(config.arena_size);
        let mut heap = DynamicHeap::from_config(pool, "bench", &config);
        let mut frame = 0u64;
        b.iter(|| {
            for _ in 0..4096 {
                black_box(heap.allocate(256, 256).unwrap());
            }
            frame += 1;
            heap.release_master_blocks(&device, frame);
            device.fence().advance(frame);
            device.purge_stale_objects();
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_ring_frame,
    bench_free_list_churn,
    bench_dynamic_heap_frame,
);

criterion_main!(benches);
