use core::hint::black_box;
use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use futures::future::try_join_all;
use segid::{MemoryRangeStore, SegmentGenerator};
use std::{sync::Arc, time::Instant};
use tokio::runtime::{Builder, Runtime};

// Number of IDs generated per benchmark iteration (per-task for multi-task).
const TOTAL_IDS: usize = 4096;

fn runtime(workers: usize) -> Runtime {
    Builder::new_multi_thread()
        .worker_threads(workers)
        .enable_time()
        .build()
        .expect("failed to build runtime")
}

fn generator(step: i64) -> SegmentGenerator<MemoryRangeStore> {
    let store = MemoryRangeStore::new();
    store.provision("bench", 0, step);
    SegmentGenerator::new(store)
}

/// Benchmarks the cached path where the buffer never runs dry.
fn bench_hot_path(c: &mut Criterion) {
    let rt = runtime(1);
    let mut group = c.benchmark_group("get_id/hot");
    group.throughput(Throughput::Elements(TOTAL_IDS as u64));

    group.bench_function(format!("elems/{TOTAL_IDS}"), |b| {
        b.to_async(&rt).iter_custom(|iters| async move {
            let generator = generator(i64::MAX / 2);
            let start = Instant::now();
            for _ in 0..iters {
                for _ in 0..TOTAL_IDS {
                    black_box(generator.get_id("bench").await.unwrap());
                }
            }
            start.elapsed()
        });
    });

    group.finish();
}

/// Benchmarks a small step so that refills dominate.
fn bench_refill_path(c: &mut Criterion) {
    let rt = runtime(1);
    let mut group = c.benchmark_group("get_id/refill");
    group.throughput(Throughput::Elements(TOTAL_IDS as u64));

    for step in [1, 16, 256] {
        group.bench_function(format!("step/{step}"), |b| {
            b.to_async(&rt).iter_custom(|iters| async move {
                let generator = generator(step);
                let start = Instant::now();
                for _ in 0..iters {
                    black_box(generator.get_id_batch("bench", TOTAL_IDS).await.unwrap());
                }
                start.elapsed()
            });
        });
    }

    group.finish();
}

/// Benchmarks many tasks contending on the same tag's buffer lock.
fn bench_contended(c: &mut Criterion) {
    let rt = runtime(8);
    let mut group = c.benchmark_group("get_id/contended");

    for tasks in [2, 8, 32] {
        group.throughput(Throughput::Elements((TOTAL_IDS * tasks) as u64));
        group.bench_function(format!("tasks/{tasks}"), |b| {
            b.to_async(&rt).iter_custom(|iters| async move {
                let generator = Arc::new(generator(1_000));
                let start = Instant::now();
                for _ in 0..iters {
                    let handles = (0..tasks).map(|_| {
                        let generator = Arc::clone(&generator);
                        tokio::spawn(async move {
                            for _ in 0..TOTAL_IDS {
                                black_box(generator.get_id("bench").await.unwrap());
                            }
                        })
                    });
                    try_join_all(handles).await.unwrap();
                }
                start.elapsed()
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_hot_path, bench_refill_path, bench_contended);
criterion_main!(benches);
