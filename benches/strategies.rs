//! Strategy comparison benchmarks
//!
//! Each strategy drains 1024-byte bodies into 2048-byte buffers, once on a
//! single task and once spread across 4 concurrent tasks.
//! Run with: cargo bench --bench strategies

use bytes::{Bytes, BytesMut};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use http_body_util::Full;
use std::sync::Arc;

use pool_perf::config::Config;
use pool_perf::pool::{BoundedBufferPool, RecycledPool};
use pool_perf::server::AppState;
use pool_perf::strategy::Strategy;

const BODY_SIZE: usize = 1024;
const TASKS: usize = 4;
const REQUESTS_PER_TASK: usize = 250;

fn state() -> Arc<AppState> {
    Arc::new(AppState::new(&Config::default()).expect("default config is valid"))
}

/// Benchmark one body drain per iteration
fn bench_single_drain(c: &mut Criterion) {
    let rt = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();
    let state = state();
    let body = Bytes::from(vec![b'0'; BODY_SIZE]);

    let mut group = c.benchmark_group("single_drain");
    group.throughput(Throughput::Bytes(BODY_SIZE as u64));

    for strategy in Strategy::ALL {
        group.bench_with_input(BenchmarkId::from_parameter(strategy), &strategy, |b, &strategy| {
            b.iter(|| {
                let n = rt
                    .block_on(state.drain(strategy, Full::new(body.clone())))
                    .unwrap();
                black_box(n);
            })
        });
    }

    group.finish();
}

/// Benchmark concurrent drains, mirroring a parallel request load
fn bench_parallel_drain(c: &mut Criterion) {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(TASKS)
        .build()
        .unwrap();
    let state = state();
    let body = Bytes::from(vec![b'0'; BODY_SIZE]);

    let mut group = c.benchmark_group("parallel_drain");
    group.throughput(Throughput::Elements((TASKS * REQUESTS_PER_TASK) as u64));

    for strategy in Strategy::ALL {
        group.bench_with_input(BenchmarkId::from_parameter(strategy), &strategy, |b, &strategy| {
            b.iter(|| {
                rt.block_on(async {
                    let tasks: Vec<_> = (0..TASKS)
                        .map(|_| {
                            let state = state.clone();
                            let body = body.clone();
                            tokio::spawn(async move {
                                for _ in 0..REQUESTS_PER_TASK {
                                    let n = state
                                        .drain(strategy, Full::new(body.clone()))
                                        .await
                                        .unwrap();
                                    black_box(n);
                                }
                            })
                        })
                        .collect();

                    for task in tasks {
                        task.await.unwrap();
                    }
                })
            })
        });
    }

    group.finish();
}

/// Benchmark the bare acquire/release cycle of each buffer source
fn bench_acquire_release(c: &mut Criterion) {
    let bounded = BoundedBufferPool::new(2048, 10).unwrap();
    let recycled = RecycledPool::new(2048);

    let mut group = c.benchmark_group("acquire_release");
    group.throughput(Throughput::Elements(1));

    group.bench_function("fresh_alloc", |b| {
        b.iter(|| black_box(BytesMut::with_capacity(2048)))
    });

    group.bench_function("recycled_pool", |b| {
        b.iter(|| {
            let buf = recycled.get();
            black_box(buf.capacity());
        })
    });

    group.bench_function("bounded_pool", |b| {
        b.iter(|| {
            let lease = bounded.get_blocking();
            black_box(lease.index());
            bounded.put(lease);
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_single_drain,
    bench_parallel_drain,
    bench_acquire_release,
);
criterion_main!(benches);
