//! Baseline perf of the arrival decision path.
#![allow(clippy::missing_docs_in_private_items, clippy::expect_used)]
#[macro_use]
extern crate criterion;

use criterion::criterion_group;
use criterion::Criterion;
use erlang_loss::arrival::ArrivalSource;
use erlang_loss::ChannelPool;
use std::time::Duration;

fn saturated_pool_bench(c: &mut Criterion) {
    let mut group = c.benchmark_group("saturated pool");

    // Every channel stays busy for the whole benchmark, so each emit takes
    // the lock, scans all channels and rejects.
    for channels in [1, 8, 64] {
        let pool = ChannelPool::new(channels, 1.0 / 3600.0).expect("valid config");
        let source = ArrivalSource::new(pool.clone());
        for id in 0..channels as u64 {
            source.emit(id);
        }

        group.bench_function(format!("reject with {channels} channels"), |b| {
            let mut id = 0;
            b.iter(|| {
                id += 1;
                source.emit(id)
            });
        });
    }
    group.finish();
}

fn idle_pool_bench(c: &mut Criterion) {
    let mut group = c.benchmark_group("idle pool");
    group.measurement_time(Duration::from_secs(2));

    group.bench_function("construct", |b| {
        b.iter(|| ChannelPool::new(16, 1.0).expect("valid config"));
    });
    group.bench_function("snapshot", |b| {
        let pool = ChannelPool::new(16, 1.0).expect("valid config");
        b.iter(|| pool.snapshot());
    });
    group.finish();
}

criterion_group!(benches, saturated_pool_bench, idle_pool_bench);
criterion_main!(benches);
