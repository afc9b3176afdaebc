use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use futures_util::stream::StreamExt;
use rs2_bridge::reactive::{from_iter as push_iter, Observable, TestObserver};
use rs2_bridge::sequence::from_iter;
use rs2_bridge::*;
use std::time::Duration;
use tokio::runtime::Runtime;

fn bench_push_to_pull(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    let mut group = c.benchmark_group("push_to_pull");
    group.measurement_time(Duration::from_secs(10));

    let data: Vec<u64> = (0..10_000).collect();

    // Small buffers hand the producer thread back and forth more often
    for capacity in [1usize, 16, 64, 1024] {
        group.bench_with_input(BenchmarkId::new("buffer_capacity", capacity), &capacity, |b, &capacity| {
            b.to_async(&rt).iter(|| {
                let source = push_iter(data.clone());
                async move {
                    let result: Vec<_> = observable_to_stream(source, capacity).collect().await;
                    black_box(result)
                }
            });
        });
    }

    group.finish();
}

fn bench_pull_to_push(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    let mut group = c.benchmark_group("pull_to_push");
    group.measurement_time(Duration::from_secs(10));

    for size in [100u64, 10_000] {
        let observable = sequence_to_observable(from_iter((0..size).collect::<Vec<_>>()));
        group.bench_with_input(BenchmarkId::new("items", size), &size, |b, _| {
            b.to_async(&rt).iter(|| {
                let observable = observable.clone();
                async move {
                    let observer = TestObserver::new();
                    observable.subscribe(observer.observer());
                    observer.await_terminal(Duration::from_secs(10)).await;
                    black_box(observer.values().len())
                }
            });
        });
    }

    group.finish();
}

fn bench_round_trip(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    c.bench_function("round_trip_10k", |b| {
        b.to_async(&rt).iter(|| async {
            let result: Vec<_> = from_iter((0..10_000u64).collect::<Vec<_>>())
                .into_observable()
                .into_stream(DEFAULT_BUFFER_CAPACITY)
                .collect()
                .await;
            black_box(result)
        });
    });
}

criterion_group!(benches, bench_push_to_pull, bench_pull_to_push, bench_round_trip);
criterion_main!(benches);
