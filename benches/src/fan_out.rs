use criterion::{BatchSize, BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use multigroup::prelude::*;
use tokio::runtime::Runtime;

/// Pseudo-random elements below `1 << width`
fn generate_elements(count: usize, width: u32) -> Vec<u64> {
    let modulus = 1u64 << width;
    (0..count as u64)
        .map(|i| i.wrapping_mul(2_654_435_761) % modulus)
        .collect()
}

/// Keys of an element are its set bits
fn bit_keys(value: &u64) -> Vec<u32> {
    (0..u64::BITS).filter(|bit| value & (1 << bit) != 0).collect()
}

/// Benchmark how many substreams each element fans out to
fn bench_fan_out_width(c: &mut Criterion) {
    let mut group = c.benchmark_group("fan_out_width");
    let runtime = Runtime::new().unwrap();

    for width in [1u32, 4, 8, 16] {
        group.bench_with_input(BenchmarkId::from_parameter(width), &width, |b, &width| {
            b.to_async(&runtime).iter_batched(
                || generate_elements(10_000, width),
                |elements| async move {
                    let results = MultiGroupBy::new(
                        width as usize,
                        keys_fn(bit_keys),
                        map_window(|_key: &u32, window: Vec<u64>| window.iter().sum::<u64>()),
                    )
                    .with_batch_size(64)
                    .process_iter(elements)
                    .await
                    .unwrap();
                    black_box(results);
                },
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

/// Benchmark window size against a fixed fan-out
fn bench_batch_size(c: &mut Criterion) {
    let mut group = c.benchmark_group("batch_size");
    let runtime = Runtime::new().unwrap();

    for batch_size in [1usize, 16, 256, 4096] {
        group.bench_with_input(
            BenchmarkId::from_parameter(batch_size),
            &batch_size,
            |b, &batch_size| {
                b.to_async(&runtime).iter_batched(
                    || generate_elements(10_000, 4),
                    |elements| async move {
                        let results = MultiGroupBy::new(
                            4,
                            keys_fn(bit_keys),
                            map_window(|_key: &u32, window: Vec<u64>| window.len()),
                        )
                        .with_batch_size(batch_size)
                        .process_iter(elements)
                        .await
                        .unwrap();
                        black_box(results);
                    },
                    BatchSize::SmallInput,
                );
            },
        );
    }

    group.finish();
}

/// Benchmark backpressure: small inboxes make the router wait on pipelines
fn bench_buffer_capacity(c: &mut Criterion) {
    let mut group = c.benchmark_group("buffer_capacity");
    let runtime = Runtime::new().unwrap();

    for capacity in [1usize, 16, 256] {
        group.bench_with_input(BenchmarkId::from_parameter(capacity), &capacity, |b, &capacity| {
            b.to_async(&runtime).iter_batched(
                || generate_elements(10_000, 8),
                |elements| async move {
                    let results = MultiGroupBy::new(
                        8,
                        keys_fn(bit_keys),
                        map_window(|_key: &u32, window: Vec<u64>| window.len()),
                    )
                    .with_buffer_capacity(capacity)
                    .process_iter(elements)
                    .await
                    .unwrap();
                    black_box(results);
                },
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

criterion_group!(benches, bench_fan_out_width, bench_batch_size, bench_buffer_capacity);
criterion_main!(benches);
