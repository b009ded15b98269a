// Read performance benchmarks for block cursors

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use sstblock::{Block, BlockBuilder, BytewiseComparator};
use std::hint::black_box;

fn build_block(size: usize, restart_interval: usize) -> Block {
    let mut builder = BlockBuilder::new(restart_interval);
    for i in 0..size {
        let key = format!("key{:08}", i);
        let value = format!("value{:08}", i);
        builder.add(key.as_bytes(), value.as_bytes());
    }
    Block::new(builder.finish())
}

fn benchmark_sequential_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("sequential_scan");
    let cmp = BytewiseComparator;

    for size in [100, 1000, 10000].iter() {
        let block = build_block(*size, 16);

        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                let mut iter = block.iter(&cmp, false);
                iter.seek_to_first();
                while iter.valid() {
                    black_box(iter.key());
                    black_box(iter.value());
                    iter.next();
                }
            });
        });
    }

    group.finish();
}

fn benchmark_random_seek(c: &mut Criterion) {
    let mut group = c.benchmark_group("random_seek");
    let cmp = BytewiseComparator;

    for size in [100, 1000, 10000].iter() {
        let block = build_block(*size, 16);

        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            b.iter(|| {
                use rand::Rng;
                let mut rng = rand::rng();

                for _ in 0..size {
                    let key_num: usize = rng.random_range(0..size);
                    let key = format!("key{:08}", key_num);
                    let mut iter = block.iter(&cmp, false);
                    iter.seek(key.as_bytes());
                    black_box(iter.valid());
                }
            });
        });
    }

    group.finish();
}

fn benchmark_backward_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("backward_scan");
    let cmp = BytewiseComparator;

    for interval in [1usize, 16, 64].iter() {
        let block = build_block(1000, *interval);

        group.throughput(Throughput::Elements(1000));
        group.bench_with_input(BenchmarkId::from_parameter(interval), interval, |b, _| {
            b.iter(|| {
                let mut iter = block.iter(&cmp, false);
                iter.seek_to_last();
                while iter.valid() {
                    black_box(iter.key());
                    iter.prev();
                }
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_sequential_scan,
    benchmark_random_seek,
    benchmark_backward_scan
);
criterion_main!(benches);
