use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use gauze::XorFilter;

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("xor_build");

    for size in [1_000, 10_000, 100_000] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            let keys: Vec<u64> = (0..size).collect();
            b.iter(|| {
                black_box(XorFilter::build(0.01, keys.clone()).unwrap());
            });
        });
    }

    group.finish();
}

fn bench_query(c: &mut Criterion) {
    let mut group = c.benchmark_group("xor_query");

    let keys: Vec<u64> = (0..100_000).collect();
    let filter = XorFilter::build(0.01, keys).unwrap();

    group.bench_function("hit", |b| {
        b.iter(|| black_box(filter.contains(black_box(&100u64))));
    });
    group.bench_function("miss", |b| {
        b.iter(|| black_box(filter.contains(black_box(&999_999_999u64))));
    });

    group.finish();
}

criterion_group!(benches, bench_build, bench_query);
criterion_main!(benches);
