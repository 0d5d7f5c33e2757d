use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use gauze::VacuumFilter;

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("vacuum_insert");
    group.throughput(Throughput::Elements(1_000));

    for capacity in [1_000, 10_000, 100_000] {
        group.bench_with_input(
            BenchmarkId::from_parameter(capacity),
            &capacity,
            |b, &capacity| {
                b.iter_batched(
                    || VacuumFilter::new(capacity, 0.01).unwrap(),
                    |mut filter| {
                        for i in 0u64..1_000 {
                            let _ = filter.insert_key(black_box(&i));
                        }
                    },
                    criterion::BatchSize::SmallInput,
                );
            },
        );
    }

    group.finish();
}

fn bench_query(c: &mut Criterion) {
    let mut group = c.benchmark_group("vacuum_query");

    let mut filter = VacuumFilter::new(100_000, 0.01).unwrap();
    for i in 0u64..50_000 {
        filter.insert_key(&i).unwrap();
    }

    group.bench_function("hit", |b| {
        b.iter(|| black_box(filter.contains_key(black_box(&100u64))));
    });
    group.bench_function("miss", |b| {
        b.iter(|| black_box(filter.contains_key(black_box(&999_999u64))));
    });

    group.finish();
}

fn bench_load_factor(c: &mut Criterion) {
    let mut group = c.benchmark_group("vacuum_load_factor");

    for fill_ratio in [0.5, 0.8, 0.95] {
        group.bench_with_input(
            BenchmarkId::from_parameter(fill_ratio),
            &fill_ratio,
            |b, &fill_ratio| {
                b.iter_batched(
                    || VacuumFilter::new(10_000, 0.01).unwrap(),
                    |mut filter| {
                        let target = (10_000.0 * fill_ratio) as u64;
                        for i in 0..target {
                            let _ = filter.insert_key(black_box(&i));
                        }
                    },
                    criterion::BatchSize::SmallInput,
                );
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_insert, bench_query, bench_load_factor);
criterion_main!(benches);
