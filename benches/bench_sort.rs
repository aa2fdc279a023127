use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use hybrid_sort::{HybridSorter, SortConfig};

#[inline(never)]
pub fn standard_sort_slice(slice: &[f32]) -> Vec<f32> {
    let mut data = slice.to_vec();
    data.sort_unstable_by(f32::total_cmp);
    data
}

const BATCH_SIZE: usize = 1_000_000;

pub fn bench_sort(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(42);

    let uniform = (0..BATCH_SIZE).map(|_| rng.gen::<f32>()).collect::<Vec<f32>>();

    let clustered = (0..BATCH_SIZE)
        .map(|_| rng.gen_range(0..100) as f32 / 4.0)
        .collect::<Vec<f32>>();

    let sorter = HybridSorter::default();

    {
        let mut group = c.benchmark_group("uniform");
        group.throughput(Throughput::Bytes((BATCH_SIZE * size_of::<f32>()) as u64));

        group
            .bench_function("standard", |b| b.iter(|| standard_sort_slice(&uniform)))
            .bench_function("hybrid", |b| b.iter(|| sorter.sort(&uniform, BATCH_SIZE, 0.0, 1.0)));
    }

    {
        let mut group = c.benchmark_group("clustered");
        group.throughput(Throughput::Bytes((BATCH_SIZE * size_of::<f32>()) as u64));

        group
            .bench_function("standard", |b| b.iter(|| standard_sort_slice(&clustered)))
            .bench_function("hybrid", |b| b.iter(|| sorter.sort_slice(&clustered)));
    }

    {
        let mut group = c.benchmark_group("divisions");
        group.throughput(Throughput::Bytes((BATCH_SIZE * size_of::<f32>()) as u64));

        for divisions in [64, 256, 1024, 4096] {
            let sorter = HybridSorter::new(SortConfig::default().with_divisions(divisions));
            group.bench_with_input(BenchmarkId::from_parameter(divisions), &uniform, |b, keys| {
                b.iter(|| sorter.sort(keys, BATCH_SIZE, 0.0, 1.0))
            });
        }
    }
}

criterion_group!(benches, bench_sort);
criterion_main!(benches);
