use criterion::{criterion_group, criterion_main, Criterion};
use sketchy::{
    bloom::BloomFilter,
    canonical::{Canonicalizer, NormalizedSeq},
    hash_functions::{ahash, murmur3, pack_kmer, xxhash3},
    sketch::Sketch,
};
use std::time::Duration;

fn random_seq(length: u64) -> Vec<u8> {
    (0..length).map(|i| b"ACGT"[(ahash(i) % 4) as usize]).collect()
}

fn hash_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("Hashes");
    group.warm_up_time(Duration::from_millis(100));
    group.measurement_time(Duration::from_millis(100));

    let kmer = random_seq(21);
    group.bench_function("murmur3_k21", |b| b.iter(|| murmur3(&kmer)));
    group.bench_function("xxhash3_k21", |b| b.iter(|| xxhash3(&kmer)));
    group.bench_function("ahash_k21", |b| b.iter(|| ahash(pack_kmer(&kmer))));
    group.finish();
}

fn sketch_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("Sketching");
    group.warm_up_time(Duration::from_millis(100));
    group.measurement_time(Duration::from_secs(1));

    let seq = random_seq(100_000);
    let canon = Canonicalizer::new(true);
    group.bench_function("windows_100k", |b| {
        let normalized = NormalizedSeq::new(&seq);
        b.iter(|| canon.windows(&normalized, 21).count())
    });
    group.bench_function("bottom_k_insert_100k", |b| {
        b.iter(|| {
            let mut sketch = Sketch::new("bench".to_string(), 1000);
            sketch.extend((0..100_000u64).map(ahash)).unwrap();
            sketch.len()
        })
    });
    group.bench_function("bloom_test_and_insert_100k", |b| {
        let bloom = BloomFilter::with_target(1_000_000, 0.001, 1 << 24).unwrap();
        b.iter(|| {
            (0..100_000u64)
                .map(|i| bloom.test_and_insert(ahash(i)))
                .count()
        })
    });
    group.finish();
}

criterion_group!(benches, hash_benchmark, sketch_benchmark);
criterion_main!(benches);
