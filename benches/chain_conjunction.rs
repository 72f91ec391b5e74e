//! Microbenchmarks for the per-codec `ChainOps::conjoin` hot path.
//!
//! Each codec conjoins a pair of chains over a fixed row count many times;
//! the interesting comparison is how the cost scales with codec (packed
//! bits vs. per-row floats vs. quantized fubits) rather than any single
//! absolute number.

use condition_digger::{BitChain, ChainOps, FloatChain, FubitBlockSize, FubitChain, PredicateType, TNorm};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::{rngs::StdRng, Rng, SeedableRng};

const ROW_COUNTS: &[usize] = &[1_000, 10_000, 100_000];

fn random_bits(rng: &mut StdRng, n: usize) -> Vec<bool> {
    (0..n).map(|_| rng.gen_bool(0.3)).collect()
}

fn random_degrees(rng: &mut StdRng, n: usize) -> Vec<f32> {
    (0..n).map(|_| rng.gen_range(0.0..=1.0)).collect()
}

fn bench_bit_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("conjoin/bit");
    let mut rng = StdRng::seed_from_u64(42);
    for &n in ROW_COUNTS {
        let a = BitChain::from_bits(1, PredicateType::Condition, &random_bits(&mut rng, n));
        let b = BitChain::from_bits(2, PredicateType::Condition, &random_bits(&mut rng, n));
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |bencher, _| {
            bencher.iter(|| black_box(a.conjoin(&b, false).unwrap()))
        });
    }
    group.finish();
}

fn bench_float_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("conjoin/float");
    let mut rng = StdRng::seed_from_u64(42);
    for &n in ROW_COUNTS {
        let a = FloatChain::from_degrees(1, PredicateType::Condition, TNorm::Goedel, &random_degrees(&mut rng, n));
        let b = FloatChain::from_degrees(2, PredicateType::Condition, TNorm::Goedel, &random_degrees(&mut rng, n));
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |bencher, _| {
            bencher.iter(|| black_box(a.conjoin(&b, false).unwrap()))
        });
    }
    group.finish();
}

fn bench_fubit_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("conjoin/fubit");
    let mut rng = StdRng::seed_from_u64(42);
    for &n in ROW_COUNTS {
        let a = FubitChain::from_degrees(
            1,
            PredicateType::Condition,
            TNorm::Goedel,
            FubitBlockSize::Eight,
            &random_degrees(&mut rng, n),
        );
        let b = FubitChain::from_degrees(
            2,
            PredicateType::Condition,
            TNorm::Goedel,
            FubitBlockSize::Eight,
            &random_degrees(&mut rng, n),
        );
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |bencher, _| {
            bencher.iter(|| black_box(a.conjoin(&b, false).unwrap()))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_bit_chain, bench_float_chain, bench_fubit_chain);
criterion_main!(benches);
