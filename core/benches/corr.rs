use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::Rng;
use rand::SeedableRng;
use rand_pcg::Pcg64;

use popsim_core::corr::{auto_corr_brute, CorrFft};

fn random_signal(length: usize) -> Vec<f64> {
    let mut rng = Pcg64::seed_from_u64(510);
    (0..length).map(|_| rng.gen::<f64>()).collect()
}

fn bench_auto_corr(c: &mut Criterion) {
    let mut group = c.benchmark_group("auto_corr");
    for length in [510, 1000, 1048] {
        let signal = random_signal(length);

        let corr = CorrFft::new(length, true);
        group.bench_with_input(BenchmarkId::new("fft", length), &signal, |b, signal| {
            b.iter(|| corr.auto_corr(signal))
        });
        group.bench_with_input(
            BenchmarkId::new("brute_force", length),
            &signal,
            |b, signal| b.iter(|| auto_corr_brute(signal, true)),
        );
    }
    group.finish();
}

criterion_group!(benches, bench_auto_corr);
criterion_main!(benches);
