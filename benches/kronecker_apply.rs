use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use faer::Mat;
use matfree::{Operator, kron};

fn factor(n: usize, shift: f64) -> Mat<f64> {
    Mat::from_fn(n, n, |i, j| ((i * n + j) as f64 + shift).sin())
}

fn bench_kron_vs_dense(c: &mut Criterion) {
    let mut group = c.benchmark_group("kronecker apply");
    for &n in &[10usize, 20, 40] {
        let a = Operator::dense(factor(n, 0.0));
        let b = Operator::dense(factor(n, 0.5));
        let k = kron(&a, &b).unwrap();
        let dense = Operator::dense(k.to_dense().unwrap());
        let x = Mat::from_fn(n * n, 4, |i, j| ((i + j) as f64).cos());

        group.bench_with_input(BenchmarkId::new("matrix-free", n), &n, |ben, _| {
            ben.iter(|| k.apply(black_box(x.as_ref())).unwrap())
        });
        group.bench_with_input(BenchmarkId::new("dense", n), &n, |ben, _| {
            ben.iter(|| dense.apply(black_box(x.as_ref())).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_kron_vs_dense);
criterion_main!(benches);
