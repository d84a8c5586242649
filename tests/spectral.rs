//! Eigenpairs, dominant eigenvalues and stochastic Lanczos quadrature.

use approx::{assert_abs_diff_eq, assert_relative_eq};
use faer::Mat;
use matfree::{
    Algorithm, EigSelection, IterState, OpError, Operator, Options, eig, eigmax, lanczos, logdet, slq_spectral_density,
    slq_trace,
};

fn laplacian(n: usize) -> Operator<f64> {
    Operator::tridiagonal(vec![-1.0; n - 1], vec![2.0; n], vec![-1.0; n - 1]).unwrap()
}

/// `diag(1..=n)` hidden behind a scaling so no diagonal closed form applies.
fn opaque_diagonal(n: usize) -> Operator<f64> {
    Operator::diagonal((1..=n).map(|i| i as f64).collect()).scale(1.0)
}

fn max_error(values: &[f64], expected: &[f64]) -> f64 {
    values.iter().zip(expected).map(|(v, e)| (v - e).abs()).fold(0.0, f64::max)
}

#[test]
fn lanczos_improves_with_more_steps() {
    let n = 100;
    let a = opaque_diagonal(n);
    assert!(a.is_psd());
    let expected = [98.0, 99.0, 100.0];

    let errors: Vec<f64> = [10, 20, 40, n]
        .iter()
        .map(|&steps| {
            let r = eig(&a, &EigSelection::largest(3), &Options::default().with_max_iters(steps)).unwrap();
            assert_eq!(r.values.len(), 3);
            assert!(r.values.windows(2).all(|w| w[0] <= w[1]));
            max_error(&r.values, &expected)
        })
        .collect();

    assert!(errors.windows(2).all(|w| w[1] <= w[0] + 1e-10), "errors {errors:?}");
    assert!(errors[0] > 1e-3);
    assert!(errors[3] < 1e-8);
}

#[test]
fn lanczos_budget_is_reported() {
    let a = opaque_diagonal(100);
    let r = eig(&a, &EigSelection::largest(2), &Options::default().with_max_iters(5)).unwrap();
    assert!(!r.converged());
    assert_eq!(r.stats.state, IterState::BudgetExhausted);
    assert_eq!(r.stats.iterations, 5);
}

#[test]
fn laplacian_smallest_eigenpairs() {
    let n = 40;
    let a = laplacian(n);
    let r = eig(&a, &EigSelection::smallest(2), &Options::default().with_max_iters(n)).unwrap();
    for (k, &v) in r.values.iter().enumerate() {
        let exact = 2.0 - 2.0 * (std::f64::consts::PI * (k + 1) as f64 / (n + 1) as f64).cos();
        assert_abs_diff_eq!(v, exact, epsilon = 1e-8);
    }
    // A v = λ v for the returned vectors
    let av = a.apply(r.vectors.as_ref()).unwrap();
    for j in 0..2 {
        for i in 0..n {
            assert_abs_diff_eq!(av[(i, j)], r.values[j] * r.vectors[(i, j)], epsilon = 1e-6);
        }
    }
}

#[test]
fn dense_eig_and_selection_ranges() {
    let m = Mat::from_fn(4, 4, |i, j| [[4.0, 1.0, 0.0, 0.0], [1.0, 3.0, 1.0, 0.0], [0.0, 1.0, 2.0, 1.0], [0.0, 0.0, 1.0, 1.0]][i][j]);
    let a = Operator::dense(m).self_adjoint();
    let all = eig(&a, &EigSelection::All, &Options::default()).unwrap();
    assert_eq!(all.values.len(), 4);
    assert_relative_eq!(all.values.iter().sum::<f64>(), 10.0, epsilon = 1e-12);

    let mid = eig(&a, &EigSelection::Range(1..3), &Options::default()).unwrap();
    assert_abs_diff_eq!(mid.values[0], all.values[1], epsilon = 1e-12);
    assert_abs_diff_eq!(mid.values[1], all.values[2], epsilon = 1e-12);

    assert!(matches!(
        eig(&a, &EigSelection::largest(5), &Options::default()),
        Err(OpError::InvalidInput(_))
    ));
}

#[test]
fn nonsymmetric_eig_is_unsupported() {
    let a = Operator::dense(Mat::from_fn(3, 3, |i, j| if j >= i { 1.0 + j as f64 } else { 0.0 }));
    assert!(matches!(
        eig(&a, &EigSelection::All, &Options::default()),
        Err(OpError::Unsupported(_))
    ));
}

#[test]
fn repeated_eigenvalues_survive_krylov_collapse() {
    let a = Operator::diagonal(vec![1.0, 1.0, 1.0, 1.0, 2.0]).scale(1.0);
    let res = eig(&a, &EigSelection::largest(3), &Options::default()).unwrap();
    assert_eq!(res.stats.state, IterState::Converged);
    assert!(max_error(&res.values, &[1.0, 1.0, 2.0]) < 1e-10);
    assert_eq!(res.vectors.ncols(), 3);
}

#[test]
fn dominant_eigenvalues() {
    // upper triangular: eigenvalues are the diagonal 5, 2, 1
    let a = Operator::dense(Mat::from_fn(3, 3, |i, j| [[5.0, 1.0, 2.0], [0.0, 2.0, 1.0], [0.0, 0.0, 1.0]][i][j]));
    let d = eigmax(&a, &Options::default().with_tol_f64(1e-12)).unwrap();
    assert!(d.converged());
    assert_relative_eq!(d.value, 5.0, max_relative = 1e-8);

    let lap = eigmax(&laplacian(30).psd(), &Options::default().with_max_iters(30)).unwrap();
    let exact = 2.0 - 2.0 * (std::f64::consts::PI * 30.0 / 31.0).cos();
    assert_abs_diff_eq!(lap.value, exact, epsilon = 1e-8);

    let forced = eigmax(&laplacian(30).psd(), &Options::default().force(Algorithm::Power).with_max_iters(5000));
    assert_abs_diff_eq!(forced.unwrap().value, exact, epsilon = 1e-4);
}

#[test]
fn slq_logdet_is_accurate_and_reproducible() {
    let n = 100;
    let a = (&laplacian(n).psd() + &Operator::identity(n)).unwrap();
    assert!(a.is_psd());
    let exact: f64 = (1..=n)
        .map(|k| (3.0 - 2.0 * (std::f64::consts::PI * k as f64 / (n + 1) as f64).cos()).ln())
        .sum();

    let opts = Options::default().with_num_probes(64).with_krylov_depth(30).with_seed(42);
    let est = logdet(&a, &opts).unwrap();
    assert_relative_eq!(est, exact, max_relative = 0.03);
    assert_eq!(logdet(&a, &opts).unwrap(), est);

    let other = logdet(&a, &opts.clone().with_seed(43)).unwrap();
    assert_ne!(other, est);
    assert_relative_eq!(other, exact, max_relative = 0.03);

    // the Tridiagonal path of the same matrix is exact
    let t = Operator::tridiagonal(vec![-1.0; n - 1], vec![3.0; n], vec![-1.0; n - 1]).unwrap();
    assert_relative_eq!(logdet(&t, &Options::default()).unwrap(), exact, max_relative = 1e-12);
}

#[test]
fn slq_trace_and_density() {
    let n = 50;
    let opts = Options::default().with_num_probes(16).with_krylov_depth(n).with_seed(3);

    // zᵀ D z = tr D for every ±1 probe
    let tr = slq_trace(&opaque_diagonal(n), |x| x, &opts).unwrap();
    assert_eq!(tr.samples.len(), 16);
    assert_relative_eq!(tr.estimate, 1275.0, max_relative = 1e-10);
    assert_abs_diff_eq!(tr.std_error, 0.0, epsilon = 1e-8);

    let a = laplacian(n).psd();
    let density = slq_spectral_density(&a, &opts).unwrap();
    assert_relative_eq!(density.weights.iter().sum::<f64>(), 1.0, max_relative = 1e-12);
    assert!(density.nodes.windows(2).all(|w| w[0] <= w[1]));
    assert!(density.nodes.iter().all(|&x| x > 0.0 && x < 4.0));
}

#[test]
fn raw_lanczos_decomposition() {
    let n = 20;
    let a = laplacian(n);
    let start = Mat::from_fn(n, 1, |i, _| if i == 0 { 1.0 } else { 0.0 });
    let dec = lanczos(&a, start.as_ref(), &Options::default().with_krylov_depth(8)).unwrap();
    assert_eq!(dec.steps_taken, 8);
    assert_eq!(dec.alphas.len(), 8);
    // starting from e₀ the recurrence reproduces the Laplacian's own entries
    for &alpha in &dec.alphas {
        assert_abs_diff_eq!(alpha, 2.0, epsilon = 1e-12);
    }
    for &beta in &dec.betas {
        assert_abs_diff_eq!(beta.abs(), 1.0, epsilon = 1e-12);
    }
}
