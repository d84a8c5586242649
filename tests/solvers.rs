//! Linear solves: block CG budget handling, MINRES and GMRES against LU, structured solves.

use approx::assert_abs_diff_eq;
use faer::Mat;
use matfree::{
    Algorithm, CgSolver, GmresSolver, IterState, Jacobi, LinearSolver, MinresSolver, OpError, OpKind, Operator, Options,
    cg, inverse, logdet, solve,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn random_mat(rng: &mut StdRng, m: usize, n: usize) -> Mat<f64> {
    Mat::from_fn(m, n, |_, _| rng.r#gen::<f64>() * 2.0 - 1.0)
}

/// 1-D Laplacian `tridiag(-1, 2, -1)`.
fn laplacian(n: usize) -> Operator<f64> {
    Operator::tridiagonal(vec![-1.0; n - 1], vec![2.0; n], vec![-1.0; n - 1]).unwrap()
}

/// `XᵀX / n + I`: well conditioned SPD.
fn spd(rng: &mut StdRng, n: usize) -> Operator<f64> {
    let x = random_mat(rng, n, n);
    let g = x.as_ref().transpose() * x.as_ref();
    Operator::dense(Mat::from_fn(n, n, |i, j| g[(i, j)] / n as f64 + if i == j { 1.0 } else { 0.0 })).psd()
}

fn max_residual(a: &Operator<f64>, x: &Mat<f64>, b: &Mat<f64>) -> f64 {
    let ax = a.apply(x.as_ref()).unwrap();
    let mut worst = 0.0f64;
    for j in 0..b.ncols() {
        for i in 0..b.nrows() {
            worst = worst.max((ax[(i, j)] - b[(i, j)]).abs());
        }
    }
    worst
}

#[test]
fn cg_converges_within_n_iterations() {
    let mut rng = StdRng::seed_from_u64(21);
    let n = 40;
    let a = spd(&mut rng, n);
    let b = random_mat(&mut rng, n, 3);

    let sol = cg(&a, b.as_ref(), &Options::default().with_max_iters(n)).unwrap();
    assert!(sol.converged());
    assert!(sol.stats.iterations <= n);
    let x = sol.into_result().unwrap();
    assert!(max_residual(&a, &x, &b) < 1e-6);
}

#[test]
fn cg_budget_exhaustion_reports_best_iterate() {
    let n = 100;
    let a = laplacian(n).psd();
    let b = Mat::from_fn(n, 1, |i, _| ((i + 1) as f64).sin());
    let opts = Options::default().with_max_iters(10).with_history(true);

    let sol = cg(&a, b.as_ref(), &opts).unwrap();
    assert_eq!(sol.stats.state, IterState::BudgetExhausted);
    let history = sol.stats.residual_history.clone();
    assert!(!history.is_empty());
    assert!(history.windows(2).all(|w| w[1] <= w[0]));
    assert_abs_diff_eq!(sol.stats.final_residual, *history.last().unwrap(), epsilon = 1e-15);

    match sol.into_result() {
        Err(OpError::DidNotConverge { iterations, residual }) => {
            assert!(iterations <= 10);
            assert!(residual > 0.0);
        }
        other => panic!("expected DidNotConverge, got {other:?}"),
    }
}

#[test]
fn cg_monitor_sees_every_iteration() {
    let n = 30;
    let a = laplacian(n);
    let b = Mat::from_fn(n, 1, |_, _| 1.0);
    let mut seen = Vec::new();
    let sol = CgSolver::new(1e-10, 200)
        .with_monitor(|it, _| seen.push(it))
        .solve(&a, None, b.as_ref())
        .unwrap();
    assert!(sol.converged());
    assert_eq!(seen.len(), sol.stats.iterations);
}

#[test]
fn jacobi_preconditioning_reduces_iterations() {
    let n = 80;
    // diagonal spread over three decades on top of the Laplacian
    let scales: Vec<f64> = (0..n).map(|i| 10f64.powf(3.0 * i as f64 / n as f64)).collect();
    let a = (&laplacian(n).psd() + &Operator::diagonal(scales)).unwrap();
    assert!(a.is_psd());
    let b = Mat::from_fn(n, 1, |i, _| (i as f64 * 0.3).cos());

    let plain = CgSolver::new(1e-10, 500).solve(&a, None, b.as_ref()).unwrap();
    let jacobi = Jacobi::from_operator(&a).unwrap();
    let pre = CgSolver::new(1e-10, 500).solve(&a, Some(&jacobi), b.as_ref()).unwrap();
    assert!(plain.converged() && pre.converged());
    assert!(pre.stats.iterations < plain.stats.iterations);

    let via_options = solve(&a, b.as_ref(), &Options::default().with_preconditioner(jacobi.to_operator())).unwrap();
    assert!(max_residual(&a, &via_options.x, &b) < 1e-6);
}

#[test]
fn minres_matches_lu_on_indefinite_systems() {
    let mut rng = StdRng::seed_from_u64(22);
    let n = 30;
    let x = random_mat(&mut rng, n, n);
    let sym = Mat::from_fn(n, n, |i, j| x[(i, j)] + x[(j, i)] + if i == j { (i as f64) - 15.5 } else { 0.0 });
    let a = Operator::dense(sym).self_adjoint();
    let b = random_mat(&mut rng, n, 2);

    let lu = solve(&a, b.as_ref(), &Options::default().force(Algorithm::Lu)).unwrap().x;
    let sol = MinresSolver::new(1e-10, 10 * n).solve(&a, None, b.as_ref()).unwrap();
    assert!(sol.converged());
    for j in 0..2 {
        for i in 0..n {
            assert_abs_diff_eq!(sol.x[(i, j)], lu[(i, j)], epsilon = 1e-6);
        }
    }
}

#[test]
fn gmres_matches_lu_on_nonsymmetric_systems() {
    let mut rng = StdRng::seed_from_u64(23);
    let n = 40;
    let m = random_mat(&mut rng, n, n);
    let a = Operator::dense(Mat::from_fn(n, n, |i, j| m[(i, j)] + if i == j { 6.0 } else { 0.0 }));
    let b = random_mat(&mut rng, n, 2);

    let lu = solve(&a, b.as_ref(), &Options::default()).unwrap().x;
    let sol = GmresSolver::new(20, 1e-12, 400).solve(&a, None, b.as_ref()).unwrap();
    assert!(sol.converged());
    for j in 0..2 {
        for i in 0..n {
            assert_abs_diff_eq!(sol.x[(i, j)], lu[(i, j)], epsilon = 1e-8);
        }
    }

    // the generic rule for a sum without annotations is GMRES
    let shifted = (&a + &Operator::identity(n)).unwrap();
    let dispatched = solve(&shifted, b.as_ref(), &Options::default().with_tol_f64(1e-12)).unwrap();
    assert!(dispatched.converged());
    assert!(max_residual(&shifted, &dispatched.x, &b) < 1e-8);
}

#[test]
fn tridiagonal_solve_inverts_apply() {
    let t = Operator::tridiagonal(vec![1.0, 1.0], vec![-2.0, -2.0, -2.0], vec![1.0, 1.0]).unwrap();
    let b = Mat::from_fn(3, 1, |i, _| [-2.0, 1.0, 0.0][i]);
    let sol = solve(&t, b.as_ref(), &Options::default()).unwrap();
    assert_eq!(sol.stats.iterations, 0);
    for (i, e) in [1.0, 0.0, 0.0].into_iter().enumerate() {
        assert_abs_diff_eq!(sol.x[(i, 0)], e, epsilon = 1e-14);
    }
}

#[test]
fn dense_psd_solve_uses_cholesky() {
    let mut rng = StdRng::seed_from_u64(24);
    let a = spd(&mut rng, 12);
    let b = random_mat(&mut rng, 12, 4);
    let chol = solve(&a, b.as_ref(), &Options::default()).unwrap();
    let lu = solve(&a, b.as_ref(), &Options::default().force(Algorithm::Lu)).unwrap();
    for j in 0..4 {
        for i in 0..12 {
            assert_abs_diff_eq!(chol.x[(i, j)], lu.x[(i, j)], epsilon = 1e-10);
        }
    }
}

#[test]
fn larger_dense_nonsymmetric_systems_use_lu() {
    let mut rng = StdRng::seed_from_u64(25);
    for n in [40, 80] {
        // 3 on the diagonal, -1 above, -0.5 below
        let band = Mat::from_fn(n, n, |i, j| match j as isize - i as isize {
            0 => 3.0,
            1 => -1.0,
            -1 => -0.5,
            _ => 0.0,
        });
        let a = Operator::dense(band);
        assert!(!a.is_self_adjoint());
        let x = random_mat(&mut rng, n, 2);
        let b = a.apply(x.as_ref()).unwrap();
        let opts = Options::default();

        let sol = solve(&a, b.as_ref(), &opts).unwrap();
        assert_eq!(sol.stats.iterations, 0);
        assert!(max_residual(&a, &sol.x, &b) < 1e-10);

        let inv = inverse(&a, &opts).unwrap();
        assert_eq!(inv.kind(), OpKind::Inverse);
        let y = inv.apply(b.as_ref()).unwrap();
        for j in 0..2 {
            for i in 0..n {
                assert_abs_diff_eq!(y[(i, j)], x[(i, j)], epsilon = 1e-10);
            }
        }

        // continuant ratios D_k / D_{k-1} = 3 - 0.5 / (D_{k-1} / D_{k-2})
        let mut ratio = 3.0f64;
        let mut expected = ratio.ln();
        for _ in 1..n {
            ratio = 3.0 - 0.5 / ratio;
            expected += ratio.ln();
        }
        let ld = logdet(&a, &opts).unwrap();
        assert!(ld.is_finite());
        assert_abs_diff_eq!(ld, expected, epsilon = 1e-9);
    }
}
