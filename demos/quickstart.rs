use faer::Mat;
use matfree::{EigSelection, OpError, Operator, Options, diag, eig, inverse, kron, logdet, solve, sqrt};

fn main() -> Result<(), OpError> {
    // dispatch decisions are logged at debug level
    env_logger::Builder::new().filter_level(log::LevelFilter::Debug).init();

    let n = 50;
    // 1-D Laplacian plus a positive diagonal: a PSD sum without a closed form
    let lap = Operator::tridiagonal(vec![-1.0; n - 1], vec![2.0; n], vec![-1.0; n - 1])?.psd();
    let a = (&lap + &Operator::diagonal((0..n).map(|i| 1.0 + i as f64 / n as f64).collect()))?;
    let opts = Options::default().with_tol_f64(1e-10);

    let b = Mat::from_fn(n, 2, |i, j| ((i + j) as f64).sin());
    let sol = solve(&a, b.as_ref(), &opts)?;
    println!("solve: {:?} after {} iterations", sol.stats.state, sol.stats.iterations);

    let inv = inverse(&a, &opts)?;
    println!("inverse kind: {:?}", inv.kind());

    let smallest = eig(&a, &EigSelection::smallest(3), &opts)?;
    println!("smallest eigenvalues: {:?}", smallest.values);

    let ld = logdet(&a, &opts.clone().with_num_probes(16).with_seed(1))?;
    println!("logdet (SLQ): {ld:.4}");

    let root = sqrt(&a, &opts)?;
    let y = root.apply(b.as_ref())?;
    println!("sqrt(A) b[0]: {:.6}", y[(0, 0)]);

    // structure survives: the inverse of a Kronecker product is a Kronecker product
    let small = Operator::dense(Mat::from_fn(3, 3, |i, j| if i == j { 4.0 } else { 1.0 }));
    let k = kron(&small, &Operator::diagonal(vec![1.0, 2.0]))?;
    println!("inverse of kron: {:?}", inverse(&k, &opts)?.kind());
    println!("diag(kron): {:?}", diag(&k, &opts)?);
    Ok(())
}
