use std::sync::Arc;

use super::{node, with_dense};
use crate::config::options::Options;
use crate::context::linalg_context::LinalgContext;
use crate::context::registry::{Algorithm, FunctionFn, Registry, RuleTable, Signature};
use crate::core::scalar::Scalar;
use crate::core::traits::OpKind;
use crate::error::OpError;
use crate::function::dense::{general_function, symmetric_function};
use crate::function::{KrylovFunctionOp, MatrixFunction, Projection};
use crate::matrix::{Diagonal, Identity, ScaledIdentity};
use crate::operator::product::product;
use crate::operator::{BlockDiagOp, Capabilities, Operator, block_diag_with_multiplicity};

pub(super) fn install<T: Scalar>(reg: &mut Registry<T>) {
    for table in [&mut reg.exp, &mut reg.sqrt] {
        install_common(table);
        table.register(Signature::generic(), Algorithm::Arnoldi, Arc::new(arnoldi::<T>));
    }
    install_common(&mut reg.pow);
    reg.pow.register(Signature::generic(), Algorithm::Structural, Arc::new(repeated_product::<T>));
}

fn install_common<T: Scalar>(t: &mut RuleTable<FunctionFn<T>>) {
    t.register(Signature::kind(OpKind::Diagonal), Algorithm::Diagonal, Arc::new(diagonal::<T>));
    t.register(Signature::kind(OpKind::Identity), Algorithm::Identity, Arc::new(identity::<T>));
    t.register(Signature::kind(OpKind::ScaledIdentity), Algorithm::Identity, Arc::new(scaled_identity::<T>));
    t.register(Signature::kind(OpKind::BlockDiagonal), Algorithm::Structural, Arc::new(block_diagonal::<T>));
    t.register(Signature::kind(OpKind::Dense), Algorithm::Materialize, Arc::new(dense_general::<T>));
    t.register(
        Signature::kind(OpKind::Dense).requires(Capabilities::SELF_ADJOINT),
        Algorithm::DenseEigen,
        Arc::new(dense_symmetric::<T>),
    );
    t.register(Signature::capability(Capabilities::SELF_ADJOINT), Algorithm::Lanczos, Arc::new(lanczos::<T>));
}

/// `f(x)` for a scalar eigenvalue; a NaN means `x` is outside the real domain of `f`.
fn eval<T: Scalar>(f: &MatrixFunction<T>, x: T) -> Result<T, OpError> {
    let y = f.eval(x);
    if y.is_nan() {
        return Err(OpError::InvalidInput(format!("{} is undefined at eigenvalue {x}", f.name())));
    }
    Ok(y)
}

fn diagonal<T: Scalar>(
    _: &LinalgContext<T>,
    a: &Operator<T>,
    f: MatrixFunction<T>,
    _: &Options<T>,
) -> Result<Operator<T>, OpError> {
    let values = node::<T, Diagonal<T>>(a)?
        .values()
        .iter()
        .map(|&d| eval(&f, d))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Operator::new(Diagonal::new(values).with_placement(a.placement())))
}

fn identity<T: Scalar>(
    _: &LinalgContext<T>,
    a: &Operator<T>,
    f: MatrixFunction<T>,
    _: &Options<T>,
) -> Result<Operator<T>, OpError> {
    let v = eval(&f, T::one())?;
    if v == T::one() {
        return Ok(a.clone());
    }
    Ok(Operator::new(ScaledIdentity::new(a.nrows(), v).with_placement(a.placement())))
}

fn scaled_identity<T: Scalar>(
    _: &LinalgContext<T>,
    a: &Operator<T>,
    f: MatrixFunction<T>,
    _: &Options<T>,
) -> Result<Operator<T>, OpError> {
    let s = node::<T, ScaledIdentity<T>>(a)?.scale();
    Ok(Operator::new(ScaledIdentity::new(a.nrows(), eval(&f, s)?).with_placement(a.placement())))
}

/// `f` acts block by block on a block-diagonal operator with square blocks.
fn block_diagonal<T: Scalar>(
    ctx: &LinalgContext<T>,
    a: &Operator<T>,
    f: MatrixFunction<T>,
    opts: &Options<T>,
) -> Result<Operator<T>, OpError> {
    let bd = node::<T, BlockDiagOp<T>>(a)?;
    if !bd.blocks().iter().all(|(b, _)| b.is_square()) {
        return dense_general(ctx, a, f, opts);
    }
    let nested = opts.nested();
    let blocks = bd
        .blocks()
        .iter()
        .map(|(b, copies)| Ok((ctx.matrix_function(b, f, &nested)?, *copies)))
        .collect::<Result<Vec<_>, OpError>>()?;
    block_diag_with_multiplicity(blocks)
}

fn dense_symmetric<T: Scalar>(
    _: &LinalgContext<T>,
    a: &Operator<T>,
    f: MatrixFunction<T>,
    _: &Options<T>,
) -> Result<Operator<T>, OpError> {
    let m = with_dense(a, |m| symmetric_function(m, &f))?;
    if (0..m.ncols()).any(|j| (0..m.nrows()).any(|i| m[(i, j)].is_nan())) {
        return Err(OpError::InvalidInput(format!("{} is undefined on the spectrum", f.name())));
    }
    Ok(Operator::dense(m))
}

fn dense_general<T: Scalar>(
    _: &LinalgContext<T>,
    a: &Operator<T>,
    f: MatrixFunction<T>,
    _: &Options<T>,
) -> Result<Operator<T>, OpError> {
    with_dense(a, |m| general_function(m, &f)).map(Operator::dense)
}

fn lanczos<T: Scalar>(
    _: &LinalgContext<T>,
    a: &Operator<T>,
    f: MatrixFunction<T>,
    opts: &Options<T>,
) -> Result<Operator<T>, OpError> {
    Ok(Operator::new(KrylovFunctionOp::new(a, f, Projection::Lanczos, opts)))
}

fn arnoldi<T: Scalar>(
    _: &LinalgContext<T>,
    a: &Operator<T>,
    f: MatrixFunction<T>,
    opts: &Options<T>,
) -> Result<Operator<T>, OpError> {
    Ok(Operator::new(KrylovFunctionOp::new(a, f, Projection::Arnoldi, opts)))
}

/// `A^k` as a lazy product of `|k|` factors; negative `k` uses the dispatched inverse.
fn repeated_product<T: Scalar>(
    ctx: &LinalgContext<T>,
    a: &Operator<T>,
    f: MatrixFunction<T>,
    opts: &Options<T>,
) -> Result<Operator<T>, OpError> {
    let Some(k) = f.integer_exponent() else {
        return Err(OpError::Unsupported(format!("{f:?} of a general operator needs an integer exponent")));
    };
    if k == 0 {
        return Ok(Operator::new(Identity::new(a.nrows()).with_placement(a.placement())));
    }
    let base = if k < 0 { ctx.inverse(a, &opts.nested())? } else { a.clone() };
    product(&vec![base; k.unsigned_abs() as usize])
}
