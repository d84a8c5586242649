//! Rule resolution: exact kind over capability over generic, most specific capability wins,
//! ties are reported, and method overrides steer the choice.

use std::sync::Arc;

use faer::Mat;
use matfree::{Algorithm, Capabilities, LinalgContext, Method, OpError, OpKind, Operation, Operator, Options, Signature};

fn by_kind(_: &LinalgContext<f64>, _: &Operator<f64>, _: &Options<f64>) -> Result<f64, OpError> {
    Ok(1.0)
}

fn by_psd(_: &LinalgContext<f64>, _: &Operator<f64>, _: &Options<f64>) -> Result<f64, OpError> {
    Ok(2.0)
}

fn by_sa(_: &LinalgContext<f64>, _: &Operator<f64>, _: &Options<f64>) -> Result<f64, OpError> {
    Ok(3.0)
}

fn fallback(_: &LinalgContext<f64>, _: &Operator<f64>, _: &Options<f64>) -> Result<f64, OpError> {
    Ok(4.0)
}

fn other_fallback(_: &LinalgContext<f64>, _: &Operator<f64>, _: &Options<f64>) -> Result<f64, OpError> {
    Ok(5.0)
}

/// A context whose trace table reports which rule ran.
fn tagged_context() -> LinalgContext<f64> {
    let mut ctx = LinalgContext::empty();
    let t = &mut ctx.registry_mut().trace;
    t.register(Signature::kind(OpKind::Diagonal), Algorithm::Diagonal, Arc::new(by_kind));
    t.register(Signature::capability(Capabilities::POSITIVE_SEMIDEFINITE), Algorithm::Slq, Arc::new(by_psd));
    t.register(Signature::capability(Capabilities::SELF_ADJOINT), Algorithm::Lanczos, Arc::new(by_sa));
    t.register(Signature::generic(), Algorithm::Probing, Arc::new(fallback));
    ctx
}

fn square() -> Operator<f64> {
    Operator::dense(Mat::from_fn(3, 3, |i, j| (i + 2 * j) as f64))
}

#[test]
fn resolution_order() {
    let ctx = tagged_context();
    let opts = Options::default();
    let a = square();

    assert_eq!(ctx.trace(&a, &opts).unwrap(), 4.0);
    assert_eq!(ctx.trace(&a.self_adjoint(), &opts).unwrap(), 3.0);
    assert_eq!(ctx.trace(&a.psd(), &opts).unwrap(), 2.0);
    // exact kind beats a matching capability rule
    assert_eq!(ctx.trace(&Operator::diagonal(vec![1.0, 2.0]), &opts).unwrap(), 1.0);
}

#[test]
fn duplicate_signatures_are_ambiguous() {
    let mut ctx = tagged_context();
    ctx.registry_mut()
        .trace
        .register(Signature::generic(), Algorithm::Custom("other"), Arc::new(other_fallback));

    let err = ctx.trace(&square(), &Options::default()).unwrap_err();
    match err {
        OpError::AmbiguousDispatch { op, kind, candidates } => {
            assert_eq!(op, Operation::Trace);
            assert_eq!(kind, OpKind::Dense);
            assert_eq!(candidates, vec![Algorithm::Probing, Algorithm::Custom("other")]);
        }
        other => panic!("expected ambiguity, got {other:?}"),
    }
    // a more specific rule still wins over the tied fallbacks
    assert_eq!(ctx.trace(&square().psd(), &Options::default()).unwrap(), 2.0);
}

#[test]
fn method_overrides() {
    let ctx = tagged_context();
    let a = square().psd();

    assert_eq!(ctx.trace(&a, &Options::default().force(Algorithm::Probing)).unwrap(), 4.0);
    assert_eq!(ctx.trace(&a, &Options::default().prefer(Algorithm::Lanczos)).unwrap(), 3.0);
    // a preference nobody can honor falls back to automatic resolution
    assert_eq!(ctx.trace(&a, &Options::default().prefer(Algorithm::Cg)).unwrap(), 2.0);
    // forcing a kind-specific rule onto another kind is allowed
    assert_eq!(ctx.trace(&a, &Options::default().force(Algorithm::Diagonal)).unwrap(), 1.0);
    assert!(matches!(
        ctx.trace(&a, &Options::default().with_method(Method::Force(Algorithm::Gmres))),
        Err(OpError::NoRule { op: Operation::Trace, .. })
    ));
}

#[test]
fn registering_leaves_other_contexts_alone() {
    let base = tagged_context();
    let mut extended = base.clone();
    extended
        .registry_mut()
        .trace
        .register(Signature::kind(OpKind::Dense), Algorithm::Structural, Arc::new(other_fallback));

    let opts = Options::default();
    assert_eq!(extended.trace(&square(), &opts).unwrap(), 5.0);
    assert_eq!(base.trace(&square(), &opts).unwrap(), 4.0);
    assert_eq!(base.registry().trace.rules().len(), 4);
    // unrelated resolutions are unchanged
    assert_eq!(extended.trace(&square().psd(), &opts).unwrap(), 5.0);
    assert_eq!(extended.trace(&Operator::diagonal(vec![1.0]), &opts).unwrap(), 1.0);
}

#[test]
fn replace_swaps_a_rule_in_place() {
    let mut ctx = tagged_context();
    ctx.registry_mut()
        .trace
        .replace(Signature::generic(), Algorithm::Custom("other"), Arc::new(other_fallback));
    assert_eq!(ctx.registry().trace.rules().len(), 4);
    assert_eq!(ctx.trace(&square(), &Options::default()).unwrap(), 5.0);
}

#[test]
fn empty_context_has_no_rules() {
    let ctx = LinalgContext::<f64>::empty();
    assert!(matches!(
        ctx.trace(&square(), &Options::default()),
        Err(OpError::NoRule { op: Operation::Trace, kind: OpKind::Dense })
    ));
}

#[test]
fn default_rules_use_structure() {
    let ctx = LinalgContext::<f64>::default();
    let opts = Options::default();

    let d = Operator::diagonal(vec![2.0, 4.0, 8.0]);
    let b = Mat::from_fn(3, 1, |_, _| 8.0);
    let sol = ctx.solve(&d, b.as_ref(), &opts).unwrap();
    assert_eq!(sol.stats.iterations, 0);
    assert_eq!((sol.x[(0, 0)], sol.x[(1, 0)], sol.x[(2, 0)]), (4.0, 2.0, 1.0));

    // forcing CG on the same diagonal iterates instead
    let forced = ctx.solve(&d, b.as_ref(), &opts.clone().force(Algorithm::Cg)).unwrap();
    assert!(forced.stats.iterations > 0);
    assert!(forced.converged());
}

#[test]
fn entry_points_validate_shapes() {
    let ctx = LinalgContext::<f64>::default();
    let opts = Options::default();
    let rect = Operator::dense(Mat::<f64>::zeros(2, 3));
    assert!(matches!(ctx.inverse(&rect, &opts), Err(OpError::Shape { .. })));
    assert!(matches!(ctx.logdet(&rect, &opts), Err(OpError::Shape { .. })));

    let a = Operator::diagonal(vec![1.0, 2.0]);
    let b = Mat::<f64>::zeros(3, 1);
    assert!(matches!(ctx.solve(&a, b.as_ref(), &opts), Err(OpError::Shape { .. })));
}
