//! The dispatching front end for every linear-algebra primitive.
//!
//! A `LinalgContext` owns a [`Registry`] of rule tables. Each entry point validates shapes,
//! resolves the rule for the operand's kind and capabilities (honoring `Options::method`),
//! logs the decision and runs the rule. Rules receive the context so they can dispatch
//! recursively on sub-operators.
//!
//! # Example
//! ```rust,ignore
//! let ctx = LinalgContext::<f64>::default();
//! let inv = ctx.inverse(&a, &Options::default())?;
//! ```

use std::sync::Arc;

use faer::MatRef;
use log::debug;

use crate::config::options::Options;
use crate::context::registry::{Method, Registry, Rule, RuleTable};
use crate::core::scalar::Scalar;
use crate::eigen::{DominantEig, EigResult, EigSelection};
use crate::error::OpError;
use crate::function::MatrixFunction;
use crate::operator::Operator;
use crate::solver::{InverseOp, Solution};

#[derive(Clone, Debug)]
pub struct LinalgContext<T: Scalar> {
    registry: Arc<Registry<T>>,
}

impl<T: Scalar> Default for LinalgContext<T> {
    fn default() -> Self {
        Self::new(Registry::with_defaults())
    }
}

fn require_square<T: Scalar>(op: &'static str, a: &Operator<T>) -> Result<(), OpError> {
    if a.is_square() {
        Ok(())
    } else {
        Err(OpError::shape(op, a.shape(), (a.ncols(), a.nrows())))
    }
}

impl<T: Scalar> LinalgContext<T> {
    pub fn new(registry: Registry<T>) -> Self {
        Self { registry: Arc::new(registry) }
    }

    /// A context without any rule; every call fails with `NoRule` until rules are registered.
    pub fn empty() -> Self {
        Self::new(Registry::empty())
    }

    pub fn registry(&self) -> &Registry<T> {
        &self.registry
    }

    /// Mutable access for registering rules; clones the tables if they are shared.
    pub fn registry_mut(&mut self) -> &mut Registry<T> {
        Arc::make_mut(&mut self.registry)
    }

    fn pick<'r, F: ?Sized>(
        &self,
        table: &'r RuleTable<F>,
        a: &Operator<T>,
        opts: &Options<T>,
    ) -> Result<&'r Rule<F>, OpError> {
        let caps = a.capabilities();
        let rule = table.resolve(a.kind(), caps, opts.method)?;
        debug!(
            "dispatch {} on {:?} {:?} ({:?}) -> {:?}",
            table.operation(),
            a.kind(),
            a.shape(),
            caps,
            rule.algorithm
        );
        Ok(rule)
    }

    /// Solves `A X = B`. A non-converged iterative solve is returned as a `Solution` whose
    /// stats say so.
    pub fn solve(&self, a: &Operator<T>, b: MatRef<'_, T>, opts: &Options<T>) -> Result<Solution<T>, OpError> {
        require_square("solve", a)?;
        if b.nrows() != a.nrows() {
            return Err(OpError::shape("solve", a.shape(), (b.nrows(), b.ncols())));
        }
        let rule = self.pick(&self.registry.solve, a, opts)?;
        (rule.func)(self, a, b, opts)
    }

    /// `A⁻¹` as an operator; closed forms where the structure allows, a lazily solved
    /// inverse otherwise. Annotations of `A` carry over.
    pub fn inverse(&self, a: &Operator<T>, opts: &Options<T>) -> Result<Operator<T>, OpError> {
        require_square("inverse", a)?;
        let inv = match self.pick(&self.registry.inverse, a, opts) {
            Ok(rule) => (rule.func)(self, a, opts)?,
            // a forced solver algorithm turns into a lazy inverse running that solver
            Err(OpError::NoRule { .. }) if matches!(opts.method, Method::Force(_)) => {
                debug!("inverse: no inverse rule for {:?}, using a lazy inverse", opts.method);
                Operator::new(InverseOp::new(a, self.clone(), opts.clone()))
            }
            Err(e) => return Err(e),
        };
        Ok(inv.annotate(a.capabilities()))
    }

    pub fn eig(&self, a: &Operator<T>, selection: &EigSelection, opts: &Options<T>) -> Result<EigResult<T>, OpError> {
        require_square("eig", a)?;
        selection.validate(a.nrows())?;
        let rule = self.pick(&self.registry.eig, a, opts)?;
        (rule.func)(self, a, selection, opts)
    }

    /// Dominant eigenvalue (largest magnitude) and a unit eigenvector.
    pub fn eigmax(&self, a: &Operator<T>, opts: &Options<T>) -> Result<DominantEig<T>, OpError> {
        require_square("eigmax", a)?;
        let rule = self.pick(&self.registry.eigmax, a, opts)?;
        (rule.func)(self, a, opts)
    }

    /// `log |det A|`; `-∞` for a singular `A`.
    pub fn logdet(&self, a: &Operator<T>, opts: &Options<T>) -> Result<T, OpError> {
        require_square("logdet", a)?;
        let rule = self.pick(&self.registry.logdet, a, opts)?;
        (rule.func)(self, a, opts)
    }

    pub fn diag(&self, a: &Operator<T>, opts: &Options<T>) -> Result<Vec<T>, OpError> {
        require_square("diag", a)?;
        let rule = self.pick(&self.registry.diag, a, opts)?;
        (rule.func)(self, a, opts)
    }

    pub fn rowsum(&self, a: &Operator<T>, opts: &Options<T>) -> Result<Vec<T>, OpError> {
        let rule = self.pick(&self.registry.rowsum, a, opts)?;
        (rule.func)(self, a, opts)
    }

    pub fn trace(&self, a: &Operator<T>, opts: &Options<T>) -> Result<T, OpError> {
        require_square("trace", a)?;
        let rule = self.pick(&self.registry.trace, a, opts)?;
        (rule.func)(self, a, opts)
    }

    pub fn exp(&self, a: &Operator<T>, opts: &Options<T>) -> Result<Operator<T>, OpError> {
        self.matrix_function(a, MatrixFunction::Exp, opts)
    }

    pub fn sqrt(&self, a: &Operator<T>, opts: &Options<T>) -> Result<Operator<T>, OpError> {
        self.matrix_function(a, MatrixFunction::Sqrt, opts)
    }

    pub fn pow(&self, a: &Operator<T>, p: T, opts: &Options<T>) -> Result<Operator<T>, OpError> {
        self.matrix_function(a, MatrixFunction::Pow(p), opts)
    }

    /// `f(A)` as an operator, dispatched on the table of `f`.
    pub fn matrix_function(
        &self,
        a: &Operator<T>,
        f: MatrixFunction<T>,
        opts: &Options<T>,
    ) -> Result<Operator<T>, OpError> {
        require_square(f.name(), a)?;
        let rule = self.pick(self.registry.function_table(&f), a, opts)?;
        let result = (rule.func)(self, a, f, opts)?;
        Ok(result.annotate(f.capabilities_of(a.capabilities())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::registry::{Algorithm, Signature};
    use crate::core::traits::OpKind;
    use crate::error::OpError;

    fn always_seven(
        _: &LinalgContext<f64>,
        _: &Operator<f64>,
        _: &Options<f64>,
    ) -> Result<f64, OpError> {
        Ok(7.0)
    }

    #[test]
    fn empty_context_has_no_rules() {
        let ctx = LinalgContext::<f64>::empty();
        let a = Operator::identity(3);
        assert!(matches!(ctx.trace(&a, &Options::default()), Err(OpError::NoRule { .. })));
    }

    #[test]
    fn registered_rule_is_used_without_touching_others() {
        let mut ctx = LinalgContext::<f64>::default();
        let shared = ctx.clone();
        ctx.registry_mut()
            .trace
            .register(Signature::kind(OpKind::Identity), Algorithm::Custom("seven"), Arc::new(always_seven));
        let a = Operator::identity(3);
        let opts = Options::default();
        assert_eq!(ctx.trace(&a, &opts).unwrap(), 7.0);
        // the original tables are untouched
        assert_eq!(shared.trace(&a, &opts).unwrap(), 3.0);
        // other kinds still take the generic path
        let d = Operator::diagonal(vec![1.0, 2.0]);
        assert_eq!(ctx.trace(&d, &opts).unwrap(), 3.0);
    }

    #[test]
    fn square_operations_reject_rectangular() {
        let ctx = LinalgContext::<f64>::default();
        let a = Operator::dense(faer::Mat::zeros(2, 3));
        let opts = Options::default();
        assert!(matches!(ctx.logdet(&a, &opts), Err(OpError::Shape { .. })));
        assert!(matches!(ctx.inverse(&a, &opts), Err(OpError::Shape { .. })));
        assert_eq!(ctx.rowsum(&a, &opts).unwrap(), vec![0.0, 0.0]);
    }
}
