//! Rule tables for dynamic dispatch on (operation, operator kind, capabilities).
//!
//! Each logical operation owns a [`RuleTable`]. A [`Rule`] is guarded by a [`Signature`]:
//! an optional exact operator kind and a set of required capabilities. Resolution tries, in
//! order, the rules for the operand's exact kind, the kind-agnostic rules with a non-empty
//! requirement, and finally the kind-agnostic generic fallback. Within a level the rules
//! whose requirement is not strictly contained in another candidate's requirement survive;
//! more than one survivor is an ambiguity and fails the call.

use std::fmt;
use std::sync::Arc;

use faer::MatRef;

use crate::config::options::Options;
use crate::context::linalg_context::LinalgContext;
use crate::core::scalar::Scalar;
use crate::core::traits::OpKind;
use crate::eigen::{DominantEig, EigResult, EigSelection};
use crate::error::OpError;
use crate::function::MatrixFunction;
use crate::operator::{Capabilities, Operator};
use crate::solver::Solution;

/// Logical operations with their own rule table.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    Solve,
    Inverse,
    Eig,
    EigMax,
    LogDet,
    Diag,
    RowSum,
    Trace,
    Exp,
    Sqrt,
    Pow,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Solve => "solve",
            Operation::Inverse => "inverse",
            Operation::Eig => "eig",
            Operation::EigMax => "eigmax",
            Operation::LogDet => "logdet",
            Operation::Diag => "diag",
            Operation::RowSum => "rowsum",
            Operation::Trace => "trace",
            Operation::Exp => "exp",
            Operation::Sqrt => "sqrt",
            Operation::Pow => "pow",
        };
        f.write_str(name)
    }
}

/// Tag naming the algorithm behind a rule; the handle for method overrides.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Algorithm {
    Lu,
    Cholesky,
    Diagonal,
    Identity,
    Tridiagonal,
    Permutation,
    /// Closed form derived from the operator's structure.
    Structural,
    DenseEigen,
    Cg,
    Minres,
    Gmres,
    Lanczos,
    Arnoldi,
    Power,
    Slq,
    Probing,
    Materialize,
    Lazy,
    Custom(&'static str),
}

/// How the caller wants dispatch to pick an algorithm.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum Method {
    #[default]
    Auto,
    /// Use the named algorithm when one of its rules is eligible.
    Prefer(Algorithm),
    /// Use the named algorithm, ignoring capability guards; rules for the operand's exact
    /// kind come first, then generic rules, then rules registered for other kinds.
    Force(Algorithm),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Signature {
    pub kind: Option<OpKind>,
    pub requires: Capabilities,
}

impl Signature {
    /// Matches operators of exactly this kind.
    pub fn kind(kind: OpKind) -> Self {
        Self { kind: Some(kind), requires: Capabilities::empty() }
    }

    /// Matches every operator.
    pub fn generic() -> Self {
        Self { kind: None, requires: Capabilities::empty() }
    }

    /// Matches every operator carrying `caps`.
    pub fn capability(caps: Capabilities) -> Self {
        Self { kind: None, requires: caps }
    }

    pub fn requires(mut self, caps: Capabilities) -> Self {
        self.requires |= caps;
        self
    }

    fn accepts(&self, caps: Capabilities) -> bool {
        caps.contains(self.requires)
    }
}

pub struct Rule<F: ?Sized> {
    pub signature: Signature,
    pub algorithm: Algorithm,
    pub func: Arc<F>,
}

impl<F: ?Sized> Clone for Rule<F> {
    fn clone(&self) -> Self {
        Self {
            signature: self.signature,
            algorithm: self.algorithm,
            func: Arc::clone(&self.func),
        }
    }
}

impl<F: ?Sized> fmt::Debug for Rule<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("signature", &self.signature)
            .field("algorithm", &self.algorithm)
            .finish()
    }
}

pub struct RuleTable<F: ?Sized> {
    op: Operation,
    rules: Vec<Rule<F>>,
}

impl<F: ?Sized> Clone for RuleTable<F> {
    fn clone(&self) -> Self {
        Self { op: self.op, rules: self.rules.clone() }
    }
}

impl<F: ?Sized> fmt::Debug for RuleTable<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleTable").field("op", &self.op).field("rules", &self.rules).finish()
    }
}

impl<F: ?Sized> RuleTable<F> {
    pub fn new(op: Operation) -> Self {
        Self { op, rules: Vec::new() }
    }

    pub fn operation(&self) -> Operation {
        self.op
    }

    pub fn rules(&self) -> &[Rule<F>] {
        &self.rules
    }

    /// Adds a rule; existing rules are untouched.
    pub fn register(&mut self, signature: Signature, algorithm: Algorithm, func: Arc<F>) {
        self.rules.push(Rule { signature, algorithm, func });
    }

    /// Drops every rule with exactly `signature`, then registers the new one.
    pub fn replace(&mut self, signature: Signature, algorithm: Algorithm, func: Arc<F>) {
        self.rules.retain(|r| r.signature != signature);
        self.register(signature, algorithm, func);
    }

    /// Selects the rule for an operand of `kind` with `caps`.
    pub fn resolve(&self, kind: OpKind, caps: Capabilities, method: Method) -> Result<&Rule<F>, OpError> {
        match method {
            Method::Auto => self.resolve_auto(kind, caps),
            Method::Prefer(alg) => {
                let eligible: Vec<&Rule<F>> = self
                    .rules
                    .iter()
                    .filter(|r| r.algorithm == alg)
                    .filter(|r| r.signature.kind.is_none_or(|k| k == kind))
                    .filter(|r| r.signature.accepts(caps))
                    .collect();
                let exact: Vec<&Rule<F>> =
                    eligible.iter().copied().filter(|r| r.signature.kind.is_some()).collect();
                let pool = if exact.is_empty() { eligible } else { exact };
                match self.maximal(kind, pool) {
                    Ok(Some(rule)) => Ok(rule),
                    Ok(None) => self.resolve_auto(kind, caps),
                    Err(e) => Err(e),
                }
            }
            Method::Force(alg) => {
                let tagged = |exact: bool| {
                    self.rules.iter().filter(move |r| {
                        r.algorithm == alg
                            && if exact { r.signature.kind == Some(kind) } else { r.signature.kind.is_none() }
                    })
                };
                let any_kind = || self.rules.iter().filter(move |r| r.algorithm == alg);
                tagged(true)
                    .find(|r| r.signature.accepts(caps))
                    .or_else(|| tagged(true).next())
                    .or_else(|| tagged(false).find(|r| r.signature.accepts(caps)))
                    .or_else(|| tagged(false).next())
                    .or_else(|| any_kind().find(|r| r.signature.accepts(caps)))
                    .or_else(|| any_kind().next())
                    .ok_or(OpError::NoRule { op: self.op, kind })
            }
        }
    }

    fn resolve_auto(&self, kind: OpKind, caps: Capabilities) -> Result<&Rule<F>, OpError> {
        let levels: [&dyn Fn(&Signature) -> bool; 3] = [
            &|s| s.kind == Some(kind),
            &|s| s.kind.is_none() && !s.requires.is_empty(),
            &|s| s.kind.is_none() && s.requires.is_empty(),
        ];
        for level in levels {
            let candidates: Vec<&Rule<F>> = self
                .rules
                .iter()
                .filter(|r| level(&r.signature) && r.signature.accepts(caps))
                .collect();
            if let Some(rule) = self.maximal(kind, candidates)? {
                return Ok(rule);
            }
        }
        Err(OpError::NoRule { op: self.op, kind })
    }

    /// The single most specific candidate, `None` when there are no candidates.
    fn maximal<'a>(&self, kind: OpKind, candidates: Vec<&'a Rule<F>>) -> Result<Option<&'a Rule<F>>, OpError> {
        let best: Vec<&Rule<F>> = candidates
            .iter()
            .copied()
            .filter(|r| {
                !candidates.iter().any(|other| {
                    other.signature.requires != r.signature.requires
                        && other.signature.requires.contains(r.signature.requires)
                })
            })
            .collect();
        match best.as_slice() {
            [] => Ok(None),
            [rule] => Ok(Some(*rule)),
            _ => Err(OpError::AmbiguousDispatch {
                op: self.op,
                kind,
                candidates: best.iter().map(|r| r.algorithm).collect(),
            }),
        }
    }
}

pub type SolveFn<T> = dyn Fn(&LinalgContext<T>, &Operator<T>, MatRef<'_, T>, &Options<T>) -> Result<Solution<T>, OpError>
    + Send
    + Sync;
pub type UnaryFn<T, R> = dyn Fn(&LinalgContext<T>, &Operator<T>, &Options<T>) -> Result<R, OpError> + Send + Sync;
pub type EigFn<T> = dyn Fn(&LinalgContext<T>, &Operator<T>, &EigSelection, &Options<T>) -> Result<EigResult<T>, OpError>
    + Send
    + Sync;
pub type FunctionFn<T> = dyn Fn(&LinalgContext<T>, &Operator<T>, MatrixFunction<T>, &Options<T>) -> Result<Operator<T>, OpError>
    + Send
    + Sync;

/// One rule table per logical operation.
#[derive(Clone, Debug)]
pub struct Registry<T: Scalar> {
    pub solve: RuleTable<SolveFn<T>>,
    pub inverse: RuleTable<UnaryFn<T, Operator<T>>>,
    pub eig: RuleTable<EigFn<T>>,
    pub eigmax: RuleTable<UnaryFn<T, DominantEig<T>>>,
    pub logdet: RuleTable<UnaryFn<T, T>>,
    pub diag: RuleTable<UnaryFn<T, Vec<T>>>,
    pub rowsum: RuleTable<UnaryFn<T, Vec<T>>>,
    pub trace: RuleTable<UnaryFn<T, T>>,
    pub exp: RuleTable<FunctionFn<T>>,
    pub sqrt: RuleTable<FunctionFn<T>>,
    pub pow: RuleTable<FunctionFn<T>>,
}

impl<T: Scalar> Registry<T> {
    /// Tables without any rule.
    pub fn empty() -> Self {
        Self {
            solve: RuleTable::new(Operation::Solve),
            inverse: RuleTable::new(Operation::Inverse),
            eig: RuleTable::new(Operation::Eig),
            eigmax: RuleTable::new(Operation::EigMax),
            logdet: RuleTable::new(Operation::LogDet),
            diag: RuleTable::new(Operation::Diag),
            rowsum: RuleTable::new(Operation::RowSum),
            trace: RuleTable::new(Operation::Trace),
            exp: RuleTable::new(Operation::Exp),
            sqrt: RuleTable::new(Operation::Sqrt),
            pow: RuleTable::new(Operation::Pow),
        }
    }

    /// Tables holding the built-in rule set.
    pub fn with_defaults() -> Self {
        let mut reg = Self::empty();
        crate::context::rules::install_defaults(&mut reg);
        reg
    }

    /// The function table serving `f`.
    pub fn function_table(&self, f: &MatrixFunction<T>) -> &RuleTable<FunctionFn<T>> {
        match f {
            MatrixFunction::Exp => &self.exp,
            MatrixFunction::Sqrt => &self.sqrt,
            MatrixFunction::Pow(_) => &self.pow,
        }
    }
}
