use std::any::Any;

use faer::{Mat, MatRef};

use crate::core::scalar::Scalar;
use crate::core::traits::{LinearOperator, MatShape, OpKind, Placement};
use crate::error::OpError;

/// Row permutation: `(P x)[i] = x[perm[i]]`.
#[derive(Debug, Clone)]
pub struct Permutation {
    perm: Vec<usize>,
    placement: Placement,
}

impl Permutation {
    pub fn new(perm: Vec<usize>) -> Result<Self, OpError> {
        let n = perm.len();
        let mut seen = vec![false; n];
        for &p in &perm {
            if p >= n || seen[p] {
                return Err(OpError::InvalidInput(format!(
                    "{perm:?} is not a permutation of 0..{n}"
                )));
            }
            seen[p] = true;
        }
        Ok(Self { perm, placement: Placement::Host })
    }

    pub fn with_placement(mut self, placement: Placement) -> Self {
        self.placement = placement;
        self
    }

    pub fn indices(&self) -> &[usize] {
        &self.perm
    }

    pub fn inverse(&self) -> Permutation {
        let mut inv = vec![0; self.perm.len()];
        for (i, &p) in self.perm.iter().enumerate() {
            inv[p] = i;
        }
        Permutation { perm: inv, placement: self.placement }
    }

    /// `+1` for even permutations, `-1` for odd ones.
    pub fn sign(&self) -> i32 {
        permutation_sign(&self.perm)
    }
}

/// Parity of a permutation given as an index array: `+1` even, `-1` odd.
pub(crate) fn permutation_sign(perm: &[usize]) -> i32 {
    let mut visited = vec![false; perm.len()];
    let mut sign = 1;
    for start in 0..perm.len() {
        if visited[start] {
            continue;
        }
        let mut len = 0;
        let mut i = start;
        while !visited[i] {
            visited[i] = true;
            i = perm[i];
            len += 1;
        }
        if len % 2 == 0 {
            sign = -sign;
        }
    }
    sign
}

impl MatShape for Permutation {
    fn nrows(&self) -> usize {
        self.perm.len()
    }
    fn ncols(&self) -> usize {
        self.perm.len()
    }
}

impl<T: Scalar> LinearOperator<T> for Permutation {
    fn kind(&self) -> OpKind {
        OpKind::Permutation
    }

    fn matvec(&self, x: MatRef<'_, T>) -> Result<Mat<T>, OpError> {
        Ok(Mat::from_fn(x.nrows(), x.ncols(), |i, j| x[(self.perm[i], j)]))
    }

    fn mattransvec(&self, x: MatRef<'_, T>) -> Result<Mat<T>, OpError> {
        let mut y = Mat::<T>::zeros(x.nrows(), x.ncols());
        for j in 0..x.ncols() {
            for (i, &p) in self.perm.iter().enumerate() {
                y[(p, j)] = x[(i, j)];
            }
        }
        Ok(y)
    }

    fn placement(&self) -> Placement {
        self.placement
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_repeats() {
        assert!(Permutation::new(vec![0, 0, 1]).is_err());
        assert!(Permutation::new(vec![0, 3, 1]).is_err());
    }

    #[test]
    fn gathers_rows_and_inverts() {
        let p = Permutation::new(vec![2, 0, 1]).unwrap();
        let x = Mat::from_fn(3, 1, |i, _| (10 * i) as f64);
        let y = LinearOperator::<f64>::matvec(&p, x.as_ref()).unwrap();
        assert_eq!((y[(0, 0)], y[(1, 0)], y[(2, 0)]), (20.0, 0.0, 10.0));
        let back = LinearOperator::<f64>::mattransvec(&p, y.as_ref()).unwrap();
        assert_eq!(back, x);
        let inv = p.inverse();
        let again = LinearOperator::<f64>::matvec(&inv, y.as_ref()).unwrap();
        assert_eq!(again, x);
    }

    #[test]
    fn sign_of_cycles() {
        assert_eq!(Permutation::new(vec![0, 1, 2]).unwrap().sign(), 1);
        assert_eq!(Permutation::new(vec![1, 0, 2]).unwrap().sign(), -1);
        assert_eq!(Permutation::new(vec![2, 0, 1]).unwrap().sign(), 1);
    }
}
