//! Caller-asserted algebraic properties and their closure rules.
//!
//! Annotations never change an operator's action; they only widen the set of dispatch rules
//! an operator is eligible for. A false annotation is not detected.

use bitflags::bitflags;

bitflags! {
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
    pub struct Capabilities: u8 {
        const SELF_ADJOINT          = 0b0000_0001;
        const POSITIVE_SEMIDEFINITE = Self::SELF_ADJOINT.bits() | 0b0000_0010;
    }
}

impl Capabilities {
    pub fn is_self_adjoint(self) -> bool {
        self.contains(Capabilities::SELF_ADJOINT)
    }

    pub fn is_psd(self) -> bool {
        self.contains(Capabilities::POSITIVE_SEMIDEFINITE)
    }

    /// Strongest property implied by both sides.
    pub fn common(self, other: Capabilities) -> Capabilities {
        if self.is_psd() && other.is_psd() {
            Capabilities::POSITIVE_SEMIDEFINITE
        } else if self.is_self_adjoint() && other.is_self_adjoint() {
            Capabilities::SELF_ADJOINT
        } else {
            Capabilities::empty()
        }
    }

    /// Result of `A + B`.
    pub fn of_sum(terms: impl IntoIterator<Item = Capabilities>) -> Capabilities {
        let mut iter = terms.into_iter();
        let first = iter.next().unwrap_or(Capabilities::empty());
        iter.fold(first, |acc, c| acc.common(c))
    }

    /// Result of `c · A`.
    pub fn of_scaled(self, nonnegative: bool) -> Capabilities {
        if self.is_psd() && nonnegative {
            Capabilities::POSITIVE_SEMIDEFINITE
        } else if self.is_self_adjoint() {
            Capabilities::SELF_ADJOINT
        } else {
            Capabilities::empty()
        }
    }
}
