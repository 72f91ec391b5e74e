//! Chain codecs: the per-clause truth/degree vectors the digger conjoins.
//!
//! A single run uses exactly one codec for every predicate (see
//! `ChainOps::conjoin`'s fixed-shape contract below); which codec is in
//! play is decided once, at the public API boundary, from the input
//! columns and the configured [`FuzzyEncoding`].

mod bit;
mod float;
mod fubit;

pub use bit::BitChain;
pub use float::FloatChain;
pub use fubit::{FubitChain, FubitBlockSize};

use crate::clause::Clause;
use crate::predicate::PredicateType;

/// T-norm under which fuzzy chains are conjoined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TNorm {
    Goedel,
    Goguen,
    Lukasiewicz,
}

/// Which fuzzy representation a run should use. Crisp (boolean-only) runs
/// always use [`BitChain`] regardless of this setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FuzzyEncoding {
    Float,
    Fubit(FubitBlockSize),
}

impl Default for FuzzyEncoding {
    fn default() -> Self {
        Self::Float
    }
}

/// Shared behavior every chain codec provides to the digger.
///
/// `conjoin` always produces a fresh value rather than aliasing an existing
/// one; all three implementors also derive `Clone` so a chain can be handed
/// off whole to another worker thread (see `crate::threaded`) instead of
/// only ever being borrowed in place.
pub trait ChainOps: Sized {
    fn clause(&self) -> &Clause;
    fn role(&self) -> PredicateType;
    fn sum(&self) -> f32;
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_condition(&self) -> bool {
        self.role().is_condition()
    }

    fn is_focus(&self) -> bool {
        self.role().is_focus()
    }

    /// Value of row `i` as a degree in `[0, 1]` (1.0/0.0 for bit chains).
    fn value(&self, i: usize) -> f32;

    /// Conjoin `self` (the condition/prefix operand) with `other`, whose
    /// clause extends `self`'s by exactly one predicate. `to_focus` forces
    /// the resulting role to [`PredicateType::Focus`] regardless of
    /// `other`'s role (used when `other` is a `Both`-role chain that
    /// appears earlier than the current index in the sorted collection).
    fn conjoin(&self, other: &Self, to_focus: bool) -> crate::error::Result<Self>;

    fn deduces(&self, id: usize) -> bool {
        self.deduced().contains(&id)
    }

    fn deduces_itself(&self) -> bool {
        self.clause().iter().any(|p| self.deduces(p))
    }

    fn deduced(&self) -> &[usize];
    fn deduced_mut(&mut self) -> &mut Vec<usize>;
}

pub(crate) fn resulting_role(to_focus: bool, other_role: PredicateType) -> PredicateType {
    if to_focus {
        PredicateType::Focus
    } else {
        other_role
    }
}
