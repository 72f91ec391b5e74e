use snafu::ensure;

use crate::chain::{resulting_role, ChainOps, TNorm};
use crate::clause::Clause;
use crate::error::{self, Result};
use crate::predicate::PredicateType;

/// Fuzzy chain backed by a plain `f32` array, full precision, no
/// quantization error. The default fuzzy encoding (see
/// [`crate::chain::FuzzyEncoding`]).
#[derive(Debug, Clone, PartialEq)]
pub struct FloatChain {
    clause: Clause,
    role: PredicateType,
    tnorm: TNorm,
    sum: f32,
    data: Vec<f32>,
    deduced: Vec<usize>,
}

impl FloatChain {
    pub fn empty(n: usize, tnorm: TNorm) -> Self {
        Self {
            clause: Clause::empty(),
            role: PredicateType::Condition,
            tnorm,
            sum: n as f32,
            data: vec![1.0; n],
            deduced: Vec::new(),
        }
    }

    pub fn from_degrees(
        id: usize,
        role: PredicateType,
        tnorm: TNorm,
        values: &[f32],
    ) -> Self {
        let sum = values.iter().sum();
        Self {
            clause: Clause::singleton(id),
            role,
            tnorm,
            sum,
            data: values.to_vec(),
            deduced: Vec::new(),
        }
    }

    #[inline]
    fn conjoin_value(&self, a: f32, b: f32) -> f32 {
        match self.tnorm {
            TNorm::Goedel => a.min(b),
            TNorm::Goguen => a * b,
            TNorm::Lukasiewicz => (a + b - 1.0).max(0.0),
        }
    }
}

impl ChainOps for FloatChain {
    fn clause(&self) -> &Clause {
        &self.clause
    }

    fn role(&self) -> PredicateType {
        self.role
    }

    fn sum(&self) -> f32 {
        self.sum
    }

    fn len(&self) -> usize {
        self.data.len()
    }

    fn value(&self, i: usize) -> f32 {
        self.data[i]
    }

    fn conjoin(&self, other: &Self, to_focus: bool) -> Result<Self> {
        ensure!(
            self.data.len() == other.data.len(),
            error::IncompatibleChainLengthSnafu {
                left: self.data.len(),
                right: other.data.len(),
            }
        );
        ensure!(
            !to_focus || other.role == PredicateType::Both,
            error::IllegalFocusCoercionSnafu
        );

        let mut sum = 0.0f32;
        let data: Vec<f32> = self
            .data
            .iter()
            .zip(other.data.iter())
            .map(|(&a, &b)| {
                let v = self.conjoin_value(a, b);
                sum += v;
                v
            })
            .collect();

        let clause = self
            .clause
            .extended(other.clause.last().expect("other chain has a non-empty clause"));
        Ok(Self {
            clause,
            role: resulting_role(to_focus, other.role),
            tnorm: self.tnorm,
            sum,
            data,
            deduced: Vec::new(),
        })
    }

    fn deduced(&self) -> &[usize] {
        &self.deduced
    }

    fn deduced_mut(&mut self) -> &mut Vec<usize> {
        &mut self.deduced
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn goedel_conjunction_is_min() {
        let a = FloatChain::from_degrees(1, PredicateType::Condition, TNorm::Goedel, &[0.3, 0.9, 0.5]);
        let b = FloatChain::from_degrees(2, PredicateType::Condition, TNorm::Goedel, &[0.6, 0.2, 0.5]);
        let r = a.conjoin(&b, false).unwrap();
        assert_eq!(r.value(0), 0.3);
        assert_eq!(r.value(1), 0.2);
        assert_eq!(r.value(2), 0.5);
        assert!((r.sum() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn lukasiewicz_saturates_at_zero() {
        let a = FloatChain::from_degrees(1, PredicateType::Condition, TNorm::Lukasiewicz, &[0.2, 0.9]);
        let b = FloatChain::from_degrees(2, PredicateType::Condition, TNorm::Lukasiewicz, &[0.3, 0.9]);
        let r = a.conjoin(&b, false).unwrap();
        assert_eq!(r.value(0), 0.0);
        assert!((r.value(1) - 0.8).abs() < 1e-6);
    }

    #[test]
    fn goguen_conjunction_is_product() {
        let a = FloatChain::from_degrees(1, PredicateType::Condition, TNorm::Goguen, &[0.5, 1.0]);
        let b = FloatChain::from_degrees(2, PredicateType::Condition, TNorm::Goguen, &[0.4, 0.0]);
        let r = a.conjoin(&b, false).unwrap();
        assert!((r.value(0) - 0.2).abs() < 1e-6);
        assert_eq!(r.value(1), 0.0);
    }
}
