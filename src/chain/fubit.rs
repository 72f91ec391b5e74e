use snafu::ensure;

use crate::chain::{resulting_role, ChainOps, TNorm};
use crate::clause::Clause;
use crate::error::{self, Result};
use crate::predicate::PredicateType;

/// Width in bits of a single packed fuzzy value, including its overflow bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FubitBlockSize {
    Four,
    Eight,
    Sixteen,
}

impl FubitBlockSize {
    fn bits(self) -> u32 {
        match self {
            Self::Four => 4,
            Self::Eight => 8,
            Self::Sixteen => 16,
        }
    }
}

const INTEGER_SIZE: u32 = 64;

/// Constants derived from a block size, computed once per chain rather than
/// per value: `MAX_VALUE`, the overflow-bit masks, and the Goguen log base.
#[derive(Debug, Clone, Copy)]
struct Constants {
    block_size: u32,
    max_value: u64,
    max_value_f32: f32,
    block_mask: u64,
    dbl_block_mask: u64,
    step: u64,
    log_base: f32,
    log_log_base: f32,
    overflow_mask: u64,
    neg_overflow_mask: u64,
    odd_block_mask: u64,
}

impl Constants {
    fn for_block_size(bs: FubitBlockSize) -> Self {
        let block_size = bs.bits();
        let max_value: u64 = (1u64 << (block_size - 1)) - 1;
        let block_mask: u64 = (1u64 << block_size) - 1;
        let dbl_block_mask: u64 = (block_mask << block_size) | block_mask;
        let step = dbl_block_mask / max_value / 2;
        let log_base = (max_value as f64).powf(-1.0 / (max_value as f64 - 1.0)) as f32;

        // Top bit of every block, replicated across the whole word.
        let mut overflow_mask = 0u64;
        let mut shift = block_size - 1;
        while shift < INTEGER_SIZE {
            overflow_mask |= 1u64 << shift;
            shift += block_size;
        }

        // BLOCK_MASK set in every other block, used to add adjacent block
        // pairs without carrying into a neighboring pair.
        let mut odd_block_mask = 0u64;
        let mut pos = 0u32;
        let mut on = true;
        while pos < INTEGER_SIZE {
            if on {
                odd_block_mask |= block_mask << pos;
            }
            pos += block_size;
            on = !on;
        }

        Self {
            block_size,
            max_value,
            max_value_f32: max_value as f32,
            block_mask,
            dbl_block_mask,
            step,
            log_base,
            log_log_base: log_base.ln(),
            overflow_mask,
            neg_overflow_mask: !overflow_mask,
            odd_block_mask,
        }
    }

    #[inline]
    fn clone_bits(&self, value: u64) -> u64 {
        let mut res = value & self.overflow_mask;
        let mut shift = 1;
        while shift < self.block_size {
            res |= res >> shift;
            shift <<= 1;
        }
        res
    }
}

/// Packed fuzzy chain: `n` membership degrees quantized into `block_size`-bit
/// blocks (one overflow/sentinel bit per block) packed into 64-bit words.
#[derive(Debug, Clone)]
pub struct FubitChain {
    clause: Clause,
    role: PredicateType,
    tnorm: TNorm,
    block: FubitBlockSize,
    c: Constants,
    data: Vec<u64>,
    n: usize,
    sum: f32,
    deduced: Vec<usize>,
}

impl FubitChain {
    pub fn empty(n: usize, tnorm: TNorm, block: FubitBlockSize) -> Self {
        let mut chain = Self::new_uninitialized(Clause::empty(), PredicateType::Condition, tnorm, block, n);
        for i in 0..n {
            chain.set(i, 1.0);
        }
        chain.set_sum();
        chain
    }

    pub fn from_degrees(
        id: usize,
        role: PredicateType,
        tnorm: TNorm,
        block: FubitBlockSize,
        values: &[f32],
    ) -> Self {
        let mut chain = Self::new_uninitialized(Clause::singleton(id), role, tnorm, block, values.len());
        for (i, &v) in values.iter().enumerate() {
            chain.set(i, v);
        }
        chain.set_sum();
        chain
    }

    fn new_uninitialized(
        clause: Clause,
        role: PredicateType,
        tnorm: TNorm,
        block: FubitBlockSize,
        n: usize,
    ) -> Self {
        let c = Constants::for_block_size(block);
        let n_words = ((n as u64 * c.block_size as u64) + INTEGER_SIZE as u64 - 1) / INTEGER_SIZE as u64;
        Self {
            clause,
            role,
            tnorm,
            block,
            c,
            data: vec![0u64; n_words as usize],
            n,
            sum: 0.0,
            deduced: Vec::new(),
        }
    }

    #[inline]
    fn internal_index(&self, pos: usize) -> (usize, u32) {
        let bit_pos = pos as u64 * self.c.block_size as u64;
        let index = (bit_pos / INTEGER_SIZE as u64) as usize;
        let shift = (bit_pos % INTEGER_SIZE as u64) as u32;
        (index, shift)
    }

    #[inline]
    fn internal_set(&mut self, pos: usize, value: u64) {
        let (index, shift) = self.internal_index(pos);
        self.data[index] |= value << shift;
    }

    #[inline]
    fn internal_at(&self, pos: usize) -> u64 {
        let (index, shift) = self.internal_index(pos);
        (self.data[index] >> shift) & self.c.block_mask
    }

    fn set(&mut self, index: usize, value: f32) {
        match self.tnorm {
            TNorm::Goedel => {
                self.internal_set(index, (value * self.c.max_value_f32) as u64);
            }
            TNorm::Lukasiewicz => {
                self.internal_set(index, ((1.0 - value) * self.c.max_value_f32) as u64);
            }
            TNorm::Goguen => {
                let reciprocal = 1.0 / self.c.max_value_f32;
                let code = if value <= reciprocal {
                    self.c.max_value
                } else {
                    (value.ln() / self.c.log_log_base).round() as u64
                };
                self.internal_set(index, code);
            }
        }
    }

    #[inline]
    fn decode(&self, index: usize) -> f32 {
        let raw = self.internal_at(index);
        match self.tnorm {
            TNorm::Goedel => raw as f32 / self.c.max_value_f32,
            TNorm::Lukasiewicz => 1.0 - raw as f32 / self.c.max_value_f32,
            TNorm::Goguen => {
                if raw >= self.c.max_value {
                    0.0
                } else {
                    self.c.log_base.powf(raw as f32)
                }
            }
        }
    }

    fn internal_sum(&self) -> u64 {
        let mut result = 0u64;
        let mut index = 0usize;
        let step = self.c.step as usize;
        while index < self.data.len() {
            let mut tempsum = 0u64;
            let border = (index + step).min(self.data.len());
            while index < border {
                let val = self.data[index];
                tempsum += (val & self.c.odd_block_mask) + ((val >> self.c.block_size) & self.c.odd_block_mask);
                index += 1;
            }
            let mut shift = 0u32;
            while shift < INTEGER_SIZE {
                result += (tempsum >> shift) & self.c.dbl_block_mask;
                shift += 2 * self.c.block_size;
            }
        }
        result
    }

    fn set_sum(&mut self) {
        self.sum = match self.tnorm {
            TNorm::Goedel => self.internal_sum() as f32 / self.c.max_value_f32,
            TNorm::Lukasiewicz => self.n as f32 - self.internal_sum() as f32 / self.c.max_value_f32,
            TNorm::Goguen => (0..self.n).map(|i| self.decode(i)).sum(),
        };
    }
}

impl ChainOps for FubitChain {
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
        self.n
    }

    fn value(&self, i: usize) -> f32 {
        self.decode(i)
    }

    fn conjoin(&self, other: &Self, to_focus: bool) -> Result<Self> {
        ensure!(
            self.n == other.n,
            error::IncompatibleChainLengthSnafu {
                left: self.n,
                right: other.n,
            }
        );
        ensure!(
            !to_focus || other.role == PredicateType::Both,
            error::IllegalFocusCoercionSnafu
        );

        let mut result = Self::new_uninitialized(
            self.clause
                .extended(other.clause.last().expect("other chain has a non-empty clause")),
            resulting_role(to_focus, other.role),
            self.tnorm,
            self.block,
            self.n,
        );

        for i in 0..self.data.len() {
            let a = self.data[i];
            let b = other.data[i];
            result.data[i] = match self.tnorm {
                TNorm::Goedel => {
                    let s = self.c.clone_bits(a.wrapping_sub(b));
                    (a & s) | (b & !s)
                }
                TNorm::Lukasiewicz | TNorm::Goguen => {
                    let bitsum = a.wrapping_add(b);
                    let s = self.c.clone_bits(bitsum);
                    (bitsum | s) & self.c.neg_overflow_mask
                }
            };
        }

        result.set_sum();
        Ok(result)
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

    const TOL: f32 = 0.02;

    #[test]
    fn goedel_roundtrip_within_quantization_tolerance() {
        let c = FubitChain::from_degrees(
            1,
            PredicateType::Condition,
            TNorm::Goedel,
            FubitBlockSize::Eight,
            &[0.25, 0.5, 0.75, 1.0],
        );
        assert!((c.value(0) - 0.25).abs() < TOL);
        assert!((c.value(1) - 0.5).abs() < TOL);
        assert!((c.value(2) - 0.75).abs() < TOL);
        assert!((c.value(3) - 1.0).abs() < TOL);
    }

    #[test]
    fn goedel_conjunction_matches_min_within_tolerance() {
        let a = FubitChain::from_degrees(
            1,
            PredicateType::Condition,
            TNorm::Goedel,
            FubitBlockSize::Eight,
            &[0.3, 0.9],
        );
        let b = FubitChain::from_degrees(
            2,
            PredicateType::Condition,
            TNorm::Goedel,
            FubitBlockSize::Eight,
            &[0.6, 0.2],
        );
        let r = a.conjoin(&b, false).unwrap();
        assert!((r.value(0) - 0.3).abs() < TOL);
        assert!((r.value(1) - 0.2).abs() < TOL);
    }

    #[test]
    fn lukasiewicz_conjunction_matches_saturating_sum() {
        let a = FubitChain::from_degrees(
            1,
            PredicateType::Condition,
            TNorm::Lukasiewicz,
            FubitBlockSize::Eight,
            &[0.2, 0.9],
        );
        let b = FubitChain::from_degrees(
            2,
            PredicateType::Condition,
            TNorm::Lukasiewicz,
            FubitBlockSize::Eight,
            &[0.3, 0.9],
        );
        let r = a.conjoin(&b, false).unwrap();
        assert!(r.value(0) < TOL);
        assert!((r.value(1) - 0.8).abs() < TOL);
    }

    #[test]
    fn goguen_below_reciprocal_quantizes_to_zero() {
        let c = FubitChain::from_degrees(
            1,
            PredicateType::Condition,
            TNorm::Goguen,
            FubitBlockSize::Four,
            &[0.01],
        );
        assert_eq!(c.value(0), 0.0);
    }

    #[test]
    fn sum_matches_decoded_values() {
        let values = [0.1, 0.4, 0.9, 0.2, 0.6];
        let c = FubitChain::from_degrees(
            1,
            PredicateType::Condition,
            TNorm::Goedel,
            FubitBlockSize::Sixteen,
            &values,
        );
        let expected: f32 = values.iter().sum();
        assert!((c.sum() - expected).abs() < TOL);
    }
}
