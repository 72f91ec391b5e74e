//! Property-based tests over the quantified invariants in the
//! specification's "Testable Properties" section: chain sum/clause
//! invariants, conjunction correctness per t-norm, and idempotence /
//! commutativity of bit-chain conjunction.

use condition_digger::{BitChain, ChainOps, FloatChain, PredicateType, TNorm};
use proptest::prelude::*;

fn bits_strategy(n: usize) -> impl Strategy<Value = Vec<bool>> {
    prop::collection::vec(any::<bool>(), n)
}

fn degrees_strategy(n: usize) -> impl Strategy<Value = Vec<f32>> {
    prop::collection::vec(0.0f32..=1.0f32, n)
}

proptest! {
    /// Invariant 1: a bit chain's cached sum equals the popcount of its raw
    /// vector.
    #[test]
    fn bit_chain_sum_matches_popcount(bits in bits_strategy(64)) {
        let chain = BitChain::from_bits(1, PredicateType::Condition, &bits);
        let expected = bits.iter().filter(|&&b| b).count() as f32;
        prop_assert_eq!(chain.sum(), expected);
    }

    /// Invariant 3: conjoining a bit chain with an independently built copy
    /// of itself reproduces the same values (idempotence of AND).
    #[test]
    fn bit_chain_conjunction_is_idempotent(bits in bits_strategy(40)) {
        let a = BitChain::from_bits(1, PredicateType::Condition, &bits);
        let b = BitChain::from_bits(2, PredicateType::Condition, &bits);
        let r = a.conjoin(&b, false).unwrap();
        prop_assert_eq!(r.sum(), a.sum());
        for i in 0..bits.len() {
            prop_assert_eq!(r.get(i), bits[i]);
        }
    }

    /// Invariant 4: bit-chain AND is commutative on values (and hence on
    /// sum), even though the two conjunctions produce differently-ordered
    /// clauses.
    #[test]
    fn bit_chain_conjunction_commutes_on_sum(a_bits in bits_strategy(50), b_bits in bits_strategy(50)) {
        let a = BitChain::from_bits(1, PredicateType::Condition, &a_bits);
        let b = BitChain::from_bits(2, PredicateType::Condition, &b_bits);
        let ab = a.conjoin(&b, false).unwrap();
        let ba = b.conjoin(&a, false).unwrap();
        prop_assert_eq!(ab.sum(), ba.sum());
    }

    /// Invariant 2 (Float codec, exact): Godel conjunction equals the
    /// elementwise minimum.
    #[test]
    fn float_godel_conjunction_is_elementwise_min(a in degrees_strategy(30), b in degrees_strategy(30)) {
        let ca = FloatChain::from_degrees(1, PredicateType::Condition, TNorm::Goedel, &a);
        let cb = FloatChain::from_degrees(2, PredicateType::Condition, TNorm::Goedel, &b);
        let r = ca.conjoin(&cb, false).unwrap();
        for i in 0..a.len() {
            prop_assert!((r.value(i) - a[i].min(b[i])).abs() < 1e-6);
        }
    }

    /// Invariant 2 (Float codec, exact): Lukasiewicz conjunction equals
    /// max(0, a + b - 1).
    #[test]
    fn float_lukasiewicz_conjunction_matches_formula(a in degrees_strategy(30), b in degrees_strategy(30)) {
        let ca = FloatChain::from_degrees(1, PredicateType::Condition, TNorm::Lukasiewicz, &a);
        let cb = FloatChain::from_degrees(2, PredicateType::Condition, TNorm::Lukasiewicz, &b);
        let r = ca.conjoin(&cb, false).unwrap();
        for i in 0..a.len() {
            let expected = (a[i] + b[i] - 1.0).max(0.0);
            prop_assert!((r.value(i) - expected).abs() < 1e-6);
        }
    }

    /// Invariant 2 (Float codec, exact): Goguen conjunction equals the
    /// elementwise product.
    #[test]
    fn float_goguen_conjunction_is_elementwise_product(a in degrees_strategy(30), b in degrees_strategy(30)) {
        let ca = FloatChain::from_degrees(1, PredicateType::Condition, TNorm::Goguen, &a);
        let cb = FloatChain::from_degrees(2, PredicateType::Condition, TNorm::Goguen, &b);
        let r = ca.conjoin(&cb, false).unwrap();
        for i in 0..a.len() {
            prop_assert!((r.value(i) - a[i] * b[i]).abs() < 1e-6);
        }
    }

    /// Invariant 1 (Float codec): cached sum equals the sum of the decoded
    /// values.
    #[test]
    fn float_chain_sum_matches_reduction(values in degrees_strategy(40)) {
        let chain = FloatChain::from_degrees(1, PredicateType::Condition, TNorm::Goedel, &values);
        let expected: f32 = values.iter().sum();
        prop_assert!((chain.sum() - expected).abs() < 1e-4);
    }
}
