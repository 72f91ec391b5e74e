use hashbrown::HashMap;

use crate::chain::ChainOps;
use crate::collection::ChainCollection;

struct Node {
    children: HashMap<usize, usize>,
    consequents: Vec<usize>,
}

impl Node {
    fn new() -> Self {
        Self {
            children: HashMap::new(),
            consequents: Vec::new(),
        }
    }
}

/// A trie over predicate *enumeration-order ranks* (not raw predicate ids)
/// that records "antecedent implies consequent" rules, and lets a chain's
/// clause be matched against every registered antecedent that is a
/// subsequence of it.
///
/// The tree owns its nodes in a flat arena (`Vec<Node>`) addressed by index,
/// so there is no pointer chasing and no lifetime to thread through the
/// digger.
pub struct TautologyTree {
    predicate_to_index: HashMap<usize, usize>,
    available_consequents: Vec<usize>,
    nodes: Vec<Node>,
}

const ROOT: usize = 0;

impl TautologyTree {
    pub fn from_collection<C: ChainOps>(collection: &ChainCollection<C>) -> Self {
        let mut predicate_to_index = HashMap::new();
        for i in 0..collection.condition_count() {
            let id = collection[i].clause().last().expect("condition chain has a predicate");
            predicate_to_index.insert(id, i);
        }

        let first_focus = collection.first_focus_index();
        let mut available_consequents = Vec::with_capacity(collection.focus_count());
        for i in 0..collection.focus_count() {
            let id = collection[i + first_focus]
                .clause()
                .last()
                .expect("focus chain has a predicate");
            available_consequents.push(id);
        }

        Self {
            predicate_to_index,
            available_consequents,
            nodes: vec![Node::new()],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes[ROOT].children.is_empty() && self.nodes[ROOT].consequents.is_empty()
    }

    /// Registers `antecedent => consequent`. The antecedent may be given in
    /// any order; it is sorted by enumeration-order rank before insertion.
    /// Silently ignored if it refers to a predicate unknown to this tree
    /// (absent from the condition or focus sets the tree was built from),
    /// so that rule stores can outlive a narrower column schema.
    pub fn add_tautology(&mut self, antecedent: &[usize], consequent: usize) {
        if !self.is_valid(antecedent, consequent) {
            return;
        }

        let mut sorted = antecedent.to_vec();
        sorted.sort_by_key(|p| self.predicate_to_index[p]);

        let mut node = ROOT;
        for &predicate in sorted.iter().rev() {
            let rank = self.predicate_to_index[&predicate];
            node = *self.nodes[node].children.entry(rank).or_insert_with(|| {
                self.nodes.push(Node::new());
                self.nodes.len() - 1
            });
        }
        self.nodes[node].consequents.push(consequent);
    }

    /// Recomputes the chain's deduced-predicate list from its clause.
    pub fn update_deduction<C: ChainOps>(&self, chain: &mut C) {
        let deduced = chain.deduced_mut();
        deduced.clear();

        let clause = chain.clause().clone();
        if clause.is_empty() {
            deduced.extend_from_slice(&self.nodes[ROOT].consequents);
            return;
        }

        let reversed: Vec<usize> = clause.as_slice().iter().rev().copied().collect();
        if let Some(&rank) = self.predicate_to_index.get(&reversed[0]) {
            if let Some(&node) = self.nodes[ROOT].children.get(&rank) {
                let mut deduced_local = Vec::new();
                self.get(node, &reversed[1..], &mut deduced_local);
                *chain.deduced_mut() = deduced_local;
            }
        }
    }

    fn get(&self, node: usize, remaining: &[usize], result: &mut Vec<usize>) {
        result.extend_from_slice(&self.nodes[node].consequents);
        for i in 0..remaining.len() {
            if let Some(&rank) = self.predicate_to_index.get(&remaining[i]) {
                if let Some(&child) = self.nodes[node].children.get(&rank) {
                    self.get(child, &remaining[i + 1..], result);
                }
            }
        }
    }

    fn is_valid(&self, antecedent: &[usize], consequent: usize) -> bool {
        antecedent.iter().all(|p| self.predicate_to_index.contains_key(p))
            && self.available_consequents.contains(&consequent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::BitChain;
    use crate::predicate::PredicateType;

    fn collection() -> ChainCollection<BitChain> {
        // Sums are chosen so the stable sort ranks predicates 1, 2, 3 (in
        // that order) ahead of the single focus, predicate 4.
        ChainCollection::build(vec![
            BitChain::from_bits(1, PredicateType::Condition, &[true, true, true]),
            BitChain::from_bits(2, PredicateType::Condition, &[true, true, false]),
            BitChain::from_bits(3, PredicateType::Condition, &[true, false, false]),
            BitChain::from_bits(4, PredicateType::Focus, &[true, false, false]),
        ])
    }

    #[test]
    fn deduces_registered_consequent() {
        let collection = collection();
        let mut tree = TautologyTree::from_collection(&collection);
        tree.add_tautology(&[1, 2], 4);

        let mut chain = collection[0].conjoin(&collection[1], false).unwrap();
        tree.update_deduction(&mut chain);
        assert!(chain.deduces(4));
    }

    #[test]
    fn subsequence_match_skips_intervening_predicates() {
        let collection = collection();
        let mut tree = TautologyTree::from_collection(&collection);
        // antecedent {1, 3} implies 4 even though the clause also contains
        // predicate 2 interleaved between them in enumeration order; the
        // root-level lookup keys off the clause's actual last predicate (3),
        // and the rest of the antecedent (1) is then found by subsequence
        // match among what came before it.
        tree.add_tautology(&[1, 3], 4);

        let ab = collection[0].conjoin(&collection[1], false).unwrap();
        let mut abc = ab.conjoin(&collection[2], false).unwrap();
        tree.update_deduction(&mut abc);
        assert!(abc.deduces(4));
    }

    #[test]
    fn does_not_match_when_clauses_last_predicate_is_not_the_antecedents_top() {
        let collection = collection();
        let mut tree = TautologyTree::from_collection(&collection);
        // antecedent {1} alone only matches a clause whose *last* predicate
        // is 1 itself; it does not fire just because 1 occurs earlier.
        tree.add_tautology(&[1], 4);

        let mut ab = collection[0].conjoin(&collection[1], false).unwrap();
        tree.update_deduction(&mut ab);
        assert!(!ab.deduces(4));
    }

    #[test]
    fn ignores_tautology_with_unknown_predicate() {
        let collection = collection();
        let mut tree = TautologyTree::from_collection(&collection);
        tree.add_tautology(&[999], 4);
        assert!(tree.is_empty());
    }
}
