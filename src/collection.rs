use crate::chain::ChainOps;
use crate::predicate::PredicateType;

/// An ordered sequence of chains, stably sorted by role ascending
/// (Condition < Both < Focus) and sum descending within each role, with the
/// condition/focus boundaries this ordering implies cached alongside it.
#[derive(Debug, Default)]
pub struct ChainCollection<C> {
    chains: Vec<C>,
    n_conditions: usize,
    n_foci: usize,
}

impl<C: ChainOps> ChainCollection<C> {
    pub fn new() -> Self {
        Self {
            chains: Vec::new(),
            n_conditions: 0,
            n_foci: 0,
        }
    }

    pub fn with_capacity(cap: usize) -> Self {
        Self {
            chains: Vec::with_capacity(cap),
            n_conditions: 0,
            n_foci: 0,
        }
    }

    pub fn reserve(&mut self, additional: usize) {
        self.chains.reserve(additional);
    }

    /// Appends `chain`, then performs the one stable sort that establishes
    /// the Condition/Both/Focus ordering for the whole collection. Intended
    /// for building the initial, top-level collection once; use
    /// [`Self::append`] while building child collections during the DFS,
    /// where chains already arrive in an order consistent with the parent's.
    pub fn build(mut chains: Vec<C>) -> Self {
        let n_conditions = chains.iter().filter(|c| c.is_condition()).count();
        let n_foci = chains.iter().filter(|c| c.is_focus()).count();
        chains.sort_by(|a, b| {
            a.role()
                .cmp(&b.role())
                .then(b.sum().partial_cmp(&a.sum()).unwrap_or(std::cmp::Ordering::Equal))
        });
        Self {
            chains,
            n_conditions,
            n_foci,
        }
    }

    pub fn append(&mut self, chain: C) {
        if chain.is_condition() {
            self.n_conditions += 1;
        }
        if chain.is_focus() {
            self.n_foci += 1;
        }
        self.chains.push(chain);
    }

    pub fn size(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    pub fn first_focus_index(&self) -> usize {
        self.size() - self.n_foci
    }

    pub fn condition_count(&self) -> usize {
        self.n_conditions
    }

    pub fn focus_count(&self) -> usize {
        self.n_foci
    }

    pub fn has_foci(&self) -> bool {
        self.n_foci > 0
    }

    pub fn iter(&self) -> impl Iterator<Item = &C> {
        self.chains.iter()
    }

    /// Consumes the collection, yielding its chains in their stored (sorted)
    /// order. Used by the digger when a collection is filtered in place
    /// rather than rebuilt from scratch.
    pub fn into_chains(self) -> impl Iterator<Item = C> {
        self.chains.into_iter()
    }
}

impl<C> std::ops::Index<usize> for ChainCollection<C> {
    type Output = C;

    fn index(&self, i: usize) -> &C {
        &self.chains[i]
    }
}

impl<C> std::ops::IndexMut<usize> for ChainCollection<C> {
    fn index_mut(&mut self, i: usize) -> &mut C {
        &mut self.chains[i]
    }
}

// Ensure `PredicateType`'s Condition < Both < Focus ordering (declared in
// `predicate.rs`) is what callers rely on here.
const _: () = {
    assert!((PredicateType::Condition as u8) < (PredicateType::Both as u8));
    assert!((PredicateType::Both as u8) < (PredicateType::Focus as u8));
};
