//! The depth-first enumerator: the core combinatorial search.
//!
//! [`Digger`] owns every piece of mutable state a single run needs -- the
//! tautology tree, the per-predicate sum table, the progress counter, and
//! the result sink -- and drives the recursive `processChains` /
//! `processChildrenChains` pair described by the original engine. It is
//! generic over both the chain codec (`C`) and the storage sink (`S`), so
//! the same search logic serves crisp and fuzzy runs, callback-driven and
//! association-frame-driven ones alike.

use tracing::debug;

use crate::chain::ChainOps;
use crate::collection::ChainCollection;
use crate::config::Config;
use crate::error::{self, Result};
use crate::predicate::Predicate;
use crate::progress::{CancellationToken, CombinatorialProgress};
use crate::storage::Storage;
use crate::tautology::TautologyTree;

/// Derives the per-predicate sum table, the tautology tree, and the
/// progress counter from the full initial collection. Shared by [`Digger`]
/// and `crate::threaded::ThreadedDigger`, which both start a run from the
/// same three pieces of state.
pub(crate) fn init<C: ChainOps>(
    config: &Config,
    predicates: &[Predicate],
    initial: &ChainCollection<C>,
) -> (Vec<f32>, TautologyTree, CombinatorialProgress) {
    let max_id = predicates.iter().map(|p| p.id).max().unwrap_or(0);
    let mut predicate_sums = vec![0.0f32; max_id + 1];
    for i in 0..initial.size() {
        let chain = &initial[i];
        if let Some(id) = chain.clause().last() {
            predicate_sums[id] = chain.sum();
        }
    }

    let tree = TautologyTree::from_collection(initial);
    let progress = CombinatorialProgress::new(initial.condition_count(), config.max_length());

    (predicate_sums, tree, progress)
}

/// Depth-first enumerator over conjunctions of predicates.
///
/// A `Digger` is single-use: build it with [`Digger::new`], consume it with
/// [`Digger::run`], and get the populated storage back.
pub struct Digger<C: ChainOps, S: Storage<C>> {
    config: Config,
    predicates: Vec<Predicate>,
    predicate_sums: Vec<f32>,
    tree: TautologyTree,
    progress: CombinatorialProgress,
    cancellation: CancellationToken,
    storage: S,
    initial: ChainCollection<C>,
}

impl<C: ChainOps, S: Storage<C>> Digger<C, S> {
    /// Builds a digger from the full, sorted collection of every
    /// condition/focus chain derived from the input columns.
    pub fn new(config: Config, predicates: Vec<Predicate>, initial: ChainCollection<C>, storage: S) -> Self {
        let (predicate_sums, tree, progress) = init(&config, &predicates, &initial);

        Self {
            config,
            predicates,
            predicate_sums,
            tree,
            progress,
            cancellation: CancellationToken::new(),
            storage,
            initial,
        }
    }

    /// A cloneable handle a caller can use to cancel a run in progress
    /// (e.g. from a signal handler or a different thread).
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    /// Installs a token the caller already holds (e.g. one shared with a
    /// watchdog thread) in place of the one created by [`Digger::new`].
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn progress(&self) -> &CombinatorialProgress {
        &self.progress
    }

    /// Registers a static `antecedent => consequent` tautology to be
    /// deduced away during the run. Call before [`Digger::run`]; rules
    /// referring to a predicate this digger doesn't know about are
    /// silently ignored (see [`TautologyTree::add_tautology`]).
    pub fn add_tautology(&mut self, antecedent: &[usize], consequent: usize) {
        self.tree.add_tautology(antecedent, consequent);
    }

    /// Runs the search to completion and hands back the accumulated
    /// storage. `root` is the degenerate chain for the empty clause: every
    /// row matches, sum == n.
    pub fn run(mut self, mut root: C) -> Result<S> {
        debug!(
            conditions = self.initial.condition_count(),
            foci = self.initial.focus_count(),
            "starting digger run"
        );
        self.tree.update_deduction(&mut root);

        let initial = std::mem::replace(&mut self.initial, ChainCollection::new());
        let mut filtered = ChainCollection::with_capacity(initial.size());
        for chain in initial.into_chains() {
            if self.is_non_redundant(&root, &chain) && self.is_candidate(&chain) {
                filtered.append(chain);
            }
        }

        self.process_children_chains(&root, filtered)?;
        debug!(results = self.storage.size(), "digger run finished");
        Ok(self.storage)
    }

    fn process_chains(&mut self, mut collection: ChainCollection<C>) -> Result<()> {
        for i in 0..collection.condition_count() {
            if self.cancellation.is_cancelled() {
                return error::CancelledSnafu.fail();
            }

            self.tree.update_deduction(&mut collection[i]);
            if collection[i].deduces_itself() {
                continue;
            }

            let clause_len = collection[i].clause().len();
            let remaining = collection.condition_count() - i - 1;
            let max_additional = self.remaining_levels(clause_len);
            let _batch = self.progress.open_batch(remaining, max_additional);

            let child = if self.is_extendable(&collection[i]) {
                self.combine(&collection, i, false)?
            } else if collection.has_foci() {
                self.combine(&collection, i, true)?
            } else {
                ChainCollection::new()
            };

            self.process_children_chains(&collection[i], child)?;
        }
        Ok(())
    }

    fn process_children_chains(&mut self, parent: &C, child: ChainCollection<C>) -> Result<()> {
        if !self.config.filter_empty_foci() || child.has_foci() {
            if self.is_storable(parent) {
                let selector = self.build_selector(parent, &child);
                if !self.config.filter_empty_foci() || selector.selected_count() > 0 {
                    self.storage.store(
                        &self.config,
                        &self.predicates,
                        parent,
                        &child,
                        &selector,
                        &self.predicate_sums,
                    )?;
                }
            }
            if self.is_extendable(parent) {
                self.process_chains(child)?;
            }
        }
        Ok(())
    }

    /// Emits chains obtained by conjoining `parent[i]` with every later
    /// chain `j > i` that survives redundancy and candidacy checks. When
    /// `parent[i]` falls inside the Both-role zone of the sorted
    /// collection, also conjoins with the Both-role chains *before* it at
    /// `j` in `[firstFocusIndex, i)`, forcing the result to Focus role --
    /// those earlier chains are condition candidates already spent as
    /// parents elsewhere in the tree, but still valid focus partners here.
    fn combine(&self, parent: &ChainCollection<C>, i: usize, only_foci: bool) -> Result<ChainCollection<C>> {
        rules::combine(&self.config, parent, i, only_foci)
    }

    fn is_non_redundant(&self, parent: &C, chain: &C) -> bool {
        rules::is_non_redundant(&self.config, parent, chain)
    }

    fn is_candidate(&self, chain: &C) -> bool {
        rules::is_candidate(&self.config, chain)
    }

    fn is_extendable(&self, chain: &C) -> bool {
        rules::is_extendable(&self.config, chain, self.storage.at_capacity(&self.config))
    }

    fn is_storable(&self, chain: &C) -> bool {
        rules::is_storable(&self.config, chain, self.storage.at_capacity(&self.config))
    }

    fn build_selector(&self, parent: &C, child: &ChainCollection<C>) -> crate::selector::Selector {
        rules::build_selector(&self.config, parent, child)
    }

    fn remaining_levels(&self, clause_len: usize) -> usize {
        rules::remaining_levels(&self.config, clause_len)
    }
}

/// Pure, side-effect-free predicate logic shared between [`Digger`] and the
/// shared-deque threaded variant (`crate::threaded`), so both walk the
/// search tree under exactly the same rules without duplicating them.
pub(crate) mod rules {
    use crate::chain::ChainOps;
    use crate::collection::ChainCollection;
    use crate::config::Config;
    use crate::error::Result;
    use crate::selector::Selector;
    use tracing::trace;

    /// Emits chains obtained by conjoining `parent[i]` with every later
    /// chain `j > i` that survives redundancy and candidacy checks. When
    /// `parent[i]` falls inside the Both-role zone of the sorted
    /// collection, also conjoins with the Both-role chains *before* it at
    /// `j` in `[firstFocusIndex, i)`, forcing the result to Focus role --
    /// those earlier chains are condition candidates already spent as
    /// parents elsewhere in the tree, but still valid focus partners here.
    pub(crate) fn combine<C: ChainOps>(
        config: &Config,
        parent: &ChainCollection<C>,
        i: usize,
        only_foci: bool,
    ) -> Result<ChainCollection<C>> {
        let condition_chain = &parent[i];
        let parent_size = parent.size();
        let first_focus = parent.first_focus_index();

        let mut begin = i + 1;
        if only_foci && begin < first_focus {
            begin = first_focus;
        }

        let both_len = i.saturating_sub(first_focus);
        let estimated = parent_size.saturating_sub(begin) + both_len;
        let mut target = ChainCollection::with_capacity(estimated);

        for j in begin..parent_size {
            combine_internal(config, &mut target, condition_chain, &parent[j], false)?;
        }
        for j in first_focus..i {
            combine_internal(config, &mut target, condition_chain, &parent[j], true)?;
        }

        Ok(target)
    }

    fn combine_internal<C: ChainOps>(
        config: &Config,
        target: &mut ChainCollection<C>,
        condition_chain: &C,
        second: &C,
        to_focus: bool,
    ) -> Result<()> {
        if is_non_redundant(config, condition_chain, second) {
            let new_chain = condition_chain.conjoin(second, to_focus)?;
            if is_candidate(config, &new_chain) {
                target.append(new_chain);
            }
        }
        Ok(())
    }

    /// `curr` is the candidate's own last predicate; `parent` is the chain
    /// it would extend.
    pub(crate) fn is_non_redundant<C: ChainOps>(config: &Config, parent: &C, chain: &C) -> bool {
        let curr = chain.clause().last().expect("candidate chain has a non-empty clause");

        if let Some(pref) = parent.clause().last() {
            if pref == curr {
                return false;
            }
            let group = config.disjoint_group(pref);
            if group != 0 && group == config.disjoint_group(curr) {
                return false;
            }
        }

        if is_excluded(config, parent, curr) {
            trace!(predicate = curr, "skipped: excluded subset");
            return false;
        }

        if parent.deduces(curr) {
            trace!(predicate = curr, "skipped: deducible from prefix");
            return false;
        }

        true
    }

    /// True iff some excluded subset contains `curr` and every other
    /// member of that subset is already present in `parent`'s clause.
    fn is_excluded<C: ChainOps>(config: &Config, parent: &C, curr: usize) -> bool {
        let clause = parent.clause().as_slice();
        config
            .excluded()
            .iter()
            .any(|subset| subset.contains(&curr) && subset.iter().all(|&m| m == curr || clause.contains(&m)))
    }

    pub(crate) fn is_candidate<C: ChainOps>(config: &Config, chain: &C) -> bool {
        if chain.is_condition() && chain.sum() >= config.min_sum() {
            return true;
        }
        if chain.is_focus() && chain.sum() >= config.min_focus_sum() {
            return true;
        }
        false
    }

    pub(crate) fn is_extendable<C: ChainOps>(config: &Config, chain: &C, storage_at_capacity: bool) -> bool {
        let within_length = match config.max_length() {
            Some(max) => chain.clause().len() < max,
            None => true,
        };
        within_length && chain.sum() >= config.min_sum() && !storage_at_capacity
    }

    pub(crate) fn is_storable<C: ChainOps>(config: &Config, chain: &C, storage_at_capacity: bool) -> bool {
        chain.clause().len() >= config.min_length()
            && chain.sum() >= config.min_sum()
            && chain.sum() <= config.max_sum()
            && !storage_at_capacity
    }

    pub(crate) fn build_selector<C: ChainOps>(config: &Config, parent: &C, child: &ChainCollection<C>) -> Selector {
        let threshold = config.min_conditional_focus_support();
        let constant = threshold <= 0.0;
        let mut selector = Selector::new(child.focus_count(), constant);
        if !constant {
            let reciprocal = 1.0 / parent.sum();
            let first_focus = child.first_focus_index();
            for i in 0..child.focus_count() {
                let focus = &child[i + first_focus];
                if focus.sum() * reciprocal < threshold {
                    selector.unselect(i);
                }
            }
        }
        selector
    }

    pub(crate) fn remaining_levels(config: &Config, clause_len: usize) -> usize {
        match config.max_length() {
            Some(max) => max.saturating_sub(clause_len),
            None => usize::MAX / 2,
        }
    }
}
