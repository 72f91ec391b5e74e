//! Result assembly: turns a parent condition chain plus its surviving
//! focus children into records, and hands them to one of two sinks.

mod assoc;
mod callback;

pub use assoc::{AssocRow, AssocStorage};
pub use callback::{CallbackStorage, Record};

use crate::chain::ChainOps;
use crate::collection::ChainCollection;
use crate::config::Config;
use crate::error::Result;
use crate::predicate::Predicate;
use crate::selector::Selector;

/// Sink for condition/focus records produced by the digger. Implementations
/// decide what to do with each record (forward to a user callback, append a
/// row to an association-rule frame) and track how many they have accepted
/// so the digger can stop once `maxResults` is reached.
pub trait Storage<C: ChainOps> {
    fn store(
        &mut self,
        config: &Config,
        predicates: &[Predicate],
        parent: &C,
        child: &ChainCollection<C>,
        selector: &Selector,
        predicate_sums: &[f32],
    ) -> Result<()>;

    fn size(&self) -> usize;

    fn at_capacity(&self, config: &Config) -> bool {
        match config.max_results() {
            Some(max) => self.size() >= max,
            None => false,
        }
    }
}

/// The 2x2 contingency table for one (condition, focus) pairing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contingency {
    pub pp: f32,
    pub np: f32,
    pub pn: f32,
    pub nn: f32,
}

pub(crate) fn contingency(n: usize, parent_sum: f32, focus_total_sum: f32, focus_sum: f32) -> Contingency {
    Contingency {
        pp: focus_sum,
        pn: parent_sum - focus_sum,
        np: focus_total_sum - focus_sum,
        nn: n as f32 - parent_sum - focus_total_sum + focus_sum,
    }
}
