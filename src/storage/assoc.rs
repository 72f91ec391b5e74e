use crate::chain::ChainOps;
use crate::collection::ChainCollection;
use crate::config::Config;
use crate::error::Result;
use crate::predicate::Predicate;
use crate::selector::Selector;
use crate::storage::{contingency, Contingency, Storage};

/// One row of an association-rule frame: antecedent/consequent names plus
/// the standard rule-mining metrics.
#[derive(Debug, Clone, PartialEq)]
pub struct AssocRow {
    pub antecedent: Vec<String>,
    pub consequent: String,
    pub support: f32,
    pub confidence: f32,
    pub coverage: f32,
    pub conseq_support: f32,
    pub lift: f32,
    pub count: f32,
    pub length: usize,
    pub pp: f32,
    pub np: f32,
    pub pn: f32,
    pub nn: f32,
}

/// Builds a full association-rules table: one [`AssocRow`] per (condition,
/// selected focus) pair visited by the digger.
#[derive(Debug, Default)]
pub struct AssocStorage {
    rows: Vec<AssocRow>,
}

impl AssocStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> &[AssocRow] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<AssocRow> {
        self.rows
    }
}

impl<C: ChainOps> Storage<C> for AssocStorage {
    fn store(
        &mut self,
        config: &Config,
        predicates: &[Predicate],
        parent: &C,
        child: &ChainCollection<C>,
        selector: &Selector,
        predicate_sums: &[f32],
    ) -> Result<()> {
        let n = config.nrow();
        let name_of = |id: usize| -> String {
            predicates
                .iter()
                .find(|p| p.id == id)
                .map(|p| p.name.clone())
                .unwrap_or_else(|| id.to_string())
        };

        let mut antecedent: Vec<String> = parent.clause().iter().map(name_of).collect();
        antecedent.sort();
        let coverage = parent.sum() / n as f32;
        let length = parent.clause().len();

        let first_focus = child.first_focus_index();
        for i in first_focus..child.size() {
            if !selector.is_selected(i - first_focus) {
                continue;
            }
            let focus = &child[i];
            let id = focus.clause().last().expect("focus chain has a predicate");
            let conseq_support = predicate_sums[id] / n as f32;
            let Contingency { pp, np, pn, nn } = contingency(n, parent.sum(), predicate_sums[id], focus.sum());
            let support = pp / n as f32;
            let confidence = if parent.sum() > 0.0 { pp / parent.sum() } else { 0.0 };
            let lift = if coverage > 0.0 { confidence / conseq_support } else { 0.0 };

            self.rows.push(AssocRow {
                antecedent: antecedent.clone(),
                consequent: name_of(id),
                support,
                confidence,
                coverage,
                conseq_support,
                lift,
                count: pp,
                length,
                pp,
                np,
                pn,
                nn,
            });
        }

        Ok(())
    }

    fn size(&self) -> usize {
        self.rows.len()
    }
}
