use hashbrown::HashMap;

use crate::chain::ChainOps;
use crate::collection::ChainCollection;
use crate::config::{Argument, Config};
use crate::error::Result;
use crate::predicate::Predicate;
use crate::selector::Selector;
use crate::storage::{contingency, Contingency, Storage};

/// A single condition/focus record, populated only with the fields the
/// run's [`Config::arguments`] requested.
#[derive(Debug, Clone, Default)]
pub struct Record {
    pub condition: Option<Vec<String>>,
    pub sum: Option<f32>,
    pub support: Option<f32>,
    pub indices: Option<Vec<bool>>,
    pub weights: Option<Vec<f32>>,
    pub foci_supports: Option<HashMap<String, f32>>,
    pub pp: Option<HashMap<String, f32>>,
    pub np: Option<HashMap<String, f32>>,
    pub pn: Option<HashMap<String, f32>>,
    pub nn: Option<HashMap<String, f32>>,
}

/// Forwards each record to a caller-supplied callback, collecting its
/// return values in visit order. Tracks how many results have been
/// produced so the digger can stop at `maxResults`.
pub struct CallbackStorage<T, F> {
    callback: F,
    results: Vec<T>,
}

impl<T, F> CallbackStorage<T, F>
where
    F: FnMut(Record) -> Result<T>,
{
    pub fn new(callback: F) -> Self {
        Self {
            callback,
            results: Vec::new(),
        }
    }

    pub fn into_results(self) -> Vec<T> {
        self.results
    }
}

impl<C: ChainOps, T, F> Storage<C> for CallbackStorage<T, F>
where
    F: FnMut(Record) -> Result<T>,
{
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
        let record = build_record(config, predicates, parent, child, selector, predicate_sums, n);
        let value = (self.callback)(record)?;
        self.results.push(value);
        Ok(())
    }

    fn size(&self) -> usize {
        self.results.len()
    }
}

fn build_record<C: ChainOps>(
    config: &Config,
    predicates: &[Predicate],
    parent: &C,
    child: &ChainCollection<C>,
    selector: &Selector,
    predicate_sums: &[f32],
    n: usize,
) -> Record {
    let mut record = Record::default();

    let name_of = |id: usize| -> String {
        predicates
            .iter()
            .find(|p| p.id == id)
            .map(|p| p.name.clone())
            .unwrap_or_else(|| id.to_string())
    };

    if config.wants(Argument::Condition) {
        record.condition = Some(parent.clause().iter().map(name_of).collect());
    }
    if config.wants(Argument::Sum) {
        record.sum = Some(parent.sum());
    }
    if config.wants(Argument::Support) {
        record.support = Some(parent.sum() / n as f32);
    }
    if config.wants(Argument::Indices) {
        record.indices = Some((0..n).map(|i| parent.value(i) > 0.0).collect());
    }
    if config.wants(Argument::Weights) {
        record.weights = Some((0..n).map(|i| parent.value(i)).collect());
    }

    let first_focus = child.first_focus_index();
    let selected_foci: Vec<usize> = (first_focus..child.size())
        .filter(|&i| selector.is_selected(i - first_focus))
        .collect();

    if config.wants(Argument::FociSupports) {
        let mut m = HashMap::new();
        for &i in &selected_foci {
            let focus = &child[i];
            let id = focus.clause().last().expect("focus chain has a predicate");
            m.insert(name_of(id), focus.sum() / n as f32);
        }
        record.foci_supports = Some(m);
    }

    let wants_contingency = config.wants(Argument::Pp)
        || config.wants(Argument::Np)
        || config.wants(Argument::Pn)
        || config.wants(Argument::Nn);
    if wants_contingency {
        let mut pp = HashMap::new();
        let mut np = HashMap::new();
        let mut pn = HashMap::new();
        let mut nn = HashMap::new();
        for &i in &selected_foci {
            let focus = &child[i];
            let id = focus.clause().last().expect("focus chain has a predicate");
            let Contingency {
                pp: p,
                np: a,
                pn: b,
                nn: c,
            } = contingency(n, parent.sum(), predicate_sums[id], focus.sum());
            let name = name_of(id);
            pp.insert(name.clone(), p);
            np.insert(name.clone(), a);
            pn.insert(name.clone(), b);
            nn.insert(name, c);
        }
        if config.wants(Argument::Pp) {
            record.pp = Some(pp);
        }
        if config.wants(Argument::Np) {
            record.np = Some(np);
        }
        if config.wants(Argument::Pn) {
            record.pn = Some(pn);
        }
        if config.wants(Argument::Nn) {
            record.nn = Some(nn);
        }
    }

    record
}
