#![deny(rustdoc::broken_intra_doc_links, rustdoc::bare_urls, rust_2018_idioms)]
#![warn(
    clippy::clone_on_ref_ptr,
    clippy::use_self,
    clippy::str_to_string,
    clippy::string_to_string
)]
#![allow(clippy::too_many_arguments)]

//! Fuzzy/crisp frequent-pattern mining: depth-first enumeration of predicate
//! conjunctions over tabular columns, pruned by support, length, disjoint
//! groups, tautology deduction, and excluded-subset membership, emitted
//! through a caller callback or into an association-rule frame.
//!
//! [`mine`] and [`mine_associations`] are the two public entry points; they
//! pick the chain codec ([`chain::BitChain`] for all-boolean input,
//! [`chain::FloatChain`] or [`chain::FubitChain`] per
//! [`Config::fuzzy_encoding`] otherwise) and the worker count (per
//! [`Config::threads`]) from `config` and hand off to [`digger::Digger`] or
//! [`threaded::ThreadedDigger`] accordingly. Callers who need direct control
//! over a run in progress (a cancellation token obtained ahead of time, the
//! live [`progress::CombinatorialProgress`] counter) should build a
//! [`Digger`]/[`ThreadedDigger`] themselves instead.

pub mod chain;
pub mod clause;
pub mod collection;
pub mod config;
pub mod digger;
pub mod error;
pub mod predicate;
pub mod progress;
pub mod selector;
pub mod storage;
pub mod tautology;
pub mod threaded;

pub use chain::{BitChain, ChainOps, FloatChain, FubitBlockSize, FubitChain, FuzzyEncoding, TNorm};
pub use clause::Clause;
pub use collection::ChainCollection;
pub use config::{Argument, Config, ConfigBuilder};
pub use digger::Digger;
pub use error::{Error, Result};
pub use predicate::{Predicate, PredicateType};
pub use progress::{CancellationToken, CombinatorialProgress};
pub use selector::Selector;
pub use storage::{AssocRow, AssocStorage, CallbackStorage, Record, Storage};
pub use threaded::ThreadedDigger;

use snafu::ensure;

/// One input column: its identity plus either boolean or fuzzy-degree data.
///
/// A column that is neither a condition nor a focus (see [`ColumnInput::is_condition`]
/// / [`ColumnInput::is_focus`]) is accepted but contributes no chain, matching
/// the original engine's scan-and-skip behavior when building a [`ChainCollection`].
#[derive(Debug, Clone)]
pub struct ColumnInput<'a> {
    pub id: usize,
    pub name: String,
    pub is_condition: bool,
    pub is_focus: bool,
    pub data: ColumnData<'a>,
}

/// A column's raw values. Boolean columns are only accepted when every
/// column in the run is boolean, in which case the run uses [`BitChain`];
/// otherwise every column -- boolean ones embedding as `0.0`/`1.0` -- is
/// encoded with the fuzzy codec [`Config::fuzzy_encoding`] selects.
#[derive(Debug, Clone, Copy)]
pub enum ColumnData<'a> {
    Boolean(&'a [bool]),
    Fuzzy(&'a [f32]),
}

impl ColumnData<'_> {
    fn len(&self) -> usize {
        match self {
            Self::Boolean(v) => v.len(),
            Self::Fuzzy(v) => v.len(),
        }
    }

    fn is_boolean(&self) -> bool {
        matches!(self, Self::Boolean(_))
    }
}

/// Runs the search, forwarding every emitted record to `callback` and
/// collecting its return values in emission order. `cancellation`, when
/// given, lets a caller obtained it before the call cancel a run under way
/// from another thread; a fresh, never-cancelled token is used otherwise.
pub fn mine<T, F>(
    config: Config,
    columns: &[ColumnInput<'_>],
    cancellation: Option<CancellationToken>,
    callback: F,
) -> Result<Vec<T>>
where
    T: Send,
    F: FnMut(Record) -> Result<T> + Send,
{
    let storage = CallbackStorage::new(callback);
    let storage = run(config, columns, cancellation, storage)?;
    Ok(storage.into_results())
}

/// Runs the search and assembles a full association-rule table: one
/// [`AssocRow`] per `(condition, selected focus)` pair visited.
pub fn mine_associations(
    config: Config,
    columns: &[ColumnInput<'_>],
    cancellation: Option<CancellationToken>,
) -> Result<Vec<AssocRow>> {
    let storage = AssocStorage::new();
    let storage = run(config, columns, cancellation, storage)?;
    Ok(storage.into_rows())
}

fn run<S>(config: Config, columns: &[ColumnInput<'_>], cancellation: Option<CancellationToken>, storage: S) -> Result<S>
where
    S: storage::Storage<BitChain> + storage::Storage<FloatChain> + storage::Storage<FubitChain> + Send,
{
    let predicates = build_predicates(&config, columns)?;
    let crisp = columns.iter().all(|c| c.data.is_boolean());

    if crisp {
        let chains = bit_chains(columns);
        let root = BitChain::empty(config.nrow());
        return run_digger(config, predicates, chains, root, cancellation, storage);
    }

    let tnorm = config.t_norm();
    match config.fuzzy_encoding() {
        FuzzyEncoding::Float => {
            let chains = float_chains(columns, tnorm);
            let root = FloatChain::empty(config.nrow(), tnorm);
            run_digger(config, predicates, chains, root, cancellation, storage)
        }
        FuzzyEncoding::Fubit(block) => {
            let chains = fubit_chains(columns, tnorm, block);
            let root = FubitChain::empty(config.nrow(), tnorm, block);
            run_digger(config, predicates, chains, root, cancellation, storage)
        }
    }
}

fn run_digger<C, S>(
    config: Config,
    predicates: Vec<Predicate>,
    chains: Vec<C>,
    root: C,
    cancellation: Option<CancellationToken>,
    storage: S,
) -> Result<S>
where
    C: ChainOps + Clone + Send,
    S: storage::Storage<C> + Send,
{
    let initial = ChainCollection::build(chains);
    if config.threads() == 0 {
        let mut digger = Digger::new(config, predicates, initial, storage);
        if let Some(token) = cancellation {
            digger = digger.with_cancellation(token);
        }
        digger.run(root)
    } else {
        let mut digger = ThreadedDigger::new(config, predicates, initial, storage);
        if let Some(token) = cancellation {
            digger = digger.with_cancellation(token);
        }
        digger.run(root)
    }
}

fn build_predicates(config: &Config, columns: &[ColumnInput<'_>]) -> Result<Vec<Predicate>> {
    let mut predicates = Vec::with_capacity(columns.len());
    for column in columns {
        ensure!(
            column.data.len() == config.nrow(),
            error::ColumnLengthSnafu {
                name: column.name.clone(),
                got: column.data.len(),
                expected: config.nrow(),
            }
        );
        if let ColumnData::Fuzzy(values) = &column.data {
            for (row, &value) in values.iter().enumerate() {
                ensure!(
                    (0.0..=1.0).contains(&value),
                    error::MembershipOutOfRangeSnafu {
                        name: column.name.clone(),
                        value,
                        row,
                    }
                );
            }
        }
        if let Some(role) = PredicateType::from_flags(column.is_condition, column.is_focus) {
            predicates.push(Predicate::new(column.id, column.name.clone(), role, config.disjoint_group(column.id)));
        }
    }
    Ok(predicates)
}

fn bit_chains(columns: &[ColumnInput<'_>]) -> Vec<BitChain> {
    columns
        .iter()
        .filter_map(|column| {
            let role = PredicateType::from_flags(column.is_condition, column.is_focus)?;
            let bits = match &column.data {
                ColumnData::Boolean(bits) => *bits,
                ColumnData::Fuzzy(_) => unreachable!("caller only reaches bit_chains when every column is boolean"),
            };
            Some(BitChain::from_bits(column.id, role, bits))
        })
        .collect()
}

fn degrees(data: &ColumnData<'_>) -> Vec<f32> {
    match data {
        ColumnData::Boolean(bits) => bits.iter().map(|&b| if b { 1.0 } else { 0.0 }).collect(),
        ColumnData::Fuzzy(values) => values.to_vec(),
    }
}

fn float_chains(columns: &[ColumnInput<'_>], tnorm: TNorm) -> Vec<FloatChain> {
    columns
        .iter()
        .filter_map(|column| {
            let role = PredicateType::from_flags(column.is_condition, column.is_focus)?;
            Some(FloatChain::from_degrees(column.id, role, tnorm, &degrees(&column.data)))
        })
        .collect()
}

fn fubit_chains(columns: &[ColumnInput<'_>], tnorm: TNorm, block: FubitBlockSize) -> Vec<FubitChain> {
    columns
        .iter()
        .filter_map(|column| {
            let role = PredicateType::from_flags(column.is_condition, column.is_focus)?;
            Some(FubitChain::from_degrees(column.id, role, tnorm, block, &degrees(&column.data)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(id: usize, name: &str, is_condition: bool, is_focus: bool, bits: &[bool]) -> ColumnInput<'_> {
        ColumnInput {
            id,
            name: name.to_string(),
            is_condition,
            is_focus,
            data: ColumnData::Boolean(bits),
        }
    }

    /// Scenario A end to end through the public entry point: boolean-only
    /// input picks the bit codec automatically.
    #[test]
    fn mine_crisp_columns_emits_frequent_itemsets() {
        let p1 = [true, true, true, false, false];
        let p2 = [true, true, false, true, false];
        let p3 = [false, true, true, true, false];
        let p4 = [true, false, false, false, true];

        let columns = vec![
            column(1, "p1", true, false, &p1),
            column(2, "p2", true, false, &p2),
            column(3, "p3", true, false, &p3),
            column(4, "p4", true, false, &p4),
        ];

        let config = ConfigBuilder::new(5)
            .min_support(0.4)
            .max_support(1.0)
            .min_length(1)
            .max_length(Some(3))
            .arguments(vec![Argument::Condition])
            .build(4)
            .unwrap();

        let mut results = mine(config, &columns, None, |record: Record| Ok(record.condition.unwrap())).unwrap();
        results.sort();

        let expected: Vec<Vec<String>> = vec![
            vec!["p1".to_string()],
            vec!["p1".to_string(), "p2".to_string()],
            vec!["p1".to_string(), "p3".to_string()],
            vec!["p2".to_string()],
            vec!["p2".to_string(), "p3".to_string()],
            vec!["p3".to_string()],
            vec!["p4".to_string()],
        ];
        assert_eq!(results, expected);
    }

    #[test]
    fn mine_rejects_column_length_mismatch() {
        let short = [true, false];
        let columns = vec![column(1, "p1", true, false, &short)];
        let config = ConfigBuilder::new(5).build(1).unwrap();
        let err = mine(config, &columns, None, |record: Record| Ok(record)).unwrap_err();
        assert!(matches!(err, Error::ColumnLength { .. }));
    }

    #[test]
    fn mine_rejects_out_of_range_fuzzy_membership() {
        let values = [0.5f32, 1.5, 0.2];
        let columns = vec![ColumnInput {
            id: 1,
            name: "f".to_string(),
            is_condition: true,
            is_focus: false,
            data: ColumnData::Fuzzy(&values),
        }];
        let config = ConfigBuilder::new(3).build(1).unwrap();
        let err = mine(config, &columns, None, |record: Record| Ok(record)).unwrap_err();
        assert!(matches!(err, Error::MembershipOutOfRange { .. }));
    }

    #[test]
    fn mine_associations_builds_rule_table() {
        let p1 = [true, true, true, false, false];
        let f = [true, false, true, true, false];

        let columns = vec![column(1, "p1", true, false, &p1), column(2, "f", false, true, &f)];

        let config = ConfigBuilder::new(5)
            .min_length(1)
            .arguments(vec![Argument::Condition])
            .build(2)
            .unwrap();

        let rows = mine_associations(config, &columns, None).unwrap();
        let row = rows.iter().find(|r| r.antecedent == vec!["p1".to_string()]).unwrap();
        assert_eq!(row.consequent, "f");
        assert_eq!(row.pp, 2.0);
    }

    /// A fuzzy column alongside a boolean one forces the whole run onto the
    /// fuzzy codec, with the boolean column embedded as 0.0/1.0.
    #[test]
    fn mine_mixed_columns_use_fuzzy_codec() {
        let degrees = [0.9f32, 0.8, 0.1, 0.95];
        let crisp = [true, true, false, true];

        let columns = vec![
            ColumnInput {
                id: 1,
                name: "degree".to_string(),
                is_condition: true,
                is_focus: false,
                data: ColumnData::Fuzzy(&degrees),
            },
            column(2, "crisp", true, false, &crisp),
        ];

        let config = ConfigBuilder::new(4)
            .min_support(0.5)
            .min_length(1)
            .arguments(vec![Argument::Condition, Argument::Support])
            .build(2)
            .unwrap();

        let results = mine(config, &columns, None, |record: Record| Ok((record.condition.unwrap(), record.support.unwrap())))
            .unwrap();
        assert!(results.iter().any(|(c, _)| c == &vec!["degree".to_string()]));
    }

    #[test]
    fn mine_runs_multi_threaded_when_configured() {
        let p1 = [true, true, true, false];
        let p2 = [true, true, false, true];
        let p3 = [true, false, true, true];

        let columns = vec![
            column(1, "p1", true, false, &p1),
            column(2, "p2", true, false, &p2),
            column(3, "p3", true, false, &p3),
        ];

        let config = ConfigBuilder::new(4)
            .threads(3)
            .min_length(1)
            .arguments(vec![Argument::Condition])
            .build(3)
            .unwrap();

        let mut results = mine(config, &columns, None, |record: Record| Ok(record.condition.unwrap())).unwrap();
        results.sort();
        assert!(!results.is_empty());
    }

    #[test]
    fn mine_honors_an_externally_cancelled_token() {
        let p1 = [true, true, true, false];
        let columns = vec![column(1, "p1", true, false, &p1)];
        let config = ConfigBuilder::new(4).arguments(vec![Argument::Condition]).build(1).unwrap();

        let token = CancellationToken::new();
        token.cancel();
        let err = mine(config, &columns, Some(token), |record: Record| Ok(record.condition.unwrap())).unwrap_err();
        assert!(matches!(err, Error::Cancelled));
    }
}
