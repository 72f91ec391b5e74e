use hashbrown::HashSet;
use snafu::ensure;

use crate::chain::{FuzzyEncoding, TNorm};
use crate::error::{self, Result};

/// Which record fields a caller's callback wants populated (see
/// [`crate::storage::callback`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Argument {
    Condition,
    Sum,
    Support,
    Indices,
    Weights,
    FociSupports,
    Pp,
    Np,
    Pn,
    Nn,
}

/// Read-only, validated run configuration, built through [`ConfigBuilder`].
#[derive(Debug, Clone)]
pub struct Config {
    nrow: usize,
    threads: usize,
    min_length: usize,
    max_length: Option<usize>,
    max_results: Option<usize>,
    min_support: f32,
    max_support: f32,
    min_focus_support: f32,
    min_conditional_focus_support: f32,
    t_norm: TNorm,
    fuzzy_encoding: FuzzyEncoding,
    disjoint: Vec<usize>,
    excluded: Vec<HashSet<usize>>,
    filter_empty_foci: bool,
    verbose: bool,
    arguments: Vec<Argument>,
}

impl Config {
    pub fn nrow(&self) -> usize {
        self.nrow
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    pub fn min_length(&self) -> usize {
        self.min_length
    }

    pub fn max_length(&self) -> Option<usize> {
        self.max_length
    }

    pub fn max_results(&self) -> Option<usize> {
        self.max_results
    }

    pub fn min_sum(&self) -> f32 {
        self.min_support * self.nrow as f32
    }

    pub fn max_sum(&self) -> f32 {
        self.max_support * self.nrow as f32
    }

    pub fn min_focus_sum(&self) -> f32 {
        self.min_focus_support * self.nrow as f32
    }

    pub fn min_conditional_focus_support(&self) -> f32 {
        self.min_conditional_focus_support
    }

    pub fn t_norm(&self) -> TNorm {
        self.t_norm
    }

    pub fn fuzzy_encoding(&self) -> FuzzyEncoding {
        self.fuzzy_encoding
    }

    pub fn disjoint_group(&self, predicate_id: usize) -> usize {
        self.disjoint.get(predicate_id).copied().unwrap_or(0)
    }

    pub fn excluded(&self) -> &[HashSet<usize>] {
        &self.excluded
    }

    pub fn filter_empty_foci(&self) -> bool {
        self.filter_empty_foci
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }

    pub fn arguments(&self) -> &[Argument] {
        &self.arguments
    }

    pub fn wants(&self, arg: Argument) -> bool {
        self.arguments.contains(&arg)
    }
}

/// Builder for [`Config`]; defaults mirror the original engine's: no length
/// bound, no result cap, zero support thresholds, Gödel t-norm, float fuzzy
/// encoding, single-threaded, every argument enabled.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    nrow: usize,
    threads: usize,
    min_length: usize,
    max_length: Option<usize>,
    max_results: Option<usize>,
    min_support: f32,
    max_support: f32,
    min_focus_support: f32,
    min_conditional_focus_support: f32,
    t_norm: TNorm,
    fuzzy_encoding: FuzzyEncoding,
    disjoint: Vec<usize>,
    excluded: Vec<Vec<usize>>,
    filter_empty_foci: bool,
    verbose: bool,
    arguments: Vec<Argument>,
}

impl ConfigBuilder {
    pub fn new(nrow: usize) -> Self {
        Self {
            nrow,
            threads: 0,
            min_length: 0,
            max_length: None,
            max_results: None,
            min_support: 0.0,
            max_support: 1.0,
            min_focus_support: 0.0,
            min_conditional_focus_support: 0.0,
            t_norm: TNorm::Goedel,
            fuzzy_encoding: FuzzyEncoding::default(),
            disjoint: Vec::new(),
            excluded: Vec::new(),
            filter_empty_foci: false,
            verbose: false,
            arguments: vec![
                Argument::Condition,
                Argument::Sum,
                Argument::Support,
                Argument::Indices,
                Argument::Weights,
                Argument::FociSupports,
                Argument::Pp,
                Argument::Np,
                Argument::Pn,
                Argument::Nn,
            ],
        }
    }

    pub fn threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn min_length(mut self, min_length: usize) -> Self {
        self.min_length = min_length;
        self
    }

    pub fn max_length(mut self, max_length: Option<usize>) -> Self {
        self.max_length = max_length;
        self
    }

    pub fn max_results(mut self, max_results: Option<usize>) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn min_support(mut self, min_support: f32) -> Self {
        self.min_support = min_support;
        self
    }

    pub fn max_support(mut self, max_support: f32) -> Self {
        self.max_support = max_support;
        self
    }

    pub fn min_focus_support(mut self, min_focus_support: f32) -> Self {
        self.min_focus_support = min_focus_support;
        self
    }

    pub fn min_conditional_focus_support(mut self, value: f32) -> Self {
        self.min_conditional_focus_support = value;
        self
    }

    pub fn t_norm(mut self, t_norm: TNorm) -> Self {
        self.t_norm = t_norm;
        self
    }

    pub fn fuzzy_encoding(mut self, fuzzy_encoding: FuzzyEncoding) -> Self {
        self.fuzzy_encoding = fuzzy_encoding;
        self
    }

    pub fn disjoint(mut self, disjoint: Vec<usize>) -> Self {
        self.disjoint = disjoint;
        self
    }

    /// Registers a forbidden combination of predicate ids: no emitted clause
    /// may contain all of `subset`, in any order or interspersion.
    pub fn exclude_subset(mut self, subset: Vec<usize>) -> Self {
        self.excluded.push(subset);
        self
    }

    pub fn filter_empty_foci(mut self, filter_empty_foci: bool) -> Self {
        self.filter_empty_foci = filter_empty_foci;
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn arguments(mut self, arguments: Vec<Argument>) -> Self {
        self.arguments = arguments;
        self
    }

    pub fn build(self, predicate_count: usize) -> Result<Config> {
        ensure!(
            (0.0..=1.0).contains(&self.min_support),
            error::SupportRangeSnafu { value: self.min_support }
        );
        ensure!(
            (0.0..=1.0).contains(&self.max_support),
            error::MaxSupportRangeSnafu { value: self.max_support }
        );
        ensure!(
            (0.0..=1.0).contains(&self.min_focus_support),
            error::FocusSupportRangeSnafu {
                value: self.min_focus_support,
            }
        );
        ensure!(
            (0.0..=1.0).contains(&self.min_conditional_focus_support),
            error::ConditionalFocusSupportRangeSnafu {
                value: self.min_conditional_focus_support,
            }
        );
        if let Some(max_length) = self.max_length {
            ensure!(
                self.min_length <= max_length,
                error::LengthRangeSnafu {
                    min: self.min_length,
                    max: max_length,
                }
            );
        }
        ensure!(
            self.disjoint.is_empty() || self.disjoint.len() == predicate_count + 1,
            error::DisjointLengthSnafu {
                got: self.disjoint.len(),
                expected: predicate_count + 1,
            }
        );
        for subset in &self.excluded {
            for &id in subset {
                ensure!(
                    id >= 1 && id <= predicate_count,
                    error::UnknownPredicateIdSnafu { id }
                );
            }
        }

        let excluded = self
            .excluded
            .into_iter()
            .map(|subset| subset.into_iter().collect::<HashSet<usize>>())
            .collect();

        Ok(Config {
            nrow: self.nrow,
            threads: self.threads,
            min_length: self.min_length,
            max_length: self.max_length,
            max_results: self.max_results,
            min_support: self.min_support,
            max_support: self.max_support,
            min_focus_support: self.min_focus_support,
            min_conditional_focus_support: self.min_conditional_focus_support,
            t_norm: self.t_norm,
            fuzzy_encoding: self.fuzzy_encoding,
            disjoint: self.disjoint,
            excluded,
            filter_empty_foci: self.filter_empty_foci,
            verbose: self.verbose,
            arguments: self.arguments,
        })
    }
}
