//! Shared-deque multi-threaded variant of [`crate::digger::Digger`].
//!
//! The single-threaded digger recurses directly: `process_chains` calls
//! `process_children_chains` for each surviving child, which may call back
//! into `process_chains`. Here that one recursive edge is cut and replaced
//! with a [`Task`] pushed onto a shared LIFO deque; a fixed pool of worker
//! threads drain it until the deque is empty and every worker is idle, the
//! same termination condition the original engine's worker pool used.
//!
//! All of the actual search logic -- redundancy, candidacy, extendability,
//! combination -- is the same [`crate::digger::rules`] the single-threaded
//! digger uses; this module only owns the scheduling.

use std::thread;

use parking_lot::{Condvar, Mutex};
use tracing::debug;

use crate::chain::ChainOps;
use crate::collection::ChainCollection;
use crate::config::Config;
use crate::digger::{init, rules};
use crate::error::{self, Error, Result};
use crate::predicate::Predicate;
use crate::progress::{CancellationToken, CombinatorialProgress};
use crate::storage::Storage;
use crate::tautology::TautologyTree;

/// A parent chain together with the (already combined) collection of its
/// candidate children, ready for [`process_children_chains`].
struct Task<C> {
    parent: C,
    children: ChainCollection<C>,
}

struct Queue<C> {
    tasks: Vec<Task<C>>,
    working: usize,
}

struct Shared<C: ChainOps, S: Storage<C>> {
    config: Config,
    predicates: Vec<Predicate>,
    predicate_sums: Vec<f32>,
    tree: TautologyTree,
    progress: CombinatorialProgress,
    cancellation: CancellationToken,
    storage: Mutex<S>,
    queue: Mutex<Queue<C>>,
    condvar: Condvar,
    error: Mutex<Option<Error>>,
}

/// Multi-threaded depth-first enumerator. Same contract as [`crate::digger::Digger`]
/// -- build with [`ThreadedDigger::new`], consume with [`ThreadedDigger::run`]
/// -- but walks the search tree with `config.threads()` workers instead of
/// one call stack. Chains must be `Clone` (all three codecs are) since a
/// queued task owns its parent chain outright rather than borrowing it from
/// a caller's stack frame.
pub struct ThreadedDigger<C: ChainOps, S: Storage<C>> {
    config: Config,
    predicates: Vec<Predicate>,
    predicate_sums: Vec<f32>,
    tree: TautologyTree,
    progress: CombinatorialProgress,
    cancellation: CancellationToken,
    storage: S,
    initial: ChainCollection<C>,
}

impl<C, S> ThreadedDigger<C, S>
where
    C: ChainOps + Clone + Send,
    S: Storage<C> + Send,
{
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

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    /// Installs a token the caller already holds in place of the one
    /// created by [`ThreadedDigger::new`].
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn progress(&self) -> &CombinatorialProgress {
        &self.progress
    }

    pub fn add_tautology(&mut self, antecedent: &[usize], consequent: usize) {
        self.tree.add_tautology(antecedent, consequent);
    }

    /// Runs the search to completion across `config.threads().max(1)`
    /// worker threads and hands back the accumulated storage.
    pub fn run(mut self, mut root: C) -> Result<S> {
        let thread_count = self.config.threads().max(1);
        debug!(
            conditions = self.initial.condition_count(),
            foci = self.initial.focus_count(),
            threads = thread_count,
            "starting multi-threaded digger run"
        );
        self.tree.update_deduction(&mut root);

        let initial = std::mem::replace(&mut self.initial, ChainCollection::new());
        let mut filtered = ChainCollection::with_capacity(initial.size());
        for chain in initial.into_chains() {
            if rules::is_non_redundant(&self.config, &root, &chain) && rules::is_candidate(&self.config, &chain) {
                filtered.append(chain);
            }
        }

        let shared = Shared {
            config: self.config,
            predicates: self.predicates,
            predicate_sums: self.predicate_sums,
            tree: self.tree,
            progress: self.progress,
            cancellation: self.cancellation,
            storage: Mutex::new(self.storage),
            queue: Mutex::new(Queue {
                tasks: vec![Task {
                    parent: root,
                    children: filtered,
                }],
                working: 0,
            }),
            condvar: Condvar::new(),
            error: Mutex::new(None),
        };

        thread::scope(|scope| {
            for _ in 0..thread_count {
                scope.spawn(|| worker_loop(&shared, thread_count));
            }
        });

        if let Some(err) = shared.error.into_inner() {
            return Err(err);
        }

        let storage = shared.storage.into_inner();
        debug!(results = storage.size(), "digger run finished");
        Ok(storage)
    }
}

fn worker_loop<C, S>(shared: &Shared<C, S>, thread_count: usize)
where
    C: ChainOps + Clone + Send,
    S: Storage<C> + Send,
{
    loop {
        let batch = match receive_tasks(shared, thread_count) {
            Some(batch) => batch,
            None => break,
        };

        for task in batch {
            if let Err(err) = process_children_chains(shared, &task.parent, task.children) {
                set_error(shared, err);
                break;
            }
        }

        tasks_finished(shared);
    }
}

/// Blocks until there is work to take or the run is over. Returns `None`
/// once the deque is empty and no other worker is still producing more
/// (or the run has failed / been cancelled), which is this pool's signal
/// to exit. Otherwise takes roughly `1/thread_count` of the deque so no
/// single worker starves the rest, mirroring the original pool's
/// `ceil(size / threads)` receive size.
fn receive_tasks<C, S>(shared: &Shared<C, S>, thread_count: usize) -> Option<Vec<Task<C>>>
where
    C: ChainOps,
    S: Storage<C>,
{
    let mut queue = shared.queue.lock();
    while queue.tasks.is_empty() && queue.working > 0 && !has_error(shared) && !shared.cancellation.is_cancelled() {
        shared.condvar.wait(&mut queue);
    }

    if has_error(shared) || shared.cancellation.is_cancelled() || queue.tasks.is_empty() {
        return None;
    }

    let take = (queue.tasks.len() + thread_count - 1) / thread_count;
    let take = take.max(1).min(queue.tasks.len());
    let batch = queue.tasks.split_off(queue.tasks.len() - take);
    queue.working += 1;
    Some(batch)
}

fn tasks_finished<C, S>(shared: &Shared<C, S>)
where
    C: ChainOps,
    S: Storage<C>,
{
    let mut queue = shared.queue.lock();
    queue.working -= 1;
    drop(queue);
    shared.condvar.notify_all();
}

fn send_task<C, S>(shared: &Shared<C, S>, task: Task<C>)
where
    C: ChainOps,
    S: Storage<C>,
{
    let mut queue = shared.queue.lock();
    queue.tasks.push(task);
    drop(queue);
    shared.condvar.notify_one();
}

fn has_error<C, S>(shared: &Shared<C, S>) -> bool
where
    C: ChainOps,
    S: Storage<C>,
{
    shared.error.lock().is_some()
}

fn set_error<C, S>(shared: &Shared<C, S>, err: Error)
where
    C: ChainOps,
    S: Storage<C>,
{
    let mut guard = shared.error.lock();
    if guard.is_none() {
        *guard = Some(err);
    }
    drop(guard);
    shared.condvar.notify_all();
}

fn process_children_chains<C, S>(shared: &Shared<C, S>, parent: &C, child: ChainCollection<C>) -> Result<()>
where
    C: ChainOps + Clone,
    S: Storage<C>,
{
    if !shared.config.filter_empty_foci() || child.has_foci() {
        let storage_full = shared.storage.lock().at_capacity(&shared.config);
        if rules::is_storable(&shared.config, parent, storage_full) {
            let selector = rules::build_selector(&shared.config, parent, &child);
            if !shared.config.filter_empty_foci() || selector.selected_count() > 0 {
                shared.storage.lock().store(
                    &shared.config,
                    &shared.predicates,
                    parent,
                    &child,
                    &selector,
                    &shared.predicate_sums,
                )?;
            }
        }
        let storage_full = shared.storage.lock().at_capacity(&shared.config);
        if rules::is_extendable(&shared.config, parent, storage_full) {
            process_chains(shared, child)?;
        }
    }
    Ok(())
}

/// Walks one sibling level of the search and, instead of recursing into
/// each child's subtree directly, hands it off to the shared deque as a new
/// [`Task`] for whichever worker picks it up next.
fn process_chains<C, S>(shared: &Shared<C, S>, mut collection: ChainCollection<C>) -> Result<()>
where
    C: ChainOps + Clone,
    S: Storage<C>,
{
    for i in 0..collection.condition_count() {
        if shared.cancellation.is_cancelled() {
            return error::CancelledSnafu.fail();
        }

        shared.tree.update_deduction(&mut collection[i]);
        if collection[i].deduces_itself() {
            continue;
        }

        let clause_len = collection[i].clause().len();
        let remaining = collection.condition_count() - i - 1;
        let max_additional = rules::remaining_levels(&shared.config, clause_len);
        let _batch = shared.progress.open_batch(remaining, max_additional);

        let storage_full = shared.storage.lock().at_capacity(&shared.config);
        let child = if rules::is_extendable(&shared.config, &collection[i], storage_full) {
            rules::combine(&shared.config, &collection, i, false)?
        } else if collection.has_foci() {
            rules::combine(&shared.config, &collection, i, true)?
        } else {
            ChainCollection::new()
        };

        send_task(
            shared,
            Task {
                parent: collection[i].clone(),
                children: child,
            },
        );
    }
    Ok(())
}
