use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Cooperative cancellation flag shared between a run and its caller,
/// polled at progress ticks in place of the original's
/// `RcppThread::checkUserInterrupt` (there is no embedding interpreter to
/// ask here).
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Memoized `C(n, k)` table, built once per run and shared read-only
/// afterwards.
#[derive(Debug)]
pub struct BinomialCoefficients {
    n: usize,
    table: Vec<u64>,
}

impl BinomialCoefficients {
    pub fn new(n: usize) -> Self {
        let width = n + 1;
        let mut table = vec![0u64; width * width];
        for i in 0..width {
            table[i * width] = 1;
            for j in 1..=i {
                table[i * width + j] = if j == i {
                    1
                } else {
                    table[(i - 1) * width + (j - 1)] + table[(i - 1) * width + j]
                };
            }
        }
        Self { n, table }
    }

    pub fn get(&self, n: usize, k: usize) -> u64 {
        if k > n || n > self.n {
            return 0;
        }
        self.table[n * (self.n + 1) + k]
    }

    /// Size of the subtree rooted at a node that has chosen `k` of `n`
    /// remaining elements and may still choose up to `max_additional` more:
    /// `sum_{j=0..=max_additional} C(n - k, j)`.
    pub fn subtree_size(&self, remaining: usize, max_additional: usize) -> u64 {
        (0..=max_additional.min(remaining))
            .map(|j| self.get(remaining, j))
            .sum()
    }
}

/// Headless progress counter tracking how much of the combinatorial search
/// space has been visited. Exposed as a plain pollable value rather than
/// wired to any particular UI.
#[derive(Debug)]
pub struct CombinatorialProgress {
    coefficients: BinomialCoefficients,
    total: u64,
    done: AtomicU64,
}

impl CombinatorialProgress {
    pub fn new(element_count: usize, max_length: Option<usize>) -> Self {
        let coefficients = BinomialCoefficients::new(element_count);
        let max_k = max_length.unwrap_or(element_count).min(element_count);
        let total = (0..=max_k).map(|k| coefficients.get(element_count, k)).sum();
        Self {
            coefficients,
            total,
            done: AtomicU64::new(0),
        }
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn done(&self) -> u64 {
        self.done.load(Ordering::Relaxed)
    }

    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.done() as f64 / self.total as f64
        }
    }

    /// Opens a batch covering the subtree rooted at a node with `remaining`
    /// unconsidered elements and up to `max_additional` more choices
    /// available; on drop the counter snaps forward by the subtree's full
    /// size, so pruning a branch early still advances progress correctly.
    pub fn open_batch(&self, remaining: usize, max_additional: usize) -> Batch<'_> {
        let size = self.coefficients.subtree_size(remaining, max_additional);
        let on_start = self.done();
        Batch {
            progress: self,
            on_start,
            size,
        }
    }
}

/// RAII token: on drop, snaps [`CombinatorialProgress`] to `on_start + size`
/// — the counter value at the end of the subtree it was opened for —
/// regardless of whether that subtree was fully explored or pruned. Nested
/// batches (one per recursion depth) must not each add their own size on top
/// of what their descendants already accounted for, hence an absolute store
/// rather than a fetch-add.
pub struct Batch<'a> {
    progress: &'a CombinatorialProgress,
    on_start: u64,
    size: u64,
}

impl Drop for Batch<'_> {
    fn drop(&mut self) {
        self.progress.done.store(self.on_start + self.size, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binomial_table_matches_pascal_triangle() {
        let c = BinomialCoefficients::new(5);
        assert_eq!(c.get(5, 0), 1);
        assert_eq!(c.get(5, 1), 5);
        assert_eq!(c.get(5, 2), 10);
        assert_eq!(c.get(5, 5), 1);
        assert_eq!(c.get(5, 6), 0);
    }

    #[test]
    fn progress_total_matches_sum_of_subsets_up_to_max_length() {
        let p = CombinatorialProgress::new(4, Some(2));
        // C(4,0) + C(4,1) + C(4,2) = 1 + 4 + 6
        assert_eq!(p.total(), 11);
    }

    #[test]
    fn batch_advances_counter_on_drop_even_when_pruned_early() {
        let p = CombinatorialProgress::new(4, None);
        {
            let _batch = p.open_batch(4, 4);
        }
        assert_eq!(p.done(), p.total());
    }

    #[test]
    fn nested_batches_snap_instead_of_double_counting() {
        let p = CombinatorialProgress::new(4, None);
        {
            let outer = p.open_batch(4, 4);
            {
                let _inner = p.open_batch(3, 3);
            }
            drop(outer);
        }
        assert_eq!(p.done(), p.total());
    }
}
