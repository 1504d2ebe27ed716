//! Execution policies: scheduling iterations across worker threads and
//! extracting the final move from the finished tree(s).
//!
//! Workers are plain OS threads forked and joined inside one search call.
//! The only shared scheduling state is the iteration counter; trees are
//! shared (tree parallelism) or per-worker (root parallelism) and rely on
//! the node-level locks and atomics for safety.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::node::Node;

fn hardware_threads() -> usize {
    num_cpus::get().max(1)
}

/// How a search distributes its iterations over threads and trees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Execution {
    /// All iterations in the calling thread, one tree.
    Sequential,
    /// One shared tree, grown by `threads` workers concurrently.
    TreeParallel { threads: usize },
    /// One independent tree per worker; statistics are merged afterwards.
    RootParallel { threads: usize },
}

impl Execution {
    /// Tree parallelism over all hardware threads.
    pub fn tree_parallel() -> Self {
        Self::TreeParallel {
            threads: hardware_threads(),
        }
    }

    /// Tree parallelism over an explicit number of workers (at least 1).
    pub fn tree_parallel_with(threads: usize) -> Self {
        Self::TreeParallel {
            threads: threads.max(1),
        }
    }

    /// Root parallelism over all hardware threads.
    pub fn root_parallel() -> Self {
        Self::RootParallel {
            threads: hardware_threads(),
        }
    }

    /// Root parallelism over an explicit number of workers (at least 1).
    pub fn root_parallel_with(threads: usize) -> Self {
        Self::RootParallel {
            threads: threads.max(1),
        }
    }

    /// Number of worker threads this policy runs.
    pub fn threads(&self) -> usize {
        match *self {
            Self::Sequential => 1,
            Self::TreeParallel { threads } | Self::RootParallel { threads } => threads,
        }
    }

    /// Number of trees this policy grows.
    pub fn tree_count(&self) -> usize {
        match *self {
            Self::Sequential | Self::TreeParallel { .. } => 1,
            Self::RootParallel { threads } => threads,
        }
    }
}

/// The search budget, shared by all workers.
///
/// In time mode each worker runs until its own elapsed time reaches the
/// limit, so the total work across W workers is roughly W times the budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Budget {
    /// Total number of iterations across all workers.
    Iterations(usize),
    /// Wall-clock limit per worker.
    Time(Duration),
}

impl Default for Budget {
    fn default() -> Self {
        Self::Iterations(1000)
    }
}

/// Take up to `chunk` iterations off the shared counter, returning how many
/// were actually reserved (zero once the budget is drained).
fn reserve(counter: &AtomicUsize, chunk: usize) -> usize {
    let mut taken = 0;
    let _ = counter.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |remaining| {
        taken = remaining.min(chunk);
        if taken == 0 {
            None
        } else {
            Some(remaining - taken)
        }
    });
    taken
}

/// Larger chunks with more threads and iterations reduce contention on the
/// shared counter at the cost of coarser load balancing.
fn chunk_size(count: usize, threads: usize) -> usize {
    if threads == 1 {
        count.max(1)
    } else {
        (count * threads / 1000).max(1)
    }
}

fn run_counted(counter: &AtomicUsize, chunk: usize, mut iteration: impl FnMut()) {
    loop {
        let reserved = reserve(counter, chunk);
        if reserved == 0 {
            return;
        }
        for _ in 0..reserved {
            iteration();
        }
    }
}

fn run_timed(limit: Duration, mut iteration: impl FnMut()) {
    let mut remaining = limit;
    while !remaining.is_zero() {
        let start = Instant::now();
        iteration();
        remaining = remaining.saturating_sub(start.elapsed());
    }
}

/// Build the trees and drain the budget over them.
///
/// A worker panic (from the game implementation or a policy) joins the
/// remaining workers and then resurfaces from the scope, aborting the
/// search.
pub(crate) fn execute<T, FMake, FSearch>(
    execution: Execution,
    budget: Budget,
    mut make_tree: FMake,
    search: FSearch,
) -> Vec<T>
where
    T: Send + Sync,
    FMake: FnMut() -> T,
    FSearch: Fn(&T) + Send + Sync,
{
    let trees: Vec<T> = (0..execution.tree_count()).map(|_| make_tree()).collect();
    let threads = execution.threads();
    debug!(?execution, ?budget, "starting search");

    match budget {
        Budget::Iterations(count) => {
            let counter = AtomicUsize::new(count);
            let chunk = chunk_size(count, threads);
            if threads == 1 {
                run_counted(&counter, chunk, || search(&trees[0]));
            } else {
                thread::scope(|scope| {
                    for worker in 0..threads {
                        let tree = match execution {
                            Execution::RootParallel { .. } => &trees[worker],
                            _ => &trees[0],
                        };
                        let counter = &counter;
                        let search = &search;
                        scope.spawn(move || run_counted(counter, chunk, || search(tree)));
                    }
                });
            }
        }
        Budget::Time(limit) => {
            if threads == 1 {
                run_timed(limit, || search(&trees[0]));
            } else {
                thread::scope(|scope| {
                    for worker in 0..threads {
                        let tree = match execution {
                            Execution::RootParallel { .. } => &trees[worker],
                            _ => &trees[0],
                        };
                        let search = &search;
                        scope.spawn(move || run_timed(limit, || search(tree)));
                    }
                });
            }
        }
    }

    trees
}

/// The most-visited root child's move; first-encountered maximum on ties.
pub(crate) fn most_visited_move<M: Clone>(root: &Arc<Node<M>>) -> Option<M> {
    let mut best: Option<(M, u32)> = None;
    for child in root.children() {
        let visits = child.visits();
        let better = match &best {
            Some((_, top)) => visits > *top,
            None => true,
        };
        if better {
            if let Some(mv) = child.game_move() {
                best = Some((mv.clone(), visits));
            }
        }
    }
    best.map(|(mv, _)| mv)
}

/// Merge several trees grown for the same player: tally the visit counts of
/// root children per move and return the move with the highest total.
pub(crate) fn tallied_move<'a, M, I>(roots: I) -> Option<M>
where
    M: Clone + Eq + Hash + 'a,
    I: IntoIterator<Item = &'a Arc<Node<M>>>,
{
    // Insertion order is kept on the side so ties resolve towards the move
    // encountered first, independent of the hash map's iteration order
    let mut order: Vec<M> = Vec::new();
    let mut tally: HashMap<M, u64> = HashMap::new();
    for root in roots {
        for child in root.children() {
            if let Some(mv) = child.game_move() {
                if !tally.contains_key(mv) {
                    order.push(mv.clone());
                }
                *tally.entry(mv.clone()).or_insert(0) += u64::from(child.visits());
            }
        }
    }

    let mut best: Option<(&M, u64)> = None;
    for mv in &order {
        let total = tally[mv];
        let better = match best {
            Some((_, top)) => total > top,
            None => true,
        };
        if better {
            best = Some((mv, total));
        }
    }
    best.map(|(mv, _)| mv.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{Game, Player};
    use crate::node::Stats;

    struct Finished {
        result: f64,
    }

    impl Game for Finished {
        type Move = &'static str;

        fn clone_randomised(&self, _observer: Player) -> Self {
            Self { result: self.result }
        }

        fn current_player(&self) -> Player {
            0
        }

        fn valid_moves(&self) -> Vec<&'static str> {
            Vec::new()
        }

        fn do_move(&mut self, _mv: &'static str) {}

        fn result(&self, _player: Player) -> f64 {
            self.result
        }
    }

    fn root_with_visits(children: &[(&'static str, u32)]) -> Arc<Node<&'static str>> {
        let root = Node::new_root(Stats::ucb());
        let win = Finished { result: 1.0 };
        for &(mv, visits) in children {
            let child = Node::add_child(&root, mv, 0, Stats::ucb());
            for _ in 0..visits {
                child.update(&win);
            }
        }
        root
    }

    #[test]
    fn threads_default_to_hardware_concurrency() {
        assert!(Execution::tree_parallel().threads() >= 1);
        assert!(Execution::root_parallel().threads() >= 1);
        assert_eq!(Execution::Sequential.threads(), 1);
        assert_eq!(Execution::tree_parallel_with(0).threads(), 1);
        assert_eq!(Execution::root_parallel_with(3).tree_count(), 3);
        assert_eq!(Execution::tree_parallel_with(3).tree_count(), 1);
    }

    #[test]
    fn default_budget_is_a_thousand_iterations() {
        assert_eq!(Budget::default(), Budget::Iterations(1000));
    }

    #[test]
    fn chunk_sizes() {
        // A single worker takes the whole budget in one reservation
        assert_eq!(chunk_size(1000, 1), 1000);
        // Multiple workers split it into contention-reducing chunks
        assert_eq!(chunk_size(1000, 4), 4);
        assert_eq!(chunk_size(10, 4), 1);
        assert_eq!(chunk_size(0, 1), 1);
    }

    #[test]
    fn reserve_drains_the_counter_exactly() {
        let counter = AtomicUsize::new(10);
        assert_eq!(reserve(&counter, 4), 4);
        assert_eq!(reserve(&counter, 4), 4);
        assert_eq!(reserve(&counter, 4), 2);
        assert_eq!(reserve(&counter, 4), 0);
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn counted_execution_runs_the_budget_exactly() {
        for execution in [
            Execution::Sequential,
            Execution::tree_parallel_with(4),
            Execution::root_parallel_with(4),
        ] {
            let performed = AtomicUsize::new(0);
            let trees = execute(
                execution,
                Budget::Iterations(100),
                || (),
                |_| {
                    performed.fetch_add(1, Ordering::SeqCst);
                },
            );
            assert_eq!(performed.load(Ordering::SeqCst), 100);
            assert_eq!(trees.len(), execution.tree_count());
        }
    }

    #[test]
    fn timed_execution_runs_at_least_the_budget() {
        let limit = Duration::from_millis(20);
        let start = Instant::now();
        execute(Execution::Sequential, Budget::Time(limit), || (), |_| {
            thread::sleep(Duration::from_millis(1));
        });
        assert!(start.elapsed() >= limit);
    }

    #[test]
    fn root_parallel_workers_get_distinct_trees() {
        let touched: Vec<AtomicUsize> = (0..3).map(|_| AtomicUsize::new(0)).collect();
        let next = AtomicUsize::new(0);
        execute(
            Execution::root_parallel_with(3),
            Budget::Iterations(300),
            || next.fetch_add(1, Ordering::SeqCst),
            |tree| {
                touched[*tree].fetch_add(1, Ordering::SeqCst);
            },
        );
        let total: usize = touched.iter().map(|t| t.load(Ordering::SeqCst)).sum();
        assert_eq!(total, 300);
    }

    #[test]
    fn most_visited_move_prefers_the_first_maximum() {
        let root = root_with_visits(&[("a", 5), ("b", 9), ("c", 9)]);
        assert_eq!(most_visited_move(&root), Some("b"));
    }

    #[test]
    fn most_visited_move_of_a_leaf_is_none() {
        let root = Node::<&'static str>::new_root(Stats::ucb());
        assert_eq!(most_visited_move(&root), None);
    }

    #[test]
    fn tallies_merge_across_trees() {
        let trees = vec![
            root_with_visits(&[("a", 10), ("b", 4)]),
            root_with_visits(&[("a", 2), ("b", 9)]),
            root_with_visits(&[("a", 1), ("b", 7)]),
        ];
        // a: 13, b: 20
        assert_eq!(tallied_move(trees.iter()), Some("b"));
    }

    #[test]
    fn tallies_count_moves_missing_from_some_trees() {
        let trees = vec![
            root_with_visits(&[("a", 3)]),
            root_with_visits(&[("b", 2)]),
            root_with_visits(&[("b", 2)]),
        ];
        assert_eq!(tallied_move(trees.iter()), Some("b"));
    }
}
