//! Solver facades binding an execution policy, a search variant and the
//! tree/simulation policies behind a single `choose_move` call.
//!
//! Each call runs an independent search: fresh trees are built, the budget
//! is drained, and the best root move is extracted. The finished trees stay
//! on the solver for inspection until the next call.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::debug;

use crate::execution::{self, Budget, Execution};
use crate::game::{Game, PomGame};
use crate::node::Node;
use crate::policy::{Exp3, TreePolicy, Ucb1};
use crate::rollout::{SimulationPolicy, UniformRollout};
use crate::search::{self, SearchPolicies, TreeMap};

/// Errors surfaced by `choose_move`.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SearchError {
    /// The root state has no valid moves; it is already finished and there
    /// is nothing to decide.
    #[error("no valid moves at the root state")]
    NoValidMoves,
}

macro_rules! budget_accessors {
    () => {
        /// Switch to a count budget: `count` iterations in total across all
        /// workers.
        pub fn set_iteration_count(&mut self, count: usize) {
            self.budget = Budget::Iterations(count);
        }

        /// Switch to a time budget: each worker searches for `limit`.
        pub fn set_iteration_time(&mut self, limit: Duration) {
            self.budget = Budget::Time(limit);
        }

        pub fn budget(&self) -> Budget {
            self.budget
        }

        pub fn execution(&self) -> Execution {
            self.execution
        }

        /// Replace the search budget, builder style.
        pub fn with_budget(mut self, budget: Budget) -> Self {
            self.budget = budget;
            self
        }
    };
}

/// Single-observer solver: searches one tree (per worker) built entirely
/// from the searching player's point of view.
///
/// Opponent moves appear in the same tree, so the algorithm implicitly
/// assumes opponents can observe everything the searcher can. For games
/// where moves themselves are hidden, use [`MoSolver`].
pub struct SoSolver<G, Seq = Ucb1, Sim = Exp3, Roll = UniformRollout>
where
    G: Game,
{
    execution: Execution,
    budget: Budget,
    sequential: Seq,
    simultaneous: Sim,
    rollout: Roll,
    trees: Vec<Arc<Node<G::Move>>>,
}

impl<G: Game> SoSolver<G> {
    /// A solver with the default policies (UCB1 with exploration 0.7 at
    /// sequential points, EXP3 at simultaneous points, uniform playouts) and
    /// the default budget of 1000 iterations.
    pub fn new(execution: Execution) -> Self {
        Self {
            execution,
            budget: Budget::default(),
            sequential: Ucb1::default(),
            simultaneous: Exp3::new(),
            rollout: UniformRollout::new(),
            trees: Vec::new(),
        }
    }
}

impl<G, Seq, Sim, Roll> SoSolver<G, Seq, Sim, Roll>
where
    G: Game,
{
    budget_accessors!();

    /// Replace the policy used at sequential decision points.
    pub fn with_sequential_policy<P>(self, policy: P) -> SoSolver<G, P, Sim, Roll> {
        SoSolver {
            execution: self.execution,
            budget: self.budget,
            sequential: policy,
            simultaneous: self.simultaneous,
            rollout: self.rollout,
            trees: Vec::new(),
        }
    }

    /// Replace the policy used at simultaneous decision points.
    pub fn with_simultaneous_policy<P>(self, policy: P) -> SoSolver<G, Seq, P, Roll> {
        SoSolver {
            execution: self.execution,
            budget: self.budget,
            sequential: self.sequential,
            simultaneous: policy,
            rollout: self.rollout,
            trees: Vec::new(),
        }
    }

    /// Replace the simulation policy.
    pub fn with_rollout_policy<P>(self, policy: P) -> SoSolver<G, Seq, Sim, P> {
        SoSolver {
            execution: self.execution,
            budget: self.budget,
            sequential: self.sequential,
            simultaneous: self.simultaneous,
            rollout: policy,
            trees: Vec::new(),
        }
    }

    /// The trees grown by the most recent `choose_move` call: one for
    /// sequential and tree-parallel execution, one per worker for
    /// root-parallel execution.
    pub fn current_trees(&self) -> &[Arc<Node<G::Move>>] {
        &self.trees
    }
}

impl<G, Seq, Sim, Roll> SoSolver<G, Seq, Sim, Roll>
where
    G: Game + Sync,
    Seq: TreePolicy<G::Move>,
    Sim: TreePolicy<G::Move>,
    Roll: SimulationPolicy<G::Move>,
{
    /// Search from `root_state` and return the move judged best.
    pub fn choose_move(&mut self, root_state: &G) -> Result<G::Move, SearchError> {
        let moves = root_state.valid_moves();
        if moves.is_empty() {
            return Err(SearchError::NoValidMoves);
        }

        let policies = SearchPolicies {
            sequential: &self.sequential,
            simultaneous: &self.simultaneous,
            rollout: &self.rollout,
        };
        self.trees = execution::execute(
            self.execution,
            self.budget,
            || policies.new_root(root_state),
            |root| search::so_iteration(root, root_state, &policies),
        );

        let best = match self.execution {
            Execution::RootParallel { .. } => execution::tallied_move(self.trees.iter()),
            _ => execution::most_visited_move(&self.trees[0]),
        };
        debug!(?best, "single-observer search finished");
        // A zero-iteration budget grows no children; any legal move does
        Ok(best.unwrap_or_else(|| moves[0].clone()))
    }
}

/// Multi-observer solver: one tree per player, each modelling the game as
/// that player observes it, all walked in lockstep during search.
pub struct MoSolver<G, Seq = Ucb1, Sim = Exp3, Roll = UniformRollout>
where
    G: Game,
{
    execution: Execution,
    budget: Budget,
    sequential: Seq,
    simultaneous: Sim,
    rollout: Roll,
    trees: Vec<TreeMap<G::Move>>,
}

impl<G: Game> MoSolver<G> {
    /// A solver with the default policies and budget; see [`SoSolver::new`].
    pub fn new(execution: Execution) -> Self {
        Self {
            execution,
            budget: Budget::default(),
            sequential: Ucb1::default(),
            simultaneous: Exp3::new(),
            rollout: UniformRollout::new(),
            trees: Vec::new(),
        }
    }
}

impl<G, Seq, Sim, Roll> MoSolver<G, Seq, Sim, Roll>
where
    G: Game,
{
    budget_accessors!();

    /// Replace the policy used at sequential decision points.
    pub fn with_sequential_policy<P>(self, policy: P) -> MoSolver<G, P, Sim, Roll> {
        MoSolver {
            execution: self.execution,
            budget: self.budget,
            sequential: policy,
            simultaneous: self.simultaneous,
            rollout: self.rollout,
            trees: Vec::new(),
        }
    }

    /// Replace the policy used at simultaneous decision points.
    pub fn with_simultaneous_policy<P>(self, policy: P) -> MoSolver<G, Seq, P, Roll> {
        MoSolver {
            execution: self.execution,
            budget: self.budget,
            sequential: self.sequential,
            simultaneous: policy,
            rollout: self.rollout,
            trees: Vec::new(),
        }
    }

    /// Replace the simulation policy.
    pub fn with_rollout_policy<P>(self, policy: P) -> MoSolver<G, Seq, Sim, P> {
        MoSolver {
            execution: self.execution,
            budget: self.budget,
            sequential: self.sequential,
            simultaneous: self.simultaneous,
            rollout: policy,
            trees: Vec::new(),
        }
    }

    /// The per-player tree maps grown by the most recent `choose_move`
    /// call, one map per worker tree.
    pub fn current_trees(&self) -> &[TreeMap<G::Move>] {
        &self.trees
    }
}

impl<G, Seq, Sim, Roll> MoSolver<G, Seq, Sim, Roll>
where
    G: PomGame + Sync,
    Seq: TreePolicy<G::Move>,
    Sim: TreePolicy<G::Move>,
    Roll: SimulationPolicy<G::Move>,
{
    /// Search from `root_state` and return the move judged best for the
    /// current player.
    pub fn choose_move(&mut self, root_state: &G) -> Result<G::Move, SearchError> {
        let moves = root_state.valid_moves();
        if moves.is_empty() {
            return Err(SearchError::NoValidMoves);
        }

        let policies = SearchPolicies {
            sequential: &self.sequential,
            simultaneous: &self.simultaneous,
            rollout: &self.rollout,
        };
        self.trees = execution::execute(
            self.execution,
            self.budget,
            || {
                root_state
                    .players()
                    .into_iter()
                    .map(|player| (player, policies.new_root(root_state)))
                    .collect::<TreeMap<G::Move>>()
            },
            |trees| search::mo_iteration(trees, root_state, &policies),
        );

        // Only the current player's trees answer the question asked
        let player = root_state.current_player();
        let player_roots: Vec<&Arc<Node<G::Move>>> = self
            .trees
            .iter()
            .filter_map(|map| map.get(&player))
            .collect();
        let best = match self.execution {
            Execution::RootParallel { .. } => execution::tallied_move(player_roots),
            _ => player_roots
                .first()
                .and_then(|root| execution::most_visited_move(root)),
        };
        debug!(?best, "multi-observer search finished");
        Ok(best.unwrap_or_else(|| moves[0].clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::Player;

    #[derive(Clone)]
    struct OneMoveGame;

    impl Game for OneMoveGame {
        type Move = u32;

        fn clone_randomised(&self, _observer: Player) -> Self {
            self.clone()
        }

        fn current_player(&self) -> Player {
            0
        }

        fn valid_moves(&self) -> Vec<u32> {
            vec![42]
        }

        fn do_move(&mut self, _mv: u32) {
            // The test solvers never get this far; one move never ends the
            // game here, so playouts would not terminate
            unreachable!("not exercised");
        }

        fn result(&self, _player: Player) -> f64 {
            0.5
        }
    }

    #[test]
    fn budget_setters_switch_modes() {
        let mut solver = SoSolver::<OneMoveGame>::new(Execution::Sequential);
        assert_eq!(solver.budget(), Budget::Iterations(1000));

        solver.set_iteration_count(16);
        assert_eq!(solver.budget(), Budget::Iterations(16));

        solver.set_iteration_time(Duration::from_millis(5));
        assert_eq!(solver.budget(), Budget::Time(Duration::from_millis(5)));

        let solver = solver.with_budget(Budget::Iterations(8));
        assert_eq!(solver.budget(), Budget::Iterations(8));
    }

    #[test]
    fn mo_budget_setters_switch_modes() {
        let mut solver = MoSolver::<OneMoveGame>::new(Execution::tree_parallel_with(2));
        assert_eq!(solver.budget(), Budget::Iterations(1000));
        assert_eq!(solver.execution().threads(), 2);

        solver.set_iteration_time(Duration::from_millis(5));
        assert_eq!(solver.budget(), Budget::Time(Duration::from_millis(5)));
    }

    #[test]
    fn policy_builders_preserve_settings() {
        let solver = SoSolver::<OneMoveGame>::new(Execution::Sequential)
            .with_budget(Budget::Iterations(7))
            .with_sequential_policy(crate::policy::DUcb::default())
            .with_simultaneous_policy(Exp3::new())
            .with_rollout_policy(UniformRollout::new());
        assert_eq!(solver.budget(), Budget::Iterations(7));
        assert_eq!(solver.execution(), Execution::Sequential);
    }
}
