//! Information Set Monte Carlo Tree Search (ISMCTS) for turn-based games
//! with hidden information.
//!
//! Classic MCTS searches concrete game states; that breaks down as soon as a
//! player cannot see the whole state. ISMCTS searches *information sets*
//! instead: every iteration samples a determinisation — a fully concrete
//! state consistent with what the searching player knows — and descends a
//! tree whose nodes aggregate statistics across all the determinisations
//! that reached them.
//!
//! Each iteration runs four phases against the sampled state:
//!
//! 1. **Selection**: descend while every legal move already has a child,
//!    letting the tree policy (UCB1 at sequential decision points, EXP3 at
//!    simultaneous ones) pick among the currently legal children
//! 2. **Expansion**: add one uniformly random untried move as a new child
//! 3. **Simulation**: play the state to its end with the simulation policy
//!    (uniformly random by default)
//! 4. **Backpropagation**: fold the terminal result into every node on the
//!    walked path
//!
//! # Solvers
//!
//! [`SoSolver`] is the single-observer variant: one tree from the searching
//! player's viewpoint. [`MoSolver`] is the multi-observer variant for games
//! with partially observable moves: one tree per player, walked in lockstep
//! so every tree sees the same move history through its own information
//! abstraction.
//!
//! # Execution
//!
//! [`Execution`] schedules the search over native threads: sequentially, as
//! several workers growing one shared tree, or as one independent tree per
//! worker whose root statistics are merged at the end. The budget is either
//! a total iteration count or a per-worker time limit.
//!
//! # Usage
//!
//! ```rust,ignore
//! use ismcts::{Execution, SoSolver};
//!
//! let mut solver = SoSolver::<MyGame>::new(Execution::tree_parallel());
//! solver.set_iteration_count(10_000);
//! let mv = solver.choose_move(&game)?;
//! game.do_move(mv);
//! ```
//!
//! Games plug in through the [`Game`] trait (and [`PomGame`] for the
//! multi-observer solver); the engine owns no game rules of its own.

pub mod execution;
pub mod game;
pub mod node;
pub mod policy;
pub mod rollout;
mod search;
pub mod solver;
pub mod util;

pub use execution::{Budget, Execution};
pub use game::{Game, Player, PomGame};
pub use node::{Node, Stats};
pub use policy::{DUcb, Exp3, SwUcb, TreePolicy, Ucb1};
pub use rollout::{SimulationPolicy, UniformRollout};
pub use search::TreeMap;
pub use solver::{MoSolver, SearchError, SoSolver};
