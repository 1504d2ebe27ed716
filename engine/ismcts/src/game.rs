//! The game interface consumed by the search engine.
//!
//! The engine never inspects game state directly; it drives the game as a
//! finite state machine through this trait. After each `do_move` the state
//! must be ready to report the next player and the next set of valid moves.

use std::fmt;
use std::hash::Hash;

/// Player identifier. Games number their players with small unsigned
/// integers; the multi-observer solver builds one tree per identifier.
pub type Player = u32;

/// Contract a game must fulfil to be searched.
///
/// Determinisation is the game's responsibility: `clone_randomised` produces
/// a fully concrete state sampled uniformly from the states consistent with
/// the observer's knowledge. A perfect-information game can simply clone
/// itself.
pub trait Game {
    /// Moves key the aggregation maps used to merge parallel trees and cross
    /// thread boundaries inside a shared tree, hence the bounds.
    type Move: Clone + Eq + Hash + fmt::Debug + Send + Sync;

    /// Clone this state, randomising everything `observer` cannot see.
    /// The original state must not change.
    fn clone_randomised(&self, observer: Player) -> Self;

    /// The player making a move from this state.
    fn current_player(&self) -> Player;

    /// Valid moves for the current state; empty if and only if the game is
    /// finished.
    fn valid_moves(&self) -> Vec<Self::Move>;

    /// Apply the given move and update the current player. The caller
    /// guarantees the move came from `valid_moves`.
    fn do_move(&mut self, mv: Self::Move);

    /// Result for the given player, in [0, 1]: 0 for a loss, 0.5 for a draw,
    /// 1 for a win. Only called on finished states.
    fn result(&self, player: Player) -> f64;

    /// Whether the current decision point is a simultaneous move, where
    /// multiple players commit to a move without seeing each other's choice.
    /// Games with such moves override this; the default is turn-based play.
    fn current_move_simultaneous(&self) -> bool {
        false
    }
}

/// Extension for games with partially observable moves.
///
/// The multi-observer solver maintains a separate tree per player and needs
/// to enumerate them up front.
pub trait PomGame: Game {
    /// All player identifiers participating in the game.
    fn players(&self) -> Vec<Player>;
}
