//! One search iteration: determinise, select, expand, simulate,
//! backpropagate.
//!
//! The single-observer variant grows one tree from the searching player's
//! viewpoint. The multi-observer variant grows one tree per player and walks
//! all of them in lockstep: each player's tree is a different abstraction of
//! the same played move sequence, so every tree takes the same path while
//! only the current player's tree drives the choice.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::trace;

use crate::game::{Game, Player, PomGame};
use crate::node::{Node, Stats};
use crate::policy::TreePolicy;
use crate::rollout::SimulationPolicy;
use crate::util;

/// The per-player root set grown by the multi-observer search. Ordered by
/// player id so iteration over the cursors is deterministic.
pub type TreeMap<M> = BTreeMap<Player, Arc<Node<M>>>;

/// Policies shared by every iteration of one search.
pub(crate) struct SearchPolicies<'a, Seq, Sim, Roll> {
    pub sequential: &'a Seq,
    pub simultaneous: &'a Sim,
    pub rollout: &'a Roll,
}

impl<Seq, Sim, Roll> SearchPolicies<'_, Seq, Sim, Roll> {
    /// Build a root node matching the statistics variant the root decision
    /// point will be ranked with.
    pub fn new_root<G, M>(&self, state: &G) -> Arc<Node<M>>
    where
        G: Game<Move = M>,
        Seq: TreePolicy<M>,
        Sim: TreePolicy<M>,
    {
        if state.current_move_simultaneous() {
            Node::new_root(self.simultaneous.new_stats())
        } else {
            Node::new_root(self.sequential.new_stats())
        }
    }

    fn select_child<G, M>(
        &self,
        node: &Node<M>,
        state: &G,
        legal_moves: &[M],
    ) -> Option<Arc<Node<M>>>
    where
        G: Game<Move = M>,
        M: Clone + Eq,
        Seq: TreePolicy<M>,
        Sim: TreePolicy<M>,
    {
        if state.current_move_simultaneous() {
            node.select_child(legal_moves, self.simultaneous)
        } else {
            node.select_child(legal_moves, self.sequential)
        }
    }

    fn new_child_stats<G, M>(&self, state: &G) -> Stats
    where
        G: Game<Move = M>,
        Seq: TreePolicy<M>,
        Sim: TreePolicy<M>,
    {
        if state.current_move_simultaneous() {
            self.simultaneous.new_stats()
        } else {
            self.sequential.new_stats()
        }
    }
}

/// A node stops the descent when the game is over or it still has an
/// unexpanded legal move.
fn descend_past<M: Clone + Eq>(node: &Node<M>, legal_moves: &[M]) -> bool {
    !legal_moves.is_empty() && node.untried_moves(legal_moves).is_empty()
}

/// Play the determinised state to its end with the simulation policy.
fn simulate<G, Roll>(state: &mut G, rollout: &Roll)
where
    G: Game,
    Roll: SimulationPolicy<G::Move>,
{
    loop {
        let moves = state.valid_moves();
        match rollout.choose(&moves) {
            Some(mv) => state.do_move(mv.clone()),
            None => break,
        }
    }
}

/// One single-observer iteration against `root`.
pub(crate) fn so_iteration<G, Seq, Sim, Roll>(
    root: &Arc<Node<G::Move>>,
    root_state: &G,
    policies: &SearchPolicies<'_, Seq, Sim, Roll>,
) where
    G: Game,
    Seq: TreePolicy<G::Move>,
    Sim: TreePolicy<G::Move>,
    Roll: SimulationPolicy<G::Move>,
{
    let mut state = root_state.clone_randomised(root_state.current_player());
    let mut node = Arc::clone(root);

    // Selection
    loop {
        let moves = state.valid_moves();
        if !descend_past(&node, &moves) {
            break;
        }
        let Some(child) = policies.select_child(&node, &state, &moves) else {
            break;
        };
        let Some(mv) = child.game_move().cloned() else {
            break;
        };
        state.do_move(mv);
        node = child;
    }

    // Expansion: one uniformly random untried move. Going through
    // find_or_add_child lets concurrent iterations converge on one child
    let untried = node.untried_moves(&state.valid_moves());
    if let Some(mv) = util::random_element(&untried) {
        let player = state.current_player();
        node = Node::find_or_add_child(&node, mv, player, || policies.new_child_stats(&state));
        state.do_move(mv.clone());
    }

    // Simulation
    simulate(&mut state, policies.rollout);

    // Backpropagation
    let mut current = Some(node);
    while let Some(n) = current {
        n.update(&state);
        current = n.parent();
    }
    trace!("single-observer iteration complete");
}

/// Advance every player's cursor along `mv`, creating the matching child
/// where a tree has not seen the move yet.
fn advance_cursors<G, Seq, Sim, Roll>(
    cursors: &mut TreeMap<G::Move>,
    mv: &G::Move,
    state: &G,
    policies: &SearchPolicies<'_, Seq, Sim, Roll>,
) where
    G: Game,
    Seq: TreePolicy<G::Move>,
    Sim: TreePolicy<G::Move>,
{
    let player = state.current_player();
    for node in cursors.values_mut() {
        *node = Node::find_or_add_child(node, mv, player, || policies.new_child_stats(state));
    }
}

/// One multi-observer iteration against the per-player root set `trees`.
pub(crate) fn mo_iteration<G, Seq, Sim, Roll>(
    trees: &TreeMap<G::Move>,
    root_state: &G,
    policies: &SearchPolicies<'_, Seq, Sim, Roll>,
) where
    G: PomGame,
    Seq: TreePolicy<G::Move>,
    Sim: TreePolicy<G::Move>,
    Roll: SimulationPolicy<G::Move>,
{
    let mut state = root_state.clone_randomised(root_state.current_player());
    let mut cursors: TreeMap<G::Move> = trees
        .iter()
        .map(|(&player, root)| (player, Arc::clone(root)))
        .collect();

    // Selection: the current player's cursor is the target; every cursor
    // follows the move it picks
    loop {
        let moves = state.valid_moves();
        let Some(target) = cursors.get(&state.current_player()) else {
            break;
        };
        if !descend_past(target, &moves) {
            break;
        }
        let Some(chosen) = policies.select_child(target, &state, &moves) else {
            break;
        };
        let Some(mv) = chosen.game_move().cloned() else {
            break;
        };
        advance_cursors(&mut cursors, &mv, &state, policies);
        state.do_move(mv);
    }

    // Expansion
    let untried = match cursors.get(&state.current_player()) {
        Some(target) => target.untried_moves(&state.valid_moves()),
        None => Vec::new(),
    };
    if let Some(mv) = util::random_element(&untried).cloned() {
        advance_cursors(&mut cursors, &mv, &state, policies);
        state.do_move(mv);
    }

    // Simulation
    simulate(&mut state, policies.rollout);

    // Backpropagation through every player's chain
    for node in cursors.into_values() {
        let mut current = Some(node);
        while let Some(n) = current {
            n.update(&state);
            current = n.parent();
        }
    }
    trace!("multi-observer iteration complete");
}
