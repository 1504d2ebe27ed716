//! Information-set tree nodes.
//!
//! A node aggregates statistics for one move as seen from one information
//! set, not for a single concrete game state; every determinisation that
//! reaches the node during search contributes to the same counters. The tree
//! only ever grows: children are appended under the node's mutex and never
//! removed or reordered, so a selection snapshot stays valid for as long as
//! the caller holds it.
//!
//! Statistics come in two flavours because sequential and simultaneous
//! decision points are ranked by different bandit algorithms. The flavour is
//! a tagged sum rather than a trait hierarchy; a tree policy consumes the
//! variant it declares through [`TreePolicy::new_stats`] and ignores nodes
//! carrying any other variant.
//!
//! [`TreePolicy::new_stats`]: crate::policy::TreePolicy::new_stats

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, Weak};

use crate::game::{Game, Player};
use crate::policy::TreePolicy;
use crate::util::AtomicF64;

/// One recorded outcome for the logged UCB variants: the node's availability
/// count at the time of the trial and the reward observed.
#[derive(Debug, Clone, Copy)]
pub struct Trial {
    pub available: u32,
    pub reward: f64,
}

/// Statistics for UCB1 selection at sequential decision points.
#[derive(Debug)]
pub struct UcbStats {
    score: AtomicF64,
    available: AtomicU32,
}

impl UcbStats {
    fn new() -> Self {
        Self {
            score: AtomicF64::new(0.0),
            // A node is trivially available the first time it is created
            available: AtomicU32::new(1),
        }
    }

    /// Cumulative reward backpropagated through this node.
    pub fn score(&self) -> f64 {
        self.score.load()
    }

    /// How many times this node was a legal candidate at its parent.
    pub fn available(&self) -> u32 {
        self.available.load(Ordering::SeqCst)
    }

    /// Mark the node as having been available for selection.
    pub fn mark_available(&self) {
        self.available.fetch_add(1, Ordering::SeqCst);
    }

    /// Upper confidence bound used to rank candidates. Requires at least one
    /// visit; the selection phase only ranks visited nodes.
    pub fn ucb_score(&self, visits: u32, exploration: f64) -> f64 {
        let visits = f64::from(visits);
        self.score.load() / visits
            + exploration * (f64::from(self.available()).ln() / visits).sqrt()
    }
}

/// Statistics for EXP3 selection at simultaneous decision points.
#[derive(Debug)]
pub struct ExpStats {
    score: AtomicF64,
    probability: AtomicF64,
}

impl ExpStats {
    fn new() -> Self {
        Self {
            score: AtomicF64::new(0.0),
            probability: AtomicF64::new(1.0),
        }
    }

    /// Cumulative importance-weighted reward.
    pub fn score(&self) -> f64 {
        self.score.load()
    }

    /// The selection probability most recently assigned by the policy.
    pub fn probability(&self) -> f64 {
        self.probability.load()
    }

    pub fn set_probability(&self, probability: f64) {
        self.probability.store(probability);
    }
}

/// Statistics for the discounted and sliding-window UCB policies, which need
/// the full trial history rather than running sums.
#[derive(Debug)]
pub struct LoggedUcbStats {
    available: AtomicU32,
    trials: Mutex<Vec<Trial>>,
}

impl LoggedUcbStats {
    fn new() -> Self {
        Self {
            available: AtomicU32::new(1),
            trials: Mutex::new(Vec::new()),
        }
    }

    pub fn available(&self) -> u32 {
        self.available.load(Ordering::SeqCst)
    }

    pub fn mark_available(&self) {
        self.available.fetch_add(1, Ordering::SeqCst);
    }

    fn record(&self, reward: f64) {
        let available = self.available();
        self.trials.lock().unwrap().push(Trial { available, reward });
    }

    /// Discounted trial count and reward sum: each past trial is weighted by
    /// `gamma^(t - s)`, with `t` the current availability and `s` the
    /// availability when the trial was recorded.
    pub fn discounted_sums(&self, gamma: f64) -> (f64, f64) {
        let t = self.available();
        let trials = self.trials.lock().unwrap();
        let mut count = 0.0;
        let mut reward = 0.0;
        for trial in trials.iter() {
            let discount = gamma.powi((t - trial.available) as i32);
            count += discount;
            reward += discount * trial.reward;
        }
        (count, reward)
    }

    /// Trial count and reward sum restricted to the trials recorded within
    /// the last `window` availability steps.
    pub fn windowed_sums(&self, window: u32) -> (u32, f64) {
        let t = self.available();
        let min = if window > t { 0 } else { t - window + 1 };
        let trials = self.trials.lock().unwrap();
        let mut count = 0;
        let mut reward = 0.0;
        for trial in trials.iter().filter(|trial| trial.available >= min) {
            count += 1;
            reward += trial.reward;
        }
        (count, reward)
    }
}

/// Variant statistics carried by a node. The search constructs the variant
/// matching the decision point: sequential points get the variant of the
/// configured sequential policy, simultaneous points the simultaneous one.
#[derive(Debug)]
pub enum Stats {
    Ucb(UcbStats),
    Exp(ExpStats),
    LoggedUcb(LoggedUcbStats),
}

impl Stats {
    pub fn ucb() -> Self {
        Self::Ucb(UcbStats::new())
    }

    pub fn exp() -> Self {
        Self::Exp(ExpStats::new())
    }

    pub fn logged_ucb() -> Self {
        Self::LoggedUcb(LoggedUcbStats::new())
    }

    pub fn as_ucb(&self) -> Option<&UcbStats> {
        match self {
            Self::Ucb(stats) => Some(stats),
            _ => None,
        }
    }

    pub fn as_exp(&self) -> Option<&ExpStats> {
        match self {
            Self::Exp(stats) => Some(stats),
            _ => None,
        }
    }

    pub fn as_logged_ucb(&self) -> Option<&LoggedUcbStats> {
        match self {
            Self::LoggedUcb(stats) => Some(stats),
            _ => None,
        }
    }

    fn accumulate(&self, reward: f64) {
        match self {
            Self::Ucb(stats) => {
                stats.score.fetch_add(reward);
            }
            Self::Exp(stats) => {
                // EXP3 importance weighting: divide the observed reward by
                // the probability under which the node was chosen
                stats.score.fetch_add(reward / stats.probability.load());
            }
            Self::LoggedUcb(stats) => stats.record(reward),
        }
    }
}

/// A vertex of an information-set tree.
///
/// Roots carry no move and no acting player; every other node records the
/// move whose application produced it and the player who chose that move.
/// Structural mutation (appending children) happens under the node's mutex;
/// statistic updates are atomic so concurrent backpropagation never blocks.
pub struct Node<M> {
    parent: Weak<Node<M>>,
    children: Mutex<Vec<Arc<Node<M>>>>,
    mv: Option<M>,
    player: Option<Player>,
    visits: AtomicU32,
    stats: Stats,
}

impl<M> Node<M> {
    /// Create a root node carrying the given statistics variant.
    pub fn new_root(stats: Stats) -> Arc<Self> {
        Arc::new(Self {
            parent: Weak::new(),
            children: Mutex::new(Vec::new()),
            mv: None,
            player: None,
            visits: AtomicU32::new(0),
            stats,
        })
    }

    fn new_child(parent: &Arc<Self>, mv: M, player: Player, stats: Stats) -> Arc<Self> {
        Arc::new(Self {
            parent: Arc::downgrade(parent),
            children: Mutex::new(Vec::new()),
            mv: Some(mv),
            player: Some(player),
            visits: AtomicU32::new(0),
            stats,
        })
    }

    /// The move whose application produced this node; `None` for roots.
    pub fn game_move(&self) -> Option<&M> {
        self.mv.as_ref()
    }

    /// The player who chose this node's move; `None` for roots.
    pub fn player(&self) -> Option<Player> {
        self.player
    }

    /// The parent node, if this node is not a root and the tree is alive.
    pub fn parent(&self) -> Option<Arc<Self>> {
        self.parent.upgrade()
    }

    pub fn visits(&self) -> u32 {
        self.visits.load(Ordering::SeqCst)
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    /// Snapshot of the children at this moment. Appends made by other
    /// threads after the snapshot is taken are not reflected.
    pub fn children(&self) -> Vec<Arc<Self>> {
        self.children.lock().unwrap().clone()
    }

    /// Append a child of `parent` for `mv` chosen by `player` and return it.
    ///
    /// Takes the owning `Arc` rather than a plain reference because the new
    /// child keeps a weak back-reference to its parent.
    pub fn add_child(parent: &Arc<Self>, mv: M, player: Player, stats: Stats) -> Arc<Self> {
        let mut children = parent.children.lock().unwrap();
        let child = Self::new_child(parent, mv, player, stats);
        children.push(Arc::clone(&child));
        child
    }

    /// Return `parent`'s existing child for `mv`, or append one built from
    /// `make_stats`. Concurrent callers racing on the same move observe a
    /// single child; this is what keeps per-player trees aligned on one move
    /// history during multi-observer search.
    pub fn find_or_add_child(
        parent: &Arc<Self>,
        mv: &M,
        player: Player,
        make_stats: impl FnOnce() -> Stats,
    ) -> Arc<Self>
    where
        M: Clone + Eq,
    {
        let mut children = parent.children.lock().unwrap();
        if let Some(child) = children.iter().find(|child| child.mv.as_ref() == Some(mv)) {
            return Arc::clone(child);
        }
        let child = Self::new_child(parent, mv.clone(), player, make_stats());
        children.push(Arc::clone(&child));
        child
    }

    /// The legal moves that have no child yet.
    pub fn untried_moves(&self, legal_moves: &[M]) -> Vec<M>
    where
        M: Clone + Eq,
    {
        let children = self.children.lock().unwrap();
        legal_moves
            .iter()
            .filter(|mv| !children.iter().any(|child| child.mv.as_ref() == Some(*mv)))
            .cloned()
            .collect()
    }

    /// Snapshot the children whose move is legal and let `policy` pick one.
    pub fn select_child(
        &self,
        legal_moves: &[M],
        policy: &impl TreePolicy<M>,
    ) -> Option<Arc<Self>>
    where
        M: Eq,
    {
        let candidates: Vec<Arc<Self>> = {
            let children = self.children.lock().unwrap();
            children
                .iter()
                .filter(|child| {
                    child
                        .mv
                        .as_ref()
                        .is_some_and(|mv| legal_moves.contains(mv))
                })
                .cloned()
                .collect()
        };
        policy.select(&candidates).cloned()
    }

    /// Record a finished iteration: increment the visit counter and fold the
    /// terminal result into the variant statistics. Roots have no acting
    /// player, so they count the visit but accumulate no score.
    pub fn update(&self, terminal_state: &impl Game<Move = M>) {
        self.visits.fetch_add(1, Ordering::SeqCst);
        if let Some(player) = self.player {
            self.stats.accumulate(terminal_state.result(player));
        }
    }

    /// Number of edges between this node and its root.
    pub fn depth(&self) -> usize {
        match self.parent() {
            Some(parent) => parent.depth() + 1,
            None => 0,
        }
    }

    /// Length of the longest downward path from this node.
    pub fn height(&self) -> usize {
        self.children()
            .iter()
            .map(|child| child.height() + 1)
            .max()
            .unwrap_or(0)
    }
}

impl<M: fmt::Debug> Node<M> {
    /// Render this node and its whole subtree, one node per line, children
    /// indented below their parent.
    pub fn tree_string(&self) -> String {
        self.indented(0)
    }

    fn indented(&self, indent: usize) -> String {
        let mut out = "| ".repeat(indent);
        out.push_str(&self.to_string());
        out.push('\n');
        for child in self.children() {
            out.push_str(&child.indented(indent + 1));
        }
        out
    }
}

impl<M: fmt::Debug> fmt::Display for Node<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[M:")?;
        match &self.mv {
            Some(mv) => write!(f, "{:?}", mv)?,
            None => write!(f, "-")?,
        }
        write!(f, " by ")?;
        match self.player {
            Some(player) => write!(f, "{}", player)?,
            None => write!(f, "-")?,
        }
        match &self.stats {
            Stats::Ucb(stats) => write!(
                f,
                ", V/S/A: {}/{:.1}/{}]",
                self.visits(),
                stats.score(),
                stats.available()
            ),
            Stats::Exp(stats) => write!(
                f,
                ", V/S/P: {}/{:.1}/{:.2}]",
                self.visits(),
                stats.score(),
                stats.probability()
            ),
            Stats::LoggedUcb(stats) => write!(
                f,
                ", V/A: {}/{}]",
                self.visits(),
                stats.available()
            ),
        }
    }
}

impl<M: fmt::Debug> fmt::Debug for Node<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
