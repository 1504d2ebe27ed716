//! Tree policies: how selection picks among the legal children of a node.
//!
//! A policy is a pure choice function over a snapshot of candidate nodes.
//! Each policy also names the statistics variant it consumes, so the search
//! can construct matching nodes when it expands a decision point; candidates
//! carrying a different variant are skipped rather than scored.

use std::sync::Arc;

use rand::distributions::{Distribution, WeightedIndex};

use crate::node::{Node, Stats};
use crate::util;

/// Selection strategy over the legal children of a node.
pub trait TreePolicy<M>: Send + Sync {
    /// The statistics variant nodes selected by this policy must carry.
    fn new_stats(&self) -> Stats;

    /// Choose one of the candidates. Returns `None` only when no candidate
    /// carries this policy's statistics variant (in particular when
    /// `candidates` is empty).
    fn select<'a>(&self, candidates: &'a [Arc<Node<M>>]) -> Option<&'a Arc<Node<M>>>;
}

/// First-encountered maximum, so ties resolve deterministically in favour of
/// the earliest-created child.
fn argmax_by_score<'a, M, S>(
    candidates: impl Iterator<Item = (&'a Arc<Node<M>>, S)>,
    mut score: impl FnMut(&S) -> f64,
) -> Option<&'a Arc<Node<M>>> {
    let mut best: Option<(&'a Arc<Node<M>>, f64)> = None;
    for (candidate, stats) in candidates {
        let value = score(&stats);
        match best {
            // Not `value <= top`: a NaN score must never displace the best
            Some((_, top)) if !(value > top) => {}
            _ => best = Some((candidate, value)),
        }
    }
    best.map(|(candidate, _)| candidate)
}

/// UCB1: Upper Confidence Bound selection for sequential decision points.
///
/// Ranks nodes by mean reward plus an exploration bonus that grows with how
/// often the node was available but not visited. Every candidate is marked
/// available before ranking, whether or not it is chosen.
#[derive(Debug, Clone, Copy)]
pub struct Ucb1 {
    exploration: f64,
}

impl Ucb1 {
    pub fn new(exploration: f64) -> Self {
        Self {
            exploration: exploration.max(0.0),
        }
    }

    pub fn exploration(&self) -> f64 {
        self.exploration
    }
}

impl Default for Ucb1 {
    fn default() -> Self {
        Self::new(0.7)
    }
}

impl<M> TreePolicy<M> for Ucb1 {
    fn new_stats(&self) -> Stats {
        Stats::ucb()
    }

    fn select<'a>(&self, candidates: &'a [Arc<Node<M>>]) -> Option<&'a Arc<Node<M>>> {
        for candidate in candidates {
            if let Some(stats) = candidate.stats().as_ucb() {
                stats.mark_available();
            }
        }
        argmax_by_score(
            candidates.iter().filter_map(|c| {
                c.stats()
                    .as_ucb()
                    .map(|stats| (c, stats.ucb_score(c.visits(), self.exploration)))
            }),
            |score| *score,
        )
    }
}

/// EXP3: exponential-weight selection for simultaneous decision points.
///
/// Maintains a probability distribution over the candidates that shifts
/// towards higher cumulative reward, and samples from it. The probability
/// assigned to each node is stored on the node so that backpropagation can
/// importance-weight the observed reward.
///
/// The calculation follows Algorithm 1 of Seldin et al., "Evaluation and
/// Analysis of the Performance of the EXP3 Algorithm in Stochastic
/// Environments" (2012), using the combined visit count of the candidate set
/// as the trial counter, since the candidate set varies between calls.
#[derive(Debug, Clone, Copy, Default)]
pub struct Exp3;

impl Exp3 {
    pub fn new() -> Self {
        Self
    }

    fn epsilon(k: f64, t: f64) -> f64 {
        // For t <= 0 the square root is infinite or NaN; f64::min ignores
        // both and falls back to the uniform rate 1/K
        (1.0 / k).min((k.ln() / (k * t)).sqrt())
    }

    /// Compute and record the selection probability of every candidate,
    /// returning them in candidate order.
    fn probabilities<M>(candidates: &[Arc<Node<M>>]) -> Vec<f64> {
        let k = candidates.len() as f64;
        let t: u32 = candidates.iter().map(|c| c.visits()).sum();
        let e_t = Self::epsilon(k, f64::from(t));
        let e_prev = Self::epsilon(k, f64::from(t) - 1.0);
        let exp_score = |c: &Arc<Node<M>>| {
            let score = c.stats().as_exp().map_or(0.0, |stats| stats.score());
            (e_prev * score).exp()
        };

        let exp_sum: f64 = candidates.iter().map(exp_score).sum();
        candidates
            .iter()
            .map(|candidate| {
                let p = e_t + (1.0 - k * e_t) * exp_score(candidate) / exp_sum;
                if let Some(stats) = candidate.stats().as_exp() {
                    stats.set_probability(p);
                }
                p
            })
            .collect()
    }
}

impl<M> TreePolicy<M> for Exp3 {
    fn new_stats(&self) -> Stats {
        Stats::exp()
    }

    fn select<'a>(&self, candidates: &'a [Arc<Node<M>>]) -> Option<&'a Arc<Node<M>>> {
        if candidates.is_empty() {
            return None;
        }
        let weights = Self::probabilities(candidates);
        let dist = WeightedIndex::new(&weights).ok()?;
        let index = util::with_rng(|rng| dist.sample(rng));
        candidates.get(index)
    }
}

/// Discounted UCB: recent trials weigh more than old ones.
///
/// Each recorded trial is discounted by `gamma^(t - s)` where `t` is the
/// node's current availability and `s` its availability when the trial was
/// recorded, so statistics decay when a node stops being chosen. Suits games
/// where the value of a move drifts as the opponent model sharpens.
#[derive(Debug, Clone, Copy)]
pub struct DUcb {
    exploration: f64,
    gamma: f64,
}

impl DUcb {
    pub fn new(exploration: f64, gamma: f64) -> Self {
        Self {
            exploration: exploration.max(0.0),
            gamma,
        }
    }
}

impl Default for DUcb {
    fn default() -> Self {
        Self::new(0.7, 0.8)
    }
}

impl<M> TreePolicy<M> for DUcb {
    fn new_stats(&self) -> Stats {
        Stats::logged_ucb()
    }

    fn select<'a>(&self, candidates: &'a [Arc<Node<M>>]) -> Option<&'a Arc<Node<M>>> {
        for candidate in candidates {
            if let Some(stats) = candidate.stats().as_logged_ucb() {
                stats.mark_available();
            }
        }

        let sums: Vec<(&Arc<Node<M>>, (f64, f64))> = candidates
            .iter()
            .filter_map(|c| {
                c.stats()
                    .as_logged_ucb()
                    .map(|stats| (c, stats.discounted_sums(self.gamma)))
            })
            .collect();
        let total: f64 = sums.iter().map(|(_, (count, _))| count).sum();

        argmax_by_score(sums.into_iter(), |&(count, reward)| {
            reward / count + 2.0 * self.exploration * (total.ln() / count).sqrt()
        })
    }
}

/// Sliding-window UCB: only the last `window` availability steps count.
#[derive(Debug, Clone, Copy)]
pub struct SwUcb {
    window: u32,
    exploration: f64,
}

impl SwUcb {
    pub fn new(window: u32, exploration: f64) -> Self {
        Self {
            window: window.max(1),
            exploration: exploration.max(0.0),
        }
    }
}

impl Default for SwUcb {
    fn default() -> Self {
        Self::new(1000, 0.7)
    }
}

impl<M> TreePolicy<M> for SwUcb {
    fn new_stats(&self) -> Stats {
        Stats::logged_ucb()
    }

    fn select<'a>(&self, candidates: &'a [Arc<Node<M>>]) -> Option<&'a Arc<Node<M>>> {
        for candidate in candidates {
            if let Some(stats) = candidate.stats().as_logged_ucb() {
                stats.mark_available();
            }
        }

        let sums: Vec<(&Arc<Node<M>>, (u32, f64))> = candidates
            .iter()
            .filter_map(|c| {
                c.stats()
                    .as_logged_ucb()
                    .map(|stats| (c, stats.windowed_sums(self.window)))
            })
            .collect();
        let total: u32 = sums.iter().map(|(_, (count, _))| count).sum();
        let horizon = f64::from(self.window.min(total));

        argmax_by_score(sums.into_iter(), |&(count, reward)| {
            let count = f64::from(count);
            reward / count + self.exploration * (horizon.ln() / count).sqrt()
        })
    }
}
