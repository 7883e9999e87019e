//! Anytime hypergame-weighted Monte-Carlo move evaluation.
//!
//! Each outer depth runs one rollout per (hypergame, candidate move) pair
//! and folds the goal value into a running mean, weighted by the
//! hypergame's posterior raised to the configured power. The loop is
//! anytime: it stops at the deadline or after `max_num_probes` depths,
//! whichever comes first, and always has a move to hand back.

use std::time::Instant;

use rand::Rng;

use crate::model::Model;
use crate::ports::rules::RulesEngine;
use crate::rollout;
use crate::types::Role;

pub struct MoveEvaluator {
    /// Upper bound on outer depths.
    pub max_num_probes: usize,
    /// Exponent applied to each posterior before weighting contributions.
    pub likelihood_power_factor: f64,
    /// Whether zero-posterior hypergames may still run rollouts.
    pub include_zero_posterior: bool,
}

/// The outcome of one evaluation pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation<M> {
    pub best_move: M,
    /// Outer depths fully completed; 0 means the fallback move was used.
    pub depths: usize,
    /// Rollouts executed during the pass.
    pub simulations: u64,
}

impl MoveEvaluator {
    pub fn new(max_num_probes: usize, likelihood_power_factor: f64) -> Self {
        MoveEvaluator {
            max_num_probes,
            likelihood_power_factor,
            include_zero_posterior: false,
        }
    }

    /// Pick the candidate with the greatest weighted running mean.
    ///
    /// Returns `None` only when `candidates` is empty. A single candidate
    /// is returned immediately; with no time left the first candidate is
    /// the anytime fallback.
    pub fn select_move<E, R>(
        &self,
        engine: &E,
        rng: &mut R,
        models: &[Model<E>],
        posteriors: &[f64],
        candidates: &[E::Move],
        role: Role,
        current_step: usize,
        deadline: Instant,
    ) -> Option<Evaluation<E::Move>>
    where
        E: RulesEngine,
        R: Rng,
    {
        let first = candidates.first()?;
        if candidates.len() == 1 {
            return Some(Evaluation {
                best_move: first.clone(),
                depths: 0,
                simulations: 0,
            });
        }

        let mut sums = vec![0.0f64; candidates.len()];
        let mut counts = vec![0u64; candidates.len()];
        let mut simulations = 0u64;
        let mut depths = 0usize;

        while depths < self.max_num_probes && Instant::now() < deadline {
            for (model, &posterior) in models.iter().zip(posteriors) {
                if posterior <= 0.0 && !self.include_zero_posterior {
                    continue;
                }
                let weight = posterior.powf(self.likelihood_power_factor);
                let state = model.current_state();
                let legal_here = model.legal_moves_at(current_step);
                for (index, candidate) in candidates.iter().enumerate() {
                    let allowed = legal_here.is_some_and(|set| set.contains(candidate));
                    let value = if allowed {
                        simulations += 1;
                        rollout::agent_probe(engine, rng, state, role, candidate)
                    } else {
                        0.0
                    };
                    sums[index] += value * weight;
                    counts[index] += 1;
                }
            }
            depths += 1;
        }

        let best_index = if depths == 0 {
            // Anytime fallback: no depth finished, take the first legal.
            0
        } else {
            let mut best = 0;
            let mut best_mean = f64::MIN;
            for index in 0..candidates.len() {
                let mean = if counts[index] > 0 {
                    sums[index] / counts[index] as f64
                } else {
                    0.0
                };
                if index == 0 || mean > best_mean {
                    best = index;
                    best_mean = mean;
                }
            }
            best
        };

        Some(Evaluation {
            best_move: candidates[best_index].clone(),
            depths,
            simulations,
        })
    }
}
