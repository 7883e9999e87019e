//! HyperPlay agent kernel for imperfect-information general game playing.
//!
//! This crate provides:
//! - A hypergame population: perfect-information histories consistent with
//!   the agent's private observation stream
//! - A forward sampler that maintains that population across turns, with
//!   backtracking, bad-move memoisation, and in-use diversification
//! - A memoised opponent-likelihood tree weighting each hypergame by
//!   posterior plausibility
//! - An anytime, posterior-weighted Monte-Carlo move evaluator
//! - The turn-loop controller behind the match-controller protocol
//!
//! Game rules stay outside the crate: everything the kernel knows about a
//! game arrives through the [`ports::RulesEngine`] trait.

pub mod adapters;
pub mod agent;
pub mod error;
pub mod evaluator;
pub mod games;
pub mod likelihood;
pub mod model;
pub mod population;
pub mod ports;
mod rollout;
pub mod sampler;
pub mod types;
pub mod utils;

pub use agent::{AgentConfig, HyperPlayer, HyperPlayerBuilder};
pub use error::{Error, Result};
pub use evaluator::{Evaluation, MoveEvaluator};
pub use likelihood::LikelihoodTree;
pub use model::Model;
pub use population::Population;
pub use ports::observer::{TurnObserver, TurnRecord};
pub use ports::player::{MatchSetup, Player};
pub use ports::rules::RulesEngine;
pub use types::{JointMove, PathHash, Percepts, Role};
