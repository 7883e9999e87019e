//! Player port - the match controller's view of an agent.
//!
//! The controller (external to this crate) calls these hooks in order:
//! `game_start` once, then `game_play` once per turn within the play clock,
//! then optionally `game_stop`. The percepts passed at step N are the
//! observations produced by step N-1's joint move; the prior move is the
//! move the controller actually executed for the agent at step N-1, which
//! can differ from what the agent submitted if the controller judged the
//! submission illegal.

use std::time::Duration;

use crate::Result;
use crate::ports::rules::RulesEngine;
use crate::types::{Percepts, Role};

/// Match parameters handed to the agent at game start.
#[derive(Debug, Clone)]
pub struct MatchSetup {
    pub match_id: String,
    pub game_name: String,
    /// Wall-clock budget for each `game_play` call.
    pub play_clock: Duration,
    /// Wall-clock budget for `game_start`.
    pub start_clock: Duration,
}

impl MatchSetup {
    pub fn new(
        match_id: impl Into<String>,
        game_name: impl Into<String>,
        play_clock: Duration,
        start_clock: Duration,
    ) -> Self {
        MatchSetup {
            match_id: match_id.into(),
            game_name: game_name.into(),
            play_clock,
            start_clock,
        }
    }
}

/// Controller-facing callbacks implemented by every agent.
///
/// `game_play` is deliberately infallible: whatever goes wrong inside a
/// turn, the agent surfaces its best known legal move rather than an error.
/// Only `game_start` can fail, and only on malformed setups (for example a
/// game whose initial state offers the agent no legal move at all).
pub trait Player<E: RulesEngine> {
    /// Prepare for a new match in the given role.
    ///
    /// # Errors
    ///
    /// Returns an error if the setup is unusable; a controller should treat
    /// that as a refused seat.
    fn game_start(&mut self, setup: MatchSetup, role: Role) -> Result<()>;

    /// Consume the turn's percepts and the controller-confirmed prior move,
    /// and return the chosen move for this step.
    fn game_play(
        &mut self,
        percepts: Percepts<E::Term>,
        prior_move: Option<E::Move>,
    ) -> E::Move;

    /// Final notification with the terminal percepts. Optional.
    fn game_stop(&mut self, _percepts: Percepts<E::Term>, _prior_move: Option<E::Move>) {}

    /// The agent's display name, used in telemetry records.
    fn name(&self) -> &str;
}
