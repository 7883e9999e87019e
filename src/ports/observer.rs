//! Turn observer port - per-move telemetry collection.
//!
//! The agent emits one [`TurnRecord`] per `game_play` call. Observers are
//! adapters (CSV file, JSONL stream, in-memory buffers in tests); a failing
//! observer never fails the turn.

use serde::{Deserialize, Serialize};

use crate::Result;

/// Everything the agent knows about one completed turn.
///
/// Field order matches the append-only CSV column layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnRecord {
    pub match_id: String,
    pub game_name: String,
    pub step: usize,
    pub role: String,
    pub player_name: String,
    /// Hypergames alive after the update phase.
    pub population_size: usize,
    /// Outer evaluator depths completed.
    pub rollout_depth: usize,
    /// Milliseconds spent updating the population.
    pub update_ms: u128,
    /// Milliseconds spent selecting a move.
    pub select_ms: u128,
    pub chosen_move: String,
    /// Whether the controller rejected the move submitted last turn.
    pub was_illegal_last_turn: bool,
    /// Monte-Carlo playouts run this turn (sampler probes + evaluator).
    pub simulations_run: u64,
    /// Single-step forward attempts across all models this turn.
    pub forward_calls: u64,
}

/// Observer trait for per-turn telemetry.
///
/// # Examples
///
/// ```
/// use hyperplay::ports::observer::{TurnObserver, TurnRecord};
///
/// #[derive(Default)]
/// struct CountingObserver {
///     turns: usize,
/// }
///
/// impl TurnObserver for CountingObserver {
///     fn on_turn(&mut self, _record: &TurnRecord) -> hyperplay::Result<()> {
///         self.turns += 1;
///         Ok(())
///     }
/// }
/// ```
pub trait TurnObserver: Send {
    /// Called once per turn, after the move has been chosen.
    fn on_turn(&mut self, record: &TurnRecord) -> Result<()>;

    /// Called when the match ends. Flush buffers here.
    fn on_match_end(&mut self) -> Result<()> {
        Ok(())
    }
}
