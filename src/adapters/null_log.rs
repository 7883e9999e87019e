//! No-op observer for embedding and tests.

use crate::Result;
use crate::ports::observer::{TurnObserver, TurnRecord};

#[derive(Debug, Default, Clone, Copy)]
pub struct NullTurnLog;

impl TurnObserver for NullTurnLog {
    fn on_turn(&mut self, _record: &TurnRecord) -> Result<()> {
        Ok(())
    }
}
