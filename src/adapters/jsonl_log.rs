//! JSONL turn log: one JSON object per line, for downstream analysis
//! tooling that prefers self-describing records over CSV columns.

use std::io::Write;

use crate::Result;
use crate::ports::observer::{TurnObserver, TurnRecord};

pub struct JsonlTurnLog<W: Write + Send> {
    sink: W,
}

impl<W: Write + Send> JsonlTurnLog<W> {
    pub fn new(sink: W) -> Self {
        JsonlTurnLog { sink }
    }

    pub fn into_inner(self) -> W {
        self.sink
    }
}

impl<W: Write + Send> TurnObserver for JsonlTurnLog<W> {
    fn on_turn(&mut self, record: &TurnRecord) -> Result<()> {
        serde_json::to_writer(&mut self.sink, record)?;
        self.sink.write_all(b"\n").map_err(|source| crate::Error::Io {
            operation: "append JSONL turn log".to_string(),
            source,
        })?;
        Ok(())
    }

    fn on_match_end(&mut self) -> Result<()> {
        self.sink.flush().map_err(|source| crate::Error::Io {
            operation: "flush JSONL turn log".to_string(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_serialize_one_per_line() {
        let mut log = JsonlTurnLog::new(Vec::new());
        let record = TurnRecord {
            match_id: "m2".to_string(),
            game_name: "relay".to_string(),
            step: 1,
            role: "runner".to_string(),
            player_name: "hyperplay".to_string(),
            population_size: 1,
            rollout_depth: 2,
            update_ms: 3,
            select_ms: 4,
            chosen_move: "advance".to_string(),
            was_illegal_last_turn: false,
            simulations_run: 8,
            forward_calls: 1,
        };
        log.on_turn(&record).unwrap();
        log.on_turn(&record).unwrap();

        let text = String::from_utf8(log.into_inner()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let parsed: TurnRecord = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(parsed, record);
    }
}
