//! Append-only CSV turn log.
//!
//! One row per `game_play` call, in the fixed column order of
//! [`TurnRecord`]. The file is opened in append mode so several matches of
//! the same agent can share a log; the header is written only when the
//! file starts empty.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use crate::Result;
use crate::ports::observer::{TurnObserver, TurnRecord};

pub struct CsvTurnLog {
    path: PathBuf,
    write_header: bool,
}

impl CsvTurnLog {
    /// Open (or create) the log at `path`.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be opened for appending.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| crate::Error::Io {
                operation: format!("open turn log {}", path.display()),
                source,
            })?;
        let write_header = file.metadata().map(|m| m.len() == 0).unwrap_or(true);
        Ok(CsvTurnLog { path, write_header })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TurnObserver for CsvTurnLog {
    fn on_turn(&mut self, record: &TurnRecord) -> Result<()> {
        let file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .map_err(|source| crate::Error::Io {
                operation: format!("append turn log {}", self.path.display()),
                source,
            })?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(self.write_header)
            .from_writer(file);
        writer.serialize(record)?;
        writer.flush().map_err(|source| crate::Error::Io {
            operation: "flush turn log".to_string(),
            source,
        })?;
        self.write_header = false;
        Ok(())
    }
}
