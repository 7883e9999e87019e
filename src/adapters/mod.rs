//! Adapters implementing domain ports.
//!
//! This module contains infrastructure implementations of the traits defined
//! in the ports module. Following hexagonal architecture, adapters depend on
//! domain ports, not the other way around.

pub mod csv_log;
pub mod jsonl_log;
pub mod null_log;

pub use csv_log::CsvTurnLog;
pub use jsonl_log::JsonlTurnLog;
pub use null_log::NullTurnLog;
