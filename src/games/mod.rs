//! In-crate reference games.
//!
//! These small rules-engine implementations exist for tests and docs; a
//! real deployment wraps an external rule interpreter behind
//! [`crate::ports::RulesEngine`] instead.

pub mod doors;
pub mod relay;

pub use doors::Doors;
pub use relay::Relay;
