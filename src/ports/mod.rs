//! Ports (trait boundaries) for external dependencies.
//!
//! The kernel owns these interfaces; infrastructure implements them. The
//! rules engine and the match controller both live outside the crate and
//! are only ever reached through the traits defined here.

pub mod observer;
pub mod player;
pub mod rules;

pub use observer::TurnObserver;
pub use player::{MatchSetup, Player};
pub use rules::RulesEngine;
