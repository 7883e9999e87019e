//! A degenerate relay march used for boundary behaviour tests.
//!
//! The runner has exactly one legal move each step; the escort picks one of
//! `escort_choices` flanks that never affect the state or the percepts.
//! With one flank the whole game has a single joint move per step, which is
//! the smallest game the evaluator and sampler must handle.

use std::collections::HashSet;
use std::fmt;

use crate::ports::rules::RulesEngine;
use crate::types::{JointMove, Percepts, Role};

pub const RUNNER: Role = Role::new(0);
pub const ESCORT: Role = Role::new(1);

#[derive(Debug, Clone)]
pub struct Relay {
    length: usize,
    escort_choices: usize,
}

impl Relay {
    pub fn new(length: usize, escort_choices: usize) -> Self {
        assert!(length >= 1, "need at least one leg");
        assert!(escort_choices >= 1, "escort needs at least one flank");
        Relay {
            length,
            escort_choices,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayState {
    pub position: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelayMove {
    Advance,
    Flank(usize),
}

impl fmt::Display for RelayMove {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelayMove::Advance => write!(f, "advance"),
            RelayMove::Flank(side) => write!(f, "flank{side}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelayTerm {
    /// Percept: one leg completed.
    Tick,
    /// Fluent: runner position.
    At(usize),
}

impl RulesEngine for Relay {
    type State = RelayState;
    type Move = RelayMove;
    type Term = RelayTerm;

    fn role_count(&self) -> usize {
        2
    }

    fn role_name(&self, role: Role) -> String {
        match role {
            RUNNER => "runner".to_string(),
            ESCORT => "escort".to_string(),
            other => other.to_string(),
        }
    }

    fn initial_state(&self) -> RelayState {
        RelayState { position: 0 }
    }

    fn legal_moves(&self, state: &RelayState, role: Role) -> Vec<RelayMove> {
        if self.is_terminal(state) {
            return Vec::new();
        }
        match role {
            RUNNER => vec![RelayMove::Advance],
            _ => (0..self.escort_choices).map(RelayMove::Flank).collect(),
        }
    }

    fn successor(&self, state: &RelayState, _joint: &JointMove<RelayMove>) -> RelayState {
        RelayState {
            position: state.position + 1,
        }
    }

    fn sees_terms(
        &self,
        _state: &RelayState,
        _role: Role,
        _joint: &JointMove<RelayMove>,
    ) -> Percepts<RelayTerm> {
        Percepts::new(vec![RelayTerm::Tick])
    }

    fn is_terminal(&self, state: &RelayState) -> bool {
        state.position >= self.length
    }

    fn goal_value(&self, _state: &RelayState, _role: Role) -> f64 {
        100.0
    }

    fn fluents(&self, state: &RelayState) -> HashSet<RelayTerm> {
        HashSet::from([RelayTerm::At(state.position)])
    }
}
