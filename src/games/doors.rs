//! Hide-and-seek behind doors: a minimal imperfect-information game.
//!
//! Each round the seeker and the hider simultaneously pick one of `doors`
//! doors. Both roles then observe only whether they met. After a miss the
//! seeker cannot tell which of the remaining doors the hider used, so the
//! hypergame population branches over them; a later inconsistent guess is
//! exactly the percept mismatch the sampler has to recover from.

use std::collections::HashSet;
use std::fmt;

use crate::ports::rules::RulesEngine;
use crate::types::{JointMove, Percepts, Role};

pub const SEEKER: Role = Role::new(0);
pub const HIDER: Role = Role::new(1);

/// Rules for a match of `rounds` rounds over `doors` doors.
#[derive(Debug, Clone)]
pub struct Doors {
    doors: usize,
    rounds: usize,
}

impl Doors {
    pub fn new(doors: usize, rounds: usize) -> Self {
        assert!(doors >= 1, "need at least one door");
        assert!(rounds >= 1, "need at least one round");
        Doors { doors, rounds }
    }

    pub fn doors(&self) -> usize {
        self.doors
    }

    pub fn rounds(&self) -> usize {
        self.rounds
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DoorsState {
    pub round: usize,
    pub meetings: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DoorsMove(usize);

impl DoorsMove {
    pub fn new(door: usize) -> Self {
        DoorsMove(door)
    }

    pub fn door(&self) -> usize {
        self.0
    }
}

impl fmt::Display for DoorsMove {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "door{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DoorsTerm {
    /// Percept: both roles picked the same door this round.
    Found,
    /// Percept: the roles missed each other.
    Missed,
    /// Fluent: the current round counter.
    Round(usize),
    /// Fluent: meetings so far.
    Meetings(usize),
}

impl RulesEngine for Doors {
    type State = DoorsState;
    type Move = DoorsMove;
    type Term = DoorsTerm;

    fn role_count(&self) -> usize {
        2
    }

    fn role_name(&self, role: Role) -> String {
        match role {
            SEEKER => "seeker".to_string(),
            HIDER => "hider".to_string(),
            other => other.to_string(),
        }
    }

    fn initial_state(&self) -> DoorsState {
        DoorsState {
            round: 0,
            meetings: 0,
        }
    }

    fn legal_moves(&self, state: &DoorsState, _role: Role) -> Vec<DoorsMove> {
        if self.is_terminal(state) {
            return Vec::new();
        }
        (0..self.doors).map(DoorsMove).collect()
    }

    fn successor(&self, state: &DoorsState, joint: &JointMove<DoorsMove>) -> DoorsState {
        let met = joint.get(SEEKER) == joint.get(HIDER);
        DoorsState {
            round: state.round + 1,
            meetings: state.meetings + usize::from(met),
        }
    }

    fn sees_terms(
        &self,
        _state: &DoorsState,
        _role: Role,
        joint: &JointMove<DoorsMove>,
    ) -> Percepts<DoorsTerm> {
        let term = if joint.get(SEEKER) == joint.get(HIDER) {
            DoorsTerm::Found
        } else {
            DoorsTerm::Missed
        };
        Percepts::new(vec![term])
    }

    fn is_terminal(&self, state: &DoorsState) -> bool {
        state.round >= self.rounds
    }

    fn goal_value(&self, state: &DoorsState, role: Role) -> f64 {
        let seeker_score = 100.0 * state.meetings as f64 / self.rounds as f64;
        match role {
            SEEKER => seeker_score,
            _ => 100.0 - seeker_score,
        }
    }

    fn fluents(&self, state: &DoorsState) -> HashSet<DoorsTerm> {
        HashSet::from([
            DoorsTerm::Round(state.round),
            DoorsTerm::Meetings(state.meetings),
        ])
    }
}
