//! Rules engine port - the declarative-rules interpreter boundary.
//!
//! The kernel performs no game-rule reasoning of its own. Everything it
//! knows about a game - states, legal moves, successors, percepts,
//! terminality, goals - comes through this trait. Implementations wrap a
//! rule-language interpreter (or, for tests, a hand-written game) and must
//! be pure: the same inputs always produce the same outputs.

use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;

use crate::types::{JointMove, Percepts, Role};

/// The capability set the kernel consumes from a rules interpreter.
///
/// All operations are side-effect free and total: the kernel has no
/// recovery path for a faulting engine and relies on these calls always
/// answering.
pub trait RulesEngine {
    /// A fully specified game position. Opaque to the kernel; equality is
    /// used by round-trip checks and fluent sets by the variance filter.
    type State: Clone + PartialEq + fmt::Debug;

    /// One role's action.
    type Move: Clone + Eq + Hash + fmt::Debug + fmt::Display;

    /// An observation term, also used for state fluents.
    type Term: Clone + Eq + Hash + fmt::Debug;

    /// Number of roles, in the game's fixed order.
    fn role_count(&self) -> usize;

    /// Display name of a role, used in telemetry records.
    fn role_name(&self, role: Role) -> String {
        role.to_string()
    }

    /// The unique initial state.
    fn initial_state(&self) -> Self::State;

    /// Legal moves for one role. Empty only in malformed games; the kernel
    /// treats an empty set for the agent's own role as a fatal condition.
    fn legal_moves(&self, state: &Self::State, role: Role) -> Vec<Self::Move>;

    /// Successor of `state` under a joint move covering every role.
    fn successor(&self, state: &Self::State, joint: &JointMove<Self::Move>) -> Self::State;

    /// The observation terms `role` receives when `joint` is played in
    /// `state`, i.e. the percepts delivered *before* the successor state.
    fn sees_terms(
        &self,
        state: &Self::State,
        role: Role,
        joint: &JointMove<Self::Move>,
    ) -> Percepts<Self::Term>;

    fn is_terminal(&self, state: &Self::State) -> bool;

    /// Goal value for `role` in a terminal state, on the usual 0-100 scale.
    fn goal_value(&self, state: &Self::State, role: Role) -> f64;

    /// The fluents (ground facts) holding in `state`. Used by the variance
    /// filter to measure how different two candidate states are.
    fn fluents(&self, state: &Self::State) -> HashSet<Self::Term>;

    /// All roles in order.
    fn roles(&self) -> impl Iterator<Item = Role> {
        (0..self.role_count()).map(Role::new)
    }
}
