//! One hypergame: a fully specified perfect-information history consistent
//! with the percepts observed so far.
//!
//! A model is a set of parallel stacks, one frame per game step. Frame 0 is
//! the anchor at the initial state with a null joint-move marker; every
//! later frame records the joint move assumed at that step, the resulting
//! state, the percepts the agent would have seen, and the number of joint
//! moves that were available before any filtering (the branching count).

use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::error::{Error, Result};
use crate::ports::rules::RulesEngine;
use crate::types::{JointMove, PathHash, Percepts, Role};

pub struct Model<E: RulesEngine> {
    /// Joint move assumed at each step; `None` is the initial-frame marker.
    action_path: Vec<Option<JointMove<E::Move>>>,
    /// State reached at each step.
    state_path: Vec<E::State>,
    /// Percepts the agent's role would have received at each step.
    percept_path: Vec<Percepts<E::Term>>,
    /// Joint moves available at each step, counted before filtering.
    branching_path: Vec<usize>,
    /// Prefix hashes: `hash_path[i]` identifies the action path up to step i.
    hash_path: Vec<PathHash>,
    /// The agent's legal moves as observed when each frame was pushed.
    legal_moves_at_step: HashMap<usize, HashSet<E::Move>>,
}

impl<E: RulesEngine> Model<E> {
    /// Create an empty model. It must be anchored with [`Model::initialize`]
    /// before any other operation.
    pub fn new() -> Self {
        Model {
            action_path: Vec::new(),
            state_path: Vec::new(),
            percept_path: Vec::new(),
            branching_path: Vec::new(),
            hash_path: Vec::new(),
            legal_moves_at_step: HashMap::new(),
        }
    }

    /// Push the step-0 frame: the initial state plus the percepts the
    /// controller delivered before any move.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateFrame`] if the model is already anchored.
    pub fn initialize(&mut self, state: E::State, percepts: Percepts<E::Term>) -> Result<()> {
        if !self.action_path.is_empty() {
            return Err(Error::DuplicateFrame {
                step: 0,
                have: self.action_path.len(),
            });
        }
        self.action_path.push(None);
        self.state_path.push(state);
        self.percept_path.push(percepts);
        self.branching_path.push(1);
        self.hash_path.push(PathHash::initial());
        Ok(())
    }

    /// Push one frame: apply `joint` to the current state, recording the
    /// successor, the agent's expected percepts, and the branching count.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateFrame`] when the stacks already hold a
    /// frame for `step`; the caller recovers by ignoring the push.
    pub fn advance(
        &mut self,
        engine: &E,
        step: usize,
        role: Role,
        joint: JointMove<E::Move>,
        branching: usize,
    ) -> Result<()> {
        if self.action_path.len() > step {
            return Err(Error::DuplicateFrame {
                step,
                have: self.action_path.len(),
            });
        }
        let state = self
            .state_path
            .last()
            .expect("advance on an unanchored model");
        let percepts = engine.sees_terms(state, role, &joint);
        let successor = engine.successor(state, &joint);
        let hash = self.action_path_hash().push(&joint);

        self.action_path.push(Some(joint));
        self.state_path.push(successor);
        self.percept_path.push(percepts);
        self.branching_path.push(branching);
        self.hash_path.push(hash);
        Ok(())
    }

    /// Pop the top frame. The root frame is never popped.
    pub fn backtrack(&mut self) {
        if self.action_path.len() > 1 {
            let popped_step = self.action_path.len() - 1;
            self.action_path.pop();
            self.state_path.pop();
            self.percept_path.pop();
            self.branching_path.pop();
            self.hash_path.pop();
            self.legal_moves_at_step.remove(&popped_step);
        }
    }

    /// Number of frames held; `len() - 1` is the step of the top frame.
    pub fn len(&self) -> usize {
        self.action_path.len()
    }

    pub fn is_empty(&self) -> bool {
        self.action_path.is_empty()
    }

    /// Step index of the top frame.
    pub fn current_step(&self) -> usize {
        self.action_path.len().saturating_sub(1)
    }

    pub fn current_state(&self) -> &E::State {
        self.state_path.last().expect("model has no frames")
    }

    pub fn latest_percepts(&self) -> &Percepts<E::Term> {
        self.percept_path.last().expect("model has no frames")
    }

    /// The joint move that produced the top frame; `None` at the root.
    pub fn last_action(&self) -> Option<&JointMove<E::Move>> {
        self.action_path.last().and_then(|a| a.as_ref())
    }

    /// The joint move assumed at `step`; `None` at the root frame or past
    /// the top.
    pub fn action_at(&self, step: usize) -> Option<&JointMove<E::Move>> {
        self.action_path.get(step).and_then(|a| a.as_ref())
    }

    /// The percepts expected at `step`.
    pub fn percepts_at(&self, step: usize) -> Option<&Percepts<E::Term>> {
        self.percept_path.get(step)
    }

    /// Hash identifying the full action path.
    pub fn action_path_hash(&self) -> PathHash {
        self.hash_path
            .last()
            .copied()
            .unwrap_or_else(PathHash::initial)
    }

    /// Hash of the action path with the top frame removed.
    pub fn previous_action_path_hash(&self) -> Option<PathHash> {
        let n = self.hash_path.len();
        if n >= 2 { Some(self.hash_path[n - 2]) } else { None }
    }

    /// The sequence of prefix hashes from the root to the top frame; the
    /// likelihood tree is navigated along this path.
    pub fn hash_path(&self) -> &[PathHash] {
        &self.hash_path
    }

    /// Product of per-step branching counts: the uniform-opponent choice
    /// factor of this history.
    pub fn branching_product(&self) -> f64 {
        self.branching_path.iter().map(|&n| n as f64).product()
    }

    pub fn record_legal_moves(&mut self, step: usize, moves: HashSet<E::Move>) {
        self.legal_moves_at_step.insert(step, moves);
    }

    pub fn legal_moves_at(&self, step: usize) -> Option<&HashSet<E::Move>> {
        self.legal_moves_at_step.get(&step)
    }

    /// The agent's legal moves in the current state, straight from the
    /// rules engine.
    pub fn compute_legal_moves(&self, engine: &E, role: Role) -> Vec<E::Move> {
        engine.legal_moves(self.current_state(), role)
    }

    /// Equal stack lengths across all parallel paths. Holds for every model
    /// the sampler produces; exposed for tests and debug assertions.
    pub fn stacks_aligned(&self) -> bool {
        let n = self.action_path.len();
        self.state_path.len() == n
            && self.percept_path.len() == n
            && self.branching_path.len() == n
            && self.hash_path.len() == n
    }
}

impl<E: RulesEngine> Clone for Model<E> {
    fn clone(&self) -> Self {
        Model {
            action_path: self.action_path.clone(),
            state_path: self.state_path.clone(),
            percept_path: self.percept_path.clone(),
            branching_path: self.branching_path.clone(),
            hash_path: self.hash_path.clone(),
            legal_moves_at_step: self.legal_moves_at_step.clone(),
        }
    }
}

impl<E: RulesEngine> Default for Model<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: RulesEngine> fmt::Debug for Model<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("frames", &self.action_path.len())
            .field("hash", &self.action_path_hash())
            .finish()
    }
}
