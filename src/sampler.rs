//! Forward-sampling of hypergames under partial observations.
//!
//! The sampler advances a model one frame at a time, always pinning the
//! agent's component of the joint move to the move the controller confirmed
//! for that step. Candidate joint moves are drawn in proportion to the
//! opponent-rollout values memoised in the likelihood tree; candidates
//! proven inconsistent land in the bad-move registry, candidates occupied
//! by a live sibling hypergame are skipped through the in-use registry.

use std::collections::{HashMap, HashSet};

use rand::Rng;

use crate::likelihood::LikelihoodTree;
use crate::model::Model;
use crate::ports::rules::RulesEngine;
use crate::rollout;
use crate::types::{JointMove, PathHash, Percepts, Role};
use crate::utils;

/// Per-turn observation context the sampler reads while forwarding.
///
/// Everything here is owned by the agent controller; the sampler only
/// borrows it for the duration of the update phase.
pub struct TurnContext<'a, E: RulesEngine> {
    pub engine: &'a E,
    pub role: Role,
    /// The step the turn loop is advancing models towards.
    pub current_step: usize,
    /// The agent's controller-confirmed move per step.
    pub actions: &'a HashMap<usize, E::Move>,
    /// The observed percepts per step.
    pub percepts: &'a HashMap<usize, Percepts<E::Term>>,
    /// Moves the controller rejected, per step.
    pub blacklist: &'a HashMap<usize, E::Move>,
    /// Moves the controller confirmed, per step.
    pub whitelist: &'a HashMap<usize, E::Move>,
}

/// Outcome of a single [`Sampler::forward`] call, expressed as the step the
/// model now needs to reach next.
pub type NextStep = usize;

pub struct Sampler<E: RulesEngine> {
    /// Joint moves proven inconsistent, keyed by the node they leave from.
    bad_moves: HashMap<PathHash, HashSet<JointMove<E::Move>>>,
    /// Joint moves claimed by live hypergames, keyed the same way.
    in_use: HashMap<PathHash, HashSet<JointMove<E::Move>>>,
    /// Value-tagged candidate lists recorded when a node was expanded;
    /// reused on every revisit so expansion happens once per node.
    move_values: HashMap<PathHash, Vec<(JointMove<E::Move>, f64)>>,
    num_op_probes: usize,
    /// Assign every candidate the same value instead of probing: the
    /// uniform-opponent variant of the agent family.
    uniform_opponent: bool,
    forward_calls: u64,
    simulations: u64,
}

impl<E: RulesEngine> Sampler<E> {
    pub fn new(num_op_probes: usize, uniform_opponent: bool) -> Self {
        Sampler {
            bad_moves: HashMap::new(),
            in_use: HashMap::new(),
            move_values: HashMap::new(),
            num_op_probes,
            uniform_opponent,
            forward_calls: 0,
            simulations: 0,
        }
    }

    /// Try to push frame `step` onto `model`.
    ///
    /// Returns the step the model should attempt next:
    /// `step + 1` after a consistent push, `step` after an inconsistent
    /// push was undone (retry the same frame), `step - 1` after the node
    /// ran out of candidates and one frame was popped.
    pub fn forward<R: Rng>(
        &mut self,
        ctx: &TurnContext<'_, E>,
        tree: &mut LikelihoodTree,
        rng: &mut R,
        model: &mut Model<E>,
        step: usize,
    ) -> NextStep {
        self.forward_calls += 1;
        debug_assert_eq!(step, model.len(), "forward targets the next frame");

        let Some(agent_move) = ctx.actions.get(&step.saturating_sub(1)) else {
            // No confirmed action to pin; nothing can be sampled.
            return step.saturating_sub(1);
        };
        let agent_move = agent_move.clone();
        let node_hash = model.action_path_hash();
        let state = model.current_state().clone();

        let enumerated = joint_moves_fixing(ctx.engine, &state, ctx.role, &agent_move);
        let branching = enumerated.len();

        let surviving: Vec<&JointMove<E::Move>> = enumerated
            .iter()
            .filter(|jm| !self.is_bad(node_hash, jm) && !self.is_in_use(node_hash, jm))
            .collect();

        // Expand the likelihood node once, probing every surviving
        // candidate with opponent rollouts.
        if let Some(node) = tree.node(model.hash_path())
            && !tree.is_expanded(node)
        {
            let mut children = Vec::with_capacity(surviving.len());
            let mut memo = Vec::with_capacity(surviving.len());
            for &joint in &surviving {
                let value = if self.uniform_opponent {
                    1.0
                } else {
                    let mut total = 0.0;
                    for _ in 0..self.num_op_probes {
                        total += rollout::opponent_probe(ctx.engine, rng, &state, ctx.role, joint);
                    }
                    self.simulations += self.num_op_probes as u64;
                    if self.num_op_probes > 0 {
                        total / self.num_op_probes as f64
                    } else {
                        0.0
                    }
                };
                children.push((node_hash.push(joint), value));
                memo.push((joint.clone(), value));
            }
            tree.expand(node, &children);
            self.move_values.insert(node_hash, memo);
        }

        // Select likelihood-proportionally among the candidates recorded at
        // expansion time, skipping anything since proven bad or claimed.
        let candidates: Vec<(JointMove<E::Move>, f64)> = match self.move_values.get(&node_hash) {
            Some(memo) => memo
                .iter()
                .filter(|(jm, _)| !self.is_bad(node_hash, jm) && !self.is_in_use(node_hash, jm))
                .cloned()
                .collect(),
            None => surviving.iter().map(|jm| ((*jm).clone(), 1.0)).collect(),
        };

        let Some(joint) = utils::weighted_sample(rng, &candidates).cloned() else {
            // Out of candidates here: undo the move that got us to this
            // node. If every enumerated candidate was proven bad the popped
            // move is itself bad; otherwise it is merely occupied.
            let popped = model.last_action().cloned();
            let all_bad = enumerated.iter().all(|jm| self.is_bad(node_hash, jm));
            model.backtrack();
            if let Some(popped) = popped {
                let parent_hash = model.action_path_hash();
                if all_bad {
                    self.record_bad(parent_hash, popped);
                } else {
                    self.record_in_use(parent_hash, popped);
                }
            }
            return step - 1;
        };

        match model.advance(ctx.engine, step, ctx.role, joint.clone(), branching) {
            Ok(()) => {}
            // A redundant push means the frame is already there.
            Err(_) => return step + 1,
        }

        let legal: HashSet<E::Move> = model
            .compute_legal_moves(ctx.engine, ctx.role)
            .into_iter()
            .collect();
        model.record_legal_moves(step, legal);

        // Consistency: the pushed frame's percepts must match observation.
        if let Some(observed) = ctx.percepts.get(&step)
            && model.latest_percepts() != observed
        {
            self.condemn(tree, model, joint);
            return step;
        }

        // Below the current step the agent's own legality is already
        // known: the frame must admit the confirmed move and must not
        // admit a rejected one.
        if step < ctx.current_step {
            let legal = model
                .legal_moves_at(step)
                .expect("legal moves recorded at push");
            let blacklisted = ctx
                .blacklist
                .get(&step)
                .is_some_and(|mv| legal.contains(mv));
            let missing_whitelisted = ctx
                .whitelist
                .get(&step)
                .is_some_and(|mv| !legal.contains(mv));
            if blacklisted || missing_whitelisted {
                self.condemn(tree, model, joint);
                return step;
            }
        }

        step + 1
    }

    /// Zero the pushed frame's likelihood node, pop the frame, and record
    /// the joint move as bad at the node it left from.
    fn condemn(&mut self, tree: &mut LikelihoodTree, model: &mut Model<E>, joint: JointMove<E::Move>) {
        if let Some(node) = tree.node(model.hash_path()) {
            tree.set_value(node, 0.0);
            if let Some(parent) = tree.parent(node) {
                tree.update_rel_likelihood(parent);
            }
        }
        model.backtrack();
        self.record_bad(model.action_path_hash(), joint);
    }

    pub fn record_bad(&mut self, node: PathHash, joint: JointMove<E::Move>) {
        self.bad_moves.entry(node).or_default().insert(joint);
    }

    fn record_in_use(&mut self, node: PathHash, joint: JointMove<E::Move>) {
        self.in_use.entry(node).or_default().insert(joint);
    }

    pub fn is_bad(&self, node: PathHash, joint: &JointMove<E::Move>) -> bool {
        self.bad_moves.get(&node).is_some_and(|set| set.contains(joint))
    }

    pub fn is_in_use(&self, node: PathHash, joint: &JointMove<E::Move>) -> bool {
        self.in_use.get(&node).is_some_and(|set| set.contains(joint))
    }

    pub fn bad_moves_at(&self, node: PathHash) -> Option<&HashSet<JointMove<E::Move>>> {
        self.bad_moves.get(&node)
    }

    /// Transfer a hypergame's in-use claim after a successful update: the
    /// new top action is claimed at its parent node and the old claim from
    /// before the update is released.
    pub fn transfer_claim(
        &mut self,
        claim_node: PathHash,
        claim_move: JointMove<E::Move>,
        release: Option<(PathHash, JointMove<E::Move>)>,
    ) {
        self.record_in_use(claim_node, claim_move);
        if let Some((node, joint)) = release
            && let Some(set) = self.in_use.get_mut(&node)
        {
            set.remove(&joint);
        }
    }

    /// Drop every in-use claim. Called at the end of an update phase and
    /// during timeout recovery.
    pub fn clear_in_use(&mut self) {
        self.in_use.clear();
    }

    /// Whether the root still admits a joint move for step 1 that is
    /// neither bad nor in use. When it does not, replenishment from the
    /// root cannot produce anything new.
    pub fn root_has_candidates(&self, ctx: &TurnContext<'_, E>, root_hash: PathHash) -> bool {
        let Some(first_action) = ctx.actions.get(&0) else {
            return false;
        };
        let root_state = ctx.engine.initial_state();
        joint_moves_fixing(ctx.engine, &root_state, ctx.role, first_action)
            .iter()
            .any(|jm| !self.is_bad(root_hash, jm) && !self.is_in_use(root_hash, jm))
    }

    pub fn forward_calls(&self) -> u64 {
        self.forward_calls
    }

    pub fn simulations(&self) -> u64 {
        self.simulations
    }

    /// Add evaluator playouts into the turn's simulation counter.
    pub fn add_simulations(&mut self, count: u64) {
        self.simulations += count;
    }

    /// Reset the per-turn counters.
    pub fn reset_counters(&mut self) {
        self.forward_calls = 0;
        self.simulations = 0;
    }
}

/// All joint moves from `state` in which `fixed_role` plays `fixed`: the
/// cross product of every other role's legal moves.
pub(crate) fn joint_moves_fixing<E: RulesEngine>(
    engine: &E,
    state: &E::State,
    fixed_role: Role,
    fixed: &E::Move,
) -> Vec<JointMove<E::Move>> {
    let per_role: Vec<Vec<E::Move>> = engine
        .roles()
        .map(|role| {
            if role == fixed_role {
                vec![fixed.clone()]
            } else {
                engine.legal_moves(state, role)
            }
        })
        .collect();

    if per_role.iter().any(|moves| moves.is_empty()) {
        return Vec::new();
    }

    let total: usize = per_role.iter().map(|moves| moves.len()).product();
    let mut joints = Vec::with_capacity(total);
    let mut odometer = vec![0usize; per_role.len()];
    loop {
        joints.push(JointMove::new(
            odometer
                .iter()
                .zip(&per_role)
                .map(|(&i, moves)| moves[i].clone())
                .collect(),
        ));
        // Advance the odometer, least significant role last.
        let mut digit = per_role.len();
        loop {
            if digit == 0 {
                return joints;
            }
            digit -= 1;
            odometer[digit] += 1;
            if odometer[digit] < per_role[digit].len() {
                break;
            }
            odometer[digit] = 0;
        }
    }
}
