//! Monte-Carlo playout primitives shared by the sampler's opponent probes
//! and the move evaluator.

use rand::Rng;
use rand::prelude::IndexedRandom;

use crate::ports::rules::RulesEngine;
use crate::types::{JointMove, Role};

/// A uniformly random joint move: every role draws independently from its
/// legal set. Returns `None` when any role has no legal move.
pub(crate) fn random_joint<E, R>(engine: &E, rng: &mut R, state: &E::State) -> Option<JointMove<E::Move>>
where
    E: RulesEngine,
    R: Rng,
{
    let mut moves = Vec::with_capacity(engine.role_count());
    for role in engine.roles() {
        let legal = engine.legal_moves(state, role);
        moves.push(legal.choose(rng)?.clone());
    }
    Some(JointMove::new(moves))
}

/// A random joint move with one role pinned to `fixed`.
pub(crate) fn random_joint_fixing<E, R>(
    engine: &E,
    rng: &mut R,
    state: &E::State,
    fixed_role: Role,
    fixed: &E::Move,
) -> Option<JointMove<E::Move>>
where
    E: RulesEngine,
    R: Rng,
{
    let mut moves = Vec::with_capacity(engine.role_count());
    for role in engine.roles() {
        if role == fixed_role {
            let legal = engine.legal_moves(state, role);
            if !legal.contains(fixed) {
                return None;
            }
            moves.push(fixed.clone());
        } else {
            let legal = engine.legal_moves(state, role);
            moves.push(legal.choose(rng)?.clone());
        }
    }
    Some(JointMove::new(moves))
}

/// A random joint move with every non-agent role pinned to the components
/// of `template`; only the agent's own move is redrawn.
pub(crate) fn random_joint_fixing_opponents<E, R>(
    engine: &E,
    rng: &mut R,
    state: &E::State,
    agent_role: Role,
    template: &JointMove<E::Move>,
) -> Option<JointMove<E::Move>>
where
    E: RulesEngine,
    R: Rng,
{
    let mut moves = Vec::with_capacity(engine.role_count());
    for role in engine.roles() {
        if role == agent_role {
            let legal = engine.legal_moves(state, role);
            moves.push(legal.choose(rng)?.clone());
        } else {
            moves.push(template.get(role).clone());
        }
    }
    Some(JointMove::new(moves))
}

/// Play uniformly random joint moves until a terminal state, optionally
/// forcing the first joint move. Stops early if a non-terminal state offers
/// no joint move at all (malformed game).
pub(crate) fn playout<E, R>(
    engine: &E,
    rng: &mut R,
    mut state: E::State,
    mut first: Option<JointMove<E::Move>>,
) -> E::State
where
    E: RulesEngine,
    R: Rng,
{
    loop {
        if engine.is_terminal(&state) {
            return state;
        }
        let joint = match first.take() {
            Some(joint) => joint,
            None => match random_joint(engine, rng, &state) {
                Some(joint) => joint,
                None => return state,
            },
        };
        state = engine.successor(&state, &joint);
    }
}

/// One probe of the agent's prospects: from `state`, play `mv` inside an
/// otherwise random joint move, then roll out uniformly; the result is the
/// agent's goal value at the terminal state. An `mv` that is illegal in
/// `state` scores 0.
pub(crate) fn agent_probe<E, R>(
    engine: &E,
    rng: &mut R,
    state: &E::State,
    agent_role: Role,
    mv: &E::Move,
) -> f64
where
    E: RulesEngine,
    R: Rng,
{
    if engine.is_terminal(state) {
        return engine.goal_value(state, agent_role);
    }
    let Some(first) = random_joint_fixing(engine, rng, state, agent_role, mv) else {
        return 0.0;
    };
    let terminal = playout(engine, rng, state.clone(), Some(first));
    engine.goal_value(&terminal, agent_role)
}

/// One probe of the opponent's preference for a candidate joint move: pin
/// the non-agent components, redraw the agent's move, roll out uniformly,
/// and average the non-agent roles' goal values at the terminal state.
pub(crate) fn opponent_probe<E, R>(
    engine: &E,
    rng: &mut R,
    state: &E::State,
    agent_role: Role,
    candidate: &JointMove<E::Move>,
) -> f64
where
    E: RulesEngine,
    R: Rng,
{
    let terminal = if engine.is_terminal(state) {
        state.clone()
    } else {
        match random_joint_fixing_opponents(engine, rng, state, agent_role, candidate) {
            Some(first) => playout(engine, rng, state.clone(), Some(first)),
            None => return 0.0,
        }
    };

    let opponents: Vec<Role> = engine.roles().filter(|&r| r != agent_role).collect();
    if opponents.is_empty() {
        return engine.goal_value(&terminal, agent_role);
    }
    let total: f64 = opponents
        .iter()
        .map(|&r| engine.goal_value(&terminal, r))
        .sum();
    total / opponents.len() as f64
}
