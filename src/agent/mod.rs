//! The HyperPlayer agent: the per-turn loop tying sampler, likelihood
//! tree, population manager, and evaluator together behind the controller
//! protocol.
//!
//! Per turn, in order: record the incoming percepts and the confirmed
//! prior move, recover from a timed-out previous turn, prune hypergames
//! that contradict the controller's legality verdict, advance every model
//! to the current step, replenish the population from the root while the
//! update budget lasts, diversity-filter down to the cap, then run the
//! anytime evaluator on the surviving hypergames and answer with the
//! best-weighted move.

pub mod builder;
pub mod config;

use std::collections::HashMap;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;

use crate::error::{Error, Result};
use crate::evaluator::MoveEvaluator;
use crate::likelihood::LikelihoodTree;
use crate::model::Model;
use crate::population::Population;
use crate::ports::observer::{TurnObserver, TurnRecord};
use crate::ports::player::{MatchSetup, Player};
use crate::ports::rules::RulesEngine;
use crate::sampler::{Sampler, TurnContext};
use crate::types::{PathHash, Percepts, Role};

pub use builder::HyperPlayerBuilder;
pub use config::AgentConfig;

/// Reserved at the end of the play clock so a move always gets out.
const PLAY_BUFFER: Duration = Duration::from_millis(1000);

/// Likelihood seed for the root node.
const ROOT_VALUE: f64 = 100.0;

pub struct HyperPlayer<E: RulesEngine> {
    name: String,
    engine: E,
    config: AgentConfig,
    rng: StdRng,
    observer: Box<dyn TurnObserver>,

    setup: Option<MatchSetup>,
    role: Role,
    step: usize,
    /// Counts `game_play` invocations; diverges from `step` only across a
    /// timed-out turn and is used to re-align the step counter afterwards.
    next_step: usize,
    last_turn_timed_out: bool,

    /// Controller-confirmed own move per step.
    actions: HashMap<usize, E::Move>,
    /// Move submitted per step, i.e. what the agent expected to play.
    expected_actions: HashMap<usize, E::Move>,
    /// Observed percepts per step.
    percepts: HashMap<usize, Percepts<E::Term>>,
    /// Own moves the controller rejected, per step.
    blacklist: HashMap<usize, E::Move>,
    /// Own moves the controller confirmed, per step.
    whitelist: HashMap<usize, E::Move>,

    sampler: Sampler<E>,
    tree: LikelihoodTree,
    population: Population<E>,
    /// The candidate set of the most recent turn; the last-resort source
    /// of a legal move when the population collapses.
    last_known_legal: Vec<E::Move>,
}

impl<E: RulesEngine> HyperPlayer<E> {
    /// An agent with default configuration and an OS-seeded RNG.
    pub fn new(name: impl Into<String>, engine: E) -> Self {
        HyperPlayerBuilder::new(name).build(engine)
    }

    pub fn builder(name: impl Into<String>) -> HyperPlayerBuilder {
        HyperPlayerBuilder::new(name)
    }

    pub(crate) fn from_parts(
        name: String,
        engine: E,
        config: AgentConfig,
        rng: StdRng,
        observer: Box<dyn TurnObserver>,
    ) -> Self {
        let cap = config.num_hyper_games;
        let num_op_probes = config.num_op_probes;
        let uniform_opponent = config.uniform_opponent;
        HyperPlayer {
            name,
            engine,
            config,
            rng,
            observer,
            setup: None,
            role: Role::new(0),
            step: 0,
            next_step: 0,
            last_turn_timed_out: false,
            actions: HashMap::new(),
            expected_actions: HashMap::new(),
            percepts: HashMap::new(),
            blacklist: HashMap::new(),
            whitelist: HashMap::new(),
            sampler: Sampler::new(num_op_probes, uniform_opponent),
            tree: LikelihoodTree::new(PathHash::initial()),
            population: Population::new(cap),
            last_known_legal: Vec::new(),
        }
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// The step the next `game_play` call will decide.
    pub fn current_step(&self) -> usize {
        self.step
    }

    pub fn population(&self) -> &Population<E> {
        &self.population
    }

    pub fn likelihood_tree(&self) -> &LikelihoodTree {
        &self.tree
    }

    /// The move submitted at `step`, as recorded for retroactive checks.
    pub fn expected_action(&self, step: usize) -> Option<&E::Move> {
        self.expected_actions.get(&step)
    }

    pub fn last_turn_timed_out(&self) -> bool {
        self.last_turn_timed_out
    }

    /// Choose the move for the current step. Split out of `game_play` so
    /// the bookkeeping around it stays readable.
    fn next_move(&mut self, start: Instant, was_illegal: bool) -> E::Move {
        let setup = self
            .setup
            .clone()
            .expect("game_start must succeed before game_play");
        let play_clock = setup.play_clock;
        let select_deadline = start + play_clock.saturating_sub(PLAY_BUFFER);
        let update_deadline = start + play_clock / self.config.inv_playtime_factor.max(1);
        let current_step = self.step;
        let role = self.role;
        let target = current_step + 1;
        let cap = self.config.num_hyper_games;
        let backtracking_depth = self.config.backtracking_depth;

        self.sampler.reset_counters();

        let engine = &self.engine;
        let ctx = TurnContext {
            engine,
            role,
            current_step,
            actions: &self.actions,
            percepts: &self.percepts,
            blacklist: &self.blacklist,
            whitelist: &self.whitelist,
        };
        let sampler = &mut self.sampler;
        let tree = &mut self.tree;
        let rng = &mut self.rng;
        let population = &mut self.population;

        if current_step == 0 {
            // First turn: one hypergame anchored at the initial state.
            let mut model = Model::new();
            let initial_percepts = ctx
                .percepts
                .get(&0)
                .cloned()
                .unwrap_or_else(Percepts::empty);
            if model.initialize(engine.initial_state(), initial_percepts).is_ok() {
                *tree = LikelihoodTree::new(model.action_path_hash());
                tree.set_value(tree.root(), ROOT_VALUE);
                let legal = model.compute_legal_moves(engine, role);
                model.record_legal_moves(0, legal.into_iter().collect());
                population.clear();
                population.push(model);
            }
        } else {
            // Advance every surviving hypergame to the current step,
            // branching clones while the cap allows.
            let survivors = std::mem::take(population.models_mut());
            for mut model in survivors {
                let snapshot = model.clone();
                let prev_hash = model.previous_action_path_hash();
                let prev_action = model.last_action().cloned();
                let curr_hash = model.action_path_hash();

                if !advance_to(sampler, tree, rng, &ctx, &mut model, target, backtracking_depth) {
                    // The subtree under this model's last move is spent.
                    if model.len() > 1
                        && let (Some(prev), Some(last)) =
                            (model.previous_action_path_hash(), model.last_action().cloned())
                    {
                        sampler.record_bad(prev, last);
                    }
                    continue;
                }
                // A zero posterior retires the model only while peers
                // remain; a lone hypergame keeps its degenerate weight.
                if tree.relative_likelihood(model.hash_path()) <= 0.0 && !population.is_empty() {
                    continue;
                }
                if let Some(last) = model.last_action().cloned() {
                    sampler.transfer_claim(curr_hash, last, prev_hash.zip(prev_action));
                }
                population.push(model);

                if self.config.should_branch {
                    for _ in 1..self.config.num_hyper_branches {
                        if population.len() >= cap {
                            break;
                        }
                        let mut branch = snapshot.clone();
                        let b_prev_hash = branch.previous_action_path_hash();
                        let b_prev_action = branch.last_action().cloned();
                        let b_curr_hash = branch.action_path_hash();
                        if !advance_to(
                            sampler,
                            tree,
                            rng,
                            &ctx,
                            &mut branch,
                            target,
                            backtracking_depth,
                        ) {
                            break;
                        }
                        if tree.relative_likelihood(branch.hash_path()) <= 0.0 {
                            break;
                        }
                        if let Some(last) = branch.last_action().cloned() {
                            sampler.transfer_claim(b_curr_hash, last, b_prev_hash.zip(b_prev_action));
                        }
                        population.push(branch);
                    }
                }
            }

            // Replenish from the root: mandatory while the population is
            // empty, opportunistic within the update budget otherwise.
            let root_hash = PathHash::initial();
            loop {
                if start.elapsed() >= play_clock {
                    break;
                }
                if population.len() >= 2 * cap {
                    break;
                }
                if !sampler.root_has_candidates(&ctx, root_hash) {
                    break;
                }
                if !population.is_empty() && Instant::now() >= update_deadline {
                    break;
                }
                let Some(model) =
                    search_from_root(sampler, tree, rng, &ctx, target, backtracking_depth)
                else {
                    continue;
                };
                if tree.relative_likelihood(model.hash_path()) <= 0.0 && !population.is_empty() {
                    continue;
                }
                if let (Some(prev), Some(last)) =
                    (model.previous_action_path_hash(), model.last_action().cloned())
                {
                    sampler.transfer_claim(prev, last, None);
                }
                population.push(model);
            }

            population.drop_leading_zero_posterior(tree);
            sampler.clear_in_use();
            if population.len() > cap {
                if self.config.use_variance_filter {
                    population.filter_by_variance(engine, tree);
                } else {
                    population.truncate_to_cap();
                }
            }
        }

        let update_ms = start.elapsed().as_millis();

        // Candidate moves: the union of the hypergames' legal sets, in the
        // engine's stable enumeration order.
        let mut candidates: Vec<E::Move> = Vec::new();
        for model in population.models() {
            for mv in model.compute_legal_moves(engine, role) {
                if !candidates.contains(&mv) {
                    candidates.push(mv);
                }
            }
        }

        let select_start = Instant::now();
        let (chosen, depths) = if candidates.is_empty() {
            // Consistency exhausted: fall back through the last known
            // legal set, the confirmed prior move, and finally the root.
            let fallback = self
                .last_known_legal
                .first()
                .cloned()
                .or_else(|| current_step.checked_sub(1).and_then(|s| ctx.actions.get(&s).cloned()))
                .or_else(|| {
                    engine
                        .legal_moves(&engine.initial_state(), role)
                        .into_iter()
                        .next()
                })
                .expect("game_start verified a legal move exists");
            (fallback, 0)
        } else {
            self.last_known_legal = candidates.clone();
            let mut evaluator = MoveEvaluator::new(
                self.config.max_num_probes,
                self.config.likelihood_power_factor,
            );
            evaluator.include_zero_posterior = self.config.include_zero_posterior;
            let posteriors = population.posteriors(tree);
            let evaluation = evaluator
                .select_move(
                    engine,
                    rng,
                    population.models(),
                    &posteriors,
                    &candidates,
                    role,
                    current_step,
                    select_deadline,
                )
                .expect("candidate set is not empty");
            sampler.add_simulations(evaluation.simulations);
            (evaluation.best_move, evaluation.depths)
        };
        let select_ms = select_start.elapsed().as_millis();

        let record = TurnRecord {
            match_id: setup.match_id.clone(),
            game_name: setup.game_name.clone(),
            step: current_step,
            role: engine.role_name(role),
            player_name: self.name.clone(),
            population_size: population.len(),
            rollout_depth: depths,
            update_ms,
            select_ms,
            chosen_move: chosen.to_string(),
            was_illegal_last_turn: was_illegal,
            simulations_run: sampler.simulations(),
            forward_calls: sampler.forward_calls(),
        };
        // Telemetry must never fail the turn.
        let _ = self.observer.on_turn(&record);

        chosen
    }
}

impl<E: RulesEngine> Player<E> for HyperPlayer<E> {
    fn game_start(&mut self, setup: MatchSetup, role: Role) -> Result<()> {
        let initial_legal = self.engine.legal_moves(&self.engine.initial_state(), role);
        if initial_legal.is_empty() {
            return Err(Error::NoLegalMoves { role: role.index() });
        }

        self.setup = Some(setup);
        self.role = role;
        self.step = 0;
        self.next_step = 0;
        self.last_turn_timed_out = false;
        self.actions.clear();
        self.expected_actions.clear();
        self.percepts.clear();
        self.blacklist.clear();
        self.whitelist.clear();
        self.sampler = Sampler::new(self.config.num_op_probes, self.config.uniform_opponent);
        self.tree = LikelihoodTree::new(PathHash::initial());
        self.population = Population::new(self.config.num_hyper_games);
        self.last_known_legal = initial_legal;
        Ok(())
    }

    fn game_play(&mut self, percepts: Percepts<E::Term>, prior_move: Option<E::Move>) -> E::Move {
        let start = Instant::now();
        self.next_step += 1;

        if self.step > 0 && self.last_turn_timed_out {
            // The previous turn overran: re-align the step counter, free
            // every in-use claim, and forget the unanswered expectation.
            if self.step + 1 < self.next_step {
                self.step += 1;
            }
            self.sampler.clear_in_use();
            self.expected_actions.remove(&(self.step - 1));
        }

        self.percepts.insert(self.step, percepts);
        if self.step > 0
            && let Some(prior) = prior_move
        {
            self.actions.insert(self.step - 1, prior.clone());
            self.whitelist.insert(self.step - 1, prior);
        }

        // Retroactive consistency: a rejected submission blacklists the
        // expected move and prunes every hypergame that would have
        // allowed it (or would not have allowed the confirmed one).
        let mut was_illegal = false;
        if self.step > 0 {
            let prune_step = self.step - 1;
            if let (Some(expected), Some(actual)) = (
                self.expected_actions.get(&prune_step),
                self.actions.get(&prune_step),
            ) && expected != actual
            {
                was_illegal = true;
                self.blacklist.insert(prune_step, expected.clone());

                let blacklisted = self.blacklist.get(&prune_step).cloned();
                let whitelisted = self.whitelist.get(&prune_step).cloned();
                self.population.retain(|model| {
                    match model.legal_moves_at(prune_step) {
                        Some(legal) => {
                            let allows_rejected =
                                blacklisted.as_ref().is_some_and(|mv| legal.contains(mv));
                            let lacks_confirmed =
                                whitelisted.as_ref().is_some_and(|mv| !legal.contains(mv));
                            !allows_rejected && !lacks_confirmed
                        }
                        None => true,
                    }
                });
            }
        }

        let chosen = self.next_move(start, was_illegal);
        self.expected_actions.insert(self.step, chosen.clone());

        let play_clock = self
            .setup
            .as_ref()
            .map(|s| s.play_clock)
            .unwrap_or_default();
        self.last_turn_timed_out = start.elapsed() >= play_clock;
        self.step += 1;
        chosen
    }

    fn game_stop(&mut self, percepts: Percepts<E::Term>, prior_move: Option<E::Move>) {
        self.percepts.insert(self.step, percepts);
        if self.step > 0
            && let Some(prior) = prior_move
        {
            self.actions.insert(self.step - 1, prior);
        }
        let _ = self.observer.on_match_end();
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Drive one model forward until it reaches `target` frames. Returns
/// `false` when the model receded below the backtracking allowance (or to
/// the root) and must be retired.
fn advance_to<E: RulesEngine>(
    sampler: &mut Sampler<E>,
    tree: &mut LikelihoodTree,
    rng: &mut StdRng,
    ctx: &TurnContext<'_, E>,
    model: &mut Model<E>,
    target: usize,
    backtracking_depth: usize,
) -> bool {
    let floor = ctx.current_step.saturating_sub(backtracking_depth);
    let mut step = model.len();
    while step < target {
        step = sampler.forward(ctx, tree, rng, model, step);
        if step == 0 || step < floor {
            return false;
        }
    }
    true
}

/// Seed a fresh model at the root and sample it forward to `target`.
/// Unlike [`advance_to`], the allowance floats with the deepest step the
/// search has reached, so early exploration may wander.
fn search_from_root<E: RulesEngine>(
    sampler: &mut Sampler<E>,
    tree: &mut LikelihoodTree,
    rng: &mut StdRng,
    ctx: &TurnContext<'_, E>,
    target: usize,
    backtracking_depth: usize,
) -> Option<Model<E>> {
    let mut model = Model::new();
    let initial_percepts = ctx.percepts.get(&0).cloned().unwrap_or_else(Percepts::empty);
    model
        .initialize(ctx.engine.initial_state(), initial_percepts)
        .ok()?;
    let legal = model.compute_legal_moves(ctx.engine, ctx.role);
    model.record_legal_moves(0, legal.into_iter().collect());

    let mut step = model.len();
    let mut max_step = step;
    while step < target {
        step = sampler.forward(ctx, tree, rng, &mut model, step);
        if step == 0 || step < max_step.saturating_sub(backtracking_depth) {
            return None;
        }
        max_step = max_step.max(step);
    }
    Some(model)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::fmt;

    use super::*;
    use crate::games::doors::{Doors, SEEKER};
    use crate::types::JointMove;

    /// A game whose only role never has a legal move.
    #[derive(Debug, Clone)]
    struct Stuck;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    struct StuckMove;

    impl fmt::Display for StuckMove {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "stuck")
        }
    }

    impl RulesEngine for Stuck {
        type State = ();
        type Move = StuckMove;
        type Term = u8;

        fn role_count(&self) -> usize {
            1
        }

        fn initial_state(&self) {}

        fn legal_moves(&self, _state: &(), _role: Role) -> Vec<StuckMove> {
            Vec::new()
        }

        fn successor(&self, _state: &(), _joint: &JointMove<StuckMove>) {}

        fn sees_terms(&self, _state: &(), _role: Role, _joint: &JointMove<StuckMove>) -> Percepts<u8> {
            Percepts::empty()
        }

        fn is_terminal(&self, _state: &()) -> bool {
            true
        }

        fn goal_value(&self, _state: &(), _role: Role) -> f64 {
            0.0
        }

        fn fluents(&self, _state: &()) -> HashSet<u8> {
            HashSet::new()
        }
    }

    fn doors_setup() -> MatchSetup {
        MatchSetup::new(
            "m1",
            "doors",
            Duration::from_secs(5),
            Duration::from_secs(5),
        )
    }

    #[test]
    fn game_start_rejects_a_game_with_no_opening_move() {
        let mut agent = HyperPlayer::new("hyperplay", Stuck);
        let result = agent.game_start(doors_setup(), Role::new(0));
        assert!(matches!(result, Err(Error::NoLegalMoves { role: 0 })));
    }

    #[test]
    fn game_start_resets_state_from_a_previous_match() {
        let mut agent = HyperPlayer::<Doors>::builder("hyperplay")
            .seed(1)
            .build(Doors::new(2, 3));

        agent.game_start(doors_setup(), SEEKER).unwrap();
        let first = agent.game_play(Percepts::empty(), None);
        assert_eq!(agent.current_step(), 1);
        assert_eq!(agent.expected_action(0), Some(&first));

        agent.game_start(doors_setup(), SEEKER).unwrap();
        assert_eq!(agent.current_step(), 0);
        assert!(agent.population().is_empty());
        assert!(agent.expected_action(0).is_none());
        assert!(!agent.last_turn_timed_out());
    }

    #[test]
    fn builder_propagates_the_configuration() {
        let config = AgentConfig::default()
            .with_num_hyper_games(3)
            .with_num_op_probes(1);
        let agent = HyperPlayer::<Doors>::builder("hyperplay")
            .config(config.clone())
            .build(Doors::new(2, 2));
        assert_eq!(agent.config(), &config);
        assert_eq!(agent.name(), "hyperplay");
        assert_eq!(agent.population().cap(), 3);
    }
}
