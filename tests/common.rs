//! Shared helpers for the hyperplay integration suite.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use hyperplay::games::doors::{Doors, DoorsMove, DoorsTerm, SEEKER};
use hyperplay::ports::observer::{TurnObserver, TurnRecord};
use hyperplay::{AgentConfig, HyperPlayer, JointMove, MatchSetup, Percepts, Player, RulesEngine};

/// A configuration small enough that every turn finishes in milliseconds.
pub fn quick_config() -> AgentConfig {
    AgentConfig::default()
        .with_num_hyper_games(6)
        .with_num_hyper_branches(4)
        .with_max_num_probes(4)
        .with_num_op_probes(2)
}

pub fn setup(play_clock: Duration) -> MatchSetup {
    MatchSetup::new("m-test", "doors", play_clock, Duration::from_secs(5))
}

/// Observer that stores every record for later assertions.
#[derive(Clone, Default)]
pub struct CollectingObserver {
    records: Arc<Mutex<Vec<TurnRecord>>>,
}

impl CollectingObserver {
    pub fn new() -> (Self, Arc<Mutex<Vec<TurnRecord>>>) {
        let observer = CollectingObserver::default();
        let records = observer.records.clone();
        (observer, records)
    }
}

impl TurnObserver for CollectingObserver {
    fn on_turn(&mut self, record: &TurnRecord) -> hyperplay::Result<()> {
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }
}

/// Drive a full honest match of Doors: the controller tracks the true
/// state, the hider follows `hider_script`, and the agent plays the
/// seeker. After every turn, `per_turn` receives the agent, the round,
/// the percepts delivered so far (indexed by step), and the agent's
/// chosen moves so far.
pub fn play_doors_match(
    mut agent: HyperPlayer<Doors>,
    hider_script: &[usize],
    play_clock: Duration,
    mut per_turn: impl FnMut(&HyperPlayer<Doors>, usize, &[Percepts<DoorsTerm>], &[DoorsMove]),
) -> (HyperPlayer<Doors>, <Doors as RulesEngine>::State) {
    let engine = agent.engine().clone();
    agent
        .game_start(setup(play_clock), SEEKER)
        .expect("doors offers legal moves at the root");

    let mut state = engine.initial_state();
    let mut percepts = Percepts::empty();
    let mut prior: Option<DoorsMove> = None;
    let mut history: Vec<Percepts<DoorsTerm>> = Vec::new();
    let mut chosen_moves: Vec<DoorsMove> = Vec::new();

    for (round, &hider_door) in hider_script.iter().enumerate() {
        history.push(percepts.clone());
        let chosen = agent.game_play(percepts.clone(), prior.clone());
        assert!(
            engine.legal_moves(&state, SEEKER).contains(&chosen),
            "turn {round}: agent returned illegal move {chosen}"
        );
        chosen_moves.push(chosen);
        per_turn(&agent, round, &history, &chosen_moves);

        let joint = JointMove::new(vec![chosen, DoorsMove::new(hider_door)]);
        percepts = engine.sees_terms(&state, SEEKER, &joint);
        state = engine.successor(&state, &joint);
        prior = Some(chosen);
    }

    agent.game_stop(percepts, prior);
    (agent, state)
}
