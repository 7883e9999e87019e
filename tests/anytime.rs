//! Boundary behaviour on degenerate games and anytime guarantees.

use std::time::Duration;

use hyperplay::games::relay::{Relay, RelayMove, RelayTerm, RUNNER};
use hyperplay::{HyperPlayer, JointMove, MatchSetup, Percepts, Player, RulesEngine};

mod common;
use common::{CollectingObserver, quick_config};

const PLAY_CLOCK: Duration = Duration::from_secs(10);

fn relay_setup() -> MatchSetup {
    MatchSetup::new("m-relay", "relay", PLAY_CLOCK, Duration::from_secs(5))
}

/// Drive a relay match where the escort always takes flank 0.
fn play_relay(mut agent: HyperPlayer<Relay>, legs: usize) -> HyperPlayer<Relay> {
    let engine = agent.engine().clone();
    agent.game_start(relay_setup(), RUNNER).unwrap();

    let mut state = engine.initial_state();
    let mut percepts = Percepts::empty();
    let mut prior = None;
    for leg in 0..legs {
        let chosen = agent.game_play(percepts.clone(), prior.clone());
        assert_eq!(chosen, RelayMove::Advance, "leg {leg}: only move is advance");
        let joint = JointMove::new(vec![chosen, RelayMove::Flank(0)]);
        percepts = engine.sees_terms(&state, RUNNER, &joint);
        state = engine.successor(&state, &joint);
        prior = Some(chosen);
    }
    agent.game_stop(percepts, prior);
    agent
}

#[test]
fn forced_march_never_backtracks() {
    let (observer, records) = CollectingObserver::new();
    let agent = HyperPlayer::<Relay>::builder("hyperplay")
        .seed(1)
        .config(quick_config())
        .observer(Box::new(observer))
        .build(Relay::new(4, 1));

    play_relay(agent, 4);

    let records = records.lock().unwrap();
    assert_eq!(records.len(), 4);
    for (turn, record) in records.iter().enumerate().skip(1) {
        assert_eq!(
            record.forward_calls, 1,
            "turn {turn}: one forward call means no retries and no backtracking"
        );
        assert_eq!(record.population_size, 1);
    }
}

#[test]
fn single_joint_move_game_selects_without_rollout_depths() {
    let (observer, records) = CollectingObserver::new();
    let agent = HyperPlayer::<Relay>::builder("hyperplay")
        .seed(1)
        .config(quick_config())
        .observer(Box::new(observer))
        .build(Relay::new(3, 1));

    play_relay(agent, 3);

    let records = records.lock().unwrap();
    for record in records.iter() {
        assert_eq!(record.chosen_move, "advance");
        assert_eq!(
            record.rollout_depth, 0,
            "a single candidate needs no evaluation depths"
        );
    }
}

#[test]
fn hidden_escort_choices_diversify_the_population() {
    let (observer, records) = CollectingObserver::new();
    let agent = HyperPlayer::<Relay>::builder("hyperplay")
        .seed(4)
        .config(quick_config())
        .observer(Box::new(observer))
        .build(Relay::new(4, 2));

    play_relay(agent, 4);

    let records = records.lock().unwrap();
    // Percepts never reveal the escort's flank, so both histories stay
    // consistent and replenishment keeps a second hypergame alive.
    assert_eq!(records[1].population_size, 2);
}

#[test]
fn percepts_match_the_forced_history() {
    let agent = HyperPlayer::<Relay>::builder("hyperplay")
        .seed(6)
        .config(quick_config())
        .build(Relay::new(3, 1));

    let agent = play_relay(agent, 3);
    for model in agent.population().models() {
        for step in 1..model.len() {
            assert_eq!(
                model.percepts_at(step).map(|p| p.terms()),
                Some(&[RelayTerm::Tick][..]),
                "forced history carries the tick percept at step {step}"
            );
        }
    }
}
