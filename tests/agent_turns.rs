//! End-to-end turn-loop behaviour over the Doors reference game.

use std::time::Duration;

use hyperplay::games::doors::{Doors, SEEKER};
use hyperplay::{HyperPlayer, Percepts, Player, RulesEngine};

mod common;
use common::{CollectingObserver, play_doors_match, quick_config, setup};

const PLAY_CLOCK: Duration = Duration::from_secs(10);

#[test]
fn initial_turn_seeds_exactly_one_anchored_model() {
    let engine = Doors::new(3, 4);
    let mut agent = HyperPlayer::<Doors>::builder("hyperplay")
        .seed(42)
        .config(quick_config())
        .build(engine.clone());
    agent.game_start(setup(PLAY_CLOCK), SEEKER).unwrap();

    let chosen = agent.game_play(Percepts::empty(), None);

    assert!(engine.legal_moves(&engine.initial_state(), SEEKER).contains(&chosen));
    assert_eq!(agent.population().len(), 1);
    let model = &agent.population().models()[0];
    assert_eq!(model.len(), 1, "the first model is anchored at the root");
    assert_eq!(
        model.legal_moves_at(0).map(|set| set.len()),
        Some(3),
        "legal moves are recorded at step 0"
    );
    assert_eq!(agent.expected_action(0), Some(&chosen));
    assert_eq!(agent.current_step(), 1);
}

#[test]
fn honest_match_preserves_model_invariants() {
    let (observer, records) = CollectingObserver::new();
    let agent = HyperPlayer::<Doors>::builder("hyperplay")
        .seed(7)
        .config(quick_config())
        .observer(Box::new(observer))
        .build(Doors::new(3, 5));
    let cap = agent.config().num_hyper_games;

    let (_, terminal) = play_doors_match(
        agent,
        &[2, 0, 1, 2, 0],
        PLAY_CLOCK,
        |agent, round, history, chosen| {
            assert!(
                agent.population().len() <= cap,
                "turn {round}: population exceeds the cap"
            );
            assert!(
                round == 0 || !agent.population().is_empty(),
                "turn {round}: population drained in an honest match"
            );
            for model in agent.population().models() {
                assert!(model.stacks_aligned(), "turn {round}: ragged stacks");
                assert_eq!(model.len(), round + 1, "turn {round}: model not advanced");
                for step in 0..model.len() {
                    assert_eq!(
                        model.percepts_at(step),
                        Some(&history[step]),
                        "turn {round}: percepts diverge at step {step}"
                    );
                    if step >= 1 {
                        assert_eq!(
                            model.action_at(step).map(|jm| jm.get(SEEKER)),
                            Some(&chosen[step - 1]),
                            "turn {round}: own-move component diverges at step {step}"
                        );
                    }
                }
            }
        },
    );

    let engine = Doors::new(3, 5);
    assert!(engine.is_terminal(&terminal));

    let records = records.lock().unwrap();
    assert_eq!(records.len(), 5);
    for (step, record) in records.iter().enumerate() {
        assert_eq!(record.step, step);
        assert_eq!(record.role, "seeker");
        assert_eq!(record.player_name, "hyperplay");
        assert!(!record.was_illegal_last_turn);
    }
    assert!(
        records.iter().skip(1).all(|r| r.forward_calls > 0),
        "every non-initial turn forwards models"
    );
}

#[test]
fn population_is_filtered_to_the_cap_each_turn() {
    let config = quick_config().with_num_hyper_games(2);
    let agent = HyperPlayer::<Doors>::builder("hyperplay")
        .seed(99)
        .config(config)
        .build(Doors::new(4, 4));

    play_doors_match(agent, &[1, 3, 0, 2], PLAY_CLOCK, |agent, round, _, _| {
        assert!(
            agent.population().len() <= 2,
            "turn {round}: cap of 2 exceeded"
        );
    });
}

#[test]
fn branching_fills_the_population_from_clones() {
    let config = quick_config().with_should_branch(true);
    let (observer, records) = CollectingObserver::new();
    let agent = HyperPlayer::<Doors>::builder("hyperplay")
        .seed(5)
        .config(config)
        .observer(Box::new(observer))
        .build(Doors::new(4, 3));

    play_doors_match(agent, &[1, 2, 3], PLAY_CLOCK, |_, _, _, _| {});

    let records = records.lock().unwrap();
    // After a Missed percept three hider doors stay consistent, so the
    // population should hold more than one hypergame from turn 1 on.
    assert!(
        records[1].population_size > 1,
        "expected branches, got population of {}",
        records[1].population_size
    );
}

#[test]
fn turns_respect_the_play_clock() {
    let play_clock = Duration::from_secs(2);
    let engine = Doors::new(3, 3);
    let mut agent = HyperPlayer::<Doors>::builder("hyperplay")
        .seed(11)
        .config(quick_config())
        .build(engine.clone());
    agent.game_start(setup(play_clock), SEEKER).unwrap();

    let mut percepts = Percepts::empty();
    let mut prior = None;
    let mut state = engine.initial_state();
    for _ in 0..3 {
        let start = std::time::Instant::now();
        let chosen = agent.game_play(percepts.clone(), prior.clone());
        assert!(
            start.elapsed() < play_clock,
            "turn overran the play clock: {:?}",
            start.elapsed()
        );
        let joint = hyperplay::JointMove::new(vec![chosen, hyperplay::games::doors::DoorsMove::new(0)]);
        percepts = engine.sees_terms(&state, SEEKER, &joint);
        state = engine.successor(&state, &joint);
        prior = Some(chosen);
    }
}

#[test]
fn seeded_agents_reproduce_their_moves() {
    let run = |seed: u64| {
        let agent = HyperPlayer::<Doors>::builder("hyperplay")
            .seed(seed)
            .config(quick_config())
            .build(Doors::new(3, 4));
        let mut moves = Vec::new();
        play_doors_match(agent, &[0, 2, 1, 0], PLAY_CLOCK, |_, _, _, chosen| {
            moves = chosen.to_vec();
        });
        moves
    };

    assert_eq!(run(1234), run(1234));
}
