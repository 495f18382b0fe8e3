//! Scenario tests for the truth-or-dare machine.
//!
//! Timers are driven by hand: a test "fires" a timer by calling
//! `on_timer`, exactly as the room does once the deadline passes.

use std::sync::Arc;

use partyroom_game::{
    GameAction, GameError, GameOptions, GameRules, GameTimer, PassthroughMedia, Player,
    PrefixMedia, Recipient, Transition, TruthOrDare, VoterPolicy,
};
use partyroom_protocol::{
    Choice, ConnectionId, ProofStatus, ServerEvent, TurnPhase, Vote,
};

// =========================================================================
// Helpers
// =========================================================================

fn players(names: &[&str]) -> Vec<Player> {
    let mut players: Vec<Player> = names
        .iter()
        .enumerate()
        .map(|(i, n)| Player::new(*n, None, ConnectionId::new(i as u64 + 1)))
        .collect();
    if let Some(first) = players.first_mut() {
        first.is_host = true;
    }
    players
}

fn options(rounds: u32) -> GameOptions {
    GameOptions {
        seed: Some(42),
        ..GameOptions::default()
    }
    .with_rounds(rounds)
}

fn game(rounds: u32) -> TruthOrDare {
    TruthOrDare::new(options(rounds), Arc::new(PassthroughMedia))
}

/// Starts the game and fires the selection timer. Returns the pick.
fn start_and_select(g: &mut TruthOrDare, ps: &mut [Player]) -> String {
    g.start(ps);
    g.on_timer(GameTimer::Selection, ps);
    g.selected().expect("someone selected").to_string()
}

fn score(ps: &[Player], name: &str) -> i64 {
    ps.iter().find(|p| p.name == name).map(|p| p.score).unwrap()
}

fn player<'a>(ps: &'a [Player], name: &str) -> &'a Player {
    ps.iter().find(|p| p.name == name).unwrap()
}

fn events(t: &Transition) -> Vec<&'static str> {
    t.outputs.iter().map(|(_, e)| e.name()).collect()
}

fn arms(t: &Transition, timer: GameTimer) -> bool {
    t.timers.iter().any(|(armed, _)| *armed == timer)
}

fn other_than<'a>(ps: &'a [Player], name: &str) -> Vec<&'a str> {
    ps.iter()
        .map(|p| p.name.as_str())
        .filter(|n| *n != name)
        .collect()
}

// =========================================================================
// Selection and choice
// =========================================================================

#[test]
fn test_start_spins_then_offers_choice_privately() {
    let mut g = game(3);
    let mut ps = players(&["ana", "ben", "cy"]);

    let t = g.start(&mut ps);
    assert!(t.phase_changed);
    assert_eq!(events(&t), vec!["spin-started"]);
    assert!(arms(&t, GameTimer::Selection));
    assert_eq!(g.phase(), TurnPhase::Selecting);
    assert_eq!(g.round(), 1);

    let t = g.on_timer(GameTimer::Selection, &mut ps);
    let picked = g.selected().unwrap().to_string();
    assert_eq!(g.phase(), TurnPhase::AwaitingChoice);
    assert!(arms(&t, GameTimer::Choice));

    // Everyone sees who was picked; only the pick gets the options.
    let (to, _) = &t.outputs[1];
    assert_eq!(*to, Recipient::Player(picked.clone()));
    assert!(matches!(
        t.outputs[1].1,
        ServerEvent::ChooseTruthDare { ref options, .. } if options.len() == 2
    ));
    assert_eq!(t.outputs[0].0, Recipient::All);
    assert_eq!(g.private_events(&picked).len(), 1);
    assert!(g.private_events(other_than(&ps, &picked)[0]).is_empty());
}

#[test]
fn test_only_selected_player_can_choose() {
    let mut g = game(3);
    let mut ps = players(&["ana", "ben"]);
    let picked = start_and_select(&mut g, &mut ps);
    let other = other_than(&ps, &picked)[0].to_string();

    let err = g
        .handle(&other, GameAction::Choose(Choice::Dare), &mut ps)
        .unwrap_err();
    assert!(matches!(err, GameError::Forbidden(_)));
    assert_eq!(g.phase(), TurnPhase::AwaitingChoice);
}

#[test]
fn test_choice_timeout_picks_truth_automatically() {
    let mut g = game(3);
    let mut ps = players(&["ana", "ben"]);
    let picked = start_and_select(&mut g, &mut ps);

    let t = g.on_timer(GameTimer::Choice, &mut ps);
    assert_eq!(g.phase(), TurnPhase::AwaitingTruthAnswer);
    assert!(arms(&t, GameTimer::TruthAnswer));
    assert!(t.outputs.iter().any(|(_, e)| matches!(
        e,
        ServerEvent::TruthDareChosen { player, choice: Choice::Truth, automatic: true } if *player == picked
    )));
}

#[test]
fn test_no_connected_player_goes_idle_until_someone_connects() {
    let mut g = game(3);
    let mut ps = players(&["ana", "ben"]);
    g.start(&mut ps);
    for p in ps.iter_mut() {
        p.connected = false;
    }

    g.on_timer(GameTimer::Selection, &mut ps);
    assert_eq!(g.phase(), TurnPhase::Idle);
    assert!(g.is_idle());

    // Host spin with nobody connected is refused.
    let err = g.handle("ana", GameAction::Spin, &mut ps).unwrap_err();
    assert!(matches!(err, GameError::StateConflict(_)));

    ps[1].connected = true;
    let t = g.on_presence_changed("ben", true, &mut ps);
    assert_eq!(g.phase(), TurnPhase::Selecting);
    assert!(arms(&t, GameTimer::Selection));
    assert_eq!(g.round(), 1);
}

#[test]
fn test_spin_only_for_host_and_only_while_idle() {
    let mut g = game(3);
    let mut ps = players(&["ana", "ben"]);
    start_and_select(&mut g, &mut ps);

    let err = g.handle("ben", GameAction::Spin, &mut ps).unwrap_err();
    assert!(matches!(err, GameError::Forbidden(_)));
    let err = g.handle("ana", GameAction::Spin, &mut ps).unwrap_err();
    assert!(matches!(err, GameError::StateConflict(_)));
}

// =========================================================================
// Truth path and streaks
// =========================================================================

#[test]
fn test_truth_completion_scores_with_streak_bonus() {
    // A lone player is picked every round.
    let mut g = game(3);
    let mut ps = players(&["ana"]);
    start_and_select(&mut g, &mut ps);

    for (round, expected) in [(1, 25), (2, 25 + 30), (3, 25 + 30 + 35)] {
        assert_eq!(g.round(), round);
        g.handle("ana", GameAction::Choose(Choice::Truth), &mut ps)
            .unwrap();
        let t = g
            .handle(
                "ana",
                GameAction::CompleteTruth {
                    text: "I once ate cereal with orange juice".into(),
                },
                &mut ps,
            )
            .unwrap();
        assert!(t.round_completed);
        assert_eq!(score(&ps, "ana"), expected);

        if round < 3 {
            assert_eq!(g.phase(), TurnPhase::RoundComplete);
            g.on_timer(GameTimer::RoundAdvance, &mut ps);
            g.on_timer(GameTimer::Selection, &mut ps);
        } else {
            assert!(t.finished);
            assert!(g.is_finished());
        }
    }
    assert_eq!(g.streak("ana"), 3);
    assert_eq!(player(&ps, "ana").stats.truths_completed, 3);
    assert_eq!(player(&ps, "ana").stats.best_streak, 3);
    assert_eq!(player(&ps, "ana").stats.level(), 2);
}

#[test]
fn test_blank_truth_answer_is_rejected_without_changes() {
    let mut g = game(3);
    let mut ps = players(&["ana"]);
    start_and_select(&mut g, &mut ps);
    g.handle("ana", GameAction::Choose(Choice::Truth), &mut ps)
        .unwrap();

    let err = g
        .handle("ana", GameAction::CompleteTruth { text: "   ".into() }, &mut ps)
        .unwrap_err();
    assert!(matches!(err, GameError::Validation(_)));
    assert_eq!(score(&ps, "ana"), 0);
    assert_eq!(g.phase(), TurnPhase::AwaitingTruthAnswer);
}

#[test]
fn test_answer_timeout_is_a_missed_turn() {
    let mut g = game(3);
    let mut ps = players(&["ana"]);
    start_and_select(&mut g, &mut ps);
    g.handle("ana", GameAction::Choose(Choice::Truth), &mut ps)
        .unwrap();
    g.handle("ana", GameAction::CompleteTruth { text: "yes".into() }, &mut ps)
        .unwrap();
    assert_eq!(g.streak("ana"), 1);

    g.on_timer(GameTimer::RoundAdvance, &mut ps);
    g.on_timer(GameTimer::Selection, &mut ps);
    g.handle("ana", GameAction::Choose(Choice::Truth), &mut ps)
        .unwrap();
    let t = g.on_timer(GameTimer::TruthAnswer, &mut ps);

    assert!(events(&t).contains(&"turn-skipped"));
    assert_eq!(g.streak("ana"), 0);
    assert_eq!(player(&ps, "ana").stats.turns_missed, 1);
    assert_eq!(score(&ps, "ana"), 25);
    assert_eq!(g.phase(), TurnPhase::RoundComplete);
}

// =========================================================================
// Dare path and voting
// =========================================================================

#[test]
fn test_full_dare_round_with_majority_yes() {
    let mut g = game(1);
    let mut ps = players(&["ana", "ben", "cy"]);
    let picked = start_and_select(&mut g, &mut ps);
    let others = other_than(&ps, &picked)
        .into_iter()
        .map(String::from)
        .collect::<Vec<_>>();

    g.handle(&picked, GameAction::Choose(Choice::Dare), &mut ps)
        .unwrap();
    assert_eq!(g.phase(), TurnPhase::AwaitingDareProof);

    let t = g
        .handle(
            &picked,
            GameAction::SubmitProof {
                key: "uploads/proof.mp4".into(),
            },
            &mut ps,
        )
        .unwrap();
    assert_eq!(g.phase(), TurnPhase::AwaitingVote);
    assert!(arms(&t, GameTimer::Vote));
    assert_eq!(score(&ps, &picked), 25);

    g.handle(&others[0], GameAction::Vote(Vote::Yes), &mut ps)
        .unwrap();
    g.handle(&others[1], GameAction::Vote(Vote::Yes), &mut ps)
        .unwrap();
    // The performer votes too under the default policy; the last vote
    // closes the window early.
    let t = g
        .handle(&picked, GameAction::Vote(Vote::No), &mut ps)
        .unwrap();

    assert!(t.outputs.iter().any(|(_, e)| matches!(
        e,
        ServerEvent::ProofStatusUpdate { status: ProofStatus::Approved, .. }
    )));
    assert_eq!(score(&ps, &picked), 35);
    assert_eq!(player(&ps, &picked).stats.dares_approved, 1);
    assert!(t.finished);
    assert!(events(&t).contains(&"game-finished"));
}

#[test]
fn test_proof_is_accepted_once() {
    let mut g = game(3);
    let mut ps = players(&["ana", "ben", "cy"]);
    let picked = start_and_select(&mut g, &mut ps);
    g.handle(&picked, GameAction::Choose(Choice::Dare), &mut ps)
        .unwrap();
    g.handle(&picked, GameAction::SubmitProof { key: "a".into() }, &mut ps)
        .unwrap();

    let err = g
        .handle(&picked, GameAction::SubmitProof { key: "b".into() }, &mut ps)
        .unwrap_err();
    assert!(matches!(err, GameError::StateConflict(_)));
    assert_eq!(score(&ps, &picked), 25);
    assert_eq!(player(&ps, &picked).stats.dares_completed, 1);
}

#[test]
fn test_tied_vote_is_rejected() {
    let mut g = game(3);
    let mut ps = players(&["ana", "ben", "cy"]);
    let picked = start_and_select(&mut g, &mut ps);
    let others: Vec<String> = other_than(&ps, &picked).into_iter().map(String::from).collect();
    g.handle(&picked, GameAction::Choose(Choice::Dare), &mut ps)
        .unwrap();
    g.handle(&picked, GameAction::SubmitProof { key: "k".into() }, &mut ps)
        .unwrap();

    g.handle(&others[0], GameAction::Vote(Vote::Yes), &mut ps)
        .unwrap();
    g.handle(&others[1], GameAction::Vote(Vote::No), &mut ps)
        .unwrap();
    let t = g.on_timer(GameTimer::Vote, &mut ps);

    assert!(t.outputs.iter().any(|(_, e)| matches!(
        e,
        ServerEvent::ProofStatusUpdate { status: ProofStatus::Rejected, .. }
    )));
    assert_eq!(score(&ps, &picked), 20);
    assert_eq!(player(&ps, &picked).stats.dares_rejected, 1);
}

#[test]
fn test_vote_without_ballots_leaves_score_alone() {
    let mut g = game(3);
    let mut ps = players(&["ana", "ben"]);
    let picked = start_and_select(&mut g, &mut ps);
    g.handle(&picked, GameAction::Choose(Choice::Dare), &mut ps)
        .unwrap();
    g.handle(&picked, GameAction::SubmitProof { key: "k".into() }, &mut ps)
        .unwrap();

    let t = g.on_timer(GameTimer::Vote, &mut ps);
    assert!(t.outputs.iter().any(|(_, e)| matches!(
        e,
        ServerEvent::ProofStatusUpdate { status: ProofStatus::Unreviewed, .. }
    )));
    assert_eq!(score(&ps, &picked), 25);
}

#[test]
fn test_double_vote_is_a_conflict() {
    let mut g = game(3);
    let mut ps = players(&["ana", "ben", "cy"]);
    let picked = start_and_select(&mut g, &mut ps);
    let voter = other_than(&ps, &picked)[0].to_string();
    g.handle(&picked, GameAction::Choose(Choice::Dare), &mut ps)
        .unwrap();
    g.handle(&picked, GameAction::SubmitProof { key: "k".into() }, &mut ps)
        .unwrap();

    g.handle(&voter, GameAction::Vote(Vote::No), &mut ps).unwrap();
    let err = g
        .handle(&voter, GameAction::Vote(Vote::Yes), &mut ps)
        .unwrap_err();
    assert!(matches!(err, GameError::StateConflict(_)));
}

#[test]
fn test_exclude_performer_policy() {
    let opts = GameOptions {
        voters: VoterPolicy::ExcludePerformer,
        ..options(3)
    };
    let mut g = TruthOrDare::new(opts, Arc::new(PassthroughMedia));
    let mut ps = players(&["ana", "ben"]);
    let picked = start_and_select(&mut g, &mut ps);
    let voter = other_than(&ps, &picked)[0].to_string();
    g.handle(&picked, GameAction::Choose(Choice::Dare), &mut ps)
        .unwrap();
    g.handle(&picked, GameAction::SubmitProof { key: "k".into() }, &mut ps)
        .unwrap();

    let err = g
        .handle(&picked, GameAction::Vote(Vote::Yes), &mut ps)
        .unwrap_err();
    assert!(matches!(err, GameError::Forbidden(_)));

    // The only eligible voter closes the vote.
    g.handle(&voter, GameAction::Vote(Vote::Yes), &mut ps)
        .unwrap();
    assert_eq!(g.phase(), TurnPhase::RoundComplete);
    assert_eq!(score(&ps, &picked), 35);
}

#[test]
fn test_proof_without_eligible_voters_ends_round_at_once() {
    let opts = GameOptions {
        voters: VoterPolicy::ExcludePerformer,
        ..options(3)
    };
    let mut g = TruthOrDare::new(opts, Arc::new(PassthroughMedia));
    let mut ps = players(&["ana", "ben"]);
    let picked = start_and_select(&mut g, &mut ps);
    let other = other_than(&ps, &picked)[0].to_string();
    g.handle(&picked, GameAction::Choose(Choice::Dare), &mut ps)
        .unwrap();

    let idx = ps.iter().position(|p| p.name == other).unwrap();
    ps[idx].connected = false;
    g.on_presence_changed(&other, false, &mut ps);

    let t = g
        .handle(&picked, GameAction::SubmitProof { key: "k".into() }, &mut ps)
        .unwrap();
    assert_eq!(g.phase(), TurnPhase::RoundComplete);
    assert!(arms(&t, GameTimer::RoundAdvance));
    assert!(!arms(&t, GameTimer::Vote));
    assert_eq!(score(&ps, &picked), 25);
}

#[test]
fn test_voter_disconnect_closes_vote_when_rest_have_voted() {
    let mut g = game(3);
    let mut ps = players(&["ana", "ben", "cy"]);
    let picked = start_and_select(&mut g, &mut ps);
    let others: Vec<String> = other_than(&ps, &picked).into_iter().map(String::from).collect();
    g.handle(&picked, GameAction::Choose(Choice::Dare), &mut ps)
        .unwrap();
    g.handle(&picked, GameAction::SubmitProof { key: "k".into() }, &mut ps)
        .unwrap();
    g.handle(&picked, GameAction::Vote(Vote::Yes), &mut ps)
        .unwrap();
    g.handle(&others[0], GameAction::Vote(Vote::Yes), &mut ps)
        .unwrap();
    assert_eq!(g.phase(), TurnPhase::AwaitingVote);

    let idx = ps.iter().position(|p| p.name == others[1]).unwrap();
    ps[idx].connected = false;
    g.on_presence_changed(&others[1], false, &mut ps);
    assert_eq!(g.phase(), TurnPhase::RoundComplete);
}

#[test]
fn test_proof_url_comes_from_media_resolver() {
    let mut g = TruthOrDare::new(options(3), Arc::new(PrefixMedia::new("https://cdn.test/")));
    let mut ps = players(&["ana", "ben"]);
    let picked = start_and_select(&mut g, &mut ps);
    g.handle(&picked, GameAction::Choose(Choice::Dare), &mut ps)
        .unwrap();
    let t = g
        .handle(&picked, GameAction::SubmitProof { key: "p/1.jpg".into() }, &mut ps)
        .unwrap();

    assert!(t.outputs.iter().any(|(_, e)| matches!(
        e,
        ServerEvent::ProofStatusUpdate { proof_url: Some(url), .. } if url == "https://cdn.test/p/1.jpg"
    )));
}

// =========================================================================
// Custom prompts
// =========================================================================

#[test]
fn test_send_prompt_replaces_open_prompt() {
    let mut g = game(3);
    let mut ps = players(&["ana", "ben"]);
    let picked = start_and_select(&mut g, &mut ps);
    let other = other_than(&ps, &picked)[0].to_string();
    g.handle(&picked, GameAction::Choose(Choice::Dare), &mut ps)
        .unwrap();

    let err = g
        .handle(
            &other,
            GameAction::SendPrompt {
                prompt: "Tell a secret".into(),
                kind: Choice::Truth,
            },
            &mut ps,
        )
        .unwrap_err();
    assert!(matches!(err, GameError::Validation(_)));

    let err = g
        .handle(
            &picked,
            GameAction::SendPrompt {
                prompt: "Easy one".into(),
                kind: Choice::Dare,
            },
            &mut ps,
        )
        .unwrap_err();
    assert!(matches!(err, GameError::Forbidden(_)));

    let t = g
        .handle(
            &other,
            GameAction::SendPrompt {
                prompt: "Sing the alphabet backwards".into(),
                kind: Choice::Dare,
            },
            &mut ps,
        )
        .unwrap();
    assert!(!t.phase_changed);
    assert!(arms(&t, GameTimer::DareProof));
    assert!(t.outputs.iter().any(|(_, e)| matches!(
        e,
        ServerEvent::ReceivePrompt { custom: true, .. }
    )));
    assert!(g.private_events(&picked).iter().any(|e| matches!(
        e,
        ServerEvent::ReceivePrompt { prompt, .. } if prompt == "Sing the alphabet backwards"
    )));
}

// =========================================================================
// Rounds and removal
// =========================================================================

#[test]
fn test_next_round_is_host_only_and_advances_by_one() {
    let mut g = game(3);
    let mut ps = players(&["ana", "ben"]);
    let picked = start_and_select(&mut g, &mut ps);
    g.handle(&picked, GameAction::Choose(Choice::Truth), &mut ps)
        .unwrap();

    let err = g.handle("ana", GameAction::NextRound, &mut ps).unwrap_err();
    assert!(matches!(err, GameError::StateConflict(_)));

    g.handle(&picked, GameAction::CompleteTruth { text: "ok".into() }, &mut ps)
        .unwrap();
    let err = g.handle("ben", GameAction::NextRound, &mut ps).unwrap_err();
    assert!(matches!(err, GameError::Forbidden(_)));

    let t = g.handle("ana", GameAction::NextRound, &mut ps).unwrap();
    assert_eq!(g.round(), 2);
    assert_eq!(events(&t)[0], "round-reset");
    assert_eq!(g.phase(), TurnPhase::Selecting);

    // A late round-advance timer from the old phase does nothing.
    let t = g.on_timer(GameTimer::RoundAdvance, &mut ps);
    assert!(t.is_empty());
    assert_eq!(g.round(), 2);
}

#[test]
fn test_removing_selected_player_reselects_in_same_round() {
    let mut g = game(3);
    let mut ps = players(&["ana", "ben", "cy"]);
    let picked = start_and_select(&mut g, &mut ps);
    g.handle(&picked, GameAction::Choose(Choice::Dare), &mut ps)
        .unwrap();

    ps.retain(|p| p.name != picked);
    let t = g.on_player_removed(&picked, &mut ps);

    assert_eq!(events(&t), vec!["turn-skipped", "spin-started"]);
    assert!(t.phase_changed);
    assert_eq!(g.phase(), TurnPhase::Selecting);
    assert_eq!(g.round(), 1);

    g.on_timer(GameTimer::Selection, &mut ps);
    let next = g.selected().unwrap();
    assert_ne!(next, picked);
}

#[test]
fn test_answers_are_rejected_in_truth_or_dare() {
    let mut g = game(3);
    let mut ps = players(&["ana", "ben"]);
    start_and_select(&mut g, &mut ps);
    let err = g
        .handle("ana", GameAction::Answer("ben".into()), &mut ps)
        .unwrap_err();
    assert!(matches!(err, GameError::StateConflict(_)));
}
