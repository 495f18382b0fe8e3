//! Scenario tests for the most-likely and compatibility games.

use partyroom_game::{
    GameAction, GameError, GameOptions, GameRules, GameTimer, Player, QuestionGame, QuestionMode,
};
use partyroom_protocol::{ConnectionId, QuestionPhase, ServerEvent};

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

fn game(mode: QuestionMode, rounds: u32) -> QuestionGame {
    let options = GameOptions {
        seed: Some(5),
        most_likely_questions: vec!["Who is most likely to sleep in?".into()],
        compatibility_questions: vec!["Favourite colour?".into()],
        ..GameOptions::default()
    }
    .with_rounds(rounds);
    QuestionGame::new(mode, options)
}

fn score(ps: &[Player], name: &str) -> i64 {
    ps.iter().find(|p| p.name == name).map(|p| p.score).unwrap()
}

fn answer(g: &mut QuestionGame, ps: &mut [Player], who: &str, text: &str) -> partyroom_game::Transition {
    g.handle(who, GameAction::Answer(text.into()), ps).unwrap()
}

#[test]
fn test_most_likely_round_awards_most_named() {
    let mut g = game(QuestionMode::MostLikely, 2);
    let mut ps = players(&["ana", "ben", "cy"]);

    let t = g.start(&mut ps);
    assert!(matches!(
        &t.outputs[0].1,
        ServerEvent::QuestionAsked { prompt, candidates, .. }
            if prompt == "Who is most likely to sleep in?" && candidates.len() == 3
    ));

    answer(&mut g, &mut ps, "ana", "ben");
    answer(&mut g, &mut ps, "ben", "cy");
    let t = answer(&mut g, &mut ps, "cy", "ben");

    assert!(t.round_completed);
    assert!(!t.finished);
    assert_eq!(g.phase(), QuestionPhase::Revealed);
    assert!(t.outputs.iter().any(|(_, e)| matches!(
        e,
        ServerEvent::RoundResult { winners, matched: None, .. } if winners == &["ben".to_string()]
    )));
    assert_eq!(score(&ps, "ben"), 10);
    assert_eq!(score(&ps, "ana"), 0);
    assert_eq!(ps[1].stats.questions_won, 1);
}

#[test]
fn test_question_timer_reveals_partial_answers() {
    let mut g = game(QuestionMode::MostLikely, 1);
    let mut ps = players(&["ana", "ben", "cy"]);
    g.start(&mut ps);
    answer(&mut g, &mut ps, "ana", "cy");

    let t = g.on_timer(GameTimer::Question, &mut ps);
    assert!(t.finished);
    assert!(g.is_finished());
    assert_eq!(score(&ps, "cy"), 10);
    assert!(t.outputs.iter().any(|(_, e)| e.name() == "game-finished"));
}

#[test]
fn test_duplicate_answer_is_a_conflict() {
    let mut g = game(QuestionMode::MostLikely, 1);
    let mut ps = players(&["ana", "ben", "cy"]);
    g.start(&mut ps);
    answer(&mut g, &mut ps, "ana", "cy");

    let err = g
        .handle("ana", GameAction::Answer("ben".into()), &mut ps)
        .unwrap_err();
    assert!(matches!(err, GameError::StateConflict(_)));
}

#[test]
fn test_compatibility_match_scores_both() {
    let mut g = game(QuestionMode::Compatibility, 1);
    let mut ps = players(&["ana", "ben"]);
    g.start(&mut ps);

    answer(&mut g, &mut ps, "ana", "Blue");
    let t = answer(&mut g, &mut ps, "ben", " blue ");

    assert!(t.outputs.iter().any(|(_, e)| matches!(
        e,
        ServerEvent::RoundResult { matched: Some(true), .. }
    )));
    assert_eq!(score(&ps, "ana"), 10);
    assert_eq!(score(&ps, "ben"), 10);
}

#[test]
fn test_compatibility_mismatch_scores_nobody() {
    let mut g = game(QuestionMode::Compatibility, 2);
    let mut ps = players(&["ana", "ben"]);
    g.start(&mut ps);

    answer(&mut g, &mut ps, "ana", "red");
    let t = answer(&mut g, &mut ps, "ben", "green");

    assert!(t.outputs.iter().any(|(_, e)| matches!(
        e,
        ServerEvent::RoundResult { matched: Some(false), winners, .. } if winners.is_empty()
    )));
    assert_eq!(score(&ps, "ana"), 0);

    // Host skips the pause; the round advances by exactly one.
    let t = g.handle("ana", GameAction::NextRound, &mut ps).unwrap();
    assert_eq!(g.round(), 2);
    assert_eq!(t.outputs[0].1, ServerEvent::RoundReset { round: 2 });
    assert_eq!(g.phase(), QuestionPhase::Asking);
}

#[test]
fn test_leaving_player_no_longer_blocks_reveal() {
    let mut g = game(QuestionMode::MostLikely, 3);
    let mut ps = players(&["ana", "ben", "cy"]);
    g.start(&mut ps);
    answer(&mut g, &mut ps, "ana", "ben");
    answer(&mut g, &mut ps, "ben", "ana");

    ps.retain(|p| p.name != "cy");
    let t = g.on_player_removed("cy", &mut ps);
    assert!(t.round_completed);
    assert_eq!(g.phase(), QuestionPhase::Revealed);
}

#[test]
fn test_truth_or_dare_actions_are_refused() {
    let mut g = game(QuestionMode::Compatibility, 1);
    let mut ps = players(&["ana", "ben"]);
    g.start(&mut ps);
    let err = g.handle("ana", GameAction::Spin, &mut ps).unwrap_err();
    assert!(matches!(err, GameError::StateConflict(_)));
}
