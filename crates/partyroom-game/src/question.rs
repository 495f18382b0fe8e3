//! Question rounds shared by the most-likely and compatibility games.
//!
//! Each round asks one question to every connected player. The window
//! closes when all of them have answered or the question timer fires;
//! the results are revealed and, after a pause, the next round begins.

use std::collections::{BTreeMap, HashMap};

use partyroom_protocol::{GameView, QuestionPhase, ServerEvent};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, info};

use crate::player::{leaders, scoreboard};
use crate::prompts::{BUILTIN_COMPATIBILITY, BUILTIN_MOST_LIKELY, PromptDeck};
use crate::rules::{GameAction, GameRules, GameTimer, Transition, connected_names, find_mut, is_host};
use crate::{GameError, GameOptions, Player};

/// Which question game is being played.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionMode {
    /// Everyone names the player most likely to do something; the most
    /// named players score.
    MostLikely,
    /// Two players answer the same question; matching answers score for
    /// both.
    Compatibility,
}

pub struct QuestionGame {
    mode: QuestionMode,
    options: GameOptions,
    rng: StdRng,
    deck: PromptDeck,
    phase: QuestionPhase,
    round: u32,
    prompt: Option<String>,
    /// Answers of the open round, keyed by player.
    answers: BTreeMap<String, String>,
}

impl QuestionGame {
    pub fn new(mode: QuestionMode, options: GameOptions) -> Self {
        let rng = match options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let deck = match mode {
            QuestionMode::MostLikely => {
                PromptDeck::or_builtin(&options.most_likely_questions, BUILTIN_MOST_LIKELY)
            }
            QuestionMode::Compatibility => {
                PromptDeck::or_builtin(&options.compatibility_questions, BUILTIN_COMPATIBILITY)
            }
        };
        Self {
            mode,
            options,
            rng,
            deck,
            phase: QuestionPhase::Asking,
            round: 0,
            prompt: None,
            answers: BTreeMap::new(),
        }
    }

    pub fn mode(&self) -> QuestionMode {
        self.mode
    }

    pub fn phase(&self) -> QuestionPhase {
        self.phase
    }

    fn total_rounds(&self) -> u32 {
        self.options.total_rounds.max(1)
    }

    fn ask(&mut self, players: &[Player], t: &mut Transition) {
        let prompt = self.deck.draw(&mut self.rng).unwrap_or_default();
        self.phase = QuestionPhase::Asking;
        self.prompt = Some(prompt.clone());
        self.answers.clear();

        let candidates = match self.mode {
            QuestionMode::MostLikely => players.iter().map(|p| p.name.clone()).collect(),
            QuestionMode::Compatibility => Vec::new(),
        };
        t.enter_phase();
        t.to_all(ServerEvent::QuestionAsked {
            round: self.round,
            prompt,
            candidates,
            timeout_secs: self.options.timings.question_timeout_secs,
        });
        t.arm(GameTimer::Question, self.options.timings.question_timeout());
    }

    /// Reveals once every connected player has answered.
    fn maybe_reveal(&mut self, players: &mut [Player], t: &mut Transition) {
        if self.phase != QuestionPhase::Asking {
            return;
        }
        let expected = connected_names(players);
        if !expected.is_empty() && expected.iter().all(|n| self.answers.contains_key(n)) {
            self.reveal(players, t);
        }
    }

    fn reveal(&mut self, players: &mut [Player], t: &mut Transition) {
        let (winners, matched) = match self.mode {
            QuestionMode::MostLikely => (self.most_named(), None),
            QuestionMode::Compatibility => {
                let matched = self.answers_match();
                let winners = if matched {
                    self.answers.keys().cloned().collect()
                } else {
                    Vec::new()
                };
                (winners, Some(matched))
            }
        };

        let points = self.options.scoring.question_points;
        for name in &winners {
            if let Some(player) = find_mut(players, name) {
                player.score += points;
                player.stats.questions_won += 1;
            }
        }
        debug!(round = self.round, ?winners, "question revealed");

        self.phase = QuestionPhase::Revealed;
        t.enter_phase();
        t.round_completed = true;
        t.to_all(ServerEvent::RoundResult {
            round: self.round,
            answers: self.answers.clone(),
            winners,
            matched,
        });
        t.to_all(ServerEvent::ScoresUpdate {
            scores: scoreboard(players),
        });

        if self.round >= self.total_rounds() {
            self.phase = QuestionPhase::Finished;
            t.finished = true;
            let winners = leaders(players);
            info!(rounds = self.round, ?winners, "question game finished");
            t.to_all(ServerEvent::GameFinished {
                scores: scoreboard(players),
                winners,
            });
        } else {
            t.arm(
                GameTimer::RoundAdvance,
                self.options.timings.round_complete_delay(),
            );
        }
    }

    /// Players named most often; empty when nobody answered.
    fn most_named(&self) -> Vec<String> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for nominee in self.answers.values() {
            *counts.entry(nominee.as_str()).or_default() += 1;
        }
        let Some(top) = counts.values().copied().max() else {
            return Vec::new();
        };
        let mut winners: Vec<String> = counts
            .into_iter()
            .filter(|(_, n)| *n == top)
            .map(|(name, _)| name.to_string())
            .collect();
        winners.sort();
        winners
    }

    /// Exactly two answers, equal ignoring case and surrounding space.
    fn answers_match(&self) -> bool {
        let answers: Vec<String> = self
            .answers
            .values()
            .map(|a| a.trim().to_lowercase())
            .collect();
        answers.len() == 2 && answers[0] == answers[1]
    }

    fn advance(&mut self, players: &[Player], t: &mut Transition) {
        self.round += 1;
        t.to_all(ServerEvent::RoundReset { round: self.round });
        self.ask(players, t);
    }

    fn answer(
        &mut self,
        actor: &str,
        answer: String,
        players: &mut [Player],
    ) -> Result<Transition, GameError> {
        if self.phase != QuestionPhase::Asking {
            return Err(GameError::conflict("no question is open"));
        }
        if self.answers.contains_key(actor) {
            return Err(GameError::conflict("already answered"));
        }
        let answer = answer.trim();
        if answer.is_empty() {
            return Err(GameError::validation("answer must not be empty"));
        }
        let answer = match self.mode {
            QuestionMode::MostLikely => players
                .iter()
                .find(|p| p.name.eq_ignore_ascii_case(answer))
                .map(|p| p.name.clone())
                .ok_or_else(|| GameError::validation(format!("no player named {answer}")))?,
            QuestionMode::Compatibility => answer.to_string(),
        };

        self.answers.insert(actor.to_string(), answer);
        let mut t = Transition::none();
        t.to_all(ServerEvent::AnswerReceived {
            player: actor.to_string(),
            answered: self.answers.len(),
            expected: connected_names(players).len(),
        });
        self.maybe_reveal(players, &mut t);
        Ok(t)
    }
}

impl GameRules for QuestionGame {
    fn start(&mut self, players: &mut [Player]) -> Transition {
        self.round = 1;
        let mut t = Transition::none();
        self.ask(players, &mut t);
        t
    }

    fn handle(
        &mut self,
        actor: &str,
        action: GameAction,
        players: &mut [Player],
    ) -> Result<Transition, GameError> {
        match action {
            GameAction::Answer(answer) => self.answer(actor, answer, players),
            GameAction::NextRound => {
                if !is_host(players, actor) {
                    return Err(GameError::forbidden("only the host can start the next round"));
                }
                if self.phase != QuestionPhase::Revealed {
                    return Err(GameError::conflict("the round is not over"));
                }
                let mut t = Transition::none();
                self.advance(players, &mut t);
                Ok(t)
            }
            GameAction::Spin
            | GameAction::Choose(_)
            | GameAction::SendPrompt { .. }
            | GameAction::CompleteTruth { .. }
            | GameAction::SubmitProof { .. }
            | GameAction::Vote(_) => Err(GameError::conflict(
                "this action belongs to truth or dare",
            )),
        }
    }

    fn on_timer(&mut self, timer: GameTimer, players: &mut [Player]) -> Transition {
        let mut t = Transition::none();
        match (timer, self.phase) {
            (GameTimer::Question, QuestionPhase::Asking) => self.reveal(players, &mut t),
            (GameTimer::RoundAdvance, QuestionPhase::Revealed) => self.advance(players, &mut t),
            (timer, phase) => debug!(?timer, ?phase, "timer outside its phase ignored"),
        }
        t
    }

    fn on_player_removed(&mut self, name: &str, players: &mut [Player]) -> Transition {
        let mut t = Transition::none();
        self.answers.remove(name);
        self.maybe_reveal(players, &mut t);
        t
    }

    fn on_presence_changed(
        &mut self,
        _name: &str,
        connected: bool,
        players: &mut [Player],
    ) -> Transition {
        let mut t = Transition::none();
        if !connected {
            self.maybe_reveal(players, &mut t);
        }
        t
    }

    fn private_events(&self, _name: &str) -> Vec<ServerEvent> {
        Vec::new()
    }

    fn view(&self) -> GameView {
        let phase = self.phase;
        let round = self.round;
        let total_rounds = self.total_rounds();
        let prompt = self.prompt.clone();
        let answered = self.answers.keys().cloned().collect();
        match self.mode {
            QuestionMode::MostLikely => GameView::MostLikely {
                phase,
                round,
                total_rounds,
                prompt,
                answered,
            },
            QuestionMode::Compatibility => GameView::Compatibility {
                phase,
                round,
                total_rounds,
                prompt,
                answered,
            },
        }
    }

    fn round(&self) -> u32 {
        self.round
    }

    fn is_finished(&self) -> bool {
        self.phase == QuestionPhase::Finished
    }
}
