//! Truth-or-dare turn machine.
//!
//! ```text
//! Idle ─spin/connect─▶ Selecting ─▶ AwaitingChoice ─┬─▶ AwaitingTruthAnswer ─┐
//!                          ▲                         └─▶ AwaitingDareProof ─▶ AwaitingVote
//!                          │                                                   │
//!                          └──────────── RoundComplete ◀─────────────────────┘
//!                                              │
//!                                              ▼
//!                                          Finished
//! ```
//!
//! Every window has a timer. An expired choice picks truth; an expired
//! answer or proof window counts as a missed turn; an expired vote closes
//! with whatever was cast.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use partyroom_protocol::{
    Choice, GameView, ProofStatus, ServerEvent, TurnPhase, Vote, VoteTally,
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use tracing::{debug, info};

use crate::player::{leaders, scoreboard};
use crate::prompts::{BUILTIN_DARES, BUILTIN_TRUTHS, PromptDeck};
use crate::rules::{
    GameAction, GameRules, GameTimer, Transition, connected_names, find, find_mut, is_host,
};
use crate::{GameError, GameOptions, MediaResolver, Player, VoterPolicy};

#[derive(Debug, Clone, PartialEq, Eq)]
struct ActivePrompt {
    text: String,
    kind: Choice,
    custom: bool,
}

/// State of a truth-or-dare game.
pub struct TruthOrDare {
    options: GameOptions,
    media: Arc<dyn MediaResolver>,
    rng: StdRng,
    phase: TurnPhase,
    round: u32,
    selected: Option<String>,
    /// Last pick, avoided by the next selection when possible.
    previous: Option<String>,
    choice: Option<Choice>,
    prompt: Option<ActivePrompt>,
    /// Set once per turn; a second proof is refused.
    proof_url: Option<String>,
    votes: BTreeMap<String, Vote>,
    streaks: HashMap<String, u32>,
    truths: PromptDeck,
    dares: PromptDeck,
}

impl TruthOrDare {
    pub fn new(options: GameOptions, media: Arc<dyn MediaResolver>) -> Self {
        let rng = match options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            truths: PromptDeck::or_builtin(&options.truths, BUILTIN_TRUTHS),
            dares: PromptDeck::or_builtin(&options.dares, BUILTIN_DARES),
            options,
            media,
            rng,
            phase: TurnPhase::Idle,
            round: 0,
            selected: None,
            previous: None,
            choice: None,
            prompt: None,
            proof_url: None,
            votes: BTreeMap::new(),
            streaks: HashMap::new(),
        }
    }

    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Consecutive completed turns of `name`.
    pub fn streak(&self, name: &str) -> u32 {
        self.streaks.get(name).copied().unwrap_or(0)
    }

    fn total_rounds(&self) -> u32 {
        self.options.total_rounds.max(1)
    }

    fn is_selected(&self, name: &str) -> bool {
        self.selected.as_deref() == Some(name)
    }

    fn clear_turn(&mut self) {
        self.selected = None;
        self.choice = None;
        self.prompt = None;
        self.proof_url = None;
        self.votes.clear();
    }

    // -- Selection ----------------------------------------------------------

    fn begin_selection(&mut self, players: &[Player], t: &mut Transition) {
        self.clear_turn();
        if connected_names(players).is_empty() {
            self.enter_idle(t);
            return;
        }
        self.phase = TurnPhase::Selecting;
        t.enter_phase();
        t.to_all(ServerEvent::SpinStarted {
            round: self.round,
            delay_ms: self.options.timings.selection_delay_ms,
        });
        t.arm(GameTimer::Selection, self.options.timings.selection_delay());
    }

    fn enter_idle(&mut self, t: &mut Transition) {
        if self.phase != TurnPhase::Idle {
            debug!(round = self.round, "no connected player, truth-or-dare idle");
            self.phase = TurnPhase::Idle;
            t.enter_phase();
        }
    }

    fn select(&mut self, players: &[Player], t: &mut Transition) {
        let mut candidates = connected_names(players);
        if let Some(prev) = &self.previous {
            if candidates.len() >= 2 {
                candidates.retain(|name| name != prev);
            }
        }
        let Some(pick) = candidates.choose(&mut self.rng).cloned() else {
            self.enter_idle(t);
            return;
        };

        debug!(player = %pick, round = self.round, "player selected");
        self.selected = Some(pick.clone());
        self.previous = Some(pick.clone());
        self.phase = TurnPhase::AwaitingChoice;
        t.enter_phase();
        t.to_all(ServerEvent::PlayerSelected {
            player: pick.clone(),
            round: self.round,
        });
        t.to_player(pick, self.choice_offer());
        t.arm(GameTimer::Choice, self.options.timings.choice_timeout());
    }

    fn choice_offer(&self) -> ServerEvent {
        ServerEvent::ChooseTruthDare {
            round: self.round,
            options: vec![Choice::Truth, Choice::Dare],
            timeout_secs: self.options.timings.choice_timeout_secs,
        }
    }

    // -- Choice and prompt --------------------------------------------------

    fn window(&self, choice: Choice) -> (TurnPhase, GameTimer, Duration) {
        let timings = &self.options.timings;
        match choice {
            Choice::Truth => (
                TurnPhase::AwaitingTruthAnswer,
                GameTimer::TruthAnswer,
                timings.truth_timeout(),
            ),
            Choice::Dare => (
                TurnPhase::AwaitingDareProof,
                GameTimer::DareProof,
                timings.proof_timeout(),
            ),
        }
    }

    fn apply_choice(
        &mut self,
        player: String,
        choice: Choice,
        automatic: bool,
        t: &mut Transition,
    ) {
        let text = match choice {
            Choice::Truth => self.truths.draw(&mut self.rng),
            Choice::Dare => self.dares.draw(&mut self.rng),
        }
        .unwrap_or_default();
        let (phase, timer, window) = self.window(choice);

        self.choice = Some(choice);
        self.prompt = Some(ActivePrompt {
            text: text.clone(),
            kind: choice,
            custom: false,
        });
        self.phase = phase;
        t.enter_phase();
        t.to_all(ServerEvent::TruthDareChosen {
            player: player.clone(),
            choice,
            automatic,
        });
        t.to_all(ServerEvent::ReceivePrompt {
            player,
            prompt: text,
            kind: choice,
            custom: false,
            timeout_secs: window.as_secs(),
        });
        t.arm(timer, window);
    }

    // -- Scoring ------------------------------------------------------------

    fn award_completion(
        &mut self,
        name: &str,
        choice: Choice,
        players: &mut [Player],
        t: &mut Transition,
    ) {
        let scoring = self.options.scoring;
        let streak = self.streak(name);
        let points = scoring.base_points + scoring.streak_bonus(streak);
        let next = streak + 1;
        self.streaks.insert(name.to_string(), next);

        if let Some(player) = find_mut(players, name) {
            player.score += points;
            match choice {
                Choice::Truth => player.stats.truths_completed += 1,
                Choice::Dare => player.stats.dares_completed += 1,
            }
            player.stats.best_streak = player.stats.best_streak.max(next);
        }
        debug!(player = %name, points, streak = next, "turn completed");

        t.to_all(ServerEvent::ScoresUpdate {
            scores: scoreboard(players),
        });
        self.push_stats(name, players, t);
    }

    fn miss_turn(&mut self, name: &str, players: &mut [Player], t: &mut Transition) {
        self.streaks.insert(name.to_string(), 0);
        if let Some(player) = find_mut(players, name) {
            player.stats.turns_missed += 1;
        }
        self.push_stats(name, players, t);
    }

    fn push_stats(&self, name: &str, players: &[Player], t: &mut Transition) {
        if let Some(player) = find(players, name) {
            t.to_all(ServerEvent::PlayerStatsUpdate {
                player: name.to_string(),
                stats: player.stats.clone(),
                streak: self.streak(name),
                level: player.stats.level(),
            });
        }
    }

    // -- Voting -------------------------------------------------------------

    fn eligible_voters(&self, players: &[Player]) -> Vec<String> {
        players
            .iter()
            .filter(|p| p.connected)
            .filter(|p| match self.options.voters {
                VoterPolicy::Everyone => true,
                VoterPolicy::ExcludePerformer => !self.is_selected(&p.name),
            })
            .map(|p| p.name.clone())
            .collect()
    }

    fn tally(&self, players: &[Player]) -> VoteTally {
        VoteTally {
            yes: self.votes.values().filter(|v| **v == Vote::Yes).count(),
            no: self.votes.values().filter(|v| **v == Vote::No).count(),
            eligible: self.eligible_voters(players).len(),
        }
    }

    /// Closes the vote once every eligible connected voter has voted.
    fn maybe_close_vote(&mut self, players: &mut [Player], t: &mut Transition) {
        if self.phase != TurnPhase::AwaitingVote {
            return;
        }
        let all_voted = self
            .eligible_voters(players)
            .iter()
            .all(|name| self.votes.contains_key(name));
        if all_voted {
            self.close_vote(players, t);
        }
    }

    /// Settles the proof. A majority of "yes" adds the vote bonus; a
    /// majority of "no", or a tie, subtracts the penalty. A vote where
    /// nobody voted is not a tie: the proof stays unreviewed and the
    /// score is left alone.
    fn close_vote(&mut self, players: &mut [Player], t: &mut Transition) {
        let tally = self.tally(players);
        let performer = self.selected.clone().unwrap_or_default();
        let scoring = self.options.scoring;

        let status = if tally.yes + tally.no == 0 {
            ProofStatus::Unreviewed
        } else if tally.yes > tally.no {
            ProofStatus::Approved
        } else {
            ProofStatus::Rejected
        };

        if let Some(player) = find_mut(players, &performer) {
            match status {
                ProofStatus::Approved => {
                    player.score += scoring.vote_bonus;
                    player.stats.dares_approved += 1;
                }
                ProofStatus::Rejected => {
                    player.score -= scoring.vote_penalty;
                    player.stats.dares_rejected += 1;
                }
                _ => {}
            }
        }
        debug!(player = %performer, ?status, yes = tally.yes, no = tally.no, "vote closed");

        t.to_all(ServerEvent::ProofStatusUpdate {
            player: performer.clone(),
            status,
            proof_url: self.proof_url.clone(),
            tally: Some(tally),
            timeout_secs: None,
        });
        if status != ProofStatus::Unreviewed {
            t.to_all(ServerEvent::ScoresUpdate {
                scores: scoreboard(players),
            });
            self.push_stats(&performer, players, t);
        }
        self.complete_round(players, t);
    }

    // -- Rounds -------------------------------------------------------------

    fn complete_round(&mut self, players: &[Player], t: &mut Transition) {
        t.round_completed = true;
        t.enter_phase();
        if self.round >= self.total_rounds() {
            self.phase = TurnPhase::Finished;
            t.finished = true;
            let winners = leaders(players);
            info!(rounds = self.round, ?winners, "truth-or-dare finished");
            t.to_all(ServerEvent::GameFinished {
                scores: scoreboard(players),
                winners,
            });
        } else {
            self.phase = TurnPhase::RoundComplete;
            t.arm(
                GameTimer::RoundAdvance,
                self.options.timings.round_complete_delay(),
            );
        }
    }

    fn advance_round(&mut self, players: &[Player], t: &mut Transition) {
        self.round += 1;
        t.to_all(ServerEvent::RoundReset { round: self.round });
        self.begin_selection(players, t);
    }

    // -- Action handlers ----------------------------------------------------

    fn require_selected(&self, actor: &str, what: &str) -> Result<(), GameError> {
        if self.is_selected(actor) {
            Ok(())
        } else {
            Err(GameError::forbidden(format!(
                "only the selected player can {what}"
            )))
        }
    }

    fn send_prompt(
        &mut self,
        actor: &str,
        prompt: String,
        kind: Choice,
        players: &[Player],
    ) -> Result<Transition, GameError> {
        if !matches!(
            self.phase,
            TurnPhase::AwaitingTruthAnswer | TurnPhase::AwaitingDareProof
        ) {
            return Err(GameError::conflict("no prompt is open"));
        }
        if self.is_selected(actor) {
            return Err(GameError::forbidden(
                "the selected player cannot set their own prompt",
            ));
        }
        if !find(players, actor).is_some_and(|p| p.connected) {
            return Err(GameError::forbidden("only connected players can send prompts"));
        }
        let text = prompt.trim();
        if text.is_empty() {
            return Err(GameError::validation("prompt must not be empty"));
        }
        let Some(current) = self.choice else {
            return Err(GameError::conflict("no prompt is open"));
        };
        if kind != current {
            return Err(GameError::validation(format!("prompt type must be {current}")));
        }

        let player = self.selected.clone().unwrap_or_default();
        let (_, timer, window) = self.window(current);
        self.prompt = Some(ActivePrompt {
            text: text.to_string(),
            kind,
            custom: true,
        });

        let mut t = Transition::none();
        t.to_all(ServerEvent::ReceivePrompt {
            player,
            prompt: text.to_string(),
            kind,
            custom: true,
            timeout_secs: window.as_secs(),
        });
        // A new prompt gets a full window.
        t.arm(timer, window);
        Ok(t)
    }

    fn complete_truth(
        &mut self,
        actor: &str,
        text: String,
        players: &mut [Player],
    ) -> Result<Transition, GameError> {
        if self.phase != TurnPhase::AwaitingTruthAnswer {
            return Err(GameError::conflict("no truth answer is expected"));
        }
        self.require_selected(actor, "answer the truth")?;
        let answer = text.trim();
        if answer.is_empty() {
            return Err(GameError::validation("answer must not be empty"));
        }

        let mut t = Transition::none();
        t.to_all(ServerEvent::TruthAnswered {
            player: actor.to_string(),
            answer: answer.to_string(),
        });
        self.award_completion(actor, Choice::Truth, players, &mut t);
        self.complete_round(players, &mut t);
        Ok(t)
    }

    fn submit_proof(
        &mut self,
        actor: &str,
        key: String,
        players: &mut [Player],
    ) -> Result<Transition, GameError> {
        if self.proof_url.is_some() {
            return Err(GameError::conflict("proof already submitted for this round"));
        }
        if self.phase != TurnPhase::AwaitingDareProof {
            return Err(GameError::conflict("no dare proof is expected"));
        }
        self.require_selected(actor, "submit the dare proof")?;
        let key = key.trim();
        if key.is_empty() {
            return Err(GameError::validation("proof key must not be empty"));
        }
        let url = self
            .media
            .resolve(key)
            .ok_or_else(|| GameError::validation("proof key could not be resolved"))?;

        self.proof_url = Some(url.clone());
        self.phase = TurnPhase::AwaitingVote;

        let mut t = Transition::none();
        t.enter_phase();
        t.to_all(ServerEvent::ProofStatusUpdate {
            player: actor.to_string(),
            status: ProofStatus::Submitted,
            proof_url: Some(url),
            tally: Some(self.tally(players)),
            timeout_secs: Some(self.options.timings.vote_timeout_secs),
        });
        self.award_completion(actor, Choice::Dare, players, &mut t);
        // With nobody able to vote the round ends right here.
        self.maybe_close_vote(players, &mut t);
        if self.phase == TurnPhase::AwaitingVote {
            t.arm(GameTimer::Vote, self.options.timings.vote_timeout());
        }
        Ok(t)
    }

    fn vote(
        &mut self,
        actor: &str,
        vote: Vote,
        players: &mut [Player],
    ) -> Result<Transition, GameError> {
        if self.phase != TurnPhase::AwaitingVote {
            return Err(GameError::conflict("no vote is open"));
        }
        if !self.eligible_voters(players).iter().any(|n| n == actor) {
            return Err(GameError::forbidden("not eligible to vote on this proof"));
        }
        if self.votes.contains_key(actor) {
            return Err(GameError::conflict("already voted"));
        }

        self.votes.insert(actor.to_string(), vote);
        let mut t = Transition::none();
        t.to_all(ServerEvent::ProofStatusUpdate {
            player: self.selected.clone().unwrap_or_default(),
            status: ProofStatus::Voting,
            proof_url: self.proof_url.clone(),
            tally: Some(self.tally(players)),
            timeout_secs: None,
        });
        self.maybe_close_vote(players, &mut t);
        Ok(t)
    }
}

impl GameRules for TruthOrDare {
    fn start(&mut self, players: &mut [Player]) -> Transition {
        self.round = 1;
        self.previous = None;
        self.streaks.clear();
        let mut t = Transition::none();
        self.begin_selection(players, &mut t);
        t
    }

    fn handle(
        &mut self,
        actor: &str,
        action: GameAction,
        players: &mut [Player],
    ) -> Result<Transition, GameError> {
        match action {
            GameAction::Spin => {
                if !is_host(players, actor) {
                    return Err(GameError::forbidden("only the host can spin"));
                }
                if self.phase != TurnPhase::Idle {
                    return Err(GameError::conflict("a turn is already in progress"));
                }
                if connected_names(players).is_empty() {
                    return Err(GameError::conflict("no connected player can take a turn"));
                }
                let mut t = Transition::none();
                self.begin_selection(players, &mut t);
                Ok(t)
            }
            GameAction::Choose(choice) => {
                if self.phase != TurnPhase::AwaitingChoice {
                    return Err(GameError::conflict("not waiting for a truth-or-dare choice"));
                }
                self.require_selected(actor, "choose")?;
                let mut t = Transition::none();
                self.apply_choice(actor.to_string(), choice, false, &mut t);
                Ok(t)
            }
            GameAction::SendPrompt { prompt, kind } => self.send_prompt(actor, prompt, kind, players),
            GameAction::CompleteTruth { text } => self.complete_truth(actor, text, players),
            GameAction::SubmitProof { key } => self.submit_proof(actor, key, players),
            GameAction::Vote(vote) => self.vote(actor, vote, players),
            GameAction::Answer(_) => Err(GameError::conflict(
                "answers are not part of truth or dare",
            )),
            GameAction::NextRound => {
                if !is_host(players, actor) {
                    return Err(GameError::forbidden("only the host can start the next round"));
                }
                if self.phase != TurnPhase::RoundComplete {
                    return Err(GameError::conflict("the round is not over"));
                }
                let mut t = Transition::none();
                self.advance_round(players, &mut t);
                Ok(t)
            }
        }
    }

    fn on_timer(&mut self, timer: GameTimer, players: &mut [Player]) -> Transition {
        let mut t = Transition::none();
        match (timer, self.phase) {
            (GameTimer::Selection, TurnPhase::Selecting) => self.select(players, &mut t),
            (GameTimer::Choice, TurnPhase::AwaitingChoice) => {
                let player = self.selected.clone().unwrap_or_default();
                self.apply_choice(player, Choice::Truth, true, &mut t);
            }
            (GameTimer::TruthAnswer, TurnPhase::AwaitingTruthAnswer) => {
                let player = self.selected.clone().unwrap_or_default();
                t.to_all(ServerEvent::TurnSkipped {
                    player: player.clone(),
                    reason: "answer window expired".into(),
                });
                self.miss_turn(&player, players, &mut t);
                self.complete_round(players, &mut t);
            }
            (GameTimer::DareProof, TurnPhase::AwaitingDareProof) => {
                let player = self.selected.clone().unwrap_or_default();
                t.to_all(ServerEvent::ProofStatusUpdate {
                    player: player.clone(),
                    status: ProofStatus::Missed,
                    proof_url: None,
                    tally: None,
                    timeout_secs: None,
                });
                self.miss_turn(&player, players, &mut t);
                self.complete_round(players, &mut t);
            }
            (GameTimer::Vote, TurnPhase::AwaitingVote) => self.close_vote(players, &mut t),
            (GameTimer::RoundAdvance, TurnPhase::RoundComplete) => {
                self.advance_round(players, &mut t);
            }
            (timer, phase) => debug!(?timer, ?phase, "timer outside its phase ignored"),
        }
        t
    }

    fn on_player_removed(&mut self, name: &str, players: &mut [Player]) -> Transition {
        let mut t = Transition::none();
        self.votes.remove(name);
        self.streaks.remove(name);
        if self.previous.as_deref() == Some(name) {
            self.previous = None;
        }

        let turn_open = matches!(
            self.phase,
            TurnPhase::AwaitingChoice | TurnPhase::AwaitingTruthAnswer | TurnPhase::AwaitingDareProof
        );
        if self.is_selected(name) && turn_open {
            t.to_all(ServerEvent::TurnSkipped {
                player: name.to_string(),
                reason: "player left".into(),
            });
            self.begin_selection(players, &mut t);
        } else {
            self.maybe_close_vote(players, &mut t);
        }
        t
    }

    fn on_presence_changed(
        &mut self,
        _name: &str,
        connected: bool,
        players: &mut [Player],
    ) -> Transition {
        let mut t = Transition::none();
        if connected {
            if self.phase == TurnPhase::Idle && self.round > 0 {
                self.begin_selection(players, &mut t);
            }
        } else {
            self.maybe_close_vote(players, &mut t);
        }
        t
    }

    fn private_events(&self, name: &str) -> Vec<ServerEvent> {
        if !self.is_selected(name) {
            return Vec::new();
        }
        match (self.phase, &self.prompt) {
            (TurnPhase::AwaitingChoice, _) => vec![self.choice_offer()],
            (TurnPhase::AwaitingTruthAnswer | TurnPhase::AwaitingDareProof, Some(prompt)) => {
                let (_, _, window) = self.window(prompt.kind);
                vec![ServerEvent::ReceivePrompt {
                    player: name.to_string(),
                    prompt: prompt.text.clone(),
                    kind: prompt.kind,
                    custom: prompt.custom,
                    timeout_secs: window.as_secs(),
                }]
            }
            _ => Vec::new(),
        }
    }

    fn view(&self) -> GameView {
        GameView::TruthOrDare {
            phase: self.phase,
            round: self.round,
            total_rounds: self.total_rounds(),
            selected: self.selected.clone(),
            choice: self.choice,
            prompt: self.prompt.as_ref().map(|p| p.text.clone()),
            proof_submitted: self.proof_url.is_some(),
            votes_cast: self.votes.len(),
        }
    }

    fn round(&self) -> u32 {
        self.round
    }

    fn is_finished(&self) -> bool {
        self.phase == TurnPhase::Finished
    }

    fn is_idle(&self) -> bool {
        self.phase == TurnPhase::Idle && self.round > 0
    }
}
