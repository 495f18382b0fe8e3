//! The contract between a room and the game it runs.
//!
//! A game never talks to connections or clocks directly. Every call
//! returns a [`Transition`]: the events to deliver, the timers to arm,
//! and flags the room uses to bump its generation, persist a
//! snapshot, or mark itself completed.

use std::time::Duration;

use partyroom_protocol::{Choice, GameView, ServerEvent, Vote};

use crate::{GameError, Player};

/// Who receives an outbound event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipient {
    /// Every member of the room.
    All,
    /// One player, by name.
    Player(String),
}

/// Timers a game can ask the room to run.
///
/// At most one of each is pending; arming one again replaces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameTimer {
    /// Spin animation before a player is picked.
    Selection,
    Choice,
    TruthAnswer,
    DareProof,
    Vote,
    /// Pause between rounds.
    RoundAdvance,
    /// Answer window of a question round.
    Question,
}

/// What a game wants done after handling an input.
///
/// When `phase_changed` is set the room bumps its generation and drops
/// every pending game timer *before* applying `timers`, so a transition
/// only needs to arm the timer of the phase it entered.
#[derive(Debug, Default)]
pub struct Transition {
    pub outputs: Vec<(Recipient, ServerEvent)>,
    /// Timers to arm, each firing after its delay.
    pub timers: Vec<(GameTimer, Duration)>,
    pub phase_changed: bool,
    /// A round just ended. The room persists a snapshot.
    pub round_completed: bool,
    /// The last round ended. The room becomes completed.
    pub finished: bool,
}

impl Transition {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn to_all(&mut self, event: ServerEvent) {
        self.outputs.push((Recipient::All, event));
    }

    pub fn to_player(&mut self, name: impl Into<String>, event: ServerEvent) {
        self.outputs.push((Recipient::Player(name.into()), event));
    }

    pub fn arm(&mut self, timer: GameTimer, after: Duration) {
        self.timers.push((timer, after));
    }

    /// Marks that the game entered a new phase.
    pub fn enter_phase(&mut self) {
        self.phase_changed = true;
    }

    /// Appends `other`, keeping output order.
    pub fn merge(&mut self, other: Transition) {
        self.outputs.extend(other.outputs);
        self.timers.extend(other.timers);
        self.phase_changed |= other.phase_changed;
        self.round_completed |= other.round_completed;
        self.finished |= other.finished;
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty() && self.timers.is_empty() && !self.phase_changed
    }
}

/// A player input, already attributed to a roster member by the room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameAction {
    /// Host: resume selection while idle.
    Spin,
    Choose(Choice),
    SendPrompt { prompt: String, kind: Choice },
    CompleteTruth { text: String },
    SubmitProof { key: String },
    Vote(Vote),
    Answer(String),
    /// Host: skip the pause between rounds.
    NextRound,
}

/// Rules of one party game.
///
/// `players` is the room roster in join order. Games may change scores
/// and stats but never add, remove, or reorder players. Every method
/// that returns `Err` must leave the game untouched.
pub trait GameRules: Send {
    /// Sets up round 1.
    fn start(&mut self, players: &mut [Player]) -> Transition;

    /// Applies an input from `actor`.
    ///
    /// # Errors
    /// Returns a [`GameError`] when the action is malformed, not allowed
    /// for `actor`, or not valid in the current phase.
    fn handle(
        &mut self,
        actor: &str,
        action: GameAction,
        players: &mut [Player],
    ) -> Result<Transition, GameError>;

    /// A timer armed for the current generation fired.
    fn on_timer(&mut self, timer: GameTimer, players: &mut [Player]) -> Transition;

    /// `name` has already been taken out of `players`.
    fn on_player_removed(&mut self, name: &str, players: &mut [Player]) -> Transition;

    /// `name` connected or disconnected but keeps its seat.
    fn on_presence_changed(&mut self, name: &str, connected: bool, players: &mut [Player])
    -> Transition;

    /// Events only `name` may see that it is currently owed, re-sent when
    /// it rejoins.
    fn private_events(&self, name: &str) -> Vec<ServerEvent>;

    fn view(&self) -> GameView;

    fn round(&self) -> u32;

    fn is_finished(&self) -> bool;

    /// `true` while the game waits for someone able to take a turn.
    fn is_idle(&self) -> bool {
        false
    }
}

pub(crate) fn find_mut<'a>(players: &'a mut [Player], name: &str) -> Option<&'a mut Player> {
    players.iter_mut().find(|p| p.name == name)
}

pub(crate) fn find<'a>(players: &'a [Player], name: &str) -> Option<&'a Player> {
    players.iter().find(|p| p.name == name)
}

pub(crate) fn is_host(players: &[Player], name: &str) -> bool {
    find(players, name).is_some_and(|p| p.is_host)
}

pub(crate) fn connected_names(players: &[Player]) -> Vec<String> {
    players
        .iter()
        .filter(|p| p.connected)
        .map(|p| p.name.clone())
        .collect()
}
