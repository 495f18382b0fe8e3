//! The game a room is running, as one tagged value.

use std::sync::Arc;

use partyroom_protocol::{GameKind, GameView, ServerEvent};

use crate::question::{QuestionGame, QuestionMode};
use crate::rules::{GameAction, GameRules, GameTimer, Transition};
use crate::truth_or_dare::TruthOrDare;
use crate::{GameError, GameOptions, MediaResolver, Player};

/// Seats a game type needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerLimits {
    /// Connected players required to start.
    pub min: usize,
    /// Seats in the room.
    pub max: usize,
}

/// Seat limits per game type.
pub fn limits(kind: GameKind) -> PlayerLimits {
    match kind {
        GameKind::TruthOrDare => PlayerLimits { min: 2, max: 12 },
        GameKind::MostLikely => PlayerLimits { min: 3, max: 12 },
        GameKind::Compatibility => PlayerLimits { min: 2, max: 2 },
    }
}

/// Per-room game state.
pub enum GameState {
    TruthOrDare(TruthOrDare),
    MostLikely(QuestionGame),
    Compatibility(QuestionGame),
}

impl GameState {
    pub fn new(kind: GameKind, options: GameOptions, media: Arc<dyn MediaResolver>) -> Self {
        match kind {
            GameKind::TruthOrDare => Self::TruthOrDare(TruthOrDare::new(options, media)),
            GameKind::MostLikely => {
                Self::MostLikely(QuestionGame::new(QuestionMode::MostLikely, options))
            }
            GameKind::Compatibility => {
                Self::Compatibility(QuestionGame::new(QuestionMode::Compatibility, options))
            }
        }
    }

    pub fn kind(&self) -> GameKind {
        match self {
            Self::TruthOrDare(_) => GameKind::TruthOrDare,
            Self::MostLikely(_) => GameKind::MostLikely,
            Self::Compatibility(_) => GameKind::Compatibility,
        }
    }

    fn rules(&self) -> &dyn GameRules {
        match self {
            Self::TruthOrDare(g) => g,
            Self::MostLikely(g) | Self::Compatibility(g) => g,
        }
    }

    fn rules_mut(&mut self) -> &mut dyn GameRules {
        match self {
            Self::TruthOrDare(g) => g,
            Self::MostLikely(g) | Self::Compatibility(g) => g,
        }
    }
}

impl GameRules for GameState {
    fn start(&mut self, players: &mut [Player]) -> Transition {
        self.rules_mut().start(players)
    }

    fn handle(
        &mut self,
        actor: &str,
        action: GameAction,
        players: &mut [Player],
    ) -> Result<Transition, GameError> {
        self.rules_mut().handle(actor, action, players)
    }

    fn on_timer(&mut self, timer: GameTimer, players: &mut [Player]) -> Transition {
        self.rules_mut().on_timer(timer, players)
    }

    fn on_player_removed(&mut self, name: &str, players: &mut [Player]) -> Transition {
        self.rules_mut().on_player_removed(name, players)
    }

    fn on_presence_changed(
        &mut self,
        name: &str,
        connected: bool,
        players: &mut [Player],
    ) -> Transition {
        self.rules_mut().on_presence_changed(name, connected, players)
    }

    fn private_events(&self, name: &str) -> Vec<ServerEvent> {
        self.rules().private_events(name)
    }

    fn view(&self) -> GameView {
        self.rules().view()
    }

    fn round(&self) -> u32 {
        self.rules().round()
    }

    fn is_finished(&self) -> bool {
        self.rules().is_finished()
    }

    fn is_idle(&self) -> bool {
        self.rules().is_idle()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PassthroughMedia;

    #[test]
    fn test_limits_per_game() {
        assert_eq!(limits(GameKind::TruthOrDare), PlayerLimits { min: 2, max: 12 });
        assert_eq!(limits(GameKind::MostLikely).min, 3);
        assert_eq!(limits(GameKind::Compatibility), PlayerLimits { min: 2, max: 2 });
    }

    #[test]
    fn test_state_reports_its_kind_and_view() {
        for kind in [GameKind::TruthOrDare, GameKind::MostLikely, GameKind::Compatibility] {
            let state = GameState::new(kind, GameOptions::default(), Arc::new(PassthroughMedia));
            assert_eq!(state.kind(), kind);
            assert_eq!(state.round(), 0);
            assert!(!state.is_finished());
        }
    }
}
