//! Server → client events and the views they carry.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{Choice, ErrorKind, GameKind, RoomCode, RoomStatus};

// ---------------------------------------------------------------------------
// Views
// ---------------------------------------------------------------------------

/// One row of the roster as clients see it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSummary {
    pub name: String,
    pub connected: bool,
    pub is_host: bool,
    pub score: i64,
}

/// A player's score, in roster order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreEntry {
    pub player: String,
    pub score: i64,
}

/// Lifetime counters for a player within one room.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStats {
    pub truths_completed: u32,
    pub dares_completed: u32,
    pub dares_approved: u32,
    pub dares_rejected: u32,
    pub turns_missed: u32,
    pub best_streak: u32,
    pub questions_won: u32,
}

impl PlayerStats {
    /// Level grows by one every three completed turns.
    pub fn level(&self) -> u32 {
        1 + (self.truths_completed + self.dares_completed) / 3
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatKind {
    Text,
    System,
}

/// A chat line. `timestamp` is unix milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: u64,
    pub sender: String,
    pub text: String,
    pub timestamp: u64,
    pub kind: ChatKind,
}

/// Where a truth-or-dare turn currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TurnPhase {
    Idle,
    Selecting,
    AwaitingChoice,
    AwaitingTruthAnswer,
    AwaitingDareProof,
    AwaitingVote,
    RoundComplete,
    Finished,
}

impl TurnPhase {
    /// `true` while a player-facing window (choice, answer, proof, vote)
    /// is open.
    pub fn is_awaiting(self) -> bool {
        matches!(
            self,
            Self::AwaitingChoice
                | Self::AwaitingTruthAnswer
                | Self::AwaitingDareProof
                | Self::AwaitingVote
        )
    }
}

/// Where a question round (most-likely, compatibility) currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuestionPhase {
    Asking,
    Revealed,
    Finished,
}

/// Public part of the running game, as included in a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "game", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum GameView {
    TruthOrDare {
        phase: TurnPhase,
        round: u32,
        total_rounds: u32,
        selected: Option<String>,
        choice: Option<Choice>,
        prompt: Option<String>,
        proof_submitted: bool,
        votes_cast: usize,
    },
    MostLikely {
        phase: QuestionPhase,
        round: u32,
        total_rounds: u32,
        prompt: Option<String>,
        answered: Vec<String>,
    },
    Compatibility {
        phase: QuestionPhase,
        round: u32,
        total_rounds: u32,
        prompt: Option<String>,
        answered: Vec<String>,
    },
}

/// Everything a (re)joining connection needs to render the room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSnapshot {
    pub room_id: RoomCode,
    pub game_type: GameKind,
    pub status: RoomStatus,
    pub host: Option<String>,
    pub players: Vec<PlayerSummary>,
    pub game: Option<GameView>,
}

/// State of a dare proof as it moves through voting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProofStatus {
    /// Proof received; voting opens.
    Submitted,
    /// The proof window closed without a proof.
    Missed,
    /// A vote was cast; carries the running tally.
    Voting,
    Approved,
    Rejected,
    /// Voting closed with no votes cast.
    Unreviewed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteTally {
    pub yes: usize,
    pub no: usize,
    pub eligible: usize,
}

// ---------------------------------------------------------------------------
// ServerEvent
// ---------------------------------------------------------------------------

/// Every event the server emits, tagged like [`ClientCommand`](crate::ClientCommand):
/// `{"event": "scores-update", "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum ServerEvent {
    RoomCreated {
        room_id: RoomCode,
        game_type: GameKind,
        host: String,
    },
    /// Unicast to the joining connection.
    RoomJoined {
        room_id: RoomCode,
        player: String,
        reconnected: bool,
        snapshot: RoomSnapshot,
    },
    UpdatePlayers {
        players: Vec<PlayerSummary>,
        host: Option<String>,
    },
    GameStarted {
        game_type: GameKind,
        total_rounds: u32,
    },
    /// Selection animation begins; a pick follows after `delay_ms`.
    SpinStarted {
        round: u32,
        delay_ms: u64,
    },
    PlayerSelected {
        player: String,
        round: u32,
    },
    /// Unicast to the selected player only.
    ChooseTruthDare {
        round: u32,
        options: Vec<Choice>,
        timeout_secs: u64,
    },
    TruthDareChosen {
        player: String,
        choice: Choice,
        /// `true` when the choice window expired and truth was picked.
        automatic: bool,
    },
    ReceivePrompt {
        player: String,
        prompt: String,
        #[serde(rename = "type")]
        kind: Choice,
        custom: bool,
        timeout_secs: u64,
    },
    TruthAnswered {
        player: String,
        answer: String,
    },
    ProofStatusUpdate {
        player: String,
        status: ProofStatus,
        proof_url: Option<String>,
        tally: Option<VoteTally>,
        timeout_secs: Option<u64>,
    },
    TurnSkipped {
        player: String,
        reason: String,
    },
    ScoresUpdate {
        scores: Vec<ScoreEntry>,
    },
    PlayerStatsUpdate {
        player: String,
        stats: PlayerStats,
        streak: u32,
        level: u32,
    },
    RoundReset {
        round: u32,
    },
    QuestionAsked {
        round: u32,
        prompt: String,
        candidates: Vec<String>,
        timeout_secs: u64,
    },
    AnswerReceived {
        player: String,
        answered: usize,
        expected: usize,
    },
    RoundResult {
        round: u32,
        answers: BTreeMap<String, String>,
        winners: Vec<String>,
        matched: Option<bool>,
    },
    GameFinished {
        scores: Vec<ScoreEntry>,
        winners: Vec<String>,
    },
    /// Unicast on join.
    ChatHistory {
        messages: Vec<ChatMessage>,
    },
    NewChatMessage {
        message: ChatMessage,
    },
    PlayerKicked {
        player: String,
    },
    PromotedToHost {
        player: String,
    },
    Error {
        kind: ErrorKind,
        message: String,
    },
    Pong,
}

impl ServerEvent {
    /// Wire name of the event, for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::RoomCreated { .. } => "room-created",
            Self::RoomJoined { .. } => "room-joined",
            Self::UpdatePlayers { .. } => "update-players",
            Self::GameStarted { .. } => "game-started",
            Self::SpinStarted { .. } => "spin-started",
            Self::PlayerSelected { .. } => "player-selected",
            Self::ChooseTruthDare { .. } => "choose-truth-dare",
            Self::TruthDareChosen { .. } => "truth-dare-chosen",
            Self::ReceivePrompt { .. } => "receive-prompt",
            Self::TruthAnswered { .. } => "truth-answered",
            Self::ProofStatusUpdate { .. } => "proof-status-update",
            Self::TurnSkipped { .. } => "turn-skipped",
            Self::ScoresUpdate { .. } => "scores-update",
            Self::PlayerStatsUpdate { .. } => "player-stats-update",
            Self::RoundReset { .. } => "round-reset",
            Self::QuestionAsked { .. } => "question-asked",
            Self::AnswerReceived { .. } => "answer-received",
            Self::RoundResult { .. } => "round-result",
            Self::GameFinished { .. } => "game-finished",
            Self::ChatHistory { .. } => "chat-history",
            Self::NewChatMessage { .. } => "new-chat-message",
            Self::PlayerKicked { .. } => "player-kicked",
            Self::PromotedToHost { .. } => "promoted-to-host",
            Self::Error { .. } => "error",
            Self::Pong => "pong",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_receive_prompt_json_shape() {
        let event = ServerEvent::ReceivePrompt {
            player: "ana".into(),
            prompt: "Do ten push-ups".into(),
            kind: Choice::Dare,
            custom: false,
            timeout_secs: 60,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "receive-prompt");
        assert_eq!(json["data"]["type"], "Dare");
        assert_eq!(json["data"]["timeoutSecs"], 60);
        assert_eq!(event.name(), "receive-prompt");
    }

    #[test]
    fn test_pong_serializes_without_data() {
        let json = serde_json::to_value(ServerEvent::Pong).unwrap();
        assert_eq!(json["event"], "pong");
        assert!(json.get("data").is_none());
    }

    #[test]
    fn test_error_event_carries_kind() {
        let json = serde_json::to_value(ServerEvent::Error {
            kind: ErrorKind::Authorization,
            message: "only the host can kick players".into(),
        })
        .unwrap();
        assert_eq!(json["data"]["kind"], "authorization");
    }

    #[test]
    fn test_game_view_is_internally_tagged() {
        let view = GameView::TruthOrDare {
            phase: TurnPhase::AwaitingVote,
            round: 2,
            total_rounds: 3,
            selected: Some("ben".into()),
            choice: Some(Choice::Dare),
            prompt: None,
            proof_submitted: true,
            votes_cast: 1,
        };
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["game"], "truth-or-dare");
        assert_eq!(json["phase"], "awaiting-vote");
        assert_eq!(json["proofSubmitted"], true);
    }

    #[test]
    fn test_player_stats_level() {
        let mut stats = PlayerStats::default();
        assert_eq!(stats.level(), 1);
        stats.truths_completed = 2;
        stats.dares_completed = 4;
        assert_eq!(stats.level(), 3);
    }

    #[test]
    fn test_turn_phase_awaiting_windows() {
        assert!(TurnPhase::AwaitingChoice.is_awaiting());
        assert!(TurnPhase::AwaitingVote.is_awaiting());
        assert!(!TurnPhase::Selecting.is_awaiting());
        assert!(!TurnPhase::RoundComplete.is_awaiting());
    }
}
