//! Client → server commands.

use serde::{Deserialize, Serialize};

use crate::{Choice, GameKind, RoomCode, Vote};

/// Every command a client can send.
///
/// On the wire a command is adjacently tagged:
///
/// ```text
/// {"event": "join-room", "data": {"roomId": "AB12CD", "player": "ana"}}
/// {"event": "ping"}
/// ```
///
/// The gateway matches this enum exhaustively, so adding a command
/// without routing it is a compile error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum ClientCommand {
    /// Open a new room and take its host seat.
    CreateRoom {
        player: String,
        #[serde(default)]
        player_id: Option<String>,
        game_type: GameKind,
        /// Overrides the configured number of rounds.
        #[serde(default)]
        rounds: Option<u32>,
    },
    /// Join, or rejoin, an existing room.
    JoinRoom {
        room_id: RoomCode,
        player: String,
        #[serde(default)]
        player_id: Option<String>,
    },
    LeaveRoom {
        room_id: RoomCode,
    },
    /// Host only.
    StartGame {
        room_id: RoomCode,
    },
    /// Host only: resume selection while the game sits idle.
    SpinPlayer {
        room_id: RoomCode,
    },
    SubmitTruthDare {
        room_id: RoomCode,
        choice: Choice,
    },
    /// Replace the open prompt with a custom one.
    SendPrompt {
        room_id: RoomCode,
        prompt: String,
        #[serde(rename = "type")]
        kind: Choice,
    },
    ProofUploaded {
        room_id: RoomCode,
        player: String,
        proof_key: String,
    },
    TruthCompleted {
        room_id: RoomCode,
        player: String,
        text: String,
    },
    SubmitVote {
        room_id: RoomCode,
        voter: String,
        vote: Vote,
    },
    /// Answer the open question in most-likely / compatibility rooms.
    SubmitAnswer {
        room_id: RoomCode,
        answer: String,
    },
    /// Host only: skip the pause between rounds.
    NextRound {
        room_id: RoomCode,
    },
    /// Host only.
    KickPlayer {
        room_id: RoomCode,
        player_name: String,
    },
    SendChat {
        room_id: RoomCode,
        message: String,
    },
    Ping,
}

impl ClientCommand {
    /// The room a command targets, if any.
    pub fn room_id(&self) -> Option<&RoomCode> {
        match self {
            Self::CreateRoom { .. } | Self::Ping => None,
            Self::JoinRoom { room_id, .. }
            | Self::LeaveRoom { room_id }
            | Self::StartGame { room_id }
            | Self::SpinPlayer { room_id }
            | Self::SubmitTruthDare { room_id, .. }
            | Self::SendPrompt { room_id, .. }
            | Self::ProofUploaded { room_id, .. }
            | Self::TruthCompleted { room_id, .. }
            | Self::SubmitVote { room_id, .. }
            | Self::SubmitAnswer { room_id, .. }
            | Self::NextRound { room_id }
            | Self::KickPlayer { room_id, .. }
            | Self::SendChat { room_id, .. } => Some(room_id),
        }
    }

    /// Wire name of the command, for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateRoom { .. } => "create-room",
            Self::JoinRoom { .. } => "join-room",
            Self::LeaveRoom { .. } => "leave-room",
            Self::StartGame { .. } => "start-game",
            Self::SpinPlayer { .. } => "spin-player",
            Self::SubmitTruthDare { .. } => "submit-truth-dare",
            Self::SendPrompt { .. } => "send-prompt",
            Self::ProofUploaded { .. } => "proof-uploaded",
            Self::TruthCompleted { .. } => "truth-completed",
            Self::SubmitVote { .. } => "submit-vote",
            Self::SubmitAnswer { .. } => "submit-answer",
            Self::NextRound { .. } => "next-round",
            Self::KickPlayer { .. } => "kick-player",
            Self::SendChat { .. } => "send-chat",
            Self::Ping => "ping",
        }
    }
}
