//! Error types for the room layer.

use partyroom_game::GameError;
use partyroom_protocol::{ErrorKind, GameKind, RoomCode};

/// Errors that can occur during room operations.
///
/// A failed command never changes room state. The gateway reports the
/// error to the sender only, using [`RoomError::kind`].
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// The room does not exist.
    #[error("room {0} not found")]
    NotFound(RoomCode),

    /// The room is full.
    #[error("room {0} is full")]
    RoomFull(RoomCode),

    /// Another connected player already uses this name.
    #[error("name {0} is already taken")]
    NameTaken(String),

    /// The connection already holds another seat in this room.
    #[error("this connection is already seated as {0}")]
    AlreadySeated(String),

    /// Too few connected players for the game type.
    #[error("{kind} needs at least {need} connected players")]
    NotEnoughPlayers { kind: GameKind, need: usize },

    /// No player with this name is seated in the room.
    #[error("no player named {0} in this room")]
    UnknownPlayer(String),

    /// Blank or malformed input.
    #[error("{0}")]
    Validation(String),

    /// The sender is not allowed to do this (not host, acting for
    /// someone else, ...).
    #[error("{0}")]
    NotAllowed(String),

    /// The connection is not seated in this room.
    #[error("not a member of room {0}")]
    NotInRoom(RoomCode),

    /// The room is in a state that doesn't allow this operation.
    #[error("invalid room state: {0}")]
    InvalidState(String),

    /// The room's mailbox is closed; it is shutting down.
    #[error("room {0} is unavailable")]
    Unavailable(RoomCode),

    /// Every generated room code collided with a live room.
    #[error("could not allocate a room code after {0} attempts")]
    CodeExhausted(usize),

    /// The running game refused the action.
    #[error(transparent)]
    Game(#[from] GameError),
}

impl RoomError {
    /// Category reported to clients.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) | Self::Unavailable(_) | Self::UnknownPlayer(_) => {
                ErrorKind::NotFound
            }
            Self::RoomFull(_) | Self::NotEnoughPlayers { .. } => ErrorKind::Capacity,
            Self::NameTaken(_) | Self::AlreadySeated(_) | Self::Validation(_) => {
                ErrorKind::Validation
            }
            Self::NotAllowed(_) | Self::NotInRoom(_) => ErrorKind::Authorization,
            Self::InvalidState(_) => ErrorKind::StateConflict,
            Self::CodeExhausted(_) => ErrorKind::Infrastructure,
            Self::Game(GameError::Validation(_)) => ErrorKind::Validation,
            Self::Game(GameError::Forbidden(_)) => ErrorKind::Authorization,
            Self::Game(GameError::StateConflict(_)) => ErrorKind::StateConflict,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code() -> RoomCode {
        RoomCode::parse("ABC234").unwrap()
    }

    #[test]
    fn test_kinds() {
        assert_eq!(RoomError::Unavailable(code()).kind(), ErrorKind::NotFound);
        assert_eq!(RoomError::RoomFull(code()).kind(), ErrorKind::Capacity);
        let short = RoomError::NotEnoughPlayers {
            kind: GameKind::MostLikely,
            need: 3,
        };
        assert_eq!(short.kind(), ErrorKind::Capacity);
        assert_eq!(RoomError::UnknownPlayer("zed".into()).kind(), ErrorKind::NotFound);
        assert_eq!(RoomError::AlreadySeated("ana".into()).kind(), ErrorKind::Validation);
        assert_eq!(RoomError::NotInRoom(code()).kind(), ErrorKind::Authorization);
        assert_eq!(RoomError::CodeExhausted(3).kind(), ErrorKind::Infrastructure);
        assert_eq!(
            RoomError::from(GameError::Forbidden("no".into())).kind(),
            ErrorKind::Authorization
        );
    }

    #[test]
    fn test_game_error_message_passes_through() {
        let err = RoomError::from(GameError::StateConflict("no vote is open".into()));
        assert_eq!(err.to_string(), "no vote is open");
    }
}
