//! Identity and enumeration types shared by commands, events and rooms.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// RoomCode
// ---------------------------------------------------------------------------

/// The short shareable code that identifies a room.
///
/// Codes are uppercase ASCII alphanumerics. Anything coming off the wire
/// goes through [`RoomCode::parse`] (via `try_from`), so `"ab12cd"` and
/// `"AB12CD"` name the same room.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoomCode(String);

impl RoomCode {
    /// Length of generated codes.
    pub const LEN: usize = 6;

    /// Longest code accepted on input.
    pub const MAX_LEN: usize = 16;

    /// Characters used when generating codes. No `0/O` or `1/I`.
    pub const ALPHABET: &'static [u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

    /// Normalises and validates a code typed by a user.
    pub fn parse(raw: &str) -> Result<Self, ProtocolError> {
        let code = raw.trim().to_ascii_uppercase();
        if code.is_empty() {
            return Err(ProtocolError::InvalidMessage("room code is blank".into()));
        }
        if code.len() > Self::MAX_LEN || !code.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(ProtocolError::InvalidMessage(format!(
                "malformed room code: {raw:?}"
            )));
        }
        Ok(Self(code))
    }

    /// The code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RoomCode {
    type Error = ProtocolError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RoomCode> for String {
    fn from(code: RoomCode) -> Self {
        code.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Game and room enums
// ---------------------------------------------------------------------------

/// Which party game a room plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GameKind {
    #[serde(alias = "truthOrDare", alias = "truth_or_dare")]
    TruthOrDare,
    #[serde(alias = "mostLikely", alias = "most_likely")]
    MostLikely,
    Compatibility,
}

impl fmt::Display for GameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TruthOrDare => f.write_str("truth-or-dare"),
            Self::MostLikely => f.write_str("most-likely"),
            Self::Compatibility => f.write_str("compatibility"),
        }
    }
}

/// The selected player's pick, and the type of a prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Choice {
    #[serde(alias = "truth", alias = "TRUTH")]
    Truth,
    #[serde(alias = "dare", alias = "DARE")]
    Dare,
}

impl fmt::Display for Choice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Truth => f.write_str("Truth"),
            Self::Dare => f.write_str("Dare"),
        }
    }
}

/// A verdict on a submitted dare proof.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vote {
    #[serde(alias = "Yes")]
    Yes,
    #[serde(alias = "No")]
    No,
}

/// Room lifecycle status as shown to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomStatus {
    /// Lobby: players gather, host may start.
    Waiting,
    /// A game is running.
    Playing,
    /// A game is running but no player can take a turn.
    Paused,
    /// The game reached its last round.
    Completed,
}

impl fmt::Display for RoomStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Waiting => f.write_str("waiting"),
            Self::Playing => f.write_str("playing"),
            Self::Paused => f.write_str("paused"),
            Self::Completed => f.write_str("completed"),
        }
    }
}

/// Category of a rejected command, carried by the `error` event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    Validation,
    NotFound,
    Capacity,
    Authorization,
    StateConflict,
    Infrastructure,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_code_parse_normalises_case_and_whitespace() {
        let code = RoomCode::parse("  ab12cd ").unwrap();
        assert_eq!(code.as_str(), "AB12CD");
    }

    #[test]
    fn test_room_code_parse_rejects_blank_and_symbols() {
        assert!(RoomCode::parse("   ").is_err());
        assert!(RoomCode::parse("AB-12").is_err());
        assert!(RoomCode::parse(&"A".repeat(RoomCode::MAX_LEN + 1)).is_err());
    }

    #[test]
    fn test_room_code_deserializes_through_parse() {
        let code: RoomCode = serde_json::from_str("\"xyz789\"").unwrap();
        assert_eq!(code.to_string(), "XYZ789");
        assert!(serde_json::from_str::<RoomCode>("\"no way\"").is_err());
    }

    #[test]
    fn test_game_kind_accepts_aliases() {
        let kind: GameKind = serde_json::from_str("\"truthOrDare\"").unwrap();
        assert_eq!(kind, GameKind::TruthOrDare);
        assert_eq!(
            serde_json::to_string(&GameKind::MostLikely).unwrap(),
            "\"most-likely\""
        );
    }

    #[test]
    fn test_choice_and_vote_wire_names() {
        assert_eq!(serde_json::to_string(&Choice::Dare).unwrap(), "\"Dare\"");
        let c: Choice = serde_json::from_str("\"truth\"").unwrap();
        assert_eq!(c, Choice::Truth);
        let v: Vote = serde_json::from_str("\"Yes\"").unwrap();
        assert_eq!(v, Vote::Yes);
        assert_eq!(serde_json::to_string(&Vote::No).unwrap(), "\"no\"");
    }

    #[test]
    fn test_error_kind_is_kebab_case() {
        assert_eq!(
            serde_json::to_string(&ErrorKind::StateConflict).unwrap(),
            "\"state-conflict\""
        );
    }
}
