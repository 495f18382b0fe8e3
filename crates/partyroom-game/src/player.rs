//! Players and the scoreboard helpers game machines share.

use partyroom_protocol::{ConnectionId, PlayerStats, PlayerSummary, ScoreEntry};
use serde::{Deserialize, Serialize};

/// A seat in a room.
///
/// Disconnecting does not remove the seat: `connected` flips to `false`
/// and the room keeps score and stats until the reconnect grace period
/// runs out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    /// Display name, unique within the room.
    pub name: String,
    /// Persistent identity from an outside account system, when known.
    pub external_id: Option<String>,
    /// Current connection. Never persisted.
    #[serde(skip)]
    pub connection: Option<ConnectionId>,
    pub connected: bool,
    pub is_host: bool,
    /// May go negative.
    pub score: i64,
    pub stats: PlayerStats,
}

impl Player {
    /// A freshly joined, connected player.
    pub fn new(name: impl Into<String>, external_id: Option<String>, conn: ConnectionId) -> Self {
        Self {
            name: name.into(),
            external_id,
            connection: Some(conn),
            connected: true,
            is_host: false,
            score: 0,
            stats: PlayerStats::default(),
        }
    }

    pub fn summary(&self) -> PlayerSummary {
        PlayerSummary {
            name: self.name.clone(),
            connected: self.connected,
            is_host: self.is_host,
            score: self.score,
        }
    }
}

/// Scores in roster order.
pub fn scoreboard(players: &[Player]) -> Vec<ScoreEntry> {
    players
        .iter()
        .map(|p| ScoreEntry {
            player: p.name.clone(),
            score: p.score,
        })
        .collect()
}

/// Names of everyone sharing the top score. Empty for an empty roster.
pub fn leaders(players: &[Player]) -> Vec<String> {
    let Some(top) = players.iter().map(|p| p.score).max() else {
        return Vec::new();
    };
    players
        .iter()
        .filter(|p| p.score == top)
        .map(|p| p.name.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(name: &str, score: i64) -> Player {
        let mut p = Player::new(name, None, ConnectionId::new(1));
        p.score = score;
        p
    }

    #[test]
    fn test_leaders_returns_all_tied_players() {
        let players = vec![player("ana", 30), player("ben", 35), player("cy", 35)];
        assert_eq!(leaders(&players), vec!["ben".to_string(), "cy".to_string()]);
        assert!(leaders(&[]).is_empty());
    }

    #[test]
    fn test_scoreboard_keeps_roster_order_and_negatives() {
        let players = vec![player("ana", -5), player("ben", 10)];
        let board = scoreboard(&players);
        assert_eq!(board[0].player, "ana");
        assert_eq!(board[0].score, -5);
        assert_eq!(board[1].score, 10);
    }

    #[test]
    fn test_connection_is_not_persisted() {
        let json = serde_json::to_string(&player("ana", 1)).unwrap();
        let back: Player = serde_json::from_str(&json).unwrap();
        assert_eq!(back.connection, None);
        assert_eq!(back.name, "ana");
    }
}
