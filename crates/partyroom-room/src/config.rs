//! Room settings.

use std::time::Duration;

use partyroom_game::GameOptions;
use serde::{Deserialize, Serialize};

/// How a joining player is matched against an existing seat.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IdentityMode {
    /// The display name is the identity.
    #[default]
    Name,
    /// The client-supplied `playerId` is the identity; names are still
    /// unique but may not be used to reclaim a seat.
    ExternalId,
}

/// Settings shared by every room of a registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomConfig {
    pub identity: IdentityMode,

    /// How long a disconnected player keeps their seat.
    pub reconnect_grace_secs: u64,

    /// Rooms idle for longer than this are reclaimed by the reaper.
    pub room_ttl_secs: u64,

    /// How often the reaper looks for idle rooms.
    pub reap_interval_secs: u64,

    /// Chat lines kept per room; the oldest are evicted first.
    pub chat_capacity: usize,

    /// Longest chat message accepted, in characters.
    pub max_chat_len: usize,

    /// Longest display name accepted, in characters.
    pub max_name_len: usize,

    /// Bounded mailbox size of each room actor.
    pub mailbox_size: usize,

    /// Random room codes tried before giving up.
    pub code_attempts: usize,

    /// Defaults for every game started in a room.
    pub game: GameOptions,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            identity: IdentityMode::Name,
            reconnect_grace_secs: 30,
            room_ttl_secs: 3_600,
            reap_interval_secs: 60,
            chat_capacity: 100,
            max_chat_len: 500,
            max_name_len: 32,
            mailbox_size: 64,
            code_attempts: 16,
            game: GameOptions::default(),
        }
    }
}

impl RoomConfig {
    pub fn reconnect_grace(&self) -> Duration {
        Duration::from_secs(self.reconnect_grace_secs)
    }

    pub fn room_ttl(&self) -> Duration {
        Duration::from_secs(self.room_ttl_secs)
    }

    /// Never zero, so the reaper's interval timer is valid.
    pub fn reap_interval(&self) -> Duration {
        Duration::from_secs(self.reap_interval_secs.max(1))
    }
}
