//! Best-effort room snapshots.
//!
//! Rooms live in memory. A [`RoomStore`] receives a snapshot whenever a
//! round or a game ends, and may hand one back so a room code keeps
//! working after the actor that owned it is gone. Nothing waits on the
//! store: saves run on spawned tasks and failures are only logged.

use async_trait::async_trait;
use dashmap::DashMap;
use partyroom_game::Player;
use partyroom_protocol::{GameKind, RoomCode, RoomStatus};
use serde::{Deserialize, Serialize};

/// What a store keeps about a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredRoom {
    pub room_id: RoomCode,
    pub game_type: GameKind,
    pub status: RoomStatus,
    pub round: u32,
    pub players: Vec<Player>,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Persistence collaborator.
#[async_trait]
pub trait RoomStore: Send + Sync + 'static {
    /// Stores `room`, replacing any earlier snapshot of the same code.
    async fn save(&self, room: &StoredRoom) -> Result<(), StoreError>;

    /// The last snapshot of `code`, if any.
    async fn load(&self, code: &RoomCode) -> Result<Option<StoredRoom>, StoreError>;
}

/// Keeps nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullStore;

#[async_trait]
impl RoomStore for NullStore {
    async fn save(&self, _room: &StoredRoom) -> Result<(), StoreError> {
        Ok(())
    }

    async fn load(&self, _code: &RoomCode) -> Result<Option<StoredRoom>, StoreError> {
        Ok(None)
    }
}

/// Keeps snapshots in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    rooms: DashMap<RoomCode, StoredRoom>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, code: &RoomCode) -> Option<StoredRoom> {
        self.rooms.get(code).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}

#[async_trait]
impl RoomStore for MemoryStore {
    async fn save(&self, room: &StoredRoom) -> Result<(), StoreError> {
        self.rooms.insert(room.room_id.clone(), room.clone());
        Ok(())
    }

    async fn load(&self, code: &RoomCode) -> Result<Option<StoredRoom>, StoreError> {
        Ok(self.get(code))
    }
}
