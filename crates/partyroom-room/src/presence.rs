//! Presence notifications for an outside friend/online-status system.

use async_trait::async_trait;
use partyroom_protocol::RoomCode;

#[derive(Debug, thiserror::Error)]
#[error("presence update failed: {0}")]
pub struct PresenceError(pub String);

/// Told when a player's connection to a room comes and goes. Calls are
/// made from spawned tasks; a slow or failing service never blocks a room.
#[async_trait]
pub trait PresenceService: Send + Sync + 'static {
    async fn online(&self, player: &str, room: &RoomCode) -> Result<(), PresenceError>;

    async fn offline(&self, player: &str, room: &RoomCode) -> Result<(), PresenceError>;
}

/// Ignores every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullPresence;

#[async_trait]
impl PresenceService for NullPresence {
    async fn online(&self, _player: &str, _room: &RoomCode) -> Result<(), PresenceError> {
        Ok(())
    }

    async fn offline(&self, _player: &str, _room: &RoomCode) -> Result<(), PresenceError> {
        Ok(())
    }
}
