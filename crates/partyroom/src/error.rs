//! Unified error type for Partyroom.

use partyroom_protocol::ProtocolError;
use partyroom_room::RoomError;
use partyroom_transport::TransportError;

use crate::ConfigError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant lets `?` convert sub-crate
/// errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum PartyroomError {
    /// A transport-level error (accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A room-level error (full, not found, not allowed, ...).
    #[error(transparent)]
    Room(#[from] RoomError),

    /// The server configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),
}
