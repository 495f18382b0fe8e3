//! Wire protocol for Partyroom.
//!
//! - **Commands** ([`ClientCommand`]) — what a client may ask for.
//! - **Events** ([`ServerEvent`]) — what rooms push back, plus the views
//!   they carry ([`RoomSnapshot`], [`PlayerSummary`], [`GameView`], ...).
//! - **Types** ([`RoomCode`], [`GameKind`], [`Choice`], [`Vote`], ...).
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — text encoding.
//!
//! # Architecture
//!
//! ```text
//! Transport (frames) → Protocol (ClientCommand / ServerEvent) → Rooms
//! ```
//!
//! Both enums share one envelope shape, `{"event": "<name>", "data": {..}}`,
//! with kebab-case event names and camelCase fields.

mod codec;
mod command;
mod error;
mod event;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use command::ClientCommand;
pub use error::ProtocolError;
pub use event::{
    ChatKind, ChatMessage, GameView, PlayerStats, PlayerSummary, ProofStatus, QuestionPhase,
    RoomSnapshot, ScoreEntry, ServerEvent, TurnPhase, VoteTally,
};
pub use partyroom_transport::ConnectionId;
pub use types::{Choice, ErrorKind, GameKind, RoomCode, RoomStatus, Vote};
