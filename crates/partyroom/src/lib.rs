//! # Partyroom
//!
//! Real-time rooms for small party games (truth-or-dare, most-likely,
//! compatibility) over WebSocket.
//!
//! Clients send JSON commands such as `create-room`, `join-room` or
//! `submit-vote`; each room runs as its own actor and pushes events back
//! to its players. The server owns every rule and timer.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use partyroom::prelude::*;
//!
//! # async fn run() -> Result<(), PartyroomError> {
//! let server = PartyroomServer::builder()
//!     .config(ServerConfig::from_env()?)
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod handler;
mod server;

pub use config::{BIND_ENV, CONFIG_ENV, ConfigError, ServerConfig};
pub use error::PartyroomError;
pub use server::{PartyroomServer, PartyroomServerBuilder};

/// Everything needed to run and talk to a server.
pub mod prelude {
    pub use crate::{
        ConfigError, PartyroomError, PartyroomServer, PartyroomServerBuilder, ServerConfig,
    };
    pub use partyroom_game::{GameOptions, ScoringRules, TurnTimings, VoterPolicy};
    pub use partyroom_protocol::{
        Choice, ClientCommand, Codec, ErrorKind, GameKind, JsonCodec, RoomCode, RoomStatus,
        ServerEvent, Vote,
    };
    pub use partyroom_room::{
        IdentityMode, MemoryStore, RoomConfig, RoomRegistry, RoomServices, StoredRoom,
    };
}
