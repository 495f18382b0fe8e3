//! Room lifecycle for Partyroom.
//!
//! Each room runs as an isolated Tokio task (actor model) owning its
//! roster, chat log, game state and timers. Nothing about a room is
//! shared; callers talk to it through a [`RoomHandle`].
//!
//! # Key types
//!
//! - [`RoomRegistry`]: creates rooms, hands out codes, reaps idle rooms
//! - [`RoomHandle`]: send commands to a running room actor
//! - [`RoomRequest`]: what a seated connection may ask of its room
//! - [`RoomConfig`]: grace periods, capacities, game defaults
//! - [`RoomStore`] / [`PresenceService`]: optional outside collaborators

mod chat;
mod config;
mod error;
mod presence;
mod registry;
mod roster;
mod session;
mod store;

pub use chat::ChatLog;
pub use config::{IdentityMode, RoomConfig};
pub use error::RoomError;
pub use presence::{NullPresence, PresenceError, PresenceService};
pub use registry::{RoomRegistry, RoomServices};
pub use roster::{EventSender, Identity, Roster, Seated};
pub use session::{JoinReceipt, RoomHandle, RoomRequest};
pub use store::{MemoryStore, NullStore, RoomStore, StoreError, StoredRoom};
