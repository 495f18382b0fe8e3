//! Seats, connections, and the host seat of one room.

use std::collections::HashMap;

use partyroom_game::{Player, Recipient};
use partyroom_protocol::{ConnectionId, PlayerSummary, RoomCode, ServerEvent};
use tokio::sync::mpsc;
use tracing::trace;

use crate::{IdentityMode, RoomError, RoomConfig};

/// Channel a room uses to push events to one connection.
pub type EventSender = mpsc::UnboundedSender<ServerEvent>;

/// Who is asking to sit down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub name: String,
    pub external_id: Option<String>,
}

impl Identity {
    /// Trims both parts; a blank external id counts as none.
    pub fn new(name: impl AsRef<str>, external_id: Option<String>) -> Self {
        Self {
            name: name.as_ref().trim().to_string(),
            external_id: external_id
                .map(|id| id.trim().to_string())
                .filter(|id| !id.is_empty()),
        }
    }

    /// # Errors
    /// `Validation` for a blank or over-long name, or a missing external
    /// id when identities are keyed by it.
    pub fn validate(&self, config: &RoomConfig) -> Result<(), RoomError> {
        if self.name.is_empty() {
            return Err(RoomError::Validation("player name must not be empty".into()));
        }
        if self.name.chars().count() > config.max_name_len {
            return Err(RoomError::Validation(format!(
                "player name is longer than {} characters",
                config.max_name_len
            )));
        }
        if config.identity == IdentityMode::ExternalId && self.external_id.is_none() {
            return Err(RoomError::Validation("playerId is required".into()));
        }
        Ok(())
    }
}

/// Result of a successful [`Roster::join`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seated {
    pub name: String,
    /// An existing seat was reclaimed.
    pub reconnected: bool,
    /// Host moved to this player as part of the join.
    pub promoted: Option<String>,
}

/// The players of a room in join order, plus a push channel for each
/// connected one.
#[derive(Debug, Default)]
pub struct Roster {
    players: Vec<Player>,
    links: HashMap<String, EventSender>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// A roster of previously stored players. Nobody is connected.
    pub fn restored(mut players: Vec<Player>) -> Self {
        for player in &mut players {
            player.connected = false;
            player.connection = None;
        }
        let mut roster = Self {
            players,
            links: HashMap::new(),
        };
        roster.settle_host();
        roster
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn players_mut(&mut self) -> &mut [Player] {
        &mut self.players
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn connected_count(&self) -> usize {
        self.players.iter().filter(|p| p.connected).count()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.players.iter().any(|p| p.name == name)
    }

    pub fn is_connected(&self, name: &str) -> bool {
        self.players.iter().any(|p| p.name == name && p.connected)
    }

    pub fn host(&self) -> Option<&str> {
        self.players
            .iter()
            .find(|p| p.is_host)
            .map(|p| p.name.as_str())
    }

    /// Name of the player seated on `conn`.
    pub fn name_of(&self, conn: ConnectionId) -> Option<String> {
        self.players
            .iter()
            .find(|p| p.connection == Some(conn))
            .map(|p| p.name.clone())
    }

    pub fn summaries(&self) -> Vec<PlayerSummary> {
        self.players.iter().map(Player::summary).collect()
    }

    /// Seats `identity` on `conn`, reclaiming a disconnected seat when the
    /// identity matches one.
    ///
    /// # Errors
    /// `AlreadySeated` if `conn` already holds a different seat,
    /// `NameTaken` if the seat is held by a live connection (or, keyed by
    /// external id, the name belongs to someone else), `RoomFull` when a
    /// new seat would exceed `max_seats`.
    pub fn join(
        &mut self,
        code: &RoomCode,
        identity: &Identity,
        conn: ConnectionId,
        tx: EventSender,
        mode: IdentityMode,
        max_seats: usize,
    ) -> Result<Seated, RoomError> {
        let existing = self.players.iter().position(|p| match mode {
            IdentityMode::Name => p.name == identity.name,
            IdentityMode::ExternalId => {
                p.external_id.is_some() && p.external_id == identity.external_id
            }
        });
        let held = self.players.iter().position(|p| p.connection == Some(conn));
        if let Some(seat) = held {
            if existing != Some(seat) {
                return Err(RoomError::AlreadySeated(self.players[seat].name.clone()));
            }
        }

        if let Some(idx) = existing {
            let player = &mut self.players[idx];
            if player.connected && player.connection != Some(conn) {
                return Err(RoomError::NameTaken(player.name.clone()));
            }
            player.connected = true;
            player.connection = Some(conn);
            if player.external_id.is_none() {
                player.external_id.clone_from(&identity.external_id);
            }
            let name = player.name.clone();
            self.links.insert(name.clone(), tx);
            let promoted = self.settle_host();
            return Ok(Seated {
                name,
                reconnected: true,
                promoted,
            });
        }

        if self.contains(&identity.name) {
            return Err(RoomError::NameTaken(identity.name.clone()));
        }
        if self.players.len() >= max_seats {
            return Err(RoomError::RoomFull(code.clone()));
        }

        let mut player = Player::new(identity.name.clone(), identity.external_id.clone(), conn);
        player.is_host = self.players.is_empty();
        self.players.push(player);
        self.links.insert(identity.name.clone(), tx);
        Ok(Seated {
            name: identity.name.clone(),
            reconnected: false,
            promoted: None,
        })
    }

    /// Marks the player on `conn` disconnected. Returns its name and, if
    /// the host seat moved, the new host.
    pub fn disconnect(&mut self, conn: ConnectionId) -> Option<(String, Option<String>)> {
        let player = self
            .players
            .iter_mut()
            .find(|p| p.connection == Some(conn))?;
        player.connected = false;
        player.connection = None;
        let name = player.name.clone();
        self.links.remove(&name);
        let promoted = self.settle_host();
        Some((name, promoted))
    }

    /// Removes `name`. Returns the removed player and, if the host seat
    /// moved, the new host.
    pub fn remove(&mut self, name: &str) -> Option<(Player, Option<String>)> {
        let idx = self.players.iter().position(|p| p.name == name)?;
        let player = self.players.remove(idx);
        self.links.remove(name);
        let promoted = self.settle_host();
        Some((player, promoted))
    }

    /// Restores the single-host rule: the host seat goes to the earliest
    /// connected player when the current host is gone or disconnected,
    /// and to the earliest player when nobody is connected and the seat
    /// is empty. Returns the new host if it changed.
    fn settle_host(&mut self) -> Option<String> {
        if self.players.is_empty() {
            return None;
        }
        let current = self.players.iter().position(|p| p.is_host);
        if let Some(idx) = current {
            if self.players[idx].connected {
                return None;
            }
        }
        let next = self
            .players
            .iter()
            .position(|p| p.connected)
            .or(if current.is_none() { Some(0) } else { None })?;
        if Some(next) == current {
            return None;
        }
        for (i, player) in self.players.iter_mut().enumerate() {
            player.is_host = i == next;
        }
        Some(self.players[next].name.clone())
    }

    /// Pushes `event` to `recipient`. Delivery is best-effort: a closed
    /// channel means the connection is already going away.
    pub fn deliver(&self, recipient: &Recipient, event: &ServerEvent) {
        match recipient {
            Recipient::All => {
                for name in self.links.keys() {
                    self.send(name, event.clone());
                }
            }
            Recipient::Player(name) => self.send(name, event.clone()),
        }
    }

    pub fn send(&self, name: &str, event: ServerEvent) {
        if let Some(tx) = self.links.get(name) {
            if tx.send(event).is_err() {
                trace!(player = %name, "event dropped, connection gone");
            }
        }
    }

    pub fn broadcast(&self, event: ServerEvent) {
        self.deliver(&Recipient::All, &event);
    }
}
