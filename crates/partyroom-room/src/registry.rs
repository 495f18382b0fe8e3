//! Room registry: creates rooms, hands out codes, finds rooms by code.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use partyroom_game::{GameOptions, MediaResolver, PassthroughMedia};
use partyroom_protocol::{ConnectionId, GameKind, RoomCode};
use rand::seq::IndexedRandom;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::presence::{NullPresence, PresenceService};
use crate::roster::{EventSender, Identity, Roster};
use crate::session::{JoinReceipt, RoomHandle, RoomSeed, spawn_room};
use crate::store::{NullStore, RoomStore};
use crate::{RoomConfig, RoomError};

/// Live rooms by code. Shared with the actors so a closing room can
/// remove its own entry.
pub(crate) type RoomTable = DashMap<RoomCode, RoomHandle>;

/// Outside collaborators every room gets.
#[derive(Clone)]
pub struct RoomServices {
    pub store: Arc<dyn RoomStore>,
    pub presence: Arc<dyn PresenceService>,
    pub media: Arc<dyn MediaResolver>,
}

impl Default for RoomServices {
    fn default() -> Self {
        Self {
            store: Arc::new(NullStore),
            presence: Arc::new(NullPresence),
            media: Arc::new(PassthroughMedia),
        }
    }
}

/// Tracks every live room.
///
/// All methods take `&self`; share it behind an `Arc`. The table only
/// maps codes to handles, room state stays inside the actors.
pub struct RoomRegistry {
    rooms: Arc<RoomTable>,
    config: RoomConfig,
    services: RoomServices,
    next_instance: AtomicU64,
}

impl RoomRegistry {
    pub fn new(config: RoomConfig) -> Self {
        Self::with_services(config, RoomServices::default())
    }

    pub fn with_services(config: RoomConfig, services: RoomServices) -> Self {
        Self {
            rooms: Arc::new(DashMap::new()),
            config,
            services,
            next_instance: AtomicU64::new(1),
        }
    }

    pub fn config(&self) -> &RoomConfig {
        &self.config
    }

    /// Creates a room with a fresh code and seats `identity` as host.
    ///
    /// Once the host is seated, `tx` gets `RoomCreated` ahead of the usual
    /// join events. `rounds` overrides the configured number of rounds.
    pub async fn create(
        &self,
        kind: GameKind,
        identity: Identity,
        rounds: Option<u32>,
        conn: ConnectionId,
        tx: EventSender,
    ) -> Result<(RoomHandle, JoinReceipt), RoomError> {
        identity.validate(&self.config)?;
        let mut options = self.config.game.clone();
        if let Some(rounds) = rounds {
            options = options.with_rounds(rounds);
        }

        let handle = self.spawn_fresh(kind, options)?;
        match handle.join(identity, conn, tx).await {
            Ok(receipt) => {
                info!(room = %handle.code(), game = %kind, host = %receipt.player, "room created");
                Ok((handle, receipt))
            }
            Err(err) => {
                let _ = self.remove(handle.code()).await;
                Err(err)
            }
        }
    }

    fn spawn_fresh(
        &self,
        kind: GameKind,
        options: GameOptions,
    ) -> Result<RoomHandle, RoomError> {
        let attempts = self.config.code_attempts.max(1);
        for _ in 0..attempts {
            let Some(code) = generate_code() else {
                continue;
            };
            match self.rooms.entry(code) {
                Entry::Vacant(slot) => {
                    let seed = RoomSeed {
                        code: slot.key().clone(),
                        kind,
                        options,
                        roster: Roster::new(),
                    };
                    let handle = self.spawn(seed);
                    slot.insert(handle.clone());
                    return Ok(handle);
                }
                Entry::Occupied(taken) => {
                    debug!(room = %taken.key(), "room code collision");
                }
            }
        }
        warn!(attempts, "no free room code found");
        Err(RoomError::CodeExhausted(attempts))
    }

    fn spawn(&self, seed: RoomSeed) -> RoomHandle {
        let instance = self.next_instance.fetch_add(1, Ordering::Relaxed);
        spawn_room(
            seed,
            &self.config,
            self.services.clone(),
            Arc::downgrade(&self.rooms),
            instance,
        )
    }

    /// The live room with `code`.
    pub fn get(&self, code: &RoomCode) -> Result<RoomHandle, RoomError> {
        self.rooms
            .get(code)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| RoomError::NotFound(code.clone()))
    }

    /// Like [`get`](Self::get), but falls back to the store and revives
    /// the room from its last snapshot. A revived room is back in
    /// `Waiting` with every player disconnected.
    pub async fn get_or_restore(&self, code: &RoomCode) -> Result<RoomHandle, RoomError> {
        if let Ok(handle) = self.get(code) {
            return Ok(handle);
        }

        let stored = match self.services.store.load(code).await {
            Ok(Some(stored)) if !stored.players.is_empty() => stored,
            Ok(_) => return Err(RoomError::NotFound(code.clone())),
            Err(err) => {
                warn!(room = %code, error = %err, "room snapshot could not be loaded");
                return Err(RoomError::NotFound(code.clone()));
            }
        };

        match self.rooms.entry(code.clone()) {
            Entry::Occupied(live) => Ok(live.get().clone()),
            Entry::Vacant(slot) => {
                let players = stored.players.len();
                let seed = RoomSeed {
                    code: code.clone(),
                    kind: stored.game_type,
                    options: self.config.game.clone(),
                    roster: Roster::restored(stored.players),
                };
                let handle = self.spawn(seed);
                slot.insert(handle.clone());
                info!(room = %code, game = %stored.game_type, players, "room restored");
                Ok(handle)
            }
        }
    }

    /// Drops a room from the table and shuts its actor down.
    pub async fn remove(&self, code: &RoomCode) -> Result<(), RoomError> {
        let (_, handle) = self
            .rooms
            .remove(code)
            .ok_or_else(|| RoomError::NotFound(code.clone()))?;
        let _ = handle.shutdown().await;
        info!(room = %code, "room removed");
        Ok(())
    }

    /// Closes every room idle for longer than the configured TTL.
    /// Returns how many closed.
    pub async fn reap_idle(&self) -> usize {
        let ttl = self.config.room_ttl();
        // Clone out first; no map guard may be held across an await.
        let handles: Vec<RoomHandle> = self
            .rooms
            .iter()
            .map(|entry| entry.value().clone())
            .collect();

        let mut reaped = 0;
        for handle in handles {
            match handle.reap_if_idle(ttl).await {
                Ok(true) => reaped += 1,
                Ok(false) => {}
                Err(_) => {
                    // Actor already gone; make sure the entry is too.
                    self.rooms
                        .remove_if(handle.code(), |_, live| live.instance() == handle.instance());
                }
            }
        }
        if reaped > 0 {
            info!(reaped, remaining = self.rooms.len(), "idle rooms reaped");
        }
        reaped
    }

    /// Runs [`reap_idle`](Self::reap_idle) every `reap_interval` until the
    /// registry is dropped.
    pub fn spawn_reaper(self: &Arc<Self>) -> JoinHandle<()> {
        let registry = Arc::downgrade(self);
        let period = self.config.reap_interval();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(registry) = registry.upgrade() else {
                    break;
                };
                registry.reap_idle().await;
            }
            debug!("room reaper stopped");
        })
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}

/// A random code over the room-code alphabet.
fn generate_code() -> Option<RoomCode> {
    let mut rng = rand::rng();
    let raw: String = (0..RoomCode::LEN)
        .filter_map(|_| RoomCode::ALPHABET.choose(&mut rng))
        .map(|b| char::from(*b))
        .collect();
    RoomCode::parse(&raw).ok()
}
