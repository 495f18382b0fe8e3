//! Room actor: an isolated Tokio task that owns one room.
//!
//! Everything about a room (roster, chat, game, timers) lives inside its
//! task. The outside world talks to it through a bounded mailbox via
//! [`RoomHandle`]; commands are applied strictly in arrival order and
//! timers are fired from the same loop, so no room state is ever shared.

use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;

use partyroom_game::{
    GameAction, GameOptions, GameRules, GameState, GameTimer, Transition, limits,
    scoreboard,
};
use partyroom_protocol::{
    ChatKind, ConnectionId, GameKind, RoomCode, RoomSnapshot, RoomStatus, ServerEvent,
};
use partyroom_timer::{TimerQueue, wait_until};
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::chat::ChatLog;
use crate::registry::RoomTable;
use crate::roster::{EventSender, Identity, Roster};
use crate::store::StoredRoom;
use crate::{RoomConfig, RoomError, RoomServices};

/// A non-join request from a seated connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomRequest {
    /// Host only.
    Start,
    /// Host only.
    Kick { target: String },
    Chat { text: String },
    /// Forwarded to the running game. `claimed` is the player name the
    /// client put in the payload, if any; it must be the sender's own.
    Game {
        action: GameAction,
        claimed: Option<String>,
    },
}

/// Reply to a successful join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinReceipt {
    pub room_id: RoomCode,
    /// The seat's name, which may differ from the requested one when
    /// seats are keyed by external id.
    pub player: String,
    pub reconnected: bool,
}

/// Commands sent to a room actor through its mailbox.
pub(crate) enum RoomCommand {
    Join {
        identity: Identity,
        conn: ConnectionId,
        tx: EventSender,
        reply: oneshot::Sender<Result<JoinReceipt, RoomError>>,
    },
    Leave {
        conn: ConnectionId,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },
    /// The connection dropped. The seat is kept for the grace period.
    Disconnect { conn: ConnectionId },
    Act {
        conn: ConnectionId,
        request: RoomRequest,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },
    Snapshot {
        reply: oneshot::Sender<RoomSnapshot>,
    },
    /// Close the room if it has been idle for `ttl`. Replies whether it
    /// closed.
    ReapIfIdle {
        ttl: Duration,
        reply: oneshot::Sender<bool>,
    },
    Shutdown,
}

/// What a pending room timer is for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum TimerPurpose {
    Game(GameTimer),
    /// Reconnect grace of a disconnected player.
    Grace(String),
}

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

/// Handle to a running room actor. Cheap to clone.
#[derive(Clone)]
pub struct RoomHandle {
    code: RoomCode,
    kind: GameKind,
    /// Distinguishes this actor from a later one under the same code.
    instance: u64,
    sender: mpsc::Sender<RoomCommand>,
}

impl fmt::Debug for RoomHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoomHandle")
            .field("code", &self.code)
            .field("kind", &self.kind)
            .field("instance", &self.instance)
            .finish_non_exhaustive()
    }
}

impl RoomHandle {
    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    pub fn kind(&self) -> GameKind {
        self.kind
    }

    pub fn instance(&self) -> u64 {
        self.instance
    }

    /// `true` once the actor has stopped.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    fn unavailable(&self) -> RoomError {
        RoomError::Unavailable(self.code.clone())
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> RoomCommand,
    ) -> Result<T, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(make(reply_tx))
            .await
            .map_err(|_| self.unavailable())?;
        reply_rx.await.map_err(|_| self.unavailable())
    }

    /// Seats `identity` on `conn`. Events for the player go to `tx`.
    pub async fn join(
        &self,
        identity: Identity,
        conn: ConnectionId,
        tx: EventSender,
    ) -> Result<JoinReceipt, RoomError> {
        self.request(|reply| RoomCommand::Join {
            identity,
            conn,
            tx,
            reply,
        })
        .await?
    }

    /// Gives up the seat held by `conn`.
    pub async fn leave(&self, conn: ConnectionId) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::Leave { conn, reply })
            .await?
    }

    /// Reports that `conn` dropped (fire-and-forget).
    pub async fn disconnect(&self, conn: ConnectionId) -> Result<(), RoomError> {
        self.sender
            .send(RoomCommand::Disconnect { conn })
            .await
            .map_err(|_| self.unavailable())
    }

    pub async fn act(&self, conn: ConnectionId, request: RoomRequest) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::Act {
            conn,
            request,
            reply,
        })
        .await?
    }

    pub async fn snapshot(&self) -> Result<RoomSnapshot, RoomError> {
        self.request(|reply| RoomCommand::Snapshot { reply }).await
    }

    /// Asks the room to close itself if idle for `ttl`.
    pub async fn reap_if_idle(&self, ttl: Duration) -> Result<bool, RoomError> {
        self.request(|reply| RoomCommand::ReapIfIdle { ttl, reply })
            .await
    }

    /// Tells the room to shut down.
    pub async fn shutdown(&self) -> Result<(), RoomError> {
        self.sender
            .send(RoomCommand::Shutdown)
            .await
            .map_err(|_| self.unavailable())
    }
}

// ---------------------------------------------------------------------------
// Actor
// ---------------------------------------------------------------------------

/// Initial state of a room actor.
pub(crate) struct RoomSeed {
    pub code: RoomCode,
    pub kind: GameKind,
    pub options: GameOptions,
    pub roster: Roster,
}

struct RoomActor {
    code: RoomCode,
    kind: GameKind,
    instance: u64,
    status: RoomStatus,
    options: GameOptions,
    config: RoomConfig,
    services: RoomServices,
    roster: Roster,
    chat: ChatLog,
    game: Option<GameState>,
    timers: TimerQueue<TimerPurpose>,
    /// Bumped on every game phase change; game timers armed under an
    /// older value are ignored when they fire.
    generation: u64,
    last_activity: Instant,
    closed: bool,
    table: Weak<RoomTable>,
}

/// Spawns a room actor task and returns a handle to it.
pub(crate) fn spawn_room(
    seed: RoomSeed,
    config: &RoomConfig,
    services: RoomServices,
    table: Weak<RoomTable>,
    instance: u64,
) -> RoomHandle {
    let (sender, inbox) = mpsc::channel(config.mailbox_size.max(1));
    let handle = RoomHandle {
        code: seed.code.clone(),
        kind: seed.kind,
        instance,
        sender,
    };

    let mut actor = RoomActor {
        timers: TimerQueue::new(seed.code.to_string()),
        code: seed.code,
        kind: seed.kind,
        instance,
        status: RoomStatus::Waiting,
        options: seed.options,
        config: config.clone(),
        services,
        roster: seed.roster,
        chat: ChatLog::new(config.chat_capacity),
        game: None,
        generation: 0,
        last_activity: Instant::now(),
        closed: false,
        table,
    };
    // Restored players start disconnected and get the usual grace.
    let absent: Vec<String> = actor
        .roster
        .players()
        .iter()
        .filter(|p| !p.connected)
        .map(|p| p.name.clone())
        .collect();
    for name in absent {
        actor.arm_grace(name);
    }

    tokio::spawn(actor.run(inbox));
    handle
}

impl RoomActor {
    async fn run(mut self, mut inbox: mpsc::Receiver<RoomCommand>) {
        info!(room = %self.code, game = %self.kind, "room actor started");

        while !self.closed {
            let deadline = self.timers.next_deadline();
            tokio::select! {
                cmd = inbox.recv() => match cmd {
                    Some(cmd) => self.handle(cmd),
                    None => break,
                },
                () = wait_until(deadline) => self.fire_timers(),
            }
        }

        // Anything still queued was sent to a room that no longer exists.
        inbox.close();
        while let Ok(cmd) = inbox.try_recv() {
            self.reject(cmd);
        }
        info!(room = %self.code, "room actor stopped");
    }

    fn handle(&mut self, cmd: RoomCommand) {
        match cmd {
            RoomCommand::Join {
                identity,
                conn,
                tx,
                reply,
            } => {
                let result = self.join(identity, conn, tx);
                if result.is_ok() {
                    self.touch();
                }
                let _ = reply.send(result);
            }
            RoomCommand::Leave { conn, reply } => {
                let result = self.leave(conn);
                if result.is_ok() {
                    self.touch();
                }
                let _ = reply.send(result);
            }
            RoomCommand::Disconnect { conn } => self.disconnect(conn),
            RoomCommand::Act {
                conn,
                request,
                reply,
            } => {
                let result = self.act(conn, request);
                match &result {
                    Ok(()) => self.touch(),
                    Err(err) => debug!(room = %self.code, %conn, error = %err, "request refused"),
                }
                let _ = reply.send(result);
            }
            RoomCommand::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
            }
            RoomCommand::ReapIfIdle { ttl, reply } => {
                let idle = self.last_activity.elapsed() >= ttl;
                if idle {
                    self.close("idle");
                }
                let _ = reply.send(idle);
            }
            RoomCommand::Shutdown => self.close("shutdown"),
        }
    }

    fn reject(&self, cmd: RoomCommand) {
        let gone = || RoomError::Unavailable(self.code.clone());
        match cmd {
            RoomCommand::Join { reply, .. } => {
                let _ = reply.send(Err(gone()));
            }
            RoomCommand::Leave { reply, .. } | RoomCommand::Act { reply, .. } => {
                let _ = reply.send(Err(gone()));
            }
            RoomCommand::ReapIfIdle { reply, .. } => {
                let _ = reply.send(true);
            }
            RoomCommand::Snapshot { .. }
            | RoomCommand::Disconnect { .. }
            | RoomCommand::Shutdown => {}
        }
    }

    fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    fn game_running(&self) -> bool {
        matches!(self.status, RoomStatus::Playing | RoomStatus::Paused)
    }

    // -- Membership ---------------------------------------------------------

    fn join(
        &mut self,
        identity: Identity,
        conn: ConnectionId,
        tx: EventSender,
    ) -> Result<JoinReceipt, RoomError> {
        identity.validate(&self.config)?;
        if self.status == RoomStatus::Completed {
            return Err(RoomError::InvalidState(
                "the game in this room has finished".into(),
            ));
        }

        // Only a freshly created room starts out empty.
        let founding = self.roster.is_empty();
        let seated = self.roster.join(
            &self.code,
            &identity,
            conn,
            tx,
            self.config.identity,
            limits(self.kind).max,
        )?;
        let name = seated.name.clone();
        self.timers.cancel(&TimerPurpose::Grace(name.clone()));
        info!(
            room = %self.code,
            player = %name,
            %conn,
            reconnected = seated.reconnected,
            players = self.roster.len(),
            "player joined"
        );

        if founding {
            self.roster.send(
                &name,
                ServerEvent::RoomCreated {
                    room_id: self.code.clone(),
                    game_type: self.kind,
                    host: name.clone(),
                },
            );
        }
        self.roster.send(
            &name,
            ServerEvent::RoomJoined {
                room_id: self.code.clone(),
                player: name.clone(),
                reconnected: seated.reconnected,
                snapshot: self.snapshot(),
            },
        );
        self.roster.send(
            &name,
            ServerEvent::ChatHistory {
                messages: self.chat.history(),
            },
        );
        if let Some(game) = &self.game {
            for event in game.private_events(&name) {
                self.roster.send(&name, event);
            }
        }
        if let Some(host) = seated.promoted {
            self.announce_host(&host);
        }

        let verb = if seated.reconnected { "rejoined" } else { "joined" };
        self.system_chat(&format!("{name} {verb}"));
        self.broadcast_roster();
        self.notify_presence(&name, true);

        if self.game_running() {
            if let Some(game) = self.game.as_mut() {
                let t = game.on_presence_changed(&name, true, self.roster.players_mut());
                self.apply(t);
            }
        }

        Ok(JoinReceipt {
            room_id: self.code.clone(),
            player: name,
            reconnected: seated.reconnected,
        })
    }

    fn leave(&mut self, conn: ConnectionId) -> Result<(), RoomError> {
        let name = self
            .roster
            .name_of(conn)
            .ok_or_else(|| RoomError::NotInRoom(self.code.clone()))?;
        self.remove_player(&name, "left");
        Ok(())
    }

    fn disconnect(&mut self, conn: ConnectionId) {
        let Some((name, promoted)) = self.roster.disconnect(conn) else {
            debug!(room = %self.code, %conn, "disconnect for unknown connection");
            return;
        };
        info!(room = %self.code, player = %name, "player disconnected");
        self.arm_grace(name.clone());
        self.notify_presence(&name, false);
        if let Some(host) = promoted {
            self.announce_host(&host);
        }

        if self.game_running() {
            if let Some(game) = self.game.as_mut() {
                let t = game.on_presence_changed(&name, false, self.roster.players_mut());
                self.apply(t);
            }
        }
        self.broadcast_roster();
    }

    fn arm_grace(&mut self, name: String) {
        let grace = self.config.reconnect_grace();
        self.timers
            .arm(TimerPurpose::Grace(name), grace, self.generation);
    }

    fn remove_player(&mut self, name: &str, reason: &str) {
        let Some((player, promoted)) = self.roster.remove(name) else {
            return;
        };
        self.timers.cancel(&TimerPurpose::Grace(name.to_string()));
        info!(
            room = %self.code,
            player = %name,
            reason,
            players = self.roster.len(),
            "player removed"
        );
        if player.connected {
            self.notify_presence(name, false);
        }

        if self.roster.is_empty() {
            self.close("empty");
            return;
        }
        if let Some(host) = promoted {
            self.announce_host(&host);
        }
        self.system_chat(&format!("{name} left"));

        if self.game_running() {
            if let Some(game) = self.game.as_mut() {
                let t = game.on_player_removed(name, self.roster.players_mut());
                self.apply(t);
            }
        }
        self.broadcast_roster();
        if self.game.is_some() {
            self.roster.broadcast(ServerEvent::ScoresUpdate {
                scores: scoreboard(self.roster.players()),
            });
        }
    }

    fn announce_host(&self, host: &str) {
        info!(room = %self.code, player = %host, "host promoted");
        self.roster.send(
            host,
            ServerEvent::PromotedToHost {
                player: host.to_string(),
            },
        );
    }

    fn broadcast_roster(&self) {
        self.roster.broadcast(ServerEvent::UpdatePlayers {
            players: self.roster.summaries(),
            host: self.roster.host().map(str::to_string),
        });
    }

    // -- Requests -----------------------------------------------------------

    fn act(&mut self, conn: ConnectionId, request: RoomRequest) -> Result<(), RoomError> {
        let actor = self
            .roster
            .name_of(conn)
            .ok_or_else(|| RoomError::NotInRoom(self.code.clone()))?;
        match request {
            RoomRequest::Start => self.start_game(&actor),
            RoomRequest::Kick { target } => self.kick(&actor, &target),
            RoomRequest::Chat { text } => self.chat(&actor, &text),
            RoomRequest::Game { action, claimed } => self.game_action(&actor, action, claimed),
        }
    }

    fn require_host(&self, actor: &str, what: &str) -> Result<(), RoomError> {
        if self.roster.host() == Some(actor) {
            Ok(())
        } else {
            Err(RoomError::NotAllowed(format!("only the host can {what}")))
        }
    }

    fn start_game(&mut self, actor: &str) -> Result<(), RoomError> {
        self.require_host(actor, "start the game")?;
        if self.status != RoomStatus::Waiting {
            return Err(RoomError::InvalidState("the game has already started".into()));
        }
        let need = limits(self.kind).min;
        if self.roster.connected_count() < need {
            return Err(RoomError::NotEnoughPlayers {
                kind: self.kind,
                need,
            });
        }

        for player in self.roster.players_mut() {
            player.score = 0;
            player.stats = Default::default();
        }
        let mut game = GameState::new(
            self.kind,
            self.options.clone(),
            Arc::clone(&self.services.media),
        );
        self.status = RoomStatus::Playing;
        let total_rounds = self.options.total_rounds.max(1);
        info!(
            room = %self.code,
            game = %self.kind,
            players = self.roster.len(),
            rounds = total_rounds,
            "game started"
        );

        self.roster.broadcast(ServerEvent::GameStarted {
            game_type: self.kind,
            total_rounds,
        });
        self.roster.broadcast(ServerEvent::ScoresUpdate {
            scores: scoreboard(self.roster.players()),
        });
        let t = game.start(self.roster.players_mut());
        self.game = Some(game);
        self.apply(t);
        Ok(())
    }

    fn kick(&mut self, actor: &str, target: &str) -> Result<(), RoomError> {
        self.require_host(actor, "kick players")?;
        let target = target.trim();
        if target == actor {
            return Err(RoomError::Validation("the host cannot kick themselves".into()));
        }
        if !self.roster.contains(target) {
            return Err(RoomError::UnknownPlayer(target.to_string()));
        }

        let kicked = ServerEvent::PlayerKicked {
            player: target.to_string(),
        };
        self.roster.send(target, kicked.clone());
        self.remove_player(target, "kicked");
        self.roster.broadcast(kicked);
        Ok(())
    }

    fn chat(&mut self, actor: &str, text: &str) -> Result<(), RoomError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(RoomError::Validation("message must not be empty".into()));
        }
        let max = self.config.max_chat_len;
        if text.chars().count() > max {
            return Err(RoomError::Validation(format!(
                "message is longer than {max} characters"
            )));
        }
        let message = self.chat.push(actor, text, ChatKind::Text);
        self.roster
            .broadcast(ServerEvent::NewChatMessage { message });
        Ok(())
    }

    fn system_chat(&mut self, text: &str) {
        let message = self.chat.system(text);
        self.roster
            .broadcast(ServerEvent::NewChatMessage { message });
    }

    fn game_action(
        &mut self,
        actor: &str,
        action: GameAction,
        claimed: Option<String>,
    ) -> Result<(), RoomError> {
        if let Some(claimed) = claimed {
            if claimed.trim() != actor {
                return Err(RoomError::NotAllowed(format!(
                    "{actor} cannot act for {claimed}"
                )));
            }
        }
        if !self.game_running() {
            return Err(RoomError::InvalidState("no game is running".into()));
        }
        let Some(game) = self.game.as_mut() else {
            return Err(RoomError::InvalidState("no game is running".into()));
        };
        let t = game.handle(actor, action, self.roster.players_mut())?;
        self.apply(t);
        Ok(())
    }

    // -- Transitions and timers --------------------------------------------

    fn apply(&mut self, t: Transition) {
        if t.phase_changed {
            self.generation += 1;
            self.timers
                .cancel_where(|p| matches!(p, TimerPurpose::Game(_)));
        }
        for (timer, after) in t.timers {
            self.timers
                .arm(TimerPurpose::Game(timer), after, self.generation);
        }
        for (recipient, event) in &t.outputs {
            self.roster.deliver(recipient, event);
        }
        self.refresh_status(t.finished);
        if t.round_completed || t.finished {
            self.persist();
        }
    }

    fn refresh_status(&mut self, finished: bool) {
        let Some(game) = &self.game else {
            return;
        };
        let next = if finished || game.is_finished() {
            RoomStatus::Completed
        } else if game.is_idle() {
            RoomStatus::Paused
        } else {
            RoomStatus::Playing
        };
        if next != self.status {
            info!(room = %self.code, from = %self.status, to = %next, "room status changed");
            self.status = next;
        }
    }

    fn fire_timers(&mut self) {
        for fired in self.timers.pop_expired(Instant::now()) {
            let current = fired.is_current(self.generation);
            match fired.purpose {
                TimerPurpose::Game(timer) => {
                    if !current {
                        debug!(
                            room = %self.code,
                            ?timer,
                            armed = fired.generation,
                            generation = self.generation,
                            "stale timer dropped"
                        );
                        continue;
                    }
                    let Some(game) = self.game.as_mut() else {
                        continue;
                    };
                    let t = game.on_timer(timer, self.roster.players_mut());
                    self.apply(t);
                }
                TimerPurpose::Grace(name) => {
                    if self.roster.contains(&name) && !self.roster.is_connected(&name) {
                        self.remove_player(&name, "reconnect grace expired");
                    }
                }
            }
            if self.closed {
                break;
            }
        }
    }

    // -- Views and side effects --------------------------------------------

    fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            room_id: self.code.clone(),
            game_type: self.kind,
            status: self.status,
            host: self.roster.host().map(str::to_string),
            players: self.roster.summaries(),
            game: self.game.as_ref().map(GameRules::view),
        }
    }

    /// Saves a snapshot on a spawned task.
    fn persist(&self) {
        let room = StoredRoom {
            room_id: self.code.clone(),
            game_type: self.kind,
            status: self.status,
            round: self.game.as_ref().map_or(0, GameRules::round),
            players: self.roster.players().to_vec(),
        };
        let store = Arc::clone(&self.services.store);
        tokio::spawn(async move {
            if let Err(err) = store.save(&room).await {
                warn!(room = %room.room_id, error = %err, "room snapshot not saved");
            }
        });
    }

    fn notify_presence(&self, player: &str, online: bool) {
        let presence = Arc::clone(&self.services.presence);
        let player = player.to_string();
        let code = self.code.clone();
        tokio::spawn(async move {
            let result = if online {
                presence.online(&player, &code).await
            } else {
                presence.offline(&player, &code).await
            };
            if let Err(err) = result {
                warn!(room = %code, player = %player, error = %err, "presence update failed");
            }
        });
    }

    fn close(&mut self, reason: &str) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.timers.cancel_where(|_| true);
        if let Some(table) = self.table.upgrade() {
            table.remove_if(&self.code, |_, handle| handle.instance() == self.instance);
        }
        let timers = self.timers.stats();
        info!(
            room = %self.code,
            reason,
            timers_fired = timers.fired,
            timers_armed = timers.armed,
            "room closed"
        );
    }
}
