//! Per-connection handler: command decoding and routing.
//!
//! Each accepted connection gets its own Tokio task running this handler
//! plus a writer task. The flow is:
//!   1. Spawn the writer, which drains the connection's event channel
//!   2. Loop: receive frames → decode `ClientCommand` → route to a room
//!   3. On close or idle timeout, report the disconnect to the room
//!
//! Rooms push events straight into the event channel, so a command's
//! reply and everything else a room broadcasts share one ordered stream.

use std::sync::Arc;

use partyroom_game::GameAction;
use partyroom_protocol::{ClientCommand, Codec, ConnectionId, ErrorKind, RoomCode, ServerEvent};
use partyroom_room::{EventSender, Identity, RoomError, RoomHandle, RoomRegistry, RoomRequest};
use partyroom_transport::{Connection, Frame, WebSocketConnection};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::PartyroomError;
use crate::server::ServerState;

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C: Codec>(
    conn: WebSocketConnection,
    state: Arc<ServerState<C>>,
) -> Result<(), PartyroomError> {
    let conn = Arc::new(conn);
    let conn_id = conn.id();
    debug!(%conn_id, peer = %conn.peer_addr(), "handling new connection");

    let (tx, rx) = mpsc::unbounded_channel();
    let writer = tokio::spawn(write_events(Arc::clone(&conn), Arc::clone(&state), rx));
    let mut session = Session {
        conn: conn_id,
        tx,
        room: None,
    };

    loop {
        let frame = match next_frame(&conn, &state).await {
            Some(frame) => frame,
            None => break,
        };

        let command: ClientCommand = match state.codec.decode(frame.as_bytes()) {
            Ok(command) => command,
            Err(e) => {
                debug!(%conn_id, error = %e, "failed to decode command");
                session.send(ServerEvent::Error {
                    kind: ErrorKind::Validation,
                    message: format!("invalid command: {e}"),
                });
                continue;
            }
        };

        let name = command.name();
        let room = command.room_id().cloned();
        if let Err(e) = session.dispatch(&state.registry, command).await {
            debug!(%conn_id, command = name, room = ?room, error = %e, "command rejected");
            session.send(ServerEvent::Error {
                kind: e.kind(),
                message: e.to_string(),
            });
        }
    }

    // The seat stays reserved for the reconnect grace period.
    if let Some(room) = session.room.take() {
        if let Err(e) = room.disconnect(conn_id).await {
            debug!(%conn_id, error = %e, "room gone before disconnect");
        }
    }
    drop(session);
    writer.abort();
    let _ = conn.close().await;
    Ok(())
}

/// Waits for the next frame. `None` ends the connection.
async fn next_frame<C: Codec>(
    conn: &WebSocketConnection,
    state: &ServerState<C>,
) -> Option<Frame> {
    let conn_id = conn.id();
    let received = match state.idle_timeout {
        Some(limit) => match tokio::time::timeout(limit, conn.recv()).await {
            Ok(received) => received,
            Err(_) => {
                info!(%conn_id, "connection timed out");
                return None;
            }
        },
        None => conn.recv().await,
    };

    match received {
        Ok(Some(frame)) => Some(frame),
        Ok(None) => {
            info!(%conn_id, "connection closed cleanly");
            None
        }
        Err(e) => {
            debug!(%conn_id, error = %e, "recv error");
            None
        }
    }
}

/// Encodes and writes every event pushed to the connection.
async fn write_events<C: Codec>(
    conn: Arc<WebSocketConnection>,
    state: Arc<ServerState<C>>,
    mut rx: mpsc::UnboundedReceiver<ServerEvent>,
) {
    let conn_id = conn.id();
    while let Some(event) = rx.recv().await {
        let text = match state.codec.encode(&event) {
            Ok(text) => text,
            Err(e) => {
                warn!(%conn_id, event = event.name(), error = %e, "failed to encode event");
                continue;
            }
        };
        if let Err(e) = conn.send_text(&text).await {
            debug!(%conn_id, error = %e, "send failed, stopping writer");
            break;
        }
    }
}

/// What the gateway knows about one connection: at most one room.
struct Session {
    conn: ConnectionId,
    tx: EventSender,
    room: Option<RoomHandle>,
}

impl Session {
    fn send(&self, event: ServerEvent) {
        let _ = self.tx.send(event);
    }

    /// The current room, if it is `code`.
    fn room_for(&self, code: &RoomCode) -> Result<&RoomHandle, RoomError> {
        match &self.room {
            Some(room) if room.code() == code => Ok(room),
            _ => Err(RoomError::NotInRoom(code.clone())),
        }
    }

    async fn request(&self, code: &RoomCode, request: RoomRequest) -> Result<(), RoomError> {
        self.room_for(code)?.act(self.conn, request).await
    }

    async fn game(
        &self,
        code: &RoomCode,
        action: GameAction,
        claimed: Option<String>,
    ) -> Result<(), RoomError> {
        self.request(code, RoomRequest::Game { action, claimed })
            .await
    }

    /// Leaves the current room, if any, unless it is `keep`.
    async fn leave_current(&mut self, keep: Option<&RoomHandle>) {
        let Some(old) = self.room.take() else {
            return;
        };
        let same = keep.is_some_and(|k| k.code() == old.code() && k.instance() == old.instance());
        if same {
            return;
        }
        if let Err(e) = old.leave(self.conn).await {
            debug!(conn_id = %self.conn, room = %old.code(), error = %e, "leaving previous room failed");
        }
    }

    async fn dispatch(
        &mut self,
        registry: &RoomRegistry,
        command: ClientCommand,
    ) -> Result<(), RoomError> {
        match command {
            ClientCommand::Ping => {
                self.send(ServerEvent::Pong);
                Ok(())
            }

            ClientCommand::CreateRoom {
                player,
                player_id,
                game_type,
                rounds,
            } => {
                let identity = Identity::new(player, player_id);
                let (handle, _) = registry
                    .create(game_type, identity, rounds, self.conn, self.tx.clone())
                    .await?;
                self.leave_current(None).await;
                self.room = Some(handle);
                Ok(())
            }

            ClientCommand::JoinRoom {
                room_id,
                player,
                player_id,
            } => {
                let handle = registry.get_or_restore(&room_id).await?;
                handle
                    .join(Identity::new(player, player_id), self.conn, self.tx.clone())
                    .await?;
                self.leave_current(Some(&handle)).await;
                self.room = Some(handle);
                Ok(())
            }

            ClientCommand::LeaveRoom { room_id } => {
                self.room_for(&room_id)?.leave(self.conn).await?;
                self.room = None;
                Ok(())
            }

            ClientCommand::StartGame { room_id } => {
                self.request(&room_id, RoomRequest::Start).await
            }

            ClientCommand::SpinPlayer { room_id } => {
                self.game(&room_id, GameAction::Spin, None).await
            }

            ClientCommand::SubmitTruthDare { room_id, choice } => {
                self.game(&room_id, GameAction::Choose(choice), None)
                    .await
            }

            ClientCommand::SendPrompt {
                room_id,
                prompt,
                kind,
            } => {
                self.game(&room_id, GameAction::SendPrompt { prompt, kind }, None)
                    .await
            }

            ClientCommand::ProofUploaded {
                room_id,
                player,
                proof_key,
            } => {
                self.game(
                    &room_id,
                    GameAction::SubmitProof { key: proof_key },
                    Some(player),
                )
                .await
            }

            ClientCommand::TruthCompleted {
                room_id,
                player,
                text,
            } => {
                self.game(&room_id, GameAction::CompleteTruth { text }, Some(player))
                    .await
            }

            ClientCommand::SubmitVote {
                room_id,
                voter,
                vote,
            } => {
                self.game(&room_id, GameAction::Vote(vote), Some(voter))
                    .await
            }

            ClientCommand::SubmitAnswer { room_id, answer } => {
                self.game(&room_id, GameAction::Answer(answer), None)
                    .await
            }

            ClientCommand::NextRound { room_id } => {
                self.game(&room_id, GameAction::NextRound, None).await
            }

            ClientCommand::KickPlayer {
                room_id,
                player_name,
            } => {
                self.request(
                    &room_id,
                    RoomRequest::Kick {
                        target: player_name,
                    },
                )
                .await
            }

            ClientCommand::SendChat { room_id, message } => {
                self.request(&room_id, RoomRequest::Chat { text: message })
                    .await
            }
        }
    }
}
