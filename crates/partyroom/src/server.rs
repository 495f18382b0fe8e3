//! `PartyroomServer` builder and server loop.
//!
//! This is the entry point for running a Partyroom server. It ties the
//! layers together: transport → protocol → room registry.

use std::sync::Arc;
use std::time::Duration;

use partyroom_protocol::{Codec, JsonCodec};
use partyroom_room::{RoomRegistry, RoomServices};
use partyroom_transport::{Transport, WebSocketTransport};
use tracing::{debug, error, info};

use crate::handler::handle_connection;
use crate::{PartyroomError, ServerConfig};

/// Shared server state passed to each connection handler task.
///
/// The registry is the only shared room structure; each room's state
/// lives in its own actor.
pub(crate) struct ServerState<C: Codec> {
    pub(crate) registry: Arc<RoomRegistry>,
    pub(crate) codec: C,
    pub(crate) idle_timeout: Option<Duration>,
}

/// Builder for configuring and starting a Partyroom server.
///
/// # Example
///
/// ```rust,ignore
/// use partyroom::prelude::*;
///
/// let server = PartyroomServer::builder()
///     .config(ServerConfig::from_env()?)
///     .build()
///     .await?;
/// server.run().await
/// ```
pub struct PartyroomServerBuilder {
    config: ServerConfig,
    services: RoomServices,
}

impl PartyroomServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
            services: RoomServices::default(),
        }
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind = addr.to_string();
        self
    }

    /// Sets the store, presence and media collaborators.
    pub fn services(mut self, services: RoomServices) -> Self {
        self.services = services;
        self
    }

    /// Binds the listener and builds the server.
    ///
    /// Uses `JsonCodec` and `WebSocketTransport`.
    pub async fn build(self) -> Result<PartyroomServer<JsonCodec>, PartyroomError> {
        let transport = WebSocketTransport::bind(&self.config.bind).await?;
        let registry = Arc::new(RoomRegistry::with_services(
            self.config.rooms.clone(),
            self.services,
        ));

        let state = Arc::new(ServerState {
            registry,
            codec: JsonCodec,
            idle_timeout: self.config.idle_timeout(),
        });

        Ok(PartyroomServer { transport, state })
    }
}

impl Default for PartyroomServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A running Partyroom server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct PartyroomServer<C: Codec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<C>>,
}

impl PartyroomServer<JsonCodec> {
    /// Creates a new builder.
    pub fn builder() -> PartyroomServerBuilder {
        PartyroomServerBuilder::new()
    }
}

impl<C: Codec> PartyroomServer<C> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// The room registry shared by every connection.
    pub fn registry(&self) -> Arc<RoomRegistry> {
        Arc::clone(&self.state.registry)
    }

    /// Runs the accept loop and the idle-room reaper.
    ///
    /// Spawns a handler task per accepted connection. Runs until the
    /// process is terminated.
    pub async fn run(mut self) -> Result<(), PartyroomError> {
        let _reaper = self.state.registry.spawn_reaper();
        info!(addr = ?self.local_addr().ok(), "Partyroom server running");

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state).await {
                            debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    error!(error = %e, "accept failed");
                }
            }
        }
    }
}
