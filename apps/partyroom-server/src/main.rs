//! Partyroom server.
//!
//! Settings come from the TOML file named by `PARTYROOM_CONFIG`, with
//! `PARTYROOM_BIND` overriding the listen address. Log filtering follows
//! `RUST_LOG` (default `info`).

use std::sync::Arc;

use partyroom::prelude::*;
use partyroom_game::{MediaResolver, PassthroughMedia, PrefixMedia};
use partyroom_room::NullPresence;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), PartyroomError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .compact()
        .init();

    let config = ServerConfig::from_env().inspect_err(|e| error!(error = %e, "bad configuration"))?;

    let media: Arc<dyn MediaResolver> = match &config.media_base_url {
        Some(base) => Arc::new(PrefixMedia::new(base.clone())),
        None => Arc::new(PassthroughMedia),
    };
    // Reaped rooms can be revived from here by code.
    let services = RoomServices {
        store: Arc::new(MemoryStore::new()),
        presence: Arc::new(NullPresence),
        media,
    };

    info!(
        bind = %config.bind,
        identity = ?config.rooms.identity,
        grace_secs = config.rooms.reconnect_grace_secs,
        "starting partyroom"
    );
    let server = PartyroomServer::builder()
        .config(config)
        .services(services)
        .build()
        .await?;
    server.run().await
}
