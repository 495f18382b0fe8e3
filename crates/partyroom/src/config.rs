//! Server settings, read from TOML.
//!
//! ```toml
//! bind = "0.0.0.0:8080"
//! idle_timeout_secs = 120
//! media_base_url = "https://cdn.example.com/proofs"
//!
//! [rooms]
//! reconnect_grace_secs = 30
//! chat_capacity = 100
//!
//! [rooms.game]
//! total_rounds = 5
//! voters = "exclude-performer"
//!
//! [rooms.game.timings]
//! choice_timeout_secs = 15
//! ```
//!
//! Every key is optional. `PARTYROOM_CONFIG` names the file and
//! `PARTYROOM_BIND` overrides `bind`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use partyroom_room::RoomConfig;
use serde::{Deserialize, Serialize};

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "PARTYROOM_CONFIG";

/// Environment variable overriding the bind address.
pub const BIND_ENV: &str = "PARTYROOM_BIND";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level server settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,

    /// A connection that sends nothing for this long is dropped.
    /// `0` disables the limit.
    pub idle_timeout_secs: u64,

    /// Base URL proof keys are joined onto. Keys are used as-is when unset.
    pub media_base_url: Option<String>,

    pub rooms: RoomConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
            idle_timeout_secs: 120,
            media_base_url: None,
            rooms: RoomConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn idle_timeout(&self) -> Option<Duration> {
        (self.idle_timeout_secs > 0).then(|| Duration::from_secs(self.idle_timeout_secs))
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    /// Loads the file named by `PARTYROOM_CONFIG` (defaults when unset),
    /// then applies `PARTYROOM_BIND`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::resolve(|key| std::env::var(key).ok())
    }

    fn resolve(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = match lookup(CONFIG_ENV) {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        if let Some(bind) = lookup(BIND_ENV).filter(|b| !b.trim().is_empty()) {
            config.bind = bind;
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use partyroom_game::VoterPolicy;
    use partyroom_room::IdentityMode;

    use super::*;

    #[test]
    fn test_empty_toml_is_default() {
        assert_eq!(ServerConfig::from_toml("").unwrap(), ServerConfig::default());
    }

    #[test]
    fn test_nested_sections_override_defaults() {
        let config = ServerConfig::from_toml(
            r#"
            bind = "0.0.0.0:9000"
            idle_timeout_secs = 0
            media_base_url = "https://cdn.example.com"

            [rooms]
            identity = "external-id"
            chat_capacity = 20

            [rooms.game]
            total_rounds = 3
            voters = "exclude-performer"

            [rooms.game.timings]
            choice_timeout_secs = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.bind, "0.0.0.0:9000");
        assert_eq!(config.idle_timeout(), None);
        assert_eq!(config.media_base_url.as_deref(), Some("https://cdn.example.com"));
        assert_eq!(config.rooms.identity, IdentityMode::ExternalId);
        assert_eq!(config.rooms.chat_capacity, 20);
        assert_eq!(config.rooms.reconnect_grace_secs, 30);
        assert_eq!(config.rooms.game.total_rounds, 3);
        assert_eq!(config.rooms.game.voters, VoterPolicy::ExcludePerformer);
        assert_eq!(config.rooms.game.timings.choice_timeout_secs, 5);
        assert_eq!(config.rooms.game.timings.vote_timeout_secs, 30);
    }

    #[test]
    fn test_bad_toml_is_an_error() {
        let err = ServerConfig::from_toml("bind = [").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_bind_override() {
        let config = ServerConfig::resolve(|key| (key == BIND_ENV).then(|| "0.0.0.0:1".into()))
            .unwrap();
        assert_eq!(config.bind, "0.0.0.0:1");
        assert_eq!(config.rooms, RoomConfig::default());
    }

    #[test]
    fn test_missing_file_is_reported() {
        let err = ServerConfig::resolve(|key| {
            (key == CONFIG_ENV).then(|| "/nonexistent/partyroom.toml".into())
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
