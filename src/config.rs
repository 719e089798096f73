//! Configuration module for the search synchronization layer.
//!
//! Layered configuration:
//! - Default values
//! - TOML configuration file (`docsync.toml`)
//! - Environment variable overrides
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `DOCSYNC_` and use double
//! underscores to separate nested levels:
//! - `DOCSYNC_SERVER__HOST=search.internal` sets `server.host`
//! - `DOCSYNC_SERVER__API_KEY=xyz` sets `server.api_key`
//! - `DOCSYNC_SYNC__MODE=deferred` sets `sync.mode`

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::SyncError;
use crate::sync::SyncMode;

pub const CONFIG_FILE: &str = "docsync.toml";
const ENV_PREFIX: &str = "DOCSYNC_";

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Settings {
    /// Remote engine connection settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Change propagation settings
    #[serde(default)]
    pub sync: SyncConfig,

    /// Local embedding model settings
    #[serde(default)]
    pub embedding: EmbeddingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// `http` or `https`
    #[serde(default = "default_protocol")]
    pub protocol: String,

    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_timeout_secs")]
    pub connection_timeout_secs: u64,
}

impl ServerConfig {
    pub fn base_url(&self) -> String {
        format!("{}://{}:{}", self.protocol, self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            protocol: default_protocol(),
            api_key: String::new(),
            connection_timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SyncConfig {
    /// `inline` or `deferred`
    #[serde(default = "default_sync_mode")]
    pub mode: String,

    /// Debounce applied to deferred save tasks, in milliseconds
    #[serde(default)]
    pub save_delay_ms: u64,
}

impl SyncConfig {
    pub fn sync_mode(&self) -> Result<SyncMode, SyncError> {
        match self.mode.as_str() {
            "inline" => Ok(SyncMode::Inline),
            "deferred" => Ok(SyncMode::Deferred),
            other => Err(SyncError::ConfigError {
                reason: format!("unknown sync mode '{other}', expected 'inline' or 'deferred'"),
            }),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            mode: default_sync_mode(),
            save_delay_ms: 0,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct EmbeddingConfig {
    /// Model used for locally computed embedding fields
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Where downloaded model files are cached
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: default_embedding_model(),
            cache_dir: None,
        }
    }
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    8108
}

fn default_protocol() -> String {
    "http".to_string()
}

fn default_timeout_secs() -> u64 {
    2
}

fn default_sync_mode() -> String {
    "inline".to_string()
}

fn default_embedding_model() -> String {
    "AllMiniLML6V2".to_string()
}

impl Settings {
    /// Load configuration from all sources
    pub fn load() -> Result<Self, Box<figment::Error>> {
        Self::load_from(CONFIG_FILE)
    }

    /// Load configuration from a specific file
    pub fn load_from(path: impl AsRef<std::path::Path>) -> Result<Self, Box<figment::Error>> {
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path))
            // Double underscore separates nesting levels; single
            // underscores stay inside field names.
            .merge(
                Env::prefixed(ENV_PREFIX)
                    .map(|key| key.as_str().to_lowercase().replace("__", ".").into()),
            )
            .extract()
            .map_err(Box::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_point_at_local_engine() {
        let settings = Settings::default();
        assert_eq!(settings.server.base_url(), "http://localhost:8108");
        assert_eq!(settings.server.connection_timeout_secs, 2);
        assert_eq!(settings.sync.sync_mode().unwrap(), SyncMode::Inline);
        assert_eq!(settings.sync.save_delay_ms, 0);
        assert_eq!(settings.embedding.model, "AllMiniLML6V2");
    }

    #[test]
    fn toml_file_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::with_suffix(".toml").unwrap();
        writeln!(
            file,
            "[server]\nhost = \"search.internal\"\nprotocol = \"https\"\napi_key = \"k\"\n\n[sync]\nmode = \"deferred\"\nsave_delay_ms = 250\n"
        )
        .unwrap();

        let settings = Settings::load_from(file.path()).unwrap();
        assert_eq!(settings.server.base_url(), "https://search.internal:8108");
        assert_eq!(settings.server.api_key, "k");
        assert_eq!(settings.sync.sync_mode().unwrap(), SyncMode::Deferred);
        assert_eq!(settings.sync.save_delay_ms, 250);
    }

    #[test]
    fn unknown_sync_mode_is_rejected() {
        let config = SyncConfig {
            mode: "sometimes".to_string(),
            save_delay_ms: 0,
        };
        assert!(config.sync_mode().is_err());
    }
}
