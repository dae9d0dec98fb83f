use crate::event::AncientMode;
use crate::sync::SyncConfig;
use crate::NodeId;

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, File};
use serde::Deserialize;

use std::time::Duration;

// For explanation, see issue: https://github.com/serde-rs/serde/issues/368
fn default_event_creation_interval_ms() -> u64 {
    1_000
}
fn default_sync_interval_ms() -> u64 {
    250
}
fn default_fallen_behind_threshold() -> f64 {
    0.5
}
fn default_window_update_interval_ms() -> u64 {
    1_000
}
fn default_non_ancient_span() -> u64 {
    26
}
fn default_expired_span() -> u64 {
    52
}

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub node_id: NodeId,
    pub listener_ip: String,
    /// Peers to gossip with, as `ID@IP`.
    #[serde(default)]
    pub peers: Vec<String>,
    #[serde(default)]
    pub ancient_mode: AncientMode,
    #[serde(default = "default_event_creation_interval_ms")]
    pub event_creation_interval_ms: u64,
    #[serde(default = "default_sync_interval_ms")]
    pub sync_interval_ms: u64,
    /// Fraction of peers that must report us behind before we consider ourselves behind.
    #[serde(default = "default_fallen_behind_threshold")]
    pub fallen_behind_threshold: f64,
    #[serde(default = "default_window_update_interval_ms")]
    pub window_update_interval_ms: u64,
    /// How far below the highest known indicator events stay non-ancient.
    #[serde(default = "default_non_ancient_span")]
    pub non_ancient_span: u64,
    /// How far below the highest known indicator events are kept in memory.
    #[serde(default = "default_expired_span")]
    pub expired_span: u64,
    #[serde(default)]
    pub sync: SyncConfig,
}

/// Values given on the command line, applied over the configuration file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub node_id: Option<String>,
    pub listener_ip: Option<String>,
    pub peers: Vec<String>,
}

impl Settings {
    /// Reads `config_file` if given, then the optional `<config_file>.<RUN_ENV>` file, then
    /// applies `overrides`.
    pub fn new(config_file: Option<&str>, overrides: Overrides) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = config_file {
            builder = builder.add_source(File::with_name(path));
            if let Ok(env) = std::env::var("RUN_ENV") {
                builder = builder.add_source(File::with_name(&format!("{}.{}", path, env)).required(false));
            }
        }
        Settings::build(builder, overrides)
    }

    fn build(mut builder: ConfigBuilder<DefaultState>, overrides: Overrides) -> Result<Self, ConfigError> {
        if let Some(node_id) = overrides.node_id {
            builder = builder.set_override("node_id", node_id)?;
        }
        if let Some(listener_ip) = overrides.listener_ip {
            builder = builder.set_override("listener_ip", listener_ip)?;
        }
        if !overrides.peers.is_empty() {
            builder = builder.set_override("peers", overrides.peers)?;
        }
        builder.build()?.try_deserialize()
    }

    pub fn event_creation_interval(&self) -> Duration {
        Duration::from_millis(self.event_creation_interval_ms)
    }

    pub fn sync_interval(&self) -> Duration {
        Duration::from_millis(self.sync_interval_ms)
    }

    pub fn window_update_interval(&self) -> Duration {
        Duration::from_millis(self.window_update_interval_ms)
    }
}
