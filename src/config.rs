//! Bridge configuration.
//!
//! Values come from, in increasing precedence: built-in defaults, an optional
//! `config/bridge.toml`, and `JUDGE_BRIDGE__*` environment variables
//! (e.g. `JUDGE_BRIDGE__CLIENT__ADDRESS=10.0.0.5:9999`).

use std::time::Duration;

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::Result;

/// Server-side settings.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ListenConfig {
    /// Address to bind, e.g. `127.0.0.1:9999`.
    pub address: String,
    /// Connections served at once before new ones are dropped.
    pub max_connections: usize,
    /// Per-read/write deadline in seconds; 0 disables it.
    pub io_timeout_secs: u64,
}

impl ListenConfig {
    /// The I/O deadline, if enabled.
    pub fn io_timeout(&self) -> Option<Duration> {
        secs(self.io_timeout_secs)
    }
}

/// Front-end side settings.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ClientConfig {
    /// Address of the bridge server.
    pub address: String,
    /// Connect deadline in seconds; 0 disables it.
    pub connect_timeout_secs: u64,
    /// Per-read/write deadline in seconds; 0 disables it.
    pub io_timeout_secs: u64,
}

impl ClientConfig {
    /// Settings for a bridge at `address` with no deadlines.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            connect_timeout_secs: 0,
            io_timeout_secs: 0,
        }
    }

    /// Set the connect deadline.
    pub fn connect_timeout_secs(mut self, secs: u64) -> Self {
        self.connect_timeout_secs = secs;
        self
    }

    /// Set the per-read/write deadline.
    pub fn io_timeout_secs(mut self, secs: u64) -> Self {
        self.io_timeout_secs = secs;
        self
    }

    /// The connect deadline, if enabled.
    pub fn connect_timeout(&self) -> Option<Duration> {
        secs(self.connect_timeout_secs)
    }

    /// The I/O deadline, if enabled.
    pub fn io_timeout(&self) -> Option<Duration> {
        secs(self.io_timeout_secs)
    }
}

/// Complete bridge configuration.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct BridgeConfig {
    pub listen: ListenConfig,
    pub client: ClientConfig,
}

impl BridgeConfig {
    /// Load from `config/bridge.toml` and the environment.
    pub fn load() -> Result<Self> {
        Self::load_from("config/bridge")
    }

    /// Load from a specific file (extension optional) and the environment.
    pub fn load_from(path: &str) -> Result<Self> {
        let s = Config::builder()
            .set_default("listen.address", "127.0.0.1:9999")?
            .set_default("listen.max_connections", 256)?
            .set_default("listen.io_timeout_secs", 30)?
            .set_default("client.address", "127.0.0.1:9999")?
            .set_default("client.connect_timeout_secs", 5)?
            .set_default("client.io_timeout_secs", 30)?
            .add_source(File::with_name(path).required(false))
            .add_source(Environment::with_prefix("JUDGE_BRIDGE").separator("__"))
            .build()?;

        Ok(s.try_deserialize()?)
    }
}

fn secs(value: u64) -> Option<Duration> {
    (value > 0).then(|| Duration::from_secs(value))
}
