use std::path::Path;

use serde::Deserialize;

use crate::consts;
use crate::error::{Error, Result};

/// Client configuration, loaded from a TOML file with CLI overrides
/// applied on top.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Multiworld server address (host or host:port).
    pub server: Option<String>,
    /// Preferred device identity; the first discovered device is used when
    /// unset.
    pub device: Option<String>,
    /// Device daemon WebSocket endpoint.
    pub daemon: String,
    /// Room password, when the server requires one.
    pub password: Option<String>,
    /// Whether to deliver server-sent items into the game.
    pub receive_items: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: None,
            device: None,
            daemon: consts::device::DEFAULT_ADDRESS.to_string(),
            password: None,
            receive_items: true,
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        toml::from_str(&text).map_err(|err| Error::Config(err.to_string()))
    }
}
