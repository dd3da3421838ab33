//! Application settings

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::serde_utils::{duration_millis, duration_secs};
use crate::error::ConfigError;

/// Settings shared by every l2tpctl command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Directory holding one TOML record per tunnel
    pub tunnels_dir: PathBuf,

    /// Directory the relay service units are written to
    pub unit_dir: PathBuf,

    /// Unit name prefix; a forward of port N is `<prefix>-N.service`
    pub unit_prefix: String,

    /// TCP relay executable used by the generated units
    pub relay_binary: PathBuf,

    /// Hard limit for every external command
    #[serde(with = "duration_secs")]
    pub command_timeout: Duration,

    /// Wait between session creation and bringing the interface up
    #[serde(with = "duration_millis")]
    pub settle_delay: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            tunnels_dir: super::default_tunnels_dir(),
            unit_dir: PathBuf::from("/etc/systemd/system"),
            unit_prefix: "l2tpctl-fwd".to_string(),
            relay_binary: PathBuf::from("/usr/bin/socat"),
            command_timeout: Duration::from_secs(30),
            settle_delay: Duration::from_millis(500),
        }
    }
}

impl Settings {
    /// Load settings from `path`, falling back to defaults when the file is absent
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        match super::load_config(path) {
            Ok(settings) => Ok(settings),
            Err(ConfigError::NotFound(_)) => {
                tracing::debug!("No settings at {:?}, using defaults", path);
                Ok(Self::default())
            }
            Err(e) => Err(e),
        }
    }

    /// Render the settings as TOML
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}
