//! Configuration management for l2tpctl

mod settings;
mod store;
mod tunnel;
pub mod serde_utils;

pub use settings::Settings;
pub use store::TunnelStore;
pub use tunnel::{TunnelConfig, TunnelPatch};

use crate::error::ConfigError;
use std::path::{Path, PathBuf};

/// Get the default configuration directory
pub fn default_config_dir() -> PathBuf {
    PathBuf::from("/etc/l2tpctl")
}

/// Get the default configuration file path
pub fn default_config_path() -> PathBuf {
    default_config_dir().join("config.toml")
}

/// Get the default directory holding one record per tunnel
pub fn default_tunnels_dir() -> PathBuf {
    default_config_dir().join("tunnels")
}

/// Load configuration from a file
pub fn load_config<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;

    let config: T = toml::from_str(&content)?;
    Ok(config)
}

/// Save configuration to a file
///
/// The file is readable by its owner only; tunnel records carry endpoint
/// addresses of both hosts.
pub fn save_config<T: serde::Serialize>(path: &Path, config: &T) -> Result<(), ConfigError> {
    let content = toml::to_string_pretty(config)?;

    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::io(parent, e))?;
    }

    std::fs::write(path, content).map_err(|e| ConfigError::io(path, e))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
            .map_err(|e| ConfigError::io(path, e))?;
    }

    Ok(())
}
