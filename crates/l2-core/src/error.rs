//! Core error types for l2tpctl

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for the l2tpctl ecosystem
#[derive(Error, Debug)]
pub enum L2Error {
    /// Reconciliation error
    #[error("Reconcile error: {0}")]
    Reconcile(#[from] ReconcileError),

    /// Gateway error
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Outcome kinds of a single reconciliation step
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReconcileError {
    /// Required desired-state fields are missing
    #[error("{0}")]
    ConfigIncomplete(String),

    /// The resource is already present
    #[error("{0}")]
    AlreadyExists(String),

    /// An ordering prerequisite does not hold (e.g. session before tunnel)
    #[error("{0}")]
    PrerequisiteMissing(String),

    /// The external command failed or timed out
    #[error("{0}")]
    CommandFailed(String),

    /// Malformed operator input (port list entries and the like)
    #[error("{0}")]
    ParseFailure(String),
}

impl ReconcileError {
    /// Whether a sequence may continue past this outcome
    pub fn is_benign(&self) -> bool {
        matches!(self, ReconcileError::AlreadyExists(_))
    }

    /// Short name of the error kind, logged with failed sequence steps
    pub fn kind(&self) -> &'static str {
        match self {
            ReconcileError::ConfigIncomplete(_) => "config-incomplete",
            ReconcileError::AlreadyExists(_) => "already-exists",
            ReconcileError::PrerequisiteMissing(_) => "prerequisite-missing",
            ReconcileError::CommandFailed(_) => "command-failed",
            ReconcileError::ParseFailure(_) => "parse-failure",
        }
    }
}

/// Failures reported by a system capability (kernel or supervisor)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// The command ran and failed
    #[error("{detail} (exit code {exit_code})")]
    Command { detail: String, exit_code: i32 },

    /// The OS refused because the object already exists
    #[error("{0}")]
    AlreadyExists(String),

    /// Local file handling failed
    #[error("{0}")]
    Io(String),
}

impl GatewayError {
    /// Human-readable detail without the exit code decoration
    pub fn detail(&self) -> &str {
        match self {
            GatewayError::Command { detail, .. } => detail,
            GatewayError::AlreadyExists(detail) => detail,
            GatewayError::Io(detail) => detail,
        }
    }
}

impl From<std::io::Error> for GatewayError {
    fn from(err: std::io::Error) -> Self {
        GatewayError::Io(err.to_string())
    }
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file not found
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    /// Tunnel record not found in the store
    #[error("Tunnel not found: {0}")]
    TunnelNotFound(String),

    /// Tunnel record already stored under this name
    #[error("Tunnel already exists: {0}")]
    TunnelExists(String),

    /// Invalid tunnel name
    #[error("Invalid tunnel name: {0:?}")]
    InvalidName(String),

    /// Invalid configuration
    #[error("Invalid config: {0}")]
    Invalid(String),

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML serialize error
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// I/O error while reading or writing the store
    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ConfigError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::Io {
            path: path.into(),
            source,
        }
    }
}
