//! l2-core: Core types, configuration and capability traits for l2tpctl
//!
//! This crate holds the desired-state model of a tunnel, the file-backed
//! tunnel store, the report types every operation returns, and the traits
//! through which the reconcilers reach the kernel and the service supervisor.

pub mod config;
pub mod error;
pub mod report;
pub mod traits;
pub mod types;

pub use error::{ConfigError, GatewayError, L2Error, ReconcileError};
pub use report::{BatchReport, SequenceReport, Step, StepResult};
pub use types::{Presence, Side, TunnelIds};
