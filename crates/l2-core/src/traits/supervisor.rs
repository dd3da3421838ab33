//! Relay service supervision capability

use async_trait::async_trait;
use std::net::Ipv4Addr;

use crate::error::GatewayError;
use crate::types::{Enablement, ServiceActivity};

/// One supervised TCP relay per forwarded port
///
/// A relay listens on `port` and forwards each connection to `target:port`.
#[async_trait]
pub trait ServiceSupervisor: Send + Sync {
    /// Supervisor-facing name of the port's service
    fn unit_name(&self, port: u16) -> String;

    /// Whether the port's service definition is present
    async fn unit_exists(&self, port: u16) -> bool;

    /// Write or overwrite the port's service definition
    async fn write_unit(&self, port: u16, target: Ipv4Addr) -> Result<(), GatewayError>;

    /// Delete the port's service definition; returns false if none existed
    async fn remove_unit(&self, port: u16) -> Result<bool, GatewayError>;

    /// Make the supervisor re-read service definitions
    async fn reload(&self) -> Result<(), GatewayError>;

    /// Enable at boot and start now
    async fn enable_now(&self, port: u16) -> Result<(), GatewayError>;

    async fn start(&self, port: u16) -> Result<(), GatewayError>;

    async fn stop(&self, port: u16) -> Result<(), GatewayError>;

    async fn restart(&self, port: u16) -> Result<(), GatewayError>;

    async fn disable(&self, port: u16) -> Result<(), GatewayError>;

    /// Observed run state; query failures read as inactive
    async fn activity(&self, port: u16) -> ServiceActivity;

    /// Observed boot enablement; query failures read as disabled
    async fn enablement(&self, port: u16) -> Enablement;
}
