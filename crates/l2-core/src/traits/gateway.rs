//! Kernel tunnel/session/interface capability

use async_trait::async_trait;
use ipnetwork::Ipv4Network;
use std::net::Ipv4Addr;

use crate::error::GatewayError;
use crate::types::{InterfaceStatus, Presence};

/// Parameters of an IP-encapsulated L2TPv3 tunnel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TunnelSpec {
    pub tunnel_id: u32,
    pub peer_tunnel_id: u32,
    pub local: Ipv4Addr,
    pub remote: Ipv4Addr,
}

/// Parameters of a session inside an existing tunnel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSpec {
    pub tunnel_id: u32,
    pub session_id: u32,
    pub peer_session_id: u32,
    /// Name the kernel gives the session's interface
    pub interface: String,
}

/// Raw listing text for diagnostics; failures carry the error text instead
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Listings {
    pub tunnels: String,
    pub sessions: String,
    pub interface: String,
}

/// Query and mutate the kernel's L2TP tunnel, session and link state
///
/// Queries never fail: an unreadable listing is [`Presence::Unknown`] or an
/// empty [`InterfaceStatus`]. Mutations fail with [`GatewayError`], using
/// [`GatewayError::AlreadyExists`] when the kernel reports a duplicate.
#[async_trait]
pub trait SystemGateway: Send + Sync {
    async fn tunnel_presence(&self, tunnel_id: u32) -> Presence;

    async fn session_presence(&self, tunnel_id: u32, session_id: u32) -> Presence;

    async fn interface_status(&self, interface: &str) -> InterfaceStatus;

    async fn listings(&self, interface: &str) -> Listings;

    async fn create_tunnel(&self, spec: &TunnelSpec) -> Result<(), GatewayError>;

    async fn delete_tunnel(&self, tunnel_id: u32) -> Result<(), GatewayError>;

    async fn create_session(&self, spec: &SessionSpec) -> Result<(), GatewayError>;

    async fn delete_session(&self, tunnel_id: u32, session_id: u32) -> Result<(), GatewayError>;

    async fn set_link_up(&self, interface: &str) -> Result<(), GatewayError>;

    async fn add_address(&self, interface: &str, address: Ipv4Network) -> Result<(), GatewayError>;

    /// Fail-safe predicate: false unless the tunnel is positively listed
    async fn tunnel_exists(&self, tunnel_id: u32) -> bool {
        self.tunnel_presence(tunnel_id).await.is_present()
    }

    /// Fail-safe predicate: false unless the session is positively listed
    async fn session_exists(&self, tunnel_id: u32, session_id: u32) -> bool {
        self.session_presence(tunnel_id, session_id).await.is_present()
    }
}
