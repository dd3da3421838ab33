//! `SystemGateway` bound to iproute2

use std::sync::Arc;

use async_trait::async_trait;
use ipnetwork::Ipv4Network;

use l2_core::error::GatewayError;
use l2_core::traits::{CommandOutput, CommandRunner, Listings, SessionSpec, SystemGateway, TunnelSpec};
use l2_core::types::{InterfaceStatus, Presence};

use crate::inspect::StateInspector;

/// Text iproute2 prints when the kernel object is already there
pub const ALREADY_EXISTS_MARKER: &str = "File exists";

/// Kernel L2TP gateway issuing `ip` commands
#[derive(Clone)]
pub struct LinuxGateway {
    runner: Arc<dyn CommandRunner>,
    inspector: StateInspector,
}

impl LinuxGateway {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        let inspector = StateInspector::new(Arc::clone(&runner));
        Self { runner, inspector }
    }

    pub fn inspector(&self) -> &StateInspector {
        &self.inspector
    }

    async fn ip(&self, args: &[&str]) -> Result<(), GatewayError> {
        let out = self.runner.run("ip", args).await;
        check(out)
    }
}

/// Map a command result onto the gateway error kinds
fn check(out: CommandOutput) -> Result<(), GatewayError> {
    if out.success {
        return Ok(());
    }
    let detail = out.detail().to_string();
    if detail.contains(ALREADY_EXISTS_MARKER) {
        Err(GatewayError::AlreadyExists(detail))
    } else {
        Err(GatewayError::Command {
            detail,
            exit_code: out.exit_code,
        })
    }
}

#[async_trait]
impl SystemGateway for LinuxGateway {
    async fn tunnel_presence(&self, tunnel_id: u32) -> Presence {
        self.inspector.tunnel_presence(tunnel_id).await
    }

    async fn session_presence(&self, tunnel_id: u32, session_id: u32) -> Presence {
        self.inspector.session_presence(tunnel_id, session_id).await
    }

    async fn interface_status(&self, interface: &str) -> InterfaceStatus {
        self.inspector.interface_status(interface).await
    }

    async fn listings(&self, interface: &str) -> Listings {
        let tunnels = self.inspector.tunnel_listing().await;
        let sessions = self.inspector.session_listing().await;
        let iface = self.inspector.interface_listing(interface).await;
        Listings {
            tunnels: tunnels.display_text().to_string(),
            sessions: sessions.display_text().to_string(),
            interface: iface.display_text().to_string(),
        }
    }

    async fn create_tunnel(&self, spec: &TunnelSpec) -> Result<(), GatewayError> {
        let tunnel_id = spec.tunnel_id.to_string();
        let peer_tunnel_id = spec.peer_tunnel_id.to_string();
        let local = spec.local.to_string();
        let remote = spec.remote.to_string();
        self.ip(&[
            "l2tp",
            "add",
            "tunnel",
            "tunnel_id",
            &tunnel_id,
            "peer_tunnel_id",
            &peer_tunnel_id,
            "encap",
            "ip",
            "local",
            &local,
            "remote",
            &remote,
        ])
        .await
    }

    async fn delete_tunnel(&self, tunnel_id: u32) -> Result<(), GatewayError> {
        let tunnel_id = tunnel_id.to_string();
        self.ip(&["l2tp", "del", "tunnel", "tunnel_id", &tunnel_id]).await
    }

    async fn create_session(&self, spec: &SessionSpec) -> Result<(), GatewayError> {
        let tunnel_id = spec.tunnel_id.to_string();
        let session_id = spec.session_id.to_string();
        let peer_session_id = spec.peer_session_id.to_string();
        self.ip(&[
            "l2tp",
            "add",
            "session",
            "name",
            &spec.interface,
            "tunnel_id",
            &tunnel_id,
            "session_id",
            &session_id,
            "peer_session_id",
            &peer_session_id,
        ])
        .await
    }

    async fn delete_session(&self, tunnel_id: u32, session_id: u32) -> Result<(), GatewayError> {
        let tunnel_id = tunnel_id.to_string();
        let session_id = session_id.to_string();
        self.ip(&[
            "l2tp",
            "del",
            "session",
            "tunnel_id",
            &tunnel_id,
            "session_id",
            &session_id,
        ])
        .await
    }

    async fn set_link_up(&self, interface: &str) -> Result<(), GatewayError> {
        self.ip(&["link", "set", interface, "up"]).await
    }

    async fn add_address(&self, interface: &str, address: Ipv4Network) -> Result<(), GatewayError> {
        let cidr = address.to_string();
        self.ip(&["addr", "add", &cidr, "dev", interface]).await
    }
}
