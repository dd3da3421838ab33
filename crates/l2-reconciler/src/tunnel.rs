//! Tunnel reconciler
//!
//! Moves the kernel toward a tunnel's desired state one step at a time:
//!
//! ```text
//! Absent -> TunnelOnly -> TunnelAndSession -> Up (+ address)
//! ```
//!
//! Every mutation is preceded by a fresh look at live state, and the kernel's
//! own "already exists" answer is recognized so that re-running converges.

use std::net::Ipv4Addr;
use std::time::Duration;

use ipnetwork::Ipv4Network;
use serde::Serialize;

use l2_core::config::TunnelConfig;
use l2_core::error::{GatewayError, ReconcileError};
use l2_core::report::{SequenceReport, Step, StepResult};
use l2_core::traits::{SessionSpec, SystemGateway, TunnelSpec};
use l2_core::types::{InterfaceStatus, Presence, TunnelIds};

/// Pause between session creation and link-up while the interface appears
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(500);

/// Whether a sequence has to stop after this step
pub(crate) fn is_fatal(result: &StepResult) -> bool {
    matches!(result, Err(e) if !e.is_benign())
}

fn unverified(what: &str, detail: &str) -> String {
    format!("{} state could not be verified ({})", what, detail)
}

/// Aggregate view of one tunnel for display
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TunnelStatus {
    pub name: String,
    pub configured: bool,
    pub local_ip: Option<Ipv4Addr>,
    pub remote_ip: Option<Ipv4Addr>,
    pub interface: String,
    pub interface_address: Ipv4Network,
    pub ids: TunnelIds,
    pub tunnel: Presence,
    pub session: Presence,
    pub link: InterfaceStatus,
    pub tunnel_listing: String,
    pub session_listing: String,
    pub interface_listing: String,
}

impl TunnelStatus {
    /// Tunnel and session present and the interface up
    pub fn is_running(&self) -> bool {
        self.tunnel.is_present() && self.session.is_present() && self.link.up
    }
}

/// Reconciles the kernel state of one tunnel against its record
pub struct TunnelReconciler<'a, G: SystemGateway + ?Sized> {
    config: &'a TunnelConfig,
    gateway: &'a G,
    settle_delay: Duration,
}

impl<'a, G: SystemGateway + ?Sized> TunnelReconciler<'a, G> {
    pub fn new(config: &'a TunnelConfig, gateway: &'a G) -> Self {
        Self {
            config,
            gateway,
            settle_delay: DEFAULT_SETTLE_DELAY,
        }
    }

    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    fn ids(&self) -> &TunnelIds {
        &self.config.ids
    }

    pub async fn create_tunnel(&self) -> StepResult {
        let (local, remote) = match (self.config.local_ip, self.config.remote_ip) {
            (Some(local), Some(remote)) => (local, remote),
            _ => {
                return Err(ReconcileError::ConfigIncomplete(
                    "IPs not configured. Please configure tunnel first.".into(),
                ))
            }
        };
        let tunnel_id = self.ids().tunnel_id;
        let exists_msg = || {
            format!(
                "Tunnel {} already exists. Delete it first or use recreate.",
                tunnel_id
            )
        };

        let note = match self.gateway.tunnel_presence(tunnel_id).await {
            Presence::Present => return Err(ReconcileError::AlreadyExists(exists_msg())),
            Presence::Absent => None,
            Presence::Unknown(detail) => Some(unverified("Tunnel", &detail)),
        };

        let spec = TunnelSpec {
            tunnel_id,
            peer_tunnel_id: self.ids().peer_tunnel_id,
            local,
            remote,
        };
        match self.gateway.create_tunnel(&spec).await {
            Ok(()) => {
                tracing::info!("Created tunnel {} ({} -> {})", tunnel_id, local, remote);
                let msg = format!("Tunnel {} created successfully", tunnel_id);
                Ok(with_note(msg, note))
            }
            Err(GatewayError::AlreadyExists(_)) => Err(ReconcileError::AlreadyExists(exists_msg())),
            Err(e) => Err(ReconcileError::CommandFailed(format!(
                "Failed to create tunnel: {}",
                e.detail()
            ))),
        }
    }

    pub async fn create_session(&self) -> StepResult {
        let ids = self.ids();
        match self.gateway.tunnel_presence(ids.tunnel_id).await {
            Presence::Present => {}
            Presence::Absent => {
                return Err(ReconcileError::PrerequisiteMissing(
                    "Tunnel does not exist. Create tunnel first.".into(),
                ))
            }
            Presence::Unknown(detail) => {
                return Err(ReconcileError::PrerequisiteMissing(format!(
                    "Tunnel does not exist. Create tunnel first. ({})",
                    unverified("Tunnel", &detail)
                )))
            }
        }

        let exists_msg = format!("Session {} already exists", ids.session_id);
        let note = match self
            .gateway
            .session_presence(ids.tunnel_id, ids.session_id)
            .await
        {
            Presence::Present => return Err(ReconcileError::AlreadyExists(exists_msg)),
            Presence::Absent => None,
            Presence::Unknown(detail) => Some(unverified("Session", &detail)),
        };

        let spec = SessionSpec {
            tunnel_id: ids.tunnel_id,
            session_id: ids.session_id,
            peer_session_id: ids.peer_session_id,
            interface: self.config.interface_name(),
        };
        match self.gateway.create_session(&spec).await {
            Ok(()) => {
                tracing::info!(
                    "Created session {} in tunnel {} as {}",
                    ids.session_id,
                    ids.tunnel_id,
                    spec.interface
                );
                let msg = format!("Session {} created successfully", ids.session_id);
                Ok(with_note(msg, note))
            }
            Err(GatewayError::AlreadyExists(_)) => Err(ReconcileError::AlreadyExists(exists_msg)),
            Err(e) => Err(ReconcileError::CommandFailed(format!(
                "Failed to create session: {}",
                e.detail()
            ))),
        }
    }

    pub async fn bring_up_interface(&self) -> StepResult {
        let interface = self.config.interface_name();
        if !self.settle_delay.is_zero() {
            tokio::time::sleep(self.settle_delay).await;
        }
        match self.gateway.set_link_up(&interface).await {
            Ok(()) => Ok(format!("Interface {} is up", interface)),
            Err(e) => Err(ReconcileError::CommandFailed(format!(
                "Failed to bring up {}: {}",
                interface,
                e.detail()
            ))),
        }
    }

    pub async fn assign_address(&self) -> StepResult {
        let interface = self.config.interface_name();
        let address = self.config.interface_address;
        let assigned = format!("IP {} already assigned", address);

        if self
            .gateway
            .interface_status(&interface)
            .await
            .has_address(&address)
        {
            return Ok(assigned);
        }

        match self.gateway.add_address(&interface, address).await {
            Ok(()) => Ok(format!("IP {} assigned to {}", address, interface)),
            Err(GatewayError::AlreadyExists(_)) => Ok(assigned),
            Err(e) => Err(ReconcileError::CommandFailed(format!(
                "Failed to assign IP: {}",
                e.detail()
            ))),
        }
    }

    pub async fn delete_session(&self) -> StepResult {
        let ids = self.ids();
        match self
            .gateway
            .session_presence(ids.tunnel_id, ids.session_id)
            .await
        {
            Presence::Present => {}
            Presence::Absent => return Ok("Session does not exist (already deleted)".into()),
            Presence::Unknown(detail) => {
                return Ok(format!(
                    "Session treated as deleted; {}",
                    unverified("Session", &detail)
                ))
            }
        }

        match self
            .gateway
            .delete_session(ids.tunnel_id, ids.session_id)
            .await
        {
            Ok(()) => {
                tracing::info!("Deleted session {} in tunnel {}", ids.session_id, ids.tunnel_id);
                Ok(format!("Session {} deleted", ids.session_id))
            }
            Err(e) => Err(ReconcileError::CommandFailed(format!(
                "Failed to delete session: {}",
                e.detail()
            ))),
        }
    }

    /// Delete the tunnel, removing its session first
    pub async fn delete_tunnel(&self) -> StepResult {
        let ids = self.ids();
        if let Err(e) = self.delete_session().await {
            return Err(ReconcileError::CommandFailed(format!(
                "Failed to delete session first: {}",
                e
            )));
        }

        match self.gateway.tunnel_presence(ids.tunnel_id).await {
            Presence::Present => {}
            Presence::Absent => return Ok("Tunnel does not exist (already deleted)".into()),
            Presence::Unknown(detail) => {
                return Ok(format!(
                    "Tunnel treated as deleted; {}",
                    unverified("Tunnel", &detail)
                ))
            }
        }

        match self.gateway.delete_tunnel(ids.tunnel_id).await {
            Ok(()) => {
                tracing::info!("Deleted tunnel {}", ids.tunnel_id);
                Ok(format!("Tunnel {} deleted", ids.tunnel_id))
            }
            Err(e) => Err(ReconcileError::CommandFailed(format!(
                "Failed to delete tunnel: {}",
                e.detail()
            ))),
        }
    }

    /// Create tunnel, session, link and address; already-present objects are accepted
    pub async fn full_setup(&self) -> SequenceReport {
        let name = &self.config.name;
        let mut report = SequenceReport::new(format!("Setting up tunnel: {}", name));

        if is_fatal(report.record(Step::CreateTunnel, self.create_tunnel().await)) {
            return report.abort();
        }
        if is_fatal(report.record(Step::CreateSession, self.create_session().await)) {
            return report.abort();
        }
        if is_fatal(report.record(Step::BringUpInterface, self.bring_up_interface().await)) {
            return report.abort();
        }
        if is_fatal(report.record(Step::AssignAddress, self.assign_address().await)) {
            return report.abort();
        }

        report.finish(format!("Tunnel '{}' setup complete!", name))
    }

    /// Delete session then tunnel, attempting both regardless of outcome
    pub async fn full_teardown(&self) -> SequenceReport {
        let name = &self.config.name;
        let mut report = SequenceReport::new(format!("Tearing down tunnel: {}", name));

        let session = report.record(Step::DeleteSession, self.delete_session().await).is_ok();
        let tunnel = report.record(Step::DeleteTunnel, self.delete_tunnel().await).is_ok();

        if session && tunnel {
            report.finish(format!("Tunnel '{}' teardown complete!", name))
        } else {
            report.abort()
        }
    }

    pub async fn get_status(&self) -> TunnelStatus {
        let ids = self.ids();
        let interface = self.config.interface_name();
        let tunnel = self.gateway.tunnel_presence(ids.tunnel_id).await;
        let session = self
            .gateway
            .session_presence(ids.tunnel_id, ids.session_id)
            .await;
        let link = self.gateway.interface_status(&interface).await;
        let listings = self.gateway.listings(&interface).await;

        TunnelStatus {
            name: self.config.name.clone(),
            configured: self.config.is_configured(),
            local_ip: self.config.local_ip,
            remote_ip: self.config.remote_ip,
            interface,
            interface_address: self.config.interface_address,
            ids: *ids,
            tunnel,
            session,
            link,
            tunnel_listing: listings.tunnels,
            session_listing: listings.sessions,
            interface_listing: listings.interface,
        }
    }
}

fn with_note(msg: String, note: Option<String>) -> String {
    match note {
        Some(note) => format!("{} ({})", msg, note),
        None => msg,
    }
}
