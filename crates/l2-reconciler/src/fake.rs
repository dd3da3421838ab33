//! In-memory kernel and supervisor used by the reconciler tests

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::net::Ipv4Addr;
use std::sync::Mutex;

use async_trait::async_trait;
use ipnetwork::Ipv4Network;

use l2_core::error::GatewayError;
use l2_core::traits::{Listings, ServiceSupervisor, SessionSpec, SystemGateway, TunnelSpec};
use l2_core::types::{Enablement, InterfaceStatus, Presence, ServiceActivity};

const FILE_EXISTS: &str = "RTNETLINK answers: File exists";

fn command_error(detail: &str) -> GatewayError {
    GatewayError::Command {
        detail: detail.to_string(),
        exit_code: 2,
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FakeLink {
    pub up: bool,
    pub address: Option<Ipv4Network>,
}

#[derive(Default)]
struct Kernel {
    tunnels: BTreeSet<u32>,
    /// session -> interface name
    sessions: BTreeMap<(u32, u32), String>,
    links: HashMap<String, FakeLink>,
}

/// Kernel stand-in with L2TP ordering rules and a log of mutating calls
///
/// Failures are injected per operation name (`create_tunnel`,
/// `delete_session`, `set_link_up`, ...).
#[derive(Default)]
pub struct FakeGateway {
    kernel: Mutex<Kernel>,
    calls: Mutex<Vec<String>>,
    failures: Mutex<HashMap<&'static str, GatewayError>>,
    listing_failure: Mutex<Option<String>>,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&self, op: &'static str, err: GatewayError) {
        self.failures.lock().unwrap().insert(op, err);
    }

    /// Make every listing fail with `detail`
    pub fn fail_listings(&self, detail: &str) {
        *self.listing_failure.lock().unwrap() = Some(detail.to_string());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn has_tunnel(&self, tunnel_id: u32) -> bool {
        self.kernel.lock().unwrap().tunnels.contains(&tunnel_id)
    }

    pub fn has_session(&self, tunnel_id: u32, session_id: u32) -> bool {
        self.kernel
            .lock()
            .unwrap()
            .sessions
            .contains_key(&(tunnel_id, session_id))
    }

    pub fn link(&self, interface: &str) -> Option<FakeLink> {
        self.kernel.lock().unwrap().links.get(interface).cloned()
    }

    fn record(&self, call: String) -> Result<(), GatewayError> {
        let op = call.split_whitespace().next().unwrap_or_default().to_string();
        self.calls.lock().unwrap().push(call);
        match self.failures.lock().unwrap().get(op.as_str()) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn listing_failure(&self) -> Option<String> {
        self.listing_failure.lock().unwrap().clone()
    }
}

#[async_trait]
impl SystemGateway for FakeGateway {
    async fn tunnel_presence(&self, tunnel_id: u32) -> Presence {
        match self.listing_failure() {
            Some(detail) => Presence::Unknown(detail),
            None => Presence::from_bool(self.has_tunnel(tunnel_id)),
        }
    }

    async fn session_presence(&self, tunnel_id: u32, session_id: u32) -> Presence {
        match self.listing_failure() {
            Some(detail) => Presence::Unknown(detail),
            None => Presence::from_bool(self.has_session(tunnel_id, session_id)),
        }
    }

    async fn interface_status(&self, interface: &str) -> InterfaceStatus {
        if self.listing_failure().is_some() {
            return InterfaceStatus::default();
        }
        match self.link(interface) {
            Some(link) => InterfaceStatus {
                exists: true,
                up: link.up,
                address: link.address,
            },
            None => InterfaceStatus::default(),
        }
    }

    async fn listings(&self, interface: &str) -> Listings {
        if let Some(detail) = self.listing_failure() {
            return Listings {
                tunnels: detail.clone(),
                sessions: detail.clone(),
                interface: detail,
            };
        }
        let kernel = self.kernel.lock().unwrap();
        Listings {
            tunnels: kernel
                .tunnels
                .iter()
                .map(|t| format!("Tunnel {}, encap IP, version 3", t))
                .collect::<Vec<_>>()
                .join("\n"),
            sessions: kernel
                .sessions
                .keys()
                .map(|(t, s)| format!("Session {} in tunnel {}", s, t))
                .collect::<Vec<_>>()
                .join("\n"),
            interface: if kernel.links.contains_key(interface) {
                format!("7: {}: <BROADCAST,MULTICAST> mtu 1446", interface)
            } else {
                format!("Device \"{}\" does not exist.", interface)
            },
        }
    }

    async fn create_tunnel(&self, spec: &TunnelSpec) -> Result<(), GatewayError> {
        self.record(format!("create_tunnel {}", spec.tunnel_id))?;
        let mut kernel = self.kernel.lock().unwrap();
        if !kernel.tunnels.insert(spec.tunnel_id) {
            return Err(GatewayError::AlreadyExists(FILE_EXISTS.into()));
        }
        Ok(())
    }

    async fn delete_tunnel(&self, tunnel_id: u32) -> Result<(), GatewayError> {
        self.record(format!("delete_tunnel {}", tunnel_id))?;
        let mut kernel = self.kernel.lock().unwrap();
        if kernel.sessions.keys().any(|(t, _)| *t == tunnel_id) {
            return Err(command_error("RTNETLINK answers: Device or resource busy"));
        }
        if !kernel.tunnels.remove(&tunnel_id) {
            return Err(command_error("RTNETLINK answers: No such file or directory"));
        }
        Ok(())
    }

    async fn create_session(&self, spec: &SessionSpec) -> Result<(), GatewayError> {
        self.record(format!(
            "create_session {} {}",
            spec.tunnel_id, spec.session_id
        ))?;
        let mut kernel = self.kernel.lock().unwrap();
        if !kernel.tunnels.contains(&spec.tunnel_id) {
            return Err(command_error("RTNETLINK answers: No such file or directory"));
        }
        let key = (spec.tunnel_id, spec.session_id);
        if kernel.sessions.contains_key(&key) {
            return Err(GatewayError::AlreadyExists(FILE_EXISTS.into()));
        }
        kernel.sessions.insert(key, spec.interface.clone());
        kernel.links.insert(spec.interface.clone(), FakeLink::default());
        Ok(())
    }

    async fn delete_session(&self, tunnel_id: u32, session_id: u32) -> Result<(), GatewayError> {
        self.record(format!("delete_session {} {}", tunnel_id, session_id))?;
        let mut kernel = self.kernel.lock().unwrap();
        match kernel.sessions.remove(&(tunnel_id, session_id)) {
            Some(interface) => {
                kernel.links.remove(&interface);
                Ok(())
            }
            None => Err(command_error("RTNETLINK answers: No such file or directory")),
        }
    }

    async fn set_link_up(&self, interface: &str) -> Result<(), GatewayError> {
        self.record(format!("set_link_up {}", interface))?;
        let mut kernel = self.kernel.lock().unwrap();
        match kernel.links.get_mut(interface) {
            Some(link) => {
                link.up = true;
                Ok(())
            }
            None => Err(command_error(&format!(
                "Cannot find device \"{}\"",
                interface
            ))),
        }
    }

    async fn add_address(&self, interface: &str, address: Ipv4Network) -> Result<(), GatewayError> {
        self.record(format!("add_address {} {}", interface, address))?;
        let mut kernel = self.kernel.lock().unwrap();
        match kernel.links.get_mut(interface) {
            Some(link) if link.address.map(|a| a.ip()) == Some(address.ip()) => {
                Err(GatewayError::AlreadyExists(FILE_EXISTS.into()))
            }
            Some(link) => {
                link.address = Some(address);
                Ok(())
            }
            None => Err(command_error(&format!(
                "Cannot find device \"{}\"",
                interface
            ))),
        }
    }
}

#[derive(Default)]
struct Services {
    units: BTreeMap<u16, Ipv4Addr>,
    active: BTreeSet<u16>,
    enabled: BTreeSet<u16>,
}

/// Supervisor stand-in keeping unit files and service state in memory
///
/// Failures are injected per `"<op> <port>"` key, e.g. `"start 80"`.
#[derive(Default)]
pub struct FakeSupervisor {
    services: Mutex<Services>,
    calls: Mutex<Vec<String>>,
    failures: Mutex<HashMap<String, GatewayError>>,
}

impl FakeSupervisor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&self, call: &str, err: GatewayError) {
        self.failures.lock().unwrap().insert(call.to_string(), err);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn unit_target(&self, port: u16) -> Option<Ipv4Addr> {
        self.services.lock().unwrap().units.get(&port).copied()
    }

    pub fn is_active(&self, port: u16) -> bool {
        self.services.lock().unwrap().active.contains(&port)
    }

    /// Delete a unit file behind the supervisor's back
    pub fn drop_unit(&self, port: u16) {
        self.services.lock().unwrap().units.remove(&port);
    }

    fn record(&self, call: String) -> Result<(), GatewayError> {
        self.calls.lock().unwrap().push(call.clone());
        match self.failures.lock().unwrap().get(&call) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ServiceSupervisor for FakeSupervisor {
    fn unit_name(&self, port: u16) -> String {
        format!("fake-fwd-{}.service", port)
    }

    async fn unit_exists(&self, port: u16) -> bool {
        self.services.lock().unwrap().units.contains_key(&port)
    }

    async fn write_unit(&self, port: u16, target: Ipv4Addr) -> Result<(), GatewayError> {
        self.record(format!("write_unit {}", port))?;
        self.services.lock().unwrap().units.insert(port, target);
        Ok(())
    }

    async fn remove_unit(&self, port: u16) -> Result<bool, GatewayError> {
        self.record(format!("remove_unit {}", port))?;
        Ok(self.services.lock().unwrap().units.remove(&port).is_some())
    }

    async fn reload(&self) -> Result<(), GatewayError> {
        self.record("reload".to_string())
    }

    async fn enable_now(&self, port: u16) -> Result<(), GatewayError> {
        self.record(format!("enable_now {}", port))?;
        let mut services = self.services.lock().unwrap();
        services.enabled.insert(port);
        services.active.insert(port);
        Ok(())
    }

    async fn start(&self, port: u16) -> Result<(), GatewayError> {
        self.record(format!("start {}", port))?;
        self.services.lock().unwrap().active.insert(port);
        Ok(())
    }

    async fn stop(&self, port: u16) -> Result<(), GatewayError> {
        self.record(format!("stop {}", port))?;
        self.services.lock().unwrap().active.remove(&port);
        Ok(())
    }

    async fn restart(&self, port: u16) -> Result<(), GatewayError> {
        self.record(format!("restart {}", port))?;
        self.services.lock().unwrap().active.insert(port);
        Ok(())
    }

    async fn disable(&self, port: u16) -> Result<(), GatewayError> {
        self.record(format!("disable {}", port))?;
        self.services.lock().unwrap().enabled.remove(&port);
        Ok(())
    }

    async fn activity(&self, port: u16) -> ServiceActivity {
        if self.is_active(port) {
            ServiceActivity::Active
        } else {
            ServiceActivity::Inactive
        }
    }

    async fn enablement(&self, port: u16) -> Enablement {
        if self.services.lock().unwrap().enabled.contains(&port) {
            Enablement::Enabled
        } else {
            Enablement::Disabled
        }
    }
}
