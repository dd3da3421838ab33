//! Core domain types

use ipnetwork::Ipv4Network;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;

use crate::error::ConfigError;

/// Prefix length appended to interface addresses given without one
pub const DEFAULT_PREFIX_LEN: u8 = 30;

/// Prefix of the kernel interface created for every session
pub const INTERFACE_PREFIX: &str = "l2tpeth";

/// Tunnel and session identifiers; each must match the opposite endpoint's peer value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TunnelIds {
    pub tunnel_id: u32,
    pub peer_tunnel_id: u32,
    pub session_id: u32,
    pub peer_session_id: u32,
}

impl TunnelIds {
    /// Default identifiers for a tunnel allocated at `index`
    ///
    /// Spacing tunnel ids by 100 keeps several tunnels on one host from colliding.
    pub fn for_index(index: u32) -> Self {
        let tunnel_id = 1000 + index * 100;
        Self {
            tunnel_id,
            peer_tunnel_id: tunnel_id + 1000,
            session_id: 10 + index,
            peer_session_id: 20 + index,
        }
    }

    /// Identifiers the opposite endpoint must use
    pub fn mirrored(&self) -> Self {
        Self {
            tunnel_id: self.peer_tunnel_id,
            peer_tunnel_id: self.tunnel_id,
            session_id: self.peer_session_id,
            peer_session_id: self.session_id,
        }
    }
}

impl Default for TunnelIds {
    fn default() -> Self {
        Self::for_index(0)
    }
}

/// Which end of the pseudowire this host is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Accepts forwarded ports and relays them into the tunnel
    Entry,
    /// Far end of the tunnel
    Exit,
}

/// Values an operator gets when choosing a side
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SidePreset {
    pub interface_address: Ipv4Network,
    pub forward_target: Ipv4Addr,
    pub ids: TunnelIds,
}

impl Side {
    /// Preset addresses and identifiers; the two sides mirror each other
    pub fn preset(self) -> SidePreset {
        let entry_ids = TunnelIds {
            tunnel_id: 1000,
            peer_tunnel_id: 2000,
            session_id: 10,
            peer_session_id: 20,
        };
        let entry_addr = Ipv4Addr::new(10, 30, 30, 1);
        let exit_addr = Ipv4Addr::new(10, 30, 30, 2);

        let (local, remote, ids) = match self {
            Side::Entry => (entry_addr, exit_addr, entry_ids),
            Side::Exit => (exit_addr, entry_addr, entry_ids.mirrored()),
        };

        SidePreset {
            interface_address: cidr_with_prefix(local, DEFAULT_PREFIX_LEN),
            forward_target: remote,
            ids,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Entry => write!(f, "entry"),
            Side::Exit => write!(f, "exit"),
        }
    }
}

fn cidr_with_prefix(addr: Ipv4Addr, prefix: u8) -> Ipv4Network {
    match Ipv4Network::new(addr, prefix) {
        Ok(net) => net,
        // prefix is a compile-time constant <= 32
        Err(_) => Ipv4Network::from(addr),
    }
}

/// Parse an interface address, appending `/30` when no prefix is given
pub fn parse_interface_address(s: &str) -> Result<Ipv4Network, ConfigError> {
    let s = s.trim();
    let invalid = |why: String| ConfigError::Invalid(format!("invalid interface address {:?}: {}", s, why));

    let (host, prefix) = match s.split_once('/') {
        Some((host, prefix)) => (
            host,
            prefix
                .parse::<u8>()
                .map_err(|e| invalid(format!("bad prefix length: {}", e)))?,
        ),
        None => (s, DEFAULT_PREFIX_LEN),
    };
    // Ipv4Addr is stricter than ipnetwork's own parser, which pads short addresses
    let addr = host
        .parse::<Ipv4Addr>()
        .map_err(|e| invalid(e.to_string()))?;
    Ipv4Network::new(addr, prefix).map_err(|e| invalid(e.to_string()))
}

/// Parse a dotted-quad IPv4 address (a trailing `/prefix` is ignored)
pub fn parse_ipv4(s: &str) -> Result<Ipv4Addr, ConfigError> {
    let host = s.trim().split('/').next().unwrap_or_default();
    host.parse::<Ipv4Addr>()
        .map_err(|_| ConfigError::Invalid(format!("invalid IPv4 address: {:?}", s)))
}

/// Kernel interface name derived from an interface index
pub fn interface_name(index: u32) -> String {
    format!("{}{}", INTERFACE_PREFIX, index)
}

/// Normalize an operator-supplied tunnel name
///
/// Lower-cases and replaces anything outside `[a-z0-9-]` with `-`.
pub fn sanitize_tunnel_name(raw: &str) -> Result<String, ConfigError> {
    let name: String = raw
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '-' })
        .collect();

    if name.is_empty() || name.chars().all(|c| c == '-') {
        return Err(ConfigError::InvalidName(raw.to_string()));
    }
    Ok(name)
}

/// Observed existence of a kernel object
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "detail", rename_all = "lowercase")]
pub enum Presence {
    Present,
    Absent,
    /// The listing could not be obtained
    Unknown(String),
}

impl Presence {
    pub fn from_bool(present: bool) -> Self {
        if present {
            Presence::Present
        } else {
            Presence::Absent
        }
    }

    /// Fail-safe view: anything not positively observed counts as absent
    pub fn is_present(&self) -> bool {
        matches!(self, Presence::Present)
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Presence::Unknown(_))
    }
}

impl fmt::Display for Presence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Presence::Present => write!(f, "present"),
            Presence::Absent => write!(f, "absent"),
            Presence::Unknown(_) => write!(f, "unknown"),
        }
    }
}

/// Live state of a tunnel's virtual interface
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InterfaceStatus {
    pub exists: bool,
    pub up: bool,
    /// First IPv4 address/prefix found on the interface
    pub address: Option<Ipv4Network>,
}

impl InterfaceStatus {
    /// Whether `target` is assigned, ignoring prefix length
    pub fn has_address(&self, target: &Ipv4Network) -> bool {
        self.address.map(|a| a.ip() == target.ip()).unwrap_or(false)
    }
}

/// Whether a relay service is running
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceActivity {
    Active,
    Inactive,
}

impl fmt::Display for ServiceActivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceActivity::Active => write!(f, "active"),
            ServiceActivity::Inactive => write!(f, "inactive"),
        }
    }
}

/// Whether a relay service starts at boot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Enablement {
    Enabled,
    Disabled,
}

impl fmt::Display for Enablement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Enablement::Enabled => write!(f, "enabled"),
            Enablement::Disabled => write!(f, "disabled"),
        }
    }
}

/// One forwarded port and its observed service state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ForwardEntry {
    pub port: u16,
    /// `address:port` the relay connects to, if a target is configured
    pub target: Option<String>,
    pub activity: ServiceActivity,
    pub enablement: Enablement,
}
