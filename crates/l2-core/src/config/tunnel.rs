//! Desired state of a single tunnel

use ipnetwork::Ipv4Network;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::net::Ipv4Addr;

use crate::types::{interface_name, Side, TunnelIds};

/// Desired-state record for one named tunnel
///
/// A record is built in memory while the operator configures a tunnel and
/// only reaches disk through [`super::TunnelStore::save`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TunnelConfig {
    /// Unique name, also the store key
    pub name: String,

    /// Public address of this host
    #[serde(default)]
    pub local_ip: Option<Ipv4Addr>,

    /// Public address of the opposite endpoint
    #[serde(default)]
    pub remote_ip: Option<Ipv4Addr>,

    /// Address assigned to the virtual interface
    #[serde(default = "default_interface_address")]
    pub interface_address: Ipv4Network,

    /// Address port forwards relay to; stored as `""` when cleared
    #[serde(
        default = "default_forward_target",
        with = "crate::config::serde_utils::optional_addr"
    )]
    pub remote_forward_address: Option<Ipv4Addr>,

    /// Derives the interface name; fixed once the record is created
    #[serde(default)]
    interface_index: u32,

    /// Forwarded TCP ports
    #[serde(default)]
    pub forwarded_ports: BTreeSet<u16>,

    /// Tunnel and session identifiers
    #[serde(default)]
    pub ids: TunnelIds,
}

fn default_interface_address() -> Ipv4Network {
    Side::Entry.preset().interface_address
}

fn default_forward_target() -> Option<Ipv4Addr> {
    Some(Side::Entry.preset().forward_target)
}

impl TunnelConfig {
    /// Create a record for `interface_index` with index-derived default ids
    pub fn new(name: impl Into<String>, interface_index: u32) -> Self {
        Self {
            name: name.into(),
            local_ip: None,
            remote_ip: None,
            interface_address: default_interface_address(),
            remote_forward_address: default_forward_target(),
            interface_index,
            forwarded_ports: BTreeSet::new(),
            ids: TunnelIds::for_index(interface_index),
        }
    }

    pub fn interface_index(&self) -> u32 {
        self.interface_index
    }

    /// Kernel interface name (`l2tpeth<index>`)
    pub fn interface_name(&self) -> String {
        interface_name(self.interface_index)
    }

    /// Both endpoints are known, so the tunnel can be brought up
    pub fn is_configured(&self) -> bool {
        self.local_ip.is_some() && self.remote_ip.is_some()
    }

    /// Apply the side preset (interface address, forward target and ids)
    pub fn apply_side(&mut self, side: Side) {
        let preset = side.preset();
        self.interface_address = preset.interface_address;
        self.remote_forward_address = Some(preset.forward_target);
        self.ids = preset.ids;
    }

    /// Merge an operator patch into the record
    pub fn apply(&mut self, patch: TunnelPatch) {
        if let Some(side) = patch.side {
            self.apply_side(side);
        }
        if let Some(ip) = patch.local_ip {
            self.local_ip = Some(ip);
        }
        if let Some(ip) = patch.remote_ip {
            self.remote_ip = Some(ip);
        }
        if let Some(addr) = patch.interface_address {
            self.interface_address = addr;
        }
        if let Some(addr) = patch.remote_forward_address {
            self.remote_forward_address = Some(addr);
        }
        if let Some(id) = patch.tunnel_id {
            self.ids.tunnel_id = id;
        }
        if let Some(id) = patch.peer_tunnel_id {
            self.ids.peer_tunnel_id = id;
        }
        if let Some(id) = patch.session_id {
            self.ids.session_id = id;
        }
        if let Some(id) = patch.peer_session_id {
            self.ids.peer_session_id = id;
        }
    }

    /// Whether the kernel objects built from `other` differ from this record's
    ///
    /// Endpoints, ids and the interface address are baked into the tunnel,
    /// session and link at creation time.
    pub fn kernel_differs(&self, other: &TunnelConfig) -> bool {
        self.local_ip != other.local_ip
            || self.remote_ip != other.remote_ip
            || self.ids != other.ids
            || self.interface_address != other.interface_address
    }

    /// Track a forwarded port; returns false if it was already tracked
    pub fn add_port(&mut self, port: u16) -> bool {
        self.forwarded_ports.insert(port)
    }

    /// Stop tracking a forwarded port; returns false if it was not tracked
    pub fn remove_port(&mut self, port: u16) -> bool {
        self.forwarded_ports.remove(&port)
    }
}

/// Accumulated operator edits, applied in one go before a single save
///
/// A side preset is applied first so that explicit fields override it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TunnelPatch {
    pub side: Option<Side>,
    pub local_ip: Option<Ipv4Addr>,
    pub remote_ip: Option<Ipv4Addr>,
    pub interface_address: Option<Ipv4Network>,
    pub remote_forward_address: Option<Ipv4Addr>,
    pub tunnel_id: Option<u32>,
    pub peer_tunnel_id: Option<u32>,
    pub session_id: Option<u32>,
    pub peer_session_id: Option<u32>,
}

impl TunnelPatch {
    pub fn is_empty(&self) -> bool {
        self == &TunnelPatch::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record_defaults() {
        let config = TunnelConfig::new("edge", 1);
        assert_eq!(config.interface_name(), "l2tpeth1");
        assert_eq!(config.ids.tunnel_id, 1100);
        assert_eq!(config.interface_address.to_string(), "10.30.30.1/30");
        assert_eq!(config.remote_forward_address, Some(Ipv4Addr::new(10, 30, 30, 2)));
        assert!(!config.is_configured());
    }

    #[test]
    fn test_patch_side_then_explicit_fields() {
        let mut config = TunnelConfig::new("edge", 3);
        config.apply(TunnelPatch {
            side: Some(Side::Exit),
            local_ip: Some(Ipv4Addr::new(5, 6, 7, 8)),
            remote_ip: Some(Ipv4Addr::new(1, 2, 3, 4)),
            session_id: Some(99),
            ..Default::default()
        });

        assert!(config.is_configured());
        assert_eq!(config.ids.tunnel_id, 2000);
        assert_eq!(config.ids.peer_tunnel_id, 1000);
        assert_eq!(config.ids.session_id, 99);
        assert_eq!(config.interface_address.to_string(), "10.30.30.2/30");
        // index never changes
        assert_eq!(config.interface_name(), "l2tpeth3");
    }

    #[test]
    fn test_kernel_differs() {
        let config = TunnelConfig::new("edge", 0);

        let mut other = config.clone();
        other.apply(TunnelPatch {
            remote_forward_address: Some(Ipv4Addr::new(10, 30, 30, 6)),
            ..Default::default()
        });
        assert!(!config.kernel_differs(&other));

        other.apply(TunnelPatch {
            tunnel_id: Some(4242),
            ..Default::default()
        });
        assert!(config.kernel_differs(&other));

        let mut other = config.clone();
        other.apply(TunnelPatch {
            side: Some(Side::Exit),
            ..Default::default()
        });
        assert!(config.kernel_differs(&other));
    }

    #[test]
    fn test_ports_are_a_set() {
        let mut config = TunnelConfig::new("edge", 0);
        assert!(config.add_port(443));
        assert!(config.add_port(80));
        assert!(!config.add_port(443));
        assert_eq!(config.forwarded_ports.iter().copied().collect::<Vec<_>>(), vec![80, 443]);
        assert!(config.remove_port(80));
        assert!(!config.remove_port(80));
    }

    #[test]
    fn test_toml_roundtrip_keeps_index() {
        let mut config = TunnelConfig::new("edge", 2);
        config.local_ip = Some(Ipv4Addr::new(1, 2, 3, 4));
        config.add_port(8443);

        let text = toml::to_string_pretty(&config).unwrap();
        assert!(text.contains("interface_index = 2"));
        let parsed: TunnelConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_cleared_forward_target_roundtrips() {
        let mut config = TunnelConfig::new("edge", 0);
        config.remote_forward_address = None;

        let text = toml::to_string_pretty(&config).unwrap();
        assert!(text.contains("remote_forward_address = \"\""));
        let parsed: TunnelConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.remote_forward_address, None);
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_sparse_record_gets_defaults() {
        let parsed: TunnelConfig = toml::from_str("name = \"old\"\n").unwrap();
        assert_eq!(parsed.interface_index(), 0);
        assert_eq!(parsed.ids, TunnelIds::for_index(0));
        assert!(parsed.forwarded_ports.is_empty());
        assert_eq!(parsed.remote_forward_address, Some(Ipv4Addr::new(10, 30, 30, 2)));
    }
}
