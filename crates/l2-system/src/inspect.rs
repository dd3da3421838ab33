//! State inspector: live L2TP and link state from iproute2 listings
//!
//! Parsing is done on the text `ip l2tp show tunnel`, `ip l2tp show session`
//! and `ip addr show <dev>` print:
//!
//! ```text
//! Tunnel 1000, encap IP, version 3
//!   From 1.2.3.4 to 5.6.7.8
//!   Peer tunnel 2000
//!
//! Session 10 in tunnel 1000
//!   Peer session 20, tunnel 2000
//!   interface name: l2tpeth0
//!
//! 7: l2tpeth0: <BROADCAST,MULTICAST,UP,LOWER_UP> mtu 1446 qdisc fq_codel state UNKNOWN
//!     inet 10.30.30.1/30 scope global l2tpeth0
//! ```

use std::sync::Arc;

use l2_core::traits::{CommandOutput, CommandRunner};
use l2_core::types::{parse_interface_address, InterfaceStatus, Presence};

/// Tunnel ids listed by `ip l2tp show tunnel`
///
/// Only `Tunnel <id>,` header lines count, so `100` never matches `1000`.
pub fn parse_tunnel_ids(listing: &str) -> Vec<u32> {
    listing
        .lines()
        .filter_map(|line| {
            let rest = line.trim_start().strip_prefix("Tunnel")?;
            if !rest.starts_with(char::is_whitespace) {
                return None;
            }
            let token = rest.split_whitespace().next()?;
            token.strip_suffix(',')?.parse().ok()
        })
        .collect()
}

/// `(tunnel_id, session_id)` pairs listed by `ip l2tp show session`
pub fn parse_sessions(listing: &str) -> Vec<(u32, u32)> {
    listing
        .lines()
        .filter_map(|line| {
            let tokens: Vec<&str> = line.split_whitespace().collect();
            match tokens.as_slice() {
                ["Session", session, "in", "tunnel", tunnel, ..] => {
                    Some((tunnel.parse().ok()?, session.parse().ok()?))
                }
                _ => None,
            }
        })
        .collect()
}

/// Interface state from `ip addr show <dev>` output
pub fn parse_interface(listing: &str) -> InterfaceStatus {
    let mut lines = listing.lines().filter(|l| !l.trim().is_empty());
    let header = match lines.next() {
        Some(header) => header,
        None => return InterfaceStatus::default(),
    };

    let up = header
        .split_once('<')
        .and_then(|(_, rest)| rest.split_once('>'))
        .map(|(flags, _)| flags.split(',').any(|f| f == "UP"))
        .unwrap_or(false);

    let address = listing.lines().find_map(|line| {
        let mut tokens = line.split_whitespace();
        match tokens.next() {
            Some("inet") => tokens
                .next()
                .and_then(|cidr| parse_interface_address(cidr).ok()),
            _ => None,
        }
    });

    InterfaceStatus {
        exists: true,
        up,
        address,
    }
}

/// Queries iproute2 and answers existence questions
///
/// A failed listing is [`Presence::Unknown`]; the boolean predicates fold
/// that into `false`.
#[derive(Clone)]
pub struct StateInspector {
    runner: Arc<dyn CommandRunner>,
}

impl StateInspector {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    pub async fn tunnel_listing(&self) -> CommandOutput {
        self.runner.run("ip", &["l2tp", "show", "tunnel"]).await
    }

    pub async fn session_listing(&self) -> CommandOutput {
        self.runner.run("ip", &["l2tp", "show", "session"]).await
    }

    pub async fn interface_listing(&self, interface: &str) -> CommandOutput {
        self.runner.run("ip", &["addr", "show", interface]).await
    }

    pub async fn tunnel_presence(&self, tunnel_id: u32) -> Presence {
        let out = self.tunnel_listing().await;
        if !out.success {
            tracing::warn!("Cannot list tunnels: {}", out.detail());
            return Presence::Unknown(out.detail().to_string());
        }
        Presence::from_bool(parse_tunnel_ids(&out.stdout).contains(&tunnel_id))
    }

    pub async fn session_presence(&self, tunnel_id: u32, session_id: u32) -> Presence {
        let out = self.session_listing().await;
        if !out.success {
            tracing::warn!("Cannot list sessions: {}", out.detail());
            return Presence::Unknown(out.detail().to_string());
        }
        Presence::from_bool(parse_sessions(&out.stdout).contains(&(tunnel_id, session_id)))
    }

    pub async fn tunnel_exists(&self, tunnel_id: u32) -> bool {
        self.tunnel_presence(tunnel_id).await.is_present()
    }

    pub async fn session_exists(&self, tunnel_id: u32, session_id: u32) -> bool {
        self.session_presence(tunnel_id, session_id).await.is_present()
    }

    pub async fn interface_status(&self, interface: &str) -> InterfaceStatus {
        let out = self.interface_listing(interface).await;
        if !out.success || out.stdout.is_empty() {
            return InterfaceStatus::default();
        }
        parse_interface(&out.stdout)
    }
}
