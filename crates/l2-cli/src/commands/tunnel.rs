//! Tunnel command implementations

use std::net::Ipv4Addr;

use anyhow::{Context as _, Result};
use clap::{Args, ValueEnum};
use ipnetwork::Ipv4Network;

use l2_core::config::TunnelPatch;
use l2_core::types::{parse_interface_address, Side};

use super::{warn_unprivileged, Context};
use crate::output::{
    format_status, format_tunnels, print_info, print_sequence, print_success, print_warning,
};

/// Which end of the tunnel this host is
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SideArg {
    /// Host that accepts forwarded ports
    Entry,
    /// Far end of the tunnel
    Exit,
}

impl From<SideArg> for Side {
    fn from(side: SideArg) -> Self {
        match side {
            SideArg::Entry => Side::Entry,
            SideArg::Exit => Side::Exit,
        }
    }
}

fn parse_address(s: &str) -> Result<Ipv4Network, String> {
    parse_interface_address(s).map_err(|e| e.to_string())
}

/// Optional tunnel fields shared by `create` and `set`
#[derive(Debug, Clone, Default, Args)]
pub struct TunnelFields {
    /// Apply the entry or exit preset (addresses and ids) before other fields
    #[arg(long, value_enum)]
    pub side: Option<SideArg>,

    /// Interface address, e.g. 10.30.30.1/30 (prefix defaults to /30)
    #[arg(long, value_parser = parse_address)]
    pub interface_address: Option<Ipv4Network>,

    /// Address port forwards relay to
    #[arg(long)]
    pub forward_target: Option<Ipv4Addr>,

    #[arg(long)]
    pub tunnel_id: Option<u32>,

    #[arg(long)]
    pub peer_tunnel_id: Option<u32>,

    #[arg(long)]
    pub session_id: Option<u32>,

    #[arg(long)]
    pub peer_session_id: Option<u32>,
}

impl TunnelFields {
    pub fn into_patch(self, local_ip: Option<Ipv4Addr>, remote_ip: Option<Ipv4Addr>) -> TunnelPatch {
        TunnelPatch {
            side: self.side.map(Side::from),
            local_ip,
            remote_ip,
            interface_address: self.interface_address,
            remote_forward_address: self.forward_target,
            tunnel_id: self.tunnel_id,
            peer_tunnel_id: self.peer_tunnel_id,
            session_id: self.session_id,
            peer_session_id: self.peer_session_id,
        }
    }
}

/// Allocate a new tunnel, bring it up and store it
pub async fn tunnel_create(
    ctx: &Context,
    name: &str,
    local_ip: Ipv4Addr,
    remote_ip: Ipv4Addr,
    fields: TunnelFields,
) -> Result<bool> {
    let mut config = ctx
        .store
        .allocate(name)
        .with_context(|| format!("Cannot create tunnel '{}'", name))?;
    config.apply(fields.into_patch(Some(local_ip), Some(remote_ip)));

    print_info(&format!(
        "Tunnel '{}' uses {} (tunnel id {}, session id {})",
        config.name,
        config.interface_name(),
        config.ids.tunnel_id,
        config.ids.session_id
    ));

    warn_unprivileged();
    let report = ctx.manager().provision(&config).await;
    print_sequence(&report);
    if report.success {
        print_success(&format!(
            "Add port forwards with 'forward add {} <ports>'",
            config.name
        ));
    } else {
        print_info("The tunnel was not saved; fix the problem and run create again");
    }
    Ok(report.success)
}

pub async fn tunnel_up(ctx: &Context, name: &str) -> Result<bool> {
    let config = ctx.load_tunnel(name)?;
    warn_unprivileged();
    let report = ctx.manager().tunnel(&config).full_setup().await;
    print_sequence(&report);
    Ok(report.success)
}

pub async fn tunnel_down(ctx: &Context, name: &str) -> Result<bool> {
    let config = ctx.load_tunnel(name)?;
    warn_unprivileged();
    let report = ctx.manager().tunnel(&config).full_teardown().await;
    print_sequence(&report);
    Ok(report.success)
}

/// Remove forwards, tear down and delete the stored record
pub async fn tunnel_delete(ctx: &Context, name: &str, force: bool) -> Result<bool> {
    let config = ctx.load_tunnel(name)?;
    warn_unprivileged();
    let report = ctx.manager().decommission(config, force).await;
    print_sequence(&report);
    Ok(report.success)
}

pub async fn tunnel_list(ctx: &Context) -> Result<bool> {
    let configs = ctx
        .store
        .load_all()
        .with_context(|| format!("Failed to read {}", ctx.store.dir().display()))?;

    let manager = ctx.manager();
    let mut rows = Vec::with_capacity(configs.len());
    for config in configs {
        let running = manager.tunnel(&config).get_status().await.is_running();
        rows.push((config, running));
    }

    println!("{}", format_tunnels(&rows));
    Ok(true)
}

pub async fn tunnel_status(ctx: &Context, name: &str, json: bool) -> Result<bool> {
    let config = ctx.load_tunnel(name)?;
    let status = ctx.manager().tunnel(&config).get_status().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        print!("{}", format_status(&status));
    }
    Ok(true)
}

/// Patch a stored tunnel and save it once
///
/// A live tunnel whose endpoints, ids or address change is rebuilt.
pub async fn tunnel_set(
    ctx: &Context,
    name: &str,
    local_ip: Option<Ipv4Addr>,
    remote_ip: Option<Ipv4Addr>,
    fields: TunnelFields,
) -> Result<bool> {
    let patch = fields.into_patch(local_ip, remote_ip);
    if patch.is_empty() {
        // still report unknown tunnels
        ctx.load_tunnel(name)?;
        print_warning("Nothing to change");
        return Ok(true);
    }

    warn_unprivileged();
    let report = ctx.manager().reconfigure(name, patch).await?;
    print_sequence(&report);
    Ok(report.success)
}
