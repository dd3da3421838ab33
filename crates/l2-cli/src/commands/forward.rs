//! Port-forward command implementations

use anyhow::Result;

use super::{warn_unprivileged, Context};
use crate::output::{format_forwards, print_batch};

/// Forward each port of a comma-separated list
pub async fn forward_add(ctx: &Context, name: &str, ports: &str) -> Result<bool> {
    let mut config = ctx.load_tunnel(name)?;
    warn_unprivileged();
    let report = ctx.manager().forwards(&mut config).add_multiple(ports).await;
    ctx.save_tunnel(&config)?;
    print_batch(&report);
    Ok(report.all_succeeded())
}

pub async fn forward_remove(ctx: &Context, name: &str, ports: &str) -> Result<bool> {
    let mut config = ctx.load_tunnel(name)?;
    warn_unprivileged();
    let report = ctx
        .manager()
        .forwards(&mut config)
        .remove_multiple(ports)
        .await;
    ctx.save_tunnel(&config)?;
    print_batch(&report);
    Ok(report.all_succeeded())
}

pub async fn forward_list(ctx: &Context, name: &str) -> Result<bool> {
    let mut config = ctx.load_tunnel(name)?;
    let entries = ctx.manager().forwards(&mut config).list_forwards().await;
    println!("Port forwards of tunnel '{}':", config.name);
    println!("{}", format_forwards(&entries));
    Ok(true)
}

pub async fn forward_start(ctx: &Context, name: &str) -> Result<bool> {
    let mut config = ctx.load_tunnel(name)?;
    warn_unprivileged();
    let report = ctx.manager().forwards(&mut config).start_all().await;
    ctx.save_tunnel(&config)?;
    print_batch(&report);
    Ok(report.all_succeeded())
}

pub async fn forward_stop(ctx: &Context, name: &str) -> Result<bool> {
    let mut config = ctx.load_tunnel(name)?;
    warn_unprivileged();
    let report = ctx.manager().forwards(&mut config).stop_all().await;
    print_batch(&report);
    Ok(report.all_succeeded())
}

/// Rewrite every unit with the current target and restart it
pub async fn forward_restart(ctx: &Context, name: &str) -> Result<bool> {
    let mut config = ctx.load_tunnel(name)?;
    warn_unprivileged();
    let report = ctx.manager().forwards(&mut config).restart_all().await;
    ctx.save_tunnel(&config)?;
    print_batch(&report);
    Ok(report.all_succeeded())
}
