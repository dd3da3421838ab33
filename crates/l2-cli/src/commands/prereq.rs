//! Prerequisite command implementation

use anyhow::Result;

use super::{warn_unprivileged, Context};
use crate::output::print_sequence;

/// Install packages and load the L2TP kernel modules
pub async fn prereq_command(ctx: &Context) -> Result<bool> {
    warn_unprivileged();
    let report = l2_system::install_prerequisites(ctx.runner()).await;
    print_sequence(&report);
    Ok(report.success)
}
