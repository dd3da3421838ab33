//! Config command implementations

use anyhow::Result;

use super::Context;
use crate::output::print_info;

/// Print where the settings are read from
pub fn config_path(ctx: &Context) -> Result<bool> {
    println!("{}", ctx.settings_path.display());
    Ok(true)
}

/// Print the effective settings as TOML
pub fn config_show(ctx: &Context) -> Result<bool> {
    if !ctx.settings_path.exists() {
        print_info(&format!(
            "No settings file at {}; showing defaults",
            ctx.settings_path.display()
        ));
    }
    println!("{}", ctx.settings.to_toml()?);
    Ok(true)
}
