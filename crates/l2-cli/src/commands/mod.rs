//! CLI command implementations
//!
//! Every command returns `Ok(true)` when the operation it reports on
//! succeeded; `main` turns `Ok(false)` into exit status 1.

mod config;
mod forward;
mod prereq;
mod tunnel;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as _, Result};

use l2_core::config::{default_config_path, Settings, TunnelConfig, TunnelStore};
use l2_core::traits::CommandRunner;
use l2_core::types::sanitize_tunnel_name;
use l2_reconciler::TunnelManager;
use l2_system::{LinuxGateway, ProcessRunner, SystemdSupervisor};

use crate::output::print_warning;

pub use config::{config_path, config_show};
pub use forward::{
    forward_add, forward_list, forward_remove, forward_restart, forward_start, forward_stop,
};
pub use prereq::prereq_command;
pub use tunnel::{
    tunnel_create, tunnel_delete, tunnel_down, tunnel_list, tunnel_set, tunnel_status, tunnel_up,
    TunnelFields,
};

/// Settings, store and system bindings shared by the commands
pub struct Context {
    pub settings_path: PathBuf,
    pub settings: Settings,
    pub store: TunnelStore,
    runner: Arc<dyn CommandRunner>,
    gateway: LinuxGateway,
    supervisor: SystemdSupervisor,
}

impl Context {
    /// Load settings from `config` (or the default path) and apply overrides
    pub fn load(config: Option<PathBuf>, tunnels_dir: Option<PathBuf>) -> Result<Self> {
        let settings_path = config.unwrap_or_else(default_config_path);
        let mut settings = Settings::load_or_default(&settings_path)
            .with_context(|| format!("Failed to load settings from {:?}", settings_path))?;
        if let Some(dir) = tunnels_dir {
            settings.tunnels_dir = dir;
        }

        tracing::debug!(
            "Settings from {:?}, tunnel records in {:?}",
            settings_path,
            settings.tunnels_dir
        );

        let store = TunnelStore::new(&settings.tunnels_dir);
        let runner: Arc<dyn CommandRunner> = Arc::new(ProcessRunner::from_settings(&settings));
        let gateway = LinuxGateway::new(Arc::clone(&runner));
        let supervisor = SystemdSupervisor::from_settings(Arc::clone(&runner), &settings);

        Ok(Self {
            settings_path,
            settings,
            store,
            runner,
            gateway,
            supervisor,
        })
    }

    pub fn runner(&self) -> &dyn CommandRunner {
        self.runner.as_ref()
    }

    pub fn manager(&self) -> TunnelManager<'_, LinuxGateway, SystemdSupervisor> {
        TunnelManager::new(&self.store, &self.gateway, &self.supervisor)
            .with_settle_delay(self.settings.settle_delay)
    }

    /// Load a stored tunnel by (unsanitized) name
    pub fn load_tunnel(&self, name: &str) -> Result<TunnelConfig> {
        let name = sanitize_tunnel_name(name)?;
        self.store
            .load(&name)
            .with_context(|| format!("Failed to load tunnel '{}'", name))
    }

    pub fn save_tunnel(&self, config: &TunnelConfig) -> Result<()> {
        self.store
            .save(config)
            .with_context(|| format!("Failed to save tunnel '{}'", config.name))
    }
}

/// Warn when system commands are about to run without root
pub(crate) fn warn_unprivileged() {
    if !l2_system::is_privileged() {
        print_warning("Not running as root; system commands will likely fail");
    }
}
