//! Tunnel lifecycle: provisioning and decommissioning against the store
//!
//! A record reaches the store only after the kernel side came up, and leaves
//! it only after forwards and kernel objects are gone (unless forced).

use std::time::Duration;

use l2_core::config::{TunnelConfig, TunnelPatch, TunnelStore};
use l2_core::error::{L2Error, ReconcileError};
use l2_core::report::{SequenceReport, Step};
use l2_core::traits::{ServiceSupervisor, SystemGateway};
use l2_core::types::{sanitize_tunnel_name, Presence};

use crate::forward::{ForwardReconciler, NO_FORWARDS};
use crate::tunnel::{TunnelReconciler, DEFAULT_SETTLE_DELAY};

/// Ties the store to a gateway and a supervisor
pub struct TunnelManager<'a, G: SystemGateway + ?Sized, S: ServiceSupervisor + ?Sized> {
    store: &'a TunnelStore,
    gateway: &'a G,
    supervisor: &'a S,
    settle_delay: Duration,
}

impl<'a, G, S> TunnelManager<'a, G, S>
where
    G: SystemGateway + ?Sized,
    S: ServiceSupervisor + ?Sized,
{
    pub fn new(store: &'a TunnelStore, gateway: &'a G, supervisor: &'a S) -> Self {
        Self {
            store,
            gateway,
            supervisor,
            settle_delay: DEFAULT_SETTLE_DELAY,
        }
    }

    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    pub fn store(&self) -> &TunnelStore {
        self.store
    }

    pub fn tunnel<'c>(&self, config: &'c TunnelConfig) -> TunnelReconciler<'c, G>
    where
        'a: 'c,
    {
        TunnelReconciler::new(config, self.gateway).with_settle_delay(self.settle_delay)
    }

    pub fn forwards<'c>(&self, config: &'c mut TunnelConfig) -> ForwardReconciler<'c, S>
    where
        'a: 'c,
    {
        ForwardReconciler::new(config, self.supervisor)
    }

    /// Bring the tunnel up and save the record if that worked
    pub async fn provision(&self, config: &TunnelConfig) -> SequenceReport {
        let mut report = self.tunnel(config).full_setup().await;
        if !report.success {
            tracing::warn!("Setup of {} failed; record not saved", config.name);
            return report;
        }

        let saved = self
            .store
            .save(config)
            .map(|()| format!("Configuration saved to {}", self.store.dir().display()))
            .map_err(|e| ReconcileError::CommandFailed(format!("Failed to save config: {}", e)));
        if report.record(Step::SaveConfig, saved).is_err() {
            report.footer = None;
            return report.abort();
        }
        report
    }

    /// Apply `patch` to the stored tunnel `name` and save it once
    ///
    /// When the patch changes what the kernel objects were built from and
    /// the old tunnel is present, it is torn down with the old record first
    /// and rebuilt from the new one after the save. A failed teardown leaves
    /// the stored record untouched.
    pub async fn reconfigure(
        &self,
        name: &str,
        patch: TunnelPatch,
    ) -> Result<SequenceReport, L2Error> {
        let name = sanitize_tunnel_name(name)?;
        let current = self.store.load(&name)?;
        let mut updated = current.clone();
        updated.apply(patch);

        let mut report = SequenceReport::new(format!("Updating tunnel: {}", name));

        let mut rebuild = false;
        if current.kernel_differs(&updated) {
            match self.gateway.tunnel_presence(current.ids.tunnel_id).await {
                Presence::Present => {
                    tracing::info!(
                        "Tunnel {} changes kernel state; tearing down tunnel {}",
                        name,
                        current.ids.tunnel_id
                    );
                    let teardown = self.tunnel(&current).full_teardown().await;
                    let torn_down = teardown.success;
                    for step in teardown.steps {
                        report.record(step.step, step.result);
                    }
                    if !torn_down {
                        report.record(
                            Step::SaveConfig,
                            Err(ReconcileError::PrerequisiteMissing(
                                "Old tunnel could not be torn down; record not changed".into(),
                            )),
                        );
                        return Ok(report.abort());
                    }
                    rebuild = true;
                }
                Presence::Absent => {}
                Presence::Unknown(detail) => tracing::warn!(
                    "Could not verify tunnel {} before updating {}: {}",
                    current.ids.tunnel_id,
                    name,
                    detail
                ),
            }
        }

        let saved = self
            .store
            .save(&updated)
            .map(|()| format!("Configuration saved to {}", self.store.dir().display()))
            .map_err(|e| ReconcileError::CommandFailed(format!("Failed to save config: {}", e)));
        if report.record(Step::SaveConfig, saved).is_err() {
            return Ok(report.abort());
        }

        if rebuild {
            let setup = self.tunnel(&updated).full_setup().await;
            let rebuilt = setup.success;
            for step in setup.steps {
                report.record(step.step, step.result);
            }
            if !rebuilt {
                return Ok(report.abort());
            }
        }

        Ok(report.finish(format!("Tunnel '{}' updated!", name)))
    }

    /// Remove forwards, tear the tunnel down and delete the record
    ///
    /// A failed teardown keeps the record unless `force` is set.
    pub async fn decommission(&self, mut config: TunnelConfig, force: bool) -> SequenceReport {
        let name = config.name.clone();
        let mut report = SequenceReport::new(format!("Deleting tunnel: {}", name));

        let forwards = if config.forwarded_ports.is_empty() {
            Ok(NO_FORWARDS.to_string())
        } else {
            let ports = config
                .forwarded_ports
                .iter()
                .map(u16::to_string)
                .collect::<Vec<_>>()
                .join(",");
            let batch = self.forwards(&mut config).remove_multiple(&ports).await;
            if batch.all_succeeded() {
                Ok(format!("{} forward(s) removed", batch.len()))
            } else {
                Err(ReconcileError::CommandFailed(batch.to_string()))
            }
        };
        let forwards_ok = report.record(Step::RemoveForwards, forwards).is_ok();

        let teardown = self.tunnel(&config).full_teardown().await;
        let torn_down = teardown.success;
        for step in teardown.steps {
            report.record(step.step, step.result);
        }

        if !(forwards_ok && torn_down) && !force {
            report.record(
                Step::DeleteConfig,
                Err(ReconcileError::PrerequisiteMissing(
                    "Teardown incomplete; record kept (use --force to delete anyway)".into(),
                )),
            );
            return report.abort();
        }

        let deleted = match self.store.delete(&name) {
            Ok(true) => Ok(format!("Configuration for '{}' deleted", name)),
            Ok(false) => Ok(format!("No stored configuration for '{}'", name)),
            Err(e) => Err(ReconcileError::CommandFailed(format!(
                "Failed to delete config: {}",
                e
            ))),
        };
        if report.record(Step::DeleteConfig, deleted).is_err() {
            return report.abort();
        }
        report.finish(format!("Tunnel '{}' deleted!", name))
    }
}
