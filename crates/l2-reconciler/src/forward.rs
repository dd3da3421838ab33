//! Port-forward reconciler
//!
//! One relay service per forwarded port. The tracked port set lives in the
//! tunnel record; callers persist the record once the operation returns.

use l2_core::config::TunnelConfig;
use l2_core::error::ReconcileError;
use l2_core::report::{BatchReport, StepResult};
use l2_core::traits::ServiceSupervisor;
use l2_core::types::ForwardEntry;

/// Text of an empty per-port report
pub const NO_FORWARDS: &str = "No port forwards configured";

/// Split a comma-separated port list; blank entries are skipped
///
/// Each entry parses independently so that one bad entry cannot sink the rest.
pub fn parse_port_list(ports: &str) -> Vec<(String, Result<u16, ReconcileError>)> {
    ports
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|raw| {
            let parsed = match raw.parse::<u16>() {
                Ok(port) if port != 0 => Ok(port),
                _ => Err(ReconcileError::ParseFailure("Invalid port number".into())),
            };
            (raw.to_string(), parsed)
        })
        .collect()
}

/// Reconciles relay services against a tunnel's forwarded ports
pub struct ForwardReconciler<'a, S: ServiceSupervisor + ?Sized> {
    config: &'a mut TunnelConfig,
    supervisor: &'a S,
}

impl<'a, S: ServiceSupervisor + ?Sized> ForwardReconciler<'a, S> {
    pub fn new(config: &'a mut TunnelConfig, supervisor: &'a S) -> Self {
        Self { config, supervisor }
    }

    /// Write (or rewrite) the port's unit, then enable and start it
    pub async fn create_forward(&mut self, port: u16) -> StepResult {
        let target = self.config.remote_forward_address.ok_or_else(|| {
            ReconcileError::ConfigIncomplete("Remote forward IP not configured".into())
        })?;

        self.supervisor
            .write_unit(port, target)
            .await
            .map_err(|e| {
                ReconcileError::CommandFailed(format!(
                    "Failed to create service file: {}",
                    e.detail()
                ))
            })?;

        if let Err(e) = self.supervisor.reload().await {
            tracing::warn!("Supervisor reload failed: {}", e);
        }

        self.supervisor.enable_now(port).await.map_err(|e| {
            ReconcileError::CommandFailed(format!(
                "Failed to start forward for port {}: {}",
                port,
                e.detail()
            ))
        })?;

        self.config.add_port(port);
        tracing::info!("Forwarding port {} to {}:{}", port, target, port);
        Ok(format!(
            "Port forward for {} created (-> {}:{})",
            port, target, port
        ))
    }

    /// Stop, disable and delete the port's unit; stop/disable failures are ignored
    pub async fn remove_forward(&mut self, port: u16) -> StepResult {
        if let Err(e) = self.supervisor.stop(port).await {
            tracing::debug!("Stop of port {} ignored: {}", port, e);
        }
        if let Err(e) = self.supervisor.disable(port).await {
            tracing::debug!("Disable of port {} ignored: {}", port, e);
        }

        self.supervisor.remove_unit(port).await.map_err(|e| {
            ReconcileError::CommandFailed(format!(
                "Failed to remove service file: {}",
                e.detail()
            ))
        })?;

        if let Err(e) = self.supervisor.reload().await {
            tracing::warn!("Supervisor reload failed: {}", e);
        }

        self.config.remove_port(port);
        tracing::info!("Removed forward for port {}", port);
        Ok(format!("Port forward for {} removed", port))
    }

    pub async fn add_multiple(&mut self, ports: &str) -> BatchReport {
        let mut report = BatchReport::new(NO_FORWARDS);
        for (raw, parsed) in parse_port_list(ports) {
            match parsed {
                Ok(port) => report.push(port.to_string(), self.create_forward(port).await),
                Err(e) => report.push(format!("'{}'", raw), Err(e)),
            }
        }
        report
    }

    pub async fn remove_multiple(&mut self, ports: &str) -> BatchReport {
        let mut report = BatchReport::new(NO_FORWARDS);
        for (raw, parsed) in parse_port_list(ports) {
            match parsed {
                Ok(port) => report.push(port.to_string(), self.remove_forward(port).await),
                Err(e) => report.push(format!("'{}'", raw), Err(e)),
            }
        }
        report
    }

    /// Observed state of every tracked port
    pub async fn list_forwards(&self) -> Vec<ForwardEntry> {
        let mut entries = Vec::with_capacity(self.config.forwarded_ports.len());
        for &port in &self.config.forwarded_ports {
            entries.push(ForwardEntry {
                port,
                target: self
                    .config
                    .remote_forward_address
                    .map(|addr| format!("{}:{}", addr, port)),
                activity: self.supervisor.activity(port).await,
                enablement: self.supervisor.enablement(port).await,
            });
        }
        entries
    }

    fn tracked(&self) -> Vec<u16> {
        self.config.forwarded_ports.iter().copied().collect()
    }

    /// Start every tracked port, recreating units that went missing
    pub async fn start_all(&mut self) -> BatchReport {
        let mut report = BatchReport::new(NO_FORWARDS);
        for port in self.tracked() {
            let result = if !self.supervisor.unit_exists(port).await {
                self.create_forward(port)
                    .await
                    .map(|_| "recreated and started".to_string())
            } else {
                match self.supervisor.start(port).await {
                    Ok(()) => Ok("started".to_string()),
                    Err(e) => Err(ReconcileError::CommandFailed(format!(
                        "failed to start - {}",
                        e.detail()
                    ))),
                }
            };
            report.push(port.to_string(), result);
        }
        report
    }

    pub async fn stop_all(&mut self) -> BatchReport {
        let mut report = BatchReport::new(NO_FORWARDS);
        for port in self.tracked() {
            let result = match self.supervisor.stop(port).await {
                Ok(()) => Ok("stopped".to_string()),
                Err(e) => Err(ReconcileError::CommandFailed(format!(
                    "failed to stop - {}",
                    e.detail()
                ))),
            };
            report.push(port.to_string(), result);
        }
        report
    }

    /// Rewrite every unit with the current target and restart it
    pub async fn restart_all(&mut self) -> BatchReport {
        let mut report = BatchReport::new(NO_FORWARDS);
        for port in self.tracked() {
            let result = if !self.supervisor.unit_exists(port).await {
                self.create_forward(port).await.map(|_| "recreated".to_string())
            } else {
                self.rewrite_and_restart(port).await
            };
            report.push(port.to_string(), result);
        }
        report
    }

    async fn rewrite_and_restart(&self, port: u16) -> StepResult {
        let target = self.config.remote_forward_address.ok_or_else(|| {
            ReconcileError::ConfigIncomplete("Remote forward IP not configured".into())
        })?;
        self.supervisor
            .write_unit(port, target)
            .await
            .map_err(|e| ReconcileError::CommandFailed(format!("failed - {}", e.detail())))?;
        if let Err(e) = self.supervisor.reload().await {
            tracing::warn!("Supervisor reload failed: {}", e);
        }
        match self.supervisor.restart(port).await {
            Ok(()) => Ok("restarted".to_string()),
            Err(e) => Err(ReconcileError::CommandFailed(format!(
                "failed - {}",
                e.detail()
            ))),
        }
    }
}
