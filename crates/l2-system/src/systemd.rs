//! `ServiceSupervisor` bound to systemd
//!
//! Each forwarded port gets its own unit file (not a template instance) so
//! the relay target is baked into the unit and survives reboots.

use std::io;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;

use l2_core::config::Settings;
use l2_core::error::GatewayError;
use l2_core::traits::{CommandRunner, ServiceSupervisor};
use l2_core::types::{Enablement, ServiceActivity};

/// Render the unit of one socat relay
pub fn render_unit(relay_binary: &Path, port: u16, target: Ipv4Addr) -> String {
    format!(
        r#"[Unit]
Description=l2tpctl port forward - port {port}
After=network.target
Requires=network.target

[Service]
Type=simple
ExecStart={relay} TCP4-LISTEN:{port},reuseaddr,fork TCP4:{target}:{port}
Restart=always
RestartSec=5

[Install]
WantedBy=multi-user.target
"#,
        port = port,
        relay = relay_binary.display(),
        target = target,
    )
}

/// Relay services managed through `systemctl` and unit files
#[derive(Clone)]
pub struct SystemdSupervisor {
    runner: Arc<dyn CommandRunner>,
    unit_dir: PathBuf,
    unit_prefix: String,
    relay_binary: PathBuf,
}

impl SystemdSupervisor {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        unit_dir: impl Into<PathBuf>,
        unit_prefix: impl Into<String>,
        relay_binary: impl Into<PathBuf>,
    ) -> Self {
        Self {
            runner,
            unit_dir: unit_dir.into(),
            unit_prefix: unit_prefix.into(),
            relay_binary: relay_binary.into(),
        }
    }

    pub fn from_settings(runner: Arc<dyn CommandRunner>, settings: &Settings) -> Self {
        Self::new(
            runner,
            &settings.unit_dir,
            &settings.unit_prefix,
            &settings.relay_binary,
        )
    }

    pub fn unit_path(&self, port: u16) -> PathBuf {
        self.unit_dir.join(self.unit_name(port))
    }

    async fn systemctl(&self, args: &[&str]) -> Result<(), GatewayError> {
        let out = self.runner.run("systemctl", args).await;
        if out.success {
            Ok(())
        } else {
            Err(GatewayError::Command {
                detail: out.detail().to_string(),
                exit_code: out.exit_code,
            })
        }
    }

    async fn unit_command(&self, verb: &str, port: u16) -> Result<(), GatewayError> {
        let unit = self.unit_name(port);
        self.systemctl(&[verb, &unit]).await
    }
}

#[async_trait]
impl ServiceSupervisor for SystemdSupervisor {
    fn unit_name(&self, port: u16) -> String {
        format!("{}-{}.service", self.unit_prefix, port)
    }

    async fn unit_exists(&self, port: u16) -> bool {
        tokio::fs::try_exists(self.unit_path(port))
            .await
            .unwrap_or(false)
    }

    async fn write_unit(&self, port: u16, target: Ipv4Addr) -> Result<(), GatewayError> {
        let path = self.unit_path(port);
        tokio::fs::create_dir_all(&self.unit_dir).await?;
        tokio::fs::write(&path, render_unit(&self.relay_binary, port, target))
            .await
            .map_err(|e| GatewayError::Io(format!("Failed to write {}: {}", path.display(), e)))?;
        tracing::debug!("Wrote unit {}", path.display());
        Ok(())
    }

    async fn remove_unit(&self, port: u16) -> Result<bool, GatewayError> {
        let path = self.unit_path(port);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(GatewayError::Io(format!(
                "Failed to remove {}: {}",
                path.display(),
                e
            ))),
        }
    }

    async fn reload(&self) -> Result<(), GatewayError> {
        self.systemctl(&["daemon-reload"]).await
    }

    async fn enable_now(&self, port: u16) -> Result<(), GatewayError> {
        let unit = self.unit_name(port);
        self.systemctl(&["enable", "--now", &unit]).await
    }

    async fn start(&self, port: u16) -> Result<(), GatewayError> {
        self.unit_command("start", port).await
    }

    async fn stop(&self, port: u16) -> Result<(), GatewayError> {
        self.unit_command("stop", port).await
    }

    async fn restart(&self, port: u16) -> Result<(), GatewayError> {
        self.unit_command("restart", port).await
    }

    async fn disable(&self, port: u16) -> Result<(), GatewayError> {
        self.unit_command("disable", port).await
    }

    async fn activity(&self, port: u16) -> ServiceActivity {
        let unit = self.unit_name(port);
        let out = self.runner.run("systemctl", &["is-active", &unit]).await;
        if out.success && out.stdout.trim() == "active" {
            ServiceActivity::Active
        } else {
            ServiceActivity::Inactive
        }
    }

    async fn enablement(&self, port: u16) -> Enablement {
        let unit = self.unit_name(port);
        let out = self.runner.run("systemctl", &["is-enabled", &unit]).await;
        if out.success {
            Enablement::Enabled
        } else {
            Enablement::Disabled
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedRunner;
    use l2_core::traits::CommandOutput;
    use tempfile::TempDir;

    fn supervisor(dir: &TempDir) -> (Arc<ScriptedRunner>, SystemdSupervisor) {
        let runner = Arc::new(ScriptedRunner::new());
        let supervisor =
            SystemdSupervisor::new(runner.clone(), dir.path(), "l2tpctl-fwd", "/usr/bin/socat");
        (runner, supervisor)
    }

    #[test]
    fn test_render_unit() {
        let unit = render_unit(Path::new("/usr/bin/socat"), 443, Ipv4Addr::new(10, 30, 30, 2));
        assert!(unit.contains(
            "ExecStart=/usr/bin/socat TCP4-LISTEN:443,reuseaddr,fork TCP4:10.30.30.2:443"
        ));
        assert!(unit.contains("Restart=always"));
        assert!(unit.contains("WantedBy=multi-user.target"));
    }

    #[tokio::test]
    async fn test_write_overwrite_and_remove_unit() {
        let dir = TempDir::new().unwrap();
        let (_runner, supervisor) = supervisor(&dir);

        assert!(!supervisor.unit_exists(80).await);
        supervisor.write_unit(80, Ipv4Addr::new(10, 30, 30, 2)).await.unwrap();
        supervisor.write_unit(80, Ipv4Addr::new(10, 30, 30, 6)).await.unwrap();
        assert!(supervisor.unit_exists(80).await);

        let content = std::fs::read_to_string(dir.path().join("l2tpctl-fwd-80.service")).unwrap();
        assert!(content.contains("TCP4:10.30.30.6:80"));

        assert!(supervisor.remove_unit(80).await.unwrap());
        assert!(!supervisor.remove_unit(80).await.unwrap());
    }

    #[tokio::test]
    async fn test_systemctl_commands() {
        let dir = TempDir::new().unwrap();
        let (runner, supervisor) = supervisor(&dir);

        supervisor.reload().await.unwrap();
        supervisor.enable_now(443).await.unwrap();
        supervisor.restart(443).await.unwrap();
        assert_eq!(
            runner.calls(),
            vec![
                "systemctl daemon-reload",
                "systemctl enable --now l2tpctl-fwd-443.service",
                "systemctl restart l2tpctl-fwd-443.service",
            ]
        );
    }

    #[tokio::test]
    async fn test_status_queries() {
        let dir = TempDir::new().unwrap();
        let (runner, supervisor) = supervisor(&dir);
        runner.respond(
            "systemctl is-active l2tpctl-fwd-80.service",
            CommandOutput::ok("active"),
        );
        runner.respond(
            "systemctl is-enabled l2tpctl-fwd-80.service",
            CommandOutput::ok("enabled"),
        );
        runner.respond(
            "systemctl is-active l2tpctl-fwd-81.service",
            CommandOutput::failed("inactive", 3),
        );
        runner.respond(
            "systemctl is-enabled l2tpctl-fwd-81.service",
            CommandOutput::failed("Failed to get unit file state", 1),
        );

        assert_eq!(supervisor.activity(80).await, ServiceActivity::Active);
        assert_eq!(supervisor.enablement(80).await, Enablement::Enabled);
        assert_eq!(supervisor.activity(81).await, ServiceActivity::Inactive);
        assert_eq!(supervisor.enablement(81).await, Enablement::Disabled);
    }

    #[tokio::test]
    async fn test_start_failure() {
        let dir = TempDir::new().unwrap();
        let (runner, supervisor) = supervisor(&dir);
        runner.respond(
            "systemctl start l2tpctl-fwd-22.service",
            CommandOutput::failed("Job failed", 1),
        );
        assert!(matches!(
            supervisor.start(22).await,
            Err(GatewayError::Command { exit_code: 1, .. })
        ));
    }
}
