//! Command executor backed by tokio processes
//!
//! Every command runs to completion or is killed when the configured timeout
//! expires. There is no retry; a timeout is reported like any other failure.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use l2_core::config::Settings;
use l2_core::traits::{CommandOutput, CommandRunner, TIMEOUT_EXIT_CODE};

/// Message reported when a command exceeds its timeout
pub const TIMED_OUT: &str = "Command timed out";

/// Runs programs directly (no shell) with a hard timeout
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    timeout: Duration,
}

impl ProcessRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.command_timeout)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// Render a program and its arguments as one line for logs and reports
pub fn command_line(program: &str, args: &[&str]) -> String {
    let mut line = program.to_string();
    for arg in args {
        line.push(' ');
        line.push_str(arg);
    }
    line
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, program: &str, args: &[&str]) -> CommandOutput {
        let line = command_line(program, args);
        tracing::debug!("Running: {}", line);

        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output();

        match tokio::time::timeout(self.timeout, child).await {
            Ok(Ok(output)) => {
                let result = CommandOutput {
                    success: output.status.success(),
                    stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
                    stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
                    exit_code: output.status.code().unwrap_or(TIMEOUT_EXIT_CODE),
                };
                if !result.success {
                    tracing::debug!(
                        "Command failed ({}): {}: {}",
                        result.exit_code,
                        line,
                        result.detail()
                    );
                }
                result
            }
            Ok(Err(e)) => {
                tracing::warn!("Failed to run {}: {}", line, e);
                CommandOutput::failed(e.to_string(), TIMEOUT_EXIT_CODE)
            }
            Err(_) => {
                tracing::warn!("Command timed out after {:?}: {}", self.timeout, line);
                CommandOutput::failed(TIMED_OUT, TIMEOUT_EXIT_CODE)
            }
        }
    }
}
