//! External command execution

use async_trait::async_trait;

/// Exit code reported when a command was killed on timeout or never started
pub const TIMEOUT_EXIT_CODE: i32 = -1;

/// Captured result of one external command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl CommandOutput {
    /// Successful output with the given stdout
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            success: true,
            stdout: stdout.into(),
            stderr: String::new(),
            exit_code: 0,
        }
    }

    /// Failed output with the given stderr and exit code
    pub fn failed(stderr: impl Into<String>, exit_code: i32) -> Self {
        Self {
            success: false,
            stdout: String::new(),
            stderr: stderr.into(),
            exit_code,
        }
    }

    /// Most useful text for an operator: stderr, else stdout
    pub fn detail(&self) -> &str {
        if self.stderr.is_empty() {
            &self.stdout
        } else {
            &self.stderr
        }
    }

    /// stdout on success, otherwise the failure detail
    pub fn display_text(&self) -> &str {
        if self.success {
            &self.stdout
        } else {
            self.detail()
        }
    }
}

/// Runs one external program at a time with a bounded timeout
///
/// Implementations never fail: spawn errors and timeouts come back as
/// `success = false` with exit code [`TIMEOUT_EXIT_CODE`].
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, program: &str, args: &[&str]) -> CommandOutput;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detail_prefers_stderr() {
        let mut out = CommandOutput::failed("RTNETLINK answers: File exists", 2);
        assert_eq!(out.detail(), "RTNETLINK answers: File exists");
        out.stderr.clear();
        out.stdout = "partial".into();
        assert_eq!(out.detail(), "partial");
    }

    #[test]
    fn test_display_text() {
        assert_eq!(CommandOutput::ok("Tunnel 1000, encap IP").display_text(), "Tunnel 1000, encap IP");
        assert_eq!(CommandOutput::failed("Command timed out", TIMEOUT_EXIT_CODE).display_text(), "Command timed out");
    }
}
