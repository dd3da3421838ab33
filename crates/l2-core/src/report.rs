//! Operator-facing reports for reconciliation sequences and batches
//!
//! Every operation ends in text suitable for direct display. Sequences keep
//! the ordered list of steps that were attempted; batches keep one line per
//! item and never stop early.

use std::fmt;

use crate::error::ReconcileError;

/// Result of one reconciliation step: a success message or a typed failure
pub type StepResult = Result<String, ReconcileError>;

/// Named step of a sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    CreateTunnel,
    CreateSession,
    BringUpInterface,
    AssignAddress,
    DeleteSession,
    DeleteTunnel,
    RemoveForwards,
    SaveConfig,
    DeleteConfig,
    /// Free-form step label (prerequisites and the like)
    Other(String),
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::CreateTunnel => write!(f, "Create tunnel"),
            Step::CreateSession => write!(f, "Create session"),
            Step::BringUpInterface => write!(f, "Bring up interface"),
            Step::AssignAddress => write!(f, "Assign IP"),
            Step::DeleteSession => write!(f, "Delete session"),
            Step::DeleteTunnel => write!(f, "Delete tunnel"),
            Step::RemoveForwards => write!(f, "Remove forwards"),
            Step::SaveConfig => write!(f, "Save config"),
            Step::DeleteConfig => write!(f, "Delete config"),
            Step::Other(label) => write!(f, "{}", label),
        }
    }
}

/// One attempted step and its outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    pub step: Step,
    pub result: StepResult,
}

impl StepReport {
    pub fn message(&self) -> String {
        match &self.result {
            Ok(msg) => msg.clone(),
            Err(e) => e.to_string(),
        }
    }
}

/// Ordered report of a multi-step sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceReport {
    pub title: String,
    pub steps: Vec<StepReport>,
    pub success: bool,
    /// Closing confirmation, present only when the sequence ran to the end
    pub footer: Option<String>,
}

impl SequenceReport {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            steps: Vec::new(),
            success: true,
            footer: None,
        }
    }

    /// Append a step outcome and hand it back for inspection
    pub fn record(&mut self, step: Step, result: StepResult) -> &StepResult {
        match &result {
            Ok(_) => tracing::debug!(step = %step, "sequence step ok"),
            Err(e) => {
                tracing::debug!(step = %step, kind = e.kind(), "sequence step failed: {}", e)
            }
        }
        self.steps.push(StepReport { step, result });
        // just pushed
        &self.steps[self.steps.len() - 1].result
    }

    /// Mark the sequence failed and stop
    pub fn abort(mut self) -> Self {
        self.success = false;
        self
    }

    /// Mark the sequence complete with a closing line
    pub fn finish(mut self, footer: impl Into<String>) -> Self {
        self.footer = Some(footer.into());
        self
    }

    /// Outcome of a named step, if it was attempted
    pub fn outcome(&self, step: &Step) -> Option<&StepResult> {
        self.steps.iter().find(|s| &s.step == step).map(|s| &s.result)
    }

    /// `(success, text)` pair for display
    pub fn into_pair(self) -> (bool, String) {
        let text = self.to_string();
        (self.success, text)
    }
}

impl fmt::Display for SequenceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== {} ===", self.title)?;
        for step in &self.steps {
            writeln!(f, "{}: {}", step.step, step.message())?;
        }
        if let Some(footer) = &self.footer {
            write!(f, "\n✓ {}", footer)?;
        }
        Ok(())
    }
}

/// One item of a batch operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchLine {
    /// Item as the operator wrote it, e.g. `80` or `'notaport'`
    pub subject: String,
    pub result: StepResult,
}

/// Per-item report of a batch operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReport {
    pub lines: Vec<BatchLine>,
    empty_message: String,
}

impl BatchReport {
    pub fn new(empty_message: impl Into<String>) -> Self {
        Self {
            lines: Vec::new(),
            empty_message: empty_message.into(),
        }
    }

    pub fn push(&mut self, subject: impl Into<String>, result: StepResult) {
        self.lines.push(BatchLine {
            subject: subject.into(),
            result,
        });
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Number of items whose operation failed
    pub fn failures(&self) -> usize {
        self.lines.iter().filter(|l| l.result.is_err()).count()
    }

    pub fn all_succeeded(&self) -> bool {
        self.failures() == 0
    }

    pub fn into_pair(self) -> (bool, String) {
        let text = self.to_string();
        (self.all_succeeded(), text)
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.lines.is_empty() {
            return write!(f, "{}", self.empty_message);
        }
        for (i, line) in self.lines.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            let msg = match &line.result {
                Ok(msg) => msg.clone(),
                Err(e) => e.to_string(),
            };
            write!(f, "Port {}: {}", line.subject, msg)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_report_display() {
        let mut report = SequenceReport::new("Setting up tunnel: edge");
        report.record(Step::CreateTunnel, Ok("Tunnel 1000 created".into()));
        report.record(
            Step::CreateSession,
            Err(ReconcileError::AlreadyExists("Session 10 already exists".into())),
        );
        let report = report.finish("Tunnel 'edge' setup complete!");

        let text = report.to_string();
        assert!(text.starts_with("=== Setting up tunnel: edge ===\n"));
        assert!(text.contains("Create tunnel: Tunnel 1000 created\n"));
        assert!(text.contains("Create session: Session 10 already exists\n"));
        assert!(text.ends_with("\n✓ Tunnel 'edge' setup complete!"));
        assert!(report.success);
    }

    #[test]
    fn test_aborted_sequence_has_no_footer() {
        let mut report = SequenceReport::new("t");
        report.record(Step::CreateTunnel, Err(ReconcileError::CommandFailed("boom".into())));
        let (ok, text) = report.abort().into_pair();
        assert!(!ok);
        assert!(!text.contains('✓'));
    }

    #[test]
    fn test_batch_report_lines() {
        let mut batch = BatchReport::new("No port forwards configured");
        assert_eq!(batch.to_string(), "No port forwards configured");

        batch.push("80", Ok("started".into()));
        batch.push("'x'", Err(ReconcileError::ParseFailure("Invalid port number".into())));
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.failures(), 1);
        assert_eq!(
            batch.to_string(),
            "Port 80: started\nPort 'x': Invalid port number"
        );
    }
}
