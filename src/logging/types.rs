//! Core logging types: step entries and their recorded status.

/// Step execution result for summary reporting.
#[derive(Debug, Clone)]
pub struct StepEntry {
    /// Human-readable step name.
    pub name: String,
    /// Final status of the step.
    pub status: StepStatus,
    /// Optional detail message (e.g., skip reason or error description).
    pub message: Option<String>,
}

/// Status of a completed step as shown in the summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    /// Everything the step manages was already in place.
    Skipped,
    /// The step installed something that was missing.
    Installed,
    /// The step removed a prior artifact and installed it again.
    Reinstalled,
    /// The step was not run (disabled, filtered out, or irrelevant here).
    NotApplicable,
    /// The step could not bring the host into the desired state.
    Failed,
}

impl StepStatus {
    /// Summary icon and ANSI colour for this status.
    #[must_use]
    pub const fn icon(self) -> (&'static str, &'static str) {
        match self {
            Self::Skipped => ("○", "\x1b[2m"),
            Self::Installed => ("✓", "\x1b[32m"),
            Self::Reinstalled => ("↻", "\x1b[36m"),
            Self::NotApplicable => ("·", "\x1b[2m"),
            Self::Failed => ("✗", "\x1b[31m"),
        }
    }
}
