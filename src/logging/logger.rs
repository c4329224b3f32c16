//! Operator-facing output channel with summary collection.
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::subscriber::{DETAIL_TARGET, STAGE_TARGET};
use super::types::{StepEntry, StepStatus};

/// Output channel shared by every step.
///
/// Messages go through [`tracing`]; the subscriber installed by
/// [`init_subscriber`](super::subscriber::init_subscriber) decides what
/// reaches the terminal.  `stage`, `info`, `warn` and `error` always do,
/// `debug` and `detail` only in verbose mode.  Every message is written
/// to the log file regardless of verbosity.
///
/// Interactive prompts never pass through this channel, so verbosity can
/// not hide them.
#[derive(Debug)]
pub struct Logger {
    steps: Mutex<Vec<StepEntry>>,
    log_file: Option<PathBuf>,
}

impl Logger {
    /// Create a new logger that reports `log_file` in its summary.
    ///
    /// The file itself is created by the subscriber's file layer.
    #[must_use]
    pub const fn new(log_file: Option<PathBuf>) -> Self {
        Self {
            steps: Mutex::new(Vec::new()),
            log_file,
        }
    }

    /// Return the log file path, if available.
    #[must_use]
    pub fn log_path(&self) -> Option<&Path> {
        self.log_file.as_deref()
    }

    /// Return a clone of all recorded step entries.
    #[must_use]
    pub fn step_entries(&self) -> Vec<StepEntry> {
        self.steps.lock().map_or_else(|_| vec![], |g| g.clone())
    }

    /// Log an error message.
    pub fn error(&self, msg: &str) {
        tracing::error!("{msg}");
    }

    /// Log a warning message.
    pub fn warn(&self, msg: &str) {
        tracing::warn!("{msg}");
    }

    /// Log a stage header (major section).
    pub fn stage(&self, msg: &str) {
        tracing::info!(target: STAGE_TARGET, "{msg}");
    }

    /// Log an informational message.
    pub fn info(&self, msg: &str) {
        tracing::info!("{msg}");
    }

    /// Log a debug message (terminal only when verbose).
    pub fn debug(&self, msg: &str) {
        tracing::debug!("{msg}");
    }

    /// Log diagnostic detail such as captured command output.
    ///
    /// Always lands in the log file; mirrored to the terminal only when
    /// verbose.
    pub fn detail(&self, msg: &str) {
        tracing::trace!(target: DETAIL_TARGET, "{msg}");
    }

    /// Record a step result for the summary.
    pub fn record_step(&self, name: &str, status: StepStatus, message: Option<&str>) {
        if let Ok(mut guard) = self.steps.lock() {
            guard.push(StepEntry {
                name: name.to_string(),
                status,
                message: message.map(String::from),
            });
        }
    }

    /// Return `true` if any recorded step has failed.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.failure_count() > 0
    }

    /// Count the number of failed steps.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.steps.lock().map_or(0, |guard| {
            guard
                .iter()
                .filter(|t| t.status == StepStatus::Failed)
                .count()
        })
    }

    /// Point the operator at the log file.
    pub fn point_at_log(&self) {
        if let Some(path) = &self.log_file {
            self.info(&format!("\x1b[2mlog: {}\x1b[0m", path.display()));
        }
    }

    /// Print the summary of all recorded steps.
    pub fn print_summary(&self) {
        let steps = self.step_entries();
        if steps.is_empty() {
            return;
        }

        self.stage("Summary");

        let mut installed = 0u32;
        let mut skipped = 0u32;
        let mut failed = 0u32;
        for step in &steps {
            match step.status {
                StepStatus::Installed | StepStatus::Reinstalled => installed += 1,
                StepStatus::Skipped | StepStatus::NotApplicable => skipped += 1,
                StepStatus::Failed => failed += 1,
            }
            let (icon, color) = step.status.icon();
            let suffix = step
                .message
                .as_ref()
                .map_or_else(String::new, |msg| format!(" ({msg})"));
            self.info(&format!("{color}{icon} {}{suffix}\x1b[0m", step.name));
        }

        let total = installed + skipped + failed;
        self.info(&format!(
            "{total} steps: \x1b[32m{installed} changed\x1b[0m, \
             \x1b[2m{skipped} unchanged\x1b[0m, \x1b[31m{failed} failed\x1b[0m"
        ));
        self.point_at_log();
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::logging::isolated_logger;
    use std::fs;

    #[test]
    fn logger_new() {
        let (log, _tmp, _guard) = isolated_logger();
        assert!(log.step_entries().is_empty(), "expected empty step list");
    }

    #[test]
    fn record_step_with_message() {
        let (log, _tmp, _guard) = isolated_logger();
        log.record_step("Install SDK", StepStatus::Skipped, Some("already cloned"));
        let steps = log.step_entries();
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].name, "Install SDK");
        assert_eq!(steps[0].message, Some("already cloned".to_string()));
    }

    #[test]
    fn failure_count_returns_correct_count() {
        let (log, _tmp, _guard) = isolated_logger();
        assert!(!log.has_failures());
        log.record_step("a", StepStatus::Installed, None);
        log.record_step("b", StepStatus::Failed, Some("error 1"));
        log.record_step("c", StepStatus::Failed, Some("error 2"));
        log.record_step("d", StepStatus::Skipped, None);
        assert_eq!(log.failure_count(), 2);
        assert!(log.has_failures());
    }

    #[test]
    fn log_file_is_created_with_header() {
        let (log, _tmp, _guard) = isolated_logger();
        let path = log.log_path().expect("log path should exist");
        let contents = fs::read_to_string(path).unwrap();
        assert!(contents.contains("devboot"), "header should name the tool");
    }

    #[test]
    fn debug_always_written_to_file() {
        let (log, _tmp, _guard) = isolated_logger();
        let marker = format!("debug-marker-{}", std::process::id());
        log.debug(&marker);
        let contents = fs::read_to_string(log.log_path().unwrap()).unwrap();
        assert!(
            contents.contains(&marker),
            "debug messages should always appear in the log file"
        );
    }

    #[test]
    fn detail_written_to_file() {
        let (log, _tmp, _guard) = isolated_logger();
        log.detail("tar: short read");
        let contents = fs::read_to_string(log.log_path().unwrap()).unwrap();
        assert!(contents.contains("[detail] tar: short read"));
    }

    #[test]
    fn error_written_to_file() {
        let (log, _tmp, _guard) = isolated_logger();
        let marker = format!("error-marker-{}", std::process::id());
        log.error(&marker);
        let contents = fs::read_to_string(log.log_path().unwrap()).unwrap();
        assert!(contents.contains("[error]"));
        assert!(contents.contains(&marker));
    }

    #[test]
    fn stage_written_to_file_with_arrow() {
        let (log, _tmp, _guard) = isolated_logger();
        log.stage("Install toolchain");
        let contents = fs::read_to_string(log.log_path().unwrap()).unwrap();
        assert!(contents.contains("==> Install toolchain"));
    }

    #[test]
    fn summary_strips_ansi_in_file() {
        let (log, _tmp, _guard) = isolated_logger();
        log.record_step("Install editor", StepStatus::Installed, None);
        log.print_summary();
        let contents = fs::read_to_string(log.log_path().unwrap()).unwrap();
        assert!(contents.contains("✓ Install editor"));
        assert!(!contents.contains('\x1b'), "log file must not contain ANSI codes");
    }
}
