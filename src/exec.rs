//! External command execution.
//!
//! Every command the bootstrapper issues (package manager, git, tar, the
//! editor CLI, ssh tooling) goes through the [`Executor`] trait so that
//! resources and steps can be unit-tested with a mock.  The run wraps its
//! executor in a [`LoggedExecutor`] so captured output reaches the log.
use anyhow::{Context, Result, bail};
use std::io::Write as _;
use std::path::Path;
use std::process::{Command, Output, Stdio};
use std::sync::Arc;

use crate::logging::Logger;

/// Result of a command execution.
#[derive(Debug, Clone, Default)]
pub struct ExecResult {
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
    /// Whether the process exited with status zero.
    pub success: bool,
    /// Exit code, if the process was not killed by a signal.
    pub code: Option<i32>,
}

impl ExecResult {
    /// Standard output followed by standard error, for substring checks that
    /// do not care which stream a tool chose.
    #[must_use]
    pub fn combined(&self) -> String {
        format!("{}{}", self.stdout, self.stderr)
    }
}

impl From<Output> for ExecResult {
    fn from(output: Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            success: output.status.success(),
            code: output.status.code(),
        }
    }
}

/// Abstraction over process execution.
pub trait Executor: Send + Sync + std::fmt::Debug {
    /// Run a command; fails if it exits non-zero.
    ///
    /// # Errors
    ///
    /// Returns an error if the command cannot be spawned or exits non-zero.
    fn run(&self, program: &str, args: &[&str]) -> Result<ExecResult>;

    /// Run a command in `dir`; fails if it exits non-zero.
    ///
    /// # Errors
    ///
    /// Returns an error if the command cannot be spawned or exits non-zero.
    fn run_in(&self, dir: &Path, program: &str, args: &[&str]) -> Result<ExecResult>;

    /// Run a command with extra environment variables; fails if it exits non-zero.
    ///
    /// # Errors
    ///
    /// Returns an error if the command cannot be spawned or exits non-zero.
    fn run_with_env(&self, program: &str, args: &[&str], env: &[(&str, &str)])
    -> Result<ExecResult>;

    /// Run a command feeding `input` on standard input; fails if it exits non-zero.
    ///
    /// # Errors
    ///
    /// Returns an error if the command cannot be spawned or exits non-zero.
    fn run_with_stdin(&self, program: &str, args: &[&str], input: &str) -> Result<ExecResult>;

    /// Run a command and return its result regardless of exit status.
    ///
    /// # Errors
    ///
    /// Returns an error only if the command cannot be spawned.
    fn run_unchecked(&self, program: &str, args: &[&str]) -> Result<ExecResult>;

    /// Check whether `program` resolves on `PATH`.
    fn which(&self, program: &str) -> bool;
}

/// [`Executor`] that spawns real processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemExecutor;

/// Execute a command and return the result, bailing on non-zero exit.
fn execute_checked(mut cmd: Command, label: &str) -> Result<ExecResult> {
    let output = cmd
        .stdin(Stdio::null())
        .output()
        .with_context(|| format!("failed to execute: {label}"))?;
    check(ExecResult::from(output), label)
}

fn check(result: ExecResult, label: &str) -> Result<ExecResult> {
    if !result.success {
        bail!(
            "{label} failed (exit {}): {}",
            result.code.unwrap_or(-1),
            result.stderr.trim()
        );
    }
    Ok(result)
}

impl Executor for SystemExecutor {
    fn run(&self, program: &str, args: &[&str]) -> Result<ExecResult> {
        let mut cmd = Command::new(program);
        cmd.args(args);
        execute_checked(cmd, program)
    }

    fn run_in(&self, dir: &Path, program: &str, args: &[&str]) -> Result<ExecResult> {
        let mut cmd = Command::new(program);
        cmd.args(args).current_dir(dir);
        execute_checked(cmd, &format!("{program} in {}", dir.display()))
    }

    fn run_with_env(
        &self,
        program: &str,
        args: &[&str],
        env: &[(&str, &str)],
    ) -> Result<ExecResult> {
        let mut cmd = Command::new(program);
        cmd.args(args);
        for (k, v) in env {
            cmd.env(k, v);
        }
        execute_checked(cmd, program)
    }

    fn run_with_stdin(&self, program: &str, args: &[&str], input: &str) -> Result<ExecResult> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("failed to execute: {program}"))?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(input.as_bytes())
                .with_context(|| format!("writing stdin of {program}"))?;
        }
        let output = child
            .wait_with_output()
            .with_context(|| format!("waiting for {program}"))?;
        check(ExecResult::from(output), program)
    }

    fn run_unchecked(&self, program: &str, args: &[&str]) -> Result<ExecResult> {
        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .with_context(|| format!("failed to execute: {program}"))?;

        Ok(ExecResult::from(output))
    }

    fn which(&self, program: &str) -> bool {
        which::which(program).is_ok()
    }
}

/// [`Executor`] forwarding captured output to the run's [`Logger`].
///
/// Standard output goes to [`Logger::debug`] (terminal only when verbose),
/// standard error to [`Logger::detail`] (always the log file).  Command
/// lines are not logged since some carry secrets.
#[derive(Debug)]
pub struct LoggedExecutor {
    inner: Arc<dyn Executor>,
    log: Arc<Logger>,
}

impl LoggedExecutor {
    /// Wrap `inner`, logging through `log`.
    #[must_use]
    pub fn new(inner: Arc<dyn Executor>, log: Arc<Logger>) -> Self {
        Self { inner, log }
    }

    fn forward(&self, result: Result<ExecResult>) -> Result<ExecResult> {
        if let Ok(output) = &result {
            for line in output.stdout.lines().filter(|l| !l.trim().is_empty()) {
                self.log.debug(line);
            }
            for line in output.stderr.lines().filter(|l| !l.trim().is_empty()) {
                self.log.detail(line);
            }
        }
        result
    }
}

impl Executor for LoggedExecutor {
    fn run(&self, program: &str, args: &[&str]) -> Result<ExecResult> {
        self.forward(self.inner.run(program, args))
    }

    fn run_in(&self, dir: &Path, program: &str, args: &[&str]) -> Result<ExecResult> {
        self.forward(self.inner.run_in(dir, program, args))
    }

    fn run_with_env(
        &self,
        program: &str,
        args: &[&str],
        env: &[(&str, &str)],
    ) -> Result<ExecResult> {
        self.forward(self.inner.run_with_env(program, args, env))
    }

    fn run_with_stdin(&self, program: &str, args: &[&str], input: &str) -> Result<ExecResult> {
        self.forward(self.inner.run_with_stdin(program, args, input))
    }

    fn run_unchecked(&self, program: &str, args: &[&str]) -> Result<ExecResult> {
        self.forward(self.inner.run_unchecked(program, args))
    }

    fn which(&self, program: &str) -> bool {
        self.inner.which(program)
    }
}
