//! Idempotent resource primitives (check + apply pattern).
pub mod editor;
pub mod editor_settings;
pub mod env_binding;
pub mod error;
pub mod git_config;
pub mod package;
pub mod sdk;
pub mod toolchain;
pub mod vscode_extension;

use anyhow::Result;

use crate::exec::{ExecResult, Executor};

/// State of a resource (package set, install directory, file line, etc.).
///
/// # Examples
///
/// ```
/// use devboot::resources::ResourceState;
///
/// let missing = ResourceState::Missing;
/// let correct = ResourceState::Correct;
/// let stale = ResourceState::Incorrect { current: "12.3.1".into() };
/// let blocked = ResourceState::Invalid { reason: "path is a file".into() };
///
/// assert_ne!(missing, correct);
/// assert!(stale.has_artifact());
/// assert!(!blocked.has_artifact());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceState {
    /// Resource does not exist or is not present.
    Missing,
    /// Resource exists and matches the desired state.
    Correct,
    /// Resource exists but does not match the desired state.
    Incorrect {
        /// The current value of the resource.
        current: String,
    },
    /// Resource cannot be applied as-is.
    Invalid {
        /// Reason why the resource cannot be applied.
        reason: String,
    },
}

impl ResourceState {
    /// Whether something from an earlier install is present on the host.
    #[must_use]
    pub const fn has_artifact(&self) -> bool {
        matches!(self, Self::Correct | Self::Incorrect { .. })
    }
}

/// Result of applying or removing a resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceChange {
    /// Resource was created, updated or removed.
    Applied,
    /// Resource was already correct (no change needed).
    AlreadyCorrect,
    /// Nothing was done.
    Skipped {
        /// Reason why the resource was skipped.
        reason: String,
    },
}

/// An installable artifact: a side-effect-free state check, the action
/// that brings it to the desired state, and the clean-slate removal used
/// before a forced reinstall.
pub trait Resource {
    /// Human-readable description of this resource.
    fn description(&self) -> String;

    /// Check the current state of the resource.
    ///
    /// Must not change host state.
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be determined at all.
    fn current_state(&self) -> Result<ResourceState>;

    /// Bring the resource to the desired state.
    ///
    /// # Errors
    ///
    /// Returns an error if any command or file operation fails.
    fn apply(&self) -> Result<ResourceChange>;

    /// Remove a previous install so the next `apply()` starts clean.
    ///
    /// The default implementation leaves the artifact in place; `apply()`
    /// then overwrites it.
    ///
    /// # Errors
    ///
    /// Returns an error if the artifact exists but cannot be removed.
    fn remove(&self) -> Result<ResourceChange> {
        Ok(ResourceChange::Skipped {
            reason: format!("{} is replaced in place", self.description()),
        })
    }
}

/// Run `program` as root, through `sudo` when `sudo` is set.
///
/// # Errors
///
/// Returns an error if the command fails.
pub fn run_privileged(
    executor: &dyn Executor,
    sudo: bool,
    program: &str,
    args: &[&str],
) -> Result<ExecResult> {
    if sudo {
        let mut full = Vec::with_capacity(args.len() + 1);
        full.push(program);
        full.extend_from_slice(args);
        executor.run("sudo", &full)
    } else {
        executor.run(program, args)
    }
}

/// Like [`run_privileged`], feeding `input` on standard input.
///
/// # Errors
///
/// Returns an error if the command fails.
pub fn run_privileged_with_stdin(
    executor: &dyn Executor,
    sudo: bool,
    program: &str,
    args: &[&str],
    input: &str,
) -> Result<ExecResult> {
    if sudo {
        let mut full = Vec::with_capacity(args.len() + 1);
        full.push(program);
        full.extend_from_slice(args);
        executor.run_with_stdin("sudo", &full, input)
    } else {
        executor.run_with_stdin(program, args, input)
    }
}
