//! OS package resource (apt/dpkg).
use std::collections::HashSet;

use anyhow::Result;

use super::{Resource, ResourceChange, ResourceState, run_privileged};
use crate::exec::Executor;

/// Status `dpkg-query` reports for a fully installed package.
const INSTALLED_STATUS: &str = "install ok installed";

/// A batch of apt packages installed with one `apt-get install`.
#[derive(Debug)]
pub struct AptPackages<'a> {
    /// Package names.
    pub names: Vec<String>,
    /// Pass `--reinstall` so already-present packages are unpacked again.
    pub reinstall: bool,
    sudo: bool,
    executor: &'a dyn Executor,
}

impl<'a> AptPackages<'a> {
    /// Create a new package batch.
    #[must_use]
    pub const fn new(names: Vec<String>, sudo: bool, executor: &'a dyn Executor) -> Self {
        Self {
            names,
            reinstall: false,
            sudo,
            executor,
        }
    }

    /// Set whether `apply()` reinstalls packages that are already present.
    #[must_use]
    pub fn with_reinstall(mut self, reinstall: bool) -> Self {
        self.reinstall = reinstall;
        self
    }

    /// Names from this batch that are not fully installed, in batch order.
    #[must_use]
    pub fn missing_from(&self, installed: &HashSet<String>) -> Vec<&str> {
        self.names
            .iter()
            .filter(|n| !installed.contains(n.as_str()))
            .map(String::as_str)
            .collect()
    }
}

/// Query which of `names` dpkg reports as `install ok installed`.
///
/// Runs a single `dpkg-query` for the whole list.  Unknown packages make
/// `dpkg-query` exit non-zero but still print the known ones, so the exit
/// status is ignored.
///
/// # Errors
///
/// Returns an error if `dpkg-query` cannot be spawned.
pub fn get_installed_packages(
    names: &[String],
    executor: &dyn Executor,
) -> Result<HashSet<String>> {
    let mut args = vec!["-W", "--showformat=${Package} ${Status}\\n"];
    args.extend(names.iter().map(String::as_str));
    let result = executor.run_unchecked("dpkg-query", &args)?;
    Ok(parse_dpkg_status(&result.stdout))
}

/// Parse `${Package} ${Status}` lines into the set of installed names.
///
/// Multi-arch packages are reported as `name:arch`; the suffix is dropped.
#[must_use]
pub fn parse_dpkg_status(stdout: &str) -> HashSet<String> {
    stdout
        .lines()
        .filter_map(|line| line.trim().split_once(' '))
        .filter(|(_, status)| status.trim() == INSTALLED_STATUS)
        .map(|(name, _)| name.split(':').next().unwrap_or(name).to_string())
        .collect()
}

impl Resource for AptPackages<'_> {
    fn description(&self) -> String {
        format!("{} apt packages", self.names.len())
    }

    fn current_state(&self) -> Result<ResourceState> {
        if self.names.is_empty() {
            return Ok(ResourceState::Correct);
        }
        let installed = get_installed_packages(&self.names, self.executor)?;
        let missing = self.missing_from(&installed);
        if missing.is_empty() {
            Ok(ResourceState::Correct)
        } else if missing.len() == self.names.len() {
            Ok(ResourceState::Missing)
        } else {
            Ok(ResourceState::Incorrect {
                current: format!("missing {}", missing.join(", ")),
            })
        }
    }

    fn apply(&self) -> Result<ResourceChange> {
        if self.names.is_empty() {
            return Ok(ResourceChange::AlreadyCorrect);
        }
        run_privileged(self.executor, self.sudo, "apt-get", &["update", "-q"])?;

        let mut args = vec![
            "DEBIAN_FRONTEND=noninteractive",
            "apt-get",
            "install",
            "-y",
            "-q",
        ];
        if self.reinstall {
            args.push("--reinstall");
        }
        args.extend(self.names.iter().map(String::as_str));
        run_privileged(self.executor, self.sudo, "env", &args)?;
        Ok(ResourceChange::Applied)
    }
}
