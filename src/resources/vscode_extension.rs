//! VS Code extension resource.
use std::collections::HashSet;

use anyhow::Result;

use super::error::ResourceError;
use super::{Resource, ResourceChange, ResourceState};
use crate::exec::Executor;

/// A VS Code extension resource that can be checked and installed.
#[derive(Debug)]
pub struct VsCodeExtensionResource<'a> {
    /// Extension identifier (e.g. "ms-vscode.cpptools").
    pub id: String,
    /// VS Code CLI command to use.
    pub code_cmd: String,
    executor: &'a dyn Executor,
}

impl<'a> VsCodeExtensionResource<'a> {
    /// Create a new VS Code extension resource.
    #[must_use]
    pub const fn new(id: String, code_cmd: String, executor: &'a dyn Executor) -> Self {
        Self {
            id,
            code_cmd,
            executor,
        }
    }

    /// Determine the resource state from a pre-fetched set of installed extension IDs.
    ///
    /// This avoids running `code --list-extensions` per resource when used
    /// with [`get_installed_extensions`].
    #[must_use]
    pub fn state_from_installed(&self, installed: &HashSet<String>) -> ResourceState {
        if installed.contains(&self.id.to_lowercase()) {
            ResourceState::Correct
        } else {
            ResourceState::Missing
        }
    }
}

/// Query the full set of installed VS Code extension IDs in a single command.
///
/// Returns a `HashSet` of **lower-cased** extension IDs.  A failing CLI
/// yields an empty set.
///
/// # Errors
///
/// Returns an error if the VS Code command cannot be spawned.
pub fn get_installed_extensions(
    code_cmd: &str,
    executor: &dyn Executor,
) -> Result<HashSet<String>> {
    let result = executor.run_unchecked(code_cmd, &["--list-extensions"])?;
    let mut set = HashSet::new();
    if result.success {
        for line in result.stdout.lines() {
            let id = line.trim().to_lowercase();
            if !id.is_empty() {
                set.insert(id);
            }
        }
    }
    Ok(set)
}

impl Resource for VsCodeExtensionResource<'_> {
    fn description(&self) -> String {
        self.id.clone()
    }

    fn current_state(&self) -> Result<ResourceState> {
        let installed = get_installed_extensions(&self.code_cmd, self.executor)?;
        Ok(self.state_from_installed(&installed))
    }

    fn apply(&self) -> Result<ResourceChange> {
        let result = self.executor.run_unchecked(
            &self.code_cmd,
            &["--install-extension", &self.id, "--force"],
        )?;
        if result.success {
            Ok(ResourceChange::Applied)
        } else {
            Err(ResourceError::ExtensionInstall {
                id: self.id.clone(),
                stderr: result.stderr.trim().to_string(),
            }
            .into())
        }
    }

    fn remove(&self) -> Result<ResourceChange> {
        let result = self
            .executor
            .run_unchecked(&self.code_cmd, &["--uninstall-extension", &self.id])?;
        if result.success {
            Ok(ResourceChange::Applied)
        } else {
            Ok(ResourceChange::Skipped {
                reason: format!("uninstall failed: {}", result.stderr.trim()),
            })
        }
    }
}
