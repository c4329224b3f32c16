//! SDK repository resource: a git clone with recursively initialized submodules.
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};

use super::{Resource, ResourceChange, ResourceState};
use crate::exec::Executor;

/// An SDK cloned at a fixed path.
///
/// Satisfied when `path` is a git repository and `git submodule status
/// --recursive` lists no uninitialized submodule.  A repository with no
/// submodules at all is satisfied.
#[derive(Debug)]
pub struct SdkResource<'a> {
    /// Clone URL.
    pub url: String,
    /// Branch to clone.
    pub branch: String,
    /// Clone location.
    pub path: PathBuf,
    executor: &'a dyn Executor,
}

impl<'a> SdkResource<'a> {
    /// Create a new SDK resource.
    #[must_use]
    pub const fn new(
        url: String,
        branch: String,
        path: PathBuf,
        executor: &'a dyn Executor,
    ) -> Self {
        Self {
            url,
            branch,
            path,
            executor,
        }
    }

    fn git_in(&self, args: &[&str]) -> Result<()> {
        let path = self.path.to_string_lossy();
        let mut full = vec!["-C", &*path];
        full.extend_from_slice(args);
        self.executor.run("git", &full)?;
        Ok(())
    }
}

/// Whether `path` is the top level of a git repository.
#[must_use]
pub fn is_repository(path: &Path) -> bool {
    git2::Repository::open(path).is_ok()
}

/// Paths of submodules `git submodule status` reports as uninitialized.
///
/// Each status line starts with a one-character state: `-` not
/// initialized, `+` checked out at a different commit, `U` conflicted, or
/// a space when up to date.  Only `-` means the submodule is not populated.
#[must_use]
pub fn uninitialized_submodules(status: &str) -> Vec<String> {
    status
        .lines()
        .filter_map(|line| line.strip_prefix('-'))
        .filter_map(|rest| rest.split_whitespace().nth(1))
        .map(String::from)
        .collect()
}

/// Where a non-repository directory is moved before cloning.
///
/// `<path>.bak`, or `<path>.bak.<timestamp>` when that already exists.
#[must_use]
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".bak");
    let candidate = PathBuf::from(&name);
    if !candidate.exists() {
        return candidate;
    }
    name.push(format!(".{}", chrono::Utc::now().format("%Y%m%d%H%M%S")));
    PathBuf::from(name)
}

/// Clear a directory that is not a repository out of the clone path.
///
/// Empty directories are removed; anything else is moved aside.  Returns
/// the backup location when something was moved.
///
/// # Errors
///
/// Returns an error if the directory cannot be read, removed or renamed.
pub fn set_aside(path: &Path) -> Result<Option<PathBuf>> {
    let is_empty = fs::read_dir(path)
        .with_context(|| format!("reading {}", path.display()))?
        .next()
        .is_none();
    if is_empty {
        fs::remove_dir(path).with_context(|| format!("removing empty {}", path.display()))?;
        return Ok(None);
    }
    let backup = backup_path(path);
    fs::rename(path, &backup)
        .with_context(|| format!("moving {} to {}", path.display(), backup.display()))?;
    Ok(Some(backup))
}

impl Resource for SdkResource<'_> {
    fn description(&self) -> String {
        format!("{} at {}", self.url, self.path.display())
    }

    fn current_state(&self) -> Result<ResourceState> {
        if !self.path.exists() {
            return Ok(ResourceState::Missing);
        }
        if !self.path.is_dir() {
            return Ok(ResourceState::Invalid {
                reason: format!("{} exists and is not a directory", self.path.display()),
            });
        }
        if !is_repository(&self.path) {
            return Ok(ResourceState::Incorrect {
                current: "not a git repository".to_string(),
            });
        }

        let path = self.path.to_string_lossy();
        let result = self.executor.run_unchecked(
            "git",
            &["-C", &path, "submodule", "status", "--recursive"],
        )?;
        if !result.success {
            return Ok(ResourceState::Incorrect {
                current: "submodule status failed".to_string(),
            });
        }
        let pending = uninitialized_submodules(&result.stdout);
        if pending.is_empty() {
            Ok(ResourceState::Correct)
        } else {
            Ok(ResourceState::Incorrect {
                current: format!("uninitialized submodules: {}", pending.join(", ")),
            })
        }
    }

    fn apply(&self) -> Result<ResourceChange> {
        if self.path.is_dir() && !is_repository(&self.path) {
            set_aside(&self.path)?;
        }

        if is_repository(&self.path) {
            self.git_in(&["pull", "--ff-only"]).context("updating SDK")?;
        } else {
            if let Some(parent) = self.path.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("creating {}", parent.display()))?;
            }
            let path = self.path.to_string_lossy();
            self.executor
                .run(
                    "git",
                    &["clone", "--branch", &self.branch, &self.url, &path],
                )
                .context("cloning SDK")?;
        }

        self.git_in(&["submodule", "update", "--init", "--recursive"])
            .context("initializing SDK submodules")?;
        Ok(ResourceChange::Applied)
    }

    fn remove(&self) -> Result<ResourceChange> {
        if !self.path.exists() {
            return Ok(ResourceChange::AlreadyCorrect);
        }
        fs::remove_dir_all(&self.path)
            .with_context(|| format!("removing {}", self.path.display()))?;
        Ok(ResourceChange::Applied)
    }
}
