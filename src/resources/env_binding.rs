//! Environment variable bindings persisted to a shell-init or CI env file.
use std::fs;
use std::io::Write as _;
use std::path::PathBuf;

use anyhow::{Context as _, Result};

use super::{Resource, ResourceChange, ResourceState};

/// Where a binding is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingTarget {
    /// `export NAME="VALUE"` in a file sourced by interactive shells.
    ShellInit,
    /// `NAME=VALUE` in the file a CI runner reads between steps.
    CiEnv,
}

/// A named value published to one target file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvBinding {
    /// Variable name.
    pub name: String,
    /// Value; for [`BindingTarget::ShellInit`] it may reference other
    /// variables such as `$PATH`, expanded when the shell starts.
    pub value: String,
    /// Target file format.
    pub target: BindingTarget,
}

impl EnvBinding {
    /// A shell-init binding.
    #[must_use]
    pub fn shell(name: &str, value: &str) -> Self {
        Self {
            name: name.to_string(),
            value: value.to_string(),
            target: BindingTarget::ShellInit,
        }
    }

    /// A CI binding with `$PATH` in `value` replaced by `current_path`.
    ///
    /// CI env files are not evaluated by a shell, so references must be
    /// resolved before writing.
    #[must_use]
    pub fn ci(name: &str, value: &str, current_path: &str) -> Self {
        Self {
            name: name.to_string(),
            value: value
                .replace("${PATH}", current_path)
                .replace("$PATH", current_path),
            target: BindingTarget::CiEnv,
        }
    }

    /// The exact line written to the target file.
    #[must_use]
    pub fn line(&self) -> String {
        match self.target {
            BindingTarget::ShellInit => {
                let escaped = self.value.replace('\\', "\\\\").replace('"', "\\\"");
                format!("export {}=\"{escaped}\"", self.name)
            }
            BindingTarget::CiEnv => format!("{}={}", self.name, self.value),
        }
    }

    fn prefix(&self) -> String {
        match self.target {
            BindingTarget::ShellInit => format!("export {}=", self.name),
            BindingTarget::CiEnv => format!("{}=", self.name),
        }
    }
}

/// An [`EnvBinding`] present as an exact line in `file`.
///
/// Publishing is an idempotent append: if the file already holds the exact
/// line nothing is written.  A binding for the same name with a different
/// value is left in place and the new line is appended after it.
#[derive(Debug)]
pub struct EnvBindingResource {
    /// Binding to publish.
    pub binding: EnvBinding,
    /// File the binding is appended to.
    pub file: PathBuf,
}

impl EnvBindingResource {
    /// Create a new binding resource.
    #[must_use]
    pub const fn new(binding: EnvBinding, file: PathBuf) -> Self {
        Self { binding, file }
    }

    fn read(&self) -> Result<Option<String>> {
        match fs::read_to_string(&self.file) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("reading {}", self.file.display())),
        }
    }
}

impl Resource for EnvBindingResource {
    fn description(&self) -> String {
        format!("{} in {}", self.binding.name, self.file.display())
    }

    fn current_state(&self) -> Result<ResourceState> {
        let Some(text) = self.read()? else {
            return Ok(ResourceState::Missing);
        };
        let line = self.binding.line();
        if text.lines().any(|l| l == line) {
            return Ok(ResourceState::Correct);
        }
        let prefix = self.binding.prefix();
        Ok(text
            .lines()
            .find(|l| l.starts_with(&prefix))
            .map_or(ResourceState::Missing, |l| ResourceState::Incorrect {
                current: l.to_string(),
            }))
    }

    fn apply(&self) -> Result<ResourceChange> {
        let existing = self.read()?.unwrap_or_default();
        let line = self.binding.line();
        if existing.lines().any(|l| l == line) {
            return Ok(ResourceChange::AlreadyCorrect);
        }

        if let Some(parent) = self.file.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.file)
            .with_context(|| format!("opening {}", self.file.display()))?;
        let separator = if existing.is_empty() || existing.ends_with('\n') {
            ""
        } else {
            "\n"
        };
        writeln!(file, "{separator}{line}")
            .with_context(|| format!("appending to {}", self.file.display()))?;
        Ok(ResourceChange::Applied)
    }

    fn remove(&self) -> Result<ResourceChange> {
        let Some(text) = self.read()? else {
            return Ok(ResourceChange::AlreadyCorrect);
        };
        let line = self.binding.line();
        if !text.lines().any(|l| l == line) {
            return Ok(ResourceChange::AlreadyCorrect);
        }
        let mut kept: String = text
            .lines()
            .filter(|l| *l != line)
            .collect::<Vec<_>>()
            .join("\n");
        if !kept.is_empty() {
            kept.push('\n');
        }
        fs::write(&self.file, kept).with_context(|| format!("rewriting {}", self.file.display()))?;
        Ok(ResourceChange::Applied)
    }
}
