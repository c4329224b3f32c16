//! Editor package resource: vendor apt source plus the package itself.
use anyhow::{Context as _, Result};

use super::{Resource, ResourceChange, ResourceState, run_privileged, run_privileged_with_stdin};
use crate::config::EditorConfig;
use crate::exec::Executor;

/// The editor, installed from the vendor's apt repository.
///
/// Satisfied when the editor CLI resolves on `PATH`.
#[derive(Debug)]
pub struct EditorResource<'a> {
    config: &'a EditorConfig,
    sudo: bool,
    executor: &'a dyn Executor,
}

impl<'a> EditorResource<'a> {
    /// Create a new editor resource.
    #[must_use]
    pub const fn new(config: &'a EditorConfig, sudo: bool, executor: &'a dyn Executor) -> Self {
        Self {
            config,
            sudo,
            executor,
        }
    }

    fn install_signing_key(&self) -> Result<()> {
        let key = self
            .executor
            .run("curl", &["-fsSL", &self.config.key_url])
            .context("downloading vendor signing key")?;
        let keyring = self.config.keyring.to_string_lossy();
        if let Some(dir) = self.config.keyring.parent() {
            let dir = dir.to_string_lossy();
            run_privileged(
                self.executor,
                self.sudo,
                "install",
                &["-d", "-m", "0755", &dir],
            )?;
        }
        run_privileged_with_stdin(
            self.executor,
            self.sudo,
            "gpg",
            &["--dearmor", "--yes", "-o", &keyring],
            &key.stdout,
        )
        .context("installing vendor signing key")?;
        Ok(())
    }

    fn install_source(&self) -> Result<()> {
        let list = self.config.source_list.to_string_lossy();
        run_privileged_with_stdin(
            self.executor,
            self.sudo,
            "tee",
            &[&list],
            &format!("{}\n", self.config.source_line),
        )
        .context("writing apt source list")?;
        Ok(())
    }
}

impl Resource for EditorResource<'_> {
    fn description(&self) -> String {
        format!("{} ({})", self.config.package, self.config.command)
    }

    fn current_state(&self) -> Result<ResourceState> {
        if self.executor.which(&self.config.command) {
            Ok(ResourceState::Correct)
        } else {
            Ok(ResourceState::Missing)
        }
    }

    fn apply(&self) -> Result<ResourceChange> {
        self.install_signing_key()?;
        self.install_source()?;
        run_privileged(self.executor, self.sudo, "apt-get", &["update", "-q"])?;
        run_privileged(
            self.executor,
            self.sudo,
            "env",
            &[
                "DEBIAN_FRONTEND=noninteractive",
                "apt-get",
                "install",
                "-y",
                "-q",
                &self.config.package,
            ],
        )?;
        Ok(ResourceChange::Applied)
    }

    fn remove(&self) -> Result<ResourceChange> {
        run_privileged(
            self.executor,
            self.sudo,
            "apt-get",
            &["remove", "-y", "-q", &self.config.package],
        )?;
        Ok(ResourceChange::Applied)
    }
}
