use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;

use super::RunOptions;
use crate::config::{Config, expand_home};
use crate::exec::{Executor, LoggedExecutor};
use crate::logging::Logger;
use crate::platform::Platform;
use crate::resources::env_binding::{EnvBinding, EnvBindingResource};

/// Shared context for step execution.
pub struct Context {
    /// Run configuration.
    pub config: Arc<Config>,
    /// Detected platform information.
    pub platform: Arc<Platform>,
    /// Logger for output and step recording.
    pub log: Arc<Logger>,
    /// Flags fixed at startup.
    pub options: RunOptions,
    /// User's home directory path.
    pub home: PathBuf,
    /// `PATH` of this process, substituted into CI bindings.
    pub path_env: String,
    /// Prefix privileged commands with `sudo` (not running as root).
    pub sudo: bool,
    /// Command executor; [`Context::new`] wraps it so command output is logged.
    pub executor: Arc<dyn Executor>,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("config", &"<Config>")
            .field("platform", &self.platform)
            .field("options", &self.options)
            .field("home", &self.home)
            .field("sudo", &self.sudo)
            .field("executor", &"<dyn Executor>")
            .finish_non_exhaustive()
    }
}

impl Context {
    /// Creates a new context from the process environment.
    ///
    /// `executor` is wrapped in a [`LoggedExecutor`] writing to `log`.
    ///
    /// # Errors
    ///
    /// Returns an error if `HOME` is not set.
    pub fn new(
        config: Arc<Config>,
        platform: Arc<Platform>,
        log: Arc<Logger>,
        options: RunOptions,
        executor: Arc<dyn Executor>,
    ) -> Result<Self> {
        let home = std::env::var("HOME")
            .map_err(|_| anyhow::anyhow!("HOME environment variable is not set"))?;
        let path_env = std::env::var("PATH").unwrap_or_default();
        let sudo = !is_root(&*executor);
        let executor = Arc::new(LoggedExecutor::new(executor, Arc::clone(&log)));

        Ok(Self {
            config,
            platform,
            log,
            options,
            home: PathBuf::from(home),
            path_env,
            sudo,
            executor,
        })
    }

    /// Expand a configured path against the home directory.
    #[must_use]
    pub fn expand(&self, raw: &str) -> PathBuf {
        expand_home(raw, &self.home)
    }

    /// Shell-init file receiving `export` lines.
    #[must_use]
    pub fn shell_init(&self) -> PathBuf {
        self.expand(&self.config.env.shell_init)
    }

    /// Clone location of the SDK.
    #[must_use]
    pub fn sdk_path(&self) -> PathBuf {
        self.expand(&self.config.sdk.path)
    }

    /// Resources publishing `name=value` to every applicable target.
    ///
    /// Always the shell-init file; additionally the CI env file when
    /// running in CI and the runner provides one.
    #[must_use]
    pub fn bindings(&self, name: &str, value: &str) -> Vec<EnvBindingResource> {
        let mut out = vec![EnvBindingResource::new(
            EnvBinding::shell(name, value),
            self.shell_init(),
        )];
        if let Some(file) = self.platform.ci_target() {
            out.push(EnvBindingResource::new(
                EnvBinding::ci(name, value, &self.path_env),
                file.clone(),
            ));
        }
        out
    }
}

/// Whether the effective user is root, as reported by `id -u`.
fn is_root(executor: &dyn Executor) -> bool {
    executor
        .run_unchecked("id", &["-u"])
        .is_ok_and(|r| r.success && r.stdout.trim() == "0")
}
