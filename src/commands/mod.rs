//! Top-level command orchestration.
pub mod setup;

use anyhow::{Context as _, Result};

use crate::cli::Cli;
use crate::config::toml_loader::resolve_config_path;
use crate::config::{Config, validation};
use crate::logging::Logger;

/// Resolve, load and validate the configuration, applying CLI overrides.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or a value
/// (including an overridden one) is unusable.
pub fn load_config(cli: &Cli, log: &Logger) -> Result<Config> {
    let cwd = std::env::current_dir().context("reading current directory")?;
    let path = resolve_config_path(cli.config.as_deref(), |k| std::env::var(k).ok(), &cwd);
    match &path {
        Some(p) => log.info(&format!("config: {}", p.display())),
        None => log.debug("no config file; using built-in defaults"),
    }

    let mut config = Config::load(path.as_deref())?;
    apply_overrides(&mut config, cli);
    validation::validate(&config)?;
    Ok(config)
}

/// Fold command-line overrides into `config`.
pub fn apply_overrides(config: &mut Config, cli: &Cli) {
    if let Some(version) = &cli.toolchain_version {
        config.toolchain.version.clone_from(version);
    }
    if let Some(repo) = &cli.clone_repo {
        config.target.repo = Some(repo.clone());
    }
    if let Some(dir) = &cli.clone_dir {
        config.target.dir = Some(dir.clone());
    }
}
