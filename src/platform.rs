//! Host environment detection: CI runners and WSL.
use std::path::PathBuf;

/// Platform information for the current host.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Platform {
    /// Running inside a CI job.
    pub is_ci: bool,
    /// File the CI runner reads `NAME=VALUE` lines from between steps.
    pub ci_env_file: Option<PathBuf>,
    /// WSL distribution name when running under WSL.
    pub wsl_distro: Option<String>,
}

impl Platform {
    /// Detect the current platform from the process environment.
    #[must_use]
    pub fn detect() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a platform from an arbitrary variable lookup.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let truthy = |key: &str| {
            lookup(key).is_some_and(|v| matches!(v.trim().to_lowercase().as_str(), "true" | "1"))
        };
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            is_ci: truthy("CI") || truthy("GITHUB_ACTIONS"),
            ci_env_file: non_empty("GITHUB_ENV").map(PathBuf::from),
            wsl_distro: non_empty("WSL_DISTRO_NAME"),
        }
    }

    /// Whether this host is a WSL distribution.
    #[must_use]
    pub const fn is_wsl(&self) -> bool {
        self.wsl_distro.is_some()
    }

    /// CI env file to publish bindings into, if running in CI.
    #[must_use]
    pub fn ci_target(&self) -> Option<&PathBuf> {
        if self.is_ci {
            self.ci_env_file.as_ref()
        } else {
            None
        }
    }
}
