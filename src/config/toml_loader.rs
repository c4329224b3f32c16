//! TOML configuration file parsing.
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "DEVBOOT_CONFIG";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG: &str = "devboot.toml";

/// Load and deserialize a TOML file.
///
/// A missing file deserializes from an empty document, so every field
/// falls back to its serde default.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_config<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    if !path.exists() {
        return parse_config("", path);
    }

    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;

    parse_config(&content, path)
}

/// Deserialize TOML `content`; `origin` is only used in error messages.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidSyntax`] if the document does not parse.
pub fn parse_config<T: DeserializeOwned>(content: &str, origin: &Path) -> Result<T, ConfigError> {
    toml::from_str(content).map_err(|e| ConfigError::InvalidSyntax {
        path: origin.display().to_string(),
        message: e.message().to_string(),
    })
}

/// Pick the config file to load.
///
/// Order: the `--config` flag, then `DEVBOOT_CONFIG`, then `devboot.toml`
/// in `cwd` when it exists.  `None` means built-in defaults.
#[must_use]
pub fn resolve_config_path(
    explicit: Option<&Path>,
    lookup: impl Fn(&str) -> Option<String>,
    cwd: &Path,
) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    if let Some(path) = lookup(CONFIG_ENV).filter(|v| !v.trim().is_empty()) {
        return Some(PathBuf::from(path));
    }
    let local = cwd.join(LOCAL_CONFIG);
    local.is_file().then_some(local)
}
