//! Editor settings file: whole-file JSON overwrite.
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};

use super::{Resource, ResourceChange, ResourceState};
use crate::platform::Platform;

/// Location of the editor's user `settings.json`.
///
/// Under WSL the editor runs on Windows and reads machine settings from
/// the remote server directory inside the distribution.
#[must_use]
pub fn settings_path(platform: &Platform, home: &Path) -> PathBuf {
    if platform.is_wsl() {
        home.join(".vscode-server/data/Machine/settings.json")
    } else {
        home.join(".config/Code/User/settings.json")
    }
}

/// A JSON settings file holding exactly the configured document.
#[derive(Debug)]
pub struct SettingsFileResource {
    /// Target file.
    pub path: PathBuf,
    /// Desired document.
    pub payload: serde_json::Value,
}

impl SettingsFileResource {
    /// Create a new settings file resource.
    #[must_use]
    pub const fn new(path: PathBuf, payload: serde_json::Value) -> Self {
        Self { path, payload }
    }

    fn rendered(&self) -> Result<String> {
        let mut text =
            serde_json::to_string_pretty(&self.payload).context("serializing settings")?;
        text.push('\n');
        Ok(text)
    }
}

impl Resource for SettingsFileResource {
    fn description(&self) -> String {
        self.path.display().to_string()
    }

    fn current_state(&self) -> Result<ResourceState> {
        if !self.path.exists() {
            return Ok(ResourceState::Missing);
        }
        if self.path.is_dir() {
            return Ok(ResourceState::Invalid {
                reason: "settings path is a directory".to_string(),
            });
        }
        let text = fs::read_to_string(&self.path)
            .with_context(|| format!("reading {}", self.path.display()))?;
        match serde_json::from_str::<serde_json::Value>(&text) {
            Ok(current) if current == self.payload => Ok(ResourceState::Correct),
            Ok(_) => Ok(ResourceState::Incorrect {
                current: "different settings".to_string(),
            }),
            Err(e) => Ok(ResourceState::Incorrect {
                current: format!("unparsable JSON: {e}"),
            }),
        }
    }

    fn apply(&self) -> Result<ResourceChange> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        fs::write(&self.path, self.rendered()?)
            .with_context(|| format!("writing {}", self.path.display()))?;
        Ok(ResourceChange::Applied)
    }

    fn remove(&self) -> Result<ResourceChange> {
        if !self.path.is_file() {
            return Ok(ResourceChange::AlreadyCorrect);
        }
        fs::remove_file(&self.path)
            .with_context(|| format!("removing {}", self.path.display()))?;
        Ok(ResourceChange::Applied)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn settings_path_depends_on_wsl() {
        let home = Path::new("/home/dev");
        let native = Platform::default();
        let wsl = Platform {
            wsl_distro: Some("Ubuntu".to_string()),
            ..Platform::default()
        };
        assert_eq!(
            settings_path(&native, home),
            PathBuf::from("/home/dev/.config/Code/User/settings.json")
        );
        assert_eq!(
            settings_path(&wsl, home),
            PathBuf::from("/home/dev/.vscode-server/data/Machine/settings.json")
        );
    }

    #[test]
    fn apply_then_state_is_correct() {
        let tmp = tempfile::tempdir().unwrap();
        let res = SettingsFileResource::new(
            tmp.path().join("User/settings.json"),
            json!({"cmake.generator": "Ninja"}),
        );
        assert_eq!(res.current_state().unwrap(), ResourceState::Missing);
        res.apply().unwrap();
        assert_eq!(res.current_state().unwrap(), ResourceState::Correct);
    }

    #[test]
    fn whitespace_differences_are_still_correct() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("settings.json");
        fs::write(&path, "{\"a\":1}").unwrap();
        let res = SettingsFileResource::new(path, json!({"a": 1}));
        assert_eq!(res.current_state().unwrap(), ResourceState::Correct);
    }

    #[test]
    fn different_document_is_overwritten() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("settings.json");
        fs::write(&path, "{\"a\": 2, \"b\": true}").unwrap();
        let res = SettingsFileResource::new(path.clone(), json!({"a": 1}));
        assert!(matches!(
            res.current_state().unwrap(),
            ResourceState::Incorrect { .. }
        ));
        res.apply().unwrap();
        let written: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written, json!({"a": 1}));
    }

    #[test]
    fn broken_json_is_incorrect() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("settings.json");
        fs::write(&path, "{ // comment").unwrap();
        let res = SettingsFileResource::new(path, json!({}));
        assert!(matches!(
            res.current_state().unwrap(),
            ResourceState::Incorrect { .. }
        ));
    }

    #[test]
    fn remove_deletes_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("settings.json");
        let res = SettingsFileResource::new(path.clone(), json!({}));
        res.apply().unwrap();
        assert_eq!(res.remove().unwrap(), ResourceChange::Applied);
        assert!(!path.exists());
    }
}
