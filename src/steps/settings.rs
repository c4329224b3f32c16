//! Editor user settings.
use super::{Context, Step, StepOutcome, ensure};
use crate::error::StepError;
use crate::resources::editor_settings::{SettingsFileResource, settings_path};

/// Overwrite the editor settings file with the configured document.
#[derive(Debug)]
pub struct ApplyEditorSettings;

impl Step for ApplyEditorSettings {
    fn name(&self) -> &'static str {
        "Apply editor settings"
    }

    fn id(&self) -> &'static str {
        "settings"
    }

    fn is_fatal(&self) -> bool {
        false
    }

    fn should_run(&self, ctx: &Context) -> bool {
        ctx.config.editor.settings.is_some()
    }

    fn run(&self, ctx: &Context) -> Result<StepOutcome, StepError> {
        let Some(payload) = ctx.config.editor.settings.clone() else {
            return Ok(StepOutcome::Skipped);
        };
        let path = settings_path(&ctx.platform, &ctx.home);
        ctx.log.debug(&format!("settings file: {}", path.display()));
        ensure(&SettingsFileResource::new(path, payload), self.is_fatal(), ctx)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::platform::Platform;
    use crate::steps::test_helpers::make_context;
    use serde_json::json;
    use std::fs;

    #[test]
    fn writes_then_skips() {
        let mut config = Config::default();
        config.editor.settings = Some(json!({"cmake.generator": "Ninja"}));
        let (ctx, _tmp) = make_context(config, Platform::default());

        assert_eq!(ApplyEditorSettings.run(&ctx).unwrap(), StepOutcome::Installed);
        assert_eq!(ApplyEditorSettings.run(&ctx).unwrap(), StepOutcome::Skipped);

        let written = fs::read_to_string(ctx.home.join(".config/Code/User/settings.json")).unwrap();
        assert_eq!(
            serde_json::from_str::<serde_json::Value>(&written).unwrap(),
            json!({"cmake.generator": "Ninja"})
        );
    }

    #[test]
    fn wsl_uses_server_settings() {
        let platform = Platform {
            wsl_distro: Some("Ubuntu".to_string()),
            ..Platform::default()
        };
        let (ctx, _tmp) = make_context(Config::default(), platform);
        ApplyEditorSettings.run(&ctx).unwrap();
        assert!(
            ctx.home
                .join(".vscode-server/data/Machine/settings.json")
                .is_file()
        );
    }

    #[test]
    fn disabled_without_payload() {
        let mut config = Config::default();
        config.editor.settings = None;
        let (ctx, _tmp) = make_context(config, Platform::default());
        assert!(!ApplyEditorSettings.should_run(&ctx));
    }
}
