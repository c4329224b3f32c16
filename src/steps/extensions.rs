//! Editor extensions, installed one at a time with failures collected.
use super::{Context, Step, StepOutcome, ensure_from_state};
use crate::error::StepError;
use crate::resources::vscode_extension::{VsCodeExtensionResource, get_installed_extensions};

/// Per-extension results of one run, in configuration order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExtensionReport {
    /// Extensions installed where none was before.
    pub installed: Vec<String>,
    /// Extensions removed and installed again.
    pub reinstalled: Vec<String>,
    /// Extensions already present.
    pub skipped: Vec<String>,
    /// Extensions that failed, in the order they were attempted.
    pub failed: Vec<String>,
}

impl ExtensionReport {
    /// Outcome of the whole step.
    #[must_use]
    pub fn outcome(&self) -> StepOutcome {
        if !self.failed.is_empty() {
            StepOutcome::Failed
        } else if !self.reinstalled.is_empty() {
            StepOutcome::Reinstalled
        } else if !self.installed.is_empty() {
            StepOutcome::Installed
        } else {
            StepOutcome::Skipped
        }
    }
}

/// Install every configured extension, continuing past failures.
///
/// # Errors
///
/// Never fails with [`StepError::Fatal`]; the `Result` mirrors the other
/// step helpers.
pub fn install_extensions(ctx: &Context) -> Result<ExtensionReport, StepError> {
    let code = &ctx.config.editor.command;
    let mut report = ExtensionReport::default();

    ctx.log.debug(&format!(
        "batch-checking {} extensions with a single query",
        ctx.config.editor.extensions.len()
    ));
    let installed = match get_installed_extensions(code, &*ctx.executor) {
        Ok(set) => set,
        Err(e) => {
            ctx.log.detail(&format!("{code} --list-extensions: {e:#}"));
            ctx.log.warn(&format!("could not run {code}; extensions not installed"));
            report.failed.clone_from(&ctx.config.editor.extensions);
            return Ok(report);
        }
    };

    for id in &ctx.config.editor.extensions {
        let resource = VsCodeExtensionResource::new(id.clone(), code.clone(), &*ctx.executor);
        let state = resource.state_from_installed(&installed);
        match ensure_from_state(&resource, state, false, ctx)? {
            StepOutcome::Skipped => report.skipped.push(id.clone()),
            StepOutcome::Installed => report.installed.push(id.clone()),
            StepOutcome::Reinstalled => report.reinstalled.push(id.clone()),
            StepOutcome::Failed => report.failed.push(id.clone()),
        }
    }

    if !report.failed.is_empty() {
        ctx.log.warn(&format!(
            "failed to install extensions: {}",
            report.failed.join(", ")
        ));
    }
    Ok(report)
}

/// Install the configured editor extensions.
#[derive(Debug)]
pub struct InstallExtensions;

impl Step for InstallExtensions {
    fn name(&self) -> &'static str {
        "Install editor extensions"
    }

    fn id(&self) -> &'static str {
        "extensions"
    }

    fn is_fatal(&self) -> bool {
        false
    }

    fn should_run(&self, ctx: &Context) -> bool {
        !ctx.config.editor.extensions.is_empty()
    }

    fn run(&self, ctx: &Context) -> Result<StepOutcome, StepError> {
        Ok(install_extensions(ctx)?.outcome())
    }
}
