//! Distribution packages needed to build firmware.
use super::{Context, Step, StepOutcome, ensure};
use crate::error::StepError;
use crate::resources::package::AptPackages;

/// Install the configured apt packages in one batch.
#[derive(Debug)]
pub struct InstallDevTools;

impl Step for InstallDevTools {
    fn name(&self) -> &'static str {
        "Install development tools"
    }

    fn id(&self) -> &'static str {
        "tools"
    }

    fn is_fatal(&self) -> bool {
        true
    }

    fn should_run(&self, ctx: &Context) -> bool {
        !ctx.config.tools.packages.is_empty()
    }

    fn run(&self, ctx: &Context) -> Result<StepOutcome, StepError> {
        ctx.log.debug(&format!(
            "checking {} packages with a single dpkg-query",
            ctx.config.tools.packages.len()
        ));
        let packages = AptPackages::new(
            ctx.config.tools.packages.clone(),
            ctx.sudo,
            &*ctx.executor,
        )
        .with_reinstall(ctx.options.force_reinstall);
        ensure(&packages, self.is_fatal(), ctx)
    }
}
