//! Cross toolchain install and its environment bindings.
use super::{Context, Step, StepOutcome, ensure, publish};
use crate::error::StepError;
use crate::resources::toolchain::ToolchainResource;

/// Download and extract the cross toolchain, then publish its location
/// and prepend its `bin` directory to `PATH`.
#[derive(Debug)]
pub struct InstallToolchain;

impl Step for InstallToolchain {
    fn name(&self) -> &'static str {
        "Install cross toolchain"
    }

    fn id(&self) -> &'static str {
        "toolchain"
    }

    fn is_fatal(&self) -> bool {
        true
    }

    fn run(&self, ctx: &Context) -> Result<StepOutcome, StepError> {
        let config = &ctx.config.toolchain;
        ctx.log.debug(&format!("toolchain archive: {}", config.archive_url()));
        let resource = ToolchainResource::new(config, ctx.sudo, &*ctx.executor);
        let installed = ensure(&resource, self.is_fatal(), ctx)?;

        let dir = config.install_dir.display().to_string();
        let home = publish(ctx, &config.env_var, &dir, self.is_fatal())?;
        let path = publish(ctx, "PATH", &format!("{dir}/bin:$PATH"), self.is_fatal())?;
        Ok(installed.merge(home).merge(path))
    }
}
