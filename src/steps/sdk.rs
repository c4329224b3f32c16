//! SDK clone with submodules and its environment binding.
use super::{Context, Step, StepOutcome, ensure, publish};
use crate::error::StepError;
use crate::resources::sdk::SdkResource;

/// Clone the SDK, initialize its submodules and publish its path.
#[derive(Debug)]
pub struct InstallSdk;

impl Step for InstallSdk {
    fn name(&self) -> &'static str {
        "Install SDK"
    }

    fn id(&self) -> &'static str {
        "sdk"
    }

    fn is_fatal(&self) -> bool {
        true
    }

    fn run(&self, ctx: &Context) -> Result<StepOutcome, StepError> {
        let config = &ctx.config.sdk;
        let path = ctx.sdk_path();
        let resource = SdkResource::new(
            config.url.clone(),
            config.branch.clone(),
            path.clone(),
            &*ctx.executor,
        );
        let cloned = ensure(&resource, self.is_fatal(), ctx)?;
        let bound = publish(
            ctx,
            &config.env_var,
            &path.display().to_string(),
            self.is_fatal(),
        )?;
        Ok(cloned.merge(bound))
    }
}
