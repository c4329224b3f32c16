//! Extra `NAME=VALUE` bindings from the configuration.
use super::{Context, Step, StepOutcome, publish};
use crate::error::StepError;

/// Publish each `[env.extra]` entry to the binding targets.
#[derive(Debug)]
pub struct PublishExtraEnv;

impl Step for PublishExtraEnv {
    fn name(&self) -> &'static str {
        "Publish environment"
    }

    fn id(&self) -> &'static str {
        "env"
    }

    fn is_fatal(&self) -> bool {
        false
    }

    fn should_run(&self, ctx: &Context) -> bool {
        !ctx.config.env.extra.is_empty()
    }

    fn run(&self, ctx: &Context) -> Result<StepOutcome, StepError> {
        ctx.config
            .env
            .extra
            .iter()
            .try_fold(StepOutcome::Skipped, |acc, (name, value)| {
                Ok(acc.merge(publish(ctx, name, value, self.is_fatal())?))
            })
    }
}
