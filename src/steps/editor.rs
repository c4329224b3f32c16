//! Editor install from the vendor apt repository.
use super::{Context, Step, StepOutcome, ensure};
use crate::error::StepError;
use crate::resources::editor::EditorResource;

/// Install the editor package unless its CLI already resolves.
#[derive(Debug)]
pub struct InstallEditor;

impl Step for InstallEditor {
    fn name(&self) -> &'static str {
        "Install editor"
    }

    fn id(&self) -> &'static str {
        "editor"
    }

    fn is_fatal(&self) -> bool {
        true
    }

    fn run(&self, ctx: &Context) -> Result<StepOutcome, StepError> {
        let resource = EditorResource::new(&ctx.config.editor, ctx.sudo, &*ctx.executor);
        ensure(&resource, self.is_fatal(), ctx)
    }
}
