//! Provisioning steps and the idempotent `ensure` engine that drives them.
mod context;
pub mod dev_tools;
pub mod editor;
pub mod env;
pub mod extensions;
pub mod identity;
pub mod sdk;
pub mod settings;
pub mod target;
pub mod toolchain;

pub use context::Context;

use anyhow::anyhow;

use crate::error::StepError;
use crate::identity::Prompter;
use crate::logging::StepStatus;
use crate::resources::error::ResourceError;
use crate::resources::{Resource, ResourceState};

/// Flags fixed at startup and threaded through every step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Mirror diagnostic output to the terminal.
    pub verbose: bool,
    /// Re-run every install action, removing prior artifacts first.
    pub force_reinstall: bool,
    /// Run the interactive Git/SSH identity setup.
    pub identity: bool,
}

/// Terminal state of one step or resource.
///
/// # Examples
///
/// ```
/// use devboot::steps::StepOutcome;
///
/// assert_eq!(StepOutcome::Skipped.merge(StepOutcome::Installed), StepOutcome::Installed);
/// assert_eq!(StepOutcome::Installed.merge(StepOutcome::Failed), StepOutcome::Failed);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum StepOutcome {
    /// Already satisfied; nothing ran.
    Skipped,
    /// Installed where nothing existed before.
    Installed,
    /// A prior install was replaced.
    Reinstalled,
    /// The action or its verification failed.
    Failed,
}

impl StepOutcome {
    /// Combine the outcomes of several resources into one step outcome.
    ///
    /// Any failure wins, then any reinstall, then any install.
    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        self.max(other)
    }

    /// Summary status for this outcome.
    #[must_use]
    pub const fn status(self) -> StepStatus {
        match self {
            Self::Skipped => StepStatus::Skipped,
            Self::Installed => StepStatus::Installed,
            Self::Reinstalled => StepStatus::Reinstalled,
            Self::Failed => StepStatus::Failed,
        }
    }
}

/// Stable identifiers accepted by `--skip` and `--only`, in run order.
pub const STEP_IDS: &[&str] = &[
    "tools",
    "toolchain",
    "sdk",
    "editor",
    "extensions",
    "settings",
    "env",
    "identity",
    "target",
];

/// A named provisioning step.
pub trait Step {
    /// Human-readable step name, used in the summary and fatal messages.
    fn name(&self) -> &'static str;

    /// Identifier used by `--skip` and `--only`.
    fn id(&self) -> &'static str;

    /// Whether a failure aborts the whole run.
    fn is_fatal(&self) -> bool;

    /// Whether this step applies to the current configuration and host.
    fn should_run(&self, _ctx: &Context) -> bool {
        true
    }

    /// Execute the step.
    ///
    /// # Errors
    ///
    /// Returns [`StepError::Fatal`] when a fatal action fails.
    fn run(&self, ctx: &Context) -> Result<StepOutcome, StepError>;
}

/// Step filter from `--skip` / `--only`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepSelection {
    /// Steps never run.
    pub skip: Vec<String>,
    /// When non-empty, only these steps run.
    pub only: Vec<String>,
}

impl StepSelection {
    /// Whether the step with `id` is selected.
    #[must_use]
    pub fn allows(&self, id: &str) -> bool {
        !self.skip.iter().any(|s| s == id)
            && (self.only.is_empty() || self.only.iter().any(|s| s == id))
    }
}

/// The fixed step sequence.
#[must_use]
pub fn all_steps(prompter: Box<dyn Prompter>) -> Vec<Box<dyn Step>> {
    vec![
        Box::new(dev_tools::InstallDevTools),
        Box::new(toolchain::InstallToolchain),
        Box::new(sdk::InstallSdk),
        Box::new(editor::InstallEditor),
        Box::new(extensions::InstallExtensions),
        Box::new(settings::ApplyEditorSettings),
        Box::new(env::PublishExtraEnv),
        Box::new(identity::SetupIdentity::new(prompter)),
        Box::new(target::BuildTarget),
    ]
}

/// Drive `resource` to its desired state.
///
/// Skips when already satisfied (unless forcing), removes a prior artifact
/// first when forcing, applies, then re-checks.  A failure on a `fatal`
/// resource is returned as [`StepError::Fatal`]; otherwise it is logged and
/// reported as [`StepOutcome::Failed`].
///
/// # Errors
///
/// Returns [`StepError::Fatal`] when `fatal` is set and the state check,
/// removal or action fails.
pub fn ensure(
    resource: &dyn Resource,
    fatal: bool,
    ctx: &Context,
) -> Result<StepOutcome, StepError> {
    match resource.current_state() {
        Ok(state) => ensure_from_state(resource, state, fatal, ctx),
        Err(e) => fail(ctx, &resource.description(), fatal, e.context("checking state")),
    }
}

/// Like [`ensure`], starting from a state the caller already determined.
///
/// Used when one bulk query answers the state of many resources.
///
/// # Errors
///
/// Same as [`ensure`].
pub fn ensure_from_state(
    resource: &dyn Resource,
    state: ResourceState,
    fatal: bool,
    ctx: &Context,
) -> Result<StepOutcome, StepError> {
    let desc = resource.description();
    let force = ctx.options.force_reinstall;

    if let ResourceState::Invalid { reason } = &state {
        let err = ResourceError::InvalidState {
            resource: desc.clone(),
            reason: reason.clone(),
        };
        return fail(ctx, &desc, fatal, err.into());
    }
    if state == ResourceState::Correct && !force {
        ctx.log.debug(&format!("{desc}: already satisfied"));
        return Ok(StepOutcome::Skipped);
    }

    let prior = state.has_artifact();
    if force && prior {
        ctx.log.debug(&format!("{desc}: removing existing install"));
        if let Err(e) = resource.remove() {
            return fail(ctx, &desc, fatal, e.context("removing previous install"));
        }
    }

    ctx.log.info(&format!("installing {desc}"));
    if let Err(e) = resource.apply() {
        return fail(ctx, &desc, fatal, e);
    }

    match resource.current_state() {
        Ok(ResourceState::Correct) => Ok(if prior {
            StepOutcome::Reinstalled
        } else {
            StepOutcome::Installed
        }),
        Ok(after) => {
            ctx.log.detail(&format!(
                "{desc}: still unsatisfied after install: {after:?}"
            ));
            ctx.log.warn(&format!("{desc}: install did not take effect"));
            Ok(StepOutcome::Failed)
        }
        Err(e) => {
            ctx.log.detail(&format!("{desc}: re-check failed: {e:#}"));
            ctx.log.warn(&format!("{desc}: could not verify install"));
            Ok(StepOutcome::Failed)
        }
    }
}

fn fail(
    ctx: &Context,
    desc: &str,
    fatal: bool,
    err: anyhow::Error,
) -> Result<StepOutcome, StepError> {
    ctx.log.detail(&format!("{desc}: {err:#}"));
    if fatal {
        Err(StepError::fatal(desc, err))
    } else {
        ctx.log.warn(&format!("{desc} failed: {err}"));
        Ok(StepOutcome::Failed)
    }
}

/// Publish `name=value` to every binding target of this run.
///
/// # Errors
///
/// Returns [`StepError::Fatal`] when `fatal` is set and a target file can
/// not be written.
pub fn publish(
    ctx: &Context,
    name: &str,
    value: &str,
    fatal: bool,
) -> Result<StepOutcome, StepError> {
    ctx.bindings(name, value)
        .iter()
        .try_fold(StepOutcome::Skipped, |acc, binding| {
            Ok(acc.merge(ensure(binding, fatal, ctx)?))
        })
}

/// Run one external command as part of a step.
///
/// Captured output is logged by the context's executor.  On failure a
/// `fatal` command yields [`StepError::Fatal`] and a non-fatal one logs a
/// warning and returns `Ok(false)`.
///
/// # Errors
///
/// Returns [`StepError::Fatal`] when `fatal` is set and the command fails
/// or cannot be spawned.
pub fn run_step_command(
    ctx: &Context,
    program: &str,
    args: &[&str],
    description: &str,
    fatal: bool,
) -> Result<bool, StepError> {
    ctx.log.debug(&format!("running: {program} {}", args.join(" ")));
    let result = match ctx.executor.run_unchecked(program, args) {
        Ok(r) => r,
        Err(e) => return fail(ctx, description, fatal, e).map(|_| false),
    };
    if result.success {
        return Ok(true);
    }
    let err = anyhow!(
        "{program} exited with {}",
        result.code.map_or_else(|| "a signal".to_string(), |c| format!("status {c}"))
    );
    fail(ctx, description, fatal, err).map(|_| false)
}

/// Execute a step, recording its outcome in the logger.
///
/// # Errors
///
/// Propagates [`StepError::Fatal`] renamed after the step.
pub fn execute(
    step: &dyn Step,
    ctx: &Context,
    selection: &StepSelection,
) -> Result<StepOutcome, StepError> {
    if !selection.allows(step.id()) {
        ctx.log.debug(&format!("skipping step: {} (deselected)", step.name()));
        ctx.log.record_step(step.name(), StepStatus::NotApplicable, Some("deselected"));
        return Ok(StepOutcome::Skipped);
    }
    if !step.should_run(ctx) {
        ctx.log.debug(&format!("skipping step: {} (not applicable)", step.name()));
        ctx.log.record_step(step.name(), StepStatus::NotApplicable, None);
        return Ok(StepOutcome::Skipped);
    }

    ctx.log.stage(step.name());

    match step.run(ctx) {
        Ok(outcome) => {
            let message = (outcome == StepOutcome::Skipped).then_some("already satisfied");
            ctx.log.record_step(step.name(), outcome.status(), message);
            Ok(outcome)
        }
        Err(StepError::Fatal {
            step: failed,
            source,
        }) => {
            ctx.log.record_step(
                step.name(),
                StepStatus::Failed,
                Some(&format!("{failed}: {source}")),
            );
            Err(StepError::Fatal {
                step: step.name().to_string(),
                source,
            })
        }
    }
}

/// Run every selected step in order, stopping at the first fatal failure.
///
/// # Errors
///
/// Returns the first [`StepError::Fatal`].
pub fn run_all(
    steps: &[Box<dyn Step>],
    ctx: &Context,
    selection: &StepSelection,
) -> Result<(), StepError> {
    for step in steps {
        execute(step.as_ref(), ctx, selection)?;
    }
    Ok(())
}
