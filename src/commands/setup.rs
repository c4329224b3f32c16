//! The provisioning run: every step in order, then the summary.
use std::sync::Arc;

use anyhow::Result;

use crate::cli::{Cli, VERSION};
use crate::exec::{Executor, SystemExecutor};
use crate::identity::TerminalPrompter;
use crate::logging::Logger;
use crate::platform::Platform;
use crate::steps::{self, Context, RunOptions, StepSelection};

/// Run the bootstrapper.
///
/// # Errors
///
/// Returns the fatal step error when a fatal step fails, or an error
/// counting the failed steps when any non-fatal step failed.
pub fn run(cli: &Cli, log: &Arc<Logger>) -> Result<()> {
    log.info(&format!("devboot {VERSION}"));

    let platform = Platform::detect();
    if platform.is_ci {
        log.debug("CI detected; identity setup disabled");
    }
    if let Some(distro) = &platform.wsl_distro {
        log.debug(&format!("WSL distribution: {distro}"));
    }

    let config = super::load_config(cli, log)?;
    let options = RunOptions {
        verbose: cli.verbose,
        force_reinstall: cli.force,
        identity: cli.identity,
    };
    let executor: Arc<dyn Executor> = Arc::new(SystemExecutor);
    let ctx = Context::new(
        Arc::new(config),
        Arc::new(platform),
        Arc::clone(log),
        options,
        executor,
    )?;
    if ctx.sudo {
        log.debug("not running as root; privileged commands use sudo");
    }

    let selection = StepSelection {
        skip: cli.skip.clone(),
        only: cli.only.clone(),
    };
    let all = steps::all_steps(Box::new(TerminalPrompter));
    let result = steps::run_all(&all, &ctx, &selection);

    log.print_summary();
    result?;

    let count = log.failure_count();
    if count > 0 {
        anyhow::bail!("{count} step(s) failed");
    }
    Ok(())
}
