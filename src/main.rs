//! Command-line entry point for `devboot`.
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use devboot::cli::Cli;
use devboot::commands;
use devboot::logging::{self, Logger};

/// Exit status after Ctrl-C.
const INTERRUPTED: i32 = 130;

fn main() -> ExitCode {
    let _ = enable_ansi_support::enable_ansi_support();
    let cli = Cli::parse();

    let log_path = logging::log_file_path();
    logging::init_subscriber(cli.verbose, log_path.as_deref());
    let log = Arc::new(Logger::new(log_path));

    let on_interrupt = Arc::clone(&log);
    if let Err(e) = ctrlc::set_handler(move || {
        on_interrupt.detail("interrupted");
        exit_interrupted();
    }) {
        log.debug(&format!("cannot install Ctrl-C handler: {e}"));
    }

    match commands::setup::run(&cli, &log) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log.error(&e.to_string());
            log.detail(&format!("{e:#}"));
            if log.step_entries().is_empty() {
                log.point_at_log();
            }
            ExitCode::FAILURE
        }
    }
}

/// Leave a visible marker below any half-drawn spinner line and exit.
#[allow(clippy::print_stderr)]
fn exit_interrupted() -> ! {
    eprintln!("\ninterrupted");
    std::process::exit(INTERRUPTED);
}
