//! Command-line interface.
use std::path::PathBuf;

use clap::Parser;
use clap::builder::PossibleValuesParser;

use crate::steps::STEP_IDS;

/// Version string reported by `--version` and the startup banner.
pub const VERSION: &str = match option_env!("DEVBOOT_VERSION") {
    Some(v) => v,
    None => env!("CARGO_PKG_VERSION"),
};

/// Command-line options for the bootstrapper.
#[derive(Parser, Debug)]
#[command(
    name = "devboot",
    about = "Bootstrap an embedded development environment",
    version = VERSION
)]
pub struct Cli {
    /// Show diagnostic output on the terminal
    #[arg(short, long)]
    pub verbose: bool,

    /// Reinstall everything, removing previous installs first
    #[arg(short, long)]
    pub force: bool,

    /// Toolchain release to install (e.g. 13.2.Rel1)
    #[arg(long, value_name = "VERSION")]
    pub toolchain_version: Option<String>,

    /// Configuration file (default: $DEVBOOT_CONFIG or ./devboot.toml)
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Interactively set up the Git identity and an SSH key
    #[arg(long)]
    pub identity: bool,

    /// Repository to clone and build once the environment is ready
    #[arg(long = "clone", value_name = "URL")]
    pub clone_repo: Option<String>,

    /// Directory for the --clone checkout
    #[arg(long, value_name = "PATH")]
    pub clone_dir: Option<String>,

    /// Skip specific steps
    #[arg(long, value_delimiter = ',', value_parser = PossibleValuesParser::new(STEP_IDS))]
    pub skip: Vec<String>,

    /// Run only specific steps
    #[arg(long, value_delimiter = ',', value_parser = PossibleValuesParser::new(STEP_IDS))]
    pub only: Vec<String>,
}
