//! Command-line entry point: dispatches `journey` subcommands against the
//! module sequencing and workflow orchestration core.

mod context;
mod journey;
mod logging;

use std::path::PathBuf;

use adt_core::config::CliOverrides;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
#[command(name = "adt")]
struct Cli {
    #[arg(short, long, global = true, help = "Raise the log level to debug")]
    verbose: bool,
    #[arg(long, global = true, value_name = "PATH", help = "Also write logs to this file")]
    log_file: Option<PathBuf>,
    #[arg(long = "enable", global = true, value_name = "MODULE", help = "Force-enable a module")]
    enable: Vec<String>,
    #[arg(long = "disable", global = true, value_name = "MODULE", help = "Force-disable a module")]
    disable: Vec<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Journey(journey::JourneyArgs),
}

fn cli_overrides(enable: &[String], disable: &[String]) -> CliOverrides {
    let mut overrides = CliOverrides::new();
    for name in disable {
        overrides.insert(name.clone(), false);
    }
    for name in enable {
        overrides.insert(name.clone(), true);
    }
    overrides
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _guard = logging::init(cli.verbose, cli.log_file.as_deref())?;
    let overrides = cli_overrides(&cli.enable, &cli.disable);

    match cli.command {
        Commands::Journey(journey) => journey.run(overrides),
    }
}
