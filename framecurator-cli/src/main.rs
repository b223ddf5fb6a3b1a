// framecurator-cli/src/main.rs
//
// Entry point of the `framecurator` binary: parses arguments, installs
// logging, runs the selected command and maps failures to exit code 1.

use clap::Parser;
use console::style;
use framecurator::cli::{Cli, Commands};
use framecurator::commands::make_reporter;
use framecurator::error::CliResult;
use framecurator::logging::init_logging;
use framecurator::{run_augment, run_extract};
use log::info;
use std::process;

fn run(cli: Cli) -> CliResult<()> {
    let log_dir = match &cli.command {
        Commands::Extract(args) => args.log_dir.clone().unwrap_or_else(|| args.output_dir.join("logs")),
        Commands::Augment(args) => args.log_dir.clone().unwrap_or_else(|| args.output_dir.join("logs")),
    };
    let log_path = init_logging(&log_dir, cli.verbose)?;
    info!("FrameCurator run started: {}", chrono::Local::now());
    info!("Log file: {}", log_path.display());

    let reporter = make_reporter(cli.json);
    match cli.command {
        Commands::Extract(args) => {
            run_extract(args, reporter.as_ref())?;
        }
        Commands::Augment(args) => {
            run_augment(args, reporter.as_ref())?;
        }
    }

    info!("FrameCurator run finished: {}", chrono::Local::now());
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("{} {}", style("Error:").red().bold(), e);
        process::exit(1);
    }
}
