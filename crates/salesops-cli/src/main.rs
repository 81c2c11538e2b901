//! SalesOps CLI - applies and rolls back numbered SQL schema files

use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;
use tracing::error;

mod banner;
mod cli;
mod commands;
mod logging;

use cli::Cli;

fn main() -> ExitCode {
    let started = Instant::now();
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            // --help and --version come through here too.
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    // Tracing is not installed yet, so config problems go straight to stderr.
    let config = match commands::resolve_config(&cli.global) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("salesops: {e}");
            return ExitCode::from(e.exit_code());
        }
    };

    logging::init_tracing(&config.log);

    match commands::dispatch(&cli.command, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(elapsed_ms = started.elapsed().as_millis(), "{e:#}");
            ExitCode::from(commands::exit_code(&e))
        }
    }
}
