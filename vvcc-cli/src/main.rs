use clap::Parser;
use tracing::{Level, error, info};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

mod cli;
mod commands;
mod config;
mod error;

use cli::CliArgs;
use config::ProgramConfig;
use error::AppError;

fn main() {
    if let Err(e) = bootstrap() {
        eprintln!("Error: {e}");
        // Log the full error for debugging
        error!(error = ?e, "Application failed");
        std::process::exit(1);
    }
}

fn bootstrap() -> Result<(), AppError> {
    // Parse command-line arguments
    let args = CliArgs::parse();

    init_logging(args.verbose)?;

    let program_config = ProgramConfig::from(args.command);
    info!("{}", program_config.conversion);

    commands::run(&program_config)
}

fn init_logging(verbose: bool) -> Result<(), AppError> {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .try_init()
        .map_err(|e| AppError::Initialization(e.to_string()))
}
