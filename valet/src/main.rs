//! valet — a package-oriented build orchestrator for C/C++ projects.

mod cli;
mod commands;
mod compiledb;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::{Cli, Command};

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("info"),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    let result = match &cli.command {
        Command::Build(args) => commands::build::execute_cli(args),
        Command::Run(args) => commands::run::execute_cli(args),
        Command::Install(args) => commands::install::execute_cli(args),
    };

    match result {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{err:#}");
            std::process::ExitCode::FAILURE
        }
    }
}
