//! Argument parsing. One `clap` derive tree, matching the source codebase's
//! `#[derive(Parser)]` / `#[command(...)]` style.

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "valet", author, version, about = "Package-oriented build orchestrator for C/C++")]
pub struct Cli {
    /// Increase log verbosity: -v for debug, -vv for trace.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Resolve the package graph and build every non-header-only package.
    Build(BuildArgs),
    /// Build, then run a named executable target.
    Run(RunArgs),
    /// Build in release mode and copy the resulting binary to the install path.
    Install(InstallArgs),
}

#[derive(clap::Args, Clone)]
pub struct BuildArgs {
    /// Source folder containing the root valet.toml.
    #[arg(short, long, default_value = "./")]
    pub source: PathBuf,

    /// Build with optimizations instead of debug info.
    #[arg(long)]
    pub release: bool,

    /// Remove the build folder before building.
    #[arg(long)]
    pub clean: bool,

    /// Write compile_commands.json next to the project root.
    #[arg(long)]
    pub export_compile_commands: bool,

    /// Worker count override; defaults to VALET_JOBS, then the platform recommendation.
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Print a compile/link time report after a successful build.
    #[arg(long)]
    pub stats: bool,

    /// Resolve and plan the build but do not execute any commands.
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(clap::Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub build: BuildArgs,

    /// Name of the executable target to run.
    #[arg(short, long)]
    pub target: Option<String>,

    /// Arguments forwarded to the executable, after `--`.
    #[arg(trailing_var_arg = true)]
    pub args: Vec<String>,
}

#[derive(clap::Args)]
pub struct InstallArgs {
    /// Source folder containing the root valet.toml.
    #[arg(short, long, default_value = "./")]
    pub source: PathBuf,
}
