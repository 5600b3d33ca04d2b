//! `valet install`: a release build followed by a copy of the resulting
//! binary to the platform's default install path.

use std::path::PathBuf;

use anyhow::{bail, Context};
use tracing::info;
use valet_common::Platform;

use crate::cli::{BuildArgs, InstallArgs};
use crate::commands::build::run_build;

pub fn default_install_path(platform: &Platform) -> Option<PathBuf> {
    platform.home_dir().map(|home| home.join(".valet").join("bin"))
}

pub fn execute_cli(args: &InstallArgs) -> anyhow::Result<()> {
    let build_args = BuildArgs {
        source: args.source.clone(),
        release: true,
        clean: true,
        export_compile_commands: false,
        jobs: None,
        stats: false,
        dry_run: false,
    };

    let outcome = run_build(&build_args)?;
    if !outcome.success {
        bail!("build failed, not installing");
    }

    let application = outcome
        .plan
        .executable_targets
        .values()
        .next()
        .context("no executable target to install; package must be of type \"bin\"")?;

    let platform = Platform::current();
    let install_path = default_install_path(&platform).context("could not determine install path; no home directory for this user")?;
    std::fs::create_dir_all(&install_path)?;

    let source_binary = outcome.build_root.join(application.id()).join(&application.name);
    let dest = install_path.join(&application.name);
    info!(from = %source_binary.display(), to = %dest.display(), "installing");
    std::fs::copy(&source_binary, &dest).with_context(|| {
        format!("failed to copy {} to {}", source_binary.display(), dest.display())
    })?;

    Ok(())
}
