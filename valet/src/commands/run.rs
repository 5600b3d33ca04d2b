use anyhow::{bail, Context};
use tracing::info;

use crate::cli::RunArgs;
use crate::commands::build::run_build;

pub fn execute_cli(args: &RunArgs) -> anyhow::Result<()> {
    let outcome = run_build(&args.build)?;
    if !outcome.success {
        bail!("build failed, not running");
    }

    let target = match &args.target {
        Some(name) => outcome
            .plan
            .executable_targets
            .get(name)
            .cloned()
            .with_context(|| format!("no such executable target: {name}"))?,
        None => {
            let mut targets = outcome.plan.executable_targets.values();
            let only = targets.next().with_context(|| "no executable target in this package graph")?;
            if targets.next().is_some() {
                bail!("multiple executable targets found; pass --target to pick one");
            }
            only.clone()
        }
    };

    let binary_path = outcome.build_root.join(target.id()).join(&target.name);
    info!(binary = %binary_path.display(), "running target");
    let status = std::process::Command::new(&binary_path).args(&args.args).status().with_context(|| {
        format!("failed to execute {}", binary_path.display())
    })?;

    if !status.success() {
        bail!("target exited with {status}");
    }
    Ok(())
}
