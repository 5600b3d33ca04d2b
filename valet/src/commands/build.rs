use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use tracing::{info, warn};
use valet_common::config::EnvConfig;
use valet_common::graph::Graph;
use valet_common::Platform;
use valet_core::{build_folder, resolve_package_graph, ClangRenderer, CompileOptions, GitFetcher, Package, Plan};
use valet_exec::{execute, BuildStats, CommandRunner, SystemCommandRunner, WorkerPool};

use crate::cli::BuildArgs;
use crate::compiledb;

/// Shared by `build`, `run`, and `install`: resolve, plan, optionally
/// optimize and execute. Returns the plan plus the build folder so callers
/// can locate a target's binary.
pub struct BuildOutcome {
    pub plan: Plan,
    pub build_root: PathBuf,
    pub graph: Graph<Package>,
    pub success: bool,
    pub stats: Option<BuildStats>,
}

pub fn run_build(args: &BuildArgs) -> anyhow::Result<BuildOutcome> {
    let project_folder = args
        .source
        .canonicalize()
        .with_context(|| format!("no such source folder: {}", args.source.display()))?;

    let platform = Platform::current();
    let env = EnvConfig::from_env().context("invalid environment configuration")?;
    let build_root = build_folder(&project_folder, args.release);

    if args.clean {
        info!(build_root = %build_root.display(), "cleaning build folder");
        if build_root.exists() {
            std::fs::remove_dir_all(&build_root)?;
        }
    }

    let home = env.valet_home(&platform).context("could not determine VALET_HOME; no home directory for this user")?;
    let garage_root = home.join("garage");
    let fetcher = GitFetcher::new(std::time::Duration::from_secs(env.git_timeout_secs));

    let graph = resolve_package_graph(&project_folder, &garage_root, &fetcher)?;
    if graph.is_empty() {
        bail!("no package found under {}", project_folder.display());
    }

    let mut plan = Plan::build(&graph, CompileOptions { release: args.release }, &build_root)?;
    info!(
        compile_commands = plan.compile_commands.len(),
        link_commands = plan.link_commands.len(),
        "build plan constructed"
    );

    let renderer = ClangRenderer::new(platform);

    if args.export_compile_commands {
        compiledb::export(&plan, &renderer, &project_folder)?;
    }

    if args.dry_run {
        return Ok(BuildOutcome { plan, build_root, graph, success: true, stats: None });
    }

    plan.optimize(&graph)?;
    if plan.compile_commands.is_empty() && plan.link_commands.is_empty() {
        info!("nothing to do, build is up to date");
        return Ok(BuildOutcome { plan, build_root, graph, success: true, stats: None });
    }

    let jobs = env.effective_jobs(args.jobs, &platform);
    let pool = WorkerPool::new(jobs);
    let runner: Arc<dyn CommandRunner> = Arc::new(SystemCommandRunner);
    let result = execute(&plan, &renderer, runner, &pool, args.stats)?;

    if !result.success {
        warn!("build failed");
    }

    Ok(BuildOutcome { plan, build_root, graph, success: result.success, stats: result.stats })
}

pub fn execute_cli(args: &BuildArgs) -> anyhow::Result<()> {
    let outcome = run_build(args)?;

    if let Some(stats) = &outcome.stats {
        println!("{}", stats.to_report_string());
    }

    if !outcome.success {
        bail!("build failed");
    }
    info!("build success");
    Ok(())
}
