//! Drives a `Plan`'s compile commands through the worker pool, then its
//! link commands serially in topological order, collecting statistics.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{error, info, info_span};
use valet_common::errors::{CodedError, ErrorCode};
use valet_core::{ClangRenderer, CommandError, CommandRenderer, Plan};

use crate::pool::WorkerPool;

/// Runs a rendered argv as a child process. The default implementation
/// shells out via `std::process::Command`; tests inject a fake so no real
/// compiler needs to be on the `PATH`.
pub trait CommandRunner: Send + Sync {
    fn run(&self, argv: &[String]) -> bool;
}

pub struct SystemCommandRunner;

impl CommandRunner for SystemCommandRunner {
    fn run(&self, argv: &[String]) -> bool {
        let Some((program, args)) = argv.split_first() else {
            return true;
        };
        match std::process::Command::new(program).args(args).status() {
            Ok(status) => status.success(),
            Err(err) => {
                error!(program, error = %err, "failed to spawn command");
                false
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error(transparent)]
    Command(#[from] CommandError),
}

impl CodedError for ExecutionError {
    fn code(&self) -> ErrorCode {
        ErrorCode::ExecutionCommandFailed
    }
}

#[derive(Debug, Default, Clone)]
pub struct BuildStats {
    pub compilation_times: Vec<(PathBuf, Duration)>,
    pub link_times: Vec<(PathBuf, Duration)>,
    pub compilation_time_s: f64,
    pub link_time_s: f64,
    pub total_time_s: f64,
}

impl BuildStats {
    fn table(title_left: &str, title_right: &str, rows: &[(PathBuf, Duration)]) -> String {
        let mut formatted: Vec<(String, f64)> = rows
            .iter()
            .map(|(path, d)| {
                let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
                (name, d.as_secs_f64())
            })
            .collect();
        formatted.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        let mut out = String::new();
        out.push_str(&format!("{title_left:<40}{title_right:>30}\n"));
        out.push_str(&"-".repeat(70));
        out.push('\n');
        for (name, secs) in formatted {
            out.push_str(&format!("{name:<40}{secs:>30.2}\n"));
        }
        out
    }

    pub fn to_report_string(&self) -> String {
        let mut out = String::new();
        out.push('\n');
        out.push_str(&Self::table("Source File", "Compilation Time (s)", &self.compilation_times));
        out.push('\n');
        out.push_str(&Self::table("Binary", "Link Time (s)", &self.link_times));
        let total = Duration::from_secs_f64(self.total_time_s.max(0.0));
        out.push_str(&format!(
            "\nTotal time: {} ({:.2} s)\nCompilation time: {:.2} s\nLink time: {:.2} s\n",
            humantime::format_duration(total),
            self.total_time_s,
            self.compilation_time_s,
            self.link_time_s
        ));
        out
    }
}

pub struct ExecutionResult {
    pub success: bool,
    pub stats: Option<BuildStats>,
}

/// Executes every compile command on `pool`, waits for quiescence, then
/// runs every link command serially in the plan's stored (topological)
/// order. Failures never short-circuit: all queued compiles still run so
/// the operator sees every error in one pass.
pub fn execute(
    plan: &Plan,
    renderer: &ClangRenderer,
    runner: Arc<dyn CommandRunner>,
    pool: &WorkerPool,
    collect_stats: bool,
) -> Result<ExecutionResult, ExecutionError> {
    let overall_start = Instant::now();
    let success = Arc::new(AtomicBool::new(true));
    let stats = Arc::new(Mutex::new(BuildStats::default()));

    for (index, cmd) in plan.compile_commands.iter().enumerate() {
        let argv = renderer.render_compile(cmd);
        let object_file = cmd.object_file.clone();
        let source_file = cmd.source_file.clone();
        let package_id = cmd.package.id().to_string();
        let runner = Arc::clone(&runner);
        let success = Arc::clone(&success);
        let stats = Arc::clone(&stats);
        let total = plan.compile_commands.len();

        pool.enqueue(move || {
            if let Some(parent) = object_file.parent() {
                if let Err(err) = std::fs::create_dir_all(parent) {
                    error!(%package_id, error = %err, "failed to create object output directory");
                }
            }
            let span = info_span!("compile", package_id = %package_id, source_file = %source_file.display());
            let _enter = span.enter();
            info!(index = index + 1, total, "compiling");
            let started = Instant::now();
            let ok = runner.run(&argv);
            let elapsed = started.elapsed();
            if ok && collect_stats {
                let mut stats = stats.lock().unwrap();
                stats.compilation_time_s += elapsed.as_secs_f64();
                stats.compilation_times.push((source_file.clone(), elapsed));
            }
            if !ok {
                error!(%package_id, source_file = %source_file.display(), "compile failed");
            }
            let current = success.load(Ordering::SeqCst);
            success.store(ok && current, Ordering::SeqCst);
        });
    }

    pool.wait();

    for (index, cmd) in plan.link_commands.iter().enumerate() {
        let argv = renderer.render_link(cmd)?;
        if let Some(parent) = cmd.binary_path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let span = info_span!("link", package_id = %cmd.package.id());
        let _enter = span.enter();
        info!(index = index + 1, total = plan.link_commands.len(), binary = %cmd.binary_path.display(), "linking");
        let started = Instant::now();
        let ok = runner.run(&argv);
        let elapsed = started.elapsed();
        if ok && collect_stats {
            let mut stats = stats.lock().unwrap();
            stats.link_time_s += elapsed.as_secs_f64();
            stats.link_times.push((cmd.binary_path.clone(), elapsed));
        }
        if !ok {
            error!(package_id = cmd.package.id(), "link failed");
        }
        let current = success.load(Ordering::SeqCst);
        success.store(ok && current, Ordering::SeqCst);
    }

    let final_success = success.load(Ordering::SeqCst);
    let final_stats = if collect_stats {
        let mut stats = Arc::try_unwrap(stats).map(|m| m.into_inner().unwrap()).unwrap_or_default();
        stats.total_time_s = overall_start.elapsed().as_secs_f64();
        Some(stats)
    } else {
        None
    };

    Ok(ExecutionResult { success: final_success, stats: final_stats })
}

/// Convenience used by the CLI to resolve the platform's default renderer.
pub fn default_renderer() -> ClangRenderer {
    ClangRenderer::new(valet_common::Platform::current())
}
