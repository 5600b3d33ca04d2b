//! Package graph resolution: walks a manifest tree, fetching git
//! dependencies into a content-addressed cache, and builds a `Graph<Package>`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use sha1::{Digest, Sha1};
use thiserror::Error;
use tracing::{debug, info, trace, warn};
use valet_common::errors::{CodedError, ErrorCode};
use valet_common::graph::{Graph, GraphError};
use valet_common::util::mask_sensitive_argv;

use crate::manifest::{self, ManifestError};
use crate::package::{DependencySpec, Package};

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("git is not available on PATH: {0}")]
    GitUnavailable(std::io::Error),

    #[error("git {stage} failed for {remote_url} (exit {exit_code:?}): {detail}")]
    CommandFailed {
        remote_url: String,
        stage: &'static str,
        exit_code: Option<i32>,
        detail: String,
    },

    #[error("git {stage} for {remote_url} did not finish within {timeout:?}")]
    Timeout {
        remote_url: String,
        stage: &'static str,
        timeout: Duration,
    },
}

impl CodedError for FetchError {
    fn code(&self) -> ErrorCode {
        match self {
            Self::GitUnavailable(_) => ErrorCode::ResolverGitUnavailable,
            Self::CommandFailed { .. } => ErrorCode::ResolverFetchFailed,
            Self::Timeout { .. } => ErrorCode::ResolverFetchFailed,
        }
    }
}

#[derive(Debug, Error)]
pub enum ResolverError {
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("dependency cycle: {from} -> {to}")]
    Cycle { from: String, to: String },

    #[error("{dependant_id} depends on '{dependency}' which could not be resolved: {detail}")]
    UnresolvableDependency {
        dependant_id: String,
        dependency: String,
        detail: String,
    },
}

impl CodedError for ResolverError {
    fn code(&self) -> ErrorCode {
        match self {
            Self::Manifest(e) => e.code(),
            Self::Fetch(e) => e.code(),
            Self::Cycle { .. } => ErrorCode::ResolverCycle,
            Self::UnresolvableDependency { .. } => ErrorCode::ResolverUnresolvedDependency,
        }
    }
}

impl From<GraphError> for ResolverError {
    fn from(err: GraphError) -> Self {
        match err {
            GraphError::Cycle { from, to } => Self::Cycle { from, to },
            GraphError::UnknownNode(id) => Self::UnresolvableDependency {
                dependant_id: id,
                dependency: String::new(),
                detail: "referenced before being added to the graph".to_string(),
            },
        }
    }
}

/// Clones and checks out a git dependency into a cache directory. The
/// default implementation shells out to `git`; tests inject an in-memory
/// fake so resolution can be exercised without a network or a real binary.
pub trait RemoteFetcher {
    fn fetch(&self, remote_url: &str, revision: &str, cache_dir: &Path) -> Result<(), FetchError>;
}

/// Shells out to `git` exactly as the garage cache contract requires:
/// a shallow clone with submodules, then an explicit fetch + checkout of
/// the requested revision. Every stage is bounded by `timeout`.
pub struct GitFetcher {
    pub timeout: Duration,
}

impl GitFetcher {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for GitFetcher {
    fn default() -> Self {
        Self::new(Duration::from_secs(120))
    }
}

impl RemoteFetcher for GitFetcher {
    fn fetch(&self, remote_url: &str, revision: &str, cache_dir: &Path) -> Result<(), FetchError> {
        run_git(
            &[
                "clone",
                "--recurse-submodules",
                "--depth=1",
                "--shallow-submodules",
                remote_url,
                &cache_dir.to_string_lossy(),
            ],
            None,
            remote_url,
            "clone",
            self.timeout,
        )?;
        run_git(&["fetch"], Some(cache_dir), remote_url, "fetch", self.timeout)?;
        run_git(&["checkout", revision], Some(cache_dir), remote_url, "checkout", self.timeout)?;
        Ok(())
    }
}

/// Poll interval for [`wait_with_timeout`]'s `try_wait` loop: fine enough
/// that a fast invocation doesn't feel sluggish, coarse enough not to
/// busy-loop.
const GIT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// `true` if the wait gave up because `timeout` elapsed, `false` if the
/// child exited (successfully or not) within it.
enum Waited {
    Exited(std::process::ExitStatus),
    TimedOut,
}

/// Poll `child` until it exits or `timeout` elapses, killing it on timeout.
/// Split out from [`run_git`] so the timeout behavior is testable against a
/// plain `sleep` child instead of a real `git` invocation.
fn wait_with_timeout(child: &mut std::process::Child, timeout: Duration) -> std::io::Result<Waited> {
    let started = Instant::now();
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Waited::Exited(status));
        }
        if started.elapsed() >= timeout {
            child.kill()?;
            child.wait()?;
            return Ok(Waited::TimedOut);
        }
        std::thread::sleep(GIT_POLL_INTERVAL);
    }
}

fn run_git(
    args: &[&str],
    cwd: Option<&Path>,
    remote_url: &str,
    stage: &'static str,
    timeout: Duration,
) -> Result<(), FetchError> {
    let mut command = Command::new("git");
    command.args(args).stdout(Stdio::null()).stderr(Stdio::piped());
    if let Some(dir) = cwd {
        command.current_dir(dir);
    }
    let argv: Vec<String> = std::iter::once("git".to_string())
        .chain(args.iter().map(|a| a.to_string()))
        .collect();
    debug!(command = ?mask_sensitive_argv(&argv), timeout = ?timeout, "running git");

    let mut child = command.spawn().map_err(FetchError::GitUnavailable)?;
    let status = match wait_with_timeout(&mut child, timeout).map_err(FetchError::GitUnavailable)? {
        Waited::Exited(status) => status,
        Waited::TimedOut => {
            return Err(FetchError::Timeout { remote_url: remote_url.to_string(), stage, timeout });
        }
    };

    if !status.success() {
        let mut stderr = String::new();
        if let Some(mut pipe) = child.stderr.take() {
            use std::io::Read;
            let _ = pipe.read_to_string(&mut stderr);
        }
        return Err(FetchError::CommandFailed {
            remote_url: remote_url.to_string(),
            stage,
            exit_code: status.code(),
            detail: stderr.trim().to_string(),
        });
    }
    Ok(())
}

/// `sha1_hex(remote_url + "\n" + revision)`, the garage cache key.
pub fn garage_key(remote_url: &str, revision: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(remote_url.as_bytes());
    hasher.update(b"\n");
    hasher.update(revision.as_bytes());
    hex::encode(hasher.finalize())
}

/// Resolve `spec` (declared by a package rooted at `dependant_folder`) to a
/// local folder, fetching a git dependency into the garage cache if needed.
fn resolve_dependency_folder(
    dependant_folder: &Path,
    spec: &DependencySpec,
    garage_root: &Path,
    fetcher: &dyn RemoteFetcher,
) -> Result<PathBuf, ResolverError> {
    match spec {
        DependencySpec::Local { path } => {
            let candidate = dependant_folder.join(path);
            candidate.canonicalize().map_err(|e| ResolverError::UnresolvableDependency {
                dependant_id: dependant_folder.display().to_string(),
                dependency: path.clone(),
                detail: e.to_string(),
            })
        }
        DependencySpec::Git { remote_url, revision } => {
            let key = garage_key(remote_url, revision);
            let cache_dir = garage_root.join(&key);
            if cache_dir.exists() {
                trace!(%remote_url, %revision, cache_dir = %cache_dir.display(), "garage hit, skipping fetch");
            } else {
                info!(%remote_url, %revision, cache_dir = %cache_dir.display(), "fetching git dependency");
                fetcher.fetch(remote_url, revision, &cache_dir)?;
            }
            cache_dir.canonicalize().map_err(|e| ResolverError::UnresolvableDependency {
                dependant_id: dependant_folder.display().to_string(),
                dependency: remote_url.clone(),
                detail: e.to_string(),
            })
        }
    }
}

/// Walk the manifest tree rooted at `project_folder`, producing the package
/// graph. `garage_root` is typically `<home>/.valet/garage`.
pub fn resolve_package_graph(
    project_folder: &Path,
    garage_root: &Path,
    fetcher: &dyn RemoteFetcher,
) -> Result<Graph<Package>, ResolverError> {
    let root = manifest::parse_package_manifest(&project_folder.join(manifest::MANIFEST_FILE_NAME))?;

    let mut graph = Graph::new();
    graph.add(root.clone());

    let mut work: Vec<(Package, DependencySpec)> =
        root.dependencies.iter().cloned().map(|spec| (root.clone(), spec)).collect();
    let mut resolved: HashMap<PathBuf, Package> = HashMap::new();
    resolved.insert(root.folder.clone(), root.clone());

    while let Some((dependant, spec)) = work.pop() {
        let folder = resolve_dependency_folder(&dependant.folder, &spec, garage_root, fetcher)?;

        let resolved_pkg = if let Some(existing) = resolved.get(&folder) {
            existing.clone()
        } else {
            let pkg = manifest::find_package(&folder)?.ok_or_else(|| ResolverError::UnresolvableDependency {
                dependant_id: dependant.id().to_string(),
                dependency: folder.display().to_string(),
                detail: format!("no {} in {}", manifest::MANIFEST_FILE_NAME, folder.display()),
            })?;
            resolved.insert(folder.clone(), pkg.clone());
            // Only a newly-parsed package's own dependencies still need
            // visiting; an already-resolved package was enqueued once when
            // it was first discovered. Re-enqueuing it here would re-walk a
            // cycle forever instead of letting `graph.sorted()` reject it.
            for dep_spec in &pkg.dependencies {
                work.push((pkg.clone(), dep_spec.clone()));
            }
            pkg
        };

        graph.add(resolved_pkg.clone());
        graph.depend(&dependant, &resolved_pkg)?;
    }

    if let Err(e) = graph.sorted() {
        warn!(error = %e, "package graph failed topological sort");
        return Err(e.into());
    }

    Ok(graph)
}
