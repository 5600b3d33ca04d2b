//! Plan construction and optimization: turns a resolved package graph into
//! compile/link commands, then prunes the ones that are already up to date.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, trace};
use valet_common::errors::{CodedError, ErrorCode};
use valet_common::graph::{Graph, GraphNode};

use crate::command::{CompileCommand, CompileOptions, LinkCommand};
use crate::depfile::{self, DepEntry, DepEntryKind};
use crate::package::Package;
use crate::source::collect_source_files;

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("{package_id}: expected a source folder at {folder}")]
    MissingSourceFolder { package_id: String, folder: PathBuf },

    #[error("{package_id}: could not enumerate sources in {folder}: {source}")]
    SourceEnumeration {
        package_id: String,
        folder: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CodedError for PlanError {
    fn code(&self) -> ErrorCode {
        match self {
            Self::MissingSourceFolder { .. } => ErrorCode::BuildMissingSourceFolder,
            Self::SourceEnumeration { .. } => ErrorCode::InternalIoRace,
        }
    }
}

/// `<project>/build/<release|debug>`.
pub fn build_folder(project_folder: &Path, release: bool) -> PathBuf {
    project_folder.join("build").join(if release { "release" } else { "debug" })
}

#[derive(Debug, Clone, Default)]
pub struct Plan {
    pub compile_commands: Vec<CompileCommand>,
    pub link_commands: Vec<LinkCommand>,
    pub executable_targets: HashMap<String, Package>,
}

impl Plan {
    /// Build the full (unoptimized) plan: every non-`HeaderOnly` package in
    /// `package_graph`, in leaves-first order, contributes one
    /// `CompileCommand` per source file and exactly one `LinkCommand`.
    pub fn build(
        package_graph: &Graph<Package>,
        options: CompileOptions,
        build_root: &Path,
    ) -> Result<Self, PlanError> {
        let mut plan = Plan::default();
        let sorted = package_graph
            .sorted()
            .expect("caller resolved the graph via resolve_package_graph, which already rejects cycles");

        for package in sorted {
            if package.package_type.is_header_only() {
                continue;
            }

            let src_dir = package.source_dir();
            if !src_dir.is_dir() {
                return Err(PlanError::MissingSourceFolder { package_id: package.id().to_string(), folder: src_dir });
            }
            let sources = collect_source_files(&src_dir).map_err(|source| PlanError::SourceEnumeration {
                package_id: package.id().to_string(),
                folder: src_dir.clone(),
                source,
            })?;
            debug!(package_id = package.id(), source_count = sources.len(), "enumerated sources");

            let dependencies_snapshot: Vec<Package> = package_graph
                .all_deps(&package)
                .iter()
                .filter_map(|id| package_graph.get(id))
                .cloned()
                .collect();

            let package_output_folder = build_root.join(package.id());
            let mut object_files = Vec::with_capacity(sources.len());
            for source_file in sources {
                let cmd = CompileCommand::new(
                    package.clone(),
                    source_file,
                    dependencies_snapshot.clone(),
                    options,
                    &package_output_folder,
                );
                object_files.push(cmd.object_file.clone());
                plan.compile_commands.push(cmd);
            }

            if package.package_type == crate::package::PackageType::Application {
                plan.executable_targets.insert(package.name.clone(), package.clone());
            }

            plan.link_commands.push(LinkCommand::new(package, object_files, dependencies_snapshot, build_root));
        }

        Ok(plan)
    }

    /// Drop compile commands whose object is already up to date, then drop
    /// link commands whose package is unreachable from any surviving
    /// compile (including the package itself).
    pub fn optimize(&mut self, package_graph: &Graph<Package>) -> std::io::Result<()> {
        let mut depgraph: Graph<DepEntry> = Graph::new();
        for cmd in &self.compile_commands {
            depfile::collect_source_deps(&cmd.depfile_path(), &mut depgraph)?;
        }

        self.compile_commands.retain(|cmd| {
            if !cmd.object_file.exists() {
                return true;
            }
            let obj_entry = DepEntry::new(&cmd.object_file.to_string_lossy(), DepEntryKind::ObjectFile);
            let Some(node) = depgraph.get(obj_entry.id()) else {
                trace!(object_file = %cmd.object_file.display(), "no depfile, must compile");
                return true;
            };
            let deps: Vec<PathBuf> = depgraph.immediate_deps(node).iter().map(|d| d.path().to_path_buf()).collect();
            let stale = depfile::has_modified_deps(&cmd.object_file, &deps);
            if !stale {
                trace!(source_file = %cmd.source_file.display(), "up to date, skipping compile");
            }
            stale
        });

        let packages_to_compile: std::collections::HashSet<String> =
            self.compile_commands.iter().map(|c| c.package.id().to_string()).collect();

        let mut must_link: std::collections::HashSet<String> = packages_to_compile.clone();
        for id in &packages_to_compile {
            if let Some(package) = package_graph.get(id) {
                must_link.extend(package_graph.all_dependants(package));
            }
        }

        self.link_commands.retain(|cmd| must_link.contains(cmd.package.id()));
        Ok(())
    }
}
