//! Compile/link command records and the renderer that turns them into an
//! argv for a concrete compiler driver.
//!
//! Rendering returns `Vec<String>` (an argv) rather than a shell string —
//! this sidesteps the quoting bugs a `std::system("...")`-style invocation
//! is prone to, at the cost of the caller needing a renderer per target
//! family. One concrete [`ClangRenderer`] covers all three host platforms,
//! branching the way the compiler invocation itself would.

use std::path::{Path, PathBuf};

use thiserror::Error;
use valet_common::errors::{CodedError, ErrorCode};
use valet_common::Platform;

use crate::package::{Package, PackageType};

#[derive(Debug, Clone, Copy, Default)]
pub struct CompileOptions {
    pub release: bool,
}

#[derive(Debug, Clone)]
pub struct CompileCommand {
    pub package: Package,
    pub source_file: PathBuf,
    pub object_file: PathBuf,
    /// Transitive dependencies at plan-construction time, snapshotted so a
    /// command stays immutable even if the graph changes later.
    pub dependencies_snapshot: Vec<Package>,
    pub options: CompileOptions,
}

impl CompileCommand {
    pub fn new(
        package: Package,
        source_file: PathBuf,
        dependencies_snapshot: Vec<Package>,
        options: CompileOptions,
        output_folder: &Path,
    ) -> Self {
        let file_name = source_file.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        let object_file = output_folder.join(format!("{file_name}.o"));
        Self {
            package,
            source_file,
            object_file,
            dependencies_snapshot,
            options,
        }
    }

    /// Depfile path the compiler is expected to emit alongside the object
    /// file, sharing its stem.
    pub fn depfile_path(&self) -> PathBuf {
        self.object_file.with_extension("d")
    }
}

#[derive(Debug, Clone)]
pub struct LinkCommand {
    pub package: Package,
    pub object_files: Vec<PathBuf>,
    pub dependencies_snapshot: Vec<Package>,
    pub binary_path: PathBuf,
}

impl LinkCommand {
    pub fn new(
        package: Package,
        object_files: Vec<PathBuf>,
        dependencies_snapshot: Vec<Package>,
        output_folder: &Path,
    ) -> Self {
        let binary_path = output_folder.join(package.id()).join(&package.name);
        Self {
            package,
            object_files,
            dependencies_snapshot,
            binary_path,
        }
    }
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("cannot link {package_id} against shared library dependency {dependency_id}; shared-library dependencies are not supported")]
    UnsupportedLinkage { package_id: String, dependency_id: String },
}

impl CodedError for CommandError {
    fn code(&self) -> ErrorCode {
        ErrorCode::BuildUnsupportedLinkage
    }
}

/// Renders command records to an argv for a concrete compiler driver.
pub trait CommandRenderer {
    fn render_compile(&self, cmd: &CompileCommand) -> Vec<String>;
    fn render_link(&self, cmd: &LinkCommand) -> Result<Vec<String>, CommandError>;
}

/// The only renderer this workspace ships: a clang-compatible driver,
/// branching on host platform for export macros, debug-info format, and
/// shared-library linker flags the way the source codebase's single
/// `CompileCommand::string`/`LinkCommand::string` functions do with
/// preprocessor branches.
pub struct ClangRenderer {
    pub platform: Platform,
}

impl ClangRenderer {
    pub fn new(platform: Platform) -> Self {
        Self { platform }
    }

    fn static_archive_path(&self, package: &Package, output_folder: &Path) -> PathBuf {
        let ext = self.platform.static_lib_ext();
        output_folder.join(package.id()).join(format!("{}.{ext}", package.name))
    }
}

impl CommandRenderer for ClangRenderer {
    fn render_compile(&self, cmd: &CompileCommand) -> Vec<String> {
        let mut argv = vec![
            "clang++".to_string(),
            "-Wall".to_string(),
            "-MD".to_string(),
            "-c".to_string(),
            cmd.source_file.to_string_lossy().into_owned(),
            format!("-std={}", cmd.package.language_std),
            "-o".to_string(),
            cmd.object_file.to_string_lossy().into_owned(),
        ];

        if cmd.package.package_type == PackageType::SharedLibrary && matches!(self.platform, Platform::Windows) {
            let upper = cmd.package.name.to_uppercase();
            argv.push(format!("-D{upper}_SHARED"));
            argv.push(format!("-D{upper}_EXPORTS"));
        }

        if cmd.options.release {
            argv.push("-O3".to_string());
        } else {
            argv.push("-g".to_string());
            argv.push("-O0".to_string());
            if matches!(self.platform, Platform::Windows) {
                argv.push("-gcodeview".to_string());
            }
        }

        argv.extend(cmd.package.compile_options.iter().cloned());

        for include in &cmd.package.includes {
            argv.push(format!("-I{}", include.display()));
        }

        for dep in &cmd.dependencies_snapshot {
            for public_include in &dep.public_includes {
                argv.push(format!("-I{}", public_include.display()));
            }
        }

        argv
    }

    fn render_link(&self, cmd: &LinkCommand) -> Result<Vec<String>, CommandError> {
        for dep in &cmd.dependencies_snapshot {
            if dep.package_type == PackageType::SharedLibrary {
                return Err(CommandError::UnsupportedLinkage {
                    package_id: cmd.package.id().to_string(),
                    dependency_id: dep.id().to_string(),
                });
            }
        }

        let output_folder = cmd
            .binary_path
            .parent()
            .and_then(Path::parent)
            .map(Path::to_path_buf)
            .unwrap_or_default();

        match cmd.package.package_type {
            PackageType::Application | PackageType::SharedLibrary => {
                let mut argv = vec!["clang++".to_string()];
                if cmd.package.package_type == PackageType::SharedLibrary {
                    argv.push("-shared".to_string());
                }
                argv.extend(cmd.object_files.iter().map(|o| o.to_string_lossy().into_owned()));
                for dep in &cmd.dependencies_snapshot {
                    if dep.package_type.is_header_only() {
                        continue;
                    }
                    argv.push(self.static_archive_path(dep, &output_folder).to_string_lossy().into_owned());
                }
                let is_shared = cmd.package.package_type == PackageType::SharedLibrary;
                let ext = if is_shared { self.platform.shared_lib_ext() } else { self.platform.executable_ext() };
                let target = if ext.is_empty() { cmd.binary_path.clone() } else { cmd.binary_path.with_extension(ext) };
                argv.push("-o".to_string());
                argv.push(target.to_string_lossy().into_owned());
                if is_shared {
                    match self.platform {
                        Platform::Linux => {
                            let soname = cmd.binary_path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
                            argv.push(format!("-Wl,-soname,{soname}"));
                        }
                        Platform::MacOs => argv.push("-Wl,-undefined,dynamic_lookup".to_string()),
                        Platform::Windows => {}
                    }
                }
                Ok(argv)
            }
            PackageType::StaticLibrary => {
                let output_path = self.static_archive_path(&cmd.package, &output_folder);
                let mut argv = self.platform.static_archiver_invocation(&output_path.to_string_lossy());
                argv.extend(cmd.object_files.iter().map(|o| o.to_string_lossy().into_owned()));
                Ok(argv)
            }
            PackageType::HeaderOnly => Ok(Vec::new()),
        }
    }
}
