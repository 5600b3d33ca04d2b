//! The resolved package value and its dependency descriptor.

use std::path::{Path, PathBuf};

use valet_common::{GraphNode, Platform};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageType {
    Application,
    StaticLibrary,
    SharedLibrary,
    HeaderOnly,
}

impl PackageType {
    /// Parse the `type` key of `[package]`. Unknown tokens are rejected by
    /// the manifest layer, not here.
    pub fn from_manifest_token(token: &str) -> Option<Self> {
        match token {
            "bin" => Some(Self::Application),
            "lib" => Some(Self::StaticLibrary),
            "dylib" => Some(Self::SharedLibrary),
            "header-only" => Some(Self::HeaderOnly),
            _ => None,
        }
    }

    pub fn is_header_only(&self) -> bool {
        matches!(self, Self::HeaderOnly)
    }
}

/// A dependency as declared in a manifest, before resolution to a folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DependencySpec {
    Local { path: String },
    Git { remote_url: String, revision: String },
}

/// A fully resolved, immutable package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Package {
    pub name: String,
    pub version: String,
    pub language_std: String,
    pub package_type: PackageType,
    pub public_includes: Vec<PathBuf>,
    pub includes: Vec<PathBuf>,
    pub compile_options: Vec<String>,
    pub dependencies: Vec<DependencySpec>,
    pub folder: PathBuf,
    /// `name=version`, computed once at construction since it doubles as
    /// the graph node identity and is read on every compile/link command.
    id: String,
}

impl Package {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: String,
        version: String,
        language_std: String,
        package_type: PackageType,
        public_includes: Vec<PathBuf>,
        includes: Vec<PathBuf>,
        compile_options: Vec<String>,
        dependencies: Vec<DependencySpec>,
        folder: PathBuf,
    ) -> Self {
        let id = format!("{name}={version}");
        Self {
            name,
            version,
            language_std,
            package_type,
            public_includes,
            includes,
            compile_options,
            dependencies,
            folder,
            id,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Path (without extension) to this package's build output, under
    /// `<project>/build/<release|debug>/<id>/<name>`.
    pub fn target_path(&self, build_root: &Path) -> PathBuf {
        build_root.join(&self.id).join(&self.name)
    }

    /// The extension (no leading dot) for this package's link artifact on
    /// `platform`, or `None` for an `Application`'s platform-less binary on
    /// POSIX hosts and for `HeaderOnly` packages which produce nothing.
    pub fn target_ext(&self, platform: &Platform) -> Option<&'static str> {
        match self.package_type {
            PackageType::Application => {
                let ext = platform.executable_ext();
                (!ext.is_empty()).then_some(ext)
            }
            PackageType::StaticLibrary => Some(platform.static_lib_ext()),
            PackageType::SharedLibrary => Some(platform.shared_lib_ext()),
            PackageType::HeaderOnly => None,
        }
    }

    pub fn source_dir(&self) -> PathBuf {
        self.folder.join("src")
    }
}

impl GraphNode for Package {
    fn id(&self) -> &str {
        &self.id
    }
}
