//! Manifest parsing, package resolution, source enumeration, command
//! synthesis, depfile ingestion, and plan construction/optimization.

pub mod command;
pub mod depfile;
pub mod manifest;
pub mod package;
pub mod plan;
pub mod resolver;
pub mod source;

pub use command::{ClangRenderer, CommandError, CommandRenderer, CompileCommand, CompileOptions, LinkCommand};
pub use manifest::{find_package, parse_package_manifest, ManifestError, MANIFEST_FILE_NAME};
pub use package::{DependencySpec, Package, PackageType};
pub use plan::{build_folder, Plan, PlanError};
pub use resolver::{garage_key, resolve_package_graph, FetchError, GitFetcher, RemoteFetcher, ResolverError};
