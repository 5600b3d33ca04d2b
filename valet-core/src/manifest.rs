//! `valet.toml` parsing.
//!
//! Fields are pulled one at a time out of a [`toml::Value`] rather than
//! deserialized into a whole-file `serde` struct, so a bad value can be
//! reported with the specific key and path that caused it.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use valet_common::errors::{CodedError, ErrorCode};
use valet_common::util::canonicalize_relative;

use crate::package::{DependencySpec, Package, PackageType};

pub const MANIFEST_FILE_NAME: &str = "valet.toml";

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("{path}: could not read manifest: {source}")]
    Read { path: PathBuf, #[source] source: std::io::Error },

    #[error("{path}: invalid TOML: {source}")]
    Parse { path: PathBuf, #[source] source: toml::de::Error },

    #[error("{path}: [package].{field} is required")]
    MissingField { path: PathBuf, field: &'static str },

    #[error("{path}: [package].type '{value}' is not one of bin, lib, dylib, header-only")]
    InvalidType { path: PathBuf, value: String },

    #[error("{path}: {kind} directory '{value}' does not exist")]
    MissingIncludeDir { path: PathBuf, kind: &'static str, value: String },

    #[error("{path}: dependency '{name}' uses the reserved bare-string form; use {{ path = \"...\" }} or {{ git = \"...\", rev = \"...\" }}")]
    BareStringDependency { path: PathBuf, name: String },

    #[error("{path}: dependency '{name}' is a table but has neither 'path' nor 'git'")]
    MalformedDependency { path: PathBuf, name: String },

    #[error("{path}: git dependency '{name}' is missing a revision (rev or tag)")]
    MissingRevision { path: PathBuf, name: String },
}

impl CodedError for ManifestError {
    fn code(&self) -> ErrorCode {
        match self {
            Self::Read { .. } => ErrorCode::ManifestNotFound,
            Self::Parse { .. } => ErrorCode::ManifestParseError,
            Self::InvalidType { .. } => ErrorCode::ManifestInvalidType,
            Self::MissingIncludeDir { .. } => ErrorCode::ManifestMissingIncludeDir,
            Self::BareStringDependency { .. }
            | Self::MalformedDependency { .. }
            | Self::MissingRevision { .. } => ErrorCode::ManifestUnsupportedDependencyForm,
            Self::MissingField { .. } => ErrorCode::ManifestParseError,
        }
    }
}

/// Locate `valet.toml` directly inside `folder` and parse it, or `None` if
/// no manifest is present.
pub fn find_package(folder: &Path) -> Result<Option<Package>, ManifestError> {
    let manifest_path = folder.join(MANIFEST_FILE_NAME);
    if !manifest_path.is_file() {
        return Ok(None);
    }
    parse_package_manifest(&manifest_path).map(Some)
}

pub fn parse_package_manifest(manifest_path: &Path) -> Result<Package, ManifestError> {
    let folder = manifest_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    let raw = fs::read_to_string(manifest_path).map_err(|source| ManifestError::Read {
        path: manifest_path.to_path_buf(),
        source,
    })?;
    let doc: toml::Value = raw.parse().map_err(|source| ManifestError::Parse {
        path: manifest_path.to_path_buf(),
        source,
    })?;

    let package_tbl = doc.get("package").and_then(toml::Value::as_table);

    let required_str = |field: &'static str| -> Result<String, ManifestError> {
        package_tbl
            .and_then(|t| t.get(field))
            .and_then(toml::Value::as_str)
            .map(str::to_string)
            .ok_or(ManifestError::MissingField { path: manifest_path.to_path_buf(), field })
    };

    let name = required_str("name")?;
    let version = required_str("version")?;
    let language_std = package_tbl
        .and_then(|t| t.get("std"))
        .and_then(toml::Value::as_str)
        .unwrap_or_default()
        .to_string();

    let type_token = package_tbl
        .and_then(|t| t.get("type"))
        .and_then(toml::Value::as_str)
        .unwrap_or_default();
    let package_type = PackageType::from_manifest_token(type_token).ok_or_else(|| ManifestError::InvalidType {
        path: manifest_path.to_path_buf(),
        value: type_token.to_string(),
    })?;

    let includes = resolve_path_list(package_tbl, "includes", &folder, manifest_path, "includes")?;
    let public_includes =
        resolve_path_list(package_tbl, "public_includes", &folder, manifest_path, "public_includes")?;

    let compile_options = package_tbl
        .and_then(|t| t.get("compile_options"))
        .and_then(toml::Value::as_array)
        .map(|arr| arr.iter().filter_map(toml::Value::as_str).map(str::to_string).collect())
        .unwrap_or_default();

    let dependencies = parse_dependencies(&doc, manifest_path)?;

    Ok(Package::new(
        name,
        version,
        language_std,
        package_type,
        public_includes,
        includes,
        compile_options,
        dependencies,
        folder,
    ))
}

fn resolve_path_list(
    package_tbl: Option<&toml::map::Map<String, toml::Value>>,
    key: &str,
    folder: &Path,
    manifest_path: &Path,
    kind: &'static str,
) -> Result<Vec<PathBuf>, ManifestError> {
    let Some(arr) = package_tbl.and_then(|t| t.get(key)).and_then(toml::Value::as_array) else {
        return Ok(Vec::new());
    };
    let mut out = Vec::with_capacity(arr.len());
    for entry in arr {
        let Some(raw) = entry.as_str() else { continue };
        let canonical = canonicalize_relative(folder, raw).map_err(|_| ManifestError::MissingIncludeDir {
            path: manifest_path.to_path_buf(),
            kind,
            value: raw.to_string(),
        })?;
        out.push(canonical);
    }
    Ok(out)
}

fn parse_dependencies(doc: &toml::Value, manifest_path: &Path) -> Result<Vec<DependencySpec>, ManifestError> {
    let Some(deps_tbl) = doc.get("dependencies").and_then(toml::Value::as_table) else {
        return Ok(Vec::new());
    };
    let mut out = Vec::with_capacity(deps_tbl.len());
    for (name, value) in deps_tbl {
        match value {
            toml::Value::String(_) => {
                return Err(ManifestError::BareStringDependency {
                    path: manifest_path.to_path_buf(),
                    name: name.clone(),
                })
            }
            toml::Value::Table(tbl) => {
                if let Some(path) = tbl.get("path").and_then(toml::Value::as_str) {
                    out.push(DependencySpec::Local { path: path.to_string() });
                    continue;
                }
                if let Some(git) = tbl.get("git").and_then(toml::Value::as_str) {
                    let revision = tbl
                        .get("rev")
                        .or_else(|| tbl.get("tag"))
                        .and_then(toml::Value::as_str)
                        .ok_or_else(|| ManifestError::MissingRevision {
                            path: manifest_path.to_path_buf(),
                            name: name.clone(),
                        })?;
                    out.push(DependencySpec::Git {
                        remote_url: git.to_string(),
                        revision: revision.to_string(),
                    });
                    continue;
                }
                return Err(ManifestError::MalformedDependency {
                    path: manifest_path.to_path_buf(),
                    name: name.clone(),
                });
            }
            _ => {
                return Err(ManifestError::MalformedDependency {
                    path: manifest_path.to_path_buf(),
                    name: name.clone(),
                })
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn write_manifest(dir: &Path, contents: &str) -> PathBuf {
        let path = dir.join(MANIFEST_FILE_NAME);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn parses_minimal_bin_package() {
        let dir = tempdir().unwrap();
        write_manifest(
            dir.path(),
            r#"
            [package]
            name = "hello"
            version = "0.1"
            std = "c++20"
            type = "bin"
            "#,
        );
        let pkg = find_package(dir.path()).unwrap().unwrap();
        assert_eq!(pkg.id(), "hello=0.1");
        assert_eq!(pkg.package_type, PackageType::Application);
        assert!(pkg.dependencies.is_empty());
    }

    #[test]
    fn resolves_and_canonicalizes_includes() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("include")).unwrap();
        write_manifest(
            dir.path(),
            r#"
            [package]
            name = "core"
            version = "0.1"
            type = "lib"
            public_includes = ["include"]
            "#,
        );
        let pkg = find_package(dir.path()).unwrap().unwrap();
        assert_eq!(pkg.public_includes.len(), 1);
        assert!(pkg.public_includes[0].ends_with("include"));
    }

    #[test]
    fn missing_include_dir_is_an_error() {
        let dir = tempdir().unwrap();
        write_manifest(
            dir.path(),
            r#"
            [package]
            name = "core"
            version = "0.1"
            type = "lib"
            includes = ["nope"]
            "#,
        );
        let err = find_package(dir.path()).unwrap_err();
        assert!(matches!(err, ManifestError::MissingIncludeDir { .. }));
    }

    #[test]
    fn parses_local_and_git_dependencies() {
        let dir = tempdir().unwrap();
        write_manifest(
            dir.path(),
            r#"
            [package]
            name = "app"
            version = "0.1"
            type = "bin"

            [dependencies]
            core = { path = "../core" }
            extlib = { git = "https://example/repo", rev = "abc123" }
            "#,
        );
        let pkg = find_package(dir.path()).unwrap().unwrap();
        assert_eq!(pkg.dependencies.len(), 2);
        assert!(pkg
            .dependencies
            .contains(&DependencySpec::Local { path: "../core".to_string() }));
        assert!(pkg.dependencies.contains(&DependencySpec::Git {
            remote_url: "https://example/repo".to_string(),
            revision: "abc123".to_string(),
        }));
    }

    #[test]
    fn rejects_bare_string_dependency() {
        let dir = tempdir().unwrap();
        write_manifest(
            dir.path(),
            r#"
            [package]
            name = "app"
            version = "0.1"
            type = "bin"

            [dependencies]
            core = "1.0"
            "#,
        );
        let err = find_package(dir.path()).unwrap_err();
        assert!(matches!(err, ManifestError::BareStringDependency { .. }));
    }

    #[test]
    fn rejects_git_dependency_without_revision() {
        let dir = tempdir().unwrap();
        write_manifest(
            dir.path(),
            r#"
            [package]
            name = "app"
            version = "0.1"
            type = "bin"

            [dependencies]
            extlib = { git = "https://example/repo" }
            "#,
        );
        let err = find_package(dir.path()).unwrap_err();
        assert!(matches!(err, ManifestError::MissingRevision { .. }));
    }

    #[test]
    fn rejects_invalid_package_type() {
        let dir = tempdir().unwrap();
        write_manifest(
            dir.path(),
            r#"
            [package]
            name = "app"
            version = "0.1"
            type = "bogus"
            "#,
        );
        let err = find_package(dir.path()).unwrap_err();
        assert!(matches!(err, ManifestError::InvalidType { .. }));
    }

    #[test]
    fn absent_manifest_is_none_not_error() {
        let dir = tempdir().unwrap();
        assert!(find_package(dir.path()).unwrap().is_none());
    }
}
