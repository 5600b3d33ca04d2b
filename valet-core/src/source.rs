//! Recursive source-file discovery under a package's `src/` folder.

use std::path::{Path, PathBuf};

const SOURCE_EXTENSIONS: &[&str] = &["c", "cc", "cpp", "cxx", "c++"];

/// Recursively collect source files under `folder`, stopping (not
/// descending into) any subdirectory that itself contains a `valet.toml` —
/// that's a nested package, composed separately.
pub fn collect_source_files(folder: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    collect_into(folder, &mut out)?;
    Ok(out)
}

fn collect_into(folder: &Path, out: &mut Vec<PathBuf>) -> std::io::Result<()> {
    for entry in std::fs::read_dir(folder)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            if path.join(crate::manifest::MANIFEST_FILE_NAME).is_file() {
                continue;
            }
            collect_into(&path, out)?;
        } else if is_source_file(&path) {
            out.push(path.canonicalize()?);
        }
    }
    Ok(())
}

fn is_source_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| SOURCE_EXTENSIONS.contains(&ext))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn finds_recognized_extensions_only() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("main.cpp"), "").unwrap();
        fs::write(dir.path().join("util.cc"), "").unwrap();
        fs::write(dir.path().join("README.md"), "").unwrap();
        let files = collect_source_files(dir.path()).unwrap();
        assert_eq!(files.len(), 2);
    }

    #[test]
    fn recurses_into_plain_subdirectories() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("detail");
        fs::create_dir(&nested).unwrap();
        fs::write(nested.join("impl.cxx"), "").unwrap();
        let files = collect_source_files(dir.path()).unwrap();
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn stops_at_nested_package_manifests() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("vendored");
        fs::create_dir(&nested).unwrap();
        fs::write(nested.join("valet.toml"), "").unwrap();
        fs::write(nested.join("impl.cpp"), "").unwrap();
        let files = collect_source_files(dir.path()).unwrap();
        assert!(files.is_empty());
    }
}
