//! Make-style depfile ingestion: `<object>: <source> <h1> <h2> …`, with
//! backslash-newline continuations, assembled into a `Graph<DepEntry>` from
//! object files to their transitive source+header inputs.

use std::fs;
use std::path::{Path, PathBuf};

use valet_common::graph::{Graph, GraphNode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepEntryKind {
    ObjectFile,
    SourceOrHeader,
}

#[derive(Debug, Clone)]
pub struct DepEntry {
    id: String,
    pub kind: DepEntryKind,
}

impl DepEntry {
    pub fn new(path: &str, kind: DepEntryKind) -> Self {
        let id = canonical_or_literal(path);
        Self { id, kind }
    }

    pub fn path(&self) -> &Path {
        Path::new(&self.id)
    }
}

impl PartialEq for DepEntry {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
impl Eq for DepEntry {}

impl GraphNode for DepEntry {
    fn id(&self) -> &str {
        &self.id
    }
}

fn canonical_or_literal(path: &str) -> String {
    // `weakly_canonical` in the original tolerates a path whose leaf does
    // not exist yet (the object file, mid-build); mirror that by falling
    // back to the literal string when canonicalization fails.
    Path::new(path)
        .canonicalize()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_else(|_| path.to_string())
}

/// Ingest one depfile into `graph`, adding an `ObjectFile` node for its
/// left-hand side and an edge to each `SourceOrHeader` dependency. A
/// missing file is not an error — the caller treats "no node in the graph"
/// as "must compile".
pub fn collect_source_deps(depfile_path: &Path, graph: &mut Graph<DepEntry>) -> std::io::Result<()> {
    if !depfile_path.is_file() {
        return Ok(());
    }
    let raw = fs::read_to_string(depfile_path)?;
    let mut lines: Vec<String> = raw
        .lines()
        .map(|line| line.strip_suffix('\\').unwrap_or(line).trim().to_string())
        .collect();
    if lines.is_empty() || lines[0].is_empty() {
        return Ok(());
    }

    // The object/source pair can be split across the first colon either as
    // `obj:` alone (source follows on later lines) or as `obj: source` on
    // one line; handle both layouts.
    let first_line = lines[0].clone();
    let colon_pos = first_line.rfind(": ");
    let object_str = match colon_pos {
        Some(pos) if pos + 2 < first_line.len() => {
            let dep_str = first_line[pos + 2..].trim().to_string();
            lines.insert(1, dep_str);
            first_line[..pos].trim().to_string()
        }
        _ => first_line.trim_end_matches(':').trim().to_string(),
    };

    let object_entry = DepEntry::new(&object_str, DepEntryKind::ObjectFile);
    graph.add(object_entry.clone());

    // Each physical line can itself list several space-separated paths
    // (`obj: main.cpp a.h b.h`), so tokenize before building a node per path.
    for dep_str in lines.iter().skip(1) {
        for token in dep_str.split_whitespace() {
            let dep_entry = DepEntry::new(token, DepEntryKind::SourceOrHeader);
            graph.add(dep_entry.clone());
            let _ = graph.depend(&object_entry, &dep_entry);
        }
    }
    Ok(())
}

/// True if `object` is missing, any dependency is missing, or any
/// dependency's mtime is newer than `object`'s — i.e. `object` must be
/// recompiled. An unreadable mtime is treated as "stale": recompile rather
/// than risk staleness.
pub fn has_modified_deps(object: &Path, dependencies: &[PathBuf]) -> bool {
    let object_mtime = match fs::metadata(object).and_then(|m| m.modified()) {
        Ok(mtime) => mtime,
        Err(_) => return true,
    };
    for dep in dependencies {
        let dep_mtime = match fs::metadata(dep).and_then(|m| m.modified()) {
            Ok(mtime) => mtime,
            Err(_) => return true,
        };
        if dep_mtime > object_mtime {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::thread::sleep;
    use std::time::Duration;
    use tempfile::tempdir;

    #[test]
    fn parses_single_line_layout() {
        let dir = tempdir().unwrap();
        let header = dir.path().join("core.h");
        let source = dir.path().join("core.cpp");
        fs::write(&header, "").unwrap();
        fs::write(&source, "").unwrap();
        let depfile = dir.path().join("core.d");
        fs::write(
            &depfile,
            format!("{}.o: {} {}\n", source.display(), source.display(), header.display()),
        )
        .unwrap();

        let mut graph = Graph::new();
        collect_source_deps(&depfile, &mut graph).unwrap();
        let obj = DepEntry::new(&format!("{}.o", source.display()), DepEntryKind::ObjectFile);
        let deps = graph.immediate_deps(&obj);
        assert_eq!(deps.len(), 2);
    }

    #[test]
    fn parses_continuation_line_layout() {
        let dir = tempdir().unwrap();
        let header = dir.path().join("core.h");
        let source = dir.path().join("core.cpp");
        fs::write(&header, "").unwrap();
        fs::write(&source, "").unwrap();
        let depfile = dir.path().join("core.d");
        fs::write(
            &depfile,
            format!(
                "{}.o: \\\n {} \\\n {}\n",
                source.display(),
                source.display(),
                header.display()
            ),
        )
        .unwrap();

        let mut graph = Graph::new();
        collect_source_deps(&depfile, &mut graph).unwrap();
        let obj = DepEntry::new(&format!("{}.o", source.display()), DepEntryKind::ObjectFile);
        let deps = graph.immediate_deps(&obj);
        assert_eq!(deps.len(), 2);
    }

    #[test]
    fn missing_depfile_is_not_an_error() {
        let mut graph = Graph::new();
        collect_source_deps(Path::new("/nonexistent/path.d"), &mut graph).unwrap();
        assert!(graph.is_empty());
    }

    #[test]
    fn newer_dependency_forces_recompile() {
        let dir = tempdir().unwrap();
        let object = dir.path().join("a.o");
        let header = dir.path().join("a.h");
        fs::write(&object, "").unwrap();
        sleep(Duration::from_millis(20));
        fs::write(&header, "").unwrap();
        assert!(has_modified_deps(&object, &[header]));
    }

    #[test]
    fn up_to_date_object_is_not_rebuilt() {
        let dir = tempdir().unwrap();
        let header = dir.path().join("a.h");
        fs::write(&header, "").unwrap();
        sleep(Duration::from_millis(20));
        let object = dir.path().join("a.o");
        fs::write(&object, "").unwrap();
        assert!(!has_modified_deps(&object, &[header]));
    }

    #[test]
    fn missing_object_forces_recompile() {
        let dir = tempdir().unwrap();
        let header = dir.path().join("a.h");
        fs::write(&header, "").unwrap();
        assert!(has_modified_deps(&dir.path().join("missing.o"), &[header]));
    }
}
