//! `compile_commands.json` export, for editors and clangd.

use std::path::Path;

use serde::Serialize;
use tracing::info;
use valet_core::{ClangRenderer, CommandRenderer, Plan};

#[derive(Serialize)]
struct CompileDbEntry {
    directory: String,
    command: String,
    file: String,
}

pub fn export(plan: &Plan, renderer: &ClangRenderer, project_folder: &Path) -> anyhow::Result<()> {
    let entries: Vec<CompileDbEntry> = plan
        .compile_commands
        .iter()
        .map(|cmd| {
            let directory = cmd.source_file.parent().unwrap_or(project_folder).to_string_lossy().into_owned();
            let argv = renderer.render_compile(cmd);
            CompileDbEntry {
                directory,
                command: argv.join(" "),
                file: cmd.source_file.to_string_lossy().into_owned(),
            }
        })
        .collect();

    let out_path = project_folder.join("compile_commands.json");
    info!(path = %out_path.display(), count = entries.len(), "exporting compile commands");
    let json = serde_json::to_string_pretty(&entries)?;
    std::fs::write(&out_path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use valet_common::graph::Graph;
    use valet_common::Platform;
    use valet_core::{CompileOptions, Package, PackageType, Plan};

    #[test]
    fn exported_entries_round_trip_through_json() {
        let dir = tempfile::tempdir().unwrap();
        let folder = dir.path().join("app");
        std::fs::create_dir_all(folder.join("src")).unwrap();
        std::fs::write(folder.join("src").join("main.cpp"), "int main() { return 0; }").unwrap();
        let package = Package::new(
            "app".to_string(),
            "0.1".to_string(),
            "c++20".to_string(),
            PackageType::Application,
            vec![],
            vec![],
            vec![],
            vec![],
            folder,
        );
        let mut graph = Graph::new();
        graph.add(package);
        let build_root = dir.path().join("build");
        let plan = Plan::build(&graph, CompileOptions { release: false }, &build_root).unwrap();
        let renderer = ClangRenderer::new(Platform::Linux);

        export(&plan, &renderer, dir.path()).unwrap();

        let raw = std::fs::read_to_string(dir.path().join("compile_commands.json")).unwrap();
        let parsed: Vec<serde_json::Value> = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed.len(), 1);
        let entry = &parsed[0];
        let expected_command = renderer.render_compile(&plan.compile_commands[0]).join(" ");
        assert_eq!(entry["command"].as_str().unwrap(), expected_command);
        assert_eq!(entry["file"].as_str().unwrap(), plan.compile_commands[0].source_file.to_string_lossy());
    }
}
