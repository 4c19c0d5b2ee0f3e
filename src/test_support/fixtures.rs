//! In-memory workspaces shared by the generator tests.

use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;

use crate::core::configuration::{BuildStep, BuildStepKind, OutputType};
use crate::core::solution::{ConfId, ProjectId, Solution, Workspace};
use crate::core::target::Target;

/// One project rooted at `/ws/p` with a blobbed win64 `Debug` configuration.
pub fn blobbed_workspace(name: &str, files: &[&str]) -> (Workspace, ProjectId) {
    let mut ws = Workspace::new("/ws");
    let p = ws.add_project(name, "/ws/p");
    for file in files {
        ws.project_mut(p).add_source_file(PathBuf::from("/ws/p").join(file));
    }
    let conf = ws.add_configuration(p, "Debug", Target::default());
    conf.blob.fastbuild_blobbed = true;
    (ws, p)
}

/// Absolute paths of `names` under the root of project `p`.
pub fn file_set(ws: &Workspace, p: ProjectId, names: &[&str]) -> BTreeSet<PathBuf> {
    let root = &ws.project(p).root;
    names.iter().map(|n| root.join(n)).collect()
}

/// Four linked projects, each with one win64 `Debug` configuration.
///
/// App (exe) depends on Core (lib), which depends on Math (lib); Tool (exe)
/// stands alone. A `Game` solution includes and builds all of them. The map
/// holds each project's configuration by project name.
pub fn linked_workspace() -> (Workspace, HashMap<&'static str, ConfId>) {
    let mut ws = Workspace::new("/ws");
    let mut ids = HashMap::new();

    let projects: [(&'static str, &[&str], OutputType); 4] = [
        ("Math", &["vec.cpp"], OutputType::Lib),
        ("Core", &["a.cpp", "b.c"], OutputType::Lib),
        ("App", &["main.cpp"], OutputType::Exe),
        ("Tool", &["tool.cpp"], OutputType::Exe),
    ];
    for (name, files, output) in projects {
        let root = PathBuf::from("/ws").join(name.to_lowercase());
        let p = ws.add_project(name, &root);
        for file in files {
            ws.project_mut(p).add_source_file(root.join(file));
        }
        let conf = ws.add_configuration(p, "Debug", Target::default());
        conf.output = output;
        conf.output_file = root.join("bin").join(format!("{}_Debug", name));
        conf.intermediate_dir = root.join("obj").join("win64").join("Debug");
        ids.insert(name, conf.id);
    }

    ws.conf_mut(ids["Core"]).dependencies = vec![ids["Math"]];
    ws.conf_mut(ids["App"]).dependencies = vec![ids["Core"]];
    ws.resolve_dependencies();

    let game = solution(&ws, "Game", "/ws/Game");
    ws.add_solution(game);
    (ws, ids)
}

/// A solution over every project of `ws`, building all of them.
pub fn solution(ws: &Workspace, name: &str, master_bff: &str) -> Solution {
    let projects: Vec<ProjectId> = ws.projects().iter().map(|p| p.id).collect();
    Solution {
        name: name.to_string(),
        master_bff: PathBuf::from(master_bff),
        bff_path: ws.root.join(name),
        build: projects.iter().copied().collect(),
        projects,
        all_configs_section: false,
    }
}

/// A build step writing `/ws/out/<key>.txt`; `None` gives an unknown kind.
pub fn step(key: &str, kind: Option<BuildStepKind>) -> BuildStep {
    BuildStep {
        key: key.to_string(),
        kind,
        kind_name: kind.map_or("deploy", |k| k.as_str()).to_string(),
        executable: PathBuf::from("/ws/tools/run.exe"),
        arguments: format!("--step {}", key),
        working_dir: None,
        inputs: Vec::new(),
        output: Some(PathBuf::from(format!("/ws/out/{}.txt", key))),
        use_stdout_as_output: false,
        always_run: false,
    }
}
