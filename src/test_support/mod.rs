//! Test utilities for fastbff unit tests.
//!
//! [`fixtures`] builds in-memory workspaces. The helpers here lay out a
//! description file and its sources in a temporary directory for the
//! operation tests.

pub mod fixtures;

use std::path::Path;

pub use fixtures::*;

use crate::core::manifest::MANIFEST_NAME;

/// Temporary workspace holding `manifest` and empty `sources`.
///
/// Returns the TempDir handle - dropping it will clean up the directory.
pub fn create_test_workspace(manifest: &str, sources: &[&str]) -> tempfile::TempDir {
    let tmp = tempfile::TempDir::new().expect("failed to create temp dir");
    std::fs::write(tmp.path().join(MANIFEST_NAME), manifest).expect("failed to write manifest");
    for source in sources {
        write_source(tmp.path(), source);
    }
    tmp
}

/// Create `relative` under `root` with a placeholder body.
pub fn write_source(root: &Path, relative: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("failed to create source dir");
    }
    std::fs::write(&path, "int placeholder_func(void) { return 0; }\n")
        .expect("failed to write source");
}

/// A blobbed library and an executable using it, both on win64.
pub fn game_manifest() -> String {
    r#"[solution]
name = "Game"

[[project]]
name = "Core"
root = "core"

[[project.configuration]]
name = "Debug"
platform = "win64"
fastbuild_blobbed = true

[[project]]
name = "App"
root = "app"

[[project.configuration]]
name = "Debug"
platform = "win64"
output = "exe"
dependencies = ["Core"]
"#
    .to_string()
}

/// Sources matching [`game_manifest`].
pub const GAME_SOURCES: &[&str] = &["core/a.cpp", "core/b.cpp", "app/main.cpp"];
