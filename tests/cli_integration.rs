//! CLI integration tests for fastbff.
//!
//! These tests run the binary against description files laid out in
//! temporary directories and inspect the generated files.

use std::fs;
use std::path::Path;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use tempfile::TempDir;

/// Get the fastbff binary command, isolated from the user's global config.
fn fastbff(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("fastbff").unwrap();
    cmd.env("HOME", home).env_remove("FASTBFF_MANIFEST");
    cmd
}

/// Create a temporary directory for test workspaces.
fn temp_dir() -> TempDir {
    TempDir::new().unwrap()
}

fn write(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

const GAME: &str = r#"
[solution]
name = "Game"

[[project]]
name = "Core"
root = "core"

[[project.configuration]]
name = "Debug"
platform = "win64"
fastbuild_blobbed = true

[[project.configuration]]
name = "Release"
platform = "win64"
optimization = "release"
fastbuild_blobbed = true

[[project]]
name = "App"
root = "app"

[[project.configuration]]
name = "Debug"
platform = "win64"
output = "exe"
dependencies = ["Core"]

[[project.configuration]]
name = "Release"
platform = "win64"
optimization = "release"
output = "exe"
dependencies = ["Core"]
"#;

/// A two-project workspace: a blobbed library and an executable.
fn game_workspace() -> TempDir {
    let tmp = temp_dir();
    write(tmp.path(), "FastBff.toml", GAME);
    write(tmp.path(), "core/a.cpp", "int a() { return 1; }\n");
    write(tmp.path(), "core/b.cpp", "int b() { return 2; }\n");
    write(tmp.path(), "app/main.cpp", "int main() { return 0; }\n");
    tmp
}

// ============================================================================
// fastbff generate
// ============================================================================

#[test]
fn test_generate_writes_project_and_master_files() {
    let tmp = game_workspace();

    fastbff(tmp.path())
        .arg("generate")
        .current_dir(tmp.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("Updated"));

    let core = fs::read_to_string(tmp.path().join("core/Core.bff")).unwrap();
    assert!(core.contains("Unity( 'Core_unity' )"));
    assert!(core.contains("Library( 'Core_Debug_win64_Library' )"));
    assert!(core.contains("#if WIN64"));

    let app = fs::read_to_string(tmp.path().join("app/App.bff")).unwrap();
    assert!(app.contains("Executable( 'App_Release_win64_Executable' )"));
    assert!(app.contains("'Core_Release_win64_Library'"));

    let master = fs::read_to_string(tmp.path().join("Game.bff")).unwrap();
    assert!(master.contains("#define WIN64"));
    assert!(master.contains("#include \"Game-globalsettings.bff\""));
    let core_include = master.find("#include \"core/Core.bff\"").unwrap();
    let app_include = master.find("#include \"app/App.bff\"").unwrap();
    assert!(core_include < app_include);

    let settings = fs::read_to_string(tmp.path().join("Game-globalsettings.bff")).unwrap();
    assert!(settings.contains("Compiler( 'Compiler-win64-vs2019' )"));
}

#[test]
fn test_generate_rerun_is_unchanged() {
    let tmp = game_workspace();

    fastbff(tmp.path())
        .arg("generate")
        .current_dir(tmp.path())
        .assert()
        .success();
    let before = fs::read_to_string(tmp.path().join("core/Core.bff")).unwrap();

    fastbff(tmp.path())
        .arg("generate")
        .current_dir(tmp.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("Unchanged"))
        .stderr(predicate::str::contains("0 of 4 files updated"));

    let after = fs::read_to_string(tmp.path().join("core/Core.bff")).unwrap();
    assert_eq!(before, after);
}

#[test]
fn test_generate_finds_manifest_in_parent() {
    let tmp = game_workspace();

    fastbff(tmp.path())
        .arg("generate")
        .current_dir(tmp.path().join("core"))
        .assert()
        .success();

    assert!(tmp.path().join("Game.bff").exists());
}

#[test]
fn test_generate_dry_run_writes_nothing() {
    let tmp = game_workspace();

    fastbff(tmp.path())
        .args(["generate", "--dry-run"])
        .current_dir(tmp.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("Generated"));

    assert!(!tmp.path().join("Game.bff").exists());
    assert!(!tmp.path().join("core/Core.bff").exists());
}

#[test]
fn test_cycle_is_rejected_and_nothing_is_written() {
    let tmp = temp_dir();
    write(
        tmp.path(),
        "FastBff.toml",
        r#"
[[project]]
name = "X"
root = "x"

[[project.configuration]]
name = "Debug"
platform = "win64"
dependencies = ["Y"]

[[project]]
name = "Y"
root = "y"

[[project.configuration]]
name = "Debug"
platform = "win64"
dependencies = ["X"]
"#,
    );
    write(tmp.path(), "x/x.cpp", "int x() { return 0; }\n");
    write(tmp.path(), "y/y.cpp", "int y() { return 0; }\n");

    fastbff(tmp.path())
        .arg("generate")
        .current_dir(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("cyclic direct dependency"))
        .stderr(predicate::str::contains("X|Debug|win64"));

    assert!(!tmp.path().join("x/X.bff").exists());
    assert!(!tmp.path().join("y/Y.bff").exists());
    let bffs = fs::read_dir(tmp.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().is_some_and(|x| x == "bff"))
        .count();
    assert_eq!(bffs, 0);
}

#[test]
fn test_missing_manifest_fails() {
    let tmp = temp_dir();

    fastbff(tmp.path())
        .arg("generate")
        .current_dir(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("could not find `FastBff.toml`"));
}

// ============================================================================
// Unity naming strategies
// ============================================================================

#[test]
fn test_fragment_naming_is_readable() {
    let tmp = game_workspace();

    fastbff(tmp.path())
        .args(["generate", "--unity-naming", "fragment"])
        .current_dir(tmp.path())
        .assert()
        .success();

    let core = fs::read_to_string(tmp.path().join("core/Core.bff")).unwrap();
    assert_eq!(core.matches("Unity( '").count(), 1);
    assert!(core.contains("'core_unity*.cpp'"));
}

#[test]
fn test_hash_naming_strategies() {
    for strategy in ["hash", "fragment-hash"] {
        let tmp = game_workspace();

        fastbff(tmp.path())
            .args(["generate", "--unity-naming", strategy])
            .current_dir(tmp.path())
            .assert()
            .success();

        let core = fs::read_to_string(tmp.path().join("core/Core.bff")).unwrap();
        let pattern = predicate::str::is_match(r"Unity\( 'Core_unity_[0-9A-F]{8}' \)").unwrap();
        assert!(pattern.eval(&core), "{} naming produced:\n{}", strategy, core);
    }
}

#[test]
fn test_naming_from_project_config() {
    let tmp = game_workspace();
    write(
        tmp.path(),
        ".fastbff/config.toml",
        "[generate]\nunity_naming = \"hash\"\n",
    );

    fastbff(tmp.path())
        .arg("generate")
        .current_dir(tmp.path())
        .assert()
        .success();

    let core = fs::read_to_string(tmp.path().join("core/Core.bff")).unwrap();
    assert!(!core.contains("Unity( 'Core_unity' )"));
    assert!(core.contains("Unity( 'Core_unity_"));
}

#[test]
fn test_unknown_naming_strategy_fails() {
    let tmp = game_workspace();

    fastbff(tmp.path())
        .args(["generate", "--unity-naming", "md5"])
        .current_dir(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown unity naming strategy"));
}

// ============================================================================
// Machine-readable output
// ============================================================================

#[test]
fn test_generate_json_events() {
    let tmp = game_workspace();

    fastbff(tmp.path())
        .args(["generate", "--message-format", "json"])
        .current_dir(tmp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("\"reason\":\"generate-started\""))
        .stdout(predicate::str::contains("\"reason\":\"file-written\""))
        .stdout(predicate::str::contains("\"reason\":\"generate-finished\""));
}

#[test]
fn test_skipped_configuration_event() {
    let tmp = game_workspace();
    let manifest = format!(
        "{}\n[[project.configuration]]\nname = \"Debug\"\nplatform = \"ios\"\noutput = \"exe\"\n",
        GAME
    );
    write(tmp.path(), "FastBff.toml", &manifest);

    let output = fastbff(tmp.path())
        .args(["generate", "--message-format", "json"])
        .current_dir(tmp.path())
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    let skipped: serde_json::Value = stdout
        .lines()
        .filter_map(|line| serde_json::from_str::<serde_json::Value>(line).ok())
        .find(|event| event["reason"] == "configuration-skipped")
        .expect("no configuration-skipped event");
    assert_eq!(skipped["configuration"], "App|Debug|ios");
    assert!(skipped["detail"].as_str().is_some_and(|d| !d.is_empty()));
}

#[test]
fn test_emit_outputs_lists_unity_files() {
    let tmp = game_workspace();

    fastbff(tmp.path())
        .args(["generate", "--emit-outputs", "outputs.json"])
        .current_dir(tmp.path())
        .assert()
        .success();

    let outputs = fs::read_to_string(tmp.path().join("outputs.json")).unwrap();
    let json: serde_json::Value = serde_json::from_str(&outputs).unwrap();
    assert_eq!(json["generated"].as_array().unwrap().len(), 4);
    assert_eq!(json["unity_files"][0], "core/unity/core_unity1.cpp");
    assert!(json["generated"]
        .as_array()
        .unwrap()
        .iter()
        .any(|p| p == "app/App.bff"));
}

// ============================================================================
// fastbff check / targets
// ============================================================================

#[test]
fn test_check_writes_nothing() {
    let tmp = game_workspace();

    fastbff(tmp.path())
        .arg("check")
        .current_dir(tmp.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("4 configurations"));

    assert!(!tmp.path().join("Game.bff").exists());
}

#[test]
fn test_targets_lists_command_lines() {
    let tmp = game_workspace();
    write(
        tmp.path(),
        ".fastbff/config.toml",
        "[fastbuild]\nexecutable = \"tools/FBuild.exe\"\n",
    );

    fastbff(tmp.path())
        .args(["targets", "--rebuild"])
        .current_dir(tmp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "tools/FBuild.exe -clean App_Debug_win64 -config Game.bff",
        ));
}

#[test]
fn test_completions() {
    let tmp = temp_dir();

    fastbff(tmp.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("fastbff"));
}
