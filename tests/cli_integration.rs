//! Integration tests for the CLI
//!
//! Tests the apply, status, locate and show commands against fake environments

mod common;

use common::{FakeProject, COMPAT_UNKNOWN, COMPAT_WITH_TABS, MARKER, UVICORN_COMPAT};
use std::fs;
use std::path::Path;
use std::process::{Command, Output};

/// Run the binary from `cwd` with no active environment and no colors.
fn run(cwd: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_venv-patcher"))
        .args(args)
        .current_dir(cwd)
        .env_remove("VIRTUAL_ENV")
        .env_remove("RUST_LOG")
        .env("NO_COLOR", "1")
        .env("CLICOLOR", "0")
        .output()
        .unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn test_apply_help() {
    let dir = tempfile::tempdir().unwrap();
    let output = run(dir.path(), &["apply", "--help"]);

    assert!(output.status.success());
    assert!(stdout(&output).contains("Apply the patch"));
    assert!(stdout(&output).contains("--dry-run"));
}

#[test]
fn test_apply_basic() {
    let project = FakeProject::new(UVICORN_COMPAT);

    let output = run(project.root(), &["apply"]);
    let out = stdout(&output);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(out.contains("Applying uvicorn-nest-asyncio"));
    assert!(out.contains("Target:"));
    assert!(out.contains("Applied to"));
    assert!(out.contains("regex strategy"));
    assert!(project.read_module().contains(MARKER));
}

#[test]
fn test_apply_idempotent() {
    let project = FakeProject::new(UVICORN_COMPAT);

    let first = run(project.root(), &["apply"]);
    assert!(first.status.success());
    let after_first = project.read_module();

    let second = run(project.root(), &["apply"]);
    assert!(second.status.success());
    assert!(stdout(&second).contains("Already applied"));
    assert_eq!(project.read_module(), after_first);
}

#[test]
fn test_apply_uses_active_environment() {
    let project = FakeProject::with_env_dir("envs/app", UVICORN_COMPAT);
    let elsewhere = tempfile::tempdir().unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_venv-patcher"))
        .arg("apply")
        .current_dir(elsewhere.path())
        .env("VIRTUAL_ENV", project.prefix())
        .env("NO_COLOR", "1")
        .env("CLICOLOR", "0")
        .output()
        .unwrap();

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(project.read_module().contains(MARKER));
}

#[test]
fn test_apply_explicit_venv_and_version() {
    let project = FakeProject::with_env_dir(".venv", UVICORN_COMPAT);
    fs::remove_file(project.prefix().join("pyvenv.cfg")).unwrap();
    let elsewhere = tempfile::tempdir().unwrap();

    let prefix = project.prefix();
    let output = run(
        elsewhere.path(),
        &[
            "apply",
            "--venv",
            prefix.to_str().unwrap(),
            "--python-version",
            "3.12",
        ],
    );

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(project.read_module().contains(MARKER));
}

#[test]
fn test_apply_target_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let output = run(dir.path(), &["apply"]);

    assert_eq!(output.status.code(), Some(1));
    let err = stderr(&output);
    assert!(err.contains("Could not find uvicorn/_compat.py"));
    assert!(err.contains("Please ensure:"));
}

#[test]
fn test_apply_lists_searched_candidates() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("venv")).unwrap();

    let output = run(dir.path(), &["apply", "--python-version", "3.12"]);

    assert_eq!(output.status.code(), Some(1));
    let err = stderr(&output);
    assert!(err.contains("Searched:"));
    assert!(err.contains("python3.12"));
}

#[test]
fn test_apply_pattern_not_matched() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("_compat.py");
    fs::write(&file, COMPAT_UNKNOWN).unwrap();

    let output = run(dir.path(), &["apply", "--file", file.to_str().unwrap()]);

    assert_eq!(output.status.code(), Some(1));
    let err = stderr(&output);
    assert!(err.contains("Could not find the section to patch"));
    assert!(err.contains("4 | if sys.version_info >= (3, 10):"));
    assert_eq!(fs::read_to_string(&file).unwrap(), COMPAT_UNKNOWN);
}

#[test]
fn test_apply_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let output = run(dir.path(), &["apply", "--file", "nope.py"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("does not exist"));
}

#[test]
fn test_apply_dry_run_with_diff() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("_compat.py");
    fs::write(&file, COMPAT_WITH_TABS).unwrap();

    let output = run(
        dir.path(),
        &["apply", "--file", file.to_str().unwrap(), "--dry-run", "--diff"],
    );
    let out = stdout(&output);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(out.contains("DRY RUN"));
    assert!(out.contains("Would apply"));
    assert!(out.contains("-\tasyncio_run = asyncio.run"));
    assert!(out.contains(&format!("+\t# {MARKER}")));
    assert_eq!(fs::read_to_string(&file).unwrap(), COMPAT_WITH_TABS);
}

#[test]
fn test_status_before_and_after() {
    let project = FakeProject::new(UVICORN_COMPAT);

    let before = run(project.root(), &["status"]);
    assert_eq!(before.status.code(), Some(1));
    assert!(stdout(&before).contains("NOT APPLIED"));
    assert_eq!(project.read_module(), UVICORN_COMPAT);

    assert!(run(project.root(), &["apply"]).status.success());

    let after = run(project.root(), &["status"]);
    assert!(after.status.success());
    assert!(stdout(&after).contains("APPLIED"));
    assert!(!stdout(&after).contains("NOT APPLIED"));
}

#[test]
fn test_locate_prints_path() {
    let project = FakeProject::new(UVICORN_COMPAT);

    let output = run(project.root(), &["locate"]);
    assert!(output.status.success());
    assert!(stdout(&output)
        .trim_end()
        .ends_with("lib/python3.12/site-packages/uvicorn/_compat.py"));
}

#[test]
fn test_show_builtin() {
    let dir = tempfile::tempdir().unwrap();
    let output = run(dir.path(), &["show"]);
    let out = stdout(&output);

    assert!(output.status.success());
    assert!(out.contains("uvicorn-nest-asyncio"));
    assert!(out.contains("sys.version_info >= (3, 13) (primary)"));
    assert!(out.contains("sys.version_info >= (3, 12)"));
    assert!(out.contains("regex -> literal -> line-scan"));
}

#[test]
fn test_custom_patch_definition() {
    let dir = tempfile::tempdir().unwrap();
    let module = dir
        .path()
        .join("venv/lib/python3.11/site-packages/hypercorn/utils.py");
    fs::create_dir_all(module.parent().unwrap()).unwrap();
    fs::write(
        &module,
        "import sys\n\nif sys.version_info >= (3, 11):\n    run = asyncio.run\n",
    )
    .unwrap();

    let patch = dir.path().join("hypercorn.toml");
    fs::write(
        &patch,
        r#"
[meta]
name = "hypercorn-run"
marker = "PATCHED-RUN"

[target]
package = "hypercorn"
module = "utils.py"

[guard]
original = "run = asyncio.run"

[[guard.branches]]
threshold = "3.11"
body = '''
# PATCHED-RUN
def run(main):
    return asyncio.run(main)
'''
"#,
    )
    .unwrap();

    let output = run(
        dir.path(),
        &["apply", "--patch", patch.to_str().unwrap(), "--python-version", "3.11"],
    );

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("regex strategy"));
    let patched = fs::read_to_string(&module).unwrap();
    assert!(patched.contains("    def run(main):\n        return asyncio.run(main)\n"));
    assert!(!patched.contains("run = asyncio.run"));
}

#[test]
fn test_invalid_patch_definition() {
    let dir = tempfile::tempdir().unwrap();
    let patch = dir.path().join("bad.toml");
    fs::write(&patch, "[meta]\nname = \"bad\"\n").unwrap();

    let output = run(dir.path(), &["show", "--patch", patch.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("failed to parse patch definition TOML"));
}
