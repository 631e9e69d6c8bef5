//! CLI integration tests for l2tdevtools.
//!
//! These tests drive the binary without network access: only error paths
//! of `build` and the offline commands are exercised.

use std::fs;
use std::path::Path;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use tempfile::TempDir;

const PROJECTS_INI: &str = "\
[dfdatetime]
build_system: setup_py
description_short: Digital Forensics date and time library
description_long: Digital Forensics date and time library
download_url: https://github.com/log2timeline/dfdatetime/releases
homepage_url: https://github.com/log2timeline/dfdatetime
maintainer: Log2Timeline maintainers <log2timeline-maintainers@googlegroups.com>
";

/// Get the l2tdevtools binary command, isolated from the user's global
/// configuration.
fn l2tdevtools(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("l2tdevtools").unwrap();
    cmd.env("HOME", home).current_dir(home);
    cmd
}

/// Create a working directory with `data/projects.ini`.
fn workspace() -> TempDir {
    let tmp = TempDir::new().unwrap();
    fs::create_dir(tmp.path().join("data")).unwrap();
    fs::write(tmp.path().join("data").join("projects.ini"), PROJECTS_INI).unwrap();
    fs::write(
        tmp.path().join("data").join("presets.ini"),
        "[dfvfs]\nprojects: dfdatetime\n",
    )
    .unwrap();
    tmp
}

// ============================================================================
// l2tdevtools --help
// ============================================================================

#[test]
fn test_help_lists_commands() {
    let tmp = TempDir::new().unwrap();

    l2tdevtools(tmp.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("build"))
        .stdout(predicate::str::contains("dpkg-generate"))
        .stdout(predicate::str::contains("update-dependencies"));
}

// ============================================================================
// l2tdevtools build
// ============================================================================

#[test]
fn test_build_requires_preset_or_projects() {
    let tmp = workspace();

    l2tdevtools(tmp.path())
        .args(["build", "dpkg"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "Please define a preset or projects to build.",
        ));
}

#[test]
fn test_build_unsupported_target() {
    let tmp = workspace();

    l2tdevtools(tmp.path())
        .args(["build", "deb", "--projects", "dfdatetime"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid target: deb"));
}

#[test]
fn test_build_undefined_preset() {
    let tmp = workspace();

    l2tdevtools(tmp.path())
        .args(["build", "wheel", "--preset", "plaso"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Undefined preset: plaso"));
}

#[test]
fn test_build_reports_undefined_projects() {
    let tmp = workspace();

    l2tdevtools(tmp.path())
        .args(["build", "download", "--projects", "plaso"])
        .args(["--build-directory", "builds"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("Undefined projects:"))
        .stdout(predicate::str::contains("\tplaso"));
}

#[test]
fn test_build_missing_config_directory() {
    let tmp = TempDir::new().unwrap();

    l2tdevtools(tmp.path())
        .args(["build", "dpkg", "--projects", "dfdatetime", "-c", "missing"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No such config file"));
}

// ============================================================================
// l2tdevtools dpkg-generate
// ============================================================================

#[test]
fn test_dpkg_generate_writes_dpkg_directory() {
    let tmp = workspace();
    fs::create_dir(tmp.path().join("dfdatetime-20240101")).unwrap();

    l2tdevtools(tmp.path())
        .args(["dpkg-generate", "dfdatetime"])
        .assert()
        .success();

    let dpkg_path = tmp.path().join("dfdatetime-20240101").join("dpkg");
    assert!(dpkg_path.join("control").exists());
    assert!(dpkg_path.join("rules").exists());

    let changelog = fs::read_to_string(dpkg_path.join("changelog")).unwrap();
    assert!(changelog.starts_with("dfdatetime (20240101-1)"));
}

#[test]
fn test_dpkg_generate_refuses_existing_dpkg_directory() {
    let tmp = workspace();
    fs::create_dir_all(tmp.path().join("dfdatetime-20240101").join("dpkg")).unwrap();

    l2tdevtools(tmp.path())
        .args(["dpkg-generate", "dfdatetime"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn test_dpkg_generate_undefined_project() {
    let tmp = workspace();

    l2tdevtools(tmp.path())
        .args(["dpkg-generate", "plaso"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No such package name: plaso."));
}

// ============================================================================
// l2tdevtools update-dependencies
// ============================================================================

#[test]
fn test_update_dependencies_writes_requirements() {
    let tmp = TempDir::new().unwrap();
    let project_path = tmp.path().join("dfdatetime");
    fs::create_dir(&project_path).unwrap();
    fs::write(
        project_path.join("dfdatetime.ini"),
        "[project]\nname: dfdatetime\nmaintainer: Log2Timeline maintainers <log2timeline-maintainers@googlegroups.com>\n",
    )
    .unwrap();
    fs::write(
        project_path.join("dependencies.ini"),
        "[dfdatetime]\nminimum_version: 20211113\n",
    )
    .unwrap();
    fs::write(
        project_path.join("test_dependencies.ini"),
        "[mock]\nminimum_version: 2.0.0\n",
    )
    .unwrap();
    fs::write(project_path.join("tox.ini"), "stale\n").unwrap();

    l2tdevtools(tmp.path())
        .args(["update-dependencies", "--project-path", "dfdatetime"])
        .assert()
        .success()
        .stdout(predicate::str::contains("tox.ini"));

    assert_eq!(
        fs::read_to_string(project_path.join("requirements.txt")).unwrap(),
        "dfdatetime >= 20211113\n"
    );
    assert_eq!(
        fs::read_to_string(project_path.join("test_requirements.txt")).unwrap(),
        "mock >= 2.0.0\n"
    );
    assert!(fs::read_to_string(project_path.join("setup.cfg"))
        .unwrap()
        .starts_with("[metadata]\nname = dfdatetime\n"));
    assert!(fs::read_to_string(project_path.join(".pylintrc"))
        .unwrap()
        .contains("extension-pkg-allow-list="));
    assert!(fs::read_to_string(project_path.join("tox.ini"))
        .unwrap()
        .starts_with("[tox]\n"));
    assert!(!project_path.join("appveyor.yml").exists());
}

#[test]
fn test_update_dependencies_with_project_file() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("dependencies.ini"), "[six]\n").unwrap();
    fs::write(tmp.path().join("project.ini"), "[project]\nname: plaso\n").unwrap();

    l2tdevtools(tmp.path())
        .args(["update-dependencies", "--project-file", "project.ini"])
        .assert()
        .success();

    assert!(fs::read_to_string(tmp.path().join("setup.cfg"))
        .unwrap()
        .starts_with("[metadata]\nname = plaso\n"));
}

#[test]
fn test_update_dependencies_without_dependencies_file() {
    let tmp = TempDir::new().unwrap();

    l2tdevtools(tmp.path())
        .arg("update-dependencies")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No such dependencies file"));
}

// ============================================================================
// l2tdevtools completions
// ============================================================================

#[test]
fn test_completions_bash() {
    let tmp = TempDir::new().unwrap();

    l2tdevtools(tmp.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("l2tdevtools"));
}
