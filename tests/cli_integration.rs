//! CLI integration tests for cdep.
//!
//! Every test points `CDEP_HOME` at a temporary folder and resolves
//! manifests from local files, so nothing touches the network.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

use assert_cmd::prelude::*;
use cdep::util::hash::sha256_bytes;
use predicates::prelude::*;
use tempfile::TempDir;

/// Get the cdep binary command with an isolated home folder.
fn cdep(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("cdep").unwrap();
    cmd.env("CDEP_HOME", home);
    cmd
}

/// A package with one Android archive, served from `dir`. Returns the
/// manifest path.
fn write_package(dir: &Path) -> PathBuf {
    fs::create_dir_all(dir).unwrap();
    let archive = dir.join("lib-arm64-v8a.zip");
    let mut zip = zip::ZipWriter::new(fs::File::create(&archive).unwrap());
    let options = zip::write::SimpleFileOptions::default();
    zip.start_file("include/lib.h", options).unwrap();
    zip.write_all(b"int lib();\n").unwrap();
    zip.finish().unwrap();

    let bytes = fs::read(&archive).unwrap();
    let manifest = format!(
        "coordinate:\n  groupId: com.example\n  artifactId: lib\n  version: 1.0.0\nandroid:\n  archives:\n    - file: lib-arm64-v8a.zip\n      sha256: {}\n      size: {}\n      runtime: c++\n      platform: 21\n      abi: arm64-v8a\n      include: include\n      libs: [liblib.a]\n",
        sha256_bytes(&bytes),
        bytes.len()
    );
    let path = dir.join("cdep-manifest.yml");
    fs::write(&path, manifest).unwrap();
    path
}

fn write_project(dir: &Path, builders: &str, dependency: &Path) {
    fs::create_dir_all(dir).unwrap();
    fs::write(
        dir.join("cdep.yml"),
        format!(
            "builders: [{}]\ndependencies:\n  - compile: {}\n",
            builders,
            dependency.display()
        ),
    )
    .unwrap();
}

// ============================================================================
// cdep --help / completions
// ============================================================================

#[test]
fn test_help_lists_commands() {
    let tmp = TempDir::new().unwrap();
    cdep(tmp.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("redownload"))
        .stdout(predicate::str::contains("fetch-archive"));
}

#[test]
fn test_completions_bash() {
    let tmp = TempDir::new().unwrap();
    cdep(tmp.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("cdep"));
}

// ============================================================================
// cdep show
// ============================================================================

#[test]
fn test_show_folders_with_short_flags() {
    let tmp = TempDir::new().unwrap();
    let work = tmp.path().join("work");
    let cache = tmp.path().join("cache");
    fs::create_dir_all(&work).unwrap();

    cdep(&tmp.path().join("home"))
        .arg("-wf")
        .arg(&work)
        .arg("-df")
        .arg(&cache)
        .args(["show", "folders"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Downloads:"))
        .stdout(predicate::str::contains("Exploded:"))
        .stdout(predicate::str::contains("Modules:"))
        .stdout(predicate::str::contains(cache.join("downloads").to_string_lossy().into_owned()));
}

#[test]
fn test_show_manifest_echoes_project() {
    let tmp = TempDir::new().unwrap();
    let work = tmp.path().join("work");
    let manifest = write_package(&tmp.path().join("pkg"));
    write_project(&work, "cmake", &manifest);

    cdep(&tmp.path().join("home"))
        .arg("--working-folder")
        .arg(&work)
        .args(["show", "manifest"])
        .assert()
        .success()
        .stdout(predicate::str::contains("cdep-manifest.yml"));
}

// ============================================================================
// cdep generate
// ============================================================================

#[test]
fn test_missing_project_fails() {
    let tmp = TempDir::new().unwrap();
    cdep(&tmp.path().join("home"))
        .arg("--working-folder")
        .arg(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("expected a configuration file at"));
}

#[test]
fn test_generate_writes_cmake_glue() {
    let tmp = TempDir::new().unwrap();
    let work = tmp.path().join("work");
    let manifest = write_package(&tmp.path().join("pkg"));
    write_project(&work, "cmake", &manifest);

    cdep(&tmp.path().join("home"))
        .arg("--working-folder")
        .arg(&work)
        .arg("generate")
        .assert()
        .success();

    let glue = work.join(".cdep/modules/cdep-dependencies-config.cmake");
    assert!(glue.is_file());
    let hashes = fs::read_to_string(work.join("cdep.sha256")).unwrap();
    assert!(hashes.contains("com.example:lib:1.0.0"));
}

#[test]
fn test_no_command_generates() {
    let tmp = TempDir::new().unwrap();
    let work = tmp.path().join("work");
    let manifest = write_package(&tmp.path().join("pkg"));
    write_project(&work, "ndk-build", &manifest);

    cdep(&tmp.path().join("home"))
        .arg("-wf")
        .arg(&work)
        .assert()
        .success();

    assert!(work.join(".cdep/modules/ndk-build/cdep-dependencies.mk").is_file());
}

#[test]
fn test_unresolvable_dependency_fails_without_hashes() {
    let tmp = TempDir::new().unwrap();
    let work = tmp.path().join("work");
    write_project(&work, "cmake", Path::new("not-a-coordinate"));

    cdep(&tmp.path().join("home"))
        .arg("--working-folder")
        .arg(&work)
        .assert()
        .failure()
        .stderr(predicate::str::contains("not-a-coordinate"));

    assert!(!work.join("cdep.sha256").exists());
}

// ============================================================================
// cdep fetch / lint / fetch-archive
// ============================================================================

#[test]
fn test_fetch_unpacks_into_download_folder() {
    let tmp = TempDir::new().unwrap();
    let manifest = write_package(&tmp.path().join("pkg"));
    let cache = tmp.path().join("cache");

    cdep(&tmp.path().join("home"))
        .arg("--working-folder")
        .arg(tmp.path())
        .arg("--download-folder")
        .arg(&cache)
        .arg("fetch")
        .arg(&manifest)
        .assert()
        .success();

    assert!(cache
        .join("exploded/com.example/lib/1.0.0/lib-arm64-v8a.zip/include/lib.h")
        .is_file());
}

#[test]
fn test_lint_reports_success() {
    let tmp = TempDir::new().unwrap();
    let manifest = write_package(&tmp.path().join("pkg"));

    cdep(&tmp.path().join("home"))
        .arg("--working-folder")
        .arg(tmp.path())
        .arg("lint")
        .arg(&manifest)
        .assert()
        .success()
        .stderr(predicate::str::contains("Checked 1 package"));
}

#[test]
fn test_fetch_archive_rejects_bad_coordinate() {
    let tmp = TempDir::new().unwrap();
    cdep(&tmp.path().join("home"))
        .arg("--working-folder")
        .arg(tmp.path())
        .args(["fetch-archive", "nope", "file:///nowhere.zip", "1", "00"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("is not a group:artifact:version coordinate"));
}
