//! Integration tests for the trellis CLI.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::{tempdir, TempDir};

fn trellis_cmd() -> Command {
    let mut cmd = Command::cargo_bin("trellis").unwrap();
    cmd.env_remove("RUST_LOG").env_remove("TRELLIS_CONFIG");
    cmd
}

fn sample_project() -> TempDir {
    let dir = tempdir().unwrap();
    fs::create_dir_all(dir.path().join("app")).unwrap();
    fs::write(
        dir.path().join("app/server.py"),
        "from app.http import parse_headers\n\ndef handle_request(request):\n    return parse_headers(request)\n",
    )
    .unwrap();
    fs::write(
        dir.path().join("app/http.py"),
        "def parse_headers(request):\n    return request.split()\n",
    )
    .unwrap();
    fs::write(dir.path().join("notes.txt"), "not source\n").unwrap();
    dir
}

#[test]
fn test_help_lists_commands() {
    trellis_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("index"))
        .stdout(predicate::str::contains("expand"))
        .stdout(predicate::str::contains("signature"));
}

#[test]
fn test_languages() {
    trellis_cmd()
        .arg("languages")
        .assert()
        .success()
        .stdout(predicate::str::contains("Python"))
        .stdout(predicate::str::contains("Scala"))
        .stdout(predicate::str::contains(".cs"));
}

#[test]
fn test_print_default_config_round_trips() {
    let output = trellis_cmd().arg("print-default-config").output().unwrap();
    assert!(output.status.success());
    let yaml = String::from_utf8(output.stdout).unwrap();
    assert!(yaml.contains("max_tree_depth: 512"));

    let dir = tempdir().unwrap();
    let path = dir.path().join("trellis.yml");
    fs::write(&path, yaml).unwrap();
    trellis_cmd()
        .arg("--config")
        .arg(&path)
        .arg("index")
        .arg(sample_project().path())
        .assert()
        .success();
}

#[test]
fn test_index_reports_counts() {
    let project = sample_project();
    trellis_cmd()
        .arg("index")
        .arg(project.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("nodes"))
        .stdout(predicate::str::contains("edges"));
}

#[test]
fn test_index_json_report() {
    let project = sample_project();
    let output = trellis_cmd()
        .args(["index", "--json"])
        .arg(project.path())
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["files"], 2);
    assert_eq!(report["generation"], 1);
    assert!(report["elapsed_ms"].is_u64());
}

#[test]
fn test_expand_prints_bundle() {
    let project = sample_project();
    let output = trellis_cmd()
        .arg("expand")
        .arg(project.path())
        .arg("app/server.py::handle_request")
        .args(["--budget", "2000"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let bundle: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(bundle["seed"]["name"], "handle_request");
    assert_eq!(bundle["callees"][0]["id"], "app/http.py::parse_headers");
}

#[test]
fn test_signature_prints_json() {
    let project = sample_project();
    trellis_cmd()
        .arg("signature")
        .arg(project.path())
        .arg("app/http.py::parse_headers")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"name\": \"parse_headers\""))
        .stdout(predicate::str::contains("\"request\""));
}

#[test]
fn test_unknown_node_fails() {
    let project = sample_project();
    trellis_cmd()
        .arg("expand")
        .arg(project.path())
        .arg("app/server.py::missing")
        .assert()
        .failure()
        .stderr(predicate::str::contains("app/server.py::missing"));
}

#[test]
fn test_invalid_config_fails() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.yml");
    fs::write(&path, "expansion:\n  bytes_per_token: 0\n").unwrap();

    trellis_cmd()
        .arg("--config")
        .arg(&path)
        .arg("index")
        .arg(sample_project().path())
        .assert()
        .failure();
}

#[test]
fn test_missing_directory_fails() {
    trellis_cmd()
        .arg("index")
        .arg("/definitely/not/a/dir")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Not a directory"));
}
