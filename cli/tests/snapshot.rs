//! # Harness CLI Snapshot Integration Tests
//!
//! File: cli/tests/snapshot.rs
//!
//! ## Overview
//!
//! Runs `harness snapshot` with a temporary `harness.toml` and checks the
//! written zip. Also covers configuration errors surfacing as a failed run.
//!

mod common;
use common::*;
use predicates::prelude::*;
use std::fs::{self, File};
use std::io::Read;
use std::path::Path;
use tempfile::tempdir;

fn write_config(dir: &Path, body: &str) -> std::path::PathBuf {
    let path = dir.join("harness.toml");
    fs::write(&path, body).unwrap();
    path
}

#[test]
fn test_snapshot_writes_participant_dirs() {
    let temp_dir = tempdir().unwrap();
    fs::write(temp_dir.path().join("client.Caddyfile"), ":8080\n").unwrap();
    let config = write_config(
        temp_dir.path(),
        r#"
[output]
directory = "out"

[[participants]]
name = "client"
caddy = "2.8"
mods = ["github.com/point-c/caddy"]
config_file = "client.Caddyfile"

[[participants]]
name = "server"
ports = ["80/tcp"]
"#,
    );

    harness_cmd()
        .current_dir(temp_dir.path())
        .args(["snapshot", "--config", config.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("2 participant(s)"));

    let written: Vec<_> = fs::read_dir(temp_dir.path().join("out"))
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    assert_eq!(written.len(), 1);

    let mut archive = zip::ZipArchive::new(File::open(&written[0]).unwrap()).unwrap();
    let mut caddyfile = String::new();
    archive
        .by_name("client/Caddyfile")
        .unwrap()
        .read_to_string(&mut caddyfile)
        .unwrap();
    assert_eq!(caddyfile, ":8080\n");

    let mut dockerfile = String::new();
    archive
        .by_name("client/Dockerfile")
        .unwrap()
        .read_to_string(&mut dockerfile)
        .unwrap();
    assert!(dockerfile.contains("caddy:2.8"));
    assert!(dockerfile.contains("--with github.com/point-c/caddy"));

    assert!(archive.by_name("server/caddy.log").is_ok());
}

#[test]
fn test_snapshot_found_by_search() {
    let temp_dir = tempdir().unwrap();
    fs::create_dir(temp_dir.path().join(".git")).unwrap();
    fs::create_dir(temp_dir.path().join("nested")).unwrap();
    write_config(
        temp_dir.path(),
        "[output]\ndirectory = \"snapshots\"\n\n[[participants]]\nname = \"solo\"\n",
    );

    harness_cmd()
        .current_dir(temp_dir.path().join("nested"))
        .arg("snapshot")
        .assert()
        .success();

    // Relative output directories resolve against the working directory.
    assert!(temp_dir.path().join("nested/snapshots").is_dir());
}

#[test]
fn test_searched_config_reads_config_file_beside_it() {
    let temp_dir = tempdir().unwrap();
    fs::create_dir(temp_dir.path().join(".git")).unwrap();
    fs::create_dir(temp_dir.path().join("nested")).unwrap();
    fs::write(temp_dir.path().join("solo.Caddyfile"), ":9000\n").unwrap();
    write_config(
        temp_dir.path(),
        "[output]\ndirectory = \"snapshots\"\n\n[[participants]]\nname = \"solo\"\nconfig_file = \"solo.Caddyfile\"\n",
    );

    harness_cmd()
        .current_dir(temp_dir.path().join("nested"))
        .arg("snapshot")
        .assert()
        .success();

    let written: Vec<_> = fs::read_dir(temp_dir.path().join("nested/snapshots"))
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    assert_eq!(written.len(), 1);
    let mut archive = zip::ZipArchive::new(File::open(&written[0]).unwrap()).unwrap();
    let mut caddyfile = String::new();
    archive
        .by_name("solo/Caddyfile")
        .unwrap()
        .read_to_string(&mut caddyfile)
        .unwrap();
    assert_eq!(caddyfile, ":9000\n");
}

#[test]
fn test_snapshot_rejects_duplicate_participants() {
    let temp_dir = tempdir().unwrap();
    let config = write_config(
        temp_dir.path(),
        "[[participants]]\nname = \"a\"\n\n[[participants]]\nname = \"a\"\n",
    );

    harness_cmd()
        .current_dir(temp_dir.path())
        .args(["snapshot", "-c", config.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Duplicate participant name"));
}

#[test]
fn test_snapshot_rejects_unknown_keys() {
    let temp_dir = tempdir().unwrap();
    let config = write_config(temp_dir.path(), "[lifecycle]\nstartup_secs = 10\n");

    harness_cmd()
        .current_dir(temp_dir.path())
        .args(["snapshot", "-c", config.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse TOML"));
}
