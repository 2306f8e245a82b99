//! # Harness CLI Integration Test Common Helpers
//!
//! File: cli/tests/common.rs
//!
//! ## Overview
//!
//! Shared helpers for the integration tests in `cli/tests/`. Each test file
//! declares `mod common;` and uses `harness_cmd()` to run the compiled binary.
//!

// Not every test file uses every helper.
#![allow(dead_code)]

pub use assert_cmd::Command;
use std::fs;
use std::path::Path;

/// An `assert_cmd::Command` for the `harness` binary built for this test run.
///
/// `HARNESS_CONFIG` and `RUST_LOG` are cleared so the host environment cannot
/// change what the test sees.
pub fn harness_cmd() -> Command {
    let mut cmd = Command::cargo_bin("harness").expect("Failed to find harness binary for testing");
    cmd.env_remove("HARNESS_CONFIG").env_remove("RUST_LOG");
    cmd
}

/// Writes a small source tree: `Dockerfile`, `app/main.go`, `app/empty/` and a
/// hidden `.env` that archives must skip.
pub fn write_source_tree(root: &Path) {
    fs::write(root.join("Dockerfile"), "FROM x\n").expect("write Dockerfile");
    fs::create_dir_all(root.join("app/empty")).expect("create app/empty");
    fs::write(root.join("app/main.go"), "package main").expect("write main.go");
    fs::write(root.join(".env"), "SECRET=1").expect("write .env");
}
