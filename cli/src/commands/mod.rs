//! # Harness Command Modules
//!
//! File: cli/src/commands/mod.rs
//!
//! ## Overview
//!
//! One module per top-level subcommand of the `harness` CLI. Each defines its
//! `clap` argument struct and an async `handle_*` function called from `main.rs`.
//!
//! - `pack`: archive a directory as tar, tar.gz or zip
//! - `snapshot`: render all participants and write the debug zip
//! - `up`: bring participants up on Docker, hold, snapshot, tear down
//!

/// Archives a directory, synchronously or through the streaming producer.
pub mod pack;
/// Writes a debug snapshot without touching Docker.
pub mod snapshot;
/// Runs all participants through the phased lifecycle.
pub mod up;
