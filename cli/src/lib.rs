//! # Harness Library
//!
//! File: cli/src/lib.rs
//!
//! ## Overview
//!
//! Test-support harness for containerized fixtures:
//!
//! - an archive engine that serializes entry trees into tar, tar.gz or zip, either
//!   straight into a sink or through a background-produced stream
//!   (`common::archive`);
//! - a phased lifecycle context that gives startup and teardown their own
//!   deadline and cancellation scopes under one root deadline
//!   (`common::lifecycle`);
//! - participants, debug snapshots and Docker fixtures built on both
//!   (`common::participant`, `common::snapshot`, `common::docker`).
//!
//! The `harness` binary (`main.rs`) exposes these through the `commands` module.
//!
pub mod commands;
pub mod common;
pub mod core;
