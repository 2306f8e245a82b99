//! # Harness Common Utilities (`common`)
//!
//! File: cli/src/common/mod.rs
//!
//! ## Overview
//!
//! Shared building blocks used by the command handlers (`commands::`):
//!
//! - **`archive`**: the archive engine (tar, tar.gz, zip; sync and streaming).
//! - **`lifecycle`**: deadline/cancellation scopes and the phased context that
//!   splits a run into starting and terminating phases.
//! - **`participant`**: one role in a run, its rendered files and captured logs.
//! - **`snapshot`**: the debug zip of all participants.
//! - **`docker`**: networks and container fixtures over `bollard`.
//!

/// Tree-to-archive serialization.
pub mod archive;
/// Containers and networks, bounded by lifecycle scopes.
pub mod docker;
/// Phased deadlines and cancellation.
pub mod lifecycle;
/// Participants and their build contexts.
pub mod participant;
/// Debug snapshots.
pub mod snapshot;
