//! # Harness Docker Connection Helper
//!
//! File: cli/src/common/docker/connect.rs
//!
//! ## Overview
//!
//! Provides `connect_docker`, the single place that opens a `bollard` client to
//! the local Docker daemon. Fixtures and networks receive the client from their
//! caller instead of reconnecting, so one run shares one connection.
//!
use crate::core::error::{HarnessError, Result};
use anyhow::{anyhow, Context};
use bollard::Docker;
use tracing::instrument;

/// Connects to the local Docker daemon using `bollard`'s default socket/pipe.
///
/// # Errors
///
/// Returns an `Err` wrapping `HarnessError::DockerApi` if the daemon cannot be
/// reached.
#[instrument]
pub async fn connect_docker() -> Result<Docker> {
    Docker::connect_with_local_defaults()
        .map_err(|e| anyhow!(HarnessError::DockerApi { source: e }))
        .context("Failed to connect to Docker daemon. Is it running and accessible?")
}

/// A client pointed at a closed local port. It connects lazily, so code paths
/// that stop before any request can be tested without a daemon.
#[cfg(test)]
pub(crate) fn offline_docker() -> Result<Docker> {
    Docker::connect_with_http("http://127.0.0.1:9", 1, bollard::API_DEFAULT_VERSION)
        .map_err(|e| anyhow!(HarnessError::DockerApi { source: e }))
}
