//! # Harness Docker Networks
//!
//! File: cli/src/common/docker/network.rs
//!
//! ## Overview
//!
//! An internal, attachable bridge network that connects the participants of one
//! run and nothing else. Creation is bounded by the starting scope, removal by
//! the terminating scope.
//!
use crate::common::lifecycle::Scope;
use crate::core::error::{HarnessError, Result};
use anyhow::{anyhow, Context};
use bollard::network::CreateNetworkOptions;
use bollard::Docker;
use tracing::{info, instrument, warn};

/// A Docker network owned by this run.
#[derive(Debug, Clone)]
pub struct Network {
    docker: Docker,
    name: String,
}

impl Network {
    /// Creates an internal network named `name`.
    ///
    /// # Errors
    ///
    /// Returns `Cancelled`/`DeadlineExceeded` if `scope` ends first, or
    /// `HarnessError::DockerApi` if Docker refuses (e.g. the name is taken).
    #[instrument(skip(docker, scope), fields(phase = %scope.phase()))]
    pub async fn create_internal(docker: &Docker, scope: &Scope, name: &str) -> Result<Self> {
        let options = CreateNetworkOptions {
            name: name.to_string(),
            check_duplicate: true,
            internal: true,
            attachable: true,
            ..Default::default()
        };
        let response = scope
            .run(async {
                docker
                    .create_network(options)
                    .await
                    .map_err(|e| anyhow!(HarnessError::DockerApi { source: e }))
            })
            .await
            .with_context(|| format!("Failed to create network '{}'", name))?;
        info!("Created network '{}' ({:?})", name, response.id);
        Ok(Self {
            docker: docker.clone(),
            name: name.to_string(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Removes the network. A network that is already gone counts as removed.
    #[instrument(skip(self, scope), fields(network = %self.name, phase = %scope.phase()))]
    pub async fn remove(self, scope: &Scope) -> Result<()> {
        let outcome = scope
            .run(async {
                match self.docker.remove_network(&self.name).await {
                    Ok(()) => Ok(()),
                    Err(bollard::errors::Error::DockerResponseServerError {
                        status_code: 404, ..
                    }) => {
                        warn!("Network '{}' was already removed.", self.name);
                        Ok(())
                    }
                    Err(e) => Err(anyhow!(HarnessError::DockerApi { source: e })),
                }
            })
            .await;
        outcome.with_context(|| format!("Failed to remove network '{}'", self.name))?;
        info!("Removed network '{}'", self.name);
        Ok(())
    }
}
