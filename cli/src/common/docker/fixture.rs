//! # Harness Container Fixtures
//!
//! File: cli/src/common/docker/fixture.rs
//!
//! ## Overview
//!
//! A `Fixture` is the running container of one participant.
//!
//! ## Architecture
//!
//! `Fixture::start` performs, each step bounded by the caller's (starting) scope:
//!
//! 1. Build the image from the participant's tar build context.
//! 2. Create the container on the first network, named and hostnamed after the
//!    participant, exposing its ports.
//! 3. Connect it to any further networks.
//! 4. Start it, then spawn a task copying its output into the participant's
//!    `LogBuffer`.
//!
//! `Fixture::stop` stops the container (10 second grace period), lets the log
//! task drain, and force-removes the container, bounded by the caller's
//! (terminating) scope.
//!
use super::network::Network;
use crate::common::lifecycle::Scope;
use crate::common::participant::{LogBuffer, Participant};
use crate::core::error::{HarnessError, Result};
use anyhow::{anyhow, Context};
use bollard::container::{
    Config, CreateContainerOptions, LogsOptions, RemoveContainerOptions, StartContainerOptions,
    StopContainerOptions,
};
use bollard::image::BuildImageOptions;
use bollard::models::{BuildInfo, EndpointSettings, HostConfig};
use bollard::network::ConnectNetworkOptions;
use bollard::Docker;
use futures_util::stream::StreamExt;
use std::collections::HashMap;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// Grace period Docker gives the container before killing it.
const STOP_GRACE_SECS: i64 = 10;

/// How long `stop` waits for the last log lines after the container exits.
const LOG_DRAIN: Duration = Duration::from_secs(2);

/// A started participant container.
#[derive(Debug)]
pub struct Fixture {
    docker: Docker,
    name: String,
    log_stop: CancellationToken,
    log_task: JoinHandle<()>,
}

impl Fixture {
    /// Builds, creates and starts the container for `participant`.
    ///
    /// # Errors
    ///
    /// Returns `Cancelled`/`DeadlineExceeded` if `scope` ends first, or a Docker
    /// error from any step. A container created before the failure is left for
    /// the caller to remove by name.
    #[instrument(skip_all, fields(participant = %participant.name(), phase = %scope.phase()))]
    pub async fn start(
        docker: &Docker,
        scope: &Scope,
        participant: &Participant,
        networks: &[Network],
    ) -> Result<Self> {
        let name = participant.name().to_string();
        let tag = participant.image_tag();

        let context = participant.build_context()?;
        scope
            .run(build_image(docker, &tag, context))
            .await
            .with_context(|| format!("Failed to build image for '{}'", name))?;

        let config = container_config(participant, &tag, networks.first());
        let options = CreateContainerOptions {
            name: name.clone(),
            platform: None,
        };
        scope
            .run(async {
                docker
                    .create_container(Some(options), config)
                    .await
                    .map_err(|e| anyhow!(HarnessError::DockerApi { source: e }))
            })
            .await
            .with_context(|| format!("Failed to create container '{}'", name))?;
        debug!("Created container '{}'", name);

        for network in networks.iter().skip(1) {
            let connect = ConnectNetworkOptions {
                container: name.clone(),
                endpoint_config: EndpointSettings::default(),
            };
            scope
                .run(async {
                    docker
                        .connect_network(network.name(), connect)
                        .await
                        .map_err(|e| anyhow!(HarnessError::DockerApi { source: e }))
                })
                .await
                .with_context(|| {
                    format!("Failed to connect '{}' to network '{}'", name, network.name())
                })?;
        }

        scope
            .run(async {
                docker
                    .start_container(&name, None::<StartContainerOptions<String>>)
                    .await
                    .map_err(|e| anyhow!(HarnessError::DockerApi { source: e }))
            })
            .await
            .with_context(|| format!("Failed to start container '{}'", name))?;
        info!("Started container '{}'", name);

        let log_stop = CancellationToken::new();
        let log_task = tokio::spawn(copy_logs(
            docker.clone(),
            name.clone(),
            participant.logs().clone(),
            log_stop.clone(),
        ));

        Ok(Self {
            docker: docker.clone(),
            name,
            log_stop,
            log_task,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stops and removes the container.
    ///
    /// # Errors
    ///
    /// Returns `Cancelled`/`DeadlineExceeded` if `scope` ends first, or a Docker
    /// error. The log task is stopped on every path.
    #[instrument(skip_all, fields(container = %self.name, phase = %scope.phase()))]
    pub async fn stop(self, scope: &Scope) -> Result<()> {
        let Fixture {
            docker,
            name,
            log_stop,
            mut log_task,
        } = self;

        let stopped = scope.run(stop_container(&docker, &name)).await;
        if stopped.is_ok() && tokio::time::timeout(LOG_DRAIN, &mut log_task).await.is_ok() {
            debug!("Log stream of '{}' drained", name);
        }
        log_stop.cancel();
        stopped?;

        scope.run(remove_container(&docker, &name)).await?;
        info!("Removed container '{}'", name);
        Ok(())
    }
}

/// Force-removes the container called `name`, if it exists.
pub async fn remove_by_name(docker: &Docker, scope: &Scope, name: &str) -> Result<()> {
    scope.run(remove_container(docker, name)).await
}

async fn build_image(docker: &Docker, tag: &str, context: Vec<u8>) -> Result<()> {
    let options = BuildImageOptions {
        dockerfile: "Dockerfile".to_string(),
        t: tag.to_string(),
        rm: true,
        ..Default::default()
    };
    info!("Building image '{}'", tag);
    let mut build_stream = docker.build_image(options, None, Some(context.into()));
    while let Some(build_result) = build_stream.next().await {
        match build_result {
            Ok(BuildInfo {
                error: Some(err),
                error_detail,
                ..
            }) => {
                let detail = error_detail.and_then(|d| d.message).unwrap_or_default();
                error!("Build Error: {} - {}", err, detail);
                return Err(anyhow!(HarnessError::Docker(format!(
                    "Build of '{}' failed: {}. {}",
                    tag, err, detail
                ))));
            }
            Ok(BuildInfo {
                stream: Some(line), ..
            }) => debug!("{}", line.trim_end()),
            Ok(info) => debug!("Build event: {:?}", info),
            Err(e) => {
                return Err(anyhow!(HarnessError::DockerApi { source: e }))
                    .context("Failed to process build stream event");
            }
        }
    }
    info!("Built image '{}'", tag);
    Ok(())
}

fn container_config(participant: &Participant, tag: &str, network: Option<&Network>) -> Config<String> {
    let exposed_ports: HashMap<String, HashMap<(), ()>> = participant
        .ports()
        .iter()
        .map(|port| (exposed_port_key(port), HashMap::new()))
        .collect();
    Config {
        image: Some(tag.to_string()),
        hostname: Some(participant.name().to_string()),
        exposed_ports: if exposed_ports.is_empty() {
            None
        } else {
            Some(exposed_ports)
        },
        host_config: Some(HostConfig {
            network_mode: network.map(|n| n.name().to_string()),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Docker's "port/proto" key; the protocol defaults to tcp.
fn exposed_port_key(port: &str) -> String {
    match port.split_once('/') {
        Some((number, proto)) => format!("{}/{}", number, proto.to_lowercase()),
        None => format!("{}/tcp", port),
    }
}

async fn stop_container(docker: &Docker, name: &str) -> Result<()> {
    let options = StopContainerOptions { t: STOP_GRACE_SECS };
    match docker.stop_container(name, Some(options)).await {
        Ok(()) => Ok(()),
        Err(bollard::errors::Error::DockerResponseServerError {
            status_code: 304, ..
        }) => {
            info!("Container '{}' was already stopped.", name);
            Ok(())
        }
        Err(e) => Err(anyhow!(HarnessError::DockerApi { source: e })
            .context(format!("Failed to stop container '{}'", name))),
    }
}

async fn remove_container(docker: &Docker, name: &str) -> Result<()> {
    let options = RemoveContainerOptions {
        force: true,
        v: true,
        ..Default::default()
    };
    match docker.remove_container(name, Some(options)).await {
        Ok(()) => Ok(()),
        Err(bollard::errors::Error::DockerResponseServerError {
            status_code: 404, ..
        }) => {
            debug!("Container '{}' does not exist.", name);
            Ok(())
        }
        Err(e) => Err(anyhow!(HarnessError::DockerApi { source: e })
            .context(format!("Failed to remove container '{}'", name))),
    }
}

async fn copy_logs(docker: Docker, name: String, logs: LogBuffer, stop: CancellationToken) {
    let options = LogsOptions::<String> {
        follow: true,
        stdout: true,
        stderr: true,
        ..Default::default()
    };
    let mut log_stream = Box::pin(docker.logs(&name, Some(options)));
    loop {
        tokio::select! {
            _ = stop.cancelled() => break,
            next = log_stream.next() => match next {
                Some(Ok(output)) => logs.append(&output.into_bytes()),
                Some(Err(e)) => {
                    warn!("Error receiving log stream for container '{}': {}", name, e);
                    break;
                }
                None => break,
            },
        }
    }
    debug!("Stopped copying logs of '{}'", name);
}
