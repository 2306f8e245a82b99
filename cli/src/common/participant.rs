//! # Harness Participants (`common::participant`)
//!
//! File: cli/src/common/participant.rs
//!
//! ## Overview
//!
//! A `Participant` is one logical role in a run (for example `client` or
//! `server`). It owns everything needed to build and inspect its container:
//!
//! - the rendered `Dockerfile`,
//! - the opaque `Caddyfile` bytes shipped into the image,
//! - the ports it exposes,
//! - a `LogBuffer` collecting the container's output while it runs.
//!
//! The build context handed to Docker is a plain tar holding exactly the
//! `Dockerfile` and the `Caddyfile`. The same files, plus the captured log, form
//! the participant's directory in a debug snapshot.
//!
use crate::common::archive::{Archive, Entry, Tar};
use crate::core::config::{Config, ParticipantConfig};
use crate::core::error::Result;
use crate::core::templating::{DockerfileContext, Templates};
use anyhow::Context;
use chrono::{DateTime, Utc};
use std::fs;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, instrument};

pub const DOCKERFILE_NAME: &str = "Dockerfile";
pub const CADDYFILE_NAME: &str = "Caddyfile";
pub const LOG_NAME: &str = "caddy.log";

/// Thread-safe, append-only buffer of container output. Clones share storage.
#[derive(Debug, Clone, Default)]
pub struct LogBuffer {
    inner: Arc<Mutex<Vec<u8>>>,
}

impl LogBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, chunk: &[u8]) {
        self.lock().extend_from_slice(chunk);
    }

    /// A copy of everything appended so far.
    pub fn contents(&self) -> Vec<u8> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // A panic while appending cannot leave the Vec half-written.
    fn lock(&self) -> MutexGuard<'_, Vec<u8>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// One role in a run, ready to be packed and started.
#[derive(Debug, Clone)]
pub struct Participant {
    name: String,
    dockerfile: Vec<u8>,
    caddyfile: Vec<u8>,
    ports: Vec<String>,
    rendered_at: DateTime<Utc>,
    logs: LogBuffer,
}

impl Participant {
    /// Assembles a participant from already-prepared parts.
    pub fn new(
        name: impl Into<String>,
        dockerfile: Vec<u8>,
        caddyfile: Vec<u8>,
        ports: Vec<String>,
        rendered_at: DateTime<Utc>,
    ) -> Self {
        Self {
            name: name.into(),
            dockerfile,
            caddyfile,
            ports,
            rendered_at,
            logs: LogBuffer::new(),
        }
    }

    /// Renders the participant's Dockerfile and reads its configuration file.
    ///
    /// # Errors
    ///
    /// Returns an `Err` if rendering fails or `config_file` cannot be read.
    #[instrument(skip_all, fields(participant = %cfg.name))]
    pub fn from_config(cfg: &ParticipantConfig, templates: &Templates, now: DateTime<Utc>) -> Result<Self> {
        let dockerfile = templates
            .render_dockerfile(&DockerfileContext::from(cfg))
            .with_context(|| format!("Failed to render Dockerfile for participant '{}'", cfg.name))?;
        let caddyfile = match &cfg.config_file {
            Some(path) => fs::read(path).with_context(|| {
                format!("Failed to read config file '{}' for participant '{}'", path, cfg.name)
            })?,
            None => {
                debug!("Participant '{}' has no config file, shipping an empty one", cfg.name);
                Vec::new()
            }
        };
        Ok(Self::new(cfg.name.clone(), dockerfile, caddyfile, cfg.ports.clone(), now))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dockerfile(&self) -> &[u8] {
        &self.dockerfile
    }

    pub fn caddyfile(&self) -> &[u8] {
        &self.caddyfile
    }

    pub fn ports(&self) -> &[String] {
        &self.ports
    }

    pub fn logs(&self) -> &LogBuffer {
        &self.logs
    }

    /// Tag of the image built for this participant.
    pub fn image_tag(&self) -> String {
        format!("harness-{}:latest", self.name)
    }

    /// The tar build context: `Dockerfile` and `Caddyfile` at the root.
    pub fn build_context(&self) -> Result<Vec<u8>> {
        let entries = vec![
            Entry::file(DOCKERFILE_NAME, self.rendered_at, self.dockerfile.clone()),
            Entry::file(CADDYFILE_NAME, self.rendered_at, self.caddyfile.clone()),
        ];
        let mut context = Vec::new();
        Archive::<Tar>::new()
            .write_to(&mut context, entries)
            .with_context(|| format!("Failed to pack build context for '{}'", self.name))?;
        Ok(context)
    }

    /// This participant's directory in a debug snapshot.
    pub fn snapshot_entry(&self, now: DateTime<Utc>) -> Entry {
        Entry::dir(
            self.name.clone(),
            now,
            vec![
                Entry::file(CADDYFILE_NAME, now, self.caddyfile.clone()),
                Entry::file(DOCKERFILE_NAME, now, self.dockerfile.clone()),
                Entry::file(LOG_NAME, now, self.logs.contents()),
            ],
        )
    }
}

/// Renders every configured participant, in configuration order.
///
/// # Errors
///
/// Returns an `Err` if the templates cannot be loaded or any participant fails
/// to render.
pub fn load_all(cfg: &Config, now: DateTime<Utc>) -> Result<Vec<Participant>> {
    let templates = Templates::load(&cfg.templates)?;
    cfg.participants
        .iter()
        .map(|p| Participant::from_config(p, &templates, now))
        .collect()
}
