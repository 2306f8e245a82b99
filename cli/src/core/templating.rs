//! # Harness Templating
//!
//! File: cli/src/core/templating.rs
//!
//! ## Overview
//!
//! Renders the Dockerfile each participant's image is built from. The template
//! source is a configuration value: the built-in `DEFAULT_DOCKERFILE_TEMPLATE`, or
//! the file named by `[templates] dockerfile` in `harness.toml`. `Templates` is
//! loaded once at start-up and passed to whoever renders.
//!
//! Participant configuration text (the `Caddyfile`) is *not* rendered here; it is
//! supplied already rendered and treated as opaque bytes.
//!
//! ## Template Variables
//!
//! - `caddy`: base image version tag.
//! - `mods`: list of module paths compiled into the binary.
//!
use crate::core::config::{ParticipantConfig, TemplatesConfig};
use crate::core::error::{HarnessError, Result};
use anyhow::{anyhow, Context};
use serde::Serialize;
use std::fs;
use tera::Tera;
use tracing::{debug, info};

/// Built-in Dockerfile template used when no override is configured.
pub const DEFAULT_DOCKERFILE_TEMPLATE: &str = r#"FROM caddy:{{ caddy }}-builder AS builder
RUN xcaddy build{% for module in mods %} \
    --with {{ module }}{% endfor %}

FROM caddy:{{ caddy }}
COPY --from=builder /usr/bin/caddy /usr/bin/caddy
COPY Caddyfile /etc/caddy/Caddyfile
"#;

const DOCKERFILE_TEMPLATE_NAME: &str = "Dockerfile";

/// Variables available to the Dockerfile template.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct DockerfileContext {
    pub caddy: String,
    pub mods: Vec<String>,
}

impl From<&ParticipantConfig> for DockerfileContext {
    fn from(participant: &ParticipantConfig) -> Self {
        Self {
            caddy: participant.caddy.clone(),
            mods: participant.mods.clone(),
        }
    }
}

/// Parsed templates, ready to render.
#[derive(Debug)]
pub struct Templates {
    tera: Tera,
}

impl Templates {
    /// Parses the configured templates, falling back to the built-in ones.
    ///
    /// # Errors
    ///
    /// Returns an `Err` if a configured template file cannot be read or if any
    /// template fails to parse.
    pub fn load(cfg: &TemplatesConfig) -> Result<Self> {
        let source = match &cfg.dockerfile {
            Some(path) => {
                info!("Loading Dockerfile template from '{}'", path);
                fs::read_to_string(path)
                    .with_context(|| format!("Failed to read Dockerfile template '{}'", path))?
            }
            None => {
                debug!("Using built-in Dockerfile template.");
                DEFAULT_DOCKERFILE_TEMPLATE.to_string()
            }
        };
        Self::from_source(&source)
    }

    /// Parses a Dockerfile template given as text.
    pub fn from_source(dockerfile: &str) -> Result<Self> {
        let mut tera = Tera::default();
        tera.add_raw_template(DOCKERFILE_TEMPLATE_NAME, dockerfile)
            .map_err(|e| {
                anyhow!(HarnessError::Template { source: e })
                    .context("Failed to parse Dockerfile template")
            })?;
        Ok(Self { tera })
    }

    /// Renders the Dockerfile for one participant.
    pub fn render_dockerfile(&self, ctx: &DockerfileContext) -> Result<Vec<u8>> {
        let tera_context = tera::Context::from_serialize(ctx).map_err(|e| {
            anyhow!(HarnessError::Template { source: e })
                .context("Failed to create Tera context for Dockerfile")
        })?;
        let rendered = self
            .tera
            .render(DOCKERFILE_TEMPLATE_NAME, &tera_context)
            .map_err(|e| {
                anyhow!(HarnessError::Template { source: e })
                    .context("Tera rendering failed for Dockerfile template")
            })?;
        Ok(rendered.into_bytes())
    }
}
