//! # Harness Configuration System
//!
//! File: cli/src/core/config.rs
//!
//! ## Overview
//!
//! This module loads, expands and validates `harness.toml`. The configuration is
//! loaded once at process start and passed by parameter to whatever needs it;
//! there is no process-wide configuration state, so tests can hand in fixtures
//! built in code.
//!
//! ## Architecture
//!
//! - An explicit `--config` path wins.
//! - Otherwise `harness.toml` is searched from the current directory upwards,
//!   stopping at the first directory containing `.git`.
//! - Otherwise built-in defaults are used.
//!
//! After loading, paths are expanded (`~` to the home directory) and the result
//! is validated before use.
//!
//! ## Examples
//!
//! ```toml
//! [lifecycle]
//! starting_secs = 120
//! terminating_secs = 120
//!
//! [output]
//! directory = "~/harness_output"
//!
//! [[participants]]
//! name = "server"
//! caddy = "2.7.6"
//! mods = ["github.com/point-c/caddy"]
//! config_file = "server.Caddyfile"
//! ports = ["80/tcp"]
//! ```
//!
use crate::core::error::{HarnessError, Result};
use anyhow::{anyhow, Context};
use serde::Deserialize;
use std::collections::HashSet;
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::{debug, info};

/// Represents the main configuration structure, loaded from `harness.toml`.
#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub lifecycle: LifecycleConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub templates: TemplatesConfig,
    #[serde(default)]
    pub participants: Vec<ParticipantConfig>,
}

/// Time budgets for the phased lifecycle context.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LifecycleConfig {
    /// Budget for all setup calls (network/container creation, readiness).
    #[serde(default = "default_phase_secs")]
    pub starting_secs: u64,
    /// Budget for all teardown calls (stop/remove).
    #[serde(default = "default_phase_secs")]
    pub terminating_secs: u64,
    /// Whole-run budget used when no explicit deadline is given.
    #[serde(default = "default_run_timeout_secs")]
    pub run_timeout_secs: u64,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            starting_secs: default_phase_secs(),
            terminating_secs: default_phase_secs(),
            run_timeout_secs: default_run_timeout_secs(),
        }
    }
}

/// Where debug snapshots are written.
#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    /// Output directory (can use ~). Will be expanded.
    #[serde(default = "default_output_dir")]
    pub directory: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_dir(),
        }
    }
}

/// Template sources. Unset entries fall back to the built-in templates.
#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct TemplatesConfig {
    /// Path to a Dockerfile template (Tera syntax), relative to the config file.
    pub dockerfile: Option<String>,
}

/// One logical role in the run (e.g. client or server), built into one container.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ParticipantConfig {
    /// Container, hostname and snapshot directory name.
    pub name: String,
    /// Version tag of the base image.
    #[serde(default = "default_caddy_version")]
    pub caddy: String,
    /// Modules compiled into the image.
    #[serde(default)]
    pub mods: Vec<String>,
    /// Already-rendered configuration text shipped as `Caddyfile`, relative to the
    /// config file.
    pub config_file: Option<String>,
    /// Exposed ports, e.g. "80/tcp".
    #[serde(default)]
    pub ports: Vec<String>,
}

fn default_phase_secs() -> u64 {
    120
}
fn default_run_timeout_secs() -> u64 {
    5 * 60
}
fn default_output_dir() -> String {
    "test_output".to_string()
}
fn default_caddy_version() -> String {
    "2".to_string()
}

pub const CONFIG_FILENAME: &str = "harness.toml";

/// Loads the configuration from `explicit`, or from the nearest `harness.toml`,
/// or falls back to defaults. The result is expanded and validated.
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let found = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => find_config_path()?,
    };
    let mut config = match &found {
        Some(path) => {
            info!("Loading configuration from: {}", path.display());
            load_config_from_path(path)?
        }
        None => {
            debug!("No {} found, using defaults.", CONFIG_FILENAME);
            Config::default()
        }
    };
    expand_config_paths(&mut config, found.as_deref().and_then(Path::parent));
    validate_config(&config).context("Configuration validation failed")?;
    debug!("Final loaded configuration: {:?}", config);
    Ok(config)
}

fn find_config_path() -> Result<Option<PathBuf>> {
    let current_dir = std::env::current_dir().context("Failed to get current directory")?;
    let mut path: &Path = &current_dir;
    loop {
        let candidate = path.join(CONFIG_FILENAME);
        if candidate.is_file() {
            return Ok(Some(candidate));
        }
        if path.join(".git").is_dir() {
            debug!(
                "Found .git directory at {}, stopping config search.",
                path.display()
            );
            return Ok(None);
        }
        match path.parent() {
            Some(parent) => path = parent,
            None => return Ok(None),
        }
    }
}

pub fn load_config_from_path(path: &Path) -> Result<Config> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read configuration file: {}", path.display()))?;
    toml::from_str(&content)
        .with_context(|| format!("Failed to parse TOML from file: {}", path.display()))
}

/// Expands `~` everywhere. Relative input files (templates, participant config
/// files) are taken relative to `base`, the directory holding the config file.
/// The output directory stays relative to the working directory.
fn expand_config_paths(config: &mut Config, base: Option<&Path>) {
    config.output.directory = shellexpand::tilde(&config.output.directory).into_owned();
    if let Some(dockerfile) = &mut config.templates.dockerfile {
        *dockerfile = resolve_input(dockerfile, base);
    }
    for participant in &mut config.participants {
        if let Some(config_file) = &mut participant.config_file {
            *config_file = resolve_input(config_file, base);
        }
    }
}

fn resolve_input(path: &str, base: Option<&Path>) -> String {
    let expanded = shellexpand::tilde(path);
    match base {
        Some(base) if Path::new(expanded.as_ref()).is_relative() => {
            base.join(expanded.as_ref()).to_string_lossy().into_owned()
        }
        _ => expanded.into_owned(),
    }
}

fn validate_config(config: &Config) -> Result<()> {
    if config.lifecycle.starting_secs == 0 || config.lifecycle.terminating_secs == 0 {
        return Err(anyhow!(HarnessError::Config(
            "Lifecycle budgets must be greater than zero seconds.".to_string()
        )));
    }
    if config.lifecycle.run_timeout_secs == 0 {
        return Err(anyhow!(HarnessError::Config(
            "run_timeout_secs must be greater than zero.".to_string()
        )));
    }
    if config.output.directory.is_empty() {
        return Err(anyhow!(HarnessError::Config(
            "Output directory cannot be empty.".to_string()
        )));
    }

    let mut seen = HashSet::new();
    for participant in &config.participants {
        if participant.name.is_empty() || participant.name.contains('/') {
            return Err(anyhow!(HarnessError::Config(format!(
                "Invalid participant name '{}': must be non-empty and contain no '/'.",
                participant.name
            ))));
        }
        if !seen.insert(participant.name.as_str()) {
            return Err(anyhow!(HarnessError::Config(format!(
                "Duplicate participant name '{}'.",
                participant.name
            ))));
        }
        for port in &participant.ports {
            if !is_valid_port(port) {
                return Err(anyhow!(HarnessError::Config(format!(
                    "Invalid port '{}' for participant '{}'. Expected PORT or PORT/PROTO.",
                    port, participant.name
                ))));
            }
        }
    }
    Ok(())
}

fn is_valid_port(port: &str) -> bool {
    let (number, proto) = port.split_once('/').unwrap_or((port, "tcp"));
    number.parse::<u16>().is_ok_and(|n| n != 0) && matches!(proto, "tcp" | "udp" | "sctp")
}
