//! # Harness Up Command
//!
//! File: cli/src/commands/up.rs
//!
//! ## Overview
//!
//! `harness up [--config FILE] [--hold SECS]`
//!
//! Runs every configured participant through the phased lifecycle:
//!
//! 1. **Starting** (starting scope): create an internal network, then build and
//!    start one container per participant, in configuration order.
//! 2. **Hold**: wait `--hold` seconds, or until Ctrl-C / the run deadline when
//!    `--hold` is not given. Skipped if starting failed.
//! 3. **Snapshot**: write the debug zip, including whatever the containers logged.
//! 4. **Terminating** (terminating scope): stop and remove every container and
//!    the network. Entering this phase cancels anything still starting, and the
//!    phase gets its own full budget even if starting overran.
//!
//! Teardown is attempted for everything even when an earlier step failed; the
//! first error encountered is returned.
//!
//! Ctrl-C ends the starting phase or the hold early but never cancels the root
//! scope, so the terminating phase still has its budget to clean up.
//!
use crate::common::docker::fixture::remove_by_name;
use crate::common::docker::{connect_docker, Fixture, Network};
use crate::common::lifecycle::PhasedContext;
use crate::common::participant::{self, Participant};
use crate::common::snapshot;
use crate::core::config;
use crate::core::error::Result;
use anyhow::{anyhow, Context};
use bollard::Docker;
use chrono::Utc;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Arguments for `harness up`.
#[derive(Parser, Debug)]
pub struct UpArgs {
    /// Configuration file. Defaults to the nearest `harness.toml`.
    #[arg(short, long, env = "HARNESS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Seconds to keep the fixtures running. Without it, runs until Ctrl-C.
    #[arg(long)]
    pub hold: Option<u64>,
}

/// Everything brought up so far, for teardown.
#[derive(Default)]
struct Running {
    network: Option<Network>,
    fixtures: Vec<Fixture>,
}

/// Handles `harness up`.
pub async fn handle_up(args: UpArgs) -> Result<()> {
    debug!("Up args: {:?}", args);
    let cfg = config::load_config(args.config.as_deref()).context("Failed to load harness configuration")?;
    let participants = participant::load_all(&cfg, Utc::now())?;
    if participants.is_empty() {
        anyhow::bail!("No participants configured; nothing to bring up.");
    }

    let ctx = PhasedContext::from_config(&cfg.lifecycle);
    let interrupted = CancellationToken::new();
    let interrupt = tokio::spawn(watch_interrupt(interrupted.clone()));
    let docker = connect_docker().await?;
    let network_name = format!("harness-{}", std::process::id());

    let mut running = Running::default();
    let started = tokio::select! {
        result = start_all(&docker, &ctx, &participants, &network_name, &mut running) => result,
        _ = interrupted.cancelled() => Err(anyhow!("Interrupted while starting participants")),
    };
    match &started {
        Ok(()) => {
            println!("✅ Started {} participant(s) on network '{}'", participants.len(), network_name);
            hold(&ctx, args.hold, &interrupted).await;
        }
        Err(e) => error!("Starting participants failed: {:#}", e),
    }

    let snapshot = snapshot::write_debug_zip(Path::new(&cfg.output.directory), Utc::now(), &participants);
    if let Ok(path) = &snapshot {
        println!("📦 Debug snapshot: {}", path.display());
    }

    let torn_down = teardown(&docker, &ctx, &participants, running).await;
    interrupt.abort();

    started?;
    snapshot?;
    torn_down?;
    println!("✅ All participants stopped and removed.");
    Ok(())
}

async fn start_all(
    docker: &Docker,
    ctx: &PhasedContext,
    participants: &[Participant],
    network_name: &str,
    running: &mut Running,
) -> Result<()> {
    let scope = ctx.starting();
    info!("Starting {} participant(s), {:?} left", participants.len(), scope.remaining());
    let network = Network::create_internal(docker, scope, network_name).await?;
    let networks = std::slice::from_ref(running.network.insert(network));
    for participant in participants {
        let fixture = Fixture::start(docker, scope, participant, networks).await?;
        running.fixtures.push(fixture);
    }
    Ok(())
}

/// Cancels `interrupted` on Ctrl-C.
async fn watch_interrupt(interrupted: CancellationToken) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            warn!("Interrupt received, tearing down.");
            interrupted.cancel();
        }
        Err(e) => warn!("Failed to listen for interrupt: {}", e),
    }
}

async fn hold(ctx: &PhasedContext, hold: Option<u64>, interrupted: &CancellationToken) {
    let root = ctx.root();
    let held = async {
        match hold {
            Some(secs) => {
                info!("Holding fixtures for {}s", secs);
                tokio::time::sleep(Duration::from_secs(secs)).await;
            }
            None => {
                println!("Press Ctrl-C to tear down.");
                std::future::pending::<()>().await;
            }
        }
    };
    tokio::select! {
        _ = held => {}
        _ = interrupted.cancelled() => {}
        _ = root.cancelled() => warn!("Run deadline reached, tearing down."),
    }
}

async fn teardown(
    docker: &Docker,
    ctx: &PhasedContext,
    participants: &[Participant],
    running: Running,
) -> Result<()> {
    let scope = ctx.terminating();
    info!("Tearing down, {:?} left", scope.remaining());
    let mut first_error = None;
    let mut record = |result: Result<()>| {
        if let Err(e) = result {
            warn!("Teardown step failed: {:#}", e);
            first_error.get_or_insert(e);
        }
    };

    let started: Vec<String> = running.fixtures.iter().map(|f| f.name().to_string()).collect();
    for fixture in running.fixtures {
        record(fixture.stop(scope).await);
    }
    // A participant that failed mid-start may have left a container behind.
    for participant in participants.iter().filter(|p| !started.iter().any(|s| s == p.name())) {
        record(remove_by_name(docker, scope, participant.name()).await);
    }
    if let Some(network) = running.network {
        record(network.remove(scope).await);
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
