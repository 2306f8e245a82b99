//! # Harness Snapshot Command
//!
//! File: cli/src/commands/snapshot.rs
//!
//! ## Overview
//!
//! `harness snapshot [--config FILE]`
//!
//! Renders every configured participant and writes the debug zip into the
//! configured output directory without starting any container. The captured logs
//! in this zip are therefore empty; it is a quick way to inspect exactly what
//! `harness up` would build.
//!
use crate::common::{participant, snapshot};
use crate::core::config;
use crate::core::error::Result;
use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Arguments for `harness snapshot`.
#[derive(Parser, Debug)]
pub struct SnapshotArgs {
    /// Configuration file. Defaults to the nearest `harness.toml`.
    #[arg(short, long, env = "HARNESS_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Handles `harness snapshot`.
pub async fn handle_snapshot(args: SnapshotArgs) -> Result<()> {
    debug!("Snapshot args: {:?}", args);
    let cfg = config::load_config(args.config.as_deref()).context("Failed to load harness configuration")?;
    let now = Utc::now();
    let participants = participant::load_all(&cfg, now)?;
    let path = snapshot::write_debug_zip(Path::new(&cfg.output.directory), now, &participants)?;
    println!(
        "✅ Wrote snapshot of {} participant(s): {}",
        participants.len(),
        path.display()
    );
    Ok(())
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[derive(Parser, Debug)]
    struct TestCli {
        #[command(flatten)]
        args: SnapshotArgs,
    }

    #[test]
    fn test_snapshot_args() {
        let cli = TestCli::try_parse_from(["snapshot", "--config", "ci.toml"]).unwrap();
        assert_eq!(cli.args.config, Some(PathBuf::from("ci.toml")));
    }

    #[tokio::test]
    async fn test_handle_snapshot_writes_zip() -> Result<()> {
        let temp_dir = tempdir()?;
        let output_dir = temp_dir.path().join("out");
        let caddyfile = temp_dir.path().join("server.Caddyfile");
        fs::write(&caddyfile, ":80\n")?;
        let config_path = temp_dir.path().join("harness.toml");
        fs::write(
            &config_path,
            format!(
                "[output]\ndirectory = {:?}\n\n[[participants]]\nname = \"server\"\nconfig_file = {:?}\n",
                output_dir.to_string_lossy(),
                caddyfile.to_string_lossy()
            ),
        )?;

        handle_snapshot(SnapshotArgs {
            config: Some(config_path),
        })
        .await?;

        let written: Vec<_> = fs::read_dir(&output_dir)?.collect::<std::io::Result<_>>()?;
        assert_eq!(written.len(), 1);
        assert_eq!(written[0].path().extension().and_then(|e| e.to_str()), Some("zip"));
        Ok(())
    }
}
