//! # Harness Debug Snapshots (`common::snapshot`)
//!
//! File: cli/src/common/snapshot.rs
//!
//! ## Overview
//!
//! Writes a zip of every participant's rendered files and captured log, for
//! post-mortem inspection of a run:
//!
//! ```text
//! <output_dir>/2024-03-01T12-00-00Z.zip
//! ├── client/
//! │   ├── Caddyfile
//! │   ├── Dockerfile
//! │   └── caddy.log
//! └── server/
//!     └── ...
//! ```
//!
//! The file name is the RFC 3339 UTC timestamp of the snapshot with ':' replaced
//! by '-', so it is a valid file name on every platform.
//!
use crate::common::archive::{Archive, Zip};
use crate::common::participant::Participant;
use crate::core::error::Result;
use anyhow::Context;
use chrono::{DateTime, Utc};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

/// File name of the snapshot taken at `now`.
pub fn snapshot_file_name(now: DateTime<Utc>) -> String {
    format!("{}.zip", now.format("%Y-%m-%dT%H-%M-%SZ"))
}

/// Writes the debug zip for `participants` into `output_dir` and returns its path.
///
/// # Errors
///
/// Returns an `Err` if the directory or file cannot be created or the archive
/// cannot be written.
#[instrument(skip(participants), fields(participants = participants.len()))]
pub fn write_debug_zip(output_dir: &Path, now: DateTime<Utc>, participants: &[Participant]) -> Result<PathBuf> {
    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory '{}'", output_dir.display()))?;
    let path = output_dir.join(snapshot_file_name(now));
    let file = File::create(&path)
        .with_context(|| format!("Failed to create snapshot file '{}'", path.display()))?;

    let entries = participants.iter().map(|p| p.snapshot_entry(now)).collect();
    Archive::<Zip>::new()
        .write_to(BufWriter::new(file), entries)
        .with_context(|| format!("Failed to write snapshot '{}'", path.display()))?;

    info!("Wrote debug snapshot to {}", path.display());
    Ok(path)
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::io::Read;
    use tempfile::tempdir;
    use zip::ZipArchive;

    #[test]
    fn test_snapshot_file_name() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 5).unwrap();
        assert_eq!(snapshot_file_name(now), "2024-03-01T12-00-05Z.zip");
    }

    #[test]
    fn test_write_debug_zip_layout() -> Result<()> {
        let temp_dir = tempdir()?;
        let output_dir = temp_dir.path().join("nested/test_output");
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let client = Participant::new("client", b"FROM a\n".to_vec(), b":80\n".to_vec(), vec![], now);
        let server = Participant::new("server", b"FROM b\n".to_vec(), b":81\n".to_vec(), vec![], now);
        server.logs().append(b"serving\n");

        let path = write_debug_zip(&output_dir, now, &[client, server])?;
        assert_eq!(path, output_dir.join("2024-03-01T12-00-00Z.zip"));

        let mut archive = ZipArchive::new(File::open(&path)?)?;
        let names: Vec<String> = (0..archive.len())
            .map(|i| -> Result<String> { Ok(archive.by_index(i)?.name().to_string()) })
            .collect::<Result<_>>()?;
        let names: Vec<&str> = names.iter().map(|n| n.trim_end_matches('/')).collect();
        assert_eq!(
            names,
            [
                "client",
                "client/Caddyfile",
                "client/Dockerfile",
                "client/caddy.log",
                "server",
                "server/Caddyfile",
                "server/Dockerfile",
                "server/caddy.log",
            ]
        );

        let mut log = String::new();
        archive.by_name("server/caddy.log")?.read_to_string(&mut log)?;
        assert_eq!(log, "serving\n");
        Ok(())
    }

    #[test]
    fn test_write_debug_zip_with_no_participants() -> Result<()> {
        let temp_dir = tempdir()?;
        let path = write_debug_zip(temp_dir.path(), Utc::now(), &[])?;
        let archive = ZipArchive::new(File::open(&path)?)?;
        assert_eq!(archive.len(), 0);
        Ok(())
    }
}
