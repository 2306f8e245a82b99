//! # Harness Pack Command
//!
//! File: cli/src/commands/pack.rs
//!
//! ## Overview
//!
//! `harness pack <DIR> --output <FILE> [--format tar|tar-gz|zip] [--stream]`
//!
//! Builds an entry tree from `DIR` (hidden files skipped, files streamed from
//! disk) and archives it into `FILE`.
//!
//! - Without `--stream` the archive is written straight into the file on a
//!   blocking worker.
//! - With `--stream` the streaming producer is used and its read end is copied
//!   into the file asynchronously, the way a build-context consumer would read it.
//!
//! Both paths produce identical bytes.
//!
use crate::common::archive::{self, Archive, Archiver, Entry, Tar, TarGz, Zip};
use crate::core::error::Result;
use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// Archive format selectable on the command line.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum FormatArg {
    Tar,
    TarGz,
    Zip,
}

/// Arguments for `harness pack`.
#[derive(Parser, Debug)]
pub struct PackArgs {
    /// Directory whose contents are archived (the directory itself is not a member).
    pub dir: PathBuf,

    /// Archive format.
    #[arg(short, long, value_enum, default_value_t = FormatArg::Tar)]
    pub format: FormatArg,

    /// File to write the archive to.
    #[arg(short, long)]
    pub output: PathBuf,

    /// Produce the archive in the background and copy it from the stream.
    #[arg(long)]
    pub stream: bool,
}

/// Handles `harness pack`.
///
/// # Errors
///
/// Returns an `Err` if `dir` is not a directory, if it cannot be read, or if the
/// archive cannot be written.
pub async fn handle_pack(args: PackArgs) -> Result<()> {
    debug!("Pack args: {:?}", args);
    if !args.dir.is_dir() {
        bail!("Not a directory: {}", args.dir.display());
    }
    let entries = archive::entry::from_path(&args.dir)
        .with_context(|| format!("Failed to read '{}'", args.dir.display()))?;

    let (format, written) = match args.format {
        FormatArg::Tar => (Tar::NAME, pack::<Tar>(entries, &args.output, args.stream).await?),
        FormatArg::TarGz => (TarGz::NAME, pack::<TarGz>(entries, &args.output, args.stream).await?),
        FormatArg::Zip => (Zip::NAME, pack::<Zip>(entries, &args.output, args.stream).await?),
    };

    info!("Packed '{}' into '{}'", args.dir.display(), args.output.display());
    println!(
        "✅ Wrote {} archive ({} bytes): {}",
        format,
        written,
        args.output.display()
    );
    Ok(())
}

/// Writes `entries` as format `A` into `output`. Returns the archive size.
async fn pack<A: Archiver + 'static>(entries: Vec<Entry>, output: &Path, stream: bool) -> Result<u64> {
    if stream {
        let mut reader = Archive::<A>::new().stream(entries)?;
        let mut file = tokio::fs::File::create(output)
            .await
            .with_context(|| format!("Failed to create '{}'", output.display()))?;
        let written = tokio::io::copy(&mut reader, &mut file)
            .await
            .with_context(|| format!("Failed to stream {} archive into '{}'", A::NAME, output.display()))?;
        file.flush().await.context("Failed to flush archive file")?;
        return Ok(written);
    }

    let output = output.to_path_buf();
    tokio::task::spawn_blocking(move || -> Result<u64> {
        let file = File::create(&output)
            .with_context(|| format!("Failed to create '{}'", output.display()))?;
        Archive::<A>::new().write_to(BufWriter::new(file), entries)?;
        let written = std::fs::metadata(&output)
            .with_context(|| format!("Failed to stat '{}'", output.display()))?
            .len();
        Ok(written)
    })
    .await
    .context("Archive worker failed")?
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
        args: PackArgs,
    }

    #[test]
    fn test_pack_args_defaults() {
        let cli = TestCli::try_parse_from(["pack", "site", "--output", "site.tar"]).unwrap();
        assert_eq!(cli.args.dir, PathBuf::from("site"));
        assert_eq!(cli.args.format, FormatArg::Tar);
        assert_eq!(cli.args.output, PathBuf::from("site.tar"));
        assert!(!cli.args.stream);
    }

    #[test]
    fn test_pack_args_all_flags() {
        let cli = TestCli::try_parse_from(["pack", "site", "-f", "tar-gz", "-o", "out.tgz", "--stream"])
            .unwrap();
        assert_eq!(cli.args.format, FormatArg::TarGz);
        assert!(cli.args.stream);
    }

    #[test]
    fn test_pack_args_reject_unknown_format() {
        assert!(TestCli::try_parse_from(["pack", "site", "-f", "rar", "-o", "x"]).is_err());
        assert!(TestCli::try_parse_from(["pack", "site"]).is_err());
    }

    fn fixture_dir() -> Result<tempfile::TempDir> {
        let temp_dir = tempdir()?;
        fs::write(temp_dir.path().join("Dockerfile"), "FROM x\n")?;
        fs::create_dir(temp_dir.path().join("app"))?;
        fs::write(temp_dir.path().join("app/main.go"), "package main")?;
        Ok(temp_dir)
    }

    #[tokio::test]
    async fn test_streamed_and_direct_outputs_match() -> Result<()> {
        let source = fixture_dir()?;
        let out = tempdir()?;
        for format in [FormatArg::Tar, FormatArg::TarGz, FormatArg::Zip] {
            let direct = out.path().join("direct");
            let streamed = out.path().join("streamed");
            for (output, stream) in [(&direct, false), (&streamed, true)] {
                handle_pack(PackArgs {
                    dir: source.path().to_path_buf(),
                    format,
                    output: output.clone(),
                    stream,
                })
                .await?;
            }
            // Both runs read the same file metadata, so the bytes must agree.
            assert_eq!(fs::read(&direct)?, fs::read(&streamed)?, "{:?}", format);
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_pack_rejects_missing_dir() {
        let out = tempdir().unwrap();
        let result = handle_pack(PackArgs {
            dir: PathBuf::from("/definitely/not/here"),
            format: FormatArg::Zip,
            output: out.path().join("x.zip"),
            stream: false,
        })
        .await;
        assert!(result.is_err());
    }
}
