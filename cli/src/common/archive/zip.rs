//! # Harness ZIP Archive Writer (`common::archive::zip`)
//!
//! File: cli/src/common/archive/zip.rs
//!
//! ## Overview
//!
//! Zip format writer, built on the `zip` crate. Used for debug snapshots.
//!
//! - Files are Deflate-compressed. Their content is copied straight into the
//!   member: zip records sizes after the data, so a stream-backed file is never
//!   buffered up front (unlike tar).
//! - Directories are stored (no compression) with the directory bit set in their
//!   mode and no content.
//! - Finishing the session writes the central directory. An aborted session
//!   never does: without it no zip reader accepts the partial output.
//!
//! The writer is opened in streaming mode (`ZipWriter::new_stream`), so the sink
//! only needs `Write`, not `Seek`. That is what lets a zip be produced into a pipe.
//!
use super::format::{Archiver, FileBody, FormatSession, Guarded, Member, Seal};
use crate::core::error::{HarnessError, Result};
use anyhow::{anyhow, Context};
use chrono::{Datelike, Timelike};
use std::io::{self, Write};
use tracing::debug;
use zip::write::{SimpleFileOptions, StreamWriter};
use zip::{CompressionMethod, DateTime, ZipWriter};

/// Permission bits for every member (the directory bit is added for directories).
const MODE: u32 = 0o777;

/// Zip format.
#[derive(Debug, Clone, Copy, Default)]
pub struct Zip;

impl Archiver for Zip {
    type Session<W: Write> = ZipSession<W>;
    const NAME: &'static str = "zip";

    fn open<W: Write>(sink: W) -> ZipSession<W> {
        let seal = Seal::default();
        ZipSession {
            writer: ZipWriter::new_stream(seal.guard(sink)),
            seal,
        }
    }
}

/// An open zip archive.
pub struct ZipSession<W: Write> {
    writer: ZipWriter<StreamWriter<Guarded<W>>>,
    seal: Seal,
}

impl<W: Write> FormatSession for ZipSession<W> {
    fn write_file(&mut self, member: &Member, body: FileBody<'_>) -> Result<()> {
        let options = options_for(member, CompressionMethod::Deflated);
        self.writer
            .start_file(member.path.as_str(), options)
            .map_err(|e| anyhow!(HarnessError::Zip { source: e }))
            .with_context(|| format!("Failed to create zip member '{}'", member.path))?;
        let copied = match body {
            FileBody::Bytes(mut bytes) => io::copy(&mut bytes, &mut self.writer),
            FileBody::Stream(reader) => io::copy(reader, &mut self.writer),
        }
        .with_context(|| format!("Failed to write content of zip member '{}'", member.path))?;
        debug!("Wrote {} bytes to zip member '{}'", copied, member.path);
        Ok(())
    }

    fn write_dir(&mut self, member: &Member) -> Result<()> {
        let options = options_for(member, CompressionMethod::Stored);
        self.writer
            .add_directory(member.path.as_str(), options)
            .map_err(|e| anyhow!(HarnessError::Zip { source: e }))
            .with_context(|| format!("Failed to create zip directory '{}'", member.path))
    }

    fn finish(self) -> Result<()> {
        let mut sink = self
            .writer
            .finish()
            .map_err(|e| anyhow!(HarnessError::Zip { source: e }))
            .context("Failed to write zip central directory")?;
        sink.flush().context("Failed to flush zip archive sink")
    }

    fn abort(self) {
        // `ZipWriter` writes the central directory on drop.
        self.seal.close();
    }
}

fn options_for(member: &Member, method: CompressionMethod) -> SimpleFileOptions {
    SimpleFileOptions::default()
        .compression_method(method)
        .last_modified_time(dos_time(member))
        .unix_permissions(MODE)
}

/// Zip stores MS-DOS timestamps (1980..=2107, 2-second resolution); times outside
/// that range are clamped to its nearest end.
fn dos_time(member: &Member) -> DateTime {
    let t = member.modified;
    let converted = u16::try_from(t.year()).ok().and_then(|year| {
        DateTime::from_date_and_time(
            year,
            t.month() as u8,
            t.day() as u8,
            t.hour() as u8,
            t.minute() as u8,
            t.second() as u8,
        )
        .ok()
    });
    match converted {
        Some(time) => time,
        None if t.year() >= 2108 => {
            debug!("Clamping modification time of '{}' to 2107", member.path);
            DateTime::from_date_and_time(2107, 12, 31, 23, 59, 58).unwrap_or_default()
        }
        None => {
            debug!("Clamping modification time of '{}' to 1980", member.path);
            DateTime::default()
        }
    }
}
