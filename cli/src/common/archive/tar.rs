//! # Harness TAR Archive Writers (`common::archive::tar`)
//!
//! File: cli/src/common/archive/tar.rs
//!
//! ## Overview
//!
//! Tar format writers, built on the `tar` crate:
//!
//! - **`Tar`**: a plain tarball, the shape Docker expects for a build context.
//! - **`TarGz`**: the same stream wrapped in a gzip encoder (`flate2`).
//!
//! Every header carries permission bits `0777` and the entry's timestamp as its
//! modification, access and change time. Tar needs each file's size before its
//! body, so a stream-backed file is read to the end into memory before its header
//! is written. In-memory bytes are written directly.
//!
//! Any I/O error while writing a header or body is returned immediately. The
//! caller then aborts the session, which keeps the end-of-archive marker (and
//! the gzip trailer) out of the output.
//!
use super::format::{Archiver, FileBody, FormatSession, Guarded, Member, Seal};
use crate::core::error::{HarnessError, Result};
use anyhow::{anyhow, Context};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::borrow::Cow;
use std::io::{Read, Write};
use tar::{EntryType, Header};

/// Permission bits for every member.
const MODE: u32 = 0o777;

/// Plain tar format.
#[derive(Debug, Clone, Copy, Default)]
pub struct Tar;

/// Gzip-compressed tar format.
#[derive(Debug, Clone, Copy, Default)]
pub struct TarGz;

impl Archiver for Tar {
    type Session<W: Write> = TarSession<Guarded<W>>;
    const NAME: &'static str = "tar";

    fn open<W: Write>(sink: W) -> TarSession<Guarded<W>> {
        let seal = Seal::default();
        TarSession {
            builder: tar::Builder::new(seal.guard(sink)),
            seal,
        }
    }
}

impl Archiver for TarGz {
    type Session<W: Write> = TarGzSession<W>;
    const NAME: &'static str = "tar-gz";

    fn open<W: Write>(sink: W) -> TarGzSession<W> {
        let seal = Seal::default();
        let encoder = GzEncoder::new(seal.guard(sink), Compression::default());
        TarGzSession {
            inner: TarSession {
                builder: tar::Builder::new(encoder),
                seal,
            },
        }
    }
}

/// An open tar archive writing into `W`.
pub struct TarSession<W: Write> {
    builder: tar::Builder<W>,
    // Closes the guarded sink underneath `W` on abort.
    seal: Seal,
}

impl<W: Write> TarSession<W> {
    /// Writes the end-of-archive marker and hands back the sink.
    fn into_sink(self) -> Result<W> {
        self.builder
            .into_inner()
            .context("Failed to finalize tar archive structure")
    }
}

impl<W: Write> FormatSession for TarSession<W> {
    fn write_file(&mut self, member: &Member, body: FileBody<'_>) -> Result<()> {
        let data: Cow<'_, [u8]> = match body {
            FileBody::Bytes(bytes) => Cow::Borrowed(bytes),
            FileBody::Stream(reader) => {
                let mut buffer = Vec::new();
                reader
                    .read_to_end(&mut buffer)
                    .with_context(|| format!("Failed to read content of '{}'", member.path))?;
                Cow::Owned(buffer)
            }
        };
        let mut header = header_for(member, EntryType::Regular, data.len() as u64)?;
        self.builder
            .append_data(&mut header, &member.path, data.as_ref())
            .with_context(|| format!("Failed to write tar member '{}'", member.path))
    }

    fn write_dir(&mut self, member: &Member) -> Result<()> {
        let mut header = header_for(member, EntryType::Directory, 0)?;
        self.builder
            .append_data(&mut header, &member.path, std::io::empty())
            .with_context(|| format!("Failed to write tar directory '{}'", member.path))
    }

    fn finish(self) -> Result<()> {
        let mut sink = self.into_sink()?;
        sink.flush().context("Failed to flush tar archive sink")
    }

    fn abort(self) {
        // `tar::Builder` appends the end-of-archive marker on drop.
        self.seal.close();
    }
}

/// An open gzip-compressed tar archive.
pub struct TarGzSession<W: Write> {
    inner: TarSession<GzEncoder<Guarded<W>>>,
}

impl<W: Write> FormatSession for TarGzSession<W> {
    fn write_file(&mut self, member: &Member, body: FileBody<'_>) -> Result<()> {
        self.inner.write_file(member, body)
    }

    fn write_dir(&mut self, member: &Member) -> Result<()> {
        self.inner.write_dir(member)
    }

    fn finish(self) -> Result<()> {
        let encoder = self.inner.into_sink()?;
        let mut sink = encoder
            .finish()
            .context("Failed to finish gzip compression stream")?;
        sink.flush().context("Failed to flush tar.gz archive sink")
    }

    fn abort(self) {
        self.inner.abort();
    }
}

fn header_for(member: &Member, kind: EntryType, size: u64) -> Result<Header> {
    let timestamp = u64::try_from(member.modified.timestamp()).map_err(|_| {
        anyhow!(HarnessError::Encoding(format!(
            "Timestamp of '{}' predates the Unix epoch",
            member.path
        )))
    })?;
    let mut header = Header::new_gnu();
    header.set_entry_type(kind);
    header.set_size(size);
    header.set_mode(MODE);
    header.set_mtime(timestamp);
    if let Some(gnu) = header.as_gnu_mut() {
        gnu.set_atime(timestamp);
        gnu.set_ctime(timestamp);
    }
    Ok(header)
}
