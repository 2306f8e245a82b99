//! # Harness Archive Format Abstraction (`common::archive::format`)
//!
//! File: cli/src/common/archive/format.rs
//!
//! ## Overview
//!
//! The seam between the archive engine and the individual container formats.
//!
//! - `Archiver`: a format (tar, tar.gz, zip). Opens one `FormatSession` per archive
//!   operation on a caller-provided sink.
//! - `FormatSession`: the open writer. Receives members in traversal order and is
//!   finished exactly once, after the last member; `finish` consumes the session,
//!   so a second close or a write after close does not compile.
//!
//! A session that hits an error is `abort`ed instead of finished. The underlying
//! `tar` and `zip` writers finalize themselves on drop, so every session writes
//! through a `Guarded` sink; sealing it makes the drop-time trailer write fail and
//! a failed archive never ends in a valid end-of-archive marker or central
//! directory.
//!
//! File bodies are handed over as `FileBody`, which keeps in-memory bytes apart
//! from single-pass readers. Formats that need the size up front (tar) buffer a
//! reader fully; formats that do not (zip) copy it straight through.
//!
use crate::core::error::Result;
use chrono::{DateTime, Utc};
use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Header data shared by every member kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    /// Full archive path, '/'-separated.
    pub path: String,
    /// Used as modification time (and access/change time where the format has them).
    pub modified: DateTime<Utc>,
}

/// The body of a file member.
pub enum FileBody<'a> {
    /// Size known up front.
    Bytes(&'a [u8]),
    /// Single-pass reader of unknown size.
    Stream(&'a mut dyn Read),
}

/// One open archive being written.
pub trait FormatSession {
    /// Writes a regular file member.
    fn write_file(&mut self, member: &Member, body: FileBody<'_>) -> Result<()>;

    /// Writes a directory member. Its children follow as separate members.
    fn write_dir(&mut self, member: &Member) -> Result<()>;

    /// Writes the format's trailing metadata and flushes the sink.
    fn finish(self) -> Result<()>;

    /// Abandons the archive after a failure. Nothing more reaches the sink.
    fn abort(self);
}

/// A container format.
pub trait Archiver {
    type Session<W: Write>: FormatSession;

    /// Short name used in logs and on the command line.
    const NAME: &'static str;

    /// Opens a session writing to `sink`.
    fn open<W: Write>(sink: W) -> Self::Session<W>;
}

/// Shared switch that cuts a `Guarded` sink off from its writer.
#[derive(Debug, Clone, Default)]
pub struct Seal(Arc<AtomicBool>);

impl Seal {
    /// Wraps `inner` so that it stops accepting bytes once this seal is closed.
    pub fn guard<W: Write>(&self, inner: W) -> Guarded<W> {
        Guarded {
            inner,
            seal: self.clone(),
        }
    }

    pub fn close(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A sink that fails every write and flush after its `Seal` is closed.
#[derive(Debug)]
pub struct Guarded<W> {
    inner: W,
    seal: Seal,
}

impl<W> Guarded<W> {
    pub fn into_inner(self) -> W {
        self.inner
    }

    fn check(&self) -> io::Result<()> {
        if self.seal.is_closed() {
            return Err(io::Error::other("archive was aborted"));
        }
        Ok(())
    }
}

impl<W: Write> Write for Guarded<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.check()?;
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.check()?;
        self.inner.flush()
    }
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sealed_sink_rejects_writes() -> Result<()> {
        let seal = Seal::default();
        let mut sink = seal.guard(Vec::new());
        sink.write_all(b"head")?;
        seal.close();
        assert!(sink.write_all(b"tail").is_err());
        assert!(sink.flush().is_err());
        assert_eq!(sink.into_inner(), b"head");
        Ok(())
    }
}
