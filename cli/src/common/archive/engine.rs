//! # Harness Archive Engine (`common::archive::engine`)
//!
//! File: cli/src/common/archive/engine.rs
//!
//! ## Overview
//!
//! Walks a tree of `Entry` values and drives one `Archiver` session to serialize
//! it. Traversal is depth-first pre-order: a directory's own member is written
//! before any of its descendants, and siblings keep the order they were given in.
//! Member order in the output is therefore exactly traversal order.
//!
//! ## Naming
//!
//! - `Naming::Accumulated` (default): every entry carries only its base name; the
//!   engine threads the '/'-joined path of enclosing directories through the
//!   recursion. A directory `a` holding `b.txt` yields member `a/b.txt`.
//! - `Naming::Qualified`: every entry already carries its full path and is written
//!   as-is, for callers that pre-compute nesting.
//!
//! ## Modes
//!
//! - [`Archive::write_to`]: synchronous-to-sink. Opens a session on the caller's
//!   sink, writes everything and finishes the session before returning.
//! - [`Archive::stream`]: streaming-producer. Returns a readable stream at once and
//!   writes into it from a background task (see `stream`).
//!
//! Any format error aborts the traversal immediately; nothing after the failing
//! member is attempted and the session is aborted rather than finished, so the
//! output never gains the format's closing metadata.
//!
use super::entry::{Content, Entry};
use super::format::{Archiver, FileBody, FormatSession, Member};
use crate::core::error::Result;
use anyhow::Context;
use std::io::Write;
use std::marker::PhantomData;
use tracing::{debug, instrument};

/// How member paths are derived from entry names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Naming {
    /// Names are base names; paths are accumulated through directories.
    #[default]
    Accumulated,
    /// Names are already full paths.
    Qualified,
}

/// An archive operation for format `A`.
#[derive(Debug)]
pub struct Archive<A> {
    naming: Naming,
    format: PhantomData<fn() -> A>,
}

impl<A> Clone for Archive<A> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<A> Copy for Archive<A> {}

impl<A: Archiver> Default for Archive<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: Archiver> Archive<A> {
    /// Path-accumulating archive.
    pub fn new() -> Self {
        Self::with_naming(Naming::Accumulated)
    }

    pub fn with_naming(naming: Naming) -> Self {
        Self {
            naming,
            format: PhantomData,
        }
    }

    pub fn naming(&self) -> Naming {
        self.naming
    }

    /// Serializes `entries` into `sink` and finishes the archive.
    ///
    /// # Arguments
    ///
    /// * `sink` - Where the archive bytes go. Pass `&mut buffer` to keep ownership.
    /// * `entries` - Top-level entries, in output order.
    ///
    /// # Errors
    ///
    /// Returns the first format or I/O error. The sink then holds a partial
    /// archive without its trailer, which readers reject or see as truncated.
    #[instrument(skip_all, fields(format = A::NAME, naming = ?self.naming))]
    pub fn write_to<W: Write>(&self, sink: W, entries: Vec<Entry>) -> Result<()> {
        let mut session = A::open(sink);
        let mut prefix = Vec::new();
        let members = match write_entries(&mut session, self.naming, &mut prefix, entries) {
            Ok(members) => members,
            Err(e) => {
                session.abort();
                return Err(e);
            }
        };
        session
            .finish()
            .with_context(|| format!("Failed to finish {} archive", A::NAME))?;
        debug!("Wrote {} archive with {} members", A::NAME, members);
        Ok(())
    }
}

/// Writes `entries` depth-first, pre-order. Returns the number of members written.
fn write_entries<S: FormatSession>(
    session: &mut S,
    naming: Naming,
    prefix: &mut Vec<String>,
    entries: Vec<Entry>,
) -> Result<usize> {
    let mut written = 0;
    for entry in entries {
        let (name, modified, content) = entry.into_parts();
        let member = Member {
            path: member_path(naming, prefix, &name),
            modified,
        };
        match content {
            Content::Bytes(bytes) => session.write_file(&member, FileBody::Bytes(&bytes))?,
            Content::Stream(mut reader) => {
                session.write_file(&member, FileBody::Stream(reader.as_mut()))?
            }
            Content::Dir(children) => {
                session.write_dir(&member)?;
                written += 1;
                prefix.push(name);
                let nested = write_entries(session, naming, prefix, children);
                prefix.pop();
                written += nested?;
                continue;
            }
        }
        written += 1;
    }
    Ok(written)
}

fn member_path(naming: Naming, prefix: &[String], name: &str) -> String {
    match naming {
        Naming::Qualified => name.to_string(),
        Naming::Accumulated if prefix.is_empty() => name.to_string(),
        Naming::Accumulated => format!("{}/{}", prefix.join("/"), name),
    }
}
