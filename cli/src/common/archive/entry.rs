//! # Harness Archive Entry Model (`common::archive::entry`)
//!
//! File: cli/src/common/archive/entry.rs
//!
//! ## Overview
//!
//! An `Entry` describes one archive member: a name, a modification time and
//! exactly one kind of content, fixed at construction:
//!
//! - `Content::Bytes`: an in-memory file.
//! - `Content::Stream`: a file backed by a finite, single-pass reader.
//! - `Content::Dir`: a directory holding an ordered list of further entries.
//!
//! Entries are built by the caller and handed to the archive engine by value; the
//! engine reads them once and drops them when the archive call returns.
//!
//! [`from_path`] builds an entry tree from a directory on disk. Every regular
//! file is backed by a reader that opens it on first read, so only the file being
//! archived holds a descriptor.
//!
use crate::core::error::Result;
use anyhow::Context;
use chrono::{DateTime, Utc};
use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// The content of one archive member.
pub enum Content {
    Bytes(Vec<u8>),
    Stream(Box<dyn Read + Send>),
    Dir(Vec<Entry>),
}

impl fmt::Debug for Content {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Content::Bytes(bytes) => write!(f, "Bytes({} bytes)", bytes.len()),
            Content::Stream(_) => f.write_str("Stream(..)"),
            Content::Dir(children) => f.debug_tuple("Dir").field(children).finish(),
        }
    }
}

/// One archive member (file, stream-backed file or directory).
#[derive(Debug)]
pub struct Entry {
    name: String,
    modified: DateTime<Utc>,
    content: Content,
}

impl Entry {
    /// An in-memory file.
    pub fn file(name: impl Into<String>, modified: DateTime<Utc>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            modified,
            content: Content::Bytes(content.into()),
        }
    }

    /// A file whose content is read from `reader` exactly once.
    pub fn stream<R>(name: impl Into<String>, modified: DateTime<Utc>, reader: R) -> Self
    where
        R: Read + Send + 'static,
    {
        Self {
            name: name.into(),
            modified,
            content: Content::Stream(Box::new(reader)),
        }
    }

    /// A directory. An empty `children` list is a valid empty directory.
    pub fn dir(name: impl Into<String>, modified: DateTime<Utc>, children: Vec<Entry>) -> Self {
        Self {
            name: name.into(),
            modified,
            content: Content::Dir(children),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn modified(&self) -> DateTime<Utc> {
        self.modified
    }

    pub fn content(&self) -> &Content {
        &self.content
    }

    pub fn is_dir(&self) -> bool {
        matches!(self.content, Content::Dir(_))
    }

    pub(crate) fn into_parts(self) -> (String, DateTime<Utc>, Content) {
        (self.name, self.modified, self.content)
    }
}

/// A file on disk, opened when it is first read.
struct DeferredFile {
    path: PathBuf,
    file: Option<File>,
}

impl Read for DeferredFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.file.is_none() {
            let file = File::open(&self.path).map_err(|e| {
                io::Error::new(e.kind(), format!("Failed to open '{}': {}", self.path.display(), e))
            })?;
            self.file = Some(file);
        }
        match self.file.as_mut() {
            Some(file) => file.read(buf),
            None => Ok(0),
        }
    }
}

/// Builds the entries for the contents of directory `root`, one level per `Dir`.
///
/// Names are base names (for path-accumulating traversal). Regular files become
/// stream entries that open the file when the archive reads it; modification
/// times come from file
/// metadata. Hidden entries (leading `.`) and anything that is neither a regular
/// file nor a directory are skipped. Siblings are sorted by name.
///
/// # Errors
///
/// Returns an `Err` if `root` or anything beneath it cannot be listed. A file
/// that cannot be opened fails later, when the archive reads it.
pub fn from_path(root: &Path) -> Result<Vec<Entry>> {
    debug!("Building entry tree from '{}'", root.display());
    let mut entries = Vec::new();
    for item in WalkDir::new(root)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let item = item.with_context(|| format!("Failed to walk '{}'", root.display()))?;
        let name = item.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            debug!("Skipping hidden path: {}", item.path().display());
            continue;
        }
        let metadata = item
            .metadata()
            .with_context(|| format!("Failed to read metadata for '{}'", item.path().display()))?;
        let modified = metadata
            .modified()
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());

        if metadata.is_dir() {
            entries.push(Entry::dir(name, modified, from_path(item.path())?));
        } else if metadata.is_file() {
            let file = DeferredFile {
                path: item.into_path(),
                file: None,
            };
            entries.push(Entry::stream(name, modified, file));
        } else {
            warn!(
                "Skipping unsupported file system entry type at '{}'",
                item.path().display()
            );
        }
    }
    Ok(entries)
}
