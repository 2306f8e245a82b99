//! # Harness Archive Engine (`common::archive`)
//!
//! File: cli/src/common/archive/mod.rs
//!
//! ## Overview
//!
//! Serializes a tree of in-memory and stream-backed entries into a tar, tar.gz or
//! zip archive. The same engine packs Docker build contexts (tar) and writes debug
//! snapshots (zip).
//!
//! ## Architecture
//!
//! - **`entry`**: the `Entry` model (file, stream-backed file, directory) and
//!   `from_path` for building a tree from disk.
//! - **`format`**: the `Archiver` / `FormatSession` seam every format implements.
//! - **`tar`**: `Tar` and `TarGz`.
//! - **`zip`**: `Zip`.
//! - **`engine`**: `Archive<A>`, the depth-first traversal and `write_to`.
//! - **`stream`**: `Archive::stream`, the background producer and `ArchiveStream`.
//!
//! ## Usage
//!
//! ```rust
//! use harness::common::archive::{Archive, Entry, Tar};
//! use chrono::Utc;
//!
//! # fn run() -> anyhow::Result<()> {
//! let now = Utc::now();
//! let entries = vec![
//!     Entry::file("Dockerfile", now, "FROM caddy:2\n"),
//!     Entry::dir("conf", now, vec![Entry::file("Caddyfile", now, ":80\n")]),
//! ];
//! let mut context = Vec::new();
//! Archive::<Tar>::new().write_to(&mut context, entries)?;
//! # Ok(())
//! # }
//! ```
//!

pub mod engine;
pub mod entry;
pub mod format;
pub mod stream;
pub mod tar;
pub mod zip;

pub use engine::{Archive, Naming};
pub use entry::{Content, Entry};
pub use format::{Archiver, FileBody, FormatSession, Member};
pub use self::tar::{Tar, TarGz};
pub use self::zip::Zip;
pub use stream::ArchiveStream;
