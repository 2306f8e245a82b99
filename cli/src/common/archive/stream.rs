//! # Harness Streaming Archive Producer (`common::archive::stream`)
//!
//! File: cli/src/common/archive/stream.rs
//!
//! ## Overview
//!
//! Streaming-producer mode of the archive engine. [`Archive::stream`] returns an
//! [`ArchiveStream`] immediately and writes the archive into it from a blocking
//! background task, so a consumer (e.g. the Docker build API or a file) can start
//! reading before the whole archive exists.
//!
//! ## Architecture
//!
//! - The producer runs the ordinary synchronous `write_to` on a `spawn_blocking`
//!   thread, writing into a `BufWriter` over a bounded channel of `Bytes` chunks.
//!   The bound applies backpressure: the producer blocks while the reader lags.
//! - The reader side is a `tokio_util::io::StreamReader` over the channel.
//! - The write end is closed on every exit path (success, error or panic), so the
//!   reader always reaches either end-of-stream or an error.
//! - A producer failure is logged and delivered to the reader as an I/O error
//!   carrying `HarnessError::Producer`; the stream then ends.
//! - Dropping the reader closes the channel; the producer's next write fails and
//!   the task exits.
//!
use super::engine::Archive;
use super::entry::Entry;
use super::format::Archiver;
use crate::core::error::{HarnessError, Result};
use anyhow::anyhow;
use bytes::Bytes;
use futures_util::stream::{self, BoxStream, StreamExt};
use std::any::Any;
use std::io::{self, BufWriter, Write};
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::task::{self, Poll};
use tokio::io::{AsyncRead, ReadBuf};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio_util::io::StreamReader;
use tracing::{debug, error, instrument};

/// Size of the chunks handed to the reader.
const CHUNK_SIZE: usize = 64 * 1024;

/// Chunks buffered before the producer blocks.
const CHANNEL_DEPTH: usize = 8;

type Chunk = io::Result<Bytes>;

/// The read end of a streamed archive.
pub struct ArchiveStream {
    inner: StreamReader<BoxStream<'static, Chunk>, Bytes>,
}

impl std::fmt::Debug for ArchiveStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveStream").finish_non_exhaustive()
    }
}

impl AsyncRead for ArchiveStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut task::Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

/// Blocking `Write` adapter that forwards each buffer to the channel.
struct ChannelWriter {
    tx: mpsc::Sender<Chunk>,
}

impl Write for ChannelWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        self.tx
            .blocking_send(Ok(Bytes::copy_from_slice(buf)))
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "archive stream reader was dropped"))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<A: Archiver + 'static> Archive<A> {
    /// Starts producing the archive of `entries` in the background and returns
    /// the stream to read it from.
    ///
    /// # Errors
    ///
    /// Returns `HarnessError::Producer` when called outside a Tokio runtime.
    /// Failures of the producer itself arrive later, as read errors on the stream.
    #[instrument(skip_all, fields(format = A::NAME))]
    pub fn stream(&self, entries: Vec<Entry>) -> Result<ArchiveStream> {
        let handle = Handle::try_current().map_err(|e| {
            anyhow!(HarnessError::Producer(format!(
                "Streaming an archive requires a Tokio runtime: {}",
                e
            )))
        })?;

        let (tx, mut rx) = mpsc::channel::<Chunk>(CHANNEL_DEPTH);
        let errors = tx.clone();
        let archive = *self;

        handle.spawn_blocking(move || {
            let sink = BufWriter::with_capacity(CHUNK_SIZE, ChannelWriter { tx });
            let outcome =
                panic::catch_unwind(AssertUnwindSafe(move || archive.write_to(sink, entries)));
            let failure = match outcome {
                Ok(Ok(())) => {
                    debug!("Archive producer finished");
                    return;
                }
                Ok(Err(e)) => format!("{:#}", e),
                Err(payload) => format!("archive producer panicked: {}", panic_message(&*payload)),
            };
            if errors.is_closed() {
                debug!("Archive producer stopped, reader went away: {}", failure);
                return;
            }
            error!("Archive producer failed: {}", failure);
            let _ = errors.blocking_send(Err(io::Error::other(HarnessError::Producer(failure))));
        });

        let chunks = stream::poll_fn(move |cx| rx.poll_recv(cx)).boxed();
        Ok(ArchiveStream {
            inner: StreamReader::new(chunks),
        })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::archive::{Tar, Zip};
    use crate::common::lifecycle::{Phase, Scope};
    use chrono::{DateTime, TimeZone, Utc};
    use std::io::{Cursor, Read};
    use std::time::Duration;
    use tokio::io::AsyncReadExt;
    use tokio::sync::oneshot;
    use tokio::time::Instant;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap()
    }

    fn tree() -> Vec<Entry> {
        vec![
            Entry::file("Dockerfile", t0(), "FROM caddy:2\n"),
            Entry::dir(
                "site",
                t0(),
                vec![
                    Entry::file("index.html", t0(), vec![b'x'; 300 * 1024]),
                    Entry::stream("notes.txt", t0(), Cursor::new(b"streamed".to_vec())),
                ],
            ),
        ]
    }

    async fn collect(mut stream: ArchiveStream) -> io::Result<Vec<u8>> {
        let mut out = Vec::new();
        stream.read_to_end(&mut out).await?;
        Ok(out)
    }

    #[tokio::test]
    async fn test_streamed_tar_matches_direct_write() -> Result<()> {
        let archive = Archive::<Tar>::new();
        let mut direct = Vec::new();
        archive.write_to(&mut direct, tree())?;
        let streamed = collect(archive.stream(tree())?).await?;
        assert_eq!(streamed, direct);
        Ok(())
    }

    #[tokio::test]
    async fn test_streamed_zip_matches_direct_write() -> Result<()> {
        let archive = Archive::<Zip>::new();
        let mut direct = Vec::new();
        archive.write_to(&mut direct, tree())?;
        let streamed = collect(archive.stream(tree())?).await?;
        assert_eq!(streamed, direct);
        Ok(())
    }

    struct BrokenReader;

    impl Read for BrokenReader {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::other("device unplugged"))
        }
    }

    struct PanickingReader;

    impl Read for PanickingReader {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            panic!("reader exploded");
        }
    }

    #[tokio::test]
    async fn test_producer_error_surfaces_on_read() -> Result<()> {
        let entries = vec![
            Entry::file("ok.txt", t0(), "fine"),
            Entry::stream("bad.txt", t0(), BrokenReader),
        ];
        let stream = Archive::<Tar>::new().stream(entries)?;
        let err = collect(stream).await.expect_err("read must fail");
        assert!(err.to_string().contains("device unplugged"), "{}", err);
        let inner = err.get_ref().and_then(|e| e.downcast_ref::<HarnessError>());
        assert!(matches!(inner, Some(HarnessError::Producer(_))));
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_tar_stream_ends_in_error_not_trailer() -> Result<()> {
        let entries = vec![
            Entry::file("ok.txt", t0(), "fine"),
            Entry::stream("bad.txt", t0(), BrokenReader),
        ];
        let mut stream = Archive::<Tar>::new().stream(entries)?;
        let mut received = Vec::new();
        let mut chunk = [0u8; 512];
        let err = loop {
            match stream.read(&mut chunk).await {
                Ok(0) => panic!("stream ended without reporting the failure"),
                Ok(n) => received.extend_from_slice(&chunk[..n]),
                Err(e) => break e,
            }
        };
        assert!(err.to_string().contains("device unplugged"), "{}", err);
        // Only ok.txt's header and data block precede the error.
        assert_eq!(received.len(), 1024);
        Ok(())
    }

    #[tokio::test]
    async fn test_producer_panic_surfaces_on_read() -> Result<()> {
        let entries = vec![Entry::stream("boom.txt", t0(), PanickingReader)];
        let stream = Archive::<Zip>::new().stream(entries)?;
        let err = collect(stream).await.expect_err("read must fail");
        assert!(err.to_string().contains("reader exploded"), "{}", err);
        Ok(())
    }

    /// Signals when the producer drops it.
    struct DropSignal {
        inner: Cursor<Vec<u8>>,
        on_drop: Option<oneshot::Sender<()>>,
    }

    impl Read for DropSignal {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            Read::read(&mut self.inner, buf)
        }
    }

    impl Drop for DropSignal {
        fn drop(&mut self) {
            if let Some(tx) = self.on_drop.take() {
                let _ = tx.send(());
            }
        }
    }

    #[tokio::test]
    async fn test_dropping_reader_stops_producer() -> Result<()> {
        let (tx, rx) = oneshot::channel();
        let entries = vec![
            Entry::file("big.bin", t0(), vec![0u8; 8 * 1024 * 1024]),
            Entry::stream(
                "last.txt",
                t0(),
                DropSignal {
                    inner: Cursor::new(b"tail".to_vec()),
                    on_drop: Some(tx),
                },
            ),
        ];
        let mut stream = Archive::<Tar>::new().stream(entries)?;
        let mut head = [0u8; 512];
        stream.read_exact(&mut head).await?;
        drop(stream);

        tokio::time::timeout(Duration::from_secs(10), rx)
            .await
            .expect("producer did not stop after the reader was dropped")
            .ok();
        Ok(())
    }

    #[tokio::test]
    async fn test_cancelling_root_scope_unblocks_copy_and_producer() -> Result<()> {
        let (tx, rx) = oneshot::channel();
        let entries = vec![
            Entry::file("big.bin", t0(), vec![0u8; 8 * 1024 * 1024]),
            Entry::stream(
                "last.txt",
                t0(),
                DropSignal {
                    inner: Cursor::new(b"tail".to_vec()),
                    on_drop: Some(tx),
                },
            ),
        ];
        let stream = Archive::<Tar>::new().stream(entries)?;
        // Nobody reads the other end, so the copy stalls once the pipe fills.
        let (mut sink, _unread) = tokio::io::duplex(1024);

        let root = Scope::new(Phase::Root, Instant::now() + Duration::from_secs(60));
        let canceller = root.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            canceller.cancel();
        });

        let copied = root
            .run(async move {
                let mut stream = stream;
                Ok(tokio::io::copy(&mut stream, &mut sink).await?)
            })
            .await;
        let err = copied.expect_err("copy should be cut off by cancellation");
        assert!(matches!(
            err.downcast_ref::<HarnessError>(),
            Some(HarnessError::Cancelled { phase: Phase::Root })
        ));

        tokio::time::timeout(Duration::from_secs(10), rx)
            .await
            .expect("producer did not stop after the scope was cancelled")
            .ok();
        Ok(())
    }

    #[test]
    fn test_stream_requires_runtime() {
        let err = Archive::<Tar>::new()
            .stream(Vec::new())
            .expect_err("no runtime");
        assert!(matches!(
            err.downcast_ref::<HarnessError>(),
            Some(HarnessError::Producer(_))
        ));
    }
}
