use bytes::Bytes;
use std::io;
use std::path::Path;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};

pub const DEFAULT_CHUNK_SIZE: usize = 2048;
pub const DEFAULT_PACING: Duration = Duration::from_millis(100);

// ── ChunkSplitter ─────────────────────────────────────────────

/// Splits a byte source into fixed-size chunks, in source order.
///
/// Short reads are coalesced, so every chunk except the last is exactly
/// `chunk_size` bytes long and a source of `n` bytes yields `ceil(n / size)`
/// chunks.
pub struct ChunkSplitter<R> {
    source: R,
    chunk_size: usize,
    exhausted: bool,
}

impl<R: AsyncRead + Unpin> ChunkSplitter<R> {
    pub fn new(source: R, chunk_size: usize) -> Self {
        Self {
            source,
            chunk_size: chunk_size.max(1),
            exhausted: false,
        }
    }

    pub async fn next_chunk(&mut self) -> io::Result<Option<Bytes>> {
        if self.exhausted {
            return Ok(None);
        }

        let mut buf = vec![0u8; self.chunk_size];
        let mut filled = 0;
        while filled < buf.len() {
            let n = self.source.read(&mut buf[filled..]).await?;
            if n == 0 {
                self.exhausted = true;
                break;
            }
            filled += n;
        }

        if filled == 0 {
            return Ok(None);
        }
        buf.truncate(filled);
        Ok(Some(Bytes::from(buf)))
    }
}

// ── PacingPolicy ──────────────────────────────────────────────

/// Delay applied between consecutive chunks, modelling a live feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacingPolicy {
    Fixed(Duration),
    Immediate,
}

impl PacingPolicy {
    pub fn from_millis(ms: u64) -> Self {
        if ms == 0 {
            PacingPolicy::Immediate
        } else {
            PacingPolicy::Fixed(Duration::from_millis(ms))
        }
    }

    pub async fn pause(&self) {
        if let PacingPolicy::Fixed(delay) = self {
            tokio::time::sleep(*delay).await;
        }
    }
}

impl Default for PacingPolicy {
    fn default() -> Self {
        PacingPolicy::Fixed(DEFAULT_PACING)
    }
}

// ── ChunkStreamer ─────────────────────────────────────────────

/// A single-pass, paced sequence of audio chunks.
///
/// Each chunk is held back by the pacing delay before the next one is
/// produced. Once the source is exhausted the streamer only returns `None`;
/// replaying requires a fresh source.
pub struct ChunkStreamer<R> {
    splitter: ChunkSplitter<R>,
    pacing: PacingPolicy,
    yielded: usize,
    finished: bool,
}

impl<R: AsyncRead + Unpin> ChunkStreamer<R> {
    pub fn new(source: R, chunk_size: usize, pacing: PacingPolicy) -> Self {
        Self {
            splitter: ChunkSplitter::new(source, chunk_size),
            pacing,
            yielded: 0,
            finished: false,
        }
    }

    pub fn chunks_yielded(&self) -> usize {
        self.yielded
    }

    pub async fn next_chunk(&mut self) -> io::Result<Option<Bytes>> {
        if self.finished {
            return Ok(None);
        }
        if self.yielded > 0 {
            self.pacing.pause().await;
        }

        match self.splitter.next_chunk().await? {
            Some(chunk) => {
                self.yielded += 1;
                tracing::trace!(chunk = self.yielded, len = chunk.len(), "audio chunk ready");
                Ok(Some(chunk))
            }
            None => {
                self.finished = true;
                Ok(None)
            }
        }
    }
}

impl ChunkStreamer<tokio::fs::File> {
    pub async fn open(path: &Path, chunk_size: usize, pacing: PacingPolicy) -> io::Result<Self> {
        let file = tokio::fs::File::open(path).await?;
        Ok(Self::new(file, chunk_size, pacing))
    }
}
