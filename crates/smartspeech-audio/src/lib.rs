pub mod chunker;

pub use chunker::{ChunkSplitter, ChunkStreamer, PacingPolicy, DEFAULT_CHUNK_SIZE, DEFAULT_PACING};
