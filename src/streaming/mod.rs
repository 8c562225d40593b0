//! Viewer-driven chunk streaming
//!
//! The scheduler keeps a square of chunks around the viewer loaded, builds
//! missing ones nearest-first with a per-frame dispatch limit, and drops
//! chunks that fall outside the far radius. Builds run asynchronously through
//! a [`ChunkSource`]; the scheduler only polls them once per frame.

pub mod chunk;
pub mod config;
pub mod priority;
pub mod scheduler;

pub use chunk::{Chunk, ChunkEvent, ChunkState};
pub use config::StreamingConfig;
pub use priority::{LoadQueue, LoadRequest};
pub use scheduler::{ChunkSource, ChunkStreamingScheduler, SchedulerStats};
