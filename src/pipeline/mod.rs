//! Chunk build pipeline
//!
//! [`JobSystem`] runs CPU work on a fixed worker pool and chains dependent
//! jobs. [`ChunkPipeline`] uses it to build chunk meshes from a shared
//! [`TerrainContext`].

pub mod chunk_build;
pub mod jobs;

pub use chunk_build::{ChunkMesh, ChunkPipeline, TerrainContext};
pub use jobs::{JobCompleter, JobHandle, JobSystem};
