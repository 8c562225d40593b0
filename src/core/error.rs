//! Error types for terrain generation and streaming

use thiserror::Error;

use crate::terrain::ChunkCoord;

/// Main error type for the crate
#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Unknown biome: {0}")]
    UnknownBiome(String),

    #[error("Chunk {coord:?} produced a non-finite vertex at index {index}")]
    NonFiniteVertex { coord: ChunkCoord, index: usize },

    #[error("Pipeline error: {0}")]
    Pipeline(String),

    #[error("Streaming error: {0}")]
    Streaming(String),
}
