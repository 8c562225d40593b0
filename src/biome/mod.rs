//! Staged biome classification
//!
//! Biomes start as a coarse weighted-random seed grid and are refined by an
//! ordered list of pure stages (expand, replace, smooth, border). The output
//! is a per-chunk grid of [`BiomeId`]s that the mesh assembler samples for
//! vertex colors and submesh bucketing.

pub mod config;
pub mod grid;
pub mod hash;
pub mod pipeline;
pub mod registry;
pub mod stage;

pub use config::{BiomeConfig, BiomeDef, StageConfig, WeightedName};
pub use grid::ChunkBiome;
pub use hash::cell_hash;
pub use pipeline::BiomePipeline;
pub use registry::{Biome, BiomeId, BiomeRegistry, WeightedList};
pub use stage::{Choice, Stage};
