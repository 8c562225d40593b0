//! Density sampling over chunked lattices

pub mod coord;
pub mod density;
pub mod grid;
pub mod layout;

pub use coord::ChunkCoord;
pub use density::{DensityField, DensityParams, NoiseKind, NoiseLayer};
pub use grid::DensityGrid;
pub use layout::ChunkLayout;
