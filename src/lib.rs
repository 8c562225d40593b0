//! Marchland - streaming marching-cubes voxel terrain
//!
//! Chunks around a moving viewer are sampled from a layered-noise density
//! field, polygonized with marching cubes, colored by a staged biome grid and
//! handed back as render and collision meshes.

pub mod core;
pub mod math;
pub mod terrain;
pub mod mesh;
pub mod biome;
pub mod pipeline;
pub mod streaming;
