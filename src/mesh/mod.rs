//! Surface extraction and mesh assembly
//!
//! [`extract`] turns a density grid into triangles over lattice edges,
//! [`MeshAssembler`] resolves those into indexed, colored buffers split by
//! biome, and [`CollisionMesh`] flattens the result for physics.

pub mod assembler;
pub mod collision;
pub mod extractor;
pub mod lattice;
pub mod tables;

pub use assembler::{GpuVertex, MeshAssembler, MeshBuffers, Submesh};
pub use collision::CollisionMesh;
pub use extractor::{extract, ExtractParams, Extraction};
pub use lattice::{Edge, LatticePoint, Triangle, Vertex};
