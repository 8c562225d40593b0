//! Indexed mesh assembly
//!
//! Turns extractor output into GPU-ready arrays: one entry per distinct edge
//! vertex, colors from the chunk's biome grid, normals from the density
//! gradient and one index list per biome.

use bytemuck::{Pod, Zeroable};
use glam::{Vec3, Vec4};
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

use super::extractor::Extraction;
use super::lattice::{Edge, Triangle};
use crate::biome::{BiomeId, BiomeRegistry, ChunkBiome};
use crate::core::{Error, Result};
use crate::math::Aabb;
use crate::terrain::{ChunkCoord, ChunkLayout, DensityField};

/// Triangles of one biome
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Submesh {
    pub biome: BiomeId,
    pub indices: Vec<u32>,
}

/// Final per-chunk render buffers
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshBuffers {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub colors: Vec<Vec4>,
    /// Ordered by biome id
    pub submeshes: Vec<Submesh>,
    pub bounds: Aabb,
}

impl MeshBuffers {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.submeshes.iter().map(|s| s.indices.len() / 3).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Interleave positions, normals and colors for upload
    pub fn interleaved(&self) -> Vec<GpuVertex> {
        self.positions
            .iter()
            .zip(&self.normals)
            .zip(&self.colors)
            .map(|((p, n), c)| GpuVertex {
                position: p.to_array(),
                normal: n.to_array(),
                color: c.to_array(),
            })
            .collect()
    }
}

/// GPU vertex layout (40 bytes)
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct GpuVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub color: [f32; 4],
}

impl GpuVertex {
    pub fn as_bytes(vertices: &[GpuVertex]) -> &[u8] {
        bytemuck::cast_slice(vertices)
    }
}

/// Shared inputs for assembling chunk meshes
pub struct MeshAssembler<'a> {
    field: &'a DensityField,
    registry: &'a BiomeRegistry,
    layout: &'a ChunkLayout,
    cell_size: f32,
    gradient_eps: f32,
}

impl<'a> MeshAssembler<'a> {
    pub fn new(
        field: &'a DensityField,
        registry: &'a BiomeRegistry,
        layout: &'a ChunkLayout,
        cell_size: f32,
    ) -> Self {
        Self {
            field,
            registry,
            layout,
            cell_size,
            gradient_eps: layout.voxel_size.min(layout.vertical_scale) * 0.5,
        }
    }

    /// Build buffers for one chunk.
    ///
    /// Border triangles feed normal accumulation only. Fails with
    /// [`Error::NonFiniteVertex`] when any vertex ends up NaN or infinite.
    pub fn assemble(
        &self,
        coord: ChunkCoord,
        extraction: &Extraction,
        biomes: &ChunkBiome,
    ) -> Result<MeshBuffers> {
        // Deterministic vertex order regardless of emission order
        let index_of: BTreeMap<Edge, u32> = extraction
            .triangles
            .iter()
            .filter(|tri| !tri.is_border())
            .flat_map(|tri| tri.edges)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .enumerate()
            .map(|(i, edge)| (edge, i as u32))
            .collect();

        let positions = index_of
            .keys()
            .map(|edge| {
                extraction
                    .vertex(edge)
                    .map(|v| v.position)
                    .ok_or_else(|| Error::Pipeline(format!("chunk {coord:?}: no vertex for {edge:?}")))
            })
            .collect::<Result<Vec<_>>>()?;

        if let Some(index) = positions.iter().position(|p| !p.is_finite()) {
            return Err(Error::NonFiniteVertex { coord, index });
        }

        let normals = self.accumulate_normals(extraction, &index_of, &positions);
        if let Some(index) = normals.iter().position(|n| !n.is_finite()) {
            return Err(Error::NonFiniteVertex { coord, index });
        }

        let vertex_biomes: Vec<BiomeId> = positions
            .iter()
            .map(|p| biomes.sample_world(p.x, p.z, self.cell_size))
            .collect();
        for (edge, id) in index_of.keys().zip(&vertex_biomes) {
            if let Some(mut vertex) = extraction.vertices.get_mut(edge) {
                vertex.color = self.registry.color(*id);
            }
        }
        let colors = index_of
            .keys()
            .filter_map(|edge| extraction.vertex(edge).map(|v| v.color))
            .collect();

        let mut buckets: BTreeMap<BiomeId, Vec<[u32; 3]>> = BTreeMap::new();
        for tri in extraction.triangles.iter().filter(|tri| !tri.is_border()) {
            let Some(mut indices) = lookup(&index_of, tri) else {
                continue;
            };
            let [i0, i1, i2] = indices.map(|i| i as usize);

            let face = (positions[i1] - positions[i0]).cross(positions[i2] - positions[i0]);
            if face.dot(normals[i0] + normals[i1] + normals[i2]) < 0.0 {
                indices.swap(1, 2);
            }

            let biome = majority_biome(vertex_biomes[i0], vertex_biomes[i1], vertex_biomes[i2]);
            buckets.entry(biome).or_default().push(indices);
        }

        let submeshes = buckets
            .into_iter()
            .map(|(biome, mut tris)| {
                tris.sort_unstable();
                Submesh { biome, indices: tris.into_iter().flatten().collect() }
            })
            .collect();

        let bounds = Aabb::from_points(&positions).unwrap_or_else(|| self.layout.chunk_bounds(coord));

        Ok(MeshBuffers { positions, normals, colors, submeshes, bounds })
    }

    /// Area-weighted outward gradient from every incident triangle
    fn accumulate_normals(
        &self,
        extraction: &Extraction,
        index_of: &BTreeMap<Edge, u32>,
        positions: &[Vec3],
    ) -> Vec<Vec3> {
        let contributions: Vec<([Edge; 3], Vec3)> = extraction
            .triangles
            .par_iter()
            .filter_map(|tri| {
                let corners = tri.edges.map(|e| extraction.vertex(&e).map(|v| v.position));
                let [Some(a), Some(b), Some(c)] = corners else {
                    return None;
                };
                let area = 0.5 * (b - a).cross(c - a).length();
                let centroid = (a + b + c) / 3.0;
                let outward = -self.field.gradient(centroid, self.gradient_eps);
                Some((tri.edges, outward * area))
            })
            .collect();

        let mut sums = vec![Vec3::ZERO; positions.len()];
        for (edges, weighted) in contributions {
            for edge in edges {
                if let Some(&i) = index_of.get(&edge) {
                    sums[i as usize] += weighted;
                }
            }
        }

        sums.iter()
            .zip(positions)
            .map(|(sum, pos)| {
                sum.try_normalize()
                    .or_else(|| (-self.field.gradient(*pos, self.gradient_eps)).try_normalize())
                    .unwrap_or(Vec3::Y)
            })
            .collect()
    }
}

fn lookup(index_of: &BTreeMap<Edge, u32>, tri: &Triangle) -> Option<[u32; 3]> {
    let [a, b, c] = tri.edges;
    Some([*index_of.get(&a)?, *index_of.get(&b)?, *index_of.get(&c)?])
}

/// Biome shared by two or more corners, else the first corner's
fn majority_biome(a: BiomeId, b: BiomeId, c: BiomeId) -> BiomeId {
    if b == c && a != b { b } else { a }
}
