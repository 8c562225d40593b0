//! Marching-cubes surface extraction
//!
//! Every cell is polygonized independently on the worker pool. Vertices are
//! keyed by the lattice edge they sit on, so two cells sharing an edge agree
//! on a single vertex no matter which one reaches it first.

use dashmap::DashMap;
use glam::Vec3;
use rayon::prelude::*;
use std::collections::BTreeSet;

use super::lattice::{Edge, LatticePoint, Triangle, Vertex};
use super::tables::{triangle_edges, CORNER_OFFSETS, EDGE_CORNERS};
use crate::terrain::{ChunkLayout, DensityGrid};

/// Densities closer than this are treated as equal during interpolation
pub const INTERPOLATION_EPSILON: f32 = 1e-5;

/// Extraction settings
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ExtractParams {
    /// Density threshold, samples below it count as outside
    pub iso_level: f32,
    /// Lattice stride between cell corners
    pub step: u32,
}

impl Default for ExtractParams {
    fn default() -> Self {
        Self { iso_level: 0.0, step: 1 }
    }
}

impl ExtractParams {
    pub fn from_layout(layout: &ChunkLayout) -> Self {
        Self {
            iso_level: layout.iso_level,
            step: layout.lod_step,
        }
    }
}

/// Raw extractor output: triangles plus the deduplicated edge vertices
pub struct Extraction {
    pub triangles: Vec<Triangle>,
    pub vertices: DashMap<Edge, Vertex>,
}

impl Extraction {
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    pub fn vertex(&self, edge: &Edge) -> Option<Vertex> {
        self.vertices.get(edge).map(|v| *v)
    }

    /// Distinct edges referenced by any triangle
    pub fn referenced_edges(&self) -> BTreeSet<Edge> {
        self.triangles
            .iter()
            .flat_map(|tri| tri.edges)
            .collect()
    }
}

/// 8-bit cube configuration: bit `i` set when corner `i` is below `iso_level`
pub fn configuration_index(values: &[f32; 8], iso_level: f32) -> usize {
    values
        .iter()
        .enumerate()
        .filter(|(_, v)| **v < iso_level)
        .fold(0, |config, (i, _)| config | (1 << i))
}

/// Zero crossing between two corners.
///
/// Near-threshold or near-equal samples resolve to a corner instead of
/// dividing by a vanishing denominator.
pub fn interpolate(p1: Vec3, p2: Vec3, v1: f32, v2: f32, iso_level: f32) -> Vec3 {
    let d1 = v1 - iso_level;
    let d2 = v2 - iso_level;

    if d1.abs() < INTERPOLATION_EPSILON || (v1 - v2).abs() < INTERPOLATION_EPSILON {
        return p1;
    }
    if d2.abs() < INTERPOLATION_EPSILON {
        return p2;
    }

    p1 + (p2 - p1) * (d1 / (d1 - d2))
}

/// Extract the iso-surface of a density grid
pub fn extract(grid: &DensityGrid, params: &ExtractParams) -> Extraction {
    let step = params.step.max(1);
    let cells = cell_origins(grid, step);
    let vertices = DashMap::new();

    let triangles: Vec<Triangle> = cells
        .par_iter()
        .flat_map_iter(|&cell| polygonize_cell(grid, cell, step, params.iso_level, &vertices))
        .collect();

    log::trace!(
        "Extracted {} triangles, {} vertices from {} cells",
        triangles.len(),
        vertices.len(),
        cells.len()
    );

    Extraction { triangles, vertices }
}

/// Horizontal cell starts: every core cell plus one ring reaching into the margin
fn horizontal_starts(points: u32, margin: u32, step: u32) -> Vec<u32> {
    let last = points - 1;
    let core_end = last - margin;
    let start = if margin >= step { margin - step } else { margin };

    (start..=core_end)
        .step_by(step as usize)
        .take_while(|&i| i + step <= last)
        .collect()
}

fn cell_origins(grid: &DensityGrid, step: u32) -> Vec<LatticePoint> {
    let dims = grid.dims();
    let xs = horizontal_starts(dims.x, grid.margin(), step);
    let zs = horizontal_starts(dims.z, grid.margin(), step);

    let mut cells = Vec::with_capacity(xs.len() * zs.len() * (dims.y / step) as usize);
    for y in (0..dims.y).step_by(step as usize).take_while(|&y| y + step < dims.y) {
        for &z in &zs {
            for &x in &xs {
                cells.push(LatticePoint::new(x, y, z));
            }
        }
    }
    cells
}

fn polygonize_cell(
    grid: &DensityGrid,
    origin: LatticePoint,
    step: u32,
    iso_level: f32,
    vertices: &DashMap<Edge, Vertex>,
) -> Vec<Triangle> {
    let corners: [LatticePoint; 8] = std::array::from_fn(|i| {
        let [dx, dy, dz] = CORNER_OFFSETS[i];
        origin.offset(dx * step, dy * step, dz * step)
    });
    let values: [f32; 8] = std::array::from_fn(|i| grid.value(corners[i]));

    let config = configuration_index(&values, iso_level);
    if config == 0 || config == 255 {
        return Vec::new();
    }

    triangle_edges(config)
        .map(|tri| {
            let edges = tri.map(|e| {
                let [c0, c1] = EDGE_CORNERS[e];
                Edge::new(corners[c0], corners[c1])
            });

            for edge in edges {
                // First writer wins; the position only depends on the edge
                vertices
                    .entry(edge)
                    .or_insert_with(|| Vertex::new(edge_crossing(grid, edge, iso_level)));
            }

            let border = edges.map(|edge| grid.in_margin(edge.a()) || grid.in_margin(edge.b()));
            Triangle { edges, border }
        })
        .collect()
}

fn edge_crossing(grid: &DensityGrid, edge: Edge, iso_level: f32) -> Vec3 {
    let (a, b) = (edge.a(), edge.b());
    interpolate(grid.position(a), grid.position(b), grid.value(a), grid.value(b), iso_level)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terrain::{ChunkCoord, DensityField, DensityParams};
    use glam::UVec3;

    fn cube_grid(values: [f32; 8]) -> DensityGrid {
        // Grid order is x + 2 * (z + 2 * y); reorder from corner numbering
        let mut ordered = vec![0.0; 8];
        for (i, [x, y, z]) in CORNER_OFFSETS.iter().enumerate() {
            ordered[(x + 2 * (z + 2 * y)) as usize] = values[i];
        }
        DensityGrid::from_values(UVec3::splat(2), 0, Vec3::ZERO, Vec3::ONE, ordered).unwrap()
    }

    fn plane_grid(height: f32, margin: u32) -> DensityGrid {
        let dims = UVec3::new(4 + 2 * margin, 6, 4 + 2 * margin);
        let mut values = Vec::new();
        for y in 0..dims.y {
            for _ in 0..dims.z * dims.x {
                values.push(height - y as f32);
            }
        }
        DensityGrid::from_values(dims, margin, Vec3::ZERO, Vec3::ONE, values).unwrap()
    }

    fn sampled_chunk(step: u32) -> DensityGrid {
        let field = DensityField::new(&DensityParams::default(), 1234);
        let layout = ChunkLayout {
            chunk_size: 8,
            chunk_height: 48,
            margin: step,
            lod_step: step,
            ..Default::default()
        };
        DensityGrid::sample(&field, &layout, ChunkCoord::new(0, 0))
    }

    #[test]
    fn test_uniform_cells_emit_nothing() {
        let params = ExtractParams::default();
        assert!(extract(&cube_grid([1.0; 8]), &params).is_empty());
        assert!(extract(&cube_grid([-1.0; 8]), &params).is_empty());
        assert_eq!(configuration_index(&[1.0; 8], 0.0), 0);
        assert_eq!(configuration_index(&[-1.0; 8], 0.0), 255);
    }

    #[test]
    fn test_single_corner_below_threshold() {
        let mut values = [1.0; 8];
        values[0] = -1.0;
        assert_eq!(configuration_index(&values, 0.0), 1);

        let extraction = extract(&cube_grid(values), &ExtractParams::default());
        assert_eq!(extraction.triangles.len(), 1);

        let origin = LatticePoint::new(0, 0, 0);
        let tri = extraction.triangles[0];
        for edge in tri.edges {
            assert_eq!(edge.a(), origin);
            let v = extraction.vertex(&edge).unwrap();
            assert!((v.position.length() - 0.5).abs() < 1e-6);
        }
        assert_eq!(extraction.vertices.len(), 3);
        assert!(!tri.is_border());
    }

    #[test]
    fn test_interpolate_guards() {
        let p1 = Vec3::ZERO;
        let p2 = Vec3::X;
        assert_eq!(interpolate(p1, p2, 0.0, 5.0, 0.0), p1);
        assert_eq!(interpolate(p1, p2, 0.3, 0.3, 0.0), p1);
        assert_eq!(interpolate(p1, p2, -2.0, 0.0, 0.0), p2);
        assert_eq!(interpolate(p1, p2, -1.0, 3.0, 0.0), Vec3::new(0.25, 0.0, 0.0));
    }

    #[test]
    fn test_flat_plane() {
        let extraction = extract(&plane_grid(2.5, 0), &ExtractParams::default());

        // 3x3 cells crossing the plane, two triangles each
        assert_eq!(extraction.triangles.len(), 18);
        // One vertex per vertical lattice edge
        assert_eq!(extraction.vertices.len(), 16);
        for entry in extraction.vertices.iter() {
            assert!((entry.value().position.y - 2.5).abs() < 1e-6);
        }
    }

    #[test]
    fn test_margin_ring_triangles_are_border() {
        let grid = plane_grid(2.5, 1);
        let extraction = extract(&grid, &ExtractParams::default());

        // Core is 3x3 cells, the ring adds one cell on each side: 5x5 cells
        assert_eq!(extraction.triangles.len(), 50);
        let border = extraction.triangles.iter().filter(|t| t.is_border()).count();
        assert_eq!(border, 50 - 18);

        for tri in extraction.triangles.iter().filter(|t| !t.is_border()) {
            for edge in tri.edges {
                assert!(!grid.in_margin(edge.a()) && !grid.in_margin(edge.b()));
            }
        }
    }

    #[test]
    fn test_one_vertex_per_edge() {
        let extraction = extract(&sampled_chunk(1), &ExtractParams::default());
        assert!(!extraction.is_empty());
        assert_eq!(extraction.referenced_edges().len(), extraction.vertices.len());
    }

    #[test]
    fn test_extraction_deterministic() {
        let grid = sampled_chunk(1);
        let a = extract(&grid, &ExtractParams::default());
        let b = extract(&grid, &ExtractParams::default());

        assert_eq!(a.referenced_edges(), b.referenced_edges());
        for edge in a.referenced_edges() {
            assert_eq!(a.vertex(&edge), b.vertex(&edge));
        }
    }

    #[test]
    fn test_lod_step_uses_strided_lattice() {
        let grid = sampled_chunk(2);
        let extraction = extract(&grid, &ExtractParams { iso_level: 0.0, step: 2 });
        assert!(!extraction.is_empty());

        for edge in extraction.referenced_edges() {
            for p in [edge.a(), edge.b()] {
                assert_eq!(p.x % 2, 0);
                assert_eq!(p.y % 2, 0);
                assert_eq!(p.z % 2, 0);
            }
        }
        assert!(extraction.triangles.len() < extract(&sampled_chunk(1), &ExtractParams::default()).triangles.len());
    }
}
