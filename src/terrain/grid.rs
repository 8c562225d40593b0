//! Padded density samples for one chunk

use glam::{UVec3, Vec3};
use rayon::prelude::*;

use super::coord::ChunkCoord;
use super::density::DensityField;
use super::layout::ChunkLayout;
use crate::core::{Error, Result};
use crate::mesh::LatticePoint;

/// Dense 3D array of density samples.
///
/// Stored Y-major (`x + dims.x * (z + dims.z * y)`) so each horizontal
/// slice is contiguous and can be filled by one worker.
#[derive(Clone, Debug)]
pub struct DensityGrid {
    dims: UVec3,
    margin: u32,
    origin: Vec3,
    spacing: Vec3,
    values: Vec<f32>,
}

impl DensityGrid {
    /// Wrap precomputed samples
    pub fn from_values(
        dims: UVec3,
        margin: u32,
        origin: Vec3,
        spacing: Vec3,
        values: Vec<f32>,
    ) -> Result<Self> {
        let expected = (dims.x * dims.y * dims.z) as usize;
        if values.len() != expected {
            return Err(Error::Config(format!(
                "density grid {:?} needs {} samples, got {}",
                dims,
                expected,
                values.len()
            )));
        }
        if dims.x < 2 || dims.y < 2 || dims.z < 2 {
            return Err(Error::Config(format!("density grid {dims:?} is smaller than one cell")));
        }
        if 2 * margin >= dims.x.min(dims.z) {
            return Err(Error::Config(format!("margin {margin} leaves no core in grid {dims:?}")));
        }

        Ok(Self { dims, margin, origin, spacing, values })
    }

    /// Sample the field over a chunk's padded lattice, one Y slice per job
    pub fn sample(field: &DensityField, layout: &ChunkLayout, coord: ChunkCoord) -> Self {
        let dims = layout.grid_dims();
        let origin = layout.grid_origin(coord);
        let spacing = layout.spacing();
        let slice_len = (dims.x * dims.z) as usize;

        let mut values = vec![0.0f32; slice_len * dims.y as usize];
        values
            .par_chunks_mut(slice_len)
            .enumerate()
            .for_each(|(y, slice)| {
                let wy = origin.y + y as f32 * spacing.y;
                for z in 0..dims.z {
                    let wz = origin.z + z as f32 * spacing.z;
                    for x in 0..dims.x {
                        let wx = origin.x + x as f32 * spacing.x;
                        slice[(x + dims.x * z) as usize] = field.sample(wx, wy, wz);
                    }
                }
            });

        Self {
            dims,
            margin: layout.margin,
            origin,
            spacing,
            values,
        }
    }

    pub fn dims(&self) -> UVec3 {
        self.dims
    }

    pub fn margin(&self) -> u32 {
        self.margin
    }

    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    pub fn spacing(&self) -> Vec3 {
        self.spacing
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Index of the last lattice point along X and Z that is not margin
    pub fn core_end(&self) -> UVec3 {
        UVec3::new(
            self.dims.x - 1 - self.margin,
            self.dims.y - 1,
            self.dims.z - 1 - self.margin,
        )
    }

    fn index(&self, p: LatticePoint) -> usize {
        (p.x + self.dims.x * (p.z + self.dims.z * p.y)) as usize
    }

    pub fn value(&self, p: LatticePoint) -> f32 {
        self.values[self.index(p)]
    }

    /// World position of a lattice point
    pub fn position(&self, p: LatticePoint) -> Vec3 {
        self.origin + p.as_uvec3().as_vec3() * self.spacing
    }

    /// Whether a lattice point lies in the horizontal margin band
    pub fn in_margin(&self, p: LatticePoint) -> bool {
        let end = self.core_end();
        p.x < self.margin || p.z < self.margin || p.x > end.x || p.z > end.z
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terrain::density::DensityParams;

    #[test]
    fn test_from_values_checks_len() {
        let dims = UVec3::new(2, 2, 2);
        assert!(DensityGrid::from_values(dims, 0, Vec3::ZERO, Vec3::ONE, vec![0.0; 7]).is_err());
        assert!(DensityGrid::from_values(dims, 0, Vec3::ZERO, Vec3::ONE, vec![0.0; 8]).is_ok());
    }

    #[test]
    fn test_sample_matches_field() {
        let field = DensityField::new(&DensityParams::default(), 99);
        let layout = ChunkLayout { chunk_size: 4, chunk_height: 8, margin: 1, ..Default::default() };
        let coord = ChunkCoord::new(-2, 3);
        let grid = DensityGrid::sample(&field, &layout, coord);

        assert_eq!(grid.dims(), UVec3::new(7, 9, 7));
        for p in [LatticePoint::new(0, 0, 0), LatticePoint::new(3, 4, 6), LatticePoint::new(6, 8, 2)] {
            let expected = field.sample_at(grid.position(p));
            assert_eq!(grid.value(p), expected);
        }
    }

    #[test]
    fn test_margin_band() {
        let layout = ChunkLayout { chunk_size: 4, chunk_height: 4, margin: 1, ..Default::default() };
        let field = DensityField::new(&DensityParams::default(), 1);
        let grid = DensityGrid::sample(&field, &layout, ChunkCoord::new(0, 0));

        assert!(grid.in_margin(LatticePoint::new(0, 2, 2)));
        assert!(grid.in_margin(LatticePoint::new(2, 2, 6)));
        assert!(!grid.in_margin(LatticePoint::new(1, 0, 1)));
        assert!(!grid.in_margin(LatticePoint::new(5, 4, 5)));
    }
}
