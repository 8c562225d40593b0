//! Chunk lattice dimensions and world placement

use glam::{UVec3, Vec3};
use serde::{Deserialize, Serialize};

use super::coord::ChunkCoord;
use crate::core::{Error, Result};
use crate::math::Aabb;

/// Lattice layout shared by every chunk.
///
/// A chunk owns `chunk_size` cells along X and Z and `chunk_height` cells
/// along Y. Its density grid is padded by `margin` lattice points on each
/// horizontal side so border vertices see the same neighbourhood from both
/// chunks that share them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkLayout {
    /// Lattice cells per chunk along X and Z
    pub chunk_size: u32,
    /// Lattice cells along Y
    pub chunk_height: u32,
    /// Horizontal world size of one cell
    pub voxel_size: f32,
    /// Vertical world size of one cell
    pub vertical_scale: f32,
    /// Extra lattice points on each horizontal side
    pub margin: u32,
    /// Extraction stride in lattice points (1 = full detail)
    pub lod_step: u32,
    /// Density threshold separating solid from air
    pub iso_level: f32,
}

impl Default for ChunkLayout {
    fn default() -> Self {
        Self {
            chunk_size: 16,
            chunk_height: 64,
            voxel_size: 1.0,
            vertical_scale: 1.0,
            margin: 1,
            lod_step: 1,
            iso_level: 0.0,
        }
    }
}

impl ChunkLayout {
    /// Horizontal world extent of one chunk
    pub fn chunk_world_size(&self) -> f32 {
        self.chunk_size as f32 * self.voxel_size
    }

    /// Number of lattice points per axis in a padded density grid
    pub fn grid_dims(&self) -> UVec3 {
        let horizontal = self.chunk_size + 2 * self.margin + 1;
        UVec3::new(horizontal, self.chunk_height + 1, horizontal)
    }

    /// World-space distance between neighbouring lattice points
    pub fn spacing(&self) -> Vec3 {
        Vec3::new(self.voxel_size, self.vertical_scale, self.voxel_size)
    }

    /// World position of lattice point (0, 0, 0) of a chunk's padded grid
    pub fn grid_origin(&self, coord: ChunkCoord) -> Vec3 {
        let size = self.chunk_size as f32;
        let margin = self.margin as f32;
        Vec3::new(
            (coord.x as f32 * size - margin) * self.voxel_size,
            0.0,
            (coord.z as f32 * size - margin) * self.voxel_size,
        )
    }

    /// World-space box of a chunk's core column
    pub fn chunk_bounds(&self, coord: ChunkCoord) -> Aabb {
        let world = self.chunk_world_size();
        let min = Vec3::new(coord.x as f32 * world, 0.0, coord.z as f32 * world);
        let max = min + Vec3::new(world, self.chunk_height as f32 * self.vertical_scale, world);
        Aabb::new(min, max)
    }

    /// Check the layout is usable for extraction
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 || self.chunk_height == 0 {
            return Err(Error::Config("chunk_size and chunk_height must be positive".into()));
        }
        if !(self.voxel_size > 0.0 && self.vertical_scale > 0.0) {
            return Err(Error::Config("voxel_size and vertical_scale must be positive".into()));
        }
        if self.lod_step == 0 {
            return Err(Error::Config("lod_step must be at least 1".into()));
        }
        if self.chunk_size % self.lod_step != 0 || self.chunk_height % self.lod_step != 0 {
            return Err(Error::Config(format!(
                "lod_step {} must divide chunk_size {} and chunk_height {}",
                self.lod_step, self.chunk_size, self.chunk_height
            )));
        }
        if self.margin < self.lod_step {
            return Err(Error::Config(format!(
                "margin {} must be at least lod_step {}",
                self.margin, self.lod_step
            )));
        }
        if !self.iso_level.is_finite() {
            return Err(Error::Config("iso_level must be finite".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout_is_valid() {
        assert!(ChunkLayout::default().validate().is_ok());
    }

    #[test]
    fn test_grid_dims_include_margin() {
        let layout = ChunkLayout { chunk_size: 8, chunk_height: 16, margin: 2, ..Default::default() };
        assert_eq!(layout.grid_dims(), UVec3::new(13, 17, 13));
    }

    #[test]
    fn test_grid_origin_offsets_by_margin() {
        let layout = ChunkLayout { chunk_size: 8, voxel_size: 0.5, margin: 1, ..Default::default() };
        let origin = layout.grid_origin(ChunkCoord::new(1, -1));
        assert_eq!(origin, Vec3::new(3.5, 0.0, -4.5));
    }

    #[test]
    fn test_validate_rejects_bad_step() {
        let layout = ChunkLayout { chunk_size: 10, lod_step: 4, margin: 4, ..Default::default() };
        assert!(matches!(layout.validate(), Err(Error::Config(_))));

        let layout = ChunkLayout { lod_step: 2, margin: 1, ..Default::default() };
        assert!(layout.validate().is_err());
    }
}
