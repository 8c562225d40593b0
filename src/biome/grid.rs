//! Rectangular biome grids addressed by global cell coordinates

use glam::IVec2;

use super::registry::BiomeId;
use crate::core::{Error, Result};

/// Biome ids over a rectangle of cells.
///
/// `origin` is the global coordinate of the first cell; rows run along X and
/// are stacked along Z.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChunkBiome {
    origin: IVec2,
    width: u32,
    depth: u32,
    ids: Vec<BiomeId>,
}

impl ChunkBiome {
    /// Fill a grid by evaluating `f` at every global cell coordinate
    pub fn from_fn(origin: IVec2, width: u32, depth: u32, mut f: impl FnMut(i32, i32) -> BiomeId) -> Self {
        let mut ids = Vec::with_capacity((width * depth) as usize);
        for j in 0..depth as i32 {
            for i in 0..width as i32 {
                ids.push(f(origin.x + i, origin.y + j));
            }
        }
        Self { origin, width, depth, ids }
    }

    pub fn filled(origin: IVec2, width: u32, depth: u32, id: BiomeId) -> Self {
        Self::from_fn(origin, width, depth, |_, _| id)
    }

    pub fn origin(&self) -> IVec2 {
        self.origin
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Last covered global cell (inclusive)
    pub fn max(&self) -> IVec2 {
        self.origin + IVec2::new(self.width as i32 - 1, self.depth as i32 - 1)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, x: i32, z: i32) -> bool {
        let max = self.max();
        x >= self.origin.x && z >= self.origin.y && x <= max.x && z <= max.y
    }

    /// Biome at a global cell coordinate
    pub fn get(&self, x: i32, z: i32) -> Option<BiomeId> {
        if !self.contains(x, z) {
            return None;
        }
        let i = (x - self.origin.x) as u32;
        let j = (z - self.origin.y) as u32;
        Some(self.ids[(i + j * self.width) as usize])
    }

    /// Biome at a global cell, clamped onto the covered rectangle
    pub fn get_clamped(&self, x: i32, z: i32) -> BiomeId {
        let max = self.max();
        let i = (x.clamp(self.origin.x, max.x) - self.origin.x) as u32;
        let j = (z.clamp(self.origin.y, max.y) - self.origin.y) as u32;
        self.ids[(i + j * self.width) as usize]
    }

    /// Biome under a world-space XZ position
    pub fn sample_world(&self, x: f32, z: f32, cell_size: f32) -> BiomeId {
        let cx = (x / cell_size).floor() as i32;
        let cz = (z / cell_size).floor() as i32;
        self.get_clamped(cx, cz)
    }

    /// Sub-rectangle `[min, max]` (inclusive, global coordinates)
    pub fn crop(&self, min: IVec2, max: IVec2) -> Result<Self> {
        if !self.contains(min.x, min.y) || !self.contains(max.x, max.y) || min.cmpgt(max).any() {
            return Err(Error::Pipeline(format!(
                "crop {min}..={max} outside biome grid {}..={}",
                self.origin,
                self.max()
            )));
        }
        let width = (max.x - min.x + 1) as u32;
        let depth = (max.y - min.y + 1) as u32;
        Ok(Self::from_fn(min, width, depth, |x, z| self.get_clamped(x, z)))
    }

    /// (global x, global z, id) for every cell
    pub fn iter(&self) -> impl Iterator<Item = (i32, i32, BiomeId)> + '_ {
        self.ids.iter().enumerate().map(move |(index, id)| {
            let i = (index as u32 % self.width) as i32;
            let j = (index as u32 / self.width) as i32;
            (self.origin.x + i, self.origin.y + j, *id)
        })
    }

    pub fn ids(&self) -> &[BiomeId] {
        &self.ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checker(origin: IVec2) -> ChunkBiome {
        ChunkBiome::from_fn(origin, 4, 3, |x, z| BiomeId(((x + z).rem_euclid(2)) as u16))
    }

    #[test]
    fn test_global_addressing() {
        let grid = checker(IVec2::new(-2, 5));
        assert_eq!(grid.max(), IVec2::new(1, 7));
        assert_eq!(grid.get(-2, 5), Some(BiomeId(1)));
        assert_eq!(grid.get(-1, 5), Some(BiomeId(0)));
        assert_eq!(grid.get(2, 5), None);
        assert_eq!(grid.get(0, 4), None);
    }

    #[test]
    fn test_clamped_and_world_sampling() {
        let grid = checker(IVec2::ZERO);
        assert_eq!(grid.get_clamped(-10, -10), grid.get(0, 0).unwrap());
        assert_eq!(grid.get_clamped(50, 1), grid.get(3, 1).unwrap());

        // Cell size 4: world x 9.5 lies in cell 2, z -1 clamps to row 0
        assert_eq!(grid.sample_world(9.5, -1.0, 4.0), grid.get(2, 0).unwrap());
    }

    #[test]
    fn test_crop() {
        let grid = checker(IVec2::new(10, 10));
        let cropped = grid.crop(IVec2::new(11, 10), IVec2::new(12, 11)).unwrap();

        assert_eq!(cropped.width(), 2);
        assert_eq!(cropped.depth(), 2);
        for (x, z, id) in cropped.iter() {
            assert_eq!(grid.get(x, z), Some(id));
        }
        assert!(grid.crop(IVec2::new(9, 10), IVec2::new(12, 11)).is_err());
    }
}
