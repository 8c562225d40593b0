//! Chunk grid addressing

use glam::Vec3;

/// Integer coordinate identifying a chunk column in the horizontal world grid
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkCoord {
    pub x: i32,
    pub z: i32,
}

impl ChunkCoord {
    /// Create a new chunk coordinate
    pub fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Convert world position to the coordinate of the chunk containing it
    pub fn from_world_pos(pos: Vec3, chunk_world_size: f32) -> Self {
        Self {
            x: (pos.x / chunk_world_size).floor() as i32,
            z: (pos.z / chunk_world_size).floor() as i32,
        }
    }

    /// Coordinate shifted by a chunk offset
    pub fn offset(&self, dx: i32, dz: i32) -> Self {
        Self::new(self.x + dx, self.z + dz)
    }

    /// Euclidean distance in chunk units
    pub fn distance(&self, other: ChunkCoord) -> f32 {
        let dx = (self.x - other.x) as f32;
        let dz = (self.z - other.z) as f32;
        (dx * dx + dz * dz).sqrt()
    }

    /// Largest per-axis offset in chunk units
    pub fn chebyshev_distance(&self, other: ChunkCoord) -> i32 {
        (self.x - other.x).abs().max((self.z - other.z).abs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_world_pos_negative() {
        assert_eq!(ChunkCoord::from_world_pos(Vec3::new(-0.5, 10.0, 3.0), 16.0), ChunkCoord::new(-1, 0));
        assert_eq!(ChunkCoord::from_world_pos(Vec3::new(32.0, 0.0, -16.0), 16.0), ChunkCoord::new(2, -1));
    }

    #[test]
    fn test_distances() {
        let origin = ChunkCoord::new(0, 0);
        let c = ChunkCoord::new(4, 3);
        assert_eq!(origin.distance(c), 5.0);
        assert_eq!(origin.chebyshev_distance(c), 4);
        assert_eq!(c.offset(-4, -3), origin);
    }
}
