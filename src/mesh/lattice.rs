//! Lattice addressing shared by the extractor and assembler

use glam::{UVec3, Vec3, Vec4};

/// Integer corner of a unit cube inside a density grid
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LatticePoint {
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

impl LatticePoint {
    pub fn new(x: u32, y: u32, z: u32) -> Self {
        Self { x, y, z }
    }

    pub fn as_uvec3(&self) -> UVec3 {
        UVec3::new(self.x, self.y, self.z)
    }

    /// Point displaced by a non-negative offset
    pub fn offset(&self, dx: u32, dy: u32, dz: u32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }
}

/// Unordered pair of lattice points.
///
/// Endpoints are stored in sorted order, so `Edge::new(a, b)` and
/// `Edge::new(b, a)` compare and hash identically.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Edge {
    a: LatticePoint,
    b: LatticePoint,
}

impl Edge {
    pub fn new(p: LatticePoint, q: LatticePoint) -> Self {
        if p <= q {
            Self { a: p, b: q }
        } else {
            Self { a: q, b: p }
        }
    }

    /// Lower endpoint in lattice order
    pub fn a(&self) -> LatticePoint {
        self.a
    }

    /// Upper endpoint in lattice order
    pub fn b(&self) -> LatticePoint {
        self.b
    }
}

/// Surface vertex placed on a threshold-crossing edge
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Vertex {
    pub position: Vec3,
    /// Biome color, white until the assembler samples the chunk's biome grid
    pub color: Vec4,
}

impl Vertex {
    pub fn new(position: Vec3) -> Self {
        Self { position, color: Vec4::ONE }
    }
}

/// Triangle emitted by the extractor, addressed by the edges its vertices sit on
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Triangle {
    pub edges: [Edge; 3],
    /// Per edge: whether either endpoint lies in the grid margin
    pub border: [bool; 3],
}

impl Triangle {
    /// True if any vertex belongs to the margin band of a neighbouring chunk
    pub fn is_border(&self) -> bool {
        self.border.iter().any(|&b| b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    fn hash_of<T: Hash>(value: &T) -> u64 {
        let mut hasher = DefaultHasher::new();
        value.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn test_edge_symmetric() {
        let points = [
            LatticePoint::new(0, 0, 0),
            LatticePoint::new(1, 0, 0),
            LatticePoint::new(0, 5, 2),
            LatticePoint::new(7, 1, 3),
        ];

        for &p in &points {
            for &q in &points {
                let pq = Edge::new(p, q);
                let qp = Edge::new(q, p);
                assert_eq!(pq, qp);
                assert_eq!(hash_of(&pq), hash_of(&qp));
            }
        }
    }

    #[test]
    fn test_edge_endpoints_sorted() {
        let hi = LatticePoint::new(2, 0, 0);
        let lo = LatticePoint::new(1, 9, 9);
        let edge = Edge::new(hi, lo);
        assert_eq!(edge.a(), lo);
        assert_eq!(edge.b(), hi);
    }

    #[test]
    fn test_triangle_border() {
        let e = Edge::new(LatticePoint::new(0, 0, 0), LatticePoint::new(1, 0, 0));
        let inner = Triangle { edges: [e; 3], border: [false; 3] };
        let outer = Triangle { edges: [e; 3], border: [false, true, false] };
        assert!(!inner.is_border());
        assert!(outer.is_border());
    }
}
