//! Axis-aligned bounding box

use crate::core::types::Vec3;

/// Axis-aligned bounding box defined by min and max corners
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Create AABB from min and max corners
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Tightest box around a set of points, `None` when there are none
    pub fn from_points(points: &[Vec3]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        let mut aabb = Self::new(*first, *first);
        for p in rest {
            aabb.expand(*p);
        }
        Some(aabb)
    }

    /// Get center point
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Get size (max - min)
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Check if point is inside AABB
    pub fn contains_point(&self, p: Vec3) -> bool {
        p.cmpge(self.min).all() && p.cmple(self.max).all()
    }

    /// Check if two AABBs intersect
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.cmple(other.max).all() && self.max.cmpge(other.min).all()
    }

    /// Expand AABB to include point
    pub fn expand(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    /// Return merged AABB containing both
    pub fn merged(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_and_accessors() {
        let aabb = Aabb::new(Vec3::ZERO, Vec3::ONE);
        assert_eq!(aabb.center(), Vec3::splat(0.5));
        assert_eq!(aabb.size(), Vec3::ONE);
    }

    #[test]
    fn test_from_points() {
        assert!(Aabb::from_points(&[]).is_none());

        let aabb = Aabb::from_points(&[
            Vec3::new(1.0, -2.0, 3.0),
            Vec3::new(-1.0, 4.0, 0.5),
            Vec3::new(0.0, 0.0, 7.0),
        ])
        .unwrap();
        assert_eq!(aabb.min, Vec3::new(-1.0, -2.0, 0.5));
        assert_eq!(aabb.max, Vec3::new(1.0, 4.0, 7.0));
    }

    #[test]
    fn test_contains_and_intersects() {
        let a = Aabb::new(Vec3::ZERO, Vec3::ONE);
        let b = Aabb::new(Vec3::splat(0.5), Vec3::splat(1.5));
        let c = Aabb::new(Vec3::splat(2.0), Vec3::splat(3.0));
        assert!(a.contains_point(Vec3::splat(0.5)));
        assert!(!a.contains_point(Vec3::splat(2.0)));
        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
        assert_eq!(a.merged(&c), Aabb::new(Vec3::ZERO, Vec3::splat(3.0)));
    }
}
