//! Collision geometry baked from render buffers

use glam::Vec3;

use super::assembler::MeshBuffers;
use crate::math::Aabb;

/// Squared doubled-area below which a triangle counts as degenerate
const DEGENERATE_AREA_SQ: f32 = 1e-12;

/// Flat triangle soup for physics
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CollisionMesh {
    pub vertices: Vec<Vec3>,
    pub triangles: Vec<[u32; 3]>,
    pub bounds: Aabb,
}

impl CollisionMesh {
    /// Merge every submesh into one list, dropping zero-area triangles
    pub fn bake(mesh: &MeshBuffers) -> Self {
        let triangles: Vec<[u32; 3]> = mesh
            .submeshes
            .iter()
            .flat_map(|s| s.indices.chunks_exact(3))
            .map(|t| [t[0], t[1], t[2]])
            .filter(|&[a, b, c]| {
                if a == b || b == c || a == c {
                    return false;
                }
                let [pa, pb, pc] = [a, b, c].map(|i| mesh.positions[i as usize]);
                (pb - pa).cross(pc - pa).length_squared() > DEGENERATE_AREA_SQ
            })
            .collect();

        let dropped = mesh.triangle_count() - triangles.len();
        if dropped > 0 {
            log::trace!("Collision bake dropped {dropped} degenerate triangles");
        }

        Self {
            vertices: mesh.positions.clone(),
            triangles,
            bounds: mesh.bounds,
        }
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }
}
