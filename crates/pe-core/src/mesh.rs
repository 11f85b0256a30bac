//! Immutable triangle meshes shared between scene objects
//!
//! A [`Mesh`] is never edited after construction. Objects hold it behind an
//! `Arc` and replace the whole reference when geometry changes, which is what
//! keys the spatial index cache.

use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::bounds::BoundingBox;

/// Identity of a mesh instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MeshId(Uuid);

impl MeshId {
    /// Create a fresh identity
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Underlying uuid
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for MeshId {
    fn default() -> Self {
        Self::new()
    }
}

/// Indexed triangle mesh in model space
#[derive(Debug, Clone)]
pub struct Mesh {
    id: MeshId,
    vertices: Vec<Vec3>,
    indices: Vec<u32>,
    bounds: BoundingBox,
}

impl Mesh {
    /// Create a mesh from positions and triangle indices.
    ///
    /// Trailing indices that do not form a full triangle are dropped, as are
    /// triangles referencing vertices out of range.
    pub fn new(vertices: Vec<Vec3>, indices: Vec<u32>) -> Self {
        let vertex_count = vertices.len() as u32;
        let indices: Vec<u32> = indices
            .chunks_exact(3)
            .filter(|tri| tri.iter().all(|&i| i < vertex_count))
            .flatten()
            .copied()
            .collect();
        let bounds = BoundingBox::from_points(vertices.iter().copied());
        Self {
            id: MeshId::new(),
            vertices,
            indices,
            bounds,
        }
    }

    /// Create a mesh from `[f32; 3]` positions
    pub fn from_arrays(vertices: &[[f32; 3]], indices: Vec<u32>) -> Self {
        Self::new(vertices.iter().map(|v| Vec3::from(*v)).collect(), indices)
    }

    /// Mesh with no geometry
    pub fn empty() -> Self {
        Self::new(Vec::new(), Vec::new())
    }

    pub fn id(&self) -> MeshId {
        self.id
    }

    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Model-space bounds (invalid for an empty mesh)
    pub fn bounds(&self) -> BoundingBox {
        self.bounds
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Vertex positions of triangle `index`
    pub fn triangle(&self, index: usize) -> [Vec3; 3] {
        let base = index * 3;
        [
            self.vertices[self.indices[base] as usize],
            self.vertices[self.indices[base + 1] as usize],
            self.vertices[self.indices[base + 2] as usize],
        ]
    }

    /// Iterate over all triangles
    pub fn triangles(&self) -> impl Iterator<Item = [Vec3; 3]> + '_ {
        (0..self.triangle_count()).map(move |i| self.triangle(i))
    }

    /// Copy of this mesh with every vertex transformed. The copy gets a new id.
    pub fn transformed(&self, transform: &Mat4) -> Mesh {
        let vertices = self
            .vertices
            .iter()
            .map(|v| transform.transform_point3(*v))
            .collect();
        Mesh::new(vertices, self.indices.clone())
    }

    /// True if both meshes carry bit-identical geometry, regardless of id.
    pub fn same_geometry(&self, other: &Mesh) -> bool {
        self.indices == other.indices
            && self.vertices.len() == other.vertices.len()
            && self
                .vertices
                .iter()
                .zip(&other.vertices)
                .all(|(a, b)| a.to_array().map(f32::to_bits) == b.to_array().map(f32::to_bits))
    }

    /// Returns true if every vertex is finite
    pub fn is_finite(&self) -> bool {
        self.vertices.iter().all(|v| v.is_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_triangle() -> Mesh {
        Mesh::from_arrays(&[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]], vec![0, 1, 2])
    }

    #[test]
    fn test_new_drops_invalid_triangles() {
        let mesh = Mesh::from_arrays(
            &[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            vec![0, 1, 2, 0, 1, 7, 2],
        );
        assert_eq!(mesh.triangle_count(), 1);
    }

    #[test]
    fn test_bounds() {
        let mesh = unit_triangle();
        assert_eq!(mesh.bounds().min, Vec3::ZERO);
        assert_eq!(mesh.bounds().max, Vec3::new(1.0, 1.0, 0.0));
    }

    #[test]
    fn test_transformed_gets_new_id() {
        let mesh = unit_triangle();
        let moved = mesh.transformed(&Mat4::from_translation(Vec3::new(2.0, 0.0, 0.0)));
        assert_ne!(mesh.id(), moved.id());
        assert_eq!(moved.triangle(0)[0], Vec3::new(2.0, 0.0, 0.0));
    }

    #[test]
    fn test_same_geometry_ignores_id() {
        let a = unit_triangle();
        let b = unit_triangle();
        assert_ne!(a.id(), b.id());
        assert!(a.same_geometry(&b));
        let c = a.transformed(&Mat4::from_scale(Vec3::splat(2.0)));
        assert!(!a.same_geometry(&c));
    }
}
