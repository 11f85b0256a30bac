//! Region query contract for [`SpatialIndex::query_region`](super::SpatialIndex::query_region).

use glam::{Mat4, Vec3};

use crate::bounds::BoundingBox;

/// How much of a node a region covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coverage {
    /// No part of the node can match; prune it.
    Outside,
    /// Some part may match; descend to triangles.
    Partial,
    /// The whole node lies inside the region.
    Contained,
}

/// Whether a region query stops at the first hit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionLimit {
    First,
    All,
}

/// One accepted piece of geometry
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RegionHit {
    /// A whole node, with its bounds in world space
    Node(BoundingBox),
    /// A single triangle, by index into the mesh
    Triangle(usize),
}

/// A region tested against model-space nodes placed by a world transform.
pub trait RegionQuery {
    /// Classify a model-space node placed by `world`.
    fn coverage(&self, bounds: &BoundingBox, world: &Mat4) -> Coverage;

    /// Test a triangle already in world space.
    fn matches_triangle(&self, triangle: &[Vec3; 3]) -> bool;
}
