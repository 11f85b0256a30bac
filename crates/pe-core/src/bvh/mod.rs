//! Bounding volume hierarchy over a mesh's triangles
//!
//! The index stores model-space geometry only. Every query takes the owning
//! object's world transform, so moving or hiding an object never invalidates
//! its index; only a new mesh reference does.

mod region;

pub use region::{Coverage, RegionHit, RegionLimit, RegionQuery};

use std::sync::Arc;

use glam::{Mat4, Vec3};

use crate::bounds::BoundingBox;
use crate::constants::BVH_MAX_LEAF_TRIANGLES;
use crate::mesh::{Mesh, MeshId};
use crate::ray::{Ray, intersect_triangle};

/// Nearest ray hit against an indexed mesh
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TraceHit {
    /// Hit position in world space
    pub position: Vec3,
    /// Distance from the ray origin in world units
    pub distance: f32,
    /// Index of the triangle that was hit
    pub triangle: usize,
}

#[derive(Debug, Clone)]
enum BvhNode {
    Leaf {
        bounds: BoundingBox,
        start: usize,
        count: usize,
    },
    Internal {
        bounds: BoundingBox,
        left: usize,
        right: usize,
    },
}

impl BvhNode {
    fn bounds(&self) -> &BoundingBox {
        match self {
            BvhNode::Leaf { bounds, .. } | BvhNode::Internal { bounds, .. } => bounds,
        }
    }
}

struct TriangleInfo {
    bounds: BoundingBox,
    centroid: Vec3,
}

/// Immutable spatial index for one mesh
#[derive(Debug, Clone)]
pub struct SpatialIndex {
    mesh: Arc<Mesh>,
    nodes: Vec<BvhNode>,
    /// Triangle indices ordered so every leaf owns a contiguous range
    order: Vec<usize>,
}

impl SpatialIndex {
    /// Build with the default leaf size
    pub fn build(mesh: Arc<Mesh>) -> Self {
        Self::build_with_leaf_size(mesh, BVH_MAX_LEAF_TRIANGLES)
    }

    /// Build splitting at the median of the longest centroid axis until
    /// leaves hold at most `max_leaf_triangles`.
    pub fn build_with_leaf_size(mesh: Arc<Mesh>, max_leaf_triangles: usize) -> Self {
        let max_leaf = max_leaf_triangles.max(1);
        let info: Vec<TriangleInfo> = mesh
            .triangles()
            .map(|tri| {
                let bounds = BoundingBox::from_points(tri);
                TriangleInfo {
                    bounds,
                    centroid: (tri[0] + tri[1] + tri[2]) / 3.0,
                }
            })
            .collect();

        let mut order: Vec<usize> = (0..info.len()).collect();
        let mut nodes = Vec::new();
        if !order.is_empty() {
            build_range(&mut nodes, &mut order, 0, &info, max_leaf);
        }

        tracing::trace!(
            triangles = info.len(),
            nodes = nodes.len(),
            "Built spatial index"
        );

        Self { mesh, nodes, order }
    }

    /// Identity of the indexed mesh
    pub fn mesh_id(&self) -> MeshId {
        self.mesh.id()
    }

    pub fn mesh(&self) -> &Arc<Mesh> {
        &self.mesh
    }

    /// Model-space bounds of the whole mesh
    pub fn bounds(&self) -> BoundingBox {
        self.nodes
            .first()
            .map(|n| *n.bounds())
            .unwrap_or_else(BoundingBox::empty)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Nearest intersection of a world-space ray with the mesh placed by
    /// `world`.
    pub fn intersect_ray(&self, ray: &Ray, world: &Mat4) -> Option<TraceHit> {
        if self.nodes.is_empty() || world.determinant().abs() <= f32::EPSILON {
            return None;
        }

        // The local ray keeps the world parameterization, so `t` is a world
        // distance for a normalized world ray.
        let local = ray.transform(&world.inverse());
        let mut best: Option<(f32, usize)> = None;
        let mut stack = vec![0usize];

        while let Some(index) = stack.pop() {
            let node = &self.nodes[index];
            let Some(entry) = node.bounds().intersect_ray(&local) else {
                continue;
            };
            if best.is_some_and(|(t, _)| entry > t) {
                continue;
            }
            match node {
                BvhNode::Leaf { start, count, .. } => {
                    for &tri in &self.order[*start..*start + *count] {
                        if let Some(t) = intersect_triangle(&local, &self.mesh.triangle(tri)) {
                            if best.is_none_or(|(best_t, _)| t < best_t) {
                                best = Some((t, tri));
                            }
                        }
                    }
                }
                BvhNode::Internal { left, right, .. } => {
                    stack.push(*right);
                    stack.push(*left);
                }
            }
        }

        best.map(|(t, triangle)| TraceHit {
            position: ray.at(t),
            distance: t,
            triangle,
        })
    }

    /// Collects the parts of the mesh a region query accepts.
    ///
    /// Nodes the query reports as [`Coverage::Contained`] are returned whole
    /// without descending; partially covered leaves are tested triangle by
    /// triangle in world space.
    pub fn query_region<Q: RegionQuery + ?Sized>(
        &self,
        query: &Q,
        world: &Mat4,
        limit: RegionLimit,
    ) -> Vec<RegionHit> {
        let mut hits = Vec::new();
        let mut stack = if self.nodes.is_empty() {
            Vec::new()
        } else {
            vec![0usize]
        };

        while let Some(index) = stack.pop() {
            let node = &self.nodes[index];
            match query.coverage(node.bounds(), world) {
                Coverage::Outside => continue,
                Coverage::Contained => {
                    hits.push(RegionHit::Node(node.bounds().transform(world)));
                    if limit == RegionLimit::First {
                        return hits;
                    }
                }
                Coverage::Partial => match node {
                    BvhNode::Leaf { start, count, .. } => {
                        for &tri in &self.order[*start..*start + *count] {
                            let world_tri =
                                self.mesh.triangle(tri).map(|v| world.transform_point3(v));
                            if query.matches_triangle(&world_tri) {
                                hits.push(RegionHit::Triangle(tri));
                                if limit == RegionLimit::First {
                                    return hits;
                                }
                            }
                        }
                    }
                    BvhNode::Internal { left, right, .. } => {
                        stack.push(*right);
                        stack.push(*left);
                    }
                },
            }
        }

        hits
    }
}

fn build_range(
    nodes: &mut Vec<BvhNode>,
    order: &mut [usize],
    offset: usize,
    info: &[TriangleInfo],
    max_leaf: usize,
) -> usize {
    let bounds = order
        .iter()
        .fold(BoundingBox::empty(), |b, &t| b.union(&info[t].bounds));
    let index = nodes.len();

    let centroid_extent =
        BoundingBox::from_points(order.iter().map(|&t| info[t].centroid)).size();
    let axis = if centroid_extent.x >= centroid_extent.y && centroid_extent.x >= centroid_extent.z
    {
        0
    } else if centroid_extent.y >= centroid_extent.z {
        1
    } else {
        2
    };

    if order.len() <= max_leaf || centroid_extent[axis] <= 0.0 {
        nodes.push(BvhNode::Leaf {
            bounds,
            start: offset,
            count: order.len(),
        });
        return index;
    }

    let mid = order.len() / 2;
    order.select_nth_unstable_by(mid, |&a, &b| {
        info[a].centroid[axis].total_cmp(&info[b].centroid[axis])
    });

    // Placeholder, patched once both children exist
    nodes.push(BvhNode::Leaf {
        bounds,
        start: offset,
        count: 0,
    });
    let (lower, upper) = order.split_at_mut(mid);
    let left = build_range(nodes, lower, offset, info, max_leaf);
    let right = build_range(nodes, upper, offset + mid, info, max_leaf);
    nodes[index] = BvhNode::Internal {
        bounds,
        left,
        right,
    };
    index
}
