//! Axis-aligned boxes used for object extents, BVH nodes and placement

use glam::{Mat4, Vec3};

use crate::ray::Ray;

/// Box spanned by `min` and `max`. An inverted box (min > max) is empty.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl BoundingBox {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// The identity for [`union`](Self::union): contains nothing.
    pub fn empty() -> Self {
        Self::new(Vec3::INFINITY, Vec3::NEG_INFINITY)
    }

    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Self {
        let mut bounds = Self::empty();
        for point in points {
            bounds = bounds.expand_to_include(point);
        }
        bounds
    }

    pub fn center(&self) -> Vec3 {
        self.min.lerp(self.max, 0.5)
    }

    /// Full extent along each axis
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Inclusive on every face
    pub fn contains_point(&self, point: Vec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    /// Overlap test, touching faces included
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.min.cmple(other.max).all() && self.max.cmpge(other.min).all()
    }

    /// Overlap of the footprints on the bed, ignoring Z
    pub fn intersects_xy(&self, other: &BoundingBox) -> bool {
        self.min.truncate().cmple(other.max.truncate()).all()
            && self.max.truncate().cmpge(other.min.truncate()).all()
    }

    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        Self::new(self.min.min(other.min), self.max.max(other.max))
    }

    pub fn expand_to_include(&self, point: Vec3) -> BoundingBox {
        Self::new(self.min.min(point), self.max.max(point))
    }

    /// The four corners of the bottom face (min z), counter-clockwise from min.
    pub fn bottom_corners(&self) -> [Vec3; 4] {
        [
            Vec3::new(self.min.x, self.min.y, self.min.z),
            Vec3::new(self.max.x, self.min.y, self.min.z),
            Vec3::new(self.max.x, self.max.y, self.min.z),
            Vec3::new(self.min.x, self.max.y, self.min.z),
        ]
    }

    /// The four corners of the top face (max z), in the same order as
    /// [`bottom_corners`](Self::bottom_corners).
    pub fn top_corners(&self) -> [Vec3; 4] {
        self.bottom_corners().map(|c| Vec3::new(c.x, c.y, self.max.z))
    }

    /// All eight corners: bottom face followed by top face.
    pub fn corners(&self) -> [Vec3; 8] {
        let b = self.bottom_corners();
        let t = self.top_corners();
        [b[0], b[1], b[2], b[3], t[0], t[1], t[2], t[3]]
    }

    /// Box around the eight transformed corners. Loose under rotation;
    /// empty boxes stay empty.
    pub fn transform(&self, transform: &Mat4) -> BoundingBox {
        if !self.is_valid() {
            return *self;
        }
        BoundingBox::from_points(self.corners().map(|c| transform.transform_point3(c)))
    }

    /// Slab test. Returns the entry distance along the ray if it hits.
    pub fn intersect_ray(&self, ray: &Ray) -> Option<f32> {
        let inv = ray.direction.recip();
        let t0 = (self.min - ray.origin) * inv;
        let t1 = (self.max - ray.origin) * inv;
        let t_near = t0.min(t1).max_element();
        let t_far = t0.max(t1).min_element();
        if t_far >= t_near.max(0.0) {
            Some(t_near.max(0.0))
        } else {
            None
        }
    }

    /// False for empty (inverted) boxes
    pub fn is_valid(&self) -> bool {
        self.min.cmple(self.max).all()
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::empty()
    }
}
