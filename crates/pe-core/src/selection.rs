//! Selection state
//!
//! An explicit value rather than ambient state, so every viewport (or test)
//! owns its own selection. Holding more than one object makes the selection
//! act as a group: it is moved, outlined and deleted as a unit.

use std::sync::Arc;

use glam::{Mat4, Vec3};

use crate::bounds::BoundingBox;
use crate::ray::Plane;
use crate::scene::SceneNode;

/// Corner of the selection's footprint that was grabbed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HitQuadrant {
    #[default]
    LeftBottom,
    LeftTop,
    RightBottom,
    RightTop,
}

impl HitQuadrant {
    /// Quadrant of `hit` relative to `center`, by X and Y
    pub fn from_hit(hit: Vec3, center: Vec3) -> Self {
        match (hit.x < center.x, hit.y < center.y) {
            (true, true) => HitQuadrant::LeftBottom,
            (true, false) => HitQuadrant::LeftTop,
            (false, true) => HitQuadrant::RightBottom,
            (false, false) => HitQuadrant::RightTop,
        }
    }

    /// The max-X edge is the grabbed one
    pub fn is_right(self) -> bool {
        matches!(self, HitQuadrant::RightBottom | HitQuadrant::RightTop)
    }

    /// The max-Y edge is the grabbed one
    pub fn is_top(self) -> bool {
        matches!(self, HitQuadrant::LeftTop | HitQuadrant::RightTop)
    }
}

/// Transient state of one press-drag-release gesture
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SelectInfo {
    pub hit_quadrant: HitQuadrant,
    /// The press landed on the selection
    pub down_on_part: bool,
    /// Plane the pointer is projected onto while dragging
    pub hit_plane: Plane,
    /// Translation applied by the previous drag frame
    pub last_move_delta: Vec3,
    /// World position of the press on the hit plane
    pub plane_down_hit_pos: Vec3,
}

/// Selected top-level objects plus drag state
#[derive(Debug, Clone, Default)]
pub struct SelectionContext {
    items: Vec<SceneNode>,
    pub info: SelectInfo,
}

impl SelectionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// More than one object is selected
    pub fn is_group(&self) -> bool {
        self.items.len() > 1
    }

    pub fn items(&self) -> &[SceneNode] {
        &self.items
    }

    /// First selected object
    pub fn primary(&self) -> Option<&SceneNode> {
        self.items.first()
    }

    pub fn contains(&self, object: &SceneNode) -> bool {
        self.items.iter().any(|o| Arc::ptr_eq(o, object))
    }

    /// `object` is selected or lies inside a selected object
    pub fn covers(&self, object: &SceneNode) -> bool {
        self.contains(object) || self.items.iter().any(|o| object.is_descendant_of(o))
    }

    /// Replace the selection with a single object
    pub fn set(&mut self, object: SceneNode) {
        self.items.clear();
        self.items.push(object);
    }

    /// Replace the selection with several objects, dropping duplicates
    pub fn set_many(&mut self, objects: impl IntoIterator<Item = SceneNode>) {
        self.items.clear();
        for object in objects {
            self.add(object);
        }
    }

    /// Add an object, turning the selection into a group if needed
    pub fn add(&mut self, object: SceneNode) {
        if !self.contains(&object) {
            self.items.push(object);
        }
    }

    pub fn remove(&mut self, object: &SceneNode) -> bool {
        let before = self.items.len();
        self.items.retain(|o| !Arc::ptr_eq(o, object));
        before != self.items.len()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Take the selected objects, leaving the selection empty
    pub fn take(&mut self) -> Vec<SceneNode> {
        std::mem::take(&mut self.items)
    }

    /// Combined world bounds of the selection
    pub fn world_bounds(&self) -> BoundingBox {
        self.items
            .iter()
            .fold(BoundingBox::empty(), |b, o| b.union(&o.world_bounds()))
    }

    /// Current local matrix of every selected object
    pub fn matrices(&self) -> Vec<(SceneNode, Mat4)> {
        self.items.iter().map(|o| (o.clone(), o.matrix())).collect()
    }

    /// Reset the per-gesture state for a new press
    pub fn begin_press(&mut self) {
        self.info = SelectInfo::default();
    }
}
