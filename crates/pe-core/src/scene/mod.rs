//! Scene graph
//!
//! A [`Scene`] owns a root object; its direct children are the *top-level*
//! objects the user selects and moves.

mod children;
mod flags;
mod invalidate;
mod lock;
mod object;

pub use children::ChildList;
pub use flags::PropertyFlags;
pub use hit_test::HitTestable;
pub use invalidate::{
    EditorDraw, InvalidateArgs, InvalidateKind, InvalidateResponse, Rebuildable, should_rebuild,
};
pub use lock::{RebuildLock, RebuildPhase, RebuildRequest, RebuildTracker};
pub use object::{
    MeshInstance, ObjectBuilder, ObjectId, ObjectKind, ObjectProperties, SceneNode, SceneObject,
};

use std::sync::Arc;

/// The editable scene
#[derive(Debug, Clone)]
pub struct Scene {
    root: SceneNode,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    pub fn new() -> Self {
        Self {
            root: SceneObject::root(),
        }
    }

    pub fn root(&self) -> &SceneNode {
        &self.root
    }

    /// Top-level objects
    pub fn children(&self) -> Arc<Vec<SceneNode>> {
        self.root.children()
    }

    pub fn is_empty(&self) -> bool {
        !self.root.has_children()
    }

    /// Add a top-level object
    pub fn add(&self, object: SceneNode) {
        self.root.add_child(object);
    }

    /// Remove a top-level object
    pub fn remove(&self, object: &SceneNode) -> bool {
        self.root.remove_child(object)
    }

    /// Remove several top-level objects in one edit
    pub fn remove_all(&self, objects: &[SceneNode]) -> usize {
        let removed = self.root.modify_children(|children| {
            let before = children.len();
            children.retain(|c| !objects.iter().any(|o| Arc::ptr_eq(c, o)));
            before - children.len()
        });
        if removed > 0 {
            self.root.invalidate(InvalidateKind::Children);
        }
        removed
    }

    /// Find a top-level object by name
    pub fn find(&self, name: &str) -> Option<SceneNode> {
        self.root.find_child(name)
    }

    /// True if `object` is a top-level object of this scene
    pub fn contains(&self, object: &SceneNode) -> bool {
        self.children().iter().any(|c| Arc::ptr_eq(c, object))
    }

    /// The top-level object that `object` belongs to
    pub fn top_level_of(&self, object: &SceneNode) -> Option<SceneNode> {
        let mut current = object.clone();
        loop {
            let parent = current.parent()?;
            if Arc::ptr_eq(&parent, &self.root) {
                return Some(current);
            }
            current = parent;
        }
    }

    /// Invalidations that have reached the root so far
    pub fn revision(&self) -> u64 {
        self.root.revision().unwrap_or_default()
    }
}
