//! Copy-on-write child list

use std::sync::Arc;

use parking_lot::RwLock;

use super::object::SceneNode;

/// Ordered children of a scene object.
///
/// Readers take an `Arc` snapshot and iterate it without holding any lock;
/// writers clone, edit and publish a new vector in one swap, so a snapshot is
/// never observed half-updated.
#[derive(Debug, Default)]
pub struct ChildList {
    inner: RwLock<Arc<Vec<SceneNode>>>,
}

impl ChildList {
    pub fn new(children: Vec<SceneNode>) -> Self {
        Self {
            inner: RwLock::new(Arc::new(children)),
        }
    }

    /// Current children
    pub fn snapshot(&self) -> Arc<Vec<SceneNode>> {
        self.inner.read().clone()
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// The single mutation entry point. Returns the previous and the newly
    /// published list along with the closure's result.
    pub fn modify<R>(
        &self,
        edit: impl FnOnce(&mut Vec<SceneNode>) -> R,
    ) -> (Arc<Vec<SceneNode>>, Arc<Vec<SceneNode>>, R) {
        let mut guard = self.inner.write();
        let previous = guard.clone();
        let mut next = (*previous).clone();
        let result = edit(&mut next);
        let next = Arc::new(next);
        *guard = next.clone();
        (previous, next, result)
    }
}
