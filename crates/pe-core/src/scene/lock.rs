//! Rebuild suppression and the per-node rebuild phase

use parking_lot::Mutex;

use super::object::SceneNode;

/// Scoped token suppressing geometry-triggered rebuilds on the locked nodes.
///
/// Locks nest: a node stays locked while any token covering it is alive.
/// Dropping the token releases it, including during unwinding.
#[must_use = "the lock is released as soon as the token is dropped"]
#[derive(Debug)]
pub struct RebuildLock {
    nodes: Vec<SceneNode>,
}

impl RebuildLock {
    /// Lock a single node
    pub fn acquire(node: &SceneNode) -> Self {
        node.increment_rebuild_lock();
        Self {
            nodes: vec![node.clone()],
        }
    }

    /// Lock a node and all of its current descendants
    pub fn acquire_all(node: &SceneNode) -> Self {
        let mut nodes = vec![node.clone()];
        nodes.extend(node.descendants());
        for n in &nodes {
            n.increment_rebuild_lock();
        }
        Self { nodes }
    }

    /// Number of nodes covered by this token
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl Drop for RebuildLock {
    fn drop(&mut self) {
        for node in &self.nodes {
            node.decrement_rebuild_lock();
        }
    }
}

/// Rebuild state of one operation node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RebuildPhase {
    #[default]
    Idle,
    /// A rebuild is in flight; `pending` records triggers that arrived
    /// meanwhile.
    Rebuilding { pending: bool },
}

/// Outcome of asking for a rebuild
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebuildRequest {
    /// The caller owns the new rebuild and must run it.
    Start,
    /// Folded into the in-flight rebuild.
    Coalesced,
}

/// Single-flight state machine `Idle -> Rebuilding -> Idle`.
#[derive(Debug, Default)]
pub struct RebuildTracker {
    phase: Mutex<RebuildPhase>,
}

impl RebuildTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> RebuildPhase {
        *self.phase.lock()
    }

    pub fn is_rebuilding(&self) -> bool {
        matches!(self.phase(), RebuildPhase::Rebuilding { .. })
    }

    pub fn request(&self) -> RebuildRequest {
        let mut phase = self.phase.lock();
        match *phase {
            RebuildPhase::Idle => {
                *phase = RebuildPhase::Rebuilding { pending: false };
                RebuildRequest::Start
            }
            RebuildPhase::Rebuilding { .. } => {
                *phase = RebuildPhase::Rebuilding { pending: true };
                RebuildRequest::Coalesced
            }
        }
    }

    /// Called when a run completes. Returns true if coalesced triggers
    /// require one more run; the tracker then stays in `Rebuilding`.
    pub fn finish(&self) -> bool {
        let mut phase = self.phase.lock();
        match *phase {
            RebuildPhase::Rebuilding { pending: true } => {
                *phase = RebuildPhase::Rebuilding { pending: false };
                true
            }
            _ => {
                *phase = RebuildPhase::Idle;
                false
            }
        }
    }

    /// Drop any pending work and return to `Idle`.
    pub fn reset(&self) {
        *self.phase.lock() = RebuildPhase::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::SceneObject;

    #[test]
    fn test_lock_nests_and_releases() {
        let child = SceneObject::new("child");
        let parent = SceneObject::group("parent", vec![child.clone()]);

        let outer = RebuildLock::acquire_all(&parent);
        assert_eq!(outer.len(), 2);
        assert!(parent.is_rebuild_locked());
        assert!(child.is_rebuild_locked());

        let inner = RebuildLock::acquire(&parent);
        drop(outer);
        assert!(parent.is_rebuild_locked());
        assert!(!child.is_rebuild_locked());

        drop(inner);
        assert!(!parent.is_rebuild_locked());
    }

    #[test]
    fn test_lock_released_on_panic() {
        let node = SceneObject::new("node");
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _lock = RebuildLock::acquire(&node);
            panic!("boom");
        }));
        assert!(result.is_err());
        assert!(!node.is_rebuild_locked());
    }

    #[test]
    fn test_tracker_coalesces() {
        let tracker = RebuildTracker::new();
        assert_eq!(tracker.request(), RebuildRequest::Start);
        assert_eq!(tracker.request(), RebuildRequest::Coalesced);
        assert_eq!(tracker.request(), RebuildRequest::Coalesced);
        // Coalesced triggers collapse into exactly one more run
        assert!(tracker.finish());
        assert!(tracker.is_rebuilding());
        assert!(!tracker.finish());
        assert_eq!(tracker.phase(), RebuildPhase::Idle);
    }

    #[test]
    fn test_tracker_reset() {
        let tracker = RebuildTracker::new();
        tracker.request();
        tracker.request();
        tracker.reset();
        assert_eq!(tracker.phase(), RebuildPhase::Idle);
        assert_eq!(tracker.request(), RebuildRequest::Start);
    }
}
