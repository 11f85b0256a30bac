//! Undo/redo of transform edits
//!
//! Interaction code only appends [`TransformEdit`]s through [`UndoLog`];
//! the buffer owns the history and replays matrices on undo and redo.

use std::collections::VecDeque;

use glam::Mat4;

use crate::constants::UNDO_MAX_ENTRIES;
use crate::scene::SceneNode;

/// An object's matrix before and after an edit. Immutable once created.
#[derive(Debug, Clone)]
pub struct TransformEdit {
    target: SceneNode,
    before: Mat4,
    after: Mat4,
}

impl TransformEdit {
    pub fn new(target: SceneNode, before: Mat4, after: Mat4) -> Self {
        Self {
            target,
            before,
            after,
        }
    }

    pub fn target(&self) -> &SceneNode {
        &self.target
    }

    pub fn before(&self) -> Mat4 {
        self.before
    }

    pub fn after(&self) -> Mat4 {
        self.after
    }

    /// True if applying the edit changes nothing
    pub fn is_noop(&self) -> bool {
        self.before == self.after
    }

    fn revert(&self) {
        self.target.set_matrix(self.before);
    }

    fn apply(&self) {
        self.target.set_matrix(self.after);
    }
}

/// Sink for committed edits
pub trait UndoLog {
    /// Record one user-visible step made of one or more edits.
    fn append(&mut self, description: &str, edits: Vec<TransformEdit>);
}

/// One undoable step
#[derive(Debug, Clone)]
pub struct UndoEntry {
    pub description: String,
    pub edits: Vec<TransformEdit>,
}

/// Bounded undo history with a redo stack
#[derive(Debug)]
pub struct UndoBuffer {
    history: VecDeque<UndoEntry>,
    redo: Vec<UndoEntry>,
    max_entries: usize,
}

impl Default for UndoBuffer {
    fn default() -> Self {
        Self::new(UNDO_MAX_ENTRIES)
    }
}

impl UndoBuffer {
    pub fn new(max_entries: usize) -> Self {
        Self {
            history: VecDeque::new(),
            redo: Vec::new(),
            max_entries: max_entries.max(1),
        }
    }

    /// Push a step. Clears the redo stack and drops the oldest step when full.
    pub fn add(&mut self, entry: UndoEntry) {
        if self.history.len() >= self.max_entries {
            self.history.pop_front();
        }
        self.history.push_back(entry);
        self.redo.clear();
    }

    /// Restore every `before` matrix of the latest step, newest edit first.
    pub fn undo(&mut self) -> bool {
        let Some(entry) = self.history.pop_back() else {
            return false;
        };
        for edit in entry.edits.iter().rev() {
            edit.revert();
        }
        tracing::debug!("Undo: {}", entry.description);
        self.redo.push(entry);
        true
    }

    /// Re-apply every `after` matrix of the latest undone step.
    pub fn redo(&mut self) -> bool {
        let Some(entry) = self.redo.pop() else {
            return false;
        };
        for edit in &entry.edits {
            edit.apply();
        }
        tracing::debug!("Redo: {}", entry.description);
        self.history.push_back(entry);
        true
    }

    pub fn can_undo(&self) -> bool {
        !self.history.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// Number of undoable steps
    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn clear(&mut self) {
        self.history.clear();
        self.redo.clear();
    }
}

impl UndoLog for UndoBuffer {
    fn append(&mut self, description: &str, edits: Vec<TransformEdit>) {
        let edits: Vec<TransformEdit> = edits.into_iter().filter(|e| !e.is_noop()).collect();
        if edits.is_empty() {
            return;
        }
        self.add(UndoEntry {
            description: description.to_string(),
            edits,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::SceneObject;
    use glam::Vec3;

    #[test]
    fn test_undo_redo_restores_exact_matrices() {
        let object = SceneObject::new("a");
        let before = Mat4::from_translation(Vec3::new(0.1, 0.2, 0.3));
        let after = Mat4::from_translation(Vec3::new(12.7, -3.3, 0.3));
        object.set_matrix(after);

        let mut buffer = UndoBuffer::default();
        buffer.append("Move", vec![TransformEdit::new(object.clone(), before, after)]);

        assert!(buffer.undo());
        assert_eq!(object.matrix(), before);
        assert!(buffer.redo());
        assert_eq!(object.matrix(), after);
    }

    #[test]
    fn test_add_clears_redo() {
        let object = SceneObject::new("a");
        let mut buffer = UndoBuffer::default();
        let m1 = Mat4::from_translation(Vec3::X);
        let m2 = Mat4::from_translation(Vec3::Y);
        buffer.append("1", vec![TransformEdit::new(object.clone(), Mat4::IDENTITY, m1)]);
        buffer.undo();
        assert!(buffer.can_redo());
        buffer.append("2", vec![TransformEdit::new(object.clone(), Mat4::IDENTITY, m2)]);
        assert!(!buffer.can_redo());
    }

    #[test]
    fn test_max_entries_drops_oldest() {
        let object = SceneObject::new("a");
        let mut buffer = UndoBuffer::new(2);
        let step = |i: i32| Mat4::from_translation(Vec3::splat(i as f32));
        for i in 0..5 {
            object.set_matrix(step(i + 1));
            buffer.append("step", vec![TransformEdit::new(object.clone(), step(i), step(i + 1))]);
        }
        assert_eq!(buffer.len(), 2);

        assert!(buffer.undo());
        assert!(buffer.undo());
        assert!(!buffer.undo());
        assert_eq!(object.matrix(), step(3));

        assert!(buffer.redo());
        assert!(buffer.redo());
        assert_eq!(object.matrix(), step(5));
        assert_eq!(buffer.len(), 2);
    }

    #[test]
    fn test_noop_edits_are_dropped() {
        let object = SceneObject::new("a");
        let mut buffer = UndoBuffer::default();
        buffer.append(
            "Nothing",
            vec![TransformEdit::new(object, Mat4::IDENTITY, Mat4::IDENTITY)],
        );
        assert!(buffer.is_empty());
        assert!(!buffer.undo());
    }

    #[test]
    fn test_group_step_undoes_every_member() {
        let a = SceneObject::new("a");
        let b = SceneObject::new("b");
        let moved = Mat4::from_translation(Vec3::new(5.0, 0.0, 0.0));
        a.set_matrix(moved);
        b.set_matrix(moved);

        let mut buffer = UndoBuffer::default();
        buffer.append(
            "Move group",
            vec![
                TransformEdit::new(a.clone(), Mat4::IDENTITY, moved),
                TransformEdit::new(b.clone(), Mat4::IDENTITY, moved),
            ],
        );
        buffer.undo();
        assert_eq!(a.matrix(), Mat4::IDENTITY);
        assert_eq!(b.matrix(), Mat4::IDENTITY);
    }
}
