//! Change notifications and the rebuild trigger rule
//!
//! Every edit raises an [`InvalidateArgs`] at the edited object. The event
//! is offered to the object itself and then to each ancestor in turn; an
//! operation node may consume it (and rebuild) or let it pass upward.

use std::any::Any;
use std::fmt;

use crate::draw::DrawRequest;

use super::object::{ObjectId, SceneNode};

/// What changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InvalidateKind {
    Children,
    Matrix,
    Mesh,
    Properties,
}

/// A change notification and the object that caused it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidateArgs {
    pub source: ObjectId,
    pub kind: InvalidateKind,
}

impl InvalidateArgs {
    pub fn new(source: ObjectId, kind: InvalidateKind) -> Self {
        Self { source, kind }
    }
}

/// Whether a handler consumed an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidateResponse {
    /// Consumed; stop propagating.
    Handled,
    /// Continue to the parent unchanged.
    PassThrough,
}

/// Decides whether an operation node rebuilds for an event.
///
/// Geometry changes (children, matrix, mesh) coming from anything but the
/// node itself rebuild unless the node is rebuild-locked. Property changes
/// rebuild only when raised on the node itself.
pub fn should_rebuild(kind: InvalidateKind, from_self: bool, locked: bool) -> bool {
    match kind {
        InvalidateKind::Children | InvalidateKind::Matrix | InvalidateKind::Mesh => {
            !from_self && !locked
        }
        InvalidateKind::Properties => from_self,
    }
}

/// Extra drawing an operation contributes while being edited
#[derive(Debug, Default)]
pub struct EditorDraw {
    /// Skip the node's normal mesh drawing
    pub suppress_default: bool,
    pub requests: Vec<DrawRequest>,
}

/// Behavior attached to an operation node.
pub trait Rebuildable: Send + Sync + fmt::Debug {
    /// Short name of the operation, for logs
    fn operation_name(&self) -> &str;

    /// React to an event delivered to `node`.
    fn on_invalidate(&self, node: &SceneNode, args: &InvalidateArgs) -> InvalidateResponse;

    /// Overlay drawn in place of (or on top of) the node's meshes.
    fn draw_editor(&self, _node: &SceneNode, _selected: bool) -> EditorDraw {
        EditorDraw::default()
    }

    fn as_any(&self) -> &dyn Any;
}
