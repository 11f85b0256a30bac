//! Live translation of the selection
//!
//! A press on the selection fixes a horizontal plane through the hit point.
//! Every pointer move re-intersects that plane, snaps the grabbed edge of the
//! selection to the grid and moves the selection by the change since the
//! previous frame. Releasing commits one undo step for the whole drag.

use glam::{Mat4, Vec3};
use pe_core::{
    BoundingBox, HitQuadrant, Plane, Ray, SceneNode, SelectionContext, TransformEdit, UndoLog,
};
use tracing::debug;

/// Gesture state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DragState {
    #[default]
    Idle,
    /// Pressed on the selection, not moved yet
    DownOnObject,
    Dragging,
}

/// Drives press, move and release on the selection
#[derive(Debug, Default)]
pub struct DragEngine {
    state: DragState,
    snap_grid: f32,
    /// Matrices of the selected objects at the press
    before: Vec<(SceneNode, Mat4)>,
    /// Selection bounds at the press
    bounds_before: BoundingBox,
}

impl DragEngine {
    pub fn new(snap_grid: f32) -> Self {
        Self {
            snap_grid: snap_grid.max(0.0),
            ..Self::default()
        }
    }

    pub fn state(&self) -> DragState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state != DragState::Idle
    }

    pub fn snap_grid(&self) -> f32 {
        self.snap_grid
    }

    /// Grid spacing in world units; zero disables snapping.
    pub fn set_snap_grid(&mut self, snap_grid: f32) {
        self.snap_grid = snap_grid.max(0.0);
    }

    /// Start a drag at a world hit on the selection.
    pub fn begin(&mut self, selection: &mut SelectionContext, hit: Vec3) {
        self.begin_on_plane(selection, Plane::horizontal(hit.z), hit);
    }

    /// Start a drag on an explicit plane through `hit`.
    pub fn begin_on_plane(&mut self, selection: &mut SelectionContext, plane: Plane, hit: Vec3) {
        selection.begin_press();
        let bounds = selection.world_bounds();
        let info = &mut selection.info;
        info.down_on_part = true;
        info.hit_plane = plane;
        info.plane_down_hit_pos = hit;
        info.hit_quadrant = HitQuadrant::from_hit(hit, bounds.center());

        self.before = selection.matrices();
        self.bounds_before = bounds;
        self.state = DragState::DownOnObject;
        debug!(
            "Drag start on {} objects, quadrant {:?}",
            self.before.len(),
            selection.info.hit_quadrant
        );
    }

    /// Follow the pointer. Returns the total delta since the press, or `None`
    /// if no drag is active or the ray misses the drag plane.
    pub fn update(
        &mut self,
        selection: &mut SelectionContext,
        ray: &Ray,
        axis_lock: bool,
    ) -> Option<Vec3> {
        if !self.is_active() || !selection.info.down_on_part {
            return None;
        }
        let point = selection.info.hit_plane.ray_point(ray)?;
        let mut delta = point - selection.info.plane_down_hit_pos;
        if self.snap_grid > 0.0 {
            delta = snap_to_grid(
                delta,
                &self.bounds_before,
                selection.info.hit_quadrant,
                self.snap_grid,
            );
        }
        if axis_lock {
            delta = lock_axis(delta);
        }

        let last = selection.info.last_move_delta;
        if delta != last {
            let step = Mat4::from_translation(delta) * Mat4::from_translation(-last);
            for object in selection.items() {
                object.update_matrix(|matrix| step * matrix);
            }
            selection.info.last_move_delta = delta;
        }
        self.state = DragState::Dragging;
        Some(delta)
    }

    /// End the drag, recording one undo step if the selection moved.
    pub fn finish(&mut self, selection: &mut SelectionContext, undo: &mut dyn UndoLog) -> bool {
        if !self.is_active() {
            return false;
        }
        let moved = selection.info.down_on_part && selection.info.last_move_delta != Vec3::ZERO;
        if moved {
            let edits = self
                .before
                .iter()
                .map(|(object, before)| TransformEdit::new(object.clone(), *before, object.matrix()))
                .collect();
            undo.append("Move", edits);
            debug!("Drag committed: {:?}", selection.info.last_move_delta);
        }
        self.release(selection);
        moved
    }

    /// End the drag keeping the current matrices and recording nothing.
    pub fn release(&mut self, selection: &mut SelectionContext) {
        selection.info.last_move_delta = Vec3::ZERO;
        selection.info.down_on_part = false;
        self.before.clear();
        self.state = DragState::Idle;
    }

    /// Abort the drag, restoring every matrix from the press.
    pub fn cancel(&mut self, selection: &mut SelectionContext) -> bool {
        if !self.is_active() {
            return false;
        }
        for (object, before) in &self.before {
            object.set_matrix(*before);
        }
        debug!("Drag cancelled");
        self.release(selection);
        true
    }
}

/// Adjust X and Y of `delta` so the grabbed edge of `bounds` lands on a
/// multiple of `grid`. Left/bottom quadrants snap the min edge, right/top
/// the max edge.
pub fn snap_to_grid(delta: Vec3, bounds: &BoundingBox, quadrant: HitQuadrant, grid: f32) -> Vec3 {
    if grid <= 0.0 || !bounds.is_valid() {
        return delta;
    }
    let snap = |edge: f32, offset: f32| {
        let snapped = ((edge + offset) / grid + 0.5).floor() * grid;
        snapped - edge
    };
    let edge_x = if quadrant.is_right() { bounds.max.x } else { bounds.min.x };
    let edge_y = if quadrant.is_top() { bounds.max.y } else { bounds.min.y };
    Vec3::new(snap(edge_x, delta.x), snap(edge_y, delta.y), delta.z)
}

/// Zero the smaller of the X and Y components.
pub fn lock_axis(delta: Vec3) -> Vec3 {
    if delta.x.abs() < delta.y.abs() {
        Vec3::new(0.0, delta.y, delta.z)
    } else {
        Vec3::new(delta.x, 0.0, delta.z)
    }
}
