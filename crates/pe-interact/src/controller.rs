//! Routes pointer and keyboard events to picking, dragging and undo

use glam::Vec2;
use pe_core::config::BedConfig;
use pe_core::{
    DrawRequest, Drawable, EditorConfig, Scene, SceneNode, SelectionContext, TransformEdit,
    UndoBuffer, UndoLog,
};
use tracing::{debug, info};

use crate::drag::DragEngine;
use crate::input::{KeyCommand, KeyEvent, Modifiers, MouseButton, PointerEvent};
use crate::picking::{PickOutcome, apply_point_pick, apply_region_pick, pick_point, pick_region};
use crate::placement::{self, DropSession};
use crate::rect::ScreenRect;
use crate::viewport::WorldView;

/// Rectangle being dragged out, in viewport-local pixels
#[derive(Debug, Clone, Copy, PartialEq)]
struct Marquee {
    start: Vec2,
    end: Vec2,
}

impl Marquee {
    fn rect(&self) -> ScreenRect {
        ScreenRect::from_corners(self.start, self.end)
    }
}

/// Editing state of one viewport
#[derive(Debug)]
pub struct InteractionController {
    bed: BedConfig,
    clamp_selection_rect: bool,
    selection: SelectionContext,
    drag: DragEngine,
    undo: UndoBuffer,
    marquee: Option<Marquee>,
    drop: Option<DropSession>,
}

impl InteractionController {
    pub fn new(config: &EditorConfig) -> Self {
        Self {
            bed: config.bed.clone(),
            clamp_selection_rect: config.interaction.clamp_selection_rect,
            selection: SelectionContext::new(),
            drag: DragEngine::new(config.interaction.snap_grid_distance),
            undo: UndoBuffer::new(config.undo.max_entries),
            marquee: None,
            drop: None,
        }
    }

    pub fn selection(&self) -> &SelectionContext {
        &self.selection
    }

    pub fn selection_mut(&mut self) -> &mut SelectionContext {
        &mut self.selection
    }

    pub fn undo_buffer(&self) -> &UndoBuffer {
        &self.undo
    }

    pub fn drag(&self) -> &DragEngine {
        &self.drag
    }

    pub fn set_snap_grid(&mut self, snap_grid: f32) {
        self.drag.set_snap_grid(snap_grid);
    }

    /// The marquee in viewport-local pixels, while one is being dragged
    pub fn marquee_rect(&self) -> Option<ScreenRect> {
        self.marquee.map(|m| m.rect())
    }

    pub fn handle(&mut self, scene: &Scene, view: &dyn WorldView, event: PointerEvent) {
        match event {
            PointerEvent::Down {
                position,
                button,
                modifiers,
            } => {
                self.pointer_down(scene, view, position, button, modifiers);
            }
            PointerEvent::Move {
                position,
                modifiers,
            } => {
                self.pointer_move(view, position, modifiers);
            }
            PointerEvent::Up { position, button } => {
                self.pointer_up(scene, view, position, button);
            }
        }
    }

    /// Press: pick, merge into the selection, then start a drag or a marquee.
    pub fn pointer_down(
        &mut self,
        scene: &Scene,
        view: &dyn WorldView,
        position: Vec2,
        button: MouseButton,
        modifiers: Modifiers,
    ) -> Option<PickOutcome> {
        if button != MouseButton::Left || self.drop.is_some() {
            return None;
        }
        let hit = pick_point(scene, view, position);
        let outcome = apply_point_pick(&mut self.selection, hit.as_ref().map(|h| &h.object), modifiers);
        match hit {
            Some(hit) if outcome.is_on_selection() => {
                self.drag.begin(&mut self.selection, hit.position);
            }
            _ => {
                self.selection.begin_press();
                let local = view.to_local(position);
                self.marquee = Some(Marquee {
                    start: local,
                    end: local,
                });
            }
        }
        Some(outcome)
    }

    pub fn pointer_move(&mut self, view: &dyn WorldView, position: Vec2, modifiers: Modifiers) {
        let local = view.to_local(position);
        if self.drag.is_active() {
            let ray = view.screen_to_ray(local);
            self.drag
                .update(&mut self.selection, &ray, modifiers.is_axis_lock());
        } else if let Some(marquee) = self.marquee.as_mut() {
            marquee.end = if self.clamp_selection_rect {
                view.local_bounds().clamp(local)
            } else {
                local
            };
        }
    }

    /// Release: commit a drag or resolve the marquee. Returns true if the
    /// scene or the selection changed.
    pub fn pointer_up(
        &mut self,
        scene: &Scene,
        view: &dyn WorldView,
        position: Vec2,
        button: MouseButton,
    ) -> bool {
        if button != MouseButton::Left {
            return false;
        }
        if self.drag.is_active() {
            return self.drag.finish(&mut self.selection, &mut self.undo);
        }
        let Some(mut marquee) = self.marquee.take() else {
            return false;
        };
        let local = view.to_local(position);
        marquee.end = if self.clamp_selection_rect {
            view.local_bounds().clamp(local)
        } else {
            local
        };
        let hits = pick_region(scene, view, marquee.rect());
        apply_region_pick(&mut self.selection, hits)
    }

    /// Run a keyboard command. Returns true if the key was bound.
    pub fn key_down(&mut self, scene: &Scene, event: KeyEvent) -> bool {
        let Some(command) = event.command() else {
            return false;
        };
        debug!("Key command {:?}", command);
        match command {
            KeyCommand::SelectAll => {
                self.selection.set_many(scene.children().iter().cloned());
            }
            KeyCommand::Undo => {
                self.undo.undo();
            }
            KeyCommand::Redo => {
                self.undo.redo();
            }
            KeyCommand::DeleteSelection => {
                // A drag in progress would otherwise commit moves of removed objects
                self.drag.release(&mut self.selection);
                self.drop = None;
                let removed = scene.remove_all(&self.selection.take());
                info!("Deleted {} objects", removed);
            }
            KeyCommand::CancelDrag => {
                if !self.drag.cancel(&mut self.selection) {
                    self.marquee = None;
                }
            }
            KeyCommand::ClearSelection => {
                self.selection.clear();
            }
        }
        true
    }

    /// Add a loaded object at an open spot on the bed and select it.
    pub fn insert(&mut self, scene: &Scene, object: SceneNode) {
        placement::insert_object(scene, &mut self.selection, object, &self.bed);
    }

    /// Start dragging an item in from outside the viewport.
    pub fn begin_drop(
        &mut self,
        scene: &Scene,
        view: &dyn WorldView,
        position: Vec2,
        item: SceneNode,
    ) -> bool {
        let ray = view.screen_to_ray(view.to_local(position));
        self.drop = placement::begin_drop(scene, &mut self.selection, &mut self.drag, &ray, item);
        self.drop.is_some()
    }

    pub fn drag_over(&mut self, view: &dyn WorldView, position: Vec2, modifiers: Modifiers) {
        if let Some(drop) = &self.drop {
            let ray = view.screen_to_ray(view.to_local(position));
            drop.drag_over(&mut self.selection, &mut self.drag, &ray, modifiers.is_axis_lock());
        }
    }

    /// Finish a drop. The item stays only if released over the viewport.
    pub fn finish_drop(&mut self, scene: &Scene, view: &dyn WorldView, position: Vec2) -> bool {
        let Some(drop) = self.drop.take() else {
            return false;
        };
        let in_bounds = view.local_bounds().contains(view.to_local(position));
        drop.finish(scene, &mut self.selection, &mut self.drag, in_bounds)
    }

    /// Lay every selected object flat as one undo step.
    pub fn lay_flat_selection(&mut self) -> bool {
        let before = self.selection.matrices();
        for object in self.selection.items() {
            placement::lay_flat(object);
        }
        let edits: Vec<TransformEdit> = before
            .into_iter()
            .map(|(object, matrix)| {
                let after = object.matrix();
                TransformEdit::new(object, matrix, after)
            })
            .collect();
        let changed = edits.iter().any(|e| !e.is_noop());
        self.undo.append("Lay Flat", edits);
        changed
    }

    /// Scene draw requests plus the marquee outline
    pub fn draw_requests(&self, scene: &Scene) -> Vec<DrawRequest> {
        let mut requests = scene.draw_requests(&self.selection);
        if let Some(rect) = self.marquee_rect() {
            requests.push(DrawRequest::SelectionRectangle {
                min: rect.min,
                max: rect.max,
            });
        }
        requests
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::camera::Camera;
    use crate::input::Key;
    use crate::viewport::Viewport;
    use approx::assert_abs_diff_eq;
    use glam::{Mat4, Vec3};
    use pe_core::SceneObject;
    use pe_core::config::CameraConfig;
    use pe_core::primitive::generate_box_mesh;

    fn top_view() -> Viewport {
        let config = CameraConfig {
            distance: 200.0,
            far_plane: 1000.0,
            pitch_degrees: 89.0,
            ..CameraConfig::default()
        };
        Viewport::new(Camera::from_config(&config, 1.0), Vec2::ZERO, Vec2::splat(800.0))
    }

    fn cube(name: &str, x: f32) -> SceneNode {
        SceneObject::builder(name)
            .mesh(Arc::new(generate_box_mesh([10.0, 10.0, 10.0])))
            .matrix(Mat4::from_translation(Vec3::new(x, 0.0, 0.0)))
            .build()
    }

    fn setup() -> (Scene, SceneNode, SceneNode, InteractionController, Viewport) {
        let scene = Scene::new();
        let a = cube("a", 0.0);
        let b = cube("b", 50.0);
        scene.add(a.clone());
        scene.add(b.clone());
        let controller = InteractionController::new(&EditorConfig::default());
        (scene, a, b, controller, top_view())
    }

    fn down(position: Vec2) -> PointerEvent {
        PointerEvent::Down {
            position,
            button: MouseButton::Left,
            modifiers: Modifiers::NONE,
        }
    }

    fn moved(position: Vec2) -> PointerEvent {
        PointerEvent::Move {
            position,
            modifiers: Modifiers::NONE,
        }
    }

    fn up(position: Vec2) -> PointerEvent {
        PointerEvent::Up {
            position,
            button: MouseButton::Left,
        }
    }

    #[test]
    fn test_click_drag_release_and_undo() {
        let (scene, a, _b, mut controller, view) = setup();
        let start = Vec2::splat(400.0);
        let target = view.world_to_screen(Vec3::new(7.0, 0.0, 5.0)).unwrap();

        controller.handle(&scene, &view, down(start));
        assert!(controller.selection().contains(&a));
        assert!(controller.drag().is_active());

        controller.handle(&scene, &view, moved(target));
        controller.handle(&scene, &view, up(target));
        assert_abs_diff_eq!(a.matrix().w_axis.x, 7.0, epsilon = 1e-3);
        assert_abs_diff_eq!(a.matrix().w_axis.y, 0.0, epsilon = 1e-3);
        assert_eq!(controller.undo_buffer().len(), 1);

        assert!(controller.key_down(&scene, KeyEvent::new(Key::Z, Modifiers::ctrl())));
        assert_eq!(a.matrix(), Mat4::IDENTITY);
        controller.key_down(&scene, KeyEvent::new(Key::Y, Modifiers::ctrl()));
        assert_abs_diff_eq!(a.matrix().w_axis.x, 7.0, epsilon = 1e-3);
    }

    #[test]
    fn test_escape_aborts_drag() {
        let (scene, a, _b, mut controller, view) = setup();
        let target = view.world_to_screen(Vec3::new(-12.0, 3.0, 5.0)).unwrap();
        controller.handle(&scene, &view, down(Vec2::splat(400.0)));
        controller.handle(&scene, &view, moved(target));
        assert_ne!(a.matrix(), Mat4::IDENTITY);

        controller.key_down(&scene, KeyEvent::plain(Key::Escape));
        assert_eq!(a.matrix(), Mat4::IDENTITY);
        controller.handle(&scene, &view, up(target));
        assert!(!controller.undo_buffer().can_undo());
    }

    #[test]
    fn test_marquee_selects_enclosed() {
        let (scene, a, _b, mut controller, view) = setup();
        controller.handle(&scene, &view, down(Vec2::splat(350.0)));
        assert!(controller.selection().is_empty());
        controller.handle(&scene, &view, moved(Vec2::splat(450.0)));

        let requests = controller.draw_requests(&scene);
        assert!(requests.iter().any(|r| matches!(r, DrawRequest::SelectionRectangle { .. })));

        controller.handle(&scene, &view, up(Vec2::splat(450.0)));
        assert!(controller.marquee_rect().is_none());
        assert_eq!(controller.selection().len(), 1);
        assert!(controller.selection().contains(&a));
    }

    #[test]
    fn test_marquee_clamped_to_viewport() {
        let (scene, _a, _b, mut controller, view) = setup();
        controller.handle(&scene, &view, down(Vec2::new(10.0, 20.0)));
        controller.handle(&scene, &view, moved(Vec2::new(-50.0, 900.0)));
        let rect = controller.marquee_rect().unwrap();
        assert_eq!(rect.min, Vec2::new(0.0, 20.0));
        assert_eq!(rect.max, Vec2::new(10.0, 800.0));
    }

    #[test]
    fn test_keyboard_selection_commands() {
        let (scene, _a, _b, mut controller, _view) = setup();
        controller.key_down(&scene, KeyEvent::new(Key::A, Modifiers::ctrl()));
        assert_eq!(controller.selection().len(), 2);

        controller.key_down(&scene, KeyEvent::plain(Key::Space));
        assert!(controller.selection().is_empty());

        controller.key_down(&scene, KeyEvent::new(Key::A, Modifiers::ctrl()));
        controller.key_down(&scene, KeyEvent::plain(Key::Delete));
        assert!(scene.is_empty());
        assert!(controller.selection().is_empty());

        assert!(!controller.key_down(&scene, KeyEvent::plain(Key::Other)));
    }

    #[test]
    fn test_delete_during_drag_records_nothing() {
        let (scene, a, _b, mut controller, view) = setup();
        let target = view.world_to_screen(Vec3::new(7.0, 0.0, 5.0)).unwrap();
        controller.handle(&scene, &view, down(Vec2::splat(400.0)));
        controller.handle(&scene, &view, moved(target));
        assert!(controller.drag().is_active());

        controller.key_down(&scene, KeyEvent::plain(Key::Delete));
        assert!(!scene.contains(&a));
        assert!(!controller.drag().is_active());

        assert!(!controller.pointer_up(&scene, &view, target, MouseButton::Left));
        assert!(!controller.undo_buffer().can_undo());
    }

    #[test]
    fn test_drop_outside_viewport() {
        let scene = Scene::new();
        let view = top_view();
        let mut controller = InteractionController::new(&EditorConfig::default());
        let item = cube("item", 0.0);

        assert!(controller.begin_drop(&scene, &view, Vec2::splat(400.0), item.clone()));
        controller.drag_over(&view, Vec2::splat(420.0), Modifiers::NONE);
        assert!(!controller.finish_drop(&scene, &view, Vec2::new(-10.0, -10.0)));
        assert!(!scene.contains(&item));
        assert!(controller.selection().is_empty());
    }

    #[test]
    fn test_insert_and_lay_flat_undo() {
        let scene = Scene::new();
        let mut controller = InteractionController::new(&EditorConfig::default());
        let tilted = SceneObject::builder("tilted")
            .mesh(Arc::new(generate_box_mesh([10.0, 10.0, 10.0])))
            .matrix(Mat4::from_rotation_y(0.4))
            .build();
        controller.insert(&scene, tilted.clone());
        assert!(controller.selection().contains(&tilted));
        let placed = tilted.matrix();

        assert!(controller.lay_flat_selection());
        assert_abs_diff_eq!(tilted.world_bounds().size().z, 10.0, epsilon = 1e-3);
        controller.key_down(&scene, KeyEvent::new(Key::Z, Modifiers::ctrl()));
        assert_eq!(tilted.matrix(), placed);
    }
}
