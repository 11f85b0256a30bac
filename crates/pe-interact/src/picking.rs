//! Point and rectangle picking against the scene
//!
//! Point picks cast a world ray through the pointer and keep the nearest hit.
//! Rectangle picks run a screen-space region query over every visible mesh
//! leaf's spatial index. Both report top-level objects.

use glam::{Mat4, Vec2, Vec3};
use pe_core::{
    BoundingBox, Coverage, HitTestable, RegionQuery, Scene, SceneNode, SelectionContext,
};
use tracing::debug;

use crate::input::Modifiers;
use crate::rect::{OutCode, ScreenRect, triangle_contains};
use crate::viewport::WorldView;

/// Nearest object under the pointer
#[derive(Debug, Clone)]
pub struct PointHit {
    /// Top-level object owning the hit geometry
    pub object: SceneNode,
    /// World-space hit position
    pub position: Vec3,
    /// World-space distance from the ray origin
    pub distance: f32,
}

/// Pick the top-level object under a window position.
pub fn pick_point(scene: &Scene, view: &dyn WorldView, screen: Vec2) -> Option<PointHit> {
    let ray = view.screen_to_ray(view.to_local(screen));
    scene
        .children()
        .iter()
        .filter(|object| object.visible())
        .filter_map(|object| {
            object.trace_ray(&ray).map(|hit| PointHit {
                object: object.clone(),
                position: hit.position,
                distance: hit.distance,
            })
        })
        .min_by(|a, b| a.distance.total_cmp(&b.distance))
}

/// Top-level objects with visible geometry inside a viewport-local rectangle.
pub fn pick_region(scene: &Scene, view: &dyn WorldView, rect: ScreenRect) -> Vec<SceneNode> {
    let query = ScreenRegionQuery { view, rect };
    scene
        .children()
        .iter()
        .filter(|object| object.visible() && object.trace_region(&query))
        .cloned()
        .collect()
}

/// Region query for a rectangle of viewport pixels
pub struct ScreenRegionQuery<'a> {
    pub view: &'a dyn WorldView,
    pub rect: ScreenRect,
}

impl ScreenRegionQuery<'_> {
    fn project(&self, point: Vec3) -> Option<Vec2> {
        self.view.world_to_screen(point)
    }

    fn edge_clips(&self, a: Vec2, b: Vec2) -> bool {
        self.rect.clip_line(a, b)
    }
}

impl RegionQuery for ScreenRegionQuery<'_> {
    fn coverage(&self, bounds: &BoundingBox, world: &Mat4) -> Coverage {
        let bottom = bounds.bottom_corners().map(|c| self.project(world.transform_point3(c)));
        let top = bounds.top_corners().map(|c| self.project(world.transform_point3(c)));

        // Straddling the eye; let the triangles decide
        let (Some(bottom), Some(top)) = (
            bottom.into_iter().collect::<Option<Vec<_>>>(),
            top.into_iter().collect::<Option<Vec<_>>>(),
        ) else {
            return Coverage::Partial;
        };

        let codes: Vec<OutCode> = bottom
            .iter()
            .chain(top.iter())
            .map(|&p| self.rect.outcode(p))
            .collect();
        if codes.iter().all(|c| c.is_inside()) {
            return Coverage::Contained;
        }
        if codes.iter().any(|c| c.is_inside()) {
            return Coverage::Partial;
        }
        if codes.iter().fold(OutCode::INSIDE, |acc, &c| acc | c) == OutCode::SURROUNDED {
            return Coverage::Partial;
        }

        for i in 0..4 {
            let j = (i + 1) % 4;
            if self.edge_clips(bottom[i], bottom[j])
                || self.edge_clips(top[i], top[j])
                || self.edge_clips(bottom[i], top[i])
            {
                return Coverage::Partial;
            }
        }
        Coverage::Outside
    }

    fn matches_triangle(&self, triangle: &[Vec3; 3]) -> bool {
        let [Some(a), Some(b), Some(c)] = triangle.map(|v| self.project(v)) else {
            return false;
        };
        self.edge_clips(a, b)
            || self.edge_clips(b, c)
            || self.edge_clips(c, a)
            || triangle_contains(&[a, b, c], self.rect.center())
    }
}

/// What a point pick did to the selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickOutcome {
    /// Nothing was hit; the selection was cleared and a marquee starts.
    BeginRectangle,
    /// The hit object became the whole selection.
    Replaced,
    /// The hit object joined the selection.
    Added,
    /// The hit object was already selected; a drag may start.
    Unchanged,
}

impl PickOutcome {
    /// The press landed on the selection
    pub fn is_on_selection(self) -> bool {
        !matches!(self, PickOutcome::BeginRectangle)
    }
}

/// Merge a point pick into the selection.
pub fn apply_point_pick(
    selection: &mut SelectionContext,
    hit: Option<&SceneNode>,
    modifiers: Modifiers,
) -> PickOutcome {
    let Some(hit) = hit else {
        selection.clear();
        return PickOutcome::BeginRectangle;
    };
    let outcome = if selection.is_empty() {
        selection.set(hit.clone());
        PickOutcome::Replaced
    } else if selection.covers(hit) {
        PickOutcome::Unchanged
    } else if modifiers.is_add() {
        selection.add(hit.clone());
        PickOutcome::Added
    } else {
        selection.set(hit.clone());
        PickOutcome::Replaced
    };
    debug!("Pick {}: {:?}, {} selected", hit.name(), outcome, selection.len());
    outcome
}

/// Replace the selection with a marquee's hits. Returns false if there were
/// none, leaving the selection untouched.
pub fn apply_region_pick(selection: &mut SelectionContext, hits: Vec<SceneNode>) -> bool {
    if hits.is_empty() {
        return false;
    }
    debug!("Rectangle selected {} objects", hits.len());
    selection.set_many(hits);
    true
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::camera::Camera;
    use crate::viewport::Viewport;
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

    fn scene_ab() -> (Scene, SceneNode, SceneNode) {
        let scene = Scene::new();
        let a = cube("a", 0.0);
        let b = cube("b", 50.0);
        scene.add(a.clone());
        scene.add(b.clone());
        (scene, a, b)
    }

    #[test]
    fn test_region_encloses_a_not_b() {
        let (scene, a, _b) = scene_ab();
        let view = top_view();
        let rect = ScreenRect::from_corners(Vec2::splat(350.0), Vec2::splat(450.0));
        let hits = pick_region(&scene, &view, rect);
        assert_eq!(hits.len(), 1);
        assert!(Arc::ptr_eq(&hits[0], &a));
    }

    #[test]
    fn test_region_partial_overlap_matches() {
        let (scene, a, _b) = scene_ab();
        let view = top_view();
        // Only the right edge of A's footprint
        let center = view.world_to_screen(Vec3::new(5.0, 0.0, 5.0)).unwrap();
        let rect = ScreenRect::from_corners(center - Vec2::splat(4.0), center + Vec2::splat(4.0));
        let hits = pick_region(&scene, &view, rect);
        assert_eq!(hits.len(), 1);
        assert!(Arc::ptr_eq(&hits[0], &a));
    }

    #[test]
    fn test_region_inside_face_matches() {
        let (scene, a, _b) = scene_ab();
        let view = top_view();
        // A tiny rectangle in the middle of A's top face touches no edge
        let rect = ScreenRect::from_corners(Vec2::splat(398.0), Vec2::splat(402.0));
        let hits = pick_region(&scene, &view, rect);
        assert_eq!(hits.len(), 1);
        assert!(Arc::ptr_eq(&hits[0], &a));
    }

    #[test]
    fn test_region_empty_space() {
        let (scene, _a, _b) = scene_ab();
        let view = top_view();
        let rect = ScreenRect::from_corners(Vec2::new(10.0, 10.0), Vec2::new(60.0, 60.0));
        assert!(pick_region(&scene, &view, rect).is_empty());
    }

    #[test]
    fn test_hidden_objects_are_not_picked() {
        let (scene, a, _b) = scene_ab();
        a.set_visible(false);
        let view = top_view();
        assert!(pick_point(&scene, &view, Vec2::splat(400.0)).is_none());
        let rect = ScreenRect::from_corners(Vec2::splat(350.0), Vec2::splat(450.0));
        assert!(pick_region(&scene, &view, rect).is_empty());
    }

    #[test]
    fn test_point_pick_returns_top_level() {
        let scene = Scene::new();
        let leaf = cube("leaf", 0.0);
        let group = SceneObject::group("group", vec![leaf]);
        scene.add(group.clone());
        let view = top_view();

        let hit = pick_point(&scene, &view, Vec2::splat(400.0)).unwrap();
        assert!(Arc::ptr_eq(&hit.object, &group));
        assert!((hit.position.z - 5.0).abs() < 1e-2);
    }

    #[test]
    fn test_point_pick_respects_viewport_origin() {
        let (scene, _a, b) = scene_ab();
        let mut view = top_view();
        view.origin = Vec2::new(100.0, 20.0);
        let local = view.world_to_screen(Vec3::new(50.0, 0.0, 5.0)).unwrap();
        let hit = pick_point(&scene, &view, local + view.origin).unwrap();
        assert!(Arc::ptr_eq(&hit.object, &b));
    }

    #[test]
    fn test_point_pick_merge_table() {
        let a = cube("a", 0.0);
        let b = cube("b", 50.0);
        let mut selection = SelectionContext::new();
        let shift = Modifiers {
            shift: true,
            ..Modifiers::default()
        };

        assert_eq!(apply_point_pick(&mut selection, Some(&a), Modifiers::default()), PickOutcome::Replaced);
        assert_eq!(apply_point_pick(&mut selection, Some(&b), shift), PickOutcome::Added);
        assert!(selection.is_group());
        assert_eq!(apply_point_pick(&mut selection, Some(&a), Modifiers::default()), PickOutcome::Unchanged);
        assert_eq!(selection.len(), 2);
        assert_eq!(apply_point_pick(&mut selection, Some(&a), shift), PickOutcome::Unchanged);

        selection.set(a.clone());
        assert_eq!(apply_point_pick(&mut selection, Some(&b), Modifiers::default()), PickOutcome::Replaced);
        assert!(selection.contains(&b) && !selection.contains(&a));

        assert_eq!(apply_point_pick(&mut selection, None, shift), PickOutcome::BeginRectangle);
        assert!(selection.is_empty());
    }

    #[test]
    fn test_pick_descendant_of_selected_is_unchanged() {
        let leaf = cube("leaf", 0.0);
        let group = SceneObject::group("group", vec![leaf.clone()]);
        let mut selection = SelectionContext::new();
        selection.set(group.clone());
        assert_eq!(apply_point_pick(&mut selection, Some(&leaf), Modifiers::default()), PickOutcome::Unchanged);
        assert!(selection.contains(&group));
    }

    #[test]
    fn test_region_pick_replaces_only_when_hit() {
        let a = cube("a", 0.0);
        let b = cube("b", 50.0);
        let mut selection = SelectionContext::new();
        selection.set(a.clone());
        assert!(!apply_region_pick(&mut selection, Vec::new()));
        assert!(selection.contains(&a));
        assert!(apply_region_pick(&mut selection, vec![b.clone()]));
        assert!(selection.contains(&b) && !selection.contains(&a));
    }
}
