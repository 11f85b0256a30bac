//! Putting objects on the bed: inserts, drops and lay flat

use std::sync::Arc;

use glam::{Mat4, Quat, Vec2, Vec3};
use pe_core::config::BedConfig;
use pe_core::constants::{PLACEMENT_MAX_RINGS, PLACEMENT_SPACING};
use pe_core::{BoundingBox, Plane, Ray, Scene, SceneNode, SelectionContext};
use tracing::{debug, info};

use crate::drag::DragEngine;

/// Rise below which the lowest face already counts as flat
const FLAT_TOLERANCE: f32 = 0.001;

/// Move an object vertically so its lowest point touches the bed.
/// Returns the applied lift.
pub fn place_on_bed(object: &SceneNode) -> f32 {
    let bounds = object.world_bounds();
    if !bounds.is_valid() {
        return 0.0;
    }
    let lift = -bounds.min.z;
    if lift != 0.0 {
        object.update_matrix(|matrix| Mat4::from_translation(Vec3::new(0.0, 0.0, lift)) * matrix);
    }
    lift
}

/// Slide an object to the free spot closest to the bed centre.
///
/// Candidates are tried ring by ring on a grid one footprint apart. Returns
/// false, leaving the object where it was, if no spot on the bed is free.
pub fn move_to_open_position(object: &SceneNode, others: &[SceneNode], bed: &BedConfig) -> bool {
    let bounds = object.world_bounds();
    if !bounds.is_valid() {
        return false;
    }
    let obstacles: Vec<BoundingBox> = others
        .iter()
        .filter(|other| !Arc::ptr_eq(other, object))
        .map(|other| other.world_bounds())
        .filter(BoundingBox::is_valid)
        .collect();

    let size = bounds.size();
    let step = size.x.max(size.y) + PLACEMENT_SPACING;
    let center = Vec2::from(bed.center);
    let margin = Vec3::new(PLACEMENT_SPACING * 0.5, PLACEMENT_SPACING * 0.5, 0.0);

    for candidate in ring_candidates(center, step) {
        if !bed.contains_xy(candidate.extend(0.0)) {
            continue;
        }
        let offset = (candidate - bounds.center().truncate()).extend(0.0);
        let moved = BoundingBox::new(bounds.min + offset - margin, bounds.max + offset + margin);
        if obstacles.iter().all(|o| !o.intersects_xy(&moved)) {
            object.update_matrix(|matrix| Mat4::from_translation(offset) * matrix);
            debug!("{} placed at {:?}", object.name(), candidate);
            return true;
        }
    }
    debug!("No open position for {}", object.name());
    false
}

/// Grid points in square rings around `center`, nearest first within a ring
fn ring_candidates(center: Vec2, step: f32) -> impl Iterator<Item = Vec2> {
    (0..=PLACEMENT_MAX_RINGS).flat_map(move |ring| {
        let mut points: Vec<Vec2> = (-ring..=ring)
            .flat_map(|i| (-ring..=ring).map(move |j| (i, j)))
            .filter(|(i, j)| i.abs().max(j.abs()) == ring)
            .map(|(i, j)| center + Vec2::new(i as f32, j as f32) * step)
            .collect();
        points.sort_by(|a, b| a.distance_squared(center).total_cmp(&b.distance_squared(center)));
        points
    })
}

/// Add a loaded object to the scene at an open spot and select it.
pub fn insert_object(
    scene: &Scene,
    selection: &mut SelectionContext,
    object: SceneNode,
    bed: &BedConfig,
) {
    place_on_bed(&object);
    let others = scene.children();
    move_to_open_position(&object, &others, bed);
    scene.add(object.clone());
    info!("Inserted {}", object.name());
    selection.set(object);
}

/// An item being dragged onto the bed from outside the viewport
#[derive(Debug)]
pub struct DropSession {
    item: SceneNode,
}

impl DropSession {
    pub fn item(&self) -> &SceneNode {
        &self.item
    }

    /// Follow the pointer across the bed.
    pub fn drag_over(
        &self,
        selection: &mut SelectionContext,
        drag: &mut DragEngine,
        ray: &Ray,
        axis_lock: bool,
    ) -> Option<Vec3> {
        drag.update(selection, ray, axis_lock)
    }

    /// Keep the item if it was released over the viewport, otherwise take it
    /// out of the scene again. Returns true if the item stays.
    pub fn finish(
        self,
        scene: &Scene,
        selection: &mut SelectionContext,
        drag: &mut DragEngine,
        in_bounds: bool,
    ) -> bool {
        drag.release(selection);
        if in_bounds {
            info!("Dropped {}", self.item.name());
            return true;
        }
        scene.remove(&self.item);
        selection.clear();
        debug!("Drop of {} abandoned", self.item.name());
        false
    }
}

/// Start dropping `item`: centre it on the bed where the ray lands, add it
/// to the scene, select it and start a drag on the bed plane.
///
/// Returns `None`, leaving the scene untouched, if the ray misses the bed
/// plane.
pub fn begin_drop(
    scene: &Scene,
    selection: &mut SelectionContext,
    drag: &mut DragEngine,
    ray: &Ray,
    item: SceneNode,
) -> Option<DropSession> {
    let plane = Plane::horizontal(0.0);
    let hit = plane.ray_point(ray)?;

    let bounds = item.world_bounds();
    if bounds.is_valid() {
        let center = bounds.center();
        let to_origin = Mat4::from_translation(Vec3::new(-center.x, -center.y, -bounds.min.z));
        item.update_matrix(|matrix| Mat4::from_translation(hit) * to_origin * matrix);
    }
    scene.add(item.clone());
    selection.set(item.clone());
    drag.begin_on_plane(selection, plane, hit);
    debug!("Drop of {} started at {:?}", item.name(), hit);
    Some(DropSession { item })
}

/// Rotate an object so the face at its lowest vertex rests on the bed, then
/// place it on the bed. Returns true if the object was rotated.
pub fn lay_flat(object: &SceneNode) -> bool {
    let instances = object.visible_meshes();

    // Lowest world vertex over all visible meshes
    let mut lowest: Option<(usize, Vec3, Vec3)> = None;
    for (index, instance) in instances.iter().enumerate() {
        for &vertex in instance.mesh.vertices() {
            let world = instance.matrix.transform_point3(vertex);
            if lowest.is_none_or(|(_, _, low)| world.z < low.z) {
                lowest = Some((index, vertex, world));
            }
        }
    }
    let Some((index, lowest_local, lowest_world)) = lowest else {
        return false;
    };
    let instance = &instances[index];

    // Of the faces touching that vertex, the one rising least steeply
    let mut flattest: Option<([Vec3; 3], f32)> = None;
    for triangle in instance.mesh.triangles() {
        if !triangle.contains(&lowest_local) {
            continue;
        }
        let world = triangle.map(|v| instance.matrix.transform_point3(v));
        let steepest = triangle
            .iter()
            .zip(world.iter())
            .filter(|(local, _)| **local != lowest_local)
            .map(|(_, w)| {
                let rel = *w - lowest_world;
                rel.z.atan2(rel.truncate().length())
            })
            .fold(f32::MIN, f32::max);
        if flattest.is_none_or(|(_, angle)| steepest < angle) {
            flattest = Some((world, steepest));
        }
    }

    let mut rotated = false;
    if let Some((face, _)) = flattest {
        let rise = face
            .iter()
            .map(|v| v.z - lowest_world.z)
            .fold(0.0_f32, f32::max);
        let normal = (face[1] - face[0]).cross(face[2] - face[0]).normalize_or_zero();
        if rise > FLAT_TOLERANCE && normal != Vec3::ZERO {
            let rotation = Mat4::from_quat(Quat::from_rotation_arc(normal, Vec3::NEG_Z));
            let center = object.world_bounds().center();
            let about_center =
                Mat4::from_translation(center) * rotation * Mat4::from_translation(-center);
            object.update_matrix(|matrix| about_center * matrix);
            rotated = true;
        }
    }

    place_on_bed(object);
    debug!("Lay flat {}: rotated {}", object.name(), rotated);
    rotated
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use approx::assert_abs_diff_eq;
    use pe_core::SceneObject;
    use pe_core::primitive::generate_box_mesh;

    fn cube(name: &str, matrix: Mat4) -> SceneNode {
        SceneObject::builder(name)
            .mesh(Arc::new(generate_box_mesh([10.0, 10.0, 10.0])))
            .matrix(matrix)
            .build()
    }

    #[test]
    fn test_place_on_bed() {
        let object = cube("a", Mat4::from_translation(Vec3::new(3.0, 4.0, 20.0)));
        let lift = place_on_bed(&object);
        assert_abs_diff_eq!(lift, -15.0, epsilon = 1e-5);
        let bounds = object.world_bounds();
        assert_abs_diff_eq!(bounds.min.z, 0.0, epsilon = 1e-5);
        assert_abs_diff_eq!(bounds.center().x, 3.0, epsilon = 1e-5);
    }

    #[test]
    fn test_open_position_avoids_others() {
        let bed = BedConfig::default();
        let existing = cube("existing", Mat4::IDENTITY);
        let object = cube("new", Mat4::IDENTITY);
        assert!(move_to_open_position(&object, &[existing.clone()], &bed));
        let placed = object.world_bounds();
        assert!(!placed.intersects_xy(&existing.world_bounds()));
        assert!(bed.contains_xy(placed.center()));
    }

    #[test]
    fn test_open_position_free_bed_uses_centre() {
        let bed = BedConfig {
            center: [50.0, 50.0],
            ..BedConfig::default()
        };
        let object = cube("new", Mat4::IDENTITY);
        assert!(move_to_open_position(&object, &[], &bed));
        let center = object.world_bounds().center();
        assert_abs_diff_eq!(center.x, 50.0, epsilon = 1e-5);
        assert_abs_diff_eq!(center.y, 50.0, epsilon = 1e-5);
    }

    #[test]
    fn test_open_position_full_bed() {
        let bed = BedConfig {
            size: [12.0, 12.0],
            ..BedConfig::default()
        };
        let existing = cube("existing", Mat4::IDENTITY);
        let object = cube("new", Mat4::from_translation(Vec3::new(1.0, 0.0, 0.0)));
        assert!(!move_to_open_position(&object, &[existing], &bed));
        assert_abs_diff_eq!(object.matrix().w_axis.x, 1.0);
    }

    #[test]
    fn test_insert_object_selects_and_places() {
        let scene = Scene::new();
        let mut selection = SelectionContext::new();
        let bed = BedConfig::default();
        let first = cube("first", Mat4::IDENTITY);
        insert_object(&scene, &mut selection, first.clone(), &bed);
        let second = cube("second", Mat4::IDENTITY);
        insert_object(&scene, &mut selection, second.clone(), &bed);

        assert_eq!(scene.children().len(), 2);
        assert!(selection.contains(&second) && !selection.is_group());
        assert_abs_diff_eq!(second.world_bounds().min.z, 0.0, epsilon = 1e-5);
        assert!(!second.world_bounds().intersects_xy(&first.world_bounds()));
    }

    #[test]
    fn test_drop_centres_item_on_hit() {
        let scene = Scene::new();
        let mut selection = SelectionContext::new();
        let mut drag = DragEngine::new(0.0);
        let item = cube("item", Mat4::from_translation(Vec3::new(-40.0, 7.0, 3.0)));
        let ray = Ray::new(Vec3::new(20.0, 10.0, 100.0), Vec3::NEG_Z);

        let session = begin_drop(&scene, &mut selection, &mut drag, &ray, item.clone()).unwrap();
        let bounds = item.world_bounds();
        assert_abs_diff_eq!(bounds.center().x, 20.0, epsilon = 1e-4);
        assert_abs_diff_eq!(bounds.center().y, 10.0, epsilon = 1e-4);
        assert_abs_diff_eq!(bounds.min.z, 0.0, epsilon = 1e-4);
        assert!(scene.contains(&item));
        assert!(selection.contains(&item));
        assert!(drag.is_active());

        session.drag_over(&mut selection, &mut drag, &Ray::new(Vec3::new(25.0, 10.0, 100.0), Vec3::NEG_Z), false);
        assert_abs_diff_eq!(item.world_bounds().center().x, 25.0, epsilon = 1e-4);

        assert!(session.finish(&scene, &mut selection, &mut drag, true));
        assert!(scene.contains(&item));
        assert!(!drag.is_active());
    }

    #[test]
    fn test_drop_outside_removes_item() {
        let scene = Scene::new();
        let mut selection = SelectionContext::new();
        let mut drag = DragEngine::new(0.0);
        let item = cube("item", Mat4::IDENTITY);
        let ray = Ray::new(Vec3::new(0.0, 0.0, 100.0), Vec3::NEG_Z);

        let session = begin_drop(&scene, &mut selection, &mut drag, &ray, item.clone()).unwrap();
        assert!(!session.finish(&scene, &mut selection, &mut drag, false));
        assert!(!scene.contains(&item));
        assert!(selection.is_empty());
    }

    #[test]
    fn test_drop_missing_bed_plane() {
        let scene = Scene::new();
        let mut selection = SelectionContext::new();
        let mut drag = DragEngine::new(0.0);
        let ray = Ray::new(Vec3::new(0.0, 0.0, 100.0), Vec3::Z);
        assert!(begin_drop(&scene, &mut selection, &mut drag, &ray, cube("item", Mat4::IDENTITY)).is_none());
        assert!(scene.is_empty());
    }

    #[test]
    fn test_lay_flat_tilted_box() {
        let tilt = Mat4::from_translation(Vec3::new(0.0, 0.0, 30.0))
            * Mat4::from_rotation_x(30.0_f32.to_radians());
        let object = cube("tilted", tilt);
        assert!(lay_flat(&object));
        let bounds = object.world_bounds();
        assert_abs_diff_eq!(bounds.min.z, 0.0, epsilon = 1e-4);
        assert_abs_diff_eq!(bounds.size().z, 10.0, epsilon = 1e-3);
    }

    #[test]
    fn test_lay_flat_already_flat_only_drops() {
        let object = cube("flat", Mat4::from_translation(Vec3::new(0.0, 0.0, 12.0)));
        assert!(!lay_flat(&object));
        assert_abs_diff_eq!(object.world_bounds().min.z, 0.0, epsilon = 1e-5);
    }
}
