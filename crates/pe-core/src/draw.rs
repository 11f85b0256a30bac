//! Draw requests handed to the renderer
//!
//! The core never talks to the GPU. It describes what should be drawn and a
//! renderer turns the requests into draw calls.

use std::sync::Arc;

use glam::{Mat4, Vec2};

use crate::mesh::Mesh;
use crate::scene::{Scene, SceneNode};
use crate::selection::SelectionContext;

/// How a mesh should be drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawStyle {
    Solid,
    Transparent,
    Outline,
}

/// One thing for the renderer to draw
#[derive(Debug, Clone)]
pub enum DrawRequest {
    Mesh {
        mesh: Arc<Mesh>,
        matrix: Mat4,
        color: [f32; 4],
        style: DrawStyle,
    },
    /// Marquee outline in viewport pixels
    SelectionRectangle { min: Vec2, max: Vec2 },
}

/// Produces draw requests
pub trait Drawable {
    fn draw_requests(&self, selection: &SelectionContext) -> Vec<DrawRequest>;
}

impl Drawable for Scene {
    fn draw_requests(&self, selection: &SelectionContext) -> Vec<DrawRequest> {
        let mut out = Vec::new();
        for object in self.children().iter() {
            let selected = selection.contains(object);
            draw_node(object, selected, &mut out);
        }
        out
    }
}

fn draw_node(node: &SceneNode, selected: bool, out: &mut Vec<DrawRequest>) {
    if !node.visible() {
        return;
    }
    if let Some(op) = node.operation_handler() {
        let overlay = op.draw_editor(node, selected);
        out.extend(overlay.requests);
        if overlay.suppress_default {
            return;
        }
    }

    let children = node.children();
    if children.is_empty() {
        if let Some(mesh) = node.mesh() {
            let matrix = node.world_matrix();
            out.push(DrawRequest::Mesh {
                mesh: mesh.clone(),
                matrix,
                color: node.color(),
                style: DrawStyle::Solid,
            });
            if selected {
                out.push(DrawRequest::Mesh {
                    mesh,
                    matrix,
                    color: node.color(),
                    style: DrawStyle::Outline,
                });
            }
        }
    } else {
        for child in children.iter() {
            draw_node(child, selected, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitive::generate_box_mesh;
    use crate::scene::SceneObject;

    #[test]
    fn test_selected_objects_get_outline() {
        let scene = Scene::new();
        let a = SceneObject::with_mesh("a", Arc::new(generate_box_mesh([1.0, 1.0, 1.0])));
        let b = SceneObject::with_mesh("b", Arc::new(generate_box_mesh([1.0, 1.0, 1.0])));
        scene.add(a.clone());
        scene.add(b);

        let mut selection = SelectionContext::new();
        selection.set(a);
        let requests = scene.draw_requests(&selection);
        let outlines = requests
            .iter()
            .filter(|r| matches!(r, DrawRequest::Mesh { style: DrawStyle::Outline, .. }))
            .count();
        assert_eq!(requests.len(), 3);
        assert_eq!(outlines, 1);
    }

    #[test]
    fn test_hidden_objects_not_drawn() {
        let scene = Scene::new();
        let a = SceneObject::builder("a")
            .mesh(Arc::new(generate_box_mesh([1.0, 1.0, 1.0])))
            .visible(false)
            .build();
        scene.add(a);
        assert!(scene.draw_requests(&SelectionContext::new()).is_empty());
    }
}
