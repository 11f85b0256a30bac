//! Primitive mesh generation
//!
//! Closed, outward-wound solids usable as boolean operands:
//! - Box (rectangular prism)
//! - Cylinder (with end caps)

mod box_mesh;
mod cylinder;

pub use box_mesh::generate_box_mesh;
pub use cylinder::{generate_cylinder_mesh, generate_cylinder_mesh_with_segments};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_box_mesh() {
        let mesh = generate_box_mesh([1.0, 1.0, 1.0]);
        assert_eq!(mesh.vertices().len(), 8);
        assert_eq!(mesh.triangle_count(), 12);
    }

    #[test]
    fn test_box_dimensions() {
        let mesh = generate_box_mesh([2.0, 4.0, 6.0]);
        let size = mesh.bounds().size();
        assert!((size.x - 2.0).abs() < 0.001);
        assert!((size.y - 4.0).abs() < 0.001);
        assert!((size.z - 6.0).abs() < 0.001);
    }

    #[test]
    fn test_box_faces_point_outward() {
        let mesh = generate_box_mesh([2.0, 2.0, 2.0]);
        for [a, b, c] in mesh.triangles() {
            let normal = (b - a).cross(c - a);
            let centroid = (a + b + c) / 3.0;
            assert!(normal.dot(centroid) > 0.0);
        }
    }

    #[test]
    fn test_cylinder_mesh() {
        let mesh = generate_cylinder_mesh(0.5, 1.0);
        assert!(!mesh.is_empty());
        assert!(mesh.indices().len() % 3 == 0);
        let size = mesh.bounds().size();
        assert!((size.z - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_cylinder_faces_point_outward() {
        let mesh = generate_cylinder_mesh_with_segments(1.0, 2.0, 12);
        for [a, b, c] in mesh.triangles() {
            let normal = (b - a).cross(c - a);
            let centroid = (a + b + c) / 3.0;
            assert!(normal.dot(centroid) > 0.0);
        }
    }
}
