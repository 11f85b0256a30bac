//! Cylinder mesh generation (with end caps)

use std::f32::consts::PI;

use glam::Vec3;

use crate::mesh::Mesh;

/// Generate a cylinder mesh along the Z axis, centred on the origin
///
/// # Arguments
/// * `radius` - Cylinder radius
/// * `length` - Cylinder length (height along Z)
pub fn generate_cylinder_mesh(radius: f32, length: f32) -> Mesh {
    use crate::constants::CYLINDER_SEGMENTS;
    generate_cylinder_mesh_with_segments(radius, length, CYLINDER_SEGMENTS)
}

/// Generate a cylinder mesh with custom segment count
pub fn generate_cylinder_mesh_with_segments(radius: f32, length: f32, segments: u32) -> Mesh {
    let segments = segments.max(3);
    let half_length = length / 2.0;
    let mut vertices = Vec::with_capacity(segments as usize * 2 + 2);
    let mut indices = Vec::with_capacity(segments as usize * 12);

    // Rim vertices: 2i is bottom, 2i + 1 is top
    for i in 0..segments {
        let theta = (i as f32 / segments as f32) * 2.0 * PI;
        let x = radius * theta.cos();
        let y = radius * theta.sin();
        vertices.push(Vec3::new(x, y, -half_length));
        vertices.push(Vec3::new(x, y, half_length));
    }

    let bottom_center = vertices.len() as u32;
    vertices.push(Vec3::new(0.0, 0.0, -half_length));
    let top_center = vertices.len() as u32;
    vertices.push(Vec3::new(0.0, 0.0, half_length));

    for i in 0..segments {
        let b0 = i * 2;
        let t0 = b0 + 1;
        let b1 = ((i + 1) % segments) * 2;
        let t1 = b1 + 1;

        // Side quad
        indices.extend_from_slice(&[b0, b1, t1, b0, t1, t0]);
        // Caps
        indices.extend_from_slice(&[top_center, t0, t1]);
        indices.extend_from_slice(&[bottom_center, b1, b0]);
    }

    Mesh::new(vertices, indices)
}
