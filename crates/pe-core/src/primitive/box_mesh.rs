//! Box (rectangular prism) mesh generation

use glam::Vec3;

use crate::mesh::Mesh;

/// Generate a box mesh centred on the origin
///
/// # Arguments
/// * `size` - [width (x), depth (y), height (z)]
///
/// # Returns
/// A closed mesh with 8 shared corners and 12 outward-facing triangles
pub fn generate_box_mesh(size: [f32; 3]) -> Mesh {
    let h = Vec3::from(size) * 0.5;

    // Corner i has bit 0 = +x, bit 1 = +y, bit 2 = +z
    let vertices: Vec<Vec3> = (0..8)
        .map(|i| {
            Vec3::new(
                if i & 1 != 0 { h.x } else { -h.x },
                if i & 2 != 0 { h.y } else { -h.y },
                if i & 4 != 0 { h.z } else { -h.z },
            )
        })
        .collect();

    // Two triangles per face, counter-clockwise seen from outside
    let faces: [[u32; 4]; 6] = [
        [1, 3, 7, 5], // +X
        [2, 0, 4, 6], // -X
        [3, 2, 6, 7], // +Y
        [0, 1, 5, 4], // -Y
        [4, 5, 7, 6], // +Z (top)
        [2, 3, 1, 0], // -Z (bottom)
    ];

    let mut indices = Vec::with_capacity(36);
    for [a, b, c, d] in faces {
        indices.extend_from_slice(&[a, b, c, a, c, d]);
    }

    Mesh::new(vertices, indices)
}
