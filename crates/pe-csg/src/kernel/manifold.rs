//! Boolean kernel backed by the Manifold library
//!
//! Meshes are placed by their transforms, welded on exact positions and
//! handed to Manifold as flat `f32` buffers. Manifold itself is not
//! interruptible, so cancellation is checked between stages.

use std::collections::HashMap;

use glam::{Mat4, Vec3};
use manifold_rs::{Manifold, Mesh as ManifoldMesh};
use pe_core::Mesh;
use tracing::debug;

use super::{BooleanError, BooleanKernel, BooleanProgress, BooleanResult};
use crate::progress::CancelToken;

/// Place a mesh and build a solid from it.
///
/// Vertices sharing a position are merged so meshes with split normals
/// still close up. A mirroring transform flips the winding back outward.
fn to_manifold(mesh: &Mesh, transform: &Mat4) -> Manifold {
    let flip = transform.determinant() < 0.0;
    let mut welded: HashMap<[u32; 3], u32> = HashMap::new();
    let mut vertices: Vec<f32> = Vec::with_capacity(mesh.vertices().len() * 3);
    let mut remap: Vec<u32> = Vec::with_capacity(mesh.vertices().len());

    for vertex in mesh.vertices() {
        let placed = transform.transform_point3(*vertex);
        let key = placed.to_array().map(f32::to_bits);
        let index = *welded.entry(key).or_insert_with(|| {
            vertices.extend_from_slice(&placed.to_array());
            (vertices.len() / 3 - 1) as u32
        });
        remap.push(index);
    }

    let mut indices: Vec<u32> = Vec::with_capacity(mesh.indices().len());
    for tri in mesh.indices().chunks_exact(3) {
        let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| remap[i as usize]);
        if a == b || b == c || a == c {
            continue;
        }
        if flip {
            indices.extend_from_slice(&[a, c, b]);
        } else {
            indices.extend_from_slice(&[a, b, c]);
        }
    }

    ManifoldMesh::new(&vertices, &indices).to_manifold()
}

fn from_manifold(solid: &Manifold) -> Mesh {
    let mesh = solid.to_mesh();
    let positions = mesh.vertices();
    let vertices: Vec<Vec3> = positions.chunks_exact(3).map(Vec3::from_slice).collect();
    Mesh::new(vertices, mesh.indices().to_vec())
}

/// Boolean kernel using Manifold's robust mesh booleans
#[derive(Debug, Default)]
pub struct ManifoldKernel;

impl ManifoldKernel {
    pub fn new() -> Self {
        Self
    }
}

impl BooleanKernel for ManifoldKernel {
    fn name(&self) -> &str {
        "Manifold"
    }

    fn subtract(
        &self,
        a: &Mesh,
        a_transform: &Mat4,
        b: &Mesh,
        b_transform: &Mat4,
        _priority: i32,
        progress: &BooleanProgress<'_>,
        cancel: &CancelToken,
    ) -> BooleanResult<Mesh> {
        if !a.is_finite() || !b.is_finite() {
            return Err(BooleanError::InvalidMesh(
                "mesh contains non-finite vertices".into(),
            ));
        }
        if !a_transform.is_finite() || !b_transform.is_finite() {
            return Err(BooleanError::InvalidMesh(
                "transform contains non-finite values".into(),
            ));
        }

        let check = |fraction: f64| -> BooleanResult<()> {
            if cancel.is_cancelled() {
                return Err(BooleanError::Cancelled);
            }
            progress.report(fraction);
            Ok(())
        };

        check(0.0)?;
        if a.is_empty() {
            progress.report(1.0);
            return Ok(Mesh::empty());
        }
        let a_world = a.bounds().transform(a_transform);
        let b_world = b.bounds().transform(b_transform);
        if b.is_empty() || !a_world.intersects(&b_world) {
            progress.report(1.0);
            return Ok(a.transformed(a_transform));
        }

        let solid_a = to_manifold(a, a_transform);
        if solid_a.is_empty() {
            return Err(BooleanError::InvalidMesh(
                "first operand is not a closed solid".into(),
            ));
        }
        check(0.2)?;
        let solid_b = to_manifold(b, b_transform);
        if solid_b.is_empty() {
            return Err(BooleanError::InvalidMesh(
                "second operand is not a closed solid".into(),
            ));
        }

        check(0.4)?;
        let difference = solid_a.difference(&solid_b);
        check(0.9)?;
        let mesh = from_manifold(&difference);
        if !mesh.is_finite() {
            return Err(BooleanError::OperationFailed(
                "subtraction produced non-finite vertices".into(),
            ));
        }
        debug!(
            "Manifold subtract: {} - {} -> {} triangles",
            a.triangle_count(),
            b.triangle_count(),
            mesh.triangle_count()
        );
        progress.report(1.0);
        Ok(mesh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::ProgressLog;
    use approx::assert_abs_diff_eq;
    use pe_core::primitive::{generate_box_mesh, generate_cylinder_mesh_with_segments};

    fn volume(mesh: &Mesh) -> f64 {
        mesh.triangles()
            .map(|[a, b, c]| {
                let (a, b, c) = (a.as_dvec3(), b.as_dvec3(), c.as_dvec3());
                a.dot(b.cross(c)) / 6.0
            })
            .sum()
    }

    fn subtract(a: &Mesh, at: Mat4, b: &Mesh, bt: Mat4) -> BooleanResult<Mesh> {
        ManifoldKernel::new().subtract(
            a,
            &at,
            b,
            &bt,
            1,
            &BooleanProgress::none(),
            &CancelToken::new(),
        )
    }

    #[test]
    fn test_box_volume() {
        let a = generate_box_mesh([2.0, 2.0, 2.0]);
        assert_abs_diff_eq!(volume(&a), 8.0, epsilon = 1e-5);
    }

    #[test]
    fn test_subtract_overlapping_boxes() {
        let a = generate_box_mesh([2.0, 2.0, 2.0]);
        let b = generate_box_mesh([2.0, 2.0, 2.0]);
        let offset = Mat4::from_translation(Vec3::new(1.0, 0.5, 0.5));
        let result = subtract(&a, Mat4::IDENTITY, &b, offset).unwrap();

        // Overlap is 1 x 1.5 x 1.5
        assert_abs_diff_eq!(volume(&result), 8.0 - 2.25, epsilon = 1e-3);
        let bounds = result.bounds();
        assert_abs_diff_eq!(bounds.min.x, -1.0, epsilon = 1e-5);
        assert_abs_diff_eq!(bounds.max.x, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_subtract_applies_a_transform() {
        let a = generate_box_mesh([2.0, 2.0, 2.0]);
        let b = generate_box_mesh([1.0, 1.0, 1.0]);
        let at = Mat4::from_translation(Vec3::new(10.0, 0.0, 0.0));
        let result = subtract(&a, at, &b, Mat4::IDENTITY).unwrap();
        // Disjoint: A comes back unchanged, in A's placed coordinates
        assert_abs_diff_eq!(volume(&result), 8.0, epsilon = 1e-4);
        assert_abs_diff_eq!(result.bounds().center().x, 10.0, epsilon = 1e-5);
    }

    #[test]
    fn test_mirrored_operand_keeps_volume() {
        let a = generate_box_mesh([4.0, 4.0, 4.0]);
        let b = generate_box_mesh([1.0, 1.0, 8.0]);
        let mirror = Mat4::from_scale(Vec3::new(-1.0, 1.0, 1.0));
        let result = subtract(&a, mirror, &b, Mat4::IDENTITY).unwrap();
        assert_abs_diff_eq!(volume(&result), 64.0 - 4.0, epsilon = 1e-3);
    }

    #[test]
    fn test_subtract_is_deterministic() {
        let a = generate_box_mesh([2.0, 2.0, 2.0]);
        let b = generate_box_mesh([1.0, 1.0, 3.0]);
        let bt = Mat4::from_translation(Vec3::new(0.3, 0.2, 0.0));
        let first = subtract(&a, Mat4::IDENTITY, &b, bt).unwrap();
        let second = subtract(&a, Mat4::IDENTITY, &b, bt).unwrap();
        assert!(first.same_geometry(&second));
        assert!(!first.is_empty());
    }

    #[test]
    fn test_subtract_everything() {
        let a = generate_box_mesh([1.0, 1.0, 1.0]);
        let b = generate_box_mesh([3.0, 3.0, 3.0]);
        let result = subtract(&a, Mat4::IDENTITY, &b, Mat4::IDENTITY).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_dense_cylinder() {
        let a = generate_cylinder_mesh_with_segments(10.0, 10.0, 20_000);
        assert!(a.triangle_count() >= 40_000);
        let b = generate_box_mesh([2.0, 2.0, 2.0]);
        let result = subtract(&a, Mat4::IDENTITY, &b, Mat4::IDENTITY).unwrap();
        let full = volume(&a);
        assert_abs_diff_eq!(volume(&result), full - 8.0, epsilon = 5e-2);
    }

    #[test]
    fn test_cancelled() {
        let a = generate_box_mesh([2.0, 2.0, 2.0]);
        let cancel = CancelToken::new();
        cancel.cancel();
        let result = ManifoldKernel::new().subtract(
            &a,
            &Mat4::IDENTITY,
            &a,
            &Mat4::IDENTITY,
            1,
            &BooleanProgress::none(),
            &cancel,
        );
        assert!(matches!(result, Err(BooleanError::Cancelled)));
    }

    #[test]
    fn test_invalid_mesh() {
        let bad = Mesh::from_arrays(
            &[[f32::NAN, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            vec![0, 1, 2],
        );
        let ok = generate_box_mesh([1.0, 1.0, 1.0]);
        let result = subtract(&ok, Mat4::IDENTITY, &bad, Mat4::IDENTITY);
        assert!(matches!(result, Err(BooleanError::InvalidMesh(_))));
    }

    #[test]
    fn test_progress_stays_in_range() {
        let log = ProgressLog::new();
        let a = generate_box_mesh([2.0, 2.0, 2.0]);
        let b = generate_box_mesh([1.0, 1.0, 1.0]);
        let progress = BooleanProgress::new(&log, 0.5, 0.5, "Do CSG");
        ManifoldKernel::new()
            .subtract(&a, &Mat4::IDENTITY, &b, &Mat4::IDENTITY, 1, &progress, &CancelToken::new())
            .unwrap();
        let entries = log.entries();
        assert!(entries.iter().all(|e| (0.5..=1.0).contains(&e.progress)));
        assert!(entries.windows(2).all(|w| w[0].progress <= w[1].progress));
        assert_eq!(entries.last().unwrap().progress, 1.0);
    }
}
