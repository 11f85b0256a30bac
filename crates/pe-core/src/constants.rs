//! Global constants for pe-core

/// Default number of segments for cylinder mesh generation
pub const CYLINDER_SEGMENTS: u32 = 32;

/// Default color for objects (gray, RGBA)
pub const DEFAULT_COLOR: [f32; 4] = [0.5, 0.5, 0.5, 1.0];

/// Largest number of triangles kept in one spatial index leaf
pub const BVH_MAX_LEAF_TRIANGLES: usize = 8;

/// Default number of undo entries kept before the oldest is dropped
pub const UNDO_MAX_ENTRIES: usize = 100;

/// Default snap grid spacing in world units (0 disables snapping)
pub const DEFAULT_SNAP_GRID: f32 = 1.0;

/// Alpha used when drawing subtract operands see-through
pub const OPERAND_ALPHA: f32 = 128.0 / 255.0;

/// Clearance kept between objects placed by the open-position search
pub const PLACEMENT_SPACING: f32 = 2.0;

/// Rings of candidate positions tried around the bed centre
pub const PLACEMENT_MAX_RINGS: i32 = 12;
