//! Viewport interaction for the plate editor
//!
//! Turns 2D pointer input into 3D hits, selection changes and live
//! transforms of the selected objects.

pub mod camera;
pub mod controller;
pub mod drag;
pub mod input;
pub mod picking;
pub mod placement;
pub mod rect;
pub mod viewport;

pub use camera::Camera;
pub use controller::InteractionController;
pub use drag::{DragEngine, DragState, lock_axis, snap_to_grid};
pub use input::{Key, KeyCommand, KeyEvent, Modifiers, MouseButton, PointerEvent};
pub use picking::{
    PickOutcome, PointHit, ScreenRegionQuery, apply_point_pick, apply_region_pick, pick_point,
    pick_region,
};
pub use placement::{
    DropSession, begin_drop, insert_object, lay_flat, move_to_open_position, place_on_bed,
};
pub use rect::{OutCode, ScreenRect};
pub use viewport::{Viewport, WorldView};
