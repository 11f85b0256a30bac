//! Core data structures for the plate editor
//!
//! Meshes, the scene graph and its invalidation protocol, per-object spatial
//! indices, selection state, transform undo and editor configuration.

pub mod bounds;
pub mod bvh;
pub mod config;
pub mod constants;
pub mod draw;
pub mod mesh;
pub mod primitive;
pub mod ray;
pub mod scene;
pub mod selection;
pub mod undo;

pub use bounds::BoundingBox;
pub use bvh::{Coverage, RegionHit, RegionLimit, RegionQuery, SpatialIndex, TraceHit};
pub use config::{ConfigError, EditorConfig};
pub use draw::{DrawRequest, DrawStyle, Drawable};
pub use mesh::{Mesh, MeshId};
pub use ray::{Plane, Ray};
pub use scene::{
    HitTestable, InvalidateArgs, InvalidateKind, ObjectId, PropertyFlags, RebuildLock, Scene,
    SceneNode, SceneObject,
};
pub use selection::{HitQuadrant, SelectInfo, SelectionContext};
pub use undo::{TransformEdit, UndoBuffer, UndoLog};
