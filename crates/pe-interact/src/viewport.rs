//! Mapping between window pixels and the 3D world

use glam::{Vec2, Vec3};
use pe_core::Ray;
use pe_core::config::CameraConfig;

use crate::camera::Camera;
use crate::rect::ScreenRect;

/// Read-only view of the world through a viewport.
///
/// Window positions are in pixels with the origin top-left. Local positions
/// are relative to the viewport's own top-left corner.
pub trait WorldView {
    /// Window position to viewport-local position
    fn to_local(&self, screen: Vec2) -> Vec2;

    /// World ray through a viewport-local position
    fn screen_to_ray(&self, local: Vec2) -> Ray;

    /// Viewport-local position of a world point, `None` behind the eye
    fn world_to_screen(&self, point: Vec3) -> Option<Vec2>;

    /// Viewport extent in pixels
    fn size(&self) -> Vec2;

    /// The viewport as a local rectangle
    fn local_bounds(&self) -> ScreenRect {
        ScreenRect::new(Vec2::ZERO, self.size())
    }
}

/// A camera drawn into a window region
#[derive(Debug, Clone)]
pub struct Viewport {
    pub camera: Camera,
    /// Top-left corner inside the window
    pub origin: Vec2,
    size: Vec2,
}

impl Viewport {
    pub fn new(camera: Camera, origin: Vec2, size: Vec2) -> Self {
        let mut viewport = Self {
            camera,
            origin,
            size,
        };
        viewport.resize(size);
        viewport
    }

    /// Viewport at the window origin using the `camera` settings
    pub fn from_config(config: &CameraConfig, size: Vec2) -> Self {
        let aspect = size.x / size.y.max(1.0);
        Self::new(Camera::from_config(config, aspect), Vec2::ZERO, size)
    }

    pub fn resize(&mut self, size: Vec2) {
        self.size = size.max(Vec2::ONE);
        self.camera.update_aspect(self.size.x / self.size.y);
    }
}

impl WorldView for Viewport {
    fn to_local(&self, screen: Vec2) -> Vec2 {
        screen - self.origin
    }

    fn screen_to_ray(&self, local: Vec2) -> Ray {
        self.camera.screen_to_ray(local, self.size)
    }

    fn world_to_screen(&self, point: Vec3) -> Option<Vec2> {
        self.camera.world_to_screen(point, self.size)
    }

    fn size(&self) -> Vec2 {
        self.size
    }
}
