//! Editor configuration structures
//!
//! Settings are grouped into sections, each filled with defaults when absent,
//! and stored on disk as RON.

use std::path::Path;

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_SNAP_GRID, UNDO_MAX_ENTRIES};

/// Pointer interaction settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InteractionConfig {
    /// Grid spacing used to snap dragged edges (0 disables snapping)
    pub snap_grid_distance: f32,
    /// Clamp the marquee to the viewport while dragging it
    pub clamp_selection_rect: bool,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            snap_grid_distance: DEFAULT_SNAP_GRID,
            clamp_selection_rect: true,
        }
    }
}

/// Build plate dimensions
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BedConfig {
    /// Plate extent in X and Y
    pub size: [f32; 2],
    /// Plate centre in X and Y
    pub center: [f32; 2],
}

impl Default for BedConfig {
    fn default() -> Self {
        Self {
            size: [220.0, 220.0],
            center: [0.0, 0.0],
        }
    }
}

impl BedConfig {
    /// Returns true if the XY position lies on the plate
    pub fn contains_xy(&self, point: Vec3) -> bool {
        let center = Vec2::from(self.center);
        let half = Vec2::from(self.size) * 0.5;
        let p = point.truncate();
        p.cmpge(center - half).all() && p.cmple(center + half).all()
    }

    pub fn center(&self) -> Vec3 {
        Vec2::from(self.center).extend(0.0)
    }
}

/// Camera settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CameraConfig {
    /// Field of view in degrees
    pub fov_degrees: f32,
    /// Near clipping plane
    pub near_plane: f32,
    /// Far clipping plane
    pub far_plane: f32,
    /// Initial orbit distance
    pub distance: f32,
    /// Initial yaw in degrees
    pub yaw_degrees: f32,
    /// Initial pitch in degrees
    pub pitch_degrees: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_degrees: 40.0,
            near_plane: 0.1,
            far_plane: 100000.0,
            distance: 300.0,
            yaw_degrees: -90.0,
            pitch_degrees: 45.0,
        }
    }
}

/// Rebuild scheduling settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RebuildConfig {
    /// Run rebuilds on worker threads (otherwise on the calling thread)
    pub background: bool,
    /// Log progress updates of running rebuilds
    pub report_progress: bool,
}

impl Default for RebuildConfig {
    fn default() -> Self {
        Self {
            background: true,
            report_progress: true,
        }
    }
}

/// Undo history settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UndoConfig {
    /// Steps kept before the oldest is dropped
    pub max_entries: usize,
}

impl Default for UndoConfig {
    fn default() -> Self {
        Self {
            max_entries: UNDO_MAX_ENTRIES,
        }
    }
}

/// Complete editor configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct EditorConfig {
    #[serde(default)]
    pub interaction: InteractionConfig,
    #[serde(default)]
    pub bed: BedConfig,
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub rebuild: RebuildConfig,
    #[serde(default)]
    pub undo: UndoConfig,
}

impl EditorConfig {
    /// Create a configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from RON text
    pub fn from_ron_str(content: &str) -> Result<Self, ConfigError> {
        ron::from_str(content).map_err(|e| ConfigError::Deserialize(e.to_string()))
    }

    /// Serialize to pretty RON text
    pub fn to_ron_string(&self) -> Result<String, ConfigError> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| ConfigError::Serialize(e.to_string()))
    }

    /// Load configuration from a file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content =
            std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io(e.to_string()))?;
        Self::from_ron_str(&content)
    }

    /// Save configuration to a file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let content = self.to_ron_string()?;
        std::fs::write(path.as_ref(), content).map_err(|e| ConfigError::Io(e.to_string()))
    }
}

/// Configuration errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Serialization error: {0}")]
    Serialize(String),
    #[error("Deserialization error: {0}")]
    Deserialize(String),
}
