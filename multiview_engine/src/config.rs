//! Configuration surface of the engine
//!
//! Plain structs filled in by the application. The engine never parses
//! files. `validate()` rejects values the math below cannot work with.

use std::time::Duration;
use glam::{UVec2, Vec2, Vec3};
use crate::error::{Error, Result};

/// Hard cap on views, sized to the candidate arrays of `shaders/ray_eval.comp`
pub const MAX_VIEWS: usize = 64;

/// Upper bound on the number of views a grid may hold
pub const DEFAULT_MAX_VIEWS: usize = MAX_VIEWS;

/// Frames the CPU may record ahead of the GPU
pub const DEFAULT_FRAMES_IN_FLIGHT: usize = 2;

/// Frame masks are `u32` bitsets
pub const MAX_FRAMES_IN_FLIGHT: usize = 32;

/// Hard cap on ray-march steps per pixel, automatic or not
pub const MAX_RAY_SAMPLES: u32 = 256;

/// Reference direction the grid is authored in
pub const DEFAULT_VIEW_DIR: Vec3 = Vec3::new(0.0, 0.0, -1.0);

/// Engine-wide settings
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Number of frames in flight (each owns its own per-view resources)
    pub frames_in_flight: usize,
    /// Maximum number of views across the whole grid
    pub max_views: usize,
    /// Size of the shared offscreen color/depth atlas
    pub atlas_resolution: UVec2,
    /// Bounded wait on a frame fence. `None` waits indefinitely.
    pub fence_timeout: Option<Duration>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            frames_in_flight: DEFAULT_FRAMES_IN_FLIGHT,
            max_views: DEFAULT_MAX_VIEWS,
            atlas_resolution: UVec2::new(1920 * 4, 1016 * 4),
            fence_timeout: None,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.frames_in_flight == 0 || self.frames_in_flight > MAX_FRAMES_IN_FLIGHT {
            return Err(Error::InvalidConfig(format!(
                "frames_in_flight must be in 1..={}, got {}",
                MAX_FRAMES_IN_FLIGHT, self.frames_in_flight
            )));
        }
        if self.max_views == 0 || self.max_views > MAX_VIEWS {
            return Err(Error::InvalidConfig(format!(
                "max_views must be in 1..={}, got {}",
                MAX_VIEWS, self.max_views
            )));
        }
        if self.atlas_resolution.x == 0 || self.atlas_resolution.y == 0 {
            return Err(Error::InvalidConfig("atlas resolution must be non-zero".to_string()));
        }
        Ok(())
    }
}

// ============================================================================
// Grid placement
// ============================================================================

/// Placement strategy of a grid, fixed at construction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementMode {
    /// Regular lattice centered on the grid origin:
    /// `origin + (col - (columns - 1) / 2, (rows - 1) / 2 - row) * step`
    ByStep,
    /// One explicit grid-local position per view
    ByInGridPos,
    /// World eye and direction fixed per view, no grid transform
    ByExplicitGrid,
}

/// World placement of a single view in an explicit grid
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExplicitViewConfig {
    pub eye: Vec3,
    pub view_dir: Vec3,
    pub up: Vec3,
}

/// Mode-specific grid parameters
#[derive(Debug, Clone, PartialEq)]
pub enum PlacementConfig {
    ByStep {
        /// (columns, rows)
        grid_size: UVec2,
        step: Vec2,
        location: Vec3,
        view_dir: Vec3,
    },
    ByInGridPos {
        location: Vec3,
        view_dir: Vec3,
        /// Grid-local position of each view, grouped by row
        rows: Vec<Vec<Vec3>>,
    },
    ByExplicitGrid {
        rows: Vec<Vec<ExplicitViewConfig>>,
    },
}

impl PlacementConfig {
    pub fn mode(&self) -> PlacementMode {
        match self {
            PlacementConfig::ByStep { .. } => PlacementMode::ByStep,
            PlacementConfig::ByInGridPos { .. } => PlacementMode::ByInGridPos,
            PlacementConfig::ByExplicitGrid { .. } => PlacementMode::ByExplicitGrid,
        }
    }

    /// Column count of each row
    pub fn row_columns(&self) -> Vec<usize> {
        match self {
            PlacementConfig::ByStep { grid_size, .. } => {
                vec![grid_size.x as usize; grid_size.y as usize]
            }
            PlacementConfig::ByInGridPos { rows, .. } => rows.iter().map(Vec::len).collect(),
            PlacementConfig::ByExplicitGrid { rows } => rows.iter().map(Vec::len).collect(),
        }
    }
}

/// Grid construction parameters
#[derive(Debug, Clone, PartialEq)]
pub struct GridConfig {
    pub placement: PlacementConfig,
    /// Vertical field of view of every grid camera, in degrees
    pub fov_degrees: f32,
    /// Fixed pixel resolution tiled by the grid's viewports
    pub resolution: UVec2,
    pub near: f32,
    pub far: f32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            placement: PlacementConfig::ByStep {
                grid_size: UVec2::new(2, 2),
                step: Vec2::new(1.0, 1.0),
                location: Vec3::ZERO,
                view_dir: DEFAULT_VIEW_DIR,
            },
            fov_degrees: 90.0,
            resolution: UVec2::new(1920 * 4, 1016 * 4),
            near: 0.1,
            far: 100.0,
        }
    }
}

impl GridConfig {
    pub fn validate(&self, max_views: usize) -> Result<()> {
        validate_lens(self.fov_degrees, self.near, self.far)?;
        if self.resolution.x == 0 || self.resolution.y == 0 {
            return Err(Error::InvalidConfig("grid resolution must be non-zero".to_string()));
        }

        let rows = self.placement.row_columns();
        if rows.is_empty() || rows.iter().any(|&c| c == 0) {
            return Err(Error::InvalidConfig("grid needs at least one view per row".to_string()));
        }
        let total: usize = rows.iter().sum();
        if total > max_views {
            return Err(Error::InvalidConfig(format!(
                "grid holds {} views, limit is {}",
                total, max_views
            )));
        }
        if rows.len() as u32 > self.resolution.y
            || rows.iter().any(|&c| c as u32 > self.resolution.x)
        {
            return Err(Error::InvalidConfig("grid resolution too small for its views".to_string()));
        }

        match &self.placement {
            PlacementConfig::ByStep { step, view_dir, .. } => {
                if *step == Vec2::ZERO {
                    return Err(Error::InvalidConfig("step must be non-zero".to_string()));
                }
                validate_direction(*view_dir)
            }
            PlacementConfig::ByInGridPos { view_dir, .. } => validate_direction(*view_dir),
            PlacementConfig::ByExplicitGrid { rows } => rows
                .iter()
                .flatten()
                .try_for_each(|v| validate_direction(v.view_dir)),
        }
    }
}

// ============================================================================
// Novel view and ray evaluation
// ============================================================================

/// Camera of the synthesized view
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NovelViewConfig {
    pub eye: Vec3,
    pub view_dir: Vec3,
    pub up: Vec3,
    pub fov_degrees: f32,
    pub resolution: UVec2,
    pub near: f32,
    pub far: f32,
}

impl Default for NovelViewConfig {
    fn default() -> Self {
        Self {
            eye: Vec3::new(0.0, 0.0, 2.0),
            view_dir: DEFAULT_VIEW_DIR,
            up: Vec3::Y,
            fov_degrees: 45.0,
            resolution: UVec2::new(1920 / 3 * 2, 1016 / 3 * 2),
            near: 0.1,
            far: 100.0,
        }
    }
}

impl NovelViewConfig {
    pub fn validate(&self) -> Result<()> {
        validate_lens(self.fov_degrees, self.near, self.far)?;
        if self.resolution.x == 0 || self.resolution.y == 0 {
            return Err(Error::InvalidConfig("novel view resolution must be non-zero".to_string()));
        }
        validate_direction(self.view_dir)
    }
}

/// How samples from different source views are combined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SamplingType {
    /// Average the colors of the views that see the surface
    #[default]
    Color,
    /// Weight by inverse depth discrepancy
    DepthDistance,
    /// Weight by inverse angle between the novel ray and the source view
    DepthAngle,
}

/// Parameters of the ray evaluation pass
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayEvalConfig {
    pub sampling: SamplingType,
    /// Requested ray-march steps per pixel
    pub num_ray_samples: u32,
    /// Derive the step count from the ray's covered interval instead
    pub auto_sample_count: bool,
    /// Discard samples whose depth discrepancy exceeds `max_sample_distance`
    pub threshold_depth: bool,
    pub max_sample_distance: f32,
    /// Maximum number of source views blended per pixel
    pub views_used: u32,
}

impl Default for RayEvalConfig {
    fn default() -> Self {
        Self {
            sampling: SamplingType::Color,
            num_ray_samples: 32,
            auto_sample_count: false,
            threshold_depth: false,
            max_sample_distance: 0.5,
            views_used: 4,
        }
    }
}

impl RayEvalConfig {
    pub fn validate(&self) -> Result<()> {
        if self.num_ray_samples == 0 || self.num_ray_samples > MAX_RAY_SAMPLES {
            return Err(Error::InvalidConfig(format!(
                "num_ray_samples must be in 1..={}, got {}",
                MAX_RAY_SAMPLES, self.num_ray_samples
            )));
        }
        if self.views_used == 0 {
            return Err(Error::InvalidConfig("views_used must be at least 1".to_string()));
        }
        if !(self.max_sample_distance > 0.0) {
            return Err(Error::InvalidConfig("max_sample_distance must be positive".to_string()));
        }
        Ok(())
    }
}

fn validate_lens(fov_degrees: f32, near: f32, far: f32) -> Result<()> {
    if !(fov_degrees > 0.0 && fov_degrees < 180.0) {
        return Err(Error::InvalidConfig(format!("fov must be in (0, 180), got {}", fov_degrees)));
    }
    if !(near > 0.0 && near < far) {
        return Err(Error::InvalidConfig(format!("need 0 < near < far, got {} / {}", near, far)));
    }
    Ok(())
}

fn validate_direction(dir: Vec3) -> Result<()> {
    if dir.length_squared() < 1e-12 || !dir.is_finite() {
        return Err(Error::InvalidConfig("view direction must be a non-zero vector".to_string()));
    }
    Ok(())
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
