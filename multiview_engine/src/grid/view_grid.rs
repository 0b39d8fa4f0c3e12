/// ViewGrid - the calibrated camera rig.
///
/// Views are stored row-major in a dense vector. Rows may hold different
/// column counts. `grid_positions` runs parallel to `views` and holds the
/// grid-local position of each view (unused in explicit mode).
///
/// Structural edits that break a rule (MAX_VIEWS, minimum 1x1, explicit
/// mode) are rejected with a warning and `Ok(false)`. Only GPU failures
/// come back as `Err`.

use glam::{Mat4, Quat, UVec2, Vec2, Vec3};
use crate::camera::Camera;
use crate::config::{EngineConfig, GridConfig, PlacementConfig, PlacementMode, DEFAULT_VIEW_DIR};
use crate::error::Result;
use crate::frame::{FrameContext, FrameSlot};
use crate::graphics_device::{GraphicsDevice, StagePipelines};
use crate::view::{View, ViewId, ViewLifecycle};
use crate::{engine_debug, engine_trace, engine_warn};
use super::tiling::cell_rect;
use super::view_ids::ViewIdAllocator;

const SOURCE: &str = "mview::ViewGrid";

/// Below this, the reference and target directions count as equal
const SAME_DIRECTION_EPSILON: f32 = 1e-6;

/// Rigid grid transform: rotate `reference` onto `target`, then translate.
///
/// Equal or degenerate directions skip the rotation term.
pub fn grid_matrix(location: Vec3, reference: Vec3, target: Vec3) -> Mat4 {
    let from = reference.normalize_or_zero();
    let to = target.normalize_or_zero();
    let rotation = if from == Vec3::ZERO || to == Vec3::ZERO || from.abs_diff_eq(to, SAME_DIRECTION_EPSILON) {
        Quat::IDENTITY
    } else {
        Quat::from_rotation_arc(from, to)
    };
    Mat4::from_rotation_translation(rotation, location)
}

/// Grid-local lattice points, row-major, centered on the grid origin.
///
/// Point `(col, row)` sits at `(col - (columns - 1) / 2, (rows - 1) / 2 - row) * step`,
/// so a 1x1 grid puts its single view on the origin.
///
/// `grid_size` is (columns, rows). Rows go down the local Y axis.
pub fn lattice_positions(grid_size: UVec2, step: Vec2) -> Vec<Vec3> {
    let columns = grid_size.x as f32;
    let rows = grid_size.y as f32;
    let origin = Vec3::new(-(columns - 1.0) * step.x / 2.0, (rows - 1.0) * step.y / 2.0, 0.0);

    (0..grid_size.y)
        .flat_map(|row| (0..grid_size.x).map(move |col| (row, col)))
        .map(|(row, col)| origin + Vec3::new(col as f32 * step.x, -(row as f32) * step.y, 0.0))
        .collect()
}

pub struct ViewGrid {
    placement_mode: PlacementMode,
    /// Fixed pixel area tiled by the viewports
    resolution: UVec2,
    row_columns: Vec<usize>,
    views: Vec<View>,
    grid_positions: Vec<Vec3>,
    /// Removed from the grid, waiting for their frame slots to go idle
    retired: Vec<View>,
    view_ids: ViewIdAllocator,
    location: Vec3,
    view_dir: Vec3,
    grid_matrix: Mat4,
    fov_degrees: f32,
    near: f32,
    far: f32,
    max_views: usize,
    frames_in_flight: usize,
}

impl ViewGrid {
    /// Build the grid and all its views from configuration
    pub fn new(
        device: &dyn GraphicsDevice,
        pipelines: &StagePipelines,
        config: &GridConfig,
        engine: &EngineConfig,
    ) -> Result<Self> {
        engine.validate()?;
        config.validate(engine.max_views)?;

        let row_columns = config.placement.row_columns();
        let (location, view_dir) = match &config.placement {
            PlacementConfig::ByStep { location, view_dir, .. }
            | PlacementConfig::ByInGridPos { location, view_dir, .. } => (*location, *view_dir),
            PlacementConfig::ByExplicitGrid { .. } => (Vec3::ZERO, DEFAULT_VIEW_DIR),
        };

        let mut grid = Self {
            placement_mode: config.placement.mode(),
            resolution: config.resolution,
            row_columns: Vec::new(),
            views: Vec::new(),
            grid_positions: Vec::new(),
            retired: Vec::new(),
            view_ids: ViewIdAllocator::new(),
            location,
            view_dir,
            grid_matrix: Mat4::IDENTITY,
            fov_degrees: config.fov_degrees,
            near: config.near,
            far: config.far,
            max_views: engine.max_views,
            frames_in_flight: engine.frames_in_flight,
        };

        let positions: Vec<Vec3> = match &config.placement {
            PlacementConfig::ByStep { grid_size, step, .. } => lattice_positions(*grid_size, *step),
            PlacementConfig::ByInGridPos { rows, .. } => rows.iter().flatten().copied().collect(),
            PlacementConfig::ByExplicitGrid { rows } => vec![Vec3::ZERO; rows.iter().map(Vec::len).sum()],
        };
        let explicit: Vec<_> = match &config.placement {
            PlacementConfig::ByExplicitGrid { rows } => rows.iter().flatten().copied().map(Some).collect(),
            _ => vec![None; positions.len()],
        };

        let mut index = 0;
        for (row, &columns) in row_columns.iter().enumerate() {
            for column in 0..columns {
                let (origin, size) = cell_rect(grid.resolution, &row_columns, row, column);
                let camera = match explicit[index] {
                    Some(placed) => Camera::new(
                        size.as_vec2(),
                        placed.eye,
                        placed.view_dir,
                        placed.up,
                        grid.fov_degrees,
                        grid.near,
                        grid.far,
                    ),
                    None => grid.grid_camera(size),
                };
                match grid.spawn_view(device, pipelines, camera, origin, size) {
                    Ok(view) => {
                        grid.views.push(view);
                        grid.grid_positions.push(positions[index]);
                    }
                    Err(e) => {
                        grid.destroy_resources(device)?;
                        return Err(e);
                    }
                }
                index += 1;
            }
        }
        grid.row_columns = row_columns;
        grid.reconstruct_matrices();

        engine_debug!(
            SOURCE,
            "Grid built: {} views in {} rows ({:?})",
            grid.views.len(),
            grid.row_columns.len(),
            grid.placement_mode
        );
        Ok(grid)
    }

    /// Recompute the grid transform, derive eyes, rebuild every camera.
    ///
    /// Must run once per frame before any view is culled or drawn.
    pub fn reconstruct_matrices(&mut self) {
        match self.placement_mode {
            PlacementMode::ByExplicitGrid => {
                self.grid_matrix = Mat4::IDENTITY;
                for view in &mut self.views {
                    view.camera_mut().reconstruct_matrices(&Mat4::IDENTITY);
                }
            }
            PlacementMode::ByStep | PlacementMode::ByInGridPos => {
                self.grid_matrix = grid_matrix(self.location, DEFAULT_VIEW_DIR, self.view_dir);
                let matrix = self.grid_matrix;
                for (view, position) in self.views.iter_mut().zip(&self.grid_positions) {
                    let camera = view.camera_mut();
                    camera.set_eye(matrix.transform_point3(*position));
                    camera.reconstruct_matrices(&matrix);
                }
            }
        }
        engine_trace!(SOURCE, "Reconstructed {} cameras", self.views.len());
    }

    // ===== STRUCTURAL EDITS =====

    /// Append a row with as many views as the last row
    pub fn add_row(&mut self, device: &dyn GraphicsDevice, pipelines: &StagePipelines) -> Result<bool> {
        if !self.check_editable("add a row") {
            return Ok(false);
        }
        let columns = self.row_columns.last().copied().unwrap_or(1);
        if !self.check_capacity(columns) {
            return Ok(false);
        }
        if self.row_columns.len() as u32 + 1 > self.resolution.y {
            engine_warn!(SOURCE, "Cannot add a row: grid height {} is exhausted", self.resolution.y);
            return Ok(false);
        }

        let mut new_rows = self.row_columns.clone();
        new_rows.push(columns);
        let row = new_rows.len() - 1;
        let cells: Vec<(usize, usize)> = (0..columns).map(|column| (row, column)).collect();
        let created = self.spawn_cells(device, pipelines, &new_rows, &cells)?;

        self.views.extend(created);
        self.grid_positions.extend(std::iter::repeat(Vec3::ZERO).take(columns));
        self.row_columns = new_rows;
        self.retile();

        engine_debug!(SOURCE, "Added row {} with {} views", row, columns);
        Ok(true)
    }

    /// Append one view at the end of every row
    pub fn add_column(&mut self, device: &dyn GraphicsDevice, pipelines: &StagePipelines) -> Result<bool> {
        let rows: Vec<usize> = (0..self.row_columns.len()).collect();
        self.insert_columns(device, pipelines, &rows)
    }

    /// Append one view at the end of a single row
    pub fn add_column_to_row(
        &mut self,
        device: &dyn GraphicsDevice,
        pipelines: &StagePipelines,
        row: usize,
    ) -> Result<bool> {
        if row >= self.row_columns.len() {
            engine_warn!(SOURCE, "Cannot add a column: row {} does not exist", row);
            return Ok(false);
        }
        self.insert_columns(device, pipelines, &[row])
    }

    /// Remove the last row.
    ///
    /// With `resources_only`, only releases `frame`'s slot of the views
    /// that would be removed. The structural call then retires them.
    pub fn remove_row(
        &mut self,
        device: &dyn GraphicsDevice,
        frame: &FrameContext,
        resources_only: bool,
    ) -> Result<bool> {
        if !self.check_editable("remove a row") {
            return Ok(false);
        }
        if self.row_columns.len() <= 1 {
            engine_warn!(SOURCE, "Cannot remove the last remaining row");
            return Ok(false);
        }

        let columns = self.row_columns.last().copied().unwrap_or(0);
        let start = self.views.len() - columns;
        if resources_only {
            return self.release_slots(device, frame, start..self.views.len());
        }

        let removed: Vec<View> = self.views.drain(start..).collect();
        self.grid_positions.truncate(start);
        self.row_columns.pop();
        for view in removed {
            self.retire(device, view, frame)?;
        }
        self.retile();

        engine_debug!(SOURCE, "Removed row {} ({} views)", self.row_columns.len(), columns);
        Ok(true)
    }

    /// Remove the last view of every row
    pub fn remove_column(
        &mut self,
        device: &dyn GraphicsDevice,
        frame: &FrameContext,
        resources_only: bool,
    ) -> Result<bool> {
        let rows: Vec<usize> = (0..self.row_columns.len()).collect();
        self.remove_columns(device, &rows, frame, resources_only)
    }

    /// Remove the last view of a single row
    pub fn remove_column_from_row(
        &mut self,
        device: &dyn GraphicsDevice,
        row: usize,
        frame: &FrameContext,
        resources_only: bool,
    ) -> Result<bool> {
        if row >= self.row_columns.len() {
            engine_warn!(SOURCE, "Cannot remove a column: row {} does not exist", row);
            return Ok(false);
        }
        self.remove_columns(device, &[row], frame, resources_only)
    }

    /// Release `frame`'s slot of every retired view.
    ///
    /// Call after `frame`'s fence has been waited on. Returns the ids of
    /// the views that became fully removed; those ids may be reused.
    pub fn reclaim_retired(&mut self, device: &dyn GraphicsDevice, frame: &FrameContext) -> Result<Vec<ViewId>> {
        let mut reclaimed = Vec::new();
        for view in &mut self.retired {
            view.destroy_resources(device, FrameSlot::Index(frame.index))?;
            if view.lifecycle() == ViewLifecycle::Removed {
                reclaimed.push(view.id());
            }
        }
        self.retired.retain(|view| view.lifecycle() != ViewLifecycle::Removed);
        for &id in &reclaimed {
            self.view_ids.free(id);
            engine_debug!(SOURCE, "View {} reclaimed", id.0);
        }
        Ok(reclaimed)
    }

    /// Release every GPU resource of live and retired views.
    ///
    /// The caller waits for the device to be idle first.
    pub fn destroy_resources(&mut self, device: &dyn GraphicsDevice) -> Result<()> {
        for view in self.views.iter_mut().chain(self.retired.iter_mut()) {
            view.destroy_resources(device, FrameSlot::All)?;
        }
        for view in self.retired.drain(..) {
            self.view_ids.free(view.id());
        }
        Ok(())
    }

    fn insert_columns(
        &mut self,
        device: &dyn GraphicsDevice,
        pipelines: &StagePipelines,
        rows: &[usize],
    ) -> Result<bool> {
        if !self.check_editable("add a column") || !self.check_capacity(rows.len()) {
            return Ok(false);
        }
        if let Some(&row) = rows.iter().find(|&&row| self.row_columns[row] as u32 + 1 > self.resolution.x) {
            engine_warn!(SOURCE, "Cannot add a column: row {} already fills the grid width", row);
            return Ok(false);
        }

        let mut new_rows = self.row_columns.clone();
        for &row in rows {
            new_rows[row] += 1;
        }
        let cells: Vec<(usize, usize)> = rows.iter().map(|&row| (row, new_rows[row] - 1)).collect();
        let created = self.spawn_cells(device, pipelines, &new_rows, &cells)?;

        // Insert from the bottom row up so earlier row starts stay valid
        let mut placed: Vec<(usize, View)> = rows.iter().copied().zip(created).collect();
        placed.sort_by(|a, b| b.0.cmp(&a.0));
        for (row, view) in placed {
            let at = self.row_start(row) + self.row_columns[row];
            self.views.insert(at, view);
            self.grid_positions.insert(at, Vec3::ZERO);
            self.row_columns[row] += 1;
        }
        self.retile();

        engine_debug!(SOURCE, "Added a column to {} rows", rows.len());
        Ok(true)
    }

    fn remove_columns(
        &mut self,
        device: &dyn GraphicsDevice,
        rows: &[usize],
        frame: &FrameContext,
        resources_only: bool,
    ) -> Result<bool> {
        if !self.check_editable("remove a column") {
            return Ok(false);
        }
        if let Some(&row) = rows.iter().find(|&&row| self.row_columns[row] <= 1) {
            engine_warn!(SOURCE, "Cannot remove a column: row {} has a single view", row);
            return Ok(false);
        }

        let mut victims: Vec<(usize, usize)> = rows
            .iter()
            .map(|&row| (row, self.row_start(row) + self.row_columns[row] - 1))
            .collect();

        if resources_only {
            for &(_, index) in &victims {
                self.release_slots(device, frame, index..index + 1)?;
            }
            return Ok(true);
        }

        victims.sort_by(|a, b| b.1.cmp(&a.1));
        for (row, index) in victims {
            let view = self.views.remove(index);
            self.grid_positions.remove(index);
            self.row_columns[row] -= 1;
            self.retire(device, view, frame)?;
        }
        self.retile();

        engine_debug!(SOURCE, "Removed a column from {} rows", rows.len());
        Ok(true)
    }

    fn release_slots(
        &mut self,
        device: &dyn GraphicsDevice,
        frame: &FrameContext,
        range: std::ops::Range<usize>,
    ) -> Result<bool> {
        for view in &mut self.views[range] {
            view.destroy_resources(device, FrameSlot::Index(frame.index))?;
            engine_debug!(SOURCE, "View {} released frame slot {}", view.id().0, frame.index);
        }
        Ok(true)
    }

    /// Take a view out of the grid; its idle frame slot is released now
    fn retire(&mut self, device: &dyn GraphicsDevice, mut view: View, frame: &FrameContext) -> Result<()> {
        view.destroy_resources(device, FrameSlot::Index(frame.index))?;
        if view.lifecycle() == ViewLifecycle::Removed {
            self.view_ids.free(view.id());
            engine_debug!(SOURCE, "View {} removed", view.id().0);
        } else {
            engine_debug!(SOURCE, "View {} retired, {:?}", view.id().0, view.lifecycle());
            self.retired.push(view);
        }
        Ok(())
    }

    /// Create views for `cells` laid out against `rows`. All or nothing.
    fn spawn_cells(
        &mut self,
        device: &dyn GraphicsDevice,
        pipelines: &StagePipelines,
        rows: &[usize],
        cells: &[(usize, usize)],
    ) -> Result<Vec<View>> {
        let mut created = Vec::with_capacity(cells.len());
        for &(row, column) in cells {
            let (origin, size) = cell_rect(self.resolution, rows, row, column);
            let camera = self.grid_camera(size);
            match self.spawn_view(device, pipelines, camera, origin, size) {
                Ok(view) => created.push(view),
                Err(e) => {
                    for mut view in created {
                        view.destroy_resources(device, FrameSlot::All)?;
                        self.view_ids.free(view.id());
                    }
                    return Err(e);
                }
            }
        }
        Ok(created)
    }

    fn spawn_view(
        &mut self,
        device: &dyn GraphicsDevice,
        pipelines: &StagePipelines,
        camera: Camera,
        origin: UVec2,
        size: UVec2,
    ) -> Result<View> {
        let id = self.view_ids.alloc();
        View::new(device, pipelines, id, camera, origin, size, self.frames_in_flight).map_err(|e| {
            self.view_ids.free(id);
            e
        })
    }

    /// Camera of a lattice view; eye and direction come from the grid matrix
    fn grid_camera(&self, size: UVec2) -> Camera {
        Camera::new(size.as_vec2(), Vec3::ZERO, DEFAULT_VIEW_DIR, Vec3::Y, self.fov_degrees, self.near, self.far)
    }

    /// Re-partition the fixed resolution over the current counts
    fn retile(&mut self) {
        let mut index = 0;
        for (row, &columns) in self.row_columns.iter().enumerate() {
            for column in 0..columns {
                let (origin, size) = cell_rect(self.resolution, &self.row_columns, row, column);
                self.views[index].set_viewport_rect(origin, size);
                index += 1;
            }
        }
    }

    fn check_editable(&self, action: &str) -> bool {
        if self.placement_mode == PlacementMode::ByExplicitGrid {
            engine_warn!(SOURCE, "Cannot {} in explicit placement mode", action);
            return false;
        }
        true
    }

    fn check_capacity(&self, additional: usize) -> bool {
        if self.views.len() + additional > self.max_views {
            engine_warn!(
                SOURCE,
                "Cannot add {} views: grid holds {} of at most {}",
                additional,
                self.views.len(),
                self.max_views
            );
            return false;
        }
        true
    }

    fn row_start(&self, row: usize) -> usize {
        self.row_columns[..row].iter().sum()
    }

    // ===== GETTERS =====

    pub fn placement_mode(&self) -> PlacementMode {
        self.placement_mode
    }

    pub fn resolution(&self) -> UVec2 {
        self.resolution
    }

    pub fn row_columns(&self) -> &[usize] {
        &self.row_columns
    }

    pub fn row_count(&self) -> usize {
        self.row_columns.len()
    }

    pub fn view_count(&self) -> usize {
        self.views.len()
    }

    pub fn max_views(&self) -> usize {
        self.max_views
    }

    pub fn frames_in_flight(&self) -> usize {
        self.frames_in_flight
    }

    /// Views in row-major order
    pub fn views(&self) -> &[View] {
        &self.views
    }

    /// Views that may be culled and drawn this frame
    pub fn active_views(&self) -> impl Iterator<Item = &View> + '_ {
        self.views.iter().filter(|view| view.lifecycle() == ViewLifecycle::Active)
    }

    pub fn view(&self, index: usize) -> Option<&View> {
        self.views.get(index)
    }

    pub fn view_mut(&mut self, index: usize) -> Option<&mut View> {
        self.views.get_mut(index)
    }

    pub fn view_at(&self, row: usize, column: usize) -> Option<&View> {
        if row >= self.row_columns.len() || column >= self.row_columns[row] {
            return None;
        }
        self.views.get(self.row_start(row) + column)
    }

    pub fn view_by_id(&self, id: ViewId) -> Option<&View> {
        self.views.iter().find(|view| view.id() == id)
    }

    pub fn grid_position(&self, index: usize) -> Option<Vec3> {
        self.grid_positions.get(index).copied()
    }

    pub fn retired_views(&self) -> &[View] {
        &self.retired
    }

    /// Length a per-view arena indexed by `ViewId` needs
    pub fn view_id_capacity(&self) -> usize {
        self.view_ids.high_water_mark() as usize
    }

    pub fn grid_matrix(&self) -> &Mat4 {
        &self.grid_matrix
    }

    pub fn location(&self) -> Vec3 {
        self.location
    }

    pub fn view_dir(&self) -> Vec3 {
        self.view_dir
    }

    // ===== SETTERS =====

    pub fn set_location(&mut self, location: Vec3) {
        self.location = location;
    }

    pub fn set_view_dir(&mut self, view_dir: Vec3) {
        self.view_dir = view_dir;
    }

    /// Place a view inside the grid. Rejected in explicit mode.
    pub fn set_grid_position(&mut self, index: usize, position: Vec3) -> bool {
        if self.placement_mode == PlacementMode::ByExplicitGrid {
            engine_warn!(SOURCE, "Grid positions are unused in explicit placement mode");
            return false;
        }
        match self.grid_positions.get_mut(index) {
            Some(slot) => {
                *slot = position;
                true
            }
            None => {
                engine_warn!(SOURCE, "No view at index {}", index);
                false
            }
        }
    }

    /// Toggle frustum culling on every view
    pub fn set_frustum_cull(&mut self, enabled: bool) {
        for view in &mut self.views {
            view.set_frustum_cull(enabled);
        }
    }

    /// Toggle depth-only output on every view
    pub fn set_depth_only(&mut self, enabled: bool) {
        for view in &mut self.views {
            view.set_depth_only(enabled);
        }
    }
}

#[cfg(test)]
#[path = "view_grid_tests.rs"]
mod tests;
