/// Ray evaluation inputs, gathered once per frame.
///
/// The same `RayEvalInputs` is uploaded to the GPU pass and consumed by
/// the CPU evaluator, so both see identical view records.

use glam::{UVec2, Vec2};
use crate::camera::Camera;
use crate::config::{NovelViewConfig, RayEvalConfig, SamplingType, MAX_RAY_SAMPLES, MAX_VIEWS};
use crate::engine_warn;
use crate::gpu_data::{mat4_cols, planes_array, EvalFlags, RayEvalUniform, SamplingFlags, ViewEvalRecord};
use crate::grid::ViewGrid;
use crate::view::{View, ViewId};

impl From<SamplingType> for SamplingFlags {
    fn from(sampling: SamplingType) -> Self {
        match sampling {
            SamplingType::Color => SamplingFlags::COLOR,
            SamplingType::DepthDistance => SamplingFlags::DEPTH_DISTANCE,
            SamplingType::DepthAngle => SamplingFlags::DEPTH_ANGLE,
        }
    }
}

/// Build the novel camera described by `config`
pub fn novel_camera(config: &NovelViewConfig) -> Camera {
    Camera::new(
        config.resolution.as_vec2(),
        config.eye,
        config.view_dir,
        config.up,
        config.fov_degrees,
        config.near,
        config.far,
    )
}

/// Snapshot of one source view as the ray evaluation sees it
pub fn eval_record(view: &View) -> ViewEvalRecord {
    camera_record(view.camera(), view.viewport_origin(), view.resolution())
}

/// Record of a camera whose image sits at `origin` in the atlas
pub fn camera_record(camera: &Camera, origin: UVec2, size: UVec2) -> ViewEvalRecord {
    let size = size.as_vec2();
    let origin = origin.as_vec2();
    let dir = camera.world_view_dir();

    ViewEvalRecord {
        frustum_planes: planes_array(camera.frustum_planes()),
        view: mat4_cols(camera.view_matrix()),
        proj: mat4_cols(camera.projection_matrix()),
        inv_view: mat4_cols(camera.inverse_view_matrix()),
        inv_proj: mat4_cols(camera.inverse_projection_matrix()),
        res_offset: [size.x, size.y, origin.x, origin.y],
        near_far: [camera.near(), camera.far()],
        _pad: [0.0; 2],
        view_dir: [dir.x, dir.y, dir.z, 0.0],
    }
}

/// Uniform plus one record per active source view
#[derive(Debug, Clone)]
pub struct RayEvalInputs {
    pub uniform: RayEvalUniform,
    pub records: Vec<ViewEvalRecord>,
    /// Id of the view behind each record
    pub view_ids: Vec<ViewId>,
}

impl RayEvalInputs {
    /// Collect the inputs for rendering `novel` from the grid's active views
    pub fn gather(
        novel: &Camera,
        grid: &ViewGrid,
        atlas_resolution: UVec2,
        config: &RayEvalConfig,
        test_pixel: Option<UVec2>,
    ) -> Self {
        let (records, view_ids) = grid
            .active_views()
            .map(|view| (eval_record(view), view.id()))
            .unzip();
        Self::from_records(novel, records, view_ids, atlas_resolution, config, test_pixel)
    }

    /// Build inputs from already marshalled records
    ///
    /// Records past `MAX_VIEWS` are dropped, since the kernel cannot see them.
    pub fn from_records(
        novel: &Camera,
        mut records: Vec<ViewEvalRecord>,
        mut view_ids: Vec<ViewId>,
        atlas_resolution: UVec2,
        config: &RayEvalConfig,
        test_pixel: Option<UVec2>,
    ) -> Self {
        if records.len() > MAX_VIEWS {
            engine_warn!(
                "mview::RayEvalInputs",
                "{} source views exceed the ray-eval limit of {}, extra views ignored",
                records.len(),
                MAX_VIEWS
            );
            records.truncate(MAX_VIEWS);
        }
        view_ids.truncate(records.len());

        let mut eval_flags = EvalFlags::empty();
        eval_flags.set(EvalFlags::AUTO_SAMPLE_COUNT, config.auto_sample_count);
        eval_flags.set(EvalFlags::THRESHOLD_DEPTH, config.threshold_depth);

        let tested = test_pixel.unwrap_or(UVec2::ZERO).as_vec2();
        let resolution = novel.resolution();
        let atlas = atlas_resolution.as_vec2();

        let uniform = RayEvalUniform {
            inv_view: mat4_cols(novel.inverse_view_matrix()),
            inv_proj: mat4_cols(novel.inverse_projection_matrix()),
            resolution: resolution.to_array(),
            atlas_resolution: atlas.to_array(),
            view_count: records.len() as i32,
            sampling_flags: SamplingFlags::from(config.sampling).bits(),
            test_pixel: u32::from(test_pixel.is_some()),
            num_ray_samples: config.num_ray_samples.clamp(1, MAX_RAY_SAMPLES) as i32,
            tested_pixel: tested.to_array(),
            max_sample_distance: config.max_sample_distance,
            eval_flags: eval_flags.bits(),
            views_used: config.views_used as i32,
            _pad: [0; 3],
        };

        Self { uniform, records, view_ids }
    }

    pub fn view_count(&self) -> usize {
        self.records.len()
    }

    /// Novel image size in pixels
    pub fn resolution(&self) -> UVec2 {
        Vec2::from_array(self.uniform.resolution).as_uvec2()
    }

    pub fn test_pixel(&self) -> Option<UVec2> {
        (self.uniform.test_pixel != 0).then(|| Vec2::from_array(self.uniform.tested_pixel).as_uvec2())
    }

    pub fn sampling_flags(&self) -> SamplingFlags {
        SamplingFlags::from_bits_truncate(self.uniform.sampling_flags)
    }

    pub fn eval_flags(&self) -> EvalFlags {
        EvalFlags::from_bits_truncate(self.uniform.eval_flags)
    }
}

#[cfg(test)]
#[path = "inputs_tests.rs"]
mod tests;
