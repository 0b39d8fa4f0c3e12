/// RayEvaluator - CPU reference of the ray evaluation pass.
///
/// For each novel pixel a primary ray is cast and clipped against every
/// source frustum. The ray is marched over the union of the kept
/// intervals. At each step the sample point is projected into every view
/// whose interval covers it, and the view's depth tells whether the point
/// has reached the surface that view captured. The first step with at
/// least one hit decides the pixel.

use glam::{Mat4, UVec2, Vec2, Vec3, Vec4};
use crate::camera::Frustum;
use crate::config::MAX_RAY_SAMPLES;
use crate::error::{Error, Result};
use crate::gpu_data::{EvalFlags, SamplingFlags, ViewEvalDebug, ViewEvalRecord};
use super::inputs::RayEvalInputs;

/// Ray-march steps per world unit when the step count is automatic
pub const AUTO_SAMPLES_PER_UNIT: f32 = 8.0;

/// Color of pixels no source view can explain
pub const BACKGROUND: [f32; 4] = [0.0; 4];

const WEIGHT_EPSILON: f32 = 1e-4;

/// View-space distance of a `0..1` depth-buffer value
pub fn linearize_depth(depth: f32, near: f32, far: f32) -> f32 {
    near * far / (far - depth * (far - near))
}

/// Depth-buffer value of a point `distance` in front of the camera
pub fn encode_depth(distance: f32, near: f32, far: f32) -> f32 {
    far * (distance - near) / ((far - near) * distance)
}

// ============================================================================
// Source atlas
// ============================================================================

/// CPU copy of the color/depth atlas the grid views rendered into
#[derive(Debug, Clone)]
pub struct SourceAtlas {
    size: UVec2,
    color: Vec<[f32; 4]>,
    depth: Vec<f32>,
}

impl SourceAtlas {
    /// Cleared atlas: background color, depth at the far plane
    pub fn new(size: UVec2) -> Self {
        let len = (size.x * size.y) as usize;
        Self { size, color: vec![BACKGROUND; len], depth: vec![1.0; len] }
    }

    /// Wrap row-major texel data read back from the GPU
    pub fn from_raw(size: UVec2, color: Vec<[f32; 4]>, depth: Vec<f32>) -> Result<Self> {
        let len = (size.x * size.y) as usize;
        if color.len() != len || depth.len() != len {
            return Err(Error::InvalidResource(format!(
                "atlas {}x{} needs {} texels, got {} color / {} depth",
                size.x, size.y, len, color.len(), depth.len()
            )));
        }
        Ok(Self { size, color, depth })
    }

    pub fn size(&self) -> UVec2 {
        self.size
    }

    fn texel_index(&self, pixel: UVec2) -> usize {
        let p = pixel.min(self.size.saturating_sub(UVec2::ONE));
        (p.y * self.size.x + p.x) as usize
    }

    pub fn set(&mut self, pixel: UVec2, color: [f32; 4], depth: f32) {
        if pixel.x < self.size.x && pixel.y < self.size.y {
            let i = self.texel_index(pixel);
            self.color[i] = color;
            self.depth[i] = depth;
        }
    }

    /// Fill a viewport tile; `f` receives tile-local pixel coordinates
    pub fn fill_tile(&mut self, origin: UVec2, size: UVec2, mut f: impl FnMut(UVec2) -> ([f32; 4], f32)) {
        for y in 0..size.y {
            for x in 0..size.x {
                let (color, depth) = f(UVec2::new(x, y));
                self.set(origin + UVec2::new(x, y), color, depth);
            }
        }
    }

    /// Color at `pixel`, clamped to the atlas
    pub fn color(&self, pixel: UVec2) -> [f32; 4] {
        self.color[self.texel_index(pixel)]
    }

    /// Depth at `pixel`, clamped to the atlas
    pub fn depth(&self, pixel: UVec2) -> f32 {
        self.depth[self.texel_index(pixel)]
    }
}

// ============================================================================
// Source views
// ============================================================================

struct SourceView {
    frustum: Frustum,
    view_proj: Mat4,
    size: Vec2,
    origin: Vec2,
    near: f32,
    far: f32,
    dir: Vec3,
}

struct ViewSample {
    color: [f32; 4],
    /// View-space distance of the sample point
    point_depth: f32,
    /// View-space distance of the surface the view captured there
    surface_depth: f32,
}

impl SourceView {
    fn from_record(record: &ViewEvalRecord) -> Self {
        let view = Mat4::from_cols_array_2d(&record.view);
        let proj = Mat4::from_cols_array_2d(&record.proj);
        let [w, h, x, y] = record.res_offset;
        Self {
            frustum: Frustum { planes: record.frustum_planes.map(Vec4::from_array) },
            view_proj: proj * view,
            size: Vec2::new(w, h),
            origin: Vec2::new(x, y),
            near: record.near_far[0],
            far: record.near_far[1],
            dir: Vec4::from_array(record.view_dir).truncate(),
        }
    }

    fn sample(&self, atlas: &SourceAtlas, point: Vec3) -> Option<ViewSample> {
        let clip = self.view_proj * point.extend(1.0);
        if clip.w <= 0.0 {
            return None;
        }
        let ndc = clip.truncate() / clip.w;
        if ndc.x.abs() > 1.0 || ndc.y.abs() > 1.0 || !(0.0..=1.0).contains(&ndc.z) {
            return None;
        }

        let local = ((ndc.truncate() * 0.5 + 0.5) * self.size)
            .floor()
            .clamp(Vec2::ZERO, self.size - 1.0);
        let texel = (self.origin + local).as_uvec2();

        Some(ViewSample {
            color: atlas.color(texel),
            point_depth: clip.w,
            surface_depth: linearize_depth(atlas.depth(texel), self.near, self.far),
        })
    }
}

// ============================================================================
// Diagnostics
// ============================================================================

/// Parametric range over which the ray crosses one source frustum
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewInterval {
    /// Index into the input records
    pub view: usize,
    pub t_enter: f32,
    pub t_exit: f32,
}

/// Everything the evaluation of one pixel found
#[derive(Debug, Clone, PartialEq)]
pub struct PixelDiagnostics {
    pub pixel: UVec2,
    pub ray_origin: Vec3,
    pub ray_dir: Vec3,
    /// Source frustums the ray crosses
    pub num_intersections: u32,
    /// Intervals kept for marching, best-aligned view first
    pub intervals: Vec<ViewInterval>,
    /// Ray-march steps taken
    pub steps: u32,
    /// Sample point where a surface was found
    pub point_in_world: Option<Vec3>,
    pub color: [f32; 4],
}

impl PixelDiagnostics {
    pub fn num_found_intervals(&self) -> u32 {
        self.intervals.len() as u32
    }

    /// Same data in the layout the GPU debug buffer uses, one per view
    pub fn debug_records(&self, inputs: &RayEvalInputs) -> Vec<ViewEvalDebug> {
        let point = match self.point_in_world {
            Some(p) => p.extend(1.0),
            None => Vec4::ZERO,
        };
        inputs
            .records
            .iter()
            .map(|record| ViewEvalDebug {
                frustum_planes: record.frustum_planes,
                num_intersections: self.num_intersections as i32,
                num_found_intervals: self.intervals.len() as i32,
                view_res: [record.res_offset[0], record.res_offset[1]],
                point_in_world: point.to_array(),
            })
            .collect()
    }
}

// ============================================================================
// Evaluator
// ============================================================================

pub struct RayEvaluator {
    views: Vec<SourceView>,
    inv_view: Mat4,
    inv_proj: Mat4,
    resolution: UVec2,
    sampling: SamplingFlags,
    flags: EvalFlags,
    num_ray_samples: u32,
    views_used: usize,
    max_sample_distance: f32,
}

impl RayEvaluator {
    pub fn new(inputs: &RayEvalInputs) -> Self {
        let u = &inputs.uniform;
        Self {
            views: inputs.records.iter().map(SourceView::from_record).collect(),
            inv_view: Mat4::from_cols_array_2d(&u.inv_view),
            inv_proj: Mat4::from_cols_array_2d(&u.inv_proj),
            resolution: inputs.resolution(),
            sampling: inputs.sampling_flags(),
            flags: inputs.eval_flags(),
            num_ray_samples: u.num_ray_samples.max(1) as u32,
            views_used: u.views_used.max(1) as usize,
            max_sample_distance: u.max_sample_distance,
        }
    }

    pub fn resolution(&self) -> UVec2 {
        self.resolution
    }

    /// World-space origin and unit direction through a pixel center
    pub fn primary_ray(&self, pixel: UVec2) -> (Vec3, Vec3) {
        let uv = (pixel.as_vec2() + 0.5) / self.resolution.as_vec2();
        let ndc = uv * 2.0 - 1.0;
        let target = self.inv_proj * Vec4::new(ndc.x, ndc.y, 1.0, 1.0);
        let dir = self
            .inv_view
            .transform_vector3(target.truncate().normalize())
            .normalize();
        (self.inv_view.transform_point3(Vec3::ZERO), dir)
    }

    /// Steps used to march an interval of `length` world units
    pub fn step_count(&self, length: f32) -> u32 {
        if self.flags.contains(EvalFlags::AUTO_SAMPLE_COUNT) {
            ((length * AUTO_SAMPLES_PER_UNIT).ceil() as u32).clamp(1, MAX_RAY_SAMPLES)
        } else {
            self.num_ray_samples.min(MAX_RAY_SAMPLES)
        }
    }

    /// Reconstruct the whole novel image, row-major
    pub fn evaluate_image(&self, atlas: &SourceAtlas) -> Vec<[f32; 4]> {
        let mut image = Vec::with_capacity((self.resolution.x * self.resolution.y) as usize);
        for y in 0..self.resolution.y {
            for x in 0..self.resolution.x {
                image.push(self.trace_pixel(atlas, UVec2::new(x, y)).color);
            }
        }
        image
    }

    /// Evaluate a single pixel and report how it was reconstructed
    pub fn inspect_pixel(&self, atlas: &SourceAtlas, pixel: UVec2) -> PixelDiagnostics {
        self.trace_pixel(atlas, pixel)
    }

    fn candidate_intervals(&self, origin: Vec3, dir: Vec3) -> Vec<ViewInterval> {
        self.views
            .iter()
            .enumerate()
            .filter_map(|(view, source)| {
                let (t_enter, t_exit) = source.frustum.intersect_ray(origin, dir)?;
                (t_exit > t_enter && t_exit.is_finite()).then_some(ViewInterval { view, t_enter, t_exit })
            })
            .collect()
    }

    fn weight(&self, source: &SourceView, dir: Vec3, discrepancy: f32) -> f32 {
        if self.sampling.contains(SamplingFlags::DEPTH_DISTANCE) {
            1.0 / (discrepancy + WEIGHT_EPSILON)
        } else if self.sampling.contains(SamplingFlags::DEPTH_ANGLE) {
            let angle = dir.dot(source.dir).clamp(-1.0, 1.0).acos();
            1.0 / (angle + WEIGHT_EPSILON)
        } else {
            1.0
        }
    }

    fn trace_pixel(&self, atlas: &SourceAtlas, pixel: UVec2) -> PixelDiagnostics {
        let (origin, dir) = self.primary_ray(pixel);
        let mut intervals = self.candidate_intervals(origin, dir);
        let num_intersections = intervals.len() as u32;

        // Stable: equally aligned views keep grid order
        intervals.sort_by(|a, b| {
            let da = dir.dot(self.views[a.view].dir);
            let db = dir.dot(self.views[b.view].dir);
            db.total_cmp(&da)
        });
        intervals.truncate(self.views_used);

        let mut diagnostics = PixelDiagnostics {
            pixel,
            ray_origin: origin,
            ray_dir: dir,
            num_intersections,
            intervals: Vec::new(),
            steps: 0,
            point_in_world: None,
            color: BACKGROUND,
        };
        if intervals.is_empty() {
            return diagnostics;
        }

        let t_min = intervals.iter().map(|i| i.t_enter).fold(f32::INFINITY, f32::min);
        let t_max = intervals.iter().map(|i| i.t_exit).fold(f32::NEG_INFINITY, f32::max);
        let steps = self.step_count(t_max - t_min);
        let step = (t_max - t_min) / steps as f32;
        let threshold = self.flags.contains(EvalFlags::THRESHOLD_DEPTH);

        // Closest miss, used when no step reaches a surface
        let mut fallback: Option<(f32, [f32; 4])> = None;

        for i in 0..steps {
            let t = t_min + (i as f32 + 0.5) * step;
            let point = origin + dir * t;

            let mut color_sum = Vec4::ZERO;
            let mut weight_sum = 0.0;
            for interval in &intervals {
                if t < interval.t_enter || t > interval.t_exit {
                    continue;
                }
                let source = &self.views[interval.view];
                let Some(sample) = source.sample(atlas, point) else {
                    continue;
                };

                let discrepancy = (sample.point_depth - sample.surface_depth).abs();
                if threshold && discrepancy > self.max_sample_distance {
                    continue;
                }
                if fallback.map_or(true, |(best, _)| discrepancy < best) {
                    fallback = Some((discrepancy, sample.color));
                }

                if sample.point_depth >= sample.surface_depth - step {
                    let weight = self.weight(source, dir, discrepancy);
                    color_sum += Vec4::from_array(sample.color) * weight;
                    weight_sum += weight;
                }
            }

            if weight_sum > 0.0 {
                diagnostics.steps = i + 1;
                diagnostics.color = (color_sum / weight_sum).to_array();
                diagnostics.point_in_world = Some(point);
                diagnostics.intervals = intervals;
                return diagnostics;
            }
        }

        diagnostics.steps = steps;
        diagnostics.intervals = intervals;
        if let Some((_, color)) = fallback {
            diagnostics.color = color;
        }
        diagnostics
    }
}

#[cfg(test)]
#[path = "evaluator_tests.rs"]
mod tests;
