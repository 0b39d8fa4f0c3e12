use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use glam::{UVec2, Vec2, Vec3};
use super::*;
use crate::config::{EngineConfig, GridConfig, NovelViewConfig, PlacementConfig};
use crate::frame::Presentation;
use crate::gpu_data::BoundingSphere;
use crate::graphics_device::mock_graphics_device::{MockBindingGroup, MockRenderTarget, MockStage};
use crate::ray_eval::novel_camera;
use crate::scene::{MeshDesc, SceneDesc, Vertex};

#[derive(Default)]
struct CountingComposite {
    calls: AtomicUsize,
}

impl CompositePass for CountingComposite {
    fn record(&self, cmd: &mut dyn CommandList, _modes: &RenderModes, _frame: &FrameContext) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        cmd.memory_barrier(PipelineStage::ColorAttachmentOutput, PipelineStage::FragmentShader)
    }
}

struct Rig {
    stage: MockStage,
    grid: ViewGrid,
    scene: Scene,
    ray_pass: RayEvalPass,
    target: MockRenderTarget,
    images: MockBindingGroup,
    composite: CountingComposite,
    orchestrator: FrameOrchestrator,
}

impl Rig {
    fn new(columns: u32, frames: usize) -> Self {
        let stage = MockStage::new();
        let config = GridConfig {
            placement: PlacementConfig::ByStep {
                grid_size: UVec2::new(columns, 1),
                step: Vec2::ONE,
                location: Vec3::ZERO,
                view_dir: Vec3::NEG_Z,
            },
            resolution: UVec2::new(800, 600),
            ..Default::default()
        };
        let engine = EngineConfig { frames_in_flight: frames, ..Default::default() };
        let grid = ViewGrid::new(&stage.device, &stage.pipelines(), &config, &engine).unwrap();

        let desc = SceneDesc {
            vertices: vec![Vertex::default(); 3],
            indices: vec![0, 1, 2],
            meshes: (0..3)
                .map(|i| MeshDesc::new(0, 3, BoundingSphere::new(Vec3::new(i as f32, 0.0, -5.0), 0.5)))
                .collect(),
        };
        let scene = Scene::new(&stage.device, &stage.pipelines(), &desc, frames).unwrap();
        let ray_pass = RayEvalPass::new(&stage.device, &stage.ray_eval, 8, frames).unwrap();
        let orchestrator = FrameOrchestrator::new(&stage.device, frames, Some(Duration::from_millis(1))).unwrap();

        Self {
            stage,
            grid,
            scene,
            ray_pass,
            target: MockRenderTarget { width: 800, height: 600 },
            images: MockBindingGroup { set_index: 1, resources: vec!["atlas".into(), "novel".into()] },
            composite: CountingComposite::default(),
            orchestrator,
        }
    }

    /// Run one whole frame, returning its context
    fn run_frame(&mut self, modes: &RenderModes) -> FrameContext {
        let frame = self.orchestrator.begin_frame().unwrap();
        let pipelines = StagePipelines { render: &self.stage.render, cull: &self.stage.cull };
        self.orchestrator
            .prepare_views(&self.stage.device, &pipelines, &mut self.grid, &mut self.scene, modes, &frame)
            .unwrap();
        let novel = novel_camera(&NovelViewConfig::default());
        self.orchestrator
            .prepare_ray_eval(&mut self.ray_pass, &novel, &self.grid, UVec2::new(800, 600), &RayEvalConfig::default(), modes, &frame)
            .unwrap();

        let ray_eval = RayEvalDispatch { pass: &self.ray_pass, pipeline: &self.stage.ray_eval, images: &self.images };
        self.orchestrator
            .record_compute(&frame, &self.grid, &self.scene, &self.stage.cull, ray_eval, modes)
            .unwrap();
        let raster = GridRaster { target: &self.target, pipeline: &self.stage.render, materials: None };
        self.orchestrator
            .record_graphics(&frame, &self.grid, &self.scene, raster, &self.composite, modes)
            .unwrap();
        self.orchestrator.submit(&self.stage.device, &frame).unwrap();
        self.orchestrator.end_frame();
        frame
    }
}

fn position(commands: &[String], command: &str) -> usize {
    commands.iter().position(|c| c == command).unwrap()
}

// ============================================================================
// Frame slots
// ============================================================================

#[test]
fn test_slots_rotate_and_frames_count() {
    let mut rig = Rig::new(1, 2);
    let modes = RenderModes::new();
    let frames: Vec<(usize, u64)> = (0..3).map(|_| rig.run_frame(&modes)).map(|f| (f.index, f.number)).collect();
    assert_eq!(frames, vec![(0, 0), (1, 1), (0, 2)]);
}

#[test]
fn test_zero_frames_in_flight_is_rejected() {
    let stage = MockStage::new();
    let result = FrameOrchestrator::new(&stage.device, 0, None);
    assert!(matches!(result, Err(Error::InitializationFailed(_))));
}

#[test]
fn test_unsubmitted_slot_times_out() {
    let mut rig = Rig::new(1, 1);
    rig.orchestrator.begin_frame().unwrap();
    rig.orchestrator.end_frame();

    let result = rig.orchestrator.begin_frame();
    assert!(matches!(result, Err(Error::Timeout(_))));
}

// ============================================================================
// Submission
// ============================================================================

#[test]
fn test_compute_is_submitted_before_gated_graphics() {
    let mut rig = Rig::new(2, 1);
    rig.run_frame(&RenderModes::new());

    let submissions = rig.stage.device.submissions();
    assert_eq!(submissions.len(), 2);

    assert_eq!(submissions[0].queue, QueueKind::Compute);
    assert_eq!(submissions[0].signal_count, 1);
    assert!(!submissions[0].has_fence);

    assert_eq!(submissions[1].queue, QueueKind::Graphics);
    assert_eq!(submissions[1].wait_count, 1);
    assert!(submissions[1].has_fence);
}

// ============================================================================
// Recording
// ============================================================================

#[test]
fn test_grid_presentation_skips_ray_eval() {
    let mut rig = Rig::new(2, 1);
    rig.run_frame(&RenderModes::new());

    let submissions = rig.stage.device.submissions();
    let compute = &submissions[0].commands[0];
    assert_eq!(compute.first().map(String::as_str), Some("begin"));
    assert_eq!(compute.last().map(String::as_str), Some("end"));
    assert_eq!(compute.iter().filter(|c| c.starts_with("dispatch")).count(), 2);
    assert!(!compute.iter().any(|c| c == "bind_pipeline(ray_eval)"));
}

#[test]
fn test_novel_presentation_dispatches_ray_eval_after_culling() {
    let mut rig = Rig::new(2, 1);
    let mut modes = RenderModes::new();
    modes.set_presentation(Presentation::NovelView);
    rig.run_frame(&modes);

    let submissions = rig.stage.device.submissions();
    let compute = &submissions[0].commands[0];
    let barrier = position(compute, "memory_barrier(ComputeShader->DrawIndirect)");
    let ray_eval = position(compute, "bind_pipeline(ray_eval)");
    assert!(barrier < ray_eval);
    // 1280x676 novel image in 16x16 groups
    assert_eq!(compute[compute.len() - 2], "dispatch(80,43,1)");
}

#[test]
fn test_graphics_draws_each_view_in_its_tile() {
    let mut rig = Rig::new(2, 1);
    rig.run_frame(&RenderModes::new());

    let submissions = rig.stage.device.submissions();
    let graphics = &submissions[1].commands[0];
    let draws: Vec<&String> = graphics.iter().filter(|c| c.starts_with("draw_indexed_indirect")).collect();
    assert_eq!(
        draws,
        vec![
            "draw_indexed_indirect(view0_frame0_commands,0,3,20)",
            "draw_indexed_indirect(view1_frame0_commands,0,3,20)",
        ]
    );
    let viewports: Vec<&String> = graphics.iter().filter(|c| c.starts_with("set_viewport")).collect();
    assert_eq!(viewports, vec!["set_viewport(0,0,400,600)", "set_viewport(400,0,400,600)"]);

    assert_eq!(graphics[1], "begin_render_pass(800x600)");
    let end_pass = position(graphics, "end_render_pass");
    let composite = position(graphics, "memory_barrier(ColorAttachmentOutput->FragmentShader)");
    assert!(end_pass < composite);
    assert_eq!(rig.composite.calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_prepare_ray_eval_only_in_novel_presentations() {
    let mut rig = Rig::new(2, 1);
    let frame = rig.orchestrator.begin_frame().unwrap();
    let novel = novel_camera(&NovelViewConfig::default());
    let config = RayEvalConfig::default();
    let atlas = UVec2::new(800, 600);

    let grid_modes = RenderModes::new();
    let skipped = rig
        .orchestrator
        .prepare_ray_eval(&mut rig.ray_pass, &novel, &rig.grid, atlas, &config, &grid_modes, &frame)
        .unwrap();
    assert!(skipped.is_none());

    let mut novel_modes = RenderModes::new();
    novel_modes.set_presentation(Presentation::NovelView);
    novel_modes.set_test_pixel(UVec2::new(5, 6));
    let inputs = rig
        .orchestrator
        .prepare_ray_eval(&mut rig.ray_pass, &novel, &rig.grid, atlas, &config, &novel_modes, &frame)
        .unwrap()
        .unwrap();
    assert_eq!(inputs.view_count(), 2);
    assert_eq!(inputs.test_pixel(), Some(UVec2::new(5, 6)));
}

#[test]
fn test_depth_only_reaches_every_view() {
    let mut rig = Rig::new(2, 1);
    let mut modes = RenderModes::new();
    modes.set_depth_only(true);
    rig.run_frame(&modes);
    assert!(rig.grid.views().iter().all(|v| v.depth_only()));
}

// ============================================================================
// Removal across frames
// ============================================================================

#[test]
fn test_removed_view_is_reclaimed_after_every_slot_ran() {
    let mut rig = Rig::new(2, 2);
    let modes = RenderModes::new();
    // The mock signals fences on submit, so slot 0 is idle again
    let frame = rig.run_frame(&modes);

    assert!(rig.grid.remove_column(&rig.stage.device, &frame, false).unwrap());
    assert_eq!(rig.grid.retired_views().len(), 1);

    rig.run_frame(&modes);
    assert!(rig.grid.retired_views().is_empty());
    rig.run_frame(&modes);

    let leftovers: Vec<String> = rig
        .stage
        .device
        .live_buffer_names()
        .into_iter()
        .filter(|name| name.starts_with("view1_"))
        .collect();
    assert!(leftovers.is_empty(), "{:?}", leftovers);
}
