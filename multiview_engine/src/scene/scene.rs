/// Scene - static geometry, its stable draw commands, and the per-view
/// copies of those commands the culling stage rewrites.
///
/// Draw order is fixed when the scene is built: opaque meshes first,
/// then transparent ones, each group in input order. Culling only ever
/// zeroes `instance_count`, it never reorders.
///
/// Per-view command copies live in an arena indexed by `ViewId`. When a
/// view leaves the grid its copies move to a retired list and are freed
/// one frame slot at a time, like the view's own resources.

use bytemuck::{Pod, Zeroable};
use crate::error::{Error, Result};
use crate::frame::{FrameContext, FrameMask};
use crate::gpu_data::{BoundingSphere, DrawIndexedIndirectCommand, MeshGpuData};
use crate::graphics_device::{
    read_back, sets, upload, BindingGroup, BindingResource, Buffer, BufferDesc, BufferUsage,
    GraphicsDevice, StagePipelines,
};
use crate::grid::ViewGrid;
use crate::view::ViewId;
use crate::{engine_debug, engine_trace};

const SOURCE: &str = "mview::Scene";

/// Interleaved vertex as consumed by the render pipeline
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub color: [f32; 3],
    pub normal: [f32; 3],
    pub tangent: [f32; 3],
    pub bitangent: [f32; 3],
    pub uv: [f32; 2],
}

/// One mesh: a range of the shared index buffer plus its flat material
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshDesc {
    pub first_index: u32,
    pub index_count: u32,
    pub vertex_offset: i32,
    /// World-space bounds used by the culling stage
    pub bounding_sphere: BoundingSphere,
    pub diffuse_color: [f32; 4],
    pub opacity: f32,
    pub transparent: bool,
    /// Bindless texture ids, -1 when absent
    pub color_texture: i32,
    pub bump_texture: i32,
}

impl MeshDesc {
    /// Opaque untextured mesh
    pub fn new(first_index: u32, index_count: u32, bounding_sphere: BoundingSphere) -> Self {
        Self {
            first_index,
            index_count,
            vertex_offset: 0,
            bounding_sphere,
            diffuse_color: [1.0, 1.0, 1.0, 1.0],
            opacity: 1.0,
            transparent: false,
            color_texture: -1,
            bump_texture: -1,
        }
    }
}

/// Static scene handed over by the asset importer
#[derive(Debug, Clone, Default)]
pub struct SceneDesc {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    pub meshes: Vec<MeshDesc>,
}

struct ViewCommandFrame {
    commands: Box<dyn Buffer>,
    cull_group: Box<dyn BindingGroup>,
}

/// Per-view, per-frame copies of the draw commands
struct ViewCommands {
    id: ViewId,
    frames: Vec<Option<ViewCommandFrame>>,
    released: FrameMask,
}

impl ViewCommands {
    fn release(&mut self, device: &dyn GraphicsDevice, index: usize) -> Result<()> {
        if let Some(frame) = self.frames.get_mut(index).and_then(Option::take) {
            device.destroy_binding_group(frame.cull_group)?;
            device.destroy_buffer(frame.commands)?;
        }
        self.released = self.released.with(index);
        Ok(())
    }

    fn is_released(&self) -> bool {
        self.released.is_complete(self.frames.len())
    }
}

pub struct Scene {
    vertex_buffer: Box<dyn Buffer>,
    index_buffer: Box<dyn Buffer>,
    /// `MeshGpuData` in draw order
    mesh_buffer: Box<dyn Buffer>,
    /// `BoundingSphere` in draw order
    sphere_buffer: Box<dyn Buffer>,
    render_group: Box<dyn BindingGroup>,
    cull_group: Box<dyn BindingGroup>,
    commands: Vec<DrawIndexedIndirectCommand>,
    spheres: Vec<BoundingSphere>,
    opaque_count: u32,
    view_commands: Vec<Option<ViewCommands>>,
    retired_commands: Vec<ViewCommands>,
    frames_in_flight: usize,
}

impl Scene {
    /// Upload the geometry and fix the draw order
    pub fn new(
        device: &dyn GraphicsDevice,
        pipelines: &StagePipelines,
        desc: &SceneDesc,
        frames_in_flight: usize,
    ) -> Result<Self> {
        validate(desc)?;

        let (opaque, transparent): (Vec<&MeshDesc>, Vec<&MeshDesc>) =
            desc.meshes.iter().partition(|mesh| !mesh.transparent);
        let opaque_count = opaque.len() as u32;
        let ordered: Vec<&MeshDesc> = opaque.into_iter().chain(transparent).collect();

        let commands: Vec<DrawIndexedIndirectCommand> = ordered
            .iter()
            .enumerate()
            .map(|(draw_index, mesh)| DrawIndexedIndirectCommand {
                index_count: mesh.index_count,
                instance_count: 1,
                first_index: mesh.first_index,
                vertex_offset: mesh.vertex_offset,
                first_instance: draw_index as u32,
            })
            .collect();
        let spheres: Vec<BoundingSphere> = ordered.iter().map(|mesh| mesh.bounding_sphere).collect();
        let materials: Vec<MeshGpuData> = ordered
            .iter()
            .map(|mesh| MeshGpuData {
                diffuse_color: mesh.diffuse_color,
                params: [mesh.opacity, mesh.color_texture as f32, mesh.bump_texture as f32, 0.0],
            })
            .collect();

        let vertex_buffer = create_filled(device, "scene_vertices", BufferUsage::Vertex, &desc.vertices)?;
        let index_buffer = create_filled(device, "scene_indices", BufferUsage::Index, &desc.indices)?;
        let mesh_buffer = create_filled(device, "scene_meshes", BufferUsage::Storage, &materials)?;
        let sphere_buffer = create_filled(device, "scene_spheres", BufferUsage::Storage, &spheres)?;

        let render_group = device.create_binding_group(
            pipelines.render,
            sets::RENDER_SCENE,
            &[BindingResource::StorageBuffer(mesh_buffer.as_ref())],
        )?;
        let cull_group = device.create_binding_group(
            pipelines.cull,
            sets::CULL_SCENE,
            &[BindingResource::StorageBuffer(sphere_buffer.as_ref())],
        )?;

        engine_debug!(
            SOURCE,
            "Scene built: {} meshes ({} opaque), {} vertices, {} indices",
            commands.len(),
            opaque_count,
            desc.vertices.len(),
            desc.indices.len()
        );

        Ok(Self {
            vertex_buffer,
            index_buffer,
            mesh_buffer,
            sphere_buffer,
            render_group,
            cull_group,
            commands,
            spheres,
            opaque_count,
            view_commands: Vec::new(),
            retired_commands: Vec::new(),
            frames_in_flight,
        })
    }

    /// Match the per-view command copies to the grid's active views.
    ///
    /// Call once per frame after `frame`'s fence wait. Copies of views
    /// that left the active set retire, and `frame`'s slot of every
    /// retired copy is released. Active views without copies get fresh
    /// ones, with every mesh visible.
    pub fn sync_views(
        &mut self,
        device: &dyn GraphicsDevice,
        pipelines: &StagePipelines,
        grid: &ViewGrid,
        frame: &FrameContext,
    ) -> Result<()> {
        let capacity = grid.view_id_capacity().max(self.view_commands.len());
        let mut active = vec![false; capacity];
        for view in grid.active_views() {
            active[view.id().index()] = true;
        }

        for (index, slot) in self.view_commands.iter_mut().enumerate() {
            if slot.is_some() && !active[index] {
                if let Some(entry) = slot.take() {
                    engine_debug!(SOURCE, "Draw commands of view {} retired", entry.id.0);
                    self.retired_commands.push(entry);
                }
            }
        }

        for entry in &mut self.retired_commands {
            entry.release(device, frame.index)?;
        }
        self.retired_commands.retain(|entry| !entry.is_released());

        if self.view_commands.len() < capacity {
            self.view_commands.resize_with(capacity, || None);
        }
        for view in grid.active_views() {
            let id = view.id();
            if self.view_commands[id.index()].is_none() {
                let entry = self.create_view_commands(device, pipelines, id)?;
                self.view_commands[id.index()] = Some(entry);
                engine_trace!(SOURCE, "Draw commands of view {} created", id.0);
            }
        }
        Ok(())
    }

    fn create_view_commands(
        &self,
        device: &dyn GraphicsDevice,
        pipelines: &StagePipelines,
        id: ViewId,
    ) -> Result<ViewCommands> {
        let mut frames = Vec::with_capacity(self.frames_in_flight);
        for frame in 0..self.frames_in_flight {
            let name = format!("view{}_frame{}_commands", id.0, frame);
            let commands = create_filled(device, name, BufferUsage::Indirect, &self.commands)?;
            let cull_group = device.create_binding_group(
                pipelines.cull,
                sets::CULL_COMMANDS,
                &[BindingResource::StorageBuffer(commands.as_ref())],
            )?;
            frames.push(Some(ViewCommandFrame { commands, cull_group }));
        }
        Ok(ViewCommands { id, frames, released: FrameMask::EMPTY })
    }

    fn view_frame(&self, id: ViewId, frame_index: usize) -> Result<&ViewCommandFrame> {
        self.view_commands
            .get(id.index())
            .and_then(Option::as_ref)
            .and_then(|entry| entry.frames.get(frame_index))
            .and_then(Option::as_ref)
            .ok_or_else(|| {
                Error::InvalidResource(format!("no draw commands for view {} frame {}", id.0, frame_index))
            })
    }

    /// Indirect buffer the view draws from in this frame slot
    pub fn view_commands(&self, id: ViewId, frame_index: usize) -> Result<&dyn Buffer> {
        Ok(self.view_frame(id, frame_index)?.commands.as_ref())
    }

    /// Binding group of the view's command copy for the cull pipeline
    pub fn view_commands_group(&self, id: ViewId, frame_index: usize) -> Result<&dyn BindingGroup> {
        Ok(self.view_frame(id, frame_index)?.cull_group.as_ref())
    }

    /// Number of meshes the view draws in this frame slot.
    ///
    /// Reads the culled copy back from host-visible memory, so it reflects
    /// the last completed cull of that slot.
    pub fn visible_mesh_count(&self, id: ViewId, frame_index: usize) -> Result<u32> {
        let buffer = self.view_commands(id, frame_index)?;
        let commands: Vec<DrawIndexedIndirectCommand> = read_back(buffer, 0, self.commands.len())?;
        Ok(commands.iter().map(|command| command.instance_count).sum())
    }

    /// Release every GPU resource. The caller waits for the device first.
    pub fn destroy(mut self, device: &dyn GraphicsDevice) -> Result<()> {
        let mut entries: Vec<ViewCommands> = self.view_commands.drain(..).flatten().collect();
        entries.append(&mut self.retired_commands);
        for mut entry in entries {
            for index in 0..entry.frames.len() {
                entry.release(device, index)?;
            }
        }
        device.destroy_binding_group(self.render_group)?;
        device.destroy_binding_group(self.cull_group)?;
        device.destroy_buffer(self.vertex_buffer)?;
        device.destroy_buffer(self.index_buffer)?;
        device.destroy_buffer(self.mesh_buffer)?;
        device.destroy_buffer(self.sphere_buffer)
    }

    // ===== GETTERS =====

    pub fn mesh_count(&self) -> u32 {
        self.commands.len() as u32
    }

    pub fn opaque_count(&self) -> u32 {
        self.opaque_count
    }

    /// Stable draw commands, every mesh visible
    pub fn commands(&self) -> &[DrawIndexedIndirectCommand] {
        &self.commands
    }

    /// Bounding spheres in draw order
    pub fn bounding_spheres(&self) -> &[BoundingSphere] {
        &self.spheres
    }

    pub fn vertex_buffer(&self) -> &dyn Buffer {
        self.vertex_buffer.as_ref()
    }

    pub fn index_buffer(&self) -> &dyn Buffer {
        self.index_buffer.as_ref()
    }

    pub fn render_binding_group(&self) -> &dyn BindingGroup {
        self.render_group.as_ref()
    }

    pub fn cull_binding_group(&self) -> &dyn BindingGroup {
        self.cull_group.as_ref()
    }

    pub fn frames_in_flight(&self) -> usize {
        self.frames_in_flight
    }

    /// Ids whose command copies are still waiting for idle frame slots
    pub fn retired_view_ids(&self) -> Vec<ViewId> {
        self.retired_commands.iter().map(|entry| entry.id).collect()
    }
}

fn validate(desc: &SceneDesc) -> Result<()> {
    if desc.meshes.is_empty() || desc.indices.is_empty() || desc.vertices.is_empty() {
        return Err(Error::InvalidConfig("scene needs vertices, indices and at least one mesh".to_string()));
    }
    let index_total = desc.indices.len() as u64;
    for (i, mesh) in desc.meshes.iter().enumerate() {
        if mesh.first_index as u64 + mesh.index_count as u64 > index_total {
            return Err(Error::InvalidConfig(format!(
                "mesh {} reads indices {}..{} of {}",
                i,
                mesh.first_index,
                mesh.first_index as u64 + mesh.index_count as u64,
                index_total
            )));
        }
        if mesh.bounding_sphere.radius() < 0.0 {
            return Err(Error::InvalidConfig(format!("mesh {} has a negative bounding radius", i)));
        }
    }
    Ok(())
}

fn create_filled<T: Pod>(
    device: &dyn GraphicsDevice,
    name: impl Into<String>,
    usage: BufferUsage,
    data: &[T],
) -> Result<Box<dyn Buffer>> {
    let size = std::mem::size_of_val(data) as u64;
    let buffer = device.create_buffer(BufferDesc::new(name, size, usage))?;
    upload(buffer.as_ref(), 0, data)?;
    Ok(buffer)
}

#[cfg(test)]
#[path = "scene_tests.rs"]
mod tests;
