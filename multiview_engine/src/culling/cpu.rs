/// CPU references for the culling stage.
///
/// `cpu_cull` is the engine-side visibility test built on `Frustum`.
/// `cull_kernel` replays the compute shader's test over the exact
/// `ViewCullData` bytes the shader reads, so the two can be checked
/// against each other without a GPU.

use crate::camera::Frustum;
use crate::gpu_data::{BoundingSphere, DrawIndexedIndirectCommand, ViewCullData};

/// Rewrite `instance_count` of each command from its sphere's visibility.
///
/// `spheres[i]` bounds `commands[i]`. With `frustum_cull` off every
/// command is drawn.
pub fn cpu_cull(
    frustum: &Frustum,
    frustum_cull: bool,
    spheres: &[BoundingSphere],
    commands: &mut [DrawIndexedIndirectCommand],
) {
    debug_assert_eq!(spheres.len(), commands.len());
    for (sphere, command) in spheres.iter().zip(commands.iter_mut()) {
        let visible = !frustum_cull || frustum.intersects_sphere(sphere.center(), sphere.radius());
        command.instance_count = visible as u32;
    }
}

/// One shader invocation: whether the sphere survives all six planes
pub fn cull_kernel(data: &ViewCullData, sphere: &BoundingSphere) -> bool {
    if data.frustum_cull == 0 {
        return true;
    }
    let [x, y, z, radius] = sphere.center_radius;
    !data.frustum_planes.iter().any(|&[a, b, c, d]| a * x + b * y + c * z + d <= -radius)
}

/// Run the kernel over a whole dispatch, honoring `total_meshes`
pub fn cull_kernel_dispatch(
    data: &ViewCullData,
    spheres: &[BoundingSphere],
    commands: &mut [DrawIndexedIndirectCommand],
) {
    let total = (data.total_meshes as usize).min(spheres.len()).min(commands.len());
    for index in 0..total {
        commands[index].instance_count = cull_kernel(data, &spheres[index]) as u32;
    }
}

#[cfg(test)]
#[path = "cpu_tests.rs"]
mod tests;
