use std::mem::size_of;
use glam::{Mat4, Vec3, Vec4};
use super::*;

// ============================================================================
// Layout sizes (must match the GLSL declarations)
// ============================================================================

#[test]
fn test_draw_command_is_twenty_bytes() {
    assert_eq!(size_of::<DrawIndexedIndirectCommand>(), 20);
    assert_eq!(DrawIndexedIndirectCommand::STRIDE, 20);
}

#[test]
fn test_uniform_sizes_are_multiples_of_sixteen() {
    assert_eq!(size_of::<BoundingSphere>(), 16);
    assert_eq!(size_of::<ViewVertexData>(), 128);
    assert_eq!(size_of::<ViewFragmentData>(), 16);
    assert_eq!(size_of::<ViewCullData>(), 112);
    assert_eq!(size_of::<MeshGpuData>(), 32);
    assert_eq!(size_of::<RayEvalUniform>() % 16, 0);
    assert_eq!(size_of::<ViewEvalRecord>() % 16, 0);
    assert_eq!(size_of::<ViewEvalDebug>() % 16, 0);
}

#[test]
fn test_view_eval_record_field_offsets() {
    // 6 planes, then 4 matrices, then res_offset
    assert_eq!(std::mem::offset_of!(ViewEvalRecord, view), 96);
    assert_eq!(std::mem::offset_of!(ViewEvalRecord, res_offset), 96 + 4 * 64);
    assert_eq!(std::mem::offset_of!(ViewEvalRecord, view_dir), 96 + 4 * 64 + 32);
}

// ============================================================================
// Helpers
// ============================================================================

#[test]
fn test_bounding_sphere_accessors() {
    let sphere = BoundingSphere::new(Vec3::new(1.0, 2.0, 3.0), 0.5);
    assert_eq!(sphere.center(), Vec3::new(1.0, 2.0, 3.0));
    assert_eq!(sphere.radius(), 0.5);
}

#[test]
fn test_mat4_cols_is_column_major() {
    let m = Mat4::from_translation(Vec3::new(4.0, 5.0, 6.0));
    let cols = mat4_cols(&m);
    assert_eq!(cols[3], [4.0, 5.0, 6.0, 1.0]);
}

#[test]
fn test_planes_array_preserves_order() {
    let planes = [
        Vec4::X, Vec4::Y, Vec4::Z, Vec4::W, Vec4::NEG_X, Vec4::NEG_Y,
    ];
    let arr = planes_array(&planes);
    assert_eq!(arr[0], [1.0, 0.0, 0.0, 0.0]);
    assert_eq!(arr[5], [0.0, -1.0, 0.0, 0.0]);
}

#[test]
fn test_draw_command_cast_to_bytes() {
    let cmd = DrawIndexedIndirectCommand {
        index_count: 36,
        instance_count: 1,
        first_index: 6,
        vertex_offset: -2,
        first_instance: 3,
    };
    let bytes = bytemuck::bytes_of(&cmd);
    assert_eq!(&bytes[4..8], &1u32.to_ne_bytes());
    assert_eq!(&bytes[12..16], &(-2i32).to_ne_bytes());
}
