//! Matrix helpers.
//!
//! Everything here is column-major with column vectors (`M * v`), which is
//! what `glam` and WGSL both use. The functions are thin, named wrappers so
//! the renderer reads like the math it does.

use glam::{Mat4, Vec3, Vec4};

/// Remaps OpenGL clip-space depth (`-1..1`) to the `0..1` range wgpu expects.
#[rustfmt::skip]
pub const OPENGL_TO_WGPU: Mat4 = Mat4::from_cols_array(&[
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
]);

pub fn identity() -> Mat4 {
    Mat4::IDENTITY
}

/// Rodrigues rotation of `angle` radians about `axis`.
///
/// `axis` must already be normalized.
pub fn rotation(axis: Vec3, angle: f32) -> Mat4 {
    Mat4::from_axis_angle(axis, angle)
}

pub fn translation(t: Vec3) -> Mat4 {
    Mat4::from_translation(t)
}

pub fn uniform_scale(s: f32) -> Mat4 {
    Mat4::from_scale(Vec3::splat(s))
}

/// Right-handed perspective projection with OpenGL depth mapping.
///
/// The near plane lands on NDC `z = -1` and the far plane on `z = 1`:
/// z-scale is `-(far + near) / (far - near)` and the translation term is
/// `-2 * far * near / (far - near)`.
pub fn perspective_projection(aspect: f32, fov_y: f32, near: f32, far: f32) -> Mat4 {
    let y_scale = 1.0 / (fov_y * 0.5).tan();
    let x_scale = y_scale / aspect;
    let z_range = far - near;
    let z_scale = -(far + near) / z_range;
    let wz_scale = -2.0 * far * near / z_range;

    Mat4::from_cols(
        Vec4::new(x_scale, 0.0, 0.0, 0.0),
        Vec4::new(0.0, y_scale, 0.0, 0.0),
        Vec4::new(0.0, 0.0, z_scale, -1.0),
        Vec4::new(0.0, 0.0, wz_scale, 0.0),
    )
}

/// Same projection, with depth remapped to `0..1` for wgpu.
pub fn perspective_projection_zo(aspect: f32, fov_y: f32, near: f32, far: f32) -> Mat4 {
    OPENGL_TO_WGPU * perspective_projection(aspect, fov_y, near, far)
}

/// Right-handed view matrix looking from `eye` towards `target`.
pub fn look_at_rh(eye: Vec3, target: Vec3, up: Vec3) -> Mat4 {
    let z = (eye - target).normalize();
    let x = up.cross(z).normalize();
    let y = z.cross(x);

    Mat4::from_cols(
        Vec4::new(x.x, y.x, z.x, 0.0),
        Vec4::new(x.y, y.y, z.y, 0.0),
        Vec4::new(x.z, y.z, z.z, 0.0),
        Vec4::new(-x.dot(eye), -y.dot(eye), -z.dot(eye), 1.0),
    )
}
