//! Math utilities and types
//!
//! Thin aliases over `nalgebra` plus the handful of matrix builders the
//! renderer needs. Everything here is a pure function.

pub use nalgebra::{Matrix4, Point3, Rotation3, Unit, Vector2, Vector3, Vector4};

/// 2D vector type
pub type Vec2 = Vector2<f32>;

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// Right-handed perspective projection for Vulkan clip space
///
/// Depth maps to `0..1` and the Y axis is flipped so that +Y is up on screen.
#[rustfmt::skip]
pub fn perspective_vk(fov_y_radians: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
    let f = 1.0 / (fov_y_radians * 0.5).tan();
    let range = near - far;
    Mat4::new(
        f / aspect, 0.0, 0.0, 0.0,
        0.0, -f, 0.0, 0.0,
        0.0, 0.0, far / range, (near * far) / range,
        0.0, 0.0, -1.0, 0.0,
    )
}

/// Right-handed view matrix looking from `eye` towards `target`
pub fn look_at(eye: &Vec3, target: &Vec3, up: &Vec3) -> Mat4 {
    Mat4::look_at_rh(&Point3::from(*eye), &Point3::from(*target), up)
}

/// Compose translation * rotation (XYZ euler, radians) * scale
pub fn compose_transform(translation: Vec3, rotation: Vec3, scale: Vec3) -> Mat4 {
    let rotation = Rotation3::from_euler_angles(rotation.x, rotation.y, rotation.z);
    Mat4::new_translation(&translation) * rotation.to_homogeneous() * Mat4::new_nonuniform_scaling(&scale)
}

/// Convert a matrix into the column-major array layout shaders expect
pub fn to_cols_array(matrix: &Mat4) -> [[f32; 4]; 4] {
    (*matrix).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_perspective_maps_near_and_far_planes() {
        let proj = perspective_vk(std::f32::consts::FRAC_PI_2, 1.0, 0.1, 100.0);

        let near = proj * Vec4::new(0.0, 0.0, -0.1, 1.0);
        let far = proj * Vec4::new(0.0, 0.0, -100.0, 1.0);

        assert_relative_eq!(near.z / near.w, 0.0, epsilon = 1e-5);
        assert_relative_eq!(far.z / far.w, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_perspective_flips_y() {
        let proj = perspective_vk(std::f32::consts::FRAC_PI_2, 1.0, 0.1, 100.0);
        let up = proj * Vec4::new(0.0, 1.0, -1.0, 1.0);
        assert!(up.y / up.w < 0.0);
    }

    #[test]
    fn test_compose_transform_applies_scale_then_translation() {
        let m = compose_transform(Vec3::new(1.0, 2.0, 3.0), Vec3::zeros(), Vec3::new(2.0, 2.0, 2.0));
        let p = m * Vec4::new(1.0, 1.0, 1.0, 1.0);
        assert_relative_eq!(p.x, 3.0);
        assert_relative_eq!(p.y, 4.0);
        assert_relative_eq!(p.z, 5.0);
    }

    #[test]
    fn test_look_at_moves_eye_to_origin() {
        let eye = Vec3::new(0.0, 0.0, 5.0);
        let view = look_at(&eye, &Vec3::zeros(), &Vec3::y());
        let p = view * Vec4::new(eye.x, eye.y, eye.z, 1.0);
        assert_relative_eq!(p.xyz().norm(), 0.0, epsilon = 1e-5);
    }
}
