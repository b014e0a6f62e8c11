//! # Camera
//!
//! A yaw/pitch perspective camera and the fly controller that drives it from
//! the window's input snapshot. Matrix math is delegated to
//! [`crate::foundation::math`].

use glfw::Key;

use crate::foundation::math::{look_at, perspective_vk, Mat4, Vec3};
use crate::platform::InputSnapshot;

const MAX_PITCH: f32 = 89.0_f32 * std::f32::consts::PI / 180.0;

/// Perspective camera oriented by yaw and pitch
///
/// Uses a right-handed Y-up world. Yaw is measured from +X towards +Z, so a
/// yaw of -90 degrees looks down -Z.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    /// Camera position in world space
    pub position: Vec3,
    /// Rotation around +Y in radians
    pub yaw: f32,
    /// Rotation above the horizon in radians
    pub pitch: f32,
    /// Vertical field of view in radians
    pub fov_y: f32,
    /// Viewport width / height
    pub aspect: f32,
    /// Near clipping plane distance
    pub near: f32,
    /// Far clipping plane distance
    pub far: f32,
}

impl Camera {
    /// Create a perspective camera looking down -Z
    pub fn perspective(position: Vec3, fov_y_degrees: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self {
            position,
            yaw: -std::f32::consts::FRAC_PI_2,
            pitch: 0.0,
            fov_y: fov_y_degrees.to_radians(),
            aspect,
            near,
            far,
        }
    }

    /// Point the camera at `target`
    pub fn look_at(&mut self, target: Vec3) {
        let Some(dir) = (target - self.position).try_normalize(f32::EPSILON) else {
            return;
        };
        self.yaw = dir.z.atan2(dir.x);
        self.pitch = dir.y.asin().clamp(-MAX_PITCH, MAX_PITCH);
    }

    /// Update the aspect ratio from a framebuffer size
    ///
    /// Zero-sized framebuffers are ignored so a minimised window does not
    /// poison the projection.
    pub fn set_viewport_size(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.aspect = width as f32 / height as f32;
        }
    }

    /// Unit vector the camera looks along
    pub fn forward(&self) -> Vec3 {
        Vec3::new(
            self.yaw.cos() * self.pitch.cos(),
            self.pitch.sin(),
            self.yaw.sin() * self.pitch.cos(),
        )
    }

    /// Unit vector to the camera's right
    pub fn right(&self) -> Vec3 {
        self.forward().cross(&Vec3::y()).normalize()
    }

    /// World-to-view matrix
    pub fn view_matrix(&self) -> Mat4 {
        look_at(&self.position, &(self.position + self.forward()), &Vec3::y())
    }

    /// View-to-clip matrix in Vulkan conventions
    pub fn projection_matrix(&self) -> Mat4 {
        perspective_vk(self.fov_y, self.aspect, self.near, self.far)
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::perspective(Vec3::new(0.0, 1.5, 6.0), 60.0, 16.0 / 9.0, 0.1, 100.0)
    }
}

/// Free-flying camera controller
///
/// WASD moves in the view plane, Q/E move down/up, arrow keys rotate.
#[derive(Debug, Clone)]
pub struct FlyCameraController {
    /// Units per second
    pub move_speed: f32,
    /// Radians per second
    pub turn_speed: f32,
}

impl Default for FlyCameraController {
    fn default() -> Self {
        Self {
            move_speed: 4.0,
            turn_speed: 1.5,
        }
    }
}

impl FlyCameraController {
    /// Create a controller with the given speeds
    pub const fn new(move_speed: f32, turn_speed: f32) -> Self {
        Self { move_speed, turn_speed }
    }

    /// Apply one frame of input to `camera`
    ///
    /// Returns whether the camera changed.
    pub fn update(&self, camera: &mut Camera, input: &InputSnapshot, delta_time: f32) -> bool {
        let axis = |positive: Key, negative: Key| -> f32 {
            f32::from(u8::from(input.is_key_pressed(positive))) - f32::from(u8::from(input.is_key_pressed(negative)))
        };

        let yaw = axis(Key::Right, Key::Left);
        let pitch = axis(Key::Up, Key::Down);
        camera.yaw += yaw * self.turn_speed * delta_time;
        camera.pitch = (camera.pitch + pitch * self.turn_speed * delta_time).clamp(-MAX_PITCH, MAX_PITCH);

        let forward = camera.forward();
        let right = camera.right();
        let movement = forward * axis(Key::W, Key::S) + right * axis(Key::D, Key::A) + Vec3::y() * axis(Key::E, Key::Q);

        if let Some(direction) = movement.try_normalize(f32::EPSILON) {
            camera.position += direction * self.move_speed * delta_time;
            return true;
        }
        yaw != 0.0 || pitch != 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec4;
    use approx::assert_relative_eq;

    fn snapshot_with(keys: &[Key]) -> InputSnapshot {
        InputSnapshot {
            pressed_keys: keys.iter().copied().collect(),
            ..InputSnapshot::default()
        }
    }

    #[test]
    fn test_default_orientation_looks_down_negative_z() {
        let camera = Camera::perspective(Vec3::zeros(), 60.0, 1.0, 0.1, 10.0);
        assert_relative_eq!(camera.forward(), Vec3::new(0.0, 0.0, -1.0), epsilon = 1e-6);
        assert_relative_eq!(camera.right(), Vec3::new(1.0, 0.0, 0.0), epsilon = 1e-6);
    }

    #[test]
    fn test_look_at_centers_target() {
        let mut camera = Camera::perspective(Vec3::new(3.0, 2.0, 5.0), 60.0, 1.0, 0.1, 100.0);
        camera.look_at(Vec3::zeros());

        let view = camera.view_matrix() * Vec4::new(0.0, 0.0, 0.0, 1.0);
        assert_relative_eq!(view.x, 0.0, epsilon = 1e-4);
        assert_relative_eq!(view.y, 0.0, epsilon = 1e-4);
        assert!(view.z < 0.0);
    }

    #[test]
    fn test_zero_viewport_keeps_aspect() {
        let mut camera = Camera::default();
        let before = camera.aspect;
        camera.set_viewport_size(0, 720);
        assert_relative_eq!(camera.aspect, before);

        camera.set_viewport_size(800, 400);
        assert_relative_eq!(camera.aspect, 2.0);
    }

    #[test]
    fn test_controller_moves_forward() {
        let mut camera = Camera::perspective(Vec3::zeros(), 60.0, 1.0, 0.1, 10.0);
        let controller = FlyCameraController::new(2.0, 1.0);

        let moved = controller.update(&mut camera, &snapshot_with(&[Key::W]), 0.5);

        assert!(moved);
        assert_relative_eq!(camera.position, Vec3::new(0.0, 0.0, -1.0), epsilon = 1e-5);
    }

    #[test]
    fn test_controller_idle_without_input() {
        let mut camera = Camera::default();
        let before = camera.clone();
        assert!(!FlyCameraController::default().update(&mut camera, &InputSnapshot::default(), 0.016));
        assert_eq!(camera, before);
    }

    #[test]
    fn test_pitch_is_clamped() {
        let mut camera = Camera::default();
        let controller = FlyCameraController::new(1.0, 10.0);
        controller.update(&mut camera, &snapshot_with(&[Key::Up]), 5.0);
        assert!(camera.pitch <= MAX_PITCH);
    }
}
