//! Scene lighting

use crate::foundation::math::Vec3;

/// Directional light (like sunlight)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalLight {
    /// Direction the light travels, normalized
    pub direction: Vec3,
    /// Light color
    pub color: Vec3,
    /// Light intensity
    pub intensity: f32,
    /// Ambient term applied to every surface
    pub ambient: Vec3,
}

impl DirectionalLight {
    /// Create a directional light
    ///
    /// A zero direction falls back to straight down.
    pub fn new(direction: Vec3, color: Vec3, intensity: f32) -> Self {
        let direction = direction.try_normalize(f32::EPSILON).unwrap_or_else(|| -Vec3::y());
        Self {
            direction,
            color,
            intensity,
            ambient: Vec3::new(0.1, 0.1, 0.1),
        }
    }

    /// Set the ambient term
    #[must_use]
    pub fn with_ambient(mut self, ambient: Vec3) -> Self {
        self.ambient = ambient;
        self
    }
}

impl Default for DirectionalLight {
    fn default() -> Self {
        Self::new(Vec3::new(-0.4, -1.0, -0.3), Vec3::new(1.0, 0.98, 0.92), 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_direction_is_normalized() {
        let light = DirectionalLight::new(Vec3::new(0.0, -4.0, 0.0), Vec3::repeat(1.0), 2.0);
        assert_relative_eq!(light.direction.norm(), 1.0);
    }

    #[test]
    fn test_zero_direction_points_down() {
        let light = DirectionalLight::new(Vec3::zeros(), Vec3::repeat(1.0), 1.0);
        assert_relative_eq!(light.direction, -Vec3::y());
    }
}
