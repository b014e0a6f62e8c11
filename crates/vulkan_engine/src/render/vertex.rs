//! GPU-visible data layouts
//!
//! Every type here is `#[repr(C)]` and `Pod` so it can be cast straight into a
//! mapped buffer or a push constant range.

use bytemuck::{Pod, Zeroable};

use crate::foundation::math::{to_cols_array, Mat4};

/// Per-vertex attributes (binding 0)
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    /// Position in model space
    pub position: [f32; 3],
    /// Surface normal
    pub normal: [f32; 3],
    /// Texture coordinates
    pub tex_coord: [f32; 2],
}

impl Vertex {
    /// Create a new vertex
    pub const fn new(position: [f32; 3], normal: [f32; 3], tex_coord: [f32; 2]) -> Self {
        Self {
            position,
            normal,
            tex_coord,
        }
    }
}

/// Per-instance attributes (binding 1)
///
/// One entry per placed model. The instance stream is laid out so that the
/// instances of mesh `n` start at that mesh's indirect command
/// `first_instance`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct InstanceData {
    /// Model-to-world transform, column major
    pub model: [[f32; 4]; 4],
    /// Slot in the material texture array
    pub texture_index: u32,
    _padding: [u32; 3],
}

impl InstanceData {
    /// Build instance data from a transform and texture slot
    pub fn new(transform: &Mat4, texture_index: u32) -> Self {
        Self {
            model: to_cols_array(transform),
            texture_index,
            _padding: [0; 3],
        }
    }
}

impl Default for InstanceData {
    fn default() -> Self {
        Self::new(&Mat4::identity(), 0)
    }
}

/// Global per-frame uniforms (set 0, binding 0)
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GlobalUniforms {
    /// World-to-view transform
    pub view: [[f32; 4]; 4],
    /// View-to-clip transform
    pub projection: [[f32; 4]; 4],
    /// Camera position in world space, `w` unused
    pub camera_position: [f32; 4],
    /// Direction the light travels, `w` unused
    pub light_direction: [f32; 4],
    /// Light color in `rgb`, intensity in `w`
    pub light_color: [f32; 4],
    /// Ambient term in `rgb`, `w` unused
    pub ambient_color: [f32; 4],
}

impl Default for GlobalUniforms {
    fn default() -> Self {
        let identity = to_cols_array(&Mat4::identity());
        Self {
            view: identity,
            projection: identity,
            camera_position: [0.0; 4],
            light_direction: [0.0, -1.0, 0.0, 0.0],
            light_color: [1.0, 1.0, 1.0, 1.0],
            ambient_color: [0.1, 0.1, 0.1, 0.0],
        }
    }
}

/// Per-draw push constants
///
/// Instance transforms and texture slots travel in the instance stream, so
/// the only per-draw value is an optional material slot that replaces every
/// instance's own texture.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct ObjectPushConstants {
    /// Material slot sampled by every instance, or [`Self::NO_MATERIAL_OVERRIDE`]
    pub material_index: u32,
}

impl ObjectPushConstants {
    /// Sentinel telling the shader to use each instance's texture slot
    pub const NO_MATERIAL_OVERRIDE: u32 = u32::MAX;

    /// Push constants for an optional material override
    pub const fn with_override(material: Option<u32>) -> Self {
        match material {
            Some(material_index) => Self { material_index },
            None => Self {
                material_index: Self::NO_MATERIAL_OVERRIDE,
            },
        }
    }
}

impl Default for ObjectPushConstants {
    fn default() -> Self {
        Self::with_override(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_sizes() {
        assert_eq!(std::mem::size_of::<Vertex>(), 32);
        assert_eq!(std::mem::size_of::<InstanceData>(), 80);
        assert_eq!(std::mem::size_of::<GlobalUniforms>(), 192);
        assert_eq!(std::mem::size_of::<ObjectPushConstants>(), 4);
    }

    #[test]
    fn test_instance_data_is_column_major() {
        let transform = Mat4::new_translation(&crate::foundation::math::Vec3::new(1.0, 2.0, 3.0));
        let instance = InstanceData::new(&transform, 4);

        assert_eq!(instance.model[3][0..3], [1.0, 2.0, 3.0]);
        assert_eq!(instance.texture_index, 4);
        assert_eq!(bytemuck::bytes_of(&instance).len(), 80);
    }

    #[test]
    fn test_push_constants_default_to_instance_textures() {
        assert_eq!(
            ObjectPushConstants::default().material_index,
            ObjectPushConstants::NO_MATERIAL_OVERRIDE
        );
        assert_eq!(ObjectPushConstants::with_override(Some(3)).material_index, 3);
        assert_eq!(bytemuck::bytes_of(&ObjectPushConstants::with_override(Some(1))), &[1, 0, 0, 0]);
    }
}
