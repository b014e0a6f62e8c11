//! Vertex input layout of the scene pipeline
//!
//! Binding 0 carries [`Vertex`] per vertex, binding 1 carries
//! [`InstanceData`] per instance. The model matrix occupies four consecutive
//! `vec4` locations.

use std::mem::{offset_of, size_of};

use ash::vk;

use crate::render::vertex::{InstanceData, Vertex};

/// Binding index of the per-vertex stream
pub const VERTEX_BINDING: u32 = 0;
/// Binding index of the per-instance stream
pub const INSTANCE_BINDING: u32 = 1;

/// Vulkan vertex input description for the scene's vertex and instance streams
pub struct SceneVertexLayout;

impl SceneVertexLayout {
    /// Vertex and instance bindings
    pub fn bindings() -> [vk::VertexInputBindingDescription; 2] {
        [
            vk::VertexInputBindingDescription {
                binding: VERTEX_BINDING,
                stride: size_of::<Vertex>() as u32,
                input_rate: vk::VertexInputRate::VERTEX,
            },
            vk::VertexInputBindingDescription {
                binding: INSTANCE_BINDING,
                stride: size_of::<InstanceData>() as u32,
                input_rate: vk::VertexInputRate::INSTANCE,
            },
        ]
    }

    /// Attribute locations 0..=7
    pub fn attributes() -> [vk::VertexInputAttributeDescription; 8] {
        let vertex = |location, format, offset: usize| vk::VertexInputAttributeDescription {
            binding: VERTEX_BINDING,
            location,
            format,
            offset: offset as u32,
        };
        let instance = |location, format, offset: usize| vk::VertexInputAttributeDescription {
            binding: INSTANCE_BINDING,
            location,
            format,
            offset: offset as u32,
        };
        let model = offset_of!(InstanceData, model);
        let column = size_of::<[f32; 4]>();

        [
            vertex(0, vk::Format::R32G32B32_SFLOAT, offset_of!(Vertex, position)),
            vertex(1, vk::Format::R32G32B32_SFLOAT, offset_of!(Vertex, normal)),
            vertex(2, vk::Format::R32G32_SFLOAT, offset_of!(Vertex, tex_coord)),
            instance(3, vk::Format::R32G32B32A32_SFLOAT, model),
            instance(4, vk::Format::R32G32B32A32_SFLOAT, model + column),
            instance(5, vk::Format::R32G32B32A32_SFLOAT, model + 2 * column),
            instance(6, vk::Format::R32G32B32A32_SFLOAT, model + 3 * column),
            instance(7, vk::Format::R32_UINT, offset_of!(InstanceData, texture_index)),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offsets_match_struct_layout() {
        let attributes = SceneVertexLayout::attributes();
        let offsets: Vec<u32> = attributes.iter().map(|a| a.offset).collect();
        assert_eq!(offsets, vec![0, 12, 24, 0, 16, 32, 48, 64]);
    }

    #[test]
    fn test_locations_are_unique_and_dense() {
        let attributes = SceneVertexLayout::attributes();
        for (expected, attribute) in attributes.iter().enumerate() {
            assert_eq!(attribute.location, expected as u32);
        }
    }

    #[test]
    fn test_instance_stream_advances_per_instance() {
        let [vertex, instance] = SceneVertexLayout::bindings();
        assert_eq!(vertex.input_rate, vk::VertexInputRate::VERTEX);
        assert_eq!(instance.input_rate, vk::VertexInputRate::INSTANCE);
        assert_eq!(instance.stride, 80);
    }
}
