//! GPU memory resources and descriptor management

pub mod buffer;
pub mod descriptor_set;
pub mod image;

pub use buffer::{pad_uniform_buffer_size, Buffer};
pub use descriptor_set::{
    validate_writes, DescriptorPool, DescriptorSetLayout, DescriptorSetLayoutBuilder, DescriptorSetWriter,
    DescriptorWriteDesc, SceneDescriptorLayouts, MAX_TEXTURES,
};
pub use image::{mip_chain, mip_level_count, transition_masks, Image, ImageDesc, TransitionMasks};
