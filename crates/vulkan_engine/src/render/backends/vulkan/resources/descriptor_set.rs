//! Descriptor set layouts, pools and validated writes
//!
//! Bindings are partitioned by update frequency: set 0 holds the global
//! uniforms (one set per frame slot), set 1 the material texture array.
//! Per-object data travels in push constants.

use std::ops::Range;

use ash::{vk, Device};

use crate::render::backends::vulkan::{VulkanError, VulkanResult};

/// Size of the material texture array in set 1
pub const MAX_TEXTURES: u32 = 32;

/// Descriptor set layout builder for creating reusable layouts
#[derive(Default)]
pub struct DescriptorSetLayoutBuilder {
    bindings: Vec<vk::DescriptorSetLayoutBinding>,
}

impl DescriptorSetLayoutBuilder {
    /// Create a new descriptor set layout builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a uniform buffer binding
    #[must_use]
    pub fn add_uniform_buffer(self, binding: u32, stage_flags: vk::ShaderStageFlags) -> Self {
        self.add(binding, vk::DescriptorType::UNIFORM_BUFFER, 1, stage_flags)
    }

    /// Add an array of combined image samplers
    #[must_use]
    pub fn add_combined_image_samplers(self, binding: u32, count: u32, stage_flags: vk::ShaderStageFlags) -> Self {
        self.add(binding, vk::DescriptorType::COMBINED_IMAGE_SAMPLER, count, stage_flags)
    }

    fn add(mut self, binding: u32, ty: vk::DescriptorType, count: u32, stage_flags: vk::ShaderStageFlags) -> Self {
        self.bindings.push(
            vk::DescriptorSetLayoutBinding::builder()
                .binding(binding)
                .descriptor_type(ty)
                .descriptor_count(count)
                .stage_flags(stage_flags)
                .build(),
        );
        self
    }

    /// Build the descriptor set layout
    pub fn build(self, device: &Device) -> VulkanResult<DescriptorSetLayout> {
        let layout_info = vk::DescriptorSetLayoutCreateInfo::builder().bindings(&self.bindings);

        let layout = unsafe { device.create_descriptor_set_layout(&layout_info, None) }
            .map_err(|e| VulkanError::DescriptorCreation(format!("set layout: {e:?}")))?;

        Ok(DescriptorSetLayout {
            layout,
            device: device.clone(),
            bindings: self.bindings,
        })
    }
}

/// Descriptor set layout wrapper with automatic cleanup
pub struct DescriptorSetLayout {
    layout: vk::DescriptorSetLayout,
    device: Device,
    bindings: Vec<vk::DescriptorSetLayoutBinding>,
}

impl DescriptorSetLayout {
    /// Get the Vulkan descriptor set layout handle
    pub const fn handle(&self) -> vk::DescriptorSetLayout {
        self.layout
    }

    /// Get the bindings used in this layout
    pub fn bindings(&self) -> &[vk::DescriptorSetLayoutBinding] {
        &self.bindings
    }
}

impl Drop for DescriptorSetLayout {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_descriptor_set_layout(self.layout, None);
        }
    }
}

/// Descriptor pool for allocating descriptor sets
pub struct DescriptorPool {
    pool: vk::DescriptorPool,
    device: Device,
}

impl DescriptorPool {
    /// Create a pool with room for `max_sets` sets drawn from `pool_sizes`
    pub fn new(device: Device, max_sets: u32, pool_sizes: &[vk::DescriptorPoolSize]) -> VulkanResult<Self> {
        let pool_info = vk::DescriptorPoolCreateInfo::builder()
            .max_sets(max_sets)
            .pool_sizes(pool_sizes);

        let pool = unsafe { device.create_descriptor_pool(&pool_info, None) }
            .map_err(|e| VulkanError::DescriptorCreation(format!("pool: {e:?}")))?;

        Ok(Self { pool, device })
    }

    /// Allocate one set per entry in `layouts`
    pub fn allocate(&self, layouts: &[vk::DescriptorSetLayout]) -> VulkanResult<Vec<vk::DescriptorSet>> {
        let alloc_info = vk::DescriptorSetAllocateInfo::builder()
            .descriptor_pool(self.pool)
            .set_layouts(layouts);

        unsafe { self.device.allocate_descriptor_sets(&alloc_info) }
            .map_err(|e| VulkanError::DescriptorCreation(format!("set allocation: {e:?}")))
    }
}

impl Drop for DescriptorPool {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_descriptor_pool(self.pool, None);
        }
    }
}

/// Shape of one pending descriptor write, used for validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescriptorWriteDesc {
    /// Target binding
    pub binding: u32,
    /// Descriptor type being written
    pub descriptor_type: vk::DescriptorType,
    /// First array element
    pub first_element: u32,
    /// Number of descriptors written
    pub count: u32,
}

/// Check that every write targets an existing binding of the same type and fits its array
pub fn validate_writes(
    bindings: &[vk::DescriptorSetLayoutBinding],
    writes: &[DescriptorWriteDesc],
) -> VulkanResult<()> {
    for write in writes {
        let binding = bindings
            .iter()
            .find(|b| b.binding == write.binding)
            .ok_or_else(|| VulkanError::DescriptorMismatch(format!("binding {} not in layout", write.binding)))?;

        if binding.descriptor_type != write.descriptor_type {
            return Err(VulkanError::DescriptorMismatch(format!(
                "binding {} is {:?}, write is {:?}",
                write.binding, binding.descriptor_type, write.descriptor_type
            )));
        }

        let end = write.first_element.checked_add(write.count).ok_or_else(|| {
            VulkanError::DescriptorMismatch(format!(
                "binding {} write range {}+{} overflows",
                write.binding, write.first_element, write.count
            ))
        })?;
        if write.count == 0 || end > binding.descriptor_count {
            return Err(VulkanError::DescriptorMismatch(format!(
                "binding {} holds {} descriptor(s), write covers {}..{end}",
                write.binding, binding.descriptor_count, write.first_element
            )));
        }
    }
    Ok(())
}

enum Payload {
    Buffer(usize),
    Images(Range<usize>),
}

struct PendingWrite {
    desc: DescriptorWriteDesc,
    payload: Payload,
}

/// Collects writes for one descriptor set and applies them after validation
pub struct DescriptorSetWriter {
    set: vk::DescriptorSet,
    pending: Vec<PendingWrite>,
    buffer_infos: Vec<vk::DescriptorBufferInfo>,
    image_infos: Vec<vk::DescriptorImageInfo>,
}

impl DescriptorSetWriter {
    /// Start collecting writes for `set`
    pub const fn new(set: vk::DescriptorSet) -> Self {
        Self {
            set,
            pending: Vec::new(),
            buffer_infos: Vec::new(),
            image_infos: Vec::new(),
        }
    }

    /// Write a uniform buffer range
    #[must_use]
    pub fn write_uniform_buffer(
        mut self,
        binding: u32,
        buffer: vk::Buffer,
        offset: vk::DeviceSize,
        range: vk::DeviceSize,
    ) -> Self {
        self.buffer_infos.push(vk::DescriptorBufferInfo { buffer, offset, range });
        self.pending.push(PendingWrite {
            desc: DescriptorWriteDesc {
                binding,
                descriptor_type: vk::DescriptorType::UNIFORM_BUFFER,
                first_element: 0,
                count: 1,
            },
            payload: Payload::Buffer(self.buffer_infos.len() - 1),
        });
        self
    }

    /// Write consecutive combined image samplers starting at element 0
    #[must_use]
    pub fn write_images(mut self, binding: u32, images: &[(vk::ImageView, vk::Sampler)]) -> Self {
        let start = self.image_infos.len();
        self.image_infos
            .extend(images.iter().map(|&(image_view, sampler)| vk::DescriptorImageInfo {
                sampler,
                image_view,
                image_layout: vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
            }));
        self.pending.push(PendingWrite {
            desc: DescriptorWriteDesc {
                binding,
                descriptor_type: vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
                first_element: 0,
                count: images.len() as u32,
            },
            payload: Payload::Images(start..self.image_infos.len()),
        });
        self
    }

    /// Shapes of the collected writes
    pub fn descs(&self) -> Vec<DescriptorWriteDesc> {
        self.pending.iter().map(|p| p.desc).collect()
    }

    /// Validate against `layout`, then apply every write
    pub fn update(self, device: &Device, layout: &DescriptorSetLayout) -> VulkanResult<()> {
        validate_writes(layout.bindings(), &self.descs())?;

        // Built only now so the info vectors no longer move
        let writes: Vec<vk::WriteDescriptorSet> = self
            .pending
            .iter()
            .map(|pending| {
                let builder = vk::WriteDescriptorSet::builder()
                    .dst_set(self.set)
                    .dst_binding(pending.desc.binding)
                    .dst_array_element(pending.desc.first_element)
                    .descriptor_type(pending.desc.descriptor_type);
                match &pending.payload {
                    Payload::Buffer(index) => builder
                        .buffer_info(std::slice::from_ref(&self.buffer_infos[*index]))
                        .build(),
                    Payload::Images(range) => builder.image_info(&self.image_infos[range.clone()]).build(),
                }
            })
            .collect();

        unsafe { device.update_descriptor_sets(&writes, &[]) };
        Ok(())
    }
}

/// The scene pipeline's descriptor set layouts
pub struct SceneDescriptorLayouts {
    /// Set 0: global uniforms (camera, lighting)
    pub global: DescriptorSetLayout,
    /// Set 1: material texture array
    pub material: DescriptorSetLayout,
}

impl SceneDescriptorLayouts {
    /// Create the standard layouts
    pub fn new(device: &Device) -> VulkanResult<Self> {
        let global = DescriptorSetLayoutBuilder::new()
            .add_uniform_buffer(0, vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT)
            .build(device)?;
        let material = DescriptorSetLayoutBuilder::new()
            .add_combined_image_samplers(0, MAX_TEXTURES, vk::ShaderStageFlags::FRAGMENT)
            .build(device)?;
        Ok(Self { global, material })
    }

    /// Layout handles in set order
    pub const fn handles(&self) -> [vk::DescriptorSetLayout; 2] {
        [self.global.handle(), self.material.handle()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> Vec<vk::DescriptorSetLayoutBinding> {
        vec![
            vk::DescriptorSetLayoutBinding::builder()
                .binding(0)
                .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
                .descriptor_count(1)
                .build(),
            vk::DescriptorSetLayoutBinding::builder()
                .binding(1)
                .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
                .descriptor_count(4)
                .build(),
        ]
    }

    fn write(binding: u32, descriptor_type: vk::DescriptorType, count: u32) -> DescriptorWriteDesc {
        DescriptorWriteDesc {
            binding,
            descriptor_type,
            first_element: 0,
            count,
        }
    }

    #[test]
    fn test_matching_writes_pass() {
        let writes = [
            write(0, vk::DescriptorType::UNIFORM_BUFFER, 1),
            write(1, vk::DescriptorType::COMBINED_IMAGE_SAMPLER, 4),
        ];
        assert!(validate_writes(&layout(), &writes).is_ok());
    }

    #[test]
    fn test_unknown_binding_rejected() {
        let writes = [write(5, vk::DescriptorType::UNIFORM_BUFFER, 1)];
        assert!(matches!(validate_writes(&layout(), &writes), Err(VulkanError::DescriptorMismatch(_))));
    }

    #[test]
    fn test_type_mismatch_rejected() {
        let writes = [write(0, vk::DescriptorType::COMBINED_IMAGE_SAMPLER, 1)];
        assert!(matches!(validate_writes(&layout(), &writes), Err(VulkanError::DescriptorMismatch(_))));
    }

    #[test]
    fn test_count_overflow_rejected() {
        let writes = [write(1, vk::DescriptorType::COMBINED_IMAGE_SAMPLER, 5)];
        assert!(validate_writes(&layout(), &writes).is_err());

        let offset = [DescriptorWriteDesc {
            first_element: 3,
            ..write(1, vk::DescriptorType::COMBINED_IMAGE_SAMPLER, 2)
        }];
        assert!(validate_writes(&layout(), &offset).is_err());
    }

    #[test]
    fn test_u32_wrapping_range_rejected() {
        let wrapping = [DescriptorWriteDesc {
            first_element: u32::MAX,
            ..write(1, vk::DescriptorType::COMBINED_IMAGE_SAMPLER, 2)
        }];
        assert!(matches!(
            validate_writes(&layout(), &wrapping),
            Err(VulkanError::DescriptorMismatch(_))
        ));
    }

    #[test]
    fn test_writer_records_shapes() {
        let writer = DescriptorSetWriter::new(vk::DescriptorSet::null())
            .write_uniform_buffer(0, vk::Buffer::null(), 256, 192)
            .write_images(1, &[(vk::ImageView::null(), vk::Sampler::null()); 3]);

        assert_eq!(
            writer.descs(),
            vec![
                write(0, vk::DescriptorType::UNIFORM_BUFFER, 1),
                write(1, vk::DescriptorType::COMBINED_IMAGE_SAMPLER, 3),
            ]
        );
    }
}
