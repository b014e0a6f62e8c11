//! Image resources
//!
//! [`Image`] owns an image, its memory, a view and optionally a sampler. The
//! image tracks its current layout; barriers come from [`transition_masks`],
//! which rejects any transition it has no mapping for.

use ash::{vk, Device};

use crate::assets::ImageData;
use crate::render::backends::vulkan::initialization::device::TEXTURE_FORMAT;
use crate::render::backends::vulkan::initialization::DeviceContext;
use crate::render::backends::vulkan::rendering::CommandPool;
use crate::render::backends::vulkan::resources::Buffer;
use crate::render::backends::vulkan::{VulkanError, VulkanResult};

/// Access masks and pipeline stages for one layout transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionMasks {
    /// Accesses that must complete before the transition
    pub src_access: vk::AccessFlags,
    /// Accesses that wait on the transition
    pub dst_access: vk::AccessFlags,
    /// Stage the source accesses happen in
    pub src_stage: vk::PipelineStageFlags,
    /// Stage the destination accesses happen in
    pub dst_stage: vk::PipelineStageFlags,
}

/// Barrier parameters for `old -> new`
pub fn transition_masks(old: vk::ImageLayout, new: vk::ImageLayout) -> VulkanResult<TransitionMasks> {
    use vk::ImageLayout as L;

    let masks = match (old, new) {
        (L::UNDEFINED, L::TRANSFER_DST_OPTIMAL) => TransitionMasks {
            src_access: vk::AccessFlags::empty(),
            dst_access: vk::AccessFlags::TRANSFER_WRITE,
            src_stage: vk::PipelineStageFlags::TOP_OF_PIPE,
            dst_stage: vk::PipelineStageFlags::TRANSFER,
        },
        (L::TRANSFER_DST_OPTIMAL, L::SHADER_READ_ONLY_OPTIMAL) => TransitionMasks {
            src_access: vk::AccessFlags::TRANSFER_WRITE,
            dst_access: vk::AccessFlags::SHADER_READ,
            src_stage: vk::PipelineStageFlags::TRANSFER,
            dst_stage: vk::PipelineStageFlags::FRAGMENT_SHADER,
        },
        (L::TRANSFER_DST_OPTIMAL, L::TRANSFER_SRC_OPTIMAL) => TransitionMasks {
            src_access: vk::AccessFlags::TRANSFER_WRITE,
            dst_access: vk::AccessFlags::TRANSFER_READ,
            src_stage: vk::PipelineStageFlags::TRANSFER,
            dst_stage: vk::PipelineStageFlags::TRANSFER,
        },
        (L::TRANSFER_SRC_OPTIMAL, L::SHADER_READ_ONLY_OPTIMAL) => TransitionMasks {
            src_access: vk::AccessFlags::TRANSFER_READ,
            dst_access: vk::AccessFlags::SHADER_READ,
            src_stage: vk::PipelineStageFlags::TRANSFER,
            dst_stage: vk::PipelineStageFlags::FRAGMENT_SHADER,
        },
        (L::UNDEFINED, L::DEPTH_STENCIL_ATTACHMENT_OPTIMAL) => TransitionMasks {
            src_access: vk::AccessFlags::empty(),
            dst_access: vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ
                | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
            src_stage: vk::PipelineStageFlags::TOP_OF_PIPE,
            dst_stage: vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS,
        },
        (L::UNDEFINED, L::COLOR_ATTACHMENT_OPTIMAL) => TransitionMasks {
            src_access: vk::AccessFlags::empty(),
            dst_access: vk::AccessFlags::COLOR_ATTACHMENT_READ | vk::AccessFlags::COLOR_ATTACHMENT_WRITE,
            src_stage: vk::PipelineStageFlags::TOP_OF_PIPE,
            dst_stage: vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
        },
        (from, to) => return Err(VulkanError::UnsupportedLayoutTransition { from, to }),
    };
    Ok(masks)
}

/// Number of mip levels for a full chain down to 1x1
pub fn mip_level_count(width: u32, height: u32) -> u32 {
    32 - width.max(height).max(1).leading_zeros()
}

/// Extents of every mip level, halving each step with a floor of 1
pub fn mip_chain(width: u32, height: u32) -> Vec<(u32, u32)> {
    let levels = mip_level_count(width, height);
    let mut extents = Vec::with_capacity(levels as usize);
    let (mut w, mut h) = (width.max(1), height.max(1));
    for _ in 0..levels {
        extents.push((w, h));
        w = (w / 2).max(1);
        h = (h / 2).max(1);
    }
    extents
}

/// Parameters for creating an [`Image`]
#[derive(Debug, Clone, Copy)]
pub struct ImageDesc {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Mip level count
    pub mip_levels: u32,
    /// Sample count
    pub samples: vk::SampleCountFlags,
    /// Texel format
    pub format: vk::Format,
    /// Usage flags
    pub usage: vk::ImageUsageFlags,
    /// View aspect
    pub aspect: vk::ImageAspectFlags,
}

impl ImageDesc {
    /// A render target attachment covering `extent`
    pub const fn attachment(
        extent: vk::Extent2D,
        format: vk::Format,
        samples: vk::SampleCountFlags,
        usage: vk::ImageUsageFlags,
        aspect: vk::ImageAspectFlags,
    ) -> Self {
        Self {
            width: extent.width,
            height: extent.height,
            mip_levels: 1,
            samples,
            format,
            usage,
            aspect,
        }
    }
}

/// Device-local image with view and optional sampler
pub struct Image {
    device: Device,
    image: vk::Image,
    memory: vk::DeviceMemory,
    view: vk::ImageView,
    sampler: Option<vk::Sampler>,
    desc: ImageDesc,
    layout: vk::ImageLayout,
}

impl Image {
    /// Create an image, allocate device-local memory for it and build a view
    pub fn new(context: &DeviceContext, desc: ImageDesc) -> VulkanResult<Self> {
        let device = context.device.clone();
        let image_info = vk::ImageCreateInfo::builder()
            .image_type(vk::ImageType::TYPE_2D)
            .extent(vk::Extent3D {
                width: desc.width,
                height: desc.height,
                depth: 1,
            })
            .mip_levels(desc.mip_levels)
            .array_layers(1)
            .format(desc.format)
            .tiling(vk::ImageTiling::OPTIMAL)
            .initial_layout(vk::ImageLayout::UNDEFINED)
            .usage(desc.usage)
            .samples(desc.samples)
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        let image = unsafe {
            device
                .create_image(&image_info, None)
                .map_err(VulkanError::allocation(0))?
        };

        let requirements = unsafe { device.get_image_memory_requirements(image) };
        let memory = context
            .find_memory_type(requirements.memory_type_bits, vk::MemoryPropertyFlags::DEVICE_LOCAL)
            .and_then(|memory_type_index| {
                let alloc_info = vk::MemoryAllocateInfo::builder()
                    .allocation_size(requirements.size)
                    .memory_type_index(memory_type_index);
                unsafe {
                    device
                        .allocate_memory(&alloc_info, None)
                        .map_err(VulkanError::allocation(requirements.size))
                }
            });
        let memory = match memory {
            Ok(memory) => memory,
            Err(e) => {
                unsafe { device.destroy_image(image, None) };
                return Err(e);
            }
        };

        let view = unsafe { device.bind_image_memory(image, memory, 0) }
            .and_then(|()| {
                let view_info = vk::ImageViewCreateInfo::builder()
                    .image(image)
                    .view_type(vk::ImageViewType::TYPE_2D)
                    .format(desc.format)
                    .subresource_range(vk::ImageSubresourceRange {
                        aspect_mask: desc.aspect,
                        base_mip_level: 0,
                        level_count: desc.mip_levels,
                        base_array_layer: 0,
                        layer_count: 1,
                    });
                unsafe { device.create_image_view(&view_info, None) }
            });
        let view = match view {
            Ok(view) => view,
            Err(e) => {
                unsafe {
                    device.destroy_image(image, None);
                    device.free_memory(memory, None);
                }
                return Err(VulkanError::Api(e));
            }
        };

        Ok(Self {
            device,
            image,
            memory,
            view,
            sampler: None,
            desc,
            layout: vk::ImageLayout::UNDEFINED,
        })
    }

    /// Create a render target attachment
    pub fn attachment(
        context: &DeviceContext,
        extent: vk::Extent2D,
        format: vk::Format,
        samples: vk::SampleCountFlags,
        usage: vk::ImageUsageFlags,
        aspect: vk::ImageAspectFlags,
    ) -> VulkanResult<Self> {
        Self::new(context, ImageDesc::attachment(extent, format, samples, usage, aspect))
    }

    /// Upload RGBA8 pixels into a sampled, mipmapped texture
    ///
    /// Stages the pixels, copies them into mip 0, then either blits the rest
    /// of the chain or, for 1x1 images, transitions straight to
    /// `SHADER_READ_ONLY_OPTIMAL`. Blocks until the upload completes.
    pub fn texture_from_pixels(context: &DeviceContext, pool: &CommandPool, data: &ImageData) -> VulkanResult<Self> {
        let expected = data.width as usize * data.height as usize * 4;
        if data.pixels.len() != expected || expected == 0 {
            return Err(VulkanError::InvalidOperation {
                reason: format!(
                    "texture {}x{} needs {expected} bytes, got {}",
                    data.width,
                    data.height,
                    data.pixels.len()
                ),
            });
        }

        let mip_levels = mip_level_count(data.width, data.height);
        if mip_levels > 1 && !context.capabilities.linear_blit_supported {
            return Err(VulkanError::MipmapUnsupported(TEXTURE_FORMAT));
        }

        let staging = Buffer::staging_with_data(context, &data.pixels)?;
        let mut image = Self::new(
            context,
            ImageDesc {
                width: data.width,
                height: data.height,
                mip_levels,
                samples: vk::SampleCountFlags::TYPE_1,
                format: TEXTURE_FORMAT,
                usage: vk::ImageUsageFlags::TRANSFER_SRC
                    | vk::ImageUsageFlags::TRANSFER_DST
                    | vk::ImageUsageFlags::SAMPLED,
                aspect: vk::ImageAspectFlags::COLOR,
            },
        )?;

        pool.one_shot(context.graphics_queue, |device, command_buffer| {
            image.record_transition(device, command_buffer, vk::ImageLayout::TRANSFER_DST_OPTIMAL)?;
            image.record_copy_from_buffer(device, command_buffer, staging.handle());
            if mip_levels > 1 {
                image.record_generate_mipmaps(device, command_buffer, context.capabilities.linear_blit_supported)
            } else {
                image.record_transition(device, command_buffer, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL)
            }
        })?;

        image.create_sampler(context)?;
        log::debug!("Uploaded {}x{} texture with {mip_levels} mip levels", data.width, data.height);
        Ok(image)
    }

    /// Record a whole-image barrier to `new_layout` and remember the new layout
    pub fn record_transition(
        &mut self,
        device: &Device,
        command_buffer: vk::CommandBuffer,
        new_layout: vk::ImageLayout,
    ) -> VulkanResult<()> {
        let masks = transition_masks(self.layout, new_layout)?;
        self.barrier(device, command_buffer, 0, self.desc.mip_levels, new_layout, masks);
        self.layout = new_layout;
        Ok(())
    }

    fn barrier(
        &self,
        device: &Device,
        command_buffer: vk::CommandBuffer,
        base_mip_level: u32,
        level_count: u32,
        new_layout: vk::ImageLayout,
        masks: TransitionMasks,
    ) {
        self.barrier_from(device, command_buffer, base_mip_level, level_count, self.layout, new_layout, masks);
    }

    fn barrier_from(
        &self,
        device: &Device,
        command_buffer: vk::CommandBuffer,
        base_mip_level: u32,
        level_count: u32,
        old_layout: vk::ImageLayout,
        new_layout: vk::ImageLayout,
        masks: TransitionMasks,
    ) {
        let barrier = vk::ImageMemoryBarrier::builder()
            .old_layout(old_layout)
            .new_layout(new_layout)
            .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .image(self.image)
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask: self.desc.aspect,
                base_mip_level,
                level_count,
                base_array_layer: 0,
                layer_count: 1,
            })
            .src_access_mask(masks.src_access)
            .dst_access_mask(masks.dst_access)
            .build();

        unsafe {
            device.cmd_pipeline_barrier(
                command_buffer,
                masks.src_stage,
                masks.dst_stage,
                vk::DependencyFlags::empty(),
                &[],
                &[],
                &[barrier],
            );
        }
    }

    fn record_copy_from_buffer(&self, device: &Device, command_buffer: vk::CommandBuffer, buffer: vk::Buffer) {
        let region = vk::BufferImageCopy::builder()
            .buffer_offset(0)
            .buffer_row_length(0)
            .buffer_image_height(0)
            .image_subresource(vk::ImageSubresourceLayers {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                mip_level: 0,
                base_array_layer: 0,
                layer_count: 1,
            })
            .image_offset(vk::Offset3D { x: 0, y: 0, z: 0 })
            .image_extent(vk::Extent3D {
                width: self.desc.width,
                height: self.desc.height,
                depth: 1,
            })
            .build();

        unsafe {
            device.cmd_copy_buffer_to_image(
                command_buffer,
                buffer,
                self.image,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                &[region],
            );
        }
    }

    /// Blit each mip level from the previous one
    ///
    /// Expects every level in `TRANSFER_DST_OPTIMAL`; leaves every level in
    /// `SHADER_READ_ONLY_OPTIMAL`.
    pub fn record_generate_mipmaps(
        &mut self,
        device: &Device,
        command_buffer: vk::CommandBuffer,
        linear_blit_supported: bool,
    ) -> VulkanResult<()> {
        if !linear_blit_supported {
            return Err(VulkanError::MipmapUnsupported(self.desc.format));
        }
        if self.layout != vk::ImageLayout::TRANSFER_DST_OPTIMAL {
            return Err(VulkanError::UnsupportedLayoutTransition {
                from: self.layout,
                to: vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
            });
        }

        let to_src = transition_masks(vk::ImageLayout::TRANSFER_DST_OPTIMAL, vk::ImageLayout::TRANSFER_SRC_OPTIMAL)?;
        let src_to_read =
            transition_masks(vk::ImageLayout::TRANSFER_SRC_OPTIMAL, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL)?;
        let dst_to_read =
            transition_masks(vk::ImageLayout::TRANSFER_DST_OPTIMAL, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL)?;

        let chain = mip_chain(self.desc.width, self.desc.height);
        for (level, pair) in (1u32..).zip(chain.windows(2)) {
            let (src_w, src_h) = pair[0];
            let (dst_w, dst_h) = pair[1];

            self.barrier_from(
                device,
                command_buffer,
                level - 1,
                1,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                to_src,
            );

            let blit = vk::ImageBlit::builder()
                .src_offsets([
                    vk::Offset3D { x: 0, y: 0, z: 0 },
                    vk::Offset3D { x: src_w as i32, y: src_h as i32, z: 1 },
                ])
                .src_subresource(vk::ImageSubresourceLayers {
                    aspect_mask: vk::ImageAspectFlags::COLOR,
                    mip_level: level - 1,
                    base_array_layer: 0,
                    layer_count: 1,
                })
                .dst_offsets([
                    vk::Offset3D { x: 0, y: 0, z: 0 },
                    vk::Offset3D { x: dst_w as i32, y: dst_h as i32, z: 1 },
                ])
                .dst_subresource(vk::ImageSubresourceLayers {
                    aspect_mask: vk::ImageAspectFlags::COLOR,
                    mip_level: level,
                    base_array_layer: 0,
                    layer_count: 1,
                })
                .build();

            unsafe {
                device.cmd_blit_image(
                    command_buffer,
                    self.image,
                    vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                    self.image,
                    vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                    &[blit],
                    vk::Filter::LINEAR,
                );
            }

            self.barrier_from(
                device,
                command_buffer,
                level - 1,
                1,
                vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
                src_to_read,
            );
        }

        // The last level was only ever a blit destination
        self.barrier_from(
            device,
            command_buffer,
            self.desc.mip_levels - 1,
            1,
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
            dst_to_read,
        );

        self.layout = vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL;
        Ok(())
    }

    fn create_sampler(&mut self, context: &DeviceContext) -> VulkanResult<()> {
        let anisotropy = context
            .capabilities
            .enabled_features
            .contains(crate::render::backends::vulkan::initialization::DeviceFeatureFlags::SAMPLER_ANISOTROPY);

        let sampler_info = vk::SamplerCreateInfo::builder()
            .mag_filter(vk::Filter::LINEAR)
            .min_filter(vk::Filter::LINEAR)
            .address_mode_u(vk::SamplerAddressMode::REPEAT)
            .address_mode_v(vk::SamplerAddressMode::REPEAT)
            .address_mode_w(vk::SamplerAddressMode::REPEAT)
            .anisotropy_enable(anisotropy)
            .max_anisotropy(context.capabilities.max_sampler_anisotropy.min(16.0))
            .border_color(vk::BorderColor::INT_OPAQUE_BLACK)
            .unnormalized_coordinates(false)
            .compare_enable(false)
            .compare_op(vk::CompareOp::ALWAYS)
            .mipmap_mode(vk::SamplerMipmapMode::LINEAR)
            .mip_lod_bias(0.0)
            .min_lod(0.0)
            .max_lod(self.desc.mip_levels as f32);

        let sampler = unsafe {
            self.device
                .create_sampler(&sampler_info, None)
                .map_err(VulkanError::Api)?
        };
        self.sampler = Some(sampler);
        Ok(())
    }

    /// Image handle
    pub const fn handle(&self) -> vk::Image {
        self.image
    }

    /// Image view handle
    pub const fn view(&self) -> vk::ImageView {
        self.view
    }

    /// Sampler, for sampled textures
    pub const fn sampler(&self) -> Option<vk::Sampler> {
        self.sampler
    }

    /// Creation parameters
    pub const fn desc(&self) -> &ImageDesc {
        &self.desc
    }

    /// Layout after the last recorded transition
    pub const fn layout(&self) -> vk::ImageLayout {
        self.layout
    }
}

impl Drop for Image {
    fn drop(&mut self) {
        unsafe {
            if let Some(sampler) = self.sampler.take() {
                self.device.destroy_sampler(sampler, None);
            }
            self.device.destroy_image_view(self.view, None);
            self.device.destroy_image(self.image, None);
            self.device.free_memory(self.memory, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_transitions_are_supported() {
        let to_dst = transition_masks(vk::ImageLayout::UNDEFINED, vk::ImageLayout::TRANSFER_DST_OPTIMAL).unwrap();
        assert_eq!(to_dst.dst_access, vk::AccessFlags::TRANSFER_WRITE);
        assert_eq!(to_dst.src_stage, vk::PipelineStageFlags::TOP_OF_PIPE);

        let to_read =
            transition_masks(vk::ImageLayout::TRANSFER_DST_OPTIMAL, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL).unwrap();
        assert_eq!(to_read.src_access, vk::AccessFlags::TRANSFER_WRITE);
        assert_eq!(to_read.dst_access, vk::AccessFlags::SHADER_READ);
        assert_eq!(to_read.dst_stage, vk::PipelineStageFlags::FRAGMENT_SHADER);
    }

    #[test]
    fn test_unknown_transition_rejected() {
        let result = transition_masks(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL, vk::ImageLayout::UNDEFINED);
        assert!(matches!(
            result,
            Err(VulkanError::UnsupportedLayoutTransition {
                from: vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
                to: vk::ImageLayout::UNDEFINED,
            })
        ));
        assert!(transition_masks(vk::ImageLayout::UNDEFINED, vk::ImageLayout::PRESENT_SRC_KHR).is_err());
    }

    #[test]
    fn test_mip_level_count() {
        assert_eq!(mip_level_count(1, 1), 1);
        assert_eq!(mip_level_count(2, 1), 2);
        assert_eq!(mip_level_count(512, 512), 10);
        assert_eq!(mip_level_count(1024, 300), 11);
        assert_eq!(mip_level_count(0, 0), 1);
    }

    #[test]
    fn test_mip_chain_halves_with_floor_of_one() {
        let chain = mip_chain(8, 2);
        assert_eq!(chain, vec![(8, 2), (4, 1), (2, 1), (1, 1)]);
        assert_eq!(chain.len() as u32, mip_level_count(8, 2));
    }
}
