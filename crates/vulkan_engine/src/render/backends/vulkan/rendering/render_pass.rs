//! Render pass management
//!
//! One forward pass with a color and a depth attachment. With MSAA the color
//! and depth targets are multisampled and a third single-sample attachment,
//! the swapchain image, receives the resolve.

use ash::{vk, Device};

use crate::render::backends::vulkan::{VulkanError, VulkanResult};

/// Number of framebuffer attachments for a sample count
pub fn attachment_count(samples: vk::SampleCountFlags) -> usize {
    if samples == vk::SampleCountFlags::TYPE_1 {
        2
    } else {
        3
    }
}

/// Attachment descriptions in framebuffer order
pub fn attachment_descriptions(
    color_format: vk::Format,
    depth_format: vk::Format,
    samples: vk::SampleCountFlags,
) -> Vec<vk::AttachmentDescription> {
    let msaa = attachment_count(samples) == 3;

    let color = vk::AttachmentDescription::builder()
        .format(color_format)
        .samples(samples)
        .load_op(vk::AttachmentLoadOp::CLEAR)
        .store_op(if msaa {
            vk::AttachmentStoreOp::DONT_CARE
        } else {
            vk::AttachmentStoreOp::STORE
        })
        .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
        .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
        .initial_layout(vk::ImageLayout::UNDEFINED)
        .final_layout(if msaa {
            vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL
        } else {
            vk::ImageLayout::PRESENT_SRC_KHR
        })
        .build();

    let depth = vk::AttachmentDescription::builder()
        .format(depth_format)
        .samples(samples)
        .load_op(vk::AttachmentLoadOp::CLEAR)
        .store_op(vk::AttachmentStoreOp::DONT_CARE)
        .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
        .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
        .initial_layout(vk::ImageLayout::UNDEFINED)
        .final_layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL)
        .build();

    let mut attachments = vec![color, depth];
    if msaa {
        attachments.push(
            vk::AttachmentDescription::builder()
                .format(color_format)
                .samples(vk::SampleCountFlags::TYPE_1)
                .load_op(vk::AttachmentLoadOp::DONT_CARE)
                .store_op(vk::AttachmentStoreOp::STORE)
                .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
                .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
                .initial_layout(vk::ImageLayout::UNDEFINED)
                .final_layout(vk::ImageLayout::PRESENT_SRC_KHR)
                .build(),
        );
    }
    attachments
}

/// Render pass wrapper with RAII cleanup
pub struct RenderPass {
    device: Device,
    render_pass: vk::RenderPass,
    color_format: vk::Format,
    depth_format: vk::Format,
    samples: vk::SampleCountFlags,
}

impl RenderPass {
    /// Create the forward pass
    pub fn new_forward_pass(
        device: Device,
        color_format: vk::Format,
        depth_format: vk::Format,
        samples: vk::SampleCountFlags,
    ) -> VulkanResult<Self> {
        let attachments = attachment_descriptions(color_format, depth_format, samples);

        let color_refs = [vk::AttachmentReference {
            attachment: 0,
            layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
        }];
        let depth_ref = vk::AttachmentReference {
            attachment: 1,
            layout: vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
        };
        let resolve_refs = [vk::AttachmentReference {
            attachment: 2,
            layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
        }];

        let mut subpass = vk::SubpassDescription::builder()
            .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
            .color_attachments(&color_refs)
            .depth_stencil_attachment(&depth_ref);
        if attachments.len() == 3 {
            subpass = subpass.resolve_attachments(&resolve_refs);
        }
        let subpasses = [subpass.build()];

        let dependencies = [vk::SubpassDependency::builder()
            .src_subpass(vk::SUBPASS_EXTERNAL)
            .dst_subpass(0)
            .src_stage_mask(
                vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT | vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS,
            )
            .src_access_mask(vk::AccessFlags::empty())
            .dst_stage_mask(
                vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT | vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS,
            )
            .dst_access_mask(
                vk::AccessFlags::COLOR_ATTACHMENT_WRITE | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
            )
            .build()];

        let create_info = vk::RenderPassCreateInfo::builder()
            .attachments(&attachments)
            .subpasses(&subpasses)
            .dependencies(&dependencies);

        let render_pass = unsafe {
            device
                .create_render_pass(&create_info, None)
                .map_err(|e| VulkanError::PipelineCreation(format!("render pass: {e:?}")))?
        };

        log::debug!(
            "Created forward render pass ({} attachments, {samples:?})",
            attachments.len()
        );

        Ok(Self {
            device,
            render_pass,
            color_format,
            depth_format,
            samples,
        })
    }

    /// Get the render pass handle
    pub const fn handle(&self) -> vk::RenderPass {
        self.render_pass
    }

    /// Whether the pass was built for this swapchain format
    pub fn is_compatible_with(&self, color_format: vk::Format) -> bool {
        self.color_format == color_format
    }

    /// Depth attachment format
    pub const fn depth_format(&self) -> vk::Format {
        self.depth_format
    }

    /// Color and depth sample count
    pub const fn samples(&self) -> vk::SampleCountFlags {
        self.samples
    }
}

impl Drop for RenderPass {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_render_pass(self.render_pass, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attachment_count_follows_samples() {
        assert_eq!(attachment_count(vk::SampleCountFlags::TYPE_1), 2);
        assert_eq!(attachment_count(vk::SampleCountFlags::TYPE_4), 3);
    }

    #[test]
    fn test_single_sample_presents_color_directly() {
        let attachments =
            attachment_descriptions(vk::Format::B8G8R8A8_SRGB, vk::Format::D32_SFLOAT, vk::SampleCountFlags::TYPE_1);
        assert_eq!(attachments.len(), 2);
        assert_eq!(attachments[0].final_layout, vk::ImageLayout::PRESENT_SRC_KHR);
        assert_eq!(attachments[0].store_op, vk::AttachmentStoreOp::STORE);
    }

    #[test]
    fn test_msaa_resolves_into_single_sample_target() {
        let attachments =
            attachment_descriptions(vk::Format::B8G8R8A8_SRGB, vk::Format::D32_SFLOAT, vk::SampleCountFlags::TYPE_4);
        assert_eq!(attachments.len(), 3);
        assert_eq!(attachments[0].samples, vk::SampleCountFlags::TYPE_4);
        assert_eq!(attachments[1].samples, vk::SampleCountFlags::TYPE_4);
        assert_eq!(attachments[2].samples, vk::SampleCountFlags::TYPE_1);
        assert_eq!(attachments[2].final_layout, vk::ImageLayout::PRESENT_SRC_KHR);
    }
}
