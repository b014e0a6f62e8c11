//! Framebuffers and the attachments that back them

use ash::{vk, Device};

use crate::render::backends::vulkan::initialization::DeviceContext;
use crate::render::backends::vulkan::rendering::RenderPass;
use crate::render::backends::vulkan::resources::Image;
use crate::render::backends::vulkan::state::Swapchain;
use crate::render::backends::vulkan::{VulkanError, VulkanResult};

/// Framebuffer wrapper
pub struct Framebuffer {
    device: Device,
    framebuffer: vk::Framebuffer,
}

impl Framebuffer {
    /// Create a framebuffer over `attachments` in render pass order
    pub fn new(
        device: Device,
        render_pass: vk::RenderPass,
        attachments: &[vk::ImageView],
        extent: vk::Extent2D,
    ) -> VulkanResult<Self> {
        let create_info = vk::FramebufferCreateInfo::builder()
            .render_pass(render_pass)
            .attachments(attachments)
            .width(extent.width)
            .height(extent.height)
            .layers(1);

        let framebuffer = unsafe { device.create_framebuffer(&create_info, None) }.map_err(VulkanError::Api)?;
        Ok(Self { device, framebuffer })
    }

    /// Framebuffer handle
    pub const fn handle(&self) -> vk::Framebuffer {
        self.framebuffer
    }
}

impl Drop for Framebuffer {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_framebuffer(self.framebuffer, None);
        }
    }
}

/// Attachment views in forward pass order
///
/// With a multisampled color target the swapchain image is the resolve
/// attachment: `[color, depth, swapchain]`. Otherwise `[swapchain, depth]`.
pub fn framebuffer_attachments(
    msaa_color: Option<vk::ImageView>,
    depth: vk::ImageView,
    swapchain_view: vk::ImageView,
) -> Vec<vk::ImageView> {
    match msaa_color {
        Some(color) => vec![color, depth, swapchain_view],
        None => vec![swapchain_view, depth],
    }
}

/// Per-swapchain render targets
///
/// Recreated together with the swapchain. Framebuffers are declared first so
/// they are destroyed before the images they reference.
pub struct RenderTargets {
    framebuffers: Vec<Framebuffer>,
    msaa_color: Option<Image>,
    depth: Image,
}

impl RenderTargets {
    /// Create depth and optional MSAA color images plus one framebuffer per swapchain image
    pub fn new(context: &DeviceContext, render_pass: &RenderPass, swapchain: &Swapchain) -> VulkanResult<Self> {
        let extent = swapchain.extent();
        let samples = render_pass.samples();

        if !render_pass.is_compatible_with(swapchain.format()) {
            return Err(VulkanError::InvalidOperation {
                reason: format!("render pass does not match swapchain format {:?}", swapchain.format()),
            });
        }

        let msaa_color = if samples == vk::SampleCountFlags::TYPE_1 {
            None
        } else {
            Some(Image::attachment(
                context,
                extent,
                swapchain.format(),
                samples,
                vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::TRANSIENT_ATTACHMENT,
                vk::ImageAspectFlags::COLOR,
            )?)
        };

        let depth = Image::attachment(
            context,
            extent,
            render_pass.depth_format(),
            samples,
            vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT,
            vk::ImageAspectFlags::DEPTH,
        )?;

        let framebuffers = swapchain
            .image_views()
            .iter()
            .map(|&view| {
                let attachments = framebuffer_attachments(msaa_color.as_ref().map(Image::view), depth.view(), view);
                Framebuffer::new(context.device.clone(), render_pass.handle(), &attachments, extent)
            })
            .collect::<VulkanResult<Vec<_>>>()?;

        log::debug!(
            "Render targets created: {} framebuffers, {:?} samples",
            framebuffers.len(),
            samples
        );

        Ok(Self {
            framebuffers,
            msaa_color,
            depth,
        })
    }

    /// Framebuffer for a swapchain image index
    pub fn framebuffer(&self, image_index: u32) -> VulkanResult<vk::Framebuffer> {
        self.framebuffers
            .get(image_index as usize)
            .map(Framebuffer::handle)
            .ok_or_else(|| VulkanError::InvalidOperation {
                reason: format!("no framebuffer for swapchain image {image_index}"),
            })
    }

    /// Number of framebuffers
    pub fn len(&self) -> usize {
        self.framebuffers.len()
    }

    /// Whether no framebuffers exist
    pub fn is_empty(&self) -> bool {
        self.framebuffers.is_empty()
    }

    /// Whether a multisampled color target is in use
    pub const fn is_multisampled(&self) -> bool {
        self.msaa_color.is_some()
    }

    /// Depth attachment
    pub const fn depth(&self) -> &Image {
        &self.depth
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::backends::vulkan::rendering::attachment_count;
    use ash::vk::Handle;

    fn view(raw: u64) -> vk::ImageView {
        vk::ImageView::from_raw(raw)
    }

    #[test]
    fn test_multisampled_attachment_order() {
        let views = framebuffer_attachments(Some(view(1)), view(2), view(3));
        assert_eq!(views, vec![view(1), view(2), view(3)]);
        assert_eq!(views.len(), attachment_count(vk::SampleCountFlags::TYPE_4));
    }

    #[test]
    fn test_single_sample_attachment_order() {
        let views = framebuffer_attachments(None, view(2), view(3));
        assert_eq!(views, vec![view(3), view(2)]);
        assert_eq!(views.len(), attachment_count(vk::SampleCountFlags::TYPE_1));
    }
}
