//! UI overlay hook
//!
//! The renderer does not know about any UI toolkit. An overlay is handed the
//! frame's command buffer after the scene draw, while the render pass is
//! still active, and records whatever it needs on its own.

use ash::vk;

use crate::render::backends::vulkan::VulkanResult;

/// Per-frame information given to an overlay
#[derive(Debug, Clone, Copy)]
pub struct OverlayFrame {
    /// Monotonic frame counter
    pub frame_number: u64,
    /// Frame slot the command buffer belongs to
    pub frame_slot: usize,
    /// Viewport covering the swapchain extent
    pub viewport: vk::Viewport,
    /// Logical display size in pixels
    pub display_size: [f32; 2],
}

/// Renderer plugin that draws on top of the scene
pub trait UiOverlay {
    /// Record draw commands into an active render pass
    ///
    /// The overlay must leave the render pass open. It may bind its own
    /// pipeline, descriptor sets and buffers.
    fn record(
        &mut self,
        device: &ash::Device,
        command_buffer: vk::CommandBuffer,
        frame: &OverlayFrame,
    ) -> VulkanResult<()>;

    /// Called after the swapchain has been recreated
    fn on_swapchain_recreated(&mut self, _extent: vk::Extent2D) {}
}
