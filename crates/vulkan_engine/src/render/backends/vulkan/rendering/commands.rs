//! Command buffer management
//!
//! [`CommandPool`] hands out command buffers for one queue family and runs
//! blocking one-shot submissions. [`CommandRecorder`] and
//! [`ActiveRenderPass`] wrap per-frame recording, ending the render pass when
//! the active pass is dropped.

use ash::{vk, Device};

use crate::render::backends::vulkan::{VulkanError, VulkanResult};

/// Command pool wrapper with RAII cleanup
pub struct CommandPool {
    device: Device,
    command_pool: vk::CommandPool,
}

impl CommandPool {
    /// Create a pool whose buffers can be reset individually
    pub fn new(device: Device, queue_family_index: u32) -> VulkanResult<Self> {
        let pool_create_info = vk::CommandPoolCreateInfo::builder()
            .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER)
            .queue_family_index(queue_family_index);

        let command_pool = unsafe {
            device
                .create_command_pool(&pool_create_info, None)
                .map_err(VulkanError::command("pool creation"))?
        };

        Ok(Self { device, command_pool })
    }

    /// Allocate primary command buffers
    pub fn allocate(&self, count: u32) -> VulkanResult<Vec<vk::CommandBuffer>> {
        let alloc_info = vk::CommandBufferAllocateInfo::builder()
            .command_pool(self.command_pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(count);

        unsafe {
            self.device
                .allocate_command_buffers(&alloc_info)
                .map_err(VulkanError::command("allocation"))
        }
    }

    /// Return command buffers to the pool
    pub fn free(&self, command_buffers: &[vk::CommandBuffer]) {
        if !command_buffers.is_empty() {
            unsafe { self.device.free_command_buffers(self.command_pool, command_buffers) };
        }
    }

    /// Record and submit a throwaway command buffer, blocking until the queue is idle
    ///
    /// Used for setup-time transfers. The buffer is freed whether or not
    /// recording or submission succeeds.
    pub fn one_shot<F>(&self, queue: vk::Queue, record: F) -> VulkanResult<()>
    where
        F: FnOnce(&Device, vk::CommandBuffer) -> VulkanResult<()>,
    {
        let command_buffers = self.allocate(1)?;
        let result = self.run_one_shot(queue, command_buffers[0], record);
        self.free(&command_buffers);
        result
    }

    fn run_one_shot<F>(&self, queue: vk::Queue, command_buffer: vk::CommandBuffer, record: F) -> VulkanResult<()>
    where
        F: FnOnce(&Device, vk::CommandBuffer) -> VulkanResult<()>,
    {
        let begin_info = vk::CommandBufferBeginInfo::builder().flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
        unsafe {
            self.device
                .begin_command_buffer(command_buffer, &begin_info)
                .map_err(VulkanError::command("begin"))?;
        }

        record(&self.device, command_buffer)?;

        let command_buffers = [command_buffer];
        let submit_info = vk::SubmitInfo::builder().command_buffers(&command_buffers).build();
        unsafe {
            self.device
                .end_command_buffer(command_buffer)
                .map_err(VulkanError::command("end"))?;
            self.device
                .queue_submit(queue, &[submit_info], vk::Fence::null())
                .map_err(VulkanError::command("submit"))?;
            self.device
                .queue_wait_idle(queue)
                .map_err(VulkanError::command("queue wait"))?;
        }
        Ok(())
    }

    /// Get the command pool handle
    pub const fn handle(&self) -> vk::CommandPool {
        self.command_pool
    }
}

impl Drop for CommandPool {
    fn drop(&mut self) {
        unsafe {
            // Destroying the pool frees every buffer allocated from it
            self.device.destroy_command_pool(self.command_pool, None);
        }
    }
}

/// Recorder for one per-frame command buffer
pub struct CommandRecorder<'d> {
    device: &'d Device,
    command_buffer: vk::CommandBuffer,
}

impl<'d> CommandRecorder<'d> {
    /// Reset `command_buffer` and begin recording into it
    ///
    /// The buffer must come from a pool created with
    /// `RESET_COMMAND_BUFFER` and must not be in use by the GPU.
    pub fn begin(device: &'d Device, command_buffer: vk::CommandBuffer) -> VulkanResult<Self> {
        let begin_info = vk::CommandBufferBeginInfo::builder().flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
        unsafe {
            device
                .reset_command_buffer(command_buffer, vk::CommandBufferResetFlags::empty())
                .map_err(VulkanError::command("reset"))?;
            device
                .begin_command_buffer(command_buffer, &begin_info)
                .map_err(VulkanError::command("begin"))?;
        }
        Ok(Self { device, command_buffer })
    }

    /// Begin an inline render pass
    pub fn begin_render_pass(
        &mut self,
        render_pass: vk::RenderPass,
        framebuffer: vk::Framebuffer,
        render_area: vk::Rect2D,
        clear_values: &[vk::ClearValue],
    ) -> ActiveRenderPass<'_, 'd> {
        let render_pass_begin = vk::RenderPassBeginInfo::builder()
            .render_pass(render_pass)
            .framebuffer(framebuffer)
            .render_area(render_area)
            .clear_values(clear_values);

        unsafe {
            self.device
                .cmd_begin_render_pass(self.command_buffer, &render_pass_begin, vk::SubpassContents::INLINE);
        }

        ActiveRenderPass { recorder: self }
    }

    /// Finish recording
    pub fn end(self) -> VulkanResult<vk::CommandBuffer> {
        unsafe {
            self.device
                .end_command_buffer(self.command_buffer)
                .map_err(VulkanError::command("end"))?;
        }
        Ok(self.command_buffer)
    }
}

/// Active render pass, ended on drop
pub struct ActiveRenderPass<'r, 'd> {
    recorder: &'r mut CommandRecorder<'d>,
}

impl<'r, 'd> ActiveRenderPass<'r, 'd> {
    /// Raw command buffer, for plugins that record on their own
    pub fn command_buffer(&self) -> vk::CommandBuffer {
        self.recorder.command_buffer
    }

    /// Device the buffer is recorded against
    pub fn device(&self) -> &'d Device {
        self.recorder.device
    }

    /// Set viewport
    pub fn set_viewport(&mut self, viewport: vk::Viewport) {
        unsafe {
            self.recorder
                .device
                .cmd_set_viewport(self.recorder.command_buffer, 0, &[viewport]);
        }
    }

    /// Set scissor
    pub fn set_scissor(&mut self, scissor: vk::Rect2D) {
        unsafe {
            self.recorder
                .device
                .cmd_set_scissor(self.recorder.command_buffer, 0, &[scissor]);
        }
    }

    /// Bind a graphics pipeline
    pub fn bind_pipeline(&mut self, pipeline: vk::Pipeline) {
        unsafe {
            self.recorder.device.cmd_bind_pipeline(
                self.recorder.command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                pipeline,
            );
        }
    }

    /// Bind descriptor sets starting at `first_set`
    pub fn bind_descriptor_sets(
        &mut self,
        layout: vk::PipelineLayout,
        first_set: u32,
        sets: &[vk::DescriptorSet],
        dynamic_offsets: &[u32],
    ) {
        unsafe {
            self.recorder.device.cmd_bind_descriptor_sets(
                self.recorder.command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                layout,
                first_set,
                sets,
                dynamic_offsets,
            );
        }
    }

    /// Bind vertex buffers
    pub fn bind_vertex_buffers(&mut self, first_binding: u32, buffers: &[vk::Buffer], offsets: &[vk::DeviceSize]) {
        unsafe {
            self.recorder
                .device
                .cmd_bind_vertex_buffers(self.recorder.command_buffer, first_binding, buffers, offsets);
        }
    }

    /// Bind a 32-bit index buffer
    pub fn bind_index_buffer(&mut self, buffer: vk::Buffer, offset: vk::DeviceSize) {
        unsafe {
            self.recorder.device.cmd_bind_index_buffer(
                self.recorder.command_buffer,
                buffer,
                offset,
                vk::IndexType::UINT32,
            );
        }
    }

    /// Push constants to shaders
    pub fn push_constants(
        &mut self,
        layout: vk::PipelineLayout,
        stages: vk::ShaderStageFlags,
        offset: u32,
        data: &[u8],
    ) {
        unsafe {
            self.recorder
                .device
                .cmd_push_constants(self.recorder.command_buffer, layout, stages, offset, data);
        }
    }

    /// Issue `draw_count` indexed draws read from `buffer`
    pub fn draw_indexed_indirect(&mut self, buffer: vk::Buffer, offset: vk::DeviceSize, draw_count: u32, stride: u32) {
        unsafe {
            self.recorder.device.cmd_draw_indexed_indirect(
                self.recorder.command_buffer,
                buffer,
                offset,
                draw_count,
                stride,
            );
        }
    }
}

impl Drop for ActiveRenderPass<'_, '_> {
    fn drop(&mut self) {
        unsafe {
            self.recorder.device.cmd_end_render_pass(self.recorder.command_buffer);
        }
    }
}
