//! Frame orchestration
//!
//! [`Renderer`] composes the device context, swapchain, scene pipeline,
//! resource managers and frame slots into the render loop. Each frame runs
//! wait → acquire → record → submit → present → advance on the current slot.
//! An out-of-date swapchain is recreated and the frame skipped; a suboptimal
//! one is recreated after the frame presents.

use std::mem::size_of;
use std::path::Path;

use ash::vk;

use crate::assets;
use crate::core::config::RendererConfig;
use crate::foundation::math::{to_cols_array, Mat4, Vec3};
use crate::platform::Window;
use crate::render::backends::vulkan::initialization::{DeviceContext, DeviceFeatureFlags};
use crate::render::backends::vulkan::rendering::{
    CommandPool, CommandRecorder, GraphicsPipelineDesc, Pipeline, PipelineDesc, PipelineLayoutDesc, RenderPass,
    SceneVertexLayout, ShaderStageDesc,
};
use crate::render::backends::vulkan::resources::{
    pad_uniform_buffer_size, Buffer, DescriptorPool, DescriptorSetWriter, SceneDescriptorLayouts, MAX_TEXTURES,
};
use crate::render::backends::vulkan::state::{
    Fence, FrameSlot, FrameTracker, RenderTargets, Semaphore, Swapchain, SwapchainState, MAX_FRAMES_IN_FLIGHT,
};
use crate::render::backends::vulkan::{VulkanError, VulkanResult};
use crate::render::managers::{ModelHandle, ModelManager};
use crate::render::overlay::{OverlayFrame, UiOverlay};
use crate::render::vertex::{GlobalUniforms, ObjectPushConstants};
use crate::render::{Camera, DirectionalLight};
use crate::EngineResult;

const GLOBAL_UNIFORMS_SIZE: vk::DeviceSize = size_of::<GlobalUniforms>() as vk::DeviceSize;

/// What happened to a requested frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// The frame was drawn and queued for presentation
    Presented,
    /// The swapchain was stale and has been recreated; nothing was drawn
    SkippedSwapchainRecreated,
    /// The window has no drawable area; nothing was drawn
    SkippedMinimized,
}

/// Build the global uniform block for a camera and light
pub fn scene_uniforms(camera: &Camera, light: &DirectionalLight) -> GlobalUniforms {
    let position = camera.position;
    GlobalUniforms {
        view: to_cols_array(&camera.view_matrix()),
        projection: to_cols_array(&camera.projection_matrix()),
        camera_position: [position.x, position.y, position.z, 1.0],
        light_direction: [light.direction.x, light.direction.y, light.direction.z, 0.0],
        light_color: [light.color.x, light.color.y, light.color.z, light.intensity],
        ambient_color: [light.ambient.x, light.ambient.y, light.ambient.z, 0.0],
    }
}

/// How the frame loop proceeds after an image acquire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireOutcome {
    /// Draw into `image_index`; `stale` asks for a recreate after present
    Draw {
        /// Acquired swapchain image
        image_index: u32,
        /// The swapchain is suboptimal for the surface
        stale: bool,
    },
    /// The swapchain no longer matches the surface; skip the frame
    OutOfDate,
    /// Any other driver failure
    Failed(vk::Result),
}

/// Classify the result of `vkAcquireNextImageKHR`
///
/// A suboptimal acquire still signals the image-available semaphore, so the
/// frame is drawn and the swapchain rebuilt after present.
pub fn classify_acquire(result: Result<(u32, bool), vk::Result>) -> AcquireOutcome {
    match result {
        Ok((image_index, stale)) => AcquireOutcome::Draw { image_index, stale },
        Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => AcquireOutcome::OutOfDate,
        Err(result) => AcquireOutcome::Failed(result),
    }
}

/// Classify the result of `vkQueuePresentKHR`; `Ok(true)` means stale
pub fn classify_present(result: Result<bool, vk::Result>) -> Result<bool, vk::Result> {
    match result {
        Ok(suboptimal) => Ok(suboptimal),
        Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(true),
        Err(result) => Err(result),
    }
}

fn window_extent(window: &Window) -> vk::Extent2D {
    let (width, height) = window.framebuffer_size();
    vk::Extent2D { width, height }
}

/// Vulkan forward renderer for a batched, instanced scene
///
/// Fields are declared in teardown order: managers, frame slots and their
/// descriptors, pipeline, render targets, swapchain, and finally the device
/// context.
pub struct Renderer {
    overlay: Option<Box<dyn UiOverlay>>,
    models: ModelManager,
    frames: Vec<FrameSlot>,
    descriptor_pool: DescriptorPool,
    material_set: vk::DescriptorSet,
    global_uniforms: Buffer,
    pipeline: Pipeline,
    descriptor_layouts: SceneDescriptorLayouts,
    targets: Option<RenderTargets>,
    swapchain: Option<Swapchain>,
    render_pass: RenderPass,
    command_pool: CommandPool,
    context: DeviceContext,

    tracker: FrameTracker,
    swapchain_state: SwapchainState,
    camera: Camera,
    light: DirectionalLight,
    clear_color: [f32; 4],
    prefer_low_latency: bool,
    material_override: Option<u32>,
}

impl Renderer {
    /// Initialize the device, swapchain, scene pipeline and frame slots
    pub fn new(window: &mut Window, config: &RendererConfig) -> EngineResult<Self> {
        config.validate()?;

        let context = DeviceContext::new(window, config)?;
        let device = context.device.clone();
        let command_pool = CommandPool::new(device.clone(), context.queue_families.graphics)?;

        let swapchain = Swapchain::new(
            &context,
            window_extent(window),
            config.prefer_low_latency_present,
            vk::SwapchainKHR::null(),
        )?;
        let samples = context.capabilities.msaa_samples;
        let render_pass = RenderPass::new_forward_pass(
            device.clone(),
            swapchain.format(),
            context.capabilities.depth_format,
            samples,
        )?;
        let targets = RenderTargets::new(&context, &render_pass, &swapchain)?;

        let descriptor_layouts = SceneDescriptorLayouts::new(&device)?;
        let pipeline = Self::build_scene_pipeline(&context, config, &render_pass, &descriptor_layouts)?;

        let uniform_stride = pad_uniform_buffer_size(
            GLOBAL_UNIFORMS_SIZE,
            context.capabilities.min_uniform_buffer_offset_alignment,
        )
        .ok_or_else(|| VulkanError::AllocationFailure {
            requested: GLOBAL_UNIFORMS_SIZE,
            reason: "uniform stride overflows the device size".to_string(),
        })?;
        let mut global_uniforms = Buffer::host_visible(
            &context,
            uniform_stride * MAX_FRAMES_IN_FLIGHT as vk::DeviceSize,
            vk::BufferUsageFlags::UNIFORM_BUFFER,
        )?;
        global_uniforms.map_persistent()?;

        let descriptor_pool = DescriptorPool::new(
            device.clone(),
            MAX_FRAMES_IN_FLIGHT as u32 + 1,
            &[
                vk::DescriptorPoolSize {
                    ty: vk::DescriptorType::UNIFORM_BUFFER,
                    descriptor_count: MAX_FRAMES_IN_FLIGHT as u32,
                },
                vk::DescriptorPoolSize {
                    ty: vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
                    descriptor_count: MAX_TEXTURES,
                },
            ],
        )?;
        let global_sets = descriptor_pool.allocate(&[descriptor_layouts.global.handle(); MAX_FRAMES_IN_FLIGHT])?;
        let material_set = descriptor_pool
            .allocate(&[descriptor_layouts.material.handle()])?
            .into_iter()
            .next()
            .ok_or_else(|| VulkanError::DescriptorCreation("no material set allocated".to_string()))?;

        let command_buffers = command_pool.allocate(MAX_FRAMES_IN_FLIGHT as u32)?;
        let mut frames = Vec::with_capacity(MAX_FRAMES_IN_FLIGHT);
        for (slot, (&command_buffer, &global_descriptor_set)) in command_buffers.iter().zip(&global_sets).enumerate() {
            let uniform_offset = uniform_stride * slot as vk::DeviceSize;
            DescriptorSetWriter::new(global_descriptor_set)
                .write_uniform_buffer(0, global_uniforms.handle(), uniform_offset, GLOBAL_UNIFORMS_SIZE)
                .update(&device, &descriptor_layouts.global)?;

            frames.push(FrameSlot {
                command_buffer,
                image_available: Semaphore::new(device.clone())?,
                render_finished: Semaphore::new(device.clone())?,
                in_flight: Fence::new(device.clone(), true)?,
                global_descriptor_set,
                uniform_offset,
            });
        }

        let models = ModelManager::new(&context, &command_pool)?;
        DescriptorSetWriter::new(material_set)
            .write_images(0, &models.textures().descriptor_images()?)
            .update(&device, &descriptor_layouts.material)?;

        let extent = swapchain.extent();
        let mut camera = Camera::perspective(Vec3::new(0.0, 2.0, 6.0), 45.0, 1.0, 0.1, 100.0);
        camera.set_viewport_size(extent.width, extent.height);
        camera.look_at(Vec3::zeros());

        log::info!(
            "Renderer ready on {}: {}x{}, {:?} samples, {} frames in flight",
            context.device_name,
            extent.width,
            extent.height,
            samples,
            MAX_FRAMES_IN_FLIGHT
        );

        Ok(Self {
            overlay: None,
            models,
            frames,
            descriptor_pool,
            material_set,
            global_uniforms,
            pipeline,
            descriptor_layouts,
            targets: Some(targets),
            swapchain: Some(swapchain),
            render_pass,
            command_pool,
            context,
            tracker: FrameTracker::new(),
            swapchain_state: SwapchainState::Valid,
            camera,
            light: DirectionalLight::default(),
            clear_color: config.clear_color,
            prefer_low_latency: config.prefer_low_latency_present,
            material_override: None,
        })
    }

    fn build_scene_pipeline(
        context: &DeviceContext,
        config: &RendererConfig,
        render_pass: &RenderPass,
        layouts: &SceneDescriptorLayouts,
    ) -> EngineResult<Pipeline> {
        let vertex = ShaderStageDesc {
            stage: vk::ShaderStageFlags::VERTEX,
            code: assets::read_binary(&config.shaders.vertex_shader_path)?,
            label: config.shaders.vertex_shader_path.clone(),
        };
        let fragment = ShaderStageDesc {
            stage: vk::ShaderStageFlags::FRAGMENT,
            code: assets::read_binary(&config.shaders.fragment_shader_path)?,
            label: config.shaders.fragment_shader_path.clone(),
        };

        let layout = PipelineLayoutDesc {
            set_layouts: layouts.handles().to_vec(),
            push_constant_ranges: vec![vk::PushConstantRange {
                stage_flags: vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT,
                offset: 0,
                size: size_of::<ObjectPushConstants>() as u32,
            }],
        };

        let samples = render_pass.samples();
        let desc = PipelineDesc::Graphics(GraphicsPipelineDesc {
            vertex,
            fragment,
            render_pass: render_pass.handle(),
            samples,
            sample_shading: samples != vk::SampleCountFlags::TYPE_1
                && context
                    .capabilities
                    .enabled_features
                    .contains(DeviceFeatureFlags::SAMPLE_RATE_SHADING),
            vertex_bindings: SceneVertexLayout::bindings().to_vec(),
            vertex_attributes: SceneVertexLayout::attributes().to_vec(),
            cull_mode: vk::CullModeFlags::BACK,
            front_face: vk::FrontFace::COUNTER_CLOCKWISE,
            depth_test: true,
        });

        Ok(Pipeline::build(&context.device, &layout, &desc)?)
    }

    /// Place a model; its mesh and texture are deduplicated by path
    ///
    /// The texture upload happens immediately. Geometry reaches the GPU on
    /// the next [`Self::upload_scene`] or frame.
    pub fn add_model(
        &mut self,
        mesh_path: impl AsRef<Path>,
        texture_path: Option<impl AsRef<Path>>,
        transform: Mat4,
    ) -> EngineResult<ModelHandle> {
        let texture_path: Option<&Path> = texture_path.as_ref().map(|path| path.as_ref());
        self.models
            .add_model(&self.context, &self.command_pool, mesh_path, texture_path, transform)
    }

    /// Move a placed model
    pub fn set_instance_transform(&mut self, handle: ModelHandle, transform: Mat4) -> VulkanResult<()> {
        self.models.set_transform(handle, transform)
    }

    /// Rebuild stale scene buffers and rewrite the material descriptor set
    ///
    /// Waits for the device to go idle first, so no in-flight frame reads a
    /// buffer being replaced.
    pub fn upload_scene(&mut self) -> VulkanResult<()> {
        self.sync_scene()?;
        log::info!(
            "Scene uploaded: {} models, {} meshes, {} textures",
            self.models.len(),
            self.models.meshes().registry().mesh_count(),
            self.models.textures().len()
        );
        Ok(())
    }

    fn sync_scene(&mut self) -> VulkanResult<()> {
        self.context.wait_idle()?;
        self.models.upload(&self.context, &self.command_pool)?;
        DescriptorSetWriter::new(self.material_set)
            .write_images(0, &self.models.textures().descriptor_images()?)
            .update(&self.context.device, &self.descriptor_layouts.material)
    }

    /// Attach a UI overlay drawn after the scene
    pub fn set_overlay(&mut self, overlay: Box<dyn UiOverlay>) {
        self.overlay = Some(overlay);
    }

    /// Mutable access to the camera
    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    /// Camera
    pub const fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Replace the scene light
    pub fn set_light(&mut self, light: DirectionalLight) {
        self.light = light;
    }

    /// Sample one material slot for every instance, or `None` for each
    /// instance's own texture
    pub fn set_material_override(&mut self, material: Option<u32>) -> VulkanResult<()> {
        if let Some(slot) = material {
            let loaded = self.models.textures().len();
            if slot as usize >= loaded {
                return Err(VulkanError::InvalidOperation {
                    reason: format!("material slot {slot} is not loaded ({loaded} textures)"),
                });
            }
        }
        self.material_override = material;
        Ok(())
    }

    /// Active material override
    pub const fn material_override(&self) -> Option<u32> {
        self.material_override
    }

    /// Model manager
    pub const fn models(&self) -> &ModelManager {
        &self.models
    }

    /// Frames presented so far
    pub const fn frame_number(&self) -> u64 {
        self.tracker.frame_number()
    }

    /// Current swapchain extent
    pub fn extent(&self) -> vk::Extent2D {
        self.swapchain.as_ref().map_or_else(vk::Extent2D::default, Swapchain::extent)
    }

    /// Block until the GPU has finished all submitted work
    pub fn wait_idle(&self) -> VulkanResult<()> {
        self.context.wait_idle()
    }

    fn swapchain(&self) -> VulkanResult<&Swapchain> {
        self.swapchain.as_ref().ok_or_else(|| VulkanError::InvalidOperation {
            reason: "swapchain is missing after a failed recreation".to_string(),
        })
    }

    /// Draw one frame
    ///
    /// Staleness from acquire, present or a window resize is handled by
    /// recreating the swapchain; any other Vulkan failure is returned.
    pub fn draw_frame(&mut self, window: &mut Window) -> EngineResult<FrameOutcome> {
        let extent = window_extent(window);
        if extent.width == 0 || extent.height == 0 {
            return Ok(FrameOutcome::SkippedMinimized);
        }

        if window.is_framebuffer_resized() {
            window.clear_framebuffer_resized();
            self.swapchain_state.invalidate();
        }
        if self.swapchain_state.needs_recreation() {
            self.recreate_swapchain(extent)?;
            return Ok(FrameOutcome::SkippedSwapchainRecreated);
        }

        if self.models.needs_upload() {
            log::trace!("Scene changed, re-uploading before frame {}", self.tracker.frame_number());
            self.sync_scene()?;
        }

        let slot = self.tracker.current_slot();
        self.frames[slot].in_flight.wait()?;
        self.tracker.fence_waited()?;

        let acquired = self
            .swapchain()?
            .acquire_next_image(self.frames[slot].image_available.handle());
        let image_index = match classify_acquire(acquired) {
            AcquireOutcome::Draw { image_index, stale } => {
                if stale {
                    self.swapchain_state.invalidate();
                }
                image_index
            }
            AcquireOutcome::OutOfDate => {
                // Fence untouched, so the retry can wait on it again
                self.tracker.abort();
                self.swapchain_state.invalidate();
                self.recreate_swapchain(extent)?;
                return Ok(FrameOutcome::SkippedSwapchainRecreated);
            }
            AcquireOutcome::Failed(result) => {
                return Err(VulkanError::RenderFailure {
                    stage: "acquire swapchain image",
                    result,
                }
                .into())
            }
        };

        self.tracker.begin_recording()?;
        let uniforms = scene_uniforms(&self.camera, &self.light);
        self.global_uniforms
            .write(self.frames[slot].uniform_offset, std::slice::from_ref(&uniforms))?;
        let command_buffer = self.record_frame(slot, image_index)?;

        let frame = &self.frames[slot];
        frame.in_flight.reset()?;
        let wait_semaphores = [frame.image_available.handle()];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let command_buffers = [command_buffer];
        let signal_semaphores = [frame.render_finished.handle()];
        let submit_info = vk::SubmitInfo::builder()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores)
            .build();
        unsafe {
            self.context
                .device
                .queue_submit(self.context.graphics_queue, &[submit_info], frame.in_flight.handle())
        }
        .map_err(VulkanError::render("queue submit"))?;
        self.tracker.submitted()?;

        self.tracker.begin_present()?;
        let presented = self.swapchain()?.present(
            self.context.present_queue,
            image_index,
            self.frames[slot].render_finished.handle(),
        );
        if classify_present(presented).map_err(VulkanError::render("queue present"))? {
            self.swapchain_state.invalidate();
        }
        self.tracker.advance()?;
        log::trace!("Frame {} presented (image {image_index}, slot {slot})", self.tracker.frame_number());

        if self.swapchain_state.needs_recreation() {
            self.recreate_swapchain(extent)?;
        }
        Ok(FrameOutcome::Presented)
    }

    fn record_frame(&mut self, slot: usize, image_index: u32) -> VulkanResult<vk::CommandBuffer> {
        let swapchain = self.swapchain.as_ref().ok_or_else(|| VulkanError::InvalidOperation {
            reason: "no swapchain to record against".to_string(),
        })?;
        let targets = self.targets.as_ref().ok_or_else(|| VulkanError::InvalidOperation {
            reason: "no render targets to record against".to_string(),
        })?;
        let frame = &self.frames[slot];
        let extent = swapchain.extent();

        let clear_values = [
            vk::ClearValue {
                color: vk::ClearColorValue {
                    float32: self.clear_color,
                },
            },
            vk::ClearValue {
                depth_stencil: vk::ClearDepthStencilValue { depth: 1.0, stencil: 0 },
            },
        ];
        let render_area = vk::Rect2D {
            offset: vk::Offset2D { x: 0, y: 0 },
            extent,
        };
        let viewport = vk::Viewport {
            x: 0.0,
            y: 0.0,
            width: extent.width as f32,
            height: extent.height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        };

        let mut recorder = CommandRecorder::begin(&self.context.device, frame.command_buffer)?;
        {
            let mut pass = recorder.begin_render_pass(
                self.render_pass.handle(),
                targets.framebuffer(image_index)?,
                render_area,
                &clear_values,
            );
            pass.set_viewport(viewport);
            pass.set_scissor(render_area);
            pass.bind_pipeline(self.pipeline.handle());
            pass.bind_descriptor_sets(
                self.pipeline.layout(),
                0,
                &[frame.global_descriptor_set, self.material_set],
                &[],
            );
            pass.push_constants(
                self.pipeline.layout(),
                vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT,
                0,
                bytemuck::bytes_of(&ObjectPushConstants::with_override(self.material_override)),
            );
            self.models.record_draw(&mut pass);

            if let Some(overlay) = self.overlay.as_deref_mut() {
                let overlay_frame = OverlayFrame {
                    frame_number: self.tracker.frame_number(),
                    frame_slot: slot,
                    viewport,
                    display_size: [viewport.width, viewport.height],
                };
                overlay.record(pass.device(), pass.command_buffer(), &overlay_frame)?;
            }
        }
        recorder.end()
    }

    /// Rebuild the swapchain and its render targets, keeping the render pass
    fn recreate_swapchain(&mut self, extent: vk::Extent2D) -> VulkanResult<()> {
        self.swapchain_state.begin_recreate()?;
        self.context.wait_idle()?;

        self.targets = None;
        let retired = self.swapchain.take();
        let swapchain = Swapchain::new(
            &self.context,
            extent,
            self.prefer_low_latency,
            retired.as_ref().map_or_else(vk::SwapchainKHR::null, Swapchain::handle),
        )
        .map_err(VulkanError::swapchain_failure("swapchain"))?;
        drop(retired);

        let targets = RenderTargets::new(&self.context, &self.render_pass, &swapchain)
            .map_err(VulkanError::swapchain_failure("render targets"))?;

        let new_extent = swapchain.extent();
        self.camera.set_viewport_size(new_extent.width, new_extent.height);
        if let Some(overlay) = self.overlay.as_deref_mut() {
            overlay.on_swapchain_recreated(new_extent);
        }

        log::info!(
            "Swapchain recreated: {}x{}, {} images",
            new_extent.width,
            new_extent.height,
            swapchain.image_count()
        );
        self.swapchain = Some(swapchain);
        self.targets = Some(targets);
        self.swapchain_state.finish_recreate();
        Ok(())
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        if let Err(e) = self.context.wait_idle() {
            log::warn!("Device did not go idle before renderer teardown: {e}");
        }
        log::debug!("Renderer teardown after {} frames", self.tracker.frame_number());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_scene_uniforms_pack_light_and_camera() {
        let camera = Camera::perspective(Vec3::new(1.0, 2.0, 3.0), 60.0, 1.5, 0.1, 50.0);
        let light = DirectionalLight::new(Vec3::new(0.0, -2.0, 0.0), Vec3::new(1.0, 0.5, 0.25), 3.0);

        let uniforms = scene_uniforms(&camera, &light);

        assert_eq!(uniforms.camera_position, [1.0, 2.0, 3.0, 1.0]);
        assert_relative_eq!(uniforms.light_direction[1], -1.0);
        assert_eq!(uniforms.light_color, [1.0, 0.5, 0.25, 3.0]);
        assert_eq!(uniforms.view, to_cols_array(&camera.view_matrix()));
    }

    #[test]
    fn test_slot_slices_do_not_overlap() {
        let stride = pad_uniform_buffer_size(GLOBAL_UNIFORMS_SIZE, 256).unwrap();
        assert_eq!(stride, 256);
        let offsets: Vec<_> = (0..MAX_FRAMES_IN_FLIGHT as u64).map(|slot| slot * stride).collect();
        for pair in offsets.windows(2) {
            assert!(pair[0] + GLOBAL_UNIFORMS_SIZE <= pair[1]);
        }
    }

    #[test]
    fn test_suboptimal_acquire_draws_then_recreates() {
        assert_eq!(
            classify_acquire(Ok((2, true))),
            AcquireOutcome::Draw {
                image_index: 2,
                stale: true
            }
        );
        assert_eq!(
            classify_acquire(Ok((0, false))),
            AcquireOutcome::Draw {
                image_index: 0,
                stale: false
            }
        );
    }

    #[test]
    fn test_out_of_date_acquire_skips_frame() {
        assert_eq!(classify_acquire(Err(vk::Result::ERROR_OUT_OF_DATE_KHR)), AcquireOutcome::OutOfDate);
        assert_eq!(
            classify_acquire(Err(vk::Result::ERROR_DEVICE_LOST)),
            AcquireOutcome::Failed(vk::Result::ERROR_DEVICE_LOST)
        );
    }

    #[test]
    fn test_present_staleness() {
        assert_eq!(classify_present(Ok(false)), Ok(false));
        assert_eq!(classify_present(Ok(true)), Ok(true));
        assert_eq!(classify_present(Err(vk::Result::ERROR_OUT_OF_DATE_KHR)), Ok(true));
        assert_eq!(
            classify_present(Err(vk::Result::ERROR_SURFACE_LOST_KHR)),
            Err(vk::Result::ERROR_SURFACE_LOST_KHR)
        );
    }
}
