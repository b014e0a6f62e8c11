//! Shader modules and pipeline construction
//!
//! Graphics and compute pipelines are described by one [`PipelineDesc`] enum
//! and built by [`Pipeline::build`]. Shader modules live only for the
//! duration of the build.

use std::ffi::CStr;
use std::io::Cursor;

use ash::{vk, Device};

use crate::render::backends::vulkan::{VulkanError, VulkanResult};

const ENTRY_POINT: &CStr = c"main";

/// Shader module wrapper with RAII cleanup
pub struct ShaderModule {
    device: Device,
    module: vk::ShaderModule,
}

impl ShaderModule {
    /// Create a shader module from SPIR-V bytecode
    ///
    /// `label` names the source in error messages.
    pub fn from_bytes(device: Device, bytes: &[u8], label: &str) -> VulkanResult<Self> {
        let failure = |reason: String| VulkanError::ShaderModuleCreationFailure {
            path: label.to_string(),
            reason,
        };

        let code = ash::util::read_spv(&mut Cursor::new(bytes)).map_err(|e| failure(e.to_string()))?;
        if code.is_empty() {
            return Err(failure("empty bytecode".to_string()));
        }

        let create_info = vk::ShaderModuleCreateInfo::builder().code(&code);
        let module = unsafe { device.create_shader_module(&create_info, None) }.map_err(|e| failure(format!("{e:?}")))?;

        Ok(Self { device, module })
    }

    /// Get shader module handle
    pub const fn handle(&self) -> vk::ShaderModule {
        self.module
    }

    fn stage_info(&self, stage: vk::ShaderStageFlags) -> vk::PipelineShaderStageCreateInfo {
        vk::PipelineShaderStageCreateInfo::builder()
            .stage(stage)
            .module(self.module)
            .name(ENTRY_POINT)
            .build()
    }
}

impl Drop for ShaderModule {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_shader_module(self.module, None);
        }
    }
}

/// One shader stage's bytecode
#[derive(Debug, Clone)]
pub struct ShaderStageDesc {
    /// Stage the module runs in
    pub stage: vk::ShaderStageFlags,
    /// SPIR-V bytes
    pub code: Vec<u8>,
    /// Source name for diagnostics
    pub label: String,
}

/// Descriptor set layouts and push constant ranges of a pipeline layout
#[derive(Debug, Clone, Default)]
pub struct PipelineLayoutDesc {
    /// Set layouts in set order
    pub set_layouts: Vec<vk::DescriptorSetLayout>,
    /// Push constant ranges
    pub push_constant_ranges: Vec<vk::PushConstantRange>,
}

/// Fixed-function and shader state of a graphics pipeline
#[derive(Debug, Clone)]
pub struct GraphicsPipelineDesc {
    /// Vertex stage
    pub vertex: ShaderStageDesc,
    /// Fragment stage
    pub fragment: ShaderStageDesc,
    /// Render pass the pipeline is used in (subpass 0)
    pub render_pass: vk::RenderPass,
    /// Rasterization sample count, matching the render pass
    pub samples: vk::SampleCountFlags,
    /// Enable per-sample shading when the device allows it
    pub sample_shading: bool,
    /// Vertex input bindings
    pub vertex_bindings: Vec<vk::VertexInputBindingDescription>,
    /// Vertex input attributes
    pub vertex_attributes: Vec<vk::VertexInputAttributeDescription>,
    /// Face culling
    pub cull_mode: vk::CullModeFlags,
    /// Winding of front faces
    pub front_face: vk::FrontFace,
    /// Depth test and write
    pub depth_test: bool,
}

/// A pipeline to build
#[derive(Debug, Clone)]
pub enum PipelineDesc {
    /// Rasterization pipeline
    Graphics(GraphicsPipelineDesc),
    /// Compute pipeline
    Compute {
        /// Compute stage
        shader: ShaderStageDesc,
    },
}

impl PipelineDesc {
    /// Bind point the built pipeline uses
    pub const fn bind_point(&self) -> vk::PipelineBindPoint {
        match self {
            Self::Graphics(_) => vk::PipelineBindPoint::GRAPHICS,
            Self::Compute { .. } => vk::PipelineBindPoint::COMPUTE,
        }
    }

    /// Shader stages in pipeline order
    pub fn stages(&self) -> Vec<&ShaderStageDesc> {
        match self {
            Self::Graphics(desc) => vec![&desc.vertex, &desc.fragment],
            Self::Compute { shader } => vec![shader],
        }
    }
}

/// Pipeline and its layout, destroyed together
pub struct Pipeline {
    device: Device,
    pipeline: vk::Pipeline,
    layout: vk::PipelineLayout,
    bind_point: vk::PipelineBindPoint,
}

impl Pipeline {
    /// Build a pipeline and its layout
    ///
    /// Shader modules are created from the stage bytecode and destroyed as
    /// soon as the pipeline exists.
    pub fn build(device: &Device, layout_desc: &PipelineLayoutDesc, desc: &PipelineDesc) -> VulkanResult<Self> {
        let modules = desc
            .stages()
            .into_iter()
            .map(|stage| ShaderModule::from_bytes(device.clone(), &stage.code, &stage.label))
            .collect::<VulkanResult<Vec<_>>>()?;

        let layout_info = vk::PipelineLayoutCreateInfo::builder()
            .set_layouts(&layout_desc.set_layouts)
            .push_constant_ranges(&layout_desc.push_constant_ranges);
        let layout = unsafe { device.create_pipeline_layout(&layout_info, None) }
            .map_err(|e| VulkanError::PipelineCreation(format!("layout: {e:?}")))?;

        let pipeline = match desc {
            PipelineDesc::Graphics(graphics) => Self::create_graphics(device, layout, graphics, &modules),
            PipelineDesc::Compute { shader } => Self::create_compute(device, layout, shader.stage, &modules[0]),
        };

        // Modules are no longer needed once the pipeline is baked
        drop(modules);

        match pipeline {
            Ok(pipeline) => Ok(Self {
                device: device.clone(),
                pipeline,
                layout,
                bind_point: desc.bind_point(),
            }),
            Err(e) => {
                unsafe { device.destroy_pipeline_layout(layout, None) };
                Err(e)
            }
        }
    }

    fn create_graphics(
        device: &Device,
        layout: vk::PipelineLayout,
        desc: &GraphicsPipelineDesc,
        modules: &[ShaderModule],
    ) -> VulkanResult<vk::Pipeline> {
        let stages = [
            modules[0].stage_info(desc.vertex.stage),
            modules[1].stage_info(desc.fragment.stage),
        ];

        let vertex_input = vk::PipelineVertexInputStateCreateInfo::builder()
            .vertex_binding_descriptions(&desc.vertex_bindings)
            .vertex_attribute_descriptions(&desc.vertex_attributes);

        let input_assembly = vk::PipelineInputAssemblyStateCreateInfo::builder()
            .topology(vk::PrimitiveTopology::TRIANGLE_LIST)
            .primitive_restart_enable(false);

        // Viewport and scissor are dynamic so the pipeline survives swapchain recreation
        let viewport_state = vk::PipelineViewportStateCreateInfo::builder()
            .viewport_count(1)
            .scissor_count(1);
        let dynamic_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
        let dynamic_state = vk::PipelineDynamicStateCreateInfo::builder().dynamic_states(&dynamic_states);

        let rasterizer = vk::PipelineRasterizationStateCreateInfo::builder()
            .depth_clamp_enable(false)
            .rasterizer_discard_enable(false)
            .polygon_mode(vk::PolygonMode::FILL)
            .line_width(1.0)
            .cull_mode(desc.cull_mode)
            .front_face(desc.front_face)
            .depth_bias_enable(false);

        let multisampling = vk::PipelineMultisampleStateCreateInfo::builder()
            .sample_shading_enable(desc.sample_shading)
            .min_sample_shading(if desc.sample_shading { 0.2 } else { 1.0 })
            .rasterization_samples(desc.samples);

        let depth_stencil = vk::PipelineDepthStencilStateCreateInfo::builder()
            .depth_test_enable(desc.depth_test)
            .depth_write_enable(desc.depth_test)
            .depth_compare_op(vk::CompareOp::LESS)
            .depth_bounds_test_enable(false)
            .stencil_test_enable(false);

        let color_blend_attachments = [vk::PipelineColorBlendAttachmentState::builder()
            .color_write_mask(vk::ColorComponentFlags::RGBA)
            .blend_enable(false)
            .build()];
        let color_blending = vk::PipelineColorBlendStateCreateInfo::builder()
            .logic_op_enable(false)
            .attachments(&color_blend_attachments);

        let pipeline_info = vk::GraphicsPipelineCreateInfo::builder()
            .stages(&stages)
            .vertex_input_state(&vertex_input)
            .input_assembly_state(&input_assembly)
            .viewport_state(&viewport_state)
            .rasterization_state(&rasterizer)
            .multisample_state(&multisampling)
            .depth_stencil_state(&depth_stencil)
            .color_blend_state(&color_blending)
            .dynamic_state(&dynamic_state)
            .layout(layout)
            .render_pass(desc.render_pass)
            .subpass(0)
            .build();

        let pipelines = unsafe { device.create_graphics_pipelines(vk::PipelineCache::null(), &[pipeline_info], None) }
            .map_err(|(_, e)| VulkanError::PipelineCreation(format!("graphics pipeline: {e:?}")))?;
        pipelines
            .into_iter()
            .next()
            .ok_or_else(|| VulkanError::PipelineCreation("driver returned no pipeline".to_string()))
    }

    fn create_compute(
        device: &Device,
        layout: vk::PipelineLayout,
        stage: vk::ShaderStageFlags,
        module: &ShaderModule,
    ) -> VulkanResult<vk::Pipeline> {
        let pipeline_info = vk::ComputePipelineCreateInfo::builder()
            .stage(module.stage_info(stage))
            .layout(layout)
            .build();

        let pipelines = unsafe { device.create_compute_pipelines(vk::PipelineCache::null(), &[pipeline_info], None) }
            .map_err(|(_, e)| VulkanError::PipelineCreation(format!("compute pipeline: {e:?}")))?;
        pipelines
            .into_iter()
            .next()
            .ok_or_else(|| VulkanError::PipelineCreation("driver returned no pipeline".to_string()))
    }

    /// Get pipeline handle
    pub const fn handle(&self) -> vk::Pipeline {
        self.pipeline
    }

    /// Get pipeline layout handle
    pub const fn layout(&self) -> vk::PipelineLayout {
        self.layout
    }

    /// Graphics or compute
    pub const fn bind_point(&self) -> vk::PipelineBindPoint {
        self.bind_point
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_pipeline(self.pipeline, None);
            self.device.destroy_pipeline_layout(self.layout, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stage(stage: vk::ShaderStageFlags, label: &str) -> ShaderStageDesc {
        ShaderStageDesc {
            stage,
            code: Vec::new(),
            label: label.to_string(),
        }
    }

    #[test]
    fn test_compute_desc_has_one_stage() {
        let desc = PipelineDesc::Compute {
            shader: stage(vk::ShaderStageFlags::COMPUTE, "cull.comp.spv"),
        };
        assert_eq!(desc.bind_point(), vk::PipelineBindPoint::COMPUTE);
        assert_eq!(desc.stages().len(), 1);
    }

    #[test]
    fn test_graphics_desc_orders_vertex_then_fragment() {
        let desc = PipelineDesc::Graphics(GraphicsPipelineDesc {
            vertex: stage(vk::ShaderStageFlags::VERTEX, "scene.vert.spv"),
            fragment: stage(vk::ShaderStageFlags::FRAGMENT, "scene.frag.spv"),
            render_pass: vk::RenderPass::null(),
            samples: vk::SampleCountFlags::TYPE_1,
            sample_shading: false,
            vertex_bindings: Vec::new(),
            vertex_attributes: Vec::new(),
            cull_mode: vk::CullModeFlags::BACK,
            front_face: vk::FrontFace::COUNTER_CLOCKWISE,
            depth_test: true,
        });

        let labels: Vec<&str> = desc.stages().iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["scene.vert.spv", "scene.frag.spv"]);
        assert_eq!(desc.bind_point(), vk::PipelineBindPoint::GRAPHICS);
    }

    #[test]
    fn test_spirv_parse_rejects_misaligned_bytes() {
        let code = ash::util::read_spv(&mut Cursor::new(&[0x03, 0x02, 0x23][..]));
        assert!(code.is_err());
    }
}
