//! Command recording, render pass and pipeline construction

pub mod commands;
pub mod pipeline;
pub mod render_pass;
pub mod vertex_layout;

pub use commands::{ActiveRenderPass, CommandPool, CommandRecorder};
pub use pipeline::{GraphicsPipelineDesc, Pipeline, PipelineDesc, PipelineLayoutDesc, ShaderModule, ShaderStageDesc};
pub use render_pass::{attachment_count, RenderPass};
pub use vertex_layout::{SceneVertexLayout, INSTANCE_BINDING, VERTEX_BINDING};
