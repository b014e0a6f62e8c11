//! Vulkan backend
//!
//! - `initialization`: instance, physical device selection, logical device
//! - `resources`: buffers, images and descriptor sets
//! - `rendering`: command recording, render pass and pipelines
//! - `state`: swapchain, render targets and frame-in-flight slots

pub mod error;
pub mod initialization;
pub mod rendering;
pub mod resources;
pub mod state;

mod renderer;

pub use error::{VulkanError, VulkanResult};
pub use renderer::{classify_acquire, classify_present, scene_uniforms, AcquireOutcome, FrameOutcome, Renderer};
