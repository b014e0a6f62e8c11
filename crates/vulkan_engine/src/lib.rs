//! # Vulkan Engine
//!
//! A Vulkan rendering engine built directly on `ash`, focused on the GPU
//! resource and frame lifecycle.
//!
//! ## Features
//!
//! - **Device Selection**: Ranked physical device scoring with mandatory feature checks
//! - **Frames in Flight**: Two frame slots, each owning its command buffer, semaphores and fence
//! - **Swapchain Recreation**: Resize and out-of-date handling without dropping the render pass
//! - **Batched Drawing**: Deduplicated meshes merged into one indirect, instanced draw call
//! - **Staged Uploads**: Device-local buffers and mipmapped textures filled through staging buffers
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use vulkan_engine::prelude::*;
//!
//! fn main() -> Result<(), EngineError> {
//!     vulkan_engine::foundation::logging::init();
//!
//!     let config = RendererConfig::default();
//!     let mut window = Window::new(&config.window)?;
//!     let mut renderer = Renderer::new(&mut window, &config)?;
//!
//!     renderer.add_model("models/cube.obj", Some("textures/crate.png"), Mat4::identity())?;
//!     renderer.upload_scene()?;
//!
//!     while !window.should_close() {
//!         window.poll_events();
//!         renderer.draw_frame(&mut window)?;
//!     }
//!     renderer.wait_idle()?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

// Core engine modules
pub mod core;

pub mod assets;
pub mod config;
pub mod foundation;
pub mod platform;
pub mod render;

mod error;

pub use error::{EngineError, EngineResult};

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        core::config::{RendererConfig, ShaderConfig, WindowConfig},
        foundation::{
            math::{Mat4, Vec3},
            time::Timer,
        },
        platform::{InputSnapshot, InputState, Window},
        render::{
            backends::vulkan::{FrameOutcome, Renderer},
            Camera, DirectionalLight, FlyCameraController, ModelHandle, UiOverlay,
        },
        EngineError, EngineResult,
    };
}
