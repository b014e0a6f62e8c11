//! Engine-level error type unifying every subsystem's failures

use thiserror::Error;

use crate::assets::AssetError;
use crate::config::ConfigError;
use crate::platform::WindowError;
use crate::render::backends::vulkan::VulkanError;

/// Top-level engine error
#[derive(Error, Debug)]
pub enum EngineError {
    /// Failure reported by the Vulkan backend
    #[error(transparent)]
    Vulkan(#[from] VulkanError),

    /// Failure loading a mesh, image or shader file
    #[error(transparent)]
    Asset(#[from] AssetError),

    /// Failure creating or driving the window
    #[error(transparent)]
    Window(#[from] WindowError),

    /// Failure loading or validating configuration
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
