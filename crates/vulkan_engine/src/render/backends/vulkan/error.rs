//! Vulkan backend error types

use ash::vk;
use thiserror::Error;

/// Vulkan-specific error types
#[derive(Error, Debug)]
pub enum VulkanError {
    /// General Vulkan API error with result code
    #[error("Vulkan API error: {0:?}")]
    Api(vk::Result),

    /// No physical device survived scoring
    #[error("No suitable GPU found among {candidates} candidate(s)")]
    NoSuitableDevice {
        /// Number of devices that were evaluated
        candidates: usize,
    },

    /// The device lacks a graphics or a present queue family
    #[error("Incomplete queue families (graphics: {graphics:?}, present: {present:?})")]
    IncompleteQueueFamilies {
        /// First graphics-capable family, if any
        graphics: Option<u32>,
        /// First present-capable family, if any
        present: Option<u32>,
    },

    /// The window system could not create a surface
    #[error("Surface creation failed: {0}")]
    SurfaceCreation(String),

    /// Swapchain creation or recreation failed
    #[error("Swapchain creation failed: {0}")]
    SwapchainCreationFailure(String),

    /// Shader bytecode could not be read, parsed or turned into a module
    #[error("Shader module creation failed for {path}: {reason}")]
    ShaderModuleCreationFailure {
        /// Shader file
        path: String,
        /// Loader or driver diagnostic
        reason: String,
    },

    /// Pipeline or pipeline layout creation failed
    #[error("Pipeline creation failed: {0}")]
    PipelineCreation(String),

    /// Descriptor layout, pool or set creation failed
    #[error("Descriptor creation failed: {0}")]
    DescriptorCreation(String),

    /// A descriptor write disagrees with its layout
    #[error("Descriptor write does not match layout: {0}")]
    DescriptorMismatch(String),

    /// Buffer or image memory could not be allocated
    #[error("Allocation of {requested} bytes failed: {reason}")]
    AllocationFailure {
        /// Requested size in bytes
        requested: u64,
        /// What went wrong
        reason: String,
    },

    /// No memory type satisfies the requirements
    #[error("No suitable memory type found")]
    NoSuitableMemoryType,

    /// The image layout transition has no barrier mapping
    #[error("Unsupported layout transition {from:?} -> {to:?}")]
    UnsupportedLayoutTransition {
        /// Current layout
        from: vk::ImageLayout,
        /// Requested layout
        to: vk::ImageLayout,
    },

    /// The format cannot be blitted with linear filtering
    #[error("Mipmap generation unsupported: {0:?} lacks linear blit support")]
    MipmapUnsupported(vk::Format),

    /// Allocating, beginning, ending or submitting a command buffer failed
    #[error("Command buffer {stage} failed: {result:?}")]
    CommandBufferError {
        /// Which step failed
        stage: &'static str,
        /// Driver result
        result: vk::Result,
    },

    /// A hard failure inside the frame loop
    #[error("Render failure during {stage}: {result:?}")]
    RenderFailure {
        /// Which step failed
        stage: &'static str,
        /// Driver result
        result: vk::Result,
    },

    /// Vulkan context initialization failed
    #[error("Initialization failed: {0}")]
    InitializationFailed(String),

    /// Invalid operation attempted
    #[error("Invalid operation: {reason}")]
    InvalidOperation {
        /// Description of why the operation is invalid
        reason: String,
    },
}

impl VulkanError {
    /// Map a raw result into [`VulkanError::CommandBufferError`] for `stage`
    pub(crate) fn command(stage: &'static str) -> impl FnOnce(vk::Result) -> Self {
        move |result| Self::CommandBufferError { stage, result }
    }

    /// Map a raw result into [`VulkanError::RenderFailure`] for `stage`
    pub(crate) fn render(stage: &'static str) -> impl FnOnce(vk::Result) -> Self {
        move |result| Self::RenderFailure { stage, result }
    }

    /// Map a raw allocation result for a request of `requested` bytes
    pub(crate) fn allocation(requested: u64) -> impl FnOnce(vk::Result) -> Self {
        move |result| Self::AllocationFailure {
            requested,
            reason: format!("{result:?}"),
        }
    }

    /// Fold any failure while rebuilding the swapchain into
    /// [`VulkanError::SwapchainCreationFailure`], tagged with `stage`
    pub(crate) fn swapchain_failure(stage: &'static str) -> impl FnOnce(Self) -> Self {
        move |error| match error {
            Self::SwapchainCreationFailure(_) => error,
            other => Self::SwapchainCreationFailure(format!("{stage}: {other}")),
        }
    }
}

/// Result type for Vulkan operations
pub type VulkanResult<T> = Result<T, VulkanError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_swapchain_failure_wraps_driver_errors() {
        let error = VulkanError::swapchain_failure("swapchain")(VulkanError::Api(vk::Result::ERROR_SURFACE_LOST_KHR));
        match error {
            VulkanError::SwapchainCreationFailure(message) => {
                assert!(message.starts_with("swapchain: "));
                assert!(message.contains("ERROR_SURFACE_LOST_KHR"));
            }
            other => panic!("expected a swapchain failure, got {other:?}"),
        }
    }

    #[test]
    fn test_swapchain_failure_is_not_wrapped_twice() {
        let inner = VulkanError::SwapchainCreationFailure("no formats".to_string());
        let error = VulkanError::swapchain_failure("swapchain")(inner);
        assert_eq!(error.to_string(), "Swapchain creation failed: no formats");
    }
}
