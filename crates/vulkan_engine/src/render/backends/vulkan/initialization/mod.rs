//! Vulkan instance and device initialization

pub mod device;
pub mod instance;

pub use device::{
    resolve_queue_families, score_candidate, select_device, DeviceCandidate, DeviceCapabilities,
    DeviceContext, DeviceFeatureFlags, QueueFamilyIndices, QueueFamilySupport,
};
pub use instance::VulkanInstance;
