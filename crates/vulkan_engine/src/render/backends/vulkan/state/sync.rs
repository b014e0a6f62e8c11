//! RAII wrappers for semaphores and fences

use ash::{vk, Device};

use crate::render::backends::vulkan::{VulkanError, VulkanResult};

/// GPU-GPU ordering primitive
pub struct Semaphore {
    device: Device,
    semaphore: vk::Semaphore,
}

impl Semaphore {
    /// Create an unsignaled binary semaphore
    pub fn new(device: Device) -> VulkanResult<Self> {
        let create_info = vk::SemaphoreCreateInfo::builder();
        let semaphore = unsafe { device.create_semaphore(&create_info, None) }.map_err(VulkanError::Api)?;
        Ok(Self { device, semaphore })
    }

    /// Semaphore handle
    pub const fn handle(&self) -> vk::Semaphore {
        self.semaphore
    }
}

impl Drop for Semaphore {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_semaphore(self.semaphore, None);
        }
    }
}

/// GPU-CPU completion primitive
pub struct Fence {
    device: Device,
    fence: vk::Fence,
}

impl Fence {
    /// Create a fence, optionally already signaled
    ///
    /// Frame fences start signaled so the first wait on each slot returns
    /// immediately.
    pub fn new(device: Device, signaled: bool) -> VulkanResult<Self> {
        let flags = if signaled {
            vk::FenceCreateFlags::SIGNALED
        } else {
            vk::FenceCreateFlags::empty()
        };
        let create_info = vk::FenceCreateInfo::builder().flags(flags);
        let fence = unsafe { device.create_fence(&create_info, None) }.map_err(VulkanError::Api)?;
        Ok(Self { device, fence })
    }

    /// Block until the fence is signaled
    pub fn wait(&self) -> VulkanResult<()> {
        unsafe { self.device.wait_for_fences(&[self.fence], true, u64::MAX) }
            .map_err(VulkanError::render("wait for frame fence"))
    }

    /// Return the fence to the unsignaled state
    pub fn reset(&self) -> VulkanResult<()> {
        unsafe { self.device.reset_fences(&[self.fence]) }.map_err(VulkanError::render("reset frame fence"))
    }

    /// Fence handle
    pub const fn handle(&self) -> vk::Fence {
        self.fence
    }
}

impl Drop for Fence {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_fence(self.fence, None);
        }
    }
}
