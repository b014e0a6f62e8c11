//! Buffer management
//!
//! A [`Buffer`] owns one `VkBuffer` and its dedicated allocation. Device-local
//! data goes through [`Buffer::device_local_with_data`], which stages the
//! bytes in a host-visible buffer sized to the payload and copies them with a
//! blocking one-shot command buffer.

use std::ptr::NonNull;

use ash::{vk, Device};
use bytemuck::Pod;

use crate::render::backends::vulkan::initialization::DeviceContext;
use crate::render::backends::vulkan::rendering::CommandPool;
use crate::render::backends::vulkan::{VulkanError, VulkanResult};

const HOST_MEMORY: vk::MemoryPropertyFlags = vk::MemoryPropertyFlags::from_raw(
    vk::MemoryPropertyFlags::HOST_VISIBLE.as_raw() | vk::MemoryPropertyFlags::HOST_COHERENT.as_raw(),
);

/// Round `size` up to the next multiple of `alignment`
///
/// `alignment` must be zero or a power of two, as Vulkan guarantees for
/// `minUniformBufferOffsetAlignment`. Zero means no alignment requirement.
/// Returns `None` when the padded size does not fit in a `u64`.
pub const fn pad_uniform_buffer_size(size: u64, alignment: u64) -> Option<u64> {
    if alignment == 0 {
        return Some(size);
    }
    match size.checked_add(alignment - 1) {
        Some(end) => Some(end & !(alignment - 1)),
        None => None,
    }
}

/// Buffer wrapper with memory management
pub struct Buffer {
    device: Device,
    buffer: vk::Buffer,
    memory: vk::DeviceMemory,
    size: vk::DeviceSize,
    properties: vk::MemoryPropertyFlags,
    mapped: Option<NonNull<u8>>,
}

impl Buffer {
    /// Create a buffer with its own memory allocation
    pub fn new(
        context: &DeviceContext,
        size: vk::DeviceSize,
        usage: vk::BufferUsageFlags,
        properties: vk::MemoryPropertyFlags,
    ) -> VulkanResult<Self> {
        if size == 0 {
            return Err(VulkanError::AllocationFailure {
                requested: 0,
                reason: "zero-sized buffer".to_string(),
            });
        }

        let device = context.device.clone();
        let buffer_info = vk::BufferCreateInfo::builder()
            .size(size)
            .usage(usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        let buffer = unsafe {
            device
                .create_buffer(&buffer_info, None)
                .map_err(VulkanError::allocation(size))?
        };

        let requirements = unsafe { device.get_buffer_memory_requirements(buffer) };
        let memory = context
            .find_memory_type(requirements.memory_type_bits, properties)
            .and_then(|memory_type_index| {
                let alloc_info = vk::MemoryAllocateInfo::builder()
                    .allocation_size(requirements.size)
                    .memory_type_index(memory_type_index);
                unsafe {
                    device
                        .allocate_memory(&alloc_info, None)
                        .map_err(VulkanError::allocation(requirements.size))
                }
            });

        let memory = match memory {
            Ok(memory) => memory,
            Err(e) => {
                unsafe { device.destroy_buffer(buffer, None) };
                return Err(e);
            }
        };

        if let Err(e) = unsafe { device.bind_buffer_memory(buffer, memory, 0) } {
            unsafe {
                device.destroy_buffer(buffer, None);
                device.free_memory(memory, None);
            }
            return Err(VulkanError::Api(e));
        }

        Ok(Self {
            device,
            buffer,
            memory,
            size,
            properties,
            mapped: None,
        })
    }

    /// Create a host-visible, coherent buffer
    pub fn host_visible(
        context: &DeviceContext,
        size: vk::DeviceSize,
        usage: vk::BufferUsageFlags,
    ) -> VulkanResult<Self> {
        Self::new(context, size, usage, HOST_MEMORY)
    }

    /// Create a device-local buffer filled with `data` through a staging copy
    ///
    /// Blocks until the transfer completes. The staging buffer is released
    /// before returning.
    pub fn device_local_with_data(
        context: &DeviceContext,
        pool: &CommandPool,
        usage: vk::BufferUsageFlags,
        data: &[u8],
    ) -> VulkanResult<Self> {
        let size = data.len() as vk::DeviceSize;
        let staging = Self::staging_with_data(context, data)?;
        let buffer = Self::new(
            context,
            size,
            usage | vk::BufferUsageFlags::TRANSFER_DST,
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
        )?;

        pool.one_shot(context.graphics_queue, |device, command_buffer| {
            let region = vk::BufferCopy { src_offset: 0, dst_offset: 0, size };
            unsafe { device.cmd_copy_buffer(command_buffer, staging.handle(), buffer.handle(), &[region]) };
            Ok(())
        })?;

        log::trace!("Uploaded {size} bytes to device-local buffer ({usage:?})");
        Ok(buffer)
    }

    /// Create a host-visible transfer source holding `data`
    pub fn staging_with_data(context: &DeviceContext, data: &[u8]) -> VulkanResult<Self> {
        let size = data.len() as vk::DeviceSize;
        let mut staging = Self::host_visible(context, size, vk::BufferUsageFlags::TRANSFER_SRC)?;
        staging.write_bytes(0, data)?;
        Ok(staging)
    }

    /// Map the whole buffer for the rest of its lifetime
    pub fn map_persistent(&mut self) -> VulkanResult<NonNull<u8>> {
        if let Some(ptr) = self.mapped {
            return Ok(ptr);
        }
        let ptr = self.map()?;
        self.mapped = Some(ptr);
        Ok(ptr)
    }

    fn map(&self) -> VulkanResult<NonNull<u8>> {
        if !self.properties.contains(vk::MemoryPropertyFlags::HOST_VISIBLE) {
            return Err(VulkanError::InvalidOperation {
                reason: "cannot map device-local buffer".to_string(),
            });
        }
        let ptr = unsafe {
            self.device
                .map_memory(self.memory, 0, self.size, vk::MemoryMapFlags::empty())
                .map_err(VulkanError::Api)?
        };
        NonNull::new(ptr.cast::<u8>()).ok_or_else(|| VulkanError::InvalidOperation {
            reason: "vkMapMemory returned null".to_string(),
        })
    }

    /// Copy `bytes` into the buffer at `offset`
    ///
    /// Uses the persistent mapping when there is one, otherwise maps, copies
    /// and unmaps.
    pub fn write_bytes(&mut self, offset: vk::DeviceSize, bytes: &[u8]) -> VulkanResult<()> {
        let end = offset.checked_add(bytes.len() as vk::DeviceSize);
        if end.map_or(true, |end| end > self.size) {
            return Err(VulkanError::InvalidOperation {
                reason: format!(
                    "write of {} bytes at offset {offset} exceeds buffer size {}",
                    bytes.len(),
                    self.size
                ),
            });
        }

        let (ptr, transient) = match self.mapped {
            Some(ptr) => (ptr, false),
            None => (self.map()?, true),
        };

        // The range was bounds-checked above and the mapping covers the whole buffer
        unsafe {
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), ptr.as_ptr().add(offset as usize), bytes.len());
        }

        if transient {
            unsafe { self.device.unmap_memory(self.memory) };
        }
        Ok(())
    }

    /// Copy a slice of plain-old-data values into the buffer at `offset`
    pub fn write<T: Pod>(&mut self, offset: vk::DeviceSize, data: &[T]) -> VulkanResult<()> {
        self.write_bytes(offset, bytemuck::cast_slice(data))
    }

    /// Get buffer handle
    pub const fn handle(&self) -> vk::Buffer {
        self.buffer
    }

    /// Get size in bytes
    pub const fn size(&self) -> vk::DeviceSize {
        self.size
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        unsafe {
            if self.mapped.take().is_some() {
                self.device.unmap_memory(self.memory);
            }
            self.device.destroy_buffer(self.buffer, None);
            self.device.free_memory(self.memory, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_padding_known_values() {
        assert_eq!(pad_uniform_buffer_size(0, 256), Some(0));
        assert_eq!(pad_uniform_buffer_size(1, 256), Some(256));
        assert_eq!(pad_uniform_buffer_size(192, 256), Some(256));
        assert_eq!(pad_uniform_buffer_size(256, 256), Some(256));
        assert_eq!(pad_uniform_buffer_size(257, 64), Some(320));
        assert_eq!(pad_uniform_buffer_size(100, 0), Some(100));
    }

    #[test]
    fn test_padding_near_u64_max_is_rejected() {
        assert_eq!(pad_uniform_buffer_size(u64::MAX, 256), None);
        assert_eq!(pad_uniform_buffer_size(u64::MAX - 100, 256), None);
        assert_eq!(pad_uniform_buffer_size(u64::MAX - 255, 256), Some(u64::MAX - 255));
        assert_eq!(pad_uniform_buffer_size(u64::MAX, 1), Some(u64::MAX));
    }

    #[test]
    fn test_padding_properties() {
        for shift in 0..10 {
            let alignment = 1u64 << shift;
            for size in 0..2048u64 {
                let padded = pad_uniform_buffer_size(size, alignment).unwrap();
                assert!(padded >= size);
                assert_eq!(padded % alignment, 0);
                assert!(padded < size + alignment);
            }
        }
    }
}
