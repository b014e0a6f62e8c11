//! Swapchain negotiation and lifetime
//!
//! Surface format, present mode, extent and image count are chosen by pure
//! functions over a [`SurfaceSupport`] snapshot, so a recreated swapchain is
//! negotiated exactly like the first one.

use ash::extensions::khr::{Surface, Swapchain as SwapchainLoader};
use ash::{vk, Device};

use crate::render::backends::vulkan::initialization::DeviceContext;
use crate::render::backends::vulkan::{VulkanError, VulkanResult};

/// Preferred surface format
pub const PREFERRED_FORMAT: vk::SurfaceFormatKHR = vk::SurfaceFormatKHR {
    format: vk::Format::B8G8R8A8_SRGB,
    color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
};

/// Lifecycle of the presentable image chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SwapchainState {
    /// Images match the surface
    #[default]
    Valid,
    /// Out of date, suboptimal or resized; must be recreated before the next frame
    Invalidated,
    /// Recreation in progress
    Recreating,
}

impl SwapchainState {
    /// Mark the chain stale; a chain being recreated stays in `Recreating`
    pub fn invalidate(&mut self) {
        if *self == Self::Valid {
            *self = Self::Invalidated;
        }
    }

    /// Enter `Recreating`
    pub fn begin_recreate(&mut self) -> VulkanResult<()> {
        if *self == Self::Recreating {
            return Err(VulkanError::InvalidOperation {
                reason: "swapchain recreation is not reentrant".to_string(),
            });
        }
        *self = Self::Recreating;
        Ok(())
    }

    /// Return to `Valid` after a successful recreation
    pub fn finish_recreate(&mut self) {
        *self = Self::Valid;
    }

    /// Whether a recreation is pending
    pub fn needs_recreation(self) -> bool {
        self != Self::Valid
    }
}

/// Surface capabilities, formats and present modes for one device
#[derive(Debug, Clone)]
pub struct SurfaceSupport {
    /// Surface capabilities
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    /// Supported formats
    pub formats: Vec<vk::SurfaceFormatKHR>,
    /// Supported present modes
    pub present_modes: Vec<vk::PresentModeKHR>,
}

impl SurfaceSupport {
    /// Query the surface support of `physical_device`
    pub fn query(loader: &Surface, physical_device: vk::PhysicalDevice, surface: vk::SurfaceKHR) -> VulkanResult<Self> {
        unsafe {
            Ok(Self {
                capabilities: loader
                    .get_physical_device_surface_capabilities(physical_device, surface)
                    .map_err(VulkanError::Api)?,
                formats: loader
                    .get_physical_device_surface_formats(physical_device, surface)
                    .map_err(VulkanError::Api)?,
                present_modes: loader
                    .get_physical_device_surface_present_modes(physical_device, surface)
                    .map_err(VulkanError::Api)?,
            })
        }
    }
}

/// Preferred format if offered, else the first one
pub fn choose_surface_format(formats: &[vk::SurfaceFormatKHR]) -> VulkanResult<vk::SurfaceFormatKHR> {
    formats
        .iter()
        .copied()
        .find(|f| f.format == PREFERRED_FORMAT.format && f.color_space == PREFERRED_FORMAT.color_space)
        .or_else(|| formats.first().copied())
        .ok_or_else(|| VulkanError::SwapchainCreationFailure("surface reports no formats".to_string()))
}

/// MAILBOX when low latency is preferred and offered, else FIFO
///
/// FIFO is the only mode every implementation must support.
pub fn choose_present_mode(modes: &[vk::PresentModeKHR], prefer_low_latency: bool) -> vk::PresentModeKHR {
    if prefer_low_latency && modes.contains(&vk::PresentModeKHR::MAILBOX) {
        vk::PresentModeKHR::MAILBOX
    } else {
        vk::PresentModeKHR::FIFO
    }
}

/// The surface's fixed extent, or the window extent clamped to the allowed range
pub fn choose_extent(capabilities: &vk::SurfaceCapabilitiesKHR, window_extent: vk::Extent2D) -> vk::Extent2D {
    if capabilities.current_extent.width != u32::MAX {
        return capabilities.current_extent;
    }
    vk::Extent2D {
        width: window_extent.width.clamp(
            capabilities.min_image_extent.width,
            capabilities.max_image_extent.width,
        ),
        height: window_extent.height.clamp(
            capabilities.min_image_extent.height,
            capabilities.max_image_extent.height,
        ),
    }
}

/// One more than the minimum, capped by the maximum (zero means unbounded)
pub const fn choose_image_count(capabilities: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let desired = capabilities.min_image_count + 1;
    if capabilities.max_image_count > 0 && desired > capabilities.max_image_count {
        capabilities.max_image_count
    } else {
        desired
    }
}

/// Negotiated swapchain parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapchainSpec {
    /// Image format and color space
    pub format: vk::SurfaceFormatKHR,
    /// Present mode
    pub present_mode: vk::PresentModeKHR,
    /// Image extent
    pub extent: vk::Extent2D,
    /// Requested minimum image count
    pub image_count: u32,
    /// Surface pre-transform
    pub transform: vk::SurfaceTransformFlagsKHR,
}

impl SwapchainSpec {
    /// Negotiate parameters from a surface snapshot
    pub fn negotiate(
        support: &SurfaceSupport,
        window_extent: vk::Extent2D,
        prefer_low_latency: bool,
    ) -> VulkanResult<Self> {
        let extent = choose_extent(&support.capabilities, window_extent);
        if extent.width == 0 || extent.height == 0 {
            return Err(VulkanError::SwapchainCreationFailure("zero-sized surface".to_string()));
        }
        Ok(Self {
            format: choose_surface_format(&support.formats)?,
            present_mode: choose_present_mode(&support.present_modes, prefer_low_latency),
            extent,
            image_count: choose_image_count(&support.capabilities),
            transform: support.capabilities.current_transform,
        })
    }
}

/// Presentable image chain with its image views
pub struct Swapchain {
    device: Device,
    loader: SwapchainLoader,
    swapchain: vk::SwapchainKHR,
    images: Vec<vk::Image>,
    image_views: Vec<vk::ImageView>,
    spec: SwapchainSpec,
}

impl Swapchain {
    /// Negotiate and create a swapchain
    ///
    /// Pass the retiring swapchain as `old_swapchain` when recreating so the
    /// driver can hand over resources; it must be destroyed by the caller
    /// afterwards.
    pub fn new(
        context: &DeviceContext,
        window_extent: vk::Extent2D,
        prefer_low_latency: bool,
        old_swapchain: vk::SwapchainKHR,
    ) -> VulkanResult<Self> {
        let support = context.surface_support()?;
        let spec = SwapchainSpec::negotiate(&support, window_extent, prefer_low_latency)?;

        let families = [context.queue_families.graphics, context.queue_families.present];
        let concurrent = families[0] != families[1];

        let mut create_info = vk::SwapchainCreateInfoKHR::builder()
            .surface(context.surface)
            .min_image_count(spec.image_count)
            .image_format(spec.format.format)
            .image_color_space(spec.format.color_space)
            .image_extent(spec.extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .pre_transform(spec.transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(spec.present_mode)
            .clipped(true)
            .old_swapchain(old_swapchain);
        create_info = if concurrent {
            create_info
                .image_sharing_mode(vk::SharingMode::CONCURRENT)
                .queue_family_indices(&families)
        } else {
            create_info.image_sharing_mode(vk::SharingMode::EXCLUSIVE)
        };

        let loader = context.swapchain_loader.clone();
        let failure = |what: &str, e: vk::Result| VulkanError::SwapchainCreationFailure(format!("{what}: {e:?}"));

        let swapchain = unsafe { loader.create_swapchain(&create_info, None) }.map_err(|e| failure("create", e))?;

        let images = match unsafe { loader.get_swapchain_images(swapchain) } {
            Ok(images) => images,
            Err(e) => {
                unsafe { loader.destroy_swapchain(swapchain, None) };
                return Err(failure("get images", e));
            }
        };

        let mut chain = Self {
            device: context.device.clone(),
            loader,
            swapchain,
            images,
            image_views: Vec::new(),
            spec,
        };

        // On failure `chain` drops and releases the views created so far
        for &image in &chain.images {
            let view_info = vk::ImageViewCreateInfo::builder()
                .image(image)
                .view_type(vk::ImageViewType::TYPE_2D)
                .format(spec.format.format)
                .subresource_range(vk::ImageSubresourceRange {
                    aspect_mask: vk::ImageAspectFlags::COLOR,
                    base_mip_level: 0,
                    level_count: 1,
                    base_array_layer: 0,
                    layer_count: 1,
                });
            let view = unsafe { chain.device.create_image_view(&view_info, None) }
                .map_err(|e| failure("image view", e))?;
            chain.image_views.push(view);
        }

        log::info!(
            "Swapchain created: {}x{}, {} images, {:?}, {:?}",
            spec.extent.width,
            spec.extent.height,
            chain.images.len(),
            spec.format.format,
            spec.present_mode
        );
        Ok(chain)
    }

    /// Acquire the next image, signalling `semaphore`
    ///
    /// Returns the image index and whether the swapchain is suboptimal. The
    /// raw result is returned so the caller can distinguish staleness.
    pub fn acquire_next_image(&self, semaphore: vk::Semaphore) -> Result<(u32, bool), vk::Result> {
        unsafe {
            self.loader
                .acquire_next_image(self.swapchain, u64::MAX, semaphore, vk::Fence::null())
        }
    }

    /// Queue `image_index` for presentation after `wait_semaphore`
    ///
    /// Returns whether the swapchain is suboptimal.
    pub fn present(
        &self,
        queue: vk::Queue,
        image_index: u32,
        wait_semaphore: vk::Semaphore,
    ) -> Result<bool, vk::Result> {
        let wait_semaphores = [wait_semaphore];
        let swapchains = [self.swapchain];
        let image_indices = [image_index];
        let present_info = vk::PresentInfoKHR::builder()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        unsafe { self.loader.queue_present(queue, &present_info) }
    }

    /// Swapchain handle
    pub const fn handle(&self) -> vk::SwapchainKHR {
        self.swapchain
    }

    /// Negotiated parameters
    pub const fn spec(&self) -> &SwapchainSpec {
        &self.spec
    }

    /// Image extent
    pub const fn extent(&self) -> vk::Extent2D {
        self.spec.extent
    }

    /// Image format
    pub const fn format(&self) -> vk::Format {
        self.spec.format.format
    }

    /// Views of the swapchain images, in image index order
    pub fn image_views(&self) -> &[vk::ImageView] {
        &self.image_views
    }

    /// Number of images the driver created
    pub fn image_count(&self) -> usize {
        self.images.len()
    }
}

impl Drop for Swapchain {
    fn drop(&mut self) {
        unsafe {
            for &view in &self.image_views {
                self.device.destroy_image_view(view, None);
            }
            self.loader.destroy_swapchain(self.swapchain, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn capabilities(current: vk::Extent2D, min_images: u32, max_images: u32) -> vk::SurfaceCapabilitiesKHR {
        vk::SurfaceCapabilitiesKHR {
            min_image_count: min_images,
            max_image_count: max_images,
            current_extent: current,
            min_image_extent: vk::Extent2D { width: 1, height: 1 },
            max_image_extent: vk::Extent2D { width: 4096, height: 4096 },
            current_transform: vk::SurfaceTransformFlagsKHR::IDENTITY,
            ..Default::default()
        }
    }

    fn support(current: vk::Extent2D) -> SurfaceSupport {
        SurfaceSupport {
            capabilities: capabilities(current, 2, 8),
            formats: vec![
                vk::SurfaceFormatKHR {
                    format: vk::Format::R8G8B8A8_UNORM,
                    color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
                },
                PREFERRED_FORMAT,
            ],
            present_modes: vec![vk::PresentModeKHR::FIFO, vk::PresentModeKHR::MAILBOX],
        }
    }

    const UNDEFINED_EXTENT: vk::Extent2D = vk::Extent2D {
        width: u32::MAX,
        height: u32::MAX,
    };

    #[test]
    fn test_preferred_format_chosen_when_offered() {
        let formats = support(UNDEFINED_EXTENT).formats;
        assert_eq!(choose_surface_format(&formats).unwrap(), PREFERRED_FORMAT);
    }

    #[test]
    fn test_first_format_is_fallback() {
        let formats = [vk::SurfaceFormatKHR {
            format: vk::Format::R8G8B8A8_UNORM,
            color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
        }];
        assert_eq!(choose_surface_format(&formats).unwrap(), formats[0]);
        assert!(matches!(
            choose_surface_format(&[]),
            Err(VulkanError::SwapchainCreationFailure(_))
        ));
    }

    #[test]
    fn test_present_mode_selection() {
        let modes = [vk::PresentModeKHR::FIFO, vk::PresentModeKHR::MAILBOX];
        assert_eq!(choose_present_mode(&modes, true), vk::PresentModeKHR::MAILBOX);
        assert_eq!(choose_present_mode(&modes, false), vk::PresentModeKHR::FIFO);
        assert_eq!(choose_present_mode(&[vk::PresentModeKHR::FIFO], true), vk::PresentModeKHR::FIFO);
    }

    #[test]
    fn test_extent_uses_current_or_clamps_window() {
        let fixed = capabilities(vk::Extent2D { width: 800, height: 600 }, 2, 3);
        assert_eq!(
            choose_extent(&fixed, vk::Extent2D { width: 1920, height: 1080 }),
            vk::Extent2D { width: 800, height: 600 }
        );

        let free = capabilities(UNDEFINED_EXTENT, 2, 3);
        assert_eq!(
            choose_extent(&free, vk::Extent2D { width: 10_000, height: 0 }),
            vk::Extent2D { width: 4096, height: 1 }
        );
    }

    #[test]
    fn test_image_count_clamped() {
        assert_eq!(choose_image_count(&capabilities(UNDEFINED_EXTENT, 2, 0)), 3);
        assert_eq!(choose_image_count(&capabilities(UNDEFINED_EXTENT, 2, 8)), 3);
        assert_eq!(choose_image_count(&capabilities(UNDEFINED_EXTENT, 3, 3)), 3);
    }

    #[test]
    fn test_state_transitions() {
        let mut state = SwapchainState::default();
        assert!(!state.needs_recreation());

        state.invalidate();
        assert_eq!(state, SwapchainState::Invalidated);
        state.begin_recreate().unwrap();
        state.invalidate();
        assert_eq!(state, SwapchainState::Recreating);
        assert!(state.begin_recreate().is_err());
        state.finish_recreate();
        assert_eq!(state, SwapchainState::Valid);
    }

    #[test]
    fn test_recreation_matches_first_creation() {
        let window = vk::Extent2D { width: 1280, height: 720 };
        let surface = support(UNDEFINED_EXTENT);
        let pristine = SwapchainSpec::negotiate(&surface, window, true).unwrap();

        // Simulated resize to a different size and back
        let mut state = SwapchainState::Valid;
        state.invalidate();
        state.begin_recreate().unwrap();
        let resized = SwapchainSpec::negotiate(&surface, vk::Extent2D { width: 640, height: 480 }, true).unwrap();
        state.finish_recreate();
        state.invalidate();
        state.begin_recreate().unwrap();
        let restored = SwapchainSpec::negotiate(&surface, window, true).unwrap();
        state.finish_recreate();

        assert_eq!(resized.extent, vk::Extent2D { width: 640, height: 480 });
        assert_eq!(resized.format, pristine.format);
        assert_eq!(resized.image_count, pristine.image_count);
        assert_eq!(restored, pristine);
        assert_eq!(state, SwapchainState::Valid);
    }

    #[test]
    fn test_zero_extent_rejected() {
        let surface = support(vk::Extent2D { width: 0, height: 0 });
        assert!(SwapchainSpec::negotiate(&surface, vk::Extent2D { width: 0, height: 0 }, true).is_err());
    }
}
