//! Physical device selection and the device context
//!
//! Selection is split into a pure part ([`DeviceCandidate`] scoring and queue
//! family resolution) and the driver queries that fill candidates in. The
//! winning device's capabilities are queried once and cached in
//! [`DeviceCapabilities`].

use std::collections::BTreeSet;
use std::ffi::CStr;

use ash::extensions::khr::{Surface, Swapchain as SwapchainLoader};
use ash::{vk, Device, Instance};
use bitflags::bitflags;

use super::instance::VulkanInstance;
use crate::core::config::RendererConfig;
use crate::platform::Window;
use crate::render::backends::vulkan::state::swapchain::SurfaceSupport;
use crate::render::backends::vulkan::{VulkanError, VulkanResult};

/// Score bonus that makes any discrete GPU outrank any integrated one
pub const DISCRETE_GPU_BONUS: u32 = 100_000;

/// Format textures are uploaded in
pub const TEXTURE_FORMAT: vk::Format = vk::Format::R8G8B8A8_SRGB;

const DEPTH_FORMAT_CANDIDATES: [vk::Format; 3] = [
    vk::Format::D32_SFLOAT,
    vk::Format::D32_SFLOAT_S8_UINT,
    vk::Format::D24_UNORM_S8_UINT,
];

bitflags! {
    /// Device features the renderer cares about
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct DeviceFeatureFlags: u32 {
        /// Anisotropic texture filtering
        const SAMPLER_ANISOTROPY = 1 << 0;
        /// More than one draw per indirect call
        const MULTI_DRAW_INDIRECT = 1 << 1;
        /// Non-zero `firstInstance` in indirect commands
        const DRAW_INDIRECT_FIRST_INSTANCE = 1 << 2;
        /// Geometry shader stage
        const GEOMETRY_SHADER = 1 << 3;
        /// Per-sample shading for MSAA
        const SAMPLE_RATE_SHADING = 1 << 4;
        /// Non-uniform indexing into sampled image arrays
        const DESCRIPTOR_INDEXING = 1 << 5;
    }
}

impl DeviceFeatureFlags {
    /// Features without which a device is disqualified
    ///
    /// The whole scene is one indirect call with per-mesh `firstInstance`, so
    /// both indirect features are mandatory. Instances in that call pick
    /// their texture by index, which needs non-uniform array indexing.
    pub const REQUIRED: Self = Self::SAMPLER_ANISOTROPY
        .union(Self::MULTI_DRAW_INDIRECT)
        .union(Self::DRAW_INDIRECT_FIRST_INSTANCE)
        .union(Self::DESCRIPTOR_INDEXING);

    /// Features enabled when present but not required
    pub const OPTIONAL: Self = Self::SAMPLE_RATE_SHADING;

    /// Extract the flags from the core and descriptor indexing feature structs
    pub fn from_vk(
        features: &vk::PhysicalDeviceFeatures,
        indexing: &vk::PhysicalDeviceDescriptorIndexingFeatures,
    ) -> Self {
        let mut flags = Self::empty();
        flags.set(Self::SAMPLER_ANISOTROPY, features.sampler_anisotropy == vk::TRUE);
        flags.set(Self::MULTI_DRAW_INDIRECT, features.multi_draw_indirect == vk::TRUE);
        flags.set(Self::DRAW_INDIRECT_FIRST_INSTANCE, features.draw_indirect_first_instance == vk::TRUE);
        flags.set(Self::GEOMETRY_SHADER, features.geometry_shader == vk::TRUE);
        flags.set(Self::SAMPLE_RATE_SHADING, features.sample_rate_shading == vk::TRUE);
        flags.set(
            Self::DESCRIPTOR_INDEXING,
            indexing.shader_sampled_image_array_non_uniform_indexing == vk::TRUE,
        );
        flags
    }

    /// Build the core Vulkan feature struct enabling exactly these flags
    pub fn to_vk(self) -> vk::PhysicalDeviceFeatures {
        vk::PhysicalDeviceFeatures::builder()
            .sampler_anisotropy(self.contains(Self::SAMPLER_ANISOTROPY))
            .multi_draw_indirect(self.contains(Self::MULTI_DRAW_INDIRECT))
            .draw_indirect_first_instance(self.contains(Self::DRAW_INDIRECT_FIRST_INSTANCE))
            .geometry_shader(self.contains(Self::GEOMETRY_SHADER))
            .sample_rate_shading(self.contains(Self::SAMPLE_RATE_SHADING))
            .build()
    }

    /// Descriptor indexing features to chain into device creation
    pub fn to_vk_descriptor_indexing(self) -> vk::PhysicalDeviceDescriptorIndexingFeatures {
        vk::PhysicalDeviceDescriptorIndexingFeatures::builder()
            .shader_sampled_image_array_non_uniform_indexing(self.contains(Self::DESCRIPTOR_INDEXING))
            .build()
    }
}

/// What one queue family can do
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueFamilySupport {
    /// Supports graphics operations
    pub graphics: bool,
    /// Can present to the target surface
    pub present: bool,
}

/// Resolved queue family indices
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueFamilyIndices {
    /// Graphics queue family
    pub graphics: u32,
    /// Present queue family, possibly equal to `graphics`
    pub present: u32,
}

impl QueueFamilyIndices {
    /// Distinct families, each needing one queue create info
    pub fn unique(&self) -> Vec<u32> {
        let set: BTreeSet<u32> = [self.graphics, self.present].into_iter().collect();
        set.into_iter().collect()
    }
}

/// Scan queue families once, taking the first graphics and the first present family
pub fn resolve_queue_families(families: &[QueueFamilySupport]) -> VulkanResult<QueueFamilyIndices> {
    let mut graphics = None;
    let mut present = None;

    for (index, family) in (0u32..).zip(families) {
        if family.graphics && graphics.is_none() {
            graphics = Some(index);
        }
        if family.present && present.is_none() {
            present = Some(index);
        }
    }

    match (graphics, present) {
        (Some(graphics), Some(present)) => Ok(QueueFamilyIndices { graphics, present }),
        (graphics, present) => Err(VulkanError::IncompleteQueueFamilies { graphics, present }),
    }
}

/// Everything device selection looks at, detached from the driver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceCandidate {
    /// Human readable device name
    pub name: String,
    /// Discrete, integrated, virtual, ...
    pub device_type: vk::PhysicalDeviceType,
    /// `maxImageDimension2D` limit
    pub max_image_dimension_2d: u32,
    /// Supported features
    pub features: DeviceFeatureFlags,
    /// Per-family capabilities in enumeration order
    pub queue_families: Vec<QueueFamilySupport>,
    /// Whether `VK_KHR_swapchain` is available
    pub supports_swapchain: bool,
    /// Number of surface formats reported for the target surface
    pub surface_format_count: usize,
    /// Number of present modes reported for the target surface
    pub present_mode_count: usize,
}

/// Score a candidate; zero means disqualified
pub fn score_candidate(candidate: &DeviceCandidate, required: DeviceFeatureFlags) -> u32 {
    if !candidate.features.contains(required)
        || !candidate.supports_swapchain
        || candidate.surface_format_count == 0
        || candidate.present_mode_count == 0
        || resolve_queue_families(&candidate.queue_families).is_err()
    {
        return 0;
    }

    let bonus = if candidate.device_type == vk::PhysicalDeviceType::DISCRETE_GPU {
        DISCRETE_GPU_BONUS
    } else {
        0
    };
    // A qualifying device always scores at least 1
    bonus.saturating_add(candidate.max_image_dimension_2d).max(1)
}

/// Pick the highest scoring candidate, earliest wins ties
pub fn select_device(candidates: &[DeviceCandidate], required: DeviceFeatureFlags) -> VulkanResult<usize> {
    let mut best: Option<(usize, u32)> = None;
    for (index, candidate) in candidates.iter().enumerate() {
        let score = score_candidate(candidate, required);
        log::debug!("GPU candidate {index} '{}' scored {score}", candidate.name);
        if score > 0 && best.map_or(true, |(_, top)| score > top) {
            best = Some((index, score));
        }
    }

    best.map(|(index, _)| index).ok_or(VulkanError::NoSuitableDevice {
        candidates: candidates.len(),
    })
}

/// Largest sample count both color and depth support, capped by `max_samples`
pub fn max_usable_sample_count(supported: vk::SampleCountFlags, max_samples: u32) -> vk::SampleCountFlags {
    [
        (64, vk::SampleCountFlags::TYPE_64),
        (32, vk::SampleCountFlags::TYPE_32),
        (16, vk::SampleCountFlags::TYPE_16),
        (8, vk::SampleCountFlags::TYPE_8),
        (4, vk::SampleCountFlags::TYPE_4),
        (2, vk::SampleCountFlags::TYPE_2),
    ]
    .into_iter()
    .find(|&(count, flag)| count <= max_samples && supported.contains(flag))
    .map_or(vk::SampleCountFlags::TYPE_1, |(_, flag)| flag)
}

/// First candidate format accepted by `supports`
pub fn choose_depth_format(
    candidates: &[vk::Format],
    supports: impl Fn(vk::Format) -> bool,
) -> VulkanResult<vk::Format> {
    candidates
        .iter()
        .copied()
        .find(|&format| supports(format))
        .ok_or_else(|| VulkanError::InitializationFailed("No supported depth format".to_string()))
}

/// Find a memory type index matching `type_filter` and `properties`
pub fn find_memory_type_index(
    memory_properties: &vk::PhysicalDeviceMemoryProperties,
    type_filter: u32,
    properties: vk::MemoryPropertyFlags,
) -> VulkanResult<u32> {
    (0..memory_properties.memory_type_count)
        .find(|&i| {
            type_filter & (1 << i) != 0
                && memory_properties.memory_types[i as usize]
                    .property_flags
                    .contains(properties)
        })
        .ok_or(VulkanError::NoSuitableMemoryType)
}

/// Capabilities of the selected device, queried once at construction
#[derive(Debug, Clone)]
pub struct DeviceCapabilities {
    /// Sample count used for the MSAA color and depth targets
    pub msaa_samples: vk::SampleCountFlags,
    /// Whether [`TEXTURE_FORMAT`] supports linear-filtered blits
    pub linear_blit_supported: bool,
    /// Depth attachment format
    pub depth_format: vk::Format,
    /// `minUniformBufferOffsetAlignment`
    pub min_uniform_buffer_offset_alignment: u64,
    /// `maxSamplerAnisotropy`
    pub max_sampler_anisotropy: f32,
    /// Enabled feature set
    pub enabled_features: DeviceFeatureFlags,
    /// Memory heaps and types
    pub memory_properties: vk::PhysicalDeviceMemoryProperties,
}

/// Owner of the instance, surface, physical device and logical device
///
/// Everything else in the backend borrows from this. Its `Drop` waits for the
/// device to go idle, then destroys device, surface, messenger and instance
/// in that order.
pub struct DeviceContext {
    /// Selected physical device
    pub physical_device: vk::PhysicalDevice,
    /// Logical device
    pub device: Device,
    /// Graphics queue
    pub graphics_queue: vk::Queue,
    /// Present queue
    pub present_queue: vk::Queue,
    /// Resolved queue family indices
    pub queue_families: QueueFamilyIndices,
    /// Window surface
    pub surface: vk::SurfaceKHR,
    /// Surface extension loader
    pub surface_loader: Surface,
    /// Swapchain extension loader
    pub swapchain_loader: SwapchainLoader,
    /// Cached device capabilities
    pub capabilities: DeviceCapabilities,
    /// Device name for diagnostics
    pub device_name: String,
    instance: VulkanInstance,
}

impl DeviceContext {
    /// Create the instance, surface and logical device for `window`
    pub fn new(window: &mut Window, config: &RendererConfig) -> VulkanResult<Self> {
        let instance = VulkanInstance::new(window, &config.application_name, config.validation_enabled())?;

        let surface_loader = Surface::new(&instance.entry, &instance.instance);
        let surface = window
            .create_vulkan_surface(instance.instance.handle())
            .map_err(|e| VulkanError::SurfaceCreation(e.to_string()))?;

        match Self::with_surface(instance, surface_loader, surface, config) {
            Ok(context) => Ok(context),
            Err((e, cleanup)) => {
                cleanup.release();
                Err(e)
            }
        }
    }

    fn with_surface(
        instance: VulkanInstance,
        surface_loader: Surface,
        surface: vk::SurfaceKHR,
        config: &RendererConfig,
    ) -> Result<Self, (VulkanError, PartialContext)> {
        macro_rules! bail {
            ($result:expr) => {
                match $result {
                    Ok(value) => value,
                    Err(e) => {
                        return Err((e, PartialContext { instance, surface_loader, surface }));
                    }
                }
            };
        }

        let physical_devices =
            bail!(unsafe { instance.instance.enumerate_physical_devices() }.map_err(VulkanError::Api));
        let mut candidates = Vec::with_capacity(physical_devices.len());
        for &physical_device in &physical_devices {
            candidates.push(bail!(query_candidate(
                &instance.instance,
                &surface_loader,
                surface,
                physical_device
            )));
        }

        let selected = bail!(select_device(&candidates, DeviceFeatureFlags::REQUIRED));
        let physical_device = physical_devices[selected];
        let candidate = &candidates[selected];
        let queue_families = bail!(resolve_queue_families(&candidate.queue_families));
        let enabled_features =
            DeviceFeatureFlags::REQUIRED | (candidate.features & DeviceFeatureFlags::OPTIONAL);

        log::info!(
            "Selected GPU: {} ({:?}), graphics family {}, present family {}",
            candidate.name,
            candidate.device_type,
            queue_families.graphics,
            queue_families.present
        );

        let priorities = [1.0_f32];
        let queue_infos: Vec<vk::DeviceQueueCreateInfo> = queue_families
            .unique()
            .into_iter()
            .map(|family| {
                vk::DeviceQueueCreateInfo::builder()
                    .queue_family_index(family)
                    .queue_priorities(&priorities)
                    .build()
            })
            .collect();
        let extensions = [SwapchainLoader::name().as_ptr()];
        let features = enabled_features.to_vk();
        let mut indexing = enabled_features.to_vk_descriptor_indexing();
        let create_info = vk::DeviceCreateInfo::builder()
            .queue_create_infos(&queue_infos)
            .enabled_extension_names(&extensions)
            .enabled_features(&features)
            .push_next(&mut indexing);

        let device = bail!(unsafe {
            instance
                .instance
                .create_device(physical_device, &create_info, None)
                .map_err(VulkanError::Api)
        });

        let capabilities = match query_capabilities(&instance.instance, physical_device, enabled_features, config) {
            Ok(capabilities) => capabilities,
            Err(e) => {
                unsafe { device.destroy_device(None) };
                return Err((e, PartialContext { instance, surface_loader, surface }));
            }
        };

        let graphics_queue = unsafe { device.get_device_queue(queue_families.graphics, 0) };
        let present_queue = unsafe { device.get_device_queue(queue_families.present, 0) };
        let swapchain_loader = SwapchainLoader::new(&instance.instance, &device);

        log::info!(
            "Device capabilities: msaa {:?}, depth {:?}, linear blit {}, ubo alignment {}",
            capabilities.msaa_samples,
            capabilities.depth_format,
            capabilities.linear_blit_supported,
            capabilities.min_uniform_buffer_offset_alignment
        );

        Ok(Self {
            physical_device,
            device,
            graphics_queue,
            present_queue,
            queue_families,
            surface,
            surface_loader,
            swapchain_loader,
            capabilities,
            device_name: candidate.name.clone(),
            instance,
        })
    }

    /// The Vulkan instance
    pub const fn instance(&self) -> &Instance {
        &self.instance.instance
    }

    /// Find a memory type using the cached memory properties
    pub fn find_memory_type(&self, type_filter: u32, properties: vk::MemoryPropertyFlags) -> VulkanResult<u32> {
        find_memory_type_index(&self.capabilities.memory_properties, type_filter, properties)
    }

    /// Current surface capabilities, formats and present modes
    pub fn surface_support(&self) -> VulkanResult<SurfaceSupport> {
        SurfaceSupport::query(&self.surface_loader, self.physical_device, self.surface)
    }

    /// Block until the device has finished all submitted work
    pub fn wait_idle(&self) -> VulkanResult<()> {
        unsafe { self.device.device_wait_idle().map_err(VulkanError::Api) }
    }
}

impl Drop for DeviceContext {
    fn drop(&mut self) {
        unsafe {
            let _ = self.device.device_wait_idle();
            self.device.destroy_device(None);
            self.surface_loader.destroy_surface(self.surface, None);
        }
        // `instance` drops afterwards, tearing down the messenger and instance
    }
}

/// Surface and instance waiting to be released after a failed init
struct PartialContext {
    instance: VulkanInstance,
    surface_loader: Surface,
    surface: vk::SurfaceKHR,
}

impl PartialContext {
    fn release(self) {
        unsafe { self.surface_loader.destroy_surface(self.surface, None) };
        drop(self.instance);
    }
}

fn query_candidate(
    instance: &Instance,
    surface_loader: &Surface,
    surface: vk::SurfaceKHR,
    physical_device: vk::PhysicalDevice,
) -> VulkanResult<DeviceCandidate> {
    let properties = unsafe { instance.get_physical_device_properties(physical_device) };
    let (features, indexing) = query_features(instance, physical_device, properties.api_version);
    let families = unsafe { instance.get_physical_device_queue_family_properties(physical_device) };

    let mut queue_families = Vec::with_capacity(families.len());
    for (index, family) in (0u32..).zip(&families) {
        let present = unsafe {
            surface_loader
                .get_physical_device_surface_support(physical_device, index, surface)
                .map_err(VulkanError::Api)?
        };
        queue_families.push(QueueFamilySupport {
            graphics: family.queue_flags.contains(vk::QueueFlags::GRAPHICS),
            present,
        });
    }

    let extensions = unsafe {
        instance
            .enumerate_device_extension_properties(physical_device)
            .map_err(VulkanError::Api)?
    };
    let supports_swapchain = extensions
        .iter()
        .any(|ext| unsafe { CStr::from_ptr(ext.extension_name.as_ptr()) } == SwapchainLoader::name());

    let (surface_format_count, present_mode_count) = if supports_swapchain {
        let support = SurfaceSupport::query(surface_loader, physical_device, surface)?;
        (support.formats.len(), support.present_modes.len())
    } else {
        (0, 0)
    };

    Ok(DeviceCandidate {
        name: unsafe { CStr::from_ptr(properties.device_name.as_ptr()) }
            .to_string_lossy()
            .into_owned(),
        device_type: properties.device_type,
        max_image_dimension_2d: properties.limits.max_image_dimension2_d,
        features: DeviceFeatureFlags::from_vk(&features, &indexing),
        queue_families,
        supports_swapchain,
        surface_format_count,
        present_mode_count,
    })
}

/// Core features plus the descriptor indexing block
///
/// The indexing block is only chained on Vulkan 1.2 devices; older devices
/// report it as unsupported.
fn query_features(
    instance: &Instance,
    physical_device: vk::PhysicalDevice,
    api_version: u32,
) -> (vk::PhysicalDeviceFeatures, vk::PhysicalDeviceDescriptorIndexingFeatures) {
    if api_version < vk::API_VERSION_1_2 {
        let features = unsafe { instance.get_physical_device_features(physical_device) };
        return (features, vk::PhysicalDeviceDescriptorIndexingFeatures::default());
    }

    let mut indexing = vk::PhysicalDeviceDescriptorIndexingFeatures::default();
    let features = {
        let mut features2 = vk::PhysicalDeviceFeatures2::builder().push_next(&mut indexing);
        unsafe { instance.get_physical_device_features2(physical_device, &mut features2) };
        features2.features
    };
    (features, indexing)
}

fn query_capabilities(
    instance: &Instance,
    physical_device: vk::PhysicalDevice,
    enabled_features: DeviceFeatureFlags,
    config: &RendererConfig,
) -> VulkanResult<DeviceCapabilities> {
    let properties = unsafe { instance.get_physical_device_properties(physical_device) };
    let memory_properties = unsafe { instance.get_physical_device_memory_properties(physical_device) };
    let limits = properties.limits;

    let texture_props = unsafe { instance.get_physical_device_format_properties(physical_device, TEXTURE_FORMAT) };
    let linear_blit_supported = texture_props
        .optimal_tiling_features
        .contains(vk::FormatFeatureFlags::SAMPLED_IMAGE_FILTER_LINEAR);

    let depth_format = choose_depth_format(&DEPTH_FORMAT_CANDIDATES, |format| {
        let props = unsafe { instance.get_physical_device_format_properties(physical_device, format) };
        props
            .optimal_tiling_features
            .contains(vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT)
    })?;

    let supported_samples = limits.framebuffer_color_sample_counts & limits.framebuffer_depth_sample_counts;

    Ok(DeviceCapabilities {
        msaa_samples: max_usable_sample_count(supported_samples, config.max_msaa_samples),
        linear_blit_supported,
        depth_format,
        min_uniform_buffer_offset_alignment: limits.min_uniform_buffer_offset_alignment,
        max_sampler_anisotropy: limits.max_sampler_anisotropy,
        enabled_features,
        memory_properties,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(name: &str, device_type: vk::PhysicalDeviceType, max_dim: u32) -> DeviceCandidate {
        DeviceCandidate {
            name: name.to_string(),
            device_type,
            max_image_dimension_2d: max_dim,
            features: DeviceFeatureFlags::REQUIRED,
            queue_families: vec![QueueFamilySupport { graphics: true, present: true }],
            supports_swapchain: true,
            surface_format_count: 2,
            present_mode_count: 1,
        }
    }

    #[test]
    fn test_discrete_gpu_preferred() {
        let candidates = vec![
            candidate("integrated", vk::PhysicalDeviceType::INTEGRATED_GPU, 16384),
            candidate("discrete", vk::PhysicalDeviceType::DISCRETE_GPU, 8192),
        ];
        assert_eq!(select_device(&candidates, DeviceFeatureFlags::REQUIRED).unwrap(), 1);
    }

    #[test]
    fn test_larger_image_dimension_wins_within_type() {
        let candidates = vec![
            candidate("small", vk::PhysicalDeviceType::INTEGRATED_GPU, 4096),
            candidate("large", vk::PhysicalDeviceType::INTEGRATED_GPU, 16384),
        ];
        assert_eq!(select_device(&candidates, DeviceFeatureFlags::REQUIRED).unwrap(), 1);
    }

    #[test]
    fn test_missing_feature_disqualifies_discrete() {
        let mut discrete = candidate("discrete", vk::PhysicalDeviceType::DISCRETE_GPU, 32768);
        discrete.features.remove(DeviceFeatureFlags::MULTI_DRAW_INDIRECT);
        assert_eq!(score_candidate(&discrete, DeviceFeatureFlags::REQUIRED), 0);

        let candidates = vec![discrete, candidate("cpu", vk::PhysicalDeviceType::CPU, 1024)];
        assert_eq!(select_device(&candidates, DeviceFeatureFlags::REQUIRED).unwrap(), 1);
    }

    #[test]
    fn test_missing_swapchain_or_surface_support_disqualifies() {
        let mut no_ext = candidate("a", vk::PhysicalDeviceType::DISCRETE_GPU, 8192);
        no_ext.supports_swapchain = false;
        let mut no_formats = candidate("b", vk::PhysicalDeviceType::DISCRETE_GPU, 8192);
        no_formats.surface_format_count = 0;
        let mut no_present = candidate("c", vk::PhysicalDeviceType::DISCRETE_GPU, 8192);
        no_present.queue_families = vec![QueueFamilySupport { graphics: true, present: false }];

        for c in [&no_ext, &no_formats, &no_present] {
            assert_eq!(score_candidate(c, DeviceFeatureFlags::REQUIRED), 0, "{}", c.name);
        }
    }

    #[test]
    fn test_no_survivors_is_no_suitable_device() {
        let mut broken = candidate("broken", vk::PhysicalDeviceType::DISCRETE_GPU, 8192);
        broken.features = DeviceFeatureFlags::empty();

        let result = select_device(&[broken], DeviceFeatureFlags::REQUIRED);
        assert!(matches!(result, Err(VulkanError::NoSuitableDevice { candidates: 1 })));
        assert!(matches!(
            select_device(&[], DeviceFeatureFlags::REQUIRED),
            Err(VulkanError::NoSuitableDevice { candidates: 0 })
        ));
    }

    #[test]
    fn test_ties_break_by_enumeration_order() {
        let candidates = vec![
            candidate("first", vk::PhysicalDeviceType::DISCRETE_GPU, 8192),
            candidate("second", vk::PhysicalDeviceType::DISCRETE_GPU, 8192),
        ];
        assert_eq!(select_device(&candidates, DeviceFeatureFlags::REQUIRED).unwrap(), 0);
    }

    #[test]
    fn test_selection_is_deterministic() {
        let candidates = vec![
            candidate("a", vk::PhysicalDeviceType::INTEGRATED_GPU, 8192),
            candidate("b", vk::PhysicalDeviceType::DISCRETE_GPU, 4096),
            candidate("c", vk::PhysicalDeviceType::VIRTUAL_GPU, 16384),
        ];
        let first = select_device(&candidates, DeviceFeatureFlags::REQUIRED).unwrap();
        for _ in 0..10 {
            assert_eq!(select_device(&candidates, DeviceFeatureFlags::REQUIRED).unwrap(), first);
        }
    }

    #[test]
    fn test_queue_families_shared() {
        let families = [
            QueueFamilySupport { graphics: false, present: false },
            QueueFamilySupport { graphics: true, present: true },
        ];
        let indices = resolve_queue_families(&families).unwrap();
        assert_eq!(indices, QueueFamilyIndices { graphics: 1, present: 1 });
        assert_eq!(indices.unique(), vec![1]);
    }

    #[test]
    fn test_queue_families_split() {
        let families = [
            QueueFamilySupport { graphics: true, present: false },
            QueueFamilySupport { graphics: true, present: true },
            QueueFamilySupport { graphics: false, present: true },
        ];
        let indices = resolve_queue_families(&families).unwrap();
        assert_eq!(indices, QueueFamilyIndices { graphics: 0, present: 1 });
        assert_eq!(indices.unique(), vec![0, 1]);
    }

    #[test]
    fn test_queue_families_incomplete() {
        let families = [QueueFamilySupport { graphics: true, present: false }];
        assert!(matches!(
            resolve_queue_families(&families),
            Err(VulkanError::IncompleteQueueFamilies { graphics: Some(0), present: None })
        ));
    }

    #[test]
    fn test_feature_flags_round_trip_through_vk() {
        let flags = DeviceFeatureFlags::REQUIRED | DeviceFeatureFlags::SAMPLE_RATE_SHADING;
        let from_vk = DeviceFeatureFlags::from_vk(&flags.to_vk(), &flags.to_vk_descriptor_indexing());
        assert_eq!(from_vk, flags);
    }

    #[test]
    fn test_missing_non_uniform_indexing_disqualifies() {
        let mut discrete = candidate("discrete", vk::PhysicalDeviceType::DISCRETE_GPU, 32768);
        discrete.features.remove(DeviceFeatureFlags::DESCRIPTOR_INDEXING);
        assert_eq!(score_candidate(&discrete, DeviceFeatureFlags::REQUIRED), 0);

        let full = candidate("integrated", vk::PhysicalDeviceType::INTEGRATED_GPU, 4096);
        assert_eq!(select_device(&[discrete, full], DeviceFeatureFlags::REQUIRED).unwrap(), 1);
    }

    #[test]
    fn test_indexing_flag_read_from_indexing_features() {
        let core = DeviceFeatureFlags::REQUIRED.to_vk();
        let without = vk::PhysicalDeviceDescriptorIndexingFeatures::default();
        let with = vk::PhysicalDeviceDescriptorIndexingFeatures::builder()
            .shader_sampled_image_array_non_uniform_indexing(true)
            .build();

        assert!(!DeviceFeatureFlags::from_vk(&core, &without).contains(DeviceFeatureFlags::DESCRIPTOR_INDEXING));
        assert!(DeviceFeatureFlags::from_vk(&core, &with).contains(DeviceFeatureFlags::DESCRIPTOR_INDEXING));
    }

    #[test]
    fn test_sample_count_respects_cap_and_support() {
        let supported = vk::SampleCountFlags::TYPE_1
            | vk::SampleCountFlags::TYPE_2
            | vk::SampleCountFlags::TYPE_4
            | vk::SampleCountFlags::TYPE_8;
        assert_eq!(max_usable_sample_count(supported, 4), vk::SampleCountFlags::TYPE_4);
        assert_eq!(max_usable_sample_count(supported, 64), vk::SampleCountFlags::TYPE_8);
        assert_eq!(max_usable_sample_count(supported, 1), vk::SampleCountFlags::TYPE_1);
        assert_eq!(max_usable_sample_count(vk::SampleCountFlags::TYPE_1, 8), vk::SampleCountFlags::TYPE_1);
    }

    #[test]
    fn test_depth_format_fallback() {
        let format = choose_depth_format(&DEPTH_FORMAT_CANDIDATES, |f| f == vk::Format::D24_UNORM_S8_UINT).unwrap();
        assert_eq!(format, vk::Format::D24_UNORM_S8_UINT);
        assert!(choose_depth_format(&DEPTH_FORMAT_CANDIDATES, |_| false).is_err());
    }

    #[test]
    fn test_find_memory_type_index() {
        let mut props = vk::PhysicalDeviceMemoryProperties::default();
        props.memory_type_count = 3;
        props.memory_types[0].property_flags = vk::MemoryPropertyFlags::DEVICE_LOCAL;
        props.memory_types[1].property_flags =
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT;
        props.memory_types[2].property_flags = vk::MemoryPropertyFlags::HOST_VISIBLE;

        let host = vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT;
        assert_eq!(find_memory_type_index(&props, 0b111, host).unwrap(), 1);
        assert_eq!(find_memory_type_index(&props, 0b101, vk::MemoryPropertyFlags::HOST_VISIBLE).unwrap(), 2);
        assert!(matches!(
            find_memory_type_index(&props, 0b100, host),
            Err(VulkanError::NoSuitableMemoryType)
        ));
    }
}
