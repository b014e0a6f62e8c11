//! Vulkan instance with optional validation routed into `log`

use std::ffi::{CStr, CString};

use ash::extensions::ext::DebugUtils;
use ash::{vk, Entry, Instance};

use crate::platform::Window;
use crate::render::backends::vulkan::{VulkanError, VulkanResult};

const ENGINE_NAME: &str = "VulkanEngine";
const VALIDATION_LAYER: &str = "VK_LAYER_KHRONOS_validation";

/// Vulkan instance wrapper with RAII cleanup
pub struct VulkanInstance {
    /// Vulkan entry point
    pub entry: Entry,
    /// Vulkan instance handle
    pub instance: Instance,
    debug: Option<(DebugUtils, vk::DebugUtilsMessengerEXT)>,
}

impl VulkanInstance {
    /// Create an instance with the window system's required extensions
    ///
    /// When `enable_validation` is set and the Khronos validation layer is
    /// installed, the layer is enabled and its messages are forwarded to the
    /// `log` facade. A missing layer only produces a warning.
    pub fn new(window: &Window, app_name: &str, enable_validation: bool) -> VulkanResult<Self> {
        let entry = unsafe { Entry::load() }
            .map_err(|e| VulkanError::InitializationFailed(format!("Failed to load Vulkan: {e}")))?;

        let app_name = to_cstring(app_name)?;
        let engine_name = to_cstring(ENGINE_NAME)?;
        let app_info = vk::ApplicationInfo::builder()
            .application_name(&app_name)
            .application_version(vk::make_api_version(0, 1, 0, 0))
            .engine_name(&engine_name)
            .engine_version(vk::make_api_version(0, 1, 0, 0))
            .api_version(vk::API_VERSION_1_2);

        let required = window
            .required_instance_extensions()
            .map_err(|e| VulkanError::InitializationFailed(format!("Failed to get required extensions: {e}")))?;
        let mut extensions = required
            .iter()
            .map(|name| to_cstring(name))
            .collect::<VulkanResult<Vec<_>>>()?;

        let validation = enable_validation && layer_available(&entry, VALIDATION_LAYER);
        if enable_validation && !validation {
            log::warn!("{VALIDATION_LAYER} requested but not installed; continuing without validation");
        }
        if validation {
            extensions.push(DebugUtils::name().to_owned());
        }

        let layers = if validation { vec![to_cstring(VALIDATION_LAYER)?] } else { Vec::new() };
        let extension_ptrs: Vec<*const std::os::raw::c_char> = extensions.iter().map(|e| e.as_ptr()).collect();
        let layer_ptrs: Vec<*const std::os::raw::c_char> = layers.iter().map(|l| l.as_ptr()).collect();

        let create_info = vk::InstanceCreateInfo::builder()
            .application_info(&app_info)
            .enabled_extension_names(&extension_ptrs)
            .enabled_layer_names(&layer_ptrs);

        let instance = unsafe { entry.create_instance(&create_info, None).map_err(VulkanError::Api)? };

        let debug = if validation {
            let debug_utils = DebugUtils::new(&entry, &instance);
            match setup_debug_messenger(&debug_utils) {
                Ok(messenger) => Some((debug_utils, messenger)),
                Err(e) => {
                    unsafe { instance.destroy_instance(None) };
                    return Err(e);
                }
            }
        } else {
            None
        };

        log::info!(
            "Vulkan instance created ({} extensions, validation {})",
            extension_ptrs.len(),
            if validation { "on" } else { "off" }
        );

        Ok(Self { entry, instance, debug })
    }

    /// Whether the validation messenger is active
    pub const fn validation_enabled(&self) -> bool {
        self.debug.is_some()
    }
}

impl Drop for VulkanInstance {
    fn drop(&mut self) {
        unsafe {
            if let Some((debug_utils, messenger)) = self.debug.take() {
                debug_utils.destroy_debug_utils_messenger(messenger, None);
            }
            self.instance.destroy_instance(None);
        }
    }
}

fn to_cstring(value: &str) -> VulkanResult<CString> {
    CString::new(value).map_err(|_| VulkanError::InitializationFailed(format!("Interior NUL in name: {value:?}")))
}

fn layer_available(entry: &Entry, name: &str) -> bool {
    entry.enumerate_instance_layer_properties().is_ok_and(|layers| {
        layers
            .iter()
            .any(|layer| unsafe { CStr::from_ptr(layer.layer_name.as_ptr()) }.to_str() == Ok(name))
    })
}

fn setup_debug_messenger(debug_utils: &DebugUtils) -> VulkanResult<vk::DebugUtilsMessengerEXT> {
    let create_info = vk::DebugUtilsMessengerCreateInfoEXT::builder()
        .message_severity(
            vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE
                | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
        )
        .message_type(
            vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
        )
        .pfn_user_callback(Some(debug_callback));

    unsafe {
        debug_utils
            .create_debug_utils_messenger(&create_info, None)
            .map_err(VulkanError::Api)
    }
}

unsafe extern "system" fn debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    _user_data: *mut std::ffi::c_void,
) -> vk::Bool32 {
    if callback_data.is_null() || (*callback_data).p_message.is_null() {
        return vk::FALSE;
    }
    let message = CStr::from_ptr((*callback_data).p_message).to_string_lossy();

    if message_severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
        log::error!("[Vulkan] {message_type:?} - {message}");
    } else if message_severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
        log::warn!("[Vulkan] {message_type:?} - {message}");
    } else {
        log::debug!("[Vulkan] {message_type:?} - {message}");
    }

    vk::FALSE
}
