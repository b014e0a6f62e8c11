//! # Renderer Configuration
//!
//! Startup configuration for the window, shaders and Vulkan backend. Values
//! are read once; nothing here is persisted by the engine.

use serde::{Deserialize, Serialize};

pub use crate::config::{Config, ConfigError};

/// # Shader Configuration
///
/// Paths to the precompiled SPIR-V stages of the scene pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShaderConfig {
    /// Path to the vertex shader SPIR-V file
    pub vertex_shader_path: String,
    /// Path to the fragment shader SPIR-V file
    pub fragment_shader_path: String,
}

impl ShaderConfig {
    /// Create a new shader configuration
    pub fn new(vertex_path: impl Into<String>, fragment_path: impl Into<String>) -> Self {
        Self {
            vertex_shader_path: vertex_path.into(),
            fragment_shader_path: fragment_path.into(),
        }
    }
}

impl Default for ShaderConfig {
    fn default() -> Self {
        Self::new("shaders/scene.vert.spv", "shaders/scene.frag.spv")
    }
}

/// Window creation parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowConfig {
    /// Window title
    pub title: String,
    /// Initial width in screen coordinates
    pub width: u32,
    /// Initial height in screen coordinates
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Vulkan Engine".to_string(),
            width: 1280,
            height: 720,
        }
    }
}

/// # Vulkan Renderer Configuration
///
/// Configuration specific to the Vulkan rendering backend, including
/// application metadata and debug features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Application name for Vulkan instance creation
    pub application_name: String,
    /// Window parameters
    pub window: WindowConfig,
    /// Shader configuration
    pub shaders: ShaderConfig,
    /// Whether to enable Vulkan validation layers (`None` = debug builds only)
    pub enable_validation: Option<bool>,
    /// Upper bound for the MSAA sample count; the device cap may lower it
    pub max_msaa_samples: u32,
    /// Prefer the mailbox present mode over FIFO when available
    pub prefer_low_latency_present: bool,
    /// Clear color for the scene render pass
    pub clear_color: [f32; 4],
}

impl RendererConfig {
    /// Create a new renderer configuration
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            application_name: app_name.into(),
            window: WindowConfig::default(),
            shaders: ShaderConfig::default(),
            enable_validation: None,
            max_msaa_samples: 4,
            prefer_low_latency_present: true,
            clear_color: [0.02, 0.02, 0.03, 1.0],
        }
    }

    /// Set custom shader configuration
    #[must_use]
    pub fn with_shaders(mut self, shaders: ShaderConfig) -> Self {
        self.shaders = shaders;
        self
    }

    /// Set the window parameters
    #[must_use]
    pub fn with_window(mut self, window: WindowConfig) -> Self {
        self.window = window;
        self
    }

    /// Enable or disable validation layers
    #[must_use]
    pub const fn with_validation(mut self, enabled: bool) -> Self {
        self.enable_validation = Some(enabled);
        self
    }

    /// Set the MSAA sample cap
    #[must_use]
    pub const fn with_max_msaa_samples(mut self, samples: u32) -> Self {
        self.max_msaa_samples = samples;
        self
    }

    /// Whether validation layers should be requested
    pub fn validation_enabled(&self) -> bool {
        self.enable_validation.unwrap_or(cfg!(debug_assertions))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.application_name.is_empty() {
            return Err(ConfigError::Invalid("Application name cannot be empty".to_string()));
        }

        if self.window.width == 0 || self.window.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "Window size must be non-zero, got {}x{}",
                self.window.width, self.window.height
            )));
        }

        if !self.max_msaa_samples.is_power_of_two() || self.max_msaa_samples > 64 {
            return Err(ConfigError::Invalid(format!(
                "MSAA sample cap must be a power of two between 1 and 64, got {}",
                self.max_msaa_samples
            )));
        }

        Ok(())
    }
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self::new("Vulkan Engine Application")
    }
}

impl Config for RendererConfig {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    #[test]
    fn test_default_config_is_valid() {
        let config = RendererConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_msaa_samples, 4);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(RendererConfig::new("").validate().is_err());
        assert!(RendererConfig::default().with_max_msaa_samples(3).validate().is_err());
        assert!(RendererConfig::default().with_max_msaa_samples(128).validate().is_err());

        let zero_window = RendererConfig::default().with_window(WindowConfig {
            title: "x".to_string(),
            width: 0,
            height: 600,
        });
        assert!(zero_window.validate().is_err());
    }

    #[test]
    fn test_toml_partial_file_fills_defaults() {
        let mut file = Builder::new().suffix(".toml").tempfile().unwrap();
        write!(
            file,
            concat!(
                "application_name = \"Viewer\"\nmax_msaa_samples = 8\n\n",
                "[window]\ntitle = \"T\"\nwidth = 800\nheight = 600\n",
            )
        )
        .unwrap();

        let config = RendererConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.application_name, "Viewer");
        assert_eq!(config.max_msaa_samples, 8);
        assert_eq!(config.window.width, 800);
        assert_eq!(config.shaders, ShaderConfig::default());
    }

    #[test]
    fn test_ron_save_and_load() {
        let file = Builder::new().suffix(".ron").tempfile().unwrap();
        let config = RendererConfig::new("Ron App").with_validation(false);

        config.save_to_file(file.path()).unwrap();
        let loaded = RendererConfig::load_from_file(file.path()).unwrap();

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_unknown_extension_is_rejected() {
        let file = Builder::new().suffix(".yaml").tempfile().unwrap();
        let result = RendererConfig::load_from_file(file.path());
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = RendererConfig::load_or_default(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, RendererConfig::default());
    }
}
