//! Window management using GLFW
//!
//! Provides window creation, event polling and Vulkan surface creation.

use thiserror::Error;

use super::input::{InputSnapshot, InputState};
use crate::core::config::WindowConfig;

/// Window management errors
#[derive(Error, Debug)]
pub enum WindowError {
    /// GLFW could not be initialized
    #[error("GLFW initialization failed")]
    InitializationFailed,

    /// The window could not be created
    #[error("Window creation failed")]
    CreationFailed,

    /// GLFW reported an error
    #[error("GLFW error: {0}")]
    GlfwError(String),
}

/// Result type for window operations
pub type WindowResult<T> = Result<T, WindowError>;

/// GLFW window wrapper with proper resource management
pub struct Window {
    glfw: glfw::Glfw,
    window: glfw::PWindow,
    events: glfw::GlfwReceiver<(f64, glfw::WindowEvent)>,
    input: InputState,
    framebuffer_resized: bool,
}

impl Window {
    /// Create a resizable window without a client API, ready for Vulkan
    pub fn new(config: &WindowConfig) -> WindowResult<Self> {
        let mut glfw = glfw::init(glfw::fail_on_errors).map_err(|_| WindowError::InitializationFailed)?;

        if !glfw.vulkan_supported() {
            return Err(WindowError::GlfwError("Vulkan loader not found".to_string()));
        }

        glfw.window_hint(glfw::WindowHint::ClientApi(glfw::ClientApiHint::NoApi));
        glfw.window_hint(glfw::WindowHint::Resizable(true));

        let (mut window, events) = glfw
            .create_window(config.width, config.height, &config.title, glfw::WindowMode::Windowed)
            .ok_or(WindowError::CreationFailed)?;

        window.set_key_polling(true);
        window.set_mouse_button_polling(true);
        window.set_cursor_pos_polling(true);
        window.set_close_polling(true);
        window.set_framebuffer_size_polling(true);

        log::info!("Created window '{}' ({}x{})", config.title, config.width, config.height);

        Ok(Self {
            glfw,
            window,
            events,
            input: InputState::new(),
            framebuffer_resized: false,
        })
    }

    /// Whether the user asked to close the window
    pub fn should_close(&self) -> bool {
        self.window.should_close()
    }

    /// Request the window to close
    pub fn set_should_close(&mut self, should_close: bool) {
        self.window.set_should_close(should_close);
    }

    /// Poll pending events and fold them into the input and resize state
    pub fn poll_events(&mut self) {
        self.glfw.poll_events();
        for (_, event) in glfw::flush_messages(&self.events) {
            match event {
                glfw::WindowEvent::Key(key, _, action, _) => self.input.on_key(key, action),
                glfw::WindowEvent::MouseButton(button, action, _) => {
                    self.input.on_mouse_button(button, action);
                }
                glfw::WindowEvent::CursorPos(x, y) => self.input.on_cursor_pos(x, y),
                glfw::WindowEvent::FramebufferSize(width, height) => {
                    log::debug!("Framebuffer resized to {width}x{height}");
                    self.framebuffer_resized = true;
                }
                glfw::WindowEvent::Close => self.window.set_should_close(true),
                _ => {}
            }
        }
    }

    /// Block until at least one event arrives
    pub fn wait_events(&mut self) {
        self.glfw.wait_events();
    }

    /// Current input snapshot
    pub const fn current_input(&self) -> &InputSnapshot {
        self.input.snapshot()
    }

    /// Whether the framebuffer changed size since the flag was last cleared
    pub const fn is_framebuffer_resized(&self) -> bool {
        self.framebuffer_resized
    }

    /// Clear the resize flag after the swapchain has been rebuilt
    pub fn clear_framebuffer_resized(&mut self) {
        self.framebuffer_resized = false;
    }

    /// Framebuffer size in pixels
    pub fn framebuffer_size(&self) -> (u32, u32) {
        let (width, height) = self.window.get_framebuffer_size();
        (width.max(0) as u32, height.max(0) as u32)
    }

    /// Get required Vulkan instance extensions from GLFW
    pub fn required_instance_extensions(&self) -> WindowResult<Vec<String>> {
        self.glfw
            .get_required_instance_extensions()
            .ok_or_else(|| WindowError::GlfwError("Failed to get required extensions".to_string()))
    }

    /// Create Vulkan surface using GLFW's built-in functionality
    pub fn create_vulkan_surface(&mut self, instance: ash::vk::Instance) -> WindowResult<ash::vk::SurfaceKHR> {
        let mut surface = ash::vk::SurfaceKHR::null();
        let result = self.window.create_window_surface(instance, std::ptr::null(), &mut surface);

        if result == ash::vk::Result::SUCCESS {
            Ok(surface)
        } else {
            Err(WindowError::GlfwError(format!("Failed to create Vulkan surface: {result:?}")))
        }
    }
}
