//! Window management using GLFW
//!
//! Provides the window the frame loop polls and the Vulkan surface it presents to

use std::time::Duration;

use ash::vk;
use thiserror::Error;

use crate::render::frame::FrameSource;

/// Window management errors
#[derive(Error, Debug)]
pub enum WindowError {
    /// GLFW could not be initialized
    #[error("GLFW initialization failed")]
    InitializationFailed,

    /// GLFW refused to create the window
    #[error("Window creation failed")]
    CreationFailed,

    /// GLFW reports no Vulkan support on this system
    #[error("GLFW reports Vulkan is not supported")]
    VulkanUnsupported,

    /// Surface creation failed
    #[error("Failed to create Vulkan surface: {0:?}")]
    SurfaceCreation(vk::Result),

    /// The window was closed before it ever had a drawable area
    #[error("Window closed before its framebuffer had a non-zero size")]
    ClosedBeforeShown,
}

/// Result type for window operations
pub type WindowResult<T> = Result<T, WindowError>;

/// GLFW window wrapper with proper resource management
pub struct Window {
    glfw: glfw::Glfw,
    window: glfw::PWindow,
    events: glfw::GlfwReceiver<(f64, glfw::WindowEvent)>,
}

impl Window {
    /// Create a resizable window without a client API
    pub fn new(title: &str, width: u32, height: u32) -> WindowResult<Self> {
        let mut glfw = glfw::init(glfw::fail_on_errors).map_err(|_| WindowError::InitializationFailed)?;

        if !glfw.vulkan_supported() {
            return Err(WindowError::VulkanUnsupported);
        }

        // Configure for Vulkan (no OpenGL context)
        glfw.window_hint(glfw::WindowHint::ClientApi(glfw::ClientApiHint::NoApi));
        glfw.window_hint(glfw::WindowHint::Resizable(true));

        let (mut window, events) = glfw
            .create_window(width, height, title, glfw::WindowMode::Windowed)
            .ok_or(WindowError::CreationFailed)?;

        window.set_key_polling(true);
        window.set_close_polling(true);
        window.set_framebuffer_size_polling(true);

        Ok(Self { glfw, window, events })
    }

    /// Whether the user asked to close the window
    pub fn should_close(&self) -> bool {
        self.window.should_close()
    }

    /// Process pending events; Escape closes the window
    pub fn poll_events(&mut self) {
        self.glfw.poll_events();
        for (_, event) in glfw::flush_messages(&self.events) {
            match event {
                glfw::WindowEvent::Key(glfw::Key::Escape, _, glfw::Action::Press, _) => {
                    self.window.set_should_close(true);
                }
                glfw::WindowEvent::FramebufferSize(width, height) => {
                    log::debug!("Framebuffer resized to {}x{}", width, height);
                }
                _ => {}
            }
        }
    }

    /// Framebuffer size in pixels
    pub fn get_framebuffer_size(&self) -> (u32, u32) {
        let (width, height) = self.window.get_framebuffer_size();
        (width.max(0) as u32, height.max(0) as u32)
    }

    /// Poll until the framebuffer has a drawable area
    ///
    /// Minimized windows report a zero-sized framebuffer, and a swapchain
    /// cannot be created for one.
    pub fn wait_for_nonzero_framebuffer(&mut self) -> WindowResult<(u32, u32)> {
        loop {
            let (width, height) = self.get_framebuffer_size();
            if width > 0 && height > 0 {
                return Ok((width, height));
            }
            if self.should_close() {
                return Err(WindowError::ClosedBeforeShown);
            }
            self.glfw.wait_events_timeout(Duration::from_millis(16).as_secs_f64());
        }
    }

    /// Get required Vulkan instance extensions from GLFW
    pub fn get_required_instance_extensions(&self) -> WindowResult<Vec<String>> {
        self.glfw
            .get_required_instance_extensions()
            .ok_or(WindowError::VulkanUnsupported)
    }

    /// Create Vulkan surface using GLFW's built-in functionality
    pub fn create_vulkan_surface(&mut self, instance: vk::Instance) -> WindowResult<vk::SurfaceKHR> {
        let mut surface = vk::SurfaceKHR::null();
        let result = self.window.create_window_surface(instance, std::ptr::null(), &mut surface);

        if result == vk::Result::SUCCESS {
            Ok(surface)
        } else {
            Err(WindowError::SurfaceCreation(result))
        }
    }
}

impl FrameSource for Window {
    fn poll(&mut self) {
        self.poll_events();
    }

    fn framebuffer_size(&self) -> (u32, u32) {
        self.get_framebuffer_size()
    }

    fn close_requested(&self) -> bool {
        self.should_close()
    }
}
