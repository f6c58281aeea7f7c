//! Vulkan initialization: window, instance and device

pub mod context;
pub mod window;

pub use context::{score_device, LogicalDevice, PhysicalDeviceInfo, VulkanContext, VulkanInstance};
pub use window::{Window, WindowError, WindowResult};
