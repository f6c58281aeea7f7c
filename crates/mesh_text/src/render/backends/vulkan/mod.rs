//! Vulkan backend implementation
//!
//! Organized into initialization, resources, rendering and state modules,
//! tied together by [`VulkanFrameBackend`].

/// Vulkan initialization types (window, instance, device)
pub mod initialization;

/// Vulkan resource management (buffers, atlas texture, descriptors, content bundles)
pub mod resources;

/// Vulkan rendering operations (shaders, pipeline, commands)
pub mod rendering;

/// Swapchain and synchronization state
pub mod state;

/// [`FrameBackend`](crate::render::frame::FrameBackend) over a real device
pub mod frame_backend;

pub use frame_backend::{FrameBackendSettings, VulkanFrameBackend};

// Re-export core initialization types
pub use initialization::context::{PhysicalDeviceInfo, VulkanContext};
pub use initialization::window::{Window, WindowError, WindowResult};

// Re-export resource types
pub use resources::{AtlasTexture, Buffer, CurveResources, DrawContent, InstanceBuffer, TextResources};

// Re-export rendering types
pub use rendering::{
    CommandPool, CurvePushConstants, MeshTextPipeline, PipelineVariant, ShaderModule, TextPushConstants,
};

// Re-export state types
pub use state::{Fence, Semaphore, Swapchain};
