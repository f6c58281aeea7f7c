//! Backend implementations for the render module
//!
//! Vulkan 1.3 with `VK_EXT_mesh_shader` is the only backend.

/// Vulkan rendering backend implementation
pub mod vulkan;
