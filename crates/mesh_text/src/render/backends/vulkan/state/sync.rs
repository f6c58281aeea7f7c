//! Vulkan synchronization primitives
//!
//! RAII wrappers for binary semaphores (GPU-GPU ordering between acquire,
//! submit and present) and fences (CPU waits for a frame slot to retire).
//! Each wrapper keeps a device handle and destroys its object on drop, so
//! owners must only drop them once the device no longer uses them.

use ash::{vk, Device};

use crate::render::{RenderError, RenderResult};

/// Binary semaphore with RAII cleanup
pub struct Semaphore {
    device: Device,
    semaphore: vk::Semaphore,
}

impl Semaphore {
    /// Create an unsignaled binary semaphore
    pub fn new(device: Device) -> RenderResult<Self> {
        let create_info = vk::SemaphoreCreateInfo::builder();
        let semaphore = unsafe { device.create_semaphore(&create_info, None) }
            .map_err(RenderError::api("vkCreateSemaphore"))?;
        Ok(Self { device, semaphore })
    }

    /// Raw handle
    pub const fn handle(&self) -> vk::Semaphore {
        self.semaphore
    }
}

impl Drop for Semaphore {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_semaphore(self.semaphore, None);
        }
    }
}

/// Fence with RAII cleanup
pub struct Fence {
    device: Device,
    fence: vk::Fence,
}

impl Fence {
    /// Create a fence, optionally in the signaled state
    pub fn new(device: Device, signaled: bool) -> RenderResult<Self> {
        let flags = if signaled { vk::FenceCreateFlags::SIGNALED } else { vk::FenceCreateFlags::empty() };
        let create_info = vk::FenceCreateInfo::builder().flags(flags);
        let fence = unsafe { device.create_fence(&create_info, None) }.map_err(RenderError::api("vkCreateFence"))?;
        Ok(Self { device, fence })
    }

    /// Block until signaled or `timeout` nanoseconds pass
    pub fn wait(&self, timeout: u64) -> RenderResult<()> {
        unsafe { self.device.wait_for_fences(&[self.fence], true, timeout) }
            .map_err(RenderError::api("vkWaitForFences"))
    }

    /// Return to the unsignaled state
    pub fn reset(&self) -> RenderResult<()> {
        unsafe { self.device.reset_fences(&[self.fence]) }.map_err(RenderError::api("vkResetFences"))
    }

    /// Raw handle
    pub const fn handle(&self) -> vk::Fence {
        self.fence
    }
}

impl Drop for Fence {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_fence(self.fence, None);
        }
    }
}
