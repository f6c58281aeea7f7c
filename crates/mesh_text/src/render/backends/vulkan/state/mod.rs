//! Vulkan presentation and synchronization state

pub mod swapchain;
pub mod sync;

pub use swapchain::{
    choose_extent, choose_image_count, choose_present_mode, choose_surface_format, PresentableImage, Swapchain,
    PREFERRED_FORMAT,
};
pub use sync::{Fence, Semaphore};
