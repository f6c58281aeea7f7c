//! Vulkan swapchain management
//!
//! Creates, recreates and presents from the swapchain. Every presentable
//! image carries the [`ImageLayout`] tag its last recorded operation left it
//! in; images start out `Undefined` after each (re)creation.

use ash::extensions::khr::Swapchain as SwapchainLoader;
use ash::{vk, Device};

use crate::render::backends::vulkan::VulkanContext;
use crate::render::frame::{AcquireOutcome, ImageLayout, PresentOutcome, SurfaceState};
use crate::render::{RenderError, RenderResult};

/// Preferred color format and color space
pub const PREFERRED_FORMAT: vk::SurfaceFormatKHR = vk::SurfaceFormatKHR {
    format: vk::Format::B8G8R8A8_SRGB,
    color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
};

/// Pick B8G8R8A8_SRGB / SRGB_NONLINEAR when offered, else the first format
pub fn choose_surface_format(available: &[vk::SurfaceFormatKHR]) -> Option<vk::SurfaceFormatKHR> {
    available
        .iter()
        .find(|sf| sf.format == PREFERRED_FORMAT.format && sf.color_space == PREFERRED_FORMAT.color_space)
        .or_else(|| available.first())
        .copied()
}

/// Pick MAILBOX when offered, else FIFO (always supported)
pub fn choose_present_mode(available: &[vk::PresentModeKHR]) -> vk::PresentModeKHR {
    available
        .iter()
        .copied()
        .find(|&mode| mode == vk::PresentModeKHR::MAILBOX)
        .unwrap_or(vk::PresentModeKHR::FIFO)
}

/// Use the surface's current extent unless it is left to the application
pub fn choose_extent(caps: &vk::SurfaceCapabilitiesKHR, width: u32, height: u32) -> vk::Extent2D {
    if caps.current_extent.width != u32::MAX {
        return caps.current_extent;
    }
    vk::Extent2D {
        width: width.clamp(caps.min_image_extent.width, caps.max_image_extent.width),
        height: height.clamp(caps.min_image_extent.height, caps.max_image_extent.height),
    }
}

/// One more than the minimum, capped at the maximum when there is one
pub fn choose_image_count(caps: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let desired = caps.min_image_count + 1;
    if caps.max_image_count > 0 {
        desired.min(caps.max_image_count)
    } else {
        desired
    }
}

/// A swapchain image, its view and its layout tag
#[derive(Debug, Clone, Copy)]
pub struct PresentableImage {
    /// Image owned by the swapchain
    pub image: vk::Image,
    /// Color view used as the rendering attachment
    pub view: vk::ImageView,
    /// Layout the last recorded operation left the image in
    pub layout: ImageLayout,
}

impl PresentableImage {
    /// A just-created image; it has never been presented, so its contents are undefined
    pub const fn fresh(image: vk::Image, view: vk::ImageView) -> Self {
        Self {
            image,
            view,
            layout: ImageLayout::Undefined,
        }
    }
}

struct Chain {
    handle: vk::SwapchainKHR,
    images: Vec<PresentableImage>,
    format: vk::SurfaceFormatKHR,
    extent: vk::Extent2D,
    present_mode: vk::PresentModeKHR,
}

/// Swapchain management wrapper with RAII cleanup
pub struct Swapchain {
    device: Device,
    loader: SwapchainLoader,
    chain: Chain,
}

impl Swapchain {
    /// Create a swapchain for a framebuffer of `width` x `height`
    pub fn new(context: &VulkanContext, width: u32, height: u32) -> RenderResult<Self> {
        let device = context.device().clone();
        let loader = context.swapchain_loader().clone();
        let chain = create_chain(context, &device, &loader, width, height, vk::SwapchainKHR::null())?;

        log::info!(
            "[SWAPCHAIN] Created {}x{} {:?} {:?}, {} images",
            chain.extent.width,
            chain.extent.height,
            chain.format.format,
            chain.present_mode,
            chain.images.len()
        );

        Ok(Self { device, loader, chain })
    }

    /// Rebuild views and chain for a new framebuffer size
    ///
    /// The device must be idle. The old chain is handed to the driver as
    /// `old_swapchain` and destroyed once the new one exists.
    pub fn recreate(&mut self, context: &VulkanContext, width: u32, height: u32) -> RenderResult<()> {
        let new_chain = create_chain(context, &self.device, &self.loader, width, height, self.chain.handle)?;
        let old_chain = std::mem::replace(&mut self.chain, new_chain);
        destroy_chain(&self.device, &self.loader, &old_chain);

        log::info!(
            "[SWAPCHAIN] Recreated {}x{} {:?}, {} images",
            self.chain.extent.width,
            self.chain.extent.height,
            self.chain.format.format,
            self.chain.images.len()
        );
        Ok(())
    }

    /// Acquire the next image, signaling `signal` when it is ready
    ///
    /// Out-of-date is reported as [`AcquireOutcome::Stale`]; every other
    /// failure is an error.
    pub fn acquire_next(&self, timeout: u64, signal: vk::Semaphore) -> RenderResult<AcquireOutcome> {
        let result = unsafe {
            self.loader
                .acquire_next_image(self.chain.handle, timeout, signal, vk::Fence::null())
        };

        match result {
            Ok((image_index, suboptimal)) => Ok(AcquireOutcome::Ready { image_index, suboptimal }),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(AcquireOutcome::Stale),
            Err(result) => Err(RenderError::Api {
                call: "vkAcquireNextImageKHR",
                result,
            }),
        }
    }

    /// Queue `image_index` for presentation once `wait` is signaled
    pub fn present(&self, queue: vk::Queue, image_index: u32, wait: vk::Semaphore) -> RenderResult<PresentOutcome> {
        let wait_semaphores = [wait];
        let swapchains = [self.chain.handle];
        let image_indices = [image_index];
        let present_info = vk::PresentInfoKHR::builder()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        match unsafe { self.loader.queue_present(queue, &present_info) } {
            Ok(false) => Ok(PresentOutcome::Presented),
            Ok(true) | Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(PresentOutcome::Stale),
            Err(result) => Err(RenderError::Api {
                call: "vkQueuePresentKHR",
                result,
            }),
        }
    }

    /// Format, extent and image count
    pub fn surface_state(&self) -> SurfaceState {
        SurfaceState {
            format: self.chain.format.format,
            extent: self.chain.extent,
            image_count: self.image_count(),
        }
    }

    /// Color format of the images
    pub const fn format(&self) -> vk::Format {
        self.chain.format.format
    }

    /// Extent of the images
    pub const fn extent(&self) -> vk::Extent2D {
        self.chain.extent
    }

    /// Number of presentable images
    pub fn image_count(&self) -> u32 {
        self.chain.images.len() as u32
    }

    /// Image, view and layout tag by index
    pub fn image(&self, image_index: u32) -> Option<&PresentableImage> {
        self.chain.images.get(image_index as usize)
    }

    /// Layout tag by index, `Undefined` for unknown indices
    pub fn layout(&self, image_index: u32) -> ImageLayout {
        self.image(image_index).map_or(ImageLayout::Undefined, |image| image.layout)
    }

    /// Update the layout tag of one image
    pub fn set_layout(&mut self, image_index: u32, layout: ImageLayout) {
        if let Some(image) = self.chain.images.get_mut(image_index as usize) {
            image.layout = layout;
        }
    }
}

impl Drop for Swapchain {
    fn drop(&mut self) {
        destroy_chain(&self.device, &self.loader, &self.chain);
    }
}

fn create_chain(
    context: &VulkanContext,
    device: &Device,
    loader: &SwapchainLoader,
    width: u32,
    height: u32,
    old_swapchain: vk::SwapchainKHR,
) -> RenderResult<Chain> {
    let physical_device = context.physical_device().device;
    let surface = context.surface();
    let surface_loader = context.surface_loader();

    let caps = unsafe { surface_loader.get_physical_device_surface_capabilities(physical_device, surface) }
        .map_err(RenderError::api("vkGetPhysicalDeviceSurfaceCapabilitiesKHR"))?;
    let formats = unsafe { surface_loader.get_physical_device_surface_formats(physical_device, surface) }
        .map_err(RenderError::api("vkGetPhysicalDeviceSurfaceFormatsKHR"))?;
    let present_modes = unsafe { surface_loader.get_physical_device_surface_present_modes(physical_device, surface) }
        .map_err(RenderError::api("vkGetPhysicalDeviceSurfacePresentModesKHR"))?;

    let format = choose_surface_format(&formats)
        .ok_or_else(|| RenderError::InitializationFailed("Surface reports no formats".to_string()))?;
    let present_mode = choose_present_mode(&present_modes);
    let extent = choose_extent(&caps, width, height);
    let image_count = choose_image_count(&caps);

    let queue_families = [context.graphics_family(), context.present_family()];
    let create_info = vk::SwapchainCreateInfoKHR::builder()
        .surface(surface)
        .min_image_count(image_count)
        .image_format(format.format)
        .image_color_space(format.color_space)
        .image_extent(extent)
        .image_array_layers(1)
        .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::TRANSFER_DST)
        .pre_transform(caps.current_transform)
        .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
        .present_mode(present_mode)
        .clipped(true)
        .old_swapchain(old_swapchain);

    let create_info = if queue_families[0] == queue_families[1] {
        create_info.image_sharing_mode(vk::SharingMode::EXCLUSIVE)
    } else {
        create_info
            .image_sharing_mode(vk::SharingMode::CONCURRENT)
            .queue_family_indices(&queue_families)
    };

    let handle = unsafe { loader.create_swapchain(&create_info, None) }
        .map_err(RenderError::api("vkCreateSwapchainKHR"))?;

    let raw_images = match unsafe { loader.get_swapchain_images(handle) } {
        Ok(images) => images,
        Err(result) => {
            unsafe { loader.destroy_swapchain(handle, None) };
            return Err(RenderError::Api {
                call: "vkGetSwapchainImagesKHR",
                result,
            });
        }
    };

    let mut chain = Chain {
        handle,
        images: Vec::with_capacity(raw_images.len()),
        format,
        extent,
        present_mode,
    };

    for image in raw_images {
        let view_info = vk::ImageViewCreateInfo::builder()
            .image(image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(format.format)
            .components(vk::ComponentMapping::default())
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                base_mip_level: 0,
                level_count: 1,
                base_array_layer: 0,
                layer_count: 1,
            });

        match unsafe { device.create_image_view(&view_info, None) } {
            Ok(view) => chain.images.push(PresentableImage::fresh(image, view)),
            Err(result) => {
                destroy_chain(device, loader, &chain);
                return Err(RenderError::Api {
                    call: "vkCreateImageView",
                    result,
                });
            }
        }
    }

    Ok(chain)
}

fn destroy_chain(device: &Device, loader: &SwapchainLoader, chain: &Chain) {
    unsafe {
        for image in &chain.images {
            device.destroy_image_view(image.view, None);
        }
        loader.destroy_swapchain(chain.handle, None);
    }
}
