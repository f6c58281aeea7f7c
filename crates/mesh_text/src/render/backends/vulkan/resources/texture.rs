//! Vulkan texture management
//!
//! The MSDF atlas as a sampled image: device-local RGBA8, uploaded once
//! through a staging buffer, sampled linearly with clamped addressing.

use ash::{vk, Device};

use super::buffer::{allocate_memory, Buffer};
use crate::render::backends::vulkan::rendering::{color_subresource_range, CommandPool};
use crate::render::systems::text::AtlasImage;
use crate::render::{RenderError, RenderResult};

/// Format of the atlas texture; distances are linear, not sRGB
pub const ATLAS_FORMAT: vk::Format = vk::Format::R8G8B8A8_UNORM;

/// Sampler settings for distance-field lookups
pub fn atlas_sampler_info() -> vk::SamplerCreateInfo {
    vk::SamplerCreateInfo::builder()
        .mag_filter(vk::Filter::LINEAR)
        .min_filter(vk::Filter::LINEAR)
        .mipmap_mode(vk::SamplerMipmapMode::NEAREST)
        .address_mode_u(vk::SamplerAddressMode::CLAMP_TO_EDGE)
        .address_mode_v(vk::SamplerAddressMode::CLAMP_TO_EDGE)
        .address_mode_w(vk::SamplerAddressMode::CLAMP_TO_EDGE)
        .anisotropy_enable(false)
        .max_anisotropy(1.0)
        .border_color(vk::BorderColor::INT_OPAQUE_BLACK)
        .unnormalized_coordinates(false)
        .compare_enable(false)
        .compare_op(vk::CompareOp::ALWAYS)
        .min_lod(0.0)
        .max_lod(0.0)
        .build()
}

/// Atlas texture with image, image view, and sampler
pub struct AtlasTexture {
    device: Device,
    image: vk::Image,
    image_view: vk::ImageView,
    sampler: vk::Sampler,
    memory: vk::DeviceMemory,
}

impl AtlasTexture {
    /// Upload `atlas` and leave it ready for fragment sampling
    pub fn upload(
        device: &Device,
        memory_properties: &vk::PhysicalDeviceMemoryProperties,
        command_pool: &CommandPool,
        queue: vk::Queue,
        atlas: &AtlasImage,
    ) -> RenderResult<Self> {
        let extent = vk::Extent2D {
            width: atlas.width(),
            height: atlas.height(),
        };
        log::debug!("[TEXTURE] Uploading atlas {}x{}", extent.width, extent.height);

        let staging = Buffer::new(
            device,
            memory_properties,
            atlas.pixels().len() as vk::DeviceSize,
            vk::BufferUsageFlags::TRANSFER_SRC,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
        )?;
        staging.write_bytes(atlas.pixels())?;

        // Each handle is owned by `texture` as soon as it exists so a failure
        // part way through releases what was already created.
        let mut texture = Self {
            device: device.clone(),
            image: vk::Image::null(),
            image_view: vk::ImageView::null(),
            sampler: vk::Sampler::null(),
            memory: vk::DeviceMemory::null(),
        };

        let image_info = vk::ImageCreateInfo::builder()
            .image_type(vk::ImageType::TYPE_2D)
            .extent(vk::Extent3D {
                width: extent.width,
                height: extent.height,
                depth: 1,
            })
            .mip_levels(1)
            .array_layers(1)
            .format(ATLAS_FORMAT)
            .tiling(vk::ImageTiling::OPTIMAL)
            .initial_layout(vk::ImageLayout::UNDEFINED)
            .usage(vk::ImageUsageFlags::TRANSFER_DST | vk::ImageUsageFlags::SAMPLED)
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .samples(vk::SampleCountFlags::TYPE_1);
        texture.image =
            unsafe { device.create_image(&image_info, None) }.map_err(RenderError::api("vkCreateImage"))?;

        let requirements = unsafe { device.get_image_memory_requirements(texture.image) };
        texture.memory = allocate_memory(
            device,
            memory_properties,
            requirements,
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
        )?;
        unsafe { device.bind_image_memory(texture.image, texture.memory, 0) }
            .map_err(RenderError::api("vkBindImageMemory"))?;

        let image = texture.image;
        command_pool.one_shot(queue, |device, command_buffer| {
            record_upload(device, command_buffer, staging.handle(), image, extent);
        })?;

        let view_info = vk::ImageViewCreateInfo::builder()
            .image(texture.image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(ATLAS_FORMAT)
            .subresource_range(color_subresource_range());
        texture.image_view = unsafe { device.create_image_view(&view_info, None) }
            .map_err(RenderError::api("vkCreateImageView"))?;

        texture.sampler = unsafe { device.create_sampler(&atlas_sampler_info(), None) }
            .map_err(RenderError::api("vkCreateSampler"))?;

        log::info!("[TEXTURE] Atlas resident ({}x{})", extent.width, extent.height);
        Ok(texture)
    }

    /// Get the image view for descriptor set binding
    pub const fn image_view(&self) -> vk::ImageView {
        self.image_view
    }

    /// Get the sampler for descriptor set binding
    pub const fn sampler(&self) -> vk::Sampler {
        self.sampler
    }
}

impl Drop for AtlasTexture {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_sampler(self.sampler, None);
            self.device.destroy_image_view(self.image_view, None);
            self.device.destroy_image(self.image, None);
            self.device.free_memory(self.memory, None);
        }
    }
}

/// Staging buffer to image copy, bracketed by the two layout barriers
fn record_upload(
    device: &Device,
    command_buffer: vk::CommandBuffer,
    staging: vk::Buffer,
    image: vk::Image,
    extent: vk::Extent2D,
) {
    let to_transfer = vk::ImageMemoryBarrier::builder()
        .old_layout(vk::ImageLayout::UNDEFINED)
        .new_layout(vk::ImageLayout::TRANSFER_DST_OPTIMAL)
        .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .image(image)
        .subresource_range(color_subresource_range())
        .src_access_mask(vk::AccessFlags::empty())
        .dst_access_mask(vk::AccessFlags::TRANSFER_WRITE);

    let region = vk::BufferImageCopy::builder()
        .buffer_offset(0)
        .buffer_row_length(0)
        .buffer_image_height(0)
        .image_subresource(vk::ImageSubresourceLayers {
            aspect_mask: vk::ImageAspectFlags::COLOR,
            mip_level: 0,
            base_array_layer: 0,
            layer_count: 1,
        })
        .image_offset(vk::Offset3D { x: 0, y: 0, z: 0 })
        .image_extent(vk::Extent3D {
            width: extent.width,
            height: extent.height,
            depth: 1,
        });

    let to_shader_read = vk::ImageMemoryBarrier::builder()
        .old_layout(vk::ImageLayout::TRANSFER_DST_OPTIMAL)
        .new_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL)
        .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .image(image)
        .subresource_range(color_subresource_range())
        .src_access_mask(vk::AccessFlags::TRANSFER_WRITE)
        .dst_access_mask(vk::AccessFlags::SHADER_READ);

    unsafe {
        device.cmd_pipeline_barrier(
            command_buffer,
            vk::PipelineStageFlags::TOP_OF_PIPE,
            vk::PipelineStageFlags::TRANSFER,
            vk::DependencyFlags::empty(),
            &[],
            &[],
            &[to_transfer.build()],
        );
        device.cmd_copy_buffer_to_image(
            command_buffer,
            staging,
            image,
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            &[region.build()],
        );
        device.cmd_pipeline_barrier(
            command_buffer,
            vk::PipelineStageFlags::TRANSFER,
            vk::PipelineStageFlags::FRAGMENT_SHADER,
            vk::DependencyFlags::empty(),
            &[],
            &[],
            &[to_shader_read.build()],
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_atlas_sampler_is_linear_and_clamped() {
        let info = atlas_sampler_info();
        assert_eq!(info.mag_filter, vk::Filter::LINEAR);
        assert_eq!(info.min_filter, vk::Filter::LINEAR);
        assert_eq!(info.address_mode_u, vk::SamplerAddressMode::CLAMP_TO_EDGE);
        assert_eq!(info.address_mode_v, vk::SamplerAddressMode::CLAMP_TO_EDGE);
        assert_eq!(info.anisotropy_enable, vk::FALSE);
    }

    #[test]
    fn test_atlas_format_is_linear() {
        assert_eq!(ATLAS_FORMAT, vk::Format::R8G8B8A8_UNORM);
    }
}
