//! Command buffer management and frame recording
//!
//! [`CommandPool`] allocates the resettable per-slot command buffers and runs
//! one-shot uploads. [`record_text_frame`] records a whole frame: layout
//! barrier in, dynamic rendering with a clear, one mesh-task draw, layout
//! barrier out.

use ash::extensions::ext::MeshShader;
use ash::{vk, Device};

use crate::render::frame::{ImageLayout, LayoutTransition};
use crate::render::{RenderError, RenderResult};

/// Command pool wrapper with RAII cleanup
pub struct CommandPool {
    device: Device,
    command_pool: vk::CommandPool,
}

impl CommandPool {
    /// Create a pool whose command buffers can be reset individually
    pub fn new(device: Device, queue_family_index: u32) -> RenderResult<Self> {
        let pool_create_info = vk::CommandPoolCreateInfo::builder()
            .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER)
            .queue_family_index(queue_family_index);

        let command_pool = unsafe { device.create_command_pool(&pool_create_info, None) }
            .map_err(RenderError::api("vkCreateCommandPool"))?;

        Ok(Self { device, command_pool })
    }

    /// Allocate primary command buffers
    pub fn allocate_command_buffers(&self, count: u32) -> RenderResult<Vec<vk::CommandBuffer>> {
        let alloc_info = vk::CommandBufferAllocateInfo::builder()
            .command_pool(self.command_pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(count);

        unsafe { self.device.allocate_command_buffers(&alloc_info) }
            .map_err(RenderError::api("vkAllocateCommandBuffers"))
    }

    /// Record commands with `record`, submit them and wait for the queue to drain
    pub fn one_shot<F>(&self, queue: vk::Queue, record: F) -> RenderResult<()>
    where
        F: FnOnce(&Device, vk::CommandBuffer),
    {
        let command_buffers = self.allocate_command_buffers(1)?;
        let result = self.submit_one_shot(queue, command_buffers[0], record);
        unsafe { self.device.free_command_buffers(self.command_pool, &command_buffers) };
        result
    }

    fn submit_one_shot<F>(&self, queue: vk::Queue, command_buffer: vk::CommandBuffer, record: F) -> RenderResult<()>
    where
        F: FnOnce(&Device, vk::CommandBuffer),
    {
        let begin_info = vk::CommandBufferBeginInfo::builder().flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
        unsafe {
            self.device
                .begin_command_buffer(command_buffer, &begin_info)
                .map_err(RenderError::api("vkBeginCommandBuffer"))?;
            record(&self.device, command_buffer);
            self.device
                .end_command_buffer(command_buffer)
                .map_err(RenderError::api("vkEndCommandBuffer"))?;

            let command_buffers = [command_buffer];
            let submit_info = vk::SubmitInfo::builder().command_buffers(&command_buffers);
            self.device
                .queue_submit(queue, &[submit_info.build()], vk::Fence::null())
                .map_err(RenderError::api("vkQueueSubmit"))?;
            self.device
                .queue_wait_idle(queue)
                .map_err(RenderError::api("vkQueueWaitIdle"))
        }
    }
}

impl Drop for CommandPool {
    fn drop(&mut self) {
        unsafe {
            // Frees every command buffer allocated from the pool
            self.device.destroy_command_pool(self.command_pool, None);
        }
    }
}

/// Everything recorded into one frame's command buffer
pub struct TextFrame<'a> {
    /// Acquired swapchain image
    pub image: vk::Image,
    /// Its color view
    pub view: vk::ImageView,
    /// Layout the image was left in
    pub layout: ImageLayout,
    /// Render area
    pub extent: vk::Extent2D,
    /// Clear color (linear RGBA)
    pub clear_color: [f32; 4],
    /// Mesh pipeline
    pub pipeline: vk::Pipeline,
    /// Its layout
    pub pipeline_layout: vk::PipelineLayout,
    /// Set 0 of the pipeline variant
    pub descriptor_set: vk::DescriptorSet,
    /// Fragment push constant block
    pub push_constants: &'a [u8],
    /// Mesh workgroups to dispatch, one per instance record
    pub instance_count: u32,
}

/// Convert a layout transition into an image barrier for the whole color image
pub fn image_barrier(image: vk::Image, transition: &LayoutTransition) -> vk::ImageMemoryBarrier {
    vk::ImageMemoryBarrier::builder()
        .src_access_mask(transition.src_access)
        .dst_access_mask(transition.dst_access)
        .old_layout(transition.old_layout)
        .new_layout(transition.new_layout)
        .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .image(image)
        .subresource_range(color_subresource_range())
        .build()
}

/// First mip level and layer of a color image
pub const fn color_subresource_range() -> vk::ImageSubresourceRange {
    vk::ImageSubresourceRange {
        aspect_mask: vk::ImageAspectFlags::COLOR,
        base_mip_level: 0,
        level_count: 1,
        base_array_layer: 0,
        layer_count: 1,
    }
}

/// Reset `command_buffer` and record one text frame into it
///
/// The draw is skipped when there are no instances; the clear and both
/// layout transitions are always recorded.
pub fn record_text_frame(
    device: &Device,
    mesh_shader: &MeshShader,
    command_buffer: vk::CommandBuffer,
    frame: &TextFrame<'_>,
) -> RenderResult<()> {
    let to_writable = frame.layout.transition_to(ImageLayout::ColorWritable)?;
    let to_presentable = ImageLayout::ColorWritable.transition_to(ImageLayout::Presentable)?;

    unsafe {
        device
            .reset_command_buffer(command_buffer, vk::CommandBufferResetFlags::empty())
            .map_err(RenderError::api("vkResetCommandBuffer"))?;

        let begin_info = vk::CommandBufferBeginInfo::builder().flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
        device
            .begin_command_buffer(command_buffer, &begin_info)
            .map_err(RenderError::api("vkBeginCommandBuffer"))?;

        device.cmd_pipeline_barrier(
            command_buffer,
            to_writable.src_stage,
            to_writable.dst_stage,
            vk::DependencyFlags::empty(),
            &[],
            &[],
            &[image_barrier(frame.image, &to_writable)],
        );

        let color_attachments = [vk::RenderingAttachmentInfo::builder()
            .image_view(frame.view)
            .image_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
            .load_op(vk::AttachmentLoadOp::CLEAR)
            .store_op(vk::AttachmentStoreOp::STORE)
            .clear_value(vk::ClearValue {
                color: vk::ClearColorValue {
                    float32: frame.clear_color,
                },
            })
            .build()];

        let render_area = vk::Rect2D {
            offset: vk::Offset2D { x: 0, y: 0 },
            extent: frame.extent,
        };
        let rendering_info = vk::RenderingInfo::builder()
            .render_area(render_area)
            .layer_count(1)
            .color_attachments(&color_attachments);

        device.cmd_begin_rendering(command_buffer, &rendering_info);

        if frame.instance_count > 0 {
            device.cmd_bind_pipeline(command_buffer, vk::PipelineBindPoint::GRAPHICS, frame.pipeline);

            let viewport = vk::Viewport {
                x: 0.0,
                y: 0.0,
                width: frame.extent.width as f32,
                height: frame.extent.height as f32,
                min_depth: 0.0,
                max_depth: 1.0,
            };
            device.cmd_set_viewport(command_buffer, 0, &[viewport]);
            device.cmd_set_scissor(command_buffer, 0, &[render_area]);

            device.cmd_bind_descriptor_sets(
                command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                frame.pipeline_layout,
                0,
                &[frame.descriptor_set],
                &[],
            );
            device.cmd_push_constants(
                command_buffer,
                frame.pipeline_layout,
                vk::ShaderStageFlags::FRAGMENT,
                0,
                frame.push_constants,
            );

            mesh_shader.cmd_draw_mesh_tasks(command_buffer, frame.instance_count, 1, 1);
        }

        device.cmd_end_rendering(command_buffer);

        device.cmd_pipeline_barrier(
            command_buffer,
            to_presentable.src_stage,
            to_presentable.dst_stage,
            vk::DependencyFlags::empty(),
            &[],
            &[],
            &[image_barrier(frame.image, &to_presentable)],
        );

        device
            .end_command_buffer(command_buffer)
            .map_err(RenderError::api("vkEndCommandBuffer"))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_use_barrier_discards_contents() {
        let transition = ImageLayout::Undefined.transition_to(ImageLayout::ColorWritable).unwrap();
        let barrier = image_barrier(vk::Image::null(), &transition);

        assert_eq!(barrier.old_layout, vk::ImageLayout::UNDEFINED);
        assert_eq!(barrier.new_layout, vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL);
        assert_eq!(barrier.src_access_mask, vk::AccessFlags::empty());
        assert_eq!(barrier.subresource_range.aspect_mask, vk::ImageAspectFlags::COLOR);
        assert_eq!(barrier.src_queue_family_index, vk::QUEUE_FAMILY_IGNORED);
    }
}
