//! Vulkan implementation of [`FrameBackend`]
//!
//! Owns the device context, swapchain, command pool, mesh pipeline and the
//! swapchain-independent [`DrawContent`] resources. The content type picks
//! the pipeline variant and the instance record. Synchronization objects are
//! handed to the orchestrator, which keeps them alive only while this
//! backend is.

use std::path::Path;

use ash::vk;

use super::initialization::{VulkanContext, Window};
use super::rendering::{record_text_frame, CommandPool, MeshTextPipeline, TextFrame};
use super::resources::{DrawContent, ResourceContext};
use super::state::{Fence, Semaphore, Swapchain};
use crate::render::frame::{AcquireOutcome, FrameBackend, FrameRecording, ImageLayout, PresentOutcome, SurfaceState};
use crate::render::{RenderError, RenderResult};

/// Construction parameters that are not device capabilities
#[derive(Debug, Clone, Copy)]
pub struct FrameBackendSettings<'a, P> {
    /// Directory holding the compiled shaders
    pub shader_dir: &'a Path,
    /// Instance buffer capacity in records
    pub max_instances: usize,
    /// Background clear color
    pub clear_color: [f32; 4],
    /// Fragment push constants
    pub push_constants: P,
}

/// Frame backend driving a real device
pub struct VulkanFrameBackend<C: DrawContent> {
    // Field order is drop order: everything created from the device goes
    // before the context that owns it.
    content: C,
    pipeline: MeshTextPipeline,
    swapchain: Swapchain,
    command_pool: CommandPool,
    clear_color: [f32; 4],
    push_constants: C::PushConstants,
    context: VulkanContext,
}

impl<C: DrawContent> VulkanFrameBackend<C> {
    /// Bring up the device, surface, pipeline and content resources
    ///
    /// `framebuffer_size` must be non-zero. `source` is what the content
    /// uploads once: the atlas for text, the outline for curve glyphs.
    pub fn new(
        window: &mut Window,
        app_name: &str,
        enable_validation: bool,
        framebuffer_size: (u32, u32),
        source: &C::Source,
        settings: FrameBackendSettings<'_, C::PushConstants>,
    ) -> RenderResult<Self> {
        let context = VulkanContext::new(window, app_name, enable_validation)?;
        let device = context.device().clone();

        let (width, height) = framebuffer_size;
        let swapchain = Swapchain::new(&context, width, height)?;
        let command_pool = CommandPool::new(device.clone(), context.graphics_family())?;
        let pipeline = MeshTextPipeline::new(&device, settings.shader_dir, C::VARIANT, swapchain.format())?;
        let content = C::create(
            &ResourceContext {
                device: &device,
                memory_properties: &context.physical_device().memory_properties,
                command_pool: &command_pool,
                queue: context.graphics_queue(),
                set_layout: pipeline.set_layout(),
            },
            source,
            settings.max_instances,
        )?;

        log::info!(
            "[BACKEND] Ready on {} ({:?}) with room for {} instances",
            context.physical_device().name(),
            C::VARIANT,
            content.instance_capacity()
        );

        Ok(Self {
            content,
            pipeline,
            swapchain,
            command_pool,
            clear_color: settings.clear_color,
            push_constants: settings.push_constants,
            context,
        })
    }
}

impl<C: DrawContent> FrameBackend for VulkanFrameBackend<C> {
    type Fence = Fence;
    type Semaphore = Semaphore;
    type CommandBuffer = vk::CommandBuffer;
    type Instance = C::Instance;

    fn create_fence(&mut self, signaled: bool) -> RenderResult<Fence> {
        Fence::new(self.context.device().clone(), signaled)
    }

    fn create_semaphore(&mut self) -> RenderResult<Semaphore> {
        Semaphore::new(self.context.device().clone())
    }

    fn allocate_command_buffers(&mut self, count: u32) -> RenderResult<Vec<vk::CommandBuffer>> {
        self.command_pool.allocate_command_buffers(count)
    }

    fn wait_fence(&mut self, fence: &Fence) -> RenderResult<()> {
        fence.wait(u64::MAX)
    }

    fn reset_fence(&mut self, fence: &Fence) -> RenderResult<()> {
        fence.reset()
    }

    fn wait_idle(&mut self) -> RenderResult<()> {
        self.context.wait_idle()
    }

    fn surface(&self) -> SurfaceState {
        self.swapchain.surface_state()
    }

    fn acquire_next_image(&mut self, signal: &Semaphore) -> RenderResult<AcquireOutcome> {
        self.swapchain.acquire_next(u64::MAX, signal.handle())
    }

    fn recreate_surface(&mut self, width: u32, height: u32) -> RenderResult<SurfaceState> {
        self.swapchain.recreate(&self.context, width, height)?;
        Ok(self.swapchain.surface_state())
    }

    fn rebuild_pipeline(&mut self, format: vk::Format) -> RenderResult<()> {
        self.pipeline.recreate(format).map(|_| ())
    }

    fn image_layout(&self, image_index: u32) -> ImageLayout {
        self.swapchain.layout(image_index)
    }

    fn set_image_layout(&mut self, image_index: u32, layout: ImageLayout) {
        self.swapchain.set_layout(image_index, layout);
    }

    fn write_instances(&mut self, records: &[C::Instance]) -> usize {
        self.content.write_instances(records)
    }

    fn record_frame(&mut self, command_buffer: vk::CommandBuffer, frame: &FrameRecording) -> RenderResult<()> {
        let image = self
            .swapchain
            .image(frame.image_index)
            .ok_or(RenderError::ImageIndexOutOfRange {
                index: frame.image_index,
                image_count: self.swapchain.image_count(),
            })?;

        let text_frame = TextFrame {
            image: image.image,
            view: image.view,
            layout: frame.image_layout,
            extent: self.swapchain.extent(),
            clear_color: self.clear_color,
            pipeline: self.pipeline.handle(),
            pipeline_layout: self.pipeline.layout(),
            descriptor_set: self.content.descriptor_set(),
            push_constants: bytemuck::bytes_of(&self.push_constants),
            instance_count: frame.instance_count,
        };

        record_text_frame(
            self.context.device(),
            self.context.mesh_shader(),
            command_buffer,
            &text_frame,
        )
    }

    fn submit(
        &mut self,
        command_buffer: vk::CommandBuffer,
        wait: &Semaphore,
        signal: &Semaphore,
        fence: &Fence,
    ) -> RenderResult<()> {
        let wait_semaphores = [wait.handle()];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let command_buffers = [command_buffer];
        let signal_semaphores = [signal.handle()];

        let submit_info = vk::SubmitInfo::builder()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores);

        unsafe {
            self.context
                .device()
                .queue_submit(self.context.graphics_queue(), &[submit_info.build()], fence.handle())
        }
        .map_err(RenderError::api("vkQueueSubmit"))
    }

    fn present(&mut self, image_index: u32, wait: &Semaphore) -> RenderResult<PresentOutcome> {
        self.swapchain
            .present(self.context.present_queue(), image_index, wait.handle())
    }
}
