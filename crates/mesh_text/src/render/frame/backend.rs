//! Backend abstraction for the frame orchestrator
//!
//! The orchestrator owns the frame-slot and per-image synchronization objects
//! and decides when to wait, acquire, record, submit, present and recreate.
//! A [`FrameBackend`] performs those operations against a device. The Vulkan
//! implementation lives in `backends::vulkan`; tests drive the orchestrator
//! with an instrumented in-memory backend.

use ash::vk;
use bytemuck::Pod;

use super::ImageLayout;
use crate::render::RenderResult;

/// Snapshot of the presentation surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceState {
    /// Color format of the presentable images
    pub format: vk::Format,
    /// Extent of the presentable images
    pub extent: vk::Extent2D,
    /// Number of presentable images
    pub image_count: u32,
}

/// Result of asking for the next presentable image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireOutcome {
    /// An image was acquired; the acquire semaphore will be signaled
    Ready {
        /// Index of the acquired image
        image_index: u32,
        /// The surface still works but no longer matches the window exactly
        suboptimal: bool,
    },
    /// The surface is out of date; nothing was acquired or signaled
    Stale,
}

/// Result of queueing an image for presentation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentOutcome {
    /// Presented and the surface still matches the window
    Presented,
    /// Presented (or dropped) but the surface is stale or suboptimal
    Stale,
}

/// Everything the backend needs to record one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameRecording {
    /// Acquired image index
    pub image_index: u32,
    /// Layout the acquired image was last left in
    pub image_layout: ImageLayout,
    /// Number of instance records written this frame
    pub instance_count: u32,
}

/// Device operations the frame orchestrator drives
///
/// Fences and semaphores are created through the backend but owned by the
/// orchestrator, which drops them before the backend.
pub trait FrameBackend {
    /// CPU-visible completion fence
    type Fence;
    /// GPU-GPU binary semaphore
    type Semaphore;
    /// Primary command buffer handle
    type CommandBuffer: Copy;
    /// Record layout of the instance buffer the pipeline reads
    type Instance: Pod;

    /// Create a fence, optionally already signaled
    fn create_fence(&mut self, signaled: bool) -> RenderResult<Self::Fence>;

    /// Create an unsignaled binary semaphore
    fn create_semaphore(&mut self) -> RenderResult<Self::Semaphore>;

    /// Allocate resettable primary command buffers
    fn allocate_command_buffers(&mut self, count: u32) -> RenderResult<Vec<Self::CommandBuffer>>;

    /// Block until the fence is signaled
    fn wait_fence(&mut self, fence: &Self::Fence) -> RenderResult<()>;

    /// Return a signaled fence to the unsignaled state
    fn reset_fence(&mut self, fence: &Self::Fence) -> RenderResult<()>;

    /// Block until the device has no work in flight
    fn wait_idle(&mut self) -> RenderResult<()>;

    /// Current surface format, extent and image count
    fn surface(&self) -> SurfaceState;

    /// Acquire the next presentable image, signaling `signal` when it is ready
    fn acquire_next_image(&mut self, signal: &Self::Semaphore) -> RenderResult<AcquireOutcome>;

    /// Rebuild the surface for the given framebuffer size; device must be idle
    fn recreate_surface(&mut self, width: u32, height: u32) -> RenderResult<SurfaceState>;

    /// Rebuild the pipeline for a new color format
    fn rebuild_pipeline(&mut self, format: vk::Format) -> RenderResult<()>;

    /// Layout tag of a presentable image
    fn image_layout(&self, image_index: u32) -> ImageLayout;

    /// Update the layout tag of a presentable image
    fn set_image_layout(&mut self, image_index: u32, layout: ImageLayout);

    /// Copy records into the instance buffer, returning how many fit
    fn write_instances(&mut self, records: &[Self::Instance]) -> usize;

    /// Reset and record the command buffer for one frame
    fn record_frame(&mut self, command_buffer: Self::CommandBuffer, frame: &FrameRecording) -> RenderResult<()>;

    /// Submit a recorded frame
    fn submit(
        &mut self,
        command_buffer: Self::CommandBuffer,
        wait: &Self::Semaphore,
        signal: &Self::Semaphore,
        fence: &Self::Fence,
    ) -> RenderResult<()>;

    /// Queue an image for presentation once `wait` is signaled
    fn present(&mut self, image_index: u32, wait: &Self::Semaphore) -> RenderResult<PresentOutcome>;
}

/// Supplier of instance records for each frame
///
/// The record type has to match the backend's: MSDF text produces
/// [`GlyphInstance`](super::GlyphInstance)s, curve glyphs produce
/// [`CurveInstance`](crate::render::systems::curve::CurveInstance)s.
pub trait ContentProducer {
    /// One record, one mesh workgroup
    type Instance: Pod;

    /// Replace `out` with the records to draw on a surface of the given extent
    fn produce(&mut self, extent: vk::Extent2D, out: &mut Vec<Self::Instance>);
}

/// Window-side collaborator polled between frames
pub trait FrameSource {
    /// Process pending window events
    fn poll(&mut self);

    /// Framebuffer size in pixels
    fn framebuffer_size(&self) -> (u32, u32);

    /// Whether the user asked to close the window
    fn close_requested(&self) -> bool;
}
