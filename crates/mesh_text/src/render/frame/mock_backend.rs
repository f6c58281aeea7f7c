//! Instrumented in-memory backend for orchestrator tests
//!
//! Models fences as signaled, unsignaled or pending (submitted, not yet
//! observed complete), and binary semaphores as a signaled flag. Anything a
//! real driver would reject or deadlock on is pushed onto `violations`
//! instead of panicking, so tests can assert the list is empty.

use std::cell::Cell;
use std::collections::VecDeque;
use std::rc::Rc;

use ash::vk;
use bytemuck::Pod;

use super::{
    AcquireOutcome, ContentProducer, FrameBackend, FrameRecording, FrameSource, GlyphInstance, ImageLayout,
    PresentOutcome, SurfaceState,
};
use crate::render::RenderResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FenceState {
    Signaled,
    Unsignaled,
    Pending,
}

/// One backend call, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    WaitFence(usize),
    ResetFence(usize),
    WaitIdle,
    Acquire,
    RecreateSurface(u32, u32),
    RebuildPipeline(vk::Format),
    WriteInstances(usize),
    Record(u32),
    Submit { command_buffer: usize, fence: usize },
    Present(u32),
}

/// Window stand-in sharing its framebuffer size between clones
#[derive(Debug, Clone)]
pub struct MockWindow {
    size: Rc<Cell<(u32, u32)>>,
    polls: Rc<Cell<u32>>,
    close_after: Option<u32>,
}

impl MockWindow {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: Rc::new(Cell::new((width, height))),
            polls: Rc::new(Cell::new(0)),
            close_after: None,
        }
    }

    /// Request close once `polls` polls have happened
    pub fn closing_after(mut self, polls: u32) -> Self {
        self.close_after = Some(polls);
        self
    }

    pub fn set_size(&self, width: u32, height: u32) {
        self.size.set((width, height));
    }

    pub fn size(&self) -> (u32, u32) {
        self.size.get()
    }
}

impl FrameSource for MockWindow {
    fn poll(&mut self) {
        self.polls.set(self.polls.get() + 1);
    }

    fn framebuffer_size(&self) -> (u32, u32) {
        self.size.get()
    }

    fn close_requested(&self) -> bool {
        self.close_after.is_some_and(|limit| self.polls.get() >= limit)
    }
}

/// Produces a fixed number of records spread across the surface
pub struct MockProducer {
    count: usize,
}

impl MockProducer {
    pub fn new(count: usize) -> Self {
        Self { count }
    }
}

impl ContentProducer for MockProducer {
    type Instance = GlyphInstance;

    fn produce(&mut self, extent: vk::Extent2D, out: &mut Vec<GlyphInstance>) {
        out.clear();
        let step = 2.0 / extent.width.max(1) as f32;
        out.extend((0..self.count).map(|i| {
            let x = -1.0 + i as f32 * step;
            GlyphInstance {
                pos_min: [x, -0.5],
                pos_max: [x + step, 0.5],
                uv_min: [0.0, 0.0],
                uv_max: [1.0, 1.0],
            }
        }));
    }
}

/// Backend stand-in, generic over the instance record it accepts
pub struct MockBackend<T = GlyphInstance> {
    window: MockWindow,
    fences: Vec<FenceState>,
    semaphores: Vec<bool>,
    command_buffer_fences: Vec<Option<usize>>,
    images: Vec<ImageLayout>,
    acquire_counter: usize,
    capacity: usize,

    pub surface: SurfaceState,
    pub calls: Vec<Call>,
    pub violations: Vec<String>,
    pub recorded: Vec<FrameRecording>,
    pub written: Vec<T>,

    /// Fail this many acquires with a stale surface
    pub stale_acquires: u32,
    /// Report this many presents as stale
    pub stale_presents: u32,
    /// Report this many acquires as suboptimal
    pub suboptimal_acquires: u32,
    /// Image indices handed out in order (cycled); round robin when empty
    pub acquire_sequence: Vec<u32>,
    /// Image counts for the next recreations; unchanged when empty
    pub next_image_counts: VecDeque<u32>,
    /// Formats for the next recreations; unchanged when empty
    pub next_formats: VecDeque<vk::Format>,
    /// Resize the window during the next present and report it stale
    pub resize_during_present: Option<(u32, u32)>,
}

impl<T> MockBackend<T> {
    pub fn new(window: MockWindow, image_count: u32) -> Self {
        let (width, height) = window.size();
        Self {
            window,
            fences: Vec::new(),
            semaphores: Vec::new(),
            command_buffer_fences: Vec::new(),
            images: vec![ImageLayout::Undefined; image_count as usize],
            acquire_counter: 0,
            capacity: 4096,
            surface: SurfaceState {
                format: vk::Format::B8G8R8A8_SRGB,
                extent: vk::Extent2D { width, height },
                image_count,
            },
            calls: Vec::new(),
            violations: Vec::new(),
            recorded: Vec::new(),
            written: Vec::new(),
            stale_acquires: 0,
            stale_presents: 0,
            suboptimal_acquires: 0,
            acquire_sequence: Vec::new(),
            next_image_counts: VecDeque::new(),
            next_formats: VecDeque::new(),
            resize_during_present: None,
        }
    }

    /// Limit the instance buffer to `capacity` records
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn count(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.calls.iter().filter(|c| predicate(c)).count()
    }

    fn consume_semaphore(&mut self, semaphore: usize, user: &str) {
        if !self.semaphores[semaphore] {
            self.violations.push(format!("{user} waits on unsignaled semaphore {semaphore}"));
        }
        self.semaphores[semaphore] = false;
    }

    fn signal_semaphore(&mut self, semaphore: usize, user: &str) {
        if self.semaphores[semaphore] {
            self.violations.push(format!("{user} signals semaphore {semaphore} that is already signaled"));
        }
        self.semaphores[semaphore] = true;
    }
}

impl<T: Pod> FrameBackend for MockBackend<T> {
    type Fence = usize;
    type Semaphore = usize;
    type CommandBuffer = usize;
    type Instance = T;

    fn create_fence(&mut self, signaled: bool) -> RenderResult<usize> {
        self.fences.push(if signaled { FenceState::Signaled } else { FenceState::Unsignaled });
        Ok(self.fences.len() - 1)
    }

    fn create_semaphore(&mut self) -> RenderResult<usize> {
        self.semaphores.push(false);
        Ok(self.semaphores.len() - 1)
    }

    fn allocate_command_buffers(&mut self, count: u32) -> RenderResult<Vec<usize>> {
        let start = self.command_buffer_fences.len();
        self.command_buffer_fences.extend((0..count).map(|_| None));
        Ok((start..start + count as usize).collect())
    }

    fn wait_fence(&mut self, fence: &usize) -> RenderResult<()> {
        self.calls.push(Call::WaitFence(*fence));
        match self.fences[*fence] {
            FenceState::Unsignaled => {
                self.violations.push(format!("wait on unsignaled fence {fence} never returns"));
            }
            FenceState::Pending => self.fences[*fence] = FenceState::Signaled,
            FenceState::Signaled => {}
        }
        Ok(())
    }

    fn reset_fence(&mut self, fence: &usize) -> RenderResult<()> {
        self.calls.push(Call::ResetFence(*fence));
        if self.fences[*fence] != FenceState::Signaled {
            self.violations.push(format!("reset of fence {fence} in state {:?}", self.fences[*fence]));
        }
        self.fences[*fence] = FenceState::Unsignaled;
        Ok(())
    }

    fn wait_idle(&mut self) -> RenderResult<()> {
        self.calls.push(Call::WaitIdle);
        for state in &mut self.fences {
            if *state == FenceState::Pending {
                *state = FenceState::Signaled;
            }
        }
        Ok(())
    }

    fn surface(&self) -> SurfaceState {
        self.surface
    }

    fn acquire_next_image(&mut self, signal: &usize) -> RenderResult<AcquireOutcome> {
        self.calls.push(Call::Acquire);

        if self.stale_acquires > 0 {
            self.stale_acquires -= 1;
            return Ok(AcquireOutcome::Stale);
        }

        let image_index = if self.acquire_sequence.is_empty() {
            (self.acquire_counter % self.images.len()) as u32
        } else {
            self.acquire_sequence[self.acquire_counter % self.acquire_sequence.len()]
        };
        self.acquire_counter += 1;

        let suboptimal = self.suboptimal_acquires > 0;
        if suboptimal {
            self.suboptimal_acquires -= 1;
        }

        self.signal_semaphore(*signal, "acquire");
        Ok(AcquireOutcome::Ready { image_index, suboptimal })
    }

    fn recreate_surface(&mut self, width: u32, height: u32) -> RenderResult<SurfaceState> {
        self.calls.push(Call::RecreateSurface(width, height));

        if self.fences.contains(&FenceState::Pending) {
            self.violations.push("surface recreated while work is pending".to_string());
        }

        let image_count = self.next_image_counts.pop_front().unwrap_or(self.surface.image_count);
        let format = self.next_formats.pop_front().unwrap_or(self.surface.format);

        self.surface = SurfaceState {
            format,
            extent: vk::Extent2D { width, height },
            image_count,
        };
        self.images = vec![ImageLayout::Undefined; image_count as usize];
        self.acquire_counter = 0;
        Ok(self.surface)
    }

    fn rebuild_pipeline(&mut self, format: vk::Format) -> RenderResult<()> {
        self.calls.push(Call::RebuildPipeline(format));
        Ok(())
    }

    fn image_layout(&self, image_index: u32) -> ImageLayout {
        self.images.get(image_index as usize).copied().unwrap_or(ImageLayout::Undefined)
    }

    fn set_image_layout(&mut self, image_index: u32, layout: ImageLayout) {
        if let Some(slot) = self.images.get_mut(image_index as usize) {
            *slot = layout;
        }
    }

    fn write_instances(&mut self, records: &[T]) -> usize {
        let count = records.len().min(self.capacity);
        self.calls.push(Call::WriteInstances(count));
        self.written = records[..count].to_vec();
        count
    }

    fn record_frame(&mut self, command_buffer: usize, frame: &FrameRecording) -> RenderResult<()> {
        self.calls.push(Call::Record(frame.image_index));

        if let Some(fence) = self.command_buffer_fences[command_buffer] {
            if self.fences[fence] == FenceState::Pending {
                self.violations.push(format!("command buffer {command_buffer} re-recorded while pending"));
            }
        }
        if frame.image_layout != self.image_layout(frame.image_index) {
            self.violations.push(format!("stale layout tag for image {}", frame.image_index));
        }
        if let Err(e) = frame.image_layout.transition_to(ImageLayout::ColorWritable) {
            self.violations.push(e.to_string());
        }

        self.recorded.push(*frame);
        Ok(())
    }

    fn submit(&mut self, command_buffer: usize, wait: &usize, signal: &usize, fence: &usize) -> RenderResult<()> {
        self.calls.push(Call::Submit { command_buffer, fence: *fence });

        if self.fences[*fence] != FenceState::Unsignaled {
            self.violations.push(format!("submit with fence {fence} in state {:?}", self.fences[*fence]));
        }
        self.consume_semaphore(*wait, "submit");
        self.signal_semaphore(*signal, "submit");

        self.fences[*fence] = FenceState::Pending;
        self.command_buffer_fences[command_buffer] = Some(*fence);
        Ok(())
    }

    fn present(&mut self, image_index: u32, wait: &usize) -> RenderResult<PresentOutcome> {
        self.calls.push(Call::Present(image_index));

        if image_index as usize >= self.images.len() {
            self.violations.push(format!("present of unknown image {image_index}"));
        }
        self.consume_semaphore(*wait, "present");

        if let Some((width, height)) = self.resize_during_present.take() {
            self.window.set_size(width, height);
            return Ok(PresentOutcome::Stale);
        }
        if self.stale_presents > 0 {
            self.stale_presents -= 1;
            return Ok(PresentOutcome::Stale);
        }
        Ok(PresentOutcome::Presented)
    }
}
