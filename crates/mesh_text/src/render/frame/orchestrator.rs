//! Frame orchestrator
//!
//! Drives the per-frame sequence against a [`FrameBackend`]:
//!
//! ```text
//! Idle -> WaitFence -> Acquire -> Record -> Submit -> Present -> Idle
//!                         |                              |
//!                         +---- stale ----> Recreate <---+ stale / suboptimal
//! ```
//!
//! ## Synchronization model
//!
//! Two frame slots are cycled by a running counter. Each slot owns a command
//! buffer, an image-acquired semaphore and a frame-complete fence created
//! signaled. The render-finished semaphores are per presentable image, not per
//! slot: the presentation engine hands images back in whatever order it likes,
//! so a semaphore tied to a slot could be re-signaled while the present that
//! waits on it is still pending. Tying it to the image removes that case,
//! because an image is only re-acquired after its previous present completed.
//!
//! The slot fence is waited on at the start of every tick and reset only once
//! an image has been acquired, right before the command buffer is re-recorded.
//! A tick that bails out for recreation leaves the fence signaled, so the next
//! wait on that slot returns immediately.
//!
//! The orchestrator blocks in exactly one place per tick: the fence wait.

use std::time::Duration;

use ash::vk;

use super::{
    AcquireOutcome, ContentProducer, FrameBackend, FrameRecording, FrameSource, ImageLayout, PresentOutcome,
    SurfaceState,
};
use crate::render::{RenderError, RenderResult};

/// Number of frame slots (frames the CPU may record ahead of the GPU)
pub const FRAMES_IN_FLIGHT: usize = 2;

/// How long [`FrameOrchestrator::run`] sleeps when the window has no area
const MINIMIZED_POLL_INTERVAL: Duration = Duration::from_millis(16);

/// What a single tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Framebuffer had zero area; the device was not touched
    Skipped,
    /// A frame was submitted and presented
    Presented,
    /// The surface was rebuilt; no frame, or a frame followed by a rebuild
    Recreated,
}

/// Running counters, logged on shutdown
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Frames handed to the presentation engine
    pub frames_presented: u64,
    /// Ticks skipped for a zero-area framebuffer
    pub ticks_skipped: u64,
    /// Surface recreations
    pub recreations: u64,
    /// Instance records dropped because the instance buffer was full
    pub truncated_records: u64,
}

struct FrameSlot<B: FrameBackend> {
    command_buffer: B::CommandBuffer,
    image_acquired: B::Semaphore,
    frame_complete: B::Fence,
}

/// Owns frame-slot and per-image synchronization and runs the frame loop
///
/// Field order matters: synchronization objects drop before the backend that
/// created them, and [`Drop`] waits for the device to go idle first.
pub struct FrameOrchestrator<B: FrameBackend, P: ContentProducer<Instance = B::Instance>> {
    slots: Vec<FrameSlot<B>>,
    render_finished: Vec<B::Semaphore>,
    instances: Vec<B::Instance>,
    frame_counter: u64,
    surface: SurfaceState,
    surface_size: (u32, u32),
    last_dropped: usize,
    stats: FrameStats,
    producer: P,
    backend: B,
}

impl<B: FrameBackend, P: ContentProducer<Instance = B::Instance>> FrameOrchestrator<B, P> {
    /// Create frame slots and per-image signals for the backend's current surface
    ///
    /// `surface_size` is the framebuffer size the surface was created for.
    pub fn new(mut backend: B, producer: P, surface_size: (u32, u32)) -> RenderResult<Self> {
        let surface = backend.surface();

        let command_buffers = backend.allocate_command_buffers(FRAMES_IN_FLIGHT as u32)?;
        let mut slots = Vec::with_capacity(FRAMES_IN_FLIGHT);
        for command_buffer in command_buffers {
            slots.push(FrameSlot {
                command_buffer,
                image_acquired: backend.create_semaphore()?,
                frame_complete: backend.create_fence(true)?,
            });
        }

        let render_finished = create_image_signals(&mut backend, surface.image_count)?;

        log::info!(
            "[FRAME] Orchestrator ready: {} slots, {} images, {}x{} {:?}",
            slots.len(),
            render_finished.len(),
            surface.extent.width,
            surface.extent.height,
            surface.format
        );

        Ok(Self {
            slots,
            render_finished,
            instances: Vec::new(),
            frame_counter: 0,
            surface,
            surface_size,
            last_dropped: 0,
            stats: FrameStats::default(),
            producer,
            backend,
        })
    }

    /// Run one frame
    ///
    /// A zero-area framebuffer returns [`TickOutcome::Skipped`] without any
    /// backend call. Stale or suboptimal surfaces are rebuilt and reported as
    /// [`TickOutcome::Recreated`]; every other failure is returned as an error.
    pub fn tick(&mut self, source: &impl FrameSource) -> RenderResult<TickOutcome> {
        let framebuffer = source.framebuffer_size();
        if framebuffer.0 == 0 || framebuffer.1 == 0 {
            self.stats.ticks_skipped += 1;
            return Ok(TickOutcome::Skipped);
        }

        let slot_index = (self.frame_counter % FRAMES_IN_FLIGHT as u64) as usize;
        self.frame_counter += 1;

        self.backend.wait_fence(&self.slots[slot_index].frame_complete)?;

        if framebuffer != self.surface_size {
            log::debug!(
                "[FRAME] Framebuffer {}x{} differs from surface size {}x{}",
                framebuffer.0,
                framebuffer.1,
                self.surface_size.0,
                self.surface_size.1
            );
            self.recreate(source, framebuffer)?;
            return Ok(TickOutcome::Recreated);
        }

        let slot = &self.slots[slot_index];
        let (image_index, acquire_suboptimal) = match self.backend.acquire_next_image(&slot.image_acquired)? {
            AcquireOutcome::Ready { image_index, suboptimal } => (image_index, suboptimal),
            AcquireOutcome::Stale => {
                log::warn!("[FRAME] Swapchain out of date during acquire");
                self.recreate(source, framebuffer)?;
                return Ok(TickOutcome::Recreated);
            }
        };

        if image_index as usize >= self.render_finished.len() {
            return Err(RenderError::ImageIndexOutOfRange {
                index: image_index,
                image_count: self.render_finished.len() as u32,
            });
        }

        self.backend.reset_fence(&slot.frame_complete)?;

        let instance_count = self.refresh_instances();

        let frame = FrameRecording {
            image_index,
            image_layout: self.backend.image_layout(image_index),
            instance_count,
        };

        let slot = &self.slots[slot_index];
        let render_finished = &self.render_finished[image_index as usize];
        self.backend.record_frame(slot.command_buffer, &frame)?;
        self.backend
            .submit(slot.command_buffer, &slot.image_acquired, render_finished, &slot.frame_complete)?;

        let present = self.backend.present(image_index, render_finished)?;
        self.backend.set_image_layout(image_index, ImageLayout::Presentable);
        self.stats.frames_presented += 1;

        if present == PresentOutcome::Stale || acquire_suboptimal {
            log::warn!("[FRAME] Swapchain stale or suboptimal after present");
            self.recreate(source, framebuffer)?;
            return Ok(TickOutcome::Recreated);
        }

        Ok(TickOutcome::Presented)
    }

    /// Tick until the source asks to close, then wait for the device to go idle
    pub fn run(&mut self, source: &mut impl FrameSource) -> RenderResult<FrameStats> {
        log::info!("[FRAME] Entering frame loop");

        while !source.close_requested() {
            source.poll();
            if self.tick(&*source)? == TickOutcome::Skipped {
                std::thread::sleep(MINIMIZED_POLL_INTERVAL);
            }
        }

        self.backend.wait_idle()?;
        log::info!(
            "[FRAME] Frame loop finished: {} presented, {} skipped, {} recreations, {} records truncated",
            self.stats.frames_presented,
            self.stats.ticks_skipped,
            self.stats.recreations,
            self.stats.truncated_records
        );
        Ok(self.stats)
    }

    fn refresh_instances(&mut self) -> u32 {
        self.instances.clear();
        self.producer.produce(self.surface.extent, &mut self.instances);

        let written = self.backend.write_instances(&self.instances);
        let dropped = self.instances.len() - written;
        if dropped > 0 {
            self.stats.truncated_records += dropped as u64;
        }
        if dropped != self.last_dropped {
            log::debug!(
                "[FRAME] Instance buffer holds {} of {} records",
                written,
                self.instances.len()
            );
            self.last_dropped = dropped;
        }

        written as u32
    }

    /// Rebuild the surface, the per-image signals and (on a format change) the pipeline
    ///
    /// Uses the newest non-zero framebuffer size the source reports, falling
    /// back to the size this tick started with.
    fn recreate(&mut self, source: &impl FrameSource, tick_size: (u32, u32)) -> RenderResult<()> {
        self.backend.wait_idle()?;

        let latest = source.framebuffer_size();
        let (width, height) = if latest.0 == 0 || latest.1 == 0 { tick_size } else { latest };

        let old_format = self.surface.format;
        let surface = self.backend.recreate_surface(width, height)?;

        // Images and their render-finished signals are replaced together
        self.render_finished.clear();
        self.render_finished = create_image_signals(&mut self.backend, surface.image_count)?;

        if surface.format != old_format {
            log::info!("[FRAME] Surface format changed {:?} -> {:?}", old_format, surface.format);
            self.backend.rebuild_pipeline(surface.format)?;
        }

        self.surface = surface;
        self.surface_size = (width, height);
        self.stats.recreations += 1;

        log::info!(
            "[FRAME] Recreated surface: {}x{}, {} images",
            surface.extent.width,
            surface.extent.height,
            surface.image_count
        );
        Ok(())
    }

    /// Running counters
    pub const fn stats(&self) -> FrameStats {
        self.stats
    }

    /// Surface state as of the last creation
    pub const fn surface(&self) -> SurfaceState {
        self.surface
    }

    /// Number of per-image render-finished signals
    pub fn image_signal_count(&self) -> usize {
        self.render_finished.len()
    }

    /// Ticks that reached the fence wait
    pub const fn frame_counter(&self) -> u64 {
        self.frame_counter
    }

    /// Surface extent as a Vulkan extent
    pub const fn extent(&self) -> vk::Extent2D {
        self.surface.extent
    }

    /// Borrow the backend
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    /// Borrow the content producer mutably, e.g. to change the text
    pub fn producer_mut(&mut self) -> &mut P {
        &mut self.producer
    }
}

impl<B: FrameBackend, P: ContentProducer<Instance = B::Instance>> Drop for FrameOrchestrator<B, P> {
    fn drop(&mut self) {
        if let Err(e) = self.backend.wait_idle() {
            log::error!("[FRAME] wait_idle failed during shutdown: {}", e);
        }
    }
}

fn create_image_signals<B: FrameBackend>(backend: &mut B, image_count: u32) -> RenderResult<Vec<B::Semaphore>> {
    (0..image_count).map(|_| backend.create_semaphore()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::frame::mock_backend::{Call, MockBackend, MockProducer, MockWindow};

    fn orchestrator(window: &MockWindow) -> FrameOrchestrator<MockBackend, MockProducer> {
        let backend = MockBackend::new(window.clone(), 3);
        FrameOrchestrator::new(backend, MockProducer::new(4), window.size()).unwrap()
    }

    #[test]
    fn test_steady_state_presents_every_tick() {
        let window = MockWindow::new(1280, 720);
        let mut orch = orchestrator(&window);

        for _ in 0..10 {
            assert_eq!(orch.tick(&window).unwrap(), TickOutcome::Presented);
        }

        assert_eq!(orch.stats().frames_presented, 10);
        assert_eq!(orch.stats().recreations, 0);
        assert!(orch.backend().violations.is_empty(), "{:?}", orch.backend().violations);
    }

    #[test]
    fn test_image_signal_count_matches_image_count_across_recreations() {
        let window = MockWindow::new(1280, 720);
        let mut orch = orchestrator(&window);
        assert_eq!(orch.image_signal_count(), 3);

        for (i, (size, count)) in [((800, 600), 2), ((1920, 1080), 5), ((640, 480), 4), ((640, 480), 3)]
            .into_iter()
            .enumerate()
        {
            window.set_size(size.0, size.1);
            orch.backend_mut_for_test().next_image_counts.push_back(count);
            orch.backend_mut_for_test().stale_acquires = u32::from(i % 2 == 1);

            let mut outcomes = Vec::new();
            for _ in 0..3 {
                outcomes.push(orch.tick(&window).unwrap());
            }

            assert!(outcomes.contains(&TickOutcome::Recreated));
            assert_eq!(orch.backend().surface.image_count, count);
            assert_eq!(orch.image_signal_count(), count as usize);
        }

        assert!(orch.backend().violations.is_empty(), "{:?}", orch.backend().violations);
    }

    #[test]
    fn test_fence_never_reset_while_pending() {
        let window = MockWindow::new(1280, 720);
        let mut orch = orchestrator(&window);
        // Presentation engine hands images back out of slot order
        orch.backend_mut_for_test().acquire_sequence = vec![2, 0, 1, 1, 0, 2, 0];

        for frame in 0..40u32 {
            if frame % 9 == 4 {
                orch.backend_mut_for_test().stale_acquires = 1;
            }
            if frame % 13 == 7 {
                orch.backend_mut_for_test().stale_presents = 1;
            }
            orch.tick(&window).unwrap();
        }

        let backend = orch.backend();
        assert!(backend.violations.is_empty(), "{:?}", backend.violations);

        // Every reset is preceded by a wait on the same fence since its last submit
        let mut waited = std::collections::HashSet::new();
        for call in &backend.calls {
            match *call {
                Call::WaitFence(f) => {
                    waited.insert(f);
                }
                Call::ResetFence(f) => assert!(waited.remove(&f), "fence {f} reset without a wait"),
                _ => {}
            }
        }
    }

    #[test]
    fn test_recreate_is_idempotent_for_same_size() {
        let window = MockWindow::new(1280, 720);
        let mut orch = orchestrator(&window);

        orch.backend_mut_for_test().stale_acquires = 1;
        assert_eq!(orch.tick(&window).unwrap(), TickOutcome::Recreated);
        let first = orch.surface();

        orch.backend_mut_for_test().stale_acquires = 1;
        assert_eq!(orch.tick(&window).unwrap(), TickOutcome::Recreated);
        let second = orch.surface();

        assert_eq!(first, second);
        assert_eq!(orch.image_signal_count(), second.image_count as usize);
        assert_eq!(orch.backend().count(|c| matches!(c, Call::RebuildPipeline(_))), 0);
        assert_eq!(orch.stats().recreations, 2);
    }

    #[test]
    fn test_zero_area_tick_makes_no_backend_calls() {
        let window = MockWindow::new(1280, 720);
        let mut orch = orchestrator(&window);
        orch.tick(&window).unwrap();
        let calls_before = orch.backend().calls.len();

        for (w, h) in [(0, 720), (1280, 0), (0, 0)] {
            window.set_size(w, h);
            assert_eq!(orch.tick(&window).unwrap(), TickOutcome::Skipped);
        }

        assert_eq!(orch.backend().calls.len(), calls_before);
        assert_eq!(orch.stats().ticks_skipped, 3);
        assert_eq!(orch.frame_counter(), 1);
    }

    #[test]
    fn test_resize_while_frame_in_flight_recreates_once() {
        let window = MockWindow::new(1280, 720);
        let mut orch = orchestrator(&window);
        assert_eq!(orch.tick(&window).unwrap(), TickOutcome::Presented);

        // The frame above is still pending on the GPU
        window.set_size(640, 480);

        let outcomes = [orch.tick(&window).unwrap(), orch.tick(&window).unwrap()];
        assert_eq!(outcomes, [TickOutcome::Recreated, TickOutcome::Presented]);
        assert_eq!(orch.stats().recreations, 1);
        assert_eq!(orch.backend().count(|c| matches!(c, Call::RecreateSurface(640, 480))), 1);
        assert_eq!(orch.extent(), vk::Extent2D { width: 640, height: 480 });
        assert!(orch.backend().violations.is_empty(), "{:?}", orch.backend().violations);
    }

    #[test]
    fn test_resize_reported_at_present_uses_latest_size() {
        let window = MockWindow::new(1280, 720);
        let mut orch = orchestrator(&window);
        orch.backend_mut_for_test().resize_during_present = Some((640, 480));

        assert_eq!(orch.tick(&window).unwrap(), TickOutcome::Recreated);
        assert_eq!(orch.tick(&window).unwrap(), TickOutcome::Presented);

        assert_eq!(orch.stats().recreations, 1);
        assert_eq!(orch.stats().frames_presented, 2);
        assert_eq!(orch.extent(), vk::Extent2D { width: 640, height: 480 });
        assert!(orch.backend().violations.is_empty(), "{:?}", orch.backend().violations);
    }

    #[test]
    fn test_stale_acquire_skips_draw_and_keeps_fence_signaled() {
        let window = MockWindow::new(1280, 720);
        let mut orch = orchestrator(&window);
        orch.backend_mut_for_test().stale_acquires = 1;

        assert_eq!(orch.tick(&window).unwrap(), TickOutcome::Recreated);
        assert_eq!(orch.backend().count(|c| matches!(c, Call::Record(_))), 0);
        assert_eq!(orch.backend().count(|c| matches!(c, Call::ResetFence(_))), 0);

        // Two full slot cycles: a deadlocked fence would show up as a violation
        for _ in 0..4 {
            assert_eq!(orch.tick(&window).unwrap(), TickOutcome::Presented);
        }
        assert!(orch.backend().violations.is_empty(), "{:?}", orch.backend().violations);
    }

    #[test]
    fn test_suboptimal_acquire_presents_then_recreates() {
        let window = MockWindow::new(1280, 720);
        let mut orch = orchestrator(&window);
        orch.backend_mut_for_test().suboptimal_acquires = 1;

        assert_eq!(orch.tick(&window).unwrap(), TickOutcome::Recreated);
        assert_eq!(orch.stats().frames_presented, 1);
        assert_eq!(orch.stats().recreations, 1);
        assert!(orch.backend().violations.is_empty(), "{:?}", orch.backend().violations);
    }

    #[test]
    fn test_pipeline_rebuilt_only_on_format_change() {
        let window = MockWindow::new(1280, 720);
        let mut orch = orchestrator(&window);

        orch.backend_mut_for_test().stale_acquires = 1;
        orch.tick(&window).unwrap();
        assert_eq!(orch.backend().count(|c| matches!(c, Call::RebuildPipeline(_))), 0);

        orch.backend_mut_for_test().next_formats.push_back(vk::Format::R8G8B8A8_SRGB);
        orch.backend_mut_for_test().stale_acquires = 1;
        orch.tick(&window).unwrap();

        assert_eq!(
            orch.backend().count(|c| matches!(c, Call::RebuildPipeline(vk::Format::R8G8B8A8_SRGB))),
            1
        );
        assert_eq!(orch.surface().format, vk::Format::R8G8B8A8_SRGB);
    }

    #[test]
    fn test_layout_tags_follow_recorded_transitions() {
        let window = MockWindow::new(1280, 720);
        let mut orch = orchestrator(&window);

        for _ in 0..6 {
            orch.tick(&window).unwrap();
        }

        let layouts: Vec<_> = orch.backend().recorded.iter().map(|r| r.image_layout).collect();
        assert_eq!(&layouts[..3], &[ImageLayout::Undefined; 3]);
        assert_eq!(&layouts[3..], &[ImageLayout::Presentable; 3]);

        orch.backend_mut_for_test().stale_acquires = 1;
        orch.tick(&window).unwrap();
        orch.tick(&window).unwrap();
        assert_eq!(orch.backend().recorded.last().map(|r| r.image_layout), Some(ImageLayout::Undefined));
    }

    #[test]
    fn test_overflowing_producer_is_truncated() {
        let window = MockWindow::new(1280, 720);
        let backend = MockBackend::new(window.clone(), 3).with_capacity(8);
        let mut orch = FrameOrchestrator::new(backend, MockProducer::new(11), window.size()).unwrap();

        orch.tick(&window).unwrap();
        orch.tick(&window).unwrap();

        assert_eq!(orch.backend().recorded.last().map(|r| r.instance_count), Some(8));
        assert_eq!(orch.backend().written.len(), 8);
        assert_eq!(orch.stats().truncated_records, 6);
    }

    #[test]
    fn test_run_until_close() {
        let window = MockWindow::new(1280, 720);
        let mut orch = orchestrator(&window);
        let mut source = window.clone().closing_after(5);

        let stats = orch.run(&mut source).unwrap();

        assert_eq!(stats.frames_presented, 5);
        assert_eq!(orch.backend().calls.last(), Some(&Call::WaitIdle));
    }

    #[test]
    fn test_out_of_range_image_index_is_error() {
        let window = MockWindow::new(1280, 720);
        let mut orch = orchestrator(&window);
        orch.backend_mut_for_test().acquire_sequence = vec![7];

        assert!(matches!(
            orch.tick(&window),
            Err(RenderError::ImageIndexOutOfRange { index: 7, image_count: 3 })
        ));
    }

    impl<T: bytemuck::Pod, P: ContentProducer<Instance = T>> FrameOrchestrator<MockBackend<T>, P> {
        fn backend_mut_for_test(&mut self) -> &mut MockBackend<T> {
            &mut self.backend
        }
    }
}
