//! Backend-agnostic frame loop
//!
//! [`FrameOrchestrator`] owns the frame slots and per-image present signals and
//! drives a [`FrameBackend`] through wait, acquire, record, submit and present.
//! [`ContentProducer`] supplies the instance records each frame and
//! [`FrameSource`] is the window the loop polls.

mod backend;
mod image_layout;
mod instance;
mod orchestrator;

#[cfg(test)]
pub(crate) mod mock_backend;

pub use backend::{
    AcquireOutcome, ContentProducer, FrameBackend, FrameRecording, FrameSource, PresentOutcome, SurfaceState,
};
pub use image_layout::{ImageLayout, LayoutTransition};
pub use instance::{write_instance_records, GlyphInstance, GLYPH_INSTANCE_SIZE};
pub use orchestrator::{FrameOrchestrator, FrameStats, TickOutcome, FRAMES_IN_FLIGHT};
