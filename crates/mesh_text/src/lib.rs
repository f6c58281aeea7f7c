//! # Mesh Text
//!
//! MSDF text rendering through Vulkan mesh shaders.
//!
//! ## Features
//!
//! - **Mesh-shader glyphs**: one workgroup per glyph expands an instance record into a quad
//! - **Frame orchestration**: double-buffered frame slots with per-image present signals
//! - **Resize handling**: swapchain and pipeline recreation on stale or suboptimal surfaces
//! - **MSDF fonts**: msdf-atlas-gen JSON metrics and RGBA atlases
//! - **Curve glyphs**: Loop-Blinn outlines expanded by a second mesh pipeline variant
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mesh_text::prelude::*;
//!
//! fn main() -> Result<(), RenderError> {
//!     let config = TextRendererConfig::default().with_text("Hello, mesh shaders");
//!     mesh_text::run(&config)
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod config;
pub mod render;

mod engine;

pub use engine::run;

/// Common imports for library users
pub mod prelude {
    pub use crate::{
        config::{Config, ConfigError, ContentKind, TextRendererConfig},
        render::{
            frame::{ContentProducer, FrameBackend, FrameOrchestrator, FrameSource, FrameStats, TickOutcome},
            systems::curve::{CurveGeometry, CurveInstance, CurveRow, CurveRowStyle},
            systems::text::{FontMetrics, GlyphInstance, TextLayout, TextStyle},
            RenderError, RenderResult,
        },
    };
}
