//! MSDF text
//!
//! Font metrics and atlas loading, and the layout that turns a string into
//! glyph instances for the mesh shader.

mod atlas_image;
mod font_metrics;
mod text_layout;

pub use crate::render::frame::GlyphInstance;
pub use atlas_image::{AtlasError, AtlasImage, LEGACY_HEADER_LEN};
pub use font_metrics::{AtlasInfo, Bounds, FontError, FontMetrics, FontResult, GlyphMetric, YOrigin};
pub use text_layout::{TextLayout, TextStyle};
