//! A row of curve glyphs
//!
//! [`CurveRow`] places `count` copies of the uploaded outline side by side in
//! normalized device coordinates. The vertical size is fixed in NDC; the
//! horizontal scale follows the surface aspect so the outline keeps its shape
//! across resizes.

use ash::vk;
use bytemuck::{Pod, Zeroable};

use crate::render::frame::ContentProducer;

/// Placement of one outline copy, read by the curve mesh shader
///
/// Shape-space positions map to `position * scale + offset` in NDC.
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
#[repr(C)]
pub struct CurveInstance {
    /// NDC position of the shape origin
    pub offset: [f32; 2],
    /// Shape-space to NDC scale per axis
    pub scale: [f32; 2],
}

/// Size of one record in bytes
pub const CURVE_INSTANCE_SIZE: usize = std::mem::size_of::<CurveInstance>();

/// Where the row goes and how big each copy is
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurveRowStyle {
    /// Number of copies
    pub count: u32,
    /// NDC x of the first copy
    pub start_x: f32,
    /// NDC distance between copies
    pub step_x: f32,
    /// NDC y of the row
    pub y: f32,
    /// NDC half-height of one copy (the shape spans -1..1)
    pub height: f32,
}

impl Default for CurveRowStyle {
    fn default() -> Self {
        Self {
            count: 8,
            start_x: -0.55,
            step_x: 0.16,
            y: 0.0,
            height: 0.25,
        }
    }
}

/// Content producer for a row of curve glyphs
#[derive(Debug, Clone)]
pub struct CurveRow {
    style: CurveRowStyle,
}

impl CurveRow {
    /// Row with the given placement
    pub const fn new(style: CurveRowStyle) -> Self {
        Self { style }
    }

    /// Current placement
    pub const fn style(&self) -> &CurveRowStyle {
        &self.style
    }

    /// Change placement; takes effect on the next frame
    pub fn set_style(&mut self, style: CurveRowStyle) {
        self.style = style;
    }
}

impl ContentProducer for CurveRow {
    type Instance = CurveInstance;

    fn produce(&mut self, extent: vk::Extent2D, out: &mut Vec<CurveInstance>) {
        out.clear();

        let aspect = extent.height.max(1) as f32 / extent.width.max(1) as f32;
        let scale = [self.style.height * aspect, self.style.height];

        out.extend((0..self.style.count).map(|i| CurveInstance {
            offset: [self.style.start_x + self.style.step_x * i as f32, self.style.y],
            scale,
        }));
    }
}
