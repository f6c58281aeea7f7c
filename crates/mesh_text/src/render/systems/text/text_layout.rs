//! Text layout engine
//!
//! Converts a string into one [`GlyphInstance`] per visible glyph, positioned
//! in normalized device coordinates for a given surface extent.
//!
//! # Layout Coordinate System
//!
//! - Pixel origin is the top-left corner of the surface, +Y down
//! - The pen starts at (`start_x`, `baseline_y`) on the first baseline
//! - Glyph plane bounds are in font units relative to the pen, +Y up
//! - `scale = font_px / em_size` converts font units to pixels

use ash::vk;
use nalgebra::Vector2;

use super::{Bounds, FontMetrics, YOrigin};
use crate::render::frame::{ContentProducer, GlyphInstance};

/// Placement and size of a text block
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    /// Font size in pixels per em
    pub font_px: f32,
    /// Pen X at the start of every line, in pixels
    pub start_x: f32,
    /// Baseline Y of the first line, in pixels from the top
    pub baseline_y: f32,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_px: 140.0,
            start_x: 60.0,
            baseline_y: 180.0,
        }
    }
}

/// Lays out a string with one font and produces glyph instances every frame
pub struct TextLayout {
    metrics: FontMetrics,
    style: TextStyle,
    text: String,
}

impl TextLayout {
    /// Create a layout for `text` using the given font metrics
    pub fn new(metrics: FontMetrics, style: TextStyle, text: impl Into<String>) -> Self {
        Self {
            metrics,
            style,
            text: text.into(),
        }
    }

    /// Replace the text drawn from the next frame on
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    /// Text currently laid out
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Replace the placement and size
    pub fn set_style(&mut self, style: TextStyle) {
        self.style = style;
    }

    /// Current placement and size
    pub const fn style(&self) -> TextStyle {
        self.style
    }

    /// Font metrics used for layout
    pub const fn metrics(&self) -> &FontMetrics {
        &self.metrics
    }

    /// Font units to pixels
    pub fn scale(&self) -> f32 {
        self.style.font_px / self.metrics.em_size()
    }

    /// Distance between consecutive baselines in pixels
    pub fn line_advance(&self) -> f32 {
        let line_height = self.metrics.line_height();
        let units = if line_height == 0.0 { self.metrics.em_size() } else { line_height };
        units * self.scale()
    }

    /// Lay out the text for a surface of `width` x `height` pixels, appending to `out`
    pub fn layout_into(&self, width: u32, height: u32, out: &mut Vec<GlyphInstance>) {
        let scale = self.scale();
        let line_advance = self.line_advance();
        let surface = Vector2::new(width.max(1) as f32, height.max(1) as f32);
        let origin = Vector2::new(self.style.start_x, self.style.baseline_y);

        let mut pen = origin;

        for ch in self.text.chars() {
            if ch == '\n' {
                pen.x = origin.x;
                pen.y += line_advance;
                continue;
            }

            let Some(glyph) = self.metrics.glyph(u32::from(ch)) else {
                continue;
            };

            if let (Some(plane), Some(atlas)) = (glyph.plane_bounds, glyph.atlas_bounds) {
                let top_left = pen + Vector2::new(plane.left, -plane.top) * scale;
                let bottom_right = pen + Vector2::new(plane.right, -plane.bottom) * scale;
                let (uv_min, uv_max) = self.atlas_uv(&atlas);

                out.push(GlyphInstance {
                    pos_min: to_ndc(top_left, surface),
                    pos_max: to_ndc(bottom_right, surface),
                    uv_min,
                    uv_max,
                });
            }

            pen.x += glyph.advance * scale;
        }
    }

    /// UV box with `uv_min` at the glyph's top-left texel
    fn atlas_uv(&self, atlas: &Bounds) -> ([f32; 2], [f32; 2]) {
        let info = self.metrics.atlas();
        let width = info.width as f32;
        let height = info.height as f32;

        let (v_min, v_max) = match info.y_origin {
            YOrigin::Bottom => (1.0 - atlas.top / height, 1.0 - atlas.bottom / height),
            YOrigin::Top => (atlas.top / height, atlas.bottom / height),
        };

        ([atlas.left / width, v_min], [atlas.right / width, v_max])
    }
}

impl ContentProducer for TextLayout {
    type Instance = GlyphInstance;

    fn produce(&mut self, extent: vk::Extent2D, out: &mut Vec<GlyphInstance>) {
        out.clear();
        self.layout_into(extent.width, extent.height, out);
    }
}

fn to_ndc(pixel: Vector2<f32>, surface: Vector2<f32>) -> [f32; 2] {
    let ndc = pixel.component_div(&surface) * 2.0 - Vector2::repeat(1.0);
    [ndc.x, ndc.y]
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const SCENARIO_FONT: &str = r#"{
        "atlas": { "width": 256, "height": 256, "yOrigin": "bottom", "distanceRange": 4 },
        "metrics": { "emSize": 48, "lineHeight": 0 },
        "glyphs": [
            { "unicode": 65, "advance": 20,
              "planeBounds": { "left": 0, "bottom": 0, "right": 18, "top": 28 },
              "atlasBounds": { "left": 4, "bottom": 100, "right": 22, "top": 128 } },
            { "unicode": 32, "advance": 12 }
        ]
    }"#;

    fn scenario_layout(text: &str) -> TextLayout {
        let metrics = FontMetrics::from_json(SCENARIO_FONT).unwrap();
        let style = TextStyle {
            font_px: 48.0,
            start_x: 60.0,
            baseline_y: 180.0,
        };
        TextLayout::new(metrics, style, text)
    }

    fn produce(layout: &mut TextLayout, width: u32, height: u32) -> Vec<GlyphInstance> {
        let mut out = Vec::new();
        layout.produce(vk::Extent2D { width, height }, &mut out);
        out
    }

    #[test]
    fn test_single_glyph_instance() {
        let mut layout = scenario_layout("A");
        let instances = produce(&mut layout, 1280, 720);

        assert_eq!(instances.len(), 1);
        let glyph = instances[0];

        // Pixel box (60, 152) - (78, 180)
        assert_relative_eq!(glyph.pos_min[0], 60.0 / 1280.0 * 2.0 - 1.0);
        assert_relative_eq!(glyph.pos_min[1], 152.0 / 720.0 * 2.0 - 1.0);
        assert_relative_eq!(glyph.pos_max[0], 78.0 / 1280.0 * 2.0 - 1.0);
        assert_relative_eq!(glyph.pos_max[1], -0.5);

        assert_relative_eq!(glyph.uv_min[0], 4.0 / 256.0);
        assert_relative_eq!(glyph.uv_min[1], 0.5);
        assert_relative_eq!(glyph.uv_max[0], 22.0 / 256.0);
        assert_relative_eq!(glyph.uv_max[1], 0.609_375);
    }

    #[test]
    fn test_newline_advances_baseline_by_em_when_line_height_is_zero() {
        let mut layout = scenario_layout("AA\nA");
        let instances = produce(&mut layout, 1280, 720);

        assert_eq!(instances.len(), 3);
        let first = instances[0];
        let second_line = instances[2];

        // Pen returns to start_x
        assert_relative_eq!(second_line.pos_min[0], first.pos_min[0]);

        // em * scale = 48 px, in NDC
        let delta = 48.0 / 720.0 * 2.0;
        assert_relative_eq!(second_line.pos_min[1] - first.pos_min[1], delta, epsilon = 1e-6);
    }

    #[test]
    fn test_newline_uses_line_height_when_present() {
        let json = SCENARIO_FONT.replace("\"lineHeight\": 0", "\"lineHeight\": 60");
        let metrics = FontMetrics::from_json(&json).unwrap();
        let layout = TextLayout::new(
            metrics,
            TextStyle {
                font_px: 24.0,
                start_x: 0.0,
                baseline_y: 100.0,
            },
            "A\nA",
        );

        assert_relative_eq!(layout.line_advance(), 30.0);

        let mut instances = Vec::new();
        layout.layout_into(1000, 1000, &mut instances);
        let delta = (instances[1].pos_min[1] - instances[0].pos_min[1]) * 1000.0 / 2.0;
        assert_relative_eq!(delta, 30.0, epsilon = 1e-3);
    }

    #[test]
    fn test_blank_glyph_advances_without_instance() {
        let mut layout = scenario_layout("A A");
        let instances = produce(&mut layout, 1280, 720);

        assert_eq!(instances.len(), 2);
        // advance 20 + space 12
        let expected_x = (60.0 + 32.0) / 1280.0 * 2.0 - 1.0;
        assert_relative_eq!(instances[1].pos_min[0], expected_x, epsilon = 1e-6);
    }

    #[test]
    fn test_missing_glyph_is_skipped_without_advance() {
        let mut layout = scenario_layout("A\u{2603}A");
        let instances = produce(&mut layout, 1280, 720);

        assert_eq!(instances.len(), 2);
        let expected_x = (60.0 + 20.0) / 1280.0 * 2.0 - 1.0;
        assert_relative_eq!(instances[1].pos_min[0], expected_x, epsilon = 1e-6);
    }

    #[test]
    fn test_top_origin_uv() {
        let json = SCENARIO_FONT.replace("\"bottom\", \"distanceRange\"", "\"top\", \"distanceRange\"");
        let metrics = FontMetrics::from_json(&json).unwrap();
        let layout = TextLayout::new(metrics, TextStyle::default(), "A");

        let mut instances = Vec::new();
        layout.layout_into(1280, 720, &mut instances);

        assert_relative_eq!(instances[0].uv_min[1], 128.0 / 256.0);
        assert_relative_eq!(instances[0].uv_max[1], 100.0 / 256.0);
    }

    #[test]
    fn test_produce_replaces_previous_records() {
        let mut layout = scenario_layout("AAA");
        let mut out = vec![GlyphInstance::default(); 10];

        layout.produce(vk::Extent2D { width: 640, height: 480 }, &mut out);
        assert_eq!(out.len(), 3);

        layout.set_text("A");
        layout.produce(vk::Extent2D { width: 640, height: 480 }, &mut out);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn test_layout_follows_extent() {
        let mut layout = scenario_layout("A");
        let wide = produce(&mut layout, 1280, 720)[0];
        let narrow = produce(&mut layout, 640, 480)[0];

        assert_relative_eq!(narrow.pos_min[0], 60.0 / 640.0 * 2.0 - 1.0);
        assert!(narrow.pos_max[0] > wide.pos_max[0]);
        // UVs do not depend on the surface
        assert_eq!(narrow.uv_min, wide.uv_min);
    }
}
