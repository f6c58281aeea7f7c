//! MSDF font metrics
//!
//! Loads the JSON written by msdf-atlas-gen: atlas dimensions and distance
//! range, global font metrics, and per-glyph advance / plane / atlas boxes.
//! The loaded [`FontMetrics`] is immutable and is handed explicitly to
//! whatever lays out text with it.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Result type for font operations
pub type FontResult<T> = Result<T, FontError>;

/// Errors that can occur while loading font metrics
#[derive(Debug, thiserror::Error)]
pub enum FontError {
    /// Font JSON could not be read from disk
    #[error("Failed to read font metrics {path}: {source}")]
    Io {
        /// File that failed to load
        path: PathBuf,
        /// Underlying IO error
        source: std::io::Error,
    },

    /// Font JSON is not valid JSON or has wrongly typed fields
    #[error("Malformed font metrics: {0}")]
    Json(#[from] serde_json::Error),

    /// The `atlas` section is missing
    #[error("Font metrics have no \"atlas\" section")]
    MissingAtlas,

    /// The `glyphs` array is missing
    #[error("Font metrics have no \"glyphs\" array")]
    MissingGlyphs,

    /// `metrics.emSize` is zero or negative
    #[error("Invalid emSize {0}, must be positive")]
    InvalidEmSize(f32),

    /// Atlas width or height is not positive
    #[error("Invalid atlas size {width}x{height}")]
    InvalidAtlasSize {
        /// Reported width
        width: f64,
        /// Reported height
        height: f64,
    },
}

/// Axis-aligned box as written by msdf-atlas-gen
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    /// Left edge
    pub left: f32,
    /// Bottom edge
    pub bottom: f32,
    /// Right edge
    pub right: f32,
    /// Top edge
    pub top: f32,
}

/// Which edge of the atlas image row 0 of the bounds refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YOrigin {
    /// Atlas Y grows upward from the bottom row
    Bottom,
    /// Atlas Y grows downward from the top row
    Top,
}

/// Atlas description from the font JSON
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AtlasInfo {
    /// Atlas width in pixels
    pub width: u32,
    /// Atlas height in pixels
    pub height: u32,
    /// Origin of atlas-space Y coordinates
    pub y_origin: YOrigin,
    /// Signed distance range in atlas pixels
    pub distance_range: f32,
}

/// Per-glyph metrics
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlyphMetric {
    /// Unicode codepoint
    pub codepoint: u32,
    /// Horizontal advance in font units
    pub advance: f32,
    /// Quad relative to the pen on the baseline, in font units (absent for blank glyphs)
    pub plane_bounds: Option<Bounds>,
    /// Pixel box inside the atlas (absent for glyphs without a bitmap)
    pub atlas_bounds: Option<Bounds>,
}

/// Immutable font metrics loaded from msdf-atlas-gen JSON
#[derive(Debug, Clone)]
pub struct FontMetrics {
    atlas: AtlasInfo,
    em_size: f32,
    line_height: f32,
    ascender: f32,
    descender: f32,
    glyphs: HashMap<u32, GlyphMetric>,
}

#[derive(Deserialize)]
struct RawFont {
    atlas: Option<RawAtlas>,
    metrics: Option<RawMetrics>,
    glyphs: Option<Vec<RawGlyph>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAtlas {
    #[serde(default)]
    width: f64,
    #[serde(default)]
    height: f64,
    y_origin: Option<String>,
    distance_range: Option<f32>,
    px_range: Option<f32>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMetrics {
    em_size: Option<f32>,
    line_height: Option<f32>,
    ascender: Option<f32>,
    descender: Option<f32>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawGlyph {
    #[serde(default)]
    unicode: u32,
    #[serde(default)]
    advance: f32,
    plane_bounds: Option<RawBounds>,
    atlas_bounds: Option<RawBounds>,
}

// Edges are read individually; a box missing any of them counts as absent
#[derive(Deserialize, Default)]
#[serde(default)]
struct RawBounds {
    left: Option<f32>,
    bottom: Option<f32>,
    right: Option<f32>,
    top: Option<f32>,
}

impl RawBounds {
    fn complete(self) -> Option<Bounds> {
        Some(Bounds {
            left: self.left?,
            bottom: self.bottom?,
            right: self.right?,
            top: self.top?,
        })
    }
}

const DEFAULT_EM_SIZE: f32 = 48.0;
const DEFAULT_DISTANCE_RANGE: f32 = 4.0;

impl FontMetrics {
    /// Load font metrics from a JSON file
    pub fn load(path: impl AsRef<Path>) -> FontResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| FontError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let metrics = Self::from_json(&json)?;
        log::info!(
            "Loaded font {}: atlas {}x{}, {} glyphs, pxRange={}, emSize={}",
            path.display(),
            metrics.atlas.width,
            metrics.atlas.height,
            metrics.glyphs.len(),
            metrics.atlas.distance_range,
            metrics.em_size
        );
        Ok(metrics)
    }

    /// Parse font metrics from msdf-atlas-gen JSON text
    pub fn from_json(json: &str) -> FontResult<Self> {
        let raw: RawFont = serde_json::from_str(json)?;

        let raw_atlas = raw.atlas.ok_or(FontError::MissingAtlas)?;
        let raw_glyphs = raw.glyphs.ok_or(FontError::MissingGlyphs)?;

        if !(raw_atlas.width > 0.0 && raw_atlas.height > 0.0) {
            return Err(FontError::InvalidAtlasSize {
                width: raw_atlas.width,
                height: raw_atlas.height,
            });
        }

        // pxRange wins over distanceRange when both are present
        let distance_range = raw_atlas
            .px_range
            .or(raw_atlas.distance_range)
            .unwrap_or(DEFAULT_DISTANCE_RANGE);

        let y_origin = match raw_atlas.y_origin.as_deref() {
            None | Some("bottom") => YOrigin::Bottom,
            Some(_) => YOrigin::Top,
        };

        let atlas = AtlasInfo {
            width: raw_atlas.width as u32,
            height: raw_atlas.height as u32,
            y_origin,
            distance_range,
        };

        let metrics = raw.metrics.unwrap_or(RawMetrics {
            em_size: None,
            line_height: None,
            ascender: None,
            descender: None,
        });

        let em_size = metrics.em_size.unwrap_or(DEFAULT_EM_SIZE);
        if em_size.is_nan() || em_size <= 0.0 {
            return Err(FontError::InvalidEmSize(em_size));
        }

        let glyphs = raw_glyphs
            .into_iter()
            .map(|g| {
                (
                    g.unicode,
                    GlyphMetric {
                        codepoint: g.unicode,
                        advance: g.advance,
                        plane_bounds: g.plane_bounds.and_then(RawBounds::complete),
                        atlas_bounds: g.atlas_bounds.and_then(RawBounds::complete),
                    },
                )
            })
            .collect();

        Ok(Self {
            atlas,
            em_size,
            line_height: metrics.line_height.unwrap_or(0.0),
            ascender: metrics.ascender.unwrap_or(0.0),
            descender: metrics.descender.unwrap_or(0.0),
            glyphs,
        })
    }

    /// Look up a glyph by codepoint
    pub fn glyph(&self, codepoint: u32) -> Option<&GlyphMetric> {
        self.glyphs.get(&codepoint)
    }

    /// Atlas description
    pub const fn atlas(&self) -> &AtlasInfo {
        &self.atlas
    }

    /// Em size in font units
    pub const fn em_size(&self) -> f32 {
        self.em_size
    }

    /// Line height in font units, 0.0 when the font doesn't report one
    pub const fn line_height(&self) -> f32 {
        self.line_height
    }

    /// Ascender in font units
    pub const fn ascender(&self) -> f32 {
        self.ascender
    }

    /// Descender in font units
    pub const fn descender(&self) -> f32 {
        self.descender
    }

    /// Number of glyphs
    pub fn glyph_count(&self) -> usize {
        self.glyphs.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FONT_JSON: &str = r#"{
        "atlas": { "type": "msdf", "distanceRange": 6, "size": 48, "width": 256, "height": 128, "yOrigin": "top" },
        "metrics": { "emSize": 1, "lineHeight": 1.25, "ascender": 0.9, "descender": -0.25 },
        "glyphs": [
            { "unicode": 32, "advance": 0.25 },
            { "unicode": 65, "advance": 0.6,
              "planeBounds": { "left": 0.0, "bottom": -0.1, "right": 0.55, "top": 0.8 },
              "atlasBounds": { "left": 1.5, "bottom": 40.5, "right": 30.5, "top": 1.5 } }
        ]
    }"#;

    #[test]
    fn test_parse_msdf_atlas_gen_json() {
        let font = FontMetrics::from_json(FONT_JSON).unwrap();

        assert_eq!(font.atlas().width, 256);
        assert_eq!(font.atlas().height, 128);
        assert_eq!(font.atlas().y_origin, YOrigin::Top);
        assert_eq!(font.atlas().distance_range, 6.0);
        assert_eq!(font.em_size(), 1.0);
        assert_eq!(font.line_height(), 1.25);
        assert_eq!(font.glyph_count(), 2);

        let space = font.glyph(32).unwrap();
        assert_eq!(space.advance, 0.25);
        assert!(space.plane_bounds.is_none());
        assert!(space.atlas_bounds.is_none());

        let a = font.glyph(u32::from('A')).unwrap();
        assert_eq!(a.plane_bounds.unwrap().right, 0.55);
        assert_eq!(a.atlas_bounds.unwrap().bottom, 40.5);
    }

    #[test]
    fn test_defaults_when_optional_fields_absent() {
        let font = FontMetrics::from_json(r#"{ "atlas": { "width": 64, "height": 64 }, "glyphs": [] }"#).unwrap();

        assert_eq!(font.atlas().y_origin, YOrigin::Bottom);
        assert_eq!(font.atlas().distance_range, 4.0);
        assert_eq!(font.em_size(), 48.0);
        assert_eq!(font.line_height(), 0.0);
        assert!(font.glyph(65).is_none());
    }

    #[test]
    fn test_px_range_overrides_distance_range() {
        let font = FontMetrics::from_json(
            r#"{ "atlas": { "width": 8, "height": 8, "distanceRange": 2, "pxRange": 8 }, "glyphs": [] }"#,
        )
        .unwrap();
        assert_eq!(font.atlas().distance_range, 8.0);
    }

    #[test]
    fn test_missing_sections_are_errors() {
        assert!(matches!(
            FontMetrics::from_json(r#"{ "glyphs": [] }"#),
            Err(FontError::MissingAtlas)
        ));
        assert!(matches!(
            FontMetrics::from_json(r#"{ "atlas": { "width": 8, "height": 8 } }"#),
            Err(FontError::MissingGlyphs)
        ));
        assert!(matches!(FontMetrics::from_json("not json"), Err(FontError::Json(_))));
    }

    #[test]
    fn test_non_positive_atlas_size_is_error() {
        let result = FontMetrics::from_json(r#"{ "atlas": { "width": 0, "height": 64 }, "glyphs": [] }"#);
        assert!(matches!(result, Err(FontError::InvalidAtlasSize { .. })));

        let result = FontMetrics::from_json(r#"{ "atlas": { "width": 64 }, "glyphs": [] }"#);
        assert!(matches!(result, Err(FontError::InvalidAtlasSize { .. })));
    }

    #[test]
    fn test_incomplete_bounds_treated_as_absent() {
        let font = FontMetrics::from_json(
            r#"{ "atlas": { "width": 64, "height": 64 }, "glyphs": [
                { "unicode": 66, "advance": 0.5,
                  "planeBounds": { "left": 0, "right": 5 },
                  "atlasBounds": { "left": 1, "bottom": 2, "right": 3, "top": 4 } },
                { "unicode": 67, "advance": 0.5, "planeBounds": {} }
            ] }"#,
        )
        .unwrap();

        let b = font.glyph(66).unwrap();
        assert!(b.plane_bounds.is_none());
        assert_eq!(
            b.atlas_bounds,
            Some(Bounds { left: 1.0, bottom: 2.0, right: 3.0, top: 4.0 })
        );
        assert!(font.glyph(67).unwrap().plane_bounds.is_none());
    }

    #[test]
    fn test_non_positive_em_size_is_error() {
        let zero = FontMetrics::from_json(
            r#"{ "atlas": { "width": 8, "height": 8 }, "metrics": { "emSize": 0 }, "glyphs": [] }"#,
        );
        assert!(matches!(zero, Err(FontError::InvalidEmSize(e)) if e == 0.0));

        let negative = FontMetrics::from_json(
            r#"{ "atlas": { "width": 8, "height": 8 }, "metrics": { "emSize": -2 }, "glyphs": [] }"#,
        );
        assert!(matches!(negative, Err(FontError::InvalidEmSize(_))));
    }
}
