//! Curve glyphs
//!
//! Glyph outlines drawn straight from their triangulation instead of an
//! atlas. Triangles fully inside the outline are filled; triangles spanning a
//! quadratic segment are cut along it in the fragment stage with the
//! Loop-Blinn implicit `u^2 - v`. The shape is uploaded once and every
//! instance record only places a copy of it.

mod curve_geometry;
mod curve_row;

pub use curve_geometry::{CurveError, CurveGeometry, CurveTriangle, PrimitiveKind, MAX_CURVE_TRIANGLES};
pub use curve_row::{CurveInstance, CurveRow, CurveRowStyle, CURVE_INSTANCE_SIZE};
