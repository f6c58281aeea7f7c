//! Content producers
//!
//! Systems that fill the instance buffer each frame: MSDF text from an
//! atlas, or curve glyphs drawn from their outline triangulation.

pub mod curve;
pub mod text;
