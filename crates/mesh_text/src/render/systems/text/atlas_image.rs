//! MSDF atlas pixels
//!
//! The atlas is RGBA8. It arrives either as a PNG or as a flat pixel dump whose
//! length must match the size the font metrics report; one legacy dump format
//! carries a 12-byte header in front of the pixels.

use std::path::{Path, PathBuf};

/// Bytes of header in front of the pixels in legacy raw atlas dumps
pub const LEGACY_HEADER_LEN: usize = 12;

/// Errors that can occur while loading atlas pixels
#[derive(Debug, thiserror::Error)]
pub enum AtlasError {
    /// Atlas file could not be read
    #[error("Failed to read atlas {path}: {source}")]
    Io {
        /// File that failed to load
        path: PathBuf,
        /// Underlying IO error
        source: std::io::Error,
    },

    /// PNG decoding failed
    #[error("Failed to decode atlas image: {0}")]
    Decode(#[from] image::ImageError),

    /// Raw pixel dump has neither the plain nor the legacy length
    #[error("Atlas byte length {actual} does not match {width}x{height} RGBA8 ({expected} bytes, or {expected} + 12)")]
    ByteLengthMismatch {
        /// Expected width
        width: u32,
        /// Expected height
        height: u32,
        /// width * height * 4
        expected: usize,
        /// Length of the data found
        actual: usize,
    },

    /// Decoded image size differs from the size in the font metrics
    #[error("Atlas image is {actual_width}x{actual_height}, font metrics expect {width}x{height}")]
    DimensionMismatch {
        /// Expected width
        width: u32,
        /// Expected height
        height: u32,
        /// Decoded width
        actual_width: u32,
        /// Decoded height
        actual_height: u32,
    },
}

/// Tightly packed RGBA8 atlas pixels
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtlasImage {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl AtlasImage {
    /// Load the atlas, expecting the given dimensions
    ///
    /// `.png` files are decoded; anything else is treated as a raw RGBA8 dump.
    pub fn load(path: impl AsRef<Path>, width: u32, height: u32) -> Result<Self, AtlasError> {
        let path = path.as_ref();
        let is_png = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("png"));

        let atlas = if is_png {
            let decoded = image::open(path)?.to_rgba8();
            if decoded.width() != width || decoded.height() != height {
                return Err(AtlasError::DimensionMismatch {
                    width,
                    height,
                    actual_width: decoded.width(),
                    actual_height: decoded.height(),
                });
            }
            Self {
                width,
                height,
                pixels: decoded.into_raw(),
            }
        } else {
            let bytes = std::fs::read(path).map_err(|source| AtlasError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            Self::from_raw_bytes(bytes, width, height)?
        };

        log::debug!("Loaded atlas {} ({}x{})", path.display(), width, height);
        Ok(atlas)
    }

    /// Accept a raw RGBA8 dump, stripping the legacy header when present
    pub fn from_raw_bytes(mut bytes: Vec<u8>, width: u32, height: u32) -> Result<Self, AtlasError> {
        let expected = width as usize * height as usize * 4;

        if bytes.len() == expected + LEGACY_HEADER_LEN {
            log::debug!("Atlas carries a {}-byte legacy header, skipping it", LEGACY_HEADER_LEN);
            bytes.drain(..LEGACY_HEADER_LEN);
        } else if bytes.len() != expected {
            return Err(AtlasError::ByteLengthMismatch {
                width,
                height,
                expected,
                actual: bytes.len(),
            });
        }

        Ok(Self {
            width,
            height,
            pixels: bytes,
        })
    }

    /// Width in pixels
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// RGBA8 pixel data, row-major from the top row
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_length_accepted() {
        let atlas = AtlasImage::from_raw_bytes(vec![7; 4 * 2 * 4], 4, 2).unwrap();
        assert_eq!(atlas.pixels().len(), 32);
        assert_eq!((atlas.width(), atlas.height()), (4, 2));
    }

    #[test]
    fn test_legacy_header_skipped() {
        let mut bytes = vec![0xEE; LEGACY_HEADER_LEN];
        bytes.extend(std::iter::repeat(1u8).take(2 * 2 * 4));

        let atlas = AtlasImage::from_raw_bytes(bytes, 2, 2).unwrap();
        assert_eq!(atlas.pixels().len(), 16);
        assert!(atlas.pixels().iter().all(|&b| b == 1));
    }

    #[test]
    fn test_other_lengths_rejected() {
        for len in [0, 15, 17, 16 + 11, 16 + 13] {
            let result = AtlasImage::from_raw_bytes(vec![0; len], 2, 2);
            assert!(
                matches!(result, Err(AtlasError::ByteLengthMismatch { expected: 16, .. })),
                "length {len} should be rejected"
            );
        }
    }
}
