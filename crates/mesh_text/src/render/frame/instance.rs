//! Glyph instance records
//!
//! One record per glyph, read by the mesh shader from a storage buffer
//! (`GlyphInstance instances[]` at set 0, binding 1). Layout matches std430:
//! four `vec2`s, 32 bytes, no padding. [`write_instance_records`] works for
//! any `Pod` record, curve instances included.

use bytemuck::{Pod, Zeroable};

/// Screen box and atlas box of one glyph
///
/// Positions are normalized device coordinates (+Y down). `uv_min` is the
/// texel corner matching `pos_min`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
#[repr(C)]
pub struct GlyphInstance {
    /// Top-left corner in NDC
    pub pos_min: [f32; 2],
    /// Bottom-right corner in NDC
    pub pos_max: [f32; 2],
    /// Atlas UV at `pos_min`
    pub uv_min: [f32; 2],
    /// Atlas UV at `pos_max`
    pub uv_max: [f32; 2],
}

/// Size of one record in bytes
pub const GLYPH_INSTANCE_SIZE: usize = std::mem::size_of::<GlyphInstance>();

/// Copy as many records as fit into `dst`, returning how many were written
///
/// `dst.len() / size_of::<T>()` is the capacity; bytes past the last whole
/// record are never touched. Records beyond the capacity are dropped.
pub fn write_instance_records<T: Pod>(dst: &mut [u8], records: &[T]) -> usize {
    let capacity = dst.len() / std::mem::size_of::<T>();
    let count = records.len().min(capacity);
    let bytes: &[u8] = bytemuck::cast_slice(&records[..count]);
    dst[..bytes.len()].copy_from_slice(bytes);
    count
}
