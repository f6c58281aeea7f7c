//! Vulkan resource management
//!
//! Buffers, the atlas texture, the instance buffer and descriptor sets, and
//! the [`DrawContent`] bundles that tie them to a pipeline variant.

/// Buffers with dedicated allocations
pub mod buffer;

/// Curve glyph outline and instance buffers
pub mod curve_resources;

/// Descriptor set management
pub mod descriptor_set;

/// Per-variant resource bundles
pub mod draw_content;

/// Persistently mapped instance buffer
pub mod instance_buffer;

/// Everything set 0 of the text pipeline binds
pub mod text_resources;

/// Atlas texture upload and sampling
pub mod texture;

pub use buffer::{allocate_memory, find_memory_type, Buffer};
pub use curve_resources::{
    CurveResources, CURVE_INSTANCE_BINDING, CURVE_KIND_BINDING, CURVE_POSITION_BINDING, CURVE_TRIANGLE_BINDING,
};
pub use descriptor_set::{
    pool_sizes_for, DescriptorPool, DescriptorSetLayout, DescriptorSetLayoutBuilder, DescriptorSetWriter,
};
pub use draw_content::{allocate_single_set, DrawContent, ResourceContext};
pub use instance_buffer::InstanceBuffer;
pub use text_resources::{TextResources, ATLAS_BINDING, INSTANCE_BINDING};
pub use texture::{atlas_sampler_info, AtlasTexture, ATLAS_FORMAT};
