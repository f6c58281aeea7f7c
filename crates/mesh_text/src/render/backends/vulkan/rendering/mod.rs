// Vulkan rendering components

pub mod commands;
pub mod pipeline;
pub mod shader;

pub use commands::{color_subresource_range, image_barrier, record_text_frame, CommandPool, TextFrame};
pub use pipeline::{
    text_blend_attachment, CurvePushConstants, MeshTextPipeline, PipelineVariant, TextPushConstants,
    CURVE_FRAGMENT_SHADER_FILE, CURVE_MESH_SHADER_FILE, FRAGMENT_SHADER_FILE, MESH_SHADER_FILE,
};
pub use shader::{validate_spirv_len, ShaderModule};
