//! Mesh-shader text pipeline
//!
//! A graphics pipeline with a mesh stage and a fragment stage, rendering
//! straight into the swapchain format through dynamic rendering (no render
//! pass object). The descriptor set layout and pipeline layout live as long
//! as the pipeline; only the `vk::Pipeline` itself is rebuilt when the
//! swapchain format changes.
//!
//! [`PipelineVariant`] picks the shader pair and set 0 layout: MSDF quads
//! sampled from an atlas, or curve glyphs expanded from storage buffers.

use std::ffi::CStr;
use std::path::Path;

use ash::{vk, Device};
use bytemuck::{Pod, Zeroable};

use super::shader::ShaderModule;
use crate::render::backends::vulkan::resources::{DescriptorSetLayout, DescriptorSetLayoutBuilder};
use crate::render::{RenderError, RenderResult};

/// Mesh shader file name inside the shader directory
pub const MESH_SHADER_FILE: &str = "mesh_text.mesh.spv";
/// Fragment shader file name inside the shader directory
pub const FRAGMENT_SHADER_FILE: &str = "mesh_text.frag.spv";
/// Curve glyph mesh shader file name
pub const CURVE_MESH_SHADER_FILE: &str = "mesh_curve.mesh.spv";
/// Curve glyph fragment shader file name
pub const CURVE_FRAGMENT_SHADER_FILE: &str = "mesh_curve.frag.spv";

const ENTRY_POINT: &CStr = unsafe { CStr::from_bytes_with_nul_unchecked(b"main\0") };

/// Fragment push constants
///
/// Matches the `TextParams` block in `mesh_text.frag`; padded to 16 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
#[repr(C)]
pub struct TextPushConstants {
    /// Distance range in atlas pixels
    pub px_range: f32,
    /// Non-zero shows the raw atlas channels instead of text
    pub debug_atlas: u32,
    /// Padding to 16 bytes
    pub _pad: [u32; 2],
}

impl TextPushConstants {
    /// Push constants for a distance range and debug toggle
    pub const fn new(px_range: f32, debug_atlas: bool) -> Self {
        Self {
            px_range,
            debug_atlas: debug_atlas as u32,
            _pad: [0; 2],
        }
    }
}

/// Fragment push constants for curve glyphs
///
/// Matches the `CurveParams` block in `mesh_curve.frag`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
#[repr(C)]
pub struct CurvePushConstants {
    /// Fill color, straight alpha
    pub fill_color: [f32; 4],
}

/// Which shaders and set 0 layout a pipeline is built from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineVariant {
    /// Atlas sampler at binding 0, glyph quads at binding 1
    Msdf,
    /// Positions, triangles, primitive kinds and instances at bindings 0-3
    Curve,
}

impl PipelineVariant {
    /// Mesh and fragment SPIR-V file names
    pub const fn shader_files(self) -> (&'static str, &'static str) {
        match self {
            Self::Msdf => (MESH_SHADER_FILE, FRAGMENT_SHADER_FILE),
            Self::Curve => (CURVE_MESH_SHADER_FILE, CURVE_FRAGMENT_SHADER_FILE),
        }
    }

    /// Bindings of set 0
    pub fn set_layout(self) -> DescriptorSetLayoutBuilder {
        match self {
            Self::Msdf => DescriptorSetLayoutBuilder::new()
                .add_combined_image_sampler(0, vk::ShaderStageFlags::FRAGMENT)
                .add_storage_buffer(1, vk::ShaderStageFlags::MESH_EXT),
            Self::Curve => (0..4).fold(DescriptorSetLayoutBuilder::new(), |builder, binding| {
                builder.add_storage_buffer(binding, vk::ShaderStageFlags::MESH_EXT)
            }),
        }
    }

    /// Size of the fragment push constant block
    pub const fn push_constant_size(self) -> u32 {
        match self {
            Self::Msdf => std::mem::size_of::<TextPushConstants>() as u32,
            Self::Curve => std::mem::size_of::<CurvePushConstants>() as u32,
        }
    }
}

/// Blend state for straight-alpha text over the clear color
pub fn text_blend_attachment() -> vk::PipelineColorBlendAttachmentState {
    vk::PipelineColorBlendAttachmentState {
        blend_enable: vk::TRUE,
        src_color_blend_factor: vk::BlendFactor::SRC_ALPHA,
        dst_color_blend_factor: vk::BlendFactor::ONE_MINUS_SRC_ALPHA,
        color_blend_op: vk::BlendOp::ADD,
        src_alpha_blend_factor: vk::BlendFactor::ONE,
        dst_alpha_blend_factor: vk::BlendFactor::ONE_MINUS_SRC_ALPHA,
        alpha_blend_op: vk::BlendOp::ADD,
        color_write_mask: vk::ColorComponentFlags::RGBA,
    }
}

/// Mesh-shader text pipeline with RAII cleanup
pub struct MeshTextPipeline {
    device: Device,
    variant: PipelineVariant,
    pipeline: vk::Pipeline,
    layout: vk::PipelineLayout,
    color_format: vk::Format,
    set_layout: DescriptorSetLayout,
    mesh_shader: ShaderModule,
    fragment_shader: ShaderModule,
}

impl MeshTextPipeline {
    /// Load the variant's shaders from `shader_dir` and build the pipeline for `color_format`
    pub fn new(
        device: &Device,
        shader_dir: &Path,
        variant: PipelineVariant,
        color_format: vk::Format,
    ) -> RenderResult<Self> {
        let (mesh_file, fragment_file) = variant.shader_files();
        let mesh_shader = ShaderModule::from_file(device, shader_dir.join(mesh_file))?;
        let fragment_shader = ShaderModule::from_file(device, shader_dir.join(fragment_file))?;

        let set_layout = variant.set_layout().build(device)?;

        let push_constant_ranges = [vk::PushConstantRange {
            stage_flags: vk::ShaderStageFlags::FRAGMENT,
            offset: 0,
            size: variant.push_constant_size(),
        }];
        let set_layouts = [set_layout.handle()];
        let layout_info = vk::PipelineLayoutCreateInfo::builder()
            .set_layouts(&set_layouts)
            .push_constant_ranges(&push_constant_ranges);
        let layout = unsafe { device.create_pipeline_layout(&layout_info, None) }
            .map_err(RenderError::api("vkCreatePipelineLayout"))?;

        let pipeline = match build_pipeline(device, layout, &mesh_shader, &fragment_shader, color_format) {
            Ok(pipeline) => pipeline,
            Err(e) => {
                unsafe { device.destroy_pipeline_layout(layout, None) };
                return Err(e);
            }
        };

        log::info!("[PIPELINE] Created {:?} mesh pipeline for {:?}", variant, color_format);

        Ok(Self {
            device: device.clone(),
            variant,
            pipeline,
            layout,
            color_format,
            set_layout,
            mesh_shader,
            fragment_shader,
        })
    }

    /// Rebuild the pipeline for a new color format
    ///
    /// Returns `false` without touching anything when the format is unchanged.
    /// The device must not be using the current pipeline.
    pub fn recreate(&mut self, color_format: vk::Format) -> RenderResult<bool> {
        if color_format == self.color_format {
            return Ok(false);
        }

        let pipeline = build_pipeline(
            &self.device,
            self.layout,
            &self.mesh_shader,
            &self.fragment_shader,
            color_format,
        )?;
        unsafe { self.device.destroy_pipeline(self.pipeline, None) };

        log::info!(
            "[PIPELINE] Rebuilt {:?} mesh pipeline {:?} -> {:?}",
            self.variant,
            self.color_format,
            color_format
        );
        self.pipeline = pipeline;
        self.color_format = color_format;
        Ok(true)
    }

    /// Get pipeline handle
    pub const fn handle(&self) -> vk::Pipeline {
        self.pipeline
    }

    /// Get layout handle
    pub const fn layout(&self) -> vk::PipelineLayout {
        self.layout
    }

    /// Descriptor set layout for set 0
    pub const fn set_layout(&self) -> &DescriptorSetLayout {
        &self.set_layout
    }

    /// Color attachment format the pipeline was built for
    pub const fn color_format(&self) -> vk::Format {
        self.color_format
    }
}

impl Drop for MeshTextPipeline {
    fn drop(&mut self) {
        log::debug!("[PIPELINE] Dropping mesh text pipeline {:?}", self.pipeline);
        unsafe {
            self.device.destroy_pipeline(self.pipeline, None);
            self.device.destroy_pipeline_layout(self.layout, None);
        }
    }
}

fn build_pipeline(
    device: &Device,
    layout: vk::PipelineLayout,
    mesh_shader: &ShaderModule,
    fragment_shader: &ShaderModule,
    color_format: vk::Format,
) -> RenderResult<vk::Pipeline> {
    let shader_stages = [
        mesh_shader.create_stage_info(vk::ShaderStageFlags::MESH_EXT, ENTRY_POINT),
        fragment_shader.create_stage_info(vk::ShaderStageFlags::FRAGMENT, ENTRY_POINT),
    ];

    // Ignored for mesh pipelines
    let input_assembly = vk::PipelineInputAssemblyStateCreateInfo::builder()
        .topology(vk::PrimitiveTopology::TRIANGLE_LIST)
        .primitive_restart_enable(false);

    let viewport_state = vk::PipelineViewportStateCreateInfo::builder()
        .viewport_count(1)
        .scissor_count(1);

    let dynamic_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
    let dynamic_state = vk::PipelineDynamicStateCreateInfo::builder().dynamic_states(&dynamic_states);

    let rasterizer = vk::PipelineRasterizationStateCreateInfo::builder()
        .depth_clamp_enable(false)
        .rasterizer_discard_enable(false)
        .polygon_mode(vk::PolygonMode::FILL)
        .line_width(1.0)
        .cull_mode(vk::CullModeFlags::NONE)
        .front_face(vk::FrontFace::COUNTER_CLOCKWISE)
        .depth_bias_enable(false);

    let multisampling = vk::PipelineMultisampleStateCreateInfo::builder()
        .sample_shading_enable(false)
        .rasterization_samples(vk::SampleCountFlags::TYPE_1);

    let color_blend_attachments = [text_blend_attachment()];
    let color_blending = vk::PipelineColorBlendStateCreateInfo::builder()
        .logic_op_enable(false)
        .attachments(&color_blend_attachments);

    let color_formats = [color_format];
    let mut rendering_info = vk::PipelineRenderingCreateInfo::builder().color_attachment_formats(&color_formats);

    let pipeline_info = vk::GraphicsPipelineCreateInfo::builder()
        .push_next(&mut rendering_info)
        .stages(&shader_stages)
        .input_assembly_state(&input_assembly)
        .viewport_state(&viewport_state)
        .rasterization_state(&rasterizer)
        .multisample_state(&multisampling)
        .color_blend_state(&color_blending)
        .dynamic_state(&dynamic_state)
        .layout(layout)
        .render_pass(vk::RenderPass::null());

    let pipelines = unsafe {
        device.create_graphics_pipelines(vk::PipelineCache::null(), &[pipeline_info.build()], None)
    }
    .map_err(|(_, result)| RenderError::Api {
        call: "vkCreateGraphicsPipelines",
        result,
    })?;

    pipelines
        .into_iter()
        .next()
        .ok_or_else(|| RenderError::InitializationFailed("vkCreateGraphicsPipelines returned no pipeline".to_string()))
}
