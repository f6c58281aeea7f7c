//! GPU resources bound by the text pipeline
//!
//! One descriptor set ties the atlas (binding 0) and the instance buffer
//! (binding 1) together. Neither depends on the swapchain, so the bundle
//! survives every surface recreation.

use ash::vk;

use super::descriptor_set::{DescriptorPool, DescriptorSetWriter};
use super::draw_content::{allocate_single_set, DrawContent, ResourceContext};
use super::instance_buffer::InstanceBuffer;
use super::texture::AtlasTexture;
use crate::render::backends::vulkan::rendering::{PipelineVariant, TextPushConstants};
use crate::render::frame::GlyphInstance;
use crate::render::systems::text::AtlasImage;
use crate::render::RenderResult;

/// Binding of the atlas sampler in set 0
pub const ATLAS_BINDING: u32 = 0;
/// Binding of the instance buffer in set 0
pub const INSTANCE_BINDING: u32 = 1;

/// Atlas, instance buffer and the descriptor set pointing at both
pub struct TextResources {
    descriptor_set: vk::DescriptorSet,
    instances: InstanceBuffer<GlyphInstance>,
    _atlas: AtlasTexture,
    _pool: DescriptorPool,
}

impl DrawContent for TextResources {
    type Instance = GlyphInstance;
    type PushConstants = TextPushConstants;
    type Source = AtlasImage;

    const VARIANT: PipelineVariant = PipelineVariant::Msdf;

    fn create(ctx: &ResourceContext<'_>, atlas: &AtlasImage, instance_capacity: usize) -> RenderResult<Self> {
        let atlas = AtlasTexture::upload(ctx.device, ctx.memory_properties, ctx.command_pool, ctx.queue, atlas)?;
        let instances = InstanceBuffer::new(ctx.device, ctx.memory_properties, instance_capacity)?;

        let (pool, descriptor_set) = allocate_single_set(ctx.device, ctx.set_layout)?;
        DescriptorSetWriter::new(descriptor_set)
            .write_combined_image(
                ATLAS_BINDING,
                atlas.image_view(),
                atlas.sampler(),
                vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
            )
            .write_storage_buffer(INSTANCE_BINDING, instances.handle())
            .update(ctx.device);

        Ok(Self {
            descriptor_set,
            instances,
            _atlas: atlas,
            _pool: pool,
        })
    }

    fn descriptor_set(&self) -> vk::DescriptorSet {
        self.descriptor_set
    }

    fn write_instances(&mut self, records: &[GlyphInstance]) -> usize {
        self.instances.write(records)
    }

    fn instance_capacity(&self) -> usize {
        self.instances.capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bindings_match_msdf_variant_layout() {
        let builder = PipelineVariant::Msdf.set_layout();
        let bindings = builder.bindings();

        assert_eq!(bindings[0].binding, ATLAS_BINDING);
        assert_eq!(bindings[0].descriptor_type, vk::DescriptorType::COMBINED_IMAGE_SAMPLER);
        assert_eq!(bindings[1].binding, INSTANCE_BINDING);
        assert_eq!(bindings[1].descriptor_type, vk::DescriptorType::STORAGE_BUFFER);
    }

    #[test]
    fn test_push_constants_fill_the_variant_range() {
        assert_eq!(
            std::mem::size_of::<<TextResources as DrawContent>::PushConstants>() as u32,
            TextResources::VARIANT.push_constant_size()
        );
    }
}
