//! GPU resources bound by the curve glyph pipeline
//!
//! The outline is uploaded once into three host-visible storage buffers
//! (positions, padded triangles, primitive kinds). The persistently mapped
//! instance buffer sits at binding 3. All four are read by the mesh stage.

use ash::vk;

use super::buffer::Buffer;
use super::descriptor_set::{DescriptorPool, DescriptorSetWriter};
use super::draw_content::{allocate_single_set, DrawContent, ResourceContext};
use super::instance_buffer::InstanceBuffer;
use crate::render::backends::vulkan::rendering::{CurvePushConstants, PipelineVariant};
use crate::render::systems::curve::{CurveGeometry, CurveInstance};
use crate::render::RenderResult;

/// Binding of the vertex positions
pub const CURVE_POSITION_BINDING: u32 = 0;
/// Binding of the triangle corner indices
pub const CURVE_TRIANGLE_BINDING: u32 = 1;
/// Binding of the primitive kinds
pub const CURVE_KIND_BINDING: u32 = 2;
/// Binding of the instance buffer
pub const CURVE_INSTANCE_BINDING: u32 = 3;

/// Outline buffers, instance buffer and the set binding them
pub struct CurveResources {
    descriptor_set: vk::DescriptorSet,
    instances: InstanceBuffer<CurveInstance>,
    _positions: Buffer,
    _triangles: Buffer,
    _kinds: Buffer,
    _pool: DescriptorPool,
}

impl CurveResources {
    fn upload(ctx: &ResourceContext<'_>, bytes: &[u8]) -> RenderResult<Buffer> {
        let buffer = Buffer::new(
            ctx.device,
            ctx.memory_properties,
            bytes.len() as vk::DeviceSize,
            vk::BufferUsageFlags::STORAGE_BUFFER,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
        )?;
        buffer.write_bytes(bytes)?;
        Ok(buffer)
    }
}

impl DrawContent for CurveResources {
    type Instance = CurveInstance;
    type PushConstants = CurvePushConstants;
    type Source = CurveGeometry;

    const VARIANT: PipelineVariant = PipelineVariant::Curve;

    fn create(ctx: &ResourceContext<'_>, geometry: &CurveGeometry, instance_capacity: usize) -> RenderResult<Self> {
        let positions = Self::upload(ctx, bytemuck::cast_slice(geometry.positions()))?;
        let triangles = Self::upload(ctx, bytemuck::cast_slice(geometry.triangles()))?;
        let kinds = Self::upload(ctx, bytemuck::cast_slice(geometry.kinds()))?;
        let instances = InstanceBuffer::new(ctx.device, ctx.memory_properties, instance_capacity)?;

        let (pool, descriptor_set) = allocate_single_set(ctx.device, ctx.set_layout)?;
        DescriptorSetWriter::new(descriptor_set)
            .write_storage_buffer(CURVE_POSITION_BINDING, positions.handle())
            .write_storage_buffer(CURVE_TRIANGLE_BINDING, triangles.handle())
            .write_storage_buffer(CURVE_KIND_BINDING, kinds.handle())
            .write_storage_buffer(CURVE_INSTANCE_BINDING, instances.handle())
            .update(ctx.device);

        log::info!(
            "[CURVES] Uploaded outline: {} vertices, {} triangles",
            geometry.positions().len(),
            geometry.triangle_count()
        );

        Ok(Self {
            descriptor_set,
            instances,
            _positions: positions,
            _triangles: triangles,
            _kinds: kinds,
            _pool: pool,
        })
    }

    fn descriptor_set(&self) -> vk::DescriptorSet {
        self.descriptor_set
    }

    fn write_instances(&mut self, records: &[CurveInstance]) -> usize {
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
    fn test_bindings_match_curve_variant_layout() {
        let builder = PipelineVariant::Curve.set_layout();
        let bindings: Vec<u32> = builder.bindings().iter().map(|b| b.binding).collect();

        assert_eq!(
            bindings,
            [
                CURVE_POSITION_BINDING,
                CURVE_TRIANGLE_BINDING,
                CURVE_KIND_BINDING,
                CURVE_INSTANCE_BINDING
            ]
        );
    }

    #[test]
    fn test_push_constants_fill_the_variant_range() {
        assert_eq!(
            std::mem::size_of::<<CurveResources as DrawContent>::PushConstants>() as u32,
            CurveResources::VARIANT.push_constant_size()
        );
    }
}
