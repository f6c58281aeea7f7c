//! GPU side of a content kind
//!
//! A [`DrawContent`] owns whatever set 0 of its pipeline variant binds and
//! the instance buffer the producer's records are copied into. It is
//! created once against the pipeline's set layout and outlives every
//! swapchain recreation.

use ash::{vk, Device};
use bytemuck::Pod;

use super::descriptor_set::{DescriptorPool, DescriptorSetLayout};
use crate::render::backends::vulkan::rendering::{CommandPool, PipelineVariant};
use crate::render::{RenderError, RenderResult};

/// Device objects needed while creating content resources
pub struct ResourceContext<'a> {
    /// Logical device
    pub device: &'a Device,
    /// Memory heaps and types of the physical device
    pub memory_properties: &'a vk::PhysicalDeviceMemoryProperties,
    /// Pool for one-shot upload commands
    pub command_pool: &'a CommandPool,
    /// Graphics queue uploads are submitted to
    pub queue: vk::Queue,
    /// Set 0 layout of the pipeline the content is drawn with
    pub set_layout: &'a DescriptorSetLayout,
}

/// Resources behind one pipeline variant
pub trait DrawContent: Sized {
    /// Record the mesh shader reads per workgroup
    type Instance: Pod;
    /// Fragment push constant block
    type PushConstants: Pod;
    /// CPU-side data uploaded at creation
    type Source: ?Sized;

    /// Pipeline variant whose set 0 this content fills
    const VARIANT: PipelineVariant;

    /// Upload `source`, allocate the instance buffer and write set 0
    fn create(ctx: &ResourceContext<'_>, source: &Self::Source, instance_capacity: usize) -> RenderResult<Self>;

    /// Set 0 for the variant's pipeline
    fn descriptor_set(&self) -> vk::DescriptorSet;

    /// Copy records into the instance buffer, returning how many fit
    fn write_instances(&mut self, records: &[Self::Instance]) -> usize;

    /// Instance buffer capacity in records
    fn instance_capacity(&self) -> usize;
}

/// Pool with room for exactly one set of `layout`, and that set
pub fn allocate_single_set(
    device: &Device,
    layout: &DescriptorSetLayout,
) -> RenderResult<(DescriptorPool, vk::DescriptorSet)> {
    let pool = DescriptorPool::for_layout(device, layout, 1)?;
    let set = pool
        .allocate_descriptor_sets(&[layout.handle()])?
        .into_iter()
        .next()
        .ok_or_else(|| RenderError::InitializationFailed("no descriptor set allocated".to_string()))?;
    Ok((pool, set))
}
