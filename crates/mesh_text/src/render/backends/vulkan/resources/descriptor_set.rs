//! Descriptor set layouts, pools and writes
//!
//! Each pipeline variant uses a single set. MSDF text binds the atlas as a
//! combined image sampler (binding 0, fragment stage) and the instance
//! storage buffer (binding 1, mesh stage). Curve glyphs bind four storage
//! buffers, all read by the mesh stage.

use ash::{vk, Device};

use crate::render::{RenderError, RenderResult};

/// Descriptor set layout builder for creating reusable layouts
#[derive(Default)]
pub struct DescriptorSetLayoutBuilder {
    bindings: Vec<vk::DescriptorSetLayoutBinding>,
}

impl DescriptorSetLayoutBuilder {
    /// Create a new descriptor set layout builder
    pub fn new() -> Self {
        Self::default()
    }

    fn add(mut self, binding: u32, ty: vk::DescriptorType, stage_flags: vk::ShaderStageFlags) -> Self {
        self.bindings.push(
            vk::DescriptorSetLayoutBinding::builder()
                .binding(binding)
                .descriptor_type(ty)
                .descriptor_count(1)
                .stage_flags(stage_flags)
                .build(),
        );
        self
    }

    /// Add a combined image sampler binding
    pub fn add_combined_image_sampler(self, binding: u32, stage_flags: vk::ShaderStageFlags) -> Self {
        self.add(binding, vk::DescriptorType::COMBINED_IMAGE_SAMPLER, stage_flags)
    }

    /// Add a storage buffer binding
    pub fn add_storage_buffer(self, binding: u32, stage_flags: vk::ShaderStageFlags) -> Self {
        self.add(binding, vk::DescriptorType::STORAGE_BUFFER, stage_flags)
    }

    #[cfg(test)]
    pub(crate) fn bindings(&self) -> &[vk::DescriptorSetLayoutBinding] {
        &self.bindings
    }

    /// Build the descriptor set layout
    pub fn build(self, device: &Device) -> RenderResult<DescriptorSetLayout> {
        let layout_info = vk::DescriptorSetLayoutCreateInfo::builder().bindings(&self.bindings);

        let layout = unsafe { device.create_descriptor_set_layout(&layout_info, None) }
            .map_err(RenderError::api("vkCreateDescriptorSetLayout"))?;

        Ok(DescriptorSetLayout {
            layout,
            device: device.clone(),
            bindings: self.bindings,
        })
    }
}

/// Descriptor set layout wrapper with automatic cleanup
pub struct DescriptorSetLayout {
    layout: vk::DescriptorSetLayout,
    device: Device,
    bindings: Vec<vk::DescriptorSetLayoutBinding>,
}

impl DescriptorSetLayout {
    /// Get the Vulkan descriptor set layout handle
    pub const fn handle(&self) -> vk::DescriptorSetLayout {
        self.layout
    }

    /// Get the bindings used in this layout
    pub fn bindings(&self) -> &[vk::DescriptorSetLayoutBinding] {
        &self.bindings
    }
}

impl Drop for DescriptorSetLayout {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_descriptor_set_layout(self.layout, None);
        }
    }
}

/// Pool sizes covering `max_sets` sets of the given bindings
pub fn pool_sizes_for(bindings: &[vk::DescriptorSetLayoutBinding], max_sets: u32) -> Vec<vk::DescriptorPoolSize> {
    let mut sizes: Vec<vk::DescriptorPoolSize> = Vec::new();
    for binding in bindings {
        let count = binding.descriptor_count * max_sets;
        match sizes.iter_mut().find(|size| size.ty == binding.descriptor_type) {
            Some(size) => size.descriptor_count += count,
            None => sizes.push(vk::DescriptorPoolSize {
                ty: binding.descriptor_type,
                descriptor_count: count,
            }),
        }
    }
    sizes
}

/// Descriptor pool for allocating descriptor sets
pub struct DescriptorPool {
    pool: vk::DescriptorPool,
    device: Device,
}

impl DescriptorPool {
    /// Create a pool sized for `max_sets` sets of `layout`
    pub fn for_layout(device: &Device, layout: &DescriptorSetLayout, max_sets: u32) -> RenderResult<Self> {
        let pool_sizes = pool_sizes_for(layout.bindings(), max_sets);
        let pool_info = vk::DescriptorPoolCreateInfo::builder()
            .max_sets(max_sets)
            .pool_sizes(&pool_sizes);

        let pool = unsafe { device.create_descriptor_pool(&pool_info, None) }
            .map_err(RenderError::api("vkCreateDescriptorPool"))?;

        Ok(Self {
            pool,
            device: device.clone(),
        })
    }

    /// Allocate one descriptor set per layout
    pub fn allocate_descriptor_sets(&self, layouts: &[vk::DescriptorSetLayout]) -> RenderResult<Vec<vk::DescriptorSet>> {
        let alloc_info = vk::DescriptorSetAllocateInfo::builder()
            .descriptor_pool(self.pool)
            .set_layouts(layouts);

        unsafe { self.device.allocate_descriptor_sets(&alloc_info) }
            .map_err(RenderError::api("vkAllocateDescriptorSets"))
    }
}

impl Drop for DescriptorPool {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_descriptor_pool(self.pool, None);
        }
    }
}

enum PendingWrite {
    Buffer {
        binding: u32,
        ty: vk::DescriptorType,
        info: vk::DescriptorBufferInfo,
    },
    Image {
        binding: u32,
        info: vk::DescriptorImageInfo,
    },
}

/// Collects descriptor writes for one set and applies them together
///
/// Buffer and image infos are kept by value until [`update`](Self::update),
/// where the `vk::WriteDescriptorSet`s pointing at them are built.
pub struct DescriptorSetWriter {
    set: vk::DescriptorSet,
    writes: Vec<PendingWrite>,
}

impl DescriptorSetWriter {
    /// Start a batch of writes to `set`
    pub fn new(set: vk::DescriptorSet) -> Self {
        Self { set, writes: Vec::new() }
    }

    /// Bind a whole storage buffer
    pub fn write_storage_buffer(mut self, binding: u32, buffer: vk::Buffer) -> Self {
        self.writes.push(PendingWrite::Buffer {
            binding,
            ty: vk::DescriptorType::STORAGE_BUFFER,
            info: vk::DescriptorBufferInfo {
                buffer,
                offset: 0,
                range: vk::WHOLE_SIZE,
            },
        });
        self
    }

    /// Bind an image view and sampler
    pub fn write_combined_image(
        mut self,
        binding: u32,
        image_view: vk::ImageView,
        sampler: vk::Sampler,
        layout: vk::ImageLayout,
    ) -> Self {
        self.writes.push(PendingWrite::Image {
            binding,
            info: vk::DescriptorImageInfo {
                sampler,
                image_view,
                image_layout: layout,
            },
        });
        self
    }

    /// Execute all write operations
    pub fn update(self, device: &Device) {
        let writes: Vec<vk::WriteDescriptorSet> = self
            .writes
            .iter()
            .map(|pending| match pending {
                PendingWrite::Buffer { binding, ty, info } => vk::WriteDescriptorSet::builder()
                    .dst_set(self.set)
                    .dst_binding(*binding)
                    .descriptor_type(*ty)
                    .buffer_info(std::slice::from_ref(info))
                    .build(),
                PendingWrite::Image { binding, info } => vk::WriteDescriptorSet::builder()
                    .dst_set(self.set)
                    .dst_binding(*binding)
                    .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
                    .image_info(std::slice::from_ref(info))
                    .build(),
            })
            .collect();

        unsafe {
            device.update_descriptor_sets(&writes, &[]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_layout_bindings() {
        let builder = DescriptorSetLayoutBuilder::new()
            .add_combined_image_sampler(0, vk::ShaderStageFlags::FRAGMENT)
            .add_storage_buffer(1, vk::ShaderStageFlags::MESH_EXT);

        let bindings = builder.bindings();
        assert_eq!(bindings.len(), 2);
        assert_eq!(bindings[0].descriptor_type, vk::DescriptorType::COMBINED_IMAGE_SAMPLER);
        assert_eq!(bindings[0].stage_flags, vk::ShaderStageFlags::FRAGMENT);
        assert_eq!(bindings[1].binding, 1);
        assert_eq!(bindings[1].stage_flags, vk::ShaderStageFlags::MESH_EXT);
    }

    #[test]
    fn test_pool_sizes_merge_by_type() {
        let builder = DescriptorSetLayoutBuilder::new()
            .add_storage_buffer(0, vk::ShaderStageFlags::MESH_EXT)
            .add_combined_image_sampler(1, vk::ShaderStageFlags::FRAGMENT)
            .add_storage_buffer(2, vk::ShaderStageFlags::MESH_EXT);

        let sizes = pool_sizes_for(builder.bindings(), 3);
        assert_eq!(sizes.len(), 2);
        assert_eq!(sizes[0].ty, vk::DescriptorType::STORAGE_BUFFER);
        assert_eq!(sizes[0].descriptor_count, 6);
        assert_eq!(sizes[1].descriptor_count, 3);
    }
}
