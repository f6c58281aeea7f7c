//! Buffer management
//!
//! Buffers with dedicated memory allocations, following RAII patterns

use ash::{vk, Device};

use crate::render::{RenderError, RenderResult};

/// Pick the first memory type allowed by `type_filter` that has all of `properties`
pub fn find_memory_type(
    memory_properties: &vk::PhysicalDeviceMemoryProperties,
    type_filter: u32,
    properties: vk::MemoryPropertyFlags,
) -> RenderResult<u32> {
    (0..memory_properties.memory_type_count)
        .find(|&i| {
            (type_filter & (1 << i)) != 0
                && memory_properties.memory_types[i as usize]
                    .property_flags
                    .contains(properties)
        })
        .ok_or(RenderError::NoSuitableMemoryType)
}

/// Allocate and bind dedicated memory for `requirements`
pub fn allocate_memory(
    device: &Device,
    memory_properties: &vk::PhysicalDeviceMemoryProperties,
    requirements: vk::MemoryRequirements,
    properties: vk::MemoryPropertyFlags,
) -> RenderResult<vk::DeviceMemory> {
    let memory_type_index = find_memory_type(memory_properties, requirements.memory_type_bits, properties)?;
    let alloc_info = vk::MemoryAllocateInfo::builder()
        .allocation_size(requirements.size)
        .memory_type_index(memory_type_index);

    unsafe { device.allocate_memory(&alloc_info, None) }.map_err(RenderError::api("vkAllocateMemory"))
}

/// Buffer wrapper with memory management
pub struct Buffer {
    device: Device,
    buffer: vk::Buffer,
    memory: vk::DeviceMemory,
    size: vk::DeviceSize,
}

impl Buffer {
    /// Create a new buffer with memory allocation
    pub fn new(
        device: &Device,
        memory_properties: &vk::PhysicalDeviceMemoryProperties,
        size: vk::DeviceSize,
        usage: vk::BufferUsageFlags,
        properties: vk::MemoryPropertyFlags,
    ) -> RenderResult<Self> {
        let buffer_info = vk::BufferCreateInfo::builder()
            .size(size)
            .usage(usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        let buffer =
            unsafe { device.create_buffer(&buffer_info, None) }.map_err(RenderError::api("vkCreateBuffer"))?;

        let requirements = unsafe { device.get_buffer_memory_requirements(buffer) };
        let memory = match allocate_memory(device, memory_properties, requirements, properties) {
            Ok(memory) => memory,
            Err(e) => {
                unsafe { device.destroy_buffer(buffer, None) };
                return Err(e);
            }
        };

        if let Err(result) = unsafe { device.bind_buffer_memory(buffer, memory, 0) } {
            unsafe {
                device.destroy_buffer(buffer, None);
                device.free_memory(memory, None);
            }
            return Err(RenderError::Api {
                call: "vkBindBufferMemory",
                result,
            });
        }

        Ok(Self {
            device: device.clone(),
            buffer,
            memory,
            size,
        })
    }

    /// Map the whole buffer
    pub fn map_memory(&self) -> RenderResult<*mut std::ffi::c_void> {
        unsafe {
            self.device
                .map_memory(self.memory, 0, self.size, vk::MemoryMapFlags::empty())
        }
        .map_err(RenderError::api("vkMapMemory"))
    }

    /// Unmap memory
    pub fn unmap_memory(&self) {
        unsafe {
            self.device.unmap_memory(self.memory);
        }
    }

    /// Map, copy `bytes` to the start of the buffer, unmap
    pub fn write_bytes(&self, bytes: &[u8]) -> RenderResult<()> {
        let len = bytes.len().min(self.size as usize);
        let dst = self.map_memory()?;
        unsafe {
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), dst.cast::<u8>(), len);
        }
        self.unmap_memory();
        Ok(())
    }

    /// Get buffer handle
    pub const fn handle(&self) -> vk::Buffer {
        self.buffer
    }

    /// Get size
    pub const fn size(&self) -> vk::DeviceSize {
        self.size
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_buffer(self.buffer, None);
            self.device.free_memory(self.memory, None);
        }
    }
}
