//! Persistent instance buffer
//!
//! Host-visible, host-coherent storage buffer mapped once at creation and
//! rewritten every frame. Frames in flight share it; the fence wait at the
//! start of each tick keeps the GPU off the bytes being rewritten.

use std::marker::PhantomData;
use std::ptr::NonNull;

use ash::{vk, Device};
use bytemuck::Pod;

use super::buffer::Buffer;
use crate::render::frame::write_instance_records;
use crate::render::{RenderError, RenderResult};

/// Fixed-capacity, persistently mapped array of `T` records
pub struct InstanceBuffer<T: Pod> {
    buffer: Buffer,
    mapped: NonNull<u8>,
    capacity: usize,
    _record: PhantomData<T>,
}

impl<T: Pod> InstanceBuffer<T> {
    const RECORD_SIZE: usize = std::mem::size_of::<T>();

    /// Allocate room for `capacity` records and map it
    pub fn new(
        device: &Device,
        memory_properties: &vk::PhysicalDeviceMemoryProperties,
        capacity: usize,
    ) -> RenderResult<Self> {
        let capacity = capacity.max(1);
        let buffer = Buffer::new(
            device,
            memory_properties,
            (capacity * Self::RECORD_SIZE) as vk::DeviceSize,
            vk::BufferUsageFlags::STORAGE_BUFFER,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
        )?;

        let mapped = NonNull::new(buffer.map_memory()?.cast::<u8>()).ok_or_else(|| {
            RenderError::InitializationFailed("vkMapMemory returned a null pointer".to_string())
        })?;

        log::debug!(
            "[INSTANCES] Mapped instance buffer for {} records of {} bytes",
            capacity,
            Self::RECORD_SIZE
        );
        Ok(Self {
            buffer,
            mapped,
            capacity,
            _record: PhantomData,
        })
    }

    /// Overwrite the buffer from the start, returning how many records fit
    pub fn write(&mut self, records: &[T]) -> usize {
        // SAFETY: the mapping covers `capacity` whole records and lives until drop
        let dst = unsafe { std::slice::from_raw_parts_mut(self.mapped.as_ptr(), self.capacity * Self::RECORD_SIZE) };
        write_instance_records(dst, records)
    }

    /// Maximum number of records
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Buffer handle for descriptor writes
    pub const fn handle(&self) -> vk::Buffer {
        self.buffer.handle()
    }
}

impl<T: Pod> Drop for InstanceBuffer<T> {
    fn drop(&mut self) {
        self.buffer.unmap_memory();
    }
}
