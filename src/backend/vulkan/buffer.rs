// GPU buffers backed by gpu-allocator memory

use ash::vk;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};
use std::ptr::NonNull;
use std::sync::Arc;

use super::conversions;
use super::device::DeviceContext;
use crate::api::ApiBuffer;
use crate::buffer::BufferOptions;
use crate::device::Device;
use crate::error::Result;
use crate::gpu_core::DeviceSize;
use crate::handle::Handle;

pub(super) struct VulkanBuffer {
    pub(super) device: Handle<Device>,
    pub(super) context: Arc<DeviceContext>,
    pub(super) buffer: vk::Buffer,
    allocation: Option<Allocation>,
    options: BufferOptions,
}

impl VulkanBuffer {
    pub(super) fn new(device: Handle<Device>, context: &Arc<DeviceContext>, options: &BufferOptions) -> Result<Self> {
        // Create buffer
        let buffer_info = vk::BufferCreateInfo::builder()
            .size(options.size)
            .usage(conversions::buffer_usage(options.usage))
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        let buffer = unsafe { context.device.create_buffer(&buffer_info, None) }?;

        // Allocate memory; host-visible locations come back persistently mapped
        let requirements = unsafe { context.device.get_buffer_memory_requirements(buffer) };
        let allocation = context.allocate(&AllocationCreateDesc {
            name: "buffer",
            requirements,
            location: conversions::memory_location(options.memory_usage),
            linear: true,
            allocation_scheme: AllocationScheme::GpuAllocatorManaged,
        });
        let allocation = match allocation {
            Ok(allocation) => allocation,
            Err(e) => {
                unsafe { context.device.destroy_buffer(buffer, None) };
                return Err(e);
            }
        };

        // Bind memory to buffer
        if let Err(e) = unsafe {
            context
                .device
                .bind_buffer_memory(buffer, allocation.memory(), allocation.offset())
        } {
            context.free(allocation);
            unsafe { context.device.destroy_buffer(buffer, None) };
            return Err(e.into());
        }

        Ok(Self {
            device,
            context: context.clone(),
            buffer,
            allocation: Some(allocation),
            options: *options,
        })
    }
}

impl ApiBuffer for VulkanBuffer {
    fn map(&mut self) -> Option<NonNull<u8>> {
        if !self.options.memory_usage.is_host_visible() {
            log::warn!("map() on a {:?} buffer", self.options.memory_usage);
            return None;
        }
        self.allocation
            .as_ref()
            .and_then(|allocation| allocation.mapped_ptr())
            .map(|ptr| ptr.cast::<u8>())
    }

    fn unmap(&mut self) {
        // Persistently mapped by the allocator
    }

    fn size(&self) -> DeviceSize {
        self.options.size
    }
}

impl Drop for VulkanBuffer {
    fn drop(&mut self) {
        if let Some(allocation) = self.allocation.take() {
            self.context.free(allocation);
        }
        unsafe { self.context.device.destroy_buffer(self.buffer, None) };
    }
}
