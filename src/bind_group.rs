// Bind group - concrete resources bound to the slots of a bind group layout

use crate::bind_group_layout::BindGroupLayout;
use crate::buffer::Buffer;
use crate::device::Device;
use crate::gpu_core::{DeviceSize, ResourceBindingType, WHOLE_SIZE};
use crate::handle::Handle;
use crate::sampler::Sampler;
use crate::texture_view::TextureView;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingResource {
    UniformBuffer {
        buffer: Handle<Buffer>,
        offset: DeviceSize,
        size: DeviceSize,
    },
    DynamicUniformBuffer {
        buffer: Handle<Buffer>,
        offset: DeviceSize,
        size: DeviceSize,
    },
    StorageBuffer {
        buffer: Handle<Buffer>,
        offset: DeviceSize,
        size: DeviceSize,
    },
    CombinedImageSampler {
        texture_view: Handle<TextureView>,
        sampler: Handle<Sampler>,
    },
    SampledImage {
        texture_view: Handle<TextureView>,
    },
    StorageImage {
        texture_view: Handle<TextureView>,
    },
    Sampler {
        sampler: Handle<Sampler>,
    },
}

impl BindingResource {
    /// Whole-buffer uniform binding
    pub fn uniform_buffer(buffer: Handle<Buffer>) -> Self {
        BindingResource::UniformBuffer {
            buffer,
            offset: 0,
            size: WHOLE_SIZE,
        }
    }

    /// Whole-buffer storage binding
    pub fn storage_buffer(buffer: Handle<Buffer>) -> Self {
        BindingResource::StorageBuffer {
            buffer,
            offset: 0,
            size: WHOLE_SIZE,
        }
    }

    pub fn resource_type(&self) -> ResourceBindingType {
        match self {
            BindingResource::UniformBuffer { .. } => ResourceBindingType::UniformBuffer,
            BindingResource::DynamicUniformBuffer { .. } => ResourceBindingType::DynamicUniformBuffer,
            BindingResource::StorageBuffer { .. } => ResourceBindingType::StorageBuffer,
            BindingResource::CombinedImageSampler { .. } => ResourceBindingType::CombinedImageSampler,
            BindingResource::SampledImage { .. } => ResourceBindingType::SampledImage,
            BindingResource::StorageImage { .. } => ResourceBindingType::StorageImage,
            BindingResource::Sampler { .. } => ResourceBindingType::Sampler,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindGroupEntry {
    pub binding: u32,
    pub resource: BindingResource,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindGroupOptions {
    pub layout: Handle<BindGroupLayout>,
    pub resources: Vec<BindGroupEntry>,
}

gpu_resource!(
    BindGroup, parent: Device => device_handle, delete: delete_bind_group
);

impl BindGroup {
    /// Rebind one slot. The GPU must not be using the group while it changes.
    pub fn update(&self, entry: &BindGroupEntry) {
        match self.resource_manager().and_then(|rm| rm.get_bind_group(self.handle)) {
            Some(mut bind_group) => bind_group.update(entry),
            None => log::warn!("update() on an invalid bind group"),
        }
    }
}
