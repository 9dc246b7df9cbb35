// Descriptor set layouts and descriptor sets
//
// Every bind group gets a small descriptor pool sized exactly for its
// layout, so groups can be created and destroyed independently.

use ash::vk;
use std::collections::HashMap;
use std::sync::{Arc, Weak};

use super::conversions;
use super::device::DeviceContext;
use super::resource_manager::VulkanResourceManager;
use crate::api::{ApiBindGroup, ApiBindGroupLayout};
use crate::bind_group::{BindGroupEntry, BindingResource};
use crate::bind_group_layout::ResourceBindingLayout;
use crate::device::Device;
use crate::error::{GpuError, Result};
use crate::handle::Handle;

pub(super) struct VulkanBindGroupLayout {
    pub(super) device: Handle<Device>,
    pub(super) context: Arc<DeviceContext>,
    pub(super) layout: vk::DescriptorSetLayout,
    pub(super) bindings: Vec<ResourceBindingLayout>,
}

impl VulkanBindGroupLayout {
    pub(super) fn new(
        device: Handle<Device>,
        context: &Arc<DeviceContext>,
        bindings: &[ResourceBindingLayout],
    ) -> Result<Self> {
        let native_bindings: Vec<vk::DescriptorSetLayoutBinding> = bindings
            .iter()
            .map(|binding| {
                vk::DescriptorSetLayoutBinding::builder()
                    .binding(binding.binding)
                    .descriptor_type(conversions::descriptor_type(binding.resource_type))
                    .descriptor_count(binding.count)
                    .stage_flags(conversions::shader_stages(binding.shader_stages))
                    .build()
            })
            .collect();

        let layout_info = vk::DescriptorSetLayoutCreateInfo::builder().bindings(&native_bindings);
        let layout = unsafe { context.device.create_descriptor_set_layout(&layout_info, None) }?;

        Ok(Self {
            device,
            context: context.clone(),
            layout,
            bindings: bindings.to_vec(),
        })
    }
}

impl ApiBindGroupLayout for VulkanBindGroupLayout {
    fn bindings(&self) -> &[ResourceBindingLayout] {
        &self.bindings
    }
}

impl Drop for VulkanBindGroupLayout {
    fn drop(&mut self) {
        unsafe { self.context.device.destroy_descriptor_set_layout(self.layout, None) };
    }
}

pub(super) struct VulkanBindGroup {
    pub(super) device: Handle<Device>,
    pub(super) context: Arc<DeviceContext>,
    pub(super) pool: vk::DescriptorPool,
    pub(super) set: vk::DescriptorSet,
    pub(super) rm: Weak<VulkanResourceManager>,
}

impl VulkanBindGroup {
    pub(super) fn new(
        device: Handle<Device>,
        context: &Arc<DeviceContext>,
        native_layout: vk::DescriptorSetLayout,
        bindings: &[ResourceBindingLayout],
        rm: Weak<VulkanResourceManager>,
    ) -> Result<Self> {
        // Pool sizes summed per descriptor type
        let mut counts: HashMap<vk::DescriptorType, u32> = HashMap::new();
        for binding in bindings {
            *counts
                .entry(conversions::descriptor_type(binding.resource_type))
                .or_default() += binding.count.max(1);
        }
        let pool_sizes: Vec<vk::DescriptorPoolSize> = counts
            .into_iter()
            .map(|(ty, descriptor_count)| vk::DescriptorPoolSize { ty, descriptor_count })
            .collect();

        let pool_info = vk::DescriptorPoolCreateInfo::builder()
            .max_sets(1)
            .pool_sizes(&pool_sizes);
        let pool = unsafe { context.device.create_descriptor_pool(&pool_info, None) }?;

        let set_layouts = [native_layout];
        let allocate_info = vk::DescriptorSetAllocateInfo::builder()
            .descriptor_pool(pool)
            .set_layouts(&set_layouts);
        let set = match unsafe { context.device.allocate_descriptor_sets(&allocate_info) } {
            Ok(sets) => sets.first().copied(),
            Err(e) => {
                unsafe { context.device.destroy_descriptor_pool(pool, None) };
                return Err(e.into());
            }
        };
        let Some(set) = set else {
            unsafe { context.device.destroy_descriptor_pool(pool, None) };
            return Err(GpuError::Vulkan(vk::Result::ERROR_OUT_OF_POOL_MEMORY));
        };

        Ok(Self {
            device,
            context: context.clone(),
            pool,
            set,
            rm,
        })
    }

    fn write(&self, rm: &VulkanResourceManager, entry: &BindGroupEntry) -> Result<()> {
        let descriptor_type = conversions::descriptor_type(entry.resource.resource_type());
        let write = vk::WriteDescriptorSet::builder()
            .dst_set(self.set)
            .dst_binding(entry.binding)
            .dst_array_element(0)
            .descriptor_type(descriptor_type);

        match entry.resource {
            BindingResource::UniformBuffer { buffer, offset, size }
            | BindingResource::DynamicUniformBuffer { buffer, offset, size }
            | BindingResource::StorageBuffer { buffer, offset, size } => {
                let buffer = rm.native_buffer(buffer).ok_or(GpuError::InvalidHandle("buffer"))?;
                let buffer_info = [vk::DescriptorBufferInfo {
                    buffer,
                    offset,
                    range: size,
                }];
                let writes = [write.buffer_info(&buffer_info).build()];
                unsafe { self.context.device.update_descriptor_sets(&writes, &[]) };
            }
            BindingResource::CombinedImageSampler { texture_view, sampler } => {
                let image_info = [vk::DescriptorImageInfo {
                    sampler: rm.native_sampler(sampler).ok_or(GpuError::InvalidHandle("sampler"))?,
                    image_view: rm
                        .native_texture_view(texture_view)
                        .ok_or(GpuError::InvalidHandle("texture view"))?,
                    image_layout: vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
                }];
                let writes = [write.image_info(&image_info).build()];
                unsafe { self.context.device.update_descriptor_sets(&writes, &[]) };
            }
            BindingResource::SampledImage { texture_view } | BindingResource::StorageImage { texture_view } => {
                let image_layout = match entry.resource {
                    BindingResource::StorageImage { .. } => vk::ImageLayout::GENERAL,
                    _ => vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
                };
                let image_info = [vk::DescriptorImageInfo {
                    sampler: vk::Sampler::null(),
                    image_view: rm
                        .native_texture_view(texture_view)
                        .ok_or(GpuError::InvalidHandle("texture view"))?,
                    image_layout,
                }];
                let writes = [write.image_info(&image_info).build()];
                unsafe { self.context.device.update_descriptor_sets(&writes, &[]) };
            }
            BindingResource::Sampler { sampler } => {
                let image_info = [vk::DescriptorImageInfo {
                    sampler: rm.native_sampler(sampler).ok_or(GpuError::InvalidHandle("sampler"))?,
                    image_view: vk::ImageView::null(),
                    image_layout: vk::ImageLayout::UNDEFINED,
                }];
                let writes = [write.image_info(&image_info).build()];
                unsafe { self.context.device.update_descriptor_sets(&writes, &[]) };
            }
        }
        Ok(())
    }
}

impl ApiBindGroup for VulkanBindGroup {
    fn update(&mut self, entry: &BindGroupEntry) {
        let Some(rm) = self.rm.upgrade() else {
            return;
        };
        if let Err(e) = self.write(&rm, entry) {
            log::error!("Bind group update of binding {} failed: {}", entry.binding, e);
        }
    }
}

impl Drop for VulkanBindGroup {
    fn drop(&mut self) {
        // Destroying the pool frees its set
        unsafe { self.context.device.destroy_descriptor_pool(self.pool, None) };
    }
}
