// Device - logical GPU and factory of every GPU resource
//
// Deleting the device deletes everything created from it, so wrappers that
// outlive their device drop as no-ops.

use std::sync::Arc;

use crate::adapter::Adapter;
use crate::api::{same_api, GraphicsApi, ResourceManager};
use crate::bind_group::{BindGroup, BindGroupOptions};
use crate::bind_group_layout::{BindGroupLayout, BindGroupLayoutOptions};
use crate::buffer::{Buffer, BufferOptions};
use crate::command_recorder::{CommandRecorder, CommandRecorderOptions};
use crate::error::{GpuError, Result};
use crate::gpu_core::QueueFlags;
use crate::handle::Handle;
use crate::pipeline::{ComputePipeline, ComputePipelineOptions, GraphicsPipeline, GraphicsPipelineOptions};
use crate::pipeline_layout::{PipelineLayout, PipelineLayoutOptions};
use crate::queue::Queue;
use crate::sampler::{Sampler, SamplerOptions};
use crate::shader_module::ShaderModule;
use crate::swapchain::{Swapchain, SwapchainOptions};
use crate::sync::{Fence, FenceOptions, GpuSemaphore, GpuSemaphoreOptions};
use crate::texture::{Texture, TextureOptions};

#[derive(Debug, Clone, PartialEq)]
pub struct QueueRequest {
    pub queue_type_index: u32,
    pub count: u32,
    /// One priority in [0, 1] per queue; missing entries default to 1.0
    pub priorities: Vec<f32>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceOptions {
    /// Empty requests one queue from the first graphics-capable queue type
    pub queues: Vec<QueueRequest>,
    /// Extra device extensions to enable, by name
    pub extensions: Vec<String>,
}

/// A queue created along with its device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueDescription {
    pub queue: Handle<Queue>,
    pub queue_type_index: u32,
    pub flags: QueueFlags,
    pub timestamp_valid_bits: u32,
}

pub struct Device {
    api: Option<Arc<dyn GraphicsApi>>,
    adapter: Handle<Adapter>,
    handle: Handle<Device>,
    queues: Vec<Queue>,
}

impl Device {
    pub(crate) fn new(api: &Arc<dyn GraphicsApi>, adapter: Handle<Adapter>, options: &DeviceOptions) -> Self {
        let rm = api.resource_manager();
        let handle = rm.create_device(adapter, options);
        let queues = rm
            .get_device(handle)
            .map(|device| device.queue_descriptions())
            .unwrap_or_default()
            .into_iter()
            .map(|description| Queue::from_description(api, handle, description))
            .collect();

        Self {
            api: Some(api.clone()),
            adapter,
            handle,
            queues,
        }
    }

    pub fn handle(&self) -> Handle<Device> {
        self.handle
    }

    pub fn adapter_handle(&self) -> Handle<Adapter> {
        self.adapter
    }

    pub fn is_valid(&self) -> bool {
        self.handle.is_valid()
    }

    pub fn queues(&self) -> &[Queue] {
        &self.queues
    }

    pub fn api(&self) -> Option<&Arc<dyn GraphicsApi>> {
        self.api.as_ref()
    }

    pub fn wait_until_idle(&self) -> Result<()> {
        let api = self.api.as_ref().ok_or(GpuError::InvalidHandle("device"))?;
        let device = api
            .resource_manager()
            .get_device(self.handle)
            .ok_or(GpuError::InvalidHandle("device"))?;
        device.wait_until_idle()
    }

    pub fn create_swapchain(&self, options: &SwapchainOptions) -> Swapchain {
        match &self.api {
            Some(api) => Swapchain::new(api, self.handle, options),
            None => Swapchain::default(),
        }
    }

    pub fn create_texture(&self, options: &TextureOptions) -> Texture {
        self.create(Texture::from_parts, |rm, device| rm.create_texture(device, options))
    }

    pub fn create_buffer(&self, options: &BufferOptions) -> Buffer {
        self.create(Buffer::from_parts, |rm, device| rm.create_buffer(device, options))
    }

    /// Create a buffer and fill it through a host mapping. Requires
    /// host-visible memory; use `Queue::upload_buffer_data` otherwise.
    pub fn create_buffer_with_data(&self, options: &BufferOptions, data: &[u8]) -> Result<Buffer> {
        let buffer = self.create_buffer(options);
        if !buffer.is_valid() {
            return Err(GpuError::InvalidHandle("buffer"));
        }
        buffer.write(0, data)?;
        Ok(buffer)
    }

    pub fn create_sampler(&self, options: &SamplerOptions) -> Sampler {
        self.create(Sampler::from_parts, |rm, device| rm.create_sampler(device, options))
    }

    pub fn create_shader_module(&self, code: &[u32]) -> ShaderModule {
        self.create(ShaderModule::from_parts, |rm, device| rm.create_shader_module(device, code))
    }

    pub fn create_pipeline_layout(&self, options: &PipelineLayoutOptions) -> PipelineLayout {
        self.create(PipelineLayout::from_parts, |rm, device| {
            rm.create_pipeline_layout(device, options)
        })
    }

    pub fn create_bind_group_layout(&self, options: &BindGroupLayoutOptions) -> BindGroupLayout {
        self.create(BindGroupLayout::from_parts, |rm, device| {
            rm.create_bind_group_layout(device, options)
        })
    }

    pub fn create_bind_group(&self, options: &BindGroupOptions) -> BindGroup {
        self.create(BindGroup::from_parts, |rm, device| rm.create_bind_group(device, options))
    }

    pub fn create_graphics_pipeline(&self, options: &GraphicsPipelineOptions) -> GraphicsPipeline {
        self.create(GraphicsPipeline::from_parts, |rm, device| {
            rm.create_graphics_pipeline(device, options)
        })
    }

    pub fn create_compute_pipeline(&self, options: &ComputePipelineOptions) -> ComputePipeline {
        self.create(ComputePipeline::from_parts, |rm, device| {
            rm.create_compute_pipeline(device, options)
        })
    }

    pub fn create_gpu_semaphore(&self, options: &GpuSemaphoreOptions) -> GpuSemaphore {
        self.create(GpuSemaphore::from_parts, |rm, device| rm.create_gpu_semaphore(device, options))
    }

    pub fn create_fence(&self, options: &FenceOptions) -> Fence {
        self.create(Fence::from_parts, |rm, device| rm.create_fence(device, options))
    }

    pub fn create_command_recorder(&self, options: &CommandRecorderOptions) -> CommandRecorder {
        match &self.api {
            Some(api) => CommandRecorder::new(api, self.handle, options),
            None => CommandRecorder::default(),
        }
    }

    fn create<T, K>(
        &self,
        wrap: fn(&Arc<dyn GraphicsApi>, Handle<Device>, Handle<K>) -> T,
        create: impl FnOnce(&dyn ResourceManager, Handle<Device>) -> Handle<K>,
    ) -> T
    where
        T: Default,
    {
        match &self.api {
            Some(api) => wrap(api, self.handle, create(api.resource_manager(), self.handle)),
            None => T::default(),
        }
    }
}

impl Default for Device {
    fn default() -> Self {
        Self {
            api: None,
            adapter: Handle::default(),
            handle: Handle::default(),
            queues: Vec::new(),
        }
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        self.queues.clear();
        if let (Some(api), true) = (&self.api, self.handle.is_valid()) {
            api.resource_manager().delete_device(self.handle);
        }
    }
}

impl PartialEq for Device {
    fn eq(&self, other: &Self) -> bool {
        same_api(&self.api, &other.api) && self.adapter == other.adapter && self.handle == other.handle
    }
}

impl Eq for Device {}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("adapter", &self.adapter)
            .field("handle", &self.handle)
            .field("queues", &self.queues.len())
            .finish()
    }
}
