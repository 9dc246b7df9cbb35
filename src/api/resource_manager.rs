use parking_lot::{MappedMutexGuard, Mutex, MutexGuard};

use super::traits::*;
use crate::adapter::Adapter;
use crate::bind_group::{BindGroup, BindGroupOptions};
use crate::bind_group_layout::{BindGroupLayout, BindGroupLayoutOptions};
use crate::buffer::{Buffer, BufferOptions};
use crate::command_recorder::{CommandBuffer, CommandRecorder, CommandRecorderOptions};
use crate::compute_pass::ComputePass;
use crate::device::{Device, DeviceOptions};
use crate::handle::{Handle, Pool};
use crate::instance::{Instance, InstanceOptions, Surface};
use crate::pipeline::{ComputePipeline, ComputePipelineOptions, GraphicsPipeline, GraphicsPipelineOptions};
use crate::pipeline_layout::{PipelineLayout, PipelineLayoutOptions};
use crate::queue::Queue;
use crate::render_pass::RenderPass;
use crate::sampler::{Sampler, SamplerOptions};
use crate::shader_module::ShaderModule;
use crate::swapchain::{Swapchain, SwapchainOptions};
use crate::sync::{Fence, FenceOptions, GpuSemaphore, GpuSemaphoreOptions};
use crate::texture::{Texture, TextureOptions};
use crate::texture_view::{TextureView, TextureViewOptions};

/// Locked access to one backend object. Holding it keeps that resource kind's
/// table locked, so keep it short-lived.
pub type ApiGuard<'a, T> = MappedMutexGuard<'a, T>;

/// Lock `pool` and project the entry behind `handle` to its Api* trait object.
pub(crate) fn lock_resource<'a, V, K, U: ?Sized>(
    pool: &'a Mutex<Pool<V, K>>,
    handle: Handle<K>,
    upcast: impl FnOnce(&mut V) -> &mut U,
) -> Option<ApiGuard<'a, U>> {
    MutexGuard::try_map(pool.lock(), move |pool| pool.get_mut(handle).map(upcast)).ok()
}

/// Per-backend owner of every GPU object.
///
/// `create_*` returns the default (invalid) handle on failure after logging
/// the cause. `delete_*` tolerates stale and default handles. `get_*` returns
/// `None` for anything that is not live.
pub trait ResourceManager: Send + Sync {
    // Instance-level objects
    fn create_instance(&self, options: &InstanceOptions) -> Handle<Instance>;
    fn delete_instance(&self, handle: Handle<Instance>);
    fn get_instance(&self, handle: Handle<Instance>) -> Option<ApiGuard<'_, dyn ApiInstance>>;

    fn get_adapter(&self, handle: Handle<Adapter>) -> Option<ApiGuard<'_, dyn ApiAdapter>>;

    fn delete_surface(&self, handle: Handle<Surface>);
    fn get_surface(&self, handle: Handle<Surface>) -> Option<ApiGuard<'_, dyn ApiSurface>>;

    // Device and the objects it owns
    fn create_device(&self, adapter: Handle<Adapter>, options: &DeviceOptions) -> Handle<Device>;
    /// Also deletes every resource created from the device
    fn delete_device(&self, handle: Handle<Device>);
    fn get_device(&self, handle: Handle<Device>) -> Option<ApiGuard<'_, dyn ApiDevice>>;

    fn get_queue(&self, handle: Handle<Queue>) -> Option<ApiGuard<'_, dyn ApiQueue>>;

    fn create_swapchain(&self, device: Handle<Device>, options: &SwapchainOptions) -> Handle<Swapchain>;
    fn delete_swapchain(&self, handle: Handle<Swapchain>);
    fn get_swapchain(&self, handle: Handle<Swapchain>) -> Option<ApiGuard<'_, dyn ApiSwapchain>>;

    fn create_texture(&self, device: Handle<Device>, options: &TextureOptions) -> Handle<Texture>;
    fn delete_texture(&self, handle: Handle<Texture>);
    fn get_texture(&self, handle: Handle<Texture>) -> Option<ApiGuard<'_, dyn ApiTexture>>;

    fn create_texture_view(
        &self,
        device: Handle<Device>,
        texture: Handle<Texture>,
        options: &TextureViewOptions,
    ) -> Handle<TextureView>;
    fn delete_texture_view(&self, handle: Handle<TextureView>);
    fn get_texture_view(&self, handle: Handle<TextureView>) -> Option<ApiGuard<'_, dyn ApiTextureView>>;

    fn create_buffer(&self, device: Handle<Device>, options: &BufferOptions) -> Handle<Buffer>;
    fn delete_buffer(&self, handle: Handle<Buffer>);
    fn get_buffer(&self, handle: Handle<Buffer>) -> Option<ApiGuard<'_, dyn ApiBuffer>>;

    fn create_sampler(&self, device: Handle<Device>, options: &SamplerOptions) -> Handle<Sampler>;
    fn delete_sampler(&self, handle: Handle<Sampler>);
    fn get_sampler(&self, handle: Handle<Sampler>) -> Option<ApiGuard<'_, dyn ApiSampler>>;

    fn create_shader_module(&self, device: Handle<Device>, code: &[u32]) -> Handle<ShaderModule>;
    fn delete_shader_module(&self, handle: Handle<ShaderModule>);
    fn get_shader_module(&self, handle: Handle<ShaderModule>) -> Option<ApiGuard<'_, dyn ApiShaderModule>>;

    fn create_pipeline_layout(
        &self,
        device: Handle<Device>,
        options: &PipelineLayoutOptions,
    ) -> Handle<PipelineLayout>;
    fn delete_pipeline_layout(&self, handle: Handle<PipelineLayout>);
    fn get_pipeline_layout(
        &self,
        handle: Handle<PipelineLayout>,
    ) -> Option<ApiGuard<'_, dyn ApiPipelineLayout>>;

    fn create_bind_group_layout(
        &self,
        device: Handle<Device>,
        options: &BindGroupLayoutOptions,
    ) -> Handle<BindGroupLayout>;
    fn delete_bind_group_layout(&self, handle: Handle<BindGroupLayout>);
    fn get_bind_group_layout(
        &self,
        handle: Handle<BindGroupLayout>,
    ) -> Option<ApiGuard<'_, dyn ApiBindGroupLayout>>;

    fn create_bind_group(&self, device: Handle<Device>, options: &BindGroupOptions) -> Handle<BindGroup>;
    fn delete_bind_group(&self, handle: Handle<BindGroup>);
    fn get_bind_group(&self, handle: Handle<BindGroup>) -> Option<ApiGuard<'_, dyn ApiBindGroup>>;

    fn create_graphics_pipeline(
        &self,
        device: Handle<Device>,
        options: &GraphicsPipelineOptions,
    ) -> Handle<GraphicsPipeline>;
    fn delete_graphics_pipeline(&self, handle: Handle<GraphicsPipeline>);
    fn get_graphics_pipeline(
        &self,
        handle: Handle<GraphicsPipeline>,
    ) -> Option<ApiGuard<'_, dyn ApiGraphicsPipeline>>;

    fn create_compute_pipeline(
        &self,
        device: Handle<Device>,
        options: &ComputePipelineOptions,
    ) -> Handle<ComputePipeline>;
    fn delete_compute_pipeline(&self, handle: Handle<ComputePipeline>);
    fn get_compute_pipeline(
        &self,
        handle: Handle<ComputePipeline>,
    ) -> Option<ApiGuard<'_, dyn ApiComputePipeline>>;

    fn create_gpu_semaphore(
        &self,
        device: Handle<Device>,
        options: &GpuSemaphoreOptions,
    ) -> Handle<GpuSemaphore>;
    fn delete_gpu_semaphore(&self, handle: Handle<GpuSemaphore>);
    fn get_gpu_semaphore(&self, handle: Handle<GpuSemaphore>) -> Option<ApiGuard<'_, dyn ApiGpuSemaphore>>;

    fn create_fence(&self, device: Handle<Device>, options: &FenceOptions) -> Handle<Fence>;
    fn delete_fence(&self, handle: Handle<Fence>);
    fn get_fence(&self, handle: Handle<Fence>) -> Option<ApiGuard<'_, dyn ApiFence>>;

    // Command recording
    fn create_command_recorder(
        &self,
        device: Handle<Device>,
        options: &CommandRecorderOptions,
    ) -> Handle<CommandRecorder>;
    fn delete_command_recorder(&self, handle: Handle<CommandRecorder>);
    fn get_command_recorder(
        &self,
        handle: Handle<CommandRecorder>,
    ) -> Option<ApiGuard<'_, dyn ApiCommandRecorder>>;

    fn delete_render_pass_command_recorder(&self, handle: Handle<RenderPass>);
    fn get_render_pass_command_recorder(
        &self,
        handle: Handle<RenderPass>,
    ) -> Option<ApiGuard<'_, dyn ApiRenderPassCommandRecorder>>;

    fn delete_compute_pass_command_recorder(&self, handle: Handle<ComputePass>);
    fn get_compute_pass_command_recorder(
        &self,
        handle: Handle<ComputePass>,
    ) -> Option<ApiGuard<'_, dyn ApiComputePassCommandRecorder>>;

    fn delete_command_buffer(&self, handle: Handle<CommandBuffer>);
    fn get_command_buffer(&self, handle: Handle<CommandBuffer>) -> Option<ApiGuard<'_, dyn ApiCommandBuffer>>;
}
