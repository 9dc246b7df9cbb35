// Vulkan resource manager
//
// Same layout as every backend: one pool per resource kind, each behind its
// own lock. Objects created from a device hold the device's Arc<DeviceContext>,
// so the native device goes away only after its last resource.

use ash::{vk, Entry};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::{Arc, Weak};

use super::adapter::VulkanAdapter;
use super::bind_group::{VulkanBindGroup, VulkanBindGroupLayout};
use super::buffer::VulkanBuffer;
use super::command_recorder::{
    VulkanCommandBuffer, VulkanCommandRecorder, VulkanComputePass, VulkanRenderPass, ViewTarget,
};
use super::device::{DeviceContext, QueueFamilyRequest, VulkanDevice, VulkanQueue};
use super::instance::{InstanceContext, VulkanInstance, VulkanSurface};
use super::pipeline::{
    PipelineInputs, VulkanComputePipeline, VulkanGraphicsPipeline, VulkanPipelineLayout, VulkanShaderModule,
};
use super::swapchain::{self, VulkanSwapchain};
use super::sync::{VulkanFence, VulkanGpuSemaphore};
use super::texture::{VulkanSampler, VulkanTexture, VulkanTextureView};
use crate::adapter::Adapter;
use crate::api::*;
use crate::bind_group::{BindGroup, BindGroupOptions};
use crate::bind_group_layout::{BindGroupLayout, BindGroupLayoutOptions};
use crate::buffer::{Buffer, BufferOptions};
use crate::command_recorder::{CommandBuffer, CommandRecorder, CommandRecorderOptions};
use crate::compute_pass::ComputePass;
use crate::device::{Device, DeviceOptions, QueueDescription};
use crate::error::{GpuError, Result};
use crate::gpu_core::{Format, QueueFlags};
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

pub struct VulkanResourceManager {
    this: Weak<VulkanResourceManager>,
    entry: Entry,

    instances: Mutex<Pool<VulkanInstance, Instance>>,
    adapters: Mutex<Pool<VulkanAdapter, Adapter>>,
    surfaces: Mutex<Pool<VulkanSurface, Surface>>,
    devices: Mutex<Pool<VulkanDevice, Device>>,
    queues: Mutex<Pool<VulkanQueue, Queue>>,
    swapchains: Mutex<Pool<VulkanSwapchain, Swapchain>>,
    textures: Mutex<Pool<VulkanTexture, Texture>>,
    texture_views: Mutex<Pool<VulkanTextureView, TextureView>>,
    buffers: Mutex<Pool<VulkanBuffer, Buffer>>,
    samplers: Mutex<Pool<VulkanSampler, Sampler>>,
    shader_modules: Mutex<Pool<VulkanShaderModule, ShaderModule>>,
    pipeline_layouts: Mutex<Pool<VulkanPipelineLayout, PipelineLayout>>,
    bind_group_layouts: Mutex<Pool<VulkanBindGroupLayout, BindGroupLayout>>,
    bind_groups: Mutex<Pool<VulkanBindGroup, BindGroup>>,
    graphics_pipelines: Mutex<Pool<VulkanGraphicsPipeline, GraphicsPipeline>>,
    compute_pipelines: Mutex<Pool<VulkanComputePipeline, ComputePipeline>>,
    gpu_semaphores: Mutex<Pool<VulkanGpuSemaphore, GpuSemaphore>>,
    fences: Mutex<Pool<VulkanFence, Fence>>,
    command_recorders: Mutex<Pool<VulkanCommandRecorder, CommandRecorder>>,
    render_passes: Mutex<Pool<VulkanRenderPass, RenderPass>>,
    compute_passes: Mutex<Pool<VulkanComputePass, ComputePass>>,
    command_buffers: Mutex<Pool<VulkanCommandBuffer, CommandBuffer>>,
}

/// Log a failed creation and hand out the invalid handle
fn creation_failed<T>(kind: &str, error: GpuError) -> Handle<T> {
    log::error!("Failed to create {}: {}", kind, error);
    Handle::default()
}

impl VulkanResourceManager {
    pub(super) fn new(entry: Entry) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            this: this.clone(),
            entry,
            instances: Default::default(),
            adapters: Default::default(),
            surfaces: Default::default(),
            devices: Default::default(),
            queues: Default::default(),
            swapchains: Default::default(),
            textures: Default::default(),
            texture_views: Default::default(),
            buffers: Default::default(),
            samplers: Default::default(),
            shader_modules: Default::default(),
            pipeline_layouts: Default::default(),
            bind_group_layouts: Default::default(),
            bind_groups: Default::default(),
            graphics_pipelines: Default::default(),
            compute_pipelines: Default::default(),
            gpu_semaphores: Default::default(),
            fences: Default::default(),
            command_recorders: Default::default(),
            render_passes: Default::default(),
            compute_passes: Default::default(),
            command_buffers: Default::default(),
        })
    }

    // =========================================================================
    // Used by the Vulkan objects
    // =========================================================================

    /// Register the physical devices that can run dynamic rendering
    pub(super) fn create_adapters(
        &self,
        instance: Handle<Instance>,
        context: &Arc<InstanceContext>,
    ) -> Vec<Handle<Adapter>> {
        let physical_devices = match unsafe { context.instance.enumerate_physical_devices() } {
            Ok(devices) => devices,
            Err(e) => {
                log::error!("Failed to enumerate physical devices: {:?}", e);
                return Vec::new();
            }
        };

        let mut adapters = self.adapters.lock();
        physical_devices
            .into_iter()
            .filter(|&physical_device| {
                let props = unsafe { context.instance.get_physical_device_properties(physical_device) };
                let supported = props.api_version >= vk::API_VERSION_1_3;
                if !supported {
                    log::info!(
                        "Skipping adapter with Vulkan {}.{}",
                        vk::api_version_major(props.api_version),
                        vk::api_version_minor(props.api_version)
                    );
                }
                supported
            })
            .map(|physical_device| {
                adapters.insert(VulkanAdapter {
                    instance,
                    context: context.clone(),
                    physical_device,
                    rm: self.this.clone(),
                })
            })
            .collect()
    }

    pub(super) fn insert_surface(&self, surface: VulkanSurface) -> Handle<Surface> {
        self.surfaces.lock().insert(surface)
    }

    pub(super) fn insert_render_pass(&self, pass: VulkanRenderPass) -> Handle<RenderPass> {
        self.render_passes.lock().insert(pass)
    }

    pub(super) fn insert_compute_pass(&self, pass: VulkanComputePass) -> Handle<ComputePass> {
        self.compute_passes.lock().insert(pass)
    }

    pub(super) fn insert_command_buffer(&self, command_buffer: VulkanCommandBuffer) -> Handle<CommandBuffer> {
        self.command_buffers.lock().insert(command_buffer)
    }

    pub(super) fn native_surface(&self, handle: Handle<Surface>) -> Option<vk::SurfaceKHR> {
        self.surfaces.lock().get(handle).map(|surface| surface.surface)
    }

    pub(super) fn native_swapchain(&self, handle: Handle<Swapchain>) -> Option<vk::SwapchainKHR> {
        self.swapchains.lock().get(handle).map(|swapchain| swapchain.swapchain)
    }

    pub(super) fn native_semaphore(&self, handle: Handle<GpuSemaphore>) -> Option<vk::Semaphore> {
        self.gpu_semaphores.lock().get(handle).map(|semaphore| semaphore.semaphore)
    }

    pub(super) fn native_semaphores(&self, handles: &[Handle<GpuSemaphore>]) -> Result<Vec<vk::Semaphore>> {
        let semaphores = self.gpu_semaphores.lock();
        handles
            .iter()
            .map(|&handle| {
                semaphores
                    .get(handle)
                    .map(|semaphore| semaphore.semaphore)
                    .ok_or(GpuError::InvalidHandle("semaphore"))
            })
            .collect()
    }

    pub(super) fn native_fence(&self, handle: Handle<Fence>) -> Option<vk::Fence> {
        self.fences.lock().get(handle).map(|fence| fence.fence)
    }

    pub(super) fn native_command_buffers(&self, handles: &[Handle<CommandBuffer>]) -> Result<Vec<vk::CommandBuffer>> {
        let command_buffers = self.command_buffers.lock();
        handles
            .iter()
            .map(|&handle| {
                command_buffers
                    .get(handle)
                    .map(|command_buffer| command_buffer.command_buffer)
                    .ok_or(GpuError::InvalidHandle("command buffer"))
            })
            .collect()
    }

    pub(super) fn native_buffer(&self, handle: Handle<Buffer>) -> Option<vk::Buffer> {
        self.buffers.lock().get(handle).map(|buffer| buffer.buffer)
    }

    pub(super) fn native_texture(&self, handle: Handle<Texture>) -> Option<(vk::Image, Format)> {
        self.textures
            .lock()
            .get(handle)
            .map(|texture| (texture.image, texture.options.format))
    }

    pub(super) fn native_texture_view(&self, handle: Handle<TextureView>) -> Option<vk::ImageView> {
        self.texture_views.lock().get(handle).map(|view| view.view)
    }

    pub(super) fn view_target(&self, handle: Handle<TextureView>) -> Option<ViewTarget> {
        self.texture_views.lock().get(handle).map(|view| ViewTarget {
            view: view.view,
            image: view.image,
            format: view.format,
            range: view.range,
            extent: view.extent,
        })
    }

    pub(super) fn native_sampler(&self, handle: Handle<Sampler>) -> Option<vk::Sampler> {
        self.samplers.lock().get(handle).map(|sampler| sampler.sampler)
    }

    pub(super) fn native_bind_group(&self, handle: Handle<BindGroup>) -> Option<vk::DescriptorSet> {
        self.bind_groups.lock().get(handle).map(|group| group.set)
    }

    pub(super) fn native_graphics_pipeline(
        &self,
        handle: Handle<GraphicsPipeline>,
    ) -> Option<(vk::Pipeline, vk::PipelineLayout)> {
        self.graphics_pipelines
            .lock()
            .get(handle)
            .map(|pipeline| (pipeline.pipeline, pipeline.native_layout))
    }

    pub(super) fn native_compute_pipeline(
        &self,
        handle: Handle<ComputePipeline>,
    ) -> Option<(vk::Pipeline, vk::PipelineLayout)> {
        self.compute_pipelines
            .lock()
            .get(handle)
            .map(|pipeline| (pipeline.pipeline, pipeline.native_layout))
    }

    /// Shared device state, or `None` (logged) for a stale device handle
    fn device_context(&self, device: Handle<Device>) -> Option<Arc<DeviceContext>> {
        let context = self.devices.lock().get(device).map(|device| device.context.clone());
        if context.is_none() {
            log::error!("Resource creation on invalid device {:?}", device);
        }
        context
    }

    fn shader_inputs(&self, layout: Handle<PipelineLayout>, stages: &[Handle<ShaderModule>]) -> Option<PipelineInputs> {
        let Some(layout) = self.pipeline_layouts.lock().get(layout).map(|layout| layout.layout) else {
            log::error!("Pipeline with invalid layout {:?}", layout);
            return None;
        };
        let modules = self.shader_modules.lock();
        let modules: Option<Vec<vk::ShaderModule>> = stages
            .iter()
            .map(|&stage| modules.get(stage).map(|module| module.module))
            .collect();
        match modules {
            Some(modules) if !modules.is_empty() => Some(PipelineInputs { layout, modules }),
            _ => {
                log::error!("Pipeline with missing or invalid shader stages");
                None
            }
        }
    }
}

impl ResourceManager for VulkanResourceManager {
    // =========================================================================
    // Instance level
    // =========================================================================

    fn create_instance(&self, options: &InstanceOptions) -> Handle<Instance> {
        log::info!("Creating Vulkan instance for {}", options.application_name);
        match InstanceContext::new(&self.entry, options) {
            Ok(context) => self.instances.lock().insert(VulkanInstance {
                context: Arc::new(context),
                adapters: Vec::new(),
                rm: self.this.clone(),
            }),
            Err(e) => creation_failed("instance", e),
        }
    }

    fn delete_instance(&self, handle: Handle<Instance>) {
        let Some(instance) = self.instances.lock().remove(handle) else {
            return;
        };

        let doomed: Vec<Handle<Device>> = self
            .devices
            .lock()
            .iter()
            .filter(|(_, device)| instance.adapters.contains(&device.adapter))
            .map(|(handle, _)| handle)
            .collect();
        for device in doomed {
            log::warn!("Instance deleted before device {:?}", device);
            self.delete_device(device);
        }

        self.adapters.lock().remove_where(|adapter| adapter.instance == handle);
        self.surfaces.lock().remove_where(|surface| surface.instance == handle);
        log::info!("Vulkan instance released");
    }

    fn get_instance(&self, handle: Handle<Instance>) -> Option<ApiGuard<'_, dyn ApiInstance>> {
        lock_resource(&self.instances, handle, |object| object as &mut dyn ApiInstance)
    }

    fn get_adapter(&self, handle: Handle<Adapter>) -> Option<ApiGuard<'_, dyn ApiAdapter>> {
        lock_resource(&self.adapters, handle, |object| object as &mut dyn ApiAdapter)
    }

    delete_and_get!(delete_surface, get_surface, surfaces, Surface, ApiSurface);

    // =========================================================================
    // Device
    // =========================================================================

    fn create_device(&self, adapter: Handle<Adapter>, options: &DeviceOptions) -> Handle<Device> {
        let Some((instance, physical_device)) = self
            .adapters
            .lock()
            .get(adapter)
            .map(|adapter| (adapter.context.clone(), adapter.physical_device))
        else {
            log::error!("Device requested from invalid adapter {:?}", adapter);
            return Handle::default();
        };

        let families = unsafe {
            instance
                .instance
                .get_physical_device_queue_family_properties(physical_device)
        };

        // Requests for the same family are merged into one create info
        let mut requests: BTreeMap<u32, Vec<f32>> = BTreeMap::new();
        for request in &options.queues {
            requests
                .entry(request.queue_type_index)
                .or_default()
                .extend((0..request.count).map(|i| request.priorities.get(i as usize).copied().unwrap_or(1.0)));
        }
        if requests.is_empty() {
            let Some(graphics) = families
                .iter()
                .position(|family| family.queue_flags.contains(vk::QueueFlags::GRAPHICS))
            else {
                log::error!("Adapter has no graphics queue");
                return Handle::default();
            };
            requests.insert(graphics as u32, vec![1.0]);
        }

        for (&family, priorities) in &requests {
            match families.get(family as usize) {
                Some(props) if !priorities.is_empty() && priorities.len() as u32 <= props.queue_count => {}
                _ => {
                    log::error!("Invalid queue request: {} queues of type {}", priorities.len(), family);
                    return Handle::default();
                }
            }
        }

        let family_requests: Vec<QueueFamilyRequest> = requests
            .into_iter()
            .map(|(family, priorities)| QueueFamilyRequest { family, priorities })
            .collect();
        let context = match DeviceContext::new(instance, physical_device, &family_requests, &options.extensions) {
            Ok(context) => Arc::new(context),
            Err(e) => return creation_failed("device", e),
        };

        let handle = self.devices.lock().insert(VulkanDevice {
            adapter,
            context: context.clone(),
            queues: Vec::new(),
        });

        let mut descriptions = Vec::new();
        {
            let mut queues = self.queues.lock();
            for request in &family_requests {
                let Some(props) = families.get(request.family as usize) else {
                    continue;
                };
                for index in 0..request.priorities.len() as u32 {
                    let native = unsafe { context.device.get_device_queue(request.family, index) };
                    let queue = queues.insert(VulkanQueue {
                        device: handle,
                        context: context.clone(),
                        queue: native,
                        family: request.family,
                        rm: self.this.clone(),
                    });
                    descriptions.push(QueueDescription {
                        queue,
                        queue_type_index: request.family,
                        flags: super::conversions::queue_flags_from_vk(props.queue_flags),
                        timestamp_valid_bits: props.timestamp_valid_bits,
                    });
                }
            }
        }

        if let Some(device) = self.devices.lock().get_mut(handle) {
            device.queues = descriptions;
        }
        log::info!("Vulkan device created");
        handle
    }

    fn delete_device(&self, handle: Handle<Device>) {
        let Some(device) = self.devices.lock().remove(handle) else {
            return;
        };
        if let Err(e) = unsafe { device.context.device.device_wait_idle() } {
            log::warn!("Device wait before deletion failed: {:?}", e);
        }

        let released = release_device_objects!(self, handle);

        if released > 0 {
            log::debug!("Device {:?} deleted with {} live resources", handle, released);
        }
        // DeviceContext destroys the native device once `device` drops here
        log::info!("Vulkan device released");
    }

    fn get_device(&self, handle: Handle<Device>) -> Option<ApiGuard<'_, dyn ApiDevice>> {
        lock_resource(&self.devices, handle, |object| object as &mut dyn ApiDevice)
    }

    fn get_queue(&self, handle: Handle<Queue>) -> Option<ApiGuard<'_, dyn ApiQueue>> {
        lock_resource(&self.queues, handle, |object| object as &mut dyn ApiQueue)
    }

    // =========================================================================
    // Swapchain
    // =========================================================================

    fn create_swapchain(&self, device: Handle<Device>, options: &SwapchainOptions) -> Handle<Swapchain> {
        let Some(context) = self.device_context(device) else {
            return Handle::default();
        };
        let Some(surface) = self.native_surface(options.surface) else {
            log::error!("Swapchain requested for invalid surface {:?}", options.surface);
            return Handle::default();
        };
        if options.image_extent.is_empty() || options.min_image_count == 0 {
            log::error!(
                "Invalid swapchain: {}x{}, {} images",
                options.image_extent.width,
                options.image_extent.height,
                options.min_image_count
            );
            return Handle::default();
        }
        let old_swapchain = self
            .native_swapchain(options.old_swapchain)
            .unwrap_or_else(vk::SwapchainKHR::null);

        let (native, images) = match swapchain::create_swapchain(&context, surface, old_swapchain, options) {
            Ok(created) => created,
            Err(e) => return creation_failed("swapchain", e),
        };

        let handle = self.swapchains.lock().insert(VulkanSwapchain {
            device,
            context: context.clone(),
            swapchain: native,
            textures: Vec::new(),
            rm: self.this.clone(),
        });

        let texture_options = TextureOptions {
            format: options.format,
            extent: options.image_extent.into(),
            array_layers: options.image_layers.max(1),
            usage: options.image_usage,
            ..Default::default()
        };
        let textures: Vec<Handle<Texture>> = {
            let mut pool = self.textures.lock();
            images
                .into_iter()
                .map(|image| {
                    pool.insert(VulkanTexture {
                        device,
                        context: context.clone(),
                        image,
                        allocation: None,
                        options: texture_options,
                        owns_image: false,
                    })
                })
                .collect()
        };

        if let Some(swapchain) = self.swapchains.lock().get_mut(handle) {
            swapchain.textures = textures;
        }
        handle
    }

    fn delete_swapchain(&self, handle: Handle<Swapchain>) {
        let Some(swapchain) = self.swapchains.lock().remove(handle) else {
            return;
        };
        let mut textures = self.textures.lock();
        for texture in &swapchain.textures {
            textures.remove(*texture);
        }
        log::debug!("Destroyed swapchain {:?}", handle);
    }

    fn get_swapchain(&self, handle: Handle<Swapchain>) -> Option<ApiGuard<'_, dyn ApiSwapchain>> {
        lock_resource(&self.swapchains, handle, |object| object as &mut dyn ApiSwapchain)
    }

    // =========================================================================
    // Textures and buffers
    // =========================================================================

    fn create_texture(&self, device: Handle<Device>, options: &TextureOptions) -> Handle<Texture> {
        let Some(context) = self.device_context(device) else {
            return Handle::default();
        };
        let extent = options.extent;
        if extent.width == 0 || extent.height == 0 || extent.depth == 0 || options.format == Format::Undefined {
            log::error!("Invalid texture: {:?} {:?}", options.format, extent);
            return Handle::default();
        }
        if options.mip_levels == 0 || options.array_layers == 0 || options.usage.is_empty() {
            log::error!("Invalid texture: {:?}", options);
            return Handle::default();
        }
        match VulkanTexture::new(device, &context, options) {
            Ok(texture) => self.textures.lock().insert(texture),
            Err(e) => creation_failed("texture", e),
        }
    }

    fn delete_texture(&self, handle: Handle<Texture>) {
        let mut textures = self.textures.lock();
        if textures.get(handle).is_some_and(|texture| !texture.owns_image) {
            log::warn!("Texture {:?} belongs to a swapchain, not deleting", handle);
            return;
        }
        textures.remove(handle);
    }

    fn get_texture(&self, handle: Handle<Texture>) -> Option<ApiGuard<'_, dyn ApiTexture>> {
        lock_resource(&self.textures, handle, |object| object as &mut dyn ApiTexture)
    }

    fn create_texture_view(
        &self,
        device: Handle<Device>,
        texture: Handle<Texture>,
        options: &TextureViewOptions,
    ) -> Handle<TextureView> {
        if self.device_context(device).is_none() {
            return Handle::default();
        }
        let view = {
            let textures = self.textures.lock();
            let Some(native_texture) = textures.get(texture) else {
                log::error!("Texture view of invalid texture {:?}", texture);
                return Handle::default();
            };
            if options.range.base_mip_level >= native_texture.options.mip_levels
                || options.range.base_array_layer >= native_texture.options.array_layers
            {
                log::error!("Texture view range outside texture: {:?}", options.range);
                return Handle::default();
            }
            VulkanTextureView::new(device, texture, native_texture, options)
        };
        match view {
            Ok(view) => self.texture_views.lock().insert(view),
            Err(e) => creation_failed("texture view", e),
        }
    }

    delete_and_get!(delete_texture_view, get_texture_view, texture_views, TextureView, ApiTextureView);

    fn create_buffer(&self, device: Handle<Device>, options: &BufferOptions) -> Handle<Buffer> {
        let Some(context) = self.device_context(device) else {
            return Handle::default();
        };
        if options.size == 0 {
            log::error!("Cannot create a zero-sized buffer");
            return Handle::default();
        }
        match VulkanBuffer::new(device, &context, options) {
            Ok(buffer) => self.buffers.lock().insert(buffer),
            Err(e) => creation_failed("buffer", e),
        }
    }

    delete_and_get!(delete_buffer, get_buffer, buffers, Buffer, ApiBuffer);

    fn create_sampler(&self, device: Handle<Device>, options: &SamplerOptions) -> Handle<Sampler> {
        let Some(context) = self.device_context(device) else {
            return Handle::default();
        };
        match VulkanSampler::new(device, &context, options) {
            Ok(sampler) => self.samplers.lock().insert(sampler),
            Err(e) => creation_failed("sampler", e),
        }
    }

    delete_and_get!(delete_sampler, get_sampler, samplers, Sampler, ApiSampler);

    // =========================================================================
    // Shaders, layouts and pipelines
    // =========================================================================

    fn create_shader_module(&self, device: Handle<Device>, code: &[u32]) -> Handle<ShaderModule> {
        let Some(context) = self.device_context(device) else {
            return Handle::default();
        };
        if code.is_empty() {
            log::error!("Cannot create a shader module from empty code");
            return Handle::default();
        }
        match VulkanShaderModule::new(device, &context, code) {
            Ok(module) => self.shader_modules.lock().insert(module),
            Err(e) => creation_failed("shader module", e),
        }
    }

    delete_and_get!(delete_shader_module, get_shader_module, shader_modules, ShaderModule, ApiShaderModule);

    fn create_pipeline_layout(
        &self,
        device: Handle<Device>,
        options: &PipelineLayoutOptions,
    ) -> Handle<PipelineLayout> {
        let Some(context) = self.device_context(device) else {
            return Handle::default();
        };
        let set_layouts: Option<Vec<vk::DescriptorSetLayout>> = {
            let layouts = self.bind_group_layouts.lock();
            options
                .bind_group_layouts
                .iter()
                .map(|&handle| layouts.get(handle).map(|layout| layout.layout))
                .collect()
        };
        let Some(set_layouts) = set_layouts else {
            log::error!("Pipeline layout references an invalid bind group layout");
            return Handle::default();
        };
        match VulkanPipelineLayout::new(device, &context, &set_layouts, options) {
            Ok(layout) => self.pipeline_layouts.lock().insert(layout),
            Err(e) => creation_failed("pipeline layout", e),
        }
    }

    delete_and_get!(
        delete_pipeline_layout,
        get_pipeline_layout,
        pipeline_layouts,
        PipelineLayout,
        ApiPipelineLayout
    );

    fn create_bind_group_layout(
        &self,
        device: Handle<Device>,
        options: &BindGroupLayoutOptions,
    ) -> Handle<BindGroupLayout> {
        let Some(context) = self.device_context(device) else {
            return Handle::default();
        };
        let mut seen = Vec::with_capacity(options.bindings.len());
        for binding in &options.bindings {
            if seen.contains(&binding.binding) {
                log::error!("Duplicate binding {} in bind group layout", binding.binding);
                return Handle::default();
            }
            seen.push(binding.binding);
        }
        match VulkanBindGroupLayout::new(device, &context, &options.bindings) {
            Ok(layout) => self.bind_group_layouts.lock().insert(layout),
            Err(e) => creation_failed("bind group layout", e),
        }
    }

    delete_and_get!(
        delete_bind_group_layout,
        get_bind_group_layout,
        bind_group_layouts,
        BindGroupLayout,
        ApiBindGroupLayout
    );

    fn create_bind_group(&self, device: Handle<Device>, options: &BindGroupOptions) -> Handle<BindGroup> {
        let Some(context) = self.device_context(device) else {
            return Handle::default();
        };
        let Some((native_layout, bindings)) = self
            .bind_group_layouts
            .lock()
            .get(options.layout)
            .map(|layout| (layout.layout, layout.bindings.clone()))
        else {
            log::error!("Bind group with invalid layout {:?}", options.layout);
            return Handle::default();
        };

        for entry in &options.resources {
            let matches = bindings
                .iter()
                .any(|b| b.binding == entry.binding && b.resource_type == entry.resource.resource_type());
            if !matches {
                log::error!("Bind group entry {:?} does not match its layout", entry);
                return Handle::default();
            }
        }

        let mut bind_group =
            match VulkanBindGroup::new(device, &context, native_layout, &bindings, self.this.clone()) {
                Ok(bind_group) => bind_group,
                Err(e) => return creation_failed("bind group", e),
            };
        for entry in &options.resources {
            bind_group.update(entry);
        }
        self.bind_groups.lock().insert(bind_group)
    }

    delete_and_get!(delete_bind_group, get_bind_group, bind_groups, BindGroup, ApiBindGroup);

    fn create_graphics_pipeline(
        &self,
        device: Handle<Device>,
        options: &GraphicsPipelineOptions,
    ) -> Handle<GraphicsPipeline> {
        let Some(context) = self.device_context(device) else {
            return Handle::default();
        };
        let stages: Vec<Handle<ShaderModule>> = options.shader_stages.iter().map(|s| s.shader_module).collect();
        let Some(inputs) = self.shader_inputs(options.layout, &stages) else {
            return Handle::default();
        };
        match VulkanGraphicsPipeline::new(device, &context, &inputs, options) {
            Ok(pipeline) => self.graphics_pipelines.lock().insert(pipeline),
            Err(e) => creation_failed("graphics pipeline", e),
        }
    }

    delete_and_get!(
        delete_graphics_pipeline,
        get_graphics_pipeline,
        graphics_pipelines,
        GraphicsPipeline,
        ApiGraphicsPipeline
    );

    fn create_compute_pipeline(
        &self,
        device: Handle<Device>,
        options: &ComputePipelineOptions,
    ) -> Handle<ComputePipeline> {
        let Some(context) = self.device_context(device) else {
            return Handle::default();
        };
        let Some(inputs) = self.shader_inputs(options.layout, &[options.shader_stage.shader_module]) else {
            return Handle::default();
        };
        match VulkanComputePipeline::new(device, &context, &inputs, options.layout, &options.shader_stage) {
            Ok(pipeline) => self.compute_pipelines.lock().insert(pipeline),
            Err(e) => creation_failed("compute pipeline", e),
        }
    }

    delete_and_get!(
        delete_compute_pipeline,
        get_compute_pipeline,
        compute_pipelines,
        ComputePipeline,
        ApiComputePipeline
    );

    // =========================================================================
    // Synchronization
    // =========================================================================

    fn create_gpu_semaphore(&self, device: Handle<Device>, _options: &GpuSemaphoreOptions) -> Handle<GpuSemaphore> {
        let Some(context) = self.device_context(device) else {
            return Handle::default();
        };
        match VulkanGpuSemaphore::new(device, &context) {
            Ok(semaphore) => self.gpu_semaphores.lock().insert(semaphore),
            Err(e) => creation_failed("semaphore", e),
        }
    }

    delete_and_get!(delete_gpu_semaphore, get_gpu_semaphore, gpu_semaphores, GpuSemaphore, ApiGpuSemaphore);

    fn create_fence(&self, device: Handle<Device>, options: &FenceOptions) -> Handle<Fence> {
        let Some(context) = self.device_context(device) else {
            return Handle::default();
        };
        match VulkanFence::new(device, &context, options) {
            Ok(fence) => self.fences.lock().insert(fence),
            Err(e) => creation_failed("fence", e),
        }
    }

    delete_and_get!(delete_fence, get_fence, fences, Fence, ApiFence);

    // =========================================================================
    // Command recording
    // =========================================================================

    fn create_command_recorder(
        &self,
        device: Handle<Device>,
        options: &CommandRecorderOptions,
    ) -> Handle<CommandRecorder> {
        let (context, queue) = {
            let devices = self.devices.lock();
            let Some(device_object) = devices.get(device) else {
                log::error!("Command recorder on invalid device {:?}", device);
                return Handle::default();
            };
            let queue = if options.queue.is_valid() {
                options.queue
            } else {
                device_object
                    .queues
                    .iter()
                    .find(|q| q.flags.contains(QueueFlags::GRAPHICS))
                    .or(device_object.queues.first())
                    .map(|q| q.queue)
                    .unwrap_or_default()
            };
            (device_object.context.clone(), queue)
        };

        let family = match self.queues.lock().get(queue) {
            Some(native) if native.device == device => native.family,
            _ => {
                log::error!("Command recorder for invalid queue {:?}", queue);
                return Handle::default();
            }
        };

        match VulkanCommandRecorder::new(device, &context, family, self.this.clone()) {
            Ok(recorder) => self.command_recorders.lock().insert(recorder),
            Err(e) => creation_failed("command recorder", e),
        }
    }

    delete_and_get!(
        delete_command_recorder,
        get_command_recorder,
        command_recorders,
        CommandRecorder,
        ApiCommandRecorder
    );

    delete_and_get!(
        delete_render_pass_command_recorder,
        get_render_pass_command_recorder,
        render_passes,
        RenderPass,
        ApiRenderPassCommandRecorder
    );

    delete_and_get!(
        delete_compute_pass_command_recorder,
        get_compute_pass_command_recorder,
        compute_passes,
        ComputePass,
        ApiComputePassCommandRecorder
    );

    delete_and_get!(delete_command_buffer, get_command_buffer, command_buffers, CommandBuffer, ApiCommandBuffer);
}
