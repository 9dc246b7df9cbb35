// Null resource manager
//
// One pool per resource kind, each behind its own lock. Besides the
// ResourceManager contract it keeps the simulated queue (pending
// submissions) and the fault-injection scripts used by tests.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use super::commands::{NullCommand, NullCommandBuffer, NullCommandRecorder, NullComputePass, NullRenderPass};
use super::objects::*;
use crate::adapter::{
    Adapter, AdapterLimits, AdapterProperties, AdapterQueueType, AdapterSwapchainProperties, SurfaceCapabilities,
    SurfaceFormat,
};
use crate::api::*;
use crate::bind_group::{BindGroup, BindGroupEntry, BindGroupOptions};
use crate::bind_group_layout::{BindGroupLayout, BindGroupLayoutOptions};
use crate::buffer::{Buffer, BufferOptions};
use crate::command_recorder::{BufferCopy, BufferTextureCopy, CommandBuffer, CommandRecorder, CommandRecorderOptions};
use crate::compute_pass::ComputePass;
use crate::device::{Device, DeviceOptions, QueueDescription};
use crate::error::{GpuError, Result};
use crate::gpu_core::{
    AcquireImageResult, AdapterDeviceType, ColorSpace, Extent2D, Format, PresentMode, PresentResult, QueueFlags,
    TextureUsageFlags,
};
use crate::handle::{Handle, Pool};
use crate::instance::{Instance, InstanceOptions, Surface};
use crate::pipeline::{ComputePipeline, ComputePipelineOptions, GraphicsPipeline, GraphicsPipelineOptions};
use crate::pipeline_layout::{PipelineLayout, PipelineLayoutOptions};
use crate::queue::{PresentOptions, PresentSwapchainInfo, Queue, SubmitOptions};
use crate::render_pass::RenderPass;
use crate::sampler::{Sampler, SamplerOptions};
use crate::shader_module::ShaderModule;
use crate::swapchain::{Swapchain, SwapchainOptions};
use crate::sync::{Fence, FenceOptions, GpuSemaphore, GpuSemaphoreOptions};
use crate::texture::{Texture, TextureOptions};
use crate::texture_view::{TextureView, TextureViewOptions};

/// Work handed to the simulated queue, waiting to be retired
struct NullSubmission {
    device: Handle<Device>,
    commands: Vec<NullCommand>,
    fence: Option<Arc<FenceState>>,
}

pub struct NullResourceManager {
    this: Weak<NullResourceManager>,

    instances: Mutex<Pool<NullInstance, Instance>>,
    adapters: Mutex<Pool<NullAdapter, Adapter>>,
    surfaces: Mutex<Pool<NullSurface, Surface>>,
    devices: Mutex<Pool<NullDevice, Device>>,
    queues: Mutex<Pool<NullQueue, Queue>>,
    swapchains: Mutex<Pool<NullSwapchain, Swapchain>>,
    textures: Mutex<Pool<NullTexture, Texture>>,
    texture_views: Mutex<Pool<NullTextureView, TextureView>>,
    buffers: Mutex<Pool<NullBuffer, Buffer>>,
    samplers: Mutex<Pool<NullSampler, Sampler>>,
    shader_modules: Mutex<Pool<NullShaderModule, ShaderModule>>,
    pipeline_layouts: Mutex<Pool<NullPipelineLayout, PipelineLayout>>,
    bind_group_layouts: Mutex<Pool<NullBindGroupLayout, BindGroupLayout>>,
    bind_groups: Mutex<Pool<NullBindGroup, BindGroup>>,
    graphics_pipelines: Mutex<Pool<NullGraphicsPipeline, GraphicsPipeline>>,
    compute_pipelines: Mutex<Pool<NullComputePipeline, ComputePipeline>>,
    gpu_semaphores: Mutex<Pool<NullGpuSemaphore, GpuSemaphore>>,
    fences: Mutex<Pool<NullFence, Fence>>,
    command_recorders: Mutex<Pool<NullCommandRecorder, CommandRecorder>>,
    render_passes: Mutex<Pool<NullRenderPass, RenderPass>>,
    compute_passes: Mutex<Pool<NullComputePass, ComputePass>>,
    command_buffers: Mutex<Pool<NullCommandBuffer, CommandBuffer>>,

    pending: Mutex<VecDeque<NullSubmission>>,
    acquire_script: Mutex<VecDeque<AcquireImageResult>>,
    present_script: Mutex<VecDeque<PresentResult>>,
    presented: Mutex<Vec<PresentSwapchainInfo>>,
    last_submission: Mutex<Vec<NullCommand>>,
    auto_complete: AtomicBool,
    device_lost: AtomicBool,
    swapchains_created: AtomicU32,
    submission_count: AtomicU64,
}

impl NullResourceManager {
    pub(super) fn new() -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            this: this.clone(),
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
            pending: Default::default(),
            acquire_script: Default::default(),
            present_script: Default::default(),
            presented: Default::default(),
            last_submission: Default::default(),
            auto_complete: AtomicBool::new(true),
            device_lost: AtomicBool::new(false),
            swapchains_created: AtomicU32::new(0),
            submission_count: AtomicU64::new(0),
        })
    }

    // =========================================================================
    // Inspection and fault injection
    // =========================================================================

    /// When off, submissions stay pending until a fence wait, an idle wait or
    /// [`retire_submissions`](Self::retire_submissions) retires them
    pub fn set_auto_complete(&self, enabled: bool) {
        self.auto_complete.store(enabled, Ordering::Release);
        if enabled {
            self.retire_submissions();
        }
    }

    /// Execute every pending submission; returns how many were retired
    pub fn retire_submissions(&self) -> usize {
        let retired: Vec<NullSubmission> = self.pending.lock().drain(..).collect();
        let count = retired.len();
        for submission in retired {
            self.execute(submission);
        }
        count
    }

    pub fn pending_submissions(&self) -> usize {
        self.pending.lock().len()
    }

    /// Total submissions accepted so far
    pub fn submission_count(&self) -> u64 {
        self.submission_count.load(Ordering::Acquire)
    }

    /// Commands of the most recent submission, in order
    pub fn last_submission(&self) -> Vec<NullCommand> {
        self.last_submission.lock().clone()
    }

    /// Results returned by the next acquisitions, in order. Once the script
    /// runs out every acquisition succeeds.
    pub fn script_acquire_results(&self, results: impl IntoIterator<Item = AcquireImageResult>) {
        self.acquire_script.lock().extend(results);
    }

    /// Results returned by the next presents, one per presented swapchain
    pub fn script_present_results(&self, results: impl IntoIterator<Item = PresentResult>) {
        self.present_script.lock().extend(results);
    }

    /// Every successful present so far
    pub fn presented(&self) -> Vec<PresentSwapchainInfo> {
        self.presented.lock().clone()
    }

    pub fn swapchain_creation_count(&self) -> u32 {
        self.swapchains_created.load(Ordering::Acquire)
    }

    /// From now on submits, waits and acquisitions report device loss
    pub fn lose_device(&self) {
        log::warn!("Null device lost");
        self.device_lost.store(true, Ordering::Release);
    }

    pub fn is_device_lost(&self) -> bool {
        self.device_lost.load(Ordering::Acquire)
    }

    pub fn command_buffer_commands(&self, handle: Handle<CommandBuffer>) -> Option<Vec<NullCommand>> {
        self.command_buffers
            .lock()
            .get(handle)
            .map(|command_buffer| command_buffer.commands.clone())
    }

    /// Queue a command buffer was recorded for
    pub fn command_buffer_queue(&self, handle: Handle<CommandBuffer>) -> Option<Handle<Queue>> {
        self.command_buffers
            .lock()
            .get(handle)
            .map(|command_buffer| command_buffer.queue)
    }

    /// SPIR-V word count of a shader module
    pub fn shader_module_size(&self, handle: Handle<ShaderModule>) -> Option<usize> {
        self.shader_modules.lock().get(handle).map(|module| module.code.len())
    }

    pub fn sampler_options(&self, handle: Handle<Sampler>) -> Option<SamplerOptions> {
        self.samplers.lock().get(handle).map(|sampler| sampler.options)
    }

    /// Contents of any buffer, including device-only ones
    pub fn buffer_contents(&self, handle: Handle<Buffer>) -> Option<Vec<u8>> {
        self.buffers.lock().get(handle).map(|buffer| buffer.data.clone())
    }

    /// Base mip contents of a texture
    pub fn texture_contents(&self, handle: Handle<Texture>) -> Option<Vec<u8>> {
        self.textures.lock().get(handle).map(|texture| texture.data.clone())
    }

    pub fn bind_group_entries(&self, handle: Handle<BindGroup>) -> Option<Vec<BindGroupEntry>> {
        self.bind_groups.lock().get(handle).map(|group| group.entries.clone())
    }

    pub fn texture_view_options(&self, handle: Handle<TextureView>) -> Option<TextureViewOptions> {
        self.texture_views.lock().get(handle).map(|view| view.options)
    }

    /// Live objects created from devices, all kinds together
    pub fn device_resource_count(&self) -> usize {
        self.queues.lock().len()
            + self.swapchains.lock().len()
            + self.textures.lock().len()
            + self.texture_views.lock().len()
            + self.buffers.lock().len()
            + self.samplers.lock().len()
            + self.shader_modules.lock().len()
            + self.pipeline_layouts.lock().len()
            + self.bind_group_layouts.lock().len()
            + self.bind_groups.lock().len()
            + self.graphics_pipelines.lock().len()
            + self.compute_pipelines.lock().len()
            + self.gpu_semaphores.lock().len()
            + self.fences.lock().len()
            + self.command_recorders.lock().len()
            + self.render_passes.lock().len()
            + self.compute_passes.lock().len()
            + self.command_buffers.lock().len()
    }

    // =========================================================================
    // Used by the Null objects
    // =========================================================================

    pub(super) fn create_adapters(&self, instance: Handle<Instance>) -> Vec<Handle<Adapter>> {
        let queue_types = vec![
            AdapterQueueType {
                flags: QueueFlags::GRAPHICS | QueueFlags::COMPUTE | QueueFlags::TRANSFER,
                queue_count: 4,
                timestamp_valid_bits: 64,
            },
            AdapterQueueType {
                flags: QueueFlags::TRANSFER,
                queue_count: 2,
                timestamp_valid_bits: 64,
            },
        ];
        let limits = AdapterLimits {
            max_image_dimension_2d: 16384,
            max_bound_descriptor_sets: 8,
            max_push_constants_size: 128,
            min_uniform_buffer_offset_alignment: 256,
            max_compute_work_group_count: [65535; 3],
        };

        let mut adapters = self.adapters.lock();
        [
            ("Null Discrete GPU", AdapterDeviceType::DiscreteGpu, 1),
            ("Null Integrated GPU", AdapterDeviceType::IntegratedGpu, 2),
        ]
        .into_iter()
        .map(|(name, device_type, device_id)| {
            adapters.insert(NullAdapter {
                instance,
                properties: AdapterProperties {
                    api_version: 1,
                    driver_version: 1,
                    vendor_id: 0,
                    device_id,
                    device_type,
                    device_name: name.to_string(),
                    limits: limits.clone(),
                },
                queue_types: queue_types.clone(),
                rm: self.this.clone(),
            })
        })
        .collect()
    }

    pub(super) fn insert_surface(&self, surface: NullSurface) -> Handle<Surface> {
        if surface.extent.is_empty() {
            log::error!("Cannot create a surface with an empty extent");
            return Handle::default();
        }
        self.surfaces.lock().insert(surface)
    }

    pub(super) fn surface_extent(&self, surface: Handle<Surface>) -> Option<Extent2D> {
        self.surfaces.lock().get(surface).map(|surface| surface.extent)
    }

    pub(super) fn swapchain_properties(extent: Extent2D) -> AdapterSwapchainProperties {
        AdapterSwapchainProperties {
            capabilities: SurfaceCapabilities {
                min_image_count: 2,
                max_image_count: 8,
                current_extent: extent,
                min_image_extent: Extent2D { width: 1, height: 1 },
                max_image_extent: Extent2D {
                    width: 16384,
                    height: 16384,
                },
                supported_usage: TextureUsageFlags::COLOR_ATTACHMENT
                    | TextureUsageFlags::TRANSFER_SRC
                    | TextureUsageFlags::TRANSFER_DST,
            },
            formats: vec![
                SurfaceFormat {
                    format: Format::B8G8R8A8Srgb,
                    color_space: ColorSpace::SrgbNonlinear,
                },
                SurfaceFormat {
                    format: Format::B8G8R8A8Unorm,
                    color_space: ColorSpace::SrgbNonlinear,
                },
            ],
            present_modes: vec![PresentMode::Fifo, PresentMode::Mailbox, PresentMode::Immediate],
        }
    }

    pub(super) fn insert_render_pass(&self, pass: NullRenderPass) -> Handle<RenderPass> {
        self.render_passes.lock().insert(pass)
    }

    pub(super) fn insert_compute_pass(&self, pass: NullComputePass) -> Handle<ComputePass> {
        self.compute_passes.lock().insert(pass)
    }

    pub(super) fn insert_command_buffer(&self, command_buffer: NullCommandBuffer) -> Handle<CommandBuffer> {
        self.command_buffers.lock().insert(command_buffer)
    }

    pub(super) fn semaphore_is_live(&self, semaphore: Handle<GpuSemaphore>) -> bool {
        self.gpu_semaphores.lock().contains(semaphore)
    }

    pub(super) fn next_acquire_result(&self) -> AcquireImageResult {
        if self.is_device_lost() {
            return AcquireImageResult::DeviceLost;
        }
        self.acquire_script
            .lock()
            .pop_front()
            .unwrap_or(AcquireImageResult::Success)
    }

    pub(super) fn submit(&self, device: Handle<Device>, options: &SubmitOptions) -> Result<()> {
        if self.is_device_lost() {
            return Err(GpuError::DeviceLost);
        }

        let mut commands = Vec::new();
        {
            let command_buffers = self.command_buffers.lock();
            for &handle in &options.command_buffers {
                let command_buffer = command_buffers
                    .get(handle)
                    .ok_or(GpuError::InvalidHandle("command buffer"))?;
                if command_buffer.device != device {
                    log::error!("Command buffer {:?} belongs to another device", handle);
                    return Err(GpuError::InvalidHandle("command buffer"));
                }
                commands.extend(command_buffer.commands.iter().cloned());
            }
        }

        {
            let semaphores = self.gpu_semaphores.lock();
            let mut all = options.wait_semaphores.iter().chain(&options.signal_semaphores);
            if let Some(missing) = all.find(|s| !semaphores.contains(**s)) {
                log::error!("Submit references invalid semaphore {:?}", missing);
                return Err(GpuError::InvalidHandle("semaphore"));
            }
        }

        let fence = match options.signal_fence {
            Some(handle) => {
                let fences = self.fences.lock();
                let fence = fences.get(handle).ok_or(GpuError::InvalidHandle("fence"))?;
                if fence.state.is_signalled() {
                    log::warn!("Submitting with fence {:?} still signalled", handle);
                }
                Some(fence.state.clone())
            }
            None => None,
        };

        *self.last_submission.lock() = commands.clone();
        self.pending.lock().push_back(NullSubmission {
            device,
            commands,
            fence,
        });
        self.submission_count.fetch_add(1, Ordering::AcqRel);

        if self.auto_complete.load(Ordering::Acquire) {
            self.retire_submissions();
        }
        Ok(())
    }

    pub(super) fn present(&self, options: &PresentOptions) -> Vec<PresentResult> {
        options
            .swapchain_infos
            .iter()
            .map(|info| {
                if self.is_device_lost() {
                    return PresentResult::DeviceLost;
                }
                let image_count = self
                    .swapchains
                    .lock()
                    .get(info.swapchain)
                    .map(|swapchain| swapchain.textures.len() as u32);
                match image_count {
                    Some(count) if info.image_index < count => {}
                    _ => {
                        log::error!("Present of invalid swapchain image {:?}", info);
                        return PresentResult::Failed;
                    }
                }

                let result = self
                    .present_script
                    .lock()
                    .pop_front()
                    .unwrap_or(PresentResult::Success);
                if matches!(result, PresentResult::Success | PresentResult::Suboptimal) {
                    self.presented.lock().push(*info);
                }
                result
            })
            .collect()
    }

    pub(super) fn wait_idle(&self) -> Result<()> {
        if self.is_device_lost() {
            return Err(GpuError::DeviceLost);
        }
        self.retire_submissions();
        Ok(())
    }

    /// Retire submissions in order up to the one signalling `fence`
    pub(super) fn retire_until(&self, fence: &Arc<FenceState>) {
        let retired: Vec<NullSubmission> = {
            let mut pending = self.pending.lock();
            let position = pending.iter().position(|submission| {
                submission
                    .fence
                    .as_ref()
                    .is_some_and(|state| Arc::ptr_eq(state, fence))
            });
            match position {
                Some(position) => pending.drain(..=position).collect(),
                None => Vec::new(),
            }
        };
        for submission in retired {
            self.execute(submission);
        }
    }

    fn execute(&self, submission: NullSubmission) {
        for command in &submission.commands {
            match command {
                NullCommand::CopyBuffer(copy) => self.execute_buffer_copy(copy),
                NullCommand::CopyBufferToTexture(copy) => self.execute_texture_copy(copy),
                _ => {}
            }
        }
        if let Some(fence) = submission.fence {
            fence.set(true);
        }
    }

    fn execute_buffer_copy(&self, copy: &BufferCopy) {
        let mut buffers = self.buffers.lock();
        let src_range = copy.src_offset as usize..copy.src_offset.saturating_add(copy.byte_size) as usize;
        let Some(bytes) = buffers.get(copy.src).and_then(|src| src.data.get(src_range)).map(<[u8]>::to_vec) else {
            log::error!("Buffer copy source out of range: {:?}", copy);
            return;
        };
        let dst_range = copy.dst_offset as usize..copy.dst_offset.saturating_add(copy.byte_size) as usize;
        match buffers.get_mut(copy.dst).and_then(|dst| dst.data.get_mut(dst_range)) {
            Some(dst) => dst.copy_from_slice(&bytes),
            None => log::error!("Buffer copy destination out of range: {:?}", copy),
        }
    }

    fn execute_texture_copy(&self, copy: &BufferTextureCopy) {
        let Some(src) = self.buffers.lock().get(copy.src_buffer).map(|buffer| buffer.data.clone()) else {
            log::error!("Texture copy from invalid buffer {:?}", copy.src_buffer);
            return;
        };
        let mut textures = self.textures.lock();
        let Some(texture) = textures.get_mut(copy.dst_texture) else {
            log::error!("Texture copy into invalid texture {:?}", copy.dst_texture);
            return;
        };

        let texel = texture.options.format.texel_size() as usize;
        let texture_width = texture.options.extent.width as usize;
        let texture_height = texture.options.extent.height as usize;

        for region in &copy.regions {
            if region.texture_sub_resource.mip_level != 0 {
                log::debug!("Copies into mip levels above 0 are not modelled");
                continue;
            }
            let extent = region.texture_extent;
            let row_length = match region.buffer_row_length {
                0 => extent.width,
                n => n,
            } as usize;
            let image_height = match region.buffer_texture_height {
                0 => extent.height,
                n => n,
            } as usize;
            let (x, y, z) = (
                region.texture_offset.x.max(0) as usize,
                region.texture_offset.y.max(0) as usize,
                region.texture_offset.z.max(0) as usize,
            );
            let row_bytes = extent.width as usize * texel;

            for slice in 0..extent.depth as usize {
                for row in 0..extent.height as usize {
                    let src_start = region.buffer_offset as usize + (slice * image_height + row) * row_length * texel;
                    let dst_start = (((z + slice) * texture_height + y + row) * texture_width + x) * texel;
                    let (Some(from), Some(to)) = (
                        src.get(src_start..src_start + row_bytes),
                        texture.data.get_mut(dst_start..dst_start + row_bytes),
                    ) else {
                        log::error!("Texture copy region out of range: {:?}", region);
                        return;
                    };
                    to.copy_from_slice(from);
                }
            }
        }
    }

    fn device_is_live(&self, device: Handle<Device>) -> bool {
        if self.devices.lock().contains(device) {
            true
        } else {
            log::error!("Resource creation on invalid device {:?}", device);
            false
        }
    }
}

impl ResourceManager for NullResourceManager {
    // =========================================================================
    // Instance level
    // =========================================================================

    fn create_instance(&self, options: &InstanceOptions) -> Handle<Instance> {
        log::info!("Creating Null instance for {}", options.application_name);
        self.instances.lock().insert(NullInstance {
            adapters: Vec::new(),
            rm: self.this.clone(),
        })
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
        log::info!("Null instance destroyed");
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
        let Some(queue_types) = self.adapters.lock().get(adapter).map(|a| a.queue_types.clone()) else {
            log::error!("Device requested from invalid adapter {:?}", adapter);
            return Handle::default();
        };

        let mut requests: Vec<(u32, u32)> = options
            .queues
            .iter()
            .map(|request| (request.queue_type_index, request.count))
            .collect();
        if requests.is_empty() {
            let Some(graphics) = queue_types
                .iter()
                .position(|queue_type| queue_type.flags.contains(QueueFlags::GRAPHICS))
            else {
                log::error!("Adapter has no graphics queue");
                return Handle::default();
            };
            requests.push((graphics as u32, 1));
        }

        for &(index, count) in &requests {
            match queue_types.get(index as usize) {
                Some(queue_type) if count >= 1 && count <= queue_type.queue_count => {}
                _ => {
                    log::error!("Invalid queue request: {} queues of type {}", count, index);
                    return Handle::default();
                }
            }
        }

        let handle = self.devices.lock().insert(NullDevice {
            adapter,
            queues: Vec::new(),
            rm: self.this.clone(),
        });

        let mut descriptions = Vec::new();
        {
            let mut queues = self.queues.lock();
            for (index, count) in requests {
                let queue_type = queue_types[index as usize];
                for _ in 0..count {
                    let queue = queues.insert(NullQueue {
                        device: handle,
                        rm: self.this.clone(),
                    });
                    descriptions.push(QueueDescription {
                        queue,
                        queue_type_index: index,
                        flags: queue_type.flags,
                        timestamp_valid_bits: queue_type.timestamp_valid_bits,
                    });
                }
            }
        }

        if let Some(device) = self.devices.lock().get_mut(handle) {
            device.queues = descriptions;
        }
        log::info!("Null device created with {} extra extensions", options.extensions.len());
        handle
    }

    fn delete_device(&self, handle: Handle<Device>) {
        if self.devices.lock().remove(handle).is_none() {
            return;
        }

        self.pending.lock().retain(|submission| submission.device != handle);

        let released = release_device_objects!(self, handle);

        if released > 0 {
            log::debug!("Device {:?} deleted with {} live resources", handle, released);
        }
        log::info!("Null device destroyed");
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
        if !self.device_is_live(device) {
            return Handle::default();
        }
        if self.surface_extent(options.surface).is_none() {
            log::error!("Swapchain requested for invalid surface {:?}", options.surface);
            return Handle::default();
        }
        if options.image_extent.is_empty() || options.min_image_count == 0 {
            log::error!(
                "Invalid swapchain: {}x{}, {} images",
                options.image_extent.width,
                options.image_extent.height,
                options.min_image_count
            );
            return Handle::default();
        }
        if options.old_swapchain.is_valid() && !self.swapchains.lock().contains(options.old_swapchain) {
            log::warn!("old_swapchain {:?} is not live", options.old_swapchain);
        }

        let handle = self.swapchains.lock().insert(NullSwapchain {
            device,
            textures: Vec::new(),
            next_image: 0,
            rm: self.this.clone(),
        });

        let texture_options = TextureOptions {
            format: options.format,
            extent: options.image_extent.into(),
            array_layers: options.image_layers,
            usage: options.image_usage,
            ..Default::default()
        };
        let textures: Vec<Handle<Texture>> = {
            let mut pool = self.textures.lock();
            (0..options.min_image_count)
                .map(|_| pool.insert(NullTexture::new(device, texture_options, Some(handle))))
                .collect()
        };

        if let Some(swapchain) = self.swapchains.lock().get_mut(handle) {
            swapchain.textures = textures;
        }
        self.swapchains_created.fetch_add(1, Ordering::AcqRel);
        log::debug!(
            "Null swapchain created: {}x{}, {} images",
            options.image_extent.width,
            options.image_extent.height,
            options.min_image_count
        );
        handle
    }

    fn delete_swapchain(&self, handle: Handle<Swapchain>) {
        let Some(swapchain) = self.swapchains.lock().remove(handle) else {
            return;
        };
        let mut textures = self.textures.lock();
        for texture in swapchain.textures {
            textures.remove(texture);
        }
    }

    fn get_swapchain(&self, handle: Handle<Swapchain>) -> Option<ApiGuard<'_, dyn ApiSwapchain>> {
        lock_resource(&self.swapchains, handle, |object| object as &mut dyn ApiSwapchain)
    }

    // =========================================================================
    // Textures and buffers
    // =========================================================================

    fn create_texture(&self, device: Handle<Device>, options: &TextureOptions) -> Handle<Texture> {
        if !self.device_is_live(device) {
            return Handle::default();
        }
        let extent = options.extent;
        if extent.width == 0 || extent.height == 0 || extent.depth == 0 || options.format == Format::Undefined {
            log::error!("Invalid texture: {:?} {:?}", options.format, extent);
            return Handle::default();
        }
        if options.mip_levels == 0 || options.array_layers == 0 || options.usage.is_empty() {
            log::error!("Invalid texture: {:?}", options);
            return Handle::default();
        }
        self.textures.lock().insert(NullTexture::new(device, *options, None))
    }

    fn delete_texture(&self, handle: Handle<Texture>) {
        let mut textures = self.textures.lock();
        if let Some(owner) = textures.get(handle).and_then(|texture| texture.swapchain) {
            log::warn!("Texture {:?} belongs to swapchain {:?}, not deleting", handle, owner);
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
        if !self.device_is_live(device) {
            return Handle::default();
        }
        let Some(texture_options) = self.textures.lock().get(texture).map(|t| t.options) else {
            log::error!("Texture view of invalid texture {:?}", texture);
            return Handle::default();
        };

        let mut options = *options;
        if options.format == Format::Undefined {
            options.format = texture_options.format;
        }
        options.range.aspect_mask = options.range.resolve_aspect(options.format);
        if options.range.base_mip_level >= texture_options.mip_levels
            || options.range.base_array_layer >= texture_options.array_layers
        {
            log::error!("Texture view range outside texture: {:?}", options.range);
            return Handle::default();
        }

        self.texture_views.lock().insert(NullTextureView {
            device,
            texture,
            options,
        })
    }

    delete_and_get!(delete_texture_view, get_texture_view, texture_views, TextureView, ApiTextureView);

    fn create_buffer(&self, device: Handle<Device>, options: &BufferOptions) -> Handle<Buffer> {
        if !self.device_is_live(device) {
            return Handle::default();
        }
        if options.size == 0 {
            log::error!("Cannot create a zero-sized buffer");
            return Handle::default();
        }
        self.buffers.lock().insert(NullBuffer::new(device, *options))
    }

    fn delete_buffer(&self, handle: Handle<Buffer>) {
        if let Some(buffer) = self.buffers.lock().remove(handle) {
            if buffer.mapped {
                log::debug!("Buffer {:?} deleted while mapped", handle);
            }
        }
    }

    fn get_buffer(&self, handle: Handle<Buffer>) -> Option<ApiGuard<'_, dyn ApiBuffer>> {
        lock_resource(&self.buffers, handle, |object| object as &mut dyn ApiBuffer)
    }

    fn create_sampler(&self, device: Handle<Device>, options: &SamplerOptions) -> Handle<Sampler> {
        if !self.device_is_live(device) {
            return Handle::default();
        }
        self.samplers.lock().insert(NullSampler {
            device,
            options: *options,
        })
    }

    delete_and_get!(delete_sampler, get_sampler, samplers, Sampler, ApiSampler);

    // =========================================================================
    // Shaders, layouts and pipelines
    // =========================================================================

    fn create_shader_module(&self, device: Handle<Device>, code: &[u32]) -> Handle<ShaderModule> {
        if !self.device_is_live(device) {
            return Handle::default();
        }
        if code.is_empty() {
            log::error!("Cannot create a shader module from empty code");
            return Handle::default();
        }
        self.shader_modules.lock().insert(NullShaderModule {
            device,
            code: code.to_vec(),
        })
    }

    delete_and_get!(delete_shader_module, get_shader_module, shader_modules, ShaderModule, ApiShaderModule);

    fn create_pipeline_layout(
        &self,
        device: Handle<Device>,
        options: &PipelineLayoutOptions,
    ) -> Handle<PipelineLayout> {
        if !self.device_is_live(device) {
            return Handle::default();
        }
        {
            let layouts = self.bind_group_layouts.lock();
            if let Some(missing) = options.bind_group_layouts.iter().find(|l| !layouts.contains(**l)) {
                log::error!("Pipeline layout references invalid bind group layout {:?}", missing);
                return Handle::default();
            }
        }
        self.pipeline_layouts.lock().insert(NullPipelineLayout {
            device,
            options: options.clone(),
        })
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
        if !self.device_is_live(device) {
            return Handle::default();
        }
        let mut seen = Vec::with_capacity(options.bindings.len());
        for binding in &options.bindings {
            if seen.contains(&binding.binding) {
                log::error!("Duplicate binding {} in bind group layout", binding.binding);
                return Handle::default();
            }
            seen.push(binding.binding);
        }
        self.bind_group_layouts.lock().insert(NullBindGroupLayout {
            device,
            bindings: options.bindings.clone(),
        })
    }

    delete_and_get!(
        delete_bind_group_layout,
        get_bind_group_layout,
        bind_group_layouts,
        BindGroupLayout,
        ApiBindGroupLayout
    );

    fn create_bind_group(&self, device: Handle<Device>, options: &BindGroupOptions) -> Handle<BindGroup> {
        if !self.device_is_live(device) {
            return Handle::default();
        }
        let Some(bindings) = self
            .bind_group_layouts
            .lock()
            .get(options.layout)
            .map(|layout| layout.bindings.clone())
        else {
            log::error!("Bind group with invalid layout {:?}", options.layout);
            return Handle::default();
        };

        let mut bind_group = NullBindGroup {
            device,
            layout: options.layout,
            bindings,
            entries: Vec::new(),
        };
        for entry in &options.resources {
            let matches = bind_group
                .bindings
                .iter()
                .any(|b| b.binding == entry.binding && b.resource_type == entry.resource.resource_type());
            if !matches {
                log::error!("Bind group entry {:?} does not match its layout", entry);
                return Handle::default();
            }
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
        if !self.device_is_live(device) {
            return Handle::default();
        }
        if !self.pipeline_layouts.lock().contains(options.layout) {
            log::error!("Graphics pipeline with invalid layout {:?}", options.layout);
            return Handle::default();
        }
        {
            let modules = self.shader_modules.lock();
            if options.shader_stages.is_empty()
                || options.shader_stages.iter().any(|s| !modules.contains(s.shader_module))
            {
                log::error!("Graphics pipeline with missing or invalid shader stages");
                return Handle::default();
            }
        }
        self.graphics_pipelines.lock().insert(NullGraphicsPipeline {
            device,
            options: options.clone(),
        })
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
        if !self.device_is_live(device) {
            return Handle::default();
        }
        if !self.pipeline_layouts.lock().contains(options.layout)
            || !self.shader_modules.lock().contains(options.shader_stage.shader_module)
        {
            log::error!("Compute pipeline with invalid layout or shader");
            return Handle::default();
        }
        self.compute_pipelines.lock().insert(NullComputePipeline {
            device,
            options: options.clone(),
        })
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
        if !self.device_is_live(device) {
            return Handle::default();
        }
        self.gpu_semaphores.lock().insert(NullGpuSemaphore { device })
    }

    delete_and_get!(delete_gpu_semaphore, get_gpu_semaphore, gpu_semaphores, GpuSemaphore, ApiGpuSemaphore);

    fn create_fence(&self, device: Handle<Device>, options: &FenceOptions) -> Handle<Fence> {
        if !self.device_is_live(device) {
            return Handle::default();
        }
        self.fences.lock().insert(NullFence {
            device,
            state: FenceState::new(options.create_signalled),
            rm: self.this.clone(),
        })
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
        let queue = {
            let devices = self.devices.lock();
            let Some(device_object) = devices.get(device) else {
                log::error!("Command recorder on invalid device {:?}", device);
                return Handle::default();
            };
            if options.queue.is_valid() {
                options.queue
            } else {
                device_object.queues.first().map(|q| q.queue).unwrap_or_default()
            }
        };
        if !self.queues.lock().contains(queue) {
            log::error!("Command recorder for invalid queue {:?}", queue);
            return Handle::default();
        }

        self.command_recorders.lock().insert(NullCommandRecorder {
            device,
            queue,
            commands: Default::default(),
            finished: false,
            rm: self.this.clone(),
        })
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
