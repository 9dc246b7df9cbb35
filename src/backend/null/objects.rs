// Null backend objects
//
// Each type implements one Api* trait over plain in-memory state. Objects
// that need to reach other tables keep a weak link to the resource manager.

use std::ptr::NonNull;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use super::resource_manager::NullResourceManager;
use crate::adapter::{
    Adapter, AdapterFeatures, AdapterProperties, AdapterQueueType, AdapterSwapchainProperties,
};
use crate::api::*;
use crate::bind_group::BindGroupEntry;
use crate::bind_group_layout::{BindGroupLayout, ResourceBindingLayout};
use crate::buffer::BufferOptions;
use crate::device::{Device, QueueDescription};
use crate::error::{GpuError, Result};
use crate::gpu_core::{
    AcquireImageResult, DeviceSize, Extent2D, Extent3D, FenceStatus, Format, PresentResult, QueueFlags,
    TextureUsageFlags,
};
use crate::handle::Handle;
use crate::instance::{Extension, Instance, Surface, SurfaceOptions};
use crate::pipeline::{ComputePipelineOptions, GraphicsPipelineOptions};
use crate::pipeline_layout::{PipelineLayout, PipelineLayoutOptions, PushConstantRange};
use crate::queue::{PresentOptions, SubmitOptions};
use crate::sampler::SamplerOptions;
use crate::swapchain::Swapchain;
use crate::sync::GpuSemaphore;
use crate::texture::{Texture, TextureOptions};
use crate::texture_view::TextureViewOptions;

/// Extent reported for surfaces created from a native window
pub(super) const DEFAULT_SURFACE_EXTENT: Extent2D = Extent2D {
    width: 1280,
    height: 720,
};

fn upgrade(rm: &Weak<NullResourceManager>) -> Result<Arc<NullResourceManager>> {
    rm.upgrade().ok_or(GpuError::DeviceLost)
}

// =========================================================================
// Instance level
// =========================================================================

pub(super) struct NullInstance {
    pub(super) adapters: Vec<Handle<Adapter>>,
    pub(super) rm: Weak<NullResourceManager>,
}

impl ApiInstance for NullInstance {
    fn extensions(&self) -> Vec<Extension> {
        vec![Extension {
            name: "NULL_surface".to_string(),
            version: 1,
        }]
    }

    fn query_adapters(&mut self, instance: Handle<Instance>) -> Vec<Handle<Adapter>> {
        if self.adapters.is_empty() {
            if let Some(rm) = self.rm.upgrade() {
                self.adapters = rm.create_adapters(instance);
            }
        }
        self.adapters.clone()
    }

    fn create_surface(&mut self, instance: Handle<Instance>, options: &SurfaceOptions) -> Handle<Surface> {
        let extent = match options {
            SurfaceOptions::Headless { extent } => *extent,
            _ => DEFAULT_SURFACE_EXTENT,
        };
        match self.rm.upgrade() {
            Some(rm) => rm.insert_surface(NullSurface { instance, extent }),
            None => Handle::default(),
        }
    }
}

pub(super) struct NullAdapter {
    pub(super) instance: Handle<Instance>,
    pub(super) properties: AdapterProperties,
    pub(super) queue_types: Vec<AdapterQueueType>,
    pub(super) rm: Weak<NullResourceManager>,
}

impl ApiAdapter for NullAdapter {
    fn query_adapter_properties(&self) -> AdapterProperties {
        self.properties.clone()
    }

    fn query_adapter_features(&self) -> AdapterFeatures {
        AdapterFeatures {
            sampler_anisotropy: true,
            fill_mode_non_solid: true,
            ..Default::default()
        }
    }

    fn query_queue_types(&self) -> Vec<AdapterQueueType> {
        self.queue_types.clone()
    }

    fn query_swapchain_properties(&self, surface: Handle<Surface>) -> AdapterSwapchainProperties {
        let Some(extent) = self.rm.upgrade().and_then(|rm| rm.surface_extent(surface)) else {
            log::warn!("Swapchain properties queried for an invalid surface");
            return AdapterSwapchainProperties::default();
        };
        NullResourceManager::swapchain_properties(extent)
    }

    fn supports_presentation(&self, surface: Handle<Surface>, queue_type_index: u32) -> bool {
        let surface_live = self
            .rm
            .upgrade()
            .map(|rm| rm.surface_extent(surface).is_some())
            .unwrap_or(false);
        let graphics = self
            .queue_types
            .get(queue_type_index as usize)
            .map(|queue_type| queue_type.flags.contains(QueueFlags::GRAPHICS))
            .unwrap_or(false);
        surface_live && graphics
    }
}

pub(super) struct NullSurface {
    pub(super) instance: Handle<Instance>,
    pub(super) extent: Extent2D,
}

impl ApiSurface for NullSurface {}

// =========================================================================
// Device and queues
// =========================================================================

pub(super) struct NullDevice {
    pub(super) adapter: Handle<Adapter>,
    pub(super) queues: Vec<QueueDescription>,
    pub(super) rm: Weak<NullResourceManager>,
}

impl ApiDevice for NullDevice {
    fn adapter(&self) -> Handle<Adapter> {
        self.adapter
    }

    fn queue_descriptions(&self) -> Vec<QueueDescription> {
        self.queues.clone()
    }

    fn wait_until_idle(&self) -> Result<()> {
        upgrade(&self.rm)?.wait_idle()
    }
}

pub(super) struct NullQueue {
    pub(super) device: Handle<Device>,
    pub(super) rm: Weak<NullResourceManager>,
}

impl ApiQueue for NullQueue {
    fn submit(&mut self, options: &SubmitOptions) -> Result<()> {
        upgrade(&self.rm)?.submit(self.device, options)
    }

    fn present(&mut self, options: &PresentOptions) -> Vec<PresentResult> {
        match self.rm.upgrade() {
            Some(rm) => rm.present(options),
            None => vec![PresentResult::DeviceLost; options.swapchain_infos.len()],
        }
    }

    fn wait_until_idle(&mut self) -> Result<()> {
        upgrade(&self.rm)?.wait_idle()
    }
}

pub(super) struct NullSwapchain {
    pub(super) device: Handle<Device>,
    pub(super) textures: Vec<Handle<Texture>>,
    pub(super) next_image: u32,
    pub(super) rm: Weak<NullResourceManager>,
}

impl ApiSwapchain for NullSwapchain {
    fn get_textures(&mut self) -> Vec<Handle<Texture>> {
        self.textures.clone()
    }

    fn get_next_image_index(&mut self, semaphore: Handle<GpuSemaphore>) -> (AcquireImageResult, u32) {
        let Some(rm) = self.rm.upgrade() else {
            return (AcquireImageResult::DeviceLost, 0);
        };
        if !rm.semaphore_is_live(semaphore) {
            log::error!("Acquire with an invalid semaphore");
            return (AcquireImageResult::Failed, 0);
        }

        let result = rm.next_acquire_result();
        if !result.has_image() || self.textures.is_empty() {
            return (result, 0);
        }

        let index = self.next_image;
        self.next_image = (index + 1) % self.textures.len() as u32;
        (result, index)
    }
}

// =========================================================================
// Resources
// =========================================================================

pub(super) struct NullTexture {
    pub(super) device: Handle<Device>,
    pub(super) options: TextureOptions,
    /// Base mip level, all layers
    pub(super) data: Vec<u8>,
    pub(super) swapchain: Option<Handle<Swapchain>>,
}

impl NullTexture {
    pub(super) fn new(device: Handle<Device>, options: TextureOptions, swapchain: Option<Handle<Swapchain>>) -> Self {
        let extent = options.extent;
        let size = extent.width as usize
            * extent.height as usize
            * extent.depth as usize
            * options.array_layers.max(1) as usize
            * options.format.texel_size() as usize;
        Self {
            device,
            options,
            data: vec![0; size],
            swapchain,
        }
    }
}

impl ApiTexture for NullTexture {
    fn format(&self) -> Format {
        self.options.format
    }

    fn extent(&self) -> Extent3D {
        self.options.extent
    }

    fn usage(&self) -> TextureUsageFlags {
        self.options.usage
    }
}

pub(super) struct NullTextureView {
    pub(super) device: Handle<Device>,
    pub(super) texture: Handle<Texture>,
    pub(super) options: TextureViewOptions,
}

impl ApiTextureView for NullTextureView {
    fn texture(&self) -> Handle<Texture> {
        self.texture
    }
}

pub(super) struct NullBuffer {
    pub(super) device: Handle<Device>,
    pub(super) options: BufferOptions,
    pub(super) data: Vec<u8>,
    pub(super) mapped: bool,
}

impl NullBuffer {
    pub(super) fn new(device: Handle<Device>, options: BufferOptions) -> Self {
        Self {
            device,
            options,
            data: vec![0; options.size as usize],
            mapped: false,
        }
    }
}

impl ApiBuffer for NullBuffer {
    fn map(&mut self) -> Option<NonNull<u8>> {
        if !self.options.memory_usage.is_host_visible() {
            log::warn!("map() on a {:?} buffer", self.options.memory_usage);
            return None;
        }
        self.mapped = true;
        NonNull::new(self.data.as_mut_ptr())
    }

    fn unmap(&mut self) {
        self.mapped = false;
    }

    fn size(&self) -> DeviceSize {
        self.options.size
    }
}

pub(super) struct NullSampler {
    pub(super) device: Handle<Device>,
    pub(super) options: SamplerOptions,
}

impl ApiSampler for NullSampler {}

pub(super) struct NullShaderModule {
    pub(super) device: Handle<Device>,
    pub(super) code: Vec<u32>,
}

impl ApiShaderModule for NullShaderModule {}

pub(super) struct NullPipelineLayout {
    pub(super) device: Handle<Device>,
    pub(super) options: PipelineLayoutOptions,
}

impl ApiPipelineLayout for NullPipelineLayout {
    fn push_constant_ranges(&self) -> &[PushConstantRange] {
        &self.options.push_constant_ranges
    }
}

pub(super) struct NullBindGroupLayout {
    pub(super) device: Handle<Device>,
    pub(super) bindings: Vec<ResourceBindingLayout>,
}

impl ApiBindGroupLayout for NullBindGroupLayout {
    fn bindings(&self) -> &[ResourceBindingLayout] {
        &self.bindings
    }
}

pub(super) struct NullBindGroup {
    pub(super) device: Handle<Device>,
    pub(super) layout: Handle<BindGroupLayout>,
    pub(super) bindings: Vec<ResourceBindingLayout>,
    pub(super) entries: Vec<BindGroupEntry>,
}

impl ApiBindGroup for NullBindGroup {
    fn update(&mut self, entry: &BindGroupEntry) {
        let expected = self
            .bindings
            .iter()
            .find(|binding| binding.binding == entry.binding)
            .map(|binding| binding.resource_type);
        if expected != Some(entry.resource.resource_type()) {
            log::error!(
                "Bind group update at binding {} does not match layout {:?}",
                entry.binding,
                self.layout
            );
            return;
        }

        match self.entries.iter_mut().find(|e| e.binding == entry.binding) {
            Some(existing) => *existing = *entry,
            None => self.entries.push(*entry),
        }
    }
}

pub(super) struct NullGraphicsPipeline {
    pub(super) device: Handle<Device>,
    pub(super) options: GraphicsPipelineOptions,
}

impl ApiGraphicsPipeline for NullGraphicsPipeline {
    fn layout(&self) -> Handle<PipelineLayout> {
        self.options.layout
    }
}

pub(super) struct NullComputePipeline {
    pub(super) device: Handle<Device>,
    pub(super) options: ComputePipelineOptions,
}

impl ApiComputePipeline for NullComputePipeline {
    fn layout(&self) -> Handle<PipelineLayout> {
        self.options.layout
    }
}

// =========================================================================
// Synchronization
// =========================================================================

pub(super) struct NullGpuSemaphore {
    pub(super) device: Handle<Device>,
}

impl ApiGpuSemaphore for NullGpuSemaphore {}

/// Signal state shared between a fence and the submissions that signal it
#[derive(Debug, Default)]
pub(super) struct FenceState {
    signalled: AtomicBool,
}

impl FenceState {
    pub(super) fn new(signalled: bool) -> Arc<Self> {
        Arc::new(Self {
            signalled: AtomicBool::new(signalled),
        })
    }

    pub(super) fn is_signalled(&self) -> bool {
        self.signalled.load(Ordering::Acquire)
    }

    pub(super) fn set(&self, signalled: bool) {
        self.signalled.store(signalled, Ordering::Release);
    }
}

pub(super) struct NullFence {
    pub(super) device: Handle<Device>,
    pub(super) state: Arc<FenceState>,
    pub(super) rm: Weak<NullResourceManager>,
}

impl ApiFence for NullFence {
    fn wait(&mut self) -> Result<()> {
        let rm = upgrade(&self.rm)?;
        if rm.is_device_lost() {
            return Err(GpuError::DeviceLost);
        }
        if self.state.is_signalled() {
            return Ok(());
        }

        // Waiting lets the simulated GPU run up to the submission that
        // signals this fence; nothing pending means it would never signal
        rm.retire_until(&self.state);
        if self.state.is_signalled() {
            Ok(())
        } else {
            Err(GpuError::Timeout)
        }
    }

    fn reset(&mut self) {
        self.state.set(false);
    }

    fn status(&mut self) -> FenceStatus {
        if self.state.is_signalled() {
            FenceStatus::Signalled
        } else {
            FenceStatus::Unsignalled
        }
    }
}
