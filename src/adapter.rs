// Adapter - a physical GPU exposed by an instance
//
// Adapters are owned by their instance; the wrapper is a cheap, copyable
// reference used for queries and to create devices.

use std::sync::Arc;

use crate::api::{same_api, GraphicsApi};
use crate::device::{Device, DeviceOptions};
use crate::gpu_core::{AdapterDeviceType, ColorSpace, Extent2D, Format, PresentMode, QueueFlags, TextureUsageFlags};
use crate::handle::Handle;
use crate::instance::{Instance, Surface};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AdapterLimits {
    pub max_image_dimension_2d: u32,
    pub max_bound_descriptor_sets: u32,
    pub max_push_constants_size: u32,
    pub min_uniform_buffer_offset_alignment: u64,
    pub max_compute_work_group_count: [u32; 3],
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AdapterProperties {
    pub api_version: u32,
    pub driver_version: u32,
    pub vendor_id: u32,
    pub device_id: u32,
    pub device_type: AdapterDeviceType,
    pub device_name: String,
    pub limits: AdapterLimits,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AdapterFeatures {
    pub geometry_shader: bool,
    pub tessellation_shader: bool,
    pub sampler_anisotropy: bool,
    pub fill_mode_non_solid: bool,
    pub wide_lines: bool,
    pub multi_draw_indirect: bool,
    pub depth_clamp: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdapterQueueType {
    pub flags: QueueFlags,
    pub queue_count: u32,
    pub timestamp_valid_bits: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SurfaceCapabilities {
    pub min_image_count: u32,
    /// 0 means no upper bound
    pub max_image_count: u32,
    pub current_extent: Extent2D,
    pub min_image_extent: Extent2D,
    pub max_image_extent: Extent2D,
    pub supported_usage: TextureUsageFlags,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceFormat {
    pub format: Format,
    pub color_space: ColorSpace,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AdapterSwapchainProperties {
    pub capabilities: SurfaceCapabilities,
    pub formats: Vec<SurfaceFormat>,
    pub present_modes: Vec<PresentMode>,
}

impl AdapterSwapchainProperties {
    /// First of `preferred` the surface supports, else the first reported format
    pub fn select_format(&self, preferred: &[Format]) -> Option<SurfaceFormat> {
        preferred
            .iter()
            .find_map(|wanted| self.formats.iter().find(|f| f.format == *wanted))
            .or_else(|| self.formats.first())
            .copied()
    }

    /// First of `preferred` the surface supports; FIFO is always available
    pub fn select_present_mode(&self, preferred: &[PresentMode]) -> PresentMode {
        preferred
            .iter()
            .copied()
            .find(|mode| self.present_modes.contains(mode))
            .unwrap_or(PresentMode::Fifo)
    }
}

#[derive(Clone, Default)]
pub struct Adapter {
    api: Option<Arc<dyn GraphicsApi>>,
    instance: Handle<Instance>,
    handle: Handle<Adapter>,
}

impl Adapter {
    pub(crate) fn from_parts(api: &Arc<dyn GraphicsApi>, instance: Handle<Instance>, handle: Handle<Adapter>) -> Self {
        Self {
            api: Some(api.clone()),
            instance,
            handle,
        }
    }

    pub fn handle(&self) -> Handle<Adapter> {
        self.handle
    }

    pub fn is_valid(&self) -> bool {
        self.handle.is_valid()
    }

    pub fn properties(&self) -> AdapterProperties {
        self.query(|adapter| adapter.query_adapter_properties())
            .unwrap_or_default()
    }

    pub fn features(&self) -> AdapterFeatures {
        self.query(|adapter| adapter.query_adapter_features())
            .unwrap_or_default()
    }

    pub fn queue_types(&self) -> Vec<AdapterQueueType> {
        self.query(|adapter| adapter.query_queue_types())
            .unwrap_or_default()
    }

    pub fn swapchain_properties(&self, surface: &Surface) -> AdapterSwapchainProperties {
        self.query(|adapter| adapter.query_swapchain_properties(surface.handle()))
            .unwrap_or_default()
    }

    pub fn supports_presentation(&self, surface: &Surface, queue_type_index: u32) -> bool {
        self.query(|adapter| adapter.supports_presentation(surface.handle(), queue_type_index))
            .unwrap_or(false)
    }

    pub fn create_device(&self, options: &DeviceOptions) -> Device {
        match &self.api {
            Some(api) => Device::new(api, self.handle, options),
            None => Device::default(),
        }
    }

    fn query<R>(&self, f: impl FnOnce(&dyn crate::api::ApiAdapter) -> R) -> Option<R> {
        let api = self.api.as_ref()?;
        let adapter = api.resource_manager().get_adapter(self.handle)?;
        Some(f(&*adapter))
    }
}

impl PartialEq for Adapter {
    fn eq(&self, other: &Self) -> bool {
        same_api(&self.api, &other.api) && self.instance == other.instance && self.handle == other.handle
    }
}

impl Eq for Adapter {}

impl std::fmt::Debug for Adapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Adapter")
            .field("instance", &self.instance)
            .field("handle", &self.handle)
            .finish()
    }
}
