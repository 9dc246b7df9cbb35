// Physical device queries

use ash::vk;
use std::ffi::CStr;
use std::sync::{Arc, Weak};

use super::conversions;
use super::instance::InstanceContext;
use super::resource_manager::VulkanResourceManager;
use crate::adapter::{
    AdapterFeatures, AdapterLimits, AdapterProperties, AdapterQueueType, AdapterSwapchainProperties,
    SurfaceCapabilities, SurfaceFormat,
};
use crate::api::ApiAdapter;
use crate::handle::Handle;
use crate::instance::{Instance, Surface};

pub(super) struct VulkanAdapter {
    pub(super) instance: Handle<Instance>,
    pub(super) context: Arc<InstanceContext>,
    pub(super) physical_device: vk::PhysicalDevice,
    pub(super) rm: Weak<VulkanResourceManager>,
}

impl VulkanAdapter {
    fn surface(&self, surface: Handle<Surface>) -> Option<vk::SurfaceKHR> {
        self.rm.upgrade().and_then(|rm| rm.native_surface(surface))
    }
}

impl ApiAdapter for VulkanAdapter {
    fn query_adapter_properties(&self) -> AdapterProperties {
        let props = unsafe { self.context.instance.get_physical_device_properties(self.physical_device) };
        let limits = &props.limits;

        AdapterProperties {
            api_version: props.api_version,
            driver_version: props.driver_version,
            vendor_id: props.vendor_id,
            device_id: props.device_id,
            device_type: conversions::device_type_from_vk(props.device_type),
            device_name: unsafe { CStr::from_ptr(props.device_name.as_ptr()) }
                .to_string_lossy()
                .into_owned(),
            limits: AdapterLimits {
                max_image_dimension_2d: limits.max_image_dimension2_d,
                max_bound_descriptor_sets: limits.max_bound_descriptor_sets,
                max_push_constants_size: limits.max_push_constants_size,
                min_uniform_buffer_offset_alignment: limits.min_uniform_buffer_offset_alignment,
                max_compute_work_group_count: limits.max_compute_work_group_count,
            },
        }
    }

    fn query_adapter_features(&self) -> AdapterFeatures {
        let features = unsafe { self.context.instance.get_physical_device_features(self.physical_device) };
        AdapterFeatures {
            geometry_shader: features.geometry_shader == vk::TRUE,
            tessellation_shader: features.tessellation_shader == vk::TRUE,
            sampler_anisotropy: features.sampler_anisotropy == vk::TRUE,
            fill_mode_non_solid: features.fill_mode_non_solid == vk::TRUE,
            wide_lines: features.wide_lines == vk::TRUE,
            multi_draw_indirect: features.multi_draw_indirect == vk::TRUE,
            depth_clamp: features.depth_clamp == vk::TRUE,
        }
    }

    fn query_queue_types(&self) -> Vec<AdapterQueueType> {
        unsafe {
            self.context
                .instance
                .get_physical_device_queue_family_properties(self.physical_device)
        }
        .iter()
        .map(|family| AdapterQueueType {
            flags: conversions::queue_flags_from_vk(family.queue_flags),
            queue_count: family.queue_count,
            timestamp_valid_bits: family.timestamp_valid_bits,
        })
        .collect()
    }

    fn query_swapchain_properties(&self, surface: Handle<Surface>) -> AdapterSwapchainProperties {
        let Some(surface) = self.surface(surface) else {
            log::warn!("Swapchain properties queried for an invalid surface");
            return AdapterSwapchainProperties::default();
        };
        let loader = &self.context.surface_loader;

        // Query surface capabilities
        let caps = match unsafe { loader.get_physical_device_surface_capabilities(self.physical_device, surface) } {
            Ok(caps) => caps,
            Err(e) => {
                log::error!("Failed to query surface capabilities: {:?}", e);
                return AdapterSwapchainProperties::default();
            }
        };

        // Query supported formats
        let formats = unsafe { loader.get_physical_device_surface_formats(self.physical_device, surface) }
            .unwrap_or_default()
            .iter()
            .filter_map(|f| {
                Some(SurfaceFormat {
                    format: conversions::format_from_vk(f.format)?,
                    color_space: conversions::color_space_from_vk(f.color_space)?,
                })
            })
            .collect();

        // Query supported present modes
        let present_modes = unsafe { loader.get_physical_device_surface_present_modes(self.physical_device, surface) }
            .unwrap_or_default()
            .into_iter()
            .filter_map(conversions::present_mode_from_vk)
            .collect();

        AdapterSwapchainProperties {
            capabilities: SurfaceCapabilities {
                min_image_count: caps.min_image_count,
                max_image_count: caps.max_image_count,
                current_extent: conversions::extent_2d_from_vk(caps.current_extent),
                min_image_extent: conversions::extent_2d_from_vk(caps.min_image_extent),
                max_image_extent: conversions::extent_2d_from_vk(caps.max_image_extent),
                supported_usage: conversions::texture_usage_from_vk(caps.supported_usage_flags),
            },
            formats,
            present_modes,
        }
    }

    fn supports_presentation(&self, surface: Handle<Surface>, queue_type_index: u32) -> bool {
        let Some(surface) = self.surface(surface) else {
            return false;
        };
        unsafe {
            self.context.surface_loader.get_physical_device_surface_support(
                self.physical_device,
                queue_type_index,
                surface,
            )
        }
        .unwrap_or(false)
    }
}
