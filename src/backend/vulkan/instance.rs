// Vulkan instance, surfaces and the validation-layer bridge into `log`

use ash::extensions::{ext, khr};
use ash::{vk, Entry};
use std::ffi::{CStr, CString};
use std::sync::{Arc, Weak};

use super::resource_manager::VulkanResourceManager;
use crate::adapter::Adapter;
use crate::api::{ApiInstance, ApiSurface};
use crate::error::{GpuError, Result};
use crate::handle::Handle;
use crate::instance::{Extension, Instance, InstanceOptions, Surface, SurfaceOptions};

const VALIDATION_LAYER: &CStr = c"VK_LAYER_KHRONOS_validation";

/// Instance-level state shared by everything created from the instance.
/// The instance is destroyed when the last device, adapter or surface
/// holding it goes away.
pub(super) struct InstanceContext {
    pub(super) entry: Entry,
    pub(super) instance: ash::Instance,
    pub(super) surface_loader: khr::Surface,
    debug_utils: Option<(ext::DebugUtils, vk::DebugUtilsMessengerEXT)>,
}

impl InstanceContext {
    pub(super) fn new(entry: &Entry, options: &InstanceOptions) -> Result<Self> {
        let available_layers = entry.enumerate_instance_layer_properties()?;
        let validation_available = available_layers
            .iter()
            .any(|layer| unsafe { CStr::from_ptr(layer.layer_name.as_ptr()) } == VALIDATION_LAYER);
        let enable_validation = options.enable_validation && validation_available;
        if options.enable_validation && !validation_available {
            log::warn!("Validation requested but VK_LAYER_KHRONOS_validation is not installed");
        }

        let instance = Self::create_instance(entry, options, enable_validation)?;

        let debug_utils = if enable_validation {
            match Self::setup_debug_messenger(entry, &instance) {
                Ok(debug_utils) => Some(debug_utils),
                Err(e) => {
                    log::warn!("Failed to create debug messenger: {}", e);
                    None
                }
            }
        } else {
            None
        };

        Ok(Self {
            entry: entry.clone(),
            surface_loader: khr::Surface::new(entry, &instance),
            instance,
            debug_utils,
        })
    }

    fn create_instance(entry: &Entry, options: &InstanceOptions, enable_validation: bool) -> Result<ash::Instance> {
        let app_name = CString::new(options.application_name.as_str()).unwrap_or_default();
        let engine_name = c"rhi";

        let app_info = vk::ApplicationInfo::builder()
            .application_name(&app_name)
            .application_version(options.application_version)
            .engine_name(engine_name)
            .engine_version(vk::make_api_version(0, 0, 1, 0))
            .api_version(vk::API_VERSION_1_3);

        // Enable every window-system extension the loader offers
        let available: Vec<CString> = entry
            .enumerate_instance_extension_properties(None)?
            .iter()
            .map(|ext| unsafe { CStr::from_ptr(ext.extension_name.as_ptr()) }.to_owned())
            .collect();

        let mut wanted: Vec<&CStr> = vec![
            khr::Surface::name(),
            khr::Win32Surface::name(),
            khr::XlibSurface::name(),
            khr::XcbSurface::name(),
            khr::WaylandSurface::name(),
        ];
        if enable_validation {
            wanted.push(ext::DebugUtils::name());
        }

        let requested: Vec<CString> = options
            .extensions
            .iter()
            .filter_map(|name| CString::new(name.as_str()).ok())
            .collect();

        let mut extensions: Vec<*const std::os::raw::c_char> = wanted
            .iter()
            .filter(|name| available.iter().any(|ext| ext.as_c_str() == **name))
            .map(|name| name.as_ptr())
            .collect();
        extensions.extend(requested.iter().map(|name| name.as_ptr()));

        let requested_layers: Vec<CString> = options
            .layers
            .iter()
            .filter_map(|name| CString::new(name.as_str()).ok())
            .collect();
        let mut layer_names: Vec<*const std::os::raw::c_char> =
            requested_layers.iter().map(|name| name.as_ptr()).collect();
        if enable_validation {
            layer_names.push(VALIDATION_LAYER.as_ptr());
        }

        let create_info = vk::InstanceCreateInfo::builder()
            .application_info(&app_info)
            .enabled_extension_names(&extensions)
            .enabled_layer_names(&layer_names);

        let instance = unsafe { entry.create_instance(&create_info, None) }?;
        log::info!(
            "Vulkan instance created ({} extensions, validation {})",
            extensions.len(),
            if enable_validation { "on" } else { "off" }
        );
        Ok(instance)
    }

    fn setup_debug_messenger(
        entry: &Entry,
        instance: &ash::Instance,
    ) -> Result<(ext::DebugUtils, vk::DebugUtilsMessengerEXT)> {
        let debug_utils = ext::DebugUtils::new(entry, instance);

        let create_info = vk::DebugUtilsMessengerCreateInfoEXT::builder()
            .message_severity(
                vk::DebugUtilsMessageSeverityFlagsEXT::WARNING | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
            )
            .message_type(
                vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                    | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                    | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
            )
            .pfn_user_callback(Some(debug_callback));

        let messenger = unsafe { debug_utils.create_debug_utils_messenger(&create_info, None) }?;

        Ok((debug_utils, messenger))
    }
}

impl Drop for InstanceContext {
    fn drop(&mut self) {
        log::info!("Destroying Vulkan instance...");
        unsafe {
            if let Some((debug_utils, messenger)) = self.debug_utils.take() {
                debug_utils.destroy_debug_utils_messenger(messenger, None);
            }
            self.instance.destroy_instance(None);
        }
    }
}

pub(super) struct VulkanInstance {
    pub(super) context: Arc<InstanceContext>,
    pub(super) adapters: Vec<Handle<Adapter>>,
    pub(super) rm: Weak<VulkanResourceManager>,
}

impl ApiInstance for VulkanInstance {
    fn extensions(&self) -> Vec<Extension> {
        self.context
            .entry
            .enumerate_instance_extension_properties(None)
            .unwrap_or_default()
            .iter()
            .map(|ext| Extension {
                name: unsafe { CStr::from_ptr(ext.extension_name.as_ptr()) }
                    .to_string_lossy()
                    .into_owned(),
                version: ext.spec_version,
            })
            .collect()
    }

    fn query_adapters(&mut self, instance: Handle<Instance>) -> Vec<Handle<Adapter>> {
        if self.adapters.is_empty() {
            if let Some(rm) = self.rm.upgrade() {
                self.adapters = rm.create_adapters(instance, &self.context);
            }
        }
        self.adapters.clone()
    }

    fn create_surface(&mut self, instance: Handle<Instance>, options: &SurfaceOptions) -> Handle<Surface> {
        let surface = match create_native_surface(&self.context, options) {
            Ok(surface) => surface,
            Err(e) => {
                log::error!("Failed to create surface: {}", e);
                return Handle::default();
            }
        };
        match self.rm.upgrade() {
            Some(rm) => rm.insert_surface(VulkanSurface {
                instance,
                context: self.context.clone(),
                surface,
            }),
            None => Handle::default(),
        }
    }
}

fn create_native_surface(context: &InstanceContext, options: &SurfaceOptions) -> Result<vk::SurfaceKHR> {
    let entry = &context.entry;
    let instance = &context.instance;
    let surface = match *options {
        SurfaceOptions::Win32 { hinstance, hwnd } => {
            let create_info = vk::Win32SurfaceCreateInfoKHR::builder()
                .hinstance(hinstance as vk::HINSTANCE)
                .hwnd(hwnd as vk::HWND);
            unsafe { khr::Win32Surface::new(entry, instance).create_win32_surface(&create_info, None) }?
        }
        SurfaceOptions::Xlib { display, window } => {
            let create_info = vk::XlibSurfaceCreateInfoKHR::builder()
                .dpy(display as *mut vk::Display)
                .window(window as vk::Window);
            unsafe { khr::XlibSurface::new(entry, instance).create_xlib_surface(&create_info, None) }?
        }
        SurfaceOptions::Xcb { connection, window } => {
            let create_info = vk::XcbSurfaceCreateInfoKHR::builder()
                .connection(connection as *mut vk::xcb_connection_t)
                .window(window as vk::xcb_window_t);
            unsafe { khr::XcbSurface::new(entry, instance).create_xcb_surface(&create_info, None) }?
        }
        SurfaceOptions::Wayland { display, surface } => {
            let create_info = vk::WaylandSurfaceCreateInfoKHR::builder()
                .display(display as *mut vk::wl_display)
                .surface(surface as *mut vk::wl_surface);
            unsafe { khr::WaylandSurface::new(entry, instance).create_wayland_surface(&create_info, None) }?
        }
        SurfaceOptions::Headless { .. } => {
            return Err(GpuError::UnsupportedSurface(
                "headless surfaces need the Null backend".to_string(),
            ))
        }
    };
    log::debug!("Created {:?} surface", surface);
    Ok(surface)
}

pub(super) struct VulkanSurface {
    pub(super) instance: Handle<Instance>,
    pub(super) context: Arc<InstanceContext>,
    pub(super) surface: vk::SurfaceKHR,
}

impl ApiSurface for VulkanSurface {}

impl Drop for VulkanSurface {
    fn drop(&mut self) {
        unsafe {
            self.context.surface_loader.destroy_surface(self.surface, None);
        }
    }
}

// Debug callback for validation layers
unsafe extern "system" fn debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    _message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    _p_user_data: *mut std::ffi::c_void,
) -> vk::Bool32 {
    let message = CStr::from_ptr((*p_callback_data).p_message);

    match message_severity {
        vk::DebugUtilsMessageSeverityFlagsEXT::ERROR => {
            log::error!("[Vulkan] {}", message.to_string_lossy());
        }
        vk::DebugUtilsMessageSeverityFlagsEXT::WARNING => {
            log::warn!("[Vulkan] {}", message.to_string_lossy());
        }
        _ => {
            log::debug!("[Vulkan] {}", message.to_string_lossy());
        }
    }

    vk::FALSE
}
