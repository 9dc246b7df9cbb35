// Instance and surface
//
// The instance is the root object of a backend: it enumerates adapters and
// creates presentation surfaces from native window handles.

use raw_window_handle::{HasDisplayHandle, HasWindowHandle, RawDisplayHandle, RawWindowHandle};
use std::ffi::c_void;
use std::sync::Arc;

use crate::adapter::Adapter;
use crate::api::{same_api, GraphicsApi};
use crate::device::{Device, DeviceOptions, QueueRequest};
use crate::error::{GpuError, Result};
use crate::gpu_core::{AdapterDeviceType, Extent2D, QueueFlags};
use crate::handle::Handle;

#[derive(Debug, Clone)]
pub struct InstanceOptions {
    pub application_name: String,
    pub application_version: u32,
    /// Extra instance layers to enable, by name
    pub layers: Vec<String>,
    /// Extra instance extensions to enable, by name
    pub extensions: Vec<String>,
    pub enable_validation: bool,
}

impl Default for InstanceOptions {
    fn default() -> Self {
        Self {
            application_name: "rhi application".to_string(),
            application_version: 1,
            layers: Vec::new(),
            extensions: Vec::new(),
            enable_validation: cfg!(debug_assertions),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extension {
    pub name: String,
    pub version: u32,
}

/// Native window description a surface is created from
#[derive(Debug, Clone, Copy)]
pub enum SurfaceOptions {
    Win32 { hinstance: *mut c_void, hwnd: *mut c_void },
    Xlib { display: *mut c_void, window: u64 },
    Xcb { connection: *mut c_void, window: u32 },
    Wayland { display: *mut c_void, surface: *mut c_void },
    /// Offscreen surface of a fixed size, for backends without a window system
    Headless { extent: Extent2D },
}

impl SurfaceOptions {
    pub fn from_window<W>(window: &W) -> Result<Self>
    where
        W: HasWindowHandle + HasDisplayHandle + ?Sized,
    {
        let window_handle = window
            .window_handle()
            .map_err(|e| GpuError::UnsupportedSurface(e.to_string()))?
            .as_raw();
        let display_handle = window
            .display_handle()
            .map_err(|e| GpuError::UnsupportedSurface(e.to_string()))?
            .as_raw();

        match (display_handle, window_handle) {
            (_, RawWindowHandle::Win32(handle)) => Ok(SurfaceOptions::Win32 {
                hinstance: handle.hinstance.map(|h| h.get()).unwrap_or(0) as *mut c_void,
                hwnd: handle.hwnd.get() as *mut c_void,
            }),
            (RawDisplayHandle::Xlib(display), RawWindowHandle::Xlib(handle)) => Ok(SurfaceOptions::Xlib {
                display: display
                    .display
                    .map(|d| d.as_ptr())
                    .unwrap_or(std::ptr::null_mut()),
                window: handle.window as u64,
            }),
            (RawDisplayHandle::Xcb(display), RawWindowHandle::Xcb(handle)) => Ok(SurfaceOptions::Xcb {
                connection: display
                    .connection
                    .map(|c| c.as_ptr())
                    .unwrap_or(std::ptr::null_mut()),
                window: handle.window.get(),
            }),
            (RawDisplayHandle::Wayland(display), RawWindowHandle::Wayland(handle)) => {
                Ok(SurfaceOptions::Wayland {
                    display: display.display.as_ptr(),
                    surface: handle.surface.as_ptr(),
                })
            }
            (display, window) => Err(GpuError::UnsupportedSurface(format!(
                "{:?} / {:?}",
                display, window
            ))),
        }
    }
}

gpu_resource!(
    /// Presentation target backed by a native window
    Surface, parent: Instance => instance_handle, delete: delete_surface
);

/// Result of [`Instance::create_default_device`]
pub struct AdapterAndDevice {
    pub adapter: Adapter,
    pub device: Device,
}

pub struct Instance {
    api: Option<Arc<dyn GraphicsApi>>,
    handle: Handle<Instance>,
    adapters: Vec<Adapter>,
}

impl Instance {
    pub(crate) fn new(api: &Arc<dyn GraphicsApi>, options: &InstanceOptions) -> Self {
        let handle = api.resource_manager().create_instance(options);
        Self {
            api: Some(api.clone()),
            handle,
            adapters: Vec::new(),
        }
    }

    pub fn handle(&self) -> Handle<Instance> {
        self.handle
    }

    pub fn is_valid(&self) -> bool {
        self.handle.is_valid()
    }

    pub fn extensions(&self) -> Vec<Extension> {
        self.api
            .as_ref()
            .and_then(|api| api.resource_manager().get_instance(self.handle))
            .map(|instance| instance.extensions())
            .unwrap_or_default()
    }

    /// Adapters of this instance, queried once and cached
    pub fn adapters(&mut self) -> &[Adapter] {
        if self.adapters.is_empty() {
            if let Some(api) = &self.api {
                let handles = api
                    .resource_manager()
                    .get_instance(self.handle)
                    .map(|mut instance| instance.query_adapters(self.handle))
                    .unwrap_or_default();
                self.adapters = handles
                    .into_iter()
                    .map(|handle| Adapter::from_parts(api, self.handle, handle))
                    .collect();
            }
        }
        &self.adapters
    }

    /// First adapter of the requested type, falling back to the first adapter
    pub fn select_adapter(&mut self, device_type: AdapterDeviceType) -> Option<Adapter> {
        let adapters = self.adapters();
        adapters
            .iter()
            .find(|adapter| adapter.properties().device_type == device_type)
            .or_else(|| adapters.first())
            .cloned()
    }

    pub fn create_surface(&self, options: &SurfaceOptions) -> Surface {
        let Some(api) = &self.api else {
            return Surface::default();
        };
        let handle = api
            .resource_manager()
            .get_instance(self.handle)
            .map(|mut instance| instance.create_surface(self.handle, options))
            .unwrap_or_default();
        Surface::from_parts(api, self.handle, handle)
    }

    /// Pick an adapter (preferring `device_type`) with a graphics queue that
    /// can present to `surface`, and create a device with one such queue.
    pub fn create_default_device(
        &mut self,
        surface: &Surface,
        device_type: AdapterDeviceType,
    ) -> Result<AdapterAndDevice> {
        let mut candidates = self.adapters().to_vec();
        candidates.sort_by_key(|adapter| adapter.properties().device_type != device_type);

        for adapter in candidates {
            let properties = adapter.properties();
            let queue_type_index = adapter
                .queue_types()
                .iter()
                .position(|queue_type| queue_type.flags.contains(QueueFlags::GRAPHICS));

            let Some(queue_type_index) = queue_type_index.map(|i| i as u32) else {
                log::debug!("Skipping {}: no graphics queue", properties.device_name);
                continue;
            };

            if !adapter.supports_presentation(surface, queue_type_index) {
                log::debug!("Skipping {}: cannot present to surface", properties.device_name);
                continue;
            }

            let device = adapter.create_device(&DeviceOptions {
                queues: vec![QueueRequest {
                    queue_type_index,
                    count: 1,
                    priorities: vec![1.0],
                }],
                ..Default::default()
            });

            if !device.is_valid() {
                log::warn!("Device creation failed on {}", properties.device_name);
                continue;
            }

            log::info!("Selected GPU: {} ({:?})", properties.device_name, properties.device_type);
            return Ok(AdapterAndDevice { adapter, device });
        }

        Err(GpuError::NoSuitableAdapter(
            "no adapter has a graphics queue that can present to the surface".to_string(),
        ))
    }
}

impl Default for Instance {
    fn default() -> Self {
        Self {
            api: None,
            handle: Handle::default(),
            adapters: Vec::new(),
        }
    }
}

impl Drop for Instance {
    fn drop(&mut self) {
        // Adapters are plain references; the backend reclaims them with the instance
        self.adapters.clear();
        if let (Some(api), true) = (&self.api, self.handle.is_valid()) {
            api.resource_manager().delete_instance(self.handle);
        }
    }
}

impl PartialEq for Instance {
    fn eq(&self, other: &Self) -> bool {
        same_api(&self.api, &other.api) && self.handle == other.handle
    }
}

impl Eq for Instance {}

impl std::fmt::Debug for Instance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Instance").field("handle", &self.handle).finish()
    }
}
