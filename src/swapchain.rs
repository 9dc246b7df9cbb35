// Swapchain - the chain of images presented to a surface
//
// Recreate by creating a new swapchain with `old_swapchain` set to the
// current one, then replacing the old wrapper.

use std::sync::Arc;

use crate::api::{same_api, GraphicsApi};
use crate::device::Device;
use crate::gpu_core::{AcquireImageResult, ColorSpace, Extent2D, Format, PresentMode, TextureUsageFlags};
use crate::handle::Handle;
use crate::instance::Surface;
use crate::sync::GpuSemaphore;
use crate::texture::Texture;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapchainOptions {
    pub surface: Handle<Surface>,
    pub format: Format,
    pub color_space: ColorSpace,
    pub min_image_count: u32,
    pub image_extent: Extent2D,
    pub image_layers: u32,
    pub image_usage: TextureUsageFlags,
    pub present_mode: PresentMode,
    pub clipped: bool,
    pub old_swapchain: Handle<Swapchain>,
}

impl Default for SwapchainOptions {
    fn default() -> Self {
        Self {
            surface: Handle::default(),
            format: Format::B8G8R8A8Srgb,
            color_space: ColorSpace::SrgbNonlinear,
            min_image_count: 3,
            image_extent: Extent2D {
                width: 1920,
                height: 1080,
            },
            image_layers: 1,
            image_usage: TextureUsageFlags::COLOR_ATTACHMENT,
            present_mode: PresentMode::Mailbox,
            clipped: true,
            old_swapchain: Handle::default(),
        }
    }
}

pub struct Swapchain {
    api: Option<Arc<dyn GraphicsApi>>,
    device: Handle<Device>,
    handle: Handle<Swapchain>,
    textures: Vec<Texture>,
}

impl Swapchain {
    pub(crate) fn new(api: &Arc<dyn GraphicsApi>, device: Handle<Device>, options: &SwapchainOptions) -> Self {
        let rm = api.resource_manager();
        let handle = rm.create_swapchain(device, options);
        let textures = rm
            .get_swapchain(handle)
            .map(|mut swapchain| swapchain.get_textures())
            .unwrap_or_default()
            .into_iter()
            .map(|texture| Texture::from_parts(api, device, texture))
            .collect();

        Self {
            api: Some(api.clone()),
            device,
            handle,
            textures,
        }
    }

    pub fn handle(&self) -> Handle<Swapchain> {
        self.handle
    }

    pub fn device_handle(&self) -> Handle<Device> {
        self.device
    }

    pub fn is_valid(&self) -> bool {
        self.handle.is_valid()
    }

    /// Presentable textures, indexed by acquired image index
    pub fn textures(&self) -> &[Texture] {
        &self.textures
    }

    /// Acquire the next presentable image, signalling `semaphore` once the
    /// presentation engine has released it
    pub fn get_next_image_index(&self, semaphore: &GpuSemaphore) -> (AcquireImageResult, u32) {
        self.api
            .as_ref()
            .and_then(|api| api.resource_manager().get_swapchain(self.handle))
            .map(|mut swapchain| swapchain.get_next_image_index(semaphore.handle()))
            .unwrap_or((AcquireImageResult::Failed, 0))
    }
}

impl Default for Swapchain {
    fn default() -> Self {
        Self {
            api: None,
            device: Handle::default(),
            handle: Handle::default(),
            textures: Vec::new(),
        }
    }
}

impl Drop for Swapchain {
    fn drop(&mut self) {
        // The swapchain owns its textures, deleting it releases them
        if let (Some(api), true) = (&self.api, self.handle.is_valid()) {
            api.resource_manager().delete_swapchain(self.handle);
        }
    }
}

impl PartialEq for Swapchain {
    fn eq(&self, other: &Self) -> bool {
        same_api(&self.api, &other.api) && self.device == other.device && self.handle == other.handle
    }
}

impl Eq for Swapchain {}

impl std::fmt::Debug for Swapchain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Swapchain")
            .field("device", &self.device)
            .field("handle", &self.handle)
            .field("textures", &self.textures.len())
            .finish()
    }
}
