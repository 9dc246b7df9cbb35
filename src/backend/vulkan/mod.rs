// Vulkan backend
//
// ash for the API, gpu-allocator for memory. Requires Vulkan 1.3: adapters
// without dynamic rendering are not reported.

mod adapter;
mod bind_group;
mod buffer;
mod command_recorder;
mod conversions;
mod device;
mod instance;
mod pipeline;
mod resource_manager;
mod swapchain;
mod sync;
mod texture;

use ash::Entry;
use std::sync::Arc;

use crate::api::{BackendType, GraphicsApi, ResourceManager};
use crate::error::Result;

pub use resource_manager::VulkanResourceManager;

pub struct VulkanGraphicsApi {
    resource_manager: Arc<VulkanResourceManager>,
}

impl VulkanGraphicsApi {
    /// Load the Vulkan library. Fails with [`GpuError::Loading`] when no
    /// driver is installed.
    ///
    /// [`GpuError::Loading`]: crate::error::GpuError::Loading
    pub fn new() -> Result<Arc<Self>> {
        let entry = unsafe { Entry::load() }?;
        log::info!("Vulkan library loaded");
        Ok(Arc::new(Self {
            resource_manager: VulkanResourceManager::new(entry),
        }))
    }
}

impl GraphicsApi for VulkanGraphicsApi {
    fn backend_type(&self) -> BackendType {
        BackendType::Vulkan
    }

    fn resource_manager(&self) -> &dyn ResourceManager {
        &*self.resource_manager
    }
}
