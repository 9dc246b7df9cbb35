// Backend implementations
//
// Vulkan drives a real GPU through ash and gpu-allocator. Null is a headless
// model of the same contracts, used by tests and on machines without a
// Vulkan driver.

pub mod null;
pub mod vulkan;

use std::sync::Arc;

use crate::api::{BackendType, GraphicsApi};
use crate::error::Result;

pub use null::NullGraphicsApi;
pub use vulkan::VulkanGraphicsApi;

/// Create the backend selected by `backend_type`
pub fn create_graphics_api(backend_type: BackendType) -> Result<Arc<dyn GraphicsApi>> {
    let api: Arc<dyn GraphicsApi> = match backend_type {
        BackendType::Vulkan => VulkanGraphicsApi::new()?,
        BackendType::Null => NullGraphicsApi::new(),
    };
    Ok(api)
}
