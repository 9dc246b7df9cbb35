// Backend dispatch layer
//
// GraphicsApi is the selected backend. It owns a ResourceManager that maps
// typed handles to backend objects, which implement the Api* capability
// traits. Frontend wrappers only ever see these traits.

mod resource_manager;
mod traits;

pub(crate) use resource_manager::lock_resource;
pub use resource_manager::{ApiGuard, ResourceManager};
pub use traits::*;

use serde::Deserialize;
use std::sync::Arc;

use crate::instance::{Instance, InstanceOptions};

/// Backends compiled into this crate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendType {
    #[default]
    Vulkan,
    /// Headless software model, no driver required
    Null,
}

/// Entry point of a backend: everything else is reached through its
/// resource manager.
pub trait GraphicsApi: Send + Sync {
    fn backend_type(&self) -> BackendType;

    fn resource_manager(&self) -> &dyn ResourceManager;
}

/// Frontend conveniences on a shared backend
pub trait GraphicsApiExt {
    fn create_instance(&self, options: &InstanceOptions) -> Instance;
}

impl GraphicsApiExt for Arc<dyn GraphicsApi> {
    fn create_instance(&self, options: &InstanceOptions) -> Instance {
        Instance::new(self, options)
    }
}

/// Identity comparison of the backend behind two wrappers
pub(crate) fn same_api(a: &Option<Arc<dyn GraphicsApi>>, b: &Option<Arc<dyn GraphicsApi>>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ()),
        _ => false,
    }
}
