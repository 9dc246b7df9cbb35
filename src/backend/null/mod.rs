// Null backend - a headless software model of a GPU
//
// Objects live in the same generational pools as a real backend, but nothing
// reaches a driver. Submissions queue up and "execute" when retired: buffer
// and texture copies are applied, fences are signalled. By default every
// submission retires immediately; tests can hold them back to observe
// in-flight state, script acquire/present results, or simulate device loss.

mod commands;
mod objects;
mod resource_manager;

use std::sync::Arc;

use crate::api::{BackendType, GraphicsApi, ResourceManager};

pub use commands::NullCommand;
pub use resource_manager::NullResourceManager;

pub struct NullGraphicsApi {
    resource_manager: Arc<NullResourceManager>,
}

impl NullGraphicsApi {
    pub fn new() -> Arc<Self> {
        log::info!("Using the Null graphics backend");
        Arc::new(Self {
            resource_manager: NullResourceManager::new(),
        })
    }

    /// Concrete resource manager, for inspection and fault injection
    pub fn resources(&self) -> &NullResourceManager {
        &self.resource_manager
    }
}

impl GraphicsApi for NullGraphicsApi {
    fn backend_type(&self) -> BackendType {
        BackendType::Null
    }

    fn resource_manager(&self) -> &dyn ResourceManager {
        &*self.resource_manager
    }
}
