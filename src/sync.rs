// Synchronization primitives
//
// Fences order GPU work against the CPU, semaphores order GPU work against
// other GPU work (acquire -> render -> present).

use crate::device::Device;
use crate::error::{GpuError, Result};
use crate::gpu_core::FenceStatus;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FenceOptions {
    /// Start signalled, so a first `wait` returns immediately
    pub create_signalled: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GpuSemaphoreOptions {}

gpu_resource!(
    /// CPU-visible completion signal
    Fence, parent: Device => device_handle, delete: delete_fence
);

impl Fence {
    /// Block until signalled, or fail with `GpuError::Timeout`
    pub fn wait(&self) -> Result<()> {
        let rm = self.resource_manager().ok_or(GpuError::InvalidHandle("fence"))?;
        let mut fence = rm.get_fence(self.handle).ok_or(GpuError::InvalidHandle("fence"))?;
        fence.wait()
    }

    pub fn reset(&self) {
        match self.resource_manager().and_then(|rm| rm.get_fence(self.handle)) {
            Some(mut fence) => fence.reset(),
            None => log::warn!("reset() on an invalid fence"),
        }
    }

    /// Invalid fences report `Unsignalled`
    pub fn status(&self) -> FenceStatus {
        self.resource_manager()
            .and_then(|rm| rm.get_fence(self.handle))
            .map(|mut fence| fence.status())
            .unwrap_or(FenceStatus::Unsignalled)
    }
}

gpu_resource!(
    /// GPU-only signal used to order queue operations
    GpuSemaphore, parent: Device => device_handle, delete: delete_gpu_semaphore
);
