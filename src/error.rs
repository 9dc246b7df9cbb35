// Error taxonomy
//
// Resource creation never returns these: it yields an invalid handle and logs.
// GpuError is for calls whose failure the caller must act on (device loss,
// fence timeouts, fatal startup, host access to memory that can't be mapped).

use ash::vk;
use thiserror::Error;

pub type Result<T, E = GpuError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum GpuError {
    #[error("Vulkan error: {0}")]
    Vulkan(#[from] vk::Result),

    #[error("failed to load the Vulkan library: {0}")]
    Loading(#[from] ash::LoadingError),

    #[error("GPU memory allocation failed: {0}")]
    Allocation(#[from] gpu_allocator::AllocationError),

    #[error("device lost")]
    DeviceLost,

    #[error("timed out waiting for the GPU")]
    Timeout,

    #[error("no suitable adapter: {0}")]
    NoSuitableAdapter(String),

    #[error("resource is not host visible")]
    NotMappable,

    #[error("invalid or stale {0} handle")]
    InvalidHandle(&'static str),

    #[error("range {offset}..{end} exceeds resource size {size}")]
    OutOfBounds { offset: u64, end: u64, size: u64 },

    #[error("unsupported surface: {0}")]
    UnsupportedSurface(String),
}

impl GpuError {
    /// Errors after which the device can't be used anymore
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            GpuError::DeviceLost | GpuError::Vulkan(vk::Result::ERROR_DEVICE_LOST)
        )
    }

    /// Collapse native device-loss codes into [`GpuError::DeviceLost`]
    pub(crate) fn from_vk(result: vk::Result) -> Self {
        match result {
            vk::Result::ERROR_DEVICE_LOST => GpuError::DeviceLost,
            vk::Result::TIMEOUT => GpuError::Timeout,
            other => GpuError::Vulkan(other),
        }
    }
}
