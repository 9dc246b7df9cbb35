// Semaphores and fences

use ash::vk;
use std::sync::Arc;
use std::time::Duration;

use super::device::DeviceContext;
use crate::api::{ApiFence, ApiGpuSemaphore};
use crate::device::Device;
use crate::error::{GpuError, Result};
use crate::gpu_core::FenceStatus;
use crate::handle::Handle;
use crate::sync::FenceOptions;

/// Longest a fence wait blocks before reporting a timeout
pub(super) const FENCE_TIMEOUT: Duration = Duration::from_secs(5);

pub(super) struct VulkanGpuSemaphore {
    pub(super) device: Handle<Device>,
    pub(super) context: Arc<DeviceContext>,
    pub(super) semaphore: vk::Semaphore,
}

impl VulkanGpuSemaphore {
    pub(super) fn new(device: Handle<Device>, context: &Arc<DeviceContext>) -> Result<Self> {
        let semaphore_info = vk::SemaphoreCreateInfo::builder();
        let semaphore = unsafe { context.device.create_semaphore(&semaphore_info, None) }?;
        Ok(Self {
            device,
            context: context.clone(),
            semaphore,
        })
    }
}

impl ApiGpuSemaphore for VulkanGpuSemaphore {}

impl Drop for VulkanGpuSemaphore {
    fn drop(&mut self) {
        unsafe { self.context.device.destroy_semaphore(self.semaphore, None) };
    }
}

pub(super) struct VulkanFence {
    pub(super) device: Handle<Device>,
    pub(super) context: Arc<DeviceContext>,
    pub(super) fence: vk::Fence,
}

impl VulkanFence {
    pub(super) fn new(device: Handle<Device>, context: &Arc<DeviceContext>, options: &FenceOptions) -> Result<Self> {
        let flags = if options.create_signalled {
            vk::FenceCreateFlags::SIGNALED
        } else {
            vk::FenceCreateFlags::empty()
        };
        let fence_info = vk::FenceCreateInfo::builder().flags(flags);
        let fence = unsafe { context.device.create_fence(&fence_info, None) }?;
        Ok(Self {
            device,
            context: context.clone(),
            fence,
        })
    }
}

impl ApiFence for VulkanFence {
    fn wait(&mut self) -> Result<()> {
        let timeout = FENCE_TIMEOUT.as_nanos() as u64;
        unsafe { self.context.device.wait_for_fences(&[self.fence], true, timeout) }.map_err(|e| {
            if e == vk::Result::TIMEOUT {
                log::error!("Fence not signalled after {:?}", FENCE_TIMEOUT);
            }
            GpuError::from_vk(e)
        })
    }

    fn reset(&mut self) {
        if let Err(e) = unsafe { self.context.device.reset_fences(&[self.fence]) } {
            log::error!("Failed to reset fence: {:?}", e);
        }
    }

    fn status(&mut self) -> FenceStatus {
        match unsafe { self.context.device.get_fence_status(self.fence) } {
            Ok(true) => FenceStatus::Signalled,
            Ok(false) => FenceStatus::Unsignalled,
            Err(e) => {
                log::error!("Failed to query fence status: {:?}", e);
                FenceStatus::Unsignalled
            }
        }
    }
}

impl Drop for VulkanFence {
    fn drop(&mut self) {
        unsafe { self.context.device.destroy_fence(self.fence, None) };
    }
}
