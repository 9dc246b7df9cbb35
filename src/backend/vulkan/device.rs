// Vulkan logical device and queues
//
// DeviceContext is shared (Arc) by every object created from a device, so the
// native device outlives all of them regardless of deletion order. It owns:
// - the ash device and the swapchain loader
// - the gpu-allocator allocator
// - one command pool per queue family, created on first use

use ash::extensions::khr;
use ash::vk;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, Allocator, AllocatorCreateDesc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::ffi::CString;
use std::sync::{Arc, Weak};

use super::instance::InstanceContext;
use super::resource_manager::VulkanResourceManager;
use crate::adapter::Adapter;
use crate::api::{ApiDevice, ApiQueue};
use crate::device::{Device, QueueDescription};
use crate::error::{GpuError, Result};
use crate::gpu_core::PresentResult;
use crate::handle::Handle;
use crate::queue::{PresentOptions, SubmitOptions};

/// One queue family request: family index and a priority per queue
pub(super) struct QueueFamilyRequest {
    pub(super) family: u32,
    pub(super) priorities: Vec<f32>,
}

pub(super) struct DeviceContext {
    pub(super) instance: Arc<InstanceContext>,
    pub(super) physical_device: vk::PhysicalDevice,
    pub(super) device: ash::Device,
    pub(super) swapchain_loader: khr::Swapchain,
    allocator: Mutex<Option<Allocator>>,
    command_pools: Mutex<HashMap<u32, vk::CommandPool>>,
}

impl DeviceContext {
    pub(super) fn new(
        instance: Arc<InstanceContext>,
        physical_device: vk::PhysicalDevice,
        families: &[QueueFamilyRequest],
        extra_extensions: &[String],
    ) -> Result<Self> {
        let queue_create_infos: Vec<vk::DeviceQueueCreateInfo> = families
            .iter()
            .map(|request| {
                vk::DeviceQueueCreateInfo::builder()
                    .queue_family_index(request.family)
                    .queue_priorities(&request.priorities)
                    .build()
            })
            .collect();

        // Required device extensions
        let extra: Vec<CString> = extra_extensions
            .iter()
            .filter_map(|name| CString::new(name.as_str()).ok())
            .collect();
        let mut extensions = vec![khr::Swapchain::name().as_ptr()];
        extensions.extend(extra.iter().map(|name| name.as_ptr()));

        // Optional features are enabled when the adapter has them
        let supported = unsafe {
            instance
                .instance
                .get_physical_device_features(physical_device)
        };
        let features = vk::PhysicalDeviceFeatures::builder()
            .fill_mode_non_solid(supported.fill_mode_non_solid == vk::TRUE)
            .wide_lines(supported.wide_lines == vk::TRUE)
            .sampler_anisotropy(supported.sampler_anisotropy == vk::TRUE);

        // Vulkan 1.3 dynamic rendering replaces render pass objects
        let mut vulkan13 = vk::PhysicalDeviceVulkan13Features::builder().dynamic_rendering(true);

        let create_info = vk::DeviceCreateInfo::builder()
            .queue_create_infos(&queue_create_infos)
            .enabled_extension_names(&extensions)
            .enabled_features(&features)
            .push_next(&mut vulkan13);

        let device = unsafe {
            instance
                .instance
                .create_device(physical_device, &create_info, None)
        }?;

        let allocator = Allocator::new(&AllocatorCreateDesc {
            instance: instance.instance.clone(),
            device: device.clone(),
            physical_device,
            debug_settings: Default::default(),
            buffer_device_address: false,
            allocation_sizes: Default::default(),
        });
        let allocator = match allocator {
            Ok(allocator) => allocator,
            Err(e) => {
                unsafe { device.destroy_device(None) };
                return Err(e.into());
            }
        };

        Ok(Self {
            swapchain_loader: khr::Swapchain::new(&instance.instance, &device),
            instance,
            physical_device,
            device,
            allocator: Mutex::new(Some(allocator)),
            command_pools: Mutex::new(HashMap::new()),
        })
    }

    pub(super) fn allocate(&self, desc: &AllocationCreateDesc<'_>) -> Result<Allocation> {
        let mut allocator = self.allocator.lock();
        let allocator = allocator.as_mut().ok_or(GpuError::DeviceLost)?;
        Ok(allocator.allocate(desc)?)
    }

    pub(super) fn free(&self, allocation: Allocation) {
        if let Some(allocator) = self.allocator.lock().as_mut() {
            if let Err(e) = allocator.free(allocation) {
                log::error!("Failed to free GPU memory: {}", e);
            }
        }
    }

    /// Allocate a primary command buffer from the pool of `family`
    pub(super) fn allocate_command_buffer(&self, family: u32) -> Result<(vk::CommandPool, vk::CommandBuffer)> {
        let mut pools = self.command_pools.lock();
        let pool = match pools.get(&family) {
            Some(pool) => *pool,
            None => {
                let create_info = vk::CommandPoolCreateInfo::builder()
                    .queue_family_index(family)
                    .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);
                let pool = unsafe { self.device.create_command_pool(&create_info, None) }?;
                log::debug!("Created command pool for queue family {}", family);
                pools.insert(family, pool);
                pool
            }
        };

        let allocate_info = vk::CommandBufferAllocateInfo::builder()
            .command_pool(pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(1);
        let command_buffers = unsafe { self.device.allocate_command_buffers(&allocate_info) }?;
        let command_buffer = command_buffers
            .first()
            .copied()
            .ok_or(GpuError::Vulkan(vk::Result::ERROR_OUT_OF_POOL_MEMORY))?;
        Ok((pool, command_buffer))
    }

    pub(super) fn free_command_buffer(&self, pool: vk::CommandPool, command_buffer: vk::CommandBuffer) {
        // Pools need external synchronization
        let _pools = self.command_pools.lock();
        unsafe { self.device.free_command_buffers(pool, &[command_buffer]) };
    }
}

impl Drop for DeviceContext {
    fn drop(&mut self) {
        log::info!("Destroying Vulkan device...");

        unsafe {
            let _ = self.device.device_wait_idle();

            for (_, pool) in self.command_pools.lock().drain() {
                self.device.destroy_command_pool(pool, None);
            }
        }

        // The allocator frees its memory blocks, so it must go before the device
        drop(self.allocator.lock().take());

        unsafe {
            self.device.destroy_device(None);
        }
    }
}

pub(super) struct VulkanDevice {
    pub(super) adapter: Handle<Adapter>,
    pub(super) context: Arc<DeviceContext>,
    pub(super) queues: Vec<QueueDescription>,
}

impl ApiDevice for VulkanDevice {
    fn adapter(&self) -> Handle<Adapter> {
        self.adapter
    }

    fn queue_descriptions(&self) -> Vec<QueueDescription> {
        self.queues.clone()
    }

    fn wait_until_idle(&self) -> Result<()> {
        unsafe { self.context.device.device_wait_idle() }.map_err(GpuError::from_vk)
    }
}

pub(super) struct VulkanQueue {
    pub(super) device: Handle<Device>,
    pub(super) context: Arc<DeviceContext>,
    pub(super) queue: vk::Queue,
    pub(super) family: u32,
    pub(super) rm: Weak<VulkanResourceManager>,
}

impl ApiQueue for VulkanQueue {
    fn submit(&mut self, options: &SubmitOptions) -> Result<()> {
        let rm = self.rm.upgrade().ok_or(GpuError::DeviceLost)?;

        let command_buffers = rm.native_command_buffers(&options.command_buffers)?;
        let wait_semaphores = rm.native_semaphores(&options.wait_semaphores)?;
        let signal_semaphores = rm.native_semaphores(&options.signal_semaphores)?;
        let fence = match options.signal_fence {
            Some(fence) => rm.native_fence(fence).ok_or(GpuError::InvalidHandle("fence"))?,
            None => vk::Fence::null(),
        };
        let wait_stages = vec![vk::PipelineStageFlags::ALL_COMMANDS; wait_semaphores.len()];

        let submit_info = vk::SubmitInfo::builder()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores)
            .build();

        unsafe {
            self.context
                .device
                .queue_submit(self.queue, &[submit_info], fence)
        }
        .map_err(GpuError::from_vk)
    }

    fn present(&mut self, options: &PresentOptions) -> Vec<PresentResult> {
        let Some(rm) = self.rm.upgrade() else {
            return vec![PresentResult::DeviceLost; options.swapchain_infos.len()];
        };

        let mut swapchains = Vec::with_capacity(options.swapchain_infos.len());
        for info in &options.swapchain_infos {
            match rm.native_swapchain(info.swapchain) {
                Some(swapchain) => swapchains.push(swapchain),
                None => {
                    log::error!("Present of invalid swapchain {:?}", info.swapchain);
                    return vec![PresentResult::Failed; options.swapchain_infos.len()];
                }
            }
        }
        let image_indices: Vec<u32> = options.swapchain_infos.iter().map(|info| info.image_index).collect();
        let wait_semaphores = match rm.native_semaphores(&options.wait_semaphores) {
            Ok(semaphores) => semaphores,
            Err(e) => {
                log::error!("Present failed: {}", e);
                return vec![PresentResult::Failed; options.swapchain_infos.len()];
            }
        };
        let mut results = vec![vk::Result::SUCCESS; swapchains.len()];

        let present_info = vk::PresentInfoKHR::builder()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices)
            .results(&mut results);

        let overall = unsafe {
            self.context
                .swapchain_loader
                .queue_present(self.queue, &present_info)
        };

        results
            .iter()
            .map(|&result| match (result, overall) {
                (vk::Result::SUCCESS, Ok(false)) => PresentResult::Success,
                (vk::Result::SUCCESS, Ok(true)) => PresentResult::Suboptimal,
                (vk::Result::SUCCESS, Err(e)) => present_result(e),
                (other, _) => present_result(other),
            })
            .collect()
    }

    fn wait_until_idle(&mut self) -> Result<()> {
        unsafe { self.context.device.queue_wait_idle(self.queue) }.map_err(GpuError::from_vk)
    }
}

fn present_result(result: vk::Result) -> PresentResult {
    match result {
        vk::Result::SUCCESS => PresentResult::Success,
        vk::Result::SUBOPTIMAL_KHR => PresentResult::Suboptimal,
        vk::Result::ERROR_OUT_OF_DATE_KHR => PresentResult::OutOfDate,
        vk::Result::ERROR_SURFACE_LOST_KHR => PresentResult::SurfaceLost,
        vk::Result::ERROR_DEVICE_LOST => PresentResult::DeviceLost,
        _ => PresentResult::Failed,
    }
}
