// Swapchain - Window presentation
//
// The presentable images are registered as textures that do not own their
// image; destroying the swapchain releases them.

use ash::vk;
use std::sync::{Arc, Weak};

use super::conversions;
use super::device::DeviceContext;
use super::resource_manager::VulkanResourceManager;
use crate::api::ApiSwapchain;
use crate::device::Device;
use crate::error::Result;
use crate::gpu_core::AcquireImageResult;
use crate::handle::Handle;
use crate::swapchain::SwapchainOptions;
use crate::sync::GpuSemaphore;
use crate::texture::Texture;

pub(super) struct VulkanSwapchain {
    pub(super) device: Handle<Device>,
    pub(super) context: Arc<DeviceContext>,
    pub(super) swapchain: vk::SwapchainKHR,
    pub(super) textures: Vec<Handle<Texture>>,
    pub(super) rm: Weak<VulkanResourceManager>,
}

/// Create the native swapchain and return it with its images
pub(super) fn create_swapchain(
    context: &DeviceContext,
    surface: vk::SurfaceKHR,
    old_swapchain: vk::SwapchainKHR,
    options: &SwapchainOptions,
) -> Result<(vk::SwapchainKHR, Vec<vk::Image>)> {
    // Query surface capabilities
    let surface_caps = unsafe {
        context
            .instance
            .surface_loader
            .get_physical_device_surface_capabilities(context.physical_device, surface)
    }?;

    // Clamp the image count to what the surface allows
    let mut image_count = options.min_image_count.max(surface_caps.min_image_count);
    if surface_caps.max_image_count > 0 && image_count > surface_caps.max_image_count {
        image_count = surface_caps.max_image_count;
    }

    let create_info = vk::SwapchainCreateInfoKHR::builder()
        .surface(surface)
        .min_image_count(image_count)
        .image_format(conversions::format(options.format))
        .image_color_space(conversions::color_space(options.color_space))
        .image_extent(conversions::extent_2d(options.image_extent))
        .image_array_layers(options.image_layers.max(1))
        .image_usage(conversions::texture_usage(options.image_usage))
        .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
        .pre_transform(surface_caps.current_transform)
        .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
        .present_mode(conversions::present_mode(options.present_mode))
        .clipped(options.clipped)
        .old_swapchain(old_swapchain);

    let loader = &context.swapchain_loader;
    let swapchain = unsafe { loader.create_swapchain(&create_info, None) }?;

    // Get swapchain images
    let images = match unsafe { loader.get_swapchain_images(swapchain) } {
        Ok(images) => images,
        Err(e) => {
            unsafe { loader.destroy_swapchain(swapchain, None) };
            return Err(e.into());
        }
    };

    log::info!(
        "Created swapchain {}x{} with {} images ({:?})",
        options.image_extent.width,
        options.image_extent.height,
        images.len(),
        options.present_mode
    );
    Ok((swapchain, images))
}

impl ApiSwapchain for VulkanSwapchain {
    fn get_textures(&mut self) -> Vec<Handle<Texture>> {
        self.textures.clone()
    }

    /// Acquire next image for rendering
    fn get_next_image_index(&mut self, semaphore: Handle<GpuSemaphore>) -> (AcquireImageResult, u32) {
        let Some(semaphore) = self.rm.upgrade().and_then(|rm| rm.native_semaphore(semaphore)) else {
            log::error!("Acquire with an invalid semaphore");
            return (AcquireImageResult::Failed, 0);
        };

        let result = unsafe {
            self.context
                .swapchain_loader
                .acquire_next_image(self.swapchain, u64::MAX, semaphore, vk::Fence::null())
        };

        match result {
            Ok((index, false)) => (AcquireImageResult::Success, index),
            Ok((index, true)) => (AcquireImageResult::Suboptimal, index),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => (AcquireImageResult::OutOfDate, 0),
            Err(vk::Result::NOT_READY) => (AcquireImageResult::NotReady, 0),
            Err(vk::Result::TIMEOUT) => (AcquireImageResult::Timeout, 0),
            Err(vk::Result::ERROR_SURFACE_LOST_KHR) => (AcquireImageResult::SurfaceLost, 0),
            Err(vk::Result::ERROR_DEVICE_LOST) => (AcquireImageResult::DeviceLost, 0),
            Err(e) => {
                log::error!("Failed to acquire swapchain image: {:?}", e);
                (AcquireImageResult::Failed, 0)
            }
        }
    }
}

impl Drop for VulkanSwapchain {
    fn drop(&mut self) {
        unsafe {
            self.context.swapchain_loader.destroy_swapchain(self.swapchain, None);
        }
    }
}
