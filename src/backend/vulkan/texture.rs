// Images, image views and samplers

use ash::vk;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};
use std::sync::Arc;

use super::conversions;
use super::device::DeviceContext;
use crate::api::{ApiSampler, ApiTexture, ApiTextureView};
use crate::device::Device;
use crate::error::Result;
use crate::gpu_core::{Extent3D, Format, TextureUsageFlags};
use crate::handle::Handle;
use crate::sampler::SamplerOptions;
use crate::texture::{Texture, TextureOptions};
use crate::texture_view::{TextureSubresourceRange, TextureViewOptions, REMAINING_ARRAY_LAYERS, REMAINING_MIP_LEVELS};

pub(super) struct VulkanTexture {
    pub(super) device: Handle<Device>,
    pub(super) context: Arc<DeviceContext>,
    pub(super) image: vk::Image,
    pub(super) allocation: Option<Allocation>,
    pub(super) options: TextureOptions,
    /// Swapchain images belong to the presentation engine
    pub(super) owns_image: bool,
}

impl VulkanTexture {
    pub(super) fn new(device: Handle<Device>, context: &Arc<DeviceContext>, options: &TextureOptions) -> Result<Self> {
        let image_info = vk::ImageCreateInfo::builder()
            .image_type(conversions::image_type(options.texture_type))
            .extent(conversions::extent_3d(options.extent))
            .mip_levels(options.mip_levels)
            .array_layers(options.array_layers)
            .format(conversions::format(options.format))
            .tiling(vk::ImageTiling::OPTIMAL)
            .initial_layout(vk::ImageLayout::UNDEFINED)
            .usage(conversions::texture_usage(options.usage))
            .samples(conversions::samples(options.samples))
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        let image = unsafe { context.device.create_image(&image_info, None) }?;

        // Allocate memory
        let requirements = unsafe { context.device.get_image_memory_requirements(image) };
        let allocation = context.allocate(&AllocationCreateDesc {
            name: "texture",
            requirements,
            location: conversions::memory_location(options.memory_usage),
            linear: false,
            allocation_scheme: AllocationScheme::GpuAllocatorManaged,
        });
        let allocation = match allocation {
            Ok(allocation) => allocation,
            Err(e) => {
                unsafe { context.device.destroy_image(image, None) };
                return Err(e);
            }
        };

        if let Err(e) = unsafe {
            context
                .device
                .bind_image_memory(image, allocation.memory(), allocation.offset())
        } {
            context.free(allocation);
            unsafe { context.device.destroy_image(image, None) };
            return Err(e.into());
        }

        Ok(Self {
            device,
            context: context.clone(),
            image,
            allocation: Some(allocation),
            options: *options,
            owns_image: true,
        })
    }
}

impl ApiTexture for VulkanTexture {
    fn format(&self) -> Format {
        self.options.format
    }

    fn extent(&self) -> Extent3D {
        self.options.extent
    }

    fn usage(&self) -> TextureUsageFlags {
        self.options.usage
    }
}

impl Drop for VulkanTexture {
    fn drop(&mut self) {
        if !self.owns_image {
            return;
        }
        if let Some(allocation) = self.allocation.take() {
            self.context.free(allocation);
        }
        unsafe { self.context.device.destroy_image(self.image, None) };
    }
}

/// Vulkan wants explicit counts where the frontend allows "the rest"
pub(super) fn subresource_range(range: &TextureSubresourceRange, format: Format) -> vk::ImageSubresourceRange {
    vk::ImageSubresourceRange {
        aspect_mask: conversions::aspect(range.resolve_aspect(format)),
        base_mip_level: range.base_mip_level,
        level_count: match range.level_count {
            REMAINING_MIP_LEVELS => vk::REMAINING_MIP_LEVELS,
            n => n,
        },
        base_array_layer: range.base_array_layer,
        layer_count: match range.layer_count {
            REMAINING_ARRAY_LAYERS => vk::REMAINING_ARRAY_LAYERS,
            n => n,
        },
    }
}

pub(super) struct VulkanTextureView {
    pub(super) device: Handle<Device>,
    pub(super) context: Arc<DeviceContext>,
    pub(super) view: vk::ImageView,
    pub(super) texture: Handle<Texture>,
    /// Copied from the texture for layout transitions during passes
    pub(super) image: vk::Image,
    pub(super) format: Format,
    pub(super) range: vk::ImageSubresourceRange,
    /// Size of the base mip level of the view
    pub(super) extent: vk::Extent2D,
}

impl VulkanTextureView {
    pub(super) fn new(
        device: Handle<Device>,
        texture_handle: Handle<Texture>,
        texture: &VulkanTexture,
        options: &TextureViewOptions,
    ) -> Result<Self> {
        let format = match options.format {
            Format::Undefined => texture.options.format,
            format => format,
        };
        let range = subresource_range(&options.range, format);

        let view_info = vk::ImageViewCreateInfo::builder()
            .image(texture.image)
            .view_type(conversions::view_type(options.view_type))
            .format(conversions::format(format))
            .components(vk::ComponentMapping {
                r: vk::ComponentSwizzle::IDENTITY,
                g: vk::ComponentSwizzle::IDENTITY,
                b: vk::ComponentSwizzle::IDENTITY,
                a: vk::ComponentSwizzle::IDENTITY,
            })
            .subresource_range(range);

        let view = unsafe { texture.context.device.create_image_view(&view_info, None) }?;

        let mip = options.range.base_mip_level.min(31);
        let extent = vk::Extent2D {
            width: (texture.options.extent.width >> mip).max(1),
            height: (texture.options.extent.height >> mip).max(1),
        };

        Ok(Self {
            device,
            context: texture.context.clone(),
            view,
            texture: texture_handle,
            image: texture.image,
            format,
            range,
            extent,
        })
    }
}

impl ApiTextureView for VulkanTextureView {
    fn texture(&self) -> Handle<Texture> {
        self.texture
    }
}

impl Drop for VulkanTextureView {
    fn drop(&mut self) {
        unsafe { self.context.device.destroy_image_view(self.view, None) };
    }
}

pub(super) struct VulkanSampler {
    pub(super) device: Handle<Device>,
    pub(super) context: Arc<DeviceContext>,
    pub(super) sampler: vk::Sampler,
}

impl VulkanSampler {
    pub(super) fn new(device: Handle<Device>, context: &Arc<DeviceContext>, options: &SamplerOptions) -> Result<Self> {
        let sampler_info = vk::SamplerCreateInfo::builder()
            .mag_filter(conversions::filter(options.mag_filter))
            .min_filter(conversions::filter(options.min_filter))
            .mipmap_mode(conversions::mipmap_mode(options.mipmap_filter))
            .address_mode_u(conversions::address_mode(options.u))
            .address_mode_v(conversions::address_mode(options.v))
            .address_mode_w(conversions::address_mode(options.w))
            .anisotropy_enable(options.anisotropy_enabled)
            .max_anisotropy(options.max_anisotropy)
            .compare_enable(options.compare.is_some())
            .compare_op(conversions::compare_op(options.compare.unwrap_or_default()))
            .min_lod(options.lod_min_clamp)
            .max_lod(options.lod_max_clamp)
            .border_color(vk::BorderColor::FLOAT_OPAQUE_BLACK);

        let sampler = unsafe { context.device.create_sampler(&sampler_info, None) }?;
        Ok(Self {
            device,
            context: context.clone(),
            sampler,
        })
    }
}

impl ApiSampler for VulkanSampler {}

impl Drop for VulkanSampler {
    fn drop(&mut self) {
        unsafe { self.context.device.destroy_sampler(self.sampler, None) };
    }
}
