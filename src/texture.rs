// Texture - images used as render targets, sampled or storage resources

use crate::device::Device;
use crate::gpu_core::{
    Extent3D, Format, MemoryUsage, SampleCount, TextureLayout, TextureType, TextureUsageFlags,
};
use crate::texture_view::{TextureView, TextureViewOptions};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureOptions {
    pub texture_type: TextureType,
    pub format: Format,
    pub extent: Extent3D,
    pub mip_levels: u32,
    pub array_layers: u32,
    pub samples: SampleCount,
    pub usage: TextureUsageFlags,
    pub memory_usage: MemoryUsage,
    pub initial_layout: TextureLayout,
}

impl Default for TextureOptions {
    fn default() -> Self {
        Self {
            texture_type: TextureType::TextureType2D,
            format: Format::R8G8B8A8Unorm,
            extent: Extent3D::default(),
            mip_levels: 1,
            array_layers: 1,
            samples: SampleCount::Samples1,
            usage: TextureUsageFlags::SAMPLED,
            memory_usage: MemoryUsage::GpuOnly,
            initial_layout: TextureLayout::Undefined,
        }
    }
}

gpu_resource!(
    Texture, parent: Device => device_handle, delete: delete_texture
);

impl Texture {
    pub fn create_view(&self, options: &TextureViewOptions) -> TextureView {
        match &self.api {
            Some(api) => TextureView::from_parts(
                api,
                self.parent,
                api.resource_manager()
                    .create_texture_view(self.parent, self.handle, options),
            ),
            None => TextureView::default(),
        }
    }

    pub fn format(&self) -> Format {
        self.resource_manager()
            .and_then(|rm| rm.get_texture(self.handle))
            .map(|texture| texture.format())
            .unwrap_or_default()
    }

    pub fn extent(&self) -> Extent3D {
        self.resource_manager()
            .and_then(|rm| rm.get_texture(self.handle))
            .map(|texture| texture.extent())
            .unwrap_or_default()
    }
}
