// Texture view - how shaders and attachments see a texture

use crate::device::Device;
use crate::gpu_core::{Format, TextureAspectFlags, ViewType};
use crate::handle::Handle;
use crate::texture::Texture;

pub const REMAINING_MIP_LEVELS: u32 = u32::MAX;
pub const REMAINING_ARRAY_LAYERS: u32 = u32::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureSubresourceRange {
    /// Empty means "derive from the format"
    pub aspect_mask: TextureAspectFlags,
    pub base_mip_level: u32,
    pub level_count: u32,
    pub base_array_layer: u32,
    pub layer_count: u32,
}

impl TextureSubresourceRange {
    /// Every mip level and layer, aspect derived from the format
    pub fn whole() -> Self {
        Self {
            aspect_mask: TextureAspectFlags::empty(),
            base_mip_level: 0,
            level_count: REMAINING_MIP_LEVELS,
            base_array_layer: 0,
            layer_count: REMAINING_ARRAY_LAYERS,
        }
    }

    pub(crate) fn resolve_aspect(&self, format: Format) -> TextureAspectFlags {
        if self.aspect_mask.is_empty() {
            format.aspect()
        } else {
            self.aspect_mask
        }
    }
}

impl Default for TextureSubresourceRange {
    fn default() -> Self {
        Self {
            aspect_mask: TextureAspectFlags::empty(),
            base_mip_level: 0,
            level_count: 1,
            base_array_layer: 0,
            layer_count: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TextureViewOptions {
    pub view_type: ViewType,
    /// `Undefined` uses the texture's format
    pub format: Format,
    pub range: TextureSubresourceRange,
}

gpu_resource!(
    TextureView, parent: Device => device_handle, delete: delete_texture_view
);

impl TextureView {
    /// The texture this view was created from
    pub fn texture_handle(&self) -> Handle<Texture> {
        self.resource_manager()
            .and_then(|rm| rm.get_texture_view(self.handle))
            .map(|view| view.texture())
            .unwrap_or_default()
    }
}
