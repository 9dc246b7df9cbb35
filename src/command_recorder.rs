// Command recording
//
// A CommandRecorder is single use: record transfer commands and passes into
// it, then `finish()` it into an immutable CommandBuffer for submission.
// Passes borrow the recorder mutably, so nothing else can be recorded while
// a pass is open.

use std::sync::Arc;

use crate::api::{ApiCommandRecorder, GraphicsApi};
use crate::buffer::Buffer;
use crate::compute_pass::ComputePassCommandRecorder;
use crate::device::Device;
use crate::gpu_core::{AccessFlags, DeviceSize, Extent3D, Offset3D, PipelineStageFlags, TextureAspectFlags, TextureLayout};
use crate::handle::Handle;
use crate::queue::Queue;
use crate::render_pass::{RenderPassCommandRecorder, RenderPassCommandRecorderOptions};
use crate::texture::Texture;
use crate::texture_view::TextureSubresourceRange;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommandRecorderOptions {
    /// Queue the commands will be submitted to; invalid means the device's
    /// first queue
    pub queue: Handle<Queue>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferCopy {
    pub src: Handle<Buffer>,
    pub src_offset: DeviceSize,
    pub dst: Handle<Buffer>,
    pub dst_offset: DeviceSize,
    pub byte_size: DeviceSize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureSubresourceLayers {
    pub aspect_mask: TextureAspectFlags,
    pub mip_level: u32,
    pub base_array_layer: u32,
    pub layer_count: u32,
}

impl Default for TextureSubresourceLayers {
    fn default() -> Self {
        Self {
            aspect_mask: TextureAspectFlags::COLOR,
            mip_level: 0,
            base_array_layer: 0,
            layer_count: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BufferTextureCopyRegion {
    pub buffer_offset: DeviceSize,
    /// Texels per row in the buffer, 0 for tightly packed
    pub buffer_row_length: u32,
    pub buffer_texture_height: u32,
    pub texture_sub_resource: TextureSubresourceLayers,
    pub texture_offset: Offset3D,
    pub texture_extent: Extent3D,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferTextureCopy {
    pub src_buffer: Handle<Buffer>,
    pub dst_texture: Handle<Texture>,
    pub dst_texture_layout: TextureLayout,
    pub regions: Vec<BufferTextureCopyRegion>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureMemoryBarrier {
    pub src_stages: PipelineStageFlags,
    pub src_mask: AccessFlags,
    pub dst_stages: PipelineStageFlags,
    pub dst_mask: AccessFlags,
    pub old_layout: TextureLayout,
    pub new_layout: TextureLayout,
    pub texture: Handle<Texture>,
    pub range: TextureSubresourceRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferMemoryBarrier {
    pub src_stages: PipelineStageFlags,
    pub src_mask: AccessFlags,
    pub dst_stages: PipelineStageFlags,
    pub dst_mask: AccessFlags,
    pub buffer: Handle<Buffer>,
    pub offset: DeviceSize,
    pub size: DeviceSize,
}

gpu_resource!(
    /// Finished, immutable command stream. Keep it alive until the GPU has
    /// executed it (see the fence of the submission).
    CommandBuffer, parent: Device => device_handle, delete: delete_command_buffer
);

pub struct CommandRecorder {
    api: Option<Arc<dyn GraphicsApi>>,
    device: Handle<Device>,
    handle: Handle<CommandRecorder>,
}

impl CommandRecorder {
    pub(crate) fn new(api: &Arc<dyn GraphicsApi>, device: Handle<Device>, options: &CommandRecorderOptions) -> Self {
        Self {
            api: Some(api.clone()),
            device,
            handle: api.resource_manager().create_command_recorder(device, options),
        }
    }

    pub fn handle(&self) -> Handle<CommandRecorder> {
        self.handle
    }

    pub fn is_valid(&self) -> bool {
        self.handle.is_valid()
    }

    pub fn begin_render_pass(&mut self, options: &RenderPassCommandRecorderOptions) -> RenderPassCommandRecorder<'_> {
        let handle = self
            .with_recorder(|recorder| recorder.begin_render_pass(options))
            .unwrap_or_default();
        RenderPassCommandRecorder::new(self.api.clone(), handle)
    }

    pub fn begin_compute_pass(&mut self) -> ComputePassCommandRecorder<'_> {
        let handle = self
            .with_recorder(|recorder| recorder.begin_compute_pass())
            .unwrap_or_default();
        ComputePassCommandRecorder::new(self.api.clone(), handle)
    }

    pub fn copy_buffer(&mut self, copy: &BufferCopy) {
        self.with_recorder(|recorder| recorder.copy_buffer(copy));
    }

    pub fn copy_buffer_to_texture(&mut self, copy: &BufferTextureCopy) {
        self.with_recorder(|recorder| recorder.copy_buffer_to_texture(copy));
    }

    pub fn texture_memory_barrier(&mut self, barrier: &TextureMemoryBarrier) {
        self.with_recorder(|recorder| recorder.texture_memory_barrier(barrier));
    }

    pub fn buffer_memory_barrier(&mut self, barrier: &BufferMemoryBarrier) {
        self.with_recorder(|recorder| recorder.buffer_memory_barrier(barrier));
    }

    /// End recording and hand the commands over to a CommandBuffer
    pub fn finish(self) -> CommandBuffer {
        let Some(api) = self.api.clone() else {
            return CommandBuffer::default();
        };
        let handle = api
            .resource_manager()
            .get_command_recorder(self.handle)
            .map(|mut recorder| recorder.finish())
            .unwrap_or_default();
        CommandBuffer::from_parts(&api, self.device, handle)
    }

    fn with_recorder<R>(&mut self, f: impl FnOnce(&mut dyn ApiCommandRecorder) -> R) -> Option<R> {
        let api = self.api.as_ref()?;
        let Some(mut recorder) = api.resource_manager().get_command_recorder(self.handle) else {
            log::warn!("Recording into an invalid command recorder");
            return None;
        };
        Some(f(&mut *recorder))
    }
}

impl Default for CommandRecorder {
    fn default() -> Self {
        Self {
            api: None,
            device: Handle::default(),
            handle: Handle::default(),
        }
    }
}

impl Drop for CommandRecorder {
    fn drop(&mut self) {
        if let (Some(api), true) = (&self.api, self.handle.is_valid()) {
            api.resource_manager().delete_command_recorder(self.handle);
        }
    }
}

impl PartialEq for CommandRecorder {
    fn eq(&self, other: &Self) -> bool {
        crate::api::same_api(&self.api, &other.api) && self.device == other.device && self.handle == other.handle
    }
}

impl std::fmt::Debug for CommandRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandRecorder")
            .field("device", &self.device)
            .field("handle", &self.handle)
            .finish()
    }
}
