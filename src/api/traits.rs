// Capability contracts, one per resource kind. A backend object keeps its
// native handle plus whatever back-references it needs (owning device,
// a weak link to its resource manager) to service these calls.

use std::ptr::NonNull;

use crate::adapter::{Adapter, AdapterFeatures, AdapterProperties, AdapterQueueType, AdapterSwapchainProperties};
use crate::bind_group::{BindGroup, BindGroupEntry};
use crate::bind_group_layout::ResourceBindingLayout;
use crate::buffer::Buffer;
use crate::command_recorder::{
    BufferCopy, BufferMemoryBarrier, BufferTextureCopy, CommandBuffer, TextureMemoryBarrier,
};
use crate::compute_pass::{ComputeCommand, ComputePass};
use crate::device::QueueDescription;
use crate::error::Result;
use crate::gpu_core::{
    AcquireImageResult, DeviceSize, Extent3D, FenceStatus, Format, IndexType, PresentResult, Rect2D,
    TextureUsageFlags, Viewport,
};
use crate::handle::Handle;
use crate::instance::{Extension, Instance, Surface, SurfaceOptions};
use crate::pipeline::{ComputePipeline, GraphicsPipeline};
use crate::pipeline_layout::{PipelineLayout, PushConstantRange};
use crate::queue::{PresentOptions, SubmitOptions};
use crate::render_pass::{DrawCommand, DrawIndexedCommand, RenderPass, RenderPassCommandRecorderOptions};
use crate::sync::GpuSemaphore;
use crate::texture::Texture;

pub trait ApiInstance {
    fn extensions(&self) -> Vec<Extension>;

    /// Enumerate the adapters of `instance`. Repeated calls return the same
    /// handles.
    fn query_adapters(&mut self, instance: Handle<Instance>) -> Vec<Handle<Adapter>>;

    fn create_surface(&mut self, instance: Handle<Instance>, options: &SurfaceOptions) -> Handle<Surface>;
}

pub trait ApiAdapter {
    fn query_adapter_properties(&self) -> AdapterProperties;
    fn query_adapter_features(&self) -> AdapterFeatures;
    fn query_queue_types(&self) -> Vec<AdapterQueueType>;
    fn query_swapchain_properties(&self, surface: Handle<Surface>) -> AdapterSwapchainProperties;
    fn supports_presentation(&self, surface: Handle<Surface>, queue_type_index: u32) -> bool;
}

pub trait ApiSurface {}

pub trait ApiDevice {
    fn adapter(&self) -> Handle<Adapter>;
    fn queue_descriptions(&self) -> Vec<QueueDescription>;
    fn wait_until_idle(&self) -> Result<()>;
}

pub trait ApiQueue {
    fn submit(&mut self, options: &SubmitOptions) -> Result<()>;
    /// One result per presented swapchain, in order
    fn present(&mut self, options: &PresentOptions) -> Vec<PresentResult>;
    fn wait_until_idle(&mut self) -> Result<()>;
}

pub trait ApiSwapchain {
    /// Presentable textures, owned by the swapchain
    fn get_textures(&mut self) -> Vec<Handle<Texture>>;

    /// The index is only meaningful when the result has an image
    fn get_next_image_index(&mut self, semaphore: Handle<GpuSemaphore>) -> (AcquireImageResult, u32);
}

pub trait ApiTexture {
    fn format(&self) -> Format;
    fn extent(&self) -> Extent3D;
    fn usage(&self) -> TextureUsageFlags;
}

pub trait ApiTextureView {
    fn texture(&self) -> Handle<Texture>;
}

pub trait ApiBuffer {
    /// Host pointer to the buffer contents, `None` for device-only memory
    fn map(&mut self) -> Option<NonNull<u8>>;
    fn unmap(&mut self);
    fn size(&self) -> DeviceSize;
}

pub trait ApiSampler {}

pub trait ApiShaderModule {}

pub trait ApiPipelineLayout {
    fn push_constant_ranges(&self) -> &[PushConstantRange];
}

pub trait ApiBindGroupLayout {
    fn bindings(&self) -> &[ResourceBindingLayout];
}

pub trait ApiBindGroup {
    fn update(&mut self, entry: &BindGroupEntry);
}

pub trait ApiGraphicsPipeline {
    fn layout(&self) -> Handle<PipelineLayout>;
}

pub trait ApiComputePipeline {
    fn layout(&self) -> Handle<PipelineLayout>;
}

pub trait ApiGpuSemaphore {}

pub trait ApiFence {
    /// Block until signalled; `GpuError::Timeout` past the backend limit
    fn wait(&mut self) -> Result<()>;
    fn reset(&mut self);
    fn status(&mut self) -> FenceStatus;
}

pub trait ApiCommandRecorder {
    fn begin_render_pass(&mut self, options: &RenderPassCommandRecorderOptions) -> Handle<RenderPass>;
    fn begin_compute_pass(&mut self) -> Handle<ComputePass>;
    fn copy_buffer(&mut self, copy: &BufferCopy);
    fn copy_buffer_to_texture(&mut self, copy: &BufferTextureCopy);
    fn texture_memory_barrier(&mut self, barrier: &TextureMemoryBarrier);
    fn buffer_memory_barrier(&mut self, barrier: &BufferMemoryBarrier);
    /// End recording; the recorder accepts no further commands
    fn finish(&mut self) -> Handle<CommandBuffer>;
}

pub trait ApiRenderPassCommandRecorder {
    fn set_pipeline(&mut self, pipeline: Handle<GraphicsPipeline>);
    fn set_vertex_buffer(&mut self, index: u32, buffer: Handle<Buffer>, offset: DeviceSize);
    fn set_index_buffer(&mut self, buffer: Handle<Buffer>, offset: DeviceSize, index_type: IndexType);
    fn set_bind_group(&mut self, group: u32, bind_group: Handle<BindGroup>, dynamic_offsets: &[u32]);
    fn set_viewport(&mut self, viewport: &Viewport);
    fn set_scissor(&mut self, scissor: &Rect2D);
    fn draw(&mut self, draw: &DrawCommand);
    fn draw_indexed(&mut self, draw: &DrawIndexedCommand);
    fn push_constant(&mut self, range: &PushConstantRange, data: &[u8]);
    fn end(&mut self);
}

pub trait ApiComputePassCommandRecorder {
    fn set_pipeline(&mut self, pipeline: Handle<ComputePipeline>);
    fn set_bind_group(&mut self, group: u32, bind_group: Handle<BindGroup>, dynamic_offsets: &[u32]);
    fn dispatch(&mut self, command: &ComputeCommand);
    fn push_constant(&mut self, range: &PushConstantRange, data: &[u8]);
    fn end(&mut self);
}

pub trait ApiCommandBuffer {}
