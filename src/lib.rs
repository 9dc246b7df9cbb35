// rhi - handle-based, backend-agnostic GPU API
//
// Application code talks to RAII wrappers (Device, Buffer, Swapchain, ...).
// Each wrapper holds a generational Handle and the active backend; every call
// is forwarded to that backend's ResourceManager, which owns the native
// objects. Backends: Vulkan (ash + gpu-allocator) and a headless Null model.

#[macro_use]
mod macros;

pub mod adapter;
pub mod api;
pub mod backend;
pub mod bind_group;
pub mod bind_group_layout;
pub mod buffer;
pub mod command_recorder;
pub mod compute_pass;
pub mod config;
pub mod device;
pub mod error;
pub mod frame;
pub mod gpu_core;
pub mod handle;
pub mod instance;
pub mod pipeline;
pub mod pipeline_layout;
pub mod queue;
pub mod render_pass;
pub mod sampler;
pub mod shader_module;
pub mod swapchain;
pub mod sync;
pub mod texture;
pub mod texture_view;
pub mod util;

pub use adapter::{
    Adapter, AdapterFeatures, AdapterLimits, AdapterProperties, AdapterQueueType, AdapterSwapchainProperties,
    SurfaceCapabilities, SurfaceFormat,
};
pub use api::{BackendType, GraphicsApi, GraphicsApiExt, ResourceManager};
pub use backend::create_graphics_api;
pub use bind_group::{BindGroup, BindGroupEntry, BindGroupOptions, BindingResource};
pub use bind_group_layout::{BindGroupLayout, BindGroupLayoutOptions, ResourceBindingLayout};
pub use buffer::{Buffer, BufferOptions};
pub use command_recorder::{
    BufferCopy, BufferMemoryBarrier, BufferTextureCopy, BufferTextureCopyRegion, CommandBuffer, CommandRecorder,
    CommandRecorderOptions, TextureMemoryBarrier, TextureSubresourceLayers,
};
pub use compute_pass::{ComputeCommand, ComputePassCommandRecorder};
pub use device::{Device, DeviceOptions, QueueDescription, QueueRequest};
pub use error::{GpuError, Result};
pub use frame::{FrameLoop, FrameLoopOptions, FrameOutcome, FrameTarget, MAX_FRAMES_IN_FLIGHT};
pub use gpu_core::*;
pub use handle::{Handle, Pool};
pub use instance::{AdapterAndDevice, Extension, Instance, InstanceOptions, Surface, SurfaceOptions};
pub use pipeline::{
    ComputePipeline, ComputePipelineOptions, DepthStencilOptions, GraphicsPipeline, GraphicsPipelineOptions,
    PrimitiveOptions, RenderTargetOptions, ShaderStage, VertexAttribute, VertexBufferLayout, VertexOptions,
};
pub use pipeline_layout::{PipelineLayout, PipelineLayoutOptions, PushConstantRange};
pub use queue::{
    BufferUploadOptions, PresentOptions, PresentSwapchainInfo, Queue, SubmitOptions, TextureUploadOptions,
    UploadStagingBuffer,
};
pub use render_pass::{
    ColorAttachment, DepthStencilAttachment, DrawCommand, DrawIndexedCommand, RenderPassCommandRecorder,
    RenderPassCommandRecorderOptions,
};
pub use sampler::{Sampler, SamplerOptions};
pub use shader_module::ShaderModule;
pub use swapchain::{Swapchain, SwapchainOptions};
pub use sync::{Fence, FenceOptions, GpuSemaphore, GpuSemaphoreOptions};
pub use texture::{Texture, TextureOptions};
pub use texture_view::{TextureSubresourceRange, TextureView, TextureViewOptions};
