// Graphics and compute pipelines
//
// Graphics pipelines target dynamic rendering: instead of a render pass
// object they declare the formats of the attachments they draw into.

use crate::device::Device;
use crate::gpu_core::{
    CompareOperation, CullMode, Format, FrontFace, PolygonMode, PrimitiveTopology, SampleCount,
    ShaderStageFlags, VertexRate,
};
use crate::handle::Handle;
use crate::pipeline_layout::PipelineLayout;
use crate::shader_module::ShaderModule;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderStage {
    pub shader_module: Handle<ShaderModule>,
    pub stage: ShaderStageFlags,
    pub entry_point: String,
}

impl ShaderStage {
    pub fn new(shader_module: Handle<ShaderModule>, stage: ShaderStageFlags) -> Self {
        Self {
            shader_module,
            stage,
            entry_point: "main".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexBufferLayout {
    pub binding: u32,
    pub stride: u32,
    pub input_rate: VertexRate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttribute {
    pub location: u32,
    pub binding: u32,
    pub format: Format,
    pub offset: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VertexOptions {
    pub buffers: Vec<VertexBufferLayout>,
    pub attributes: Vec<VertexAttribute>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderTargetOptions {
    pub format: Format,
    /// Standard "source over" alpha blending
    pub blending_enabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthStencilOptions {
    pub format: Format,
    pub depth_test_enabled: bool,
    pub depth_writes_enabled: bool,
    pub depth_compare_operation: CompareOperation,
}

impl Default for DepthStencilOptions {
    fn default() -> Self {
        Self {
            format: Format::Undefined,
            depth_test_enabled: true,
            depth_writes_enabled: true,
            depth_compare_operation: CompareOperation::Less,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrimitiveOptions {
    pub topology: PrimitiveTopology,
    pub cull_mode: CullMode,
    pub front_face: FrontFace,
    pub polygon_mode: PolygonMode,
    pub line_width: f32,
}

impl Default for PrimitiveOptions {
    fn default() -> Self {
        Self {
            topology: PrimitiveTopology::TriangleList,
            cull_mode: CullMode::Back,
            front_face: FrontFace::CounterClockwise,
            polygon_mode: PolygonMode::Fill,
            line_width: 1.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphicsPipelineOptions {
    pub shader_stages: Vec<ShaderStage>,
    pub layout: Handle<PipelineLayout>,
    pub vertex: VertexOptions,
    pub render_targets: Vec<RenderTargetOptions>,
    /// `None` for pipelines without a depth attachment
    pub depth_stencil: Option<DepthStencilOptions>,
    pub primitive: PrimitiveOptions,
    pub samples: SampleCount,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComputePipelineOptions {
    pub layout: Handle<PipelineLayout>,
    pub shader_stage: ShaderStage,
}

gpu_resource!(
    GraphicsPipeline, parent: Device => device_handle, delete: delete_graphics_pipeline
);

gpu_resource!(
    ComputePipeline, parent: Device => device_handle, delete: delete_compute_pipeline
);
