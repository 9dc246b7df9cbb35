use crate::bind_group_layout::BindGroupLayout;
use crate::device::Device;
use crate::gpu_core::ShaderStageFlags;
use crate::handle::Handle;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PushConstantRange {
    pub offset: u32,
    pub size: u32,
    pub shader_stages: ShaderStageFlags,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineLayoutOptions {
    /// Set `i` of the pipeline uses `bind_group_layouts[i]`
    pub bind_group_layouts: Vec<Handle<BindGroupLayout>>,
    pub push_constant_ranges: Vec<PushConstantRange>,
}

gpu_resource!(
    PipelineLayout, parent: Device => device_handle, delete: delete_pipeline_layout
);
