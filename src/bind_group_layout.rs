// Bind group layout - the shape of a set of shader resource bindings

use crate::device::Device;
use crate::gpu_core::{ResourceBindingType, ShaderStageFlags};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceBindingLayout {
    pub binding: u32,
    pub count: u32,
    pub resource_type: ResourceBindingType,
    pub shader_stages: ShaderStageFlags,
}

impl ResourceBindingLayout {
    pub fn new(binding: u32, resource_type: ResourceBindingType, shader_stages: ShaderStageFlags) -> Self {
        Self {
            binding,
            count: 1,
            resource_type,
            shader_stages,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindGroupLayoutOptions {
    pub bindings: Vec<ResourceBindingLayout>,
}

gpu_resource!(
    BindGroupLayout, parent: Device => device_handle, delete: delete_bind_group_layout
);

impl BindGroupLayout {
    pub fn bindings(&self) -> Vec<ResourceBindingLayout> {
        self.resource_manager()
            .and_then(|rm| rm.get_bind_group_layout(self.handle))
            .map(|layout| layout.bindings().to_vec())
            .unwrap_or_default()
    }
}
