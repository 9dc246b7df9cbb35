// Shader modules, layouts and pipelines
//
// Graphics pipelines target dynamic rendering: attachment formats come from
// the pipeline options instead of a render pass object, and viewport and
// scissor are dynamic state.

use ash::vk;
use std::ffi::CString;
use std::sync::Arc;

use super::conversions;
use super::device::DeviceContext;
use crate::api::{ApiComputePipeline, ApiGraphicsPipeline, ApiPipelineLayout, ApiShaderModule};
use crate::device::Device;
use crate::error::{GpuError, Result};
use crate::gpu_core::Format;
use crate::handle::Handle;
use crate::pipeline::{GraphicsPipelineOptions, ShaderStage};
use crate::pipeline_layout::{PipelineLayout, PipelineLayoutOptions, PushConstantRange};

pub(super) struct VulkanShaderModule {
    pub(super) device: Handle<Device>,
    pub(super) context: Arc<DeviceContext>,
    pub(super) module: vk::ShaderModule,
}

impl VulkanShaderModule {
    pub(super) fn new(device: Handle<Device>, context: &Arc<DeviceContext>, code: &[u32]) -> Result<Self> {
        let create_info = vk::ShaderModuleCreateInfo::builder().code(code);
        let module = unsafe { context.device.create_shader_module(&create_info, None) }?;
        Ok(Self {
            device,
            context: context.clone(),
            module,
        })
    }
}

impl ApiShaderModule for VulkanShaderModule {}

impl Drop for VulkanShaderModule {
    fn drop(&mut self) {
        unsafe { self.context.device.destroy_shader_module(self.module, None) };
    }
}

pub(super) struct VulkanPipelineLayout {
    pub(super) device: Handle<Device>,
    pub(super) context: Arc<DeviceContext>,
    pub(super) layout: vk::PipelineLayout,
    push_constant_ranges: Vec<PushConstantRange>,
}

impl VulkanPipelineLayout {
    pub(super) fn new(
        device: Handle<Device>,
        context: &Arc<DeviceContext>,
        set_layouts: &[vk::DescriptorSetLayout],
        options: &PipelineLayoutOptions,
    ) -> Result<Self> {
        let push_constant_ranges: Vec<vk::PushConstantRange> = options
            .push_constant_ranges
            .iter()
            .map(|range| {
                vk::PushConstantRange::builder()
                    .stage_flags(conversions::shader_stages(range.shader_stages))
                    .offset(range.offset)
                    .size(range.size)
                    .build()
            })
            .collect();

        let layout_info = vk::PipelineLayoutCreateInfo::builder()
            .set_layouts(set_layouts)
            .push_constant_ranges(&push_constant_ranges);

        let layout = unsafe { context.device.create_pipeline_layout(&layout_info, None) }?;
        Ok(Self {
            device,
            context: context.clone(),
            layout,
            push_constant_ranges: options.push_constant_ranges.clone(),
        })
    }
}

impl ApiPipelineLayout for VulkanPipelineLayout {
    fn push_constant_ranges(&self) -> &[PushConstantRange] {
        &self.push_constant_ranges
    }
}

impl Drop for VulkanPipelineLayout {
    fn drop(&mut self) {
        unsafe { self.context.device.destroy_pipeline_layout(self.layout, None) };
    }
}

/// Native pieces a pipeline is assembled from, resolved by the resource manager
pub(super) struct PipelineInputs {
    pub(super) layout: vk::PipelineLayout,
    /// One module per shader stage, in stage order
    pub(super) modules: Vec<vk::ShaderModule>,
}

fn shader_stage_infos(
    stages: &[ShaderStage],
    modules: &[vk::ShaderModule],
    entry_points: &[CString],
) -> Vec<vk::PipelineShaderStageCreateInfo> {
    stages
        .iter()
        .zip(modules)
        .zip(entry_points)
        .map(|((stage, module), entry_point)| {
            vk::PipelineShaderStageCreateInfo::builder()
                .stage(conversions::shader_stages(stage.stage))
                .module(*module)
                .name(entry_point)
                .build()
        })
        .collect()
}

fn entry_points(stages: &[ShaderStage]) -> Result<Vec<CString>> {
    stages
        .iter()
        .map(|stage| {
            CString::new(stage.entry_point.as_str())
                .map_err(|_| GpuError::Vulkan(vk::Result::ERROR_INITIALIZATION_FAILED))
        })
        .collect()
}

pub(super) struct VulkanGraphicsPipeline {
    pub(super) device: Handle<Device>,
    pub(super) context: Arc<DeviceContext>,
    pub(super) pipeline: vk::Pipeline,
    pub(super) native_layout: vk::PipelineLayout,
    pub(super) layout: Handle<PipelineLayout>,
}

impl VulkanGraphicsPipeline {
    pub(super) fn new(
        device: Handle<Device>,
        context: &Arc<DeviceContext>,
        inputs: &PipelineInputs,
        options: &GraphicsPipelineOptions,
    ) -> Result<Self> {
        // Shader stages
        let entry_points = entry_points(&options.shader_stages)?;
        let stages = shader_stage_infos(&options.shader_stages, &inputs.modules, &entry_points);

        // Vertex input
        let bindings: Vec<vk::VertexInputBindingDescription> = options
            .vertex
            .buffers
            .iter()
            .map(|buffer| {
                vk::VertexInputBindingDescription::builder()
                    .binding(buffer.binding)
                    .stride(buffer.stride)
                    .input_rate(conversions::vertex_rate(buffer.input_rate))
                    .build()
            })
            .collect();
        let attributes: Vec<vk::VertexInputAttributeDescription> = options
            .vertex
            .attributes
            .iter()
            .map(|attribute| {
                vk::VertexInputAttributeDescription::builder()
                    .location(attribute.location)
                    .binding(attribute.binding)
                    .format(conversions::format(attribute.format))
                    .offset(attribute.offset)
                    .build()
            })
            .collect();
        let vertex_input_info = vk::PipelineVertexInputStateCreateInfo::builder()
            .vertex_binding_descriptions(&bindings)
            .vertex_attribute_descriptions(&attributes);

        // Input assembly
        let input_assembly = vk::PipelineInputAssemblyStateCreateInfo::builder()
            .topology(conversions::topology(options.primitive.topology))
            .primitive_restart_enable(false);

        // Viewport and scissor are set while recording
        let viewport_state = vk::PipelineViewportStateCreateInfo::builder()
            .viewport_count(1)
            .scissor_count(1);
        let dynamic_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
        let dynamic_state = vk::PipelineDynamicStateCreateInfo::builder().dynamic_states(&dynamic_states);

        // Rasterization
        let rasterizer = vk::PipelineRasterizationStateCreateInfo::builder()
            .depth_clamp_enable(false)
            .rasterizer_discard_enable(false)
            .polygon_mode(conversions::polygon_mode(options.primitive.polygon_mode))
            .line_width(options.primitive.line_width)
            .cull_mode(conversions::cull_mode(options.primitive.cull_mode))
            .front_face(conversions::front_face(options.primitive.front_face))
            .depth_bias_enable(false);

        let multisampling = vk::PipelineMultisampleStateCreateInfo::builder()
            .sample_shading_enable(false)
            .rasterization_samples(conversions::samples(options.samples));

        let depth_stencil = match &options.depth_stencil {
            Some(depth) => vk::PipelineDepthStencilStateCreateInfo::builder()
                .depth_test_enable(depth.depth_test_enabled)
                .depth_write_enable(depth.depth_writes_enabled)
                .depth_compare_op(conversions::compare_op(depth.depth_compare_operation))
                .depth_bounds_test_enable(false)
                .stencil_test_enable(false),
            None => vk::PipelineDepthStencilStateCreateInfo::builder(),
        };

        // Color blending, "source over" when enabled
        let color_blend_attachments: Vec<vk::PipelineColorBlendAttachmentState> = options
            .render_targets
            .iter()
            .map(|target| {
                vk::PipelineColorBlendAttachmentState::builder()
                    .color_write_mask(vk::ColorComponentFlags::RGBA)
                    .blend_enable(target.blending_enabled)
                    .src_color_blend_factor(vk::BlendFactor::SRC_ALPHA)
                    .dst_color_blend_factor(vk::BlendFactor::ONE_MINUS_SRC_ALPHA)
                    .color_blend_op(vk::BlendOp::ADD)
                    .src_alpha_blend_factor(vk::BlendFactor::ONE)
                    .dst_alpha_blend_factor(vk::BlendFactor::ONE_MINUS_SRC_ALPHA)
                    .alpha_blend_op(vk::BlendOp::ADD)
                    .build()
            })
            .collect();
        let color_blending = vk::PipelineColorBlendStateCreateInfo::builder()
            .logic_op_enable(false)
            .attachments(&color_blend_attachments);

        // Attachment formats for dynamic rendering
        let color_formats: Vec<vk::Format> = options
            .render_targets
            .iter()
            .map(|target| conversions::format(target.format))
            .collect();
        let depth_format = options
            .depth_stencil
            .as_ref()
            .map(|depth| depth.format)
            .unwrap_or(Format::Undefined);
        let stencil_format = if depth_format.has_stencil() {
            depth_format
        } else {
            Format::Undefined
        };
        let mut rendering_info = vk::PipelineRenderingCreateInfo::builder()
            .color_attachment_formats(&color_formats)
            .depth_attachment_format(conversions::format(depth_format))
            .stencil_attachment_format(conversions::format(stencil_format));

        let pipeline_info = vk::GraphicsPipelineCreateInfo::builder()
            .stages(&stages)
            .vertex_input_state(&vertex_input_info)
            .input_assembly_state(&input_assembly)
            .viewport_state(&viewport_state)
            .rasterization_state(&rasterizer)
            .multisample_state(&multisampling)
            .depth_stencil_state(&depth_stencil)
            .color_blend_state(&color_blending)
            .dynamic_state(&dynamic_state)
            .layout(inputs.layout)
            .push_next(&mut rendering_info)
            .build();

        let pipelines = unsafe {
            context
                .device
                .create_graphics_pipelines(vk::PipelineCache::null(), &[pipeline_info], None)
        }
        .map_err(|(_, e)| GpuError::Vulkan(e))?;
        let pipeline = pipelines
            .first()
            .copied()
            .ok_or(GpuError::Vulkan(vk::Result::ERROR_UNKNOWN))?;

        Ok(Self {
            device,
            context: context.clone(),
            pipeline,
            native_layout: inputs.layout,
            layout: options.layout,
        })
    }
}

impl ApiGraphicsPipeline for VulkanGraphicsPipeline {
    fn layout(&self) -> Handle<PipelineLayout> {
        self.layout
    }
}

impl Drop for VulkanGraphicsPipeline {
    fn drop(&mut self) {
        unsafe { self.context.device.destroy_pipeline(self.pipeline, None) };
    }
}

pub(super) struct VulkanComputePipeline {
    pub(super) device: Handle<Device>,
    pub(super) context: Arc<DeviceContext>,
    pub(super) pipeline: vk::Pipeline,
    pub(super) native_layout: vk::PipelineLayout,
    pub(super) layout: Handle<PipelineLayout>,
}

impl VulkanComputePipeline {
    pub(super) fn new(
        device: Handle<Device>,
        context: &Arc<DeviceContext>,
        inputs: &PipelineInputs,
        layout: Handle<PipelineLayout>,
        stage: &ShaderStage,
    ) -> Result<Self> {
        let entry_points = entry_points(std::slice::from_ref(stage))?;
        let stages = shader_stage_infos(std::slice::from_ref(stage), &inputs.modules, &entry_points);
        let stage_info = stages
            .first()
            .copied()
            .ok_or(GpuError::InvalidHandle("shader module"))?;

        let pipeline_info = vk::ComputePipelineCreateInfo::builder()
            .stage(stage_info)
            .layout(inputs.layout)
            .build();

        let pipelines = unsafe {
            context
                .device
                .create_compute_pipelines(vk::PipelineCache::null(), &[pipeline_info], None)
        }
        .map_err(|(_, e)| GpuError::Vulkan(e))?;
        let pipeline = pipelines
            .first()
            .copied()
            .ok_or(GpuError::Vulkan(vk::Result::ERROR_UNKNOWN))?;

        Ok(Self {
            device,
            context: context.clone(),
            pipeline,
            native_layout: inputs.layout,
            layout,
        })
    }
}

impl ApiComputePipeline for VulkanComputePipeline {
    fn layout(&self) -> Handle<PipelineLayout> {
        self.layout
    }
}

impl Drop for VulkanComputePipeline {
    fn drop(&mut self) {
        unsafe { self.context.device.destroy_pipeline(self.pipeline, None) };
    }
}
