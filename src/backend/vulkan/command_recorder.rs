// Command buffer recording
//
// A recorder owns one primary command buffer from the pool of its queue
// family, begun for one-time submission. Render passes use dynamic
// rendering: attachments go to their attachment layout when the pass begins
// and color attachments move to `final_layout` when it ends.

use ash::vk;
use std::sync::{Arc, Weak};

use super::conversions;
use super::device::DeviceContext;
use super::resource_manager::VulkanResourceManager;
use super::texture::subresource_range;
use crate::api::{
    ApiCommandBuffer, ApiCommandRecorder, ApiComputePassCommandRecorder, ApiRenderPassCommandRecorder,
};
use crate::bind_group::BindGroup;
use crate::buffer::Buffer;
use crate::command_recorder::{
    BufferCopy, BufferMemoryBarrier, BufferTextureCopy, CommandBuffer, TextureMemoryBarrier,
};
use crate::compute_pass::{ComputeCommand, ComputePass};
use crate::device::Device;
use crate::error::Result;
use crate::gpu_core::{DeviceSize, Format, IndexType, Rect2D, TextureLayout, Viewport};
use crate::handle::Handle;
use crate::pipeline::{ComputePipeline, GraphicsPipeline};
use crate::pipeline_layout::PushConstantRange;
use crate::render_pass::{DrawCommand, DrawIndexedCommand, RenderPass, RenderPassCommandRecorderOptions};

/// What a pass needs to know about an attachment view
#[derive(Debug, Clone, Copy)]
pub(super) struct ViewTarget {
    pub(super) view: vk::ImageView,
    pub(super) image: vk::Image,
    pub(super) format: Format,
    pub(super) range: vk::ImageSubresourceRange,
    pub(super) extent: vk::Extent2D,
}

#[derive(Debug, Clone, Copy)]
struct LayoutTransition {
    image: vk::Image,
    range: vk::ImageSubresourceRange,
    old_layout: vk::ImageLayout,
    new_layout: vk::ImageLayout,
}

/// Stages and accesses that touch an image while it is in `layout`
fn layout_scope(layout: vk::ImageLayout) -> (vk::PipelineStageFlags, vk::AccessFlags) {
    match layout {
        vk::ImageLayout::UNDEFINED => (vk::PipelineStageFlags::TOP_OF_PIPE, vk::AccessFlags::empty()),
        vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL => (
            vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
            vk::AccessFlags::COLOR_ATTACHMENT_READ | vk::AccessFlags::COLOR_ATTACHMENT_WRITE,
        ),
        vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL => (
            vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS | vk::PipelineStageFlags::LATE_FRAGMENT_TESTS,
            vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
        ),
        vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL => (
            vk::PipelineStageFlags::FRAGMENT_SHADER | vk::PipelineStageFlags::COMPUTE_SHADER,
            vk::AccessFlags::SHADER_READ,
        ),
        vk::ImageLayout::TRANSFER_SRC_OPTIMAL => (vk::PipelineStageFlags::TRANSFER, vk::AccessFlags::TRANSFER_READ),
        vk::ImageLayout::TRANSFER_DST_OPTIMAL => (vk::PipelineStageFlags::TRANSFER, vk::AccessFlags::TRANSFER_WRITE),
        vk::ImageLayout::PRESENT_SRC_KHR => (vk::PipelineStageFlags::BOTTOM_OF_PIPE, vk::AccessFlags::empty()),
        _ => (
            vk::PipelineStageFlags::ALL_COMMANDS,
            vk::AccessFlags::MEMORY_READ | vk::AccessFlags::MEMORY_WRITE,
        ),
    }
}

fn record_transitions(device: &ash::Device, command_buffer: vk::CommandBuffer, transitions: &[LayoutTransition]) {
    for transition in transitions {
        if transition.old_layout == transition.new_layout {
            continue;
        }
        let (src_stage, src_access) = layout_scope(transition.old_layout);
        let (dst_stage, dst_access) = layout_scope(transition.new_layout);
        let barrier = vk::ImageMemoryBarrier::builder()
            .src_access_mask(src_access)
            .dst_access_mask(dst_access)
            .old_layout(transition.old_layout)
            .new_layout(transition.new_layout)
            .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .image(transition.image)
            .subresource_range(transition.range)
            .build();

        unsafe {
            device.cmd_pipeline_barrier(
                command_buffer,
                src_stage,
                dst_stage,
                vk::DependencyFlags::empty(),
                &[],
                &[],
                &[barrier],
            );
        }
    }
}

fn clear_color(clear_value: [f32; 4]) -> vk::ClearValue {
    vk::ClearValue {
        color: vk::ClearColorValue { float32: clear_value },
    }
}

// =========================================================================
// Recorder
// =========================================================================

pub(super) struct VulkanCommandRecorder {
    pub(super) device: Handle<Device>,
    context: Arc<DeviceContext>,
    pool: vk::CommandPool,
    command_buffer: vk::CommandBuffer,
    finished: bool,
    rm: Weak<VulkanResourceManager>,
}

impl VulkanCommandRecorder {
    pub(super) fn new(
        device: Handle<Device>,
        context: &Arc<DeviceContext>,
        queue_family: u32,
        rm: Weak<VulkanResourceManager>,
    ) -> Result<Self> {
        let (pool, command_buffer) = context.allocate_command_buffer(queue_family)?;

        let begin_info =
            vk::CommandBufferBeginInfo::builder().flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
        if let Err(e) = unsafe { context.device.begin_command_buffer(command_buffer, &begin_info) } {
            context.free_command_buffer(pool, command_buffer);
            return Err(e.into());
        }

        Ok(Self {
            device,
            context: context.clone(),
            pool,
            command_buffer,
            finished: false,
            rm,
        })
    }

    /// Command buffer and resource manager, if still recording
    fn recording(&self) -> Option<(vk::CommandBuffer, Arc<VulkanResourceManager>)> {
        if self.finished {
            log::warn!("Recording into a finished command recorder");
            return None;
        }
        self.rm.upgrade().map(|rm| (self.command_buffer, rm))
    }

    fn begin_rendering(
        &self,
        rm: &VulkanResourceManager,
        options: &RenderPassCommandRecorderOptions,
    ) -> Option<Vec<LayoutTransition>> {
        let mut begin_transitions = Vec::new();
        let mut end_transitions = Vec::new();
        let mut color_attachments = Vec::with_capacity(options.color_attachments.len());
        let mut render_extent: Option<vk::Extent2D> = None;

        for attachment in &options.color_attachments {
            let Some(target) = rm.view_target(attachment.view) else {
                log::error!("Render pass with invalid color attachment {:?}", attachment.view);
                return None;
            };
            render_extent.get_or_insert(target.extent);

            begin_transitions.push(LayoutTransition {
                image: target.image,
                range: target.range,
                old_layout: conversions::texture_layout(attachment.initial_layout),
                new_layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
            });

            let mut info = vk::RenderingAttachmentInfo::builder()
                .image_view(target.view)
                .image_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
                .load_op(conversions::load_op(attachment.load_operation))
                .store_op(conversions::store_op(attachment.store_operation))
                .clear_value(clear_color(attachment.clear_value));

            // Multisampled color resolves into `resolve_view`, which then
            // carries the final layout instead
            let final_target = match attachment.resolve_view.map(|view| (view, rm.view_target(view))) {
                Some((_, Some(resolve))) => {
                    begin_transitions.push(LayoutTransition {
                        image: resolve.image,
                        range: resolve.range,
                        old_layout: vk::ImageLayout::UNDEFINED,
                        new_layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
                    });
                    info = info
                        .resolve_mode(vk::ResolveModeFlags::AVERAGE)
                        .resolve_image_view(resolve.view)
                        .resolve_image_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL);
                    resolve
                }
                Some((view, None)) => {
                    log::error!("Render pass with invalid resolve attachment {:?}", view);
                    return None;
                }
                None => target,
            };

            if attachment.final_layout != TextureLayout::Undefined {
                end_transitions.push(LayoutTransition {
                    image: final_target.image,
                    range: final_target.range,
                    old_layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
                    new_layout: conversions::texture_layout(attachment.final_layout),
                });
            }
            color_attachments.push(info.build());
        }

        let mut depth_attachment = None;
        let mut stencil_attachment = None;
        if let Some(depth) = &options.depth_stencil_attachment {
            let Some(target) = rm.view_target(depth.view) else {
                log::error!("Render pass with invalid depth attachment {:?}", depth.view);
                return None;
            };
            render_extent.get_or_insert(target.extent);

            begin_transitions.push(LayoutTransition {
                image: target.image,
                range: target.range,
                old_layout: conversions::texture_layout(depth.initial_layout),
                new_layout: vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
            });

            depth_attachment = Some(
                vk::RenderingAttachmentInfo::builder()
                    .image_view(target.view)
                    .image_layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL)
                    .load_op(conversions::load_op(depth.depth_load_operation))
                    .store_op(conversions::store_op(depth.depth_store_operation))
                    .clear_value(vk::ClearValue {
                        depth_stencil: vk::ClearDepthStencilValue {
                            depth: depth.depth_clear_value,
                            stencil: depth.stencil_clear_value,
                        },
                    })
                    .build(),
            );
            if target.format.has_stencil() {
                stencil_attachment = Some(
                    vk::RenderingAttachmentInfo::builder()
                        .image_view(target.view)
                        .image_layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL)
                        .load_op(conversions::load_op(depth.stencil_load_operation))
                        .store_op(conversions::store_op(depth.stencil_store_operation))
                        .clear_value(vk::ClearValue {
                            depth_stencil: vk::ClearDepthStencilValue {
                                depth: depth.depth_clear_value,
                                stencil: depth.stencil_clear_value,
                            },
                        })
                        .build(),
                );
            }
        }

        let Some(extent) = render_extent else {
            log::error!("Render pass without attachments");
            return None;
        };

        let device = &self.context.device;
        record_transitions(device, self.command_buffer, &begin_transitions);

        let mut rendering_info = vk::RenderingInfo::builder()
            .render_area(vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent,
            })
            .layer_count(1)
            .color_attachments(&color_attachments);
        if let Some(depth) = depth_attachment.as_ref() {
            rendering_info = rendering_info.depth_attachment(depth);
        }
        if let Some(stencil) = stencil_attachment.as_ref() {
            rendering_info = rendering_info.stencil_attachment(stencil);
        }

        unsafe { device.cmd_begin_rendering(self.command_buffer, &rendering_info) };
        Some(end_transitions)
    }
}

impl ApiCommandRecorder for VulkanCommandRecorder {
    fn begin_render_pass(&mut self, options: &RenderPassCommandRecorderOptions) -> Handle<RenderPass> {
        let Some((command_buffer, rm)) = self.recording() else {
            return Handle::default();
        };
        let Some(end_transitions) = self.begin_rendering(&rm, options) else {
            return Handle::default();
        };
        rm.insert_render_pass(VulkanRenderPass {
            device: self.device,
            context: self.context.clone(),
            command_buffer,
            pipeline_layout: vk::PipelineLayout::null(),
            end_transitions,
            ended: false,
            rm: self.rm.clone(),
        })
    }

    fn begin_compute_pass(&mut self) -> Handle<ComputePass> {
        let Some((command_buffer, rm)) = self.recording() else {
            return Handle::default();
        };
        rm.insert_compute_pass(VulkanComputePass {
            device: self.device,
            context: self.context.clone(),
            command_buffer,
            pipeline_layout: vk::PipelineLayout::null(),
            ended: false,
            rm: self.rm.clone(),
        })
    }

    fn copy_buffer(&mut self, copy: &BufferCopy) {
        let Some((command_buffer, rm)) = self.recording() else {
            return;
        };
        let (Some(src), Some(dst)) = (rm.native_buffer(copy.src), rm.native_buffer(copy.dst)) else {
            log::error!("Buffer copy with invalid buffers: {:?}", copy);
            return;
        };
        let region = vk::BufferCopy {
            src_offset: copy.src_offset,
            dst_offset: copy.dst_offset,
            size: copy.byte_size,
        };
        unsafe {
            self.context
                .device
                .cmd_copy_buffer(command_buffer, src, dst, &[region])
        };
    }

    fn copy_buffer_to_texture(&mut self, copy: &BufferTextureCopy) {
        let Some((command_buffer, rm)) = self.recording() else {
            return;
        };
        let (Some(buffer), Some((image, _))) = (rm.native_buffer(copy.src_buffer), rm.native_texture(copy.dst_texture))
        else {
            log::error!("Texture upload with invalid buffer or texture");
            return;
        };

        let regions: Vec<vk::BufferImageCopy> = copy
            .regions
            .iter()
            .map(|region| vk::BufferImageCopy {
                buffer_offset: region.buffer_offset,
                buffer_row_length: region.buffer_row_length,
                buffer_image_height: region.buffer_texture_height,
                image_subresource: vk::ImageSubresourceLayers {
                    aspect_mask: conversions::aspect(region.texture_sub_resource.aspect_mask),
                    mip_level: region.texture_sub_resource.mip_level,
                    base_array_layer: region.texture_sub_resource.base_array_layer,
                    layer_count: region.texture_sub_resource.layer_count,
                },
                image_offset: vk::Offset3D {
                    x: region.texture_offset.x,
                    y: region.texture_offset.y,
                    z: region.texture_offset.z,
                },
                image_extent: conversions::extent_3d(region.texture_extent),
            })
            .collect();

        unsafe {
            self.context.device.cmd_copy_buffer_to_image(
                command_buffer,
                buffer,
                image,
                conversions::texture_layout(copy.dst_texture_layout),
                &regions,
            )
        };
    }

    fn texture_memory_barrier(&mut self, barrier: &TextureMemoryBarrier) {
        let Some((command_buffer, rm)) = self.recording() else {
            return;
        };
        let Some((image, format)) = rm.native_texture(barrier.texture) else {
            log::error!("Barrier on invalid texture {:?}", barrier.texture);
            return;
        };

        let image_barrier = vk::ImageMemoryBarrier::builder()
            .src_access_mask(conversions::access(barrier.src_mask))
            .dst_access_mask(conversions::access(barrier.dst_mask))
            .old_layout(conversions::texture_layout(barrier.old_layout))
            .new_layout(conversions::texture_layout(barrier.new_layout))
            .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .image(image)
            .subresource_range(subresource_range(&barrier.range, format))
            .build();

        unsafe {
            self.context.device.cmd_pipeline_barrier(
                command_buffer,
                conversions::pipeline_stages(barrier.src_stages),
                conversions::pipeline_stages(barrier.dst_stages),
                vk::DependencyFlags::empty(),
                &[],
                &[],
                &[image_barrier],
            )
        };
    }

    fn buffer_memory_barrier(&mut self, barrier: &BufferMemoryBarrier) {
        let Some((command_buffer, rm)) = self.recording() else {
            return;
        };
        let Some(buffer) = rm.native_buffer(barrier.buffer) else {
            log::error!("Barrier on invalid buffer {:?}", barrier.buffer);
            return;
        };

        let buffer_barrier = vk::BufferMemoryBarrier::builder()
            .src_access_mask(conversions::access(barrier.src_mask))
            .dst_access_mask(conversions::access(barrier.dst_mask))
            .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .buffer(buffer)
            .offset(barrier.offset)
            .size(barrier.size)
            .build();

        unsafe {
            self.context.device.cmd_pipeline_barrier(
                command_buffer,
                conversions::pipeline_stages(barrier.src_stages),
                conversions::pipeline_stages(barrier.dst_stages),
                vk::DependencyFlags::empty(),
                &[],
                &[buffer_barrier],
                &[],
            )
        };
    }

    fn finish(&mut self) -> Handle<CommandBuffer> {
        let Some((command_buffer, rm)) = self.recording() else {
            return Handle::default();
        };
        self.finished = true;

        if let Err(e) = unsafe { self.context.device.end_command_buffer(command_buffer) } {
            log::error!("Failed to end command buffer: {:?}", e);
            self.context.free_command_buffer(self.pool, command_buffer);
            return Handle::default();
        }

        rm.insert_command_buffer(VulkanCommandBuffer {
            device: self.device,
            context: self.context.clone(),
            pool: self.pool,
            command_buffer,
        })
    }
}

impl Drop for VulkanCommandRecorder {
    fn drop(&mut self) {
        // Once finished the command buffer belongs to a VulkanCommandBuffer
        if !self.finished {
            self.context.free_command_buffer(self.pool, self.command_buffer);
        }
    }
}

// =========================================================================
// Passes
// =========================================================================

pub(super) struct VulkanRenderPass {
    pub(super) device: Handle<Device>,
    context: Arc<DeviceContext>,
    command_buffer: vk::CommandBuffer,
    /// Layout of the bound pipeline, for bind groups and push constants
    pipeline_layout: vk::PipelineLayout,
    end_transitions: Vec<LayoutTransition>,
    ended: bool,
    rm: Weak<VulkanResourceManager>,
}

impl VulkanRenderPass {
    fn recording(&self) -> Option<Arc<VulkanResourceManager>> {
        if self.ended {
            log::warn!("Recording into an ended render pass");
            return None;
        }
        self.rm.upgrade()
    }
}

impl ApiRenderPassCommandRecorder for VulkanRenderPass {
    fn set_pipeline(&mut self, pipeline: Handle<GraphicsPipeline>) {
        let Some(rm) = self.recording() else { return };
        let Some((native, layout)) = rm.native_graphics_pipeline(pipeline) else {
            log::error!("set_pipeline() with invalid pipeline {:?}", pipeline);
            return;
        };
        self.pipeline_layout = layout;
        unsafe {
            self.context
                .device
                .cmd_bind_pipeline(self.command_buffer, vk::PipelineBindPoint::GRAPHICS, native)
        };
    }

    fn set_vertex_buffer(&mut self, index: u32, buffer: Handle<Buffer>, offset: DeviceSize) {
        let Some(rm) = self.recording() else { return };
        let Some(native) = rm.native_buffer(buffer) else {
            log::error!("set_vertex_buffer() with invalid buffer {:?}", buffer);
            return;
        };
        unsafe {
            self.context
                .device
                .cmd_bind_vertex_buffers(self.command_buffer, index, &[native], &[offset])
        };
    }

    fn set_index_buffer(&mut self, buffer: Handle<Buffer>, offset: DeviceSize, index_type: IndexType) {
        let Some(rm) = self.recording() else { return };
        let Some(native) = rm.native_buffer(buffer) else {
            log::error!("set_index_buffer() with invalid buffer {:?}", buffer);
            return;
        };
        unsafe {
            self.context.device.cmd_bind_index_buffer(
                self.command_buffer,
                native,
                offset,
                conversions::index_type(index_type),
            )
        };
    }

    fn set_bind_group(&mut self, group: u32, bind_group: Handle<BindGroup>, dynamic_offsets: &[u32]) {
        let Some(rm) = self.recording() else { return };
        if self.pipeline_layout == vk::PipelineLayout::null() {
            log::warn!("set_bind_group() before set_pipeline()");
            return;
        }
        let Some(set) = rm.native_bind_group(bind_group) else {
            log::error!("set_bind_group() with invalid bind group {:?}", bind_group);
            return;
        };
        unsafe {
            self.context.device.cmd_bind_descriptor_sets(
                self.command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                self.pipeline_layout,
                group,
                &[set],
                dynamic_offsets,
            )
        };
    }

    fn set_viewport(&mut self, viewport: &Viewport) {
        if self.recording().is_none() {
            return;
        }
        let native = vk::Viewport {
            x: viewport.x,
            y: viewport.y,
            width: viewport.width,
            height: viewport.height,
            min_depth: viewport.min_depth,
            max_depth: viewport.max_depth,
        };
        unsafe { self.context.device.cmd_set_viewport(self.command_buffer, 0, &[native]) };
    }

    fn set_scissor(&mut self, scissor: &Rect2D) {
        if self.recording().is_none() {
            return;
        }
        unsafe {
            self.context
                .device
                .cmd_set_scissor(self.command_buffer, 0, &[conversions::rect_2d(*scissor)])
        };
    }

    fn draw(&mut self, draw: &DrawCommand) {
        if self.recording().is_none() {
            return;
        }
        unsafe {
            self.context.device.cmd_draw(
                self.command_buffer,
                draw.vertex_count,
                draw.instance_count,
                draw.first_vertex,
                draw.first_instance,
            )
        };
    }

    fn draw_indexed(&mut self, draw: &DrawIndexedCommand) {
        if self.recording().is_none() {
            return;
        }
        unsafe {
            self.context.device.cmd_draw_indexed(
                self.command_buffer,
                draw.index_count,
                draw.instance_count,
                draw.first_index,
                draw.vertex_offset,
                draw.first_instance,
            )
        };
    }

    fn push_constant(&mut self, range: &PushConstantRange, data: &[u8]) {
        if self.recording().is_none() {
            return;
        }
        if self.pipeline_layout == vk::PipelineLayout::null() {
            log::warn!("push_constant() before set_pipeline()");
            return;
        }
        unsafe {
            self.context.device.cmd_push_constants(
                self.command_buffer,
                self.pipeline_layout,
                conversions::shader_stages(range.shader_stages),
                range.offset,
                data,
            )
        };
    }

    fn end(&mut self) {
        if self.recording().is_none() {
            return;
        }
        self.ended = true;
        let device = &self.context.device;
        unsafe { device.cmd_end_rendering(self.command_buffer) };
        record_transitions(device, self.command_buffer, &self.end_transitions);
    }
}

pub(super) struct VulkanComputePass {
    pub(super) device: Handle<Device>,
    context: Arc<DeviceContext>,
    command_buffer: vk::CommandBuffer,
    pipeline_layout: vk::PipelineLayout,
    ended: bool,
    rm: Weak<VulkanResourceManager>,
}

impl VulkanComputePass {
    fn recording(&self) -> Option<Arc<VulkanResourceManager>> {
        if self.ended {
            log::warn!("Recording into an ended compute pass");
            return None;
        }
        self.rm.upgrade()
    }
}

impl ApiComputePassCommandRecorder for VulkanComputePass {
    fn set_pipeline(&mut self, pipeline: Handle<ComputePipeline>) {
        let Some(rm) = self.recording() else { return };
        let Some((native, layout)) = rm.native_compute_pipeline(pipeline) else {
            log::error!("set_pipeline() with invalid compute pipeline {:?}", pipeline);
            return;
        };
        self.pipeline_layout = layout;
        unsafe {
            self.context
                .device
                .cmd_bind_pipeline(self.command_buffer, vk::PipelineBindPoint::COMPUTE, native)
        };
    }

    fn set_bind_group(&mut self, group: u32, bind_group: Handle<BindGroup>, dynamic_offsets: &[u32]) {
        let Some(rm) = self.recording() else { return };
        if self.pipeline_layout == vk::PipelineLayout::null() {
            log::warn!("set_bind_group() before set_pipeline()");
            return;
        }
        let Some(set) = rm.native_bind_group(bind_group) else {
            log::error!("set_bind_group() with invalid bind group {:?}", bind_group);
            return;
        };
        unsafe {
            self.context.device.cmd_bind_descriptor_sets(
                self.command_buffer,
                vk::PipelineBindPoint::COMPUTE,
                self.pipeline_layout,
                group,
                &[set],
                dynamic_offsets,
            )
        };
    }

    fn dispatch(&mut self, command: &ComputeCommand) {
        if self.recording().is_none() {
            return;
        }
        unsafe {
            self.context.device.cmd_dispatch(
                self.command_buffer,
                command.work_group_x,
                command.work_group_y,
                command.work_group_z,
            )
        };
    }

    fn push_constant(&mut self, range: &PushConstantRange, data: &[u8]) {
        if self.recording().is_none() {
            return;
        }
        if self.pipeline_layout == vk::PipelineLayout::null() {
            log::warn!("push_constant() before set_pipeline()");
            return;
        }
        unsafe {
            self.context.device.cmd_push_constants(
                self.command_buffer,
                self.pipeline_layout,
                conversions::shader_stages(range.shader_stages),
                range.offset,
                data,
            )
        };
    }

    fn end(&mut self) {
        // Compute work needs no closing command
        self.ended = true;
    }
}

// =========================================================================
// Finished command buffer
// =========================================================================

pub(super) struct VulkanCommandBuffer {
    pub(super) device: Handle<Device>,
    context: Arc<DeviceContext>,
    pool: vk::CommandPool,
    pub(super) command_buffer: vk::CommandBuffer,
}

impl ApiCommandBuffer for VulkanCommandBuffer {}

impl Drop for VulkanCommandBuffer {
    fn drop(&mut self) {
        self.context.free_command_buffer(self.pool, self.command_buffer);
    }
}
