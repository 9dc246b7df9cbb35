// Render pass recording
//
// Attachments are transitioned from `initial_layout` to the attachment layout
// when the pass begins and to `final_layout` when it ends.

use std::marker::PhantomData;
use std::sync::Arc;

use crate::api::{ApiRenderPassCommandRecorder, GraphicsApi};
use crate::bind_group::BindGroup;
use crate::buffer::Buffer;
use crate::command_recorder::CommandRecorder;
use crate::gpu_core::{
    AttachmentLoadOperation, AttachmentStoreOperation, DeviceSize, IndexType, Rect2D, SampleCount,
    TextureLayout, Viewport,
};
use crate::handle::Handle;
use crate::pipeline::GraphicsPipeline;
use crate::pipeline_layout::PushConstantRange;
use crate::texture_view::TextureView;

/// Handle kind of an open render pass
pub enum RenderPass {}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorAttachment {
    pub view: Handle<TextureView>,
    pub resolve_view: Option<Handle<TextureView>>,
    pub load_operation: AttachmentLoadOperation,
    pub store_operation: AttachmentStoreOperation,
    pub clear_value: [f32; 4],
    pub initial_layout: TextureLayout,
    pub final_layout: TextureLayout,
}

impl Default for ColorAttachment {
    fn default() -> Self {
        Self {
            view: Handle::default(),
            resolve_view: None,
            load_operation: AttachmentLoadOperation::Clear,
            store_operation: AttachmentStoreOperation::Store,
            clear_value: [0.0, 0.0, 0.0, 1.0],
            initial_layout: TextureLayout::Undefined,
            final_layout: TextureLayout::PresentSrc,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthStencilAttachment {
    pub view: Handle<TextureView>,
    pub depth_load_operation: AttachmentLoadOperation,
    pub depth_store_operation: AttachmentStoreOperation,
    pub depth_clear_value: f32,
    pub stencil_load_operation: AttachmentLoadOperation,
    pub stencil_store_operation: AttachmentStoreOperation,
    pub stencil_clear_value: u32,
    pub initial_layout: TextureLayout,
}

impl Default for DepthStencilAttachment {
    fn default() -> Self {
        Self {
            view: Handle::default(),
            depth_load_operation: AttachmentLoadOperation::Clear,
            depth_store_operation: AttachmentStoreOperation::DontCare,
            depth_clear_value: 1.0,
            stencil_load_operation: AttachmentLoadOperation::DontCare,
            stencil_store_operation: AttachmentStoreOperation::DontCare,
            stencil_clear_value: 0,
            initial_layout: TextureLayout::Undefined,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderPassCommandRecorderOptions {
    pub color_attachments: Vec<ColorAttachment>,
    pub depth_stencil_attachment: Option<DepthStencilAttachment>,
    pub samples: SampleCount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawCommand {
    pub vertex_count: u32,
    pub instance_count: u32,
    pub first_vertex: u32,
    pub first_instance: u32,
}

impl Default for DrawCommand {
    fn default() -> Self {
        Self {
            vertex_count: 0,
            instance_count: 1,
            first_vertex: 0,
            first_instance: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawIndexedCommand {
    pub index_count: u32,
    pub instance_count: u32,
    pub first_index: u32,
    pub vertex_offset: i32,
    pub first_instance: u32,
}

impl Default for DrawIndexedCommand {
    fn default() -> Self {
        Self {
            index_count: 0,
            instance_count: 1,
            first_index: 0,
            vertex_offset: 0,
            first_instance: 0,
        }
    }
}

/// Records draw commands between `begin_render_pass` and `end`
pub struct RenderPassCommandRecorder<'a> {
    api: Option<Arc<dyn GraphicsApi>>,
    handle: Handle<RenderPass>,
    ended: bool,
    _recorder: PhantomData<&'a mut CommandRecorder>,
}

impl<'a> RenderPassCommandRecorder<'a> {
    pub(crate) fn new(api: Option<Arc<dyn GraphicsApi>>, handle: Handle<RenderPass>) -> Self {
        Self {
            api,
            handle,
            ended: false,
            _recorder: PhantomData,
        }
    }

    pub fn handle(&self) -> Handle<RenderPass> {
        self.handle
    }

    pub fn is_valid(&self) -> bool {
        self.handle.is_valid()
    }

    pub fn set_pipeline(&mut self, pipeline: &GraphicsPipeline) {
        self.with_pass(|pass| pass.set_pipeline(pipeline.handle()));
    }

    pub fn set_vertex_buffer(&mut self, index: u32, buffer: &Buffer, offset: DeviceSize) {
        self.with_pass(|pass| pass.set_vertex_buffer(index, buffer.handle(), offset));
    }

    pub fn set_index_buffer(&mut self, buffer: &Buffer, offset: DeviceSize, index_type: IndexType) {
        self.with_pass(|pass| pass.set_index_buffer(buffer.handle(), offset, index_type));
    }

    /// Bind at `group` using the layout of the currently bound pipeline
    pub fn set_bind_group(&mut self, group: u32, bind_group: &BindGroup) {
        self.set_bind_group_with_offsets(group, bind_group, &[]);
    }

    pub fn set_bind_group_with_offsets(&mut self, group: u32, bind_group: &BindGroup, dynamic_offsets: &[u32]) {
        self.with_pass(|pass| pass.set_bind_group(group, bind_group.handle(), dynamic_offsets));
    }

    pub fn set_viewport(&mut self, viewport: &Viewport) {
        self.with_pass(|pass| pass.set_viewport(viewport));
    }

    pub fn set_scissor(&mut self, scissor: &Rect2D) {
        self.with_pass(|pass| pass.set_scissor(scissor));
    }

    pub fn draw(&mut self, draw: &DrawCommand) {
        self.with_pass(|pass| pass.draw(draw));
    }

    pub fn draw_indexed(&mut self, draw: &DrawIndexedCommand) {
        self.with_pass(|pass| pass.draw_indexed(draw));
    }

    pub fn push_constant(&mut self, range: &PushConstantRange, data: &[u8]) {
        self.with_pass(|pass| pass.push_constant(range, data));
    }

    pub fn end(mut self) {
        self.end_pass();
    }

    fn end_pass(&mut self) {
        if !self.ended {
            self.with_pass(|pass| pass.end());
            self.ended = true;
        }
    }

    fn with_pass(&mut self, f: impl FnOnce(&mut dyn ApiRenderPassCommandRecorder)) {
        if self.ended {
            log::warn!("Recording into a render pass that has ended");
            return;
        }
        let pass = self
            .api
            .as_ref()
            .and_then(|api| api.resource_manager().get_render_pass_command_recorder(self.handle));
        match pass {
            Some(mut pass) => f(&mut *pass),
            None => log::warn!("Recording into an invalid render pass"),
        }
    }
}

impl Drop for RenderPassCommandRecorder<'_> {
    fn drop(&mut self) {
        if !self.handle.is_valid() {
            return;
        }
        if !self.ended {
            log::warn!("Render pass dropped without end(), ending it");
            self.end_pass();
        }
        if let Some(api) = &self.api {
            api.resource_manager()
                .delete_render_pass_command_recorder(self.handle);
        }
    }
}
