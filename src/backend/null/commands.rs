// Command recording for the Null backend
//
// Recorders and the passes opened from them append to one shared command
// list. Finishing the recorder moves the list into a command buffer, which a
// queue submission copies into its pending work.

use parking_lot::Mutex;
use std::sync::{Arc, Weak};

use super::resource_manager::NullResourceManager;
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
use crate::gpu_core::{DeviceSize, IndexType, Rect2D, Viewport};
use crate::handle::Handle;
use crate::pipeline::{ComputePipeline, GraphicsPipeline};
use crate::pipeline_layout::PushConstantRange;
use crate::queue::Queue;
use crate::render_pass::{DrawCommand, DrawIndexedCommand, RenderPass, RenderPassCommandRecorderOptions};
use crate::texture_view::TextureView;

/// One recorded command, as stored in a Null command buffer
#[derive(Debug, Clone, PartialEq)]
pub enum NullCommand {
    BeginRenderPass {
        color_attachments: Vec<Handle<TextureView>>,
        depth_attachment: Option<Handle<TextureView>>,
    },
    EndRenderPass,
    BeginComputePass,
    EndComputePass,
    SetGraphicsPipeline(Handle<GraphicsPipeline>),
    SetComputePipeline(Handle<ComputePipeline>),
    SetVertexBuffer {
        index: u32,
        buffer: Handle<Buffer>,
        offset: DeviceSize,
    },
    SetIndexBuffer {
        buffer: Handle<Buffer>,
        offset: DeviceSize,
        index_type: IndexType,
    },
    SetBindGroup {
        group: u32,
        bind_group: Handle<BindGroup>,
        dynamic_offsets: Vec<u32>,
    },
    SetViewport(Viewport),
    SetScissor(Rect2D),
    Draw(DrawCommand),
    DrawIndexed(DrawIndexedCommand),
    Dispatch(ComputeCommand),
    PushConstant {
        range: PushConstantRange,
        data: Vec<u8>,
    },
    CopyBuffer(BufferCopy),
    CopyBufferToTexture(BufferTextureCopy),
    TextureMemoryBarrier(TextureMemoryBarrier),
    BufferMemoryBarrier(BufferMemoryBarrier),
}

pub(super) type CommandList = Arc<Mutex<Vec<NullCommand>>>;

pub(super) struct NullCommandRecorder {
    pub(super) device: Handle<Device>,
    pub(super) queue: Handle<Queue>,
    pub(super) commands: CommandList,
    pub(super) finished: bool,
    pub(super) rm: Weak<NullResourceManager>,
}

impl NullCommandRecorder {
    fn record(&mut self, command: NullCommand) -> bool {
        if self.finished {
            log::warn!("Recording into a finished command recorder: {:?}", command);
            return false;
        }
        self.commands.lock().push(command);
        true
    }
}

impl ApiCommandRecorder for NullCommandRecorder {
    fn begin_render_pass(&mut self, options: &RenderPassCommandRecorderOptions) -> Handle<RenderPass> {
        let begin = NullCommand::BeginRenderPass {
            color_attachments: options.color_attachments.iter().map(|a| a.view).collect(),
            depth_attachment: options.depth_stencil_attachment.map(|a| a.view),
        };
        if !self.record(begin) {
            return Handle::default();
        }
        match self.rm.upgrade() {
            Some(rm) => rm.insert_render_pass(NullRenderPass {
                device: self.device,
                commands: self.commands.clone(),
                pipeline_bound: false,
                ended: false,
            }),
            None => Handle::default(),
        }
    }

    fn begin_compute_pass(&mut self) -> Handle<ComputePass> {
        if !self.record(NullCommand::BeginComputePass) {
            return Handle::default();
        }
        match self.rm.upgrade() {
            Some(rm) => rm.insert_compute_pass(NullComputePass {
                device: self.device,
                commands: self.commands.clone(),
                pipeline_bound: false,
                ended: false,
            }),
            None => Handle::default(),
        }
    }

    fn copy_buffer(&mut self, copy: &BufferCopy) {
        self.record(NullCommand::CopyBuffer(*copy));
    }

    fn copy_buffer_to_texture(&mut self, copy: &BufferTextureCopy) {
        self.record(NullCommand::CopyBufferToTexture(copy.clone()));
    }

    fn texture_memory_barrier(&mut self, barrier: &TextureMemoryBarrier) {
        self.record(NullCommand::TextureMemoryBarrier(*barrier));
    }

    fn buffer_memory_barrier(&mut self, barrier: &BufferMemoryBarrier) {
        self.record(NullCommand::BufferMemoryBarrier(*barrier));
    }

    fn finish(&mut self) -> Handle<CommandBuffer> {
        if self.finished {
            log::warn!("finish() called twice on a command recorder");
            return Handle::default();
        }
        self.finished = true;
        let commands = std::mem::take(&mut *self.commands.lock());
        match self.rm.upgrade() {
            Some(rm) => rm.insert_command_buffer(NullCommandBuffer {
                device: self.device,
                queue: self.queue,
                commands,
            }),
            None => Handle::default(),
        }
    }
}

pub(super) struct NullRenderPass {
    pub(super) device: Handle<Device>,
    commands: CommandList,
    pipeline_bound: bool,
    ended: bool,
}

impl NullRenderPass {
    fn record(&mut self, command: NullCommand) {
        if self.ended {
            log::warn!("Recording into an ended render pass: {:?}", command);
            return;
        }
        self.commands.lock().push(command);
    }

    fn record_draw(&mut self, command: NullCommand) {
        if !self.pipeline_bound {
            log::warn!("Draw recorded without a bound graphics pipeline");
        }
        self.record(command);
    }
}

impl ApiRenderPassCommandRecorder for NullRenderPass {
    fn set_pipeline(&mut self, pipeline: Handle<GraphicsPipeline>) {
        self.pipeline_bound = pipeline.is_valid();
        self.record(NullCommand::SetGraphicsPipeline(pipeline));
    }

    fn set_vertex_buffer(&mut self, index: u32, buffer: Handle<Buffer>, offset: DeviceSize) {
        self.record(NullCommand::SetVertexBuffer { index, buffer, offset });
    }

    fn set_index_buffer(&mut self, buffer: Handle<Buffer>, offset: DeviceSize, index_type: IndexType) {
        self.record(NullCommand::SetIndexBuffer {
            buffer,
            offset,
            index_type,
        });
    }

    fn set_bind_group(&mut self, group: u32, bind_group: Handle<BindGroup>, dynamic_offsets: &[u32]) {
        self.record(NullCommand::SetBindGroup {
            group,
            bind_group,
            dynamic_offsets: dynamic_offsets.to_vec(),
        });
    }

    fn set_viewport(&mut self, viewport: &Viewport) {
        self.record(NullCommand::SetViewport(*viewport));
    }

    fn set_scissor(&mut self, scissor: &Rect2D) {
        self.record(NullCommand::SetScissor(*scissor));
    }

    fn draw(&mut self, draw: &DrawCommand) {
        self.record_draw(NullCommand::Draw(*draw));
    }

    fn draw_indexed(&mut self, draw: &DrawIndexedCommand) {
        self.record_draw(NullCommand::DrawIndexed(*draw));
    }

    fn push_constant(&mut self, range: &PushConstantRange, data: &[u8]) {
        self.record(NullCommand::PushConstant {
            range: *range,
            data: data.to_vec(),
        });
    }

    fn end(&mut self) {
        self.record(NullCommand::EndRenderPass);
        self.ended = true;
    }
}

pub(super) struct NullComputePass {
    pub(super) device: Handle<Device>,
    commands: CommandList,
    pipeline_bound: bool,
    ended: bool,
}

impl NullComputePass {
    fn record(&mut self, command: NullCommand) {
        if self.ended {
            log::warn!("Recording into an ended compute pass: {:?}", command);
            return;
        }
        self.commands.lock().push(command);
    }
}

impl ApiComputePassCommandRecorder for NullComputePass {
    fn set_pipeline(&mut self, pipeline: Handle<ComputePipeline>) {
        self.pipeline_bound = pipeline.is_valid();
        self.record(NullCommand::SetComputePipeline(pipeline));
    }

    fn set_bind_group(&mut self, group: u32, bind_group: Handle<BindGroup>, dynamic_offsets: &[u32]) {
        self.record(NullCommand::SetBindGroup {
            group,
            bind_group,
            dynamic_offsets: dynamic_offsets.to_vec(),
        });
    }

    fn dispatch(&mut self, command: &ComputeCommand) {
        if !self.pipeline_bound {
            log::warn!("Dispatch recorded without a bound compute pipeline");
        }
        self.record(NullCommand::Dispatch(*command));
    }

    fn push_constant(&mut self, range: &PushConstantRange, data: &[u8]) {
        self.record(NullCommand::PushConstant {
            range: *range,
            data: data.to_vec(),
        });
    }

    fn end(&mut self) {
        self.record(NullCommand::EndComputePass);
        self.ended = true;
    }
}

pub(super) struct NullCommandBuffer {
    pub(super) device: Handle<Device>,
    pub(super) queue: Handle<Queue>,
    pub(super) commands: Vec<NullCommand>,
}

impl ApiCommandBuffer for NullCommandBuffer {}
