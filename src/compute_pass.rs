// Compute pass recording

use std::marker::PhantomData;
use std::sync::Arc;

use crate::api::{ApiComputePassCommandRecorder, GraphicsApi};
use crate::bind_group::BindGroup;
use crate::command_recorder::CommandRecorder;
use crate::handle::Handle;
use crate::pipeline::ComputePipeline;
use crate::pipeline_layout::PushConstantRange;

/// Handle kind of an open compute pass
pub enum ComputePass {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComputeCommand {
    pub work_group_x: u32,
    pub work_group_y: u32,
    pub work_group_z: u32,
}

impl Default for ComputeCommand {
    fn default() -> Self {
        Self {
            work_group_x: 1,
            work_group_y: 1,
            work_group_z: 1,
        }
    }
}

pub struct ComputePassCommandRecorder<'a> {
    api: Option<Arc<dyn GraphicsApi>>,
    handle: Handle<ComputePass>,
    ended: bool,
    _recorder: PhantomData<&'a mut CommandRecorder>,
}

impl<'a> ComputePassCommandRecorder<'a> {
    pub(crate) fn new(api: Option<Arc<dyn GraphicsApi>>, handle: Handle<ComputePass>) -> Self {
        Self {
            api,
            handle,
            ended: false,
            _recorder: PhantomData,
        }
    }

    pub fn handle(&self) -> Handle<ComputePass> {
        self.handle
    }

    pub fn is_valid(&self) -> bool {
        self.handle.is_valid()
    }

    pub fn set_pipeline(&mut self, pipeline: &ComputePipeline) {
        self.with_pass(|pass| pass.set_pipeline(pipeline.handle()));
    }

    pub fn set_bind_group(&mut self, group: u32, bind_group: &BindGroup) {
        self.with_pass(|pass| pass.set_bind_group(group, bind_group.handle(), &[]));
    }

    pub fn set_bind_group_with_offsets(&mut self, group: u32, bind_group: &BindGroup, dynamic_offsets: &[u32]) {
        self.with_pass(|pass| pass.set_bind_group(group, bind_group.handle(), dynamic_offsets));
    }

    pub fn dispatch(&mut self, command: &ComputeCommand) {
        self.with_pass(|pass| pass.dispatch(command));
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

    fn with_pass(&mut self, f: impl FnOnce(&mut dyn ApiComputePassCommandRecorder)) {
        if self.ended {
            log::warn!("Recording into a compute pass that has ended");
            return;
        }
        let pass = self
            .api
            .as_ref()
            .and_then(|api| api.resource_manager().get_compute_pass_command_recorder(self.handle));
        match pass {
            Some(mut pass) => f(&mut *pass),
            None => log::warn!("Recording into an invalid compute pass"),
        }
    }
}

impl Drop for ComputePassCommandRecorder<'_> {
    fn drop(&mut self) {
        if !self.handle.is_valid() {
            return;
        }
        if !self.ended {
            log::warn!("Compute pass dropped without end(), ending it");
            self.end_pass();
        }
        if let Some(api) = &self.api {
            api.resource_manager()
                .delete_compute_pass_command_recorder(self.handle);
        }
    }
}
