// Queue - submission and presentation
//
// Queues are created with their device and are not independently
// destructible; the wrapper is a copyable reference.

use std::sync::Arc;

use crate::api::{same_api, GraphicsApi};
use crate::buffer::{Buffer, BufferOptions};
use crate::command_recorder::{
    BufferCopy, BufferMemoryBarrier, BufferTextureCopy, BufferTextureCopyRegion, CommandBuffer,
    CommandRecorder, CommandRecorderOptions, TextureMemoryBarrier,
};
use crate::device::{Device, QueueDescription};
use crate::error::{GpuError, Result};
use crate::gpu_core::{
    AccessFlags, BufferUsageFlags, DeviceSize, MemoryUsage, PipelineStageFlags, PresentResult, QueueFlags,
    TextureLayout,
};
use crate::handle::Handle;
use crate::swapchain::Swapchain;
use crate::sync::{Fence, FenceOptions, GpuSemaphore};
use crate::texture::Texture;
use crate::texture_view::TextureSubresourceRange;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubmitOptions {
    pub command_buffers: Vec<Handle<CommandBuffer>>,
    pub wait_semaphores: Vec<Handle<GpuSemaphore>>,
    pub signal_semaphores: Vec<Handle<GpuSemaphore>>,
    pub signal_fence: Option<Handle<Fence>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresentSwapchainInfo {
    pub swapchain: Handle<Swapchain>,
    pub image_index: u32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PresentOptions {
    pub wait_semaphores: Vec<Handle<GpuSemaphore>>,
    pub swapchain_infos: Vec<PresentSwapchainInfo>,
}

#[derive(Debug, Clone)]
pub struct BufferUploadOptions<'a> {
    pub destination_buffer: Handle<Buffer>,
    pub dst_offset: DeviceSize,
    /// Stages and accesses that consume the uploaded data
    pub dst_stages: PipelineStageFlags,
    pub dst_mask: AccessFlags,
    pub data: &'a [u8],
}

#[derive(Debug, Clone)]
pub struct TextureUploadOptions<'a> {
    pub destination_texture: Handle<Texture>,
    pub dst_stages: PipelineStageFlags,
    pub dst_mask: AccessFlags,
    pub data: &'a [u8],
    pub old_layout: TextureLayout,
    pub new_layout: TextureLayout,
    pub regions: Vec<BufferTextureCopyRegion>,
}

/// Resources of an in-flight upload. Keep it alive until `fence` is
/// signalled; dropping it earlier frees memory the GPU may still read.
pub struct UploadStagingBuffer {
    pub fence: Fence,
    pub buffer: Buffer,
    pub command_buffer: CommandBuffer,
}

#[derive(Clone, Default)]
pub struct Queue {
    api: Option<Arc<dyn GraphicsApi>>,
    device: Handle<Device>,
    handle: Handle<Queue>,
    queue_type_index: u32,
    flags: QueueFlags,
}

impl Queue {
    pub(crate) fn from_description(
        api: &Arc<dyn GraphicsApi>,
        device: Handle<Device>,
        description: QueueDescription,
    ) -> Self {
        Self {
            api: Some(api.clone()),
            device,
            handle: description.queue,
            queue_type_index: description.queue_type_index,
            flags: description.flags,
        }
    }

    pub fn handle(&self) -> Handle<Queue> {
        self.handle
    }

    pub fn is_valid(&self) -> bool {
        self.handle.is_valid()
    }

    pub fn flags(&self) -> QueueFlags {
        self.flags
    }

    pub fn queue_type_index(&self) -> u32 {
        self.queue_type_index
    }

    pub fn submit(&self, options: &SubmitOptions) -> Result<()> {
        let api = self.api.as_ref().ok_or(GpuError::InvalidHandle("queue"))?;
        let mut queue = api
            .resource_manager()
            .get_queue(self.handle)
            .ok_or(GpuError::InvalidHandle("queue"))?;
        queue.submit(options)
    }

    pub fn present(&self, options: &PresentOptions) -> Vec<PresentResult> {
        let queue = self
            .api
            .as_ref()
            .and_then(|api| api.resource_manager().get_queue(self.handle));
        match queue {
            Some(mut queue) => queue.present(options),
            None => vec![PresentResult::Failed; options.swapchain_infos.len()],
        }
    }

    pub fn wait_until_idle(&self) -> Result<()> {
        let api = self.api.as_ref().ok_or(GpuError::InvalidHandle("queue"))?;
        let mut queue = api
            .resource_manager()
            .get_queue(self.handle)
            .ok_or(GpuError::InvalidHandle("queue"))?;
        queue.wait_until_idle()
    }

    /// Copy `options.data` into a device buffer through a host-visible staging
    /// buffer. The copy is submitted immediately with its own fence.
    pub fn upload_buffer_data(&self, options: &BufferUploadOptions<'_>) -> Result<UploadStagingBuffer> {
        let byte_size = options.data.len() as DeviceSize;
        let (api, buffer) = self.create_staging_buffer(options.data)?;

        let mut recorder = self.create_recorder(api);
        recorder.copy_buffer(&BufferCopy {
            src: buffer.handle(),
            src_offset: 0,
            dst: options.destination_buffer,
            dst_offset: options.dst_offset,
            byte_size,
        });
        recorder.buffer_memory_barrier(&BufferMemoryBarrier {
            src_stages: PipelineStageFlags::TRANSFER,
            src_mask: AccessFlags::TRANSFER_WRITE,
            dst_stages: options.dst_stages,
            dst_mask: options.dst_mask,
            buffer: options.destination_buffer,
            offset: options.dst_offset,
            size: byte_size,
        });

        self.submit_upload(api, buffer, recorder.finish())
    }

    /// Copy `options.data` into a texture, transitioning it from
    /// `old_layout` through TransferDstOptimal to `new_layout`.
    pub fn upload_texture_data(&self, options: &TextureUploadOptions<'_>) -> Result<UploadStagingBuffer> {
        let (api, buffer) = self.create_staging_buffer(options.data)?;
        let aspect_mask = api
            .resource_manager()
            .get_texture(options.destination_texture)
            .map(|texture| texture.format().aspect())
            .ok_or(GpuError::InvalidHandle("texture"))?;
        let range = TextureSubresourceRange {
            aspect_mask,
            ..TextureSubresourceRange::whole()
        };

        let mut recorder = self.create_recorder(api);
        recorder.texture_memory_barrier(&TextureMemoryBarrier {
            src_stages: PipelineStageFlags::TOP_OF_PIPE,
            src_mask: AccessFlags::empty(),
            dst_stages: PipelineStageFlags::TRANSFER,
            dst_mask: AccessFlags::TRANSFER_WRITE,
            old_layout: options.old_layout,
            new_layout: TextureLayout::TransferDstOptimal,
            texture: options.destination_texture,
            range,
        });
        recorder.copy_buffer_to_texture(&BufferTextureCopy {
            src_buffer: buffer.handle(),
            dst_texture: options.destination_texture,
            dst_texture_layout: TextureLayout::TransferDstOptimal,
            regions: options.regions.clone(),
        });
        recorder.texture_memory_barrier(&TextureMemoryBarrier {
            src_stages: PipelineStageFlags::TRANSFER,
            src_mask: AccessFlags::TRANSFER_WRITE,
            dst_stages: options.dst_stages,
            dst_mask: options.dst_mask,
            old_layout: TextureLayout::TransferDstOptimal,
            new_layout: options.new_layout,
            texture: options.destination_texture,
            range,
        });

        self.submit_upload(api, buffer, recorder.finish())
    }

    fn create_staging_buffer(&self, data: &[u8]) -> Result<(&Arc<dyn GraphicsApi>, Buffer)> {
        let api = self.api.as_ref().ok_or(GpuError::InvalidHandle("queue"))?;
        let options = BufferOptions {
            size: data.len() as DeviceSize,
            usage: BufferUsageFlags::TRANSFER_SRC,
            memory_usage: MemoryUsage::CpuOnly,
        };
        let buffer = Buffer::from_parts(
            api,
            self.device,
            api.resource_manager().create_buffer(self.device, &options),
        );
        if !buffer.is_valid() {
            return Err(GpuError::InvalidHandle("staging buffer"));
        }
        buffer.write(0, data)?;
        Ok((api, buffer))
    }

    fn create_recorder(&self, api: &Arc<dyn GraphicsApi>) -> CommandRecorder {
        CommandRecorder::new(api, self.device, &CommandRecorderOptions { queue: self.handle })
    }

    fn submit_upload(
        &self,
        api: &Arc<dyn GraphicsApi>,
        buffer: Buffer,
        command_buffer: CommandBuffer,
    ) -> Result<UploadStagingBuffer> {
        let fence = Fence::from_parts(
            api,
            self.device,
            api.resource_manager()
                .create_fence(self.device, &FenceOptions::default()),
        );
        self.submit(&SubmitOptions {
            command_buffers: vec![command_buffer.handle()],
            signal_fence: Some(fence.handle()),
            ..Default::default()
        })?;
        log::debug!("Submitted upload of {} bytes", buffer.size());

        Ok(UploadStagingBuffer {
            fence,
            buffer,
            command_buffer,
        })
    }
}

impl PartialEq for Queue {
    fn eq(&self, other: &Self) -> bool {
        same_api(&self.api, &other.api) && self.device == other.device && self.handle == other.handle
    }
}

impl Eq for Queue {}

impl std::fmt::Debug for Queue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Queue")
            .field("device", &self.device)
            .field("handle", &self.handle)
            .field("flags", &self.flags)
            .finish()
    }
}
