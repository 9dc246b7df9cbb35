// Frame pacing and presentation
//
// FrameLoop owns the device, the swapchain and one set of sync objects per
// frame in flight. Each frame:
//
//   wait fence[i] -> acquire (signals present_complete[i]) -> record
//   -> reset fence[i] -> submit (waits present_complete[i], signals
//   render_complete[i] and fence[i]) -> present (waits render_complete[i])
//   -> release finished staging buffers -> i = (i + 1) % frames_in_flight
//
// An OutOfDate acquire recreates the swapchain once and retries; a second
// failure skips the frame. A failed submit skips the frame with fresh sync
// objects for the slot. Device loss is returned to the caller.

use crate::adapter::{Adapter, SurfaceFormat};
use crate::command_recorder::{CommandBuffer, CommandRecorder, CommandRecorderOptions};
use crate::device::Device;
use crate::error::{GpuError, Result};
use crate::gpu_core::{
    AcquireImageResult, Extent2D, FenceStatus, Format, PresentMode, PresentResult, TextureUsageFlags,
};
use crate::handle::Handle;
use crate::instance::Surface;
use crate::queue::{
    BufferUploadOptions, PresentOptions, PresentSwapchainInfo, Queue, SubmitOptions, TextureUploadOptions,
    UploadStagingBuffer,
};
use crate::swapchain::{Swapchain, SwapchainOptions};
use crate::sync::{Fence, FenceOptions, GpuSemaphore, GpuSemaphoreOptions};
use crate::texture::{Texture, TextureOptions};
use crate::texture_view::{TextureView, TextureViewOptions};

pub const MAX_FRAMES_IN_FLIGHT: usize = 2;

#[derive(Debug, Clone, PartialEq)]
pub struct FrameLoopOptions {
    pub extent: Extent2D,
    pub frames_in_flight: usize,
    /// Tried in order; falls back to the first format the surface reports
    pub preferred_formats: Vec<Format>,
    /// Falls back to FIFO when unsupported
    pub present_mode: PresentMode,
    pub min_image_count: u32,
    /// Create a depth texture matching the swapchain extent
    pub depth_format: Option<Format>,
}

impl Default for FrameLoopOptions {
    fn default() -> Self {
        Self {
            extent: Extent2D {
                width: 1280,
                height: 720,
            },
            frames_in_flight: MAX_FRAMES_IN_FLIGHT,
            preferred_formats: vec![Format::B8G8R8A8Srgb, Format::R8G8B8A8Srgb],
            present_mode: PresentMode::Mailbox,
            min_image_count: 3,
            depth_format: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    Presented { image_index: u32 },
    /// Nothing was submitted (minimized, or the swapchain image was unavailable)
    Skipped,
}

/// What the record callback renders into this frame
pub struct FrameTarget<'a> {
    pub image_index: u32,
    pub in_flight_index: usize,
    pub extent: Extent2D,
    pub format: Format,
    pub color_view: &'a TextureView,
    pub depth_view: Option<&'a TextureView>,
}

/// Sync objects of one frame in flight
struct FrameSync {
    present_complete: GpuSemaphore,
    render_complete: GpuSemaphore,
    in_flight: Fence,
    /// Commands of the last submission from this slot, freed once its fence
    /// has been waited on
    command_buffer: Option<CommandBuffer>,
    /// An image was acquired into `present_complete` but no submit consumed it
    acquire_pending: bool,
}

impl FrameSync {
    fn new(device: &Device) -> Self {
        Self {
            present_complete: device.create_gpu_semaphore(&GpuSemaphoreOptions::default()),
            render_complete: device.create_gpu_semaphore(&GpuSemaphoreOptions::default()),
            in_flight: device.create_fence(&FenceOptions {
                create_signalled: true,
            }),
            command_buffer: None,
            acquire_pending: false,
        }
    }

    /// A signalled semaphore that nothing waits on cannot be passed to the
    /// next acquire, so swap in a fresh one
    fn discard_acquire(&mut self, device: &Device) {
        self.present_complete = device.create_gpu_semaphore(&GpuSemaphoreOptions::default());
        self.acquire_pending = false;
    }
}

// Field order is drop order: everything created from the device goes first
pub struct FrameLoop {
    frames: Vec<FrameSync>,
    staging_buffers: Vec<UploadStagingBuffer>,
    depth_view: TextureView,
    depth_texture: Texture,
    swapchain_views: Vec<TextureView>,
    swapchain: Swapchain,
    queue: Queue,
    surface: Handle<Surface>,
    surface_format: SurfaceFormat,
    present_mode: PresentMode,
    depth_format: Option<Format>,
    min_image_count: u32,
    extent: Extent2D,
    in_flight_index: usize,
    needs_recreate: bool,
    recreate_count: u32,
    frame_number: u64,
    device: Device,
}

impl FrameLoop {
    pub fn new(device: Device, adapter: &Adapter, surface: &Surface, options: &FrameLoopOptions) -> Result<Self> {
        let queue = device
            .queues()
            .first()
            .cloned()
            .ok_or(GpuError::InvalidHandle("queue"))?;

        let properties = adapter.swapchain_properties(surface);
        let surface_format = properties
            .select_format(&options.preferred_formats)
            .ok_or_else(|| GpuError::UnsupportedSurface("surface reports no formats".to_string()))?;
        let present_mode = properties.select_present_mode(&[options.present_mode]);

        let capabilities = properties.capabilities;
        let mut min_image_count = options.min_image_count.max(capabilities.min_image_count);
        if capabilities.max_image_count > 0 {
            min_image_count = min_image_count.min(capabilities.max_image_count);
        }

        log::info!(
            "Frame loop: {:?} {:?}, {:?}, {} frames in flight",
            surface_format.format,
            surface_format.color_space,
            present_mode,
            options.frames_in_flight.max(1)
        );

        let frames = (0..options.frames_in_flight.max(1))
            .map(|_| FrameSync::new(&device))
            .collect();

        let mut frame_loop = Self {
            frames,
            staging_buffers: Vec::new(),
            depth_view: TextureView::default(),
            depth_texture: Texture::default(),
            swapchain_views: Vec::new(),
            swapchain: Swapchain::default(),
            queue,
            surface: surface.handle(),
            surface_format,
            present_mode,
            depth_format: options.depth_format,
            min_image_count,
            extent: options.extent,
            in_flight_index: 0,
            needs_recreate: false,
            recreate_count: 0,
            frame_number: 0,
            device,
        };

        if !frame_loop.extent.is_empty() {
            frame_loop.create_swapchain_resources();
        }
        Ok(frame_loop)
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn queue(&self) -> &Queue {
        &self.queue
    }

    pub fn swapchain(&self) -> &Swapchain {
        &self.swapchain
    }

    pub fn extent(&self) -> Extent2D {
        self.extent
    }

    pub fn format(&self) -> Format {
        self.surface_format.format
    }

    pub fn depth_format(&self) -> Option<Format> {
        self.depth_format
    }

    pub fn frames_in_flight(&self) -> usize {
        self.frames.len()
    }

    pub fn in_flight_index(&self) -> usize {
        self.in_flight_index
    }

    /// Swapchain recreations since creation
    pub fn recreate_count(&self) -> u32 {
        self.recreate_count
    }

    pub fn frame_number(&self) -> u64 {
        self.frame_number
    }

    pub fn staging_buffer_count(&self) -> usize {
        self.staging_buffers.len()
    }

    /// New surface size; the swapchain is recreated on the next frame.
    /// A zero extent pauses rendering.
    pub fn resize(&mut self, extent: Extent2D) {
        if extent != self.extent {
            log::debug!("Frame loop resized to {}x{}", extent.width, extent.height);
            self.extent = extent;
            self.needs_recreate = true;
        }
    }

    pub fn upload_buffer_data(&mut self, options: &BufferUploadOptions<'_>) -> Result<()> {
        let staging = self.queue.upload_buffer_data(options)?;
        self.staging_buffers.push(staging);
        Ok(())
    }

    pub fn upload_texture_data(&mut self, options: &TextureUploadOptions<'_>) -> Result<()> {
        let staging = self.queue.upload_texture_data(options)?;
        self.staging_buffers.push(staging);
        Ok(())
    }

    /// Drop staging buffers whose uploads the GPU has finished
    pub fn release_staging_buffers(&mut self) {
        let before = self.staging_buffers.len();
        self.staging_buffers
            .retain(|staging| staging.fence.status() != FenceStatus::Signalled);
        let released = before - self.staging_buffers.len();
        if released > 0 {
            log::debug!("Released {} staging buffers", released);
        }
    }

    pub fn recreate_swapchain(&mut self) {
        if let Err(e) = self.device.wait_until_idle() {
            log::warn!("wait_until_idle before swapchain recreation failed: {}", e);
        }
        self.create_swapchain_resources();
        self.recreate_count += 1;
    }

    fn create_swapchain_resources(&mut self) {
        self.needs_recreate = false;
        if self.extent.is_empty() {
            return;
        }

        log::info!("Creating swapchain: {}x{}", self.extent.width, self.extent.height);

        // Views of the old images go before the swapchain that owns them
        self.swapchain_views.clear();
        self.swapchain = self.device.create_swapchain(&SwapchainOptions {
            surface: self.surface,
            format: self.surface_format.format,
            color_space: self.surface_format.color_space,
            min_image_count: self.min_image_count,
            image_extent: self.extent,
            image_usage: TextureUsageFlags::COLOR_ATTACHMENT | TextureUsageFlags::TRANSFER_DST,
            present_mode: self.present_mode,
            old_swapchain: self.swapchain.handle(),
            ..Default::default()
        });

        if !self.swapchain.is_valid() {
            log::error!("Swapchain creation failed");
            return;
        }

        let view_options = TextureViewOptions {
            format: self.surface_format.format,
            ..Default::default()
        };
        self.swapchain_views = self
            .swapchain
            .textures()
            .iter()
            .map(|texture| texture.create_view(&view_options))
            .collect();

        if let Some(format) = self.depth_format {
            self.depth_view = TextureView::default();
            self.depth_texture = self.device.create_texture(&TextureOptions {
                format,
                extent: self.extent.into(),
                usage: TextureUsageFlags::DEPTH_STENCIL_ATTACHMENT,
                ..Default::default()
            });
            self.depth_view = self.depth_texture.create_view(&TextureViewOptions::default());
        }
    }

    /// Run one iteration of the frame protocol, recording commands with
    /// `record`. Only device loss and fence timeouts are errors.
    pub fn render_frame<F>(&mut self, record: F) -> Result<FrameOutcome>
    where
        F: FnOnce(&mut CommandRecorder, &FrameTarget<'_>),
    {
        if self.extent.is_empty() {
            return Ok(FrameOutcome::Skipped);
        }
        if self.needs_recreate || !self.swapchain.is_valid() {
            self.recreate_swapchain();
            if !self.swapchain.is_valid() {
                return Ok(FrameOutcome::Skipped);
            }
        }

        let slot = self.in_flight_index;

        // The GPU must be done with this slot before its objects are reused
        self.frames[slot].in_flight.wait()?;
        self.frames[slot].command_buffer = None;
        if self.frames[slot].acquire_pending {
            log::warn!("Frame slot {} was abandoned after acquire", slot);
            self.frames[slot].discard_acquire(&self.device);
        }

        let Some(image_index) = self.acquire_image(slot)? else {
            return Ok(FrameOutcome::Skipped);
        };
        self.frames[slot].acquire_pending = true;

        let Some(color_view) = self.swapchain_views.get(image_index as usize) else {
            log::error!("Acquired image index {} out of range", image_index);
            self.frames[slot].discard_acquire(&self.device);
            return Ok(FrameOutcome::Skipped);
        };

        let mut recorder = self.device.create_command_recorder(&CommandRecorderOptions {
            queue: self.queue.handle(),
        });
        let target = FrameTarget {
            image_index,
            in_flight_index: slot,
            extent: self.extent,
            format: self.surface_format.format,
            color_view,
            depth_view: self.depth_view.is_valid().then_some(&self.depth_view),
        };
        record(&mut recorder, &target);
        let command_buffer = recorder.finish();

        let frame = &mut self.frames[slot];
        // Only reset once work that signals the fence is about to be submitted
        frame.in_flight.reset();
        let submitted = self.queue.submit(&SubmitOptions {
            command_buffers: vec![command_buffer.handle()],
            wait_semaphores: vec![frame.present_complete.handle()],
            signal_semaphores: vec![frame.render_complete.handle()],
            signal_fence: Some(frame.in_flight.handle()),
        });
        match submitted {
            Ok(()) => frame.acquire_pending = false,
            Err(GpuError::DeviceLost) => return Err(GpuError::DeviceLost),
            Err(e) => {
                // Nothing will signal the reset fence; give the slot a fresh one
                log::error!("Frame submit failed, skipping frame: {}", e);
                frame.in_flight = self.device.create_fence(&FenceOptions {
                    create_signalled: true,
                });
                frame.discard_acquire(&self.device);
                self.in_flight_index = (slot + 1) % self.frames.len();
                return Ok(FrameOutcome::Skipped);
            }
        }

        let frame = &self.frames[slot];
        let results = self.queue.present(&PresentOptions {
            wait_semaphores: vec![frame.render_complete.handle()],
            swapchain_infos: vec![PresentSwapchainInfo {
                swapchain: self.swapchain.handle(),
                image_index,
            }],
        });
        self.frames[slot].command_buffer = Some(command_buffer);

        for result in results {
            match result {
                PresentResult::Success => {}
                PresentResult::Suboptimal | PresentResult::OutOfDate => self.needs_recreate = true,
                PresentResult::DeviceLost => return Err(GpuError::DeviceLost),
                other => log::error!("Present failed: {:?}", other),
            }
        }

        self.release_staging_buffers();
        self.in_flight_index = (slot + 1) % self.frames.len();
        self.frame_number += 1;

        Ok(FrameOutcome::Presented { image_index })
    }

    /// `Ok(None)` means skip this frame
    fn acquire_image(&mut self, slot: usize) -> Result<Option<u32>> {
        let mut recreated = false;
        loop {
            let (result, image_index) = self
                .swapchain
                .get_next_image_index(&self.frames[slot].present_complete);

            match result {
                AcquireImageResult::Success => return Ok(Some(image_index)),
                AcquireImageResult::Suboptimal => {
                    self.needs_recreate = true;
                    return Ok(Some(image_index));
                }
                AcquireImageResult::OutOfDate if !recreated => {
                    log::debug!("Swapchain out of date, recreating");
                    recreated = true;
                    self.recreate_swapchain();
                    if !self.swapchain.is_valid() {
                        return Ok(None);
                    }
                }
                AcquireImageResult::DeviceLost => return Err(GpuError::DeviceLost),
                other => {
                    if other == AcquireImageResult::OutOfDate {
                        self.needs_recreate = true;
                    }
                    log::error!("Unable to acquire swapchain image: {:?}", other);
                    return Ok(None);
                }
            }
        }
    }
}

impl Drop for FrameLoop {
    fn drop(&mut self) {
        if let Err(e) = self.device.wait_until_idle() {
            log::warn!("wait_until_idle on frame loop shutdown failed: {}", e);
        }
    }
}
