// Shared setup for tests running on the Null backend

#![allow(dead_code)]

use rhi::backend::null::NullResourceManager;
use rhi::backend::NullGraphicsApi;
use rhi::*;
use std::sync::Arc;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A Null backend with a headless surface and a device that can present to it.
///
/// Field order is drop order: the device goes before the instance.
pub struct NullSetup {
    pub device: Device,
    pub adapter: Adapter,
    pub surface: Surface,
    pub instance: Instance,
    pub api: Arc<dyn GraphicsApi>,
    pub null: Arc<NullGraphicsApi>,
}

impl NullSetup {
    pub fn new() -> Self {
        init_logging();

        let null = NullGraphicsApi::new();
        let api: Arc<dyn GraphicsApi> = null.clone();
        let mut instance = api.create_instance(&InstanceOptions::default());
        assert!(instance.is_valid());

        let surface = instance.create_surface(&SurfaceOptions::Headless {
            extent: Extent2D {
                width: 640,
                height: 480,
            },
        });
        assert!(surface.is_valid());

        let AdapterAndDevice { adapter, device } = instance
            .create_default_device(&surface, AdapterDeviceType::DiscreteGpu)
            .expect("Null backend always has a presentable adapter");

        Self {
            device,
            adapter,
            surface,
            instance,
            api,
            null,
        }
    }

    pub fn resources(&self) -> &NullResourceManager {
        self.null.resources()
    }

    pub fn queue(&self) -> &Queue {
        &self.device.queues()[0]
    }

    pub fn frame_loop(&mut self, options: &FrameLoopOptions) -> FrameLoop {
        let device = std::mem::take(&mut self.device);
        FrameLoop::new(device, &self.adapter, &self.surface, options).expect("frame loop on Null backend")
    }

    /// Host-visible buffer of `size` bytes
    pub fn host_buffer(&self, size: DeviceSize) -> Buffer {
        self.device.create_buffer(&BufferOptions {
            size,
            usage: BufferUsageFlags::UNIFORM_BUFFER | BufferUsageFlags::TRANSFER_SRC,
            memory_usage: MemoryUsage::CpuToGpu,
        })
    }

    /// Device-only buffer of `size` bytes
    pub fn device_buffer(&self, size: DeviceSize) -> Buffer {
        self.device.create_buffer(&BufferOptions {
            size,
            usage: BufferUsageFlags::VERTEX_BUFFER | BufferUsageFlags::TRANSFER_DST,
            memory_usage: MemoryUsage::GpuOnly,
        })
    }
}

/// Smallest SPIR-V word stream the Null backend accepts
pub fn dummy_spirv() -> Vec<u32> {
    vec![0x0723_0203, 0x0001_0000, 0, 1, 0]
}
