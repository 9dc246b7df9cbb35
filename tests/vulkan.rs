// Smoke tests on a real Vulkan driver. Run with `cargo test -- --ignored`.

mod common;

use common::init_logging;
use rhi::*;

fn vulkan_device() -> (std::sync::Arc<dyn GraphicsApi>, Instance, Adapter, Device) {
    init_logging();
    let api = create_graphics_api(BackendType::Vulkan).expect("Vulkan library");
    let mut instance = api.create_instance(&InstanceOptions {
        application_name: "rhi smoke test".to_string(),
        enable_validation: false,
        ..Default::default()
    });
    assert!(instance.is_valid());

    let adapter = instance
        .select_adapter(AdapterDeviceType::DiscreteGpu)
        .expect("a Vulkan 1.3 adapter");
    let device = adapter.create_device(&DeviceOptions::default());
    assert!(device.is_valid());
    (api, instance, adapter, device)
}

#[test]
#[ignore = "needs a Vulkan driver"]
fn test_vulkan_buffer_round_trip() {
    let (_api, _instance, _adapter, device) = vulkan_device();

    let data: Vec<u8> = (0..=255).collect();
    let buffer = device
        .create_buffer_with_data(
            &BufferOptions {
                size: data.len() as DeviceSize,
                usage: BufferUsageFlags::STORAGE_BUFFER,
                memory_usage: MemoryUsage::CpuToGpu,
            },
            &data,
        )
        .unwrap();
    assert_eq!(buffer.read(0, data.len()).unwrap(), data);
}

#[test]
#[ignore = "needs a Vulkan driver"]
fn test_vulkan_upload_and_fence() {
    let (_api, _instance, _adapter, device) = vulkan_device();
    let queue = device.queues()[0].clone();

    let destination = device.create_buffer(&BufferOptions {
        size: 64,
        usage: BufferUsageFlags::TRANSFER_DST | BufferUsageFlags::TRANSFER_SRC,
        memory_usage: MemoryUsage::GpuOnly,
    });
    let staging = queue
        .upload_buffer_data(&BufferUploadOptions {
            destination_buffer: destination.handle(),
            dst_offset: 0,
            dst_stages: PipelineStageFlags::TRANSFER,
            dst_mask: AccessFlags::TRANSFER_READ,
            data: &[42; 64],
        })
        .unwrap();
    staging.fence.wait().unwrap();
    assert_eq!(staging.fence.status(), FenceStatus::Signalled);

    let readback = device.create_buffer(&BufferOptions {
        size: 64,
        usage: BufferUsageFlags::TRANSFER_DST,
        memory_usage: MemoryUsage::GpuToCpu,
    });
    let mut recorder = device.create_command_recorder(&CommandRecorderOptions::default());
    recorder.copy_buffer(&BufferCopy {
        src: destination.handle(),
        src_offset: 0,
        dst: readback.handle(),
        dst_offset: 0,
        byte_size: 64,
    });
    let command_buffer = recorder.finish();
    let fence = device.create_fence(&FenceOptions::default());
    queue
        .submit(&SubmitOptions {
            command_buffers: vec![command_buffer.handle()],
            signal_fence: Some(fence.handle()),
            ..Default::default()
        })
        .unwrap();
    fence.wait().unwrap();

    assert_eq!(readback.read(0, 64).unwrap(), vec![42; 64]);
}

#[test]
#[ignore = "needs a Vulkan driver"]
fn test_vulkan_texture_view_and_sampler() {
    let (_api, _instance, _adapter, device) = vulkan_device();

    let texture = device.create_texture(&TextureOptions {
        format: Format::R8G8B8A8Unorm,
        extent: Extent3D {
            width: 16,
            height: 16,
            depth: 1,
        },
        usage: TextureUsageFlags::SAMPLED | TextureUsageFlags::TRANSFER_DST,
        ..Default::default()
    });
    assert!(texture.is_valid());
    let view = texture.create_view(&TextureViewOptions::default());
    assert!(view.is_valid());
    assert_eq!(view.texture_handle(), texture.handle());

    let sampler = device.create_sampler(&SamplerOptions::default());
    assert!(sampler.is_valid());
}
