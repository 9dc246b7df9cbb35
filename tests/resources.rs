// Textures, views, buffers, uploads and fences on the Null backend

mod common;

use common::{dummy_spirv, NullSetup};
use rhi::*;

fn transfer_texture(setup: &NullSetup, width: u32, height: u32) -> Texture {
    setup.device.create_texture(&TextureOptions {
        format: Format::R8G8B8A8Unorm,
        extent: Extent3D {
            width,
            height,
            depth: 1,
        },
        usage: TextureUsageFlags::SAMPLED | TextureUsageFlags::TRANSFER_DST,
        ..Default::default()
    })
}

#[test]
fn test_texture_view_inherits_format() {
    let setup = NullSetup::new();
    let depth = setup.device.create_texture(&TextureOptions {
        format: Format::D32Sfloat,
        extent: Extent3D {
            width: 64,
            height: 64,
            depth: 1,
        },
        usage: TextureUsageFlags::DEPTH_STENCIL_ATTACHMENT,
        ..Default::default()
    });
    assert!(depth.is_valid());
    assert_eq!(depth.format(), Format::D32Sfloat);
    assert_eq!(depth.extent().width, 64);

    let view = depth.create_view(&TextureViewOptions::default());
    assert!(view.is_valid());
    assert_eq!(view.texture_handle(), depth.handle());

    let options = setup.resources().texture_view_options(view.handle()).unwrap();
    assert_eq!(options.format, Format::D32Sfloat);
    assert_eq!(options.range.aspect_mask, TextureAspectFlags::DEPTH);
}

#[test]
fn test_texture_view_outside_texture_is_invalid() {
    let setup = NullSetup::new();
    let texture = transfer_texture(&setup, 8, 8);

    let view = texture.create_view(&TextureViewOptions {
        range: TextureSubresourceRange {
            base_mip_level: 1,
            ..Default::default()
        },
        ..Default::default()
    });
    assert!(!view.is_valid());
}

#[test]
fn test_host_access_rules() {
    let setup = NullSetup::new();

    let device_only = setup.device_buffer(16);
    assert!(device_only.map().is_none());
    assert!(matches!(device_only.write(0, &[1, 2, 3]), Err(GpuError::NotMappable)));

    let host = setup.host_buffer(16);
    assert!(matches!(
        host.write(12, &[0; 8]),
        Err(GpuError::OutOfBounds {
            offset: 12,
            end: 20,
            size: 16
        })
    ));

    host.write(4, &[9, 8, 7, 6]).unwrap();
    assert_eq!(host.read(4, 4).unwrap(), vec![9, 8, 7, 6]);
    assert_eq!(host.read(0, 4).unwrap(), vec![0; 4]);
}

#[test]
fn test_create_buffer_with_data() {
    let setup = NullSetup::new();
    let data: Vec<u8> = (0..32).collect();

    let buffer = setup
        .device
        .create_buffer_with_data(
            &BufferOptions {
                size: 32,
                usage: BufferUsageFlags::STORAGE_BUFFER,
                memory_usage: MemoryUsage::CpuToGpu,
            },
            &data,
        )
        .unwrap();
    assert_eq!(setup.resources().buffer_contents(buffer.handle()).unwrap(), data);

    let too_small = setup.device.create_buffer_with_data(
        &BufferOptions {
            size: 8,
            usage: BufferUsageFlags::STORAGE_BUFFER,
            memory_usage: MemoryUsage::CpuToGpu,
        },
        &data,
    );
    assert!(too_small.is_err());
}

#[test]
fn test_buffer_upload_lands_after_fence() {
    let setup = NullSetup::new();
    setup.resources().set_auto_complete(false);

    let destination = setup.device_buffer(8);
    let data = [1u8, 2, 3, 4];
    let staging = setup
        .queue()
        .upload_buffer_data(&BufferUploadOptions {
            destination_buffer: destination.handle(),
            dst_offset: 4,
            dst_stages: PipelineStageFlags::VERTEX_INPUT,
            dst_mask: AccessFlags::VERTEX_ATTRIBUTE_READ,
            data: &data,
        })
        .unwrap();

    assert_eq!(staging.buffer.size(), 4);
    assert_eq!(staging.fence.status(), FenceStatus::Unsignalled);
    assert_eq!(setup.resources().buffer_contents(destination.handle()).unwrap(), vec![0; 8]);

    staging.fence.wait().unwrap();
    assert_eq!(staging.fence.status(), FenceStatus::Signalled);
    assert_eq!(
        setup.resources().buffer_contents(destination.handle()).unwrap(),
        vec![0, 0, 0, 0, 1, 2, 3, 4]
    );
}

#[test]
fn test_texture_upload_region() {
    let setup = NullSetup::new();
    let texture = transfer_texture(&setup, 4, 2);

    // Two texels into row 1 starting at column 1
    let data = [10u8, 11, 12, 13, 20, 21, 22, 23];
    let staging = setup
        .queue()
        .upload_texture_data(&TextureUploadOptions {
            destination_texture: texture.handle(),
            dst_stages: PipelineStageFlags::FRAGMENT_SHADER,
            dst_mask: AccessFlags::SHADER_READ,
            data: &data,
            old_layout: TextureLayout::Undefined,
            new_layout: TextureLayout::ShaderReadOnlyOptimal,
            regions: vec![BufferTextureCopyRegion {
                texture_offset: Offset3D { x: 1, y: 1, z: 0 },
                texture_extent: Extent3D {
                    width: 2,
                    height: 1,
                    depth: 1,
                },
                ..Default::default()
            }],
        })
        .unwrap();
    assert_eq!(staging.fence.status(), FenceStatus::Signalled);

    let contents = setup.resources().texture_contents(texture.handle()).unwrap();
    assert_eq!(contents.len(), 4 * 2 * 4);
    assert_eq!(&contents[20..28], &data);
    assert!(contents[..20].iter().all(|&b| b == 0));
    assert!(contents[28..].iter().all(|&b| b == 0));
}

#[test]
fn test_sampler_and_shader_module() {
    let setup = NullSetup::new();

    let options = SamplerOptions {
        mag_filter: FilterMode::Nearest,
        u: AddressMode::ClampToEdge,
        ..Default::default()
    };
    let sampler = setup.device.create_sampler(&options);
    assert_eq!(setup.resources().sampler_options(sampler.handle()), Some(options));

    let code = dummy_spirv();
    let module = setup.device.create_shader_module(&code);
    assert_eq!(setup.resources().shader_module_size(module.handle()), Some(code.len()));
}

#[test]
fn test_fence_states() {
    let setup = NullSetup::new();

    let signalled = setup.device.create_fence(&FenceOptions {
        create_signalled: true,
    });
    assert_eq!(signalled.status(), FenceStatus::Signalled);
    signalled.wait().unwrap();
    signalled.reset();
    assert_eq!(signalled.status(), FenceStatus::Unsignalled);

    // Nothing will ever signal it
    assert!(matches!(signalled.wait(), Err(GpuError::Timeout)));

    assert_eq!(Fence::default().status(), FenceStatus::Unsignalled);
    assert!(Fence::default().wait().is_err());
}

#[test]
fn test_fence_signalled_by_submission() {
    let setup = NullSetup::new();
    let rm = setup.resources();
    rm.set_auto_complete(false);

    let fence = setup.device.create_fence(&FenceOptions::default());
    let command_buffer = setup
        .device
        .create_command_recorder(&CommandRecorderOptions::default())
        .finish();
    setup
        .queue()
        .submit(&SubmitOptions {
            command_buffers: vec![command_buffer.handle()],
            signal_fence: Some(fence.handle()),
            ..Default::default()
        })
        .unwrap();

    assert_eq!(rm.pending_submissions(), 1);
    assert_eq!(fence.status(), FenceStatus::Unsignalled);

    fence.wait().unwrap();
    assert_eq!(rm.pending_submissions(), 0);
    assert_eq!(fence.status(), FenceStatus::Signalled);
}

#[test]
fn test_device_loss_is_reported() {
    let setup = NullSetup::new();
    let fence = setup.device.create_fence(&FenceOptions {
        create_signalled: true,
    });

    setup.resources().lose_device();

    assert!(matches!(fence.wait(), Err(GpuError::DeviceLost)));
    assert!(matches!(setup.device.wait_until_idle(), Err(GpuError::DeviceLost)));
    let submit = setup.queue().submit(&SubmitOptions::default());
    assert!(matches!(submit, Err(GpuError::DeviceLost)));
}
