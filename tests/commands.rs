// Command recording through render and compute passes

mod common;

use common::{dummy_spirv, NullSetup};
use rhi::backend::null::NullCommand;
use rhi::*;

/// Field order is drop order
struct Scene {
    bind_group: BindGroup,
    _uniforms: Buffer,
    pipeline: GraphicsPipeline,
    _layout: PipelineLayout,
    _bind_group_layout: BindGroupLayout,
    _module: ShaderModule,
}

fn scene(setup: &NullSetup) -> Scene {
    let module = setup.device.create_shader_module(&dummy_spirv());
    let bind_group_layout = setup.device.create_bind_group_layout(&BindGroupLayoutOptions {
        bindings: vec![ResourceBindingLayout::new(
            0,
            ResourceBindingType::UniformBuffer,
            ShaderStageFlags::ALL_GRAPHICS,
        )],
    });
    let layout = setup.device.create_pipeline_layout(&PipelineLayoutOptions {
        bind_group_layouts: vec![bind_group_layout.handle()],
        push_constant_ranges: vec![PushConstantRange {
            offset: 0,
            size: 16,
            shader_stages: ShaderStageFlags::VERTEX,
        }],
    });
    let pipeline = setup.device.create_graphics_pipeline(&GraphicsPipelineOptions {
        shader_stages: vec![
            ShaderStage::new(module.handle(), ShaderStageFlags::VERTEX),
            ShaderStage::new(module.handle(), ShaderStageFlags::FRAGMENT),
        ],
        layout: layout.handle(),
        render_targets: vec![RenderTargetOptions {
            format: Format::B8G8R8A8Srgb,
            blending_enabled: false,
        }],
        ..Default::default()
    });
    let uniforms = setup.host_buffer(64);
    let bind_group = setup.device.create_bind_group(&BindGroupOptions {
        layout: bind_group_layout.handle(),
        resources: vec![BindGroupEntry {
            binding: 0,
            resource: BindingResource::uniform_buffer(uniforms.handle()),
        }],
    });

    assert!(pipeline.is_valid());
    assert!(bind_group.is_valid());
    Scene {
        bind_group,
        _uniforms: uniforms,
        pipeline,
        _layout: layout,
        _bind_group_layout: bind_group_layout,
        _module: module,
    }
}

fn color_target(setup: &NullSetup) -> (Texture, TextureView) {
    let texture = setup.device.create_texture(&TextureOptions {
        format: Format::B8G8R8A8Srgb,
        extent: Extent3D {
            width: 32,
            height: 32,
            depth: 1,
        },
        usage: TextureUsageFlags::COLOR_ATTACHMENT,
        ..Default::default()
    });
    let view = texture.create_view(&TextureViewOptions::default());
    (texture, view)
}

#[test]
fn test_render_pass_records_in_order() {
    let setup = NullSetup::new();
    let scene = scene(&setup);
    let (_texture, view) = color_target(&setup);
    let vertices = setup.device_buffer(36);
    let extent = Extent2D {
        width: 32,
        height: 32,
    };

    let mut recorder = setup.device.create_command_recorder(&CommandRecorderOptions::default());
    let mut pass = recorder.begin_render_pass(&RenderPassCommandRecorderOptions {
        color_attachments: vec![ColorAttachment {
            view: view.handle(),
            final_layout: TextureLayout::ShaderReadOnlyOptimal,
            ..Default::default()
        }],
        ..Default::default()
    });
    pass.set_pipeline(&scene.pipeline);
    pass.set_viewport(&Viewport::from_extent(extent));
    pass.set_vertex_buffer(0, &vertices, 0);
    pass.set_bind_group(0, &scene.bind_group);
    pass.push_constant(
        &PushConstantRange {
            offset: 0,
            size: 4,
            shader_stages: ShaderStageFlags::VERTEX,
        },
        &[1, 2, 3, 4],
    );
    pass.draw(&DrawCommand {
        vertex_count: 3,
        ..Default::default()
    });
    pass.end();
    let command_buffer = recorder.finish();
    assert!(command_buffer.is_valid());

    let commands = setup.resources().command_buffer_commands(command_buffer.handle()).unwrap();
    assert_eq!(
        commands,
        vec![
            NullCommand::BeginRenderPass {
                color_attachments: vec![view.handle()],
                depth_attachment: None,
            },
            NullCommand::SetGraphicsPipeline(scene.pipeline.handle()),
            NullCommand::SetViewport(Viewport::from_extent(extent)),
            NullCommand::SetVertexBuffer {
                index: 0,
                buffer: vertices.handle(),
                offset: 0,
            },
            NullCommand::SetBindGroup {
                group: 0,
                bind_group: scene.bind_group.handle(),
                dynamic_offsets: vec![],
            },
            NullCommand::PushConstant {
                range: PushConstantRange {
                    offset: 0,
                    size: 4,
                    shader_stages: ShaderStageFlags::VERTEX,
                },
                data: vec![1, 2, 3, 4],
            },
            NullCommand::Draw(DrawCommand {
                vertex_count: 3,
                instance_count: 1,
                first_vertex: 0,
                first_instance: 0,
            }),
            NullCommand::EndRenderPass,
        ]
    );
}

#[test]
fn test_pass_dropped_without_end_is_closed() {
    let setup = NullSetup::new();
    let (_texture, view) = color_target(&setup);

    let mut recorder = setup.device.create_command_recorder(&CommandRecorderOptions::default());
    {
        let _pass = recorder.begin_render_pass(&RenderPassCommandRecorderOptions {
            color_attachments: vec![ColorAttachment {
                view: view.handle(),
                ..Default::default()
            }],
            ..Default::default()
        });
    }
    let command_buffer = recorder.finish();

    let commands = setup.resources().command_buffer_commands(command_buffer.handle()).unwrap();
    assert_eq!(commands.last(), Some(&NullCommand::EndRenderPass));
}

#[test]
fn test_compute_pass_dispatch() {
    let setup = NullSetup::new();
    let module = setup.device.create_shader_module(&dummy_spirv());
    let layout = setup.device.create_pipeline_layout(&PipelineLayoutOptions::default());
    let pipeline = setup.device.create_compute_pipeline(&ComputePipelineOptions {
        layout: layout.handle(),
        shader_stage: ShaderStage::new(module.handle(), ShaderStageFlags::COMPUTE),
    });
    assert!(pipeline.is_valid());

    let mut recorder = setup.device.create_command_recorder(&CommandRecorderOptions::default());
    let mut pass = recorder.begin_compute_pass();
    pass.set_pipeline(&pipeline);
    pass.dispatch(&ComputeCommand {
        work_group_x: 8,
        work_group_y: 4,
        work_group_z: 1,
    });
    pass.end();
    let command_buffer = recorder.finish();

    let commands = setup.resources().command_buffer_commands(command_buffer.handle()).unwrap();
    assert_eq!(commands.len(), 4);
    assert_eq!(commands[0], NullCommand::BeginComputePass);
    assert_eq!(commands[1], NullCommand::SetComputePipeline(pipeline.handle()));
    assert!(matches!(commands[2], NullCommand::Dispatch(ComputeCommand { work_group_x: 8, .. })));
    assert_eq!(commands[3], NullCommand::EndComputePass);
}

#[test]
fn test_copy_commands_execute_on_submit() {
    let setup = NullSetup::new();
    let source = setup.host_buffer(8);
    source.write(0, &[1, 2, 3, 4, 5, 6, 7, 8]).unwrap();
    let destination = setup.device_buffer(8);

    let mut recorder = setup.device.create_command_recorder(&CommandRecorderOptions::default());
    recorder.copy_buffer(&BufferCopy {
        src: source.handle(),
        src_offset: 2,
        dst: destination.handle(),
        dst_offset: 0,
        byte_size: 4,
    });
    let command_buffer = recorder.finish();

    let fence = setup.device.create_fence(&FenceOptions::default());
    setup
        .queue()
        .submit(&SubmitOptions {
            command_buffers: vec![command_buffer.handle()],
            signal_fence: Some(fence.handle()),
            ..Default::default()
        })
        .unwrap();
    fence.wait().unwrap();

    assert_eq!(
        setup.resources().buffer_contents(destination.handle()).unwrap(),
        vec![3, 4, 5, 6, 0, 0, 0, 0]
    );
}

#[test]
fn test_recorder_defaults_to_first_queue() {
    let setup = NullSetup::new();
    let recorder = setup.device.create_command_recorder(&CommandRecorderOptions::default());
    let command_buffer = recorder.finish();

    assert_eq!(
        setup.resources().command_buffer_queue(command_buffer.handle()),
        Some(setup.queue().handle())
    );
}

#[test]
fn test_submit_rejects_foreign_command_buffer() {
    let a = NullSetup::new();
    let b = NullSetup::new();

    let command_buffer = b
        .device
        .create_command_recorder(&CommandRecorderOptions::default())
        .finish();
    // Same handle values exist in `a`'s backend, but no such command buffer
    let result = a.queue().submit(&SubmitOptions {
        command_buffers: vec![command_buffer.handle()],
        ..Default::default()
    });
    assert!(matches!(result, Err(GpuError::InvalidHandle(_))));
}
