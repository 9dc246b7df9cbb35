// The per-frame acquire/submit/present protocol against the Null backend

mod common;

use common::NullSetup;
use rhi::*;

fn options() -> FrameLoopOptions {
    FrameLoopOptions {
        extent: Extent2D {
            width: 640,
            height: 480,
        },
        ..Default::default()
    }
}

/// Clear the acquired image and nothing else
fn clear(recorder: &mut CommandRecorder, target: &FrameTarget<'_>) {
    let pass = recorder.begin_render_pass(&RenderPassCommandRecorderOptions {
        color_attachments: vec![ColorAttachment {
            view: target.color_view.handle(),
            ..Default::default()
        }],
        ..Default::default()
    });
    pass.end();
}

#[test]
fn test_frame_presents_and_rotates_slots() {
    let mut setup = NullSetup::new();
    let mut frame_loop = setup.frame_loop(&options());

    assert_eq!(frame_loop.frames_in_flight(), MAX_FRAMES_IN_FLIGHT);
    assert_eq!(frame_loop.format(), Format::B8G8R8A8Srgb);
    assert_eq!(frame_loop.swapchain().textures().len(), 3);

    let mut slots = Vec::new();
    for expected_image in [0, 1, 2, 0] {
        let outcome = frame_loop
            .render_frame(|recorder, target| {
                slots.push(target.in_flight_index);
                assert_eq!(target.extent, options().extent);
                assert!(target.depth_view.is_none());
                clear(recorder, target);
            })
            .unwrap();
        assert_eq!(
            outcome,
            FrameOutcome::Presented {
                image_index: expected_image
            }
        );
    }

    assert_eq!(slots, vec![0, 1, 0, 1]);
    assert_eq!(frame_loop.frame_number(), 4);
    assert_eq!(setup.resources().presented().len(), 4);
    assert_eq!(setup.resources().submission_count(), 4);
    assert_eq!(frame_loop.recreate_count(), 0);
}

#[test]
fn test_submission_carries_recorded_commands() {
    let mut setup = NullSetup::new();
    let mut frame_loop = setup.frame_loop(&options());

    let mut color_view = Handle::default();
    frame_loop
        .render_frame(|recorder, target| {
            color_view = target.color_view.handle();
            clear(recorder, target);
        })
        .unwrap();

    assert_eq!(
        setup.resources().last_submission(),
        vec![
            rhi::backend::null::NullCommand::BeginRenderPass {
                color_attachments: vec![color_view],
                depth_attachment: None,
            },
            rhi::backend::null::NullCommand::EndRenderPass,
        ]
    );
}

#[test]
fn test_out_of_date_acquire_recreates_once_and_retries() {
    let mut setup = NullSetup::new();
    let mut frame_loop = setup.frame_loop(&options());
    assert_eq!(setup.resources().swapchain_creation_count(), 1);
    let old_swapchain = frame_loop.swapchain().handle();

    setup.resources().script_acquire_results([AcquireImageResult::OutOfDate]);
    let outcome = frame_loop.render_frame(clear).unwrap();

    assert_eq!(outcome, FrameOutcome::Presented { image_index: 0 });
    assert_eq!(frame_loop.recreate_count(), 1);
    assert_eq!(setup.resources().swapchain_creation_count(), 2);
    assert_ne!(frame_loop.swapchain().handle(), old_swapchain);
    assert!(setup.api.resource_manager().get_swapchain(old_swapchain).is_none());
    assert_eq!(setup.resources().submission_count(), 1);
}

#[test]
fn test_second_out_of_date_skips_frame() {
    let mut setup = NullSetup::new();
    let mut frame_loop = setup.frame_loop(&options());

    setup
        .resources()
        .script_acquire_results([AcquireImageResult::OutOfDate, AcquireImageResult::OutOfDate]);
    let mut recorded = false;
    let outcome = frame_loop
        .render_frame(|recorder, target| {
            recorded = true;
            clear(recorder, target);
        })
        .unwrap();

    assert_eq!(outcome, FrameOutcome::Skipped);
    assert!(!recorded);
    assert_eq!(frame_loop.recreate_count(), 1);
    assert_eq!(setup.resources().submission_count(), 0);

    // The skipped frame left its fence signalled, so the next frame runs
    let outcome = frame_loop.render_frame(clear).unwrap();
    assert!(matches!(outcome, FrameOutcome::Presented { .. }));
    assert_eq!(frame_loop.recreate_count(), 2);
    assert_eq!(setup.resources().submission_count(), 1);
}

#[test]
fn test_suboptimal_present_recreates_next_frame() {
    let mut setup = NullSetup::new();
    let mut frame_loop = setup.frame_loop(&options());

    setup.resources().script_present_results([PresentResult::Suboptimal]);
    frame_loop.render_frame(clear).unwrap();
    assert_eq!(frame_loop.recreate_count(), 0);

    frame_loop.render_frame(clear).unwrap();
    assert_eq!(frame_loop.recreate_count(), 1);
}

#[test]
fn test_device_lost_is_returned() {
    let mut setup = NullSetup::new();
    let mut frame_loop = setup.frame_loop(&options());
    frame_loop.render_frame(clear).unwrap();

    setup.resources().lose_device();
    assert!(matches!(frame_loop.render_frame(clear), Err(GpuError::DeviceLost)));
}

#[test]
fn test_device_lost_on_present() {
    let mut setup = NullSetup::new();
    let mut frame_loop = setup.frame_loop(&options());

    setup.resources().script_present_results([PresentResult::DeviceLost]);
    assert!(matches!(frame_loop.render_frame(clear), Err(GpuError::DeviceLost)));
}

#[test]
fn test_zero_extent_pauses_rendering() {
    let mut setup = NullSetup::new();
    let mut frame_loop = setup.frame_loop(&options());

    frame_loop.resize(Extent2D::default());
    assert_eq!(frame_loop.render_frame(clear).unwrap(), FrameOutcome::Skipped);
    assert_eq!(setup.resources().submission_count(), 0);

    let restored = Extent2D {
        width: 800,
        height: 600,
    };
    frame_loop.resize(restored);
    let outcome = frame_loop
        .render_frame(|recorder, target| {
            assert_eq!(target.extent, restored);
            clear(recorder, target);
        })
        .unwrap();
    assert!(matches!(outcome, FrameOutcome::Presented { .. }));
    assert_eq!(frame_loop.recreate_count(), 1);
    assert_eq!(frame_loop.swapchain().textures()[0].extent().width, 800);
}

#[test]
fn test_depth_attachment_follows_swapchain() {
    let mut setup = NullSetup::new();
    let mut frame_loop = setup.frame_loop(&FrameLoopOptions {
        depth_format: Some(Format::D32Sfloat),
        ..options()
    });

    let mut depth = Handle::default();
    frame_loop
        .render_frame(|recorder, target| {
            depth = target.depth_view.map(|view| view.handle()).unwrap_or_default();
            clear(recorder, target);
        })
        .unwrap();
    assert!(depth.is_valid());

    let view_options = setup.resources().texture_view_options(depth).unwrap();
    assert_eq!(view_options.format, Format::D32Sfloat);
}

#[test]
fn test_staging_released_only_after_fence() {
    let mut setup = NullSetup::new();
    setup.resources().set_auto_complete(false);
    let vertex_buffer = setup.device_buffer(16);
    let mut frame_loop = setup.frame_loop(&options());

    frame_loop
        .upload_buffer_data(&BufferUploadOptions {
            destination_buffer: vertex_buffer.handle(),
            dst_offset: 0,
            dst_stages: PipelineStageFlags::VERTEX_INPUT,
            dst_mask: AccessFlags::VERTEX_ATTRIBUTE_READ,
            data: &[7; 16],
        })
        .unwrap();
    assert_eq!(frame_loop.staging_buffer_count(), 1);

    // Still in flight: a frame must not reclaim it
    frame_loop.render_frame(clear).unwrap();
    assert_eq!(frame_loop.staging_buffer_count(), 1);
    frame_loop.release_staging_buffers();
    assert_eq!(frame_loop.staging_buffer_count(), 1);
    assert_eq!(setup.resources().buffer_contents(vertex_buffer.handle()).unwrap(), vec![0; 16]);

    assert_eq!(setup.resources().retire_submissions(), 2);
    frame_loop.release_staging_buffers();
    assert_eq!(frame_loop.staging_buffer_count(), 0);
    assert_eq!(setup.resources().buffer_contents(vertex_buffer.handle()).unwrap(), vec![7; 16]);
}

#[test]
fn test_fence_bounds_frames_in_flight() {
    let mut setup = NullSetup::new();
    setup.resources().set_auto_complete(false);
    let mut frame_loop = setup.frame_loop(&options());

    frame_loop.render_frame(clear).unwrap();
    frame_loop.render_frame(clear).unwrap();
    assert_eq!(setup.resources().pending_submissions(), 2);

    // Slot 0 again: waiting on its fence retires the first frame's work
    frame_loop.render_frame(clear).unwrap();
    assert_eq!(setup.resources().pending_submissions(), 2);
    assert_eq!(setup.resources().submission_count(), 3);
}

#[test]
fn test_failed_submit_skips_frame_and_loop_recovers() {
    let mut setup = NullSetup::new();
    let mut frame_loop = setup.frame_loop(&options());

    // An invalid recorder finishes into an invalid command buffer, which submit rejects
    let outcome = frame_loop
        .render_frame(|recorder, _| *recorder = CommandRecorder::default())
        .unwrap();
    assert_eq!(outcome, FrameOutcome::Skipped);
    assert_eq!(frame_loop.in_flight_index(), 1);
    assert_eq!(setup.resources().submission_count(), 0);

    // Both slots are usable again, including the one whose submit failed
    for _ in 0..3 {
        let outcome = frame_loop.render_frame(clear).unwrap();
        assert!(matches!(outcome, FrameOutcome::Presented { .. }));
    }
    assert_eq!(setup.resources().submission_count(), 3);
}

#[test]
fn test_panicking_record_leaves_slot_usable() {
    let mut setup = NullSetup::new();
    let mut frame_loop = setup.frame_loop(&options());

    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        let _ = frame_loop.render_frame(|_, _| panic!("recording failed"));
    }));
    assert!(result.is_err());
    assert_eq!(frame_loop.in_flight_index(), 0);

    // The slot's fence was never reset, so this frame does not time out
    let outcome = frame_loop.render_frame(clear).unwrap();
    assert!(matches!(outcome, FrameOutcome::Presented { .. }));
    assert_eq!(setup.resources().submission_count(), 1);
}
