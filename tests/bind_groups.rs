// Bind group layouts, bind groups, and deletion cascading from the device

mod common;

use common::NullSetup;
use rhi::*;

fn uniform_layout(setup: &NullSetup) -> BindGroupLayout {
    setup.device.create_bind_group_layout(&BindGroupLayoutOptions {
        bindings: vec![ResourceBindingLayout::new(
            0,
            ResourceBindingType::UniformBuffer,
            ShaderStageFlags::VERTEX,
        )],
    })
}

#[test]
fn test_bind_group_with_uniform_buffer() {
    let setup = NullSetup::new();
    let layout = uniform_layout(&setup);
    assert!(layout.is_valid());
    assert_eq!(layout.bindings().len(), 1);

    let buffer = setup.host_buffer(64);
    let bind_group = setup.device.create_bind_group(&BindGroupOptions {
        layout: layout.handle(),
        resources: vec![BindGroupEntry {
            binding: 0,
            resource: BindingResource::uniform_buffer(buffer.handle()),
        }],
    });
    assert!(bind_group.is_valid());

    let entries = setup.resources().bind_group_entries(bind_group.handle()).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].resource, BindingResource::uniform_buffer(buffer.handle()));
}

#[test]
fn test_bind_group_update_replaces_binding() {
    let setup = NullSetup::new();
    let layout = uniform_layout(&setup);
    let first = setup.host_buffer(64);
    let second = setup.host_buffer(64);

    let bind_group = setup.device.create_bind_group(&BindGroupOptions {
        layout: layout.handle(),
        resources: vec![BindGroupEntry {
            binding: 0,
            resource: BindingResource::uniform_buffer(first.handle()),
        }],
    });

    bind_group.update(&BindGroupEntry {
        binding: 0,
        resource: BindingResource::uniform_buffer(second.handle()),
    });
    let entries = setup.resources().bind_group_entries(bind_group.handle()).unwrap();
    assert_eq!(entries, vec![BindGroupEntry {
        binding: 0,
        resource: BindingResource::uniform_buffer(second.handle()),
    }]);

    // A resource of the wrong type is rejected and the binding kept
    bind_group.update(&BindGroupEntry {
        binding: 0,
        resource: BindingResource::storage_buffer(first.handle()),
    });
    let entries = setup.resources().bind_group_entries(bind_group.handle()).unwrap();
    assert_eq!(entries[0].resource, BindingResource::uniform_buffer(second.handle()));
}

#[test]
fn test_bind_group_rejects_mismatched_layout() {
    let setup = NullSetup::new();
    let layout = uniform_layout(&setup);
    let buffer = setup.host_buffer(64);

    let wrong_binding = setup.device.create_bind_group(&BindGroupOptions {
        layout: layout.handle(),
        resources: vec![BindGroupEntry {
            binding: 3,
            resource: BindingResource::uniform_buffer(buffer.handle()),
        }],
    });
    assert!(!wrong_binding.is_valid());

    let no_layout = setup.device.create_bind_group(&BindGroupOptions::default());
    assert!(!no_layout.is_valid());
}

#[test]
fn test_duplicate_layout_bindings_rejected() {
    let setup = NullSetup::new();
    let layout = setup.device.create_bind_group_layout(&BindGroupLayoutOptions {
        bindings: vec![
            ResourceBindingLayout::new(0, ResourceBindingType::UniformBuffer, ShaderStageFlags::VERTEX),
            ResourceBindingLayout::new(0, ResourceBindingType::Sampler, ShaderStageFlags::FRAGMENT),
        ],
    });
    assert!(!layout.is_valid());
}

#[test]
fn test_device_drop_cascades_to_children() {
    let mut setup = NullSetup::new();
    let layout = uniform_layout(&setup);
    let buffer = setup.host_buffer(64);
    let bind_group = setup.device.create_bind_group(&BindGroupOptions {
        layout: layout.handle(),
        resources: vec![BindGroupEntry {
            binding: 0,
            resource: BindingResource::uniform_buffer(buffer.handle()),
        }],
    });
    let pipeline_layout = setup.device.create_pipeline_layout(&PipelineLayoutOptions {
        bind_group_layouts: vec![layout.handle()],
        ..Default::default()
    });
    assert!(pipeline_layout.is_valid());
    assert!(setup.resources().device_resource_count() > 0);

    drop(std::mem::take(&mut setup.device));

    let rm = setup.api.resource_manager();
    assert_eq!(setup.resources().device_resource_count(), 0);
    assert!(rm.get_bind_group(bind_group.handle()).is_none());
    assert!(rm.get_bind_group_layout(layout.handle()).is_none());
    assert!(rm.get_buffer(buffer.handle()).is_none());

    // The wrappers outlive their device; queries on them come back empty
    assert!(bind_group.is_valid());
    assert!(layout.bindings().is_empty());
    assert_eq!(buffer.size(), 0);
}
