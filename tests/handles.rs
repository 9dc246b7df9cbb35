// Handle validity and RAII wrapper semantics

mod common;

use common::NullSetup;
use rhi::*;

#[test]
fn test_stale_handle_after_slot_reuse() {
    let setup = NullSetup::new();
    let rm = setup.api.resource_manager();

    let first = setup.host_buffer(64);
    let stale = first.handle();
    drop(first);

    let second = setup.host_buffer(64);
    let fresh = second.handle();

    // Same slot, new generation
    assert_eq!(fresh.index(), stale.index());
    assert_ne!(fresh.generation(), stale.generation());
    assert!(rm.get_buffer(stale).is_none());
    assert!(rm.get_buffer(fresh).is_some());
}

#[test]
fn test_default_wrappers_are_invalid_and_equal() {
    let setup = NullSetup::new();

    assert!(!Buffer::default().is_valid());
    assert!(!Texture::default().is_valid());
    assert!(!Fence::default().is_valid());
    assert!(!Device::default().is_valid());
    assert_eq!(Buffer::default(), Buffer::default());
    assert_eq!(BindGroup::default(), BindGroup::default());

    let buffer = setup.host_buffer(16);
    assert!(buffer.is_valid());
    assert_ne!(buffer, Buffer::default());
}

#[test]
fn test_take_leaves_invalid_wrapper() {
    let setup = NullSetup::new();
    let rm = setup.api.resource_manager();

    let mut original = setup.host_buffer(32);
    let handle = original.handle();

    let moved = std::mem::take(&mut original);
    assert!(!original.is_valid());
    assert_eq!(original, Buffer::default());
    assert_eq!(moved.handle(), handle);

    // Dropping the emptied wrapper must not delete anything
    drop(original);
    assert!(rm.get_buffer(handle).is_some());

    drop(moved);
    assert!(rm.get_buffer(handle).is_none());
}

#[test]
fn test_assignment_deletes_previous_resource() {
    let setup = NullSetup::new();
    let rm = setup.api.resource_manager();

    let mut buffer = setup.host_buffer(32);
    let old = buffer.handle();
    buffer = setup.host_buffer(48);

    assert!(rm.get_buffer(old).is_none());
    assert_eq!(buffer.size(), 48);
}

#[test]
fn test_equality_includes_backend() {
    let a = NullSetup::new();
    let b = NullSetup::new();

    let buffer_a = a.host_buffer(16);
    let buffer_b = b.host_buffer(16);

    // Two fresh backends hand out identical handle values
    assert_eq!(buffer_a.handle(), buffer_b.handle());
    assert_eq!(buffer_a.device_handle(), buffer_b.device_handle());
    assert_ne!(buffer_a, buffer_b);
    assert_eq!(buffer_a, buffer_a);
}

#[test]
fn test_delete_is_idempotent() {
    let setup = NullSetup::new();
    let rm = setup.api.resource_manager();

    let stale_wrapper = setup.host_buffer(16);
    let handle = stale_wrapper.handle();
    rm.delete_buffer(handle);
    rm.delete_buffer(handle);
    rm.delete_buffer(Handle::default());

    // The slot is reused; the stale wrapper must not delete the newcomer
    let newcomer = setup.host_buffer(16);
    assert_eq!(newcomer.handle().index(), handle.index());
    drop(stale_wrapper);
    assert!(rm.get_buffer(newcomer.handle()).is_some());
}

#[test]
fn test_creation_failure_yields_invalid_wrapper() {
    let setup = NullSetup::new();

    let empty = setup.device.create_buffer(&BufferOptions::default());
    assert!(!empty.is_valid());

    let no_code = setup.device.create_shader_module(&[]);
    assert!(!no_code.is_valid());

    let bad_texture = setup.device.create_texture(&TextureOptions {
        format: Format::Undefined,
        ..Default::default()
    });
    assert!(!bad_texture.is_valid());

    // Creating from an invalid device returns the default value
    let orphan = Device::default().create_buffer(&BufferOptions {
        size: 16,
        ..Default::default()
    });
    assert_eq!(orphan, Buffer::default());
}
