// Instance, adapter and device setup

mod common;

use common::{init_logging, NullSetup};
use rhi::backend::NullGraphicsApi;
use rhi::*;
use std::sync::Arc;

fn null_instance() -> (Arc<dyn GraphicsApi>, Instance) {
    init_logging();
    let api: Arc<dyn GraphicsApi> = NullGraphicsApi::new();
    let instance = api.create_instance(&InstanceOptions {
        application_name: "instance test".to_string(),
        ..Default::default()
    });
    (api, instance)
}

#[test]
fn test_backend_selection() {
    let api = create_graphics_api(BackendType::Null).unwrap();
    assert_eq!(api.backend_type(), BackendType::Null);
}

#[test]
fn test_adapters_are_cached() {
    let (_api, mut instance) = null_instance();
    assert!(!instance.extensions().is_empty());

    let first: Vec<Handle<Adapter>> = instance.adapters().iter().map(Adapter::handle).collect();
    let second: Vec<Handle<Adapter>> = instance.adapters().iter().map(Adapter::handle).collect();
    assert_eq!(first.len(), 2);
    assert_eq!(first, second);

    let integrated = instance.select_adapter(AdapterDeviceType::IntegratedGpu).unwrap();
    assert_eq!(integrated.properties().device_type, AdapterDeviceType::IntegratedGpu);

    // No CPU adapter: falls back to the first one
    let fallback = instance.select_adapter(AdapterDeviceType::Cpu).unwrap();
    assert_eq!(fallback.handle(), first[0]);
}

#[test]
fn test_surface_needs_extent() {
    let (_api, instance) = null_instance();
    let surface = instance.create_surface(&SurfaceOptions::Headless {
        extent: Extent2D::default(),
    });
    assert!(!surface.is_valid());
}

#[test]
fn test_swapchain_properties_of_surface() {
    let setup = NullSetup::new();
    let properties = setup.adapter.swapchain_properties(&setup.surface);

    assert_eq!(
        properties.capabilities.current_extent,
        Extent2D {
            width: 640,
            height: 480
        }
    );
    let format = properties.select_format(&[Format::B8G8R8A8Unorm]).unwrap();
    assert_eq!(format.format, Format::B8G8R8A8Unorm);
    assert_eq!(properties.select_present_mode(&[PresentMode::FifoRelaxed]), PresentMode::Fifo);
    assert!(setup.adapter.supports_presentation(&setup.surface, 0));
    assert!(!setup.adapter.supports_presentation(&setup.surface, 1));
}

#[test]
fn test_default_device_prefers_requested_type() {
    let setup = NullSetup::new();
    assert_eq!(setup.adapter.properties().device_type, AdapterDeviceType::DiscreteGpu);
    assert!(setup.device.is_valid());
    assert_eq!(setup.device.adapter_handle(), setup.adapter.handle());
    assert_eq!(setup.device.queues().len(), 1);
    assert!(setup.queue().flags().contains(QueueFlags::GRAPHICS));
}

#[test]
fn test_device_with_several_queues() {
    let (_api, mut instance) = null_instance();
    let adapter = instance.select_adapter(AdapterDeviceType::DiscreteGpu).unwrap();

    let device = adapter.create_device(&DeviceOptions {
        queues: vec![
            QueueRequest {
                queue_type_index: 0,
                count: 2,
                priorities: vec![1.0, 0.5],
            },
            QueueRequest {
                queue_type_index: 1,
                count: 1,
                priorities: vec![1.0],
            },
        ],
        ..Default::default()
    });
    assert!(device.is_valid());
    assert_eq!(device.queues().len(), 3);
    assert_eq!(device.queues()[2].queue_type_index(), 1);
    assert_eq!(device.queues()[2].flags(), QueueFlags::TRANSFER);

    let too_many = adapter.create_device(&DeviceOptions {
        queues: vec![QueueRequest {
            queue_type_index: 1,
            count: 9,
            priorities: vec![1.0; 9],
        }],
        ..Default::default()
    });
    assert!(!too_many.is_valid());
}

#[test]
fn test_instance_drop_releases_devices() {
    let (api, mut instance) = null_instance();
    let adapter = instance.select_adapter(AdapterDeviceType::DiscreteGpu).unwrap();
    let device = adapter.create_device(&DeviceOptions::default());
    let device_handle = device.handle();
    assert!(api.resource_manager().get_device(device_handle).is_some());

    drop(adapter);
    drop(instance);
    assert!(api.resource_manager().get_device(device_handle).is_none());

    // The orphaned wrapper drops without effect
    drop(device);
}
