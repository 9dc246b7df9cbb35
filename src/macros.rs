// RAII wrapper boilerplate shared by the simple resource kinds.
//
// A wrapper holds the backend, its parent's handle and its own handle. It is
// move-only, its Default is the invalid value, and dropping a valid wrapper
// deletes the resource through the resource manager exactly once.

macro_rules! gpu_resource {
    (
        $(#[$meta:meta])*
        $name:ident, parent: $parent:ty => $parent_accessor:ident, delete: $delete:ident
    ) => {
        $(#[$meta])*
        pub struct $name {
            pub(crate) api: Option<std::sync::Arc<dyn $crate::api::GraphicsApi>>,
            pub(crate) parent: $crate::handle::Handle<$parent>,
            pub(crate) handle: $crate::handle::Handle<$name>,
        }

        impl $name {
            pub(crate) fn from_parts(
                api: &std::sync::Arc<dyn $crate::api::GraphicsApi>,
                parent: $crate::handle::Handle<$parent>,
                handle: $crate::handle::Handle<$name>,
            ) -> Self {
                Self {
                    api: Some(api.clone()),
                    parent,
                    handle,
                }
            }

            pub fn handle(&self) -> $crate::handle::Handle<$name> {
                self.handle
            }

            pub fn $parent_accessor(&self) -> $crate::handle::Handle<$parent> {
                self.parent
            }

            pub fn is_valid(&self) -> bool {
                self.handle.is_valid()
            }

            #[allow(dead_code)]
            pub(crate) fn resource_manager(&self) -> Option<&dyn $crate::api::ResourceManager> {
                self.api.as_deref().map(|api| api.resource_manager())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self {
                    api: None,
                    parent: Default::default(),
                    handle: Default::default(),
                }
            }
        }

        impl Drop for $name {
            fn drop(&mut self) {
                if !self.handle.is_valid() {
                    return;
                }
                if let Some(api) = &self.api {
                    api.resource_manager().$delete(self.handle);
                }
            }
        }

        impl PartialEq for $name {
            fn eq(&self, other: &Self) -> bool {
                $crate::api::same_api(&self.api, &other.api)
                    && self.parent == other.parent
                    && self.handle == other.handle
            }
        }

        impl Eq for $name {}

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.debug_struct(stringify!($name))
                    .field("parent", &self.parent)
                    .field("handle", &self.handle)
                    .finish()
            }
        }
    };
}

// Resource manager boilerplate shared by every backend. Backends keep one
// `Mutex<Pool<_, _>>` per kind under the same field names.

/// `delete_*` and `get_*` for a kind that needs no teardown beyond `Drop`
macro_rules! delete_and_get {
    ($delete:ident, $get:ident, $pool:ident, $kind:ty, $api:ident) => {
        fn $delete(&self, handle: $crate::handle::Handle<$kind>) {
            if self.$pool.lock().remove(handle).is_some() {
                log::debug!("Deleted {} {:?}", stringify!($kind), handle);
            }
        }

        fn $get(&self, handle: $crate::handle::Handle<$kind>) -> Option<$crate::api::ApiGuard<'_, dyn $api>> {
            $crate::api::lock_resource(&self.$pool, handle, |object| object as &mut dyn $api)
        }
    };
}

/// Remove every object owned by `device`, users before what they use.
/// Evaluates to the number released; queues are not counted.
macro_rules! release_device_objects {
    ($rm:expr, $device:expr) => {{
        let device = $device;
        let mut released = 0;
        released += $rm.render_passes.lock().remove_where(|o| o.device == device).len();
        released += $rm.compute_passes.lock().remove_where(|o| o.device == device).len();
        released += $rm.command_recorders.lock().remove_where(|o| o.device == device).len();
        released += $rm.command_buffers.lock().remove_where(|o| o.device == device).len();
        released += $rm.bind_groups.lock().remove_where(|o| o.device == device).len();
        released += $rm.graphics_pipelines.lock().remove_where(|o| o.device == device).len();
        released += $rm.compute_pipelines.lock().remove_where(|o| o.device == device).len();
        released += $rm.pipeline_layouts.lock().remove_where(|o| o.device == device).len();
        released += $rm.bind_group_layouts.lock().remove_where(|o| o.device == device).len();
        released += $rm.shader_modules.lock().remove_where(|o| o.device == device).len();
        released += $rm.samplers.lock().remove_where(|o| o.device == device).len();
        released += $rm.texture_views.lock().remove_where(|o| o.device == device).len();
        released += $rm.textures.lock().remove_where(|o| o.device == device).len();
        released += $rm.buffers.lock().remove_where(|o| o.device == device).len();
        released += $rm.fences.lock().remove_where(|o| o.device == device).len();
        released += $rm.gpu_semaphores.lock().remove_where(|o| o.device == device).len();
        released += $rm.swapchains.lock().remove_where(|o| o.device == device).len();
        $rm.queues.lock().remove_where(|o| o.device == device);
        released
    }};
}
