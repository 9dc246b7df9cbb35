// Shader modules are opaque SPIR-V blobs; compiling them is out of scope.

use crate::device::Device;

gpu_resource!(
    ShaderModule, parent: Device => device_handle, delete: delete_shader_module
);
