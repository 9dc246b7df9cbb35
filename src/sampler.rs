use crate::device::Device;
use crate::gpu_core::{AddressMode, CompareOperation, FilterMode};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplerOptions {
    pub mag_filter: FilterMode,
    pub min_filter: FilterMode,
    pub mipmap_filter: FilterMode,
    pub u: AddressMode,
    pub v: AddressMode,
    pub w: AddressMode,
    pub anisotropy_enabled: bool,
    pub max_anisotropy: f32,
    pub compare: Option<CompareOperation>,
    pub lod_min_clamp: f32,
    pub lod_max_clamp: f32,
}

impl Default for SamplerOptions {
    fn default() -> Self {
        Self {
            mag_filter: FilterMode::Linear,
            min_filter: FilterMode::Linear,
            mipmap_filter: FilterMode::Nearest,
            u: AddressMode::Repeat,
            v: AddressMode::Repeat,
            w: AddressMode::Repeat,
            anisotropy_enabled: false,
            max_anisotropy: 1.0,
            compare: None,
            lod_min_clamp: 0.0,
            lod_max_clamp: f32::MAX,
        }
    }
}

gpu_resource!(
    Sampler, parent: Device => device_handle, delete: delete_sampler
);
