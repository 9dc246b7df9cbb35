// Buffer - linear GPU memory for vertices, indices, uniforms and staging

use std::ptr::NonNull;

use crate::device::Device;
use crate::error::{GpuError, Result};
use crate::gpu_core::{BufferUsageFlags, DeviceSize, MemoryUsage};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BufferOptions {
    pub size: DeviceSize,
    pub usage: BufferUsageFlags,
    /// Host access (map/unmap) is only legal for host-visible usages
    pub memory_usage: MemoryUsage,
}

gpu_resource!(
    /// GPU buffer. Host access goes through [`Buffer::map`] or the checked
    /// [`Buffer::write`] / [`Buffer::read`] helpers.
    Buffer, parent: Device => device_handle, delete: delete_buffer
);

impl Buffer {
    pub fn size(&self) -> DeviceSize {
        self.resource_manager()
            .and_then(|rm| rm.get_buffer(self.handle))
            .map(|buffer| buffer.size())
            .unwrap_or(0)
    }

    /// Host pointer to the contents, `None` for device-only memory or an
    /// invalid buffer. The pointer stays valid until `unmap` or deletion.
    pub fn map(&self) -> Option<NonNull<u8>> {
        self.resource_manager()?.get_buffer(self.handle)?.map()
    }

    pub fn unmap(&self) {
        if let Some(mut buffer) = self.resource_manager().and_then(|rm| rm.get_buffer(self.handle)) {
            buffer.unmap();
        }
    }

    /// Copy `data` into the buffer at `offset` through a host mapping
    pub fn write(&self, offset: DeviceSize, data: &[u8]) -> Result<()> {
        let ptr = self.mapped_range(offset, data.len() as DeviceSize)?;
        // SAFETY: mapped_range checked the range against the buffer size
        unsafe {
            std::ptr::copy_nonoverlapping(data.as_ptr(), ptr.as_ptr().add(offset as usize), data.len());
        }
        self.unmap();
        Ok(())
    }

    /// Read `len` bytes starting at `offset` through a host mapping
    pub fn read(&self, offset: DeviceSize, len: usize) -> Result<Vec<u8>> {
        let ptr = self.mapped_range(offset, len as DeviceSize)?;
        let mut out = vec![0u8; len];
        // SAFETY: mapped_range checked the range against the buffer size
        unsafe {
            std::ptr::copy_nonoverlapping(ptr.as_ptr().add(offset as usize), out.as_mut_ptr(), len);
        }
        self.unmap();
        Ok(out)
    }

    fn mapped_range(&self, offset: DeviceSize, len: DeviceSize) -> Result<NonNull<u8>> {
        let rm = self.resource_manager().ok_or(GpuError::InvalidHandle("buffer"))?;
        let mut buffer = rm.get_buffer(self.handle).ok_or(GpuError::InvalidHandle("buffer"))?;

        let size = buffer.size();
        let end = offset.checked_add(len).unwrap_or(DeviceSize::MAX);
        if end > size {
            return Err(GpuError::OutOfBounds { offset, end, size });
        }

        buffer.map().ok_or(GpuError::NotMappable)
    }
}
