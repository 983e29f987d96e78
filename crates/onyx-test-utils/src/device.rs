//! Trait abstracting GPU resource operations.

use crate::error::GpuError;
use crate::gpu_types::{BufferDesc, GpuBindGroup, GpuBuffer};

/// A descriptor set of storage buffers bound at consecutive bindings starting at 0.
#[derive(Debug, Clone, Copy)]
pub struct StorageDescriptorDesc<'a> {
    pub label: &'a str,
    pub buffers: &'a [&'a GpuBuffer],
}

/// Trait abstracting GPU buffer and descriptor management.
///
/// Methods take `&self` and return owned handles, so a device can be shared via `Arc`
/// between the renderer and its upload jobs. Failures are reported, never retried.
///
/// # Example
///
/// ```rust,no_run
/// use onyx_test_utils::{BufferDesc, BufferKind, GpuDevice, GpuError};
///
/// fn upload(device: &dyn GpuDevice, bytes: &[u8]) -> Result<(), GpuError> {
///     let desc = BufferDesc::new("upload", BufferKind::Staging, 1, bytes.len() as u64);
///     let buffer = device.create_buffer(&desc)?;
///     device.write_buffer(&buffer, 0, bytes)?;
///     device.flush_buffer(&buffer)
/// }
/// ```
pub trait GpuDevice: Send + Sync {
    fn create_buffer(&self, desc: &BufferDesc) -> Result<GpuBuffer, GpuError>;

    /// Release a buffer. The handle must not be used afterwards.
    fn destroy_buffer(&self, buffer: GpuBuffer);

    /// Write host data into a host-visible buffer at `offset` bytes.
    fn write_buffer(&self, buffer: &GpuBuffer, offset: u64, data: &[u8]) -> Result<(), GpuError>;

    /// Make host writes visible to the device.
    fn flush_buffer(&self, buffer: &GpuBuffer) -> Result<(), GpuError>;

    /// Write a storage descriptor set.
    ///
    /// When `previous` is given the backend may recycle its slot instead of allocating.
    fn write_storage_descriptor(
        &self,
        desc: &StorageDescriptorDesc<'_>,
        previous: Option<&GpuBindGroup>,
    ) -> Result<GpuBindGroup, GpuError>;
}
