//! Device buffers replicated per frame in flight.
//!
//! Each frame slot owns a host-visible staging buffer, a device-local buffer of the same
//! capacity and, for storage buffers, the descriptor that binds it. The three only change
//! together, through [`DeviceData::ensure_capacity`].

use std::marker::PhantomData;
use std::sync::Arc;

use bytemuck::Pod;
use onyx_test_utils::{
    BufferDesc, BufferKind, GpuBindGroup, GpuBuffer, GpuDevice, StorageDescriptorDesc,
};

use crate::copy::CopyInfo;
use crate::error::{RenderError, Result};
use crate::task::UploadJob;

/// Capacity allocated when `required` instances no longer fit: 1.5x plus one.
pub const fn grown_capacity(required: usize) -> usize {
    1 + required + required / 2
}

struct FrameSlot {
    capacity: usize,
    staging: GpuBuffer,
    device_local: GpuBuffer,
    descriptor: Option<GpuBindGroup>,
}

/// Growable per-frame device storage for elements of type `T`.
pub struct DeviceData<T> {
    device: Arc<dyn GpuDevice>,
    label: String,
    kind: BufferKind,
    bound: bool,
    slots: Vec<FrameSlot>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Pod + Send + Sync> DeviceData<T> {
    /// Storage buffers bound through a descriptor of their own.
    pub fn storage(
        device: Arc<dyn GpuDevice>,
        label: impl Into<String>,
        frames: usize,
        initial_capacity: usize,
    ) -> Result<Self> {
        Self::new(device, label.into(), BufferKind::Storage, true, frames, initial_capacity)
    }

    /// Buffers without a descriptor: vertex and index buffers, or storage buffers bound as
    /// part of a larger descriptor owned by someone else.
    pub fn unbound(
        device: Arc<dyn GpuDevice>,
        label: impl Into<String>,
        kind: BufferKind,
        frames: usize,
        initial_capacity: usize,
    ) -> Result<Self> {
        Self::new(device, label.into(), kind, false, frames, initial_capacity)
    }

    fn new(
        device: Arc<dyn GpuDevice>,
        label: String,
        kind: BufferKind,
        bound: bool,
        frames: usize,
        initial_capacity: usize,
    ) -> Result<Self> {
        let initial_capacity = initial_capacity.max(1);
        let mut data = Self {
            device,
            label,
            kind,
            bound,
            slots: Vec::with_capacity(frames),
            _marker: PhantomData,
        };
        for frame in 0..frames {
            let slot = data.allocate(frame, initial_capacity, None)?;
            data.slots.push(slot);
        }
        Ok(data)
    }

    fn allocate(
        &self,
        frame: usize,
        capacity: usize,
        previous: Option<&GpuBindGroup>,
    ) -> Result<FrameSlot> {
        let element_size = size_of::<T>() as u64;
        let staging = self.device.create_buffer(&BufferDesc::new(
            format!("{}::staging[{}]", self.label, frame),
            BufferKind::Staging,
            element_size,
            capacity as u64,
        ))?;
        let device_local = match self.device.create_buffer(&BufferDesc::new(
            format!("{}[{}]", self.label, frame),
            self.kind,
            element_size,
            capacity as u64,
        )) {
            Ok(buffer) => buffer,
            Err(err) => {
                self.device.destroy_buffer(staging);
                return Err(err.into());
            }
        };

        let descriptor = if self.bound {
            let label = format!("{}::descriptor[{}]", self.label, frame);
            let written = self.device.write_storage_descriptor(
                &StorageDescriptorDesc {
                    label: &label,
                    buffers: &[&device_local],
                },
                previous,
            );
            match written {
                Ok(descriptor) => Some(descriptor),
                Err(err) => {
                    self.device.destroy_buffer(staging);
                    self.device.destroy_buffer(device_local);
                    return Err(err.into());
                }
            }
        } else {
            None
        };

        Ok(FrameSlot {
            capacity,
            staging,
            device_local,
            descriptor,
        })
    }

    fn slot(&self, frame: usize) -> Result<&FrameSlot> {
        self.slots.get(frame).ok_or(RenderError::FrameIndexOutOfRange {
            index: frame,
            frames: self.slots.len(),
        })
    }

    /// Grow the slot for `frame` so it holds at least `required` elements.
    ///
    /// Returns whether the buffers were reallocated. On reallocation the old buffers are
    /// destroyed and the descriptor is rewritten in place. Capacity never shrinks.
    pub fn ensure_capacity(&mut self, frame: usize, required: usize) -> Result<bool> {
        let current = self.slot(frame)?;
        if required <= current.capacity {
            return Ok(false);
        }

        let capacity = grown_capacity(required);
        let slot = self.allocate(frame, capacity, current.descriptor.as_ref())?;
        let old = std::mem::replace(&mut self.slots[frame], slot);
        self.device.destroy_buffer(old.staging);
        self.device.destroy_buffer(old.device_local);

        tracing::debug!(
            "Grew '{}' frame {} from {} to {} elements",
            self.label,
            frame,
            old.capacity,
            capacity
        );
        Ok(true)
    }

    pub fn frames(&self) -> usize {
        self.slots.len()
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn capacity(&self, frame: usize) -> Result<usize> {
        Ok(self.slot(frame)?.capacity)
    }

    pub fn buffer(&self, frame: usize) -> Result<&GpuBuffer> {
        Ok(&self.slot(frame)?.device_local)
    }

    pub fn staging(&self, frame: usize) -> Result<&GpuBuffer> {
        Ok(&self.slot(frame)?.staging)
    }

    /// Descriptor binding the device-local buffer of `frame`, if this data is bound.
    pub fn descriptor(&self, frame: usize) -> Result<Option<&GpuBindGroup>> {
        Ok(self.slot(frame)?.descriptor.as_ref())
    }

    /// Descriptor of data created through [`DeviceData::storage`].
    ///
    /// # Panics
    ///
    /// Panics if the data is unbound.
    pub fn storage_descriptor(&self, frame: usize) -> Result<&GpuBindGroup> {
        let slot = self.slot(frame)?;
        Ok(slot
            .descriptor
            .as_ref()
            .unwrap_or_else(|| panic!("'{}' has no descriptor of its own", self.label)))
    }

    /// Job writing `chunks` back to back into the staging buffer of `frame`, then flushing.
    ///
    /// The chunks must fit the current capacity, so call `ensure_capacity` first.
    pub fn upload_job(&self, frame: usize, chunks: Vec<Arc<Vec<T>>>) -> Result<UploadJob> {
        let slot = self.slot(frame)?;
        let total: usize = chunks.iter().map(|chunk| chunk.len()).sum();
        assert!(
            total <= slot.capacity,
            "'{}' holds {} elements but {} were uploaded; grow_to_fit must run before send_to_device",
            self.label,
            slot.capacity,
            total
        );

        let device = self.device.clone();
        let staging = slot.staging.clone();
        Ok(Box::new(move || {
            let mut offset = 0u64;
            for chunk in chunks.iter().filter(|chunk| !chunk.is_empty()) {
                let bytes: &[u8] = bytemuck::cast_slice(chunk.as_slice());
                device.write_buffer(&staging, offset, bytes)?;
                offset += bytes.len() as u64;
            }
            device.flush_buffer(&staging)?;
            Ok(())
        }))
    }

    /// Record the copy of the first `count` elements of `frame` into device-local memory.
    pub fn record_copy(&self, frame: usize, count: usize, info: &mut CopyInfo<'_>) -> Result<()> {
        let slot = self.slot(frame)?;
        info.copy(
            &slot.staging,
            &slot.device_local,
            (count * size_of::<T>()) as u64,
        );
        Ok(())
    }
}

impl<T> Drop for DeviceData<T> {
    fn drop(&mut self) {
        for slot in self.slots.drain(..) {
            self.device.destroy_buffer(slot.staging);
            self.device.destroy_buffer(slot.device_local);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use onyx_test_utils::{DeviceCall, GpuError, MockGpuDevice};

    fn mock() -> Arc<MockGpuDevice> {
        Arc::new(MockGpuDevice::new())
    }

    #[test]
    fn test_grown_capacity() {
        assert_eq!(grown_capacity(0), 1);
        assert_eq!(grown_capacity(1), 2);
        assert_eq!(grown_capacity(4), 7);
        assert_eq!(grown_capacity(10), 16);
    }

    #[test]
    fn test_initial_allocation() {
        let device = mock();
        let data = DeviceData::<[f32; 4]>::storage(device.clone(), "test", 2, 4).unwrap();

        assert_eq!(data.frames(), 2);
        assert_eq!(data.capacity(0).unwrap(), 4);
        assert_eq!(data.buffer(1).unwrap().size(), 64);
        // Staging and device-local buffer per frame.
        assert_eq!(device.count_buffer_creates(), 4);
        assert_eq!(device.count_descriptor_writes(), 2);
    }

    #[test]
    fn test_growth_reuses_descriptor_slot() {
        let device = mock();
        let mut data = DeviceData::<u32>::storage(device.clone(), "test", 1, 4).unwrap();
        let before = data.descriptor(0).unwrap().unwrap().mock_id();

        assert!(!data.ensure_capacity(0, 4).unwrap());
        assert!(data.ensure_capacity(0, 5).unwrap());

        assert_eq!(data.capacity(0).unwrap(), grown_capacity(5));
        assert_eq!(data.descriptor(0).unwrap().unwrap().mock_id(), before);
        assert_eq!(device.count_buffer_destroys(), 2);
        assert_eq!(device.live_buffers(), 2);

        let new_buffer = data.buffer(0).unwrap().mock_id().unwrap();
        assert!(device.calls().contains(&DeviceCall::WriteDescriptor {
            descriptor_id: before.unwrap(),
            buffer_ids: vec![new_buffer],
            recycled: true,
        }));
    }

    #[test]
    fn test_growth_only_touches_requested_frame() {
        let device = mock();
        let mut data = DeviceData::<u32>::storage(device, "test", 2, 4).unwrap();
        data.ensure_capacity(1, 100).unwrap();

        assert_eq!(data.capacity(0).unwrap(), 4);
        assert_eq!(data.capacity(1).unwrap(), 151);
    }

    #[test]
    fn test_growth_failure_keeps_old_slot() {
        let device = mock();
        let mut data = DeviceData::<u32>::storage(device.clone(), "test", 1, 4).unwrap();
        device.set_allocation_limit(Some(64));

        let err = data.ensure_capacity(0, 100).unwrap_err();
        assert_eq!(
            err,
            RenderError::Gpu(GpuError::OutOfMemory { requested: 604 })
        );
        assert_eq!(data.capacity(0).unwrap(), 4);
    }

    #[test]
    fn test_frame_out_of_range() {
        let device = mock();
        let mut data = DeviceData::<u32>::unbound(device, "test", BufferKind::Vertex, 2, 4).unwrap();
        assert_eq!(
            data.ensure_capacity(2, 1).unwrap_err(),
            RenderError::FrameIndexOutOfRange { index: 2, frames: 2 }
        );
        assert!(data.descriptor(0).unwrap().is_none());
    }

    #[test]
    fn test_upload_job_writes_chunks_contiguously() {
        let device = mock();
        let data = DeviceData::<u32>::storage(device.clone(), "test", 1, 8).unwrap();
        let staging = data.staging(0).unwrap().mock_id().unwrap();

        let job = data
            .upload_job(0, vec![Arc::new(vec![1, 2]), Arc::new(vec![]), Arc::new(vec![3])])
            .unwrap();
        job().unwrap();

        let writes: Vec<_> = device
            .calls()
            .into_iter()
            .filter_map(|call| match call {
                DeviceCall::WriteBuffer {
                    buffer_id, offset, ..
                } if buffer_id == staging => Some(offset),
                _ => None,
            })
            .collect();
        assert_eq!(writes, vec![0, 8]);
        assert_eq!(device.count_flushes(), 1);
    }

    #[test]
    fn test_drop_releases_buffers() {
        let device = mock();
        let data = DeviceData::<u32>::storage(device.clone(), "test", 3, 4).unwrap();
        assert_eq!(device.live_buffers(), 6);
        drop(data);
        assert_eq!(device.live_buffers(), 0);
    }
}
