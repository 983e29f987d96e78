//! Mock implementations of the GPU capability traits for testing.
//!
//! Nothing here touches a GPU; every call is recorded for later assertions.

use crate::command::*;
use crate::device::{GpuDevice, StorageDescriptorDesc};
use crate::error::GpuError;
use crate::gpu_types::*;
use parking_lot::Mutex;

/// Records a device call for verification in tests.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCall {
    CreateBuffer {
        buffer_id: usize,
        kind: BufferKind,
        size: u64,
    },
    DestroyBuffer {
        buffer_id: usize,
    },
    WriteBuffer {
        buffer_id: usize,
        offset: u64,
        data: Vec<u8>,
    },
    FlushBuffer {
        buffer_id: usize,
    },
    WriteDescriptor {
        descriptor_id: usize,
        buffer_ids: Vec<usize>,
        recycled: bool,
    },
}

#[derive(Debug, Clone, Copy)]
struct MockBuffer {
    size: u64,
    alive: bool,
}

/// Mock implementation of [`GpuDevice`].
///
/// Uses `parking_lot::Mutex` for interior mutability: the trait takes `&self` and must be
/// `Send + Sync` because upload jobs write from worker threads.
///
/// # Example
///
/// ```rust
/// use onyx_test_utils::{BufferDesc, BufferKind, GpuDevice, MockGpuDevice};
///
/// let mock = MockGpuDevice::new();
/// let buffer = mock.create_buffer(&BufferDesc::new("test", BufferKind::Vertex, 16, 8)).unwrap();
///
/// assert!(buffer.is_mock());
/// assert_eq!(mock.count_buffer_creates(), 1);
/// ```
pub struct MockGpuDevice {
    calls: Mutex<Vec<DeviceCall>>,
    buffers: Mutex<Vec<MockBuffer>>,
    next_descriptor_id: Mutex<usize>,
    /// Allocations larger than this many bytes fail with `OutOfMemory`.
    allocation_limit: Mutex<Option<u64>>,
    fail_flushes: Mutex<bool>,
}

impl MockGpuDevice {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            buffers: Mutex::new(Vec::new()),
            next_descriptor_id: Mutex::new(0),
            allocation_limit: Mutex::new(None),
            fail_flushes: Mutex::new(false),
        }
    }

    /// Make every allocation above `bytes` fail.
    pub fn set_allocation_limit(&self, bytes: Option<u64>) {
        *self.allocation_limit.lock() = bytes;
    }

    /// Make every subsequent flush fail.
    pub fn set_fail_flushes(&self, fail: bool) {
        *self.fail_flushes.lock() = fail;
    }

    /// Get a copy of all recorded calls (for test assertions).
    pub fn calls(&self) -> Vec<DeviceCall> {
        self.calls.lock().clone()
    }

    pub fn count_buffer_creates(&self) -> usize {
        self.count(|call| matches!(call, DeviceCall::CreateBuffer { .. }))
    }

    pub fn count_buffer_destroys(&self) -> usize {
        self.count(|call| matches!(call, DeviceCall::DestroyBuffer { .. }))
    }

    pub fn count_buffer_writes(&self) -> usize {
        self.count(|call| matches!(call, DeviceCall::WriteBuffer { .. }))
    }

    pub fn count_flushes(&self) -> usize {
        self.count(|call| matches!(call, DeviceCall::FlushBuffer { .. }))
    }

    pub fn count_descriptor_writes(&self) -> usize {
        self.count(|call| matches!(call, DeviceCall::WriteDescriptor { .. }))
    }

    /// Number of buffers created and not yet destroyed.
    pub fn live_buffers(&self) -> usize {
        self.buffers.lock().iter().filter(|b| b.alive).count()
    }

    /// Most recent data written to the buffer with the given mock id.
    pub fn last_write(&self, buffer_id: usize) -> Option<Vec<u8>> {
        self.calls.lock().iter().rev().find_map(|call| match call {
            DeviceCall::WriteBuffer {
                buffer_id: id, data, ..
            } if *id == buffer_id => Some(data.clone()),
            _ => None,
        })
    }

    /// Clear recorded calls (useful between test steps).
    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    fn count(&self, predicate: impl Fn(&DeviceCall) -> bool) -> usize {
        self.calls.lock().iter().filter(|call| predicate(call)).count()
    }

    fn check_alive(&self, buffer: &GpuBuffer) -> usize {
        let id = buffer
            .mock_id()
            .expect("MockGpuDevice can only operate on mock buffers");
        assert!(
            self.buffers.lock().get(id).is_some_and(|b| b.alive),
            "Mock buffer {id} used after destruction"
        );
        id
    }
}

impl Default for MockGpuDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl GpuDevice for MockGpuDevice {
    fn create_buffer(&self, desc: &BufferDesc) -> Result<GpuBuffer, GpuError> {
        let size = desc.byte_size();
        if let Some(limit) = *self.allocation_limit.lock()
            && size > limit
        {
            return Err(GpuError::OutOfMemory { requested: size });
        }

        let mut buffers = self.buffers.lock();
        let id = buffers.len();
        buffers.push(MockBuffer { size, alive: true });

        self.calls.lock().push(DeviceCall::CreateBuffer {
            buffer_id: id,
            kind: desc.kind,
            size,
        });

        Ok(GpuBuffer::mock(id, size, desc.kind))
    }

    fn destroy_buffer(&self, buffer: GpuBuffer) {
        let id = self.check_alive(&buffer);
        self.buffers.lock()[id].alive = false;
        self.calls.lock().push(DeviceCall::DestroyBuffer { buffer_id: id });
    }

    fn write_buffer(&self, buffer: &GpuBuffer, offset: u64, data: &[u8]) -> Result<(), GpuError> {
        let id = self.check_alive(buffer);
        buffer.check_write(offset, data.len() as u64)?;

        self.calls.lock().push(DeviceCall::WriteBuffer {
            buffer_id: id,
            offset,
            data: data.to_vec(),
        });
        Ok(())
    }

    fn flush_buffer(&self, buffer: &GpuBuffer) -> Result<(), GpuError> {
        let id = self.check_alive(buffer);
        if *self.fail_flushes.lock() {
            return Err(GpuError::FlushFailed(format!("mock buffer {id}")));
        }
        self.calls.lock().push(DeviceCall::FlushBuffer { buffer_id: id });
        Ok(())
    }

    fn write_storage_descriptor(
        &self,
        desc: &StorageDescriptorDesc<'_>,
        previous: Option<&GpuBindGroup>,
    ) -> Result<GpuBindGroup, GpuError> {
        let buffer_ids = desc
            .buffers
            .iter()
            .map(|buffer| self.check_alive(buffer))
            .collect();

        let (descriptor_id, recycled) = match previous.and_then(GpuBindGroup::mock_id) {
            Some(id) => (id, true),
            None => {
                let mut next = self.next_descriptor_id.lock();
                let id = *next;
                *next += 1;
                (id, false)
            }
        };

        self.calls.lock().push(DeviceCall::WriteDescriptor {
            descriptor_id,
            buffer_ids,
            recycled,
        });

        Ok(GpuBindGroup::mock(descriptor_id))
    }
}

/// A command recorded by [`MockCommandRecorder`].
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCommand {
    CopyBuffer {
        src: usize,
        dst: usize,
        size: u64,
    },
    Barriers(Vec<(usize, QueueOwnership, BarrierStage)>),
    BindPipeline(PipelineId),
    BindDescriptorSets {
        first_set: u32,
        sets: Vec<usize>,
    },
    PushConstants(Vec<u8>),
    BindVertexBuffer {
        slot: u32,
        buffer: usize,
    },
    BindIndexBuffer {
        buffer: usize,
        format: wgpu::IndexFormat,
    },
    Draw {
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    },
    DrawIndexed {
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    },
    SetViewport(Viewport),
    SetScissor(ScissorRect),
    Clear(ClearRequest),
}

impl RecordedCommand {
    pub fn is_draw(&self) -> bool {
        matches!(
            self,
            RecordedCommand::Draw { .. } | RecordedCommand::DrawIndexed { .. }
        )
    }
}

/// Mock implementation of [`CommandRecorder`].
#[derive(Debug, Default)]
pub struct MockCommandRecorder {
    commands: Vec<RecordedCommand>,
}

impl MockCommandRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &[RecordedCommand] {
        &self.commands
    }

    pub fn count_draws(&self) -> usize {
        self.commands.iter().filter(|c| c.is_draw()).count()
    }

    pub fn count_copies(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, RecordedCommand::CopyBuffer { .. }))
            .count()
    }

    /// Pipelines in the order they were bound.
    pub fn bound_pipelines(&self) -> Vec<PipelineId> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                RecordedCommand::BindPipeline(id) => Some(*id),
                _ => None,
            })
            .collect()
    }

    /// Every barrier recorded, flattened in recording order.
    pub fn barriers(&self) -> Vec<(usize, QueueOwnership, BarrierStage)> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                RecordedCommand::Barriers(barriers) => Some(barriers.clone()),
                _ => None,
            })
            .flatten()
            .collect()
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }
}

fn id_of(buffer: &GpuBuffer) -> usize {
    buffer
        .mock_id()
        .expect("MockCommandRecorder can only record mock buffers")
}

impl CommandRecorder for MockCommandRecorder {
    fn copy_buffer(&mut self, src: &GpuBuffer, dst: &GpuBuffer, size: u64) {
        assert!(
            size <= src.size() && size <= dst.size(),
            "Copy of {size} bytes exceeds a buffer bound"
        );
        self.commands.push(RecordedCommand::CopyBuffer {
            src: id_of(src),
            dst: id_of(dst),
            size,
        });
    }

    fn buffer_barriers(&mut self, barriers: &[BufferBarrier]) {
        self.commands.push(RecordedCommand::Barriers(
            barriers
                .iter()
                .map(|b| (id_of(&b.buffer), b.ownership, b.stage))
                .collect(),
        ));
    }

    fn bind_pipeline(&mut self, pipeline: PipelineId) {
        self.commands.push(RecordedCommand::BindPipeline(pipeline));
    }

    fn bind_descriptor_sets(&mut self, first_set: u32, sets: &[&GpuBindGroup]) {
        let sets = sets
            .iter()
            .map(|set| {
                set.mock_id()
                    .expect("MockCommandRecorder can only record mock bind groups")
            })
            .collect();
        self.commands
            .push(RecordedCommand::BindDescriptorSets { first_set, sets });
    }

    fn push_constants(&mut self, data: &[u8]) {
        self.commands.push(RecordedCommand::PushConstants(data.to_vec()));
    }

    fn bind_vertex_buffer(&mut self, slot: u32, buffer: &GpuBuffer) {
        self.commands.push(RecordedCommand::BindVertexBuffer {
            slot,
            buffer: id_of(buffer),
        });
    }

    fn bind_index_buffer(&mut self, buffer: &GpuBuffer, format: wgpu::IndexFormat) {
        self.commands.push(RecordedCommand::BindIndexBuffer {
            buffer: id_of(buffer),
            format,
        });
    }

    fn draw(&mut self, vertex_count: u32, instance_count: u32, first_vertex: u32, first_instance: u32) {
        self.commands.push(RecordedCommand::Draw {
            vertex_count,
            instance_count,
            first_vertex,
            first_instance,
        });
    }

    fn draw_indexed(
        &mut self,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    ) {
        self.commands.push(RecordedCommand::DrawIndexed {
            index_count,
            instance_count,
            first_index,
            vertex_offset,
            first_instance,
        });
    }

    fn set_viewport(&mut self, viewport: &Viewport) {
        self.commands.push(RecordedCommand::SetViewport(*viewport));
    }

    fn set_scissor(&mut self, scissor: &ScissorRect) {
        self.commands.push(RecordedCommand::SetScissor(*scissor));
    }

    fn clear(&mut self, clear: &ClearRequest) {
        self.commands.push(RecordedCommand::Clear(*clear));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage(mock: &MockGpuDevice, capacity: u64) -> GpuBuffer {
        mock.create_buffer(&BufferDesc::new("test", BufferKind::Storage, 16, capacity))
            .unwrap()
    }

    #[test]
    fn test_mock_buffer_creation() {
        let mock = MockGpuDevice::new();
        let buffer = storage(&mock, 4);

        assert!(buffer.is_mock());
        assert_eq!(buffer.size(), 64);
        assert_eq!(mock.count_buffer_creates(), 1);
        assert_eq!(mock.live_buffers(), 1);
    }

    #[test]
    fn test_mock_buffer_write() {
        let mock = MockGpuDevice::new();
        let buffer = storage(&mock, 4);

        mock.write_buffer(&buffer, 16, &[7u8; 32]).unwrap();

        assert_eq!(mock.count_buffer_writes(), 1);
        assert_eq!(mock.last_write(0), Some(vec![7u8; 32]));
    }

    #[test]
    fn test_mock_write_overflow() {
        let mock = MockGpuDevice::new();
        let buffer = storage(&mock, 1);
        let size = buffer.size();

        assert_eq!(
            mock.write_buffer(&buffer, 8, &[0u8; 16]),
            Err(GpuError::WriteOutOfRange {
                offset: 8,
                len: 16,
                size
            })
        );
        assert_eq!(mock.count_buffer_writes(), 0);
        assert_eq!(
            mock.write_buffer(&buffer, u64::MAX, &[0u8; 1]),
            Err(GpuError::WriteOutOfRange {
                offset: u64::MAX,
                len: 1,
                size
            })
        );
    }

    #[test]
    #[should_panic(expected = "used after destruction")]
    fn test_use_after_destroy() {
        let mock = MockGpuDevice::new();
        let buffer = storage(&mock, 1);
        mock.destroy_buffer(buffer.clone());
        let _ = mock.flush_buffer(&buffer);
    }

    #[test]
    fn test_allocation_limit() {
        let mock = MockGpuDevice::new();
        mock.set_allocation_limit(Some(100));

        let result = mock.create_buffer(&BufferDesc::new("big", BufferKind::Storage, 16, 10));
        assert_eq!(result.unwrap_err(), GpuError::OutOfMemory { requested: 160 });
        assert_eq!(mock.count_buffer_creates(), 0);
    }

    #[test]
    fn test_descriptor_recycling() {
        let mock = MockGpuDevice::new();
        let a = storage(&mock, 1);
        let b = storage(&mock, 2);

        let first = mock
            .write_storage_descriptor(
                &StorageDescriptorDesc {
                    label: "set",
                    buffers: &[&a],
                },
                None,
            )
            .unwrap();
        let second = mock
            .write_storage_descriptor(
                &StorageDescriptorDesc {
                    label: "set",
                    buffers: &[&b],
                },
                Some(&first),
            )
            .unwrap();

        assert_eq!(first.mock_id(), second.mock_id());
        assert_eq!(
            mock.calls().last(),
            Some(&DeviceCall::WriteDescriptor {
                descriptor_id: 0,
                buffer_ids: vec![1],
                recycled: true,
            })
        );
    }

    #[test]
    fn test_recorder_counts() {
        let mock = MockGpuDevice::new();
        let src = storage(&mock, 2);
        let dst = storage(&mock, 2);

        let mut recorder = MockCommandRecorder::new();
        recorder.copy_buffer(&src, &dst, 32);
        recorder.bind_pipeline(PipelineId(4));
        recorder.draw(6, 2, 0, 0);
        recorder.draw_indexed(3, 1, 0, 0, 2);

        assert_eq!(recorder.count_copies(), 1);
        assert_eq!(recorder.count_draws(), 2);
        assert_eq!(recorder.bound_pipelines(), vec![PipelineId(4)]);

        recorder.clear();
        assert!(recorder.commands().is_empty());
    }
}
