//! Host-to-device copy recording.

use bitflags::bitflags;
use onyx_test_utils::{BarrierStage, BufferBarrier, CommandRecorder, GpuBuffer};

bitflags! {
    /// Graphics pipeline stages that must wait for this frame's uploads.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PipelineStages: u32 {
        /// Storage buffers read by vertex shaders.
        const VERTEX_SHADER = 1 << 0;
        /// Vertex and index buffer fetches.
        const VERTEX_INPUT = 1 << 1;
    }
}

/// Collects copy commands and barriers for one frame.
///
/// Copies go straight to the transfer recorder. Acquire barriers are accumulated so the
/// caller can record them on the graphics stream in one batch. Release barriers are only
/// collected when `releases` is set, i.e. when transfer runs on its own queue family.
pub struct CopyInfo<'a> {
    pub frame: usize,
    pub transfer: &'a mut dyn CommandRecorder,
    pub shader_acquires: Vec<BufferBarrier>,
    pub vertex_acquires: Vec<BufferBarrier>,
    pub releases: Option<&'a mut Vec<BufferBarrier>>,
    copied_bytes: u64,
}

impl<'a> CopyInfo<'a> {
    pub fn new(
        frame: usize,
        transfer: &'a mut dyn CommandRecorder,
        releases: Option<&'a mut Vec<BufferBarrier>>,
    ) -> Self {
        Self {
            frame,
            transfer,
            shader_acquires: Vec::new(),
            vertex_acquires: Vec::new(),
            releases,
            copied_bytes: 0,
        }
    }

    /// Record a staging to device-local copy and the barriers that guard it.
    pub fn copy(&mut self, staging: &GpuBuffer, device_local: &GpuBuffer, size: u64) {
        if size == 0 {
            return;
        }
        self.transfer.copy_buffer(staging, device_local, size);
        self.copied_bytes += size;

        if device_local.kind().is_vertex_input() {
            self.vertex_acquires
                .push(BufferBarrier::acquire(device_local.clone(), BarrierStage::VertexInput));
        } else {
            self.shader_acquires
                .push(BufferBarrier::acquire(device_local.clone(), BarrierStage::VertexShader));
        }

        if let Some(releases) = self.releases.as_deref_mut() {
            releases.push(BufferBarrier::release(device_local.clone()));
        }
    }

    pub fn copied_bytes(&self) -> u64 {
        self.copied_bytes
    }

    pub fn copy_count(&self) -> usize {
        self.shader_acquires.len() + self.vertex_acquires.len()
    }

    /// Stages the graphics submission has to wait on.
    pub fn wait_stages(&self) -> PipelineStages {
        let mut stages = PipelineStages::empty();
        if !self.shader_acquires.is_empty() {
            stages |= PipelineStages::VERTEX_SHADER;
        }
        if !self.vertex_acquires.is_empty() {
            stages |= PipelineStages::VERTEX_INPUT;
        }
        stages
    }

    /// All acquire barriers, shader reads first.
    pub fn take_acquires(&mut self) -> Vec<BufferBarrier> {
        let mut acquires = std::mem::take(&mut self.shader_acquires);
        acquires.append(&mut self.vertex_acquires);
        acquires
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use onyx_test_utils::{BufferKind, MockCommandRecorder, QueueOwnership, RecordedCommand};

    #[test]
    fn test_copies_sort_acquires_by_stage() {
        let staging = GpuBuffer::mock(0, 256, BufferKind::Staging);
        let storage = GpuBuffer::mock(1, 256, BufferKind::Storage);
        let vertices = GpuBuffer::mock(2, 256, BufferKind::Vertex);

        let mut transfer = MockCommandRecorder::new();
        let mut info = CopyInfo::new(0, &mut transfer, None);
        info.copy(&staging, &vertices, 32);
        info.copy(&staging, &storage, 64);

        assert_eq!(info.copy_count(), 2);
        assert_eq!(info.copied_bytes(), 96);
        assert_eq!(
            info.wait_stages(),
            PipelineStages::VERTEX_SHADER | PipelineStages::VERTEX_INPUT
        );

        let acquires = info.take_acquires();
        assert_eq!(acquires[0].stage, BarrierStage::VertexShader);
        assert_eq!(acquires[1].stage, BarrierStage::VertexInput);
        assert!(acquires.iter().all(|b| b.ownership == QueueOwnership::Acquire));
        assert_eq!(transfer.count_copies(), 2);
    }

    #[test]
    fn test_empty_copy_is_skipped() {
        let staging = GpuBuffer::mock(0, 16, BufferKind::Staging);
        let storage = GpuBuffer::mock(1, 16, BufferKind::Storage);

        let mut transfer = MockCommandRecorder::new();
        let mut info = CopyInfo::new(1, &mut transfer, None);
        info.copy(&staging, &storage, 0);

        assert!(info.wait_stages().is_empty());
        assert_eq!(info.copy_count(), 0);
        assert!(transfer.commands().is_empty());
    }

    #[test]
    fn test_releases_only_when_requested() {
        let staging = GpuBuffer::mock(0, 64, BufferKind::Staging);
        let indices = GpuBuffer::mock(5, 64, BufferKind::Index);

        let mut releases = Vec::new();
        let mut transfer = MockCommandRecorder::new();
        {
            let mut info = CopyInfo::new(0, &mut transfer, Some(&mut releases));
            info.copy(&staging, &indices, 48);
            assert_eq!(info.wait_stages(), PipelineStages::VERTEX_INPUT);
        }

        assert_eq!(releases.len(), 1);
        assert_eq!(releases[0].ownership, QueueOwnership::Release);
        assert_eq!(releases[0].buffer.mock_id(), Some(5));
        assert_eq!(
            transfer.commands(),
            &[RecordedCommand::CopyBuffer {
                src: 0,
                dst: 5,
                size: 48
            }]
        );
    }
}
