//! Command recording abstraction.
//!
//! A [`CommandRecorder`] is the capability the renderer records transfer and draw commands
//! through. One recorder stands for one command stream (a transfer encoder or a render pass).

use crate::gpu_types::{GpuBindGroup, GpuBuffer};

/// Opaque pipeline identifier resolved by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PipelineId(pub u32);

/// Queue-family ownership transfer direction of a barrier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueOwnership {
    /// Recorded on the transfer stream, gives up ownership after the copy.
    Release,
    /// Recorded on the graphics stream, takes ownership before the buffer is read.
    Acquire,
}

/// The pipeline stage a barrier synchronizes with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BarrierStage {
    Transfer,
    /// Storage buffer reads from the vertex shader.
    VertexShader,
    /// Vertex and index buffer fetches.
    VertexInput,
}

/// A buffer memory barrier covering the whole buffer.
#[derive(Debug, Clone)]
pub struct BufferBarrier {
    pub buffer: GpuBuffer,
    pub ownership: QueueOwnership,
    pub stage: BarrierStage,
}

impl BufferBarrier {
    pub fn acquire(buffer: GpuBuffer, stage: BarrierStage) -> Self {
        Self {
            buffer,
            ownership: QueueOwnership::Acquire,
            stage,
        }
    }

    pub fn release(buffer: GpuBuffer) -> Self {
        Self {
            buffer,
            ownership: QueueOwnership::Release,
            stage: BarrierStage::Transfer,
        }
    }
}

/// Viewport rectangle in framebuffer pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

impl Viewport {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            min_depth: 0.0,
            max_depth: 1.0,
        }
    }
}

/// Scissor rectangle in framebuffer pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScissorRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl ScissorRect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Attachment clears issued at the start of a camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClearRequest {
    pub color: Option<[f32; 4]>,
    /// Depth and stencil clear values.
    pub depth_stencil: Option<(f32, u32)>,
}

/// Records GPU commands on a single command stream.
///
/// Object-safe so the renderer can take `&mut dyn CommandRecorder` for both real and mock
/// backends.
pub trait CommandRecorder {
    /// Copy `size` bytes from the start of `src` into the start of `dst`.
    fn copy_buffer(&mut self, src: &GpuBuffer, dst: &GpuBuffer, size: u64);

    fn buffer_barriers(&mut self, barriers: &[BufferBarrier]);

    fn bind_pipeline(&mut self, pipeline: PipelineId);

    /// Bind descriptor sets starting at `first_set`.
    fn bind_descriptor_sets(&mut self, first_set: u32, sets: &[&GpuBindGroup]);

    fn push_constants(&mut self, data: &[u8]);

    fn bind_vertex_buffer(&mut self, slot: u32, buffer: &GpuBuffer);

    fn bind_index_buffer(&mut self, buffer: &GpuBuffer, format: wgpu::IndexFormat);

    fn draw(&mut self, vertex_count: u32, instance_count: u32, first_vertex: u32, first_instance: u32);

    fn draw_indexed(
        &mut self,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    );

    fn set_viewport(&mut self, viewport: &Viewport);

    fn set_scissor(&mut self, scissor: &ScissorRect);

    fn clear(&mut self, clear: &ClearRequest);
}
