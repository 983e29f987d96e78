//! GPU resource wrappers that can be real or mock.

use crate::error::GpuError;

/// How a buffer is used by the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferKind {
    /// Device-local storage buffer read by shaders (instance data, lights).
    Storage,
    /// Device-local vertex buffer.
    Vertex,
    /// Device-local index buffer.
    Index,
    /// Host-visible buffer used as a copy source.
    Staging,
}

impl BufferKind {
    /// Whether the buffer is read through the vertex input stage rather than a shader.
    pub fn is_vertex_input(&self) -> bool {
        matches!(self, BufferKind::Vertex | BufferKind::Index)
    }

    pub fn usages(&self) -> wgpu::BufferUsages {
        use wgpu::BufferUsages as U;
        match self {
            BufferKind::Storage => U::STORAGE | U::COPY_DST,
            BufferKind::Vertex => U::VERTEX | U::COPY_DST,
            BufferKind::Index => U::INDEX | U::COPY_DST,
            BufferKind::Staging => U::COPY_SRC | U::COPY_DST,
        }
    }
}

/// Describes a buffer of `capacity` elements of `instance_size` bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferDesc {
    pub label: String,
    pub kind: BufferKind,
    pub instance_size: u64,
    pub capacity: u64,
}

impl BufferDesc {
    pub fn new(label: impl Into<String>, kind: BufferKind, instance_size: u64, capacity: u64) -> Self {
        Self {
            label: label.into(),
            kind,
            instance_size,
            capacity,
        }
    }

    /// Size of the allocation in bytes.
    pub fn byte_size(&self) -> u64 {
        self.instance_size * self.capacity
    }
}

/// Wrapper around a GPU buffer that can be real or mock.
///
/// Owned and cheap to clone, so upload jobs can carry it to worker threads.
#[derive(Clone, Debug)]
pub struct GpuBuffer {
    kind: BufferKind,
    inner: GpuBufferInner,
}

#[derive(Clone, Debug)]
enum GpuBufferInner {
    Real(wgpu::Buffer),
    #[cfg(feature = "mock")]
    Mock { id: usize, size: u64 },
}

impl GpuBuffer {
    /// Create from real WGPU buffer
    pub fn from_wgpu(buffer: wgpu::Buffer, kind: BufferKind) -> Self {
        Self {
            kind,
            inner: GpuBufferInner::Real(buffer),
        }
    }

    /// Create mock buffer (for testing)
    #[cfg(feature = "mock")]
    pub fn mock(id: usize, size: u64, kind: BufferKind) -> Self {
        Self {
            kind,
            inner: GpuBufferInner::Mock { id, size },
        }
    }

    pub fn kind(&self) -> BufferKind {
        self.kind
    }

    /// Size in bytes.
    pub fn size(&self) -> u64 {
        match &self.inner {
            GpuBufferInner::Real(buffer) => buffer.size(),
            #[cfg(feature = "mock")]
            GpuBufferInner::Mock { size, .. } => *size,
        }
    }

    /// Check that `len` bytes written at `offset` stay inside the buffer.
    pub fn check_write(&self, offset: u64, len: u64) -> Result<(), GpuError> {
        let size = self.size();
        match offset.checked_add(len) {
            Some(end) if end <= size => Ok(()),
            _ => Err(GpuError::WriteOutOfRange { offset, len, size }),
        }
    }

    /// Get the underlying wgpu::Buffer (if real)
    ///
    /// # Panics
    /// Panics if this is a mock buffer (test code should never call this)
    pub fn as_wgpu(&self) -> &wgpu::Buffer {
        match &self.inner {
            GpuBufferInner::Real(buffer) => buffer,
            #[cfg(feature = "mock")]
            GpuBufferInner::Mock { .. } => {
                panic!("Attempted to get wgpu::Buffer from mock buffer - this is a test-only buffer")
            }
        }
    }

    /// Check if this is a mock (useful in tests)
    #[cfg(feature = "mock")]
    pub fn is_mock(&self) -> bool {
        matches!(self.inner, GpuBufferInner::Mock { .. })
    }

    /// Get mock ID (for test assertions)
    #[cfg(feature = "mock")]
    pub fn mock_id(&self) -> Option<usize> {
        match &self.inner {
            GpuBufferInner::Mock { id, .. } => Some(*id),
            _ => None,
        }
    }
}

/// Wrapper around a bind group (descriptor set) that can be real or mock.
#[derive(Clone, Debug)]
pub struct GpuBindGroup {
    inner: GpuBindGroupInner,
}

#[derive(Clone, Debug)]
enum GpuBindGroupInner {
    Real(wgpu::BindGroup),
    #[cfg(feature = "mock")]
    Mock { id: usize },
}

impl GpuBindGroup {
    pub fn from_wgpu(bind_group: wgpu::BindGroup) -> Self {
        Self {
            inner: GpuBindGroupInner::Real(bind_group),
        }
    }

    #[cfg(feature = "mock")]
    pub fn mock(id: usize) -> Self {
        Self {
            inner: GpuBindGroupInner::Mock { id },
        }
    }

    /// # Panics
    /// Panics if this is a mock bind group
    pub fn as_wgpu(&self) -> &wgpu::BindGroup {
        match &self.inner {
            GpuBindGroupInner::Real(bind_group) => bind_group,
            #[cfg(feature = "mock")]
            GpuBindGroupInner::Mock { .. } => {
                panic!("Attempted to get wgpu::BindGroup from mock bind group")
            }
        }
    }

    #[cfg(feature = "mock")]
    pub fn is_mock(&self) -> bool {
        matches!(self.inner, GpuBindGroupInner::Mock { .. })
    }

    #[cfg(feature = "mock")]
    pub fn mock_id(&self) -> Option<usize> {
        match &self.inner {
            GpuBindGroupInner::Mock { id } => Some(*id),
            _ => None,
        }
    }
}
